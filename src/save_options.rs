/// Options for saving PDF documents
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Append a new revision to the original bytes instead of rewriting the file.
    pub incremental: bool,

    /// Flate-compress unfiltered streams that allow compression.
    pub compress: bool,

    /// Compression level (0-9) used for streams, object streams and xref streams.
    pub compression_level: u32,

    /// Write a cross-reference stream instead of a classic xref table.
    pub use_xref_streams: bool,

    /// Pack non-stream objects into object streams (full saves only; implies xref streams).
    pub use_object_streams: bool,

    /// Upper bound of objects per object stream.
    pub max_objects_per_stream: usize,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            incremental: false,
            compress: false,
            compression_level: 6,
            use_xref_streams: false,
            use_object_streams: false,
            max_objects_per_stream: 100,
        }
    }
}

impl SaveOptions {
    /// Create a builder for SaveOptions
    pub fn builder() -> SaveOptionsBuilder {
        SaveOptionsBuilder::default()
    }

    /// Whether the cross-reference section is written as a stream.
    pub(crate) fn xref_stream(&self) -> bool {
        self.use_xref_streams || self.use_object_streams
    }
}

/// Builder for SaveOptions
#[derive(Debug, Default)]
pub struct SaveOptionsBuilder {
    options: SaveOptions,
}

impl SaveOptionsBuilder {
    pub fn incremental(mut self, value: bool) -> Self {
        self.options.incremental = value;
        self
    }

    pub fn compress(mut self, value: bool) -> Self {
        self.options.compress = value;
        self
    }

    /// Set compression level (0-9)
    pub fn compression_level(mut self, value: u32) -> Self {
        self.options.compression_level = value.min(9);
        self
    }

    /// Enable or disable cross-reference streams
    pub fn use_xref_streams(mut self, value: bool) -> Self {
        self.options.use_xref_streams = value;
        self
    }

    /// Enable or disable object streams
    pub fn use_object_streams(mut self, value: bool) -> Self {
        self.options.use_object_streams = value;
        self
    }

    /// Set maximum objects per stream; zero keeps the default.
    pub fn max_objects_per_stream(mut self, value: usize) -> Self {
        if value > 0 {
            self.options.max_objects_per_stream = value;
        }
        self
    }

    pub fn build(self) -> SaveOptions {
        self.options
    }
}
