use log::{debug, error, warn};
use nom::Input;
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::encryption::EncryptionState;
use crate::error::{Operation, XrefError};
use crate::load_options::{Accuracy, LoadOptions, OpenMode};
use crate::object_stream::ObjectStream;
use crate::parser::lexer::{Keyword, Token};
use crate::parser::object_parser::{LengthResolver, NoLengthResolver, ObjectParser};
use crate::parser::{self, is_regular, is_whitespace, span};
use crate::xref::{Xref, XrefEntry, XrefType, decode_xref_stream};
use crate::{Dictionary, Document, Error, Object, ObjectId, Result};

/// `startxref` is searched for in this many bytes at the end of the file.
const STARTXREF_WINDOW: usize = 1024;

impl Document {
    /// Load a PDF document from a specified file path with default options.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        Self::open(path, LoadOptions::default())
    }

    /// Open a PDF document from a file. The file is read whole and closed
    /// before parsing starts.
    pub fn open<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Document> {
        let buffer = fs::read(path).map_err(|err| Error::from(err).during(Operation::Open))?;
        Self::load_bytes(buffer, &options)
    }

    /// Open a PDF document from an arbitrary source.
    pub fn open_from<R: Read>(mut source: R, options: LoadOptions) -> Result<Document> {
        let mut buffer = Vec::new();
        source
            .read_to_end(&mut buffer)
            .map_err(|err| Error::from(err).during(Operation::Open))?;
        Self::load_bytes(buffer, &options)
    }

    /// Load a PDF document from a memory slice.
    pub fn load_mem(buffer: &[u8]) -> Result<Document> {
        Self::load_bytes(buffer.to_vec(), &LoadOptions::default())
    }

    pub fn load_mem_with(buffer: &[u8], options: LoadOptions) -> Result<Document> {
        Self::load_bytes(buffer.to_vec(), &options)
    }

    fn load_bytes(buffer: Vec<u8>, options: &LoadOptions) -> Result<Document> {
        Self::read_document(buffer, options).map_err(|err| err.during(Operation::Open))
    }

    fn read_document(mut buffer: Vec<u8>, options: &LoadOptions) -> Result<Document> {
        // Offsets count from the header; junk in front of it is dropped.
        let offset = buffer.windows(5).position(|w| w == b"%PDF-").ok_or(Error::Header)?;
        if offset > 0 {
            warn!("ignoring {} bytes before the %PDF- header", offset);
            buffer.drain(..offset);
        }

        let structure = Reader {
            buffer: &buffer,
            accuracy: options.accuracy,
        }
        .read()?;

        let mut document = Document::with_version(structure.version);
        document.binary_mark = structure.binary_mark;
        document.max_id = structure.xref.max_id().max(structure.xref.size.saturating_sub(1));
        document.trailer = structure.trailer;
        document.reference_table = structure.xref;
        document.mode = options.mode;
        document.source = Some(Source::new(
            buffer,
            structure.xref_start,
            options.accuracy,
            structure.rebuilt,
        ));

        document.unlock(options)?;

        if options.mode == OpenMode::Import {
            document.load_all()?;
            document.source = None;
        }
        Ok(document)
    }
}

/// Cross-reference data and trailer of a file.
pub(crate) struct Structure {
    pub version: String,
    pub binary_mark: Vec<u8>,
    pub xref: Xref,
    pub trailer: Dictionary,
    pub xref_start: usize,
    /// The cross-reference data was reconstructed by scanning.
    pub rebuilt: bool,
}

pub(crate) struct Reader<'a> {
    pub buffer: &'a [u8],
    pub accuracy: Accuracy,
}

impl Reader<'_> {
    pub fn read(&self) -> Result<Structure> {
        let version = parser::header(self.buffer).ok_or(Error::Header)?;

        // The binary mark is the comment on the line after the header.
        let binary_mark = parser::binary_mark(self.buffer)
            .filter(|mark| !mark.is_empty() && mark.iter().all(|&byte| byte >= 128))
            .unwrap_or_default();

        let chain = self.read_xref_chain().and_then(|(xref, trailer, xref_start)| {
            if !trailer.has(b"Root") {
                return Err(Error::Trailer);
            }
            if self.accuracy == Accuracy::Strict {
                self.validate_offsets(&xref)?;
            }
            Ok((xref, trailer, xref_start))
        });

        let (mut xref, trailer, xref_start, rebuilt) = match chain {
            Ok((xref, trailer, xref_start)) => (xref, trailer, xref_start, false),
            Err(err) if self.accuracy == Accuracy::Lazy => {
                warn!("cross-reference data is unusable ({}), rebuilding it by scanning the file", err);
                let (xref, trailer) = self.rebuild()?;
                let xref_start = find_xref_start(self.buffer).unwrap_or(0);
                (xref, trailer, xref_start, true)
            }
            Err(err) => return Err(err),
        };

        let entry_count = xref.max_id().checked_add(1).ok_or(Error::Xref(XrefError::Parse))?;
        if xref.size < entry_count {
            warn!(
                "Size entry of trailer dictionary is {}, correct value is {}.",
                xref.size, entry_count
            );
            xref.size = entry_count;
        }

        Ok(Structure {
            version,
            binary_mark,
            xref,
            trailer,
            xref_start,
            rebuilt,
        })
    }

    /// Follow `startxref` and the `/Prev` chain, newest section first.
    fn read_xref_chain(&self) -> Result<(Xref, Dictionary, usize)> {
        let xref_start = find_xref_start(self.buffer)?;
        let (mut xref, mut trailer) = self.read_revision(xref_start)?;

        let mut visited = BTreeSet::from([xref_start]);
        let mut prev = trailer.remove(b"Prev");
        while let Some(offset) = prev {
            let offset = offset
                .as_i64()
                .ok()
                .and_then(|offset| usize::try_from(offset).ok())
                .filter(|&offset| offset < self.buffer.len())
                .ok_or(Error::Xref(XrefError::PrevStart))?;
            if !visited.insert(offset) {
                warn!("Prev chain loops back to byte {}", offset);
                break;
            }
            let (older, mut older_trailer) = self.read_revision(offset)?;
            xref.merge(older);
            prev = older_trailer.remove(b"Prev");
        }

        for key in [&b"XRefStm"[..], b"Type", b"W", b"Index", b"Filter", b"DecodeParms", b"Length"] {
            trailer.remove(key);
        }
        xref.size = xref.size.max(
            trailer
                .get(b"Size")
                .and_then(Object::as_i64)
                .ok()
                .and_then(|size| u32::try_from(size).ok())
                .unwrap_or(0),
        );
        Ok((xref, trailer, xref_start))
    }

    /// One revision: its section plus, for hybrid files, the `/XRefStm` stream.
    fn read_revision(&self, offset: usize) -> Result<(Xref, Dictionary)> {
        let (xref, trailer) = self.read_section(offset)?;
        let Ok(stream_offset) = trailer.get(b"XRefStm").and_then(Object::as_i64) else {
            return Ok((xref, trailer));
        };
        let stream_offset = usize::try_from(stream_offset)
            .ok()
            .filter(|&offset| offset < self.buffer.len())
            .ok_or(Error::Xref(XrefError::StreamStart))?;
        let (mut stream_xref, _) = self.read_section(stream_offset)?;
        stream_xref.merge(xref);
        stream_xref.xref_type = XrefType::CrossReferenceTable;
        Ok((stream_xref, trailer))
    }

    fn read_section(&self, offset: usize) -> Result<(Xref, Dictionary)> {
        let skipped = self.buffer[offset..].iter().take_while(|&&c| is_whitespace(c)).count();
        let start = offset + skipped;

        if self.buffer[start..].starts_with(b"xref") {
            let input = span(self.buffer, "xref").take_from(start);
            let (rest, mut xref) = parser::xref(input).map_err(|_| Error::Xref(XrefError::Parse))?;

            let mut objects = ObjectParser::new(self.buffer, rest.location_offset(), &NoLengthResolver);
            match objects.next()? {
                Some(token) if token.token == Token::Keyword(Keyword::Trailer) => {}
                _ => return Err(Error::Trailer),
            }
            let trailer = match objects.parse_value() {
                Ok(Object::Dictionary(trailer)) => trailer,
                _ => return Err(Error::Trailer),
            };
            xref.size = trailer
                .get(b"Size")
                .and_then(Object::as_i64)
                .ok()
                .and_then(|size| u32::try_from(size).ok())
                .unwrap_or(0);
            Ok((xref, trailer))
        } else {
            let mut objects = ObjectParser::new(self.buffer, start, &NoLengthResolver);
            let (_, object) = objects
                .parse_indirect_object(None)
                .map_err(|_| Error::Xref(XrefError::Start))?;
            match object {
                Object::Stream(stream) if stream.dict.type_is(b"XRef") => decode_xref_stream(&stream),
                _ => Err(Error::Xref(XrefError::Start)),
            }
        }
    }

    fn validate_offsets(&self, xref: &Xref) -> Result<()> {
        for (&number, entry) in &xref.entries {
            let XrefEntry::Normal { offset, generation } = *entry else {
                continue;
            };
            let offset_ok = (offset as usize) < self.buffer.len();
            let found = offset_ok
                .then(|| parser::object_header(span(self.buffer, "object header").take_from(offset as usize)).ok())
                .flatten()
                .map(|(_, id)| id);
            if found != Some((number, generation)) {
                return Err(Error::Xref(XrefError::Offset { number, offset }));
            }
        }
        Ok(())
    }

    /// Reconstruct the cross-reference map and trailer from object headers.
    fn rebuild(&self) -> Result<(Xref, Dictionary)> {
        let scanned = scan_objects(self.buffer);
        let mut xref = Xref::new(0, XrefType::CrossReferenceTable);
        for (&(number, generation), &offset) in &scanned {
            let newer = match xref.get(number) {
                Some(XrefEntry::Normal { offset: existing, .. }) => offset > *existing as usize,
                _ => true,
            };
            if newer {
                if let Ok(offset) = u32::try_from(offset) {
                    xref.insert(number, XrefEntry::Normal { offset, generation });
                }
            }
        }

        // Xref streams found by the scan still locate objects inside object streams.
        let mut stream_trailer = None;
        for &offset in scanned.values() {
            if !looks_like(self.buffer, offset, b"/XRef") {
                continue;
            }
            let mut objects = ObjectParser::new(self.buffer, offset, &NoLengthResolver);
            if let Ok((_, Object::Stream(stream))) = objects.parse_indirect_object(None) {
                if let Ok((section, dict)) = decode_xref_stream(&stream) {
                    for (number, entry) in section.entries {
                        if let XrefEntry::Compressed { .. } = entry {
                            xref.entries.entry(number).or_insert(entry);
                        }
                    }
                    if dict.has(b"Root") {
                        stream_trailer = Some(dict);
                    }
                }
            }
        }

        let mut trailer = self
            .last_trailer()
            .or(stream_trailer)
            .map(|mut trailer| {
                for key in [&b"Prev"[..], b"XRefStm", b"Type", b"W", b"Index", b"Filter", b"DecodeParms", b"Length"] {
                    trailer.remove(key);
                }
                trailer
            })
            .unwrap_or_default();

        if !trailer.has(b"Root") {
            let catalog = scanned
                .iter()
                .rev()
                .filter(|(_, offset)| looks_like(self.buffer, **offset, b"/Catalog"))
                .find_map(|(&id, &offset)| {
                    let mut objects = ObjectParser::new(self.buffer, offset, &NoLengthResolver);
                    match objects.parse_indirect_object(Some(id)) {
                        Ok((_, Object::Dictionary(dict))) if dict.type_is(b"Catalog") => Some(id),
                        _ => None,
                    }
                })
                .ok_or(Error::Trailer)?;
            warn!("no usable trailer, using catalog {:?} found by scanning", catalog);
            trailer.set("Root", catalog);
        }

        xref.size = xref.max_id() + 1;
        trailer.set("Size", i64::from(xref.size));
        Ok((xref, trailer))
    }

    /// The last `trailer` dictionary in the file that names a catalog.
    fn last_trailer(&self) -> Option<Dictionary> {
        let mut end = self.buffer.len();
        while let Some(position) = self.buffer[..end].windows(7).rposition(|w| w == b"trailer") {
            end = position;
            let mut objects = ObjectParser::new(self.buffer, position + 7, &NoLengthResolver);
            if let Ok(Object::Dictionary(trailer)) = objects.parse_value() {
                if trailer.has(b"Root") {
                    return Some(trailer);
                }
            }
        }
        None
    }
}

/// `needle` occurs in the first bytes of the object at `offset`.
fn looks_like(buffer: &[u8], offset: usize, needle: &[u8]) -> bool {
    let end = (offset + 512).min(buffer.len());
    buffer[offset..end].windows(needle.len()).any(|w| w == needle)
}

/// Offset after the last `startxref` keyword near the end of the file.
fn find_xref_start(buffer: &[u8]) -> Result<usize> {
    let window_start = buffer.len().saturating_sub(STARTXREF_WINDOW);
    let position = buffer[window_start..]
        .windows(9)
        .rposition(|w| w == b"startxref")
        .ok_or(Error::Xref(XrefError::Start))?;
    parser::xref_start(&buffer[window_start + position..])
        .and_then(|offset| usize::try_from(offset).ok())
        .filter(|&offset| offset < buffer.len())
        .ok_or(Error::Xref(XrefError::Start))
}

/// Offsets of every `N G obj` header in the buffer; a later header for the
/// same id replaces an earlier one.
pub(crate) fn scan_objects(buffer: &[u8]) -> BTreeMap<ObjectId, usize> {
    let mut found = BTreeMap::new();
    let mut from = 0;
    while let Some(found_at) = buffer[from..].windows(3).position(|w| w == b"obj") {
        let position = from + found_at;
        from = position + 3;
        if position >= 3 && &buffer[position - 3..position] == b"end" {
            continue;
        }
        if buffer.get(position + 3).is_some_and(|&c| is_regular(c)) {
            continue;
        }
        if let Some((id, start)) = header_before(buffer, position) {
            found.insert(id, start);
        }
    }
    found
}

/// Walk back from the `obj` keyword over `N G`.
fn header_before(buffer: &[u8], keyword: usize) -> Option<(ObjectId, usize)> {
    let skip_space = |mut i: usize| {
        while i > 0 && is_whitespace(buffer[i - 1]) {
            i -= 1;
        }
        i
    };
    let skip_digits = |mut i: usize| {
        while i > 0 && buffer[i - 1].is_ascii_digit() {
            i -= 1;
        }
        i
    };

    let generation_end = skip_space(keyword);
    let generation_start = skip_digits(generation_end);
    if generation_start == generation_end {
        return None;
    }
    let number_end = skip_space(generation_start);
    if number_end == generation_start {
        return None;
    }
    let number_start = skip_digits(number_end);
    if number_start == number_end || (number_start > 0 && is_regular(buffer[number_start - 1])) {
        return None;
    }

    let number = std::str::from_utf8(&buffer[number_start..number_end]).ok()?.parse().ok()?;
    let generation = std::str::from_utf8(&buffer[generation_start..generation_end]).ok()?.parse().ok()?;
    Some(((number, generation), number_start))
}

/// The bytes a document was read from and everything needed to materialize
/// objects from them on demand.
#[derive(Debug, Clone)]
pub(crate) struct Source {
    pub buffer: Arc<Vec<u8>>,
    /// Offset of the newest cross-reference section.
    pub xref_start: usize,
    pub accuracy: Accuracy,
    pub rebuilt: bool,
    /// Decrypts objects as they are read.
    pub crypt: Option<EncryptionState>,
    /// The encryption dictionary is never decrypted.
    pub encrypt_id: Option<ObjectId>,
    scanned: OnceCell<BTreeMap<ObjectId, usize>>,
    object_streams: BTreeMap<u32, BTreeMap<ObjectId, Object>>,
}

/// Resolves indirect `/Length` values while a stream is parsed.
struct Lengths<'a> {
    source: &'a Source,
    xref: &'a Xref,
}

impl LengthResolver for Lengths<'_> {
    fn resolve_length(&self, id: ObjectId) -> Option<i64> {
        let offset = match self.xref.get(id.0) {
            Some(XrefEntry::Normal { offset, generation }) if *generation == id.1 => Some(*offset as usize),
            _ => None,
        };
        let offset = offset.or_else(|| match self.source.accuracy {
            Accuracy::Lazy => self.source.scanned().get(&id).copied(),
            Accuracy::Strict => None,
        })?;
        let mut objects = ObjectParser::new(&self.source.buffer, offset, &NoLengthResolver);
        match objects.parse_indirect_object(Some(id)) {
            Ok((_, Object::Integer(length))) => Some(length),
            _ => None,
        }
    }
}

impl Source {
    pub fn new(buffer: Vec<u8>, xref_start: usize, accuracy: Accuracy, rebuilt: bool) -> Source {
        Source {
            buffer: Arc::new(buffer),
            xref_start,
            accuracy,
            rebuilt,
            crypt: None,
            encrypt_id: None,
            scanned: OnceCell::new(),
            object_streams: BTreeMap::new(),
        }
    }

    /// Replace the bytes after a save; cached parse state refers to the old bytes.
    pub fn rebind(&mut self, buffer: Vec<u8>, xref_start: usize) {
        self.buffer = Arc::new(buffer);
        self.xref_start = xref_start;
        self.rebuilt = false;
        self.scanned = OnceCell::new();
        self.object_streams.clear();
    }

    /// Header offsets found by scanning the whole buffer, computed once.
    fn scanned(&self) -> &BTreeMap<ObjectId, usize> {
        self.scanned.get_or_init(|| {
            debug!("scanning {} bytes for object headers", self.buffer.len());
            scan_objects(&self.buffer)
        })
    }

    /// Read object `id` as located by `xref`.
    pub fn load(&mut self, xref: &Xref, id: ObjectId) -> Result<Object> {
        let mut object = match xref.get(id.0).copied() {
            Some(XrefEntry::Normal { offset, generation }) if generation == id.1 => {
                match self.parse_at(xref, offset as usize, id) {
                    Ok(object) => object,
                    Err(err) if self.accuracy == Accuracy::Lazy => {
                        debug!("object {:?} is not at byte {} ({}), looking it up by scanning", id, offset, err);
                        self.load_scanned(xref, id)?
                    }
                    Err(err) => return Err(err),
                }
            }
            Some(XrefEntry::Compressed { container, .. }) if id.1 == 0 => {
                return self.load_compressed(xref, container, id);
            }
            None if self.accuracy == Accuracy::Lazy => self.load_scanned(xref, id)?,
            _ => return Err(Error::ObjectNotFound(id)),
        };

        if let Some(crypt) = &self.crypt {
            if self.encrypt_id != Some(id) {
                crypt.decrypt_object(id, &mut object)?;
            }
        }
        Ok(object)
    }

    fn parse_at(&self, xref: &Xref, offset: usize, id: ObjectId) -> Result<Object> {
        if offset >= self.buffer.len() {
            return Err(Error::InvalidOffset(offset));
        }
        let lengths = Lengths { source: self, xref };
        let mut objects = ObjectParser::new(&self.buffer, offset, &lengths);
        objects.parse_indirect_object(Some(id)).map(|(_, object)| object)
    }

    fn load_scanned(&self, xref: &Xref, id: ObjectId) -> Result<Object> {
        let offset = *self.scanned().get(&id).ok_or(Error::PositionNotFound(id))?;
        self.parse_at(xref, offset, id).map_err(|err| {
            error!("object {:?} found by scanning at byte {} is unreadable: {}", id, offset, err);
            Error::PositionNotFound(id)
        })
    }

    fn load_compressed(&mut self, xref: &Xref, container: u32, id: ObjectId) -> Result<Object> {
        if !self.object_streams.contains_key(&container) {
            let container_id = (container, 0);
            let stream = match xref.get(container) {
                Some(XrefEntry::Normal { .. }) => self.load(xref, container_id)?,
                _ => return Err(Error::ObjectNotFound(container_id)),
            };
            let stream = stream.as_stream()?;
            let objects = ObjectStream::new(stream)?.objects;
            self.object_streams.insert(container, objects);
        }
        self.object_streams
            .get(&container)
            .and_then(|objects| objects.get(&id))
            .cloned()
            .ok_or(Error::ObjectNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_finds_headers_but_not_endobj() {
        let buffer = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n  12 3 obj 5 endobj\nx4 0 obj\n1 0 obj 7 endobj";
        let scanned = scan_objects(buffer);
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[&(12, 3)], 31);
        // The later header for object 1 wins.
        assert_eq!(&buffer[scanned[&(1, 0)]..scanned[&(1, 0)] + 7], b"1 0 obj");
        assert!(scanned[&(1, 0)] > 20);
    }

    #[test]
    fn startxref_is_found_near_the_end() {
        let mut buffer = b"%PDF-1.4\n".to_vec();
        buffer.extend(vec![b' '; 2000]);
        buffer.extend(b"startxref\n9\n%%EOF\n");
        assert_eq!(find_xref_start(&buffer).unwrap(), 9);
        assert!(find_xref_start(b"%PDF-1.4\nstartxref\n99999\n%%EOF").is_err());
    }

    #[test]
    fn rebuild_uses_scanned_catalog_without_trailer() {
        let buffer = b"%PDF-1.4\n1 0 obj\n<</Type/Catalog/Pages 2 0 R>>\nendobj\n2 0 obj\n<</Type/Pages/Kids[]/Count 0>>\nendobj\n";
        let reader = Reader {
            buffer,
            accuracy: Accuracy::Lazy,
        };
        let structure = reader.read().unwrap();
        assert!(structure.rebuilt);
        assert_eq!(structure.trailer.get(b"Root").unwrap(), &Object::Reference((1, 0)));
        let offset = buffer.windows(7).position(|w| w == b"2 0 obj").unwrap() as u32;
        assert_eq!(structure.xref.get(2), Some(&XrefEntry::Normal { offset, generation: 0 }));

        let strict = Reader {
            buffer,
            accuracy: Accuracy::Strict,
        };
        assert!(matches!(strict.read(), Err(Error::Xref(XrefError::Start))));
    }

    #[test]
    fn source_reads_direct_and_indirect_lengths() {
        let buffer = b"%PDF-1.4\n1 0 obj\n<</Length 2 0 R>>stream\nabc\nendstream\nendobj\n2 0 obj 3 endobj\n".to_vec();
        let mut xref = Xref::new(3, XrefType::CrossReferenceTable);
        xref.insert(1, XrefEntry::Normal { offset: 9, generation: 0 });
        let offset = buffer.windows(7).position(|w| w == b"2 0 obj").unwrap() as u32;
        xref.insert(2, XrefEntry::Normal { offset, generation: 0 });
        let mut source = Source::new(buffer, 0, Accuracy::Strict, false);
        let object = source.load(&xref, (1, 0)).unwrap();
        assert_eq!(object.as_stream().unwrap().content, b"abc");
        assert!(matches!(source.load(&xref, (5, 0)), Err(Error::ObjectNotFound((5, 0)))));
    }

    #[test]
    fn lazy_source_recovers_from_bad_offsets() {
        let buffer = b"%PDF-1.4\n\n1 0 obj (moved) endobj\n".to_vec();
        let mut xref = Xref::new(2, XrefType::CrossReferenceTable);
        xref.insert(1, XrefEntry::Normal { offset: 3, generation: 0 });

        let mut strict = Source::new(buffer.clone(), 0, Accuracy::Strict, false);
        assert!(strict.load(&xref, (1, 0)).is_err());

        let mut lazy = Source::new(buffer, 0, Accuracy::Lazy, false);
        assert_eq!(lazy.load(&xref, (1, 0)).unwrap(), Object::string_literal("moved"));
        assert!(matches!(lazy.load(&xref, (7, 0)), Err(Error::PositionNotFound((7, 0)))));
    }

    #[test]
    fn trailer_dictionary_in_rebuilt_file() {
        let buffer = b"%PDF-1.4\n3 0 obj <</Type/Catalog>> endobj\ntrailer\n<</Root 3 0 R/Size 4/Info 9 0 R>>\nstartxref\n777\n%%EOF";
        let reader = Reader {
            buffer,
            accuracy: Accuracy::Lazy,
        };
        let structure = reader.read().unwrap();
        assert_eq!(structure.trailer.get(b"Info").unwrap(), &Object::Reference((9, 0)));
        assert_eq!(structure.trailer.get(b"Size").unwrap(), &Object::Integer(4));
    }
}
