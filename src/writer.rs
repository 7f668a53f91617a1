use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use crate::encodings;
use crate::encryption::EncryptionState;
use crate::error::Operation;
use crate::load_options::{Accuracy, OpenMode};
use crate::object_stream::ObjectStreamBuilder;
use crate::reader::Source;
use crate::save_options::SaveOptions;
use crate::xref::{Xref, XrefEntry, XrefType, encode_xref_stream};
use crate::{Dictionary, Document, Error, Object, ObjectId, Result, Stream, StringFormat};

/// Trailer keys that only describe the section they were read from.
const SECTION_KEYS: [&[u8]; 9] = [
    b"Prev",
    b"XRefStm",
    b"Type",
    b"W",
    b"Index",
    b"Filter",
    b"DecodeParms",
    b"Length",
    b"DL",
];

/// Byte ranges recorded during one save pass.
#[derive(Debug, Clone, Default)]
pub struct WritePositions {
    watched: BTreeSet<(ObjectId, Vec<u8>)>,
    objects: BTreeMap<ObjectId, Range<usize>>,
    values: BTreeMap<(ObjectId, Vec<u8>), Range<usize>>,
}

impl WritePositions {
    pub fn new() -> WritePositions {
        WritePositions::default()
    }

    /// Record where the value of `key` in dictionary (or stream) `id` is written.
    /// Watched objects are never packed into object streams.
    pub fn watch<K: Into<Vec<u8>>>(&mut self, id: ObjectId, key: K) {
        self.watched.insert((id, key.into()));
    }

    /// `N G obj` to `endobj` of the last written copy of `id`.
    pub fn object(&self, id: ObjectId) -> Option<Range<usize>> {
        self.objects.get(&id).cloned()
    }

    /// Bytes of a watched dictionary value.
    pub fn value(&self, id: ObjectId, key: &[u8]) -> Option<Range<usize>> {
        self.values.get(&(id, key.to_vec())).cloned()
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &Range<usize>)> {
        self.objects.iter()
    }

    fn watches(&self, id: ObjectId) -> bool {
        self.watched.range((id, Vec::new())..).next().is_some_and(|(watched, _)| *watched == id)
    }

    fn is_watched(&self, id: ObjectId, key: &[u8]) -> bool {
        self.watched.contains(&(id, key.to_vec()))
    }

    fn reset(&mut self) {
        self.objects.clear();
        self.values.clear();
    }
}

/// Everything `write_revision` produced.
struct Revision {
    bytes: Vec<u8>,
    xref: Xref,
    xref_start: usize,
}

impl Document {
    /// Save PDF document to specified file path. The file is only touched
    /// once the whole document has been serialized.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = self.save_tracked(&SaveOptions::default(), &mut WritePositions::new())?;
        fs::write(path, bytes).map_err(|err| Error::from(err).during(Operation::Save))
    }

    /// Save PDF to arbitrary target
    pub fn save_to<W: Write>(&mut self, target: &mut W) -> Result<()> {
        self.save_with_options(target, &SaveOptions::default())
    }

    pub fn save_with_options<W: Write>(&mut self, target: &mut W, options: &SaveOptions) -> Result<()> {
        let bytes = self.save_tracked(options, &mut WritePositions::new())?;
        target
            .write_all(&bytes)
            .map_err(|err| Error::from(err).during(Operation::Save))
    }

    /// Serialize the document, recording write positions, and return the
    /// complete file. The document is rebound to the returned bytes.
    pub fn save_tracked(&mut self, options: &SaveOptions, positions: &mut WritePositions) -> Result<Vec<u8>> {
        positions.reset();
        self.write_revision(options, positions)
            .map_err(|err| err.during(Operation::Save))
    }

    fn write_revision(&mut self, options: &SaveOptions, positions: &mut WritePositions) -> Result<Vec<u8>> {
        if self.mode == OpenMode::ReadOnly {
            return Err(Error::ReadOnly);
        }
        let revision = if options.incremental {
            self.write_incremental(options, positions)?
        } else {
            self.write_full(options, positions)?
        };
        debug!(
            "saved {} bytes, {} xref entries",
            revision.bytes.len(),
            revision.xref.len()
        );
        self.rebind(&revision, options.incremental);
        Ok(revision.bytes)
    }

    fn write_full(&mut self, options: &SaveOptions, positions: &mut WritePositions) -> Result<Revision> {
        let reachable = self.reachable_ids()?;
        let encrypt_id = self.encrypt_id();
        let crypt = self.encryption_state().cloned();

        let mut target = CountingWrite::new(Vec::new(), 0);
        writeln!(target, "%PDF-{}", self.version)?;
        if !self.binary_mark.is_empty() {
            target.write_all(b"%")?;
            target.write_all(&self.binary_mark)?;
            target.write_all(b"\n")?;
        }

        let xref_type = if options.xref_stream() {
            XrefType::CrossReferenceStream
        } else {
            XrefType::CrossReferenceTable
        };
        let mut xref = Xref::new(0, xref_type);
        xref.insert(0, XrefEntry::Free { generation: 65535 });

        let mut packable = Vec::new();
        for id in reachable {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };
            if options.use_object_streams
                && id.1 == 0
                && !matches!(object, Object::Stream(_))
                && Some(id) != encrypt_id
                && !positions.watches(id)
            {
                packable.push(id);
                continue;
            }
            let object = prepare(object, id, options, crypt.as_ref(), encrypt_id)?;
            Writer::write_indirect_object(&mut target, id, &object, &mut xref, positions)?;
        }

        for chunk in packable.chunks(options.max_objects_per_stream) {
            let container = self.new_object_id();
            let mut builder = ObjectStreamBuilder::new();
            for &id in chunk {
                let Some(object) = self.objects.get(&id) else {
                    continue;
                };
                let index = builder.add(id.0, object)?;
                xref.insert(
                    id.0,
                    XrefEntry::Compressed {
                        container: container.0,
                        index,
                    },
                );
            }
            let mut stream = builder.build();
            stream.compress(options.compression_level)?;
            let mut object = Object::Stream(stream);
            if let Some(crypt) = &crypt {
                crypt.encrypt_object(container, &mut object)?;
            }
            Writer::write_indirect_object(&mut target, container, &object, &mut xref, positions)?;
        }

        let mut trailer = self.trailer.clone();
        for key in SECTION_KEYS {
            trailer.remove(key);
        }
        let xref_start = self.write_xref_section(&mut target, &mut xref, &mut trailer, options, positions)?;

        Ok(Revision {
            bytes: target.into_inner(),
            xref,
            xref_start,
        })
    }

    fn write_incremental(&mut self, options: &SaveOptions, positions: &mut WritePositions) -> Result<Revision> {
        if self.security_changed {
            return Err(Error::IncrementalSave("encryption changed since the document was read"));
        }
        let source = self
            .source
            .as_ref()
            .ok_or(Error::IncrementalSave("the document has no original bytes"))?;
        if source.rebuilt {
            return Err(Error::IncrementalSave("the cross-reference data was rebuilt by scanning"));
        }
        let prev = source.xref_start;
        let mut bytes = source.buffer.as_ref().clone();
        if !bytes.ends_with(b"\n") {
            bytes.push(b'\n');
        }

        let encrypt_id = self.encrypt_id();
        let crypt = self.encryption_state().cloned();
        let xref_type = if options.use_xref_streams {
            XrefType::CrossReferenceStream
        } else {
            self.reference_table.xref_type
        };
        let mut xref = Xref::new(0, xref_type);

        let start = bytes.len();
        let mut target = CountingWrite::new(bytes, start);
        for &id in &self.modified {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };
            let object = prepare(object, id, options, crypt.as_ref(), encrypt_id)?;
            Writer::write_indirect_object(&mut target, id, &object, &mut xref, positions)?;
        }
        for id in &self.freed {
            xref.entries.entry(id.0).or_insert(XrefEntry::Free {
                generation: id.1.saturating_add(1),
            });
        }

        let mut trailer = self.trailer.clone();
        for key in SECTION_KEYS {
            trailer.remove(key);
        }
        trailer.set("Prev", prev as i64);
        let xref_start = self.write_xref_section(&mut target, &mut xref, &mut trailer, options, positions)?;

        Ok(Revision {
            bytes: target.into_inner(),
            xref,
            xref_start,
        })
    }

    /// Write the xref table and trailer, or an xref stream carrying the
    /// trailer keys, then `startxref`. Returns the section offset.
    fn write_xref_section<W: Write>(
        &mut self, target: &mut CountingWrite<W>, xref: &mut Xref, trailer: &mut Dictionary, options: &SaveOptions,
        positions: &mut WritePositions,
    ) -> Result<usize> {
        let xref_start = target.position();
        match xref.xref_type {
            XrefType::CrossReferenceTable => {
                xref.size = self.next_free_number(xref);
                trailer.set("Size", i64::from(xref.size));
                Writer::write_xref(target, xref)?;
                target.write_all(b"trailer\n")?;
                Writer::write_dictionary(target, trailer)?;
                target.write_all(b"\n")?;
            }
            XrefType::CrossReferenceStream => {
                let id = self.new_object_id();
                xref.insert(
                    id.0,
                    XrefEntry::Normal {
                        offset: u32::try_from(xref_start)?,
                        generation: 0,
                    },
                );
                xref.size = self.next_free_number(xref);
                trailer.set("Size", i64::from(xref.size));

                let (widths, index, rows) = encode_xref_stream(xref);
                let mut dict = trailer.clone();
                dict.set("Type", "XRef");
                dict.set("W", widths.iter().map(|&w| Object::from(w)).collect::<Vec<_>>());
                dict.set("Index", index);
                let mut stream = Stream::new(dict, rows);
                stream.compress(options.compression_level)?;
                let mut ignored = Xref::new(0, XrefType::CrossReferenceStream);
                Writer::write_indirect_object(target, id, &Object::Stream(stream), &mut ignored, positions)?;
            }
        }
        write!(target, "startxref\n{}\n%%EOF\n", xref_start)?;
        Ok(xref_start)
    }

    fn next_free_number(&self, xref: &Xref) -> u32 {
        self.max_id.max(xref.max_id()).max(self.reference_table.max_id()) + 1
    }

    /// Point the document at the bytes just written.
    fn rebind(&mut self, revision: &Revision, incremental: bool) {
        if incremental {
            self.reference_table.update(&revision.xref);
        } else {
            self.reference_table = revision.xref.clone();
        }
        self.reference_table.xref_type = revision.xref.xref_type;
        self.trailer.set("Size", i64::from(revision.xref.size.max(self.reference_table.size)));
        for key in SECTION_KEYS {
            self.trailer.remove(key);
        }
        self.modified.clear();
        self.freed.clear();
        self.security_changed = false;

        if self.mode != OpenMode::Modify {
            return;
        }
        let crypt = self.encryption_state().cloned();
        let encrypt_id = self.encrypt_id();
        let source = self
            .source
            .get_or_insert_with(|| Source::new(Vec::new(), 0, Accuracy::Strict, false));
        source.rebind(revision.bytes.clone(), revision.xref_start);
        source.crypt = crypt;
        source.encrypt_id = encrypt_id;
    }
}

/// The object as it goes to disk: optionally compressed, then encrypted.
fn prepare(
    object: &Object, id: ObjectId, options: &SaveOptions, crypt: Option<&EncryptionState>, encrypt_id: Option<ObjectId>,
) -> Result<Object> {
    let mut object = object.clone();
    if options.compress {
        if let Object::Stream(stream) = &mut object {
            stream.compress(options.compression_level)?;
        }
    }
    if let Some(crypt) = crypt {
        if Some(id) != encrypt_id {
            crypt.encrypt_object(id, &mut object)?;
        }
    }
    Ok(object)
}

pub struct Writer;

impl Writer {
    fn need_separator(object: &Object) -> bool {
        matches!(
            *object,
            Object::Null | Object::Boolean(_) | Object::Integer(_) | Object::Real(_) | Object::Reference(_)
        )
    }

    fn write_xref(file: &mut dyn Write, xref: &Xref) -> Result<()> {
        file.write_all(b"xref\n")?;
        for (start, entries) in xref.subsections() {
            writeln!(file, "{} {}", start, entries.len())?;
            for entry in entries {
                // Each record is exactly 20 bytes.
                match entry {
                    XrefEntry::Normal { offset, generation } => write!(file, "{:010} {:05} n\r\n", offset, generation)?,
                    XrefEntry::Free { generation } => write!(file, "{:010} {:05} f\r\n", 0, generation)?,
                    XrefEntry::Compressed { .. } => {
                        return Err(Error::Unimplemented("compressed entries in a classic xref table"));
                    }
                }
            }
        }
        Ok(())
    }

    fn write_indirect_object<W: Write>(
        file: &mut CountingWrite<W>, id: ObjectId, object: &Object, xref: &mut Xref, positions: &mut WritePositions,
    ) -> Result<()> {
        let start = file.position();
        xref.insert(
            id.0,
            XrefEntry::Normal {
                offset: u32::try_from(start)?,
                generation: id.1,
            },
        );
        writeln!(file, "{} {} obj", id.0, id.1)?;

        let watched = positions.watches(id).then_some(&mut *positions);
        match object {
            Object::Dictionary(dict) => {
                let position = file.position();
                let inner: &mut dyn Write = &mut *file;
                Writer::write_entries(&mut CountingWrite::new(inner, position), id, dict, None, watched)?;
            }
            Object::Stream(stream) => {
                let position = file.position();
                let inner: &mut dyn Write = &mut *file;
                Writer::write_stream_tracked(&mut CountingWrite::new(inner, position), id, stream, watched)?;
            }
            _ => Writer::write_object(file, object)?,
        }

        file.write_all(b"\nendobj\n")?;
        positions.objects.insert(id, start..file.position());
        Ok(())
    }

    pub fn write_object(file: &mut dyn Write, object: &Object) -> Result<()> {
        match object {
            Object::Null => file.write_all(b"null")?,
            Object::Boolean(value) => file.write_all(if *value { b"true" } else { b"false" })?,
            Object::Integer(value) => {
                let mut buffer = itoa::Buffer::new();
                file.write_all(buffer.format(*value).as_bytes())?;
            }
            Object::Real(value) => Writer::write_real(file, *value)?,
            Object::Name(name) => Writer::write_name(file, name)?,
            Object::String(text, StringFormat::Text) => {
                let bytes = encodings::encode_text(&String::from_utf8_lossy(text));
                let format = if bytes.starts_with(&[0xFE, 0xFF]) {
                    StringFormat::Hexadecimal
                } else {
                    StringFormat::Literal
                };
                Writer::write_string(file, &bytes, format)?;
            }
            Object::String(text, format) => Writer::write_string(file, text, *format)?,
            Object::Date(date) => Writer::write_string(file, date.to_string().as_bytes(), StringFormat::Literal)?,
            Object::Array(array) => Writer::write_array(file, array)?,
            Object::Dictionary(dict) => Writer::write_dictionary(file, dict)?,
            Object::Stream(stream) => {
                let mut counting = CountingWrite::new(file, 0);
                Writer::write_stream_tracked(&mut counting, (0, 0), stream, None)?;
            }
            Object::Reference(id) => write!(file, "{} {} R", id.0, id.1)?,
            Object::Comment(text) => {
                file.write_all(b"%")?;
                file.write_all(text)?;
            }
        }
        Ok(())
    }

    fn write_real(file: &mut dyn Write, value: f32) -> Result<()> {
        if !value.is_finite() {
            file.write_all(b"0")?;
            return Ok(());
        }
        let text = value.to_string();
        file.write_all(text.as_bytes())?;
        if !text.contains('.') {
            file.write_all(b".0")?;
        }
        Ok(())
    }

    fn write_name(file: &mut dyn Write, name: &[u8]) -> Result<()> {
        file.write_all(b"/")?;
        for &byte in name {
            // white-space and delimiter chars are encoded to # sequences
            // also encode bytes outside of the range 33 (!) to 126 (~)
            if b" \t\n\r\x0C()<>[]{}/%#".contains(&byte) || !(33..=126).contains(&byte) {
                write!(file, "#{:02X}", byte)?;
            } else {
                file.write_all(&[byte])?;
            }
        }
        Ok(())
    }

    fn write_string(file: &mut dyn Write, text: &[u8], format: StringFormat) -> Result<()> {
        match format {
            // Backslash, CR and unbalanced parentheses are escaped; a bare CR
            // inside a literal would read back as LF.
            StringFormat::Literal | StringFormat::Text => {
                let mut escaped = BTreeSet::new();
                let mut open = Vec::new();
                for (index, &byte) in text.iter().enumerate() {
                    match byte {
                        b'(' => open.push(index),
                        b')' => {
                            if open.pop().is_none() {
                                escaped.insert(index);
                            }
                        }
                        b'\\' | b'\r' => {
                            escaped.insert(index);
                        }
                        _ => {}
                    }
                }
                escaped.extend(open);

                file.write_all(b"(")?;
                for (index, &byte) in text.iter().enumerate() {
                    if escaped.contains(&index) {
                        file.write_all(&[b'\\', if byte == b'\r' { b'r' } else { byte }])?;
                    } else {
                        file.write_all(&[byte])?;
                    }
                }
                file.write_all(b")")?;
            }
            StringFormat::Hexadecimal => {
                file.write_all(b"<")?;
                for &byte in text {
                    write!(file, "{:02X}", byte)?;
                }
                file.write_all(b">")?;
            }
        }
        Ok(())
    }

    fn write_array(file: &mut dyn Write, array: &[Object]) -> Result<()> {
        file.write_all(b"[")?;
        for (index, object) in array.iter().enumerate() {
            if index > 0 && Writer::need_separator(object) {
                file.write_all(b" ")?;
            }
            Writer::write_object(file, object)?;
        }
        file.write_all(b"]")?;
        Ok(())
    }

    fn write_dictionary(file: &mut dyn Write, dictionary: &Dictionary) -> Result<()> {
        let mut counting = CountingWrite::new(file, 0);
        Writer::write_entries(&mut counting, (0, 0), dictionary, None, None)
    }

    /// `<< ... >>`, with `/Length` replaced by `length` when given.
    fn write_entries(
        file: &mut CountingWrite<&mut dyn Write>, id: ObjectId, dictionary: &Dictionary, length: Option<&Object>,
        mut positions: Option<&mut WritePositions>,
    ) -> Result<()> {
        file.write_all(b"<<")?;
        let mut wrote_length = false;
        for (key, value) in dictionary {
            let value = match length {
                Some(length) if key.as_slice() == b"Length" => {
                    wrote_length = true;
                    length
                }
                _ => value,
            };
            Writer::write_name(file, key)?;
            if Writer::need_separator(value) {
                file.write_all(b" ")?;
            }
            let start = file.position();
            Writer::write_object(file, value)?;
            if let Some(positions) = positions.as_deref_mut() {
                if positions.is_watched(id, key) {
                    positions.values.insert((id, key.clone()), start..file.position());
                }
            }
        }
        if let Some(length) = length {
            if !wrote_length {
                Writer::write_name(file, b"Length")?;
                file.write_all(b" ")?;
                Writer::write_object(file, length)?;
            }
        }
        file.write_all(b">>")?;
        Ok(())
    }

    fn write_stream_tracked(
        file: &mut CountingWrite<&mut dyn Write>, id: ObjectId, stream: &Stream, positions: Option<&mut WritePositions>,
    ) -> Result<()> {
        let length = Object::Integer(stream.content.len() as i64);
        Writer::write_entries(file, id, &stream.dict, Some(&length), positions)?;
        file.write_all(b"stream\n")?;
        file.write_all(&stream.content)?;
        file.write_all(b"\nendstream")?;
        Ok(())
    }
}

/// Counts bytes on their way to `inner`, starting from a given offset.
pub struct CountingWrite<W: Write> {
    inner: W,
    position: usize,
}

impl<W: Write> CountingWrite<W> {
    pub fn new(inner: W, position: usize) -> CountingWrite<W> {
        CountingWrite { inner, position }
    }

    /// Offset of the next byte.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWrite<W> {
    #[inline]
    fn write(&mut self, buffer: &[u8]) -> std::io::Result<usize> {
        let result = self.inner.write(buffer);
        if let Ok(bytes) = result {
            self.position += bytes;
        }
        result
    }

    #[inline]
    fn write_all(&mut self, buffer: &[u8]) -> std::io::Result<()> {
        self.position += buffer.len();
        // On error the pass is abandoned, so the count no longer matters.
        self.inner.write_all(buffer)
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
