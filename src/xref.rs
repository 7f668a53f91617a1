use crate::{Dictionary, Error, Object, Result, Stream, XrefError};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefType {
    /// Classic `xref` table followed by a `trailer` dictionary.
    CrossReferenceTable,
    /// Cross-reference stream (PDF 1.5+).
    CrossReferenceStream,
}

#[derive(Debug, Clone)]
pub struct Xref {
    pub xref_type: XrefType,
    /// Entries for indirect objects, keyed by object number.
    pub entries: BTreeMap<u32, XrefEntry>,
    /// One greater than the highest object number in use (the trailer's `/Size`).
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free { generation: u16 },
    Normal { offset: u32, generation: u16 },
    Compressed { container: u32, index: u16 },
}

impl XrefEntry {
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XrefEntry::Free { .. })
    }

    /// Generation that a reference to this entry must carry.
    pub fn generation(&self) -> u16 {
        match *self {
            XrefEntry::Free { generation } | XrefEntry::Normal { generation, .. } => generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

impl Xref {
    pub fn new(size: u32, xref_type: XrefType) -> Xref {
        Xref {
            xref_type,
            entries: BTreeMap::new(),
            size,
        }
    }

    pub fn get(&self, id: u32) -> Option<&XrefEntry> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: u32, entry: XrefEntry) {
        self.entries.insert(id, entry);
    }

    /// Add entries from an older section; entries already present win.
    pub fn merge(&mut self, older: Xref) {
        for (id, entry) in older.entries {
            self.entries.entry(id).or_insert(entry);
        }
        self.size = self.size.max(older.size);
    }

    /// Replace entries with those of a newer section.
    pub fn update(&mut self, newer: &Xref) {
        self.entries.extend(newer.entries.iter().map(|(id, entry)| (*id, *entry)));
        self.size = self.size.max(newer.size);
    }

    pub fn clear(&mut self) {
        self.entries.clear()
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs of consecutive object numbers, as written into subsections.
    pub fn subsections(&self) -> Vec<(u32, Vec<XrefEntry>)> {
        let mut sections: Vec<(u32, Vec<XrefEntry>)> = Vec::new();
        for (&id, &entry) in &self.entries {
            match sections.last_mut() {
                Some((start, entries)) if *start + entries.len() as u32 == id => entries.push(entry),
                _ => sections.push((id, vec![entry])),
            }
        }
        sections
    }
}

fn read_field(row: &[u8]) -> u64 {
    row.iter().fold(0, |value, &byte| (value << 8) | u64::from(byte))
}

/// Decode the entries of a cross-reference stream. Returns the entries and
/// the stream dictionary, which doubles as the trailer.
pub fn decode_xref_stream(stream: &Stream) -> Result<(Xref, Dictionary)> {
    let dict = &stream.dict;
    let size = dict
        .get(b"Size")
        .and_then(Object::as_i64)
        .map_err(|_| Error::Xref(XrefError::Parse))?;
    let size = u32::try_from(size).map_err(|_| Error::Xref(XrefError::Parse))?;

    let widths = dict
        .get(b"W")
        .and_then(Object::as_array)
        .map_err(|_| Error::Xref(XrefError::Parse))?
        .iter()
        .map(|w| Object::as_i64(w).ok().and_then(|w| usize::try_from(w).ok()).filter(|&w| w <= 8))
        .collect::<Option<Vec<usize>>>()
        .filter(|w| w.len() == 3)
        .ok_or(Error::Xref(XrefError::Parse))?;

    let index = match dict.get(b"Index") {
        Ok(Object::Array(index)) => index
            .chunks(2)
            .map(|pair| match pair {
                [start, count] => Ok((start.as_i64()?, count.as_i64()?)),
                _ => Err(Error::Xref(XrefError::Parse)),
            })
            .collect::<Result<Vec<(i64, i64)>>>()?,
        _ => vec![(0, i64::from(size))],
    };

    let content = stream.decompressed_content()?;
    let row_width = widths.iter().sum::<usize>();
    if row_width == 0 {
        return Err(Error::Xref(XrefError::Parse));
    }
    let mut rows = content.chunks_exact(row_width);
    let mut xref = Xref::new(size, XrefType::CrossReferenceStream);

    for (start, count) in index {
        if start < 0 || count < 0 {
            return Err(Error::Xref(XrefError::Parse));
        }
        let end = start.checked_add(count).ok_or(Error::Xref(XrefError::Parse))?;
        for number in start..end {
            let Some(row) = rows.next() else {
                return Ok((xref, dict.clone()));
            };
            let (kind, rest) = row.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);
            // The type field defaults to 1 when its width is zero.
            let kind = if widths[0] == 0 { 1 } else { read_field(kind) };
            let second = || u32::try_from(read_field(second)).map_err(|_| Error::Xref(XrefError::Parse));
            let third = || u16::try_from(read_field(third)).map_err(|_| Error::Xref(XrefError::Parse));
            let Ok(number) = u32::try_from(number) else {
                continue;
            };
            let entry = match kind {
                0 => XrefEntry::Free { generation: third()? },
                1 => XrefEntry::Normal {
                    offset: second()?,
                    generation: third()?,
                },
                2 => XrefEntry::Compressed {
                    container: second()?,
                    index: third()?,
                },
                // Unknown types are treated as references to the null object.
                _ => continue,
            };
            xref.insert(number, entry);
        }
    }
    Ok((xref, dict.clone()))
}

/// Minimal number of bytes that can hold `value`.
fn field_width(value: u64) -> usize {
    (8 - value.leading_zeros() as usize / 8).max(1)
}

/// Encode entries as xref stream rows; returns the `/W` widths, `/Index` and the raw rows.
pub fn encode_xref_stream(xref: &Xref) -> ([usize; 3], Vec<Object>, Vec<u8>) {
    let mut max_second = 0_u64;
    let mut max_third = 0_u64;
    for entry in xref.entries.values() {
        let (second, third) = match *entry {
            XrefEntry::Free { generation } => (0, u64::from(generation)),
            XrefEntry::Normal { offset, generation } => (u64::from(offset), u64::from(generation)),
            XrefEntry::Compressed { container, index } => (u64::from(container), u64::from(index)),
        };
        max_second = max_second.max(second);
        max_third = max_third.max(third);
    }
    let widths = [1, field_width(max_second), field_width(max_third)];

    let mut index = Vec::new();
    let mut rows = Vec::new();
    for (start, entries) in xref.subsections() {
        index.push(Object::Integer(i64::from(start)));
        index.push(Object::Integer(entries.len() as i64));
        for entry in entries {
            let (kind, second, third) = match entry {
                XrefEntry::Free { generation } => (0_u64, 0, u64::from(generation)),
                XrefEntry::Normal { offset, generation } => (1, u64::from(offset), u64::from(generation)),
                XrefEntry::Compressed { container, index } => (2, u64::from(container), u64::from(index)),
            };
            for (value, width) in [(kind, widths[0]), (second, widths[1]), (third, widths[2])] {
                rows.extend_from_slice(&value.to_be_bytes()[8 - width..]);
            }
        }
    }
    (widths, index, rows)
}
