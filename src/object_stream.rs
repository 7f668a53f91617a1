use crate::parser::object_parser::{NoLengthResolver, ObjectParser};
use crate::writer::Writer;
use crate::{Error, Object, ObjectId, Result, Stream};
use std::collections::BTreeMap;
use std::str::FromStr;

use log::warn;

/// Objects unpacked from a `/Type /ObjStm` stream.
#[derive(Debug, Default)]
pub struct ObjectStream {
    pub objects: BTreeMap<ObjectId, Object>,
}

impl ObjectStream {
    pub fn new(stream: &Stream) -> Result<ObjectStream> {
        let content = stream.decompressed_content()?;
        if content.is_empty() {
            return Ok(ObjectStream::default());
        }

        let first_offset = stream.dict.get(b"First").and_then(Object::as_i64)?;
        let first_offset = usize::try_from(first_offset).map_err(|_| Error::InvalidOffset(0))?;
        let index_block = content.get(..first_offset).ok_or(Error::InvalidOffset(first_offset))?;

        let numbers: Vec<Option<u32>> = std::str::from_utf8(index_block)?
            .split_whitespace()
            .map(|number| u32::from_str(number).ok())
            .collect();
        let len = numbers.len() / 2 * 2;

        let n = stream.dict.get(b"N").and_then(Object::as_i64)?;
        if i64::try_from(numbers.len()).ok() != n.checked_mul(2) {
            warn!("object stream: the object stream dictionary specifies a wrong number of objects")
        }

        let mut objects = BTreeMap::new();
        for chunk in numbers[..len].chunks(2) {
            let (Some(id), Some(offset)) = (chunk[0], chunk[1]) else {
                warn!("object stream: invalid entry in index");
                continue;
            };
            let offset = first_offset + offset as usize;
            if offset >= content.len() {
                warn!("out-of-bounds offset in object stream");
                continue;
            }
            match ObjectParser::new(&content, offset, &NoLengthResolver).parse_value() {
                Ok(object) => {
                    objects.insert((id, 0), object);
                }
                Err(err) => warn!("object stream: object {} is unreadable: {}", id, err),
            }
        }

        Ok(ObjectStream { objects })
    }
}

/// Packs non-stream objects into an object stream.
#[derive(Debug, Default)]
pub struct ObjectStreamBuilder {
    index: Vec<(u32, usize)>,
    body: Vec<u8>,
}

impl ObjectStreamBuilder {
    pub fn new() -> ObjectStreamBuilder {
        ObjectStreamBuilder::default()
    }

    /// Append an object; returns its index inside the stream.
    pub fn add(&mut self, number: u32, object: &Object) -> Result<u16> {
        let index = u16::try_from(self.index.len())?;
        self.index.push((number, self.body.len()));
        Writer::write_object(&mut self.body, object)?;
        self.body.push(b'\n');
        Ok(index)
    }

    pub fn build(self) -> Stream {
        let mut header = Vec::new();
        for (number, offset) in &self.index {
            header.extend_from_slice(format!("{} {} ", number, offset).as_bytes());
        }
        header.push(b'\n');
        let first = header.len();
        header.extend_from_slice(&self.body);

        Stream::new(
            dictionary! {
                "Type" => "ObjStm",
                "N" => self.index.len(),
                "First" => first,
            },
            header,
        )
    }
}
