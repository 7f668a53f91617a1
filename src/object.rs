use crate::datetime::DateTime;
use crate::encodings;
use crate::{Error, Result};
use indexmap::IndexMap;
use log::warn;
use std::fmt;
use std::str;

/// Object identifier consists of two parts: object number and generation number.
pub type ObjectId = (u32, u16);

/// Dictionary object. Keys keep the order in which they were inserted or parsed.
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

/// Stream object
/// Warning - all streams must be indirect objects, while
/// the stream dictionary may be a direct object
#[derive(Debug, Clone)]
pub struct Stream {
    /// Associated stream dictionary
    pub dict: Dictionary,
    /// Contents of the stream in bytes, still encoded with the dictionary's filters
    pub content: Vec<u8>,
    /// Can the stream be compressed when saving with compression enabled?
    /// Font streams may not be compressed, for example
    pub allows_compression: bool,
    /// Stream data's position in the PDF file it was parsed from.
    pub start_position: Option<usize>,
}

/// Basic PDF object types defined in an enum.
#[derive(Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    /// A date value; serialized as a `(D:...)` literal string.
    Date(DateTime),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// Comment inside a content stream, without the leading `%`.
    Comment(Vec<u8>),
}

/// String objects can be written in two formats. `Text` strings hold UTF-8
/// that is encoded to PDFDocEncoding or UTF-16BE on output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StringFormat {
    #[default]
    Literal,
    Hexadecimal,
    Text,
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(number: i64) -> Self {
        Object::Integer(number)
    }
}

macro_rules! from_smaller_ints {
	($( $Int: ty )+) => {
		$(
			impl From<$Int> for Object {
				fn from(number: $Int) -> Self {
					Object::Integer(i64::from(number))
				}
			}
		)+
	}
}

from_smaller_ints! {
    i8 i16 i32
    u8 u16 u32
}

impl From<usize> for Object {
    fn from(number: usize) -> Self {
        Object::Integer(number as i64)
    }
}

impl From<f32> for Object {
    fn from(number: f32) -> Self {
        Object::Real(number)
    }
}

impl From<f64> for Object {
    fn from(number: f64) -> Self {
        Object::Real(number as f32)
    }
}

impl From<String> for Object {
    fn from(name: String) -> Self {
        Object::Name(name.into_bytes())
    }
}

impl<'a> From<&'a str> for Object {
    fn from(name: &'a str) -> Self {
        Object::Name(name.as_bytes().to_vec())
    }
}

impl From<Vec<Object>> for Object {
    fn from(array: Vec<Object>) -> Self {
        Object::Array(array)
    }
}

impl From<Dictionary> for Object {
    fn from(dict: Dictionary) -> Self {
        Object::Dictionary(dict)
    }
}

impl From<Stream> for Object {
    fn from(stream: Stream) -> Self {
        Object::Stream(stream)
    }
}

impl From<ObjectId> for Object {
    fn from(id: ObjectId) -> Self {
        Object::Reference(id)
    }
}

impl From<DateTime> for Object {
    fn from(date: DateTime) -> Self {
        Object::Date(date)
    }
}

impl PartialEq for Object {
    /// Strings compare by their bytes only; a date equals the string it serializes to.
    fn eq(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Real(a), Object::Real(b)) => a == b,
            (Object::Name(a), Object::Name(b)) => a == b,
            (Object::String(a, StringFormat::Text), Object::String(b, StringFormat::Text)) => a == b,
            (Object::String(text, StringFormat::Text), Object::String(bytes, _))
            | (Object::String(bytes, _), Object::String(text, StringFormat::Text)) => {
                str::from_utf8(text).map(encodings::encode_text).ok().as_deref() == Some(bytes.as_slice())
            }
            (Object::String(a, _), Object::String(b, _)) => a == b,
            (Object::Date(a), Object::Date(b)) => a == b,
            (Object::Date(date), Object::String(bytes, _)) | (Object::String(bytes, _), Object::Date(date)) => {
                date.to_string().as_bytes() == bytes.as_slice()
            }
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Dictionary(a), Object::Dictionary(b)) => a == b,
            (Object::Stream(a), Object::Stream(b)) => a == b,
            (Object::Reference(a), Object::Reference(b)) => a == b,
            (Object::Comment(a), Object::Comment(b)) => a == b,
            _ => false,
        }
    }
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    /// A text string; written as PDFDocEncoding when possible, UTF-16BE otherwise.
    pub fn text_string<S: Into<String>>(text: S) -> Self {
        Object::String(text.into().into_bytes(), StringFormat::Text)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(value) => Ok(*value),
            _ => Err(self.type_error("Boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(value) => Ok(*value),
            _ => Err(self.type_error("Integer")),
        }
    }

    /// Numeric value of an Integer or Real.
    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Object::Integer(value) => Ok(*value as f32),
            Object::Real(value) => Ok(*value),
            _ => Err(self.type_error("Real")),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(name) => Ok(name),
            _ => Err(self.type_error("Name")),
        }
    }

    pub fn as_name_str(&self) -> Result<&str> {
        Ok(str::from_utf8(self.as_name()?)?)
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(string, _) => Ok(string),
            _ => Err(self.type_error("String")),
        }
    }

    pub fn as_str_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Object::String(string, _) => Ok(string),
            _ => Err(self.type_error("String")),
        }
    }

    /// Decode a text string (PDFDocEncoding, UTF-16BE or UTF-8 with BOM).
    pub fn as_text(&self) -> Result<String> {
        match self {
            Object::String(text, StringFormat::Text) => Ok(String::from_utf8(text.clone())?),
            Object::String(bytes, _) => Ok(encodings::decode_text(bytes)),
            Object::Date(date) => Ok(date.to_string()),
            _ => Err(self.type_error("String")),
        }
    }

    /// A date value, either stored as such or parsed from a `D:` string.
    pub fn as_datetime(&self) -> Option<DateTime> {
        match self {
            Object::Date(date) => Some(*date),
            Object::String(bytes, _) => DateTime::parse(bytes).ok(),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            _ => Err(self.type_error("Reference")),
        }
    }

    pub fn as_array(&self) -> Result<&Vec<Object>> {
        match self {
            Object::Array(arr) => Ok(arr),
            _ => Err(self.type_error("Array")),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Object>> {
        match self {
            Object::Array(arr) => Ok(arr),
            _ => Err(self.type_error("Array")),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(self.type_error("Dictionary")),
        }
    }

    pub fn as_dict_mut(&mut self) -> Result<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Ok(dict),
            _ => Err(self.type_error("Dictionary")),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            _ => Err(self.type_error("Stream")),
        }
    }

    pub fn as_stream_mut(&mut self) -> Result<&mut Stream> {
        match self {
            Object::Stream(stream) => Ok(stream),
            _ => Err(self.type_error("Stream")),
        }
    }

    /// The dictionary of a dictionary or stream object.
    pub fn dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    pub fn dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&mut stream.dict),
            _ => None,
        }
    }

    pub fn type_name(&self) -> Result<&str> {
        match self.dict() {
            Some(dict) => dict.type_name(),
            None => Err(self.type_error("Dictionary")),
        }
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Date(_) => "Date",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
            Object::Comment(_) => "Comment",
        }
    }

    fn type_error(&self, expected: &'static str) -> Error {
        Error::ObjectType {
            expected,
            found: self.enum_variant(),
        }
    }

    /// Push every reference held directly or nested in this object.
    pub fn collect_references(&self, out: &mut Vec<ObjectId>) {
        match self {
            Object::Reference(id) => out.push(*id),
            Object::Array(array) => array.iter().for_each(|item| item.collect_references(out)),
            Object::Dictionary(dict) => dict.iter().for_each(|(_, value)| value.collect_references(out)),
            Object::Stream(stream) => stream.dict.iter().for_each(|(_, value)| value.collect_references(out)),
            _ => {}
        }
    }

    /// Call `f` for every reference held directly or nested in this object.
    pub fn visit_references_mut<F: FnMut(&mut ObjectId)>(&mut self, f: &mut F) {
        match self {
            Object::Reference(id) => f(id),
            Object::Array(array) => array.iter_mut().for_each(|item| item.visit_references_mut(f)),
            Object::Dictionary(dict) => dict.iter_mut().for_each(|(_, value)| value.visit_references_mut(f)),
            Object::Stream(stream) => stream
                .dict
                .iter_mut()
                .for_each(|(_, value)| value.visit_references_mut(f)),
            _ => {}
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => f.write_str("null"),
            Object::Boolean(value) => f.write_str(if *value { "true" } else { "false" }),
            Object::Integer(value) => write!(f, "{}", value),
            Object::Real(value) => write!(f, "{}", value),
            Object::Name(name) => write!(f, "/{}", String::from_utf8_lossy(name)),
            Object::String(text, StringFormat::Hexadecimal) => {
                f.write_str("<")?;
                for byte in text {
                    write!(f, "{:02X}", byte)?;
                }
                f.write_str(">")
            }
            Object::String(text, _) => write!(f, "({})", String::from_utf8_lossy(text)),
            Object::Date(date) => write!(f, "({})", date),
            Object::Array(array) => {
                let items = array.iter().map(|item| format!("{:?}", item)).collect::<Vec<String>>();
                write!(f, "[{}]", items.join(" "))
            }
            Object::Dictionary(dict) => write!(f, "{:?}", dict),
            Object::Stream(stream) => write!(f, "{:?}stream...endstream", stream.dict),
            Object::Reference(id) => write!(f, "{} {} R", id.0, id.1),
            Object::Comment(text) => write!(f, "%{}", String::from_utf8_lossy(text)),
        }
    }
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary(IndexMap::new())
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0
            .get(key)
            .ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key).into_owned()))
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Result<&mut Object> {
        self.0
            .get_mut(key)
            .ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key).into_owned()))
    }

    /// Insert or replace. A replaced key keeps its original position.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn type_name(&self) -> Result<&str> {
        self.get(b"Type")
            .and_then(Object::as_name_str)
            .or_else(|_| self.get(b"Linearized").and(Ok("Linearized")))
    }

    pub fn type_is(&self, type_name: &[u8]) -> bool {
        self.get(b"Type").and_then(Object::as_name).ok() == Some(type_name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.0.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Vec<u8>, Object> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, Vec<u8>, Object> {
        self.0.iter_mut()
    }

    /// Copy entries from `other` whose keys are missing here.
    pub fn extend_missing(&mut self, other: &Dictionary) {
        for (key, value) in other {
            if !self.has(key) {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }
}

#[macro_export]
macro_rules! dictionary {
	() => {
		$crate::Dictionary::new()
	};
	($( $key: expr => $value: expr ),+ ,) => {
		$crate::dictionary!( $($key => $value),+ )
	};
	($( $key: expr => $value: expr ),*) => {{
		let mut dict = $crate::Dictionary::new();
		$(
			dict.set($key, $value);
		)*
		dict
	}}
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self
            .into_iter()
            .map(|(key, value)| format!("/{} {:?}", String::from_utf8_lossy(key), value))
            .collect::<Vec<String>>();
        write!(f, "<<{}>>", entries.concat())
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Dictionary {
    type Item = (Vec<u8>, Object);
    type IntoIter = indexmap::map::IntoIter<Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, Object)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (k, v) in iter {
            dict.set(k, v);
        }
        dict
    }
}

impl PartialEq for Stream {
    /// Where the stream was read from does not take part in equality.
    fn eq(&self, other: &Stream) -> bool {
        self.dict == other.dict && self.content == other.content
    }
}

impl Stream {
    pub fn new(mut dict: Dictionary, content: Vec<u8>) -> Stream {
        dict.set("Length", content.len() as i64);
        Stream {
            dict,
            content,
            allows_compression: true,
            start_position: None,
        }
    }

    /// Default is that the stream may be compressed. On font streams,
    /// set this to false, otherwise the font will be corrupt
    #[inline]
    pub fn with_compression(mut self, allows_compression: bool) -> Stream {
        self.allows_compression = allows_compression;
        self
    }

    /// Filter names in decoding order; empty when the stream is unfiltered.
    pub fn filters(&self) -> Result<Vec<&[u8]>> {
        match self.dict.get(b"Filter") {
            Err(_) => Ok(vec![]),
            Ok(Object::Name(name)) => Ok(vec![name.as_slice()]),
            Ok(Object::Array(names)) => names.iter().map(Object::as_name).collect(),
            Ok(other) => Err(other.type_error("Name")),
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.dict.has(b"Filter")
    }

    pub fn set_content(&mut self, content: Vec<u8>) {
        self.content = content;
        self.dict.set("Length", self.content.len() as i64);
    }

    pub fn set_plain_content(&mut self, content: Vec<u8>) {
        self.dict.remove(b"DecodeParms");
        self.dict.remove(b"Filter");
        self.dict.set("Length", content.len() as i64);
        self.content = content;
    }

    /// Flate-compress the content if it is unfiltered and compression pays off.
    pub fn compress(&mut self, level: u32) -> Result<()> {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::prelude::*;

        if self.is_compressed() || !self.allows_compression {
            return Ok(());
        }
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
        encoder.write_all(self.content.as_slice())?;
        let compressed = encoder.finish()?;
        if compressed.len() + 19 < self.content.len() {
            self.dict.set("Filter", "FlateDecode");
            self.set_content(compressed);
        }
        Ok(())
    }

    /// Content with every filter in `/Filter` undone.
    pub fn decompressed_content(&self) -> Result<Vec<u8>> {
        let filters = self.filters()?;
        let params = self.dict.get(b"DecodeParms").ok();
        let mut output = self.content.clone();

        for (index, filter) in filters.iter().enumerate() {
            let filter_params = match params {
                Some(Object::Array(list)) => list.get(index).and_then(|p| p.as_dict().ok()),
                Some(Object::Dictionary(dict)) if index == 0 || filters.len() == 1 => Some(dict),
                _ => None,
            };
            output = match *filter {
                b"FlateDecode" | b"Fl" => Self::decompress_zlib(&output, filter_params)?,
                b"LZWDecode" | b"LZW" => Self::decompress_lzw(&output, filter_params)?,
                other => {
                    return Err(Error::Decompress(format!(
                        "unsupported filter {}",
                        String::from_utf8_lossy(other)
                    )));
                }
            };
        }

        Ok(output)
    }

    fn decompress_lzw(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        use weezl::{BitOrder, decode::Decoder};
        const MIN_BITS: u8 = 8;

        let early_change = params
            .and_then(|p| p.get(b"EarlyChange").ok())
            .and_then(|p| Object::as_i64(p).ok())
            .map(|v| v != 0)
            .unwrap_or(true);

        let mut decoder = if early_change {
            Decoder::with_tiff_size_switch(BitOrder::Msb, MIN_BITS)
        } else {
            Decoder::new(BitOrder::Msb, MIN_BITS)
        };
        let output = decoder
            .decode(input)
            .map_err(|err| Error::Decompress(err.to_string()))?;

        Self::decompress_predictor(output, params)
    }

    fn decompress_zlib(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        use flate2::read::ZlibDecoder;
        use std::io::prelude::*;

        let mut output = Vec::with_capacity(input.len() * 2);
        let mut decoder = ZlibDecoder::new(input);

        if !input.is_empty() {
            decoder.read_to_end(&mut output).unwrap_or_else(|err| {
                warn!("{}", err);
                0
            });
        }
        Self::decompress_predictor(output, params)
    }

    fn decompress_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
        use crate::filters::png;

        let Some(params) = params else {
            return Ok(data);
        };
        let predictor = params.get(b"Predictor").and_then(Object::as_i64).unwrap_or(1);
        match predictor {
            10..=15 => {
                let columns = params.get(b"Columns").and_then(Object::as_i64).unwrap_or(1) as usize;
                let colors = params.get(b"Colors").and_then(Object::as_i64).unwrap_or(1) as usize;
                let bits = params.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8) as usize;
                png::decode_frame(&data, colors, bits, columns)
            }
            1 => Ok(data),
            other => {
                warn!("predictor {} is not supported, leaving data as is", other);
                Ok(data)
            }
        }
    }

    /// Replace the content with its decoded form and drop the filters.
    pub fn decompress(&mut self) -> Result<()> {
        if self.is_compressed() {
            let data = self.decompressed_content()?;
            self.set_plain_content(data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_keeps_insertion_order() {
        let mut dict = dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => 90,
        };
        dict.set("Type", "Pages");
        dict.remove(b"MediaBox");
        dict.set("Count", 1);
        let keys: Vec<&[u8]> = dict.keys().map(Vec::as_slice).collect();
        assert_eq!(keys, vec![&b"Type"[..], b"Rotate", b"Count"]);
    }

    #[test]
    fn string_equality_ignores_format() {
        let literal = Object::string_literal("abc");
        let hex = Object::String(b"abc".to_vec(), StringFormat::Hexadecimal);
        assert_eq!(literal, hex);
        assert_eq!(Object::text_string("abc"), literal);
        assert_ne!(Object::Name(b"abc".to_vec()), literal);
    }

    #[test]
    fn stream_equality_ignores_position() {
        let mut a = Stream::new(dictionary! {}, b"q Q".to_vec());
        let b = a.clone();
        a.start_position = Some(42);
        assert_eq!(a, b);
    }

    #[test]
    fn type_errors_name_both_sides() {
        match Object::Integer(3).as_name() {
            Err(Error::ObjectType { expected, found }) => {
                assert_eq!(expected, "Name");
                assert_eq!(found, "Integer");
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn references_are_collected_recursively() {
        let object = Object::Array(vec![
            Object::Reference((1, 0)),
            Object::Dictionary(dictionary! { "A" => Object::Reference((2, 0)) }),
        ]);
        let mut refs = vec![];
        object.collect_references(&mut refs);
        assert_eq!(refs, vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn compress_then_decompress_restores_content() {
        let content = b"BT /F1 12 Tf 72 712 Td (Hello) Tj ET\n".repeat(20);
        let mut stream = Stream::new(dictionary! {}, content.clone());
        stream.compress(6).unwrap();
        assert!(stream.is_compressed());
        assert_eq!(stream.decompressed_content().unwrap(), content);
        stream.decompress().unwrap();
        assert!(!stream.dict.has(b"Filter"));
        assert_eq!(stream.dict.get(b"Length").unwrap().as_i64().unwrap(), content.len() as i64);
    }

    #[test]
    fn unknown_filter_is_reported() {
        let stream = Stream::new(dictionary! { "Filter" => "DCTDecode" }, vec![1, 2, 3]);
        assert!(matches!(stream.decompressed_content(), Err(Error::Decompress(_))));
    }
}
