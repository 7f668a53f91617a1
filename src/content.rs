use crate::parser::lexer::{Keyword, Spanned, Token};
use crate::parser::object_parser::ObjectParser;
use crate::writer::Writer;
use crate::{Dictionary, Error, Object, Result, Stream};
use log::warn;
use std::io::Write;

/// One content stream instruction; operands precede the operator in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: &str, operands: Vec<Object>) -> Operation {
        Operation {
            operator: operator.to_string(),
            operands,
        }
    }

    /// A comment line; kept so that rewritten content stays faithful.
    pub fn comment<T: Into<Vec<u8>>>(text: T) -> Operation {
        Operation::new("%", vec![Object::Comment(text.into())])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    pub operations: Vec<Operation>,
}

impl Content {
    /// Encode content operations.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        for operation in &self.operations {
            match operation.operator.as_str() {
                "%" => {
                    for operand in &operation.operands {
                        Writer::write_object(&mut buffer, operand)?;
                    }
                }
                "BI" => Self::encode_inline_image(&mut buffer, operation)?,
                operator => {
                    for operand in &operation.operands {
                        Writer::write_object(&mut buffer, operand)?;
                        buffer.write_all(b" ")?;
                    }
                    buffer.write_all(operator.as_bytes())?;
                }
            }
            buffer.write_all(b"\n")?;
        }
        Ok(buffer)
    }

    fn encode_inline_image(buffer: &mut Vec<u8>, operation: &Operation) -> Result<()> {
        let Some(Object::Stream(image)) = operation.operands.first() else {
            return Err(Error::ObjectType {
                expected: "Stream",
                found: operation.operands.first().map_or("Null", Object::enum_variant),
            });
        };
        buffer.write_all(b"BI")?;
        for (key, value) in &image.dict {
            buffer.write_all(b" ")?;
            Writer::write_object(buffer, &Object::Name(key.clone()))?;
            buffer.write_all(b" ")?;
            Writer::write_object(buffer, value)?;
        }
        buffer.write_all(b" ID ")?;
        buffer.write_all(&image.content)?;
        buffer.write_all(b"\nEI")?;
        Ok(())
    }

    /// Decode content operations.
    pub fn decode(data: &[u8]) -> Result<Content> {
        let mut parser = ObjectParser::content(data);
        let mut operations = Vec::new();
        let mut operands = Vec::new();

        while let Some(token) = parser.next()? {
            match token.token {
                Token::Comment(text) => operations.push(Operation::comment(text)),
                Token::Keyword(Keyword::True | Keyword::False | Keyword::Null) => {
                    operands.push(parser.parse_value_from(token, 0)?);
                }
                Token::Keyword(Keyword::Other(ref operator)) if operator == b"BI" => {
                    if !operands.is_empty() {
                        warn!("dropping {} operands before inline image at byte {}", operands.len(), token.start);
                        operands.clear();
                    }
                    operations.push(decode_inline_image(&mut parser, token.start)?);
                }
                Token::Keyword(keyword) => {
                    let operator = String::from_utf8_lossy(keyword.as_bytes()).into_owned();
                    operations.push(Operation {
                        operator,
                        operands: std::mem::take(&mut operands),
                    });
                }
                _ => operands.push(parser.parse_value_from(token, 0)?),
            }
        }

        if !operands.is_empty() {
            warn!("content ends with {} operands but no operator", operands.len());
        }
        Ok(Content { operations })
    }
}

/// `BI <key value ...> ID <data> EI` becomes a "BI" operation with the image as a stream operand.
fn decode_inline_image(parser: &mut ObjectParser, start: usize) -> Result<Operation> {
    let mut dict = Dictionary::new();
    let data_start = loop {
        let token = parser
            .next()?
            .ok_or_else(|| Error::syntax(start, "inline image without ID"))?;
        match token.token {
            Token::Keyword(Keyword::Other(ref word)) if word == b"ID" => break token.end + 1,
            Token::Name(key) => {
                let value = parser
                    .next()?
                    .ok_or_else(|| Error::syntax(start, "inline image dictionary is truncated"))?;
                dict.set(key, parser.parse_value_from(value, 1)?);
            }
            Token::Comment(_) => {}
            other => return Err(Error::syntax(token.start, format!("unexpected {} in inline image", other))),
        }
    };

    let buffer = parser.buffer();
    let data_start = data_start.min(buffer.len());
    let data_end = declared_image_length(&dict)
        .and_then(|length| data_start.checked_add(length))
        .filter(|&end| end <= buffer.len() && ei_follows(buffer, end))
        .or_else(|| scan_for_ei(buffer, data_start))
        .ok_or_else(|| Error::syntax(data_start, "inline image data is not terminated by EI"))?;

    parser.seek(data_end);
    match parser.next()? {
        Some(Spanned {
            token: Token::Keyword(Keyword::Other(ref word)),
            ..
        }) if word == b"EI" => {}
        _ => return Err(Error::syntax(data_end, "missing EI")),
    }

    let mut image = Stream::new(dict, buffer[data_start..data_end].to_vec());
    image.dict.remove(b"Length");
    image.allows_compression = false;
    Ok(Operation::new("BI", vec![Object::Stream(image)]))
}

/// Byte size of unfiltered image data as given by the image dictionary.
fn declared_image_length(dict: &Dictionary) -> Option<usize> {
    let get = |short: &[u8], long: &[u8]| dict.get(short).or_else(|_| dict.get(long)).ok();
    if get(b"F", b"Filter").is_some() {
        return None;
    }
    let width = get(b"W", b"Width")?.as_i64().ok()?;
    let height = get(b"H", b"Height")?.as_i64().ok()?;
    let image_mask = get(b"IM", b"ImageMask").and_then(|v| v.as_bool().ok()).unwrap_or(false);
    let bits = if image_mask {
        1
    } else {
        get(b"BPC", b"BitsPerComponent")?.as_i64().ok()?
    };
    let colors = if image_mask {
        1
    } else {
        match get(b"CS", b"ColorSpace")?.as_name().ok()? {
            b"DeviceGray" | b"G" | b"Indexed" | b"I" => 1,
            b"DeviceRGB" | b"RGB" => 3,
            b"DeviceCMYK" | b"CMYK" => 4,
            _ => return None,
        }
    };
    let bits_per_row = width.checked_mul(colors)?.checked_mul(bits)?;
    let stride = usize::try_from(bits_per_row).ok()?.div_ceil(8);
    stride.checked_mul(usize::try_from(height).ok()?)
}

fn ei_follows(buffer: &[u8], position: usize) -> bool {
    let rest = &buffer[position..];
    let skipped = rest.iter().take_while(|c| c.is_ascii_whitespace()).count();
    rest[skipped..].starts_with(b"EI") && rest.get(skipped + 2).is_none_or(|c| c.is_ascii_whitespace())
}

/// First `EI` with whitespace on both sides; the whitespace before it is not image data.
fn scan_for_ei(buffer: &[u8], start: usize) -> Option<usize> {
    (start..buffer.len().saturating_sub(1)).find_map(|i| {
        let preceded = i > start && buffer[i - 1].is_ascii_whitespace();
        let followed = buffer.get(i + 2).is_none_or(|c| c.is_ascii_whitespace());
        (preceded && followed && &buffer[i..i + 2] == b"EI").then_some(i - 1)
    })
}

impl Stream {
    /// Decode content after decoding all stream filters.
    pub fn decode_content(&self) -> Result<Content> {
        Content::decode(&self.decompressed_content()?)
    }
}
