//! Builds objects from the token stream.
//!
//! Indirect references (`N G R`) are recognized with a bounded lookahead of
//! two tokens after an integer. Stream data is captured raw: the declared
//! `/Length` is trusted only when `endstream` follows it, otherwise the data
//! ends where the next `endstream` keyword starts.

use super::lexer::{Keyword, Lexer, Spanned, Token};
use crate::{Dictionary, Error, Object, ObjectId, Result, Stream, StringFormat};
use log::warn;
use std::collections::VecDeque;

/// Nesting limit for arrays and dictionaries.
pub const MAX_NESTING: usize = 256;

/// Looks up the value of an indirect `/Length` while a stream is being parsed.
pub trait LengthResolver {
    fn resolve_length(&self, id: ObjectId) -> Option<i64>;
}

/// Resolver for contexts where indirect lengths can't be followed.
pub struct NoLengthResolver;

impl LengthResolver for NoLengthResolver {
    fn resolve_length(&self, _id: ObjectId) -> Option<i64> {
        None
    }
}

pub struct ObjectParser<'a, 'r> {
    lexer: Lexer<'a>,
    peeked: VecDeque<Spanned>,
    resolver: &'r dyn LengthResolver,
    allow_references: bool,
}

impl<'a, 'r> ObjectParser<'a, 'r> {
    pub fn new(buffer: &'a [u8], position: usize, resolver: &'r dyn LengthResolver) -> ObjectParser<'a, 'r> {
        ObjectParser {
            lexer: Lexer::at(buffer, position),
            peeked: VecDeque::new(),
            resolver,
            allow_references: true,
        }
    }

    /// Parser for content streams: no indirect references, comments are kept.
    pub fn content(buffer: &'a [u8]) -> ObjectParser<'a, 'static> {
        ObjectParser {
            lexer: Lexer::new(buffer).keep_comments(true),
            peeked: VecDeque::new(),
            resolver: &NoLengthResolver,
            allow_references: false,
        }
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.lexer.buffer()
    }

    /// Offset of the next unconsumed token (or of the lexer when nothing is buffered).
    pub fn position(&self) -> usize {
        self.peeked.front().map_or(self.lexer.position(), |t| t.start)
    }

    /// Move to `position`, discarding any lookahead.
    pub fn seek(&mut self, position: usize) {
        self.peeked.clear();
        self.lexer.seek(position);
    }

    fn fill(&mut self, count: usize) -> Result<()> {
        while self.peeked.len() < count {
            match self.lexer.next_token()? {
                Some(token) => self.peeked.push_back(token),
                None => break,
            }
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<Option<Spanned>> {
        match self.peeked.pop_front() {
            Some(token) => Ok(Some(token)),
            None => self.lexer.next_token(),
        }
    }

    pub fn peek(&mut self) -> Result<Option<&Token>> {
        self.fill(1)?;
        Ok(self.peeked.front().map(|t| &t.token))
    }

    fn expect_next(&mut self, what: &str) -> Result<Spanned> {
        let position = self.position();
        self.next()?
            .ok_or_else(|| Error::syntax(position, format!("unexpected end of input, expected {}", what)))
    }

    /// Parse one value (no stream).
    pub fn parse_value(&mut self) -> Result<Object> {
        let first = self.expect_next("a value")?;
        self.parse_value_from(first, 0)
    }

    pub(crate) fn parse_value_from(&mut self, first: Spanned, depth: usize) -> Result<Object> {
        if depth > MAX_NESTING {
            return Err(Error::syntax(first.start, "arrays or dictionaries nested too deeply"));
        }
        match first.token {
            Token::Integer(number) => {
                if let Some(generation) = self.reference_after(number)? {
                    return Ok(Object::Reference((number as u32, generation)));
                }
                Ok(Object::Integer(number))
            }
            Token::Real(number) => Ok(Object::Real(number)),
            Token::LiteralString(text) => Ok(Object::String(text, StringFormat::Literal)),
            Token::HexString(bytes) => Ok(Object::String(bytes, StringFormat::Hexadecimal)),
            Token::Name(name) => Ok(Object::Name(name)),
            Token::Keyword(Keyword::True) => Ok(Object::Boolean(true)),
            Token::Keyword(Keyword::False) => Ok(Object::Boolean(false)),
            Token::Keyword(Keyword::Null) => Ok(Object::Null),
            Token::ArrayStart => self.parse_array(first.start, depth),
            Token::DictStart => self.parse_dictionary(first.start, depth).map(Object::Dictionary),
            Token::Comment(text) => Ok(Object::Comment(text)),
            other => Err(Error::syntax(first.start, format!("unexpected token {}", other))),
        }
    }

    /// After an integer, check whether `G R` follows and consume it if so.
    fn reference_after(&mut self, number: i64) -> Result<Option<u16>> {
        if !self.allow_references || number < 0 || number > i64::from(u32::MAX) {
            return Ok(None);
        }
        self.fill(1)?;
        let generation = match self.peeked.front().map(|t| &t.token) {
            Some(Token::Integer(generation)) => match u16::try_from(*generation) {
                Ok(generation) => generation,
                Err(_) => return Ok(None),
            },
            _ => return Ok(None),
        };
        self.fill(2)?;
        if let Some(Token::Keyword(Keyword::R)) = self.peeked.get(1).map(|t| &t.token) {
            self.peeked.pop_front();
            self.peeked.pop_front();
            return Ok(Some(generation));
        }
        Ok(None)
    }

    fn parse_array(&mut self, start: usize, depth: usize) -> Result<Object> {
        let mut array = Vec::new();
        loop {
            let token = self
                .next()?
                .ok_or_else(|| Error::syntax(start, "unbalanced array delimiter"))?;
            match token.token {
                Token::ArrayEnd => return Ok(Object::Array(array)),
                Token::DictEnd => return Err(Error::syntax(token.start, "'>>' inside an array")),
                _ => array.push(self.parse_value_from(token, depth + 1)?),
            }
        }
    }

    pub(crate) fn parse_dictionary(&mut self, start: usize, depth: usize) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let token = self
                .next()?
                .ok_or_else(|| Error::syntax(start, "unbalanced dictionary delimiter"))?;
            match token.token {
                Token::DictEnd => return Ok(dict),
                Token::Name(key) => {
                    let value_token = self.expect_next("a dictionary value")?;
                    if value_token.token == Token::DictEnd {
                        warn!("dictionary key /{} at byte {} has no value", String::from_utf8_lossy(&key), token.start);
                        return Ok(dict);
                    }
                    let value = self.parse_value_from(value_token, depth + 1)?;
                    dict.set(key, value);
                }
                Token::Comment(_) => {}
                other => return Err(Error::syntax(token.start, format!("expected a name key, found {}", other))),
            }
        }
    }

    /// A value, followed by stream data when the value is a dictionary and
    /// the `stream` keyword comes next.
    pub fn parse_object(&mut self) -> Result<Object> {
        let first = self.expect_next("an object")?;
        let value = self.parse_value_from(first, 0)?;
        let Object::Dictionary(dict) = value else {
            return Ok(value);
        };
        match self.peek()? {
            Some(Token::Keyword(Keyword::Stream)) => {}
            _ => return Ok(Object::Dictionary(dict)),
        }
        let keyword = self.expect_next("stream")?;
        self.parse_stream_body(dict, keyword.end).map(Object::Stream)
    }

    fn parse_stream_body(&mut self, dict: Dictionary, keyword_end: usize) -> Result<Stream> {
        let buffer = self.buffer();
        let mut start = keyword_end;
        // The keyword is followed by CRLF or LF; a lone CR is tolerated.
        if buffer[start..].starts_with(b"\r\n") {
            start += 2;
        } else if matches!(buffer.get(start), Some(b'\n' | b'\r')) {
            start += 1;
        }

        let declared = match dict.get(b"Length") {
            Ok(Object::Integer(length)) => Some(*length),
            Ok(Object::Reference(id)) => self.resolver.resolve_length(*id),
            _ => None,
        };
        let verified = declared
            .and_then(|length| usize::try_from(length).ok())
            .filter(|&length| start + length <= buffer.len() && endstream_follows(buffer, start + length));

        let length = match verified {
            Some(length) => length,
            None => {
                let length = scan_for_endstream(buffer, start)
                    .ok_or_else(|| Error::syntax(keyword_end, "stream data is not terminated by endstream"))?;
                warn!(
                    "stream at byte {} declares length {:?}, using {} found by scanning for endstream",
                    start, declared, length
                );
                length
            }
        };

        self.seek(start + length);
        match self.next()? {
            Some(Spanned {
                token: Token::Keyword(Keyword::EndStream),
                ..
            }) => {}
            _ => return Err(Error::syntax(start + length, "missing endstream")),
        }

        Ok(Stream {
            dict,
            content: buffer[start..start + length].to_vec(),
            allows_compression: true,
            start_position: Some(start),
        })
    }

    /// `N G obj <object> endobj`. With `expected`, the header must match it.
    pub fn parse_indirect_object(&mut self, expected: Option<ObjectId>) -> Result<(ObjectId, Object)> {
        let offset = self.position();
        let id = self.parse_object_header(offset)?;
        if let Some(expected) = expected {
            if id != expected {
                return Err(Error::ObjectIdMismatch { expected, found: id });
            }
        }

        let object = self.parse_object()?;
        match self.next()? {
            Some(Spanned {
                token: Token::Keyword(Keyword::EndObj),
                ..
            }) => Ok((id, object)),
            Some(other) => Err(Error::syntax(other.start, format!("expected endobj, found {}", other.token))),
            None => Err(Error::syntax(self.position(), "missing endobj")),
        }
    }

    fn parse_object_header(&mut self, offset: usize) -> Result<ObjectId> {
        let header = (self.next()?, self.next()?, self.next()?);
        match header {
            (
                Some(Spanned {
                    token: Token::Integer(number),
                    ..
                }),
                Some(Spanned {
                    token: Token::Integer(generation),
                    ..
                }),
                Some(Spanned {
                    token: Token::Keyword(Keyword::Obj),
                    ..
                }),
            ) => {
                let number = u32::try_from(number).map_err(|_| Error::IndirectObject { offset })?;
                let generation = u16::try_from(generation).map_err(|_| Error::IndirectObject { offset })?;
                Ok((number, generation))
            }
            _ => Err(Error::IndirectObject { offset }),
        }
    }
}

fn endstream_follows(buffer: &[u8], position: usize) -> bool {
    let rest = &buffer[position..];
    let skipped = rest.iter().take_while(|&&c| super::is_whitespace(c)).count();
    rest[skipped..].starts_with(b"endstream")
}

/// Length of the data before the next `endstream`, excluding the EOL marker preceding it.
fn scan_for_endstream(buffer: &[u8], start: usize) -> Option<usize> {
    let found = buffer[start..].windows(9).position(|window| window == b"endstream")?;
    let data = &buffer[start..start + found];
    let trimmed = if data.ends_with(b"\r\n") {
        found - 2
    } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
        found - 1
    } else {
        found
    };
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Result<Object> {
        ObjectParser::new(input, 0, &NoLengthResolver).parse_object()
    }

    struct FixedLength(ObjectId, i64);

    impl LengthResolver for FixedLength {
        fn resolve_length(&self, id: ObjectId) -> Option<i64> {
            (id == self.0).then_some(self.1)
        }
    }

    #[test]
    fn references_need_the_r_keyword() {
        assert_eq!(
            parse(b"[1 0 R 2 3 4]").unwrap(),
            Object::Array(vec![
                Object::Reference((1, 0)),
                Object::Integer(2),
                Object::Integer(3),
                Object::Integer(4)
            ])
        );
        assert_eq!(
            parse(b"<</A 5 0 R/B 6>>").unwrap(),
            Object::Dictionary(dictionary! { "A" => Object::Reference((5, 0)), "B" => 6 })
        );
    }

    #[test]
    fn stream_with_direct_length() {
        let object = parse(b"<</Length 5>>\nstream\r\nhello\nendstream").unwrap();
        let stream = object.as_stream().unwrap();
        assert_eq!(stream.content, b"hello");
        assert_eq!(stream.start_position, Some(22));
    }

    #[test]
    fn stream_with_indirect_length() {
        let input = b"<</Length 9 0 R>>stream\nab endstream cd\nendstream";
        let resolver = FixedLength((9, 0), 15);
        let object = ObjectParser::new(input, 0, &resolver).parse_object().unwrap();
        assert_eq!(object.as_stream().unwrap().content, b"ab endstream cd");
    }

    #[test]
    fn wrong_length_falls_back_to_scanning() {
        let object = parse(b"<</Length 100>>stream\nabc\r\nendstream").unwrap();
        assert_eq!(object.as_stream().unwrap().content, b"abc");

        let object = parse(b"<</Length 1>>stream\nabc\nendstream").unwrap();
        assert_eq!(object.as_stream().unwrap().content, b"abc");
    }

    #[test]
    fn unresolvable_length_is_scanned() {
        let object = parse(b"<</Length 3 0 R>>stream\nxyz\nendstream").unwrap();
        assert_eq!(object.as_stream().unwrap().content, b"xyz");
    }

    #[test]
    fn missing_endstream_is_a_syntax_error() {
        assert!(matches!(parse(b"<<>>stream\nabc"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn indirect_object_checks_id_and_endobj() {
        let input = b"12 0 obj\n(text)\nendobj";
        let mut parser = ObjectParser::new(input, 0, &NoLengthResolver);
        assert_eq!(
            parser.parse_indirect_object(Some((12, 0))).unwrap(),
            ((12, 0), Object::string_literal("text"))
        );

        let mut parser = ObjectParser::new(input, 0, &NoLengthResolver);
        assert!(matches!(
            parser.parse_indirect_object(Some((13, 0))),
            Err(Error::ObjectIdMismatch { .. })
        ));

        let mut parser = ObjectParser::new(b"1 0 obj 42 2 0 obj", 0, &NoLengthResolver);
        assert!(matches!(parser.parse_indirect_object(None), Err(Error::Syntax { .. })));
    }

    #[test]
    fn unbalanced_delimiters() {
        assert!(matches!(parse(b"[1 2"), Err(Error::Syntax { .. })));
        assert!(matches!(parse(b"<</A 1"), Err(Error::Syntax { .. })));
        assert!(matches!(parse(b"<</A 1 ]"), Err(Error::Syntax { .. })));
    }

    #[test]
    fn nesting_limit() {
        let mut input = vec![b'['; MAX_NESTING + 2];
        input.extend(vec![b']'; MAX_NESTING + 2]);
        assert!(matches!(parse(&input), Err(Error::Syntax { .. })));
    }
}
