//! Splits a byte buffer into PDF tokens.
//!
//! The lexer is positioned on an absolute offset of the buffer and can be
//! moved with [`Lexer::seek`], which lets the object parser skip over raw
//! stream data and restart tokenizing behind it.

use super::{
    ParserInput, comment, hexadecimal_string, integer, is_regular, is_whitespace, literal_string, name, real, span,
};
use crate::{Error, Result};
use nom::Input;
use nom::bytes::complete::take_while1;
use nom::Parser;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Obj,
    EndObj,
    Stream,
    EndStream,
    R,
    True,
    False,
    Null,
    Xref,
    Trailer,
    StartXref,
    /// Any other run of regular characters, e.g. a content stream operator.
    Other(Vec<u8>),
}

impl Keyword {
    fn from_bytes(bytes: &[u8]) -> Keyword {
        match bytes {
            b"obj" => Keyword::Obj,
            b"endobj" => Keyword::EndObj,
            b"stream" => Keyword::Stream,
            b"endstream" => Keyword::EndStream,
            b"R" => Keyword::R,
            b"true" => Keyword::True,
            b"false" => Keyword::False,
            b"null" => Keyword::Null,
            b"xref" => Keyword::Xref,
            b"trailer" => Keyword::Trailer,
            b"startxref" => Keyword::StartXref,
            other => Keyword::Other(other.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Keyword::Obj => b"obj",
            Keyword::EndObj => b"endobj",
            Keyword::Stream => b"stream",
            Keyword::EndStream => b"endstream",
            Keyword::R => b"R",
            Keyword::True => b"true",
            Keyword::False => b"false",
            Keyword::Null => b"null",
            Keyword::Xref => b"xref",
            Keyword::Trailer => b"trailer",
            Keyword::StartXref => b"startxref",
            Keyword::Other(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f32),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    Name(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Keyword(Keyword),
    /// Only produced when comments are kept, see [`Lexer::keep_comments`].
    Comment(Vec<u8>),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Integer(n) => write!(f, "{}", n),
            Token::Real(n) => write!(f, "{}", n),
            Token::LiteralString(_) => f.write_str("literal string"),
            Token::HexString(_) => f.write_str("hexadecimal string"),
            Token::Name(name) => write!(f, "/{}", String::from_utf8_lossy(name)),
            Token::ArrayStart => f.write_str("["),
            Token::ArrayEnd => f.write_str("]"),
            Token::DictStart => f.write_str("<<"),
            Token::DictEnd => f.write_str(">>"),
            Token::Keyword(keyword) => f.write_str(&String::from_utf8_lossy(keyword.as_bytes())),
            Token::Comment(_) => f.write_str("comment"),
        }
    }
}

/// A token together with the byte range it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub start: usize,
    pub end: usize,
}

pub struct Lexer<'a> {
    input: ParserInput<'a>,
    position: usize,
    keep_comments: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(buffer: &'a [u8]) -> Lexer<'a> {
        Lexer::at(buffer, 0)
    }

    pub fn at(buffer: &'a [u8], position: usize) -> Lexer<'a> {
        Lexer {
            input: span(buffer, "lexer"),
            position: position.min(buffer.len()),
            keep_comments: false,
        }
    }

    /// Report comments as tokens instead of skipping them like whitespace.
    pub fn keep_comments(mut self, keep: bool) -> Lexer<'a> {
        self.keep_comments = keep;
        self
    }

    pub fn buffer(&self) -> &'a [u8] {
        *self.input.fragment()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.buffer().len());
    }

    /// Advance past whitespace (and comments, unless they are kept).
    pub fn skip_whitespace(&mut self) {
        let buffer = self.buffer();
        while let Some(&c) = buffer.get(self.position) {
            if is_whitespace(c) {
                self.position += 1;
            } else if c == b'%' && !self.keep_comments {
                while let Some(&c) = buffer.get(self.position) {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.position += 1;
                }
            } else {
                break;
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Spanned>> {
        self.skip_whitespace();
        let start = self.position;
        let buffer = self.buffer();
        let Some(&first) = buffer.get(start) else {
            return Ok(None);
        };
        let input = self.input.take_from(start);

        let (token, end) = match first {
            b'(' => {
                let (rest, text) = literal_string(input).map_err(|_| Error::syntax(start, "unterminated literal string"))?;
                (Token::LiteralString(text), rest.location_offset())
            }
            b'<' if buffer.get(start + 1) == Some(&b'<') => (Token::DictStart, start + 2),
            b'<' => {
                let (rest, bytes) =
                    hexadecimal_string(input).map_err(|_| Error::syntax(start, "invalid hexadecimal string"))?;
                (Token::HexString(bytes), rest.location_offset())
            }
            b'>' if buffer.get(start + 1) == Some(&b'>') => (Token::DictEnd, start + 2),
            b'>' => return Err(Error::syntax(start, "unexpected '>'")),
            b')' => return Err(Error::syntax(start, "unbalanced ')'")),
            b'[' => (Token::ArrayStart, start + 1),
            b']' => (Token::ArrayEnd, start + 1),
            b'{' | b'}' => (Token::Keyword(Keyword::Other(vec![first])), start + 1),
            b'/' => {
                let (rest, name) = name(input).map_err(|_| Error::syntax(start, "invalid name"))?;
                (Token::Name(name), rest.location_offset())
            }
            b'%' => {
                let (rest, text) = comment(input).map_err(|_| Error::syntax(start, "invalid comment"))?;
                (Token::Comment(text.to_vec()), rest.location_offset())
            }
            b'0'..=b'9' | b'+' | b'-' | b'.' => match Self::number(input) {
                Some((token, end)) => (token, end),
                None => Self::keyword(input, start)?,
            },
            _ => Self::keyword(input, start)?,
        };

        self.position = end;
        Ok(Some(Spanned { token, start, end }))
    }

    /// A number must be followed by a delimiter, whitespace or the end of input.
    fn number(input: ParserInput<'a>) -> Option<(Token, usize)> {
        let boundary = |rest: ParserInput<'a>| rest.fragment().first().is_none_or(|&c| !is_regular(c));
        if let Ok((rest, value)) = real(input) {
            if boundary(rest) {
                return Some((Token::Real(value), rest.location_offset()));
            }
        }
        if let Ok((rest, value)) = integer(input) {
            if boundary(rest) {
                return Some((Token::Integer(value), rest.location_offset()));
            }
        }
        None
    }

    fn keyword(input: ParserInput<'a>, start: usize) -> Result<(Token, usize)> {
        let (rest, word) = take_while1::<_, _, nom::error::Error<_>>(is_regular)
            .parse(input)
            .map_err(|_| Error::syntax(start, "unexpected character"))?;
        Ok((Token::Keyword(Keyword::from_bytes(word.fragment())), rest.location_offset()))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Spanned>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &[u8]) -> Vec<Token> {
        Lexer::new(input).map(|t| t.unwrap().token).collect()
    }

    #[test]
    fn tokenize_dictionary() {
        assert_eq!(
            tokens(b"<</Type /Page /Count 3 /Scale -.5 /Kids [4 0 R]>>"),
            vec![
                Token::DictStart,
                Token::Name(b"Type".to_vec()),
                Token::Name(b"Page".to_vec()),
                Token::Name(b"Count".to_vec()),
                Token::Integer(3),
                Token::Name(b"Scale".to_vec()),
                Token::Real(-0.5),
                Token::Name(b"Kids".to_vec()),
                Token::ArrayStart,
                Token::Integer(4),
                Token::Integer(0),
                Token::Keyword(Keyword::R),
                Token::ArrayEnd,
                Token::DictEnd,
            ]
        );
    }

    #[test]
    fn strings_and_keywords() {
        assert_eq!(
            tokens(b"(a\\)b) <414> true null endobj"),
            vec![
                Token::LiteralString(b"a)b".to_vec()),
                Token::HexString(b"A@".to_vec()),
                Token::Keyword(Keyword::True),
                Token::Keyword(Keyword::Null),
                Token::Keyword(Keyword::EndObj),
            ]
        );
    }

    #[test]
    fn comments_are_skipped_unless_kept() {
        let input = b"1 % one\n2";
        assert_eq!(tokens(input), vec![Token::Integer(1), Token::Integer(2)]);

        let kept: Vec<Token> = Lexer::new(input).keep_comments(true).map(|t| t.unwrap().token).collect();
        assert_eq!(kept, vec![Token::Integer(1), Token::Comment(b" one".to_vec()), Token::Integer(2)]);
    }

    #[test]
    fn spans_are_absolute() {
        let mut lexer = Lexer::at(b"xxxx  stream\r\ndata", 4);
        let token = lexer.next_token().unwrap().unwrap();
        assert_eq!(token.token, Token::Keyword(Keyword::Stream));
        assert_eq!((token.start, token.end), (6, 12));
    }

    #[test]
    fn malformed_number_is_a_keyword() {
        assert_eq!(tokens(b"12abc"), vec![Token::Keyword(Keyword::Other(b"12abc".to_vec()))]);
        assert_eq!(tokens(b"T*"), vec![Token::Keyword(Keyword::Other(b"T*".to_vec()))]);
    }

    #[test]
    fn unterminated_string_reports_offset() {
        match Lexer::at(b"  (abc", 0).next_token() {
            Err(Error::Syntax { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
