//! Byte-level grammar pieces shared by the lexer, the object parser and the
//! cross-reference reader.

use crate::ObjectId;
use crate::xref::{Xref, XrefEntry, XrefType};
use std::str::{self, FromStr};

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{map, map_opt, map_res, not, opt, recognize, verify};
use nom::multi::{fold_many0, fold_many1, many0, many0_count};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsBytes, AsChar, IResult, Parser};
use nom_locate::LocatedSpan;

pub mod lexer;
pub mod object_parser;

pub(crate) type ParserInput<'a> = LocatedSpan<&'a [u8], &'a str>;
pub(crate) type NomError<'a> = nom::error::Error<ParserInput<'a>>;
pub(crate) type NomResult<'a, O, E = NomError<'a>> = IResult<ParserInput<'a>, O, E>;

/// Maximum nesting of parentheses inside a literal string.
pub const MAX_BRACKET: usize = 100;

#[inline]
fn strip_nom<O>(r: NomResult<O>) -> Option<O> {
    r.ok().map(|(_, o)| o)
}

pub(crate) fn span<'a>(bytes: &'a [u8], what: &'a str) -> ParserInput<'a> {
    LocatedSpan::new_extra(bytes, what)
}

pub(crate) fn eol(input: ParserInput) -> NomResult<ParserInput> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

/// A `%` comment up to (not including) the end of line; yields the text after `%`.
pub(crate) fn comment(input: ParserInput) -> NomResult<ParserInput> {
    preceded(tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c))).parse(input)
}

#[inline]
pub(crate) fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

#[inline]
pub(crate) fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

#[inline]
pub(crate) fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

#[inline]
fn is_direct_literal_string(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

fn white_space(input: ParserInput) -> NomResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

/// Whitespace and comments.
pub(crate) fn space(input: ParserInput) -> NomResult<()> {
    fold_many0(
        alt((map(take_while1(is_whitespace), |_| ()), map(comment, |_| ()))),
        || {},
        |_, _| (),
    )
    .parse(input)
}

fn parse_digits<T: FromStr>(digits: ParserInput) -> Result<T, ()> {
    str::from_utf8(digits.fragment())
        .map_err(|_| ())
        .and_then(|s| T::from_str(s).map_err(|_| ()))
}

pub(crate) fn integer(input: ParserInput) -> NomResult<i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), parse_digits::<i64>).parse(input)
}

pub(crate) fn real(input: ParserInput) -> NomResult<f32> {
    map_res(
        recognize(pair(
            opt(one_of("+-")),
            alt((
                map((digit1, tag(&b"."[..]), digit0), |_| ()),
                map(pair(tag(&b"."[..]), digit1), |_| ()),
            )),
        )),
        parse_digits::<f32>,
    )
    .parse(input)
}

pub(crate) fn unsigned_int<I: FromStr>(input: ParserInput) -> NomResult<I> {
    map_res(digit1, parse_digits::<I>).parse(input)
}

pub(crate) fn hex_char(input: ParserInput) -> NomResult<u8> {
    map_res(
        verify(take(2usize), |h: &ParserInput| h.as_bytes().iter().copied().all(AsChar::is_hex_digit)),
        |x: ParserInput| {
            str::from_utf8(x.fragment())
                .map_err(|_| ())
                .and_then(|s| u8::from_str_radix(s, 16).map_err(|_| ()))
        },
    )
    .parse(input)
}

fn oct_char(input: ParserInput) -> NomResult<u8> {
    map_res(take_while_m_n(1, 3, AsChar::is_oct_digit), |x: ParserInput| {
        // Overflow of three-digit octal escapes is ignored.
        str::from_utf8(x.fragment())
            .map_err(|_| ())
            .and_then(|s| u16::from_str_radix(s, 8).map(|o| o as u8).map_err(|_| ()))
    })
    .parse(input)
}

pub(crate) fn name(input: ParserInput) -> NomResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: ParserInput| {
                if c[0] != b'#' && is_regular(c[0]) { Some(c[0]) } else { None }
            }),
            // A lone '#' that is not followed by two hex digits is kept as is.
            map_opt(take(1usize), |c: ParserInput| if c[0] == b'#' { Some(b'#') } else { None }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: ParserInput) -> NomResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(b'\x08')),
            map(tag(&b"f"[..]), |_| Some(b'\x0C')),
            map(take(1usize), |c: ParserInput| Some(c[0])),
        )),
    )
    .parse(input)
}

enum InnerLiteralString<'a> {
    Direct(ParserInput<'a>),
    Escape(Option<u8>),
    Eol,
    Nested(Vec<u8>),
}

impl InnerLiteralString<'_> {
    fn push(&self, output: &mut Vec<u8>) {
        match self {
            InnerLiteralString::Direct(s) => output.extend_from_slice(s),
            InnerLiteralString::Escape(e) => output.extend(e),
            // Any end-of-line marker inside a literal string reads as a single LF.
            InnerLiteralString::Eol => output.push(b'\n'),
            InnerLiteralString::Nested(n) => output.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_string), InnerLiteralString::Direct),
                map(escape_sequence, InnerLiteralString::Escape),
                map(eol, |_| InnerLiteralString::Eol),
                map(nested_literal_string(depth), InnerLiteralString::Nested),
            )),
            Vec::new,
            |mut out: Vec<u8>, value| {
                value.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(ParserInput) -> NomResult<Vec<u8>> {
    move |input| {
        if depth == 0 {
            map(verify(tag(&b"too deep"[..]), |_| false), |_| vec![]).parse(input)
        } else {
            map(
                delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])),
                |mut content| {
                    content.insert(0, b'(');
                    content.push(b')');
                    content
                },
            )
            .parse(input)
        }
    }
}

pub(crate) fn literal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    delimited(tag(&b"("[..]), inner_literal_string(MAX_BRACKET), tag(&b")"[..])).parse(input)
}

#[inline]
fn hex_digit(input: ParserInput) -> NomResult<u8> {
    map_opt(take(1usize), |c: ParserInput| (c[0] as char).to_digit(16).map(|d| d as u8)).parse(input)
}

/// `<...>` with whitespace allowed between digits; an odd final digit is padded with 0.
pub(crate) fn hexadecimal_string(input: ParserInput) -> NomResult<Vec<u8>> {
    map(
        delimited(
            tag(&b"<"[..]),
            terminated(
                fold_many0(
                    preceded(white_space, hex_digit),
                    || -> (Vec<u8>, bool) { (Vec::new(), false) },
                    |(mut out, half), c| {
                        match out.last_mut() {
                            Some(last) if half => *last |= c,
                            _ => out.push(c << 4),
                        }
                        (out, !half)
                    },
                ),
                white_space,
            ),
            tag(&b">"[..]),
        ),
        |(bytes, _)| bytes,
    )
    .parse(input)
}

/// `N G obj`, possibly preceded by whitespace and comments.
pub(crate) fn object_header(input: ParserInput) -> NomResult<ObjectId> {
    delimited(
        space,
        pair(
            terminated(unsigned_int::<u32>, take_while1(is_whitespace)),
            terminated(unsigned_int::<u16>, space),
        ),
        terminated(
            tag(&b"obj"[..]),
            not(verify(take(1usize), |next: &ParserInput| is_regular(next[0]))),
        ),
    )
    .parse(input)
}

/// Version string following `%PDF-`.
pub fn header(input: &[u8]) -> Option<String> {
    strip_nom(
        map_res(
            preceded(tag(&b"%PDF-"[..]), take_while1(|c: u8| !is_whitespace(c) && c != b'%')),
            |v: ParserInput| str::from_utf8(v.fragment()).map(Into::into),
        )
        .parse(span(input, "header")),
    )
}

/// The comment line after the header, used to flag binary content.
pub fn binary_mark(input: &[u8]) -> Option<Vec<u8>> {
    strip_nom(
        preceded(
            (take_while(|c: u8| !b"\r\n".contains(&c)), eol),
            map(comment, |v: ParserInput| v.to_vec()),
        )
        .parse(span(input, "header")),
    )
}

/// A classic cross-reference table, starting at the `xref` keyword and
/// ending before `trailer`.
pub(crate) fn xref(input: ParserInput) -> NomResult<Xref> {
    let xref_eol = map(
        alt((tag(&b" \r\n"[..]), tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]), tag(&b"\n"[..]))),
        |_| (),
    );
    let xref_entry = pair(
        separated_pair(unsigned_int::<u32>, take_while1(|c| c == b' '), unsigned_int::<u32>),
        delimited(take_while1(|c| c == b' '), map(one_of("nf"), |k| k == 'n'), xref_eol),
    );

    let xref_section = pair(
        separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>),
        preceded(pair(take_while(|c| c == b' '), eol), many0(xref_entry)),
    );

    delimited(
        pair(tag(&b"xref"[..]), preceded(take_while(|c| c == b' '), eol)),
        fold_many1(
            preceded(white_space, xref_section),
            || Xref::new(0, XrefType::CrossReferenceTable),
            |mut xref, ((start, _count), entries)| {
                for (index, ((offset, generation), in_use)) in entries.into_iter().enumerate() {
                    let Ok(generation) = u16::try_from(generation) else {
                        continue;
                    };
                    let number = start + index as u32;
                    let entry = if in_use {
                        XrefEntry::Normal { offset, generation }
                    } else {
                        XrefEntry::Free { generation }
                    };
                    xref.insert(number, entry);
                }
                xref
            },
        ),
        space,
    )
    .parse(input)
}

/// The byte offset after `startxref`.
pub fn xref_start(input: &[u8]) -> Option<i64> {
    strip_nom(
        preceded(
            pair(tag(&b"startxref"[..]), space),
            terminated(integer, (take_while(|c| c == b' '), opt(eol), many0_count(eol), opt(tag(&b"%%EOF"[..])))),
        )
        .parse(span(input, "startxref")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_span(s: &'_ [u8]) -> ParserInput<'_> {
        LocatedSpan::new_extra(s, "test")
    }

    fn tstrip<O>(r: NomResult<O>) -> Option<O> {
        r.ok().and_then(|(i, o)| if !i.is_empty() { None } else { Some(o) })
    }

    #[test]
    fn parse_real_number() {
        let real = |i| tstrip(real(i));

        assert_eq!(real(test_span(b"0.12")), Some(0.12));
        assert_eq!(real(test_span(b"-.12")), Some(-0.12));
        assert_eq!(real(test_span(b"10.")), Some(10.0));
        assert_eq!(real(test_span(b"12")), None);
    }

    #[test]
    fn parse_string() {
        let literal_string = |i| tstrip(literal_string(i));

        let data = vec![
            ("()", ""),
            ("(text())", "text()"),
            ("(text\r\n\\\\(nested\\t\\b\\f))", "text\n\\(nested\t\x08\x0C)"),
            ("(text\\0\\53\\053\\0053)", "text\0++\x053"),
            ("(text line\\\n())", "text line()"),
        ];

        for (input, expected) in data {
            assert_eq!(
                literal_string(test_span(input.as_bytes())),
                Some(expected.as_bytes().to_vec()),
                "input: {:?} output: {:?}",
                input,
                expected,
            );
        }
    }

    #[test]
    fn parse_name() {
        let (text, expected) = (b"/ABC#5f", b"ABC\x5F");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));

        let (text, expected) = (b"/#cb#ce#cc#e5", b"\xcb\xce\xcc\xe5");
        let result = tstrip(name(test_span(text)));
        assert_eq!(result, Some(expected.to_vec()));

        assert_eq!(tstrip(name(test_span(b"/"))), Some(vec![]));
    }

    #[test]
    fn hex_partial() {
        // Example from PDF specification.
        assert_eq!(tstrip(hexadecimal_string(test_span(b"<901FA>"))), Some(b"\x90\x1F\xA0".to_vec()));
    }

    #[test]
    fn hex_separated() {
        assert_eq!(tstrip(hexadecimal_string(test_span(b"<9 01F A>"))), Some(b"\x90\x1F\xA0".to_vec()));
    }

    #[test]
    fn object_header_needs_keyword_boundary() {
        assert_eq!(tstrip(object_header(test_span(b"12 0 obj"))), Some((12, 0)));
        assert!(object_header(test_span(b"  7 3 obj<<>>")).is_ok());
        assert!(object_header(test_span(b"7 0 objects")).is_err());
        assert!(object_header(test_span(b"7 obj")).is_err());
    }

    #[test]
    fn big_generation_value() {
        let input = b"xref
0 1
0000000000 65536 f
0 16
0000000000 65535 f
0000153238 00000 n
0000000019 00000 n
0000000313 00000 n
0000000333 00000 n
0000145531 00000 n
0000153407 00000 n
0000145554 00000 n
0000152303 00000 n
0000152324 00000 n
0000152514 00000 n
0000152880 00000 n
0000153106 00000 n
0000153139 00000 n
0000153532 00000 n
0000153629 00000 n
trailer
<</Size 16/Root 14 0 R
>>
";
        let (rest, xref) = xref(test_span(input)).unwrap();
        assert!(rest.starts_with(b"trailer"));
        // Entry 0 is free with generation 65535, 1..=15 are in use.
        assert_eq!(xref.entries.len(), 16);
        assert_eq!(xref.get(0), Some(&XrefEntry::Free { generation: 65535 }));
        assert_eq!(
            xref.get(2),
            Some(&XrefEntry::Normal {
                offset: 19,
                generation: 0
            })
        );
    }

    #[test]
    fn space_in_startxref_number() {
        let input = b"startxref
153804
%%EOF
";
        assert_eq!(xref_start(input), Some(153804));
        assert_eq!(xref_start(b"startxref\r\n42\r\n%%EOF"), Some(42));
    }

    #[test]
    fn header_and_binary_mark() {
        let input = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n1 0 obj";
        assert_eq!(header(input).as_deref(), Some("1.7"));
        assert_eq!(binary_mark(input), Some(b"\xE2\xE3\xCF\xD3".to_vec()));
    }
}
