//! Text string encodings: PDFDocEncoding, UTF-16BE and UTF-8 (with BOM).

use encoding_rs::{UTF_16BE, UTF_8};

const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// PDFDocEncoding code points that differ from Latin-1, for bytes 0x18..=0x1F.
const PDF_DOC_LOW: [char; 8] = [
    '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
];

/// PDFDocEncoding code points for bytes 0x80..=0xA0. 0x9F is undefined.
const PDF_DOC_HIGH: [Option<char>; 33] = [
    Some('\u{2022}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{2026}'),
    Some('\u{2014}'),
    Some('\u{2013}'),
    Some('\u{0192}'),
    Some('\u{2044}'),
    Some('\u{2039}'),
    Some('\u{203A}'),
    Some('\u{2212}'),
    Some('\u{2030}'),
    Some('\u{201E}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201A}'),
    Some('\u{2122}'),
    Some('\u{FB01}'),
    Some('\u{FB02}'),
    Some('\u{0141}'),
    Some('\u{0152}'),
    Some('\u{0160}'),
    Some('\u{0178}'),
    Some('\u{017D}'),
    Some('\u{0131}'),
    Some('\u{0142}'),
    Some('\u{0153}'),
    Some('\u{0161}'),
    Some('\u{017E}'),
    None,
    Some('\u{20AC}'),
];

fn pdf_doc_char(byte: u8) -> Option<char> {
    match byte {
        0x18..=0x1F => Some(PDF_DOC_LOW[usize::from(byte - 0x18)]),
        0x80..=0xA0 => PDF_DOC_HIGH[usize::from(byte - 0x80)],
        0xAD => None,
        _ => Some(char::from(byte)),
    }
}

fn pdf_doc_byte(ch: char) -> Option<u8> {
    let code = u32::from(ch);
    match code {
        0x00..=0x17 | 0x20..=0x7F | 0xA1..=0xAC | 0xAE..=0xFF => Some(code as u8),
        _ => PDF_DOC_LOW
            .iter()
            .position(|&c| c == ch)
            .map(|i| 0x18 + i as u8)
            .or_else(|| PDF_DOC_HIGH.iter().position(|&c| c == Some(ch)).map(|i| 0x80 + i as u8)),
    }
}

/// Decode a PDF text string to UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF16_BOM) {
        UTF_16BE.decode_without_bom_handling(rest).0.into_owned()
    } else if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        UTF_8.decode_without_bom_handling(rest).0.into_owned()
    } else {
        bytes
            .iter()
            .map(|&byte| pdf_doc_char(byte).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// PDFDocEncoding bytes of `text`, or `None` if a character has no code.
pub fn encode_pdf_doc(text: &str) -> Option<Vec<u8>> {
    text.chars().map(pdf_doc_byte).collect()
}

/// Encode text as PDFDocEncoding when every character is representable, UTF-16BE otherwise.
pub fn encode_text(text: &str) -> Vec<u8> {
    if let Some(bytes) = encode_pdf_doc(text) {
        return bytes;
    }
    let mut bytes = UTF16_BOM.to_vec();
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_stays_single_byte() {
        assert_eq!(encode_text("Hello"), b"Hello".to_vec());
        assert_eq!(decode_text(b"Hello"), "Hello");
    }

    #[test]
    fn pdf_doc_specials_roundtrip() {
        let text = "\u{2022} 10\u{20AC} caf\u{e9}";
        let encoded = encode_text(text);
        assert_eq!(encoded[0], 0x80);
        assert_eq!(decode_text(&encoded), text);
    }

    #[test]
    fn non_latin_text_uses_utf16() {
        let encoded = encode_text("\u{65e5}\u{672c}");
        assert_eq!(encoded, vec![0xFE, 0xFF, 0x65, 0xE5, 0x67, 0x2C]);
        assert_eq!(decode_text(&encoded), "\u{65e5}\u{672c}");
    }

    #[test]
    fn utf8_bom_is_understood() {
        assert_eq!(decode_text(&[0xEF, 0xBB, 0xBF, 0xC3, 0xA9]), "\u{e9}");
    }
}
