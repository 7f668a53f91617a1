mod utils;

use pdfengine::{Accuracy, Document, Error, ErrorKind, LoadOptions, Operation, SaveOptions, XrefError};
use utils::{create_document, init_logger, page_text, reachable_objects, reopen, save_to_vec};

fn strict() -> LoadOptions {
    LoadOptions::builder().accuracy(Accuracy::Strict).build()
}

fn lazy() -> LoadOptions {
    LoadOptions::builder().accuracy(Accuracy::Lazy).build()
}

fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).position(|window| window == needle).unwrap()
}

fn rfind(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).rposition(|window| window == needle).unwrap()
}

/// A saved three page document and its objects as written.
fn saved_document() -> (Vec<u8>, Vec<(pdfengine::ObjectId, pdfengine::Object)>) {
    init_logger();
    let mut doc = create_document(3);
    let objects = reachable_objects(&mut doc);
    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    (bytes, objects)
}

/// Overwrite the ten offset digits of the classic xref entry for `number`.
fn corrupt_offset(bytes: &mut [u8], number: usize, offset: &[u8; 10]) {
    let table = rfind(bytes, b"\nxref\n") + b"\nxref\n".len();
    let first_entry = table + find(&bytes[table..], b"\n") + 1;
    let entry = first_entry + 20 * number;
    bytes[entry..entry + 10].copy_from_slice(offset);
}

#[test]
fn wrong_xref_offset_fails_strict_open() {
    let (mut bytes, _) = saved_document();
    corrupt_offset(&mut bytes, 2, b"0000000003");

    let err = reopen(&bytes, strict()).unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Open));
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(matches!(
        err.root(),
        Error::Xref(XrefError::Offset { number: 2, offset: 3 })
    ));
}

#[test]
fn wrong_xref_offset_is_recovered_lazily() {
    let (mut bytes, expected) = saved_document();
    corrupt_offset(&mut bytes, 2, b"0000000003");

    let mut doc = reopen(&bytes, lazy()).unwrap();
    assert_eq!(reachable_objects(&mut doc), expected);
}

#[test]
fn missing_startxref_rebuilds_from_the_trailer_keyword() {
    let (bytes, expected) = saved_document();
    let truncated = &bytes[..rfind(&bytes, b"startxref")];

    assert!(reopen(truncated, strict()).is_err());
    let mut doc = reopen(truncated, lazy()).unwrap();
    assert_eq!(doc.page_count().unwrap(), 3);
    assert_eq!(reachable_objects(&mut doc), expected);
}

#[test]
fn wrong_startxref_fails_strict_and_is_recovered_lazily() {
    let (bytes, expected) = saved_document();
    let digits = rfind(&bytes, b"startxref") + b"startxref".len();
    let digits = digits + bytes[digits..].iter().take_while(|byte| byte.is_ascii_whitespace()).count();
    let end = digits + bytes[digits..].iter().take_while(|byte| byte.is_ascii_digit()).count();
    let mut moved = bytes[..digits].to_vec();
    moved.extend_from_slice(b"20");
    moved.extend_from_slice(&bytes[end..]);

    let err = reopen(&moved, strict()).unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Open));

    let mut doc = reopen(&moved, lazy()).unwrap();
    assert_eq!(doc.page_count().unwrap(), 3);
    assert_eq!(reachable_objects(&mut doc), expected);
}

#[test]
fn missing_trailer_rebuilds_from_the_catalog() {
    let (bytes, _) = saved_document();
    let truncated = &bytes[..rfind(&bytes, b"\nxref\n") + 1];

    let err = reopen(truncated, strict()).unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Open));

    let mut doc = reopen(truncated, lazy()).unwrap();
    let pages = doc.get_pages().unwrap();
    assert_eq!(pages.len(), 3);
    assert_eq!(page_text(&mut doc, pages[&2]), b"Page 2");
}

#[test]
fn rebuilt_document_refuses_incremental_save() {
    let (bytes, _) = saved_document();
    let truncated = &bytes[..rfind(&bytes, b"startxref")];
    let mut doc = reopen(truncated, lazy()).unwrap();

    let options = SaveOptions::builder().incremental(true).build();
    let err = save_to_vec(&mut doc, &options).unwrap_err();
    assert_eq!(err.operation(), Some(Operation::Save));
    assert!(matches!(err.root(), Error::IncrementalSave(_)));

    // A full save is still possible and yields a clean file.
    let rewritten = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    let mut clean = reopen(&rewritten, strict()).unwrap();
    assert_eq!(clean.page_count().unwrap(), 3);
}

#[test]
fn wrong_stream_length_is_tolerated() {
    let (mut bytes, _) = saved_document();
    let length = find(&bytes, b"/Length ") + b"/Length ".len();
    let digits = bytes[length..].iter().take_while(|byte| byte.is_ascii_digit()).count();
    bytes[length..length + digits].fill(b'9');

    let mut doc = reopen(&bytes, strict()).unwrap();
    let pages = doc.get_pages().unwrap();
    for (number, page) in pages {
        assert_eq!(page_text(&mut doc, page), format!("Page {}", number).into_bytes());
    }
}

#[test]
fn garbage_before_the_header_is_skipped() {
    let (bytes, expected) = saved_document();
    let mut prefixed = b"garbage from a mail gateway\r\n".to_vec();
    prefixed.extend_from_slice(&bytes);

    let mut doc = reopen(&prefixed, strict()).unwrap();
    assert_eq!(reachable_objects(&mut doc), expected);
}

#[test]
fn not_a_pdf() {
    let err = Document::load_mem(b"just some text").unwrap_err();
    assert!(matches!(err.root(), Error::Header));
    assert_eq!(err.kind(), ErrorKind::Syntax);
}
