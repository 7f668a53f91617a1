mod utils;

use pdfengine::{
    Accuracy, DateTime, Document, LoadOptions, Object, SaveOptions, StringFormat, XrefType, dictionary,
};
use utils::{create_document, init_logger, page_text, reachable_objects, reopen, save_to_vec};

#[test]
fn saved_document_reopens_with_the_same_objects() {
    init_logger();
    let mut doc = create_document(3);
    let expected = reachable_objects(&mut doc);

    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5\n"));
    assert!(bytes.ends_with(b"%%EOF\n"));

    let mut reopened = Document::load_mem(&bytes).unwrap();
    assert_eq!(reopened.version, "1.5");
    assert_eq!(reopened.page_count().unwrap(), 3);
    assert_eq!(reachable_objects(&mut reopened), expected);
}

#[test]
fn saving_a_reopened_document_is_stable() {
    let mut doc = create_document(2);
    let first = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    let mut reopened = Document::load_mem(&first).unwrap();
    let second = save_to_vec(&mut reopened, &SaveOptions::default()).unwrap();
    let mut reopened = Document::load_mem(&second).unwrap();
    let third = save_to_vec(&mut reopened, &SaveOptions::default()).unwrap();
    assert_eq!(second, third);
}

#[test]
fn strict_and_lazy_agree_on_a_valid_file() {
    let mut doc = create_document(4);
    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();

    let mut strict = reopen(&bytes, LoadOptions::builder().accuracy(Accuracy::Strict).build()).unwrap();
    let mut lazy = reopen(&bytes, LoadOptions::builder().accuracy(Accuracy::Lazy).build()).unwrap();
    assert_eq!(strict.trailer, lazy.trailer);
    assert_eq!(reachable_objects(&mut strict), reachable_objects(&mut lazy));
}

#[test]
fn objects_are_read_on_first_access() {
    let mut doc = create_document(2);
    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();

    let mut reopened = Document::load_mem(&bytes).unwrap();
    assert_eq!(reopened.loaded_objects().count(), 0);
    let catalog = reopened.catalog_id().unwrap();
    reopened.get_object(catalog).unwrap();
    assert_eq!(reopened.loaded_objects().count(), 1);
    assert!(reopened.modified_ids().is_empty());
}

#[test]
fn object_streams_and_xref_streams_reopen_identically() {
    init_logger();
    let mut doc = create_document(3);
    let expected = reachable_objects(&mut doc);

    let options = SaveOptions::builder().use_object_streams(true).max_objects_per_stream(2).build();
    let bytes = save_to_vec(&mut doc, &options).unwrap();
    assert!(bytes.windows(b"/ObjStm".len()).any(|window| window == b"/ObjStm"));
    assert!(!bytes.windows(b"\ntrailer\n".len()).any(|window| window == b"\ntrailer\n"));

    let mut reopened = Document::load_mem(&bytes).unwrap();
    assert_eq!(reopened.reference_table.xref_type, XrefType::CrossReferenceStream);
    assert_eq!(reachable_objects(&mut reopened), expected);
    let pages = reopened.get_pages().unwrap();
    assert_eq!(page_text(&mut reopened, pages[&3]), b"Page 3");
}

#[test]
fn xref_stream_without_object_streams() {
    let mut doc = create_document(1);
    let options = SaveOptions::builder().use_xref_streams(true).build();
    let bytes = save_to_vec(&mut doc, &options).unwrap();
    assert!(bytes.windows(b"/XRef".len()).any(|window| window == b"/XRef"));
    assert!(!bytes.windows(b"/ObjStm".len()).any(|window| window == b"/ObjStm"));

    let mut reopened = Document::load_mem(&bytes).unwrap();
    assert_eq!(reopened.page_count().unwrap(), 1);
}

#[test]
fn compressed_streams_decode_to_the_same_content() {
    let mut doc = create_document(2);
    let options = SaveOptions::builder().compress(true).compression_level(9).build();
    let bytes = save_to_vec(&mut doc, &options).unwrap();

    let mut reopened = Document::load_mem(&bytes).unwrap();
    let pages = reopened.get_pages().unwrap();
    for (number, page) in pages {
        assert_eq!(page_text(&mut reopened, page), format!("Page {}", number).into_bytes());
    }
}

#[test]
fn dates_and_text_strings_survive_a_round_trip() {
    let mut doc = create_document(1);
    let created = DateTime::new(2023, 11, 5, 14, 30, 0).with_utc_offset(90);
    let info = dictionary! {
        "Title" => Object::text_string("Größe ≠ size"),
        "Author" => Object::string_literal("a (nested) \\ string"),
        "CreationDate" => created,
        "Misc" => Object::String(vec![0, 1, 2, 255], StringFormat::Hexadecimal),
    };
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", info_id);
    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();

    let mut reopened = Document::load_mem(&bytes).unwrap();
    let info = reopened.get_dictionary(info_id).unwrap();
    assert_eq!(info.get(b"Title").unwrap().as_text().unwrap(), "Größe ≠ size");
    assert_eq!(info.get(b"Author").unwrap().as_str().unwrap(), b"a (nested) \\ string");
    assert_eq!(info.get(b"CreationDate").unwrap().as_datetime(), Some(created));
    assert_eq!(info.get(b"Misc").unwrap().as_str().unwrap(), &[0, 1, 2, 255]);
}

#[test]
fn unreachable_objects_are_not_written() {
    let mut doc = create_document(1);
    let orphan = doc.add_object(Object::string_literal("orphan"));
    let bytes = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();

    let mut reopened = Document::load_mem(&bytes).unwrap();
    let err = reopened.get_object(orphan).unwrap_err();
    assert!(matches!(err.root(), pdfengine::Error::ObjectNotFound(id) if *id == orphan));
}

#[test]
fn open_from_reader_and_file() {
    let mut doc = create_document(2);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_pages.pdf");
    doc.save(&path).unwrap();

    let mut from_file = Document::load(&path).unwrap();
    assert_eq!(from_file.page_count().unwrap(), 2);

    let bytes = std::fs::read(&path).unwrap();
    let mut from_reader = Document::open_from(std::io::Cursor::new(bytes), LoadOptions::default()).unwrap();
    assert_eq!(reachable_objects(&mut from_reader), reachable_objects(&mut from_file));
}
