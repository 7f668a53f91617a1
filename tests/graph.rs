mod utils;

use pdfengine::{Document, Error, ErrorKind, Object, ObjectHandle, SaveOptions, Stream, dictionary};
use utils::{create_document, init_logger, page_text, save_to_vec};

#[test]
fn exported_handle_cannot_cross_documents() {
    let mut source = create_document(1);
    let mut target = create_document(1);
    let page = source.get_pages().unwrap()[&1];

    let handle = source.export(page).unwrap();
    assert!(handle.is_owned_by(&source));
    let err = target.attach(handle).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Ownership);
    assert!(matches!(err, Error::Ownership { id } if id == page));
}

#[test]
fn exported_handle_attaches_to_its_owner_in_place() {
    let mut doc = create_document(1);
    let page = doc.get_pages().unwrap()[&1];
    let handle = doc.export(page).unwrap();
    assert_eq!(doc.attach(handle).unwrap(), page);
}

#[test]
fn cloned_documents_are_distinct_owners() {
    let mut doc = create_document(1);
    let mut copy = doc.clone();
    assert_ne!(doc.id(), copy.id());
    let handle = doc.export(doc.catalog_id().unwrap()).unwrap();
    assert!(copy.attach(handle).is_err());
}

#[test]
fn deep_clone_carries_its_dependencies() {
    init_logger();
    let mut source = create_document(2);
    let mut target = Document::new();
    let pages = source.get_pages().unwrap();
    let page = pages[&2];

    let handle = source.deep_clone(page).unwrap();
    assert_eq!(handle.owner(), None);
    // Contents, resources and the font.
    assert_eq!(handle.dependencies().len(), 3);
    assert!(!handle.object().as_dict().unwrap().has(b"Parent"));

    let attached = target.attach(handle).unwrap();
    assert_eq!(page_text(&mut target, attached), b"Page 2");
    let resources = target
        .get_dictionary(attached)
        .unwrap()
        .get(b"Resources")
        .and_then(Object::as_reference)
        .unwrap();
    assert!(target.get_dictionary(resources).unwrap().has(b"Font"));
}

#[test]
fn deep_clone_twice_gives_independent_copies() {
    let mut source = create_document(1);
    let mut target = Document::new();
    let page = source.get_pages().unwrap()[&1];

    let first = target.attach(source.deep_clone(page).unwrap()).unwrap();
    let second = target.attach(source.deep_clone(page).unwrap()).unwrap();
    assert_ne!(first, second);
    let contents = |doc: &mut Document, id: pdfengine::ObjectId| doc.get_dictionary(id).unwrap().get(b"Contents").unwrap().clone();
    assert_ne!(contents(&mut target, first), contents(&mut target, second));
}

#[test]
fn unowned_handle_for_new_objects() {
    let mut doc = create_document(1);
    let font = doc.add_object(dictionary! { "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Helvetica" });
    let handle = ObjectHandle::new(dictionary! { "F2" => font });
    let id = doc.attach(handle).unwrap();
    assert_eq!(
        doc.get_dictionary(id).unwrap().get(b"F2").unwrap(),
        &Object::Reference(font)
    );
}

#[test]
fn merging_three_and_two_pages_gives_five() {
    init_logger();
    let mut target = create_document(3);
    let source = create_document(2);

    let added = target.merge(vec![source]).unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(target.page_count().unwrap(), 5);
    let root = target.page_tree_root().unwrap();
    assert_eq!(target.get_dictionary(root).unwrap().get(b"Count").unwrap(), &Object::Integer(5));

    let bytes = save_to_vec(&mut target, &SaveOptions::default()).unwrap();
    let mut reopened = Document::load_mem(&bytes).unwrap();
    let pages = reopened.get_pages().unwrap();
    assert_eq!(pages.len(), 5);
    let texts: Vec<Vec<u8>> = pages.values().map(|&page| page_text(&mut reopened, page)).collect();
    assert_eq!(
        texts,
        vec![
            b"Page 1".to_vec(),
            b"Page 2".to_vec(),
            b"Page 3".to_vec(),
            b"Page 1".to_vec(),
            b"Page 2".to_vec(),
        ]
    );
    for page in pages.values() {
        let parent = reopened.get_dictionary(*page).unwrap().get(b"Parent").unwrap().clone();
        assert_eq!(parent, Object::Reference(root));
    }
}

#[test]
fn merged_pages_keep_inherited_attributes() {
    let mut target = Document::new();
    let mut source = Document::new();
    let content = source.add_object(Stream::new(dictionary! {}, b"BT (inherited) Tj ET".to_vec()));
    source.add_page(dictionary! { "Contents" => content }).unwrap();
    let root = source.page_tree_root().unwrap();
    source.get_dictionary_mut(root).unwrap().set("Rotate", 90);

    let added = target.merge(vec![source]).unwrap();
    let page = target.get_dictionary(added[0]).unwrap();
    assert_eq!(page.get(b"Rotate").unwrap(), &Object::Integer(90));
}

#[test]
fn merging_an_empty_document_adds_nothing() {
    let mut target = create_document(1);
    let mut empty = Document::new();
    let pages = empty.add_object(dictionary! { "Type" => "Pages", "Kids" => Vec::<Object>::new(), "Count" => 0 });
    let catalog = empty.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages });
    empty.trailer.set("Root", catalog);
    assert_eq!(target.merge(vec![empty]).unwrap().len(), 0);
    assert_eq!(target.page_count().unwrap(), 1);
}

#[test]
fn deduplication_shrinks_the_file_and_keeps_pages() {
    let mut doc = create_document(2);
    // Two identical logos referenced from different pages.
    let pages = doc.get_pages().unwrap();
    for page in pages.values() {
        let logo = doc.add_object(Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form", "BBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(10), Object::Integer(10)] },
            b"0 0 10 10 re f".repeat(50),
        ));
        doc.get_dictionary_mut(*page).unwrap().set("Logo", logo);
    }
    let before = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();

    let mut doc = Document::load_mem(&before).unwrap();
    assert_eq!(doc.deduplicate().unwrap(), 1);
    let after = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    assert!(after.len() < before.len());

    let mut reopened = Document::load_mem(&after).unwrap();
    let pages = reopened.get_pages().unwrap();
    assert_eq!(pages.len(), 2);
    let logos: Vec<Object> = pages
        .values()
        .map(|&page| reopened.get_dictionary(page).unwrap().get(b"Logo").unwrap().clone())
        .collect();
    assert_eq!(logos[0], logos[1]);
    assert_eq!(page_text(&mut reopened, pages[&2]), b"Page 2");
}
