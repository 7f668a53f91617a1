use pdfengine::content::{Content, Operation};
use pdfengine::{Document, LoadOptions, Object, ObjectId, Result, SaveOptions, Stream, dictionary};

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A document with `pages` pages, each showing its own page number, sharing one font.
#[allow(dead_code)]
pub fn create_document(pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    for number in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 48.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", number))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        doc.add_page(dictionary! {
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
        })
        .unwrap();
    }
    let info_id = doc.add_object(dictionary! {
        "Producer" => Object::text_string("pdfengine tests"),
    });
    doc.trailer.set("Info", info_id);
    doc
}

#[allow(dead_code)]
pub fn save_to_vec(doc: &mut Document, options: &SaveOptions) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_with_options(&mut bytes, options)?;
    Ok(bytes)
}

#[allow(dead_code)]
pub fn reopen(bytes: &[u8], options: LoadOptions) -> Result<Document> {
    Document::load_mem_with(bytes, options)
}

/// Every reachable object, fully loaded, keyed by id.
#[allow(dead_code)]
pub fn reachable_objects(doc: &mut Document) -> Vec<(ObjectId, Object)> {
    let ids = doc.reachable_ids().unwrap();
    ids.into_iter()
        .map(|id| (id, doc.get_object(id).unwrap().clone()))
        .collect()
}

/// Text shown by the `Tj` operator of a page's content stream.
#[allow(dead_code)]
pub fn page_text(doc: &mut Document, page: ObjectId) -> Vec<u8> {
    let contents = doc
        .get_dictionary(page)
        .unwrap()
        .get(b"Contents")
        .and_then(Object::as_reference)
        .unwrap();
    let stream = doc.get_object(contents).and_then(Object::as_stream).unwrap();
    let content = stream.decode_content().unwrap();
    content
        .operations
        .iter()
        .find(|operation| operation.operator == "Tj")
        .and_then(|operation| operation.operands.first())
        .and_then(|operand| operand.as_str().ok())
        .unwrap()
        .to_vec()
}
