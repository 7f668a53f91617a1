mod utils;

use pdfengine::encryption::PasswordKind;
use pdfengine::{
    DecryptionError, Document, EncryptionMethod, EncryptionOptions, Error, ErrorKind, LoadOptions, Object,
    Permissions, SaveOptions, SecurityState,
};
use utils::{create_document, init_logger, page_text, reopen, save_to_vec};

fn encrypted_bytes(method: EncryptionMethod, user_password: &str) -> Vec<u8> {
    init_logger();
    let mut doc = create_document(2);
    doc.encrypt(&EncryptionOptions {
        user_password: user_password.to_string(),
        owner_password: "owner".to_string(),
        permissions: Permissions::PRINTABLE | Permissions::COPYABLE_FOR_ACCESSIBILITY,
        method,
        ..Default::default()
    })
    .unwrap();
    assert!(doc.is_encrypted());
    save_to_vec(&mut doc, &SaveOptions::default()).unwrap()
}

fn with_password(password: &str) -> LoadOptions {
    LoadOptions::builder().password(password).build()
}

fn assert_pages_readable(doc: &mut Document) {
    let pages = doc.get_pages().unwrap();
    assert_eq!(pages.len(), 2);
    for (number, page) in pages {
        assert_eq!(page_text(doc, page), format!("Page {}", number).into_bytes());
    }
    let info = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
    let producer = doc.get_dictionary(info).unwrap().get(b"Producer").unwrap().as_text().unwrap();
    assert_eq!(producer, "pdfengine tests");
}

#[test]
fn every_method_round_trips_with_the_user_password() {
    for method in [EncryptionMethod::Rc4_40, EncryptionMethod::Rc4_128, EncryptionMethod::Aes128] {
        let bytes = encrypted_bytes(method, "user");
        assert!(!bytes.windows(6).any(|window| window == b"Page 1"), "{:?} left text in clear", method);

        let mut doc = reopen(&bytes, with_password("user")).unwrap();
        let state = doc.encryption_state().unwrap();
        assert_eq!(state.password_kind(), PasswordKind::User);
        assert_eq!(
            state.permissions(),
            Permissions::PRINTABLE | Permissions::COPYABLE_FOR_ACCESSIBILITY
        );
        assert_pages_readable(&mut doc);
    }
}

#[test]
fn owner_password_opens_as_owner() {
    let bytes = encrypted_bytes(EncryptionMethod::Aes128, "user");
    let mut doc = reopen(&bytes, with_password("owner")).unwrap();
    assert!(matches!(doc.security_state(), SecurityState::Open(state) if state.password_kind() == PasswordKind::Owner));
    assert_pages_readable(&mut doc);
}

#[test]
fn wrong_password_is_a_security_error() {
    let bytes = encrypted_bytes(EncryptionMethod::Rc4_128, "user");
    let err = reopen(&bytes, with_password("guess")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);
    assert!(matches!(err.root(), Error::Decryption(DecryptionError::IncorrectPassword)));

    let err = Document::load_mem(&bytes).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);
}

#[test]
fn empty_user_password_needs_no_password() {
    let bytes = encrypted_bytes(EncryptionMethod::Aes128, "");
    let mut doc = Document::load_mem(&bytes).unwrap();
    assert!(doc.is_encrypted());
    assert_pages_readable(&mut doc);
}

#[test]
fn password_callback_is_asked_last() {
    let bytes = encrypted_bytes(EncryptionMethod::Rc4_40, "user");
    let options = LoadOptions::builder()
        .password("wrong")
        .password_callback(|| Some("user".to_string()))
        .build();
    let mut doc = reopen(&bytes, options).unwrap();
    assert_pages_readable(&mut doc);
}

#[test]
fn removing_encryption_writes_a_plain_file() {
    let bytes = encrypted_bytes(EncryptionMethod::Aes128, "user");
    let mut doc = reopen(&bytes, with_password("user")).unwrap();
    doc.remove_encryption().unwrap();
    assert!(!doc.is_encrypted());

    let plain = save_to_vec(&mut doc, &SaveOptions::default()).unwrap();
    assert!(plain.windows(6).any(|window| window == b"Page 1"));
    assert!(!plain.windows(8).any(|window| window == b"/Encrypt"));

    let mut reopened = Document::load_mem(&plain).unwrap();
    assert!(!reopened.is_encrypted());
    assert_pages_readable(&mut reopened);
}

#[test]
fn changed_encryption_needs_a_full_save() {
    let bytes = encrypted_bytes(EncryptionMethod::Rc4_128, "user");
    let mut doc = reopen(&bytes, with_password("user")).unwrap();
    doc.remove_encryption().unwrap();

    let options = SaveOptions::builder().incremental(true).build();
    let err = save_to_vec(&mut doc, &options).unwrap_err();
    assert!(matches!(err.root(), Error::IncrementalSave(_)));
}

#[test]
fn incremental_update_of_an_encrypted_file() {
    let bytes = encrypted_bytes(EncryptionMethod::Aes128, "user");
    let mut doc = reopen(&bytes, with_password("user")).unwrap();
    let info = doc.trailer.get(b"Info").and_then(Object::as_reference).unwrap();
    doc.get_dictionary_mut(info)
        .unwrap()
        .set("Title", Object::string_literal("Quarterly report"));

    let updated = save_to_vec(&mut doc, &SaveOptions::builder().incremental(true).build()).unwrap();
    assert!(updated.starts_with(&bytes));
    assert!(!updated.windows(9).any(|window| window == b"Quarterly"));

    let mut reopened = reopen(&updated, with_password("user")).unwrap();
    let title = reopened.get_dictionary(info).unwrap().get(b"Title").unwrap().as_str().unwrap().to_vec();
    assert_eq!(title, b"Quarterly report");
    assert_pages_readable(&mut reopened);
}
