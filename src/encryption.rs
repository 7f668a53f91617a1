pub mod crypt_filters;
mod rc4;
mod standard;

use crate::{Dictionary, Object, ObjectId, StringFormat, encodings};
use bitflags::bitflags;
use crypt_filters::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

pub use standard::StandardHandler;

#[derive(Error, Debug)]
pub enum DecryptionError {
    #[error("the /Encrypt dictionary is missing")]
    MissingEncryptDictionary,
    #[error("missing encryption version (/V)")]
    MissingVersion,
    #[error("missing encryption revision (/R)")]
    MissingRevision,
    #[error("missing the owner password (/O)")]
    MissingOwnerPassword,
    #[error("missing the user password (/U)")]
    MissingUserPassword,
    #[error("missing the permissions field (/P)")]
    MissingPermissions,
    #[error("missing the file /ID elements")]
    MissingFileID,

    #[error("invalid key length")]
    InvalidKeyLength,
    #[error("invalid hash length")]
    InvalidHashLength,
    #[error("invalid ciphertext length")]
    InvalidCipherTextLength,
    #[error("invalid encryption version")]
    InvalidVersion,
    // Used generically when an entry of the encryption dictionary has the wrong type.
    #[error("unexpected type in the encryption dictionary")]
    InvalidType,
    #[error("invalid padding")]
    Padding,

    #[error("the supplied password is incorrect")]
    IncorrectPassword,

    #[error("security handler {0} is not supported")]
    UnsupportedSecurityHandler(String),
    #[error("crypt filter method {0} is not supported")]
    UnsupportedEncryption(String),
    #[error("the encryption version is not supported")]
    UnsupportedVersion,
    #[error("the encryption revision is not supported")]
    UnsupportedRevision,
}

bitflags! {
    /// User access permissions, the `/P` entry.
    #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
    pub struct Permissions: u32 {
        /// Print the document (possibly in degraded quality, see [`Permissions::PRINTABLE_IN_HIGH_QUALITY`]).
        const PRINTABLE = 1 << 2;
        /// Modify the contents by operations other than those controlled by
        /// [`Permissions::ANNOTABLE`], [`Permissions::FILLABLE`] and [`Permissions::ASSEMBLABLE`].
        const MODIFIABLE = 1 << 3;
        /// Copy or otherwise extract text and graphics.
        const COPYABLE = 1 << 4;
        /// Add or modify annotations and fill in form fields.
        const ANNOTABLE = 1 << 5;
        /// Fill in existing form fields (revision 3+).
        const FILLABLE = 1 << 8;
        /// Extract text and graphics for accessibility (revision 3+).
        const COPYABLE_FOR_ACCESSIBILITY = 1 << 9;
        /// Insert, rotate or delete pages (revision 3+).
        const ASSEMBLABLE = 1 << 10;
        /// Print faithfully (revision 3+).
        const PRINTABLE_IN_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    /// The signed `/P` value with every reserved bit set as required.
    pub fn p_value(&self) -> i32 {
        // Bits 1-2 must be 0, bits 7-8 and 13-32 must be 1.
        (self.bits() | 0b1100_0000 | 0xFFFF_F000) as i32
    }

    pub fn from_p_value(value: i32) -> Permissions {
        Permissions::from_bits_truncate(value as u32)
    }
}

/// Which password opened the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasswordKind {
    Owner,
    User,
}

/// Cipher and key size used when encrypting a document.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncryptionMethod {
    /// Revision 2, RC4 with a 40-bit key.
    Rc4_40,
    /// Revision 3, RC4 with a 128-bit key.
    Rc4_128,
    /// Revision 4, AES-128 (`AESV2`) crypt filters.
    #[default]
    Aes128,
}

#[derive(Clone, Debug)]
pub struct EncryptionOptions {
    pub user_password: String,
    pub owner_password: String,
    pub permissions: Permissions,
    pub method: EncryptionMethod,
    pub encrypt_metadata: bool,
}

impl Default for EncryptionOptions {
    fn default() -> Self {
        EncryptionOptions {
            user_password: String::new(),
            owner_password: String::new(),
            permissions: Permissions::all(),
            method: EncryptionMethod::default(),
            encrypt_metadata: true,
        }
    }
}

fn password_bytes(password: &str) -> Vec<u8> {
    encodings::encode_pdf_doc(password).unwrap_or_else(|| password.as_bytes().to_vec())
}

fn crypt_filter_for(method: &[u8]) -> Result<Arc<dyn CryptFilter>, DecryptionError> {
    match method {
        b"None" | b"Identity" => Ok(Arc::new(IdentityCryptFilter)),
        b"V2" => Ok(Arc::new(Rc4CryptFilter)),
        b"AESV2" => Ok(Arc::new(Aes128CryptFilter)),
        other => Err(DecryptionError::UnsupportedEncryption(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// An authenticated security handler: the file key plus the crypt filters
/// for strings and streams.
#[derive(Clone, Debug)]
pub struct EncryptionState {
    handler: StandardHandler,
    file_key: Vec<u8>,
    crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>>,
    stream_filter: Arc<dyn CryptFilter>,
    string_filter: Arc<dyn CryptFilter>,
    password_kind: PasswordKind,
}

impl EncryptionState {
    /// Authenticate `password` against the encryption dictionary.
    pub fn open(encrypt: &Dictionary, file_id: &[u8], password: &str) -> Result<EncryptionState, DecryptionError> {
        let handler = StandardHandler::from_dictionary(encrypt, file_id)?;
        let (file_key, password_kind) = handler
            .authenticate(&password_bytes(password))
            .ok_or(DecryptionError::IncorrectPassword)?;

        let mut crypt_filters = BTreeMap::new();
        let (mut stream_filter, mut string_filter): (Arc<dyn CryptFilter>, Arc<dyn CryptFilter>) =
            (Arc::new(Rc4CryptFilter), Arc::new(Rc4CryptFilter));

        if handler.version == 4 {
            if let Ok(filters) = encrypt.get(b"CF").and_then(Object::as_dict) {
                for (name, filter) in filters {
                    let method = filter
                        .as_dict()
                        .and_then(|filter| filter.get(b"CFM"))
                        .and_then(Object::as_name)
                        .unwrap_or(b"None");
                    crypt_filters.insert(name.clone(), crypt_filter_for(method)?);
                }
            }
            let select = |key: &[u8]| -> Result<Arc<dyn CryptFilter>, DecryptionError> {
                match encrypt.get(key).and_then(Object::as_name) {
                    Err(_) | Ok(b"Identity") => Ok(Arc::new(IdentityCryptFilter)),
                    Ok(name) => crypt_filters
                        .get(name)
                        .cloned()
                        .ok_or_else(|| DecryptionError::UnsupportedEncryption(String::from_utf8_lossy(name).into_owned())),
                }
            };
            stream_filter = select(b"StmF")?;
            string_filter = select(b"StrF")?;
        }

        Ok(EncryptionState {
            handler,
            file_key,
            crypt_filters,
            stream_filter,
            string_filter,
            password_kind,
        })
    }

    /// Create a new handler from options; returns the state and the `/Encrypt` dictionary.
    pub fn create(options: &EncryptionOptions, file_id: &[u8]) -> (EncryptionState, Dictionary) {
        let (version, revision, key_length) = match options.method {
            EncryptionMethod::Rc4_40 => (1, 2, 5),
            EncryptionMethod::Rc4_128 => (2, 3, 16),
            EncryptionMethod::Aes128 => (4, 4, 16),
        };
        let mut handler = StandardHandler {
            version,
            revision,
            key_length,
            owner_value: vec![],
            user_value: vec![],
            permissions: options.permissions.p_value(),
            encrypt_metadata: options.encrypt_metadata || revision < 4,
            file_id: file_id.to_vec(),
        };
        let user_password = password_bytes(&options.user_password);
        handler.owner_value = handler.compute_owner_value(&password_bytes(&options.owner_password), &user_password);
        let file_key = handler.file_key(&user_password);
        handler.user_value = handler.compute_user_value(&file_key);

        let mut dict = dictionary! {
            "Filter" => "Standard",
            "V" => version,
            "R" => revision,
            "Length" => key_length as i64 * 8,
            "O" => Object::String(handler.owner_value.clone(), StringFormat::Hexadecimal),
            "U" => Object::String(handler.user_value.clone(), StringFormat::Hexadecimal),
            "P" => handler.permissions,
        };

        let mut crypt_filters: BTreeMap<Vec<u8>, Arc<dyn CryptFilter>> = BTreeMap::new();
        let default_filter: Arc<dyn CryptFilter> = if version == 4 {
            let filter: Arc<dyn CryptFilter> = Arc::new(Aes128CryptFilter);
            crypt_filters.insert(b"StdCF".to_vec(), filter.clone());
            dict.set(
                "CF",
                dictionary! {
                    "StdCF" => dictionary! {
                        "CFM" => "AESV2",
                        "AuthEvent" => "DocOpen",
                        "Length" => 16,
                    },
                },
            );
            dict.set("StmF", "StdCF");
            dict.set("StrF", "StdCF");
            dict.set("EncryptMetadata", handler.encrypt_metadata);
            filter
        } else {
            Arc::new(Rc4CryptFilter)
        };

        let state = EncryptionState {
            handler,
            file_key,
            crypt_filters,
            stream_filter: default_filter.clone(),
            string_filter: default_filter,
            password_kind: PasswordKind::Owner,
        };
        (state, dict)
    }

    pub fn handler(&self) -> &StandardHandler {
        &self.handler
    }

    pub fn file_key(&self) -> &[u8] {
        &self.file_key
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_p_value(self.handler.permissions)
    }

    pub fn password_kind(&self) -> PasswordKind {
        self.password_kind
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.handler.encrypt_metadata
    }

    /// Whether `object` is left in clear text regardless of the crypt filters.
    pub fn is_exempt(&self, object: &Object) -> bool {
        match object {
            Object::Stream(stream) => {
                stream.dict.type_is(b"XRef") || (!self.encrypt_metadata() && stream.dict.type_is(b"Metadata"))
            }
            _ => false,
        }
    }

    /// A stream with a `/Crypt` filter names its own crypt filter in `/DecodeParms`.
    fn stream_override(&self, object: &Object) -> Option<Arc<dyn CryptFilter>> {
        let stream = object.as_stream().ok()?;
        if !stream.filters().ok()?.contains(&&b"Crypt"[..]) {
            return None;
        }
        let name = stream
            .dict
            .get(b"DecodeParms")
            .and_then(Object::as_dict)
            .and_then(|params| params.get(b"Name"))
            .and_then(Object::as_name)
            .ok();
        Some(
            name.and_then(|name| self.crypt_filters.get(name).cloned())
                .unwrap_or_else(|| Arc::new(IdentityCryptFilter)),
        )
    }

    fn apply(&self, obj_id: ObjectId, object: &mut Object, encrypt: bool) -> Result<(), DecryptionError> {
        let override_filter = self.stream_override(object);
        let filter = match object {
            Object::Array(items) => {
                for item in items {
                    self.apply(obj_id, item, encrypt)?;
                }
                return Ok(());
            }
            Object::Dictionary(dict) => return self.apply_dictionary(obj_id, dict, encrypt),
            Object::Date(date) if encrypt => {
                *object = Object::string_literal(date.to_string());
                self.string_filter.clone()
            }
            Object::String(text, format @ StringFormat::Text) if encrypt => {
                let bytes = encodings::encode_text(&String::from_utf8_lossy(text));
                *text = bytes;
                *format = StringFormat::Literal;
                self.string_filter.clone()
            }
            Object::String(..) => self.string_filter.clone(),
            Object::Stream(stream) => {
                self.apply_dictionary(obj_id, &mut stream.dict, encrypt)?;
                override_filter.unwrap_or_else(|| self.stream_filter.clone())
            }
            _ => return Ok(()),
        };

        let key = filter.compute_key(&self.file_key, obj_id);
        match object {
            Object::String(text, _) => {
                *text = if encrypt {
                    filter.encrypt(&key, text)?
                } else {
                    filter.decrypt(&key, text)?
                };
            }
            Object::Stream(stream) => {
                let content = if encrypt {
                    filter.encrypt(&key, &stream.content)?
                } else {
                    filter.decrypt(&key, &stream.content)?
                };
                stream.set_content(content);
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_dictionary(&self, obj_id: ObjectId, dict: &mut Dictionary, encrypt: bool) -> Result<(), DecryptionError> {
        // Signature values are never encrypted.
        let signature = dict.type_is(b"Sig") || dict.type_is(b"DocTimeStamp");
        for (key, value) in dict.iter_mut() {
            if signature && key.as_slice() == b"Contents" {
                continue;
            }
            self.apply(obj_id, value, encrypt)?;
        }
        Ok(())
    }

    pub fn encrypt_object(&self, obj_id: ObjectId, object: &mut Object) -> Result<(), DecryptionError> {
        if self.is_exempt(object) {
            return Ok(());
        }
        self.apply(obj_id, object, true)
    }

    pub fn decrypt_object(&self, obj_id: ObjectId, object: &mut Object) -> Result<(), DecryptionError> {
        if self.is_exempt(object) {
            return Ok(());
        }
        self.apply(obj_id, object, false)
    }
}
