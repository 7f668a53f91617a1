//! Password algorithms of the standard security handler, revisions 2 to 4.

use super::rc4::Rc4;
use super::{DecryptionError, PasswordKind};
use crate::{Dictionary, Object};
use md5::{Digest as _, Md5};

/// Padding string used to extend passwords to 32 bytes.
pub(crate) const PAD_BYTES: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Parameters of a `/Filter /Standard` encryption dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StandardHandler {
    pub version: i64,
    pub revision: i64,
    /// File key length in bytes.
    pub key_length: usize,
    pub owner_value: Vec<u8>,
    pub user_value: Vec<u8>,
    /// Raw `/P` value.
    pub permissions: i32,
    pub encrypt_metadata: bool,
    /// First element of the trailer `/ID`.
    pub file_id: Vec<u8>,
}

fn padded(password: &[u8]) -> [u8; 32] {
    let len = password.len().min(32);
    let mut bytes = PAD_BYTES;
    bytes[..len].copy_from_slice(&password[..len]);
    bytes[len..].copy_from_slice(&PAD_BYTES[..32 - len]);
    bytes
}

/// Apply the RC4 rounds of algorithms 3 and 5: one pass with `key`, then 19
/// passes with `key` XORed with the counter (revision 3+).
fn rc4_rounds(key: &[u8], data: &[u8], revision: i64, reverse: bool) -> Vec<u8> {
    let xored = |i: u8| key.iter().map(|b| b ^ i).collect::<Vec<u8>>();
    if revision < 3 {
        return Rc4::process(key, data);
    }
    if reverse {
        let mut result = data.to_vec();
        for i in (1..=19).rev() {
            result = Rc4::process(&xored(i), &result);
        }
        Rc4::process(key, &result)
    } else {
        let mut result = Rc4::process(key, data);
        for i in 1..=19 {
            result = Rc4::process(&xored(i), &result);
        }
        result
    }
}

impl StandardHandler {
    /// Read the handler parameters from an encryption dictionary.
    pub fn from_dictionary(dict: &Dictionary, file_id: &[u8]) -> Result<StandardHandler, DecryptionError> {
        let filter = dict
            .get(b"Filter")
            .and_then(Object::as_name)
            .map_err(|_| DecryptionError::InvalidType)?;
        if filter != b"Standard" {
            return Err(DecryptionError::UnsupportedSecurityHandler(
                String::from_utf8_lossy(filter).into_owned(),
            ));
        }

        let integer = |key: &[u8], missing: DecryptionError| {
            dict.get(key)
                .map_err(|_| missing)
                .and_then(|v| v.as_i64().map_err(|_| DecryptionError::InvalidType))
        };
        let version = integer(b"V", DecryptionError::MissingVersion)?;
        let revision = integer(b"R", DecryptionError::MissingRevision)?;
        let permissions = integer(b"P", DecryptionError::MissingPermissions)?;

        match version {
            1 | 2 | 4 => {}
            0 | 3 => return Err(DecryptionError::InvalidVersion),
            _ => return Err(DecryptionError::UnsupportedVersion),
        }
        if !(2..=4).contains(&revision) {
            return Err(DecryptionError::UnsupportedRevision);
        }

        let bits = match dict.get(b"Length") {
            Ok(length) => length.as_i64().map_err(|_| DecryptionError::InvalidType)?,
            Err(_) if version == 4 => 128,
            Err(_) => 40,
        };
        let bits = match version {
            1 => 40,
            _ if bits % 8 != 0 || !(40..=128).contains(&bits) => return Err(DecryptionError::InvalidKeyLength),
            _ => bits,
        };
        let key_length = if revision == 2 { 5 } else { bits as usize / 8 };

        let string = |key: &[u8], missing: DecryptionError| {
            dict.get(key)
                .map_err(|_| missing)
                .and_then(|v| v.as_str().map_err(|_| DecryptionError::InvalidType))
                .map(<[u8]>::to_vec)
        };
        let owner_value = string(b"O", DecryptionError::MissingOwnerPassword)?;
        let user_value = string(b"U", DecryptionError::MissingUserPassword)?;
        if owner_value.len() != 32 || user_value.len() != 32 {
            return Err(DecryptionError::InvalidHashLength);
        }

        let encrypt_metadata = match dict.get(b"EncryptMetadata") {
            Ok(value) => value.as_bool().map_err(|_| DecryptionError::InvalidType)?,
            Err(_) => true,
        };

        Ok(StandardHandler {
            version,
            revision,
            key_length,
            owner_value,
            user_value,
            permissions: permissions as i32,
            encrypt_metadata,
            file_id: file_id.to_vec(),
        })
    }

    /// Algorithm 2: the file key for a (user) password.
    pub fn file_key(&self, password: &[u8]) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(padded(password));
        hasher.update(&self.owner_value);
        hasher.update((self.permissions as u32).to_le_bytes());
        hasher.update(&self.file_id);
        if self.revision >= 4 && !self.encrypt_metadata {
            hasher.update([0xFF_u8; 4]);
        }
        let mut hash = hasher.finalize();

        let n = self.key_length.min(16);
        if self.revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(&hash[..n]);
            }
        }
        hash[..n].to_vec()
    }

    /// RC4 key derived from the owner password (first steps of algorithm 3).
    fn owner_key(revision: i64, key_length: usize, owner_password: &[u8]) -> Vec<u8> {
        let mut hash = Md5::digest(padded(owner_password));
        if revision >= 3 {
            for _ in 0..50 {
                hash = Md5::digest(hash);
            }
        }
        let n = if revision >= 3 { key_length.min(16) } else { 5 };
        hash[..n].to_vec()
    }

    /// Algorithm 3: the `/O` value. An empty owner password falls back to the user password.
    pub fn compute_owner_value(&self, owner_password: &[u8], user_password: &[u8]) -> Vec<u8> {
        let owner_password = if owner_password.is_empty() { user_password } else { owner_password };
        let key = Self::owner_key(self.revision, self.key_length, owner_password);
        rc4_rounds(&key, &padded(user_password), self.revision, false)
    }

    /// Algorithms 4 and 5: the `/U` value for a file key.
    pub fn compute_user_value(&self, file_key: &[u8]) -> Vec<u8> {
        if self.revision == 2 {
            return Rc4::process(file_key, PAD_BYTES);
        }
        let mut hasher = Md5::new();
        hasher.update(PAD_BYTES);
        hasher.update(&self.file_id);
        let mut result = rc4_rounds(file_key, &hasher.finalize(), self.revision, false);
        let padding: [u8; 16] = rand::random();
        result.extend_from_slice(&padding);
        result
    }

    /// Algorithm 6: returns the file key when `password` is the user password.
    pub fn authenticate_user(&self, password: &[u8]) -> Option<Vec<u8>> {
        let key = self.file_key(password);
        let computed = self.compute_user_value(&key);
        // Revision 3+ only defines the first 16 bytes.
        let len = if self.revision >= 3 { 16 } else { 32 };
        (computed[..len] == self.user_value[..len]).then_some(key)
    }

    /// Algorithm 7: recover the user password from `/O` and authenticate it.
    pub fn authenticate_owner(&self, password: &[u8]) -> Option<Vec<u8>> {
        let key = Self::owner_key(self.revision, self.key_length, password);
        let user_password = rc4_rounds(&key, &self.owner_value, self.revision, true);
        self.authenticate_user(&user_password)
    }

    /// Try `password` as the owner password, then as the user password.
    pub fn authenticate(&self, password: &[u8]) -> Option<(Vec<u8>, PasswordKind)> {
        self.authenticate_owner(password)
            .map(|key| (key, PasswordKind::Owner))
            .or_else(|| self.authenticate_user(password).map(|key| (key, PasswordKind::User)))
    }
}
