use super::DecryptionError;
use super::rc4::Rc4;
use crate::ObjectId;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use md5::{Digest as _, Md5};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// A crypt filter as named by `/CFM` (`None`/`Identity`, `V2`, `AESV2`).
pub trait CryptFilter: std::fmt::Debug + Send + Sync {
    fn method(&self) -> &[u8];
    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Vec<u8>;
    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError>;
}

#[derive(Clone, Copy, Debug)]
pub struct IdentityCryptFilter;

impl CryptFilter for IdentityCryptFilter {
    fn method(&self) -> &[u8] {
        b"Identity"
    }

    fn compute_key(&self, key: &[u8], _obj_id: ObjectId) -> Vec<u8> {
        key.to_vec()
    }

    fn encrypt(&self, _key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, _key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(ciphertext.to_vec())
    }
}

/// Per-object key: MD5 over the file key, the low 3 bytes of the object
/// number and the low 2 bytes of the generation (plus `sAlT` for AES),
/// truncated to `min(n + 5, 16)` bytes.
fn object_key(key: &[u8], obj_id: ObjectId, salt: &[u8]) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(key);
    hasher.update(&obj_id.0.to_le_bytes()[..3]);
    hasher.update(obj_id.1.to_le_bytes());
    hasher.update(salt);
    let len = (key.len() + 5).min(16);
    hasher.finalize()[..len].to_vec()
}

#[derive(Clone, Copy, Debug)]
pub struct Rc4CryptFilter;

impl CryptFilter for Rc4CryptFilter {
    fn method(&self) -> &[u8] {
        b"V2"
    }

    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Vec<u8> {
        object_key(key, obj_id, b"")
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(Rc4::process(key, plaintext))
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        Ok(Rc4::process(key, ciphertext))
    }
}

/// AES-128 in CBC mode; the 16-byte IV is prepended to the ciphertext.
#[derive(Clone, Copy, Debug)]
pub struct Aes128CryptFilter;

impl CryptFilter for Aes128CryptFilter {
    fn method(&self) -> &[u8] {
        b"AESV2"
    }

    fn compute_key(&self, key: &[u8], obj_id: ObjectId) -> Vec<u8> {
        object_key(key, obj_id, b"sAlT")
    }

    fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if key.len() != 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }
        let iv: [u8; 16] = rand::random();
        let mut ciphertext = iv.to_vec();
        ciphertext.extend(Aes128CbcEnc::new(key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext));
        Ok(ciphertext)
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptionError> {
        if key.len() != 16 {
            return Err(DecryptionError::InvalidKeyLength);
        }
        if ciphertext.len() % 16 != 0 {
            return Err(DecryptionError::InvalidCipherTextLength);
        }
        // Nothing but the IV (or not even that) means empty plaintext.
        if ciphertext.len() <= 16 {
            return Ok(vec![]);
        }
        let (iv, data) = ciphertext.split_at(16);
        Aes128CbcDec::new(key.into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| DecryptionError::Padding)
    }
}
