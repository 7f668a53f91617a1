//! Byte ranges for detached signatures.
//!
//! A signature dictionary is written with a zero-filled `/Contents` and a
//! wide `/ByteRange`. After the save pass the real ranges are patched in
//! place and the signature is written into `/Contents` without moving any
//! other byte.

use std::sync::Arc;

use crate::error::Operation;
use crate::save_options::SaveOptions;
use crate::writer::WritePositions;
use crate::{Dictionary, Document, Error, Object, ObjectId, Result, StringFormat};

/// Placeholder for the three unknown `/ByteRange` numbers; wide enough for any offset.
const BYTE_RANGE_PLACEHOLDER: i64 = 9_999_999_999;

/// Produces a detached signature over the bytes covered by `/ByteRange`.
pub trait Signer {
    fn sign(&self, covered: &[u8]) -> Result<Vec<u8>>;
}

impl<F> Signer for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn sign(&self, covered: &[u8]) -> Result<Vec<u8>> {
        self(covered)
    }
}

impl Document {
    /// Add a signature dictionary whose `/Contents` reserves `capacity` bytes.
    pub fn add_signature_placeholder(&mut self, mut dict: Dictionary, capacity: usize) -> ObjectId {
        dict.set("Type", "Sig");
        if !dict.has(b"Filter") {
            dict.set("Filter", "Adobe.PPKLite");
        }
        if !dict.has(b"SubFilter") {
            dict.set("SubFilter", "adbe.pkcs7.detached");
        }
        dict.set(
            "ByteRange",
            vec![
                Object::Integer(0),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
                Object::Integer(BYTE_RANGE_PLACEHOLDER),
            ],
        );
        dict.set("Contents", Object::String(vec![0; capacity], StringFormat::Hexadecimal));
        self.add_object(dict)
    }

    /// Save the document (incrementally when it was read from bytes), then
    /// patch `/ByteRange` and embed the signature. Returns the signed file.
    pub fn sign<S: Signer + ?Sized>(&mut self, signature_id: ObjectId, signer: &S) -> Result<Vec<u8>> {
        self.sign_revision(signature_id, signer)
            .map_err(|err| err.during(Operation::Sign))
    }

    fn sign_revision<S: Signer + ?Sized>(&mut self, signature_id: ObjectId, signer: &S) -> Result<Vec<u8>> {
        let dict = self.get_dictionary_mut(signature_id)?;
        if !dict.has(b"Contents") || !dict.has(b"ByteRange") {
            return Err(Error::SignaturePlaceholder(signature_id));
        }

        let incremental = self.source.as_ref().is_some_and(|source| !source.rebuilt) && !self.security_changed;
        let options = SaveOptions::builder().incremental(incremental).build();
        let mut positions = WritePositions::new();
        positions.watch(signature_id, "Contents");
        positions.watch(signature_id, "ByteRange");
        let mut bytes = self.save_tracked(&options, &mut positions)?;

        let contents = positions
            .value(signature_id, b"Contents")
            .ok_or(Error::SignaturePlaceholder(signature_id))?;
        let byte_range = positions
            .value(signature_id, b"ByteRange")
            .ok_or(Error::SignaturePlaceholder(signature_id))?;

        let ranges = [0, contents.start, contents.end, bytes.len() - contents.end];
        let mut patched = format!("[{} {} {} {}]", ranges[0], ranges[1], ranges[2], ranges[3]).into_bytes();
        if patched.len() > byte_range.len() {
            return Err(Error::SignaturePlaceholder(signature_id));
        }
        patched.resize(byte_range.len(), b' ');
        bytes[byte_range].copy_from_slice(&patched);

        let mut covered = Vec::with_capacity(bytes.len() - contents.len());
        covered.extend_from_slice(&bytes[..contents.start]);
        covered.extend_from_slice(&bytes[contents.end..]);
        let signature = signer.sign(&covered)?;

        // `<` and `>` surround the hex digits.
        let capacity = (contents.len() - 2) / 2;
        if signature.len() > capacity {
            return Err(Error::SignatureTooLarge {
                needed: signature.len(),
                capacity,
            });
        }
        let hex: String = signature.iter().map(|byte| format!("{:02X}", byte)).collect();
        bytes[contents.start + 1..contents.start + 1 + hex.len()].copy_from_slice(hex.as_bytes());

        if let Some(source) = self.source.as_mut() {
            source.buffer = Arc::new(bytes.clone());
        }
        if let Some(dict) = self.objects.get_mut(&signature_id).and_then(Object::dict_mut) {
            let mut padded = signature;
            padded.resize(capacity, 0);
            dict.set("Contents", Object::String(padded, StringFormat::Hexadecimal));
            dict.set(
                "ByteRange",
                ranges.iter().map(|&value| Object::from(value)).collect::<Vec<_>>(),
            );
        }
        Ok(bytes)
    }
}
