use log::{error, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::encryption::{DecryptionError, EncryptionOptions, EncryptionState};
use crate::error::Operation;
use crate::load_options::{Accuracy, LoadOptions, OpenMode};
use crate::reader::Source;
use crate::xref::{Xref, XrefType};
use crate::{Dictionary, Error, Object, ObjectId, Result, StringFormat};

/// Reference chains longer than this are reported as `Error::ReferenceLimit`.
pub const MAX_REFERENCE_DEPTH: usize = 128;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one `Document` instance. Clones get a new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> DocumentId {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Default)]
pub enum SecurityState {
    #[default]
    Unencrypted,
    /// Encrypted and no password was accepted yet.
    Locked,
    Open(EncryptionState),
}

/// PDF document
pub struct Document {
    id: DocumentId,

    /// The version of the PDF specification to which the file conforms.
    pub version: String,

    /// Bytes of the comment line written after the header.
    pub binary_mark: Vec<u8>,

    /// The trailer gives the location of the cross-reference table and of certain special objects.
    pub trailer: Dictionary,

    /// The cross-reference table contains locations of the indirect objects.
    pub reference_table: Xref,

    /// Objects materialized so far.
    pub(crate) objects: BTreeMap<ObjectId, Object>,

    /// maximum object id
    pub max_id: u32,

    pub(crate) mode: OpenMode,
    pub(crate) source: Option<Source>,
    pub(crate) security: SecurityState,
    /// Encryption was added or removed since the document was read.
    pub(crate) security_changed: bool,
    pub(crate) modified: BTreeSet<ObjectId>,
    pub(crate) freed: BTreeSet<ObjectId>,
}

impl Clone for Document {
    fn clone(&self) -> Self {
        Document {
            id: DocumentId::next(),
            version: self.version.clone(),
            binary_mark: self.binary_mark.clone(),
            trailer: self.trailer.clone(),
            reference_table: self.reference_table.clone(),
            objects: self.objects.clone(),
            max_id: self.max_id,
            mode: self.mode,
            source: self.source.clone(),
            security: self.security.clone(),
            security_changed: self.security_changed,
            modified: self.modified.clone(),
            freed: self.freed.clone(),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("trailer", &self.trailer)
            .field("loaded_objects", &self.objects.len())
            .field("max_id", &self.max_id)
            .field("mode", &self.mode)
            .field("source_bytes", &self.source.as_ref().map(|source| source.buffer.len()))
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create new PDF document.
    pub fn new() -> Document {
        Self::with_version("1.7")
    }

    pub fn with_version<S: Into<String>>(version: S) -> Document {
        Document {
            id: DocumentId::next(),
            version: version.into(),
            binary_mark: vec![0xBB, 0xAD, 0xC0, 0xDE],
            trailer: Dictionary::new(),
            reference_table: Xref::new(0, XrefType::CrossReferenceTable),
            objects: BTreeMap::new(),
            max_id: 0,
            mode: OpenMode::Modify,
            source: None,
            security: SecurityState::Unencrypted,
            security_changed: false,
            modified: BTreeSet::new(),
            freed: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn security_state(&self) -> &SecurityState {
        &self.security
    }

    pub fn is_encrypted(&self) -> bool {
        !matches!(self.security, SecurityState::Unencrypted)
    }

    /// The bytes the document was read from, or last saved to.
    pub fn source_bytes(&self) -> Option<&[u8]> {
        self.source.as_ref().map(|source| source.buffer.as_slice())
    }

    /// Ids changed or added since the last read or save.
    pub fn modified_ids(&self) -> &BTreeSet<ObjectId> {
        &self.modified
    }

    /// Objects materialized so far.
    pub fn loaded_objects(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    /// Ids of every object the document knows about, loaded or not.
    pub fn object_ids(&self) -> BTreeSet<ObjectId> {
        let mut ids: BTreeSet<ObjectId> = self
            .reference_table
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_in_use())
            .map(|(&number, entry)| (number, entry.generation()))
            .collect();
        ids.extend(self.objects.keys().copied());
        ids.retain(|id| !self.freed.contains(id));
        ids
    }

    /// Read the object from the cache or the source bytes.
    pub(crate) fn materialize(&mut self, id: ObjectId) -> Result<&Object> {
        if self.freed.contains(&id) {
            return Err(Error::ObjectNotFound(id));
        }
        if !self.objects.contains_key(&id) {
            let source = self.source.as_mut().ok_or(Error::ObjectNotFound(id))?;
            let object = source.load(&self.reference_table, id)?;
            self.objects.insert(id, object);
        }
        self.objects.get(&id).ok_or(Error::ObjectNotFound(id))
    }

    /// Get object by object id; it is read from the source on first access.
    pub fn get_object(&mut self, id: ObjectId) -> Result<&Object> {
        self.materialize(id).map_err(|err| err.during(Operation::Resolve))
    }

    /// Get a mutable object; the id is written by the next incremental save.
    pub fn get_object_mut(&mut self, id: ObjectId) -> Result<&mut Object> {
        self.materialize(id).map_err(|err| err.during(Operation::Resolve))?;
        self.modified.insert(id);
        self.objects.get_mut(&id).ok_or(Error::ObjectNotFound(id))
    }

    pub fn get_dictionary(&mut self, id: ObjectId) -> Result<&Dictionary> {
        self.get_object(id).and_then(Object::as_dict)
    }

    pub fn get_dictionary_mut(&mut self, id: ObjectId) -> Result<&mut Dictionary> {
        self.get_object_mut(id).and_then(Object::as_dict_mut)
    }

    /// Follow a chain of indirect objects whose value is itself a reference.
    /// Returns the id at the end of the chain and its object.
    pub fn dereference(&mut self, id: ObjectId) -> Result<(ObjectId, &Object)> {
        let end = self.chain_end(id).map_err(|err| err.during(Operation::Resolve))?;
        Ok((end, self.materialize(end)?))
    }

    pub(crate) fn chain_end(&mut self, id: ObjectId) -> Result<ObjectId> {
        let mut current = id;
        let mut seen = BTreeSet::new();
        loop {
            if !seen.insert(current) {
                return Err(Error::ReferenceCycle(current));
            }
            if seen.len() > MAX_REFERENCE_DEPTH {
                return Err(Error::ReferenceLimit);
            }
            match self.materialize(current)? {
                Object::Reference(next) => current = *next,
                _ => return Ok(current),
            }
        }
    }

    /// A copy of `object` with a top-level reference replaced by its target.
    pub fn resolve(&mut self, object: &Object) -> Result<Object> {
        match object {
            Object::Reference(id) => self.dereference(*id).map(|(_, object)| object.clone()),
            other => Ok(other.clone()),
        }
    }

    /// Create a new object id.
    pub fn new_object_id(&mut self) -> ObjectId {
        self.max_id += 1;
        (self.max_id, 0)
    }

    /// Add PDF object into document's object list.
    pub fn add_object<T: Into<Object>>(&mut self, object: T) -> ObjectId {
        let id = self.new_object_id();
        self.objects.insert(id, object.into());
        self.modified.insert(id);
        id
    }

    /// Store `object` under `id`, replacing what was there.
    pub fn set_object<T: Into<Object>>(&mut self, id: ObjectId, object: T) {
        self.objects.insert(id, object.into());
        self.modified.insert(id);
        self.freed.remove(&id);
        self.max_id = self.max_id.max(id.0);
    }

    /// Remove an object; the next incremental save writes a free entry for it.
    pub fn delete_object(&mut self, id: ObjectId) -> Option<Object> {
        let removed = self.objects.remove(&id);
        self.modified.remove(&id);
        let in_table = self
            .reference_table
            .get(id.0)
            .is_some_and(|entry| entry.is_in_use() && entry.generation() == id.1);
        if in_table {
            self.freed.insert(id);
        }
        removed
    }

    /// Materialize every object listed in the cross-reference data.
    pub fn load_all(&mut self) -> Result<()> {
        let ids: Vec<ObjectId> = self
            .object_ids()
            .into_iter()
            .filter(|id| !self.objects.contains_key(id))
            .collect();
        let lazy = self.source.as_ref().is_some_and(|source| source.accuracy == Accuracy::Lazy);
        for id in ids {
            if let Err(err) = self.materialize(id) {
                if lazy {
                    error!("skipping unreadable object {:?}: {}", id, err);
                } else {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    pub fn catalog_id(&self) -> Result<ObjectId> {
        self.trailer.get(b"Root").and_then(Object::as_reference)
    }

    pub fn catalog(&mut self) -> Result<&Dictionary> {
        let id = self.catalog_id()?;
        self.get_dictionary(id)
    }

    pub fn catalog_mut(&mut self) -> Result<&mut Dictionary> {
        let id = self.catalog_id()?;
        self.get_dictionary_mut(id)
    }

    /// Ids reachable from the trailer. Dangling references are skipped.
    pub fn reachable_ids(&mut self) -> Result<BTreeSet<ObjectId>> {
        let mut pending = Vec::new();
        Object::Dictionary(self.trailer.clone()).collect_references(&mut pending);
        let mut reachable = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if reachable.contains(&id) {
                continue;
            }
            match self.materialize(id) {
                Ok(object) => {
                    object.collect_references(&mut pending);
                    reachable.insert(id);
                }
                Err(Error::ObjectNotFound(_) | Error::PositionNotFound(_)) => {
                    warn!("reference to missing object {:?} is treated as null", id);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reachable)
    }

    /// Authenticate against the `/Encrypt` dictionary, if the trailer has one.
    pub(crate) fn unlock(&mut self, options: &LoadOptions) -> Result<()> {
        let Ok(encrypt) = self.trailer.get(b"Encrypt").cloned() else {
            return Ok(());
        };
        self.security = SecurityState::Locked;

        let encrypt_dict = match encrypt {
            Object::Reference(id) => {
                if let Some(source) = self.source.as_mut() {
                    source.encrypt_id = Some(id);
                }
                self.materialize(id)?.as_dict()?.clone()
            }
            Object::Dictionary(dict) => dict,
            _ => return Err(DecryptionError::MissingEncryptDictionary.into()),
        };
        let file_id = self
            .trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str().ok())
            .ok_or(DecryptionError::MissingFileID)?
            .to_vec();

        for password in options.passwords() {
            match EncryptionState::open(&encrypt_dict, &file_id, &password) {
                Ok(state) => {
                    if let Some(source) = self.source.as_mut() {
                        source.crypt = Some(state.clone());
                    }
                    self.security = SecurityState::Open(state);
                    return Ok(());
                }
                Err(DecryptionError::IncorrectPassword) => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Err(DecryptionError::IncorrectPassword.into())
    }

    pub(crate) fn encrypt_id(&self) -> Option<ObjectId> {
        self.trailer.get(b"Encrypt").and_then(Object::as_reference).ok()
    }

    /// The active encryption state, if the document is encrypted and open.
    pub fn encryption_state(&self) -> Option<&EncryptionState> {
        match &self.security {
            SecurityState::Open(state) => Some(state),
            _ => None,
        }
    }

    /// Encrypt the document with the standard security handler. Takes effect
    /// on the next full save.
    pub fn encrypt(&mut self, options: &EncryptionOptions) -> Result<()> {
        if self.is_encrypted() {
            self.remove_encryption()?;
        } else {
            self.load_all()?;
        }

        let file_id = match self
            .trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()
            .and_then(|ids| ids.first())
            .and_then(|id| id.as_str().ok())
        {
            Some(id) => id.to_vec(),
            None => {
                let id = rand::random::<[u8; 16]>().to_vec();
                self.trailer.set(
                    "ID",
                    vec![
                        Object::String(id.clone(), StringFormat::Hexadecimal),
                        Object::String(id.clone(), StringFormat::Hexadecimal),
                    ],
                );
                id
            }
        };

        let (state, dict) = EncryptionState::create(options, &file_id);
        let encrypt_id = self.add_object(dict);
        self.trailer.set("Encrypt", encrypt_id);
        self.security = SecurityState::Open(state);
        self.security_changed = true;
        Ok(())
    }

    /// Decrypt every object in memory and drop the `/Encrypt` dictionary.
    /// Takes effect on the next full save.
    pub fn remove_encryption(&mut self) -> Result<()> {
        self.load_all()?;
        if let Some(id) = self.encrypt_id() {
            self.delete_object(id);
        }
        self.trailer.remove(b"Encrypt");
        self.security = SecurityState::Unencrypted;
        self.security_changed = true;
        Ok(())
    }
}
