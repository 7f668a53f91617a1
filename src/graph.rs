//! Moving objects between documents.
//!
//! A reference is only meaningful inside the document that holds the
//! referenced object. An [`ObjectHandle`] therefore either stays bound to its
//! owning document (`export`) or carries a self-contained copy of everything
//! it reaches (`deep_clone`), which `attach` then renumbers into the target.

use log::{debug, warn};
use md5::{Digest as _, Md5};
use std::collections::{BTreeMap, BTreeSet};

use crate::document::DocumentId;
use crate::{Dictionary, Document, Error, Object, ObjectId, Result};

/// An object taken out of a document.
#[derive(Debug, Clone)]
pub struct ObjectHandle {
    owner: Option<DocumentId>,
    root: Option<ObjectId>,
    object: Object,
    /// Everything the root reaches, keyed by the ids it had in the source.
    dependencies: BTreeMap<ObjectId, Object>,
}

impl ObjectHandle {
    /// An unowned handle for a value built in code. References inside it are
    /// kept as they are when attached.
    pub fn new<T: Into<Object>>(object: T) -> ObjectHandle {
        ObjectHandle {
            owner: None,
            root: None,
            object: object.into(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn owner(&self) -> Option<DocumentId> {
        self.owner
    }

    /// Id of the object in the document it came from.
    pub fn root(&self) -> Option<ObjectId> {
        self.root
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn dependencies(&self) -> &BTreeMap<ObjectId, Object> {
        &self.dependencies
    }

    pub fn is_owned_by(&self, document: &Document) -> bool {
        self.owner == Some(document.id())
    }
}

/// Page tree links are not followed when copying a subgraph.
fn strip_tree_links(object: &mut Object) {
    if let Some(dict) = object.dict_mut() {
        if dict.type_is(b"Page") || dict.type_is(b"Pages") {
            dict.remove(b"Parent");
        }
    }
}

/// Rewrite references through `map`. References missing from `map` become
/// `null` when `drop_unknown` is set and are kept otherwise.
fn relink(object: &mut Object, map: &BTreeMap<ObjectId, ObjectId>, drop_unknown: bool) {
    match object {
        Object::Reference(id) => match map.get(id) {
            Some(new_id) => *id = *new_id,
            None if drop_unknown => *object = Object::Null,
            None => {}
        },
        Object::Array(items) => items.iter_mut().for_each(|item| relink(item, map, drop_unknown)),
        Object::Dictionary(dict) => relink_dictionary(dict, map, drop_unknown),
        Object::Stream(stream) => relink_dictionary(&mut stream.dict, map, drop_unknown),
        _ => {}
    }
}

fn relink_dictionary(dict: &mut Dictionary, map: &BTreeMap<ObjectId, ObjectId>, drop_unknown: bool) {
    for (_, value) in dict.iter_mut() {
        relink(value, map, drop_unknown);
    }
}

impl Document {
    /// A handle bound to this document. Attaching it elsewhere fails with
    /// `Error::Ownership`.
    pub fn export(&mut self, id: ObjectId) -> Result<ObjectHandle> {
        let object = self.get_object(id)?.clone();
        Ok(ObjectHandle {
            owner: Some(self.id()),
            root: Some(id),
            object,
            dependencies: BTreeMap::new(),
        })
    }

    /// An unowned copy of `id` and every object it reaches. References to
    /// objects that cannot be read become `null`.
    pub fn deep_clone(&mut self, id: ObjectId) -> Result<ObjectHandle> {
        let mut object = self.get_object(id)?.clone();
        strip_tree_links(&mut object);

        let mut pending = Vec::new();
        object.collect_references(&mut pending);
        let mut dependencies = BTreeMap::new();
        let mut missing = BTreeSet::new();
        while let Some(dependency) = pending.pop() {
            if dependency == id || dependencies.contains_key(&dependency) || missing.contains(&dependency) {
                continue;
            }
            match self.materialize(dependency) {
                Ok(found) => {
                    let mut found = found.clone();
                    strip_tree_links(&mut found);
                    found.collect_references(&mut pending);
                    dependencies.insert(dependency, found);
                }
                Err(Error::ObjectNotFound(_) | Error::PositionNotFound(_)) => {
                    warn!("object {:?} reached from {:?} is missing, cloned as null", dependency, id);
                    missing.insert(dependency);
                }
                Err(err) => return Err(err),
            }
        }

        // Identity map over the closure; anything outside it was missing.
        let mut known: BTreeMap<ObjectId, ObjectId> = dependencies.keys().map(|&dep| (dep, dep)).collect();
        known.insert(id, id);
        relink(&mut object, &known, true);
        for dependency in dependencies.values_mut() {
            relink(dependency, &known, true);
        }

        Ok(ObjectHandle {
            owner: None,
            root: Some(id),
            object,
            dependencies,
        })
    }

    /// Insert a handle into this document and return the id of its root.
    pub fn attach(&mut self, handle: ObjectHandle) -> Result<ObjectId> {
        match handle.owner {
            Some(owner) if owner == self.id() => {
                return handle.root.ok_or(Error::ObjectNotFound((0, 0)));
            }
            Some(_) => {
                return Err(Error::Ownership {
                    id: handle.root.unwrap_or((0, 0)),
                });
            }
            None => {}
        }

        let new_root = self.new_object_id();
        let mut map = BTreeMap::new();
        if let Some(root) = handle.root {
            map.insert(root, new_root);
        }
        for &old in handle.dependencies.keys() {
            let new_id = self.new_object_id();
            map.insert(old, new_id);
        }

        for (old, mut object) in handle.dependencies {
            relink(&mut object, &map, false);
            if let Some(&new_id) = map.get(&old) {
                self.set_object(new_id, object);
            }
        }
        let mut object = handle.object;
        relink(&mut object, &map, false);
        self.set_object(new_root, object);
        debug!("attached {} objects, root {:?}", map.len().max(1), new_root);
        Ok(new_root)
    }

    /// Append the pages of every document, in order, to this document's page
    /// tree. Returns the ids of the new pages.
    pub fn merge(&mut self, documents: Vec<Document>) -> Result<Vec<ObjectId>> {
        let root = self.ensure_page_tree()?;
        let mut added = Vec::new();

        for mut source in documents {
            let pages = source.get_pages()?;
            // Pages are allocated up front so links between them stay inside the merge.
            let mut imported: BTreeMap<ObjectId, ObjectId> =
                pages.values().map(|&page| (page, self.new_object_id())).collect();

            for page_id in pages.values() {
                let mut page = Object::Dictionary(source.page_with_inherited(*page_id)?);
                strip_tree_links(&mut page);

                let mut pending = Vec::new();
                page.collect_references(&mut pending);
                let mut copies = Vec::new();
                let mut missing = BTreeSet::new();
                while let Some(id) = pending.pop() {
                    if imported.contains_key(&id) || missing.contains(&id) {
                        continue;
                    }
                    match source.materialize(id) {
                        Ok(object) => {
                            let mut object = object.clone();
                            strip_tree_links(&mut object);
                            object.collect_references(&mut pending);
                            let new_id = self.new_object_id();
                            imported.insert(id, new_id);
                            copies.push((new_id, object));
                        }
                        Err(Error::ObjectNotFound(_) | Error::PositionNotFound(_)) => {
                            warn!("page {:?} refers to missing object {:?}", page_id, id);
                            missing.insert(id);
                        }
                        Err(err) => return Err(err),
                    }
                }

                for (new_id, mut object) in copies {
                    relink(&mut object, &imported, true);
                    self.set_object(new_id, object);
                }
                relink(&mut page, &imported, true);
                if let Some(dict) = page.dict_mut() {
                    dict.set("Parent", root);
                }
                let new_page = imported.get(page_id).copied().ok_or(Error::ObjectNotFound(*page_id))?;
                self.set_object(new_page, page);
                added.push(new_page);
            }
        }

        self.append_kids(root, &added)?;
        Ok(added)
    }

    /// Collapse identical streams onto the lowest id and rewrite references.
    /// Returns the number of streams dropped.
    pub fn deduplicate(&mut self) -> Result<usize> {
        self.load_all()?;

        let mut by_digest: BTreeMap<[u8; 16], Vec<ObjectId>> = BTreeMap::new();
        for (&id, object) in &self.objects {
            if let Object::Stream(stream) = object {
                let digest: [u8; 16] = Md5::digest(&stream.content).into();
                by_digest.entry(digest).or_default().push(id);
            }
        }

        let without_length = |dict: &Dictionary| {
            let mut dict = dict.clone();
            dict.remove(b"Length");
            dict
        };
        let mut replacements = BTreeMap::new();
        for ids in by_digest.values().filter(|ids| ids.len() > 1) {
            let mut kept: Vec<ObjectId> = Vec::new();
            for &id in ids {
                let Some(Object::Stream(stream)) = self.objects.get(&id) else {
                    continue;
                };
                let duplicate_of = kept.iter().copied().find(|kept_id| match self.objects.get(kept_id) {
                    Some(Object::Stream(kept_stream)) => {
                        kept_stream.content == stream.content
                            && without_length(&kept_stream.dict) == without_length(&stream.dict)
                    }
                    _ => false,
                });
                match duplicate_of {
                    Some(kept_id) => {
                        replacements.insert(id, kept_id);
                    }
                    None => kept.push(id),
                }
            }
        }
        if replacements.is_empty() {
            return Ok(0);
        }

        let mut changed = Vec::new();
        for (&id, object) in self.objects.iter_mut() {
            let mut touched = false;
            object.visit_references_mut(&mut |reference: &mut ObjectId| {
                if let Some(&kept) = replacements.get(reference) {
                    *reference = kept;
                    touched = true;
                }
            });
            if touched {
                changed.push(id);
            }
        }
        self.modified.extend(changed);
        let mut trailer = Object::Dictionary(std::mem::take(&mut self.trailer));
        trailer.visit_references_mut(&mut |reference: &mut ObjectId| {
            if let Some(&kept) = replacements.get(reference) {
                *reference = kept;
            }
        });
        if let Object::Dictionary(trailer) = trailer {
            self.trailer = trailer;
        }

        for &duplicate in replacements.keys() {
            self.delete_object(duplicate);
        }
        debug!("deduplicated {} streams", replacements.len());
        Ok(replacements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stream;

    #[test]
    fn handles_respect_ownership() {
        let mut first = Document::new();
        let mut second = Document::new();
        let id = first.add_object(dictionary! { "Key" => "Value" });

        let handle = first.export(id).unwrap();
        assert!(handle.is_owned_by(&first));
        assert_eq!(first.attach(handle.clone()).unwrap(), id);

        let err = second.attach(handle).unwrap_err();
        assert!(matches!(err, Error::Ownership { id: found } if found == id));
    }

    #[test]
    fn deep_clone_is_renumbered_on_attach() {
        let mut source = Document::new();
        let leaf = source.add_object(Stream::new(Dictionary::new(), b"data".to_vec()));
        let root = source.add_object(dictionary! { "Leaf" => leaf, "Gone" => (40, 0), "Self" => (2, 0) });

        let handle = source.deep_clone(root).unwrap();
        assert!(handle.owner().is_none());
        assert_eq!(handle.dependencies().len(), 1);

        let mut target = Document::new();
        target.add_object(1);
        let attached = target.attach(handle).unwrap();
        let dict = target.get_dictionary(attached).unwrap().clone();
        assert_eq!(dict.get(b"Gone").unwrap(), &Object::Null);
        assert_eq!(dict.get(b"Self").unwrap(), &Object::Reference(attached));
        let leaf_id = dict.get(b"Leaf").and_then(Object::as_reference).unwrap();
        assert_ne!(leaf_id, leaf);
        assert_eq!(target.get_object(leaf_id).unwrap().as_stream().unwrap().content, b"data");
    }

    #[test]
    fn programmatic_handles_keep_references() {
        let mut doc = Document::new();
        let existing = doc.add_object(5);
        let id = doc.attach(ObjectHandle::new(vec![Object::Reference(existing)])).unwrap();
        assert_eq!(doc.get_object(id).unwrap(), &Object::Array(vec![Object::Reference(existing)]));
    }

    #[test]
    fn deduplicate_keeps_lowest_id() {
        let mut doc = Document::new();
        let first = doc.add_object(Stream::new(dictionary! { "Subtype" => "Form" }, b"same".to_vec()));
        let second = doc.add_object(Stream::new(dictionary! { "Subtype" => "Form" }, b"same".to_vec()));
        let other = doc.add_object(Stream::new(dictionary! { "Subtype" => "Image" }, b"same".to_vec()));
        let holder = doc.add_object(dictionary! { "A" => first, "B" => second, "C" => other });
        doc.trailer.set("Root", holder);

        assert_eq!(doc.deduplicate().unwrap(), 1);
        let holder = doc.get_dictionary(holder).unwrap();
        assert_eq!(holder.get(b"B").unwrap(), &Object::Reference(first));
        assert_eq!(holder.get(b"C").unwrap(), &Object::Reference(other));
        assert!(doc.get_object(second).is_err());
        assert_eq!(doc.deduplicate().unwrap(), 0);
    }
}
