use log::warn;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::Operation;
use crate::{Dictionary, Document, Error, Object, ObjectId, Result};

/// Page attributes a page inherits from its ancestors in the page tree.
pub const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

impl Document {
    /// Id of the root `/Pages` node named by the catalog.
    pub fn page_tree_root(&mut self) -> Result<ObjectId> {
        let catalog = self.catalog_id()?;
        self.materialize(catalog)
            .and_then(Object::as_dict)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|err| err.during(Operation::Resolve))
    }

    /// Pages in document order, keyed by page number starting at 1.
    pub fn get_pages(&mut self) -> Result<BTreeMap<u32, ObjectId>> {
        let root = self.page_tree_root()?;
        self.collect_pages(root).map_err(|err| err.during(Operation::Resolve))
    }

    fn collect_pages(&mut self, root: ObjectId) -> Result<BTreeMap<u32, ObjectId>> {
        let mut pages = BTreeMap::new();
        let mut visited = BTreeSet::new();
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                return Err(Error::ReferenceCycle(id));
            }
            let node = self.materialize(id)?.as_dict()?;
            let is_tree_node = node.type_is(b"Pages") || (!node.type_is(b"Page") && node.has(b"Kids"));
            if !is_tree_node {
                pages.insert(pages.len() as u32 + 1, id);
                continue;
            }
            let kids = node.get(b"Kids").and_then(Object::as_array)?;
            // Reversed so that the first kid is popped first.
            for kid in kids.iter().rev() {
                match kid.as_reference() {
                    Ok(kid) => pending.push(kid),
                    Err(_) => warn!("page tree node {:?} has a kid that is not a reference", id),
                }
            }
        }
        Ok(pages)
    }

    pub fn page_count(&mut self) -> Result<usize> {
        self.get_pages().map(|pages| pages.len())
    }

    /// The catalog and root page tree node, created when missing.
    pub(crate) fn ensure_page_tree(&mut self) -> Result<ObjectId> {
        if let Ok(root) = self.page_tree_root() {
            return Ok(root);
        }
        let pages = self.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        match self.catalog_id() {
            Ok(catalog) => self.get_dictionary_mut(catalog)?.set("Pages", pages),
            Err(_) => {
                let catalog = self.add_object(dictionary! {
                    "Type" => "Catalog",
                    "Pages" => pages,
                });
                self.trailer.set("Root", catalog);
            }
        }
        Ok(pages)
    }

    /// Append a page at the end of the root page tree node.
    pub fn add_page(&mut self, mut page: Dictionary) -> Result<ObjectId> {
        let root = self.ensure_page_tree()?;
        page.set("Type", "Page");
        page.set("Parent", root);
        let id = self.add_object(page);
        self.append_kids(root, &[id])?;
        Ok(id)
    }

    /// Add pages to a tree node's `/Kids` and raise `/Count` on it.
    pub(crate) fn append_kids(&mut self, node: ObjectId, kids: &[ObjectId]) -> Result<()> {
        let node = self.get_dictionary_mut(node)?;
        let count = node.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        if !node.get(b"Kids").is_ok_and(|kids| kids.as_array().is_ok()) {
            node.set("Kids", Vec::<Object>::new());
        }
        node.get_mut(b"Kids")
            .and_then(Object::as_array_mut)?
            .extend(kids.iter().map(|&kid| Object::Reference(kid)));
        node.set("Count", count + kids.len() as i64);
        Ok(())
    }

    /// Value of an inheritable attribute, looked up on the page and then on
    /// its ancestors.
    pub fn get_page_attribute(&mut self, page: ObjectId, key: &[u8]) -> Result<Option<Object>> {
        let mut visited = BTreeSet::new();
        let mut current = page;
        loop {
            if !visited.insert(current) {
                return Err(Error::ReferenceCycle(current).during(Operation::Resolve));
            }
            let node = self.get_dictionary(current)?;
            if let Ok(value) = node.get(key) {
                return Ok(Some(value.clone()));
            }
            match node.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => current = parent,
                Err(_) => return Ok(None),
            }
        }
    }

    /// The page dictionary with every missing inheritable attribute copied in.
    pub(crate) fn page_with_inherited(&mut self, page: ObjectId) -> Result<Dictionary> {
        let mut dict = self.get_dictionary(page)?.clone();
        for key in INHERITABLE_ATTRIBUTES {
            if !dict.has(key) {
                if let Some(value) = self.get_page_attribute(page, key)? {
                    dict.set(key, value);
                }
            }
        }
        Ok(dict)
    }
}
