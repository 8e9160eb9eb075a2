//! MSN object catalog
//!
//! Lookup of known descriptors keyed by `SHA1D`, optionally holding the
//! content itself. A catalog is created by whoever owns the session and
//! passed where it is needed.

use std::sync::Arc;

use hashbrown::HashMap;
use tracing::trace;

use super::msn_object::MsnObject;
use crate::errors::Result;

/// A catalogued descriptor and, when loaded, its data
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub object: MsnObject,
    pub data: Option<Arc<Vec<u8>>>,
}

/// Descriptors known to a session, keyed by `SHA1D`
#[derive(Debug, Default)]
pub struct MsnObjectCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl MsnObjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor without data, keeping any data already stored for it
    pub fn add(&mut self, object: MsnObject) {
        trace!(sha1d = object.sha1d(), "cataloguing MSN object");
        match self.entries.get_mut(object.sha1d()) {
            Some(entry) => entry.object = object,
            None => {
                self.entries.insert(
                    object.sha1d().to_string(),
                    CatalogEntry { object, data: None },
                );
            }
        }
    }

    /// Store a descriptor with its data; rejected when the data does not match
    pub fn add_data(&mut self, object: MsnObject, data: Vec<u8>) -> Option<MsnObject> {
        if !object.matches_data(&data) {
            return None;
        }
        self.entries.insert(
            object.sha1d().to_string(),
            CatalogEntry {
                object: object.clone(),
                data: Some(Arc::new(data)),
            },
        );
        Some(object)
    }

    pub fn get(&self, sha1d: &str) -> Option<&MsnObject> {
        self.entries.get(sha1d).map(|entry| &entry.object)
    }

    pub fn entry(&self, sha1d: &str) -> Option<&CatalogEntry> {
        self.entries.get(sha1d)
    }

    pub fn data(&self, sha1d: &str) -> Option<Arc<Vec<u8>>> {
        self.entries.get(sha1d)?.data.clone()
    }

    /// Resolve an `<msnobj/>` element to the catalogued descriptor
    pub fn get_by_context(&self, context: &str) -> Result<Option<&MsnObject>> {
        let object = MsnObject::parse(context)?;
        Ok(self.get(object.sha1d()))
    }

    pub fn remove(&mut self, sha1d: &str) -> Option<CatalogEntry> {
        self.entries.remove(sha1d)
    }

    pub fn contains(&self, sha1d: &str) -> bool {
        self.entries.contains_key(sha1d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::MsnObjectType;

    fn emoticon(data: &[u8]) -> MsnObject {
        MsnObject::from_data("bob@live.com", MsnObjectType::Emoticon, "0", "smile", data)
    }

    #[test]
    fn test_add_and_lookup() {
        let mut catalog = MsnObjectCatalog::new();
        assert!(catalog.is_empty());

        let object = emoticon(b":)");
        catalog.add(object.clone());
        assert!(catalog.contains(object.sha1d()));
        assert_eq!(catalog.get(object.sha1d()), Some(&object));
        assert!(catalog.data(object.sha1d()).is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_add_data_checks_content() {
        let mut catalog = MsnObjectCatalog::new();
        let object = emoticon(b":)");
        assert!(catalog.add_data(object.clone(), b":(".to_vec()).is_none());
        assert!(catalog.is_empty());

        assert!(catalog.add_data(object.clone(), b":)".to_vec()).is_some());
        assert_eq!(catalog.data(object.sha1d()).as_deref(), Some(&b":)".to_vec()));

        // Re-adding the bare descriptor keeps the stored data
        catalog.add(object.clone());
        assert!(catalog.data(object.sha1d()).is_some());
    }

    #[test]
    fn test_lookup_by_context() {
        let mut catalog = MsnObjectCatalog::new();
        let object = emoticon(b";)");
        catalog.add(object.clone());

        let found = catalog.get_by_context(&object.to_context()).unwrap();
        assert_eq!(found, Some(&object));

        let other = emoticon(b":P");
        assert_eq!(catalog.get_by_context(&other.to_context()).unwrap(), None);
        assert!(catalog.get_by_context("garbage").is_err());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut catalog = MsnObjectCatalog::new();
        let a = emoticon(b"a");
        let b = emoticon(b"b");
        catalog.add(a.clone());
        catalog.add(b);

        assert!(catalog.remove(a.sha1d()).is_some());
        assert!(catalog.remove(a.sha1d()).is_none());
        assert_eq!(catalog.len(), 1);

        catalog.clear();
        assert!(catalog.is_empty());
    }
}
