use std::collections::HashMap;

/// Challenge keys believed published, keyed by absolute FQDN.
#[derive(Default, Debug, Clone)]
pub struct InMemoryTxtStore {
    txt_records: HashMap<String, String>,
}

impl InMemoryTxtStore {
    /// Build a store from records parsed out of the zone file.
    #[must_use]
    pub fn from_records(txt_records: HashMap<String, String>) -> Self {
        InMemoryTxtStore { txt_records }
    }

    #[must_use]
    pub fn contains(&self, fqdn: &str) -> bool {
        self.txt_records.contains_key(fqdn)
    }

    #[must_use]
    pub fn get(&self, fqdn: &str) -> Option<&String> {
        self.txt_records.get(fqdn)
    }

    pub fn put(&mut self, fqdn: String, key: String) {
        self.txt_records.insert(fqdn, key);
    }

    pub fn delete(&mut self, fqdn: &str) -> Option<String> {
        self.txt_records.remove(fqdn)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.txt_records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.txt_records.is_empty()
    }
}
