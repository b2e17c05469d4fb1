use std::collections::HashMap;

use serde_json::Value;

/// Normalize a scraped URL into its dedupe identity.
///
/// Trims whitespace, assumes `https://` when no scheme is given, lowercases
/// scheme and host and drops a trailing slash, so `a.com`, `https://a.com/`
/// and `HTTPS://A.COM` all share one key.
pub fn normalize_item_key(raw: &str) -> String {
    let trimmed = raw.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    match url::Url::parse(&with_scheme) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => trimmed.trim_end_matches('/').to_ascii_lowercase(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// Key as last reported on the wire.
    pub item_key: String,
    pub payload: Value,
}

/// At most one result per item; last write wins, first insertion keeps its slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultIndex {
    slots: HashMap<String, usize>,
    entries: Vec<ResultEntry>,
}

impl ResultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for `item_key`. Returns true if the key was new.
    pub fn upsert(&mut self, item_key: &str, payload: Value) -> bool {
        let key = normalize_item_key(item_key);
        let entry = ResultEntry {
            item_key: item_key.trim().to_string(),
            payload,
        };
        match self.slots.get(&key) {
            Some(&slot) => {
                self.entries[slot] = entry;
                false
            }
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    pub fn get(&self, item_key: &str) -> Option<&ResultEntry> {
        self.slots
            .get(&normalize_item_key(item_key))
            .map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, item_key: &str) -> bool {
        self.slots.contains_key(&normalize_item_key(item_key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.entries.clear();
    }
}
