use std::collections::HashMap;

/// Path-keyed store of previously generated markup.
///
/// Keys are navigation-path keys (`NavigationPath::key`), values the last
/// fully streamed view for that path. Entries are never evicted — the map
/// grows for the lifetime of the session. The runtime toggle hides entries
/// without dropping them: while disabled, lookups miss and stores are
/// no-ops, and re-enabling makes previously stored keys visible again.
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: HashMap<String, String>,
    enabled: bool,
}

impl ViewCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: HashMap::new(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Cached view for `key`, or `None` — always `None` while disabled.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.entries.get(key).map(String::as_str)
    }

    /// Store a completed view. No-op while disabled, and no-op when the
    /// stored value already equals `content`.
    pub fn store(&mut self, key: &str, content: &str) {
        if !self.enabled {
            return;
        }
        if self.entries.get(key).is_some_and(|cur| cur == content) {
            return;
        }
        self.entries.insert(key.to_string(), content.to_string());
    }

    /// Number of stored entries (visible or not).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
