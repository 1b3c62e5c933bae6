//! Upload List
//!
//! The ordered, duplicate-free list of stored filenames a visitor has
//! uploaded. Serialized as a single `|`-separated string.

/// Separator between entries in the serialized list
pub const LIST_SEPARATOR: &str = "|";

/// Cookie values past ~4KB are dropped by browsers
pub const DEFAULT_MAX_SERIALIZED_BYTES: usize = 3800;

/// Bounds that keep a serialized list inside browser cookie limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub max_entries: usize,
    pub max_serialized_bytes: usize,
}

impl ListLimits {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            max_serialized_bytes: DEFAULT_MAX_SERIALIZED_BYTES,
        }
    }
}

impl Default for ListLimits {
    fn default() -> Self {
        Self::new(64)
    }
}

/// What an append did to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Added,
    AlreadyPresent,
    /// Added after dropping the oldest entries
    AddedWithEviction(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadList {
    entries: Vec<String>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized list.
    ///
    /// Empty segments and repeated names are dropped, keeping the first
    /// occurrence, so `""` parses to an empty list.
    pub fn parse(value: &str) -> Self {
        let mut list = Self::new();
        for entry in value.split(LIST_SEPARATOR).filter(|e| !e.is_empty()) {
            if !list.contains(entry) {
                list.entries.push(entry.to_string());
            }
        }
        list
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact membership, never a substring match
    pub fn contains(&self, filename: &str) -> bool {
        self.entries.iter().any(|e| e == filename)
    }

    /// Append `filename` unless already present, evicting the oldest
    /// entries when `limits` would be exceeded.
    pub fn append(&mut self, filename: &str, limits: &ListLimits) -> AppendOutcome {
        if self.contains(filename) {
            return AppendOutcome::AlreadyPresent;
        }

        self.entries.push(filename.to_string());

        let mut evicted = Vec::new();
        while self.entries.len() > 1
            && (self.entries.len() > limits.max_entries
                || self.serialized_len() > limits.max_serialized_bytes)
        {
            evicted.push(self.entries.remove(0));
        }

        if evicted.is_empty() {
            AppendOutcome::Added
        } else {
            AppendOutcome::AddedWithEviction(evicted)
        }
    }

    /// Keep only entries accepted by `keep`
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&String) -> bool,
    {
        self.entries.retain(keep);
    }

    pub fn serialize(&self) -> String {
        self.entries.join(LIST_SEPARATOR)
    }

    fn serialized_len(&self) -> usize {
        let names: usize = self.entries.iter().map(String::len).sum();
        names + self.entries.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_is_empty_list() {
        let list = UploadList::parse("");
        assert!(list.is_empty());
        assert_eq!(list.serialize(), "");
    }

    #[test]
    fn test_parse_preserves_order_and_drops_noise() {
        let list = UploadList::parse("b.png||a.png|b.png|");
        assert_eq!(list.entries(), ["b.png", "a.png"]);
    }

    #[test]
    fn test_append_is_idempotent() {
        let limits = ListLimits::default();
        let mut list = UploadList::parse("a.png|b.png");

        assert_eq!(list.append("a.png", &limits), AppendOutcome::AlreadyPresent);
        assert_eq!(list.serialize(), "a.png|b.png");

        assert_eq!(list.append("c.gif", &limits), AppendOutcome::Added);
        assert_eq!(list.serialize(), "a.png|b.png|c.gif");
    }

    #[test]
    fn test_single_entry_has_no_separator() {
        let mut list = UploadList::new();
        list.append("abc.png", &ListLimits::default());
        assert_eq!(list.serialize(), "abc.png");
    }

    #[test]
    fn test_membership_is_exact() {
        // "ab.png" is a substring of "cab.png" but a different file
        let mut list = UploadList::parse("cab.png");
        assert_eq!(list.append("ab.png", &ListLimits::default()), AppendOutcome::Added);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_entry_cap_evicts_oldest() {
        let limits = ListLimits::new(2);
        let mut list = UploadList::new();
        list.append("1.png", &limits);
        list.append("2.png", &limits);

        let outcome = list.append("3.png", &limits);
        assert_eq!(outcome, AppendOutcome::AddedWithEviction(vec!["1.png".to_string()]));
        assert_eq!(list.entries(), ["2.png", "3.png"]);
    }

    #[test]
    fn test_byte_cap_evicts_oldest() {
        let limits = ListLimits {
            max_entries: 100,
            max_serialized_bytes: 12,
        };
        let mut list = UploadList::new();
        list.append("aaaa.png", &limits);

        // "aaaa.png|bbbb.png" is 17 bytes
        let outcome = list.append("bbbb.png", &limits);
        assert!(matches!(outcome, AppendOutcome::AddedWithEviction(_)));
        assert_eq!(list.serialize(), "bbbb.png");
    }

    #[test]
    fn test_newest_entry_is_never_evicted() {
        let limits = ListLimits {
            max_entries: 1,
            max_serialized_bytes: 3,
        };
        let mut list = UploadList::new();
        list.append("long-name.png", &limits);
        assert_eq!(list.entries(), ["long-name.png"]);
    }
}
