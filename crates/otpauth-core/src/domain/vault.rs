//! The secret vault: a mapping of account name to TOTP secret.
//!
//! [`SecretSet`] is the unit of transfer for the sync protocol and the unit
//! of persistence for the on-disk vault. The protocol layer treats secrets
//! as opaque strings and performs no validation of their contents; secret
//! format checks happen when a secret is added through the CLI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An order-irrelevant mapping of unique account names to secret strings.
///
/// Backed by a `BTreeMap` so that iteration (and therefore the wire
/// encoding and the persisted JSON) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretSet {
    entries: BTreeMap<String, String>,
}

impl SecretSet {
    /// Creates an empty secret set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` when an entry with `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the secret stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Inserts `secret` under `name`, returning the previous secret when the
    /// name was already present.
    pub fn insert(&mut self, name: impl Into<String>, secret: impl Into<String>) -> Option<String> {
        self.entries.insert(name.into(), secret.into())
    }

    /// Removes the entry stored under `name`, returning its secret.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(name)
    }

    /// Renames the entry `old` to `new`, keeping its secret.
    ///
    /// Returns `false` when `old` does not exist. When `new` already exists
    /// its previous secret is replaced.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> bool {
        match self.entries.remove(old) {
            Some(secret) => {
                self.entries.insert(new.into(), secret);
                true
            }
            None => false,
        }
    }

    /// Merges `incoming` into this set, overwriting entries whose name
    /// collides with an incoming one. Returns the number of entries applied.
    pub fn merge(&mut self, incoming: SecretSet) -> usize {
        let applied = incoming.len();
        self.entries.extend(incoming.entries);
        applied
    }

    /// Iterates over `(name, secret)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, secret)| (name.as_str(), secret.as_str()))
    }

    /// Account names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<(String, String)> for SecretSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for SecretSet {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SecretSet {
        let mut set = SecretSet::new();
        set.insert("github", "JBSWY3DPEHPK3PXP");
        set.insert("work", "KRSXG5CTMVRXEZLU");
        set
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        // Arrange
        let set = sample();

        // Assert
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("github"), Some("JBSWY3DPEHPK3PXP"));
        assert_eq!(set.get("missing"), None);
    }

    #[test]
    fn test_insert_duplicate_returns_displaced_secret() {
        let mut set = sample();
        let old = set.insert("github", "NEWSECRET");
        assert_eq!(old.as_deref(), Some("JBSWY3DPEHPK3PXP"));
        assert_eq!(set.len(), 2, "replacing must not grow the set");
    }

    #[test]
    fn test_rename_moves_secret_to_new_name() {
        let mut set = sample();
        assert!(set.rename("github", "github-personal"));
        assert!(!set.contains("github"));
        assert_eq!(set.get("github-personal"), Some("JBSWY3DPEHPK3PXP"));
    }

    #[test]
    fn test_rename_missing_entry_returns_false() {
        let mut set = sample();
        assert!(!set.rename("nope", "other"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_merge_overwrites_colliding_names_and_keeps_disjoint_entries() {
        // Arrange
        let mut local = sample();
        let mut incoming = SecretSet::new();
        incoming.insert("github", "OVERWRITTEN");
        incoming.insert("email", "MFRGGZDFMZTWQ2LK");

        // Act
        let applied = local.merge(incoming);

        // Assert
        assert_eq!(applied, 2);
        assert_eq!(local.len(), 3);
        assert_eq!(local.get("github"), Some("OVERWRITTEN"));
        assert_eq!(local.get("work"), Some("KRSXG5CTMVRXEZLU"));
        assert_eq!(local.get("email"), Some("MFRGGZDFMZTWQ2LK"));
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: SecretSet = [
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]
        .into_iter()
        .collect();
        let b: SecretSet = [
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serde_json_is_a_flat_object() {
        // The vault file format is a plain `{ name: secret }` object, so the
        // serde representation must be transparent.
        let set = sample();
        let json = serde_json::to_string(&set).unwrap();
        assert!(json.contains("\"github\":\"JBSWY3DPEHPK3PXP\""));
        let restored: SecretSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, set);
    }
}
