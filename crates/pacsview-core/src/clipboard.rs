//! Per-user selection set used to stage items for batched export.
//!
//! The clipboard is persisted as a single string on the owning
//! [`crate::model::Person`] record and reconstructed at the start of every
//! operation. The string form is total and round-trip safe:
//! `Clipboard::parse(&c.serialize()) == c` for every clipboard `c`.
//!
//! Format: semicolon-separated kind groups, each `kind:id,id,...`, e.g.
//! `series:5,7;study:3`. Group order and id order are insertion order.

use indexmap::IndexMap;

use crate::error::{CoreError, Result};
use crate::model::ItemKind;

/// Ordered multi-type selection set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clipboard {
    items: IndexMap<ItemKind, Vec<i64>>,
}

impl Clipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted clipboard string. The empty string is the empty
    /// clipboard.
    pub fn parse(s: &str) -> Result<Self> {
        let mut clipboard = Self::new();
        for group in s.split(';').filter(|g| !g.is_empty()) {
            let (kind, ids) = group.split_once(':').ok_or_else(|| {
                CoreError::validation(format!("malformed clipboard group: {group}"))
            })?;
            let kind: ItemKind = kind.parse()?;
            for id in ids.split(',').filter(|i| !i.is_empty()) {
                let id: i64 = id.parse().map_err(|_| {
                    CoreError::validation(format!("malformed clipboard id: {id}"))
                })?;
                clipboard.add(kind, id);
            }
        }
        Ok(clipboard)
    }

    /// Serialize to the persisted string form.
    pub fn serialize(&self) -> String {
        self.items
            .iter()
            .map(|(kind, ids)| {
                let ids = ids
                    .iter()
                    .map(i64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{kind}:{ids}")
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Append an item unless already present, preserving existing order.
    /// Returns `true` if the item was inserted.
    pub fn add(&mut self, kind: ItemKind, id: i64) -> bool {
        let ids = self.items.entry(kind).or_default();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        true
    }

    /// Remove an item; no-op if absent.
    pub fn remove(&mut self, kind: ItemKind, id: i64) {
        if let Some(ids) = self.items.get_mut(&kind) {
            ids.retain(|existing| *existing != id);
            if ids.is_empty() {
                self.items.shift_remove(&kind);
            }
        }
    }

    /// Empty every kind.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, kind: ItemKind, id: i64) -> bool {
        self.items
            .get(&kind)
            .is_some_and(|ids| ids.contains(&id))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of selected items across all kinds.
    pub fn len(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// Ids selected for one kind, in insertion order.
    pub fn ids(&self, kind: ItemKind) -> &[i64] {
        self.items.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Iterate over `(kind, ids)` groups in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKind, &[i64])> {
        self.items.iter().map(|(kind, ids)| (*kind, ids.as_slice()))
    }
}

impl std::fmt::Display for Clipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut c = Clipboard::new();
        assert!(c.add(ItemKind::Series, 5));
        assert!(!c.add(ItemKind::Series, 5));
        assert_eq!(c.ids(ItemKind::Series), &[5]);
    }

    #[test]
    fn test_add_preserves_order() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Series, 5);
        c.add(ItemKind::Series, 2);
        c.add(ItemKind::Series, 9);
        c.add(ItemKind::Series, 2);
        assert_eq!(c.ids(ItemKind::Series), &[5, 2, 9]);
    }

    #[test]
    fn test_remove_then_add_moves_to_end() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Series, 5);
        c.add(ItemKind::Series, 7);
        c.remove(ItemKind::Series, 5);
        c.add(ItemKind::Series, 5);
        assert_eq!(c.ids(ItemKind::Series), &[7, 5]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Study, 3);
        c.remove(ItemKind::Study, 99);
        c.remove(ItemKind::Series, 3);
        assert_eq!(c.ids(ItemKind::Study), &[3]);
    }

    #[test]
    fn test_clear_empties_every_kind() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Patient, 1);
        c.add(ItemKind::Study, 2);
        c.add(ItemKind::Series, 3);
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.serialize(), "");
    }

    #[test]
    fn test_round_trip() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Series, 5);
        c.add(ItemKind::Series, 7);
        c.add(ItemKind::Study, 3);
        c.add(ItemKind::Patient, 11);
        let parsed = Clipboard::parse(&c.serialize()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_round_trip_after_removal() {
        let mut c = Clipboard::new();
        c.add(ItemKind::Series, 5);
        c.add(ItemKind::Study, 3);
        c.remove(ItemKind::Series, 5);
        let parsed = Clipboard::parse(&c.serialize()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_parse_empty_string() {
        assert_eq!(Clipboard::parse("").unwrap(), Clipboard::new());
    }

    #[test]
    fn test_parse_known_format() {
        let c = Clipboard::parse("series:5,7;study:3").unwrap();
        assert_eq!(c.ids(ItemKind::Series), &[5, 7]);
        assert_eq!(c.ids(ItemKind::Study), &[3]);
        assert_eq!(c.serialize(), "series:5,7;study:3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Clipboard::parse("series").is_err());
        assert!(Clipboard::parse("frame:1").is_err());
        assert!(Clipboard::parse("series:x").is_err());
    }

    #[test]
    fn test_parse_deduplicates() {
        let c = Clipboard::parse("series:5,5,7").unwrap();
        assert_eq!(c.ids(ItemKind::Series), &[5, 7]);
    }
}
