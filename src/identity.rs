//! Player identity lookup for legacy replays.
//!
//! Legacy recordings do not store a player id; they store the player's start
//! position. A historical table maps (map name, start position) to a numeric
//! player id. The table is external data, so the decoder only sees it through
//! the [`IdentityLookup`] trait.
//!
//! # Example
//!
//! ```
//! use coh2_replay::identity::{IdentityLookup, IdentityTable};
//!
//! let table = IdentityTable::from_json(
//!     r#"{ "$11045520": { "33620761": 256, "39533638": 258 } }"#,
//! ).unwrap();
//!
//! assert_eq!(table.resolve("$11045520", 33_620_761), Some(0x100));
//! assert_eq!(table.resolve("$11045520", 1), None);
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Resolves a player id from a map name and a start position.
pub trait IdentityLookup {
    /// Returns the id for `(map, position)`, or `None` when unknown.
    fn resolve(&self, map: &str, position: u32) -> Option<u32>;
}

/// A lookup that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl IdentityLookup for NoLookup {
    fn resolve(&self, _map: &str, _position: u32) -> Option<u32> {
        None
    }
}

impl<F> IdentityLookup for F
where
    F: Fn(&str, u32) -> Option<u32>,
{
    fn resolve(&self, map: &str, position: u32) -> Option<u32> {
        self(map, position)
    }
}

/// An in-memory (map name, start position) → id table.
///
/// Deserializes from JSON objects keyed by map name, each holding an object
/// keyed by the decimal start position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct IdentityTable {
    maps: HashMap<String, HashMap<u32, u32>>,
}

impl IdentityTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one entry.
    pub fn insert(&mut self, map: impl Into<String>, position: u32, id: u32) {
        self.maps.entry(map.into()).or_default().insert(position, id);
    }

    /// Parses a table from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::IdentityTable` if the text is not a valid table.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON table file.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::IoError` if the file cannot be read, or
    /// `ParserError::IdentityTable` if its contents are not a valid table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Number of entries across all maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.values().map(HashMap::len).sum()
    }

    /// Returns whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IdentityLookup for IdentityTable {
    fn resolve(&self, map: &str, position: u32) -> Option<u32> {
        self.maps.get(map)?.get(&position).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;

    #[test]
    fn test_no_lookup() {
        assert_eq!(NoLookup.resolve("$11045520", 33_620_761), None);
    }

    #[test]
    fn test_closure_lookup() {
        let lookup = |map: &str, position: u32| (map == "m" && position == 7).then_some(99);
        assert_eq!(lookup.resolve("m", 7), Some(99));
        assert_eq!(lookup.resolve("m", 8), None);
    }

    #[test]
    fn test_table_insert_and_resolve() {
        let mut table = IdentityTable::new();
        assert!(table.is_empty());

        table.insert("$11045520", 33_620_761, 0x100);
        table.insert("$11045520", 39_533_638, 0x102);

        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve("$11045520", 39_533_638), Some(0x102));
        assert_eq!(table.resolve("$0", 39_533_638), None);
    }

    #[test]
    fn test_table_from_json() {
        let table = IdentityTable::from_json(r#"{ "$1": { "5": 10 }, "$2": {} }"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("$1", 5), Some(10));
    }

    #[test]
    fn test_table_from_invalid_json() {
        let err = IdentityTable::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, ParserError::IdentityTable(_)));
        assert!(err.to_string().starts_with("Invalid identity table"));
    }

    #[test]
    fn test_table_file_with_bad_contents_is_not_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");
        std::fs::write(&path, r#"{ "$1": { "five": 10 } }"#).unwrap();

        let err = IdentityTable::from_file(&path).unwrap_err();
        assert!(matches!(err, ParserError::IdentityTable(_)));
    }

    #[test]
    fn test_missing_table_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IdentityTable::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ParserError::IoError(_)));
    }
}
