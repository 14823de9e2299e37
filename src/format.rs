//! Format constants and schema revision selection for CoH2 replays.
//!
//! Two schema revisions of the replay format are known. They share the
//! container framing but differ in:
//!
//! - the width of the header version field (u32 vs. a zero u16 marker and a u16),
//! - the chunk versions registered for the scenario and match-data chunks,
//! - how a player's identity is encoded (start position vs. platform id),
//! - the trailing padding after each player record,
//! - whether the tick stream after the containers is scanned.
//!
//! The revision is picked once per decode as a [`Schema`] value and every
//! record decoder is parameterized by it.
//!
//! # Example
//!
//! ```
//! use coh2_replay::format::{detect_schema, LeafKind, Schema};
//!
//! assert_eq!(detect_schema(&[0x00, 0x00, 0x99, 0x4C]).unwrap(), Schema::Steam);
//! assert_eq!(Schema::Legacy.leaf_kind(b"DATADATA", 0x4), Some(LeafKind::MatchData));
//! assert_eq!(Schema::Steam.leaf_kind(b"DATADATA", 0x4), None);
//! ```

use serde::Serialize;

use crate::error::{ParserError, Result};

/// Signature opening every top-level container.
pub const CHUNKY_MAGIC: &[u8; 12] = b"Relic Chunky";

/// The only supported container format version.
pub const CHUNKY_VERSION: u32 = 3;

/// Size of the fixed part of the container header, included in its declared length.
pub const CHUNKY_FIXED_HEADER_SIZE: u32 = 28;

/// Absolute offset where the first container starts.
pub const CONTAINER_OFFSET: usize = 76;

/// First four bytes of a group chunk tag.
pub const FOLD_MARKER: &[u8; 4] = b"FOLD";

/// First four bytes of a leaf chunk tag.
pub const DATA_MARKER: &[u8; 4] = b"DATA";

/// Leaf tag of the scenario descriptor chunk.
pub const SCENARIO_TAG: &[u8; 8] = b"DATASDSC";

/// Leaf tag of the match-data chunk.
pub const MATCH_DATA_TAG: &[u8; 8] = b"DATADATA";

/// Leaf tag declared for forward compatibility; never populated.
pub const RESERVED_TAG: &[u8; 8] = b"DATABASE";

/// Chunk version registered for the reserved leaf in both revisions.
pub const RESERVED_VERSION: u32 = 0xFF;

/// Simulation ticks per second of game time.
pub const TICKS_PER_SECOND: u32 = 8;

/// Value of an empty bulletin slot.
pub const EMPTY_SLOT: u32 = 0xFFFF_FFFF;

/// The decoder a leaf chunk is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    /// Map and mod metadata.
    ScenarioDescriptor,
    /// Player list and win condition.
    MatchData,
    /// Declared but never populated; structurally skipped.
    Reserved,
}

/// A known revision of the replay schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// Pre-Steam-id recordings: u32 header version, players identified by
    /// start position, no tick scan.
    Legacy,

    /// Recordings carrying 64-bit platform ids: u16 zero marker and u16
    /// header version, tick stream scanned for duration.
    Steam,
}

impl Schema {
    /// Returns the decoder registered for an exact (tag, version) pair.
    ///
    /// Versions are plain registrations: the same chunk kind carries
    /// unrelated version constants in each revision.
    #[must_use]
    pub fn leaf_kind(self, tag: &[u8; 8], version: u32) -> Option<LeafKind> {
        if tag == SCENARIO_TAG && version == self.scenario_version() {
            Some(LeafKind::ScenarioDescriptor)
        } else if tag == MATCH_DATA_TAG && version == self.match_data_version() {
            Some(LeafKind::MatchData)
        } else if tag == RESERVED_TAG && version == RESERVED_VERSION {
            Some(LeafKind::Reserved)
        } else {
            None
        }
    }

    /// Returns the chunk version registered for the scenario descriptor.
    #[must_use]
    pub const fn scenario_version(self) -> u32 {
        match self {
            Schema::Legacy => 0x7DD,
            Schema::Steam => 0x7E4,
        }
    }

    /// Returns the chunk version registered for the match data.
    #[must_use]
    pub const fn match_data_version(self) -> u32 {
        match self {
            Schema::Legacy => 0x4,
            Schema::Steam => 0x1B,
        }
    }

    /// Bytes of padding after each player's bulletin list.
    #[must_use]
    pub const fn player_trailer_size(self) -> usize {
        match self {
            Schema::Legacy => 0,
            Schema::Steam => 8,
        }
    }

    /// Whether the tick stream after the containers is scanned.
    #[must_use]
    pub const fn scans_ticks(self) -> bool {
        matches!(self, Schema::Steam)
    }

    /// Returns the lowercase name used on the command line and in JSON.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Schema::Legacy => "legacy",
            Schema::Steam => "steam",
        }
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the schema revision from the first bytes of a replay.
///
/// A zero first u16 is the marker that precedes the u16 version of the
/// newer revision; the older revision stores a non-zero u32 version there.
///
/// # Errors
///
/// Returns `ParserError::TruncatedInput` if fewer than 2 bytes are given.
pub fn detect_schema(data: &[u8]) -> Result<Schema> {
    match data {
        [0, 0, ..] => Ok(Schema::Steam),
        [_, _, ..] => Ok(Schema::Legacy),
        _ => Err(ParserError::truncated("schema marker", 0, 2, data.len())),
    }
}
