//! Record decoders for CoH2 replay payloads.
//!
//! This module provides the decoders for every structure found in a replay:
//!
//! - **Header**: version, game type and recording date ([`header`])
//! - **Scenario descriptor** (`DATASDSC`): map and mod metadata ([`scenario`])
//! - **Match data** (`DATADATA`): player list and win condition ([`match_data`])
//! - **Player records**: identity, faction and loadout ([`player`])
//! - **Tick stream**: duration and chat ([`ticks`])
//!
//! # Dispatch
//!
//! Leaf chunks are routed by exact (tag, version) pair, using the table of the
//! active [`Schema`]:
//!
//! | Tag | Legacy | Steam | Decoder |
//! |-----|--------|-------|---------|
//! | `DATASDSC` | `0x7DD` | `0x7E4` | [`scenario::decode`] |
//! | `DATADATA` | `0x4` | `0x1B` | [`match_data::decode`] |
//! | `DATABASE` | `0xFF` | `0xFF` | none (reserved) |
//!
//! Any other pair is skipped by the chunk walker.

pub mod header;
pub mod match_data;
pub mod player;
pub mod scenario;
pub mod ticks;

pub use header::ReplayHeader;
pub use ticks::{ScanEnd, Tick, TickIterator, TickStats};

use log::debug;

use crate::binary::ByteStream;
use crate::chunky::{ChunkHeader, ChunkSink, LeafOutcome};
use crate::error::Result;
use crate::format::{LeafKind, Schema};
use crate::identity::IdentityLookup;
use crate::model::Replay;

/// Chunk sink that decodes registered leaves into a [`Replay`].
pub struct RecordSink<'r> {
    schema: Schema,
    replay: &'r mut Replay,
    lookup: &'r dyn IdentityLookup,
}

impl<'r> RecordSink<'r> {
    /// Creates a sink writing into `replay`.
    #[must_use]
    pub fn new(schema: Schema, replay: &'r mut Replay, lookup: &'r dyn IdentityLookup) -> Self {
        RecordSink {
            schema,
            replay,
            lookup,
        }
    }
}

impl ChunkSink for RecordSink<'_> {
    fn leaf(&mut self, header: &ChunkHeader, stream: &mut ByteStream<'_>) -> Result<LeafOutcome> {
        match self.schema.leaf_kind(&header.tag, header.version) {
            Some(LeafKind::ScenarioDescriptor) => scenario::decode(stream, self.replay)?,
            Some(LeafKind::MatchData) => {
                match_data::decode(stream, self.schema, self.replay, self.lookup)?;
            }
            Some(LeafKind::Reserved) => {
                debug!("reserved chunk {} at {}", header.tag_str(), header.offset);
            }
            None => return Ok(LeafOutcome::Skipped),
        }
        Ok(LeafOutcome::Decoded)
    }
}
