//! # CoH2 Replay
//!
//! A decoder for Company of Heroes 2 replay (`.rec`) files.
//!
//! A replay is a short header, two "Relic Chunky" containers of nested
//! typed chunks, and a flat stream of simulation ticks. This library reads
//! match metadata (map, mod, recording date, win condition), the player list
//! (identity, faction, commanders, bulletins) and the match length from it.
//!
//! Two schema revisions are supported:
//! - **Legacy**: players identified by start position, resolved through an
//!   injected [`IdentityLookup`]
//! - **Steam**: players identified by a 64-bit platform id; the tick stream is
//!   scanned for duration and chat
//!
//! ## Quick Start
//!
//! ```no_run
//! use coh2_replay::{Replay, Result};
//!
//! fn summarize(path: &str) -> Result<()> {
//!     let replay = Replay::from_file(path)?;
//!
//!     println!("Map: {} ({}x{})", replay.map_name(), replay.map_width(), replay.map_height());
//!     println!("Win condition: {}", replay.win_condition());
//!     if let Some(duration) = replay.duration_string() {
//!         println!("Duration: {duration}");
//!     }
//!
//!     for player in replay.players() {
//!         println!("  team {} {} ({})", player.team(), player.name(), player.faction());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`error`] - Error types and result alias for decoder operations
//! - [`binary`] - Byte cursor with little-endian and string primitives
//! - [`format`] - Format constants and schema revision selection
//! - [`chunky`] - Chunk-tree walker with resynchronization
//! - [`records`] - Header, chunk payload and tick stream decoders
//! - [`model`] - The decoded, read-only match model
//! - [`identity`] - Pluggable (map, start position) → player id lookup
//! - [`decoder`] - The decode entry point
//!
//! All multi-byte integers are stored in little-endian byte order.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod binary;
pub mod chunky;
pub mod decoder;
pub mod error;
pub mod format;
pub mod identity;
pub mod model;
pub mod records;

// Re-export commonly used types at the crate root
pub use chunky::{ChunkHeader, ChunkSink, ChunkWalker, ContainerSummary, LeafOutcome};
pub use decoder::{DecodeOptions, DecodeReport, ReplayDecoder};
pub use error::{ParserError, Result};
pub use format::{detect_schema, Schema};
pub use identity::{IdentityLookup, IdentityTable, NoLookup};
pub use model::{ChatMessage, Faction, Player, PlayerIdentity, Replay};
