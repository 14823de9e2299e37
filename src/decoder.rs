//! The replay decoder: the single entry point from bytes to a [`Replay`].
//!
//! Decoding runs in a fixed order:
//!
//! 1. pick the schema revision (explicit option, or detected from the first bytes)
//! 2. parse the header
//! 3. seek to [`CONTAINER_OFFSET`] and walk up to two containers
//! 4. scan the tick stream, when the schema revision has one
//!
//! # Example
//!
//! ```no_run
//! use coh2_replay::{DecodeOptions, IdentityTable, ReplayDecoder};
//!
//! let table = IdentityTable::from_file("ids.json")?;
//! let replay = ReplayDecoder::open("match.rec")?
//!     .with_options(DecodeOptions {
//!         collect_chat: false,
//!         ..DecodeOptions::default()
//!     })
//!     .with_identity_lookup(table)
//!     .decode()?;
//!
//! for player in replay.players() {
//!     println!("{} ({})", player.name(), player.faction());
//! }
//! # Ok::<(), coh2_replay::ParserError>(())
//! ```

use std::path::Path;

use log::{debug, info};

use crate::binary::ByteStream;
use crate::chunky::{ChunkWalker, ContainerSummary, DEFAULT_MAX_DEPTH};
use crate::error::{ParserError, Result};
use crate::format::{detect_schema, Schema, CHUNKY_MAGIC, CONTAINER_OFFSET};
use crate::identity::{IdentityLookup, NoLookup};
use crate::model::Replay;
use crate::records::{RecordSink, ReplayHeader, ScanEnd, TickIterator, TickStats};

/// Number of top-level containers in a replay.
pub const CONTAINER_COUNT: usize = 2;

/// Options controlling a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Schema revision to decode with; detected from the file when `None`.
    pub schema: Option<Schema>,
    /// Maximum group nesting accepted by the chunk walker.
    pub max_depth: usize,
    /// Whether chat lines are kept from the tick scan.
    pub collect_chat: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            schema: None,
            max_depth: DEFAULT_MAX_DEPTH,
            collect_chat: true,
        }
    }
}

/// Structural details gathered during a decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// One summary per container found.
    pub containers: Vec<ContainerSummary>,
    /// Offset where the tick scan started, if it ran.
    pub tick_offset: Option<usize>,
    /// Why the tick scan ended, if it ran.
    pub tick_end: Option<ScanEnd>,
    /// Ticks of the chat type seen by the scan.
    pub chat_ticks: usize,
}

/// Decodes one replay held in memory.
pub struct ReplayDecoder {
    data: Vec<u8>,
    options: DecodeOptions,
    lookup: Box<dyn IdentityLookup>,
}

impl ReplayDecoder {
    /// Reads a replay file into memory.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::IoError` if the file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes(data))
    }

    /// Wraps bytes already in memory.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        ReplayDecoder {
            data,
            options: DecodeOptions::default(),
            lookup: Box::new(NoLookup),
        }
    }

    /// Replaces the decode options.
    #[must_use]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the lookup used to resolve legacy player identities.
    #[must_use]
    pub fn with_identity_lookup(mut self, lookup: impl IdentityLookup + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Returns the number of bytes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether no bytes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the replay.
    ///
    /// # Errors
    ///
    /// - `ParserError::TruncatedInput` (usually inside `ParserError::Field`) if
    ///   the file ends inside a field
    /// - `ParserError::InvalidMagic` if a container signature is missing
    ///   anywhere except at end of input
    /// - `ParserError::UnsupportedContainerVersion` or
    ///   `ParserError::MalformedChunkFraming` for bad container structure
    pub fn decode(self) -> Result<Replay> {
        self.decode_with_report().map(|(replay, _)| replay)
    }

    /// Decodes the replay and also returns structural details.
    ///
    /// # Errors
    ///
    /// Same as [`ReplayDecoder::decode`].
    pub fn decode_with_report(self) -> Result<(Replay, DecodeReport)> {
        let schema = match self.options.schema {
            Some(schema) => schema,
            None => detect_schema(&self.data)?,
        };
        debug!("decoding {} bytes as {schema}", self.data.len());

        let mut stream = ByteStream::new(&self.data);
        let header = ReplayHeader::parse(&mut stream, schema)?;

        let mut replay = Replay::new(schema);
        replay.version = header.version;
        replay.gametype = header.gametype;
        replay.recorded_at = header.recorded_at;

        let mut report = DecodeReport::default();
        let mut walker = ChunkWalker::new(self.options.max_depth);
        stream.seek(CONTAINER_OFFSET);

        for _ in 0..CONTAINER_COUNT {
            let mut sink = RecordSink::new(schema, &mut replay, self.lookup.as_ref());
            match walker.parse_container(&mut stream, &mut sink)? {
                Some(summary) => report.containers.push(summary),
                None if stream.is_at_end() => {
                    debug!("input ends after {} containers", report.containers.len());
                    break;
                }
                None => {
                    let found = stream
                        .peek_bytes(stream.remaining().min(CHUNKY_MAGIC.len()))
                        .unwrap_or_default();
                    return Err(ParserError::invalid_magic(
                        stream.position(),
                        CHUNKY_MAGIC,
                        found,
                    ));
                }
            }
        }

        if schema.scans_ticks() {
            report.tick_offset = Some(stream.position());
            let stats =
                TickStats::from_iterator(TickIterator::new(stream), self.options.collect_chat);
            replay.duration_ticks = Some(stats.tick_count);
            replay.game_ticks = Some(stats.game_ticks);
            report.tick_end = Some(stats.end);
            report.chat_ticks = stats.chat_ticks;
            replay.chat = stats.chat;
        }

        info!(
            "decoded {schema} replay: map {}, {} players, {} containers",
            replay.map_name,
            replay.players.len(),
            report.containers.len()
        );
        Ok((replay, report))
    }
}

impl Replay {
    /// Reads and decodes a replay file with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::IoError` if the file cannot be read, or any
    /// error from [`ReplayDecoder::decode`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ReplayDecoder::open(path)?.decode()
    }

    /// Decodes a replay from bytes with default options.
    ///
    /// # Errors
    ///
    /// Any error from [`ReplayDecoder::decode`].
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        ReplayDecoder::from_bytes(data.into()).decode()
    }
}
