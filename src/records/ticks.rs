//! Tick stream scanning.
//!
//! After the two containers, steam-revision replays carry a flat sequence of
//! simulation ticks:
//!
//! | Size | Field |
//! |------|-------|
//! | 4 | tick type |
//! | 4 | body size |
//! | size | body |
//!
//! The scan counts every tick, and separately the game ticks of type
//! [`GAME_TICK_TYPE`]. Only game ticks advance the simulation clock (8 per
//! second); chat and other special ticks are interleaved between them. The
//! scan stops quietly at the first tick whose header cannot be read, whose
//! size is zero, or whose body is cut short; such a tick is not counted.
//!
//! # Chat
//!
//! A tick of type [`CHAT_TICK_TYPE`] whose body starts with a u32 flag of 1
//! carries a chat line:
//!
//! | Size | Field |
//! |------|-------|
//! | 4 | flag (1) |
//! | 4 | length |
//! | 4 | unknown |
//! | 4 + 2n | sender (UTF-16) |
//! | 4 + 2n | text (UTF-16) |
//!
//! # Example
//!
//! ```
//! use coh2_replay::binary::ByteStream;
//! use coh2_replay::records::ticks::{TickIterator, TickStats};
//!
//! let mut data = Vec::new();
//! for _ in 0..3 {
//!     data.extend_from_slice(&0u32.to_le_bytes());
//!     data.extend_from_slice(&2u32.to_le_bytes());
//!     data.extend_from_slice(&[0xAA, 0xBB]);
//! }
//!
//! let stats = TickStats::from_iterator(TickIterator::new(ByteStream::new(&data)), true);
//! assert_eq!(stats.tick_count, 3);
//! assert_eq!(stats.game_ticks, 3);
//! ```

use log::{debug, warn};

use crate::binary::{to_usize, ByteStream};
use crate::error::Result;
use crate::format::TICKS_PER_SECOND;
use crate::model::ChatMessage;

/// Tick type of simulation steps.
pub const GAME_TICK_TYPE: u32 = 0;

/// Tick type whose bodies may carry chat.
pub const CHAT_TICK_TYPE: u32 = 1;

/// Body flag marking a populated chat tick.
pub const CHAT_FLAG: u32 = 1;

/// A single tick record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick<'a> {
    /// Number of ticks counted before this one.
    pub index: u32,
    /// Number of game ticks counted before this one.
    pub game_tick: u32,
    /// Offset of the tick type field.
    pub offset: usize,
    /// Tick type.
    pub kind: u32,
    /// Tick body.
    pub body: &'a [u8],
}

impl Tick<'_> {
    /// Decodes the chat line carried by this tick, if any.
    ///
    /// Returns `Ok(None)` for ticks that are not chat ticks.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Field` if the body is flagged as chat but cannot
    /// be decoded within its bounds.
    pub fn chat_message(&self) -> Result<Option<ChatMessage>> {
        if self.kind != CHAT_TICK_TYPE {
            return Ok(None);
        }

        let mut body = ByteStream::new(self.body);
        if body.read_u32().ok() != Some(CHAT_FLAG) {
            return Ok(None);
        }
        body.advance(8);

        let sender = body.field("chat sender", ByteStream::read_prefixed_unicode)?;
        let text = body.field("chat text", ByteStream::read_prefixed_unicode)?;

        Ok(Some(ChatMessage {
            tick: self.game_tick,
            sender,
            text,
        }))
    }
}

/// Why a tick scan ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanEnd {
    /// The scan has not ended yet.
    #[default]
    Running,
    /// The tick type or size could not be read.
    EndOfStream,
    /// A tick declared a zero-length body.
    ZeroSize,
    /// A tick body ran past the end of the stream.
    TruncatedBody,
}

/// Iterator over tick records.
///
/// # Example
///
/// ```ignore
/// use coh2_replay::records::ticks::TickIterator;
///
/// let mut ticks = TickIterator::new(stream);
/// for tick in &mut ticks {
///     println!("tick {} type {}", tick.index, tick.kind);
/// }
/// println!("stopped: {:?}", ticks.end());
/// ```
#[derive(Debug, Clone)]
pub struct TickIterator<'a> {
    stream: ByteStream<'a>,
    tick_count: u32,
    game_ticks: u32,
    end: ScanEnd,
}

impl<'a> TickIterator<'a> {
    /// Creates an iterator starting at the stream's current position.
    #[must_use]
    pub fn new(stream: ByteStream<'a>) -> Self {
        TickIterator {
            stream,
            tick_count: 0,
            game_ticks: 0,
            end: ScanEnd::Running,
        }
    }

    /// Returns the number of ticks yielded so far.
    #[must_use]
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// Returns the number of game ticks yielded so far.
    #[must_use]
    pub fn game_ticks(&self) -> u32 {
        self.game_ticks
    }

    /// Returns the current byte offset.
    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.stream.position()
    }

    /// Returns why the scan ended, or [`ScanEnd::Running`].
    #[must_use]
    pub fn end(&self) -> ScanEnd {
        self.end
    }

    /// Returns whether iteration is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.end != ScanEnd::Running
    }

    fn finish(&mut self, end: ScanEnd, offset: usize) -> Option<Tick<'a>> {
        debug!(
            "tick scan ended at offset {offset} ({end:?}) after {} ticks",
            self.tick_count
        );
        self.end = end;
        None
    }
}

impl<'a> Iterator for TickIterator<'a> {
    type Item = Tick<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }

        let offset = self.stream.position();
        let (Ok(kind), Ok(size)) = (self.stream.read_u32(), self.stream.read_u32()) else {
            return self.finish(ScanEnd::EndOfStream, offset);
        };
        if size == 0 {
            return self.finish(ScanEnd::ZeroSize, offset);
        }
        let Ok(body) = self.stream.read_bytes(to_usize(size)) else {
            return self.finish(ScanEnd::TruncatedBody, offset);
        };

        let tick = Tick {
            index: self.tick_count,
            game_tick: self.game_ticks,
            offset,
            kind,
            body,
        };
        self.tick_count += 1;
        if kind == GAME_TICK_TYPE {
            self.game_ticks += 1;
        }
        Some(tick)
    }
}

/// Summary statistics from a tick scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Total number of fully read ticks.
    pub tick_count: u32,

    /// Fully read ticks of [`GAME_TICK_TYPE`].
    pub game_ticks: u32,

    /// Total bytes of tick bodies.
    pub total_body_bytes: usize,

    /// Ticks of the chat type, populated or not.
    pub chat_ticks: usize,

    /// Chat lines decoded, in stream order. Empty unless collected.
    pub chat: Vec<ChatMessage>,

    /// Why the scan ended.
    pub end: ScanEnd,
}

impl TickStats {
    /// Drains `iter` and collects statistics, plus chat lines when
    /// `collect_chat` is set.
    ///
    /// Chat bodies that cannot be decoded are logged and skipped. Without
    /// `collect_chat` they are never decoded.
    #[must_use]
    pub fn from_iterator(mut iter: TickIterator<'_>, collect_chat: bool) -> Self {
        let mut stats = TickStats::default();

        for tick in &mut iter {
            stats.total_body_bytes += tick.body.len();
            if tick.kind != CHAT_TICK_TYPE {
                continue;
            }
            stats.chat_ticks += 1;
            if !collect_chat {
                continue;
            }
            match tick.chat_message() {
                Ok(Some(message)) => stats.chat.push(message),
                Ok(None) => {}
                Err(e) => warn!("skipping undecodable chat tick at {}: {e}", tick.offset),
            }
        }

        stats.tick_count = iter.tick_count();
        stats.game_ticks = iter.game_ticks();
        stats.end = iter.end();
        stats
    }

    /// Game time covered by the scanned game ticks, in whole seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> u32 {
        self.game_ticks / TICKS_PER_SECOND
    }
}
