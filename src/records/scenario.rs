//! Scenario descriptor (`DATASDSC`) decoding.
//!
//! Layout, in stream order:
//!
//! | Size | Field |
//! |------|-------|
//! | 16 | unknown |
//! | 4 + 2n | locale name (u32 unit count, UTF-16) |
//! | 12 | unknown |
//! | 4 + n | mod name (single-byte) |
//! | 4 + n | map file (single-byte) |
//! | 16 | unknown |
//! | 4 + 2n | map name (UTF-16) |
//! | 4 | unknown |
//! | 4 + 2n | map description (UTF-16) |
//! | 4 | unknown |
//! | 4 | map width |
//! | 4 | map height |
//! | 47 | unknown |
//! | 4 (+ n) | season length, then the season text when the length is non-zero |

use log::debug;

use crate::binary::{to_usize, ByteStream};
use crate::error::Result;
use crate::model::Replay;

/// Decodes a scenario descriptor body into `replay`.
///
/// # Errors
///
/// Returns `ParserError::Field` naming the first field that could not be read.
pub fn decode(stream: &mut ByteStream<'_>, replay: &mut Replay) -> Result<()> {
    stream.advance(16);
    let locale_units = stream.field("locale length", ByteStream::read_u32)?;
    stream.advance(to_usize(locale_units).saturating_mul(2));
    stream.advance(12);

    replay.mod_name = stream.field("mod_name", ByteStream::read_prefixed_text)?;
    replay.map_file = stream.field("map_file", ByteStream::read_prefixed_text)?;

    stream.advance(16);
    replay.map_name = stream.field("map_name", ByteStream::read_prefixed_unicode)?;

    stream.advance(4);
    replay.map_description = stream.field("map_description", ByteStream::read_prefixed_unicode)?;

    stream.advance(4);
    replay.map_width = stream.field("map_width", ByteStream::read_u32)?;
    replay.map_height = stream.field("map_height", ByteStream::read_u32)?;

    stream.advance(47);
    let season_len = stream.field("season length", ByteStream::read_u32)?;
    if season_len > 0 {
        replay.season = Some(stream.field("season", |s| s.read_text(to_usize(season_len)))?);
    }

    debug!(
        "scenario: map {} ({}x{}), mod {}",
        replay.map_name, replay.map_width, replay.map_height, replay.mod_name
    );
    Ok(())
}
