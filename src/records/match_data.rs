//! Match-data (`DATADATA`) decoding: the player list and win condition.
//!
//! | Size | Field |
//! |------|-------|
//! | 29 | unknown |
//! | 4 | player count |
//! | var | player records, see [`super::player`] |
//! | 90 | unknown |
//! | 4 + n | win condition (single-byte) |

use log::debug;

use crate::binary::{to_usize, ByteStream};
use crate::error::Result;
use crate::format::Schema;
use crate::identity::IdentityLookup;
use crate::model::Replay;

use super::player;

/// Smallest possible encoded player record, used to bound allocations.
const MIN_PLAYER_RECORD: usize = 1 + 4 + 4 + 4 + 41 + 4 + 8 + 12 + 4 + 12 + 4 + 4;

/// Decodes a match-data body into `replay`, appending its players.
///
/// The legacy identity lookup is keyed by `replay.map_name`, so the scenario
/// descriptor must have been decoded first for lookups to hit.
///
/// # Errors
///
/// Returns `ParserError::Field` naming the first field that could not be read.
pub fn decode(
    stream: &mut ByteStream<'_>,
    schema: Schema,
    replay: &mut Replay,
    lookup: &dyn IdentityLookup,
) -> Result<()> {
    stream.advance(29);
    let count = stream.field("player count", ByteStream::read_u32)?;

    replay
        .players
        .reserve(to_usize(count).min(stream.remaining() / MIN_PLAYER_RECORD));
    for _ in 0..count {
        let player = player::decode(stream, schema, &replay.map_name, lookup)?;
        replay.players.push(player);
    }

    stream.advance(90);
    replay.win_condition = stream.field("win_condition", ByteStream::read_prefixed_text)?;

    debug!(
        "match data: {} players, win condition {}",
        replay.players.len(),
        replay.win_condition
    );
    Ok(())
}
