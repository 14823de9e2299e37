//! Player record decoding.
//!
//! Player records appear back to back inside the match-data chunk.
//!
//! # Format
//!
//! | Size | Field |
//! |------|-------|
//! | 1 | unknown |
//! | 4 + 2n | name (UTF-16) |
//! | 4 | team |
//! | 4 | faction id |
//! | 41 | unknown |
//! | 4 or 8 | identity: start position (legacy) or platform id (steam) |
//! | 8 | unknown |
//! | 3 x 4 | commander ids |
//! | 4 | unknown |
//! | 3 x 4 | bulletin slot ids, `0xFFFFFFFF` when empty |
//! | 4 | unknown |
//! | 4 | bulletin count |
//! | count x (4 + n, 4) | bulletin name (single-byte), unknown |
//! | 0 or 8 | trailer (steam only) |
//!
//! The bulletin slot ids and the bulletin name list are independent: the
//! count of names is not derived from the occupied slots.

use log::trace;

use crate::binary::{to_usize, ByteStream};
use crate::error::Result;
use crate::format::{Schema, EMPTY_SLOT};
use crate::identity::IdentityLookup;
use crate::model::{Faction, Player, PlayerIdentity};

/// Number of commander slots per player.
pub const COMMANDER_SLOTS: usize = 3;

/// Number of bulletin slots per player.
pub const BULLETIN_SLOTS: usize = 3;

/// Decodes one player record.
///
/// `map_name` is the map the legacy identity lookup is keyed by; it is
/// ignored for the steam revision.
///
/// # Errors
///
/// Returns `ParserError::Field` naming the first field that could not be read.
pub fn decode(
    stream: &mut ByteStream<'_>,
    schema: Schema,
    map_name: &str,
    lookup: &dyn IdentityLookup,
) -> Result<Player> {
    let start = stream.position();

    stream.advance(1);
    let name = stream.field("player name", ByteStream::read_prefixed_unicode)?;
    let team = stream.field("team", ByteStream::read_u32)?;
    let faction = Faction::from(stream.field("faction", ByteStream::read_u32)?);

    stream.advance(41);
    let identity = match schema {
        Schema::Legacy => {
            let position = stream.field("start position", ByteStream::read_u32)?;
            PlayerIdentity::StartPosition {
                position,
                resolved: lookup.resolve(map_name, position),
            }
        }
        Schema::Steam => PlayerIdentity::Steam(stream.field("steam id", ByteStream::read_u64)?),
    };

    stream.advance(8);
    let mut commander_ids = [0u32; COMMANDER_SLOTS];
    for id in &mut commander_ids {
        *id = stream.field("commander id", ByteStream::read_u32)?;
    }

    stream.advance(4);
    let mut bulletin_ids = Vec::with_capacity(BULLETIN_SLOTS);
    for _ in 0..BULLETIN_SLOTS {
        let id = stream.field("bulletin slot", ByteStream::read_u32)?;
        if id != EMPTY_SLOT {
            bulletin_ids.push(id);
        }
    }

    stream.advance(4);
    let count = stream.field("bulletin count", ByteStream::read_u32)?;
    // Each entry needs at least 8 bytes; cap the reservation by what is left.
    let mut bulletins = Vec::with_capacity(to_usize(count).min(stream.remaining() / 8));
    for _ in 0..count {
        bulletins.push(stream.field("bulletin name", ByteStream::read_prefixed_text)?);
        stream.advance(4);
    }

    stream.advance(schema.player_trailer_size());

    trace!(
        "player {name:?} team {team} {faction} at {start}..{}",
        stream.position()
    );

    Ok(Player {
        name,
        team,
        faction,
        identity,
        commander_ids,
        bulletin_ids,
        bulletins,
    })
}
