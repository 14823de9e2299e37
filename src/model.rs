//! The decoded match model.
//!
//! [`Replay`] and [`Player`] are plain data filled in by the record decoders.
//! Once [`crate::ReplayDecoder::decode`] returns, the model is only reachable
//! through read-only accessors.

use serde::Serialize;

use crate::format::{Schema, TICKS_PER_SECOND};

/// Playable faction, derived from the raw faction id of a player record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Faction {
    /// Raw value 0.
    Ostheer,
    /// Any other raw value.
    Soviets,
}

impl From<u32> for Faction {
    fn from(raw: u32) -> Self {
        if raw == 0 {
            Faction::Ostheer
        } else {
            Faction::Soviets
        }
    }
}

impl std::fmt::Display for Faction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Faction::Ostheer => f.write_str("Ostheer"),
            Faction::Soviets => f.write_str("Soviets"),
        }
    }
}

/// How a player is identified, which depends on the schema revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerIdentity {
    /// Direct 64-bit platform account id.
    Steam(u64),

    /// Start position on the map plus the id resolved from the lookup table.
    StartPosition {
        /// Raw start position.
        position: u32,
        /// Id found for (map, position), if the table has an entry.
        resolved: Option<u32>,
    },
}

impl PlayerIdentity {
    /// Returns the platform account id, if this identity carries one.
    #[must_use]
    pub fn steam_id(&self) -> Option<u64> {
        match self {
            PlayerIdentity::Steam(id) => Some(*id),
            PlayerIdentity::StartPosition { .. } => None,
        }
    }

    /// Returns the start position, if this identity carries one.
    #[must_use]
    pub fn start_position(&self) -> Option<u32> {
        match self {
            PlayerIdentity::StartPosition { position, .. } => Some(*position),
            PlayerIdentity::Steam(_) => None,
        }
    }

    /// Returns the id resolved from the lookup table, if any.
    #[must_use]
    pub fn resolved_id(&self) -> Option<u32> {
        match self {
            PlayerIdentity::StartPosition { resolved, .. } => *resolved,
            PlayerIdentity::Steam(_) => None,
        }
    }
}

/// A participant of the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub(crate) name: String,
    pub(crate) team: u32,
    pub(crate) faction: Faction,
    pub(crate) identity: PlayerIdentity,
    pub(crate) commander_ids: [u32; 3],
    pub(crate) bulletin_ids: Vec<u32>,
    pub(crate) bulletins: Vec<String>,
}

impl Player {
    /// Player name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Team number.
    #[must_use]
    pub fn team(&self) -> u32 {
        self.team
    }

    /// Faction.
    #[must_use]
    pub fn faction(&self) -> Faction {
        self.faction
    }

    /// Identity as encoded by the schema revision.
    #[must_use]
    pub fn identity(&self) -> &PlayerIdentity {
        &self.identity
    }

    /// The three commander ids, in slot order.
    #[must_use]
    pub fn commander_ids(&self) -> &[u32; 3] {
        &self.commander_ids
    }

    /// Ids of the occupied bulletin slots, in slot order (at most three).
    #[must_use]
    pub fn bulletin_ids(&self) -> &[u32] {
        &self.bulletin_ids
    }

    /// Names of the equipped bulletins, in stream order.
    #[must_use]
    pub fn bulletins(&self) -> &[String] {
        &self.bulletins
    }

    /// Pairs bulletin ids with bulletin names by position.
    ///
    /// The format has no explicit key between the two lists; pairing stops
    /// at the shorter one.
    pub fn bulletin_pairs(&self) -> impl Iterator<Item = (u32, &str)> {
        self.bulletin_ids
            .iter()
            .copied()
            .zip(self.bulletins.iter().map(String::as_str))
    }
}

/// A chat line recovered from the tick stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Number of game ticks scanned before this message.
    pub tick: u32,
    /// Sender name.
    pub sender: String,
    /// Message text.
    pub text: String,
}

impl ChatMessage {
    /// Game time of the message formatted as M:SS.
    #[must_use]
    pub fn timestamp(&self) -> String {
        format_ticks(self.tick)
    }
}

/// A decoded replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replay {
    pub(crate) schema: Schema,
    pub(crate) version: u32,
    pub(crate) gametype: String,
    pub(crate) recorded_at: String,
    pub(crate) mod_name: String,
    pub(crate) map_file: String,
    pub(crate) map_name: String,
    pub(crate) map_description: String,
    pub(crate) map_width: u32,
    pub(crate) map_height: u32,
    pub(crate) season: Option<String>,
    pub(crate) win_condition: String,
    pub(crate) players: Vec<Player>,
    pub(crate) duration_ticks: Option<u32>,
    pub(crate) game_ticks: Option<u32>,
    pub(crate) chat: Vec<ChatMessage>,
}

impl Replay {
    pub(crate) fn new(schema: Schema) -> Self {
        Replay {
            schema,
            version: 0,
            gametype: String::new(),
            recorded_at: String::new(),
            mod_name: String::new(),
            map_file: String::new(),
            map_name: String::new(),
            map_description: String::new(),
            map_width: 0,
            map_height: 0,
            season: None,
            win_condition: String::new(),
            players: Vec::new(),
            duration_ticks: None,
            game_ticks: None,
            chat: Vec::new(),
        }
    }

    /// Schema revision the replay was decoded with.
    #[must_use]
    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Format revision tag from the header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Fixed 8-character game type label.
    #[must_use]
    pub fn gametype(&self) -> &str {
        &self.gametype
    }

    /// Recording date and time as written by the game.
    #[must_use]
    pub fn recorded_at(&self) -> &str {
        &self.recorded_at
    }

    /// Name of the mod (game build) the match was played with.
    #[must_use]
    pub fn mod_name(&self) -> &str {
        &self.mod_name
    }

    /// Path of the map file.
    #[must_use]
    pub fn map_file(&self) -> &str {
        &self.map_file
    }

    /// Map name, usually a localization key such as `$11045520`.
    #[must_use]
    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    /// Map description, usually a localization key.
    #[must_use]
    pub fn map_description(&self) -> &str {
        &self.map_description
    }

    /// Map width in cells.
    #[must_use]
    pub fn map_width(&self) -> u32 {
        self.map_width
    }

    /// Map height in cells.
    #[must_use]
    pub fn map_height(&self) -> u32 {
        self.map_height
    }

    /// Season label (e.g. `winter`); `None` when the replay records none.
    #[must_use]
    pub fn season(&self) -> Option<&str> {
        self.season.as_deref()
    }

    /// Win condition name.
    #[must_use]
    pub fn win_condition(&self) -> &str {
        &self.win_condition
    }

    /// Players in the order they appear in the match data.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Returns the player at `index`.
    #[must_use]
    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    /// Number of scanned ticks, if the schema revision scans the tick stream.
    #[must_use]
    pub fn duration_ticks(&self) -> Option<u32> {
        self.duration_ticks
    }

    /// Number of scanned game ticks, the ones that advance the simulation
    /// clock. Chat and other special ticks are not included.
    #[must_use]
    pub fn game_ticks(&self) -> Option<u32> {
        self.game_ticks
    }

    /// Match length in whole seconds of game time, from the game ticks.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<u32> {
        self.game_ticks.map(|ticks| ticks / TICKS_PER_SECOND)
    }

    /// Match length formatted as M:SS.
    #[must_use]
    pub fn duration_string(&self) -> Option<String> {
        self.game_ticks.map(format_ticks)
    }

    /// Chat lines recovered from the tick stream.
    #[must_use]
    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }
}

fn format_ticks(ticks: u32) -> String {
    let seconds = ticks / TICKS_PER_SECOND;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
