//! Synthetic replay builder shared by the integration tests.
//!
//! Produces byte-exact replays for either schema revision: a header padded to
//! the container offset, a first container holding the scenario descriptor in
//! a `FOLDPOST` group, a second container holding the match data in a
//! `FOLDINFO` group next to an unregistered `DATAPLAS` leaf, then the tick
//! stream.

#![allow(dead_code)]

use coh2_replay::format::{Schema, CHUNKY_MAGIC, CONTAINER_OFFSET, EMPTY_SLOT};

pub fn u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn len_u32(len: usize) -> u32 {
    u32::try_from(len).expect("test data fits in u32")
}

pub fn text(out: &mut Vec<u8>, s: &str) {
    u32_le(out, len_u32(s.len()));
    out.extend_from_slice(s.as_bytes());
}

pub fn wide(out: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    u32_le(out, len_u32(units.len()));
    out.extend(units.into_iter().flat_map(u16::to_le_bytes));
}

/// Encodes one chunk with an empty name.
pub fn chunk(tag: &[u8; 8], version: u32, body: &[u8]) -> Vec<u8> {
    let mut out = tag.to_vec();
    u32_le(&mut out, version);
    u32_le(&mut out, len_u32(body.len()));
    u32_le(&mut out, 0);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(body);
    out
}

/// Encodes a container header followed by `chunks`.
pub fn container(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = CHUNKY_MAGIC.to_vec();
    u32_le(&mut out, 0x001A_0A0D);
    u32_le(&mut out, 3);
    u32_le(&mut out, 1);
    u32_le(&mut out, 36);
    u32_le(&mut out, 28);
    u32_le(&mut out, 1);
    for c in chunks {
        out.extend_from_slice(c);
    }
    out
}

/// How a built player is identified.
#[derive(Clone, Copy)]
pub enum IdentitySpec {
    Position(u32),
    Steam(u64),
}

#[derive(Clone)]
pub struct PlayerSpec {
    pub name: String,
    pub team: u32,
    pub faction: u32,
    pub identity: IdentitySpec,
    pub commanders: [u32; 3],
    pub slots: [u32; 3],
    pub bulletins: Vec<String>,
}

impl PlayerSpec {
    pub fn new(name: &str) -> Self {
        PlayerSpec {
            name: name.to_string(),
            team: 0,
            faction: 1,
            identity: IdentitySpec::Steam(76_561_198_000_000_001),
            commanders: [186_413, 186_414, 186_415],
            slots: [12_345, EMPTY_SLOT, EMPTY_SLOT],
            bulletins: Vec::new(),
        }
    }

    pub fn team(mut self, team: u32) -> Self {
        self.team = team;
        self
    }

    pub fn faction(mut self, faction: u32) -> Self {
        self.faction = faction;
        self
    }

    pub fn identity(mut self, identity: IdentitySpec) -> Self {
        self.identity = identity;
        self
    }

    pub fn slots(mut self, slots: [u32; 3]) -> Self {
        self.slots = slots;
        self
    }

    pub fn bulletin(mut self, name: &str) -> Self {
        self.bulletins.push(name.to_string());
        self
    }

    pub fn encode(&self, schema: Schema) -> Vec<u8> {
        let mut out = vec![0u8];
        wide(&mut out, &self.name);
        u32_le(&mut out, self.team);
        u32_le(&mut out, self.faction);
        out.extend_from_slice(&[0u8; 41]);
        match (schema, self.identity) {
            (Schema::Legacy, IdentitySpec::Position(p)) => u32_le(&mut out, p),
            (Schema::Steam, IdentitySpec::Steam(id)) => out.extend_from_slice(&id.to_le_bytes()),
            (Schema::Legacy, IdentitySpec::Steam(_)) => u32_le(&mut out, 0),
            (Schema::Steam, IdentitySpec::Position(p)) => {
                out.extend_from_slice(&u64::from(p).to_le_bytes());
            }
        }
        out.extend_from_slice(&[0u8; 8]);
        for id in self.commanders {
            u32_le(&mut out, id);
        }
        out.extend_from_slice(&[0u8; 4]);
        for id in self.slots {
            u32_le(&mut out, id);
        }
        out.extend_from_slice(&[0u8; 4]);
        u32_le(&mut out, len_u32(self.bulletins.len()));
        for b in &self.bulletins {
            text(&mut out, b);
            out.extend_from_slice(&[0u8; 4]);
        }
        if schema == Schema::Steam {
            out.extend_from_slice(&[0u8; 8]);
        }
        out
    }
}

pub struct ReplayBuilder {
    pub schema: Schema,
    pub version: u32,
    pub date: String,
    pub map_name: String,
    pub map_width: u32,
    pub map_height: u32,
    pub season: Option<String>,
    pub players: Vec<PlayerSpec>,
    pub win_condition: String,
    pub scenario_version: u32,
    pub match_data_version: u32,
    pub scenario_padding: usize,
    pub ticks: Vec<u8>,
    pub second_container: bool,
}

impl ReplayBuilder {
    pub fn new(schema: Schema) -> Self {
        ReplayBuilder {
            schema,
            version: match schema {
                Schema::Legacy => 21,
                Schema::Steam => 19_545,
            },
            date: "2014-06-21 18:30".to_string(),
            map_name: "TestMap".to_string(),
            map_width: 8,
            map_height: 8,
            season: None,
            players: Vec::new(),
            win_condition: "VictoryPoint".to_string(),
            scenario_version: schema.scenario_version(),
            match_data_version: schema.match_data_version(),
            scenario_padding: 0,
            ticks: Vec::new(),
            second_container: true,
        }
    }

    pub fn map(mut self, name: &str, width: u32, height: u32) -> Self {
        self.map_name = name.to_string();
        self.map_width = width;
        self.map_height = height;
        self
    }

    pub fn season(mut self, season: &str) -> Self {
        self.season = Some(season.to_string());
        self
    }

    pub fn player(mut self, player: PlayerSpec) -> Self {
        self.players.push(player);
        self
    }

    pub fn win_condition(mut self, name: &str) -> Self {
        self.win_condition = name.to_string();
        self
    }

    /// Appends a tick with an arbitrary body.
    pub fn tick(mut self, kind: u32, body: &[u8]) -> Self {
        u32_le(&mut self.ticks, kind);
        u32_le(&mut self.ticks, len_u32(body.len()));
        self.ticks.extend_from_slice(body);
        self
    }

    /// Appends `count` plain ticks.
    pub fn ticks(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.tick(0, &[0xAA; 4]);
        }
        self
    }

    /// Appends a chat tick.
    pub fn chat(self, sender: &str, message: &str) -> Self {
        let mut body = Vec::new();
        u32_le(&mut body, 1);
        u32_le(&mut body, 0);
        u32_le(&mut body, 2);
        wide(&mut body, sender);
        wide(&mut body, message);
        self.tick(1, &body)
    }

    /// Appends raw bytes after the ticks.
    pub fn raw_tail(mut self, bytes: &[u8]) -> Self {
        self.ticks.extend_from_slice(bytes);
        self
    }

    pub fn header(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.schema {
            Schema::Legacy => u32_le(&mut out, self.version),
            Schema::Steam => {
                out.extend_from_slice(&[0, 0]);
                out.extend_from_slice(&u16::try_from(self.version).expect("u16 version").to_le_bytes());
            }
        }
        out.extend_from_slice(b"COH2_REC");
        out.extend(self.date.encode_utf16().flat_map(u16::to_le_bytes));
        out.extend_from_slice(&[0, 0]);
        assert!(out.len() <= CONTAINER_OFFSET, "header overflows container offset");
        out.resize(CONTAINER_OFFSET, 0);
        out
    }

    pub fn scenario_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; 16];
        wide(&mut out, "en");
        out.extend_from_slice(&[0u8; 12]);
        text(&mut out, "RelicCoH2");
        text(&mut out, "data:scenarios\\mp\\test_map");
        out.extend_from_slice(&[0u8; 16]);
        wide(&mut out, &self.map_name);
        out.extend_from_slice(&[0u8; 4]);
        wide(&mut out, "A map for tests");
        out.extend_from_slice(&[0u8; 4]);
        u32_le(&mut out, self.map_width);
        u32_le(&mut out, self.map_height);
        out.extend_from_slice(&[0u8; 47]);
        match &self.season {
            Some(s) => text(&mut out, s),
            None => u32_le(&mut out, 0),
        }
        out.extend(std::iter::repeat(0xCD).take(self.scenario_padding));
        out
    }

    pub fn match_data_body(&self) -> Vec<u8> {
        let mut out = vec![0u8; 29];
        u32_le(&mut out, len_u32(self.players.len()));
        for p in &self.players {
            out.extend_from_slice(&p.encode(self.schema));
        }
        out.extend_from_slice(&[0u8; 90]);
        text(&mut out, &self.win_condition);
        out
    }

    pub fn first_container(&self) -> Vec<u8> {
        let scenario = chunk(b"DATASDSC", self.scenario_version, &self.scenario_body());
        container(&[chunk(b"FOLDPOST", 1, &scenario)])
    }

    pub fn second_container(&self) -> Vec<u8> {
        let mut info = chunk(b"DATADATA", self.match_data_version, &self.match_data_body());
        info.extend_from_slice(&chunk(b"DATAPLAS", 1, &[0u8; 24]));
        container(&[chunk(b"FOLDINFO", 1, &info)])
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = self.header();
        out.extend_from_slice(&self.first_container());
        if self.second_container {
            out.extend_from_slice(&self.second_container());
        }
        out.extend_from_slice(&self.ticks);
        out
    }
}
