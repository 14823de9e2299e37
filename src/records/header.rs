//! Replay file header parsing.
//!
//! The header sits before the first container and is not chunked.
//!
//! | Schema | Field | Encoding |
//! |--------|-------|----------|
//! | Legacy | version | u32 |
//! | Steam | marker, version | u16 (zero), u16 |
//! | both | game type | 8 single-byte characters |
//! | both | recorded at | UTF-16LE, null-terminated |
//!
//! The first container starts at [`CONTAINER_OFFSET`](crate::format::CONTAINER_OFFSET)
//! regardless of where the date string ends.

use crate::binary::ByteStream;
use crate::error::Result;
use crate::format::Schema;

/// Length of the game type label.
pub const GAMETYPE_LEN: usize = 8;

/// Fields read from the replay header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Format revision tag.
    pub version: u32,
    /// Game type label, e.g. `COH2_REC`.
    pub gametype: String,
    /// Recording date and time.
    pub recorded_at: String,
}

impl ReplayHeader {
    /// Parses the header at the current position using the layout of `schema`.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::Field` wrapping a truncated read if the file ends
    /// inside the header.
    pub fn parse(stream: &mut ByteStream<'_>, schema: Schema) -> Result<Self> {
        let version = match schema {
            Schema::Legacy => stream.field("version", ByteStream::read_u32)?,
            Schema::Steam => {
                stream.field("version marker", ByteStream::read_u16)?;
                u32::from(stream.field("version", ByteStream::read_u16)?)
            }
        };

        let gametype = stream.field("gametype", |s| s.read_text(GAMETYPE_LEN))?;
        let recorded_at = stream.field("recorded_at", ByteStream::read_terminated_unicode)?;

        Ok(ReplayHeader {
            version,
            gametype,
            recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParserError;

    fn header_bytes(version: &[u8], date: &str) -> Vec<u8> {
        let mut data = version.to_vec();
        data.extend_from_slice(b"COH2_REC");
        data.extend(date.encode_utf16().flat_map(u16::to_le_bytes));
        data.extend_from_slice(&[0, 0]);
        data
    }

    #[test]
    fn test_parse_legacy_header() {
        let data = header_bytes(&21u32.to_le_bytes(), "07/03/2013 21:14");
        let mut stream = ByteStream::new(&data);
        let header = ReplayHeader::parse(&mut stream, Schema::Legacy).unwrap();

        assert_eq!(header.version, 21);
        assert_eq!(header.gametype, "COH2_REC");
        assert_eq!(header.recorded_at, "07/03/2013 21:14");
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_parse_steam_header() {
        let mut version = vec![0, 0];
        version.extend_from_slice(&19_545u16.to_le_bytes());
        let data = header_bytes(&version, "2015-11-02 10:00");
        let mut stream = ByteStream::new(&data);
        let header = ReplayHeader::parse(&mut stream, Schema::Steam).unwrap();

        assert_eq!(header.version, 19_545);
        assert_eq!(header.recorded_at, "2015-11-02 10:00");
    }

    #[test]
    fn test_empty_date() {
        let data = header_bytes(&1u32.to_le_bytes(), "");
        let mut stream = ByteStream::new(&data);
        let header = ReplayHeader::parse(&mut stream, Schema::Legacy).unwrap();
        assert_eq!(header.recorded_at, "");
    }

    #[test]
    fn test_truncated_gametype_names_field() {
        let mut data = 1u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"COH");
        let mut stream = ByteStream::new(&data);

        let err = ReplayHeader::parse(&mut stream, Schema::Legacy).unwrap_err();
        assert!(matches!(
            err,
            ParserError::Field {
                field: "gametype",
                offset: 4,
                ..
            }
        ));
    }
}
