//! Walker for the "Relic Chunky" container format.
//!
//! A replay holds two top-level containers back to back. Each container is a
//! small header followed by a tree of chunks:
//!
//! | Size | Field |
//! |------|-------|
//! | 8 | tag: `FOLDxxxx` (group) or `DATAxxxx` (leaf) |
//! | 4 | chunk version |
//! | 4 | declared body length |
//! | 4 | name length |
//! | 8 | reserved |
//! | var | name (name length bytes) |
//! | var | body (declared length bytes) |
//!
//! Group bodies contain further chunks. Leaf bodies are handed to a
//! [`ChunkSink`], which decides whether it understands the (tag, version)
//! pair. Whatever the sink consumes, the walker re-anchors the cursor to the
//! chunk's declared end before moving on, so partial or outdated decoders can
//! never desynchronize the walk.

use log::{debug, info, trace};

use crate::binary::{to_usize, ByteStream};
use crate::error::{ParserError, Result};
use crate::format::{
    CHUNKY_FIXED_HEADER_SIZE, CHUNKY_MAGIC, CHUNKY_VERSION, DATA_MARKER, FOLD_MARKER,
};

/// Default limit on group nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Header of a single chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Full 8-byte tag, e.g. `DATASDSC`.
    pub tag: [u8; 8],
    /// Chunk version.
    pub version: u32,
    /// Declared body length in bytes.
    pub length: u32,
    /// Optional chunk name; not used for decoding.
    pub name: Option<String>,
    /// Offset of the tag.
    pub offset: usize,
    /// Offset of the first body byte.
    pub body_start: usize,
}

impl ChunkHeader {
    /// Returns whether this is a group chunk.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.tag.starts_with(FOLD_MARKER)
    }

    /// Returns whether this is a leaf chunk.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.tag.starts_with(DATA_MARKER)
    }

    /// Offset just past the body, where the next sibling starts.
    #[must_use]
    pub fn body_end(&self) -> usize {
        self.body_start + to_usize(self.length)
    }

    /// The tag as text, for logging.
    #[must_use]
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }
}

/// What a sink did with a leaf chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOutcome {
    /// The sink recognized the chunk and decoded it.
    Decoded,
    /// The (tag, version) pair is not registered; the body is skipped.
    Skipped,
}

/// Receives leaf chunks found by the walker.
pub trait ChunkSink {
    /// Decodes a leaf chunk whose body starts at the current stream position.
    ///
    /// The sink may read any amount; the walker repositions the stream to
    /// `header.body_end()` afterwards.
    ///
    /// # Errors
    ///
    /// Any error aborts the walk.
    fn leaf(&mut self, header: &ChunkHeader, stream: &mut ByteStream<'_>) -> Result<LeafOutcome>;
}

/// Counters gathered while walking one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSummary {
    /// Offset of the container signature.
    pub offset: usize,
    /// Chunks walked, groups and leaves at every level.
    pub chunk_count: usize,
    /// Leaves the sink decoded.
    pub decoded: usize,
    /// Leaves the sink skipped.
    pub skipped: usize,
    /// Deepest group nesting reached (0 when only top-level chunks exist).
    pub max_depth_seen: usize,
}

/// Recursive walker over one container at a time.
#[derive(Debug, Clone)]
pub struct ChunkWalker {
    max_depth: usize,
    summary: ContainerSummary,
}

impl Default for ChunkWalker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ChunkWalker {
    /// Creates a walker that rejects group nesting deeper than `max_depth`.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        ChunkWalker {
            max_depth,
            summary: ContainerSummary::default(),
        }
    }

    /// Walks one container starting at the current position.
    ///
    /// Returns `Ok(None)` without moving the cursor when the signature is
    /// absent (including when fewer than 12 bytes remain).
    ///
    /// # Errors
    ///
    /// - `ParserError::UnsupportedContainerVersion` for a version other than 3
    /// - `ParserError::MalformedChunkFraming` for impossible header or chunk lengths
    /// - any error raised while reading chunk headers or by the sink
    pub fn parse_container(
        &mut self,
        stream: &mut ByteStream<'_>,
        sink: &mut dyn ChunkSink,
    ) -> Result<Option<ContainerSummary>> {
        let offset = stream.position();
        if stream.peek_bytes(CHUNKY_MAGIC.len()) != Some(&CHUNKY_MAGIC[..]) {
            debug!("no container signature at offset {offset}");
            return Ok(None);
        }
        stream.advance(CHUNKY_MAGIC.len());
        stream.advance(4);

        let version_offset = stream.position();
        let version = stream.field("container version", ByteStream::read_u32)?;
        if version != CHUNKY_VERSION {
            return Err(ParserError::UnsupportedContainerVersion {
                offset: version_offset,
                expected: CHUNKY_VERSION,
                found: version,
            });
        }

        stream.advance(4);
        let header_length = stream.field("container header length", ByteStream::read_u32)?;
        let Some(rest) = header_length.checked_sub(CHUNKY_FIXED_HEADER_SIZE) else {
            return Err(ParserError::MalformedChunkFraming {
                offset,
                reason: format!(
                    "container header length {header_length} is shorter than {CHUNKY_FIXED_HEADER_SIZE}"
                ),
            });
        };
        stream.advance(to_usize(rest));

        self.summary = ContainerSummary {
            offset,
            ..ContainerSummary::default()
        };
        while self.parse_chunk(stream, sink, 0)? {}

        info!(
            "container at offset {offset}: {} chunks, {} decoded, {} skipped",
            self.summary.chunk_count, self.summary.decoded, self.summary.skipped
        );
        Ok(Some(std::mem::take(&mut self.summary)))
    }

    /// Walks one chunk (and its children) at `depth`.
    ///
    /// Returns `Ok(false)` without consuming anything when the next bytes are
    /// not a chunk tag; this is the only way sibling iteration ends. On
    /// `Ok(true)` the cursor sits exactly at the chunk's declared end.
    ///
    /// # Errors
    ///
    /// - `ParserError::MalformedChunkFraming` if the body runs past the end of
    ///   the stream or nesting exceeds the configured depth
    /// - any error raised while reading the header or by the sink
    pub fn parse_chunk(
        &mut self,
        stream: &mut ByteStream<'_>,
        sink: &mut dyn ChunkSink,
        depth: usize,
    ) -> Result<bool> {
        let Some(header) = Self::read_header(stream)? else {
            return Ok(false);
        };

        trace!(
            "{:indent$}{} v{:#x} len {} at {}",
            "",
            header.tag_str(),
            header.version,
            header.length,
            header.offset,
            indent = depth * 2
        );

        if header.body_end() > stream.len() {
            return Err(ParserError::MalformedChunkFraming {
                offset: header.offset,
                reason: format!(
                    "{} declares {} bytes but only {} remain",
                    header.tag_str(),
                    header.length,
                    stream.len().saturating_sub(header.body_start)
                ),
            });
        }

        self.summary.chunk_count += 1;
        self.summary.max_depth_seen = self.summary.max_depth_seen.max(depth);

        if header.is_folder() {
            if depth >= self.max_depth {
                return Err(ParserError::MalformedChunkFraming {
                    offset: header.offset,
                    reason: format!("group nesting exceeds {} levels", self.max_depth),
                });
            }
            while stream.position() < header.body_end() {
                if !self.parse_chunk(stream, sink, depth + 1)? {
                    break;
                }
            }
        } else {
            match sink.leaf(&header, stream)? {
                LeafOutcome::Decoded => self.summary.decoded += 1,
                LeafOutcome::Skipped => {
                    debug!(
                        "skipping unregistered chunk {} v{:#x} at {}",
                        header.tag_str(),
                        header.version,
                        header.offset
                    );
                    self.summary.skipped += 1;
                }
            }
        }

        stream.seek(header.body_end());
        Ok(true)
    }

    fn read_header(stream: &mut ByteStream<'_>) -> Result<Option<ChunkHeader>> {
        let offset = stream.position();
        let Some(tag_bytes) = stream.peek_bytes(8) else {
            return Ok(None);
        };
        if !tag_bytes.starts_with(FOLD_MARKER) && !tag_bytes.starts_with(DATA_MARKER) {
            return Ok(None);
        }

        let mut tag = [0u8; 8];
        tag.copy_from_slice(tag_bytes);
        stream.advance(8);

        let version = stream.field("chunk version", ByteStream::read_u32)?;
        let length = stream.field("chunk length", ByteStream::read_u32)?;
        let name_length = stream.field("chunk name length", ByteStream::read_u32)?;
        stream.advance(8);

        let name = if name_length > 0 {
            Some(stream.field("chunk name", |s| s.read_text(to_usize(name_length)))?)
        } else {
            None
        };

        Ok(Some(ChunkHeader {
            tag,
            version,
            length,
            name,
            offset,
            body_start: stream.position(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sink that records every leaf and reads a fixed amount from each body.
    struct Recorder {
        read: usize,
        seen: Vec<(String, usize, usize)>,
    }

    impl Recorder {
        fn new(read: usize) -> Self {
            Recorder {
                read,
                seen: Vec::new(),
            }
        }
    }

    impl ChunkSink for Recorder {
        fn leaf(&mut self, header: &ChunkHeader, stream: &mut ByteStream<'_>) -> Result<LeafOutcome> {
            self.seen
                .push((header.tag_str(), header.body_start, header.body_end()));
            stream.advance(self.read);
            if header.tag == *b"DATAKNWN" {
                Ok(LeafOutcome::Decoded)
            } else {
                Ok(LeafOutcome::Skipped)
            }
        }
    }

    fn chunk(tag: &[u8; 8], name: &str, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(tag);
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&u32::try_from(name.len()).unwrap().to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(body);
        out
    }

    fn container(chunks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(CHUNKY_MAGIC);
        out.extend_from_slice(&0x001A_0A0Du32.to_le_bytes());
        out.extend_from_slice(&CHUNKY_VERSION.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&36u32.to_le_bytes());
        out.extend_from_slice(&28u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        for c in chunks {
            out.extend_from_slice(c);
        }
        out
    }

    #[test]
    fn test_chunk_header_fields() {
        let data = chunk(b"DATAKNWN", "scenario", &[1, 2, 3, 4]);
        let mut stream = ByteStream::new(&data);
        let header = ChunkWalker::read_header(&mut stream).unwrap().unwrap();

        assert!(header.is_data());
        assert!(!header.is_folder());
        assert_eq!(header.version, 1);
        assert_eq!(header.length, 4);
        assert_eq!(header.name.as_deref(), Some("scenario"));
        assert_eq!(header.body_start, 28 + 8);
        assert_eq!(header.body_end(), data.len());
    }

    #[test]
    fn test_non_chunk_tag_ends_siblings_without_consuming() {
        let data = b"TICKDATA\x00\x00\x00\x00".to_vec();
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        assert!(!ChunkWalker::default()
            .parse_chunk(&mut stream, &mut sink, 0)
            .unwrap());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_short_tail_ends_siblings() {
        let data = b"FOLD".to_vec();
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        assert!(!ChunkWalker::default()
            .parse_chunk(&mut stream, &mut sink, 0)
            .unwrap());
    }

    #[test]
    fn test_resync_after_under_read() {
        let data = chunk(b"DATAKNWN", "", &[0u8; 40]);
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(3);

        assert!(ChunkWalker::default()
            .parse_chunk(&mut stream, &mut sink, 0)
            .unwrap());
        assert_eq!(stream.position(), data.len());
    }

    #[test]
    fn test_resync_after_over_read() {
        let mut data = chunk(b"DATAKNWN", "", &[0u8; 4]);
        let end = data.len();
        data.extend_from_slice(&[0xEE; 64]);

        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(50);

        assert!(ChunkWalker::default()
            .parse_chunk(&mut stream, &mut sink, 0)
            .unwrap());
        assert_eq!(stream.position(), end);
    }

    #[test]
    fn test_nested_groups_are_walked() {
        let leaf_a = chunk(b"DATAKNWN", "", &[0u8; 6]);
        let leaf_b = chunk(b"DATAUNKN", "", &[0u8; 2]);
        let mut inner_body = leaf_a.clone();
        inner_body.extend_from_slice(&leaf_b);
        let inner = chunk(b"FOLDINNR", "", &inner_body);
        let outer = chunk(b"FOLDOUTR", "", &inner);

        let data = container(&[outer, leaf_a]);
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let summary = ChunkWalker::default()
            .parse_container(&mut stream, &mut sink)
            .unwrap()
            .unwrap();

        assert_eq!(summary.chunk_count, 5);
        assert_eq!(summary.decoded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.max_depth_seen, 2);
        assert_eq!(sink.seen.len(), 3);
        assert_eq!(sink.seen[1].0, "DATAUNKN");
        assert_eq!(stream.position(), data.len());
    }

    #[test]
    fn test_missing_container_is_not_an_error() {
        let data = b"Not A Chunky container".to_vec();
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let result = ChunkWalker::default()
            .parse_container(&mut stream, &mut sink)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_unsupported_container_version() {
        let mut data = container(&[]);
        data[16..20].copy_from_slice(&4u32.to_le_bytes());
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let result = ChunkWalker::default().parse_container(&mut stream, &mut sink);
        assert!(matches!(
            result,
            Err(ParserError::UnsupportedContainerVersion {
                offset: 16,
                expected: 3,
                found: 4
            })
        ));
    }

    #[test]
    fn test_container_header_shorter_than_fixed_part() {
        let mut data = container(&[]);
        data[24..28].copy_from_slice(&20u32.to_le_bytes());
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let result = ChunkWalker::default().parse_container(&mut stream, &mut sink);
        match result {
            Err(ParserError::MalformedChunkFraming { offset, reason }) => {
                assert_eq!(offset, 0);
                assert!(reason.contains("header length 20"));
            }
            other => panic!("expected malformed framing, got {other:?}"),
        }
        assert!(sink.seen.is_empty());
    }

    #[test]
    fn test_container_header_of_exactly_fixed_size() {
        let mut data = container(&[chunk(b"DATAKNWN", "", &[0u8; 4])]);
        // Drop the 8 bytes past the fixed part and declare length 28.
        data.drain(28..36);
        data[24..28].copy_from_slice(&28u32.to_le_bytes());
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let summary = ChunkWalker::default()
            .parse_container(&mut stream, &mut sink)
            .unwrap()
            .unwrap();
        assert_eq!(summary.chunk_count, 1);
        assert_eq!(stream.position(), data.len());
    }

    #[test]
    fn test_declared_length_past_end_is_malformed() {
        let mut data = chunk(b"DATAKNWN", "", &[0u8; 4]);
        data[12..16].copy_from_slice(&1000u32.to_le_bytes());
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let result = ChunkWalker::default().parse_chunk(&mut stream, &mut sink, 0);
        assert!(matches!(
            result,
            Err(ParserError::MalformedChunkFraming { offset: 0, .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let mut data = chunk(b"DATAKNWN", "", &[]);
        for _ in 0..4 {
            data = chunk(b"FOLDNEST", "", &data);
        }
        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);

        let result = ChunkWalker::new(2).parse_chunk(&mut stream, &mut sink, 0);
        assert!(matches!(
            result,
            Err(ParserError::MalformedChunkFraming { .. })
        ));

        let mut stream = ByteStream::new(&data);
        assert!(ChunkWalker::new(4)
            .parse_chunk(&mut stream, &mut sink, 0)
            .unwrap());
    }

    #[test]
    fn test_group_with_trailing_garbage_resyncs_to_group_end() {
        let mut body = chunk(b"DATAKNWN", "", &[0u8; 2]);
        body.extend_from_slice(b"garbage!garbage!");
        let group = chunk(b"FOLDJUNK", "", &body);
        let mut data = group.clone();
        data.extend_from_slice(&chunk(b"DATAKNWN", "", &[]));

        let mut stream = ByteStream::new(&data);
        let mut sink = Recorder::new(0);
        let mut walker = ChunkWalker::default();

        assert!(walker.parse_chunk(&mut stream, &mut sink, 0).unwrap());
        assert_eq!(stream.position(), group.len());
        assert!(walker.parse_chunk(&mut stream, &mut sink, 0).unwrap());
        assert_eq!(stream.position(), data.len());
    }
}
