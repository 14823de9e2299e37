//! Error types for the CoH2 replay decoder.
//!
//! This module defines the error hierarchy for every failure a decode can
//! hit: I/O failures while loading the file, truncated fields, bad seeks,
//! container framing problems, an unsupported container version and a
//! malformed identity table.
//!
//! Errors raised by the byte stream carry the byte offset they occurred at.
//! Record decoders wrap them in [`ParserError::Field`] so that the terminal
//! error also names the field that was being read.

use thiserror::Error;

/// The main error type for replay decoding operations.
///
/// Any error aborts the decode entirely: a single misread offset invalidates
/// every offset after it, so no partial model is ever returned.
///
/// # Example
///
/// ```
/// use coh2_replay::error::{ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ParserError::MalformedChunkFraming {
///         offset: 112,
///         reason: "declared length runs past end of stream".to_string(),
///     })
/// }
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading the replay file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Fewer bytes were available than a field requires.
    #[error("Truncated input reading {what} at offset {offset}: need {need} bytes, {have} available")]
    TruncatedInput {
        /// Label of the primitive or field being read.
        what: &'static str,
        /// Byte offset where the read started.
        offset: usize,
        /// Number of bytes the read required.
        need: usize,
        /// Number of bytes left in the stream.
        have: usize,
    },

    /// A relative skip would have moved the cursor before the start of the stream.
    #[error("Skip of {delta} bytes from offset {offset} moves before start of stream")]
    OutOfRange {
        /// Cursor position before the skip.
        offset: usize,
        /// The requested signed displacement.
        delta: i64,
    },

    /// A container signature was found but its format version is not supported.
    #[error("Unsupported container version at offset {offset}: expected {expected}, found {found}")]
    UnsupportedContainerVersion {
        /// Byte offset of the version field.
        offset: usize,
        /// The only supported version.
        expected: u32,
        /// The version found in the stream.
        found: u32,
    },

    /// A chunk header is inconsistent with the reachable stream bounds.
    #[error("Malformed chunk framing at offset {offset}: {reason}")]
    MalformedChunkFraming {
        /// Byte offset of the offending chunk header.
        offset: usize,
        /// Description of the inconsistency.
        reason: String,
    },

    /// A container was expected but the bytes at its position do not match
    /// the container signature.
    #[error("Invalid magic bytes at offset {offset}: expected {expected}, found {found}")]
    InvalidMagic {
        /// Byte offset where the signature was expected.
        offset: usize,
        /// The expected magic bytes (as hex string for display).
        expected: String,
        /// The bytes found instead (as hex string).
        found: String,
    },

    /// An identity table could not be parsed.
    #[error("Invalid identity table: {0}")]
    IdentityTable(#[from] serde_json::Error),

    /// Context wrapper naming the field whose read failed.
    #[error("Failed to read {field} at offset {offset}: {source}")]
    Field {
        /// Name of the field being decoded.
        field: &'static str,
        /// Byte offset where the field starts.
        offset: usize,
        /// The underlying failure.
        #[source]
        source: Box<ParserError>,
    },
}

impl ParserError {
    /// Creates an `InvalidMagic` error with the given byte slices.
    ///
    /// The bytes are converted to hex strings for human-readable display.
    ///
    /// # Example
    ///
    /// ```
    /// use coh2_replay::error::ParserError;
    ///
    /// let err = ParserError::invalid_magic(76, b"Relic Chunky", b"\x00\x00\x00\x00");
    /// assert!(err.to_string().contains("Invalid magic bytes"));
    /// ```
    #[must_use]
    pub fn invalid_magic(offset: usize, expected: &[u8], found: &[u8]) -> Self {
        ParserError::InvalidMagic {
            offset,
            expected: bytes_to_hex(expected),
            found: bytes_to_hex(found),
        }
    }

    /// Creates a `TruncatedInput` error.
    #[must_use]
    pub fn truncated(what: &'static str, offset: usize, need: usize, have: usize) -> Self {
        ParserError::TruncatedInput {
            what,
            offset,
            need,
            have,
        }
    }

    /// Wraps this error with the name and offset of the field being read.
    #[must_use]
    pub fn in_field(self, field: &'static str, offset: usize) -> Self {
        ParserError::Field {
            field,
            offset,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through any `Field` wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &ParserError {
        match self {
            ParserError::Field { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns whether the root cause is a truncated read.
    #[must_use]
    pub fn is_truncation(&self) -> bool {
        matches!(self.root_cause(), ParserError::TruncatedInput { .. })
    }
}

/// Converts a byte slice to a hexadecimal string representation.
///
/// If the slice is 12 bytes or less, formats as space-separated hex values.
/// If longer, shows the first 12 bytes followed by "...".
fn bytes_to_hex(bytes: &[u8]) -> String {
    let shown = bytes.len().min(12);
    let prefix = bytes[..shown]
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    if bytes.len() <= 12 {
        prefix
    } else {
        format!("{prefix}... ({} bytes total)", bytes.len())
    }
}

/// A specialized Result type for replay decoding operations.
pub type Result<T> = std::result::Result<T, ParserError>;
