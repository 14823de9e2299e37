//! Sequential byte-stream reader for CoH2 replay files.
//!
//! [`ByteStream`] is a cursor over the bytes of a replay with primitive
//! decoders for little-endian integers and the two string encodings the
//! format uses: single-byte text and UTF-16LE text. Every read is bounds
//! checked and advances the cursor only on success.
//!
//! The cursor is addressable both relatively ([`ByteStream::skip`], which may
//! move backwards) and absolutely ([`ByteStream::seek`], which may move past
//! the end: the chunk walker uses it to delimit chunk bodies before reading).
//!
//! # Example
//!
//! ```
//! use coh2_replay::binary::ByteStream;
//!
//! let data = [0x05, 0x00, 0x00, 0x00, b'H', b'e', b'l', b'l', b'o'];
//! let mut stream = ByteStream::new(&data);
//!
//! assert_eq!(stream.read_prefixed_text().unwrap(), "Hello");
//! assert!(stream.is_at_end());
//! ```

use crate::error::{ParserError, Result};

/// Widens a length read from the stream to a `usize`.
#[inline]
#[must_use]
pub fn to_usize(value: u32) -> usize {
    value as usize
}

/// A cursor over an immutable byte buffer.
///
/// All integer reads are little-endian. The stream never owns the data; the
/// decoder keeps the file bytes alive for the duration of a decode.
#[derive(Debug, Clone)]
pub struct ByteStream<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteStream<'a> {
    /// Creates a stream positioned at offset 0.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteStream { data, position: 0 }
    }

    /// Returns the current absolute offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the total length of the underlying buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the underlying buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of bytes between the cursor and the end of the buffer.
    ///
    /// Zero when the cursor has been seeked past the end.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns whether no readable bytes remain.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the next `len` bytes without consuming them, if available.
    #[must_use]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        let end = self.position.checked_add(len)?;
        self.data.get(self.position..end)
    }

    /// Consumes `len` bytes and returns them as a slice.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len, "bytes")
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        match self.peek_bytes(len) {
            Some(slice) => {
                self.position += len;
                Ok(slice)
            }
            None => Err(ParserError::truncated(
                what,
                self.position,
                len,
                self.remaining(),
            )),
        }
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let slice = self.take(N, what)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    /// Reads a single byte.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` at end of stream.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>("u8")?[0])
    }

    /// Reads a little-endian u16.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array("u16")?))
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array("u32")?))
    }

    /// Reads a little-endian u64.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array("u64")?))
    }

    /// Reads exactly `len` bytes as single-byte-per-character text.
    ///
    /// Each byte maps to the Unicode scalar of the same value, so the
    /// conversion never fails and preserves the byte count.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than `len` bytes remain.
    pub fn read_text(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len, "text")?;
        Ok(bytes.iter().copied().map(char::from).collect())
    }

    /// Reads `units` UTF-16LE code units (`2 * units` bytes).
    ///
    /// Units are decoded one at a time; an unpaired surrogate becomes
    /// U+FFFD rather than failing the read.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if fewer than `2 * units` bytes remain.
    pub fn read_unicode(&mut self, units: usize) -> Result<String> {
        let Some(byte_len) = units.checked_mul(2) else {
            return Err(ParserError::truncated(
                "unicode",
                self.position,
                usize::MAX,
                self.remaining(),
            ));
        };
        let bytes = self.take(byte_len, "unicode")?;
        let code_units = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

        Ok(char::decode_utf16(code_units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect())
    }

    /// Reads a u32 byte length followed by that many single-byte characters.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if the prefix or the text is cut short.
    pub fn read_prefixed_text(&mut self) -> Result<String> {
        let len = self.read_u32()?;
        self.read_text(to_usize(len))
    }

    /// Reads a u32 code-unit count followed by that many UTF-16LE units.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if the prefix or the text is cut short.
    pub fn read_prefixed_unicode(&mut self) -> Result<String> {
        let units = self.read_u32()?;
        self.read_unicode(to_usize(units))
    }

    /// Reads a null-terminated UTF-16LE string one code unit at a time.
    ///
    /// Each unit is peeked as a u16; a zero terminates the string (and is
    /// consumed), anything else is rewound and re-read as a character.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::TruncatedInput` if the stream ends before the terminator.
    pub fn read_terminated_unicode(&mut self) -> Result<String> {
        let mut text = String::new();
        while self.read_u16()? != 0 {
            self.skip(-2)?;
            text.push_str(&self.read_unicode(1)?);
        }
        Ok(text)
    }

    /// Moves the cursor by a signed byte offset.
    ///
    /// Moving forward past the end is allowed; the next read fails instead.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::OutOfRange` if the result would precede offset 0.
    pub fn skip(&mut self, delta: i64) -> Result<()> {
        let magnitude = usize::try_from(delta.unsigned_abs()).unwrap_or(usize::MAX);
        if delta < 0 {
            if magnitude > self.position {
                return Err(ParserError::OutOfRange {
                    offset: self.position,
                    delta,
                });
            }
            self.position -= magnitude;
        } else {
            self.position = self.position.saturating_add(magnitude);
        }
        Ok(())
    }

    /// Moves the cursor forward by `len` bytes.
    pub fn advance(&mut self, len: usize) {
        self.position = self.position.saturating_add(len);
    }

    /// Moves the cursor to an absolute offset, which may lie past the end.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Runs `read` and labels any failure with the field name and its start offset.
    ///
    /// # Errors
    ///
    /// Returns whatever `read` fails with, wrapped in `ParserError::Field`.
    ///
    /// # Example
    ///
    /// ```
    /// use coh2_replay::binary::ByteStream;
    ///
    /// let mut stream = ByteStream::new(&[0x01]);
    /// let err = stream.field("map_width", ByteStream::read_u32).unwrap_err();
    /// assert!(err.to_string().contains("map_width"));
    /// ```
    pub fn field<T>(
        &mut self,
        name: &'static str,
        read: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let offset = self.position;
        read(self).map_err(|e| e.in_field(name, offset))
    }
}
