//! Primitive field encoding shared by every record.
//!
//! Layout rules: integers are 4-byte big-endian, booleans one byte (0/1),
//! strings carry a 2-byte big-endian length prefix, timestamps are RFC-3339
//! strings with nanosecond precision.

use chrono::{DateTime, SecondsFormat, Utc};

use super::CodecError;

#[cfg(test)]
mod tests;

/// Limit for identifiers, names, zones and flag names.
pub const SHORT_STRING_MAX: usize = 255;
/// Limit for raw log line text.
pub const LONG_STRING_MAX: usize = u16::MAX as usize;

/// Truncate to at most `max` bytes without splitting a character.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new(tag: u8) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.push(tag);
        Self { buf }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    /// Write a length-prefixed string, silently truncated to `max` bytes.
    pub fn put_str(&mut self, value: &str, max: usize) {
        let value = truncate_str(value, max.min(LONG_STRING_MAX));
        self.buf
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn put_time(&mut self, value: &DateTime<Utc>) {
        let text = value.to_rfc3339_opts(SecondsFormat::Nanos, true);
        self.put_str(&text, SHORT_STRING_MAX);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading a record, checking the leading type tag.
    pub fn open(buf: &'a [u8], expected_tag: u8) -> Result<Self, CodecError> {
        let Some(&found) = buf.first() else {
            return Err(CodecError::Empty);
        };
        if found != expected_tag {
            return Err(CodecError::WrongTag {
                expected: expected_tag,
                found,
            });
        }
        Ok(Self { buf, pos: 1 })
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < needed {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn i32(&mut self) -> Result<i32, CodecError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn bool(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }

    pub fn string(&mut self) -> Result<String, CodecError> {
        let len_bytes = self.take(2)?;
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        let offset = self.pos;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|source| CodecError::InvalidUtf8 { offset, source })
    }

    pub fn time(&mut self) -> Result<DateTime<Utc>, CodecError> {
        let value = self.string()?;
        DateTime::parse_from_rfc3339(&value)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| CodecError::InvalidTimestamp { value, source })
    }
}
