//! Wire encoding for option messages.
//!
//! Options ride inside the game's existing reliable messaging layer, so
//! framing, encryption and delivery are someone else's problem; this
//! module only defines the payload bytes.
//!
//! Layout of a `Set` payload:
//!
//! ```text
//! seq: u16 LE | category: string | priority: u16 LE | key: string
//!            | kind: u8 | kind-specific fields
//! ```
//!
//! where `string` is a 7-bit packed varint length followed by UTF-8
//! bytes. Enum values are a packed selected index followed by labels
//! until the end of the payload; booleans are one byte; numbers are four
//! LE f32s, a bool byte, and the suffix string.

use std::fmt;

use crate::{GameOption, OptionValue, ValueKind, WireError};

/// Maximum number of option messages in one outbound batch.
///
/// A diff larger than this is split into consecutive batches, sent in
/// order; a client that applies every batch in order ends equal to the
/// server.
pub const MAX_BATCH_MESSAGES: usize = 8;

/// Wire tag for a [`WireMessage::Set`].
pub const TAG_SET_OPTION: u8 = 0x01;
/// Wire tag for a [`WireMessage::Delete`].
pub const TAG_DELETE_OPTION: u8 = 0x02;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// An option synchronization message, in either direction.
///
/// The server broadcasts these to keep clients converged; the room host's
/// client sends them back to propose changes.
#[derive(Debug, Clone, PartialEq)]
pub enum WireMessage {
    /// Create or update one option.
    Set { seq_id: u16, option: GameOption },

    /// Remove one option by key.
    Delete { seq_id: u16, key: String },
}

impl WireMessage {
    /// The key this message addresses.
    pub fn key(&self) -> &str {
        match self {
            Self::Set { option, .. } => &option.key,
            Self::Delete { key, .. } => key,
        }
    }

    /// Encodes the message, tag byte included.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = PacketWriter::new();
        match self {
            Self::Set { seq_id, option } => {
                w.u8(TAG_SET_OPTION);
                w.u16(*seq_id);
                write_option(&mut w, option);
            }
            Self::Delete { seq_id, key } => {
                w.u8(TAG_DELETE_OPTION);
                w.u16(*seq_id);
                w.string(key);
            }
        }
        w.into_bytes()
    }

    /// Decodes a message from a full payload.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] on an unknown tag, truncated payload, or
    /// malformed field.
    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        let mut r = PacketReader::new(data);
        let tag = r.u8()?;
        match tag {
            TAG_SET_OPTION => {
                let seq_id = r.u16()?;
                let option = read_option(&mut r)?;
                Ok(Self::Set { seq_id, option })
            }
            TAG_DELETE_OPTION => {
                let seq_id = r.u16()?;
                let key = r.string()?;
                Ok(Self::Delete { seq_id, key })
            }
            other => Err(WireError::UnknownMessageTag(other)),
        }
    }
}

impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { option, .. } => write!(f, "set '{}'", option.key),
            Self::Delete { key, .. } => write!(f, "delete '{}'", key),
        }
    }
}

fn write_option(w: &mut PacketWriter, option: &GameOption) {
    w.string(&option.category);
    w.u16(option.priority);
    w.string(&option.key);
    w.u8(option.value().kind().wire_tag());
    match option.value() {
        OptionValue::Enum {
            options,
            selected_idx,
        } => {
            w.upacked(*selected_idx as u32);
            for label in options {
                w.string(label);
            }
        }
        OptionValue::Boolean { enabled } => w.bool(*enabled),
        OptionValue::Number {
            value,
            step,
            lower,
            upper,
            zero_is_infinity,
            suffix,
        } => {
            w.f32(*value);
            w.f32(*step);
            w.f32(*lower);
            w.f32(*upper);
            w.bool(*zero_is_infinity);
            w.string(suffix);
        }
    }
}

fn read_option(r: &mut PacketReader<'_>) -> Result<GameOption, WireError> {
    let category = r.string()?;
    let priority = r.u16()?;
    let key = r.string()?;
    let kind_tag = r.u8()?;
    let kind = ValueKind::from_wire_tag(kind_tag).ok_or(WireError::UnknownValueKind(kind_tag))?;

    let value = match kind {
        ValueKind::Enum => {
            let selected_idx = r.upacked()? as usize;
            // Labels run to the end of the payload.
            let mut options = Vec::new();
            while !r.is_empty() {
                options.push(r.string()?);
            }
            OptionValue::Enum {
                options,
                selected_idx,
            }
        }
        ValueKind::Boolean => OptionValue::Boolean { enabled: r.bool()? },
        ValueKind::Number => OptionValue::Number {
            value: r.f32()?,
            step: r.f32()?,
            lower: r.f32()?,
            upper: r.f32()?,
            zero_is_infinity: r.bool()?,
            suffix: r.string()?,
        },
    };

    Ok(GameOption::new(category, key, value, priority))
}

// ---------------------------------------------------------------------------
// PacketReader / PacketWriter
// ---------------------------------------------------------------------------

/// Sequential reader over a message payload.
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes remaining.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, WireError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn f32(&mut self) -> Result<f32, WireError> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn bool(&mut self) -> Result<bool, WireError> {
        Ok(self.u8()? != 0)
    }

    /// Reads a 7-bit packed unsigned varint (LEB128, max 5 bytes).
    pub fn upacked(&mut self) -> Result<u32, WireError> {
        let mut out: u32 = 0;
        for shift in 0..5 {
            let byte = self.u8()?;
            out |= u32::from(byte & 0x7f) << (shift * 7);
            if byte & 0x80 == 0 {
                return Ok(out);
            }
        }
        Err(WireError::VarIntTooLong)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn string(&mut self) -> Result<String, WireError> {
        let len = self.upacked()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }
}

/// Sequential writer producing a message payload.
#[derive(Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bool(&mut self, v: bool) {
        self.u8(u8::from(v));
    }

    pub fn upacked(&mut self, mut v: u32) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.u8(byte);
            if v == 0 {
                break;
            }
        }
    }

    pub fn string(&mut self, s: &str) {
        self.upacked(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

// =========================================================================
// Tests
// =========================================================================
