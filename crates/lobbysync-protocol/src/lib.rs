//! Wire protocol for Lobbysync.
//!
//! This crate defines the option data model and its bytes on the wire:
//!
//! - **Types** ([`OptionValue`], [`GameOption`], [`ConnectionId`]) — typed,
//!   self-validating option values and the options that carry them.
//! - **Wire format** ([`WireMessage`], [`PacketReader`], [`PacketWriter`])
//!   — the `SetOption`/`DeleteOption` payloads and the packed primitives
//!   they are built from.
//! - **Errors** ([`ValueError`], [`WireError`]) — why a value or a payload
//!   was rejected.
//!
//! The protocol layer knows nothing about rooms, providers, or
//! reconciliation — it only defines what an option is, when a proposed
//! value is acceptable, and how options serialize.

mod error;
mod types;
mod wire;

pub use error::{ValueError, WireError};
pub use types::{
    category, priority, ConnectionId, GameOption, OptionValue, RoomId, ValueKind, EPSILON,
};
pub use wire::{
    PacketReader, PacketWriter, WireMessage, MAX_BATCH_MESSAGES, TAG_DELETE_OPTION, TAG_SET_OPTION,
};
