//! Room-side option state for Lobbysync.
//!
//! Each room runs as an isolated Tokio task (actor model) owning the live
//! option set, the value cache, and the connection registry.
//!
//! # Key types
//!
//! - [`ModeProvider`] / [`RoleProvider`] — the traits mode developers implement
//! - [`RoomHandle`] — send commands to a running room actor
//! - [`Reconciler`] — converges the live set on what providers declare
//! - [`Synchronizer`] — batches diffs onto connections, handles client updates
//! - [`ValueCache`] — remembers user choices across mode switches

mod cache;
mod defaults;
mod error;
mod provider;
mod reconcile;
mod room;
mod set;
mod sync;

pub use cache::ValueCache;
pub use defaults::{default_options, option_name};
pub use error::OptionsError;
pub use provider::{
    ModeMetadata, ModeProvider, RoleAlignment, RoleMetadata, RoleOption, RoleProvider,
};
pub use reconcile::{ReconcileOutcome, Reconciler, MAX_PASSES};
pub use room::{spawn_room, RoomHandle, DEFAULT_CHANNEL_SIZE};
pub use set::{DiffOp, OptionSet, MODE_SELECTOR_KEY};
pub use sync::{ConnectionSender, Synchronizer};
