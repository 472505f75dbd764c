//! Error types for the room options layer.

use lobbysync_protocol::{RoomId, ValueError};

/// Errors that can occur during option operations.
///
/// None of these ever cross a room's command loop — client-originated
/// failures are logged and dropped where they occur. They surface only
/// through the programmatic [`RoomHandle`] API.
///
/// [`RoomHandle`]: crate::RoomHandle
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// The referenced key is not in the live option set.
    #[error("no option with key '{0}' in the live set")]
    UnknownOption(String),

    /// A proposed value failed validation against the live option.
    #[error("invalid value for option '{key}': {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: ValueError,
    },

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
