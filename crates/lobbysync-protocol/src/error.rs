//! Error types for the protocol layer.
//!
//! Each crate in Lobbysync defines its own error enum. A `ValueError`
//! always means a proposed option value failed validation against the
//! option that currently exists; a `WireError` always means bytes on the
//! wire could not be decoded.

/// Reasons a proposed option value is rejected by [`validate`].
///
/// Every variant corresponds to one rule the server enforces before a
/// value replaces the one in the live set. The immutable-field variants
/// (`LabelsChanged`, `ConstraintChanged`) fire when a candidate tries to
/// change something that is fixed for the lifetime of an option identity.
///
/// [`validate`]: crate::OptionValue::validate
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    /// The candidate is a different kind of value (e.g. a boolean was
    /// proposed for a number option).
    #[error("expected {expected} value, got {got}")]
    KindMismatch {
        expected: crate::ValueKind,
        got: crate::ValueKind,
    },

    /// An enum candidate's label list differs from the declared one.
    #[error("available options were changed unexpectedly")]
    LabelsChanged,

    /// An enum candidate selects an index outside its label list.
    #[error("selected index out of bounds: {selected}, options length: {len}")]
    SelectedOutOfBounds { selected: usize, len: usize },

    /// A number candidate changed an immutable constraint
    /// (step, lower, upper, zero-is-infinity, or suffix).
    #[error("number {field} was changed unexpectedly")]
    ConstraintChanged { field: &'static str },

    /// A number candidate's value falls outside [lower, upper].
    #[error("expected value ({value}) to be within bounds [{lower}, {upper}]")]
    OutOfRange { value: f32, lower: f32, upper: f32 },

    /// A number candidate's value is not a multiple of the step.
    #[error("expected value ({value}) to be a multiple of the step ({step})")]
    OffStep { value: f32, step: f32 },
}

/// Errors that can occur while decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The payload ended before a field was fully read.
    #[error("unexpected end of payload")]
    UnexpectedEof,

    /// A string field contained invalid UTF-8.
    #[error("invalid utf-8 in string field: {0}")]
    BadUtf8(#[from] std::string::FromUtf8Error),

    /// A packed varint ran longer than the maximum width.
    #[error("packed integer too long")]
    VarIntTooLong,

    /// The value-kind tag byte is not a known [`ValueKind`].
    ///
    /// [`ValueKind`]: crate::ValueKind
    #[error("unknown option value kind: {0:#04x}")]
    UnknownValueKind(u8),

    /// The message tag byte is not a known message.
    #[error("unknown option message tag: {0:#04x}")]
    UnknownMessageTag(u8),
}
