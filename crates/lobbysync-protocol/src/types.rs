//! Core protocol types for Lobbysync's wire format.
//!
//! An option is a single named, typed, priority-ordered configuration
//! value in a room: the selected map, a timer, a role toggle. These types
//! travel on the wire between the server and every client, so their
//! validation and comparison rules are the contract that keeps both sides
//! converging on the same state.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::ValueError;

/// Tolerance for floating-point comparisons on number values.
///
/// Values that arrive over the wire (or are recomputed by a provider) can
/// carry float precision error; two numbers closer than this are the same
/// value for both diffing and validation.
pub const EPSILON: f32 = 1e-5;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a connected client.
///
/// Newtype over `u64` so a connection can't be confused with any other id.
/// The transport layer assigns these; the core only uses them to address
/// broadcasts and to exclude a message's sender from its echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A unique identifier for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Well-known categories and priorities
// ---------------------------------------------------------------------------

/// Category names used by the stock option tables.
///
/// A category groups options under a heading in the client's settings UI.
/// The empty category renders at the top, uncategorized. Role-generated
/// options always land in [`category::CONFIG`].
pub mod category {
    pub const NONE: &str = "";
    pub const MEETINGS: &str = "Meeting Settings";
    pub const ROLES: &str = "Role Settings";
    pub const TASKS: &str = "Task Settings";
    pub const CREWMATE_ROLES: &str = "Crewmate Roles";
    pub const NEUTRAL_ROLES: &str = "Neutral Roles";
    pub const IMPOSTOR_ROLES: &str = "Impostor Roles";
    pub const CONFIG: &str = "Config";
}

/// Priority bands for display/broadcast ordering.
///
/// Options sort by priority ascending, ties broken by insertion order.
/// Bands are 100 apart so related options can slot between them with
/// `A + 1`, `A + 2`, and so on. Role-generated options start at
/// [`priority::GENERATED`] offset by provider order, keeping output stable
/// across reconciliation passes.
pub mod priority {
    pub const A: u16 = 100;
    pub const B: u16 = 200;
    pub const C: u16 = 300;
    pub const D: u16 = 400;
    pub const E: u16 = 500;
    pub const F: u16 = 600;

    /// Base priority for options declared by role providers.
    pub const GENERATED: u16 = F;
}

// ---------------------------------------------------------------------------
// OptionValue
// ---------------------------------------------------------------------------

/// The kind tag of an [`OptionValue`], as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Number,
    Boolean,
    Enum,
}

impl ValueKind {
    /// The single-byte wire tag for this kind.
    pub fn wire_tag(self) -> u8 {
        match self {
            Self::Number => 0,
            Self::Boolean => 1,
            Self::Enum => 2,
        }
    }

    /// Parses a wire tag byte back into a kind.
    pub fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Number),
            1 => Some(Self::Boolean),
            2 => Some(Self::Enum),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enum => write!(f, "enum"),
        }
    }
}

/// A typed, self-validating option value.
///
/// Three kinds exist. For each, some fields are the *value* (what a client
/// may change) and the rest are the *shape* (immutable for the lifetime of
/// an option identity):
///
/// - `Enum` — the selected index is the value; the label list is shape.
/// - `Boolean` — the flag is the value; there is no shape.
/// - `Number` — `value` is the value; step, bounds, zero-is-infinity and
///   the display suffix are shape.
///
/// A provider that wants to change an option's shape must change its
/// identity (key or category); [`validate`](Self::validate) rejects
/// candidates whose shape differs.
///
/// The serde representation matches the JSON persisted by the account
/// collaborator: `{"type": "number", "value": 150.0, ...}` with camelCase
/// field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum OptionValue {
    /// An immutable ordered list of labels plus the selected index.
    Enum {
        options: Vec<String>,
        selected_idx: usize,
    },

    /// A single flag.
    Boolean { enabled: bool },

    /// A bounded, stepped number with display metadata.
    Number {
        value: f32,
        step: f32,
        lower: f32,
        upper: f32,
        zero_is_infinity: bool,
        suffix: String,
    },
}

impl OptionValue {
    /// Convenience constructor for an enum value.
    pub fn enumeration<S: Into<String>>(
        options: impl IntoIterator<Item = S>,
        selected_idx: usize,
    ) -> Self {
        Self::Enum {
            options: options.into_iter().map(Into::into).collect(),
            selected_idx,
        }
    }

    /// Convenience constructor for a boolean value.
    pub fn boolean(enabled: bool) -> Self {
        Self::Boolean { enabled }
    }

    /// Convenience constructor for a number value.
    pub fn number(
        value: f32,
        step: f32,
        lower: f32,
        upper: f32,
        zero_is_infinity: bool,
        suffix: impl Into<String>,
    ) -> Self {
        Self::Number {
            value,
            step,
            lower,
            upper,
            zero_is_infinity,
            suffix: suffix.into(),
        }
    }

    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Enum { .. } => ValueKind::Enum,
            Self::Boolean { .. } => ValueKind::Boolean,
            Self::Number { .. } => ValueKind::Number,
        }
    }

    /// The currently selected label, for enum values.
    pub fn selected_option(&self) -> Option<&str> {
        match self {
            Self::Enum {
                options,
                selected_idx,
            } => options.get(*selected_idx).map(String::as_str),
            _ => None,
        }
    }

    /// The numeric value, for number values.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// The flag, for boolean values.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean { enabled } => Some(*enabled),
            _ => None,
        }
    }

    /// Returns `true` if this is a number value roughly equal to `v`.
    pub fn is_roughly(&self, v: f32) -> bool {
        matches!(self, Self::Number { value, .. } if (value - v).abs() < EPSILON)
    }

    /// Checks whether `candidate` is an acceptable replacement for this
    /// value.
    ///
    /// The candidate must be the same kind, must not change any immutable
    /// shape field, and its value must satisfy this value's constraints:
    /// an enum's selected index must be in bounds, a number must lie
    /// within `[lower, upper]` and be a step multiple within
    /// [`EPSILON`] tolerance.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a [`ValueError`].
    pub fn validate(&self, candidate: &Self) -> Result<(), ValueError> {
        match (self, candidate) {
            (
                Self::Enum {
                    options,
                    selected_idx: _,
                },
                Self::Enum {
                    options: other_options,
                    selected_idx,
                },
            ) => {
                if options.len() != other_options.len()
                    || options.iter().zip(other_options).any(|(a, b)| a != b)
                {
                    return Err(ValueError::LabelsChanged);
                }
                if *selected_idx >= options.len() {
                    return Err(ValueError::SelectedOutOfBounds {
                        selected: *selected_idx,
                        len: options.len(),
                    });
                }
                Ok(())
            }
            (Self::Boolean { .. }, Self::Boolean { .. }) => Ok(()),
            (
                Self::Number {
                    step,
                    lower,
                    upper,
                    zero_is_infinity,
                    suffix,
                    ..
                },
                Self::Number {
                    value: new_value,
                    step: new_step,
                    lower: new_lower,
                    upper: new_upper,
                    zero_is_infinity: new_zii,
                    suffix: new_suffix,
                },
            ) => {
                if (new_step - step).abs() >= EPSILON {
                    return Err(ValueError::ConstraintChanged { field: "step" });
                }
                if new_lower != lower {
                    return Err(ValueError::ConstraintChanged { field: "lower-bound" });
                }
                if new_upper != upper {
                    return Err(ValueError::ConstraintChanged { field: "upper-bound" });
                }
                if new_zii != zero_is_infinity {
                    return Err(ValueError::ConstraintChanged {
                        field: "zero-is-infinity",
                    });
                }
                if new_suffix != suffix {
                    return Err(ValueError::ConstraintChanged { field: "suffix" });
                }
                if *new_value > *upper || *new_value < *lower {
                    return Err(ValueError::OutOfRange {
                        value: *new_value,
                        lower: *lower,
                        upper: *upper,
                    });
                }
                // The candidate's step equals ours within epsilon, so the
                // multiple check uses the declared step. `value % step` can
                // land near 0 or near step for a valid multiple; both ends
                // are within epsilon.
                let delta = (step - ((new_value - lower) % step)).abs();
                if delta >= EPSILON && delta <= step - EPSILON {
                    return Err(ValueError::OffStep {
                        value: *new_value,
                        step: *step,
                    });
                }
                Ok(())
            }
            _ => Err(ValueError::KindMismatch {
                expected: self.kind(),
                got: candidate.kind(),
            }),
        }
    }

    /// Structural equality with epsilon tolerance on numbers.
    ///
    /// This is the comparison the reconciler uses when diffing a proposed
    /// set against the live set: values that compare equal produce no
    /// wire traffic.
    pub fn compare(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Enum {
                    options,
                    selected_idx,
                },
                Self::Enum {
                    options: other_options,
                    selected_idx: other_idx,
                },
            ) => selected_idx == other_idx && options == other_options,
            (Self::Boolean { enabled }, Self::Boolean { enabled: other }) => enabled == other,
            (
                Self::Number {
                    value,
                    step,
                    lower,
                    upper,
                    zero_is_infinity,
                    suffix,
                },
                Self::Number {
                    value: other_value,
                    step: other_step,
                    lower: other_lower,
                    upper: other_upper,
                    zero_is_infinity: other_zii,
                    suffix: other_suffix,
                },
            ) => {
                (value - other_value).abs() < EPSILON
                    && step == other_step
                    && lower == other_lower
                    && upper == other_upper
                    && zero_is_infinity == other_zii
                    && suffix == other_suffix
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// GameOption
// ---------------------------------------------------------------------------

/// A named, categorized, priority-ordered option.
///
/// Identity rules matter here and are easy to get wrong:
///
/// - **Transport identity is `key` alone.** Keys must be unique within a
///   live set; two options with the same key in different categories will
///   fight over one slot and oscillate.
/// - **Cache identity is `(category, key)`.** The same key name in two
///   categories is a distinct remembered value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOption {
    pub category: String,
    pub key: String,
    value: OptionValue,
    pub priority: u16,
}

impl GameOption {
    pub fn new(
        category: impl Into<String>,
        key: impl Into<String>,
        value: OptionValue,
        priority: u16,
    ) -> Self {
        Self {
            category: category.into(),
            key: key.into(),
            value,
            priority,
        }
    }

    /// The current value.
    pub fn value(&self) -> &OptionValue {
        &self.value
    }

    /// Replaces the value, optionally running full validation.
    ///
    /// A kind mismatch is always rejected. With `validate` set, the
    /// candidate must also pass [`OptionValue::validate`] against the
    /// current value — this is the path client-originated updates take.
    ///
    /// # Errors
    ///
    /// Returns the violated rule; the stored value is unchanged.
    pub fn set_value(&mut self, value: OptionValue, validate: bool) -> Result<(), ValueError> {
        if value.kind() != self.value.kind() {
            return Err(ValueError::KindMismatch {
                expected: self.value.kind(),
                got: value.kind(),
            });
        }
        if validate {
            self.value.validate(&value)?;
        }
        self.value = value;
        Ok(())
    }

    /// Value equality with another option, epsilon-tolerant on numbers.
    ///
    /// Category and priority are presentation metadata and do not
    /// participate; two options with the same key and `compare()`-equal
    /// values produce no diff.
    pub fn compare(&self, other: &Self) -> bool {
        self.value.compare(&other.value)
    }
}

impl fmt::Display for GameOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}/{}", self.category, self.key)
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
