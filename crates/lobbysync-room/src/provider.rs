//! Option providers — the extension point for game modes and roles.
//!
//! The room never decides which options exist; providers do. The active
//! mode declares the base set, and every role it registered can add
//! options on top, conditioned on the current live set (a role typically
//! exposes its settings only while its probability option is nonzero).
//! The reconciler queries all providers each pass and converges the live
//! set on the result.

use lobbysync_protocol::{GameOption, OptionValue};
use serde::{Deserialize, Serialize};

use crate::OptionSet;

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Static description of a game mode, attached at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeMetadata {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
}

/// Which side a role plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleAlignment {
    Crewmate,
    Neutral,
    Impostor,
}

/// Static description of a role, attached at registration time.
///
/// Plain immutable data — there is no reflection or runtime discovery;
/// whoever constructs the role states what it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleMetadata {
    pub name: String,
    pub alignment: RoleAlignment,
    pub objective: String,
    /// RGBA theme color used by the client HUD.
    pub theme_color: [u8; 4],
}

// ---------------------------------------------------------------------------
// Provider traits
// ---------------------------------------------------------------------------

/// The active game mode's option provider.
///
/// `options` returns the mode's full base option map each call. A stock
/// mode starts from [`default_options`](crate::default_options) and
/// adds or removes entries; the reconciler treats the result as the
/// authoritative base that role options are layered onto.
pub trait ModeProvider: Send + 'static {
    fn metadata(&self) -> &ModeMetadata;

    fn options(&self) -> Vec<GameOption>;
}

/// One option declared by a role provider.
///
/// Roles declare only a key and a value; the reconciler assigns the
/// category and a deterministic priority based on provider order, so a
/// role cannot accidentally collide with another provider's priority
/// band.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleOption {
    pub key: String,
    pub value: OptionValue,
}

impl RoleOption {
    pub fn new(key: impl Into<String>, value: OptionValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// A registered role's option provider.
///
/// `options` is a pure function of the current live set, called once per
/// reconciliation pass. Because a role may condition on options that the
/// pass itself creates or removes, the reconciler re-queries providers
/// until the output stabilizes.
pub trait RoleProvider: Send + 'static {
    fn metadata(&self) -> &RoleMetadata;

    fn options(&self, live: &OptionSet) -> Vec<RoleOption>;
}
