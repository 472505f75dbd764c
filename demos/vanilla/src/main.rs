//! A small room driving the vanilla mode plus two crewmate roles.
//!
//! Two simulated connections join, one flips a setting and raises the
//! Sheriff probability, and the room is switched to a stripped-down mode
//! and back to show the value cache restoring user choices.

use lobbysync_protocol::{category, ConnectionId, GameOption, OptionValue, RoomId, WireMessage};
use lobbysync_room::{
    default_options, option_name, spawn_room, ModeMetadata, ModeProvider, OptionSet,
    RoleAlignment, RoleMetadata, RoleOption, RoleProvider, RoomHandle,
};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

struct VanillaMode {
    metadata: ModeMetadata,
}

impl VanillaMode {
    fn new() -> Box<Self> {
        Box::new(Self {
            metadata: ModeMetadata {
                id: "vanilla".into(),
                name: "Vanilla".into(),
                version: "1.0.0".into(),
                description: "The stock rule set".into(),
                author: "lobbysync".into(),
            },
        })
    }
}

impl ModeProvider for VanillaMode {
    fn metadata(&self) -> &ModeMetadata {
        &self.metadata
    }

    fn options(&self) -> Vec<GameOption> {
        default_options()
    }
}

/// A cut-down mode used to show options being destroyed and restored.
struct HideAndSeekMode {
    metadata: ModeMetadata,
}

impl HideAndSeekMode {
    fn new() -> Box<Self> {
        Box::new(Self {
            metadata: ModeMetadata {
                id: "hide-and-seek".into(),
                name: "Hide and Seek".into(),
                version: "0.1.0".into(),
                description: "No meetings, one seeker".into(),
                author: "lobbysync".into(),
            },
        })
    }
}

impl ModeProvider for HideAndSeekMode {
    fn metadata(&self) -> &ModeMetadata {
        &self.metadata
    }

    fn options(&self) -> Vec<GameOption> {
        default_options()
            .into_iter()
            .filter(|o| o.category != category::MEETINGS)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A role whose settings appear only while its probability is above zero.
struct ProbabilityRole {
    metadata: RoleMetadata,
    probability_key: String,
    settings: Vec<RoleOption>,
}

impl ProbabilityRole {
    fn sheriff() -> Box<Self> {
        Box::new(Self {
            metadata: RoleMetadata {
                name: "Sheriff".into(),
                alignment: RoleAlignment::Crewmate,
                objective: "Shoot the impostors before they get you".into(),
                theme_color: [196, 150, 51, 255],
            },
            probability_key: "Sheriff Probability".into(),
            settings: vec![RoleOption::new(
                "Sheriff Shoot Cooldown",
                OptionValue::number(30.0, 2.5, 5.0, 60.0, false, "{0}s"),
            )],
        })
    }

    fn engineer() -> Box<Self> {
        Box::new(Self {
            metadata: RoleMetadata {
                name: "Engineer".into(),
                alignment: RoleAlignment::Crewmate,
                objective: "Fix sabotages from anywhere".into(),
                theme_color: [251, 123, 5, 255],
            },
            probability_key: "Engineer Probability".into(),
            settings: vec![RoleOption::new(
                "Engineer Vent Uses",
                OptionValue::number(1.0, 1.0, 0.0, 5.0, true, "{0} uses"),
            )],
        })
    }
}

impl RoleProvider for ProbabilityRole {
    fn metadata(&self) -> &RoleMetadata {
        &self.metadata
    }

    fn options(&self, live: &OptionSet) -> Vec<RoleOption> {
        // The probability slider itself is always declared; the rest of
        // the settings unlock once it is above zero.
        let mut declared = vec![RoleOption::new(
            self.probability_key.clone(),
            OptionValue::number(0.0, 10.0, 0.0, 100.0, false, "{0}%"),
        )];
        let unlocked = live
            .get(&self.probability_key)
            .and_then(|o| o.value().as_number())
            .is_some_and(|v| v > 0.0);
        if unlocked {
            declared.extend(self.settings.iter().cloned());
        }
        declared
    }
}

// ---------------------------------------------------------------------------
// Simulated connections
// ---------------------------------------------------------------------------

/// Spawns a task that logs every batch the room sends this connection.
async fn attach_client(room: &RoomHandle, conn: ConnectionId) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<WireMessage>>();
    if let Err(err) = room.connect(conn, tx).await {
        tracing::error!(%conn, %err, "connect failed");
        return;
    }
    tokio::spawn(async move {
        while let Some(batch) = rx.recv().await {
            for message in &batch {
                tracing::info!(%conn, %message, "received");
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let room = spawn_room(RoomId(1));
    room.set_mode(
        VanillaMode::new(),
        vec![ProbabilityRole::sheriff(), ProbabilityRole::engineer()],
    )
    .await?;

    let host = ConnectionId(1);
    let guest = ConnectionId(2);
    attach_client(&room, host).await;
    attach_client(&room, guest).await;

    // The host flips a meeting setting; the guest gets the echo.
    let confirm = WireMessage::Set {
        seq_id: 0,
        option: GameOption::new(
            category::MEETINGS,
            option_name::CONFIRM_EJECTS,
            OptionValue::boolean(true),
            0,
        ),
    };
    room.deliver(host, confirm.encode()).await?;

    // Raising the probability unlocks the Sheriff's settings for everyone.
    let sheriff = WireMessage::Set {
        seq_id: 0,
        option: GameOption::new(
            category::CONFIG,
            "Sheriff Probability",
            OptionValue::number(50.0, 10.0, 0.0, 100.0, false, "{0}%"),
            0,
        ),
    };
    room.deliver(host, sheriff.encode()).await?;

    // Switching modes destroys the meeting options and later restores the
    // host's choices from the cache.
    room.set_mode(
        HideAndSeekMode::new(),
        vec![ProbabilityRole::sheriff(), ProbabilityRole::engineer()],
    )
    .await?;
    room.set_mode(
        VanillaMode::new(),
        vec![ProbabilityRole::sheriff(), ProbabilityRole::engineer()],
    )
    .await?;

    for option in room.options().await? {
        tracing::info!(option = %option, value = ?option.value(), "live");
    }

    room.shutdown().await?;
    Ok(())
}
