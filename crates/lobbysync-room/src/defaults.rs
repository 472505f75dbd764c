//! The stock option table shared by game modes.
//!
//! Modes usually start from this set and adjust it; the vanilla mode uses
//! it unchanged. Keys, bounds, steps and suffixes match the settings
//! screen the client already renders.

use lobbysync_protocol::{category, priority, GameOption, OptionValue};

/// Well-known keys in the default table.
pub mod option_name {
    pub const MAP: &str = "Map";
    pub const IMPOSTOR_COUNT: &str = "Impostor Count";
    pub const MAX_PLAYER_COUNT: &str = "Max Player Count";
    pub const PLAYER_SPEED: &str = "Player Speed";
    pub const ANONYMOUS_VOTES: &str = "Anonymous Votes";
    pub const CONFIRM_EJECTS: &str = "Confirm Ejects";
    pub const DISCUSSION_TIME: &str = "Discussion Time";
    pub const VOTING_TIME: &str = "Voting Time";
    pub const EMERGENCY_COOLDOWN: &str = "Emergency Cooldown";
    pub const EMERGENCY_MEETINGS: &str = "Emergency Meetings";
    pub const VISUAL_TASKS: &str = "Visual Tasks";
    pub const TASK_BAR_UPDATES: &str = "Task Bar Updates";
    pub const COMMON_TASKS: &str = "Common Tasks";
    pub const LONG_TASKS: &str = "Long Tasks";
    pub const SHORT_TASKS: &str = "Short Tasks";
    pub const CREWMATE_VISION: &str = "Crewmate Vision";
    pub const IMPOSTOR_VISION: &str = "Impostor Vision";
    pub const IMPOSTOR_KILL_COOLDOWN: &str = "Impostor Kill Cooldown";
    pub const IMPOSTOR_KILL_DISTANCE: &str = "Impostor Kill Distance";
}

/// The default option table.
pub fn default_options() -> Vec<GameOption> {
    use option_name::*;
    use priority::{A, B, C, D};

    vec![
        GameOption::new(
            category::NONE,
            MAP,
            OptionValue::enumeration(["The Skeld", "Polus", "Mira HQ", "Airship"], 0),
            A,
        ),
        GameOption::new(
            category::NONE,
            IMPOSTOR_COUNT,
            OptionValue::number(2.0, 1.0, 1.0, 3.0, false, "{0} Impostors"),
            A + 1,
        ),
        GameOption::new(
            category::NONE,
            MAX_PLAYER_COUNT,
            OptionValue::number(15.0, 1.0, 4.0, 15.0, false, "{0} Players"),
            A + 2,
        ),
        GameOption::new(
            category::NONE,
            PLAYER_SPEED,
            OptionValue::number(1.25, 0.25, 0.25, 3.0, false, "{0}x"),
            A + 3,
        ),
        GameOption::new(
            category::MEETINGS,
            ANONYMOUS_VOTES,
            OptionValue::boolean(false),
            B,
        ),
        GameOption::new(
            category::MEETINGS,
            CONFIRM_EJECTS,
            OptionValue::boolean(false),
            B + 1,
        ),
        GameOption::new(
            category::MEETINGS,
            DISCUSSION_TIME,
            OptionValue::number(15.0, 15.0, 0.0, 300.0, false, "{0}s"),
            B + 2,
        ),
        GameOption::new(
            category::MEETINGS,
            VOTING_TIME,
            OptionValue::number(150.0, 30.0, 0.0, 300.0, true, "{0}s"),
            B + 3,
        ),
        GameOption::new(
            category::MEETINGS,
            EMERGENCY_COOLDOWN,
            OptionValue::number(20.0, 5.0, 0.0, 60.0, false, "{0}s"),
            B + 4,
        ),
        GameOption::new(
            category::MEETINGS,
            EMERGENCY_MEETINGS,
            OptionValue::number(1.0, 1.0, 0.0, 9.0, false, "{0} Buttons"),
            B + 5,
        ),
        GameOption::new(
            category::TASKS,
            VISUAL_TASKS,
            OptionValue::boolean(false),
            C,
        ),
        GameOption::new(
            category::TASKS,
            TASK_BAR_UPDATES,
            OptionValue::enumeration(["Always", "Meetings", "Never"], 0),
            C + 1,
        ),
        GameOption::new(
            category::TASKS,
            COMMON_TASKS,
            OptionValue::number(1.0, 1.0, 0.0, 2.0, false, "{0} tasks"),
            C + 2,
        ),
        GameOption::new(
            category::TASKS,
            LONG_TASKS,
            OptionValue::number(2.0, 1.0, 0.0, 3.0, false, "{0} tasks"),
            C + 3,
        ),
        GameOption::new(
            category::TASKS,
            SHORT_TASKS,
            OptionValue::number(3.0, 1.0, 0.0, 5.0, false, "{0} tasks"),
            C + 4,
        ),
        GameOption::new(
            category::ROLES,
            CREWMATE_VISION,
            OptionValue::number(0.75, 0.25, 0.25, 3.0, false, "{0}x"),
            D,
        ),
        GameOption::new(
            category::ROLES,
            IMPOSTOR_VISION,
            OptionValue::number(0.75, 0.25, 0.25, 3.0, false, "{0}x"),
            D + 1,
        ),
        GameOption::new(
            category::ROLES,
            IMPOSTOR_KILL_COOLDOWN,
            OptionValue::number(30.0, 2.5, 5.0, 60.0, false, "{0}s"),
            D + 2,
        ),
        GameOption::new(
            category::ROLES,
            IMPOSTOR_KILL_DISTANCE,
            OptionValue::enumeration(["Short", "Medium", "Long"], 1),
            D + 3,
        ),
    ]
}
