//! The value cache: last accepted value per option identity.
//!
//! Options are destroyed and recreated wholesale on every mode switch,
//! but the user's choices should survive. The cache remembers the last
//! validated value for every `(category, key)` identity ever seen in the
//! room, so a re-appearing option is restored instead of reset to its
//! provider default.

use std::collections::HashMap;

use lobbysync_protocol::{GameOption, OptionValue};

/// Session-lifetime store of last-accepted values keyed by
/// `(category, key)`.
///
/// Entries are created the first time an identity is seen, updated on
/// every accepted change, and never deleted — bounded by the set of
/// identities ever declared, which is fine for short-lived rooms.
///
/// Note the key: the same key name in two categories is two distinct
/// cached values, even though the two options would collide in the live
/// set (whose identity is the key alone).
#[derive(Debug, Clone, Default)]
pub struct ValueCache {
    values: HashMap<(String, String), OptionValue>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for an option's identity, if any.
    pub fn get(&self, option: &GameOption) -> Option<&OptionValue> {
        self.values
            .get(&(option.category.clone(), option.key.clone()))
    }

    /// Records `value` as the last accepted value for `option`'s identity.
    pub fn store(&mut self, option: &GameOption, value: OptionValue) {
        self.values
            .insert((option.category.clone(), option.key.clone()), value);
    }

    /// Seeds the identity with the option's current value if no entry
    /// exists yet. Returns `true` if a new entry was created.
    pub fn seed(&mut self, option: &GameOption) -> bool {
        let key = (option.category.clone(), option.key.clone());
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, option.value().clone());
        true
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serializable view of every entry, keyed `"category.key"`.
    ///
    /// This is the load/save surface for an external preferences store;
    /// the value shape is the serde form of [`OptionValue`].
    pub fn snapshot(&self) -> HashMap<String, OptionValue> {
        self.values
            .iter()
            .map(|((category, key), value)| (format!("{category}.{key}"), value.clone()))
            .collect()
    }

    /// Restores entries from a [`snapshot`](Self::snapshot) map.
    ///
    /// Paths without a `.` separator are skipped. Existing entries are
    /// overwritten, so restore before the first reconciliation if the
    /// stored preferences should win.
    pub fn restore(&mut self, entries: impl IntoIterator<Item = (String, OptionValue)>) {
        for (path, value) in entries {
            let Some((category, key)) = path.split_once('.') else {
                continue;
            };
            self.values
                .insert((category.to_owned(), key.to_owned()), value);
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lobbysync_protocol::{category, priority};

    fn voting_time(value: f32) -> GameOption {
        GameOption::new(
            category::MEETINGS,
            "Voting Time",
            OptionValue::number(value, 30.0, 0.0, 300.0, true, "{0}s"),
            priority::B + 3,
        )
    }

    #[test]
    fn test_seed_only_creates_once() {
        let mut cache = ValueCache::new();
        assert!(cache.seed(&voting_time(150.0)));
        assert!(!cache.seed(&voting_time(90.0)));
        assert!(cache.get(&voting_time(0.0)).unwrap().is_roughly(150.0));
    }

    #[test]
    fn test_store_overwrites() {
        let mut cache = ValueCache::new();
        let option = voting_time(150.0);
        cache.seed(&option);
        cache.store(&option, OptionValue::number(90.0, 30.0, 0.0, 300.0, true, "{0}s"));
        assert!(cache.get(&option).unwrap().is_roughly(90.0));
    }

    #[test]
    fn test_same_key_different_category_is_distinct() {
        let mut cache = ValueCache::new();
        let meetings = GameOption::new(
            category::MEETINGS,
            "Cooldown",
            OptionValue::number(20.0, 5.0, 0.0, 60.0, false, "{0}s"),
            priority::B,
        );
        let config = GameOption::new(
            category::CONFIG,
            "Cooldown",
            OptionValue::number(30.0, 5.0, 0.0, 60.0, false, "{0}s"),
            priority::F,
        );
        cache.seed(&meetings);
        cache.seed(&config);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&meetings).unwrap().is_roughly(20.0));
        assert!(cache.get(&config).unwrap().is_roughly(30.0));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut cache = ValueCache::new();
        cache.seed(&voting_time(150.0));

        let snapshot = cache.snapshot();
        assert!(snapshot.contains_key("Meeting Settings.Voting Time"));

        let mut restored = ValueCache::new();
        restored.restore(snapshot);
        assert!(restored.get(&voting_time(0.0)).unwrap().is_roughly(150.0));
    }

    #[test]
    fn test_restore_skips_malformed_paths() {
        let mut cache = ValueCache::new();
        cache.restore([("no-separator".to_owned(), OptionValue::boolean(true))]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_snapshot_survives_json() {
        let mut cache = ValueCache::new();
        cache.seed(&voting_time(150.0));

        let json = serde_json::to_string(&cache.snapshot()).unwrap();
        let entries: HashMap<String, OptionValue> = serde_json::from_str(&json).unwrap();

        let mut restored = ValueCache::new();
        restored.restore(entries);
        assert!(restored.get(&voting_time(0.0)).unwrap().is_roughly(150.0));
    }
}
