//! The live option set: an insertion-ordered map from key to option.

use indexmap::IndexMap;
use lobbysync_protocol::GameOption;

/// The option selector key that is never auto-deleted by a diff.
///
/// Switching this option is what replaces every other option in the set;
/// if the diff could delete it, a mode that forgets to re-declare it would
/// strand the room with no way to switch back.
pub const MODE_SELECTOR_KEY: &str = "Gamemode";

/// An ordered mapping from option key to [`GameOption`], no duplicate keys.
///
/// Represents either the live state known to the room or a proposed state
/// computed from providers. Iteration follows insertion order;
/// [`iter_by_priority`](Self::iter_by_priority) gives the display/broadcast
/// order (priority ascending, ties by insertion order).
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: IndexMap<String, GameOption>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an option under its key.
    pub fn insert(&mut self, option: GameOption) -> Option<GameOption> {
        self.options.insert(option.key.clone(), option)
    }

    /// Removes an option, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<GameOption> {
        self.options.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&GameOption> {
        self.options.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut GameOption> {
        self.options.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GameOption> {
        self.options.values()
    }

    /// Iterates mutably in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GameOption> {
        self.options.values_mut()
    }

    /// Iterates in display order: priority ascending, insertion order for
    /// ties.
    pub fn iter_by_priority(&self) -> impl Iterator<Item = &GameOption> {
        let mut options: Vec<&GameOption> = self.options.values().collect();
        options.sort_by_key(|o| o.priority);
        options.into_iter()
    }

    /// Computes the operations transforming this set into `proposed`.
    ///
    /// - A `Delete` for every key here that `proposed` lacks, except the
    ///   protected [`MODE_SELECTOR_KEY`].
    /// - A `Set` for every proposed option missing here or whose value is
    ///   not `compare()`-equal to ours.
    ///
    /// Application is idempotent per key, so the relative order of deletes
    /// and sets for distinct keys does not matter.
    pub fn diff(&self, proposed: &OptionSet) -> Vec<DiffOp> {
        let mut ops = Vec::new();

        for option in self.iter() {
            if option.key == MODE_SELECTOR_KEY {
                continue;
            }
            if !proposed.contains_key(&option.key) {
                ops.push(DiffOp::Delete(option.key.clone()));
            }
        }

        for option in proposed.iter() {
            if let Some(existing) = self.get(&option.key) {
                if existing.compare(option) {
                    continue;
                }
            }
            ops.push(DiffOp::Set(option.clone()));
        }

        ops
    }

    /// Applies one diff operation.
    pub fn apply(&mut self, op: &DiffOp) {
        match op {
            DiffOp::Set(option) => {
                self.insert(option.clone());
            }
            DiffOp::Delete(key) => {
                self.remove(key);
            }
        }
    }
}

impl FromIterator<GameOption> for OptionSet {
    fn from_iter<I: IntoIterator<Item = GameOption>>(iter: I) -> Self {
        let mut set = Self::new();
        for option in iter {
            set.insert(option);
        }
        set
    }
}

/// One operation in a diff between two option sets.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    /// Create or update the option under its key.
    Set(GameOption),
    /// Remove the option with this key.
    Delete(String),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use lobbysync_protocol::{category, priority, OptionValue};

    fn opt(key: &str, enabled: bool, priority: u16) -> GameOption {
        GameOption::new(category::NONE, key, OptionValue::boolean(enabled), priority)
    }

    fn apply_all(set: &mut OptionSet, ops: &[DiffOp]) {
        for op in ops {
            set.apply(op);
        }
    }

    fn sets_equal(a: &OptionSet, b: &OptionSet) -> bool {
        a.len() == b.len()
            && a.iter()
                .all(|o| b.get(&o.key).is_some_and(|other| o.compare(other)))
    }

    #[test]
    fn test_insert_replaces_by_key() {
        let mut set = OptionSet::new();
        set.insert(opt("Confirm Ejects", false, priority::B));
        set.insert(opt("Confirm Ejects", true, priority::B));
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("Confirm Ejects").unwrap().value().as_bool(),
            Some(true)
        );
    }

    #[test]
    fn test_iter_by_priority_sorts_with_stable_ties() {
        let mut set = OptionSet::new();
        set.insert(opt("c", true, 300));
        set.insert(opt("a1", true, 100));
        set.insert(opt("a2", true, 100));
        set.insert(opt("b", true, 200));

        let keys: Vec<&str> = set.iter_by_priority().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn test_diff_emits_set_for_new_and_changed() {
        let live: OptionSet = [opt("a", false, 100)].into_iter().collect();
        let proposed: OptionSet = [opt("a", true, 100), opt("b", false, 200)]
            .into_iter()
            .collect();

        let ops = live.diff(&proposed);
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| matches!(op, DiffOp::Set(_))));
    }

    #[test]
    fn test_diff_emits_delete_for_vanished_keys() {
        let live: OptionSet = [opt("a", false, 100), opt("b", false, 200)]
            .into_iter()
            .collect();
        let proposed: OptionSet = [opt("a", false, 100)].into_iter().collect();

        let ops = live.diff(&proposed);
        assert_eq!(ops, vec![DiffOp::Delete("b".into())]);
    }

    #[test]
    fn test_diff_never_deletes_mode_selector() {
        let live: OptionSet = [
            GameOption::new(
                category::NONE,
                MODE_SELECTOR_KEY,
                OptionValue::enumeration(["Vanilla", "Town of Polus"], 0),
                priority::A,
            ),
            opt("b", false, 200),
        ]
        .into_iter()
        .collect();
        let proposed = OptionSet::new();

        let ops = live.diff(&proposed);
        assert_eq!(ops, vec![DiffOp::Delete("b".into())]);
    }

    #[test]
    fn test_diff_of_equal_sets_is_empty() {
        let live: OptionSet = [opt("a", true, 100), opt("b", false, 200)]
            .into_iter()
            .collect();
        assert!(live.diff(&live.clone()).is_empty());
    }

    #[test]
    fn test_epsilon_equal_numbers_produce_no_diff() {
        let number = |v: f32| {
            GameOption::new(
                category::NONE,
                "Player Speed",
                OptionValue::number(v, 0.25, 0.25, 3.0, false, "{0}x"),
                priority::A + 3,
            )
        };
        let live: OptionSet = [number(1.25)].into_iter().collect();
        let proposed: OptionSet = [number(1.250_000_1)].into_iter().collect();
        assert!(live.diff(&proposed).is_empty());
    }

    #[test]
    fn test_applying_diff_converges_live_to_proposed() {
        let mut live: OptionSet = [opt("a", false, 100), opt("dead", true, 900)]
            .into_iter()
            .collect();
        let proposed: OptionSet = [opt("a", true, 100), opt("new", false, 300)]
            .into_iter()
            .collect();

        let ops = live.diff(&proposed);
        apply_all(&mut live, &ops);
        assert!(sets_equal(&live, &proposed));
    }

    #[test]
    fn test_applying_same_diff_twice_is_idempotent() {
        let mut live: OptionSet = [opt("a", false, 100)].into_iter().collect();
        let proposed: OptionSet = [opt("a", true, 100), opt("b", true, 200)]
            .into_iter()
            .collect();

        let ops = live.diff(&proposed);
        apply_all(&mut live, &ops);
        let once = live.clone();
        apply_all(&mut live, &ops);
        assert!(sets_equal(&live, &once));
    }

    #[test]
    fn test_diff_application_is_order_independent() {
        let mut forward: OptionSet = [opt("a", false, 100), opt("dead", true, 900)]
            .into_iter()
            .collect();
        let mut backward = forward.clone();
        let proposed: OptionSet = [opt("a", true, 100), opt("new", false, 300)]
            .into_iter()
            .collect();

        let ops = forward.diff(&proposed);
        let mut reversed = ops.clone();
        reversed.reverse();

        apply_all(&mut forward, &ops);
        apply_all(&mut backward, &reversed);
        assert!(sets_equal(&forward, &proposed));
        assert!(sets_equal(&backward, &proposed));
    }
}
