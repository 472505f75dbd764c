//! The reconciler: converges the live option set on what providers say
//! should exist.
//!
//! One pass asks the mode for its base options, layers every role's
//! options on top, restores cached user choices, and diffs the result
//! against the live set. Because role providers read the live set, a pass
//! that changes an option can change what the next pass proposes — so the
//! reconciler loops until a pass produces an empty diff, bounded by
//! [`MAX_PASSES`].

use lobbysync_protocol::{category, priority, GameOption, OptionValue};

use crate::{DiffOp, ModeProvider, OptionSet, OptionsError, RoleProvider, ValueCache};

/// Hard cap on reconciliation passes per trigger.
///
/// Convergence is not guaranteed by construction — two providers can
/// fight over one key forever. Hitting the cap is an authoring defect,
/// logged and survived.
pub const MAX_PASSES: usize = 5;

/// Priority distance between consecutive role providers' option blocks.
const PROVIDER_PRIORITY_STRIDE: u16 = 100;

/// Result of one reconciliation trigger.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Every applied operation, in production order across passes.
    pub ops: Vec<DiffOp>,
    /// Number of passes that produced (and applied) a non-empty diff.
    pub passes: usize,
    /// `false` if the loop hit [`MAX_PASSES`] before reaching a fixpoint.
    pub converged: bool,
}

/// Owns the live option set and the value cache, and knows how to drive
/// them toward the providers' fixpoint.
///
/// The reconciler holds no channels and does no I/O; the room actor runs
/// it and hands the resulting operations to the synchronizer.
#[derive(Debug, Default)]
pub struct Reconciler {
    live: OptionSet,
    cache: ValueCache,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live option set.
    pub fn live(&self) -> &OptionSet {
        &self.live
    }

    /// The value cache.
    pub fn cache(&self) -> &ValueCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ValueCache {
        &mut self.cache
    }

    /// Runs reconciliation passes until the live set is a fixpoint of the
    /// providers, or [`MAX_PASSES`] non-empty diffs have been applied.
    ///
    /// Each pass's diff is applied to the live set before the next pass
    /// is computed. On cap exhaustion the last diff stays applied and a
    /// warning is logged; the room keeps operating on the partial state.
    pub fn run(&mut self, mode: &dyn ModeProvider, roles: &[Box<dyn RoleProvider>]) -> ReconcileOutcome {
        let mut ops = Vec::new();
        let mut passes = 0;

        loop {
            let proposed = self.propose(mode, roles);
            let diff = self.live.diff(&proposed);

            if diff.is_empty() {
                return ReconcileOutcome {
                    ops,
                    passes,
                    converged: true,
                };
            }

            for op in &diff {
                self.live.apply(op);
            }
            ops.extend(diff);
            passes += 1;

            if passes >= MAX_PASSES {
                tracing::warn!(
                    passes,
                    "option reconciliation did not converge; two options with the \
                     same key in different categories are likely fighting over one \
                     slot, aborting"
                );
                return ReconcileOutcome {
                    ops,
                    passes,
                    converged: false,
                };
            }
        }
    }

    /// Computes the proposed option set for one pass.
    ///
    /// Role options land in the generated category with priorities offset
    /// by provider order, so output is stable no matter what the roles
    /// declare. Cached values overwrite declared defaults where the shape
    /// still matches; a shape mismatch means the provider re-declared an
    /// identity with different immutable fields, in which case the newly
    /// declared value wins and the cache is re-seeded.
    fn propose(&mut self, mode: &dyn ModeProvider, roles: &[Box<dyn RoleProvider>]) -> OptionSet {
        let mut proposed: OptionSet = mode.options().into_iter().collect();

        for (i, role) in roles.iter().enumerate() {
            let base = priority::GENERATED + i as u16 * PROVIDER_PRIORITY_STRIDE;
            for (j, declared) in role.options(&self.live).into_iter().enumerate() {
                proposed.insert(GameOption::new(
                    category::CONFIG,
                    declared.key,
                    declared.value,
                    base + j as u16,
                ));
            }
        }

        for option in proposed.iter_mut() {
            match self.cache.get(option).cloned() {
                Some(cached) => {
                    if let Err(err) = option.set_value(cached, true) {
                        tracing::warn!(
                            option = %option,
                            %err,
                            "provider re-declared option with a different shape, \
                             dropping cached value"
                        );
                        self.cache.store(option, option.value().clone());
                    }
                }
                None => {
                    self.cache.seed(option);
                }
            }
        }

        proposed
    }

    /// Applies a validated client update to the live set and the cache.
    ///
    /// # Errors
    ///
    /// [`OptionsError::UnknownOption`] if the key is not live (a stale
    /// client), [`OptionsError::InvalidValue`] if validation rejects the
    /// candidate; in both cases nothing is mutated.
    pub fn apply_update(
        &mut self,
        key: &str,
        value: OptionValue,
    ) -> Result<GameOption, OptionsError> {
        let option = self
            .live
            .get_mut(key)
            .ok_or_else(|| OptionsError::UnknownOption(key.to_owned()))?;

        option
            .set_value(value, true)
            .map_err(|source| OptionsError::InvalidValue {
                key: key.to_owned(),
                source,
            })?;

        let accepted = option.clone();
        self.cache.store(&accepted, accepted.value().clone());
        Ok(accepted)
    }

    /// Removes an option from the live set, if present.
    ///
    /// The cache entry survives — deletion removes the option, not the
    /// remembered preference.
    pub fn apply_delete(&mut self, key: &str) -> Option<GameOption> {
        self.live.remove(key)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ModeMetadata, RoleAlignment, RoleMetadata, RoleOption};
    use lobbysync_protocol::ValueError;

    // =====================================================================
    // Mock providers
    // =====================================================================

    fn mode_metadata(name: &str) -> ModeMetadata {
        ModeMetadata {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_owned(),
            version: "1.0.0".into(),
            description: String::new(),
            author: "tests".into(),
        }
    }

    fn role_metadata(name: &str) -> RoleMetadata {
        RoleMetadata {
            name: name.to_owned(),
            alignment: RoleAlignment::Crewmate,
            objective: String::new(),
            theme_color: [255, 255, 255, 255],
        }
    }

    /// A mode declaring a fixed option list.
    struct FixedMode {
        metadata: ModeMetadata,
        options: Vec<GameOption>,
    }

    impl FixedMode {
        fn new(name: &str, options: Vec<GameOption>) -> Self {
            Self {
                metadata: mode_metadata(name),
                options,
            }
        }
    }

    impl ModeProvider for FixedMode {
        fn metadata(&self) -> &ModeMetadata {
            &self.metadata
        }

        fn options(&self) -> Vec<GameOption> {
            self.options.clone()
        }
    }

    /// A role exposing extra options while its probability is nonzero.
    struct GatedRole {
        metadata: RoleMetadata,
        gate_key: String,
        extra: Vec<RoleOption>,
    }

    impl RoleProvider for GatedRole {
        fn metadata(&self) -> &RoleMetadata {
            &self.metadata
        }

        fn options(&self, live: &OptionSet) -> Vec<RoleOption> {
            let unlocked = live
                .get(&self.gate_key)
                .and_then(|o| o.value().as_number())
                .is_some_and(|v| v > 0.0);
            if unlocked { self.extra.clone() } else { Vec::new() }
        }
    }

    fn number(key: &str, value: f32, priority: u16) -> GameOption {
        GameOption::new(
            category::NONE,
            key,
            OptionValue::number(value, 1.0, 0.0, 10.0, false, ""),
            priority,
        )
    }

    // =====================================================================
    // Convergence
    // =====================================================================

    #[test]
    fn test_single_pass_converges_on_static_mode() {
        let mode = FixedMode::new("Vanilla", vec![number("Impostor Count", 2.0, 100)]);
        let mut reconciler = Reconciler::new();

        let outcome = reconciler.run(&mode, &[]);
        assert!(outcome.converged);
        assert_eq!(outcome.passes, 1);
        assert_eq!(reconciler.live().len(), 1);

        // Re-running against an unchanged mode is a no-op.
        let outcome = reconciler.run(&mode, &[]);
        assert!(outcome.converged);
        assert_eq!(outcome.passes, 0);
        assert!(outcome.ops.is_empty());
    }

    #[test]
    fn test_gated_role_unlocks_on_second_pass() {
        let mode = FixedMode::new(
            "Town",
            vec![number("Sheriff Probability", 5.0, 100)],
        );
        let roles: Vec<Box<dyn RoleProvider>> = vec![Box::new(GatedRole {
            metadata: role_metadata("Sheriff"),
            gate_key: "Sheriff Probability".into(),
            extra: vec![RoleOption::new(
                "Sheriff Cooldown",
                OptionValue::number(30.0, 2.5, 10.0, 60.0, false, "{0}s"),
            )],
        })];
        let mut reconciler = Reconciler::new();

        // Pass 1 creates the probability option; pass 2 sees it live and
        // adds the cooldown; pass 3 is the empty fixpoint check.
        let outcome = reconciler.run(&mode, &roles);
        assert!(outcome.converged);
        assert_eq!(outcome.passes, 2);

        let cooldown = reconciler.live().get("Sheriff Cooldown").unwrap();
        assert_eq!(cooldown.category, category::CONFIG);
        assert_eq!(cooldown.priority, priority::GENERATED);
    }

    #[test]
    fn test_generated_priorities_offset_by_provider_order() {
        let mode = FixedMode::new("Town", vec![number("gate", 1.0, 100)]);
        let role = |name: &str, keys: &[&str]| -> Box<dyn RoleProvider> {
            Box::new(GatedRole {
                metadata: role_metadata(name),
                gate_key: "gate".into(),
                extra: keys
                    .iter()
                    .map(|k| RoleOption::new(*k, OptionValue::boolean(false)))
                    .collect(),
            })
        };
        let roles = vec![role("First", &["f0", "f1"]), role("Second", &["s0"])];
        let mut reconciler = Reconciler::new();
        reconciler.run(&mode, &roles);

        assert_eq!(reconciler.live().get("f0").unwrap().priority, 600);
        assert_eq!(reconciler.live().get("f1").unwrap().priority, 601);
        assert_eq!(reconciler.live().get("s0").unwrap().priority, 700);
    }

    #[test]
    fn test_pathological_providers_stop_at_cap() {
        /// Adds "flip" only when it is absent from the live set, so every
        /// pass inverts the previous one.
        struct Oscillator {
            metadata: RoleMetadata,
        }

        impl RoleProvider for Oscillator {
            fn metadata(&self) -> &RoleMetadata {
                &self.metadata
            }

            fn options(&self, live: &OptionSet) -> Vec<RoleOption> {
                if live.contains_key("flip") {
                    Vec::new()
                } else {
                    vec![RoleOption::new("flip", OptionValue::boolean(true))]
                }
            }
        }

        let mode = FixedMode::new("Broken", vec![]);
        let roles: Vec<Box<dyn RoleProvider>> = vec![Box::new(Oscillator {
            metadata: role_metadata("Oscillator"),
        })];
        let mut reconciler = Reconciler::new();

        let outcome = reconciler.run(&mode, &roles);
        assert!(!outcome.converged);
        assert_eq!(outcome.passes, MAX_PASSES);
    }

    // =====================================================================
    // Cache interplay
    // =====================================================================

    #[test]
    fn test_cache_restores_value_across_mode_switch() {
        let voting_time = || {
            GameOption::new(
                category::MEETINGS,
                "Voting Time",
                OptionValue::number(150.0, 30.0, 0.0, 300.0, true, "{0}s"),
                200,
            )
        };
        let mode_a = FixedMode::new("A", vec![voting_time()]);
        let mode_b = FixedMode::new("B", vec![]);
        let mut reconciler = Reconciler::new();

        reconciler.run(&mode_a, &[]);
        reconciler
            .apply_update(
                "Voting Time",
                OptionValue::number(90.0, 30.0, 0.0, 300.0, true, "{0}s"),
            )
            .unwrap();

        // Switch away (option destroyed) and back (option recreated).
        reconciler.run(&mode_b, &[]);
        assert!(reconciler.live().get("Voting Time").is_none());

        reconciler.run(&mode_a, &[]);
        let restored = reconciler.live().get("Voting Time").unwrap();
        assert!(restored.value().is_roughly(90.0), "expected cached 90, got {:?}", restored.value());
    }

    #[test]
    fn test_mode_switch_scenario() {
        let mode_a = FixedMode::new(
            "A",
            vec![number("Map", 0.0, 100), number("Impostor Count", 2.0, 101)],
        );
        let mode_b = FixedMode::new(
            "B",
            vec![number("Map", 0.0, 100), number("Task Count", 4.0, 101)],
        );
        let mut reconciler = Reconciler::new();

        reconciler.run(&mode_a, &[]);
        reconciler.run(&mode_b, &[]);

        assert!(reconciler.live().contains_key("Map"));
        assert!(reconciler.live().contains_key("Task Count"));
        assert!(!reconciler.live().contains_key("Impostor Count"));
        assert_eq!(reconciler.live().len(), 2);
    }

    #[test]
    fn test_redeclared_shape_wins_over_stale_cache() {
        let old = FixedMode::new(
            "Old",
            vec![GameOption::new(
                category::CONFIG,
                "Cooldown",
                OptionValue::number(30.0, 2.5, 10.0, 60.0, false, "{0}s"),
                600,
            )],
        );
        // Same identity, different bounds: the cached 30 is inside the new
        // range but the shape differs, so the declared value must win.
        let new = FixedMode::new(
            "New",
            vec![GameOption::new(
                category::CONFIG,
                "Cooldown",
                OptionValue::number(15.0, 5.0, 0.0, 120.0, false, "{0}s"),
                600,
            )],
        );
        let mut reconciler = Reconciler::new();

        reconciler.run(&old, &[]);
        reconciler.run(&new, &[]);

        let live = reconciler.live().get("Cooldown").unwrap();
        assert!(live.value().is_roughly(15.0));
        // Cache re-seeded with the declared value: a third run keeps it.
        reconciler.run(&new, &[]);
        assert!(reconciler.live().get("Cooldown").unwrap().value().is_roughly(15.0));
    }

    // =====================================================================
    // Client updates
    // =====================================================================

    #[test]
    fn test_apply_update_unknown_key() {
        let mut reconciler = Reconciler::new();
        assert!(matches!(
            reconciler.apply_update("nope", OptionValue::boolean(true)),
            Err(OptionsError::UnknownOption(_))
        ));
    }

    #[test]
    fn test_rejected_update_mutates_nothing() {
        let mode = FixedMode::new(
            "A",
            vec![GameOption::new(
                category::NONE,
                "Map",
                OptionValue::enumeration(["The Skeld", "Polus"], 0),
                100,
            )],
        );
        let mut reconciler = Reconciler::new();
        reconciler.run(&mode, &[]);

        // selected_idx == labels.len() is out of bounds.
        let result = reconciler.apply_update(
            "Map",
            OptionValue::enumeration(["The Skeld", "Polus"], 2),
        );
        assert!(matches!(
            result,
            Err(OptionsError::InvalidValue {
                source: ValueError::SelectedOutOfBounds { .. },
                ..
            })
        ));

        let live = reconciler.live().get("Map").unwrap();
        assert_eq!(live.value().selected_option(), Some("The Skeld"));
        let cached = reconciler.cache().get(live).unwrap();
        assert_eq!(cached.selected_option(), Some("The Skeld"));
    }

    #[test]
    fn test_apply_delete_keeps_cache() {
        let mode = FixedMode::new("A", vec![number("Impostor Count", 2.0, 100)]);
        let mut reconciler = Reconciler::new();
        reconciler.run(&mode, &[]);

        let deleted = reconciler.apply_delete("Impostor Count").unwrap();
        assert!(reconciler.live().is_empty());
        assert!(reconciler.cache().get(&deleted).is_some());
    }
}
