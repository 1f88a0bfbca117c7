//! Information set registry.
//!
//! The registry owns one [`InformationSet`] per key for the lifetime of a
//! solve run. Decision nodes only hold the key, so every node aliased onto a
//! key reads and updates the same regret and strategy tables.
//!
//! A registry is private to one solver; parallel replicas each build their own
//! and only their finished reports are merged.

use std::collections::BTreeMap;

use log::debug;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cfr::error::{Result, SolverError};
use crate::cfr::regret;

/// Regret and strategy tables for one information set.
///
/// Both tables are indexed by action position and always have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationSet {
    key: String,
    actions: Vec<String>,
    regrets: Vec<f64>,
    strategy_sum: Vec<f64>,
    visits: u64,
}

impl InformationSet {
    /// Fresh set with zero regrets and zero strategy weight.
    pub fn new(key: impl Into<String>, num_actions: usize) -> Self {
        Self {
            key: key.into(),
            actions: Vec::new(),
            regrets: vec![0.0; num_actions],
            strategy_sum: vec![0.0; num_actions],
            visits: 0,
        }
    }

    /// Key of the set.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of actions.
    pub fn num_actions(&self) -> usize {
        self.regrets.len()
    }

    /// Action labels (empty until [`set_action_names`](Self::set_action_names) is called).
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Store action labels. Only the first call has an effect.
    pub fn set_action_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.actions.is_empty() {
            self.actions = names.into_iter().map(Into::into).collect();
        }
    }

    /// Cumulative counterfactual regrets.
    pub fn regrets(&self) -> &[f64] {
        &self.regrets
    }

    /// Cumulative strategy weights.
    pub fn strategy_sum(&self) -> &[f64] {
        &self.strategy_sum
    }

    /// Number of strategy-sum updates received.
    pub fn visits(&self) -> u64 {
        self.visits
    }

    /// Regret-matching strategy.
    pub fn current_strategy(&self) -> Vec<f64> {
        regret::regret_matching(&self.regrets)
    }

    /// Normalised cumulative strategy, `None` if no weight was accumulated.
    pub fn average_strategy(&self) -> Option<Vec<f64>> {
        regret::average_strategy(&self.strategy_sum)
    }

    /// True once some positive strategy weight has been accumulated.
    pub fn is_visited(&self) -> bool {
        self.strategy_sum.iter().sum::<f64>() > 0.0
    }

    /// Add `weight * (action_value - node_value)` to each action's regret.
    ///
    /// With `use_cfr_plus`, regrets are floored at zero after the update.
    pub fn update_regrets(
        &mut self,
        action_values: &[f64],
        node_value: f64,
        weight: f64,
        use_cfr_plus: bool,
    ) {
        debug_assert_eq!(action_values.len(), self.regrets.len());

        for (regret, &value) in self.regrets.iter_mut().zip(action_values) {
            *regret += weight * (value - node_value);

            if use_cfr_plus && *regret < 0.0 {
                *regret = 0.0;
            }
        }
    }

    /// Add `weight * strategy` to the cumulative strategy.
    pub fn update_strategy_sum(&mut self, strategy: &[f64], weight: f64) {
        debug_assert_eq!(strategy.len(), self.strategy_sum.len());

        for (sum, &prob) in self.strategy_sum.iter_mut().zip(strategy) {
            *sum += prob * weight;
        }
        self.visits += 1;
    }
}

/// Key-based table of [`InformationSet`]s for one solve run.
#[derive(Debug, Clone, Default)]
pub struct InfoSetRegistry {
    sets: FxHashMap<String, InformationSet>,
}

impl InfoSetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with room for `capacity` information sets.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sets: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// The set stored under `key`, created on first sight.
    ///
    /// The same key always yields the same underlying state.
    ///
    /// # Errors
    /// [`SolverError::InconsistentActionSpace`] if `key` was created with a
    /// different number of actions.
    pub fn get_or_create(&mut self, key: &str, num_actions: usize) -> Result<&mut InformationSet> {
        match self.sets.get(key) {
            Some(existing) if existing.num_actions() != num_actions => {
                return Err(SolverError::InconsistentActionSpace {
                    key: key.to_string(),
                    expected: existing.num_actions(),
                    found: num_actions,
                });
            }
            Some(_) => {}
            None => {
                debug!("new information set {} ({} actions)", key, num_actions);
                self.sets
                    .insert(key.to_string(), InformationSet::new(key, num_actions));
            }
        }

        self.sets
            .get_mut(key)
            .ok_or_else(|| SolverError::malformed(format!("information set '{}' vanished", key)))
    }

    /// Read-only lookup.
    pub fn get(&self, key: &str) -> Option<&InformationSet> {
        self.sets.get(key)
    }

    /// Whether `key` has been created.
    pub fn contains(&self, key: &str) -> bool {
        self.sets.contains_key(key)
    }

    /// Number of information sets created so far.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// True before the first visit.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// All sets in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &InformationSet> {
        self.sets.values()
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Copy of every table at `iteration`, for plotting or convergence checks.
    pub fn snapshot(&self, iteration: u64) -> RegistrySnapshot {
        let entries = self
            .sets
            .iter()
            .map(|(key, set)| {
                let entry = SnapshotEntry {
                    actions: set.actions.clone(),
                    regrets: set.regrets.clone(),
                    current: set.current_strategy(),
                    average: set.average_strategy(),
                    visits: set.visits,
                };
                (key.clone(), entry)
            })
            .collect();

        RegistrySnapshot { iteration, entries }
    }

    /// Drop every information set.
    pub fn clear(&mut self) {
        self.sets.clear();
    }
}

/// One information set inside a [`RegistrySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    /// Action labels.
    pub actions: Vec<String>,
    /// Cumulative regrets.
    pub regrets: Vec<f64>,
    /// Regret-matching strategy.
    pub current: Vec<f64>,
    /// Average strategy, absent while unvisited.
    pub average: Option<Vec<f64>>,
    /// Strategy-sum updates so far.
    pub visits: u64,
}

/// Frozen copy of a registry at one iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Iteration the snapshot was taken at.
    pub iteration: u64,
    /// Per-key tables, sorted by key.
    pub entries: BTreeMap<String, SnapshotEntry>,
}

impl RegistrySnapshot {
    /// Convergence Indicator: how much average strategies moved since `previous`.
    ///
    /// CI = 100 × mean over visited sets of Σ|new − old|. Sets without an
    /// average in `previous` are compared against uniform. Each set contributes
    /// at most 2.0, so CI ranges over [0, 200]. Returns infinity when nothing
    /// can be compared.
    pub fn convergence_indicator(&self, previous: &RegistrySnapshot) -> f64 {
        let mut total_change = 0.0;
        let mut num_info_sets = 0;

        for (key, entry) in &self.entries {
            let Some(new_strategy) = entry.average.as_ref() else {
                continue;
            };

            let change: f64 = match previous.entries.get(key).and_then(|e| e.average.as_ref()) {
                Some(old_strategy) => new_strategy
                    .iter()
                    .zip(old_strategy)
                    .map(|(&new, &old)| (new - old).abs())
                    .sum(),
                None => {
                    let uniform = 1.0 / new_strategy.len() as f64;
                    new_strategy.iter().map(|&p| (p - uniform).abs()).sum()
                }
            };

            total_change += change;
            num_info_sets += 1;
        }

        if num_info_sets == 0 {
            return f64::INFINITY;
        }

        100.0 * total_change / num_info_sets as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_is_deterministic() {
        let mut registry = InfoSetRegistry::new();
        registry
            .get_or_create("X:choice", 2)
            .unwrap()
            .update_regrets(&[1.0, 0.0], 0.25, 1.0, false);

        let again = registry.get_or_create("X:choice", 2).unwrap();
        assert_eq!(again.regrets(), &[0.75, -0.25]);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("X:choice"));
    }

    #[test]
    fn test_get_or_create_rejects_action_mismatch() {
        let mut registry = InfoSetRegistry::new();
        registry.get_or_create("Y:choice", 3).unwrap();

        let err = registry.get_or_create("Y:choice", 2).unwrap_err();
        assert_eq!(
            err,
            SolverError::InconsistentActionSpace {
                key: "Y:choice".to_string(),
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn test_action_names_stored_once() {
        let mut set = InformationSet::new("X:bet_response", 2);
        set.set_action_names(["fold", "call"]);
        set.set_action_names(["a", "b"]);
        assert_eq!(set.actions(), &["fold".to_string(), "call".to_string()]);
    }

    #[test]
    fn test_strategy_updates() {
        let mut set = InformationSet::new("Y:nuts", 2);
        assert!(!set.is_visited());
        assert_eq!(set.average_strategy(), None);
        assert_eq!(set.current_strategy(), vec![0.5, 0.5]);

        set.update_regrets(&[-1.0, 3.0], 1.0, 0.5, false);
        assert_eq!(set.regrets(), &[-1.0, 1.0]);
        assert_eq!(set.current_strategy(), vec![0.0, 1.0]);

        set.update_strategy_sum(&[0.25, 0.75], 2.0);
        set.update_strategy_sum(&[0.75, 0.25], 2.0);
        assert_eq!(set.strategy_sum(), &[2.0, 2.0]);
        assert_eq!(set.average_strategy(), Some(vec![0.5, 0.5]));
        assert_eq!(set.visits(), 2);
    }

    #[test]
    fn test_cfr_plus_floors_regrets() {
        let mut set = InformationSet::new("X:choice", 2);
        set.update_regrets(&[-2.0, 2.0], 0.0, 1.0, true);
        assert_eq!(set.regrets(), &[0.0, 2.0]);
    }

    #[test]
    fn test_snapshot_and_convergence_indicator() {
        let mut registry = InfoSetRegistry::new();
        {
            let set = registry.get_or_create("X:choice", 2).unwrap();
            set.set_action_names(["heads", "tails"]);
            set.update_strategy_sum(&[1.0, 0.0], 1.0);
        }
        registry.get_or_create("Y:choice", 2).unwrap();

        let first = registry.snapshot(1);
        assert_eq!(first.iteration, 1);
        assert_eq!(first.entries.len(), 2);
        assert_eq!(first.entries["Y:choice"].average, None);
        assert_eq!(first.entries["X:choice"].actions, vec!["heads", "tails"]);

        // Against an empty snapshot, X:choice is compared with uniform: |1-0.5| + |0-0.5|.
        let ci = first.convergence_indicator(&RegistrySnapshot::default());
        assert!((ci - 100.0).abs() < 1e-9);

        registry
            .get_or_create("X:choice", 2)
            .unwrap()
            .update_strategy_sum(&[0.0, 1.0], 1.0);
        let second = registry.snapshot(2);
        assert!((second.convergence_indicator(&first) - 100.0).abs() < 1e-9);
        assert_eq!(second.convergence_indicator(&second), 0.0);

        let empty = InfoSetRegistry::new().snapshot(0);
        assert!(empty.convergence_indicator(&first).is_infinite());
    }

    #[test]
    fn test_keys_sorted() {
        let mut registry = InfoSetRegistry::with_capacity(4);
        for key in ["Y:b", "X:a", "Y:a"] {
            registry.get_or_create(key, 2).unwrap();
        }
        assert_eq!(registry.keys(), vec!["X:a", "Y:a", "Y:b"]);
        registry.clear();
        assert!(registry.is_empty());
    }
}
