//! Sparse planning state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Planning fact key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GoapFact(pub u32);

/// Sorted `fact -> value` map. Booleans are stored as `0`/`1`; a fact that is absent reads as `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoapState(BTreeMap<GoapFact, i32>);

impl GoapState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, fact: GoapFact, value: i32) -> Self {
        self.set(fact, value);
        self
    }

    pub fn with_flag(self, fact: GoapFact, value: bool) -> Self {
        self.with(fact, value as i32)
    }

    /// Explicitly stored value of `fact`.
    pub fn get(&self, fact: GoapFact) -> Option<i32> {
        self.0.get(&fact).copied()
    }

    /// Value of `fact`, reading absent facts as `0`.
    pub fn value(&self, fact: GoapFact) -> i32 {
        self.get(fact).unwrap_or(0)
    }

    pub fn set(&mut self, fact: GoapFact, value: i32) {
        self.0.insert(fact, value);
    }

    pub fn remove(&mut self, fact: GoapFact) -> Option<i32> {
        self.0.remove(&fact)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GoapFact, i32)> + '_ {
        self.0.iter().map(|(fact, value)| (*fact, *value))
    }

    /// Whether every fact of `required` holds in `self`.
    pub fn satisfies(&self, required: &GoapState) -> bool {
        required.iter().all(|(fact, value)| self.value(fact) == value)
    }

    /// The facts of `self` that do not hold in `state`.
    pub fn unsatisfied_by(&self, state: &GoapState) -> GoapState {
        GoapState(
            self.0
                .iter()
                .filter(|(fact, value)| state.value(**fact) != **value)
                .map(|(fact, value)| (*fact, *value))
                .collect(),
        )
    }

    /// Overwrites `self` with every fact of `effects`.
    pub fn apply(&mut self, effects: &GoapState) {
        for (fact, value) in effects.iter() {
            self.set(fact, value);
        }
    }

    /// Whether a fact stored in both states has different values.
    pub fn conflicts(&self, other: &GoapState) -> bool {
        other
            .iter()
            .any(|(fact, value)| self.get(fact).is_some_and(|mine| mine != value))
    }
}

impl FromIterator<(GoapFact, i32)> for GoapState {
    fn from_iter<I: IntoIterator<Item = (GoapFact, i32)>>(iter: I) -> Self {
        GoapState(iter.into_iter().collect())
    }
}
