//! Movement policies. Both variants share the same decision contract: a
//! candidate set with the anti-reversal filter applied, a per-step update and
//! a way to be recombined from elite snapshots between generations.

mod q_learning;
mod weighted;

pub use q_learning::{QLearningPolicy, ValueTable};
pub use weighted::{UNIFORM_WEIGHTS, WeightedPolicy};

use crate::world::{Action, Cell};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

#[derive(Clone, Copy, Debug)]
pub struct Transition {
    pub state: Cell,
    pub action: Action,
    pub reward: f64,
    pub next: Cell,
}

/// What the agent knows when it has to pick a move.
#[derive(Clone, Copy, Debug)]
pub struct Decision<'a> {
    pub current: Cell,
    pub previous: Option<Cell>,
    pub legal: &'a [Action],
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StagnationResponse {
    EpsilonBoost { epsilon: f64 },
    MutationBurst,
    FullReset,
}

pub trait Policy {
    /// Owned copy of the learned state, detached from later mutation.
    type Snapshot: Clone;

    fn ensure_state(&mut self, state: Cell);
    fn select_action<R: Rng + ?Sized>(&mut self, decision: &Decision<'_>, rng: &mut R) -> Action;
    fn update(&mut self, t: &Transition);
    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R);
    fn best_value(&self, state: Cell) -> f64;
    fn action_values(&self, state: Cell) -> Option<[f64; 4]>;

    fn snapshot(&self) -> Self::Snapshot;
    fn install(&mut self, snapshot: Self::Snapshot);
    fn average(elites: &[&Self::Snapshot]) -> Self::Snapshot;
    fn after_recombination<R: Rng + ?Sized>(&mut self, rng: &mut R);
    fn on_stagnation<R: Rng + ?Sized>(&mut self, stagnant_since_record: u32, rng: &mut R) -> StagnationResponse;
    fn reset_life(&mut self);
}

// ============================
// Shared helpers
// ============================

/// Drops the move that would walk straight back onto `previous`, unless that
/// leaves nothing to choose from.
pub fn candidate_actions(decision: &Decision<'_>) -> Vec<Action> {
    let filtered: Vec<Action> = match decision.previous {
        Some(prev) => decision.legal.iter().copied().filter(|a| decision.current.step(*a) != prev).collect(),
        None => decision.legal.to_vec(),
    };
    if filtered.is_empty() { decision.legal.to_vec() } else { filtered }
}

/// Highest-scoring candidate, ties broken uniformly at random.
pub fn pick_best<R: Rng + ?Sized>(values: &[f64; 4], candidates: &[Action], rng: &mut R) -> Action {
    let best = candidates.iter().map(|a| values[a.index()]).fold(f64::NEG_INFINITY, f64::max);
    let tied: Vec<Action> = candidates.iter().copied().filter(|a| values[a.index()] == best).collect();
    *tied.choose(rng).unwrap_or(&candidates[0])
}

/// Scales `values` to sum to 1. A sum of exactly zero is left alone.
pub fn renormalize(values: &mut [f64]) -> bool {
    let total: f64 = values.iter().sum();
    if total == 0.0 {
        return false;
    }
    for v in values.iter_mut() { *v /= total; }
    true
}

pub fn mutate_entries<R: Rng + ?Sized>(values: &mut [f64], rate: f64, strength: f64, rng: &mut R) {
    for v in values.iter_mut() {
        if rng.gen_bool(rate) {
            *v *= rng.gen_range(1.0 - strength..=1.0 + strength);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn filter_removes_only_the_reversal() {
        let d = Decision { current: Cell::new(5, 5), previous: Some(Cell::new(5, 4)), legal: &Action::ALL };
        let c = candidate_actions(&d);
        assert_eq!(c, vec![Action::Up, Action::Down, Action::Right]);
    }

    #[test]
    fn filter_falls_back_when_reversal_is_the_only_way() {
        let legal = [Action::Left];
        let d = Decision { current: Cell::new(5, 5), previous: Some(Cell::new(5, 4)), legal: &legal };
        assert_eq!(candidate_actions(&d), vec![Action::Left]);
    }

    #[test]
    fn ties_are_broken_among_the_best_only() {
        let mut rng = SmallRng::seed_from_u64(11);
        let values = [1.0, 3.0, 3.0, -2.0];
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[pick_best(&values, &Action::ALL, &mut rng).index()] = true;
        }
        assert_eq!(seen, [false, true, true, false]);
    }

    #[test]
    fn renormalize_skips_zero_sum() {
        let mut z = [0.0; 4];
        assert!(!renormalize(&mut z));
        assert_eq!(z, [0.0; 4]);
        let mut v = [1.0, 1.0, 2.0, 0.0];
        assert!(renormalize(&mut v));
        assert_eq!(v, [0.25, 0.25, 0.5, 0.0]);
    }
}
