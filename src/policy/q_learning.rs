use super::{Decision, Policy, StagnationResponse, Transition, candidate_actions, mutate_entries, pick_best, renormalize};
use crate::config::QLearningConfig;
use crate::world::{Action, Cell};
use ahash::AHashMap;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::trace;

/// One row of four action values per visited cell, indexed by [`Action::index`].
pub type ValueTable = AHashMap<Cell, [f64; 4]>;

#[derive(Clone, Debug)]
pub struct QLearningPolicy {
    q: ValueTable,
    pub epsilon: f64,
    pub alpha: f64,
    pub gamma: f64,
    epsilon_boost: f64,
    epsilon_cap: f64,
}

impl QLearningPolicy {
    pub fn new(cfg: &QLearningConfig) -> Self {
        Self {
            q: AHashMap::new(),
            epsilon: cfg.epsilon,
            alpha: cfg.alpha,
            gamma: cfg.gamma,
            epsilon_boost: cfg.epsilon_boost,
            epsilon_cap: cfg.epsilon_cap,
        }
    }

    fn get_qs(&mut self, s: Cell) -> &mut [f64; 4] { self.q.entry(s).or_insert([0.0; 4]) }

    pub fn table(&self) -> &ValueTable { &self.q }
}

impl Policy for QLearningPolicy {
    type Snapshot = ValueTable;

    fn ensure_state(&mut self, state: Cell) {
        self.get_qs(state);
    }

    fn select_action<R: Rng + ?Sized>(&mut self, decision: &Decision<'_>, rng: &mut R) -> Action {
        let qs = *self.get_qs(decision.current);
        let candidates = candidate_actions(decision);
        if rng.r#gen::<f64>() < self.epsilon {
            let a = *candidates.choose(rng).unwrap_or(&candidates[0]);
            trace!(?a, "explore");
            a
        } else {
            pick_best(&qs, &candidates, rng)
        }
    }

    fn update(&mut self, t: &Transition) {
        let next_max = self.get_qs(t.next).iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let alpha = self.alpha; let gamma = self.gamma;
        let qsa = &mut self.get_qs(t.state)[t.action.index()];
        *qsa += alpha * (t.reward + gamma * next_max - *qsa);
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R) {
        for row in self.q.values_mut() {
            mutate_entries(row, rate, strength, rng);
            renormalize(row);
        }
    }

    fn best_value(&self, state: Cell) -> f64 {
        self.q.get(&state).map_or(0.0, |qs| qs.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    fn action_values(&self, state: Cell) -> Option<[f64; 4]> { self.q.get(&state).copied() }

    fn snapshot(&self) -> ValueTable { self.q.clone() }

    fn install(&mut self, snapshot: ValueTable) { self.q = snapshot; }

    /// Per-entry mean over the elites that have visited the cell.
    fn average(elites: &[&ValueTable]) -> ValueTable {
        let mut sums: AHashMap<Cell, ([f64; 4], usize)> = AHashMap::new();
        for table in elites {
            for (cell, row) in table.iter() {
                let (acc, n) = sums.entry(*cell).or_insert(([0.0; 4], 0));
                for (a, v) in acc.iter_mut().zip(row) { *a += v; }
                *n += 1;
            }
        }
        sums.into_iter()
            .map(|(cell, (acc, n))| (cell, acc.map(|v| v / n as f64)))
            .collect()
    }

    fn after_recombination<R: Rng + ?Sized>(&mut self, _rng: &mut R) {}

    fn on_stagnation<R: Rng + ?Sized>(&mut self, _stagnant_since_record: u32, _rng: &mut R) -> StagnationResponse {
        self.epsilon = (self.epsilon + self.epsilon_boost).min(self.epsilon_cap);
        StagnationResponse::EpsilonBoost { epsilon: self.epsilon }
    }

    fn reset_life(&mut self) {}
}
