use super::{Decision, Policy, StagnationResponse, Transition, candidate_actions, mutate_entries, renormalize};
use crate::config::WeightedConfig;
use crate::world::{Action, Cell};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;

pub const UNIFORM_WEIGHTS: [f64; 4] = [0.25; 4];

/// A single belief vector over the four moves, shared by every cell. Rewards
/// are spread over all moves made so far in the current life.
#[derive(Clone, Debug)]
pub struct WeightedPolicy {
    weights: [f64; 4],
    history: Vec<Action>,
    cfg: WeightedConfig,
}

impl WeightedPolicy {
    pub fn new(cfg: &WeightedConfig) -> Self {
        Self { weights: UNIFORM_WEIGHTS, history: Vec::new(), cfg: cfg.clone() }
    }

    pub fn weights(&self) -> [f64; 4] { self.weights }

    fn settle(&mut self) {
        for w in self.weights.iter_mut() { *w = w.max(0.0); }
        renormalize(&mut self.weights);
    }
}

impl Policy for WeightedPolicy {
    type Snapshot = [f64; 4];

    fn ensure_state(&mut self, _state: Cell) {}

    fn select_action<R: Rng + ?Sized>(&mut self, decision: &Decision<'_>, rng: &mut R) -> Action {
        let candidates = candidate_actions(decision);
        let weights: Vec<f64> = candidates.iter().map(|a| self.weights[a.index()]).collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => candidates[dist.sample(rng)],
            // every candidate weighs zero
            Err(_) => *candidates.choose(rng).unwrap_or(&candidates[0]),
        }
    }

    fn update(&mut self, t: &Transition) {
        self.history.push(t.action);
        let share = t.reward * self.cfg.reward_scale / self.history.len() as f64;
        for a in &self.history {
            self.weights[a.index()] += share;
        }
        self.settle();
    }

    fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, strength: f64, rng: &mut R) {
        mutate_entries(&mut self.weights, rate, strength, rng);
        self.settle();
    }

    fn best_value(&self, _state: Cell) -> f64 {
        self.weights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn action_values(&self, _state: Cell) -> Option<[f64; 4]> { Some(self.weights) }

    fn snapshot(&self) -> [f64; 4] { self.weights }

    fn install(&mut self, snapshot: [f64; 4]) { self.weights = snapshot; }

    fn average(elites: &[&[f64; 4]]) -> [f64; 4] {
        if elites.is_empty() {
            return UNIFORM_WEIGHTS;
        }
        let mut avg = [0.0; 4];
        for w in elites {
            for (a, v) in avg.iter_mut().zip(w.iter()) { *a += v; }
        }
        for a in avg.iter_mut() { *a /= elites.len() as f64; }
        renormalize(&mut avg);
        avg
    }

    fn after_recombination<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let (rate, strength) = (self.cfg.mutation_rate, self.cfg.mutation_strength);
        self.mutate(rate, strength, rng);
    }

    fn on_stagnation<R: Rng + ?Sized>(&mut self, stagnant_since_record: u32, rng: &mut R) -> StagnationResponse {
        if stagnant_since_record >= self.cfg.reset_after {
            self.weights = UNIFORM_WEIGHTS;
            StagnationResponse::FullReset
        } else {
            let (rate, strength) = (self.cfg.burst_rate, self.cfg.burst_strength);
            self.mutate(rate, strength, rng);
            StagnationResponse::MutationBurst
        }
    }

    fn reset_life(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sum(w: [f64; 4]) -> f64 { w.iter().sum() }

    fn literal() -> WeightedPolicy {
        WeightedPolicy::new(&WeightedConfig { reward_scale: 1.0, ..WeightedConfig::default() })
    }

    #[test]
    fn reinforcement_spreads_reward_over_history() {
        let mut p = literal();
        let c = Cell::new(0, 0);
        p.update(&Transition { state: c, action: Action::Up, reward: 1.0, next: c });
        // [1.25, .25, .25, .25] / 2
        assert!((p.weights()[0] - 0.625).abs() < 1e-12);
        p.update(&Transition { state: c, action: Action::Down, reward: 0.5, next: c });
        // Up was rewarded twice (1.0 then 0.25), Down once
        let w = p.weights();
        assert!(w[0] > w[1] && w[1] > w[2]);
        assert!((sum(w) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_sum_leaves_weights_at_zero_and_still_selects() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut p = literal();
        let c = Cell::new(0, 0);
        p.install([0.0; 4]);
        p.mutate(1.0, 0.5, &mut rng);
        assert_eq!(p.weights(), [0.0; 4]);
        let d = Decision { current: c, previous: None, legal: &Action::ALL };
        let _ = p.select_action(&d, &mut rng);
    }

    #[test]
    fn mutation_keeps_vector_normalized() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut p = literal();
        p.install([0.1, 0.2, 0.3, 0.4]);
        for _ in 0..20 {
            p.mutate(0.7, 0.5, &mut rng);
            assert!((sum(p.weights()) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn average_is_plain_mean() {
        let a = [0.2, 0.3, 0.4, 0.1];
        let b = [0.3, 0.3, 0.3, 0.1];
        let c = [0.4, 0.3, 0.2, 0.1];
        let avg = WeightedPolicy::average(&[&a, &b, &c]);
        assert!((avg[0] - 0.3).abs() < 1e-12);
        assert!((sum(avg) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_moves_are_never_picked() {
        let mut rng = SmallRng::seed_from_u64(12);
        let mut p = literal();
        p.install([0.0, 0.0, 0.5, 0.5]);
        let d = Decision { current: Cell::new(2, 2), previous: None, legal: &Action::ALL };
        for _ in 0..100 {
            let a = p.select_action(&d, &mut rng);
            assert!(matches!(a, Action::Left | Action::Right));
        }
    }

    #[test]
    fn heavy_reversal_weight_is_filtered_unless_it_is_the_only_move() {
        let mut rng = SmallRng::seed_from_u64(13);
        let mut p = literal();
        // all the weight on Left, which leads back to (2, 1)
        p.install([0.0, 0.0, 1.0, 0.0]);
        let current = Cell::new(2, 2);
        let previous = Some(Cell::new(2, 1));
        let open = Decision { current, previous, legal: &Action::ALL };
        for _ in 0..200 {
            assert_ne!(p.select_action(&open, &mut rng), Action::Left);
        }
        let only_back = [Action::Left];
        let dead_end = Decision { current, previous, legal: &only_back };
        assert_eq!(p.select_action(&dead_end, &mut rng), Action::Left);
    }

    #[test]
    fn stagnation_escalates_to_full_reset() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut p = literal();
        p.install([0.7, 0.1, 0.1, 0.1]);
        assert_eq!(p.on_stagnation(5, &mut rng), StagnationResponse::MutationBurst);
        assert!((sum(p.weights()) - 1.0).abs() < 1e-9);
        assert_eq!(p.on_stagnation(10, &mut rng), StagnationResponse::FullReset);
        assert_eq!(p.weights(), UNIFORM_WEIGHTS);
    }
}
