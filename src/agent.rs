use crate::policy::{Decision, Policy, Transition};
use crate::world::{Action, Cell, GridWorld};
use rand::Rng;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveResult {
    Moved(Cell),
    OutOfBounds,
}

/// The learner. Created once, then reset in place between lives so the
/// policy carries over while the per-life timers start from zero.
///
/// All timestamps are offsets from simulation start.
#[derive(Clone, Debug)]
pub struct Agent<P: Policy> {
    pub policy: P,
    pub position: Cell,
    pub previous: Option<Cell>,
    pub alive: bool,
    pub survival: Duration,
    pub born_at: Duration,
    pub last_food: Duration,
    pub last_move: Duration,
    pub move_delay: Duration,
}

impl<P: Policy> Agent<P> {
    pub fn new(mut policy: P, start: Cell, now: Duration, move_delay: Duration) -> Self {
        policy.ensure_state(start);
        Self {
            policy,
            position: start,
            previous: None,
            alive: true,
            survival: Duration::ZERO,
            born_at: now,
            last_food: now,
            last_move: now,
            move_delay,
        }
    }

    pub fn select_action<R: Rng + ?Sized>(&mut self, legal: &[Action], rng: &mut R) -> Action {
        self.policy.ensure_state(self.position);
        let decision = Decision { current: self.position, previous: self.previous, legal };
        self.policy.select_action(&decision, rng)
    }

    /// Leaving the grid is fatal and leaves the position untouched.
    pub fn apply_move(&mut self, action: Action, world: &GridWorld) -> MoveResult {
        let next = self.position.step(action);
        if !world.contains(next) {
            self.alive = false;
            return MoveResult::OutOfBounds;
        }
        self.previous = Some(self.position);
        self.position = next;
        self.policy.ensure_state(next);
        MoveResult::Moved(next)
    }

    pub fn update(&mut self, state: Cell, action: Action, reward: f64, next: Cell) {
        self.policy.update(&Transition { state, action, reward, next });
    }

    pub fn touch(&mut self, now: Duration) {
        self.survival = now.saturating_sub(self.born_at);
    }

    pub fn time_left(&self, now: Duration, starvation: Duration) -> Duration {
        (self.last_food + starvation).saturating_sub(now)
    }

    /// 0..=100 blend of how this life compares with the record and how
    /// confident the policy is at the current cell. Display only.
    pub fn intelligence_score(&self, record_survival: Option<Duration>) -> u8 {
        let ratio = match record_survival {
            Some(r) if !r.is_zero() => (self.survival.as_secs_f64() / r.as_secs_f64()).min(1.0),
            _ => 1.0,
        };
        let value = self.policy.best_value(self.position).clamp(0.0, 1.0);
        ((ratio + value) * 0.5 * 100.0).round() as u8
    }

    pub fn reset(&mut self, start: Cell, now: Duration) {
        self.position = start;
        self.previous = None;
        self.alive = true;
        self.survival = Duration::ZERO;
        self.born_at = now;
        self.last_food = now;
        self.last_move = now;
        self.policy.reset_life();
        self.policy.ensure_state(start);
    }
}
