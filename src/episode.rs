use crate::agent::{Agent, MoveResult};
use crate::config::{RewardConfig, TimingConfig};
use crate::policy::Policy;
use crate::world::{Action, Cell, GridWorld};
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::trace;

/// What happened on a tick, for the presentation layer to react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "cell", rename_all = "kebab-case")]
pub enum TickOutcome {
    /// The rate limiter deferred the decision.
    Idle,
    None,
    ConsumedFood(Cell),
    HitHazard(Cell),
    HitWall(Cell),
    Starved,
}

impl TickOutcome {
    pub fn is_fatal(self) -> bool {
        matches!(self, TickOutcome::HitHazard(_) | TickOutcome::HitWall(_) | TickOutcome::Starved)
    }
}

/// Drives a single life. Decisions are paced by wall-clock time divided by
/// the speed factor; starvation and the food bonus are always real seconds.
#[derive(Clone, Debug)]
pub struct EpisodeController {
    rewards: RewardConfig,
    starvation: Duration,
    food_bonus: Duration,
    pub decisions: u64,
}

impl EpisodeController {
    pub fn new(timing: &TimingConfig, rewards: &RewardConfig) -> Self {
        Self { rewards: rewards.clone(), starvation: timing.starvation(), food_bonus: timing.food_bonus(), decisions: 0 }
    }

    pub fn starvation(&self) -> Duration { self.starvation }

    pub fn tick<P: Policy, R: Rng + ?Sized>(
        &mut self,
        agent: &mut Agent<P>,
        world: &GridWorld,
        now: Duration,
        speed: f64,
        rng: &mut R,
    ) -> TickOutcome {
        if !agent.alive {
            return TickOutcome::None;
        }
        agent.touch(now);

        if now.saturating_sub(agent.last_food) >= self.starvation {
            agent.alive = false;
            return TickOutcome::Starved;
        }

        let delay = agent.move_delay.div_f64(speed.max(f64::EPSILON));
        if now.saturating_sub(agent.last_move) < delay {
            return TickOutcome::Idle;
        }
        agent.last_move = now;
        self.decisions += 1;

        let state = agent.position;
        let action = agent.select_action(&Action::ALL, rng);
        let (reward, outcome) = match agent.apply_move(action, world) {
            MoveResult::OutOfBounds => (self.rewards.wall, TickOutcome::HitWall(state.step(action))),
            MoveResult::Moved(cell) => self.resolve(agent, world, cell),
        };
        trace!(?state, ?action, reward, ?outcome, "decision");
        agent.update(state, action, reward, agent.position);
        outcome
    }

    // Later checks win, so a hazard or wall overrides the food reward.
    fn resolve<P: Policy>(&self, agent: &mut Agent<P>, world: &GridWorld, cell: Cell) -> (f64, TickOutcome) {
        let mut reward = self.rewards.step;
        let mut outcome = TickOutcome::None;
        if world.has_food(cell) {
            reward = self.rewards.food;
            agent.last_food += self.food_bonus;
            outcome = TickOutcome::ConsumedFood(cell);
        }
        if world.is_hazard(cell) {
            reward = self.rewards.hazard;
            agent.alive = false;
            outcome = TickOutcome::HitHazard(cell);
        }
        if world.is_wall(cell) {
            reward = self.rewards.wall;
            agent.alive = false;
            outcome = TickOutcome::HitWall(cell);
        }
        (reward, outcome)
    }
}
