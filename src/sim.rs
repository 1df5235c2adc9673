use crate::agent::Agent;
use crate::config::SimConfig;
use crate::episode::{EpisodeController, TickOutcome};
use crate::generation::{DeathReport, GenerationManager};
use crate::policy::Policy;
use crate::visits::VisitMap;
use crate::world::{Cell, GridWorld, WorldLayout};
use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TickReport {
    Tick(TickOutcome),
    Reborn(DeathReport),
}

/// Read-only view for whatever draws the game.
#[derive(Clone, Debug, Serialize)]
pub struct HudSnapshot {
    pub generation: u64,
    pub position: Cell,
    pub alive: bool,
    pub survival_secs: f64,
    pub time_left_secs: f64,
    pub intelligence: u8,
    pub record_generation: u64,
    pub record_survival_secs: f64,
    pub visited_cells: usize,
    pub hottest_visit: u8,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RunStats {
    pub food_eaten: u64,
    pub hazards_hit: u64,
    pub walls_hit: u64,
    pub starved: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub generations: u64,
    pub record_generation: u64,
    pub record_survival_secs: f64,
    pub decisions: u64,
    pub simulated_secs: f64,
    pub stats: RunStats,
}

pub struct Simulation<P: Policy> {
    pub world: GridWorld,
    pub agent: Agent<P>,
    pub controller: EpisodeController,
    pub manager: GenerationManager<P>,
    pub visits: VisitMap,
    pub stats: RunStats,
    seed: u64,
    rng: SmallRng,
}

impl<P: Policy> Simulation<P> {
    pub fn new(cfg: &SimConfig, policy: P, seed: u64) -> Result<Self> {
        cfg.validate()?;
        let mut rng = SmallRng::seed_from_u64(seed);
        let world = WorldLayout::scatter(cfg.rows, cfg.cols, cfg.wall_cells(), cfg.start, cfg.hazard_count, cfg.food_count, &mut rng);
        Ok(Self::with_world(cfg, world, policy, seed, rng))
    }

    pub fn with_world(cfg: &SimConfig, world: GridWorld, policy: P, seed: u64, rng: SmallRng) -> Self {
        debug_assert!(world.contains(cfg.start), "start {:?} outside a {}x{} world", cfg.start, world.rows, world.cols);
        Self {
            world,
            agent: Agent::new(policy, cfg.start, Duration::ZERO, cfg.timing.move_delay()),
            controller: EpisodeController::new(&cfg.timing, &cfg.rewards),
            manager: GenerationManager::new(&cfg.evolution, cfg.start),
            visits: VisitMap::new(),
            stats: RunStats::default(),
            seed,
            rng,
        }
    }

    /// One frame. A live agent gets a decision tick; a dead one is harvested,
    /// the world is restocked and the next generation starts.
    pub fn tick(&mut self, now: Duration, speed: f64) -> TickReport {
        self.visits.decay(now, speed);
        if !self.agent.alive {
            let report = self.manager.on_death(&mut self.agent, now, &mut self.rng);
            self.world.restore();
            return TickReport::Reborn(report);
        }

        let before = self.agent.position;
        let outcome = self.controller.tick(&mut self.agent, &self.world, now, speed, &mut self.rng);
        match outcome {
            TickOutcome::ConsumedFood(c) => {
                self.world.consume_food(c);
                self.stats.food_eaten += 1;
            }
            TickOutcome::HitHazard(c) => {
                self.world.detonate_hazard(c);
                self.stats.hazards_hit += 1;
            }
            TickOutcome::HitWall(_) => self.stats.walls_hit += 1,
            TickOutcome::Starved => self.stats.starved += 1,
            TickOutcome::Idle | TickOutcome::None => {}
        }
        if self.agent.position != before {
            self.visits.record(self.agent.position, now);
        }
        TickReport::Tick(outcome)
    }

    pub fn snapshot(&self, now: Duration) -> HudSnapshot {
        let ctx = &self.manager.ctx;
        HudSnapshot {
            generation: ctx.generation,
            position: self.agent.position,
            alive: self.agent.alive,
            survival_secs: self.agent.survival.as_secs_f64(),
            time_left_secs: self.agent.time_left(now, self.controller.starvation()).as_secs_f64(),
            intelligence: self.agent.intelligence_score(ctx.record_survival()),
            record_generation: ctx.record.generation,
            record_survival_secs: ctx.record.survival.as_secs_f64(),
            visited_cells: self.visits.iter().count(),
            hottest_visit: self.visits.iter().map(|(_, level)| level).max().unwrap_or(0),
        }
    }

    /// Headless run on a virtual clock that advances one frame per tick.
    pub fn run_generations(&mut self, generations: u64, speed: f64, frame: Duration) -> RunSummary {
        let mut now = Duration::ZERO;
        while self.manager.ctx.generation < generations {
            now += frame;
            self.tick(now, speed);
        }
        self.summary(now)
    }

    pub fn summary(&self, now: Duration) -> RunSummary {
        let ctx = &self.manager.ctx;
        RunSummary {
            seed: self.seed,
            generations: ctx.generation,
            record_generation: ctx.record.generation,
            record_survival_secs: ctx.record.survival.as_secs_f64(),
            decisions: self.controller.decisions,
            simulated_secs: now.as_secs_f64(),
            stats: self.stats.clone(),
        }
    }
}
