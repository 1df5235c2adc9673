use crate::world::{Bunker, Cell};
use ahash::AHashSet;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    QLearning,
    Weighted,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub rows: i32,
    pub cols: i32,
    pub start: Cell,
    pub walls: Vec<Cell>,
    /// Expanded into wall outlines on top of `walls`.
    pub bunkers: Vec<Bunker>,
    pub hazard_count: usize,
    pub food_count: usize,
    pub policy: PolicyKind,
    pub timing: TimingConfig,
    pub rewards: RewardConfig,
    pub evolution: EvolutionConfig,
    pub q_learning: QLearningConfig,
    pub weighted: WeightedConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 100,
            cols: 100,
            start: Cell::new(50, 50),
            walls: Vec::new(),
            bunkers: Vec::new(),
            hazard_count: 100,
            food_count: 150,
            policy: PolicyKind::QLearning,
            timing: TimingConfig::default(),
            rewards: RewardConfig::default(),
            evolution: EvolutionConfig::default(),
            q_learning: QLearningConfig::default(),
            weighted: WeightedConfig::default(),
        }
    }
}

/// All values are real seconds. Only `move_delay_secs` is divided by the
/// speed factor.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub move_delay_secs: f64,
    pub starvation_secs: f64,
    pub food_bonus_secs: f64,
    pub fps: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { move_delay_secs: 0.4, starvation_secs: 20.0, food_bonus_secs: 10.0, fps: 60 }
    }
}

impl TimingConfig {
    pub fn move_delay(&self) -> Duration { Duration::from_secs_f64(self.move_delay_secs) }
    pub fn starvation(&self) -> Duration { Duration::from_secs_f64(self.starvation_secs) }
    pub fn food_bonus(&self) -> Duration { Duration::from_secs_f64(self.food_bonus_secs) }
    pub fn frame(&self) -> Duration { Duration::from_secs_f64(1.0 / self.fps.max(1) as f64) }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub food: f64,
    pub hazard: f64,
    pub wall: f64,
    pub step: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self { food: 10.0, hazard: -100.0, wall: -100.0, step: -1.0 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub batch_size: usize,
    pub elite_count: usize,
    pub stagnation_threshold: u32,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self { batch_size: 3, elite_count: 3, stagnation_threshold: 5 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningConfig {
    pub epsilon: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub epsilon_boost: f64,
    pub epsilon_cap: f64,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self { epsilon: 0.1, alpha: 0.1, gamma: 0.9, epsilon_boost: 0.1, epsilon_cap: 1.0 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightedConfig {
    pub reward_scale: f64,
    pub mutation_rate: f64,
    pub mutation_strength: f64,
    pub burst_rate: f64,
    pub burst_strength: f64,
    pub reset_after: u32,
}

impl Default for WeightedConfig {
    fn default() -> Self {
        Self {
            reward_scale: 0.01,
            mutation_rate: 0.05,
            mutation_strength: 0.1,
            burst_rate: 1.0,
            burst_strength: 0.5,
            reset_after: 10,
        }
    }
}

impl SimConfig {
    /// Default board with a 20x20 bunker in every corner, each with a gap
    /// of four cells facing the middle.
    pub fn with_corner_bunkers() -> Self {
        let cfg = Self::default();
        Self { bunkers: Bunker::corners(cfg.rows, cfg.cols, 20, 4), ..cfg }
    }

    pub fn wall_cells(&self) -> AHashSet<Cell> {
        self.walls.iter().copied().chain(self.bunkers.iter().flat_map(|b| b.cells())).collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg: SimConfig = serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.rows > 0 && self.cols > 0, "grid must be at least 1x1, got {}x{}", self.rows, self.cols);
        ensure!(
            self.start.row >= 0 && self.start.row < self.rows && self.start.col >= 0 && self.start.col < self.cols,
            "start cell {:?} lies outside the grid",
            self.start
        );
        for b in &self.bunkers {
            ensure!(b.size >= 3, "bunker at {:?} must be at least 3 wide", b.top_left);
            ensure!((0..=b.size - 2).contains(&b.opening_width), "bunker at {:?} has an opening wider than its side", b.top_left);
        }
        ensure!(!self.wall_cells().contains(&self.start), "start cell {:?} is a wall", self.start);
        ensure!(self.timing.move_delay_secs > 0.0, "move_delay_secs must be > 0");
        ensure!(self.timing.starvation_secs > 0.0, "starvation_secs must be > 0");
        ensure!(self.timing.food_bonus_secs >= 0.0, "food_bonus_secs must be >= 0");
        ensure!(self.evolution.batch_size > 0, "batch_size must be > 0");
        ensure!(
            self.evolution.elite_count > 0 && self.evolution.elite_count <= self.evolution.batch_size,
            "elite_count must be in 1..={}",
            self.evolution.batch_size
        );
        let q = &self.q_learning;
        ensure!((0.0..=1.0).contains(&q.epsilon), "epsilon must be in [0, 1]");
        ensure!((0.0..=1.0).contains(&q.epsilon_cap), "epsilon_cap must be in [0, 1]");
        ensure!(q.alpha > 0.0 && q.alpha <= 1.0, "alpha must be in (0, 1]");
        ensure!((0.0..=1.0).contains(&q.gamma), "gamma must be in [0, 1]");
        let w = &self.weighted;
        ensure!((0.0..=1.0).contains(&w.mutation_rate), "mutation_rate must be in [0, 1]");
        ensure!((0.0..=1.0).contains(&w.burst_rate), "burst_rate must be in [0, 1]");
        ensure!(w.mutation_strength >= 0.0 && w.burst_strength >= 0.0, "mutation strengths must be >= 0");
        Ok(())
    }
}
