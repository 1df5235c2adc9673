use crate::agent::Agent;
use crate::config::EvolutionConfig;
use crate::policy::{Policy, StagnationResponse};
use crate::world::Cell;
use rand::Rng;
use serde::Serialize;
use std::cmp::Reverse;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Snapshot of one finished life.
#[derive(Clone, Debug)]
pub struct EpisodeRecord<S> {
    pub generation: u64,
    pub survival: Duration,
    pub policy: S,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub generation: u64,
    pub survival: Duration,
}

/// Everything that outlives a single life.
#[derive(Clone, Debug)]
pub struct GenerationContext<S> {
    pub generation: u64,
    pub record: GenerationRecord,
    pub no_improvement: u32,
    pub stagnant_since_record: u32,
    pending: Vec<EpisodeRecord<S>>,
}

impl<S> GenerationContext<S> {
    pub fn new() -> Self {
        Self { generation: 0, record: GenerationRecord::default(), no_improvement: 0, stagnant_since_record: 0, pending: Vec::new() }
    }

    pub fn pending(&self) -> &[EpisodeRecord<S>] { &self.pending }

    /// `None` until some life has survived longer than zero.
    pub fn record_survival(&self) -> Option<Duration> {
        (!self.record.survival.is_zero()).then_some(self.record.survival)
    }
}

impl<S> Default for GenerationContext<S> {
    fn default() -> Self { Self::new() }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DeathReport {
    pub generation: u64,
    pub survival: Duration,
    pub new_record: bool,
    pub recombined: bool,
    pub stagnation: Option<StagnationResponse>,
}

pub struct GenerationManager<P: Policy> {
    pub ctx: GenerationContext<P::Snapshot>,
    cfg: EvolutionConfig,
    start: Cell,
}

impl<P: Policy> GenerationManager<P> {
    pub fn new(cfg: &EvolutionConfig, start: Cell) -> Self {
        Self { ctx: GenerationContext::new(), cfg: cfg.clone(), start }
    }

    /// Harvests a dead agent, folds it into the records, recombines once a
    /// full batch is pending and finally puts the agent back at the start.
    pub fn on_death<R: Rng + ?Sized>(&mut self, agent: &mut Agent<P>, now: Duration, rng: &mut R) -> DeathReport {
        let survival = agent.survival;
        let generation = self.ctx.generation;
        self.ctx.pending.push(EpisodeRecord { generation, survival, policy: agent.policy.snapshot() });

        let new_record = survival > self.ctx.record.survival;
        if new_record {
            info!(generation, survival_secs = survival.as_secs_f64(), "new survival record");
            self.ctx.record = GenerationRecord { generation, survival };
            self.ctx.no_improvement = 0;
            self.ctx.stagnant_since_record = 0;
        } else {
            self.ctx.no_improvement += 1;
            self.ctx.stagnant_since_record += 1;
        }
        self.ctx.generation += 1;
        debug!(generation, survival_secs = survival.as_secs_f64(), no_improvement = self.ctx.no_improvement, "death");

        // Stagnation is only looked at on batch boundaries, after the new
        // policy is in place.
        let recombined = self.ctx.pending.len() >= self.cfg.batch_size;
        let mut stagnation = None;
        if recombined {
            self.recombine(agent, rng);
            if self.ctx.no_improvement >= self.cfg.stagnation_threshold {
                let response = agent.policy.on_stagnation(self.ctx.stagnant_since_record, rng);
                warn!(?response, stagnant = self.ctx.stagnant_since_record, "no improvement, exploring harder");
                self.ctx.no_improvement = 0;
                if response == StagnationResponse::FullReset {
                    self.ctx.stagnant_since_record = 0;
                }
                stagnation = Some(response);
            }
        }

        agent.reset(self.start, now);
        DeathReport { generation, survival, new_record, recombined, stagnation }
    }

    fn recombine<R: Rng + ?Sized>(&mut self, agent: &mut Agent<P>, rng: &mut R) {
        self.ctx.pending.sort_by_key(|r| Reverse(r.survival));
        let elites: Vec<&P::Snapshot> = self.ctx.pending.iter().take(self.cfg.elite_count).map(|r| &r.policy).collect();
        let averaged = P::average(&elites);
        info!(
            elites = elites.len(),
            best_secs = self.ctx.pending[0].survival.as_secs_f64(),
            "recombined elite policies"
        );
        agent.policy.install(averaged);
        agent.policy.after_recombination(rng);
        self.ctx.pending.clear();
    }
}
