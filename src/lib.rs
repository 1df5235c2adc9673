//! Pac-Man survival learner: an agent on a grid that has to keep finding food,
//! learns its moves online and recombines the best of each batch of lives.

pub mod agent;
pub mod config;
pub mod episode;
pub mod generation;
pub mod policy;
pub mod sim;
pub mod visits;
pub mod world;

pub use agent::Agent;
pub use config::{PolicyKind, SimConfig};
pub use episode::{EpisodeController, TickOutcome};
pub use generation::{GenerationContext, GenerationManager};
pub use policy::{Policy, QLearningPolicy, WeightedPolicy};
pub use sim::{HudSnapshot, RunSummary, Simulation, TickReport};
pub use world::{Action, Bunker, Cell, GridWorld, Opening};
