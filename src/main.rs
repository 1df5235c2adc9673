use anyhow::{Result, ensure};
use clap::Parser;
use pacman_survival::policy::Policy;
use pacman_survival::{PolicyKind, QLearningPolicy, RunSummary, SimConfig, Simulation, TickReport, WeightedPolicy};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pacman-survival", about = "Pac-Man survival with elite learning")]
struct Args {
    /// JSON config; missing fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,
    #[arg(long, default_value_t = 30)]
    generations: u64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Divides the move delay; starvation stays in real seconds
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    /// Independent seeded runs, executed in parallel
    #[arg(long, default_value_t = 1)]
    runs: u64,
    /// Pace ticks against the wall clock instead of a virtual one
    #[arg(long)]
    realtime: bool,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::with_corner_bunkers(),
    };
    if let Some(kind) = args.policy {
        cfg.policy = kind;
    }
    ensure!(args.speed > 0.0, "speed must be > 0, got {}", args.speed);
    ensure!(args.runs > 0, "runs must be > 0");

    if args.realtime {
        ensure!(args.runs == 1, "--realtime drives a single simulation");
        let summary = match cfg.policy {
            PolicyKind::QLearning => realtime(Simulation::new(&cfg, QLearningPolicy::new(&cfg.q_learning), args.seed)?, &cfg, &args)?,
            PolicyKind::Weighted => realtime(Simulation::new(&cfg, WeightedPolicy::new(&cfg.weighted), args.seed)?, &cfg, &args)?,
        };
        return report(&[summary], args.json);
    }

    info!(runs = args.runs, generations = args.generations, policy = ?cfg.policy, "starting headless runs");
    let summaries = (args.seed..args.seed + args.runs)
        .into_par_iter()
        .map(|seed| headless(&cfg, seed, args.generations, args.speed))
        .collect::<Result<Vec<_>>>()?;
    report(&summaries, args.json)
}

fn headless(cfg: &SimConfig, seed: u64, generations: u64, speed: f64) -> Result<RunSummary> {
    let frame = cfg.timing.frame();
    Ok(match cfg.policy {
        PolicyKind::QLearning => Simulation::new(cfg, QLearningPolicy::new(&cfg.q_learning), seed)?.run_generations(generations, speed, frame),
        PolicyKind::Weighted => Simulation::new(cfg, WeightedPolicy::new(&cfg.weighted), seed)?.run_generations(generations, speed, frame),
    })
}

fn realtime<P: Policy>(mut sim: Simulation<P>, cfg: &SimConfig, args: &Args) -> Result<RunSummary> {
    let frame = cfg.timing.frame();
    let clock = Instant::now();
    let mut last_hud = Duration::ZERO;

    while sim.manager.ctx.generation < args.generations {
        let now = clock.elapsed();
        match sim.tick(now, args.speed) {
            TickReport::Reborn(r) => info!(generation = r.generation, survival_secs = r.survival.as_secs_f64(), new_record = r.new_record, "reborn"),
            TickReport::Tick(outcome) if outcome.is_fatal() => info!(?outcome, "died"),
            TickReport::Tick(_) => {}
        }

        if now.saturating_sub(last_hud) >= Duration::from_secs(1) {
            last_hud = now;
            let hud = sim.snapshot(now);
            if args.json {
                println!("{}", serde_json::to_string(&hud)?);
            } else {
                println!(
                    "GEN: {} | TIME LEFT: {}s | INTELLIGENCE: {} | RECORD: GEN {} SURVIVED {}s | VISITED: {} (max {})",
                    hud.generation,
                    hud.time_left_secs as u64,
                    hud.intelligence,
                    hud.record_generation,
                    hud.record_survival_secs as u64,
                    hud.visited_cells,
                    hud.hottest_visit
                );
            }
        }

        std::thread::sleep(frame.saturating_sub(clock.elapsed().saturating_sub(now)));
    }
    Ok(sim.summary(clock.elapsed()))
}

fn report(summaries: &[RunSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }
    for s in summaries {
        println!(
            "SEED {:>4} | GENERATIONS: {} | RECORD: GEN {} SURVIVED {:.1}s | FOOD: {} HAZARDS: {} WALLS: {} STARVED: {}",
            s.seed, s.generations, s.record_generation, s.record_survival_secs,
            s.stats.food_eaten, s.stats.hazards_hit, s.stats.walls_hit, s.stats.starved
        );
    }
    Ok(())
}
