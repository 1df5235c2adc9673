use ahash::AHashSet;
use pacman_survival::config::QLearningConfig;
use pacman_survival::policy::{Decision, Policy};
use pacman_survival::{Action, Bunker, Cell, GridWorld, Opening, QLearningPolicy, SimConfig, Simulation, TickOutcome, TickReport, WeightedPolicy};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;

fn empty_world(rows: i32, cols: i32) -> GridWorld {
    GridWorld::new(rows, cols, AHashSet::new(), AHashSet::new(), AHashSet::new())
}

#[test]
fn every_visited_cell_has_all_four_actions() {
    let cfg = SimConfig { rows: 12, cols: 12, start: Cell::new(6, 6), hazard_count: 10, food_count: 20, ..SimConfig::default() };
    let mut sim = Simulation::new(&cfg, QLearningPolicy::new(&cfg.q_learning), 5).unwrap();
    sim.run_generations(9, 5.0, cfg.timing.frame());
    assert!(!sim.agent.policy.table().is_empty());
    for row in sim.agent.policy.table().values() {
        assert_eq!(row.len(), Action::ALL.len());
        assert!(row.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn weighted_vector_stays_normalized_through_generations() {
    let cfg = SimConfig { rows: 12, cols: 12, start: Cell::new(6, 6), hazard_count: 10, food_count: 20, ..SimConfig::default() };
    let mut sim = Simulation::new(&cfg, WeightedPolicy::new(&cfg.weighted), 8).unwrap();
    let mut now = Duration::ZERO;
    while sim.manager.ctx.generation < 12 {
        now += cfg.timing.frame();
        sim.tick(now, 5.0);
        let sum: f64 = sim.agent.policy.weights().iter().sum();
        assert!(sum == 0.0 || (sum - 1.0).abs() < 1e-9, "weights sum to {sum}");
    }
}

#[test]
fn reversal_allowed_only_from_a_dead_end() {
    let mut rng = SmallRng::seed_from_u64(21);
    let mut p = QLearningPolicy::new(&QLearningConfig { epsilon: 0.5, ..QLearningConfig::default() });
    let current = Cell::new(3, 3);
    let previous = Cell::new(4, 3);

    let open = Decision { current, previous: Some(previous), legal: &Action::ALL };
    for _ in 0..300 {
        assert_ne!(p.select_action(&open, &mut rng), Action::Down);
    }

    let dead_end = [Action::Down];
    let only_back = Decision { current, previous: Some(previous), legal: &dead_end };
    assert_eq!(p.select_action(&only_back, &mut rng), Action::Down);
}

#[test]
fn starvation_is_real_time_at_any_speed() {
    let cfg = SimConfig { rows: 400, cols: 400, start: Cell::new(200, 200), hazard_count: 0, food_count: 0, ..SimConfig::default() };
    for speed in [1.0, 3.0, 10.0] {
        let mut sim = Simulation::with_world(
            &cfg,
            empty_world(400, 400),
            QLearningPolicy::new(&cfg.q_learning),
            1,
            SmallRng::seed_from_u64(1),
        );
        let mut now = Duration::ZERO;
        let starved_at = loop {
            now += Duration::from_millis(10);
            if let TickReport::Tick(TickOutcome::Starved) = sim.tick(now, speed) {
                break now;
            }
            assert!(sim.agent.alive, "died early at speed {speed}");
        };
        assert_eq!(starved_at, Duration::from_secs(20));
    }
}

#[test]
fn boundary_step_kills_without_moving() {
    let cfg = SimConfig { rows: 1, cols: 1, start: Cell::new(0, 0), hazard_count: 0, food_count: 0, ..SimConfig::default() };
    let mut sim = Simulation::new(&cfg, QLearningPolicy::new(&cfg.q_learning), 2).unwrap();
    let report = sim.tick(Duration::from_secs(1), 1.0);
    assert!(matches!(report, TickReport::Tick(TickOutcome::HitWall(_))));
    assert!(!sim.agent.alive);
    assert_eq!(sim.agent.position, Cell::new(0, 0));
}

#[test]
fn elite_mean_of_three_lives() {
    let cfg = SimConfig { rows: 10, cols: 10, start: Cell::new(5, 5), hazard_count: 0, food_count: 0, ..SimConfig::default() };
    let mut sim = Simulation::with_world(&cfg, empty_world(10, 10), QLearningPolicy::new(&cfg.q_learning), 0, SmallRng::seed_from_u64(0));
    let corner = Cell::new(9, 9);
    for (i, v) in [0.2, 0.3, 0.4].into_iter().enumerate() {
        sim.agent.policy.install([(corner, [0.0, 0.0, v, 0.0])].into_iter().collect());
        sim.agent.survival = Duration::from_secs(1 + i as u64);
        sim.agent.alive = false;
        assert!(matches!(sim.tick(Duration::from_secs(30), 1.0), TickReport::Reborn(_)));
    }
    let got = sim.agent.policy.action_values(corner).unwrap()[Action::Left.index()];
    assert!((got - 0.3).abs() < 1e-12);
    assert_eq!(sim.manager.ctx.generation, 3);
    assert_eq!(sim.manager.ctx.record.generation, 2);
    assert_eq!(sim.agent.position, cfg.start);
}

#[test]
fn bunker_outline_kills_like_any_wall() {
    // 3x3 bunker whose only free cell is the start; the sole gap is straight down
    let bunker = Bunker { top_left: Cell::new(0, 0), size: 3, opening: Opening::Bottom, opening_width: 1 };
    let cfg = SimConfig { rows: 8, cols: 8, start: Cell::new(1, 1), bunkers: vec![bunker], hazard_count: 0, food_count: 0, ..SimConfig::default() };
    let walls = cfg.wall_cells();
    let mut bunker_deaths = 0;
    for seed in 0..20 {
        let mut sim = Simulation::new(&cfg, QLearningPolicy::new(&cfg.q_learning), seed).unwrap();
        let report = sim.tick(Duration::from_secs(1), 1.0);
        if let TickReport::Tick(TickOutcome::HitWall(c)) = report {
            assert!(walls.contains(&c) && sim.world.is_wall(c));
            assert_eq!(sim.stats.walls_hit, 1);
            bunker_deaths += 1;
        } else {
            assert_eq!(sim.agent.position, Cell::new(2, 1), "{report:?}");
        }
    }
    assert!(bunker_deaths > 0);
}
