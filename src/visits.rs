use crate::world::Cell;
use ahash::AHashMap;
use std::time::Duration;

pub const MAX_VISIT_LEVEL: u8 = 5;
const IDLE_SECS: f64 = 60.0;
const DECAY_STEP_SECS: f64 = 30.0;

// Very slow speeds saturate instead of overflowing.
fn scaled(secs: f64, speed: f64) -> Duration {
    Duration::try_from_secs_f64(secs / speed.max(f64::EPSILON)).unwrap_or(Duration::MAX)
}

#[derive(Clone, Copy, Debug)]
struct CellVisits {
    level: u8,
    last_visit: Duration,
    last_decrement: Option<Duration>,
}

/// Display-side heat map of where the agent has been. Unlike the survival
/// timers, the fade-out here runs on the sped-up clock.
#[derive(Clone, Debug, Default)]
pub struct VisitMap {
    cells: AHashMap<Cell, CellVisits>,
}

impl VisitMap {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, cell: Cell, now: Duration) {
        let v = self.cells.entry(cell).or_insert(CellVisits { level: 0, last_visit: now, last_decrement: None });
        v.level = (v.level + 1).min(MAX_VISIT_LEVEL);
        v.last_visit = now;
        v.last_decrement = None;
    }

    pub fn level(&self, cell: Cell) -> u8 {
        self.cells.get(&cell).map_or(0, |v| v.level)
    }

    pub fn decay(&mut self, now: Duration, speed: f64) {
        let idle = scaled(IDLE_SECS, speed);
        let step = scaled(DECAY_STEP_SECS, speed);
        for v in self.cells.values_mut() {
            if v.level == 0 || now.saturating_sub(v.last_visit) < idle {
                continue;
            }
            let mut mark = v.last_decrement.unwrap_or(v.last_visit.saturating_add(idle));
            while v.level > 0 && now.saturating_sub(mark) >= step {
                v.level -= 1;
                mark += step;
            }
            v.last_decrement = Some(mark);
        }
        self.cells.retain(|_, v| v.level > 0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, u8)> + '_ {
        self.cells.iter().map(|(c, v)| (*c, v.level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration { Duration::from_secs_f64(s) }

    #[test]
    fn level_caps_at_five() {
        let mut m = VisitMap::new();
        let c = Cell::new(1, 1);
        for i in 0..8 { m.record(c, secs(i as f64)); }
        assert_eq!(m.level(c), MAX_VISIT_LEVEL);
    }

    #[test]
    fn fades_one_level_per_step_after_idle_window() {
        let mut m = VisitMap::new();
        let c = Cell::new(2, 3);
        m.record(c, secs(0.0));
        m.record(c, secs(0.0));
        m.record(c, secs(0.0));
        m.decay(secs(59.0), 1.0);
        assert_eq!(m.level(c), 3);
        // idle window ends at 60s, first decrement lands 30s later
        m.decay(secs(89.0), 1.0);
        assert_eq!(m.level(c), 3);
        m.decay(secs(90.0), 1.0);
        assert_eq!(m.level(c), 2);
        m.decay(secs(150.0), 1.0);
        assert_eq!(m.level(c), 0);
        assert_eq!(m.iter().count(), 0);
    }

    #[test]
    fn speed_shortens_the_fade() {
        let mut m = VisitMap::new();
        let c = Cell::new(0, 0);
        m.record(c, secs(0.0));
        m.decay(secs(45.0), 2.0);
        assert_eq!(m.level(c), 0);
    }

    #[test]
    fn tiny_speed_never_fades_and_does_not_panic() {
        let mut m = VisitMap::new();
        let c = Cell::new(0, 0);
        m.record(c, secs(0.0));
        m.decay(secs(1.0), 1e-18);
        m.decay(secs(1.0e6), f64::MIN_POSITIVE);
        assert_eq!(m.level(c), 1);
    }

    #[test]
    fn revisit_resets_the_fade() {
        let mut m = VisitMap::new();
        let c = Cell::new(0, 0);
        m.record(c, secs(0.0));
        m.record(c, secs(0.0));
        m.decay(secs(95.0), 1.0);
        assert_eq!(m.level(c), 1);
        m.record(c, secs(95.0));
        m.decay(secs(150.0), 1.0);
        assert_eq!(m.level(c), 2);
    }
}
