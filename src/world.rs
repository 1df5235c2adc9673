use ahash::AHashSet;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, action: Action) -> Self {
        let (dr, dc) = action.delta();
        Self::new(self.row + dr, self.col + dc)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    pub fn delta(self) -> (i32, i32) {
        match self { Action::Up => (-1, 0), Action::Down => (1, 0), Action::Left => (0, -1), Action::Right => (0, 1) }
    }

    pub fn index(self) -> usize {
        match self { Action::Up => 0, Action::Down => 1, Action::Left => 2, Action::Right => 3 }
    }

    pub fn opposite(self) -> Action {
        match self { Action::Up => Action::Down, Action::Down => Action::Up, Action::Left => Action::Right, Action::Right => Action::Left }
    }
}

/// The walkable field the agent lives on. Blocking cells stay fixed; hazards
/// and food are consumed during a life and put back by [`GridWorld::restore`].
#[derive(Clone, Debug)]
pub struct GridWorld {
    pub rows: i32,
    pub cols: i32,
    pub walls: AHashSet<Cell>,
    pub hazards: AHashSet<Cell>,
    pub food: AHashSet<Cell>,
    initial_hazards: AHashSet<Cell>,
    initial_food: AHashSet<Cell>,
}

impl GridWorld {
    pub fn new(rows: i32, cols: i32, walls: AHashSet<Cell>, hazards: AHashSet<Cell>, food: AHashSet<Cell>) -> Self {
        Self {
            rows,
            cols,
            walls,
            initial_hazards: hazards.clone(),
            initial_food: food.clone(),
            hazards,
            food,
        }
    }

    pub fn contains(&self, c: Cell) -> bool {
        c.row >= 0 && c.row < self.rows && c.col >= 0 && c.col < self.cols
    }

    pub fn is_wall(&self, c: Cell) -> bool { self.walls.contains(&c) }
    pub fn is_hazard(&self, c: Cell) -> bool { self.hazards.contains(&c) }
    pub fn has_food(&self, c: Cell) -> bool { self.food.contains(&c) }

    // Returns true if food was there
    pub fn consume_food(&mut self, c: Cell) -> bool {
        self.food.remove(&c)
    }

    pub fn detonate_hazard(&mut self, c: Cell) -> bool {
        self.hazards.remove(&c)
    }

    pub fn restore(&mut self) {
        self.hazards = self.initial_hazards.clone();
        self.food = self.initial_food.clone();
    }
}

// ============================
// Bunkers
// ============================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Opening {
    Top,
    Bottom,
}

/// Square wall outline with a centered gap in its top or bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bunker {
    pub top_left: Cell,
    pub size: i32,
    pub opening: Opening,
    pub opening_width: i32,
}

impl Bunker {
    /// One bunker per grid corner, top pair open downward and bottom pair upward.
    pub fn corners(rows: i32, cols: i32, size: i32, opening_width: i32) -> Vec<Bunker> {
        [(0, 0, Opening::Bottom), (0, cols - size, Opening::Bottom), (rows - size, 0, Opening::Top), (rows - size, cols - size, Opening::Top)]
            .into_iter()
            .map(|(row, col, opening)| Bunker { top_left: Cell::new(row, col), size, opening, opening_width })
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let Cell { row: r0, col: c0 } = self.top_left;
        let (r1, c1) = (r0 + self.size - 1, c0 + self.size - 1);
        let gap_start = c0 + (self.size - self.opening_width) / 2;
        let gap_row = match self.opening {
            Opening::Top => r0,
            Opening::Bottom => r1,
        };
        (r0..=r1)
            .flat_map(move |r| (c0..=c1).map(move |c| Cell::new(r, c)))
            .filter(move |c| c.row == r0 || c.row == r1 || c.col == c0 || c.col == c1)
            .filter(move |c| !(c.row == gap_row && (gap_start..gap_start + self.opening_width).contains(&c.col)))
    }
}

// ============================
// Random layout
// ============================

pub struct WorldLayout;

impl WorldLayout {
    /// Scatters hazards and then food over free cells. Walls and the start
    /// cell are never used; counts clamp to however many cells are free.
    pub fn scatter<R: Rng + ?Sized>(
        rows: i32,
        cols: i32,
        walls: AHashSet<Cell>,
        start: Cell,
        hazard_count: usize,
        food_count: usize,
        rng: &mut R,
    ) -> GridWorld {
        let mut free: Vec<Cell> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| Cell::new(r, c)))
            .filter(|c| *c != start && !walls.contains(c))
            .collect();
        free.shuffle(rng);

        let hazard_count = hazard_count.min(free.len());
        let hazards: AHashSet<Cell> = free.drain(..hazard_count).collect();
        let food_count = food_count.min(free.len());
        let food: AHashSet<Cell> = free.drain(..food_count).collect();

        GridWorld::new(rows, cols, walls, hazards, food)
    }
}
