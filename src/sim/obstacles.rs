//! Static prop layer: destructible boxes on grid cells
//!
//! Boxes block movement until they take enough hits. The layout generator
//! scatters them with a seeded RNG, keeping clear of the player's spawn.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::{CellCoord, GridSpace};
use crate::chebyshev;
use crate::tuning::ObstacleTuning;

/// Anything that can answer "is there a static obstacle in this cell?"
pub trait ObstacleQuery {
    fn is_obstacle(&self, cell: CellCoord) -> bool;
}

impl<F: Fn(CellCoord) -> bool> ObstacleQuery for F {
    fn is_obstacle(&self, cell: CellCoord) -> bool {
        self(cell)
    }
}

/// A destructible box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub hits: u32,
    pub max_hits: u32,
    pub score: u64,
}

impl Obstacle {
    pub fn remaining(&self) -> u32 {
        self.max_hits.saturating_sub(self.hits)
    }
}

/// Result of hitting a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Nothing there
    Miss,
    Damaged { remaining: u32 },
    Destroyed { score: u64 },
}

/// All boxes in the arena, keyed by cell
#[derive(Debug, Clone, Default)]
pub struct Obstacles {
    boxes: HashMap<CellCoord, Obstacle>,
    max_hits: u32,
    score: u64,
}

impl Obstacles {
    pub fn new(tuning: &ObstacleTuning) -> Self {
        Self {
            boxes: HashMap::new(),
            max_hits: tuning.max_hits.max(1),
            score: tuning.score,
        }
    }

    /// Place a fresh box. Returns false if the cell already has one.
    pub fn place(&mut self, cell: CellCoord) -> bool {
        if self.boxes.contains_key(&cell) {
            return false;
        }
        self.boxes.insert(
            cell,
            Obstacle {
                hits: 0,
                max_hits: self.max_hits,
                score: self.score,
            },
        );
        true
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        self.boxes.contains_key(&cell)
    }

    pub fn get(&self, cell: CellCoord) -> Option<&Obstacle> {
        self.boxes.get(&cell)
    }

    /// Apply one hit to the box at `cell`
    pub fn hit(&mut self, cell: CellCoord) -> HitOutcome {
        let Some(obstacle) = self.boxes.get_mut(&cell) else {
            return HitOutcome::Miss;
        };
        obstacle.hits += 1;
        if obstacle.hits >= obstacle.max_hits {
            let score = obstacle.score;
            self.boxes.remove(&cell);
            HitOutcome::Destroyed { score }
        } else {
            HitOutcome::Damaged {
                remaining: obstacle.remaining(),
            }
        }
    }

    /// Remove the box at `cell` regardless of its remaining hits
    pub fn destroy(&mut self, cell: CellCoord) -> Option<Obstacle> {
        self.boxes.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    /// Occupied cells (unordered)
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.boxes.keys().copied()
    }
}

impl ObstacleQuery for Obstacles {
    fn is_obstacle(&self, cell: CellCoord) -> bool {
        self.contains(cell)
    }
}

/// Scatter boxes over the grid.
///
/// Box count is `cells / 100 * density`. Candidates inside the player safe
/// radius (around the grid center) or too close to an existing box are
/// rejected; at most `count * 10` candidates are drawn.
pub fn generate_layout<R: Rng>(
    grid: &GridSpace,
    tuning: &ObstacleTuning,
    density: f32,
    rng: &mut R,
) -> Obstacles {
    let mut obstacles = Obstacles::new(tuning);
    if grid.is_empty() {
        log::warn!("Skipping layout generation on an empty grid");
        return obstacles;
    }

    let count = ((grid.cell_count() as f32 / 100.0) * density.max(0.0)).round() as usize;
    let player_cell = grid.center_cell();
    let safe_radius = tuning.player_safe_radius as i32;
    let max_attempts = count * 10;

    let mut placed: Vec<CellCoord> = Vec::with_capacity(count);
    let mut attempts = 0;
    while placed.len() < count && attempts < max_attempts {
        attempts += 1;
        let Ok(cell) = grid.random_cell(rng) else {
            break;
        };
        if chebyshev(cell, player_cell) < safe_radius {
            continue;
        }
        let too_close = placed
            .iter()
            .any(|&other| chebyshev(cell, other) < tuning.min_box_distance as i32);
        if !too_close {
            placed.push(cell);
        }
    }

    for cell in &placed {
        obstacles.place(*cell);
    }
    log::debug!(
        "Layout: {} boxes placed ({} wanted, {} attempts)",
        placed.len(),
        count,
        attempts
    );
    obstacles
}
