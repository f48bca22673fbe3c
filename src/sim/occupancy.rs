//! Occupancy model and blocking policy
//!
//! A read-only view over the serpent's claimed cells and the obstacle layer.
//! Built once per tick *after* the serpent has published its path, so every
//! wandering creature in that tick sees the same state.

use std::collections::HashSet;

use glam::Vec2;

use super::grid::{CellCoord, GridSpace};
use super::obstacles::ObstacleQuery;

/// Who is asking: decides which occupant categories block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mover {
    /// The serpent avoids obstacles only, never its own body
    Serpent,
    /// The boss crushes obstacles, so only the arena bounds stop it
    Boss,
    /// Wandering creatures avoid obstacles and every serpent-claimed cell
    Wanderer,
}

/// Snapshot of what blocks movement this tick
pub struct Occupancy<'a> {
    grid: &'a GridSpace,
    obstacles: &'a dyn ObstacleQuery,
    serpent_cells: HashSet<CellCoord>,
}

impl<'a> Occupancy<'a> {
    pub fn new(
        grid: &'a GridSpace,
        obstacles: &'a dyn ObstacleQuery,
        serpent_cells: impl IntoIterator<Item = CellCoord>,
    ) -> Self {
        Self {
            grid,
            obstacles,
            serpent_cells: serpent_cells.into_iter().collect(),
        }
    }

    pub fn grid(&self) -> &GridSpace {
        self.grid
    }

    /// Is the cell under `pos` part of the serpent's occupancy set?
    pub fn is_occupied_by_snake(&self, pos: Vec2) -> bool {
        self.is_snake_cell(self.grid.world_to_grid(pos))
    }

    /// Is the cell under `pos` holding a static obstacle?
    pub fn is_occupied_by_obstacle(&self, pos: Vec2) -> bool {
        self.obstacles.is_obstacle(self.grid.world_to_grid(pos))
    }

    pub fn is_snake_cell(&self, cell: CellCoord) -> bool {
        self.serpent_cells.contains(&cell)
    }

    pub fn is_obstacle_cell(&self, cell: CellCoord) -> bool {
        self.obstacles.is_obstacle(cell)
    }

    /// Can `mover` step into `cell`?
    pub fn is_legal_for(&self, mover: Mover, cell: CellCoord) -> bool {
        if !self.grid.is_valid(cell) {
            return false;
        }
        match mover {
            Mover::Boss => true,
            Mover::Serpent => !self.is_obstacle_cell(cell),
            Mover::Wanderer => !self.is_obstacle_cell(cell) && !self.is_snake_cell(cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::obstacles::Obstacles;
    use crate::tuning::ObstacleTuning;
    use glam::IVec2;

    fn grid() -> GridSpace {
        GridSpace::new(1.0, 10, 10, Vec2::new(-5.0, -5.0))
    }

    #[test]
    fn test_snake_lookup_is_cell_based() {
        let grid = grid();
        let obstacles = Obstacles::new(&ObstacleTuning::default());
        let occupancy = Occupancy::new(&grid, &obstacles, [IVec2::new(3, 3)]);
        // Anywhere inside cell (3,3), not just its center
        assert!(occupancy.is_occupied_by_snake(Vec2::new(-1.9, -1.1)));
        assert!(occupancy.is_occupied_by_snake(grid.grid_to_world(IVec2::new(3, 3))));
        assert!(!occupancy.is_occupied_by_snake(Vec2::new(-1.0, -1.0)));
    }

    #[test]
    fn test_policy_per_mover() {
        let grid = grid();
        let mut obstacles = Obstacles::new(&ObstacleTuning::default());
        obstacles.place(IVec2::new(1, 1));
        let occupancy = Occupancy::new(&grid, &obstacles, [IVec2::new(2, 2)]);

        assert!(occupancy.is_occupied_by_obstacle(grid.grid_to_world(IVec2::new(1, 1))));

        // Obstacles block everyone but the boss
        assert!(!occupancy.is_legal_for(Mover::Serpent, IVec2::new(1, 1)));
        assert!(!occupancy.is_legal_for(Mover::Wanderer, IVec2::new(1, 1)));
        assert!(occupancy.is_legal_for(Mover::Boss, IVec2::new(1, 1)));
        // Serpent cells block wanderers only
        assert!(occupancy.is_legal_for(Mover::Serpent, IVec2::new(2, 2)));
        assert!(!occupancy.is_legal_for(Mover::Wanderer, IVec2::new(2, 2)));
        // Out of bounds blocks everyone
        assert!(!occupancy.is_legal_for(Mover::Serpent, IVec2::new(-1, 0)));
        assert!(!occupancy.is_legal_for(Mover::Wanderer, IVec2::new(10, 0)));
        assert!(!occupancy.is_legal_for(Mover::Boss, IVec2::new(0, 10)));
        // Free cell
        assert!(occupancy.is_legal_for(Mover::Wanderer, IVec2::new(5, 5)));
    }
}
