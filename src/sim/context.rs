//! Per-tick simulation context handed to every controller

use super::grid::{CellCoord, GridSpace};
use super::obstacles::ObstacleQuery;
use super::occupancy::Occupancy;

/// Read-only collaborators a controller may consult while stepping
#[derive(Clone, Copy)]
pub struct SimContext<'a> {
    pub grid: &'a GridSpace,
    pub obstacles: &'a dyn ObstacleQuery,
    /// Player's cell as of this tick
    pub player_cell: CellCoord,
    /// Whether the running wave is the last one
    pub is_final_wave: bool,
}

impl<'a> SimContext<'a> {
    pub fn new(
        grid: &'a GridSpace,
        obstacles: &'a dyn ObstacleQuery,
        player_cell: CellCoord,
        is_final_wave: bool,
    ) -> Self {
        Self {
            grid,
            obstacles,
            player_cell,
            is_final_wave,
        }
    }

    /// Occupancy view for the serpent's own moves. Its body never blocks
    /// itself, so no serpent cells are registered.
    pub fn occupancy(&self) -> Occupancy<'a> {
        Occupancy::new(self.grid, self.obstacles, std::iter::empty::<CellCoord>())
    }
}
