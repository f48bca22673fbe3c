//! Grid coordinate system
//!
//! Maps continuous world positions to integer cells and back. The grid is
//! built once per arena and never mutated afterward.

use glam::{IVec2, Vec2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Integer cell address `(x, y)`
pub type CellCoord = IVec2;

/// Immutable per-arena grid configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpace {
    cell_size: f32,
    width: i32,
    height: i32,
    /// World position of cell (0,0)'s lower-left corner
    origin: Vec2,
}

impl GridSpace {
    /// Create a grid from explicit dimensions. Negative sizes clamp to 0.
    pub fn new(cell_size: f32, width: i32, height: i32, origin: Vec2) -> Self {
        Self {
            cell_size,
            width: width.max(0),
            height: height.max(0),
            origin,
        }
    }

    /// Fit whole cells into a viewport minus `margin` on every side, centered
    /// on the world origin.
    pub fn from_viewport(view_width: f32, view_height: f32, margin: f32, cell_size: f32) -> Self {
        let available_w = view_width - margin * 2.0;
        let available_h = view_height - margin * 2.0;
        let width = (available_w / cell_size).floor().max(0.0) as i32;
        let height = (available_h / cell_size).floor().max(0.0) as i32;
        let origin = Vec2::new(
            -(width as f32 * cell_size) / 2.0,
            -(height as f32 * cell_size) / 2.0,
        );
        Self::new(cell_size, width, height, origin)
    }

    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub const fn width(&self) -> i32 {
        self.width
    }

    pub const fn height(&self) -> i32 {
        self.height
    }

    pub const fn origin(&self) -> Vec2 {
        self.origin
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// World-space center of the grid rectangle
    pub fn center(&self) -> Vec2 {
        self.origin + Vec2::new(self.width as f32, self.height as f32) * self.cell_size / 2.0
    }

    /// Cell containing the grid center
    pub fn center_cell(&self) -> CellCoord {
        self.world_to_grid(self.center())
    }

    /// World-space center of cell `cell`
    #[inline]
    pub fn grid_to_world(&self, cell: CellCoord) -> Vec2 {
        self.origin + cell.as_vec2() * self.cell_size + Vec2::splat(self.cell_size / 2.0)
    }

    /// Cell containing `pos` (may be outside the grid)
    #[inline]
    pub fn world_to_grid(&self, pos: Vec2) -> CellCoord {
        ((pos - self.origin) / self.cell_size).floor().as_ivec2()
    }

    /// Center of the cell containing `pos`
    #[inline]
    pub fn snap_to_grid(&self, pos: Vec2) -> Vec2 {
        self.grid_to_world(self.world_to_grid(pos))
    }

    #[inline]
    pub fn is_valid(&self, cell: CellCoord) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    #[inline]
    pub fn is_edge(&self, cell: CellCoord) -> bool {
        cell.x == 0 || cell.x == self.width - 1 || cell.y == 0 || cell.y == self.height - 1
    }

    fn ensure_cells(&self) -> Result<(), GridError> {
        if self.is_empty() {
            return Err(GridError::Empty {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Uniformly random cell anywhere on the grid
    pub fn random_cell<R: Rng>(&self, rng: &mut R) -> Result<CellCoord, GridError> {
        self.ensure_cells()?;
        Ok(IVec2::new(
            rng.random_range(0..self.width),
            rng.random_range(0..self.height),
        ))
    }

    /// Pick one of the four edges uniformly, then a cell uniformly along it
    pub fn random_edge_cell<R: Rng>(&self, rng: &mut R) -> Result<CellCoord, GridError> {
        self.ensure_cells()?;
        let cell = match rng.random_range(0..4) {
            // Top
            0 => IVec2::new(rng.random_range(0..self.width), self.height - 1),
            // Bottom
            1 => IVec2::new(rng.random_range(0..self.width), 0),
            // Left
            2 => IVec2::new(0, rng.random_range(0..self.height)),
            // Right
            _ => IVec2::new(self.width - 1, rng.random_range(0..self.height)),
        };
        Ok(cell)
    }

    /// Random edge cell for which `is_blocked` is false.
    ///
    /// Tries at most `max_attempts` candidates, then falls back to any edge
    /// cell.
    pub fn empty_edge_cell<R, F>(
        &self,
        rng: &mut R,
        max_attempts: u32,
        is_blocked: F,
    ) -> Result<CellCoord, GridError>
    where
        R: Rng,
        F: Fn(CellCoord) -> bool,
    {
        for _ in 0..max_attempts {
            let cell = self.random_edge_cell(rng)?;
            if !is_blocked(cell) {
                return Ok(cell);
            }
        }
        log::warn!("No empty edge cell after {} attempts, using any edge cell", max_attempts);
        self.random_edge_cell(rng)
    }

    /// Unit vector pointing out of the arena from an edge cell.
    ///
    /// Corner cells resolve top/bottom before left/right.
    pub fn outward_direction(&self, cell: CellCoord) -> IVec2 {
        if cell.y == self.height - 1 {
            IVec2::Y
        } else if cell.y == 0 {
            IVec2::NEG_Y
        } else if cell.x == 0 {
            IVec2::NEG_X
        } else if cell.x == self.width - 1 {
            IVec2::X
        } else {
            // Interior cells push away from the center
            let away = cell - self.center_cell();
            if away == IVec2::ZERO {
                IVec2::NEG_X
            } else {
                crate::dominant_step(away)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn ten_by_ten() -> GridSpace {
        GridSpace::new(1.0, 10, 10, Vec2::new(-5.0, -5.0))
    }

    #[test]
    fn test_origin_scenario() {
        let grid = ten_by_ten();
        assert_eq!(grid.grid_to_world(IVec2::new(0, 0)), Vec2::new(-4.5, -4.5));
        assert_eq!(grid.world_to_grid(Vec2::new(-4.5, -4.5)), IVec2::new(0, 0));
    }

    #[test]
    fn test_snap_to_grid() {
        let grid = ten_by_ten();
        assert_eq!(grid.snap_to_grid(Vec2::new(0.1, -0.9)), Vec2::new(0.5, -0.5));
        // Just below a cell boundary floors into the lower cell
        assert_eq!(grid.world_to_grid(Vec2::new(-0.0001, 0.0)), IVec2::new(4, 5));
    }

    #[test]
    fn test_from_viewport() {
        // 17.78 x 10 viewport, 0.5 margin: 16 x 9 whole cells
        let grid = GridSpace::from_viewport(17.78, 10.0, 0.5, 1.0);
        assert_eq!(grid.width(), 16);
        assert_eq!(grid.height(), 9);
        assert_eq!(grid.origin(), Vec2::new(-8.0, -4.5));
        assert_eq!(grid.center(), Vec2::ZERO);
    }

    #[test]
    fn test_from_viewport_too_small() {
        let grid = GridSpace::from_viewport(0.5, 0.5, 0.5, 1.0);
        assert!(grid.is_empty());
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(
            grid.random_edge_cell(&mut rng),
            Err(GridError::Empty { width: 0, height: 0 })
        );
    }

    #[test]
    fn test_edge_classification() {
        let grid = ten_by_ten();
        assert!(grid.is_edge(IVec2::new(0, 4)));
        assert!(grid.is_edge(IVec2::new(9, 9)));
        assert!(grid.is_edge(IVec2::new(3, 0)));
        assert!(!grid.is_edge(IVec2::new(1, 8)));
    }

    #[test]
    fn test_random_edge_cells_are_edges() {
        let grid = GridSpace::new(1.0, 7, 4, Vec2::ZERO);
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..200 {
            let cell = grid.random_edge_cell(&mut rng).unwrap();
            assert!(grid.is_valid(cell));
            assert!(grid.is_edge(cell));
        }
    }

    #[test]
    fn test_empty_edge_cell_avoids_blocked() {
        let grid = ten_by_ten();
        let mut rng = Pcg32::seed_from_u64(7);
        // Block everything except the left column
        let cell = grid.empty_edge_cell(&mut rng, 500, |c| c.x != 0).unwrap();
        assert_eq!(cell.x, 0);
    }

    #[test]
    fn test_empty_edge_cell_falls_back() {
        let grid = ten_by_ten();
        let mut rng = Pcg32::seed_from_u64(7);
        let cell = grid.empty_edge_cell(&mut rng, 20, |_| true).unwrap();
        assert!(grid.is_edge(cell));
    }

    #[test]
    fn test_outward_direction() {
        let grid = ten_by_ten();
        assert_eq!(grid.outward_direction(IVec2::new(4, 9)), IVec2::Y);
        assert_eq!(grid.outward_direction(IVec2::new(4, 0)), IVec2::NEG_Y);
        assert_eq!(grid.outward_direction(IVec2::new(0, 4)), IVec2::NEG_X);
        assert_eq!(grid.outward_direction(IVec2::new(9, 4)), IVec2::X);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            width in 1i32..64,
            height in 1i32..64,
            cell_size in 0.25f32..4.0,
            ox in -100.0f32..100.0,
            oy in -100.0f32..100.0,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let grid = GridSpace::new(cell_size, width, height, Vec2::new(ox, oy));
            let cell = IVec2::new(
                ((width as f64) * fx) as i32 % width,
                ((height as f64) * fy) as i32 % height,
            );
            prop_assert_eq!(grid.world_to_grid(grid.grid_to_world(cell)), cell);
        }

        #[test]
        fn prop_validity_matches_bounds(
            width in 0i32..32,
            height in 0i32..32,
            x in -40i32..40,
            y in -40i32..40,
        ) {
            let grid = GridSpace::new(1.0, width, height, Vec2::ZERO);
            let expected = 0 <= x && x < width && 0 <= y && y < height;
            prop_assert_eq!(grid.is_valid(IVec2::new(x, y)), expected);
        }
    }
}
