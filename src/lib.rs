//! Serpent Waves - a grid-quantized arena arcade simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, occupancy, creatures, wave flow)
//! - `tuning`: Data-driven game balance and the wave/difficulty feed
//! - `error`: Error types for the few fallible boundaries

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{GridError, TuningError};
pub use tuning::{DifficultyProfile, Tuning};

use glam::{IVec2, Vec2};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz is plenty for grid stepping)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Normalized component magnitude a direction must exceed to count on an axis
    pub const DIRECTION_THRESHOLD: f32 = 0.3;

    /// Extra head positions kept beyond the segment count
    pub const HISTORY_BUFFER: usize = 5;

    /// Attempts made when looking for a free edge cell before falling back
    pub const EDGE_SEARCH_ATTEMPTS: u32 = 20;

    /// Boss escalation
    pub const BOSS_MAX_HEALTH: u32 = 5;
    pub const BOSS_SPEED_MULTIPLIER: f32 = 1.5;
    pub const BOSS_SCALE: f32 = 2.0;

    /// Score awards
    pub const ESCAPE_BONUS: u64 = 500;
    pub const BOSS_BONUS: u64 = 1000;

    /// Rest between waves (seconds)
    pub const BREATHER_SECS: f32 = 2.0;
}

/// Quantize a displacement into a grid step direction.
///
/// The displacement is normalized first; each component whose magnitude
/// exceeds [`consts::DIRECTION_THRESHOLD`] contributes ±1, anything else 0.
/// A zero displacement yields `IVec2::ZERO`.
#[inline]
pub fn quantize_direction(delta: Vec2) -> IVec2 {
    let dir = delta.normalize_or_zero();
    let axis = |v: f32| {
        if v > consts::DIRECTION_THRESHOLD {
            1
        } else if v < -consts::DIRECTION_THRESHOLD {
            -1
        } else {
            0
        }
    };
    IVec2::new(axis(dir.x), axis(dir.y))
}

/// Single-axis unit step along the larger displacement component.
///
/// Ties go to the vertical axis; a zero vertical component steps down.
#[inline]
pub fn dominant_step(delta: IVec2) -> IVec2 {
    if delta.x.abs() > delta.y.abs() {
        IVec2::new(delta.x.signum(), 0)
    } else if delta.y > 0 {
        IVec2::Y
    } else {
        IVec2::NEG_Y
    }
}

/// Chebyshev (king-move) distance between two cells
#[inline]
pub fn chebyshev(a: IVec2, b: IVec2) -> i32 {
    let d = (a - b).abs();
    d.x.max(d.y)
}
