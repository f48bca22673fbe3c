//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod chain;
pub mod context;
pub mod grid;
pub mod obstacles;
pub mod occupancy;
pub mod scheduler;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod wanderer;

pub use chain::{ChainCreature, ChainDamage, ChainOutcome, ChainSegment, ChainState, ChainStep};
pub use context::SimContext;
pub use grid::{CellCoord, GridSpace};
pub use obstacles::{HitOutcome, Obstacle, ObstacleQuery, Obstacles, generate_layout};
pub use occupancy::{Mover, Occupancy};
pub use scheduler::StepScheduler;
pub use spawner::EnemySpawner;
pub use state::{CosmeticHook, DeferredAction, GameEvent, GamePhase, GameState, HitTarget};
pub use tick::{TickInput, tick};
pub use wanderer::{
    Behavior, BurstPhase, BurstSpeed, BurstStyle, CreatureDamage, CreatureKind, WandererStep,
    WanderingCreature, ZigzagLegs,
};
