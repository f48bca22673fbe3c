//! Enemy spawner
//!
//! Rate-limited, capped spawning of wandering creatures on free edge cells.
//! The archetype is picked by weight each time a spawn fires.

use rand::Rng;

use super::occupancy::{Mover, Occupancy};
use super::scheduler::StepScheduler;
use super::wanderer::{CreatureKind, WanderingCreature};
use crate::consts::EDGE_SEARCH_ATTEMPTS;
use crate::tuning::{Tuning, WaveParams};

#[derive(Debug, Clone, Default)]
pub struct EnemySpawner {
    scheduler: StepScheduler,
    /// Spawns per second
    spawn_rate: f32,
    cap: usize,
    burst_weight: f32,
    zigzag_weight: f32,
    next_id: u32,
}

impl EnemySpawner {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Load a wave's numbers and restart the spawn clock. Ids keep counting.
    pub fn configure(&mut self, params: &WaveParams) {
        self.spawn_rate = params.enemy_spawn_rate;
        self.cap = params.enemy_cap;
        self.burst_weight = params.burst_weight;
        self.zigzag_weight = params.zigzag_weight;
        self.scheduler.reset();
    }

    /// Weighted archetype roll. `None` when both weights are zero.
    pub fn choose_kind<R: Rng>(&self, rng: &mut R) -> Option<CreatureKind> {
        let total = self.burst_weight + self.zigzag_weight;
        if !(total > 0.0) {
            return None;
        }
        let roll = rng.random_range(0.0..total);
        if roll < self.burst_weight {
            Some(CreatureKind::Burst)
        } else {
            Some(CreatureKind::Zigzag)
        }
    }

    /// Advance the spawn clock; return a fresh creature when one is due and
    /// there is room for it.
    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        active: usize,
        occupancy: &Occupancy<'_>,
        tuning: &Tuning,
        rng: &mut R,
    ) -> Option<WanderingCreature> {
        if active >= self.cap {
            return None;
        }
        if !self.scheduler.advance(dt, self.spawn_rate) {
            return None;
        }
        let kind = self.choose_kind(rng)?;

        let cell = match occupancy.grid().empty_edge_cell(rng, EDGE_SEARCH_ATTEMPTS, |cell| {
            !occupancy.is_legal_for(Mover::Wanderer, cell)
        }) {
            Ok(cell) => cell,
            Err(e) => {
                log::warn!("Skipping spawn: {}", e);
                return None;
            }
        };
        if !occupancy.is_legal_for(Mover::Wanderer, cell) {
            log::warn!("Skipping spawn: no free edge cell");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        log::debug!("Spawning {:?} #{} at ({}, {})", kind, id, cell.x, cell.y);
        Some(match kind {
            CreatureKind::Burst => WanderingCreature::burst(id, cell, &tuning.burst),
            CreatureKind::Zigzag => WanderingCreature::zigzag(id, cell, &tuning.zigzag),
        })
    }
}
