//! Game state and core simulation types
//!
//! Everything one run needs lives here: the arena, its occupants, the seeded
//! RNG, the event outbox and the deferred-action queue.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::chain::ChainCreature;
use super::context::SimContext;
use super::grid::{CellCoord, GridSpace};
use super::obstacles::{Obstacles, generate_layout};
use super::spawner::EnemySpawner;
use super::wanderer::WanderingCreature;
use crate::tuning::{Tuning, WaveParams};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Between-wave rest period
    Breather,
    /// Final-wave boss defeated
    Victory,
    /// Player caught
    GameOver,
}

/// Something the player can shoot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitTarget {
    /// The serpent (tail segment, or the boss head)
    Serpent,
    /// A wandering creature by id
    Creature(u32),
    /// The box on this cell
    Obstacle(CellCoord),
}

/// Presentation-only notifications
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CosmeticHook {
    Flash(HitTarget),
    Scale { factor: f32 },
}

/// Outbound notifications, drained once per tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    WaveStarted {
        wave: u32,
        segments: usize,
        is_final: bool,
    },
    DamageApplied {
        target: HitTarget,
        remaining: u32,
    },
    SegmentDestroyed {
        index: usize,
        remaining: usize,
    },
    RetreatStarted,
    BossModeEntered,
    WaveCleared {
        wave: u32,
        bonus: u64,
    },
    BossDefeated {
        bonus: u64,
    },
    PlayerCaught {
        cell: CellCoord,
    },
    CreatureKilled {
        id: u32,
        score: u64,
    },
    ObstacleDestroyed {
        cell: CellCoord,
        score: u64,
    },
    PlayerContact {
        id: u32,
        damage: f32,
    },
    Cosmetic(CosmeticHook),
}

/// Work scheduled for the start of the next tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    /// See whether the serpent head ended up next to the player
    CheckCatch,
}

/// Complete game state
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub grid: GridSpace,
    pub obstacles: Obstacles,
    /// The serpent, while one is alive
    pub chain: Option<ChainCreature>,
    /// Active wandering creatures (sorted by id for determinism)
    pub creatures: Vec<WanderingCreature>,
    pub spawner: EnemySpawner,
    /// Current wave (1-based)
    pub wave: u32,
    pub params: WaveParams,
    pub score: u64,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// Breather time left (seconds)
    pub breather_secs: f32,
    /// Player position in world space
    pub player_pos: Vec2,
    pub(crate) deferred: Vec<DeferredAction>,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Build the arena from `tuning` and start wave 1
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let grid = GridSpace::from_viewport(
            tuning.grid.view_width,
            tuning.grid.view_height,
            tuning.grid.margin,
            tuning.grid.cell_size,
        );
        let params = tuning
            .difficulty
            .wave_params(1, tuning.final_wave, tuning.grid.cell_size);
        let obstacles = Obstacles::new(&tuning.obstacles);

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            grid,
            obstacles,
            chain: None,
            creatures: Vec::new(),
            spawner: EnemySpawner::new(),
            wave: 1,
            params,
            score: 0,
            time_ticks: 0,
            phase: GamePhase::Playing,
            breather_secs: 0.0,
            player_pos: grid.center(),
            deferred: Vec::new(),
            events: Vec::new(),
        };
        state.start_wave(1);
        state
    }

    /// Set up `wave`: fresh layout, fresh serpent, spawner reset
    pub fn start_wave(&mut self, wave: u32) {
        self.wave = wave;
        self.params = self
            .tuning
            .difficulty
            .wave_params(wave, self.tuning.final_wave, self.grid.cell_size());
        self.obstacles = generate_layout(
            &self.grid,
            &self.tuning.obstacles,
            self.params.box_density,
            &mut self.rng,
        );
        self.creatures.clear();
        self.deferred.clear();
        self.spawner.configure(&self.params);

        let ctx = SimContext::new(
            &self.grid,
            &self.obstacles,
            self.player_cell(),
            self.params.is_final,
        );
        self.chain = match ChainCreature::spawn(
            &ctx,
            self.params.segment_count,
            self.params.chain_steps_per_second,
            &self.tuning.chain,
            &mut self.rng,
        ) {
            Ok(chain) => Some(chain),
            Err(e) => {
                log::warn!("Serpent spawn skipped: {}", e);
                None
            }
        };

        self.phase = GamePhase::Playing;
        log::info!(
            "Wave {} started: {} segments, {:.2} steps/s, {} boxes{}",
            wave,
            self.params.segment_count,
            self.params.chain_steps_per_second,
            self.obstacles.len(),
            if self.params.is_final { " (final)" } else { "" }
        );
        self.push_event(GameEvent::WaveStarted {
            wave,
            segments: self.params.segment_count,
            is_final: self.params.is_final,
        });
    }

    /// Cell under the player
    pub fn player_cell(&self) -> CellCoord {
        self.grid.world_to_grid(self.player_pos)
    }

    pub fn is_final_wave(&self) -> bool {
        self.params.is_final
    }

    /// Cells wandering creatures must avoid this tick
    pub fn serpent_cells(&self) -> Vec<CellCoord> {
        self.chain
            .iter()
            .flat_map(|chain| chain.occupied_cells())
            .collect()
    }

    pub fn creature(&self, id: u32) -> Option<&WanderingCreature> {
        self.creatures.iter().find(|c| c.id == id)
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::Victory | GamePhase::GameOver)
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Place a serpent by hand (tests and tools). The spawn search is skipped.
    pub fn place_chain(&mut self, head: CellCoord, segments: usize) {
        let ctx = SimContext::new(
            &self.grid,
            &self.obstacles,
            self.player_cell(),
            self.params.is_final,
        );
        self.chain = Some(ChainCreature::spawn_at(
            head,
            &ctx,
            segments,
            self.params.chain_steps_per_second,
            &self.tuning.chain,
            &mut self.rng,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_wave_one() {
        let mut state = GameState::new(Tuning::default(), 42);
        assert_eq!(state.wave, 1);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.grid.width(), 31);
        assert_eq!(state.grid.height(), 17);

        let chain = state.chain.as_ref().unwrap();
        assert_eq!(chain.segment_count(), 10);
        assert!(state.grid.is_edge(chain.head()));
        assert!(!state.obstacles.contains(chain.head()));

        let events = state.drain_events();
        assert_eq!(
            events,
            vec![GameEvent::WaveStarted {
                wave: 1,
                segments: 10,
                is_final: false
            }]
        );
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_player_starts_on_center_cell() {
        let state = GameState::new(Tuning::default(), 1);
        assert_eq!(state.player_cell(), state.grid.center_cell());
    }

    #[test]
    fn test_wave_layout_keeps_player_clear() {
        let state = GameState::new(Tuning::default(), 7);
        let center = state.grid.center_cell();
        for cell in state.obstacles.cells() {
            assert!(crate::chebyshev(cell, center) >= 4);
        }
    }

    #[test]
    fn test_empty_grid_skips_serpent() {
        let mut tuning = Tuning::default();
        tuning.grid.view_width = 0.5;
        let state = GameState::new(tuning, 3);
        assert!(state.grid.is_empty());
        assert!(state.chain.is_none());
    }

    #[test]
    fn test_serpent_cells_include_head() {
        let mut state = GameState::new(Tuning::default(), 9);
        state.place_chain(glam::IVec2::new(0, 5), 3);
        assert_eq!(state.serpent_cells(), vec![glam::IVec2::new(0, 5), glam::IVec2::new(0, 5)]);
    }
}
