//! Data-driven game balance
//!
//! Every number the simulation consumes but does not own lives here: arena
//! size, creature speeds and health, obstacle density and the per-wave
//! difficulty curves. Defaults reproduce the shipped balance; any subset can
//! be overridden from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TuningError;

/// Arena sizing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridTuning {
    /// Visible world width
    pub view_width: f32,
    /// Visible world height
    pub view_height: f32,
    /// Border left free on every side
    pub margin: f32,
    pub cell_size: f32,
}

impl Default for GridTuning {
    fn default() -> Self {
        Self {
            view_width: 32.0,
            view_height: 18.0,
            margin: 0.5,
            cell_size: 1.0,
        }
    }
}

/// Serpent behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainTuning {
    /// Fewest patrol steps between random zigzags
    pub min_steps_before_zag: u32,
    /// Most patrol steps between random zigzags (inclusive)
    pub max_steps_before_zag: u32,
    /// Step rate multiplier while retreating
    pub retreat_speed_multiplier: f32,
}

impl Default for ChainTuning {
    fn default() -> Self {
        Self {
            min_steps_before_zag: 3,
            max_steps_before_zag: 8,
            retreat_speed_multiplier: 3.0,
        }
    }
}

/// Burst-mover (crawler) behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstTuning {
    pub health: u32,
    pub score: u64,
    /// Seconds spent idle between bursts
    pub pause_secs: f32,
    pub steps_per_burst: u32,
    pub slow_steps_per_second: f32,
    pub fast_steps_per_second: f32,
    pub contact_damage: f32,
}

impl Default for BurstTuning {
    fn default() -> Self {
        Self {
            health: 3,
            score: 10,
            pause_secs: 2.0,
            steps_per_burst: 5,
            slow_steps_per_second: 2.0,
            fast_steps_per_second: 5.0,
            contact_damage: 1.0,
        }
    }
}

/// Zigzag-mover (skitterer) behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigzagTuning {
    pub health: u32,
    pub score: u64,
    pub steps_per_second: f32,
    /// Steps taken on one leg before switching to the other
    pub toggle_every: u32,
    pub contact_damage: f32,
}

impl Default for ZigzagTuning {
    fn default() -> Self {
        Self {
            health: 3,
            score: 15,
            steps_per_second: 3.0,
            toggle_every: 2,
            contact_damage: 1.0,
        }
    }
}

/// Destructible boxes and their layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleTuning {
    /// Hits needed to destroy a box
    pub max_hits: u32,
    pub score: u64,
    /// No boxes within this many cells (Chebyshev) of the arena center
    pub player_safe_radius: u32,
    /// Minimum Chebyshev spacing between boxes
    pub min_box_distance: u32,
}

impl Default for ObstacleTuning {
    fn default() -> Self {
        Self {
            max_hits: 3,
            score: 5,
            player_safe_radius: 4,
            min_box_distance: 2,
        }
    }
}

/// Linear ramp between two difficulty levels, clamped outside them
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearCurve {
    pub from_level: f32,
    pub from_value: f32,
    pub to_level: f32,
    pub to_value: f32,
}

impl LinearCurve {
    pub const fn new(from_level: f32, from_value: f32, to_level: f32, to_value: f32) -> Self {
        Self {
            from_level,
            from_value,
            to_level,
            to_value,
        }
    }

    pub fn evaluate(&self, level: f32) -> f32 {
        let span = self.to_level - self.from_level;
        if span.abs() < f32::EPSILON {
            return self.from_value;
        }
        let t = ((level - self.from_level) / span).clamp(0.0, 1.0);
        self.from_value + (self.to_value - self.from_value) * t
    }
}

/// Per-wave numbers the simulation consumes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    pub wave: u32,
    /// Last wave: the serpent escalates instead of retreating
    pub is_final: bool,
    pub segment_count: usize,
    pub chain_steps_per_second: f32,
    pub enemy_spawn_rate: f32,
    pub enemy_cap: usize,
    pub burst_weight: f32,
    pub zigzag_weight: f32,
    pub box_density: f32,
}

/// The wave/difficulty feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyProfile {
    /// Serpent segments on wave 1; one more per later wave
    pub base_segments: u32,
    /// Highest difficulty level the curves are defined for
    pub max_level: u32,
    /// Serpent head speed (world units/sec)
    pub chain_speed: LinearCurve,
    /// Enemies per second
    pub enemy_spawn_rate: LinearCurve,
    pub enemy_cap: LinearCurve,
    pub burst_weight: LinearCurve,
    pub zigzag_weight: LinearCurve,
    /// Boxes per 100 cells
    pub box_density: LinearCurve,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self {
            base_segments: 10,
            max_level: 20,
            chain_speed: LinearCurve::new(1.0, 3.0, 20.0, 6.0),
            enemy_spawn_rate: LinearCurve::new(1.0, 0.4, 20.0, 1.2),
            enemy_cap: LinearCurve::new(1.0, 3.0, 20.0, 12.0),
            burst_weight: LinearCurve::new(1.0, 1.0, 20.0, 0.6),
            zigzag_weight: LinearCurve::new(1.0, 0.0, 20.0, 0.4),
            box_density: LinearCurve::new(1.0, 2.0, 20.0, 8.0),
        }
    }
}

impl DifficultyProfile {
    /// Difficulty climbs one level every two waves
    pub fn level_for_wave(&self, wave: u32) -> u32 {
        let level = 1 + wave.saturating_sub(1) / 2;
        level.clamp(1, self.max_level.max(1))
    }

    pub fn segments_for_wave(&self, wave: u32) -> usize {
        self.base_segments.saturating_add(wave.saturating_sub(1)) as usize
    }

    /// Everything the simulation needs to run `wave`
    pub fn wave_params(&self, wave: u32, final_wave: u32, cell_size: f32) -> WaveParams {
        let level = self.level_for_wave(wave) as f32;
        WaveParams {
            wave,
            is_final: wave >= final_wave,
            segment_count: self.segments_for_wave(wave),
            chain_steps_per_second: self.chain_speed.evaluate(level) / cell_size,
            enemy_spawn_rate: self.enemy_spawn_rate.evaluate(level),
            enemy_cap: self.enemy_cap.evaluate(level).round().max(0.0) as usize,
            burst_weight: self.burst_weight.evaluate(level).max(0.0),
            zigzag_weight: self.zigzag_weight.evaluate(level).max(0.0),
            box_density: self.box_density.evaluate(level).max(0.0),
        }
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub grid: GridTuning,
    pub chain: ChainTuning,
    pub burst: BurstTuning,
    pub zigzag: ZigzagTuning,
    pub obstacles: ObstacleTuning,
    pub difficulty: DifficultyProfile,
    /// Wave on which the serpent turns into the boss
    pub final_wave: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            grid: GridTuning::default(),
            chain: ChainTuning::default(),
            burst: BurstTuning::default(),
            zigzag: ZigzagTuning::default(),
            obstacles: ObstacleTuning::default(),
            difficulty: DifficultyProfile::default(),
            final_wave: 20,
        }
    }
}

impl Tuning {
    /// Parse and validate; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    pub fn to_json_pretty(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.grid.cell_size > 0.0) {
            return Err(TuningError::invalid("grid.cell_size", "must be > 0"));
        }
        if self.grid.margin < 0.0 {
            return Err(TuningError::invalid("grid.margin", "must be >= 0"));
        }
        if self.chain.min_steps_before_zag == 0 {
            return Err(TuningError::invalid("chain.min_steps_before_zag", "must be >= 1"));
        }
        if self.chain.min_steps_before_zag > self.chain.max_steps_before_zag {
            return Err(TuningError::invalid(
                "chain.max_steps_before_zag",
                format!(
                    "{} is below min_steps_before_zag {}",
                    self.chain.max_steps_before_zag, self.chain.min_steps_before_zag
                ),
            ));
        }
        if !(self.chain.retreat_speed_multiplier > 0.0) {
            return Err(TuningError::invalid("chain.retreat_speed_multiplier", "must be > 0"));
        }
        if self.burst.health == 0 || self.zigzag.health == 0 {
            return Err(TuningError::invalid("health", "creatures need at least 1 hit point"));
        }
        if !(self.burst.slow_steps_per_second > 0.0 && self.burst.fast_steps_per_second > 0.0) {
            return Err(TuningError::invalid("burst.*_steps_per_second", "must be > 0"));
        }
        if !(self.zigzag.steps_per_second > 0.0) {
            return Err(TuningError::invalid("zigzag.steps_per_second", "must be > 0"));
        }
        if self.zigzag.toggle_every == 0 {
            return Err(TuningError::invalid("zigzag.toggle_every", "must be >= 1"));
        }
        if self.obstacles.max_hits == 0 {
            return Err(TuningError::invalid("obstacles.max_hits", "must be >= 1"));
        }
        if self.final_wave == 0 {
            return Err(TuningError::invalid("final_wave", "must be >= 1"));
        }
        Ok(())
    }
}
