//! Wandering creatures: the burst-mover and the zigzag-mover
//!
//! Both head for a target cell (the arena center) one grid step at a time and
//! never enter a cell the serpent has claimed or an obstacle holds. Neither
//! blocks anything else.

use glam::IVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::grid::CellCoord;
use super::occupancy::{Mover, Occupancy};
use super::scheduler::StepScheduler;
use crate::quantize_direction;
use crate::tuning::{BurstTuning, ZigzagTuning};

/// Archetype tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CreatureKind {
    Burst,
    Zigzag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstSpeed {
    Slow,
    Fast,
}

/// How a burst picks its heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstStyle {
    /// Both axes may contribute (8-way)
    Diagonal,
    /// Dominant axis only (4-way)
    Lateral,
}

/// Burst-mover phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BurstPhase {
    Pause {
        remaining_secs: f32,
    },
    Burst {
        steps_remaining: u32,
        speed: BurstSpeed,
        style: BurstStyle,
        dir: IVec2,
    },
}

/// Zigzag-mover legs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZigzagLegs {
    pub primary: IVec2,
    pub secondary: IVec2,
    pub steps_on_leg: u32,
    pub on_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    Burst {
        tuning: BurstTuning,
        phase: BurstPhase,
    },
    Zigzag {
        tuning: ZigzagTuning,
        legs: ZigzagLegs,
    },
}

/// What an update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandererStep {
    Idle,
    Moved { from: CellCoord, to: CellCoord },
    /// Destination illegal; stayed on `at`
    Blocked { at: CellCoord },
}

/// Result of one damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureDamage {
    Damaged { remaining: u32 },
    Killed { score: u64 },
}

/// A wandering creature entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanderingCreature {
    pub id: u32,
    pub cell: CellCoord,
    pub health: u32,
    pub max_health: u32,
    pub score: u64,
    /// Damage dealt to the player on contact
    pub contact_damage: f32,
    pub behavior: Behavior,
    scheduler: StepScheduler,
}

impl WanderingCreature {
    pub fn burst(id: u32, cell: CellCoord, tuning: &BurstTuning) -> Self {
        Self {
            id,
            cell,
            health: tuning.health,
            max_health: tuning.health,
            score: tuning.score,
            contact_damage: tuning.contact_damage,
            // Zero pause: the first update starts a burst
            behavior: Behavior::Burst {
                tuning: *tuning,
                phase: BurstPhase::Pause {
                    remaining_secs: 0.0,
                },
            },
            scheduler: StepScheduler::new(),
        }
    }

    pub fn zigzag(id: u32, cell: CellCoord, tuning: &ZigzagTuning) -> Self {
        Self {
            id,
            cell,
            health: tuning.health,
            max_health: tuning.health,
            score: tuning.score,
            contact_damage: tuning.contact_damage,
            behavior: Behavior::Zigzag {
                tuning: *tuning,
                legs: ZigzagLegs {
                    primary: IVec2::ZERO,
                    secondary: IVec2::ZERO,
                    steps_on_leg: 0,
                    on_primary: true,
                },
            },
            scheduler: StepScheduler::new(),
        }
    }

    pub fn kind(&self) -> CreatureKind {
        match self.behavior {
            Behavior::Burst { .. } => CreatureKind::Burst,
            Behavior::Zigzag { .. } => CreatureKind::Zigzag,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Burst phase, if this is a burst-mover
    pub fn burst_phase(&self) -> Option<BurstPhase> {
        match self.behavior {
            Behavior::Burst { phase, .. } => Some(phase),
            Behavior::Zigzag { .. } => None,
        }
    }

    /// Advance time by `dt` and take a step if one is due
    pub fn update<R: Rng>(
        &mut self,
        dt: f32,
        occupancy: &Occupancy<'_>,
        target: CellCoord,
        rng: &mut R,
    ) -> WandererStep {
        match &mut self.behavior {
            Behavior::Burst { tuning, phase } => match phase {
                BurstPhase::Pause { remaining_secs } => {
                    *remaining_secs -= dt;
                    if *remaining_secs <= 0.0 {
                        let speed = if rng.random_bool(0.5) {
                            BurstSpeed::Slow
                        } else {
                            BurstSpeed::Fast
                        };
                        let style = if rng.random_bool(0.5) {
                            BurstStyle::Diagonal
                        } else {
                            BurstStyle::Lateral
                        };
                        self.begin_burst(speed, style, target);
                    }
                    WandererStep::Idle
                }
                BurstPhase::Burst { speed, .. } => {
                    let rate = match speed {
                        BurstSpeed::Slow => tuning.slow_steps_per_second,
                        BurstSpeed::Fast => tuning.fast_steps_per_second,
                    };
                    if self.scheduler.advance(dt, rate) {
                        self.step(occupancy, target)
                    } else {
                        WandererStep::Idle
                    }
                }
            },
            Behavior::Zigzag { tuning, .. } => {
                let rate = tuning.steps_per_second;
                if self.scheduler.advance(dt, rate) {
                    self.step(occupancy, target)
                } else {
                    WandererStep::Idle
                }
            }
        }
    }

    /// Start a burst with the given rolls, aimed at `target`
    pub fn begin_burst(&mut self, speed: BurstSpeed, style: BurstStyle, target: CellCoord) {
        let Behavior::Burst { tuning, phase } = &mut self.behavior else {
            return;
        };
        let toward = quantize_direction((target - self.cell).as_vec2());
        let dir = match style {
            BurstStyle::Diagonal => toward,
            BurstStyle::Lateral => dominant_axis(target - self.cell),
        };
        *phase = BurstPhase::Burst {
            steps_remaining: tuning.steps_per_burst.max(1),
            speed,
            style,
            dir,
        };
        self.scheduler.reset();
        log::debug!(
            "Creature {} bursting {:?}/{:?} toward ({}, {})",
            self.id,
            speed,
            style,
            dir.x,
            dir.y
        );
    }

    /// Take one step now, regardless of the scheduler.
    ///
    /// Burst-movers outside a burst stay idle.
    pub fn step(&mut self, occupancy: &Occupancy<'_>, target: CellCoord) -> WandererStep {
        let cell = self.cell;
        match &mut self.behavior {
            Behavior::Burst { tuning, phase } => {
                let BurstPhase::Burst {
                    steps_remaining,
                    dir,
                    ..
                } = phase
                else {
                    return WandererStep::Idle;
                };
                let dir = *dir;
                // Blocked attempts still count toward the burst
                *steps_remaining = steps_remaining.saturating_sub(1);
                if *steps_remaining == 0 {
                    *phase = BurstPhase::Pause {
                        remaining_secs: tuning.pause_secs,
                    };
                }
                if dir == IVec2::ZERO {
                    return WandererStep::Idle;
                }
                let next = cell + dir;
                if occupancy.is_legal_for(Mover::Wanderer, next) {
                    self.cell = next;
                    WandererStep::Moved { from: cell, to: next }
                } else {
                    WandererStep::Blocked { at: cell }
                }
            }
            Behavior::Zigzag { tuning, legs } => {
                if legs.primary == IVec2::ZERO {
                    split_legs(legs, target - cell);
                }
                let dir = if legs.on_primary {
                    legs.primary
                } else {
                    legs.secondary
                };
                if dir == IVec2::ZERO {
                    return WandererStep::Idle;
                }

                let next = cell + dir;
                if !occupancy.is_legal_for(Mover::Wanderer, next) {
                    split_legs(legs, target - cell);
                    legs.on_primary = !legs.on_primary;
                    legs.steps_on_leg = 0;
                    return WandererStep::Blocked { at: cell };
                }

                self.cell = next;
                legs.steps_on_leg += 1;
                if legs.steps_on_leg >= tuning.toggle_every.max(1) {
                    split_legs(legs, target - next);
                    legs.on_primary = !legs.on_primary;
                    legs.steps_on_leg = 0;
                }
                WandererStep::Moved { from: cell, to: next }
            }
        }
    }

    /// Apply one hit
    pub fn apply_damage(&mut self) -> CreatureDamage {
        self.health = self.health.saturating_sub(1);
        if self.health == 0 {
            CreatureDamage::Killed { score: self.score }
        } else {
            CreatureDamage::Damaged {
                remaining: self.health,
            }
        }
    }
}

/// Unit step along the larger component of `delta`; zero when `delta` is zero
fn dominant_axis(delta: IVec2) -> IVec2 {
    if delta == IVec2::ZERO {
        IVec2::ZERO
    } else if delta.x.abs() >= delta.y.abs() {
        IVec2::new(delta.x.signum(), 0)
    } else {
        IVec2::new(0, delta.y.signum())
    }
}

/// Primary leg along the dominant axis, secondary along the other. With no
/// offset on the minor axis the secondary repeats the primary.
fn split_legs(legs: &mut ZigzagLegs, delta: IVec2) {
    let primary = dominant_axis(delta);
    let secondary = if primary.x != 0 {
        IVec2::new(0, delta.y.signum())
    } else {
        IVec2::new(delta.x.signum(), 0)
    };
    legs.primary = primary;
    legs.secondary = if secondary == IVec2::ZERO {
        primary
    } else {
        secondary
    };
}
