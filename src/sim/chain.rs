//! The serpent: a head cell trailed by segments through a position history
//!
//! State machine:
//!
//! ```text
//! Approach -> Patrol --(last segment lost)--> Retreating -> escaped
//!                   \--(last segment lost, final wave)--> BossMode -> defeated
//! ```
//!
//! Segments carry no position of their own. Segment `i` sits wherever the head
//! was `i + 1` steps ago, read from the position history. The path (every cell
//! visited) doubles as the occupancy set other creatures avoid and as the trail
//! the serpent replays backwards when it retreats.

use std::collections::VecDeque;

use glam::IVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::context::SimContext;
use super::grid::CellCoord;
use super::occupancy::Mover;
use super::scheduler::StepScheduler;
use crate::consts::{
    BOSS_MAX_HEALTH, BOSS_SCALE, BOSS_SPEED_MULTIPLIER, EDGE_SEARCH_ATTEMPTS, HISTORY_BUFFER,
};
use crate::error::GridError;
use crate::tuning::ChainTuning;
use crate::{chebyshev, dominant_step, quantize_direction};

/// Behaviour state of the serpent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainState {
    /// Just spawned, choosing a heading
    Approach,
    /// Zigzagging across the arena toward the player
    Patrol,
    /// Out of segments, replaying its path backwards to escape
    Retreating,
    /// Final-wave escalation: direct pursuit, needs extra hits
    BossMode,
}

/// One body unit. Index 0 is nearest the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSegment {
    pub index: usize,
}

/// How the serpent's life ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainOutcome {
    Escaped,
    Defeated,
    CaughtPlayer,
}

/// What a scheduled step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStep {
    /// Scheduler did not fire this pass
    Idle,
    /// Step consumed by a stun
    Paused { remaining: u32 },
    /// Head advanced. `crush` is set when a boss step lands on an obstacle.
    Moved {
        from: CellCoord,
        to: CellCoord,
        crush: Option<CellCoord>,
    },
    /// Every candidate cell was illegal; stayed put
    Blocked,
    /// Retreat moved the head one cell back along its path
    Retreated { to: CellCoord },
    /// Path exhausted: the serpent is gone
    Escaped,
}

/// Result of one damage event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDamage {
    /// Nothing to damage (finished, or retreating with no segments)
    Ignored,
    /// Tail segment removed; `entered` is set when this hit changed state
    SegmentLost {
        index: usize,
        remaining: usize,
        entered: Option<ChainState>,
    },
    BossHit { health: u32 },
    BossDefeated,
}

/// The serpent controller
#[derive(Debug, Clone)]
pub struct ChainCreature {
    state: ChainState,
    head: CellCoord,
    /// Unit step along x, always (±1, 0)
    horizontal: IVec2,
    /// Unit step along y, always (0, ±1)
    vertical: IVec2,
    segments: Vec<ChainSegment>,
    /// Past head cells, oldest first, capped at segments + buffer
    history: VecDeque<CellCoord>,
    /// Every cell visited since spawn (occupancy set and retreat trail)
    path: Vec<CellCoord>,
    steps_since_zag: u32,
    steps_until_zag: u32,
    pause_steps: u32,
    boss_health: u32,
    steps_per_second: f32,
    retreat_multiplier: f32,
    min_zag: u32,
    max_zag: u32,
    scale: f32,
    scheduler: StepScheduler,
    outcome: Option<ChainOutcome>,
}

impl ChainCreature {
    /// Spawn on a random obstacle-free edge cell
    pub fn spawn<R: Rng>(
        ctx: &SimContext<'_>,
        segment_count: usize,
        steps_per_second: f32,
        tuning: &ChainTuning,
        rng: &mut R,
    ) -> Result<Self, GridError> {
        let obstacles = ctx.obstacles;
        let head = ctx
            .grid
            .empty_edge_cell(rng, EDGE_SEARCH_ATTEMPTS, |cell| obstacles.is_obstacle(cell))?;
        Ok(Self::spawn_at(head, ctx, segment_count, steps_per_second, tuning, rng))
    }

    /// Spawn with the head on `head`. Segments are laid out in a straight
    /// line leading away from the arena.
    pub fn spawn_at<R: Rng>(
        head: CellCoord,
        ctx: &SimContext<'_>,
        segment_count: usize,
        steps_per_second: f32,
        tuning: &ChainTuning,
        rng: &mut R,
    ) -> Self {
        let outward = ctx.grid.outward_direction(head);
        // Oldest first: the tail is furthest out, segment 0 right behind the head
        let history: VecDeque<CellCoord> = (0..segment_count)
            .rev()
            .map(|i| head + outward * (i as i32 + 1))
            .collect();
        let min_zag = tuning.min_steps_before_zag.max(1);
        let max_zag = tuning.max_steps_before_zag.max(min_zag);

        let mut creature = Self {
            state: ChainState::Approach,
            head,
            horizontal: IVec2::X,
            vertical: IVec2::NEG_Y,
            segments: (0..segment_count).map(|index| ChainSegment { index }).collect(),
            history,
            path: vec![head],
            steps_since_zag: 0,
            steps_until_zag: rng.random_range(min_zag..=max_zag),
            pause_steps: 0,
            boss_health: 0,
            steps_per_second,
            retreat_multiplier: tuning.retreat_speed_multiplier,
            min_zag,
            max_zag,
            scale: 1.0,
            scheduler: StepScheduler::new(),
            outcome: None,
        };
        creature.approach(ctx, outward, rng);
        log::debug!(
            "Serpent spawned at ({}, {}) with {} segments, {:.2} steps/s",
            head.x,
            head.y,
            segment_count,
            steps_per_second
        );
        creature
    }

    /// Pick the opening heading: away from the spawn edge, toward the center
    /// on the other axis. Transitions straight to Patrol.
    fn approach<R: Rng>(&mut self, ctx: &SimContext<'_>, outward: IVec2, rng: &mut R) {
        let to_center = ctx.grid.center_cell() - self.head;
        let toward = |component: i32, rng: &mut R| match component.signum() {
            0 => {
                if rng.random_bool(0.5) {
                    1
                } else {
                    -1
                }
            }
            s => s,
        };

        if outward.y != 0 {
            self.vertical = IVec2::new(0, -outward.y);
            self.horizontal = IVec2::new(toward(to_center.x, rng), 0);
        } else {
            self.horizontal = IVec2::new(-outward.x, 0);
            self.vertical = IVec2::new(0, toward(to_center.y, rng));
        }
        self.state = ChainState::Patrol;
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn head(&self) -> CellCoord {
        self.head
    }

    pub fn horizontal(&self) -> IVec2 {
        self.horizontal
    }

    pub fn vertical(&self) -> IVec2 {
        self.vertical
    }

    pub fn segments(&self) -> &[ChainSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn history(&self) -> impl ExactSizeIterator<Item = CellCoord> + '_ {
        self.history.iter().copied()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Recorded path (the occupancy set), oldest first
    pub fn path(&self) -> &[CellCoord] {
        &self.path
    }

    /// Every cell other creatures must treat as serpent: the path plus the
    /// head's current cell
    pub fn occupied_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.path.iter().copied().chain(std::iter::once(self.head))
    }

    /// Cell segment `index` should be drawn at. Falls back to the head when
    /// the history is too short.
    pub fn segment_cell(&self, index: usize) -> CellCoord {
        self.history
            .len()
            .checked_sub(index + 1)
            .and_then(|i| self.history.get(i).copied())
            .unwrap_or(self.head)
    }

    pub fn boss_health(&self) -> u32 {
        self.boss_health
    }

    /// Cosmetic scale factor (2x in boss mode)
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn pause_steps(&self) -> u32 {
        self.pause_steps
    }

    pub fn steps_per_second(&self) -> f32 {
        self.steps_per_second
    }

    /// Rate the scheduler runs at right now
    pub fn current_step_rate(&self) -> f32 {
        match self.state {
            ChainState::Retreating => self.steps_per_second * self.retreat_multiplier,
            _ => self.steps_per_second,
        }
    }

    pub fn outcome(&self) -> Option<ChainOutcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Advance the scheduler by `dt`; take a step if one is due
    pub fn update<R: Rng>(&mut self, dt: f32, ctx: &SimContext<'_>, rng: &mut R) -> ChainStep {
        if self.is_finished() {
            return ChainStep::Idle;
        }
        let rate = self.current_step_rate();
        if !self.scheduler.advance(dt, rate) {
            return ChainStep::Idle;
        }
        self.step(ctx, rng)
    }

    /// Take one step now, regardless of the scheduler
    pub fn step<R: Rng>(&mut self, ctx: &SimContext<'_>, rng: &mut R) -> ChainStep {
        if self.is_finished() {
            return ChainStep::Idle;
        }
        if self.pause_steps > 0 {
            self.pause_steps -= 1;
            log::debug!("Serpent stunned, {} steps remaining", self.pause_steps);
            return ChainStep::Paused {
                remaining: self.pause_steps,
            };
        }

        match self.state {
            ChainState::BossMode => self.boss_step(ctx),
            ChainState::Retreating => self.retreat_step(),
            ChainState::Approach => {
                let outward = ctx.grid.outward_direction(self.head);
                self.approach(ctx, outward, rng);
                self.patrol_step(ctx, rng)
            }
            ChainState::Patrol => self.patrol_step(ctx, rng),
        }
    }

    fn patrol_step<R: Rng>(&mut self, ctx: &SimContext<'_>, rng: &mut R) -> ChainStep {
        let occupancy = ctx.occupancy();
        let legal = |cell: CellCoord| occupancy.is_legal_for(Mover::Serpent, cell);
        let blocked_ahead = !legal(self.head + self.horizontal);

        self.steps_since_zag += 1;
        let random_zag = self.steps_since_zag >= self.steps_until_zag;

        let step = if blocked_ahead || random_zag {
            self.horizontal = -self.horizontal;
            self.steps_since_zag = 0;
            if random_zag {
                self.steps_until_zag = rng.random_range(self.min_zag..=self.max_zag);
            }
            self.bias_toward(ctx.player_cell);
            log::debug!(
                "Serpent zigzag (blocked={}, random={}) -> h={:?} v={:?}",
                blocked_ahead,
                random_zag,
                self.horizontal,
                self.vertical
            );

            // Keep the vertical leg inside the arena and off boxes
            if !legal(self.head + self.vertical) && legal(self.head - self.vertical) {
                self.vertical = -self.vertical;
            }
            if legal(self.head + self.vertical) {
                Some(self.vertical)
            } else if legal(self.head + self.horizontal) {
                Some(self.horizontal)
            } else {
                None
            }
        } else {
            Some(self.horizontal)
        };

        let Some(step) = step else {
            log::debug!("Serpent boxed in at ({}, {})", self.head.x, self.head.y);
            return ChainStep::Blocked;
        };

        // Record where the head was before it moves
        self.history.push_back(self.head);
        self.path.push(self.head);
        let cap = self.segments.len() + HISTORY_BUFFER;
        while self.history.len() > cap {
            self.history.pop_front();
        }

        let from = self.head;
        self.head += step;
        ChainStep::Moved {
            from,
            to: self.head,
            crush: None,
        }
    }

    /// Re-aim both legs at the player. Axes without a clear preference keep
    /// their current direction.
    fn bias_toward(&mut self, target: CellCoord) {
        let toward = quantize_direction((target - self.head).as_vec2());
        if toward.x != 0 {
            self.horizontal = IVec2::new(toward.x, 0);
        }
        if toward.y != 0 {
            self.vertical = IVec2::new(0, toward.y);
        }
    }

    fn retreat_step(&mut self) -> ChainStep {
        if self.path.len() > 1 {
            self.path.pop();
            if let Some(&previous) = self.path.last() {
                self.head = previous;
            }
            ChainStep::Retreated { to: self.head }
        } else {
            log::info!("Serpent escaped");
            self.outcome = Some(ChainOutcome::Escaped);
            ChainStep::Escaped
        }
    }

    fn boss_step(&mut self, ctx: &SimContext<'_>) -> ChainStep {
        let dir = dominant_step(ctx.player_cell - self.head);
        let next = self.head + dir;
        if !ctx.occupancy().is_legal_for(Mover::Boss, next) {
            return ChainStep::Blocked;
        }
        let crush = ctx.obstacles.is_obstacle(next).then_some(next);
        if dir.x != 0 {
            self.horizontal = dir;
        } else {
            self.vertical = dir;
        }
        let from = self.head;
        self.head = next;
        ChainStep::Moved {
            from,
            to: next,
            crush,
        }
    }

    /// Is the head on or next to (8-neighborhood) the player's cell?
    pub fn is_catching(&self, player_cell: CellCoord) -> bool {
        chebyshev(self.head, player_cell) <= 1
    }

    /// Terminal: the serpent reached the player
    pub fn catch_player(&mut self) {
        if self.outcome.is_none() {
            log::info!("Serpent caught the player at ({}, {})", self.head.x, self.head.y);
            self.outcome = Some(ChainOutcome::CaughtPlayer);
        }
    }

    /// Skip the next `steps` scheduled steps. Bosses shrug it off.
    pub fn stun(&mut self, steps: u32) -> bool {
        if self.state == ChainState::BossMode || self.is_finished() {
            log::debug!("Serpent ignored stun ({:?})", self.state);
            return false;
        }
        self.pause_steps = steps;
        log::debug!("Serpent paused for {} steps", steps);
        true
    }

    /// Apply one hit. Outside boss mode this always costs the tail segment.
    pub fn apply_damage(&mut self, is_final_wave: bool) -> ChainDamage {
        if self.is_finished() {
            return ChainDamage::Ignored;
        }

        if self.state == ChainState::BossMode {
            self.boss_health = self.boss_health.saturating_sub(1);
            if self.boss_health == 0 {
                log::info!("Serpent boss defeated");
                self.outcome = Some(ChainOutcome::Defeated);
                return ChainDamage::BossDefeated;
            }
            return ChainDamage::BossHit {
                health: self.boss_health,
            };
        }

        let lost = self.segments.pop();
        let mut entered = None;
        if self.segments.is_empty() && matches!(self.state, ChainState::Patrol | ChainState::Approach)
        {
            if is_final_wave {
                self.enter_boss_mode();
            } else {
                log::info!("Serpent out of segments, retreating");
                self.state = ChainState::Retreating;
            }
            entered = Some(self.state);
        }

        match (lost, entered) {
            (Some(segment), _) => ChainDamage::SegmentLost {
                index: segment.index,
                remaining: self.segments.len(),
                entered,
            },
            // Already empty but the hit still triggered the transition
            (None, Some(_)) => ChainDamage::SegmentLost {
                index: 0,
                remaining: 0,
                entered,
            },
            (None, None) => ChainDamage::Ignored,
        }
    }

    fn enter_boss_mode(&mut self) {
        log::info!("Serpent entering boss mode");
        self.state = ChainState::BossMode;
        self.boss_health = BOSS_MAX_HEALTH;
        self.scale *= BOSS_SCALE;
        self.steps_per_second *= BOSS_SPEED_MULTIPLIER;
        self.pause_steps = 0;
        self.path.clear();
    }
}
