//! Fixed timestep simulation tick
//!
//! Per-tick order:
//! 1. deferred catch checks queued by the previous pass
//! 2. stun and hit inputs
//! 3. serpent step (its path is published before anyone else moves)
//! 4. obstacles crushed by the boss
//! 5. wandering creatures, against a fresh occupancy view
//! 6. enemy spawner
//! 7. queue deferred checks for the next pass

use glam::Vec2;

use super::chain::{ChainDamage, ChainState, ChainStep};
use super::context::SimContext;
use super::grid::CellCoord;
use super::obstacles::HitOutcome;
use super::occupancy::Occupancy;
use super::state::{CosmeticHook, DeferredAction, GameEvent, GamePhase, GameState, HitTarget};
use super::wanderer::{CreatureDamage, WandererStep};
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player position this tick (world space)
    pub player_pos: Option<Vec2>,
    /// Hits landed since the last tick, applied in order
    pub hits: Vec<HitTarget>,
    /// Stun the serpent for this many steps
    pub stun_steps: Option<u32>,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.is_over() {
        return;
    }

    state.time_ticks += 1;
    if let Some(pos) = input.player_pos {
        state.player_pos = pos;
    }

    if state.phase == GamePhase::Breather {
        state.breather_secs -= dt;
        if state.breather_secs <= 0.0 {
            let next = state.wave + 1;
            state.start_wave(next);
        }
        return;
    }

    // 1. Deferred checks from the previous pass
    run_deferred(state);
    if state.phase != GamePhase::Playing {
        return;
    }

    // 2. Stun and hits
    if let Some(steps) = input.stun_steps {
        if let Some(chain) = state.chain.as_mut() {
            chain.stun(steps);
        }
    }
    for &hit in &input.hits {
        apply_hit(state, hit);
        if state.phase != GamePhase::Playing {
            return;
        }
    }

    // 3. Serpent step
    let player_cell = state.player_cell();
    let is_final = state.is_final_wave();
    let mut chain_moved = false;
    let mut crushed = None;
    let mut escaped = false;
    if let Some(chain) = state.chain.as_mut() {
        let ctx = SimContext::new(&state.grid, &state.obstacles, player_cell, is_final);
        match chain.update(dt, &ctx, &mut state.rng) {
            ChainStep::Moved { crush, .. } => {
                chain_moved = true;
                crushed = crush;
            }
            ChainStep::Escaped => escaped = true,
            ChainStep::Idle
            | ChainStep::Paused { .. }
            | ChainStep::Blocked
            | ChainStep::Retreated { .. } => {}
        }
    }
    if escaped {
        clear_wave(state);
        return;
    }

    // 4. Boss crushes whatever box it stepped onto
    if let Some(cell) = crushed {
        crush_obstacle(state, cell);
    }

    // 5. Wandering creatures
    step_creatures(state, dt, player_cell);

    // 6. Spawner
    let occupancy = Occupancy::new(&state.grid, &state.obstacles, state.serpent_cells());
    if let Some(creature) = state.spawner.update(
        dt,
        state.creatures.len(),
        &occupancy,
        &state.tuning,
        &mut state.rng,
    ) {
        state.creatures.push(creature);
    }

    // 7. Catch check runs next pass so the player gets one tick to react
    if chain_moved {
        state.deferred.push(DeferredAction::CheckCatch);
    }
}

fn run_deferred(state: &mut GameState) {
    let player_cell = state.player_cell();
    for action in std::mem::take(&mut state.deferred) {
        match action {
            DeferredAction::CheckCatch => {
                let Some(chain) = state.chain.as_mut() else {
                    continue;
                };
                if chain.is_finished() || !chain.is_catching(player_cell) {
                    continue;
                }
                chain.catch_player();
                log::info!("Player caught on wave {}", state.wave);
                state.push_event(GameEvent::PlayerCaught { cell: player_cell });
                state.phase = GamePhase::GameOver;
                return;
            }
        }
    }
}

/// Resolve one player hit
fn apply_hit(state: &mut GameState, target: HitTarget) {
    match target {
        HitTarget::Serpent => hit_serpent(state),
        HitTarget::Creature(id) => hit_creature(state, id),
        HitTarget::Obstacle(cell) => match state.obstacles.hit(cell) {
            HitOutcome::Miss => {}
            HitOutcome::Damaged { remaining } => {
                state.push_event(GameEvent::DamageApplied { target, remaining });
                state.push_event(GameEvent::Cosmetic(CosmeticHook::Flash(target)));
            }
            HitOutcome::Destroyed { score } => {
                state.score += score;
                state.push_event(GameEvent::ObstacleDestroyed { cell, score });
            }
        },
    }
}

fn hit_serpent(state: &mut GameState) {
    let is_final = state.is_final_wave();
    let Some(chain) = state.chain.as_mut() else {
        return;
    };
    let scale = chain.scale();
    match chain.apply_damage(is_final) {
        ChainDamage::Ignored => {}
        ChainDamage::SegmentLost {
            index,
            remaining,
            entered,
        } => {
            state.push_event(GameEvent::DamageApplied {
                target: HitTarget::Serpent,
                remaining: remaining as u32,
            });
            state.push_event(GameEvent::SegmentDestroyed { index, remaining });
            state.push_event(GameEvent::Cosmetic(CosmeticHook::Flash(HitTarget::Serpent)));
            match entered {
                Some(ChainState::Retreating) => state.push_event(GameEvent::RetreatStarted),
                Some(ChainState::BossMode) => {
                    state.push_event(GameEvent::BossModeEntered);
                    state.push_event(GameEvent::Cosmetic(CosmeticHook::Scale {
                        factor: BOSS_SCALE * scale,
                    }));
                }
                Some(ChainState::Approach | ChainState::Patrol) | None => {}
            }
        }
        ChainDamage::BossHit { health } => {
            state.push_event(GameEvent::DamageApplied {
                target: HitTarget::Serpent,
                remaining: health,
            });
            state.push_event(GameEvent::Cosmetic(CosmeticHook::Flash(HitTarget::Serpent)));
        }
        ChainDamage::BossDefeated => {
            state.chain = None;
            state.score += BOSS_BONUS;
            log::info!("Boss defeated on wave {}, score {}", state.wave, state.score);
            state.push_event(GameEvent::BossDefeated { bonus: BOSS_BONUS });
            state.phase = GamePhase::Victory;
        }
    }
}

fn hit_creature(state: &mut GameState, id: u32) {
    let Some(index) = state.creatures.iter().position(|c| c.id == id) else {
        return;
    };
    match state.creatures[index].apply_damage() {
        CreatureDamage::Damaged { remaining } => {
            let target = HitTarget::Creature(id);
            state.push_event(GameEvent::DamageApplied { target, remaining });
            state.push_event(GameEvent::Cosmetic(CosmeticHook::Flash(target)));
        }
        CreatureDamage::Killed { score } => {
            state.creatures.remove(index);
            state.score += score;
            state.push_event(GameEvent::CreatureKilled { id, score });
        }
    }
}

fn crush_obstacle(state: &mut GameState, cell: CellCoord) {
    if let Some(obstacle) = state.obstacles.destroy(cell) {
        log::debug!("Boss crushed box at ({}, {})", cell.x, cell.y);
        state.score += obstacle.score;
        state.push_event(GameEvent::ObstacleDestroyed {
            cell,
            score: obstacle.score,
        });
    }
}

fn step_creatures(state: &mut GameState, dt: f32, player_cell: CellCoord) {
    let serpent_cells = state.serpent_cells();
    let occupancy = Occupancy::new(&state.grid, &state.obstacles, serpent_cells);
    let target = state.grid.center_cell();
    let mut contacts = Vec::new();
    for creature in state.creatures.iter_mut() {
        match creature.update(dt, &occupancy, target, &mut state.rng) {
            WandererStep::Moved { to, .. } if to == player_cell => {
                contacts.push(GameEvent::PlayerContact {
                    id: creature.id,
                    damage: creature.contact_damage,
                });
            }
            WandererStep::Blocked { at } => {
                log::debug!("Creature {} blocked at ({}, {})", creature.id, at.x, at.y);
            }
            _ => {}
        }
    }
    drop(occupancy);
    for event in contacts {
        state.push_event(event);
    }
}

/// Serpent escaped: bank the bonus and rest before the next wave
fn clear_wave(state: &mut GameState) {
    state.chain = None;
    state.score += ESCAPE_BONUS;
    log::info!("Wave {} cleared, score {}", state.wave, state.score);
    state.push_event(GameEvent::WaveCleared {
        wave: state.wave,
        bonus: ESCAPE_BONUS,
    });
    state.creatures.clear();
    state.deferred.clear();
    state.phase = GamePhase::Breather;
    state.breather_secs = BREATHER_SECS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::wanderer::WanderingCreature;
    use crate::tuning::{LinearCurve, Tuning};
    use glam::IVec2;

    /// Default arena with no boxes, no spawns and no random zigzags
    fn quiet_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.difficulty.box_density = LinearCurve::new(1.0, 0.0, 20.0, 0.0);
        tuning.difficulty.enemy_spawn_rate = LinearCurve::new(1.0, 0.0, 20.0, 0.0);
        tuning.chain.min_steps_before_zag = 1000;
        tuning.chain.max_steps_before_zag = 1000;
        tuning
    }

    fn hits(targets: &[HitTarget]) -> TickInput {
        TickInput {
            hits: targets.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_serpent_publishes_before_creatures_move() {
        let mut state = GameState::new(quiet_tuning(), 1);
        // Center cell is (15, 8); keep the player out of the way
        let player = state.grid.grid_to_world(IVec2::new(0, 0));
        state.player_pos = player;
        // Head moves right into (15, 9)
        state.place_chain(IVec2::new(14, 9), 2);
        // Creature heads straight down into (15, 9)
        let creature = WanderingCreature::zigzag(99, IVec2::new(15, 10), &state.tuning.zigzag);
        state.creatures = vec![creature];

        tick(&mut state, &TickInput::default(), 1.0);

        assert_eq!(state.chain.as_ref().unwrap().head(), IVec2::new(15, 9));
        assert_eq!(state.creatures[0].cell, IVec2::new(15, 10));
    }

    #[test]
    fn test_catch_is_checked_next_pass() {
        let mut state = GameState::new(quiet_tuning(), 2);
        assert_eq!(state.player_cell(), IVec2::new(15, 8));
        state.place_chain(IVec2::new(13, 8), 2);
        state.drain_events();

        // Head steps to (14, 8), next to the player
        tick(&mut state, &TickInput::default(), 1.0);
        assert_eq!(state.chain.as_ref().unwrap().head(), IVec2::new(14, 8));
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.drain_events().is_empty());

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::PlayerCaught {
                cell: IVec2::new(15, 8)
            }]
        );
    }

    #[test]
    fn test_player_can_step_away_before_catch() {
        let mut state = GameState::new(quiet_tuning(), 3);
        state.place_chain(IVec2::new(13, 8), 2);
        tick(&mut state, &TickInput::default(), 1.0);

        let away = TickInput {
            player_pos: Some(state.grid.grid_to_world(IVec2::new(25, 2))),
            ..Default::default()
        };
        tick(&mut state, &away, SIM_DT);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_three_hits_then_escape_then_next_wave() {
        let mut state = GameState::new(quiet_tuning(), 4);
        state.player_pos = state.grid.grid_to_world(IVec2::new(0, 0));
        state.place_chain(IVec2::new(5, 16), 3);
        state.drain_events();

        // Walk a few cells so there is a path to retreat along
        for _ in 0..4 {
            tick(&mut state, &TickInput::default(), 0.5);
        }
        tick(
            &mut state,
            &hits(&[HitTarget::Serpent, HitTarget::Serpent, HitTarget::Serpent]),
            0.0,
        );
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::RetreatStarted));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, GameEvent::SegmentDestroyed { .. }))
                .count(),
            3
        );
        assert_eq!(
            state.chain.as_ref().unwrap().state(),
            ChainState::Retreating
        );

        let mut cleared = false;
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), 0.5);
            if state
                .drain_events()
                .contains(&GameEvent::WaveCleared { wave: 1, bonus: 500 })
            {
                cleared = true;
                break;
            }
        }
        assert!(cleared);
        assert_eq!(state.score, 500);
        assert_eq!(state.phase, GamePhase::Breather);
        assert!(state.chain.is_none());

        // Breather runs out, wave 2 begins with one more segment
        for _ in 0..5 {
            tick(&mut state, &TickInput::default(), 0.5);
        }
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.wave, 2);
        assert_eq!(state.chain.as_ref().unwrap().segment_count(), 11);
    }

    #[test]
    fn test_final_wave_boss_fight() {
        let mut tuning = quiet_tuning();
        tuning.final_wave = 1;
        let mut state = GameState::new(tuning, 5);
        assert!(state.is_final_wave());
        state.player_pos = state.grid.grid_to_world(IVec2::new(0, 0));
        state.place_chain(IVec2::new(20, 16), 1);
        state.drain_events();

        tick(&mut state, &hits(&[HitTarget::Serpent]), 0.0);
        let events = state.drain_events();
        assert!(events.contains(&GameEvent::BossModeEntered));
        assert!(events.contains(&GameEvent::Cosmetic(CosmeticHook::Scale { factor: 2.0 })));
        let chain = state.chain.as_ref().unwrap();
        assert_eq!(chain.state(), ChainState::BossMode);
        assert_eq!(chain.boss_health(), 5);
        assert!(chain.path().is_empty());

        // Stun is ignored by the boss
        let stun = TickInput {
            stun_steps: Some(10),
            ..Default::default()
        };
        tick(&mut state, &stun, 0.0);
        assert_eq!(state.chain.as_ref().unwrap().pause_steps(), 0);

        tick(&mut state, &hits(&[HitTarget::Serpent; 4]), 0.0);
        assert_eq!(state.chain.as_ref().unwrap().boss_health(), 1);
        assert_eq!(state.phase, GamePhase::Playing);

        // The last hit ends the run; the extra one finds nothing to hit
        tick(&mut state, &hits(&[HitTarget::Serpent, HitTarget::Serpent]), 0.0);
        let defeated = state
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::BossDefeated { .. }))
            .count();
        assert_eq!(defeated, 1);
        assert_eq!(state.phase, GamePhase::Victory);
        assert_eq!(state.score, 1000);
        assert!(state.chain.is_none());
    }

    #[test]
    fn test_boss_crushes_boxes() {
        let mut tuning = quiet_tuning();
        tuning.final_wave = 1;
        let mut state = GameState::new(tuning, 6);
        // Player far right on the head's row
        state.player_pos = state.grid.grid_to_world(IVec2::new(30, 3));
        state.place_chain(IVec2::new(0, 3), 1);
        state.obstacles.place(IVec2::new(1, 3));
        tick(&mut state, &hits(&[HitTarget::Serpent]), 0.0);
        state.drain_events();

        // Boss rate: 3 * 1.5 = 4.5 steps/s
        tick(&mut state, &TickInput::default(), 0.25);
        assert_eq!(state.chain.as_ref().unwrap().head(), IVec2::new(1, 3));
        assert!(!state.obstacles.contains(IVec2::new(1, 3)));
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::ObstacleDestroyed {
                cell: IVec2::new(1, 3),
                score: 5
            }]
        );
        assert_eq!(state.score, 5);
    }

    #[test]
    fn test_creature_and_box_hits() {
        let mut state = GameState::new(quiet_tuning(), 7);
        state.chain = None;
        state.creatures = vec![WanderingCreature::burst(
            3,
            IVec2::new(2, 2),
            &state.tuning.burst,
        )];
        state.obstacles.place(IVec2::new(4, 4));
        state.drain_events();

        let volley = [
            HitTarget::Creature(3),
            HitTarget::Creature(3),
            HitTarget::Creature(3),
            HitTarget::Creature(3),
            HitTarget::Obstacle(IVec2::new(4, 4)),
            HitTarget::Obstacle(IVec2::new(4, 4)),
            HitTarget::Obstacle(IVec2::new(4, 4)),
        ];
        tick(&mut state, &hits(&volley), 0.0);

        let events = state.drain_events();
        assert_eq!(
            events[0],
            GameEvent::DamageApplied {
                target: HitTarget::Creature(3),
                remaining: 2
            }
        );
        assert!(events.contains(&GameEvent::CreatureKilled { id: 3, score: 10 }));
        assert!(events.contains(&GameEvent::ObstacleDestroyed {
            cell: IVec2::new(4, 4),
            score: 5
        }));
        assert!(state.creatures.is_empty());
        assert_eq!(state.score, 15);
    }

    #[test]
    fn test_creature_contact_with_player() {
        let mut state = GameState::new(quiet_tuning(), 8);
        state.chain = None;
        // Player on the center cell; creature one step above it
        let creature = WanderingCreature::zigzag(4, IVec2::new(15, 9), &state.tuning.zigzag);
        state.creatures = vec![creature];
        state.drain_events();

        tick(&mut state, &TickInput::default(), 1.0);
        assert_eq!(
            state.drain_events(),
            vec![GameEvent::PlayerContact { id: 4, damage: 1.0 }]
        );
    }

    #[test]
    fn test_spawner_fills_to_cap() {
        let mut tuning = quiet_tuning();
        tuning.difficulty.enemy_spawn_rate = LinearCurve::new(1.0, 10.0, 20.0, 10.0);
        let mut state = GameState::new(tuning, 9);
        state.chain = None;
        state.player_pos = state.grid.grid_to_world(IVec2::new(0, 0));
        let cap = state.params.enemy_cap;
        assert_eq!(cap, 3);

        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.creatures.len(), cap);
        let ids: Vec<_> = state.creatures.iter().map(|c| c.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_finished_run_stops_ticking() {
        let mut state = GameState::new(quiet_tuning(), 10);
        let head = state.chain.as_ref().unwrap().head();
        state.phase = GamePhase::GameOver;
        state.drain_events();

        for _ in 0..10 {
            tick(&mut state, &hits(&[HitTarget::Serpent]), 1.0);
        }
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.chain.as_ref().unwrap().head(), head);
        assert_eq!(state.chain.as_ref().unwrap().segment_count(), 10);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = GameState::new(Tuning::default(), 99999);
        let mut state2 = GameState::new(Tuning::default(), 99999);
        let far = TickInput {
            player_pos: Some(Vec2::new(-14.0, -7.0)),
            ..Default::default()
        };

        for i in 0..600 {
            let mut input = far.clone();
            if i % 45 == 0 {
                input.hits.push(HitTarget::Serpent);
            }
            tick(&mut state1, &input, SIM_DT);
            tick(&mut state2, &input, SIM_DT);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.phase, state2.phase);
        assert_eq!(state1.drain_events(), state2.drain_events());
        assert_eq!(
            state1.chain.as_ref().map(|c| c.head()),
            state2.chain.as_ref().map(|c| c.head())
        );
        let cells1: Vec<_> = state1.creatures.iter().map(|c| c.cell).collect();
        let cells2: Vec<_> = state2.creatures.iter().map(|c| c.cell).collect();
        assert_eq!(cells1, cells2);
    }
}
