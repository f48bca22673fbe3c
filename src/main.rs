//! Serpent Waves headless runner
//!
//! Runs the simulation on a fixed timestep with a simple autopilot standing
//! in for the player, printing every event as a JSON line.
//!
//! Usage: `serpent-waves [tuning.json] [--seed N] [--seconds S]`

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};

    use anyhow::{Context, Result, bail};
    use clap::Parser;
    use glam::IVec2;
    use serpent_waves::Tuning;
    use serpent_waves::chebyshev;
    use serpent_waves::consts::*;
    use serpent_waves::sim::{GamePhase, GameState, HitTarget, TickInput, tick};

    /// Autopilot fires once every this many ticks
    const FIRE_INTERVAL_TICKS: u64 = 20;
    /// Creatures closer than this (cells) get shot first
    const THREAT_RADIUS: i32 = 4;
    /// Stun the serpent when its head gets this close
    const PANIC_RADIUS: i32 = 3;
    const STUN_STEPS: u32 = 3;

    /// Headless serpent arena runner
    #[derive(Parser, Debug)]
    #[command(name = "serpent-waves", version, about)]
    pub(crate) struct Cli {
        /// Tuning JSON file; built-in defaults when omitted
        pub(crate) tuning: Option<PathBuf>,

        /// Run seed
        #[arg(long, default_value_t = 12345)]
        pub(crate) seed: u64,

        /// Simulated seconds to run before stopping
        #[arg(long, default_value_t = 120.0)]
        pub(crate) seconds: f32,
    }

    pub(crate) fn load_tuning(path: Option<&Path>) -> Result<Tuning> {
        match path {
            Some(path) => Tuning::load(path)
                .with_context(|| format!("failed to load tuning from {}", path.display())),
            None => Ok(Tuning::default()),
        }
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        accumulator: f32,
        input: TickInput,
    }

    impl Game {
        fn new(tuning: Tuning, seed: u64) -> Self {
            Self {
                state: GameState::new(tuning, seed),
                accumulator: 0.0,
                input: TickInput::default(),
            }
        }

        /// Run simulation ticks for one frame
        fn update(&mut self, dt: f32) -> Result<(), serde_json::Error> {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.autopilot();
                let input = self.input.clone();
                tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.hits.clear();
                self.input.stun_steps = None;

                for event in self.state.drain_events() {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
            Ok(())
        }

        /// Stay on the center cell and shoot: nearby creatures first, then
        /// the serpent.
        fn autopilot(&mut self) {
            let state = &self.state;
            if state.phase != GamePhase::Playing
                || state.time_ticks % FIRE_INTERVAL_TICKS != 0
            {
                return;
            }
            let player = state.player_cell();

            if let Some(chain) = &state.chain {
                if chebyshev(chain.head(), player) <= PANIC_RADIUS && chain.pause_steps() == 0 {
                    self.input.stun_steps = Some(STUN_STEPS);
                }
            }

            let threat = state
                .creatures
                .iter()
                .filter(|c| chebyshev(c.cell, player) <= THREAT_RADIUS)
                .min_by_key(|c| (chebyshev(c.cell, player), c.id));
            let target = match (threat, &state.chain) {
                (Some(creature), _) => Some(HitTarget::Creature(creature.id)),
                (None, Some(_)) => Some(HitTarget::Serpent),
                (None, None) => nearest_box(state, player).map(HitTarget::Obstacle),
            };
            if let Some(target) = target {
                self.input.hits.push(target);
            }
        }
    }

    fn nearest_box(state: &GameState, player: IVec2) -> Option<IVec2> {
        state
            .obstacles
            .cells()
            .min_by_key(|&cell| (chebyshev(cell, player), cell.x, cell.y))
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Cli::parse();
        if !(args.seconds >= 0.0) {
            bail!("--seconds must be a non-negative number, got {}", args.seconds);
        }
        let tuning = load_tuning(args.tuning.as_deref())?;
        log::info!(
            "Serpent Waves starting: seed {}, {:.0}s, final wave {}",
            args.seed,
            args.seconds,
            tuning.final_wave
        );

        let mut game = Game::new(tuning, args.seed);
        let frames = (args.seconds / SIM_DT).ceil() as u64;
        for _ in 0..frames {
            game.update(SIM_DT)?;
            if game.state.is_over() {
                break;
            }
        }

        let state = &game.state;
        log::info!(
            "Run finished: {:?} on wave {} with score {} after {} ticks",
            state.phase,
            state.wave,
            state.score,
            state.time_ticks
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless runner is native only
}
