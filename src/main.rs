//! Dash Runner headless entry point
//!
//! Plays one level without a display: idle, under the autopilot, or from a
//! replay. Prints the outcome and merges it into the progress store.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use anyhow::{Context, Result, bail};
    use clap::{Parser, ValueEnum};

    use dash_runner::consts::SIM_DT;
    use dash_runner::persistence::FileStore;
    use dash_runner::settings::level_title;
    use dash_runner::sim::{ReplayRecord, embedded_demo};
    use dash_runner::{LevelSelection, Progress, Run, RunOutcome, Tuning};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum Mode {
        /// Never press
        Idle,
        /// Look-ahead autopilot presses
        Autopilot,
        /// Play the file given with --replay
        Replay,
        /// Play the bundled demo for the level
        Demo,
    }

    /// Run a Dash Runner level headless
    #[derive(Debug, Parser)]
    #[command(version, about)]
    struct Args {
        /// Level to play (1-10)
        #[arg(short, long, default_value_t = 1)]
        level: u32,
        /// Seed override (preset seed when omitted)
        #[arg(short, long)]
        seed: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Mode::Idle)]
        mode: Mode,
        /// Replay file for --mode replay
        #[arg(long)]
        replay: Option<PathBuf>,
        /// Write the run's input to this replay file
        #[arg(long)]
        record: Option<PathBuf>,
        /// Keep gap checkpoints and rewind on fatal hits
        #[arg(long)]
        rewind: bool,
        /// JSON tuning overrides
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Progress store directory
        #[arg(long, default_value = ".dash-runner")]
        save_dir: PathBuf,
        /// Give up after this many simulated seconds
        #[arg(long, default_value_t = 120.0)]
        max_secs: f32,
    }

    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn load_replay(args: &Args) -> Result<Option<ReplayRecord>> {
        match args.mode {
            Mode::Replay => {
                let Some(path) = &args.replay else {
                    bail!("--mode replay needs --replay <FILE>");
                };
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading replay {}", path.display()))?;
                let record = ReplayRecord::from_json(&json)
                    .with_context(|| format!("parsing replay {}", path.display()))?;
                Ok(Some(record))
            }
            Mode::Demo => match embedded_demo(args.level) {
                Some(record) => Ok(Some(record)),
                None => bail!("no bundled demo for level {}", args.level),
            },
            Mode::Idle | Mode::Autopilot => Ok(None),
        }
    }

    pub fn run() -> Result<()> {
        env_logger::init();
        let args = Args::parse();

        let tuning = match &args.tuning {
            Some(path) => Tuning::from_json(
                &fs::read_to_string(path)
                    .with_context(|| format!("reading tuning {}", path.display()))?,
            ),
            None => Tuning::default(),
        };

        let replay = load_replay(&args)?;
        let selection = match &replay {
            // A replay is only meaningful on the level and seed it was recorded on
            Some(record) => LevelSelection::for_seed(record.meta.level, &record.meta.seed)
                .with_context(|| {
                    format!(
                        "replay seed {:?} does not match level {}",
                        record.meta.seed, record.meta.level
                    )
                })?,
            None => {
                let mut selection = LevelSelection::new(args.level);
                if let Some(seed) = &args.seed {
                    selection = selection.with_seed(seed.clone());
                }
                selection
            }
        }
        .with_rewind(args.rewind);

        let mut store = FileStore::open(&args.save_dir)?;
        let progress = Progress::load(&store);
        if !progress.is_unlocked(selection.level()) {
            log::warn!(
                "Level {} is locked (unlocked through {}), playing anyway",
                selection.level(),
                progress.unlocked_up_to_level
            );
        }

        let mut run = Run::with_progress(selection, tuning, &progress);
        if args.record.is_some() {
            run.start_recording(now_millis());
        }
        match replay {
            Some(record) => run.play(record),
            None if args.mode == Mode::Autopilot => run.enable_autopilot(),
            None => {}
        }

        let level = run.world().level;
        println!(
            "Level {level} \"{}\" seed {:?}",
            level_title(level),
            run.world().seed
        );

        let max_ticks = (args.max_secs.max(0.0) / SIM_DT) as u64;
        let outcome = run.run_to_end(max_ticks);
        let world = run.world();
        match outcome {
            Some(RunOutcome::LevelComplete { score, .. }) => {
                println!("Level complete: score {score} after {:.2}s", world.level_elapsed);
            }
            Some(RunOutcome::RunFailed {
                score,
                furthest_ratio,
            }) => {
                println!(
                    "Run failed: score {score}, reached {:.1}% at {:.2}s",
                    furthest_ratio * 100.0,
                    world.level_elapsed
                );
            }
            None => println!("Still running after {:.0}s, giving up", args.max_secs),
        }

        if let Some(saved) = run.persist(&mut store)? {
            let record = saved.level(level);
            println!(
                "Best {} / furthest {:.1}% / unlocked through level {}",
                record.best_score,
                record.furthest_ratio * 100.0,
                saved.unlocked_up_to_level
            );
        }

        if let Some(path) = &args.record {
            let record = run.take_recording().context("recording was not started")?;
            fs::write(path, record.to_json()?)
                .with_context(|| format!("writing replay {}", path.display()))?;
            println!("Recorded {} actions to {}", record.actions.len(), path.display());
        }

        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Hosts embed the library directly on the web
}
