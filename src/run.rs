//! Host-facing run controller
//!
//! A [`Run`] owns one [`World`] and everything around it: the input queue the
//! host writes to, the fixed-step accumulator, optional recording, replay
//! playback or autopilot, and the terminal outcome.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_BACKLOG_SECS, SIM_DT};
use crate::persistence::{ProgressStore, StoreError};
use crate::progress::Progress;
use crate::settings::LevelSelection;
use crate::sim::{
    ActionKind, Autopilot, GameEvent, ReplayPlayback, ReplayRecord, ReplayRecorder, RunStatus,
    TickInput, World, fill_ahead, rewind_latest, rewind_previous, tick,
};
use crate::tuning::Tuning;

/// Button edge queued by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Press,
    Release,
}

/// Queued edge, applied on the tick whose index it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    pub tick: u64,
    pub kind: InputKind,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    LevelComplete { score: u64, furthest_ratio: f32 },
    RunFailed { score: u64, furthest_ratio: f32 },
}

impl RunOutcome {
    pub fn score(&self) -> u64 {
        match *self {
            RunOutcome::LevelComplete { score, .. } | RunOutcome::RunFailed { score, .. } => score,
        }
    }

    pub fn furthest_ratio(&self) -> f32 {
        match *self {
            RunOutcome::LevelComplete { furthest_ratio, .. }
            | RunOutcome::RunFailed { furthest_ratio, .. } => furthest_ratio,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, RunOutcome::LevelComplete { .. })
    }
}

/// Where the next tick's input comes from
#[derive(Debug, Clone)]
enum Driver {
    Live,
    Replay(ReplayPlayback),
    Autopilot(Autopilot),
}

/// One attempt at one level
#[derive(Debug, Clone)]
pub struct Run {
    selection: LevelSelection,
    world: World,
    driver: Driver,
    queue: VecDeque<InputEvent>,
    /// Host button state after the last accepted edge
    button_down: bool,
    accumulator: f32,
    recorder: Option<ReplayRecorder>,
    outcome: Option<RunOutcome>,
    events: Vec<GameEvent>,
}

impl Run {
    pub fn new(selection: LevelSelection, tuning: Tuning) -> Self {
        let world = Self::fresh_world(&selection, tuning);
        Self {
            selection,
            world,
            driver: Driver::Live,
            queue: VecDeque::new(),
            button_down: false,
            accumulator: 0.0,
            recorder: None,
            outcome: None,
            events: Vec::new(),
        }
    }

    /// Start a run with the stored best progress for its level
    pub fn with_progress(selection: LevelSelection, tuning: Tuning, progress: &Progress) -> Self {
        let mut run = Self::new(selection, tuning);
        run.world.furthest_ratio_at_start = progress.level(run.world.level).furthest_ratio;
        run
    }

    fn fresh_world(selection: &LevelSelection, tuning: Tuning) -> World {
        let mut world = World::new(selection.level(), &selection.seed(), tuning);
        world.rewind.enabled = selection.rewind;
        fill_ahead(&mut world);
        world
    }

    /// Retry: rebuild the world from the same selection
    pub fn restart(&mut self) {
        let tuning = self.world.tuning.clone();
        let furthest = self.world.furthest_ratio_at_start;
        self.world = Self::fresh_world(&self.selection, tuning);
        self.world.furthest_ratio_at_start = furthest;
        self.queue.clear();
        self.button_down = false;
        self.accumulator = 0.0;
        self.outcome = None;
        self.events.clear();
        if let Some(recorder) = self.recorder.take() {
            self.recorder = Some(ReplayRecorder::new(&self.world, recorder.finish().meta.created_at));
        }
        let replay = match &self.driver {
            Driver::Replay(playback) => Some(playback.record().clone()),
            _ => None,
        };
        if let Some(record) = replay {
            self.driver = Driver::Replay(ReplayPlayback::new(record, &self.world));
        } else if let Driver::Autopilot(_) = self.driver {
            self.driver = Driver::Autopilot(Autopilot::new());
        }
        log::info!("Restarted level {}", self.world.level);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn selection(&self) -> &LevelSelection {
        &self.selection
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Fraction of a fixed step left in the accumulator (render interpolation)
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT
    }

    // === Input ===

    fn enqueue(&mut self, kind: InputKind) {
        if !matches!(self.driver, Driver::Live) {
            return;
        }
        // Only edges count: key repeat or a stray release changes nothing
        let down = kind == InputKind::Press;
        if down == self.button_down {
            return;
        }
        self.button_down = down;
        if let Some(recorder) = &mut self.recorder {
            let action = match kind {
                InputKind::Press => ActionKind::Down,
                InputKind::Release => ActionKind::Up,
            };
            recorder.record(&self.world, action);
        }
        self.queue.push_back(InputEvent {
            tick: self.world.tick,
            kind,
        });
    }

    /// Jump button down (applied on the next tick)
    pub fn press(&mut self) {
        self.enqueue(InputKind::Press);
    }

    /// Jump button up (applied on the next tick)
    pub fn release(&mut self) {
        self.enqueue(InputKind::Release);
    }

    fn drain_queue(&mut self) -> TickInput {
        let mut input = TickInput::NONE;
        while let Some(event) = self.queue.front() {
            if event.tick > self.world.tick {
                break;
            }
            match event.kind {
                InputKind::Press => {
                    input.pressed = true;
                    input.released = false;
                }
                InputKind::Release => input.released = true,
            }
            self.queue.pop_front();
        }
        input
    }

    // === Drivers ===

    /// Record live (or autopilot) input from now on
    pub fn start_recording(&mut self, created_at: u64) {
        self.recorder = Some(ReplayRecorder::new(&self.world, created_at));
    }

    /// Stop recording and hand back what was captured
    pub fn take_recording(&mut self) -> Option<ReplayRecord> {
        self.recorder.take().map(ReplayRecorder::finish)
    }

    /// Drive the run from a stored replay; live input is ignored meanwhile
    pub fn play(&mut self, record: ReplayRecord) {
        log::info!("Playing replay with {} actions", record.actions.len());
        self.queue.clear();
        self.button_down = false;
        self.driver = Driver::Replay(ReplayPlayback::new(record, &self.world));
    }

    /// Let the look-ahead autopilot press for the player
    pub fn enable_autopilot(&mut self) {
        self.queue.clear();
        self.button_down = false;
        self.driver = Driver::Autopilot(Autopilot::new());
    }

    pub fn is_replaying(&self) -> bool {
        matches!(self.driver, Driver::Replay(_))
    }

    // === Stepping ===

    /// Advance exactly one fixed step
    pub fn step(&mut self) -> RunStatus {
        if self.outcome.is_some() {
            return self.world.status;
        }

        let input = match &mut self.driver {
            Driver::Live => None,
            Driver::Replay(playback) => Some(playback.input_for_tick(&self.world)),
            Driver::Autopilot(pilot) => {
                let input = pilot.next_input(&self.world);
                if let Some(recorder) = &mut self.recorder {
                    if input.pressed {
                        recorder.record(&self.world, ActionKind::Down);
                    }
                    if input.released {
                        recorder.record(&self.world, ActionKind::Up);
                    }
                }
                Some(input)
            }
        };
        let input = match input {
            Some(input) => input,
            None => self.drain_queue(),
        };

        let status = tick(&mut self.world, &input, SIM_DT);
        self.events.extend(self.world.drain_events());

        self.outcome = match status {
            RunStatus::Running => None,
            RunStatus::Complete => Some(RunOutcome::LevelComplete {
                score: self.world.score,
                furthest_ratio: 1.0,
            }),
            RunStatus::Failed => Some(RunOutcome::RunFailed {
                score: self.world.score,
                furthest_ratio: self.world.progress_ratio(),
            }),
        };
        status
    }

    /// Feed real elapsed time; runs as many whole steps as have accumulated
    ///
    /// The backlog is clamped so a long stall never triggers a burst of
    /// catch-up ticks. Returns the number of steps taken.
    pub fn advance_frame(&mut self, frame_dt: f32) -> u32 {
        let frame_dt = if frame_dt.is_finite() { frame_dt.max(0.0) } else { 0.0 };
        self.accumulator = (self.accumulator + frame_dt).min(MAX_BACKLOG_SECS);
        let mut steps = 0;
        while self.accumulator >= SIM_DT && !self.is_over() {
            self.accumulator -= SIM_DT;
            self.step();
            steps += 1;
        }
        steps
    }

    /// Step until the run ends or `max_ticks` steps have run
    pub fn run_to_end(&mut self, max_ticks: u64) -> Option<RunOutcome> {
        for _ in 0..max_ticks {
            if self.step() != RunStatus::Running {
                break;
            }
        }
        self.outcome
    }

    /// Events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // === Rewind (debug tooling) ===

    /// Screen x of the newest checkpoint, for drawing its marker
    pub fn checkpoint_marker(&self) -> Option<f32> {
        self.world
            .rewind
            .latest_gap_mid()
            .map(|gap_mid| gap_mid - self.world.distance)
    }

    pub fn rewind_previous(&mut self) -> bool {
        let restored = rewind_previous(&mut self.world);
        if restored {
            self.after_rewind();
        }
        restored
    }

    pub fn rewind_latest(&mut self) -> bool {
        let restored = rewind_latest(&mut self.world);
        if restored {
            self.after_rewind();
        }
        restored
    }

    fn after_rewind(&mut self) {
        self.queue.clear();
        self.outcome = None;
        self.events.extend(self.world.drain_events());
    }

    // === Persistence ===

    /// Merge this run's result into the stored progress
    ///
    /// Scores from rewind sessions are not recorded; completing still unlocks.
    pub fn persist(&self, store: &mut dyn ProgressStore) -> Result<Option<Progress>, StoreError> {
        let Some(outcome) = self.outcome else {
            return Ok(None);
        };
        let level = self.world.level;
        let mut attempt = Progress::new();
        if self.selection.rewind {
            if outcome.is_complete() {
                attempt.unlock_after(level);
            }
        } else {
            attempt.record_result(
                level,
                outcome.score(),
                outcome.furthest_ratio(),
                outcome.is_complete(),
            );
        }
        let merged = attempt.merge_into(store)?;
        log::info!(
            "Saved level {level}: best {} / furthest {:.2}, unlocked through {}",
            merged.level(level).best_score,
            merged.level(level).furthest_ratio,
            merged.unlocked_up_to_level
        );
        Ok(Some(merged))
    }
}
