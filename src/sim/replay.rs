//! Replay timeline: recording and playback of jump input
//!
//! Actions are stamped with the tick count since recording started (`k`)
//! and, for older records, with elapsed simulation time (`t`). Playback
//! prefers the tick stamp, which reproduces a run exactly; time stamps are
//! matched against the simulation clock as a fallback.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::World;
use super::tick::TickInput;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("malformed replay: {0}")]
    Json(#[from] serde_json::Error),
    #[error("replay has no actions")]
    Empty,
}

/// Button edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Down,
    Up,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayAction {
    /// Seconds of simulation time since the start of recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    /// Ticks since the start of recording
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<u64>,
    pub action: ActionKind,
}

impl ReplayAction {
    /// Has this action's moment been reached?
    fn is_due(&self, elapsed_ticks: u64, elapsed_secs: f64) -> bool {
        match (self.k, self.t) {
            (Some(k), _) => k <= elapsed_ticks,
            (None, Some(t)) => elapsed_secs >= t,
            (None, None) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMeta {
    pub seed: String,
    pub level: u32,
    /// Unix milliseconds
    #[serde(rename = "createdAt", alias = "when", default)]
    pub created_at: u64,
}

/// A stored run: where it was played and what was pressed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub meta: ReplayMeta,
    pub actions: Vec<ReplayAction>,
}

impl ReplayRecord {
    pub fn from_json(json: &str) -> Result<Self, ReplayError> {
        let record: ReplayRecord = serde_json::from_str(json)?;
        if record.actions.is_empty() {
            return Err(ReplayError::Empty);
        }
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String, ReplayError> {
        Ok(serde_json::to_string(self)?)
    }
}

const LEVEL1_DEMO: &str = include_str!("../../demos/level1_replay.json");

/// Author-recorded demo bundled for `level`, if any
pub fn embedded_demo(level: u32) -> Option<ReplayRecord> {
    let json = match level {
        1 => LEVEL1_DEMO,
        _ => return None,
    };
    match ReplayRecord::from_json(json) {
        Ok(record) => Some(record),
        Err(e) => {
            log::warn!("Bundled demo for level {level} is unusable: {e}");
            None
        }
    }
}

/// Collects live input into a replay record
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    meta: ReplayMeta,
    start_tick: u64,
    start_time: f32,
    actions: Vec<ReplayAction>,
}

impl ReplayRecorder {
    /// Start recording at the world's current tick
    pub fn new(world: &World, created_at: u64) -> Self {
        Self {
            meta: ReplayMeta {
                seed: world.seed.clone(),
                level: world.level,
                created_at,
            },
            start_tick: world.tick,
            start_time: world.time,
            actions: Vec::new(),
        }
    }

    /// Record an edge that will be applied on the world's next tick
    pub fn record(&mut self, world: &World, action: ActionKind) {
        self.actions.push(ReplayAction {
            t: Some((world.time - self.start_time) as f64),
            k: Some(world.tick.saturating_sub(self.start_tick)),
            action,
        });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn finish(self) -> ReplayRecord {
        ReplayRecord {
            meta: self.meta,
            actions: self.actions,
        }
    }
}

/// Feeds a stored record back into the tick as synthetic input
#[derive(Debug, Clone)]
pub struct ReplayPlayback {
    record: ReplayRecord,
    cursor: usize,
    start_tick: u64,
    start_time: f32,
}

impl ReplayPlayback {
    /// Start playback at the world's current tick
    pub fn new(record: ReplayRecord, world: &World) -> Self {
        if record.meta.seed != world.seed || record.meta.level != world.level {
            log::warn!(
                "Replay recorded for level {} seed {:?}, playing on level {} seed {:?}",
                record.meta.level,
                record.meta.seed,
                world.level,
                world.seed
            );
        }
        Self {
            record,
            cursor: 0,
            start_tick: world.tick,
            start_time: world.time,
        }
    }

    pub fn record(&self) -> &ReplayRecord {
        &self.record
    }

    /// All actions have been injected
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.record.actions.len()
    }

    /// Consume every action due before the world's next tick
    pub fn input_for_tick(&mut self, world: &World) -> TickInput {
        let elapsed_ticks = world.tick.saturating_sub(self.start_tick);
        let elapsed_secs = (world.time - self.start_time) as f64;
        let mut input = TickInput::NONE;
        while let Some(action) = self.record.actions.get(self.cursor) {
            if !action.is_due(elapsed_ticks, elapsed_secs) {
                break;
            }
            match action.action {
                ActionKind::Down => {
                    input.pressed = true;
                    input.released = false;
                }
                ActionKind::Up => input.released = true,
            }
            self.cursor += 1;
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::consts::SIM_DT;
    use crate::sim::state::RunStatus;
    use crate::sim::tick::tick;

    #[test]
    fn test_embedded_demo_parses() {
        let demo = embedded_demo(1).expect("level 1 demo");
        assert_eq!(demo.meta.seed, "2-L1");
        assert_eq!(demo.meta.level, 1);
        assert_eq!(demo.meta.created_at, 1_754_921_458_409);
        assert_eq!(demo.actions.len(), 168);
        assert_eq!(demo.actions[0].action, ActionKind::Down);
        assert!(demo.actions.iter().all(|a| a.t.is_some() && a.k.is_none()));
        assert!(embedded_demo(2).is_none());
    }

    #[test]
    fn test_meta_serializes_created_at() {
        let demo = embedded_demo(1).expect("level 1 demo");
        let json = demo.to_json().unwrap();
        assert!(json.contains("\"createdAt\":1754921458409"));
        assert!(!json.contains("\"when\""));
        assert_eq!(ReplayRecord::from_json(&json).unwrap(), demo);
    }

    #[test]
    fn test_rejects_empty_and_malformed() {
        let empty = r#"{"meta":{"seed":"x","level":1},"actions":[]}"#;
        assert!(matches!(ReplayRecord::from_json(empty), Err(ReplayError::Empty)));
        assert!(matches!(
            ReplayRecord::from_json(r#"{"meta":{}}"#),
            Err(ReplayError::Json(_))
        ));
    }

    #[test]
    fn test_same_tick_down_up_is_a_press() {
        let record = ReplayRecord {
            meta: ReplayMeta {
                seed: "s".into(),
                level: 1,
                created_at: 0,
            },
            actions: vec![
                ReplayAction {
                    t: None,
                    k: Some(0),
                    action: ActionKind::Down,
                },
                ReplayAction {
                    t: None,
                    k: Some(0),
                    action: ActionKind::Up,
                },
                ReplayAction {
                    t: None,
                    k: Some(5),
                    action: ActionKind::Down,
                },
            ],
        };
        let world = World::new(1, "s", Tuning::default());
        let mut playback = ReplayPlayback::new(record, &world);
        let input = playback.input_for_tick(&world);
        assert!(input.pressed && input.released);
        assert!(!playback.is_finished());
    }

    #[test]
    fn test_record_then_playback_matches() {
        let script = |tick: u64| match tick % 70 {
            3 => Some(ActionKind::Down),
            20 => Some(ActionKind::Up),
            _ => None,
        };

        let mut live = World::new(1, "2-L1", Tuning::default());
        let mut recorder = ReplayRecorder::new(&live, 0);
        for _ in 0..900 {
            let mut input = TickInput::NONE;
            if let Some(kind) = script(live.tick) {
                recorder.record(&live, kind);
                match kind {
                    ActionKind::Down => input.pressed = true,
                    ActionKind::Up => input.released = true,
                }
            }
            if tick(&mut live, &input, SIM_DT) != RunStatus::Running {
                break;
            }
        }
        let record = recorder.finish();

        let mut replayed = World::new(1, "2-L1", Tuning::default());
        let mut playback = ReplayPlayback::new(record, &replayed);
        while replayed.tick < live.tick {
            let input = playback.input_for_tick(&replayed);
            if tick(&mut replayed, &input, SIM_DT) != RunStatus::Running {
                break;
            }
        }
        assert_eq!(replayed.tick, live.tick);

        assert_eq!(replayed.status, live.status);
        assert_eq!(replayed.score, live.score);
        assert_eq!(replayed.player, live.player);
        assert_eq!(replayed.spikes, live.spikes);
        assert_eq!(replayed.coins, live.coins);
    }
}
