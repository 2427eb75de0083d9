//! Snapshot and restore for rewind
//!
//! A [`Snapshot`] is a versioned copy of every mutable field of a [`World`].
//! The level plan is not captured: it is rebuilt from the seed and never
//! changes during a run.

use std::collections::VecDeque;

use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rng::SeededRng;
use super::state::{
    Bonus, CeilingSpike, Coin, GameEvent, Platform, Player, PowerUps, RunStatus, Saw,
    SectionBounds, Spike, World,
};

/// Bumped whenever the snapshot layout changes
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found} (expected {SNAPSHOT_VERSION})")]
    Version { found: u32 },
}

/// Frozen copy of a world's mutable state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub level: u32,
    pub time: f32,
    pub level_elapsed: f32,
    pub level_time_left: f32,
    pub speed: f32,
    pub distance: f32,
    pub tick: u64,
    pub score: u64,
    pub player: Player,
    pub power: PowerUps,
    pub spikes: Vec<Spike>,
    pub platforms: Vec<Platform>,
    pub blocks: Vec<Platform>,
    pub saws: Vec<Saw>,
    pub coins: Vec<Coin>,
    pub bonuses: Vec<Bonus>,
    pub ceiling_spikes: Vec<CeilingSpike>,
    pub spawn_cursor: f32,
    pub next_section_index: usize,
    pub sections: Vec<SectionBounds>,
    pub stop_spawning: bool,
    pub time_up: bool,
    pub finish_x: Option<f32>,
    pub level_rng: SeededRng,
    pub cosmetic_rng: Pcg32,
    /// Scroll distance to use on restore instead of `distance`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_override: Option<f32>,
}

impl Snapshot {
    /// Deep-copy the world's mutable state
    pub fn capture(world: &World) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            level: world.level,
            time: world.time,
            level_elapsed: world.level_elapsed,
            level_time_left: world.level_time_left,
            speed: world.speed,
            distance: world.distance,
            tick: world.tick,
            score: world.score,
            player: world.player.clone(),
            power: world.power.clone(),
            spikes: world.spikes.clone(),
            platforms: world.platforms.clone(),
            blocks: world.blocks.clone(),
            saws: world.saws.clone(),
            coins: world.coins.clone(),
            bonuses: world.bonuses.clone(),
            ceiling_spikes: world.ceiling_spikes.clone(),
            spawn_cursor: world.spawn_cursor,
            next_section_index: world.next_section_index,
            sections: world.sections.clone(),
            stop_spawning: world.stop_spawning,
            time_up: world.time_up,
            finish_x: world.finish_x,
            level_rng: world.level_rng.clone(),
            cosmetic_rng: world.cosmetic_rng.clone(),
            distance_override: None,
        }
    }

    /// Scroll distance the world will have after restoring
    pub fn restored_distance(&self) -> f32 {
        self.distance_override.map_or(self.distance, |d| d.max(0.0))
    }

    /// Overwrite `world` with this snapshot
    ///
    /// With a distance override the player is re-aligned along the level and
    /// every entity is shifted to keep `screen_x = world_x - distance`.
    pub fn restore(&self, world: &mut World) {
        let distance = self.restored_distance();
        world.time = self.time;
        world.level_elapsed = self.level_elapsed;
        world.level_time_left = self.level_time_left;
        world.speed = self.speed;
        world.distance = distance;
        world.tick = self.tick;
        world.score = self.score;
        world.player = self.player.clone();
        world.power = self.power.clone();
        world.spikes = self.spikes.clone();
        world.platforms = self.platforms.clone();
        world.blocks = self.blocks.clone();
        world.saws = self.saws.clone();
        world.coins = self.coins.clone();
        world.bonuses = self.bonuses.clone();
        world.ceiling_spikes = self.ceiling_spikes.clone();
        world.spawn_cursor = self.spawn_cursor;
        world.next_section_index = self.next_section_index;
        world.sections = self.sections.clone();
        world.sections.retain(|s| s.index < self.next_section_index);
        world.stop_spawning = self.stop_spawning;
        world.time_up = self.time_up;
        world.finish_x = self.finish_x;
        world.level_rng = self.level_rng.clone();
        world.cosmetic_rng = self.cosmetic_rng.clone();
        world.status = RunStatus::Running;

        let shift = self.distance - distance;
        if shift != 0.0 {
            world.shift_entities(shift);
        }

        // Stale input must not carry across a restore
        world.jump_held = false;
        world.rewind.pending_gap_mid = None;
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                found: snapshot.version,
            });
        }
        Ok(snapshot)
    }
}

/// Bounded stack of gap checkpoints
#[derive(Debug, Clone)]
pub struct RewindHistory {
    /// Record checkpoints and recover from fatal hits
    pub enabled: bool,
    capacity: usize,
    stack: VecDeque<Snapshot>,
    /// Gap midpoint (world x) waiting for the player to pass it
    pub pending_gap_mid: Option<f32>,
}

impl RewindHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            enabled: false,
            capacity: capacity.max(1),
            stack: VecDeque::new(),
            pending_gap_mid: None,
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.stack.back()
    }

    /// World x the player reappears at when the newest checkpoint is restored
    pub fn latest_gap_mid(&self) -> Option<f32> {
        self.latest().map(|snap| snap.restored_distance() + snap.player.x)
    }

    /// Push a checkpoint, dropping the oldest once full
    pub fn push(&mut self, snapshot: Snapshot) {
        if self.stack.len() == self.capacity {
            self.stack.pop_front();
        }
        self.stack.push_back(snapshot);
    }

    pub fn clear(&mut self) {
        self.stack.clear();
        self.pending_gap_mid = None;
    }
}

/// Store a checkpoint once the player passes the pending gap midpoint
pub fn confirm_gap_checkpoint(world: &mut World) {
    let Some(gap_mid) = world.rewind.pending_gap_mid else {
        return;
    };
    if world.player_world_x() <= gap_mid {
        return;
    }
    let mut snapshot = Snapshot::capture(world);
    snapshot.distance_override = Some((gap_mid - world.player.x).max(0.0));
    world.rewind.push(snapshot);
    world.rewind.pending_gap_mid = None;
    log::debug!("Checkpoint at gap x={gap_mid:.0}");
    world.push_event(GameEvent::Checkpoint { gap_mid_x: gap_mid });
}

/// Drop the newest checkpoint and restore the one before it
///
/// Needs at least two checkpoints; returns whether a restore happened.
pub fn rewind_previous(world: &mut World) -> bool {
    if world.rewind.len() < 2 {
        return false;
    }
    world.rewind.stack.pop_back();
    rewind_latest(world)
}

/// Restore the newest checkpoint without removing it
pub fn rewind_latest(world: &mut World) -> bool {
    let Some(snapshot) = world.rewind.latest().cloned() else {
        return false;
    };
    snapshot.restore(world);
    log::info!("Rewound to checkpoint (distance {:.0})", world.distance);
    world.push_event(GameEvent::Rewound);
    true
}
