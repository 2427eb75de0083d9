//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (insertion order of entity collections)
//! - No rendering or platform dependencies

pub mod collision;
pub mod lookahead;
pub mod replay;
pub mod rng;
pub mod section;
pub mod snapshot;
pub mod spawner;
pub mod state;
pub mod tick;

pub use collision::{Rect, boxes_overlap, circle_overlaps_box};
pub use lookahead::{Autopilot, LOOKAHEAD_WINDOW, PressPlan, simulate_idle, simulate_press_plan};
pub use replay::{
    ActionKind, ReplayAction, ReplayError, ReplayMeta, ReplayPlayback, ReplayRecord,
    ReplayRecorder, embedded_demo,
};
pub use rng::{SeededRng, seed_digest};
pub use section::{BonusKind, Section, SectionItem, build_level_plan, generate_section};
pub use snapshot::{
    RewindHistory, SNAPSHOT_VERSION, Snapshot, SnapshotError, rewind_latest, rewind_previous,
};
pub use spawner::{fill_ahead, place_section, spawn_next};
pub use state::{
    Bonus, CeilingSpike, Coin, GameEvent, Platform, Player, PowerUps, RunStatus, Saw,
    ScoreReason, SectionBounds, Spike, World,
};
pub use tick::{TickInput, tick};
