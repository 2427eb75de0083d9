//! Dash Runner - deterministic core of a side-scrolling arcade runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (generation, physics, collisions, snapshots, replays)
//! - `run`: Host-facing run controller (input queue, fixed-step accumulator, outcomes)
//! - `progress`: Per-level best scores, furthest progress and unlocks
//! - `persistence`: Key-value stores the progress record is written to
//! - `tuning`: Data-driven game balance
//! - `settings`: Level selection and seed resolution

pub mod persistence;
pub mod progress;
pub mod run;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use progress::{LevelRecord, Progress};
pub use run::{Run, RunOutcome};
pub use settings::LevelSelection;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz, independent of display refresh)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Largest real-time backlog the host accumulator may carry (spiral-of-death guard)
    pub const MAX_BACKLOG_SECS: f32 = 0.25;

    /// Logical viewport height; renderers scale the whole frame
    pub const VIEW_HEIGHT: f32 = 720.0;
    /// Ground line at 78% of the viewport height, whole pixels
    pub const GROUND_Y: f32 = (VIEW_HEIGHT * 0.78) as u32 as f32;

    /// Every level is time-boxed
    pub const LEVEL_DURATION_SECS: f32 = 60.0;
    /// Number of selectable levels
    pub const LEVEL_COUNT: u32 = 10;

    /// Entities are culled once their right edge is this far past the left edge
    pub const CULL_MARGIN: f32 = 50.0;
    /// Hard cap on sections in a level plan
    pub const MAX_PLAN_SECTIONS: usize = 200;
}

/// Distance a level covers at the ramping scroll speed, ignoring obstacles
pub fn estimate_level_distance(tuning: &Tuning) -> f32 {
    let s0 = tuning.start_speed;
    let s1 = tuning.start_speed + tuning.speed_gain * consts::LEVEL_DURATION_SECS;
    let avg = (s0 + s1) / 2.0;
    (avg * consts::LEVEL_DURATION_SECS).floor()
}

/// Level length used by the plan builder and for progress ratios
pub fn level_target_distance(tuning: &Tuning) -> f32 {
    estimate_level_distance(tuning) + tuning.plan_margin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_distance_estimate() {
        let tuning = Tuning::default();
        // (320 + 333.2) / 2 * 60
        assert_eq!(estimate_level_distance(&tuning), 19596.0);
        assert_eq!(level_target_distance(&tuning), 19996.0);
    }

    #[test]
    fn test_ground_line() {
        assert_eq!(consts::GROUND_Y, 561.0);
    }
}
