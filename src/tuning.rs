//! Data-driven game balance
//!
//! Every physics and spawner knob lives here so balance passes never touch
//! simulation code. Hosts may load overrides from JSON; missing fields keep
//! their shipped values.

use serde::{Deserialize, Serialize};

/// Balance values shared by every run of the simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics ===
    /// Downward acceleration (px/s²)
    pub gravity: f32,
    /// Upward velocity of a primary jump (px/s)
    pub jump_impulse: f32,
    /// Secondary (mid-air) jump strength relative to the primary jump
    pub double_jump_factor: f32,
    /// Extra upward acceleration while the button is held (px/s²)
    pub hold_boost: f32,
    /// Longest hold that still adds lift (seconds)
    pub max_jump_hold: f32,

    // === Player ===
    /// Fixed horizontal screen position of the player's center
    pub player_x: f32,
    pub player_width: f32,
    pub player_height: f32,
    /// Hitbox is this fraction of the sprite width
    pub hitbox_width_scale: f32,
    /// Hitbox is this fraction of the sprite height
    pub hitbox_height_scale: f32,

    // === Scrolling ===
    /// Scroll speed at level start (px/s)
    pub start_speed: f32,
    /// Linear speed increase (px/s per second)
    pub speed_gain: f32,
    /// Empty run-up before the first section
    pub start_gap: f32,
    /// Content is kept spawned at least this far ahead
    pub spawn_ahead: f32,
    /// Extra length added to the estimated level distance when planning
    pub plan_margin: f32,

    // === Content ===
    pub spike_min_width: f32,
    pub spike_max_width: f32,
    pub platform_thickness: f32,
    /// Chance a ground spike gets a coin floating above it
    pub coin_above_spike_rate: f32,
    /// Ceiling spikes never reach closer than this to the ground
    pub ceiling_ground_clearance: f32,

    // === Power-ups ===
    /// Invulnerability granted when a shield charge absorbs a hit (seconds)
    pub shield_invulnerability: f32,
    /// Lifetime of the double-jump capability (seconds)
    pub double_jump_duration: f32,

    // === Scoring ===
    pub obstacle_points: u64,
    pub coin_points: u64,
    pub bonus_points: u64,

    // === Rewind ===
    /// Gap checkpoints retained for rewind
    pub rewind_capacity: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 2200.0,
            jump_impulse: 900.0,
            double_jump_factor: 0.9,
            hold_boost: 900.0,
            max_jump_hold: 0.24,

            player_x: 120.0,
            player_width: 84.0,
            player_height: 56.0,
            hitbox_width_scale: 0.72,
            hitbox_height_scale: 0.60,

            start_speed: 320.0,
            speed_gain: 0.22,
            start_gap: 720.0,
            spawn_ahead: 1600.0,
            plan_margin: 400.0,

            spike_min_width: 28.0,
            spike_max_width: 46.0,
            platform_thickness: 18.0,
            coin_above_spike_rate: 0.6,
            ceiling_ground_clearance: 140.0,

            shield_invulnerability: 0.8,
            double_jump_duration: 9.0,

            obstacle_points: 1,
            coin_points: 3,
            bonus_points: 2,

            rewind_capacity: 16,
        }
    }
}

impl Tuning {
    /// Distance past the final section's end where the finish line sits
    pub fn finish_offset(&self) -> f32 {
        (self.start_gap * 0.5).max(80.0)
    }

    /// Parse tuning overrides, falling back to the shipped balance
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Tuning>(json) {
            Ok(mut tuning) => {
                log::info!("Loaded tuning overrides");
                tuning.sanitize();
                tuning
            }
            Err(e) => {
                log::warn!("Ignoring malformed tuning ({e}), using defaults");
                Self::default()
            }
        }
    }

    /// Repair ranges a hand-edited file can get backwards
    fn sanitize(&mut self) {
        if self.spike_min_width > self.spike_max_width {
            log::warn!(
                "Spike width range {}..{} is reversed, swapping",
                self.spike_min_width,
                self.spike_max_width
            );
            std::mem::swap(&mut self.spike_min_width, &mut self.spike_max_width);
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 1800.0, "coin_points": 5 }"#);
        assert_eq!(tuning.gravity, 1800.0);
        assert_eq!(tuning.coin_points, 5);
        assert_eq!(tuning.jump_impulse, 900.0);
        assert_eq!(tuning.spawn_ahead, 1600.0);
    }

    #[test]
    fn test_malformed_falls_back() {
        assert_eq!(Tuning::from_json("{ not json"), Tuning::default());
    }

    #[test]
    fn test_finish_offset() {
        let mut tuning = Tuning::default();
        assert_eq!(tuning.finish_offset(), 360.0);
        tuning.start_gap = 100.0;
        assert_eq!(tuning.finish_offset(), 80.0);
    }

    #[test]
    fn test_reversed_spike_widths_swapped() {
        let tuning = Tuning::from_json(r#"{ "spike_min_width": 60.0, "spike_max_width": 20.0 }"#);
        assert_eq!(tuning.spike_min_width, 20.0);
        assert_eq!(tuning.spike_max_width, 60.0);
    }

    #[test]
    fn test_json_roundtrip() {
        let tuning = Tuning::default();
        assert_eq!(Tuning::from_json(&tuning.to_json()), tuning);
    }
}
