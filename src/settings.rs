//! Level selection and seed resolution
//!
//! Hosts hand the run a level number and an optional seed override. Both are
//! sanitized here so the simulation never sees an invalid selection.

use serde::{Deserialize, Serialize};

use crate::consts::LEVEL_COUNT;

/// Preset seed bases, one per level
pub const PRESET_LEVEL_SEEDS: [&str; LEVEL_COUNT as usize] = [
    "2",
    "L2-topspikes-start",
    "L3-tighter-platforms",
    "L4-faster-saws",
    "L5-arc-coins",
    "L6-more-blocks",
    "L7-sparse-platforms",
    "L8-saw-and-topspike-mix",
    "L9-dense-spikes",
    "L10-marathon",
];

/// Short level names (menu labels)
pub const LEVEL_TITLES: [&str; LEVEL_COUNT as usize] = [
    "Start", "TopSpin", "Tight", "Saws+", "Arc+", "Blocks+", "Sparse", "Mix+", "Dense", "Marathn",
];

/// Clamp a level number into `1..=LEVEL_COUNT`
pub fn clamp_level(level: u32) -> u32 {
    level.clamp(1, LEVEL_COUNT)
}

/// Menu title for a level
pub fn level_title(level: u32) -> &'static str {
    LEVEL_TITLES[(clamp_level(level) - 1) as usize]
}

/// What the player picked on the level screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSelection {
    /// Requested level (clamped on use)
    pub level: u32,
    /// Replaces the preset seed base when non-empty
    pub seed_override: Option<String>,
    /// Keep gap checkpoints and roll back to them on a fatal hit
    pub rewind: bool,
}

impl Default for LevelSelection {
    fn default() -> Self {
        Self {
            level: 1,
            seed_override: None,
            rewind: false,
        }
    }
}

impl LevelSelection {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed_override = Some(seed.into());
        self
    }

    pub fn with_rewind(mut self, rewind: bool) -> Self {
        self.rewind = rewind;
        self
    }

    /// Level number actually played
    pub fn level(&self) -> u32 {
        clamp_level(self.level)
    }

    /// Seed base: the trimmed, lower-cased override, or the level preset
    pub fn seed_base(&self) -> String {
        let custom = self
            .seed_override
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        match custom {
            Some(base) => base,
            None => PRESET_LEVEL_SEEDS[(self.level() - 1) as usize].to_string(),
        }
    }

    /// Generator seed string: `"{base}-L{level}"`
    pub fn seed(&self) -> String {
        format!("{}-L{}", self.seed_base(), self.level())
    }

    /// Selection that reproduces a full generator seed (e.g. from a replay)
    ///
    /// Returns `None` when `seed` cannot be produced for `level`.
    pub fn for_seed(level: u32, seed: &str) -> Option<Self> {
        let base = seed.strip_suffix(&format!("-L{level}"))?;
        let mut selection = Self::new(level);
        if selection.level() != level {
            return None;
        }
        if base != PRESET_LEVEL_SEEDS[(level - 1) as usize] {
            selection.seed_override = Some(base.to_string());
        }
        (selection.seed() == seed).then_some(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_seed() {
        assert_eq!(LevelSelection::new(1).seed(), "2-L1");
        assert_eq!(LevelSelection::new(4).seed(), "L4-faster-saws-L4");
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(LevelSelection::new(0).level(), 1);
        assert_eq!(LevelSelection::new(0).seed(), "2-L1");
        assert_eq!(LevelSelection::new(42).level(), LEVEL_COUNT);
        assert_eq!(LevelSelection::new(42).seed(), "L10-marathon-L10");
    }

    #[test]
    fn test_seed_override() {
        let sel = LevelSelection::new(3).with_seed("  MySeed ");
        assert_eq!(sel.seed(), "myseed-L3");

        // Blank override means "use preset"
        let sel = LevelSelection::new(3).with_seed("   ");
        assert_eq!(sel.seed(), "L3-tighter-platforms-L3");
    }

    #[test]
    fn test_for_seed() {
        let sel = LevelSelection::for_seed(2, "L2-topspikes-start-L2").unwrap();
        assert_eq!(sel.seed_override, None);
        let sel = LevelSelection::for_seed(3, "myseed-L3").unwrap();
        assert_eq!(sel.seed(), "myseed-L3");
        // Overrides are lower-cased, so this seed is unreachable
        assert!(LevelSelection::for_seed(3, "MySeed-L3").is_none());
        assert!(LevelSelection::for_seed(3, "myseed-L4").is_none());
        assert!(LevelSelection::for_seed(11, "x-L11").is_none());
    }

    #[test]
    fn test_titles() {
        assert_eq!(level_title(1), "Start");
        assert_eq!(level_title(10), "Marathn");
        assert_eq!(level_title(99), "Marathn");
    }
}
