//! Per-level progress: best scores, furthest progress and unlocks
//!
//! Read once when a level starts and written once when it ends. Every field
//! is max-merged so a stale writer can never lower a record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::LEVEL_COUNT;
use crate::persistence::{ProgressStore, StoreError};

/// Store key the progress record lives under
pub const PROGRESS_KEY: &str = "progress";

/// Best results for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredLevelRecord")]
pub struct LevelRecord {
    pub best_score: u64,
    /// Fraction of the level reached in the best attempt (0..1)
    pub furthest_ratio: f32,
}

impl LevelRecord {
    fn merge(&mut self, other: &LevelRecord) {
        self.best_score = self.best_score.max(other.best_score);
        self.furthest_ratio = self.furthest_ratio.max(other.furthest_ratio);
    }
}

/// Accepted on-disk shapes: the current object, the older `{score, furthest}`
/// object, or a bare best score
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLevelRecord {
    Score(f64),
    Record {
        #[serde(alias = "score", default)]
        #[serde(rename = "bestScore")]
        best_score: f64,
        #[serde(alias = "furthest", default)]
        #[serde(rename = "furthestRatio")]
        furthest_ratio: f64,
    },
}

fn sanitize_ratio(ratio: f64) -> f32 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

fn sanitize_score(score: f64) -> u64 {
    if score.is_finite() && score > 0.0 {
        score.floor() as u64
    } else {
        0
    }
}

impl From<StoredLevelRecord> for LevelRecord {
    fn from(stored: StoredLevelRecord) -> Self {
        match stored {
            StoredLevelRecord::Score(score) => LevelRecord {
                best_score: sanitize_score(score),
                furthest_ratio: 0.0,
            },
            StoredLevelRecord::Record {
                best_score,
                furthest_ratio,
            } => LevelRecord {
                best_score: sanitize_score(best_score),
                furthest_ratio: sanitize_ratio(furthest_ratio),
            },
        }
    }
}

/// Everything persisted across runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub levels: BTreeMap<u32, LevelRecord>,
    pub best_score_overall: u64,
    /// Highest selectable level
    pub unlocked_up_to_level: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            levels: BTreeMap::new(),
            best_score_overall: 0,
            unlocked_up_to_level: 1,
        }
    }
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stored record; malformed data is treated as absent
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Progress>(json) {
            Ok(mut progress) => {
                progress.unlocked_up_to_level = progress.unlocked_up_to_level.clamp(1, LEVEL_COUNT);
                progress
            }
            Err(e) => {
                log::warn!("Ignoring malformed progress data: {e}");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Load from a store, falling back to a fresh record on any failure
    pub fn load(store: &dyn ProgressStore) -> Self {
        match store.get(PROGRESS_KEY) {
            Ok(Some(json)) => {
                let progress = Self::from_json(&json);
                log::info!(
                    "Loaded progress: {} levels, unlocked through {}",
                    progress.levels.len(),
                    progress.unlocked_up_to_level
                );
                progress
            }
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Progress unavailable ({e}), starting fresh");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn ProgressStore) -> Result<(), StoreError> {
        store.set(PROGRESS_KEY, &self.to_json())
    }

    /// Re-read the store, merge this record in and write the result back
    pub fn merge_into(&self, store: &mut dyn ProgressStore) -> Result<Progress, StoreError> {
        let mut merged = Self::load(store);
        merged.merge(self);
        merged.save(store)?;
        Ok(merged)
    }

    /// Record for `level` (zeros if never played)
    pub fn level(&self, level: u32) -> LevelRecord {
        self.levels.get(&level).copied().unwrap_or_default()
    }

    pub fn is_unlocked(&self, level: u32) -> bool {
        (1..=self.unlocked_up_to_level).contains(&level)
    }

    /// Fold one finished attempt into the record
    pub fn record_result(&mut self, level: u32, score: u64, furthest_ratio: f32, completed: bool) {
        let attempt = LevelRecord {
            best_score: score,
            furthest_ratio: sanitize_ratio(furthest_ratio as f64),
        };
        self.levels.entry(level).or_default().merge(&attempt);
        self.best_score_overall = self.best_score_overall.max(score);
        if completed {
            self.unlock_after(level);
        }
    }

    /// Completing `level` makes the next one selectable
    pub fn unlock_after(&mut self, level: u32) {
        let next = (level + 1).min(LEVEL_COUNT);
        self.unlocked_up_to_level = self.unlocked_up_to_level.max(next);
    }

    /// Max-merge every field of `other` into `self`
    pub fn merge(&mut self, other: &Progress) {
        for (level, record) in &other.levels {
            self.levels.entry(*level).or_default().merge(record);
        }
        self.best_score_overall = self.best_score_overall.max(other.best_score_overall);
        self.unlocked_up_to_level = self.unlocked_up_to_level.max(other.unlocked_up_to_level);
    }
}
