//! World state and core simulation types
//!
//! Everything a run needs to advance deterministically lives on [`World`].
//! Entity x coordinates are screen space: `screen_x = world_x - distance`.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::rng::{SeededRng, seed_digest};
use super::section::{BonusKind, Section, build_level_plan};
use super::snapshot::RewindHistory;
use crate::Tuning;
use crate::consts::*;

/// Where the run stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Still advancing
    Running,
    /// Player reached the finish line
    Complete,
    /// Fatal hazard hit with nothing to absorb it
    Failed,
}

/// Why points were awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreReason {
    ObstaclePassed,
    Coin,
    Bonus,
}

/// Events emitted by the tick for the host (audio, toasts, HUD)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Jump,
    DoubleJump,
    Score { delta: u64, reason: ScoreReason },
    /// Bonus picked up (host shows a toast)
    BonusCollected(BonusKind),
    /// A shield charge absorbed a hit
    ShieldAbsorbed { charges_left: u32 },
    /// Level time ran out; the finish line is now placed
    FinishPlaced { finish_x: f32 },
    /// Gap checkpoint stored for rewind
    Checkpoint { gap_mid_x: f32 },
    /// Fatal hit rolled back to a checkpoint
    Rewound,
    LevelComplete { score: u64, furthest_ratio: f32 },
    RunFailed { score: u64 },
}

/// The runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Horizontal center (fixed on screen)
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Vertical velocity (positive = falling)
    pub vy: f32,
    pub width: f32,
    pub height: f32,
    pub on_ground: bool,
    /// Seconds the current jump has been boosted by holding
    pub jump_hold: f32,
    /// Mid-air jump already spent this airborne period
    pub used_double_jump: bool,
}

impl Player {
    /// Create a player standing on the ground
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            x: tuning.player_x,
            y: GROUND_Y - tuning.player_height,
            vy: 0.0,
            width: tuning.player_width,
            height: tuning.player_height,
            on_ground: true,
            jump_hold: 0.0,
            used_double_jump: false,
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.x - self.width / 2.0
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width / 2.0
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Damage hitbox: a centered box smaller than the sprite
    pub fn hitbox(&self, tuning: &Tuning) -> Rect {
        let w = self.width * tuning.hitbox_width_scale;
        let h = self.height * tuning.hitbox_height_scale;
        Rect::new(self.x - w / 2.0, self.y + (self.height - h) * 0.5, w, h)
    }
}

/// Ground spike; scores once when the player gets past it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spike {
    pub rect: Rect,
    pub passed: bool,
}

/// Hanging spike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CeilingSpike {
    pub rect: Rect,
}

/// One-way surface: platforms and ground blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Rect,
}

/// Vertically oscillating saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saw {
    /// Center x
    pub x: f32,
    /// Center y at zero displacement
    pub base_y: f32,
    pub radius: f32,
    pub amp: f32,
    /// Angular speed (rad/s)
    pub speed: f32,
    pub phase: f32,
}

impl Saw {
    /// Center at simulation time `time`
    pub fn center(&self, time: f32) -> Vec2 {
        Vec2::new(self.x, self.base_y + (time * self.speed + self.phase).sin() * self.amp)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.radius
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub rect: Rect,
    pub taken: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bonus {
    pub rect: Rect,
    pub kind: BonusKind,
    pub taken: bool,
}

/// Active power-up effects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUps {
    /// Hits that will be absorbed
    pub shield_charges: u32,
    /// Mid-air jumps allowed while `time < double_jump_until`
    pub double_jump_until: f32,
    /// Hazards are ignored while `time < invulnerable_until`
    pub invulnerable_until: f32,
}

impl PowerUps {
    pub fn double_jump_active(&self, time: f32) -> bool {
        time < self.double_jump_until
    }

    pub fn invulnerable(&self, time: f32) -> bool {
        time < self.invulnerable_until
    }
}

/// World-space extent of a spawned section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionBounds {
    pub index: usize,
    pub start_x: f32,
    pub end_x: f32,
}

impl SectionBounds {
    pub fn contains(&self, world_x: f32) -> bool {
        world_x >= self.start_x && world_x < self.end_x
    }
}

/// Complete simulation state for one run
#[derive(Debug, Clone)]
pub struct World {
    /// Balance values (fixed for the run)
    pub tuning: Tuning,
    /// Level being played
    pub level: u32,
    /// Generator seed string
    pub seed: String,

    /// Simulation clock (seconds)
    pub time: f32,
    pub level_elapsed: f32,
    pub level_time_left: f32,
    /// Scroll speed (px/s), ramps linearly
    pub speed: f32,
    /// Distance scrolled so far
    pub distance: f32,
    /// Completed ticks
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

    /// World x where the next section starts (never decreases while spawning)
    pub spawn_cursor: f32,
    /// Pre-generated sections for this level
    pub plan: Vec<Section>,
    /// Next plan entry to place
    pub next_section_index: usize,
    /// Bounds of every section spawned so far
    pub sections: Vec<SectionBounds>,
    pub stop_spawning: bool,
    pub time_up: bool,
    /// Finish line (world x), set once time is up
    pub finish_x: Option<f32>,
    pub status: RunStatus,

    /// Jump button currently held
    pub jump_held: bool,
    /// Level content stream
    pub level_rng: SeededRng,
    /// Cosmetic stream (coins above spikes); seeded so replays stay exact
    pub cosmetic_rng: Pcg32,

    /// Gap checkpoints (only filled when rewind is enabled)
    pub rewind: RewindHistory,
    /// Best furthest ratio on record when the level started
    pub furthest_ratio_at_start: f32,

    events: Vec<GameEvent>,
}

impl World {
    /// Create a world at the start of `level`, generating its plan from `seed`
    pub fn new(level: u32, seed: &str, tuning: Tuning) -> Self {
        let mut level_rng = SeededRng::from_seed_str(seed);
        let plan = build_level_plan(level, &tuning, &mut level_rng);
        log::info!(
            "Level {} (seed {:?}): {} planned sections",
            level,
            seed,
            plan.len()
        );

        Self {
            level,
            seed: seed.to_string(),
            time: 0.0,
            level_elapsed: 0.0,
            level_time_left: LEVEL_DURATION_SECS,
            speed: tuning.start_speed,
            distance: 0.0,
            tick: 0,
            score: 0,
            player: Player::new(&tuning),
            power: PowerUps::default(),
            spikes: Vec::new(),
            platforms: Vec::new(),
            blocks: Vec::new(),
            saws: Vec::new(),
            coins: Vec::new(),
            bonuses: Vec::new(),
            ceiling_spikes: Vec::new(),
            spawn_cursor: tuning.start_gap,
            plan,
            next_section_index: 0,
            sections: Vec::new(),
            stop_spawning: false,
            time_up: false,
            finish_x: None,
            status: RunStatus::Running,
            jump_held: false,
            level_rng,
            cosmetic_rng: Pcg32::seed_from_u64(seed_digest(seed)),
            rewind: RewindHistory::new(tuning.rewind_capacity),
            furthest_ratio_at_start: 0.0,
            events: Vec::new(),
            tuning,
        }
    }

    /// Player position along the level
    pub fn player_world_x(&self) -> f32 {
        self.distance + self.player.x
    }

    /// Fraction of the level covered (0..1)
    pub fn progress_ratio(&self) -> f32 {
        let total = crate::level_target_distance(&self.tuning);
        if total <= 0.0 {
            return 0.0;
        }
        (self.player_world_x() / total).clamp(0.0, 1.0)
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Award points
    pub fn add_score(&mut self, delta: u64, reason: ScoreReason) {
        self.score += delta;
        self.push_event(GameEvent::Score { delta, reason });
    }

    /// Total number of live entities (all collections)
    pub fn entity_count(&self) -> usize {
        self.spikes.len()
            + self.platforms.len()
            + self.blocks.len()
            + self.saws.len()
            + self.coins.len()
            + self.bonuses.len()
            + self.ceiling_spikes.len()
    }

    /// Shift every entity horizontally
    pub fn shift_entities(&mut self, dx: f32) {
        for s in &mut self.spikes {
            s.rect.shift_x(dx);
        }
        for p in self.platforms.iter_mut().chain(self.blocks.iter_mut()) {
            p.rect.shift_x(dx);
        }
        for s in &mut self.saws {
            s.x += dx;
        }
        for c in &mut self.coins {
            c.rect.shift_x(dx);
        }
        for b in &mut self.bonuses {
            b.rect.shift_x(dx);
        }
        for t in &mut self.ceiling_spikes {
            t.rect.shift_x(dx);
        }
    }

    /// Drop entities fully past the left edge, and collected pickups
    pub fn cull_entities(&mut self) {
        let edge = -CULL_MARGIN;
        self.spikes.retain(|s| s.rect.right() > edge);
        self.platforms.retain(|p| p.rect.right() > edge);
        self.blocks.retain(|p| p.rect.right() > edge);
        self.saws.retain(|s| s.x + s.radius * 2.0 > edge);
        self.coins.retain(|c| c.rect.right() > edge && !c.taken);
        self.bonuses.retain(|b| b.rect.right() > edge && !b.taken);
        self.ceiling_spikes.retain(|t| t.rect.right() > edge);
    }
}
