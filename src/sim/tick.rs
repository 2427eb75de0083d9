//! Fixed timestep simulation tick
//!
//! Core game loop that advances the world deterministically.

use serde::{Deserialize, Serialize};

use super::collision::{boxes_overlap, circle_overlaps_box};
use super::section::BonusKind;
use super::snapshot::{confirm_gap_checkpoint, rewind_latest};
use super::spawner::fill_ahead;
use super::state::{GameEvent, RunStatus, ScoreReason, World};
use crate::consts::*;

/// Input edges for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    /// Jump button went down this tick
    pub pressed: bool,
    /// Jump button is up at the end of this tick (released after any press)
    pub released: bool,
}

impl TickInput {
    pub const NONE: TickInput = TickInput {
        pressed: false,
        released: false,
    };

    pub fn press() -> Self {
        Self {
            pressed: true,
            released: false,
        }
    }

    pub fn release() -> Self {
        Self {
            pressed: false,
            released: true,
        }
    }
}

/// What a hazard contact turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitOutcome {
    /// Invulnerability window active
    Ignored,
    /// A shield charge took the hit
    Absorbed,
    /// Rolled back to a checkpoint
    Rewound,
    Fatal,
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput, dt: f32) -> RunStatus {
    if !world.is_running() {
        return world.status;
    }

    // Clocks and scroll
    world.time += dt;
    world.level_elapsed += dt;
    world.level_time_left = (world.level_time_left - dt).max(0.0);
    world.speed += world.tuning.speed_gain * dt;
    let scroll = world.speed * dt;
    world.distance += scroll;
    world.tick += 1;
    world.shift_entities(-scroll);

    update_player(world, input, dt);

    fill_ahead(world);
    if world.rewind.enabled {
        confirm_gap_checkpoint(world);
    }

    if check_finish(world) {
        return world.status;
    }

    world.cull_entities();

    if resolve_hazards(world) {
        return world.status;
    }

    collect_pickups(world);
    world.status
}

/// Gravity, jump input, integration, landing and ground contact
fn update_player(world: &mut World, input: &TickInput, dt: f32) {
    let tuning = &world.tuning;
    let time = world.time;
    let double_jump_active = world.power.double_jump_active(time);

    if input.pressed {
        world.jump_held = true;
    }
    if input.released {
        world.jump_held = false;
    }

    let player = &mut world.player;
    player.vy += tuning.gravity * dt;

    let mut jumped = None;
    if player.on_ground && input.pressed {
        player.on_ground = false;
        player.vy = -tuning.jump_impulse;
        player.jump_hold = 0.0;
        jumped = Some(GameEvent::Jump);
    } else if !player.on_ground && input.pressed && double_jump_active && !player.used_double_jump
    {
        player.vy = -tuning.jump_impulse * tuning.double_jump_factor;
        player.jump_hold = 0.0;
        player.used_double_jump = true;
        jumped = Some(GameEvent::DoubleJump);
    } else if !player.on_ground && world.jump_held && player.jump_hold < tuning.max_jump_hold {
        // Variable jump height
        player.vy -= tuning.hold_boost * dt;
        player.jump_hold += dt;
    }

    let prev_bottom = player.bottom();
    player.y += player.vy * dt;
    player.on_ground = false;

    // One-way landing from above
    if player.vy >= 0.0 {
        let curr_bottom = player.bottom();
        let (left, right) = (player.left(), player.right());
        let landing = world
            .platforms
            .iter()
            .chain(world.blocks.iter())
            .map(|surface| &surface.rect)
            .find(|rect| {
                let top = rect.top();
                right > rect.left() && left < rect.right() && prev_bottom <= top && curr_bottom >= top
            })
            .map(|rect| rect.top());
        if let Some(top) = landing {
            player.y = top - player.height;
            player.vy = 0.0;
            player.on_ground = true;
            player.used_double_jump = false;
        }
    }

    let ground_top = GROUND_Y - player.height;
    if player.y >= ground_top {
        player.y = ground_top;
        player.vy = 0.0;
        player.on_ground = true;
        player.used_double_jump = false;
    }

    if let Some(event) = jumped {
        world.push_event(event);
    }
}

/// Place the finish line once time is up; returns true when the level completes
fn check_finish(world: &mut World) -> bool {
    let player_x = world.player_world_x();

    if !world.time_up && world.level_time_left <= 0.0 {
        world.time_up = true;
        world.stop_spawning = true;
        let current = world
            .sections
            .iter()
            .find(|s| s.contains(player_x))
            .or(world.sections.last())
            .copied();
        // With nothing spawned the level finishes on the spot
        let finish_x = current.map_or(player_x, |s| s.end_x + world.tuning.finish_offset());
        world.finish_x = Some(finish_x);
        log::debug!("Time up: finish line at x={finish_x:.0}");
        world.push_event(GameEvent::FinishPlaced { finish_x });
    }

    match world.finish_x {
        Some(finish_x) if world.time_up && player_x >= finish_x => {
            world.status = RunStatus::Complete;
            log::info!(
                "Level {} complete: score {} in {:.2}s",
                world.level,
                world.score,
                world.level_elapsed
            );
            world.push_event(GameEvent::LevelComplete {
                score: world.score,
                furthest_ratio: 1.0,
            });
            true
        }
        _ => false,
    }
}

/// Shield, invulnerability and rewind handling for one hazard contact
fn resolve_hit(world: &mut World) -> HitOutcome {
    if world.power.invulnerable(world.time) {
        return HitOutcome::Ignored;
    }
    if world.power.shield_charges > 0 {
        world.power.shield_charges -= 1;
        world.power.invulnerable_until = world.time + world.tuning.shield_invulnerability;
        world.push_event(GameEvent::ShieldAbsorbed {
            charges_left: world.power.shield_charges,
        });
        return HitOutcome::Absorbed;
    }
    if world.rewind.enabled && rewind_latest(world) {
        return HitOutcome::Rewound;
    }
    world.status = RunStatus::Failed;
    log::info!(
        "Run failed on level {} at x={:.0}: score {}",
        world.level,
        world.player_world_x(),
        world.score
    );
    world.push_event(GameEvent::RunFailed { score: world.score });
    HitOutcome::Fatal
}

/// Returns true when a hit ended or rewound the tick
fn resolve_hazards(world: &mut World) -> bool {
    let hitbox = world.player.hitbox(&world.tuning);
    let stop = |outcome: HitOutcome| matches!(outcome, HitOutcome::Fatal | HitOutcome::Rewound);

    for i in 0..world.spikes.len() {
        if boxes_overlap(&hitbox, &world.spikes[i].rect) && stop(resolve_hit(world)) {
            return true;
        }
        let player_x = world.player.x;
        let spike = &mut world.spikes[i];
        if !spike.passed && spike.rect.right() < player_x {
            spike.passed = true;
            let points = world.tuning.obstacle_points;
            world.add_score(points, ScoreReason::ObstaclePassed);
        }
    }

    for i in 0..world.ceiling_spikes.len() {
        if boxes_overlap(&hitbox, &world.ceiling_spikes[i].rect) && stop(resolve_hit(world)) {
            return true;
        }
    }

    for i in 0..world.saws.len() {
        let saw = &world.saws[i];
        if circle_overlaps_box(saw.center(world.time), saw.radius, &hitbox)
            && stop(resolve_hit(world))
        {
            return true;
        }
    }

    false
}

/// Coins and bonuses touching the hitbox
fn collect_pickups(world: &mut World) {
    let hitbox = world.player.hitbox(&world.tuning);

    let mut coins = 0;
    for coin in &mut world.coins {
        if !coin.taken && boxes_overlap(&hitbox, &coin.rect) {
            coin.taken = true;
            coins += 1;
        }
    }
    for _ in 0..coins {
        let points = world.tuning.coin_points;
        world.add_score(points, ScoreReason::Coin);
    }

    let mut collected = Vec::new();
    for bonus in &mut world.bonuses {
        if !bonus.taken && boxes_overlap(&hitbox, &bonus.rect) {
            bonus.taken = true;
            collected.push(bonus.kind);
        }
    }
    for kind in collected {
        match kind {
            BonusKind::Shield => world.power.shield_charges += 1,
            BonusKind::DoubleJump => {
                world.power.double_jump_until = world.time + world.tuning.double_jump_duration;
            }
        }
        log::debug!("Collected {kind:?} bonus");
        world.push_event(GameEvent::BonusCollected(kind));
        let points = world.tuning.bonus_points;
        world.add_score(points, ScoreReason::Bonus);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::sim::collision::Rect;
    use crate::sim::state::{Platform, SectionBounds, Spike};

    /// World with spawning disabled, so only hand-placed entities exist
    fn empty_world() -> World {
        let mut world = World::new(1, "test", Tuning::default());
        world.stop_spawning = true;
        world
    }

    fn apex(world: &mut World, inputs: &[TickInput], ticks: usize) -> f32 {
        let mut min_y = world.player.y;
        for i in 0..ticks {
            let input = inputs.get(i).copied().unwrap_or_default();
            tick(world, &input, SIM_DT);
            min_y = min_y.min(world.player.y);
        }
        min_y
    }

    #[test]
    fn test_idle_player_stays_grounded() {
        let mut world = empty_world();
        for _ in 0..240 {
            tick(&mut world, &TickInput::NONE, SIM_DT);
        }
        assert!(world.player.on_ground);
        assert_eq!(world.player.bottom(), GROUND_Y);
        assert_eq!(world.tick, 240);
        assert!(world.distance > 640.0);
    }

    #[test]
    fn test_jump_leaves_ground() {
        let mut world = empty_world();
        tick(&mut world, &TickInput::press(), SIM_DT);
        assert!(!world.player.on_ground);
        assert!(world.player.vy < 0.0);
        assert!(world.drain_events().contains(&GameEvent::Jump));

        // Eventually lands again
        for _ in 0..240 {
            tick(&mut world, &TickInput::NONE, SIM_DT);
        }
        assert!(world.player.on_ground);
    }

    #[test]
    fn test_hold_jumps_higher() {
        let tap = [TickInput::press(), TickInput::release()];
        let hold = [TickInput::press()];
        let tap_apex = apex(&mut empty_world(), &tap, 120);
        let hold_apex = apex(&mut empty_world(), &hold, 120);
        assert!(hold_apex < tap_apex - 20.0);
    }

    #[test]
    fn test_press_and_release_same_tick_still_jumps() {
        let mut world = empty_world();
        let input = TickInput {
            pressed: true,
            released: true,
        };
        tick(&mut world, &input, SIM_DT);
        assert!(!world.player.on_ground);
        assert!(!world.jump_held);
    }

    #[test]
    fn test_double_jump_needs_window() {
        let mut world = empty_world();
        tick(&mut world, &TickInput::press(), SIM_DT);
        for _ in 0..20 {
            tick(&mut world, &TickInput::release(), SIM_DT);
        }
        tick(&mut world, &TickInput::press(), SIM_DT);
        assert!(!world.player.used_double_jump);

        let mut world = empty_world();
        world.power.double_jump_until = 100.0;
        tick(&mut world, &TickInput::press(), SIM_DT);
        for _ in 0..20 {
            tick(&mut world, &TickInput::release(), SIM_DT);
        }
        world.drain_events();
        tick(&mut world, &TickInput::press(), SIM_DT);
        assert!(world.player.used_double_jump);
        assert!((world.player.vy + 810.0).abs() < 0.01);
        assert!(world.drain_events().contains(&GameEvent::DoubleJump));

        // Only once per airborne period
        tick(&mut world, &TickInput::release(), SIM_DT);
        tick(&mut world, &TickInput::press(), SIM_DT);
        assert!(world.player.vy > -810.0);
    }

    #[test]
    fn test_lands_on_platform_from_above() {
        let mut world = empty_world();
        world.platforms.push(Platform {
            rect: Rect::new(60.0, 400.0, 200.0, 18.0),
        });
        world.player.y = 400.0 - world.player.height - 1.0;
        world.player.vy = 200.0;
        world.player.on_ground = false;
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert!(world.player.on_ground);
        assert_eq!(world.player.bottom(), 400.0);
        assert_eq!(world.player.vy, 0.0);

        // Stays on it
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert_eq!(world.player.bottom(), 400.0);
    }

    #[test]
    fn test_platform_is_one_way() {
        let mut world = empty_world();
        world.platforms.push(Platform {
            rect: Rect::new(60.0, 400.0, 200.0, 18.0),
        });
        // Rising through from below
        world.player.y = 420.0;
        world.player.vy = -600.0;
        world.player.on_ground = false;
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert!(!world.player.on_ground);
        assert!(world.player.y < 420.0);
    }

    #[test]
    fn test_spike_scores_once() {
        let mut world = empty_world();
        world.spikes.push(Spike {
            rect: Rect::new(world.player.x - 100.0, GROUND_Y - 60.0, 30.0, 60.0),
            passed: false,
        });
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert_eq!(world.score, 1);
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert_eq!(world.score, 1);
        assert!(world.spikes[0].passed);
    }

    #[test]
    fn test_spike_contact_fails_run() {
        let mut world = empty_world();
        world.spikes.push(Spike {
            rect: Rect::new(world.player.x, GROUND_Y - 60.0, 30.0, 60.0),
            passed: false,
        });
        assert_eq!(tick(&mut world, &TickInput::NONE, SIM_DT), RunStatus::Failed);
        assert!(
            world
                .drain_events()
                .contains(&GameEvent::RunFailed { score: 0 })
        );
        // Terminal: further ticks do nothing
        let t = world.time;
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert_eq!(world.time, t);
    }

    #[test]
    fn test_shield_absorbs_and_grants_window() {
        let mut world = empty_world();
        world.power.shield_charges = 1;
        world.spikes.push(Spike {
            rect: Rect::new(world.player.x, GROUND_Y - 60.0, 30.0, 60.0),
            passed: false,
        });
        assert_eq!(tick(&mut world, &TickInput::NONE, SIM_DT), RunStatus::Running);
        assert_eq!(world.power.shield_charges, 0);
        assert!((world.power.invulnerable_until - (world.time + 0.8)).abs() < 1e-5);
        // Still touching but invulnerable
        assert_eq!(tick(&mut world, &TickInput::NONE, SIM_DT), RunStatus::Running);
    }

    #[test]
    fn test_finish_after_time_up() {
        let mut world = empty_world();
        world.level_time_left = SIM_DT / 2.0;
        world.sections.push(SectionBounds {
            index: 0,
            start_x: 0.0,
            end_x: 200.0,
        });
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert!(world.time_up);
        assert_eq!(world.finish_x, Some(560.0));
        assert_eq!(world.status, RunStatus::Running);

        world.distance = 1000.0;
        assert_eq!(tick(&mut world, &TickInput::NONE, SIM_DT), RunStatus::Complete);
        assert!(world.drain_events().iter().any(|e| matches!(
            e,
            GameEvent::LevelComplete { furthest_ratio, .. } if *furthest_ratio == 1.0
        )));
    }

    #[test]
    fn test_time_up_without_sections_finishes() {
        let mut world = empty_world();
        world.level_time_left = 0.0;
        assert_eq!(tick(&mut world, &TickInput::NONE, SIM_DT), RunStatus::Complete);
    }

    #[test]
    fn test_offscreen_entities_culled() {
        let mut world = empty_world();
        world.spikes.push(Spike {
            rect: Rect::new(-80.0, GROUND_Y - 60.0, 30.0, 60.0),
            passed: true,
        });
        tick(&mut world, &TickInput::NONE, SIM_DT);
        assert!(world.spikes.is_empty());
    }

    #[test]
    fn test_determinism() {
        let inputs: Vec<TickInput> = (0..1200)
            .map(|i| match i % 90 {
                0 => TickInput::press(),
                12 => TickInput::release(),
                _ => TickInput::NONE,
            })
            .collect();

        let run = || {
            let mut world = World::new(3, "L3-tighter-platforms-L3", Tuning::default());
            for input in &inputs {
                if tick(&mut world, input, SIM_DT) != RunStatus::Running {
                    break;
                }
            }
            world
        };

        let (a, b) = (run(), run());
        assert_eq!(a.tick, b.tick);
        assert_eq!(a.score, b.score);
        assert_eq!(a.status, b.status);
        assert_eq!(a.distance, b.distance);
        assert_eq!(a.player, b.player);
        assert_eq!(a.spikes, b.spikes);
        assert_eq!(a.saws, b.saws);
    }
}
