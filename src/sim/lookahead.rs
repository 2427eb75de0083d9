//! Look-ahead press simulation and a simple autopilot
//!
//! Candidate presses are tried on a throwaway copy of the world using the
//! same tick as live play, so predictions never drift from the real physics.

use super::state::{RunStatus, World};
use super::tick::{TickInput, tick};
use crate::consts::SIM_DT;

/// Default prediction horizon (seconds)
pub const LOOKAHEAD_WINDOW: f32 = 1.0;

/// Hold durations the autopilot tries, shortest first
const HOLD_CANDIDATES: [f32; 4] = [0.0, 0.08, 0.16, 0.24];
/// Press delays the autopilot considers worth waiting for
const DELAY_CANDIDATES: [f32; 4] = [0.05, 0.1, 0.2, 0.3];
/// Second-press offsets tried while the double-jump window is open
const DOUBLE_JUMP_CANDIDATES: [f32; 3] = [0.3, 0.45, 0.6];

/// A scripted press relative to now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressPlan {
    /// Seconds until the press
    pub delay: f32,
    /// Seconds the button stays down
    pub hold: f32,
    /// Press again this long after the first press
    pub double_jump_after: Option<f32>,
}

impl PressPlan {
    pub fn now(hold: f32) -> Self {
        Self {
            delay: 0.0,
            hold,
            double_jump_after: None,
        }
    }
}

fn ticks(secs: f32) -> u64 {
    (secs.max(0.0) / SIM_DT).round() as u64
}

/// Would the run survive `window` seconds with only the given press (or none)?
///
/// Spending a shield charge counts as not surviving.
fn survives(world: &World, plan: Option<&PressPlan>, window: f32) -> bool {
    let mut sim = world.clone();
    sim.rewind.enabled = false;
    sim.rewind.clear();
    let charges = sim.power.shield_charges;

    let press_at = plan.map(|p| ticks(p.delay));
    let release_at = plan.map(|p| ticks(p.delay) + ticks(p.hold));
    let double_at = plan.and_then(|p| p.double_jump_after.map(|d| ticks(p.delay) + ticks(d)));

    for i in 0..ticks(window).max(1) {
        let mut input = TickInput::NONE;
        if press_at == Some(i) || double_at == Some(i) {
            input.pressed = true;
        }
        if release_at == Some(i) || double_at == Some(i) {
            input.released = true;
        }
        match tick(&mut sim, &input, SIM_DT) {
            RunStatus::Failed => return false,
            RunStatus::Complete => return true,
            RunStatus::Running => {}
        }
        if sim.power.shield_charges < charges {
            return false;
        }
    }
    true
}

/// Simulate a press plan for `window` seconds and report survival
pub fn simulate_press_plan(world: &World, plan: &PressPlan, window: f32) -> bool {
    survives(world, Some(plan), window)
}

/// Simulate doing nothing for `window` seconds and report survival
pub fn simulate_idle(world: &World, window: f32) -> bool {
    survives(world, None, window)
}

/// Does a single press after one of the candidate delays survive?
fn later_press_survives(world: &World, holds: &[f32]) -> bool {
    DELAY_CANDIDATES.iter().any(|&delay| {
        holds.iter().any(|&hold| {
            let plan = PressPlan {
                delay,
                hold,
                double_jump_after: None,
            };
            simulate_press_plan(world, &plan, LOOKAHEAD_WINDOW)
        })
    })
}

/// Picks presses by trying candidate plans against the look-ahead
#[derive(Debug, Clone, Default)]
pub struct Autopilot {
    /// Ticks left before releasing the current press
    hold_ticks_left: u64,
}

impl Autopilot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the input for the world's next tick
    ///
    /// Presses are held back while a later one still survives, so each jump
    /// lands as far past the hazard as possible.
    pub fn next_input(&mut self, world: &World) -> TickInput {
        if self.hold_ticks_left > 0 {
            self.hold_ticks_left -= 1;
            return if self.hold_ticks_left == 0 {
                TickInput::release()
            } else {
                TickInput::NONE
            };
        }

        let player = &world.player;
        if !player.on_ground {
            // Mid-air the only useful press is the double jump
            let can_double =
                world.power.double_jump_active(world.time) && !player.used_double_jump;
            if !can_double
                || simulate_idle(world, LOOKAHEAD_WINDOW)
                || later_press_survives(world, &[0.0])
            {
                return TickInput::NONE;
            }
            return TickInput {
                pressed: true,
                released: true,
            };
        }

        if simulate_idle(world, LOOKAHEAD_WINDOW) || later_press_survives(world, &HOLD_CANDIDATES)
        {
            return TickInput::NONE;
        }

        for hold in HOLD_CANDIDATES {
            if simulate_press_plan(world, &PressPlan::now(hold), LOOKAHEAD_WINDOW) {
                return self.press(hold);
            }
        }

        let max_hold = HOLD_CANDIDATES[HOLD_CANDIDATES.len() - 1];
        if world.power.double_jump_active(world.time) {
            for after in DOUBLE_JUMP_CANDIDATES {
                let plan = PressPlan {
                    delay: 0.0,
                    hold: max_hold,
                    double_jump_after: Some(after),
                };
                if simulate_press_plan(world, &plan, LOOKAHEAD_WINDOW) {
                    log::debug!("Autopilot committing to a double jump after {after:.2}s");
                    return self.press(max_hold);
                }
            }
        }

        log::debug!("Autopilot found no safe plan at x={:.0}", world.player_world_x());
        self.press(max_hold)
    }

    fn press(&mut self, hold: f32) -> TickInput {
        self.hold_ticks_left = ticks(hold);
        TickInput {
            pressed: true,
            released: self.hold_ticks_left == 0,
        }
    }
}
