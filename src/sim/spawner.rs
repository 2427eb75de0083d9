//! Entity spawner
//!
//! Turns abstract sections into concrete entities. Placement math runs in
//! world space; entities are stored in screen space, so every x is shifted
//! by `-distance` as it is pushed.

use rand::Rng;

use super::collision::Rect;
use super::section::{Section, SectionItem, generate_section};
use super::state::{Bonus, CeilingSpike, Coin, Platform, SectionBounds, Saw, Spike, World};
use crate::consts::GROUND_Y;

/// Coin and bonus pickups are square
const PICKUP_SIZE: f32 = 28.0;
/// Pickups hang this far above their nominal height
const PICKUP_LIFT: f32 = 14.0;
/// Phase used for sections synthesized after the plan runs out
const OVERFLOW_PHASE: f32 = 0.9;

/// Horizontal extent of placed hazards and surfaces (world space)
#[derive(Debug, Clone, Copy)]
struct Extent {
    first: f32,
    last: f32,
}

impl Extent {
    fn empty() -> Self {
        Self {
            first: f32::INFINITY,
            last: f32::NEG_INFINITY,
        }
    }

    fn include(&mut self, left: f32, right: f32) {
        self.first = self.first.min(left);
        self.last = self.last.max(right);
    }

    fn is_empty(&self) -> bool {
        !self.first.is_finite()
    }
}

/// Place every item of `section` at the spawn cursor, then advance the cursor
///
/// Returns the realized bounds and whether any hazard or surface was placed.
pub fn place_section(world: &mut World, section: &Section, index: usize) -> (SectionBounds, bool) {
    let base = world.spawn_cursor;
    let offset = world.distance;
    let mut extent = Extent::empty();

    // Platform tops in this section, for ceiling-spike clearance
    let platform_tops: Vec<(f32, f32)> = section
        .items
        .iter()
        .filter_map(|item| match *item {
            SectionItem::Platform { dx, rise, .. } => {
                Some((dx, GROUND_Y - rise - world.tuning.platform_thickness))
            }
            _ => None,
        })
        .collect();

    for item in &section.items {
        let x = base + item.dx();
        match *item {
            SectionItem::Platform { width, rise, .. } => {
                let thickness = world.tuning.platform_thickness;
                let left = x + width;
                let top = GROUND_Y - rise - thickness;
                world.platforms.push(Platform {
                    rect: Rect::new(left - offset, top, width, thickness),
                });
                extent.include(left, left + width);
            }
            SectionItem::Block { width, height, .. } => {
                let left = x + width;
                world.blocks.push(Platform {
                    rect: Rect::new(left - offset, GROUND_Y - height, width, height),
                });
                extent.include(left, left + width);
            }
            SectionItem::Spike { height, .. } => {
                let width = world.level_rng.range_inclusive(
                    world.tuning.spike_min_width as u32,
                    world.tuning.spike_max_width as u32,
                ) as f32;
                let left = x + width;
                let top = GROUND_Y - height;
                world.spikes.push(Spike {
                    rect: Rect::new(left - offset, top, width, height),
                    passed: false,
                });
                extent.include(left, left + width);

                let rate = world.tuning.coin_above_spike_rate;
                if world.cosmetic_rng.random::<f32>() < rate {
                    world.coins.push(Coin {
                        rect: Rect::new(
                            left + width * 0.5 - offset,
                            top - 48.0,
                            PICKUP_SIZE,
                            PICKUP_SIZE,
                        ),
                        taken: false,
                    });
                }
            }
            SectionItem::CeilingSpike { dx, width, height } => {
                let nearest = platform_tops
                    .iter()
                    .copied()
                    .reduce(|best, cand| {
                        if (cand.0 - dx).abs() < (best.0 - dx).abs() {
                            cand
                        } else {
                            best
                        }
                    });
                let desired_top = match nearest {
                    Some((_, plat_top)) => {
                        let margin = 36.0 + world.level_rng.below(18) as f32;
                        (plat_top - margin - height).max(0.0)
                    }
                    None => ((GROUND_Y - 220.0).max(120.0) - height).max(0.0),
                };
                let lowest_top =
                    (GROUND_Y - world.tuning.ceiling_ground_clearance - height).max(0.0);
                let top = desired_top.min(lowest_top);
                let left = x + width;
                world.ceiling_spikes.push(CeilingSpike {
                    rect: Rect::new(left - offset, top, width, height),
                });
                extent.include(left, left + width);
            }
            SectionItem::Saw {
                height,
                radius,
                amp,
                speed,
                ..
            } => {
                let center = x + radius * 2.0;
                let phase = (world.level_rng.next_f64() * std::f64::consts::TAU) as f32;
                world.saws.push(Saw {
                    x: center - offset,
                    base_y: GROUND_Y - height,
                    radius,
                    amp,
                    speed,
                    phase,
                });
                extent.include(center - radius, center + radius);
            }
            SectionItem::CoinLine {
                height, count, gap, ..
            } => {
                let y = GROUND_Y - height - PICKUP_LIFT;
                for i in 0..count {
                    world.coins.push(Coin {
                        rect: Rect::new(x + i as f32 * gap - offset, y, PICKUP_SIZE, PICKUP_SIZE),
                        taken: false,
                    });
                }
            }
            SectionItem::CoinArc {
                height,
                radius,
                spread,
                ..
            } => {
                let center_y = GROUND_Y - height;
                let steps = ((spread / 0.35).floor() as u32).max(4);
                for i in 0..steps {
                    let t = -spread / 2.0 + (i as f32 / (steps - 1) as f32) * spread;
                    world.coins.push(Coin {
                        rect: Rect::new(
                            x + t.cos() * radius - offset,
                            center_y - t.sin() * radius - PICKUP_LIFT,
                            PICKUP_SIZE,
                            PICKUP_SIZE,
                        ),
                        taken: false,
                    });
                }
            }
            SectionItem::Bonus { height, kind, .. } => {
                world.bonuses.push(Bonus {
                    rect: Rect::new(
                        x - offset,
                        GROUND_Y - height - PICKUP_LIFT,
                        PICKUP_SIZE,
                        PICKUP_SIZE,
                    ),
                    kind,
                    taken: false,
                });
            }
        }
    }

    world.spawn_cursor += section.length;

    let placed = !extent.is_empty();
    let bounds = if placed {
        SectionBounds {
            index,
            start_x: extent.first,
            end_x: extent.last,
        }
    } else {
        SectionBounds {
            index,
            start_x: base,
            end_x: base + section.length,
        }
    };
    (bounds, placed)
}

/// Place the next planned section, synthesizing one once the plan runs out
pub fn spawn_next(world: &mut World) {
    let index = world.next_section_index;
    let section = match world.plan.get(index) {
        Some(section) => section.clone(),
        None => {
            log::debug!("Plan exhausted, synthesizing section {index}");
            generate_section(world.level, OVERFLOW_PHASE, &mut world.level_rng)
        }
    };

    let (bounds, placed) = place_section(world, &section, index);
    log::debug!(
        "Spawned section {} at {:.0}..{:.0} (cursor {:.0})",
        index,
        bounds.start_x,
        bounds.end_x,
        world.spawn_cursor
    );

    let previous = world.sections.last().copied();
    world.sections.push(bounds);
    world.next_section_index += 1;

    if !world.rewind.enabled || !placed {
        return;
    }
    if let Some(prev) = previous {
        let gap_mid = ((prev.end_x + bounds.start_x) / 2.0).floor();
        if world.rewind.pending_gap_mid.is_none() && gap_mid > world.player_world_x() + 20.0 {
            world.rewind.pending_gap_mid = Some(gap_mid);
        }
    }
}

/// Keep content spawned at least `spawn_ahead` past the scroll distance
pub fn fill_ahead(world: &mut World) {
    if world.stop_spawning {
        return;
    }
    while world.spawn_cursor - world.distance < world.tuning.spawn_ahead {
        spawn_next(world);
    }
}
