//! Procedural level content
//!
//! A level is a plan of sections. Each section is an abstract template: a
//! length plus items positioned relative to the section start. Everything is
//! drawn from the level's seeded RNG in a fixed call order, so a seed always
//! produces the same plan.

use serde::{Deserialize, Serialize};

use super::rng::SeededRng;
use crate::consts::MAX_PLAN_SECTIONS;
use crate::{Tuning, level_target_distance};

/// Bonus pickup types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusKind {
    /// Absorbs one hazard hit
    Shield,
    /// Time-boxed extra mid-air jump
    #[serde(rename = "double")]
    DoubleJump,
}

/// One item in a section template. Heights are measured up from the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum SectionItem {
    /// Landable platform `rise` px above the ground
    Platform { dx: f32, width: f32, rise: f32 },
    /// Ground spike; its width is rolled when placed
    Spike { dx: f32, height: f32 },
    /// Solid ground block (landable from above)
    Block { dx: f32, width: f32, height: f32 },
    /// Saw oscillating vertically around `height`
    Saw {
        dx: f32,
        height: f32,
        radius: f32,
        amp: f32,
        speed: f32,
    },
    /// Hanging spike; vertical placement is resolved against platforms when placed
    CeilingSpike { dx: f32, width: f32, height: f32 },
    /// Horizontal row of coins
    CoinLine {
        dx: f32,
        height: f32,
        count: u32,
        gap: f32,
    },
    /// Coins along an arc centered `height` above the ground
    CoinArc {
        dx: f32,
        height: f32,
        radius: f32,
        spread: f32,
    },
    Bonus { dx: f32, height: f32, kind: BonusKind },
}

impl SectionItem {
    /// Offset from the section start
    pub fn dx(&self) -> f32 {
        match *self {
            SectionItem::Platform { dx, .. }
            | SectionItem::Spike { dx, .. }
            | SectionItem::Block { dx, .. }
            | SectionItem::Saw { dx, .. }
            | SectionItem::CeilingSpike { dx, .. }
            | SectionItem::CoinLine { dx, .. }
            | SectionItem::CoinArc { dx, .. }
            | SectionItem::Bonus { dx, .. } => dx,
        }
    }
}

/// A not-yet-placed chunk of level content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// World-space extent the spawn cursor advances by
    pub length: f32,
    pub items: Vec<SectionItem>,
}

/// Draw `base + floor(r * span)`
fn roll(rng: &mut SeededRng, base: f32, span: u32) -> f32 {
    base + rng.below(span) as f32
}

/// Generate one section for `level` at normalized progress `phase` (0..1)
pub fn generate_section(level: u32, phase: f32, rng: &mut SeededRng) -> Section {
    let level_f = level as f64;
    let phase_f = phase as f64;

    let base_len = 640.0 + rng.below(280) as f64;
    let length = (base_len * (1.0 + phase_f * 0.22 + level_f * 0.08)).floor() as f32;
    let mut items = Vec::new();

    // 0 for level 1, grows with level
    let difficulty = level.saturating_sub(1) as f64;
    let platform_prob = (0.75 - difficulty * 0.05).max(0.35);
    let saw_prob = (0.7 + difficulty * 0.03).min(0.9);

    // Platform chain
    if rng.chance(platform_prob) {
        let width = roll(rng, 160.0, 80);
        let rise = roll(rng, 80.0, 80);
        items.push(SectionItem::Platform { dx: 180.0, width, rise });
        if rng.chance(0.5 + phase_f * 0.4) {
            let width = roll(rng, 140.0, 100);
            let rise = roll(rng, 100.0, 120);
            items.push(SectionItem::Platform { dx: 420.0, width, rise });
        }
    }

    // Ground spikes; the count bound is re-rolled before every spike
    let spike_count =
        (5 + (level_f * 0.8).floor() as u32 + (difficulty * 0.4).floor() as u32).min(12) as f64;
    let min_spikes = (2.0 + phase_f * 2.0).floor() as u32;
    let mut s = 0u32;
    loop {
        let bound = min_spikes + (rng.next_f64() * spike_count * 0.5).floor() as u32;
        if s >= bound {
            break;
        }
        let height = roll(rng, 60.0, 40);
        items.push(SectionItem::Spike {
            dx: 240.0 + s as f32 * 160.0,
            height,
        });
        s += 1;
    }

    if rng.chance(0.55) {
        let dx = roll(rng, 200.0, 320);
        let height = roll(rng, 28.0, 16);
        items.push(SectionItem::Block { dx, width: 120.0, height });
    }

    // Saws get more likely and faster with level
    if rng.chance(saw_prob) {
        let height = roll(rng, 110.0, 80);
        let radius = roll(rng, 18.0, 8);
        let amp = roll(rng, 34.0, 50);
        let speed = (2.2 + phase_f * 1.2 + level_f * 0.25) as f32;
        items.push(SectionItem::Saw {
            dx: 520.0,
            height,
            radius,
            amp,
            speed,
        });
    }

    // Ceiling spikes from level 2 onward
    if level >= 2 && rng.chance(0.25 + phase_f * 0.25 + (difficulty * 0.04).min(0.2)) {
        let height = roll(rng, 40.0, 50);
        let dx = roll(rng, 520.0, 240);
        items.push(SectionItem::CeilingSpike { dx, width: 32.0, height });
    }

    // Coins
    if rng.chance(0.75) {
        let height = roll(rng, 140.0, 80);
        let count = 5 + rng.below(3);
        items.push(SectionItem::CoinLine {
            dx: 260.0,
            height,
            count,
            gap: 32.0,
        });
    }
    if rng.chance(0.35 + phase_f * 0.25) {
        let radius = roll(rng, 80.0, 40);
        let spread = (std::f64::consts::PI * (0.7 + rng.next_f64() * 0.4)) as f32;
        items.push(SectionItem::CoinArc {
            dx: 520.0,
            height: 200.0,
            radius,
            spread,
        });
    }

    // Bonuses thin out at higher levels
    let bonus_prob = (0.25 - difficulty * 0.02).max(0.15);
    if rng.chance(bonus_prob) {
        let height = roll(rng, 170.0, 40);
        let kind = if rng.chance(0.5) {
            BonusKind::Shield
        } else {
            BonusKind::DoubleJump
        };
        items.push(SectionItem::Bonus { dx: 340.0, height, kind });
    }

    // Closing spike
    if rng.chance((0.4 + phase_f).min(0.7)) {
        items.push(SectionItem::Spike {
            dx: 740.0,
            height: 70.0,
        });
    }

    Section { length, items }
}

/// Build the section plan covering a level's estimated distance
///
/// Phase rises with accumulated length. The section cap keeps a degenerate
/// generator from looping forever; a short plan is returned as-is and the
/// spawner synthesizes sections once it runs out.
pub fn build_level_plan(level: u32, tuning: &Tuning, rng: &mut SeededRng) -> Vec<Section> {
    let target = level_target_distance(tuning);
    let mut acc = 0.0f32;
    let mut plan = Vec::new();
    while acc < target && plan.len() < MAX_PLAN_SECTIONS {
        let phase = acc / target;
        let section = generate_section(level, phase, rng);
        acc += section.length;
        plan.push(section);
    }
    if acc < target {
        log::warn!(
            "Level {level} plan stopped at {} sections ({acc:.0}/{target:.0} px)",
            plan.len()
        );
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spikes_in(section: &Section) -> usize {
        section
            .items
            .iter()
            .filter(|i| matches!(i, SectionItem::Spike { .. }))
            .count()
    }

    #[test]
    fn test_same_seed_same_section() {
        let mut a = SeededRng::from_seed_str("2-L1");
        let mut b = SeededRng::from_seed_str("2-L1");
        for phase in [0.0, 0.3, 0.9] {
            assert_eq!(generate_section(1, phase, &mut a), generate_section(1, phase, &mut b));
        }
    }

    #[test]
    fn test_every_section_has_two_spikes() {
        let mut rng = SeededRng::from_seed_str("spikes");
        for level in 1..=10 {
            for _ in 0..20 {
                let section = generate_section(level, 0.0, &mut rng);
                assert!(spikes_in(&section) >= 2);
            }
        }
    }

    #[test]
    fn test_no_ceiling_spikes_on_level_one() {
        let mut rng = SeededRng::from_seed_str("ceiling");
        for _ in 0..200 {
            let section = generate_section(1, 1.0, &mut rng);
            assert!(
                !section
                    .items
                    .iter()
                    .any(|i| matches!(i, SectionItem::CeilingSpike { .. }))
            );
        }
    }

    #[test]
    fn test_length_scales_with_level() {
        let mut rng = SeededRng::from_seed_str("len");
        for _ in 0..50 {
            let section = generate_section(1, 0.0, &mut rng);
            // 640..919 base, scaled by 1.08
            assert!(section.length >= 691.0 && section.length <= 993.0);
        }
    }

    #[test]
    fn test_item_ranges() {
        let mut rng = SeededRng::from_seed_str("ranges");
        for _ in 0..200 {
            let section = generate_section(5, 0.5, &mut rng);
            for item in &section.items {
                match *item {
                    SectionItem::Platform { width, rise, .. } => {
                        assert!((140.0..240.0).contains(&width));
                        assert!((80.0..220.0).contains(&rise));
                    }
                    SectionItem::Spike { height, .. } => assert!((60.0..=100.0).contains(&height)),
                    SectionItem::Saw { radius, amp, .. } => {
                        assert!((18.0..26.0).contains(&radius));
                        assert!((34.0..84.0).contains(&amp));
                    }
                    SectionItem::CeilingSpike { height, dx, .. } => {
                        assert!((40.0..90.0).contains(&height));
                        assert!((520.0..760.0).contains(&dx));
                    }
                    SectionItem::CoinLine { count, .. } => assert!((5..=7).contains(&count)),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_plan_reaches_target() {
        let tuning = Tuning::default();
        let mut rng = SeededRng::from_seed_str("2-L1");
        let plan = build_level_plan(1, &tuning, &mut rng);
        let total: f32 = plan.iter().map(|s| s.length).sum();
        assert!(total >= level_target_distance(&tuning));
        // Dropping the last section falls short
        let last = plan.last().map(|s| s.length).unwrap_or(0.0);
        assert!(total - last < level_target_distance(&tuning));
    }

    #[test]
    fn test_plan_capped() {
        let tuning = Tuning {
            plan_margin: 1.0e9,
            ..Default::default()
        };
        let mut rng = SeededRng::from_seed_str("runaway");
        let plan = build_level_plan(1, &tuning, &mut rng);
        assert_eq!(plan.len(), MAX_PLAN_SECTIONS);
    }

    #[test]
    fn test_item_json_shape() {
        let item = SectionItem::Bonus {
            dx: 340.0,
            height: 180.0,
            kind: BonusKind::DoubleJump,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""t":"bonus""#));
        assert!(json.contains(r#""kind":"double""#));
    }
}
