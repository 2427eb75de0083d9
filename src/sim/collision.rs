//! Collision utilities
//!
//! Axis-aligned boxes in screen space (y grows downward) plus a circle test
//! for saws. Pure functions, shared by the live tick and the look-ahead
//! simulation.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle: top-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    #[inline]
    pub fn left(&self) -> f32 {
        self.pos.x
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    #[inline]
    pub fn top(&self) -> f32 {
        self.pos.y
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    /// Shift horizontally (scrolling)
    #[inline]
    pub fn shift_x(&mut self, dx: f32) {
        self.pos.x += dx;
    }
}

/// Do two boxes intersect? Touching edges count as overlapping.
#[inline]
pub fn boxes_overlap(a: &Rect, b: &Rect) -> bool {
    !(a.right() < b.left() || a.left() > b.right() || a.bottom() < b.top() || a.top() > b.bottom())
}

/// Does a circle overlap a box?
///
/// The circle center is clamped into the box to find the nearest point,
/// whose squared distance is compared against `r²`.
#[inline]
pub fn circle_overlaps_box(center: Vec2, radius: f32, rect: &Rect) -> bool {
    let nearest = center.clamp(rect.min(), rect.max());
    center.distance_squared(nearest) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_basic() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        let c = Rect::new(20.0, 0.0, 5.0, 5.0);
        assert!(boxes_overlap(&a, &b));
        assert!(boxes_overlap(&b, &a));
        assert!(!boxes_overlap(&a, &c));
        assert!(!boxes_overlap(&c, &a));
    }

    #[test]
    fn test_touching_edges_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        // a.right == b.left
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(boxes_overlap(&a, &b));
        // a.bottom == below.top
        let below = Rect::new(0.0, 10.0, 10.0, 10.0);
        assert!(boxes_overlap(&a, &below));
        // Corner contact
        let corner = Rect::new(10.0, 10.0, 1.0, 1.0);
        assert!(boxes_overlap(&a, &corner));
    }

    #[test]
    fn test_vertical_separation() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(0.0, 10.5, 10.0, 10.0);
        assert!(!boxes_overlap(&a, &b));
    }

    #[test]
    fn test_circle_inside_box() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(circle_overlaps_box(Vec2::new(50.0, 25.0), 1.0, &rect));
    }

    #[test]
    fn test_circle_near_edge() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        // 10 px left of the box with radius 10: touching
        assert!(circle_overlaps_box(Vec2::new(-10.0, 25.0), 10.0, &rect));
        assert!(!circle_overlaps_box(Vec2::new(-10.5, 25.0), 10.0, &rect));
    }

    #[test]
    fn test_circle_near_corner() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        // Corner at (100, 50); center at (103, 54) is exactly 5 away
        assert!(circle_overlaps_box(Vec2::new(103.0, 54.0), 5.0, &rect));
        assert!(!circle_overlaps_box(Vec2::new(103.0, 54.0), 4.9, &rect));
    }
}
