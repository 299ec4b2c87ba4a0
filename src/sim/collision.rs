//! Axis-aligned bounding box collision
//!
//! Everything in the runner is a rectangle, so overlap is four comparisons.
//! Touching edges do not count as a hit.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::Obstacle;

/// Axis-aligned box, `min` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Strict overlap test
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let a_max = self.max();
        let b_max = other.max();
        self.min.x < b_max.x
            && a_max.x > other.min.x
            && self.min.y < b_max.y
            && a_max.y > other.min.y
    }
}

/// ID of the first obstacle (in spawn order) overlapping the box
pub fn first_hit(hitbox: &Aabb, obstacles: &[Obstacle]) -> Option<u32> {
    obstacles
        .iter()
        .find(|o| hitbox.overlaps(&o.bounds()))
        .map(|o| o.id)
}
