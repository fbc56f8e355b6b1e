//! Probe result and layer filtering types.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Information about a raycast hit.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct ProbeHit {
    /// World position of the hit point.
    pub point: Vec3,
    /// Normal of the surface at the hit point.
    pub normal: Vec3,
    /// Distance from the ray origin to the hit point.
    pub distance: f32,
}

impl ProbeHit {
    /// Create a hit result.
    pub fn new(point: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            point,
            normal,
            distance,
        }
    }
}

/// Bitmask of collision layers a probe is allowed to hit.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Matches every layer.
    pub const ALL: Self = Self(u32::MAX);

    /// Mask with a single layer bit set.
    pub const fn layer(index: u32) -> Self {
        Self(1 << index)
    }

    /// Whether any bit of `other` is set in this mask.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether the mask matches nothing.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for LayerMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for LayerMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
