//! Ground, wall and headroom probes.
//!
//! Thin helpers over [`GeometryProbe`] shared by the movement state machine.
//! A missing hit always means "no contact", never an error.

use bevy::prelude::*;

use crate::backend::GeometryProbe;
use crate::collision::ProbeHit;
use crate::config::MovementConfig;

/// Which side of the body a wall is on.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    Left,
    Right,
}

/// A wall the body is touching.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallContact {
    /// Side of the body the wall is on.
    pub side: WallSide,
    /// Probe hit against the wall surface.
    pub hit: ProbeHit,
}

impl WallContact {
    /// Wall surface normal (points away from the wall).
    pub fn normal(&self) -> Vec3 {
        self.hit.normal
    }

    /// Check if the wall is on the right side.
    pub fn is_right(&self) -> bool {
        self.side == WallSide::Right
    }
}

/// Result of the two side wall probes.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct WallInfo {
    /// Hit from the left probe.
    pub left: Option<ProbeHit>,
    /// Hit from the right probe.
    pub right: Option<ProbeHit>,
}

impl WallInfo {
    /// Check if any wall is detected.
    pub fn any_wall(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }

    /// The wall to run on. A wall on the right wins when both sides hit.
    pub fn contact(&self) -> Option<WallContact> {
        self.right
            .map(|hit| WallContact {
                side: WallSide::Right,
                hit,
            })
            .or_else(|| {
                self.left.map(|hit| WallContact {
                    side: WallSide::Left,
                    hit,
                })
            })
    }
}

/// Strip the vertical component of a vector.
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Cast the ground probe straight down from the body origin.
pub fn probe_ground<P: GeometryProbe + ?Sized>(
    probe: &P,
    position: Vec3,
    config: &MovementConfig,
) -> Option<ProbeHit> {
    probe.raycast(
        position,
        Vec3::NEG_Y,
        config.ground_check_distance,
        config.ground_layers,
    )
}

/// Cast the left and right wall probes along the body's right axis.
pub fn probe_walls<P: GeometryProbe + ?Sized>(
    probe: &P,
    position: Vec3,
    right: Vec3,
    config: &MovementConfig,
) -> WallInfo {
    WallInfo {
        left: probe.raycast(
            position,
            -right,
            config.wall_check_distance,
            config.wall_layers,
        ),
        right: probe.raycast(
            position,
            right,
            config.wall_check_distance,
            config.wall_layers,
        ),
    }
}

/// Whether the body is at least `min_jump_height` above the ground.
pub fn above_min_height<P: GeometryProbe + ?Sized>(
    probe: &P,
    position: Vec3,
    config: &MovementConfig,
) -> bool {
    probe
        .raycast(
            position,
            Vec3::NEG_Y,
            config.min_jump_height,
            config.ground_layers,
        )
        .is_none()
}

/// Whether there is room above the body to stand at full height.
///
/// `standing_height` is for an unscaled body and is multiplied by
/// `standing_scale_y`. Casts upward from half that height for the remaining half.
pub fn has_headroom<P: GeometryProbe + ?Sized>(
    probe: &P,
    position: Vec3,
    config: &MovementConfig,
    standing_scale_y: f32,
) -> bool {
    let half_height = config.standing_height * standing_scale_y * 0.5;
    let origin = position + Vec3::Y * half_height;
    probe
        .raycast(
            origin,
            Vec3::Y,
            half_height,
            config.ground_layers | config.wall_layers,
        )
        .is_none()
}

/// Direction along a wall, oriented to match `forward`.
///
/// The cross product of the wall normal and world up, flattened and flipped
/// when it points against the body's facing.
pub fn wall_forward(normal: Vec3, forward: Vec3) -> Vec3 {
    let along = horizontal(normal.cross(Vec3::Y)).normalize_or_zero();
    if along.dot(forward) < 0.0 {
        -along
    } else {
        along
    }
}
