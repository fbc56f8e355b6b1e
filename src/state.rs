//! Locomotion state and published readout.
//!
//! The movement state machine owns exactly one [`LocomotionState`] per body.
//! After every tick the controller publishes a [`ControllerReadout`] that
//! presentation code (camera or HUD) can read without touching the
//! core. [`Grounded`] and [`Airborne`] markers mirror ground contact for
//! simple queries.

use bevy::prelude::*;

use crate::detection::WallSide;

/// The active locomotion state. Exactly one is active per tick.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LocomotionState {
    /// Standing or running on ground.
    Grounded,
    /// In the air without any override.
    #[default]
    Airborne,
    /// Sliding, on the ground or in the air.
    Sliding,
    /// Running along a wall with gravity off.
    WallRunning,
    /// Hanging from one hook's spring constraint.
    Swinging,
    /// Being pulled toward the midpoint of two hooks.
    Grappling,
    /// Movement input ignored after a wall jump.
    Locked,
}

impl LocomotionState {
    /// Whether the state comes from a grapple override.
    pub fn is_grapple(self) -> bool {
        matches!(self, LocomotionState::Swinging | LocomotionState::Grappling)
    }
}

/// Override published by the grapple controller for the movement machine.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrappleOverride {
    /// At least one hook holds a spring constraint.
    Swinging,
    /// A dual grapple is steering the body.
    Grappling,
}

impl GrappleOverride {
    /// The locomotion state this override forces.
    pub fn state(self) -> LocomotionState {
        match self {
            GrappleOverride::Swinging => LocomotionState::Swinging,
            GrappleOverride::Grappling => LocomotionState::Grappling,
        }
    }
}

/// What the grapple controller tells the movement machine each tick.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrappleInfluence {
    /// Forced state while a hook owns the body's velocity.
    pub override_state: Option<GrappleOverride>,
    /// Whether body gravity must stay off.
    pub suspends_gravity: bool,
}

impl GrappleInfluence {
    /// No grapple activity.
    pub const NONE: Self = Self {
        override_state: None,
        suspends_gravity: false,
    };
}

/// Marker component indicating the body is on the ground.
///
/// Added and removed by the controller from the ground probe result.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the body is off the ground.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Read-only state published after every fixed tick.
#[derive(Component, Reflect, Debug, Clone, Default, PartialEq)]
#[reflect(Component)]
pub struct ControllerReadout {
    /// Active locomotion state.
    pub state: LocomotionState,
    /// Body speed.
    pub speed: f32,
    /// Whether the ground probe hit this tick.
    pub grounded: bool,
    /// Side of the wall being run on, if any.
    pub wall_side: Option<WallSide>,
    /// Whether headbob should play.
    pub headbob_active: bool,
    /// Field of view target in degrees.
    pub fov_target: f32,
    /// Camera roll target in degrees.
    pub tilt_target: f32,
    /// Anchors of the active hooks, left then right.
    pub hook_anchors: [Option<Vec3>; 2],
    /// Current prediction points, left then right.
    pub predictions: [Option<Vec3>; 2],
    /// Remaining fuel.
    pub fuel: f32,
    /// Fuel capacity.
    pub max_fuel: f32,
}

impl ControllerReadout {
    /// Check if a hook is attached.
    pub fn is_hook_active(&self, index: usize) -> bool {
        self.hook_anchors.get(index).is_some_and(Option::is_some)
    }

    /// Fuel as a fraction of capacity.
    pub fn fuel_fraction(&self) -> f32 {
        if self.max_fuel > 0.0 {
            (self.fuel / self.max_fuel).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
