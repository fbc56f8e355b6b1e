//! Camera effect targets and the frame-pass smoothing rig.
//!
//! Targets are pure functions of published locomotion state. The
//! [`CameraRig`] component turns them into smoothed values each render frame
//! and never touches the simulation.

use bevy::prelude::*;

use crate::config::CameraConfig;
use crate::curve::{blend_factor, move_towards};
use crate::detection::WallSide;
use crate::state::{ControllerReadout, LocomotionState};

/// Field of view target in degrees for a state.
pub fn fov_target(config: &CameraConfig, state: LocomotionState) -> f32 {
    if !config.effects_enabled {
        return config.base_fov;
    }
    match state {
        LocomotionState::WallRunning => config.wall_run_fov,
        LocomotionState::Sliding => config.slide_fov,
        LocomotionState::Grappling => config.grapple_fov,
        _ => config.base_fov,
    }
}

/// Camera roll target in degrees. Positive when the wall is on the right.
pub fn tilt_target(
    config: &CameraConfig,
    state: LocomotionState,
    wall_side: Option<WallSide>,
) -> f32 {
    if !config.effects_enabled || state != LocomotionState::WallRunning {
        return 0.0;
    }
    match wall_side {
        Some(WallSide::Right) => config.wall_run_tilt,
        Some(WallSide::Left) => -config.wall_run_tilt,
        None => 0.0,
    }
}

/// Whether headbob plays: running on the ground with input, or wall-running.
pub fn headbob_active(state: LocomotionState, grounded: bool, moving: bool) -> bool {
    match state {
        LocomotionState::Grounded => grounded && moving,
        LocomotionState::WallRunning => true,
        _ => false,
    }
}

/// Smoothed camera effects for one body.
///
/// Attach next to a [`ControllerReadout`]; the plugin updates it in `Update`.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct CameraRig {
    /// Current field of view in degrees.
    pub fov: f32,
    /// Current roll in degrees.
    pub tilt: f32,
    /// Current vertical headbob offset.
    pub headbob_offset: f32,
    headbob_phase: f32,
    headbob_blend: f32,
}

impl CameraRig {
    /// Create a rig resting at the configured base field of view.
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            fov: config.base_fov,
            ..default()
        }
    }

    /// Advance the rig by one render frame toward the readout's targets.
    pub fn update(&mut self, config: &CameraConfig, readout: &ControllerReadout, dt: f32) {
        let dt = dt.max(0.0);
        self.fov = self
            .fov
            .lerp(readout.fov_target, blend_factor(config.fov_smoothing, dt));
        self.tilt = self
            .tilt
            .lerp(readout.tilt_target, blend_factor(config.tilt_smoothing, dt));

        let wanted = if config.headbob_enabled && readout.headbob_active {
            1.0
        } else {
            0.0
        };
        self.headbob_blend = move_towards(
            self.headbob_blend,
            wanted,
            config.headbob_blend_speed * dt,
        );

        if self.headbob_blend > 0.0 {
            self.headbob_phase = (self.headbob_phase + config.headbob_speed * dt).fract();
        } else {
            self.headbob_phase = 0.0;
        }

        // Ping-pong through the curve so the cycle loops without a seam
        let t = 1.0 - (2.0 * self.headbob_phase - 1.0).abs();
        self.headbob_offset = (config.headbob_curve.evaluate(t) - 0.5)
            * 2.0
            * config.headbob_amount
            * self.headbob_blend;
    }
}
