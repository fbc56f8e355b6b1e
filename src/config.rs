//! Controller configuration components.
//!
//! This module defines the tuning for the movement state machine, the grapple
//! controller and the camera effect targets. Every value is set at
//! initialization and never mutated by the controller itself.
//!
//! Configs are plain components with builder methods and presets, and they
//! round-trip through JSON via [`ControllerTuning`].

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::collision::LayerMask;
use crate::curve::ResponseCurve;
use crate::error::{ensure_non_negative, ensure_ordered, ensure_positive, ConfigError};

/// Default layer for walkable geometry.
pub const GROUND_LAYER: LayerMask = LayerMask::layer(0);
/// Default layer for wall-runnable geometry.
pub const WALL_LAYER: LayerMask = LayerMask::layer(1);
/// Default layer for surfaces hooks can attach to.
pub const GRAPPLEABLE_LAYER: LayerMask = LayerMask::layer(2);

/// Configuration for the locomotion state machine.
///
/// Distances are in world units, speeds in units/second and times in seconds.
/// The body origin is assumed to sit at the feet: ground and wall probes start
/// there, and the headroom probe starts at half the standing height.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone)]
#[reflect(Component)]
#[serde(default)]
pub struct MovementConfig {
    // === Ground / Air ===
    /// Target horizontal speed from full movement input.
    pub move_speed: f32,
    /// Time over which horizontal velocity blends toward its target.
    pub drag_time: f32,
    /// Multiple of `move_speed` above which the high-speed drag curve is used.
    pub high_speed_threshold: f32,
    /// Blend curve used above the high-speed threshold.
    ///
    /// Evaluated at `dt / drag_time`; 1 keeps the current velocity, 0 snaps to the target.
    pub horizontal_drag_curve: ResponseCurve,
    /// Vertical velocity applied by a jump.
    pub jump_force: f32,
    /// Layers treated as ground.
    pub ground_layers: LayerMask,
    /// Length of the downward ground probe.
    pub ground_check_distance: f32,

    // === Slide ===
    /// Minimum slide speed.
    pub slide_speed: f32,
    /// Maximum slide speed.
    pub max_slide_speed: f32,
    /// Speed added to the current horizontal speed on slide entry.
    pub slide_speed_boost: f32,
    /// Jump force multiplier while sliding.
    pub slide_jump_modifier: f32,
    /// Slide duration.
    pub slide_duration: f32,
    /// Vertical scale factor applied while sliding.
    pub slide_scale_y: f32,
    /// Downward impulse applied when a slide starts on the ground.
    pub slide_ground_snap: f32,
    /// Full standing height, used by the headroom probe.
    pub standing_height: f32,

    // === Wall Running ===
    /// Layers that can be wall-run.
    pub wall_layers: LayerMask,
    /// Length of the side wall probes.
    pub wall_check_distance: f32,
    /// Height above ground required to start a wall run.
    pub min_jump_height: f32,
    /// Along-wall speed the wall run eases toward.
    pub max_wall_run_speed: f32,
    /// Wall run duration once the timer has started.
    pub max_wall_run_time: f32,
    /// Scale of the along-wall speed correction per second.
    pub wall_run_acceleration: f32,
    /// Curve shaping the speed correction over elapsed / `max_wall_run_time`.
    pub wall_run_drag_curve: ResponseCurve,
    /// Upward impulse of a wall jump.
    pub wall_jump_up_force: f32,
    /// Impulse along the wall normal of a wall jump.
    pub wall_jump_side_force: f32,
    /// Cooldown before a new wall run can start.
    pub exit_wall_time: f32,

    // === Gravity ===
    /// Extra downward acceleration while airborne (0 disables it).
    pub gravity_modifier: f32,
    /// Maximum fall speed.
    pub max_fall_speed: f32,

    // === Look ===
    /// Degrees of rotation per unit of look delta.
    pub look_sensitivity: f32,
    /// Pitch limit in degrees.
    pub max_look_angle: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Ground / air
            move_speed: 10.0,
            drag_time: 0.2,
            high_speed_threshold: 1.5,
            horizontal_drag_curve: ResponseCurve::linear(1.0, 0.0),
            jump_force: 4.0,
            ground_layers: GROUND_LAYER,
            ground_check_distance: 0.3,

            // Slide
            slide_speed: 6.0,
            max_slide_speed: 20.0,
            slide_speed_boost: 8.0,
            slide_jump_modifier: 1.2,
            slide_duration: 0.75,
            slide_scale_y: 0.5,
            slide_ground_snap: 5.0,
            standing_height: 2.0,

            // Wall running
            wall_layers: WALL_LAYER,
            wall_check_distance: 0.75,
            min_jump_height: 1.0,
            max_wall_run_speed: 18.0,
            max_wall_run_time: 3.0,
            wall_run_acceleration: 10.0,
            wall_run_drag_curve: ResponseCurve::linear(1.0, 0.0),
            wall_jump_up_force: 3.0,
            wall_jump_side_force: 5.0,
            exit_wall_time: 0.2,

            // Gravity
            gravity_modifier: 0.0,
            max_fall_speed: 40.0,

            // Look
            look_sensitivity: 1.0,
            max_look_angle: 85.0,
        }
    }
}

impl MovementConfig {
    /// Create a config tuned for a fast, floaty player.
    pub fn player() -> Self {
        Self {
            move_speed: 12.0,
            jump_force: 6.0,
            gravity_modifier: 10.0,
            ..default()
        }
    }

    /// Builder: set move speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Builder: set jump force.
    pub fn with_jump_force(mut self, force: f32) -> Self {
        self.jump_force = force;
        self
    }

    /// Builder: set slide speed range and boost.
    pub fn with_slide(mut self, min_speed: f32, max_speed: f32, boost: f32) -> Self {
        self.slide_speed = min_speed;
        self.max_slide_speed = max_speed;
        self.slide_speed_boost = boost;
        self
    }

    /// Builder: set wall-run speed cap and duration.
    pub fn with_wall_run(mut self, max_speed: f32, max_time: f32) -> Self {
        self.max_wall_run_speed = max_speed;
        self.max_wall_run_time = max_time;
        self
    }

    /// Builder: set ground and wall layers.
    pub fn with_layers(mut self, ground: LayerMask, walls: LayerMask) -> Self {
        self.ground_layers = ground;
        self.wall_layers = walls;
        self
    }

    /// Builder: set extra gravity and fall speed cap.
    pub fn with_gravity(mut self, modifier: f32, max_fall_speed: f32) -> Self {
        self.gravity_modifier = modifier;
        self.max_fall_speed = max_fall_speed;
        self
    }

    /// Builder: set look sensitivity (usually read from player settings).
    pub fn with_look_sensitivity(mut self, sensitivity: f32) -> Self {
        self.look_sensitivity = sensitivity;
        self
    }

    /// Check the tuning for values the state machine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("move_speed", self.move_speed)?;
        ensure_positive("drag_time", self.drag_time)?;
        ensure_positive("high_speed_threshold", self.high_speed_threshold)?;
        ensure_non_negative("jump_force", self.jump_force)?;
        ensure_positive("ground_check_distance", self.ground_check_distance)?;
        ensure_non_negative("slide_speed", self.slide_speed)?;
        ensure_ordered(
            "slide_speed",
            self.slide_speed,
            "max_slide_speed",
            self.max_slide_speed,
        )?;
        ensure_positive("slide_duration", self.slide_duration)?;
        ensure_positive("slide_scale_y", self.slide_scale_y)?;
        ensure_positive("standing_height", self.standing_height)?;
        ensure_positive("wall_check_distance", self.wall_check_distance)?;
        ensure_non_negative("min_jump_height", self.min_jump_height)?;
        ensure_positive("max_wall_run_speed", self.max_wall_run_speed)?;
        ensure_positive("max_wall_run_time", self.max_wall_run_time)?;
        ensure_non_negative("exit_wall_time", self.exit_wall_time)?;
        ensure_non_negative("gravity_modifier", self.gravity_modifier)?;
        ensure_positive("max_fall_speed", self.max_fall_speed)?;
        ensure_ordered("max_look_angle", self.max_look_angle, "90 degrees", 90.0)?;
        self.horizontal_drag_curve.validate()?;
        self.wall_run_drag_curve.validate()?;
        Ok(())
    }
}

/// Slack bounds of a swing constraint, as fractions of the initial anchor distance.
#[derive(Reflect, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct DistanceBand {
    /// Fraction of the anchor distance the rope can shorten to.
    pub min: f32,
    /// Fraction of the anchor distance the rope can stretch to.
    pub max: f32,
}

impl Default for DistanceBand {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 0.8,
        }
    }
}

/// Configuration for the grapple controller.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone)]
#[reflect(Component)]
#[serde(default)]
pub struct GrappleConfig {
    // === Fuel ===
    /// Fuel capacity.
    pub max_fuel: f32,
    /// Fuel spent when a single hook attaches.
    pub single_hook_cost: f32,
    /// Fuel spent when a dual grapple starts.
    pub dual_hook_cost: f32,
    /// Delay after spending fuel before recharge begins.
    pub fuel_recharge_delay: f32,
    /// Fuel regained per second.
    pub fuel_recharge_rate: f32,

    // === Swinging ===
    /// Layers hooks can attach to.
    pub grappleable_layers: LayerMask,
    /// Maximum hook range.
    pub max_swing_distance: f32,
    /// Constraint slack band relative to the initial anchor distance.
    pub swing_distance_ratio: DistanceBand,
    /// Spring stiffness of the swing constraint.
    pub spring_force: f32,
    /// Spring damping of the swing constraint.
    pub spring_damping: f32,
    /// Mass scale of the swing constraint.
    pub spring_mass_scale: f32,

    // === Dual Grapple ===
    /// Speed per unit of (scaled) start distance.
    pub grapple_speed: f32,
    /// Scale applied to the start distance.
    pub distance_speed_modifier: f32,
    /// Lower bound of the dual-grapple speed.
    pub min_grapple_speed: f32,
    /// Upper bound of the dual-grapple speed.
    pub max_grapple_speed: f32,
    /// Distance to the midpoint at which the grapple finishes.
    pub grapple_release_distance: f32,
    /// Maximum time between the two hook presses for a dual grapple.
    pub grapple_window: f32,
    /// Failsafe duration after which the grapple always finishes.
    pub max_grapple_time: f32,
    /// Curve easing the speed toward the final velocity over elapsed / `max_grapple_time`.
    pub grapple_acceleration_curve: ResponseCurve,
    /// Blend rate once past the start distance.
    pub reel_in_speed: f32,
    /// Blend rate during the initial snap toward the midpoint.
    pub elastic_blend_rate: f32,
    /// Delay before gravity returns after a dual grapple.
    pub gravity_restore_delay: f32,

    // === Prediction ===
    /// Exponent biasing samples toward the half-screen edge and weighting the center bias.
    pub side_bias_strictness: f32,
    /// Samples per half screen above the velocity threshold.
    pub min_samples_per_side: u32,
    /// Samples per half screen below the velocity threshold.
    pub max_samples_per_side: u32,
    /// Speed above which fewer prediction rays are cast.
    pub velocity_sample_threshold: f32,
    /// Extra range granted when another hook already has a reachable target.
    pub grapple_distance_leniency: f32,
    /// Weight of the cubic screen-edge penalty.
    pub edge_penalty_weight: f32,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            // Fuel
            max_fuel: 6.0,
            single_hook_cost: 1.0,
            dual_hook_cost: 2.0,
            fuel_recharge_delay: 0.6,
            fuel_recharge_rate: 1.0,

            // Swinging
            grappleable_layers: GRAPPLEABLE_LAYER,
            max_swing_distance: 25.0,
            swing_distance_ratio: DistanceBand::default(),
            spring_force: 15.0,
            spring_damping: 7.0,
            spring_mass_scale: 4.5,

            // Dual grapple
            grapple_speed: 25.0,
            distance_speed_modifier: 0.5,
            min_grapple_speed: 18.0,
            max_grapple_speed: 60.0,
            grapple_release_distance: 2.0,
            grapple_window: 0.2,
            max_grapple_time: 1.5,
            grapple_acceleration_curve: ResponseCurve::ease_in_out(0.0, 1.0),
            reel_in_speed: 6.0,
            elastic_blend_rate: 3.0,
            gravity_restore_delay: 0.1,

            // Prediction
            side_bias_strictness: 2.0,
            min_samples_per_side: 4,
            max_samples_per_side: 8,
            velocity_sample_threshold: 15.0,
            grapple_distance_leniency: 10.0,
            edge_penalty_weight: 10.0,
        }
    }
}

impl GrappleConfig {
    /// Builder: set fuel capacity and costs.
    pub fn with_fuel(mut self, max_fuel: f32, single_cost: f32, dual_cost: f32) -> Self {
        self.max_fuel = max_fuel;
        self.single_hook_cost = single_cost;
        self.dual_hook_cost = dual_cost;
        self
    }

    /// Builder: set the dual-grapple press window.
    pub fn with_grapple_window(mut self, window: f32) -> Self {
        self.grapple_window = window;
        self
    }

    /// Builder: set hook range.
    pub fn with_max_swing_distance(mut self, distance: f32) -> Self {
        self.max_swing_distance = distance;
        self
    }

    /// Builder: set dual-grapple speed bounds.
    pub fn with_grapple_speed_range(mut self, min: f32, max: f32) -> Self {
        self.min_grapple_speed = min;
        self.max_grapple_speed = max;
        self
    }

    /// Builder: set grappleable layers.
    pub fn with_grappleable_layers(mut self, layers: LayerMask) -> Self {
        self.grappleable_layers = layers;
        self
    }

    /// Check the tuning for values the grapple controller cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("max_fuel", self.max_fuel)?;
        ensure_non_negative("single_hook_cost", self.single_hook_cost)?;
        ensure_non_negative("dual_hook_cost", self.dual_hook_cost)?;
        ensure_ordered(
            "single_hook_cost",
            self.single_hook_cost,
            "max_fuel",
            self.max_fuel,
        )?;
        ensure_ordered("dual_hook_cost", self.dual_hook_cost, "max_fuel", self.max_fuel)?;
        ensure_non_negative("fuel_recharge_delay", self.fuel_recharge_delay)?;
        ensure_non_negative("fuel_recharge_rate", self.fuel_recharge_rate)?;
        ensure_positive("max_swing_distance", self.max_swing_distance)?;
        ensure_positive("swing_distance_ratio.min", self.swing_distance_ratio.min)?;
        ensure_ordered(
            "swing_distance_ratio.min",
            self.swing_distance_ratio.min,
            "swing_distance_ratio.max",
            self.swing_distance_ratio.max,
        )?;
        ensure_non_negative("min_grapple_speed", self.min_grapple_speed)?;
        ensure_ordered(
            "min_grapple_speed",
            self.min_grapple_speed,
            "max_grapple_speed",
            self.max_grapple_speed,
        )?;
        ensure_non_negative("grapple_release_distance", self.grapple_release_distance)?;
        ensure_non_negative("grapple_window", self.grapple_window)?;
        ensure_positive("max_grapple_time", self.max_grapple_time)?;
        ensure_non_negative("gravity_restore_delay", self.gravity_restore_delay)?;
        if self.min_samples_per_side == 0 {
            return Err(ConfigError::TooFewSamples {
                field: "min_samples_per_side",
                min: 1,
                value: 0,
            });
        }
        if self.max_samples_per_side < self.min_samples_per_side {
            return Err(ConfigError::TooFewSamples {
                field: "max_samples_per_side",
                min: self.min_samples_per_side as usize,
                value: self.max_samples_per_side as usize,
            });
        }
        self.grapple_acceleration_curve.validate()?;
        Ok(())
    }
}

/// Targets for the presentation layer's camera effects.
#[derive(Component, Reflect, Serialize, Deserialize, Debug, Clone)]
#[reflect(Component)]
#[serde(default)]
pub struct CameraConfig {
    /// Whether FOV and tilt effects are produced at all.
    pub effects_enabled: bool,
    /// Resting field of view in degrees.
    pub base_fov: f32,
    /// Field of view while sliding.
    pub slide_fov: f32,
    /// Field of view while wall-running.
    pub wall_run_fov: f32,
    /// Field of view while dual grappling.
    pub grapple_fov: f32,
    /// Camera roll in degrees while wall-running.
    pub wall_run_tilt: f32,
    /// FOV smoothing rate per second.
    pub fov_smoothing: f32,
    /// Tilt smoothing rate per second.
    pub tilt_smoothing: f32,
    /// Aspect ratio used to build aim rays.
    pub aspect_ratio: f32,
    /// Head height above the body origin.
    pub eye_height: f32,

    // === Headbob ===
    /// Whether headbob is produced.
    pub headbob_enabled: bool,
    /// Headbob cycles per second.
    pub headbob_speed: f32,
    /// Peak vertical headbob offset.
    pub headbob_amount: f32,
    /// Rate at which headbob fades in and out.
    pub headbob_blend_speed: f32,
    /// Shape of one headbob cycle.
    pub headbob_curve: ResponseCurve,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            effects_enabled: true,
            base_fov: 75.0,
            slide_fov: 80.0,
            wall_run_fov: 85.0,
            grapple_fov: 85.0,
            wall_run_tilt: 10.0,
            fov_smoothing: 10.0,
            tilt_smoothing: 5.0,
            aspect_ratio: 16.0 / 9.0,
            eye_height: 1.6,
            headbob_enabled: true,
            headbob_speed: 1.5,
            headbob_amount: 0.08,
            headbob_blend_speed: 6.0,
            headbob_curve: ResponseCurve::ease_in_out(0.0, 1.0),
        }
    }
}

impl CameraConfig {
    /// Builder: set base field of view.
    pub fn with_base_fov(mut self, fov: f32) -> Self {
        self.base_fov = fov;
        self
    }

    /// Builder: enable or disable headbob.
    pub fn with_headbob_enabled(mut self, enabled: bool) -> Self {
        self.headbob_enabled = enabled;
        self
    }

    /// Check the tuning for values the camera rig cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("base_fov", self.base_fov)?;
        ensure_positive("slide_fov", self.slide_fov)?;
        ensure_positive("wall_run_fov", self.wall_run_fov)?;
        ensure_positive("grapple_fov", self.grapple_fov)?;
        ensure_positive("aspect_ratio", self.aspect_ratio)?;
        ensure_non_negative("fov_smoothing", self.fov_smoothing)?;
        ensure_non_negative("tilt_smoothing", self.tilt_smoothing)?;
        ensure_non_negative("headbob_speed", self.headbob_speed)?;
        self.headbob_curve.validate()?;
        Ok(())
    }
}

/// Complete tuning for one controlled body.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ControllerTuning {
    /// Locomotion tuning.
    pub movement: MovementConfig,
    /// Grapple tuning.
    pub grapple: GrappleConfig,
    /// Camera effect tuning.
    pub camera: CameraConfig,
}

impl ControllerTuning {
    /// Parse tuning from JSON. Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Serialize tuning to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.movement.validate()?;
        self.grapple.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}
