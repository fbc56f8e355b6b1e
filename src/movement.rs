//! Locomotion state machine.
//!
//! [`MovementStateMachine`] turns a [`MovementIntent`] into body velocity once
//! per fixed tick. It owns the locomotion state, the slide and wall-run timers,
//! the look angles and the body scale, and it is the only code that writes
//! body gravity.
//!
//! A tick runs in a fixed order:
//!
//! 1. clamp timers, apply look deltas
//! 2. ground probe (ground contact restores the air slide)
//! 3. jump
//! 4. slide input
//! 5. wall probes and wall-run handling
//! 6. state evaluation: Locked, grapple override, WallRunning, Sliding, then
//!    Grounded or Airborne
//! 7. integration for the resulting state, slide timer, extra gravity
//! 8. headroom-gated scale restore, gravity write
//!
//! While a grapple override is active the grapple controller owns the body's
//! velocity and this machine does not write it.

use bevy::prelude::*;
use tracing::{debug, trace};

use crate::backend::{GeometryProbe, KinematicBody};
use crate::camera::{fov_target, headbob_active, tilt_target};
use crate::config::{CameraConfig, MovementConfig};
use crate::curve::move_towards;
use crate::detection::{
    above_min_height, has_headroom, horizontal, probe_ground, probe_walls, wall_forward,
    WallContact, WallSide,
};
use crate::intent::MovementIntent;
use crate::prediction::AimView;
use crate::state::{ControllerReadout, GrappleInfluence, LocomotionState};

/// Squared length below which a direction counts as absent.
const MIN_DIRECTION_SQ: f32 = 0.01;

/// An ongoing wall run.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct WallRun {
    /// Wall being run on.
    pub contact: WallContact,
    /// Direction along the wall, matching the body's facing at entry.
    pub forward: Vec3,
    /// Whether the duration timer has started counting.
    pub timer_started: bool,
    /// Time left once the timer has started.
    pub timer: f32,
}

impl WallRun {
    /// Time spent on the wall since the timer started.
    pub fn elapsed(&self, config: &MovementConfig) -> f32 {
        if self.timer_started {
            config.max_wall_run_time - self.timer
        } else {
            0.0
        }
    }
}

/// Locomotion core for one body.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use freerun_controller::prelude::*;
/// use freerun_controller::headless::HeadlessWorld;
///
/// let config = MovementConfig::default();
/// let mut machine = MovementStateMachine::new();
/// let mut intent = MovementIntent::new();
/// let mut world = HeadlessWorld::with_floor(config.ground_layers);
///
/// intent.set_jump_pressed(true);
/// machine.tick(&config, &mut intent, GrappleInfluence::NONE, &mut world, 1.0 / 60.0);
///
/// assert_eq!(world.body.velocity.y, config.jump_force);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(MovementConfig, CameraConfig, MovementIntent, ControllerReadout)]
pub struct MovementStateMachine {
    state: LocomotionState,
    grounded: bool,
    moving: bool,
    yaw: f32,
    pitch: f32,

    slide_timer: f32,
    slide_direction: Vec3,
    can_air_slide: bool,

    wall_run: Option<WallRun>,
    can_wall_run: bool,
    exit_wall_timer: f32,
    locked: bool,

    standing_scale: Vec3,
    scale: Vec3,
}

impl Default for MovementStateMachine {
    fn default() -> Self {
        Self {
            state: LocomotionState::Airborne,
            grounded: false,
            moving: false,
            yaw: 0.0,
            pitch: 0.0,
            slide_timer: 0.0,
            slide_direction: Vec3::NEG_Z,
            can_air_slide: true,
            wall_run: None,
            can_wall_run: true,
            exit_wall_timer: 0.0,
            locked: false,
            standing_scale: Vec3::ONE,
            scale: Vec3::ONE,
        }
    }
}

impl MovementStateMachine {
    /// Create a machine at rest, facing -Z.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the body's standing scale.
    pub fn with_standing_scale(mut self, scale: Vec3) -> Self {
        self.standing_scale = scale;
        self.scale = scale;
        self
    }

    /// Builder: set the initial facing (radians around +Y, 0 faces -Z).
    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.yaw = yaw;
        self
    }

    /// Advance the machine by one fixed tick.
    ///
    /// `grapple` comes from the grapple controller's tick for the same step.
    pub fn tick<C>(
        &mut self,
        config: &MovementConfig,
        intent: &mut MovementIntent,
        grapple: GrappleInfluence,
        ctx: &mut C,
        dt: f32,
    ) where
        C: GeometryProbe + KinematicBody + ?Sized,
    {
        let dt = dt.max(0.0);

        // 1. Timers and look
        self.slide_timer = self.slide_timer.max(0.0);
        self.exit_wall_timer = self.exit_wall_timer.max(0.0);
        if let Some(run) = self.wall_run.as_mut() {
            run.timer = run.timer.max(0.0);
        }
        let look = intent.take_look_delta();
        self.apply_look(config, look);

        let position = ctx.position();
        let mut velocity = ctx.velocity();
        let overridden = grapple.override_state.is_some();
        self.moving = intent.is_moving();

        // 2. Ground
        self.grounded = probe_ground(&*ctx, position, config).is_some();
        if self.grounded {
            self.can_air_slide = true;
        }

        // A grapple takes over from a slide
        if overridden && self.slide_timer > 0.0 {
            self.end_slide();
        }

        // 3. Jump
        if intent.jump_just_pressed() && self.grounded && !overridden {
            let modifier = if self.state == LocomotionState::Sliding {
                config.slide_jump_modifier
            } else {
                1.0
            };
            velocity.y = 0.0;
            ctx.set_velocity(velocity);
            ctx.apply_impulse(Vec3::Y * config.jump_force * modifier);
            velocity = ctx.velocity();
            debug!(force = config.jump_force * modifier, "jump");
        }

        // 4. Slide input
        if !overridden && self.wall_run.is_none() {
            if intent.slide_just_pressed() && (self.grounded || self.can_air_slide) {
                velocity = self.start_slide(config, intent, velocity, ctx);
            } else if intent.slide_just_released() && self.slide_timer > 0.0 {
                self.end_slide();
            }
        }

        // 5. Walls
        velocity = self.update_wall_run(config, intent, overridden, position, velocity, ctx, dt);

        // 6. State
        let next = self.evaluate_state(grapple);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "locomotion state changed");
            self.state = next;
        }

        // 7. Integration
        match self.state {
            LocomotionState::WallRunning => {
                velocity = self.wall_run_velocity(config, velocity, dt);
            }
            LocomotionState::Grounded | LocomotionState::Airborne => {
                velocity = self.ground_air_velocity(config, intent, velocity, dt);
            }
            _ => {}
        }

        if self.slide_timer > 0.0 {
            self.slide_timer -= dt;
            if self.slide_timer <= 0.0 {
                self.end_slide();
            }
        }

        if !overridden {
            if config.gravity_modifier > 0.0
                && !self.grounded
                && self.state != LocomotionState::WallRunning
            {
                velocity.y -= config.gravity_modifier * dt;
            }
            velocity.y = velocity.y.max(-config.max_fall_speed);
            ctx.set_velocity(velocity);
        }

        // 8. Scale and gravity
        if self.slide_timer <= 0.0 && self.scale != self.standing_scale {
            if has_headroom(&*ctx, position, config, self.standing_scale.y) {
                self.scale = self.standing_scale;
                ctx.set_scale(self.scale);
                trace!("standing scale restored");
            } else {
                trace!("scale restore blocked by ceiling");
            }
        }

        ctx.set_gravity_enabled(self.wall_run.is_none() && !grapple.suspends_gravity);
        intent.latch();
    }

    /// Active locomotion state.
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    /// Whether the ground probe hit on the last tick.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Whether an air slide is available.
    pub fn can_air_slide(&self) -> bool {
        self.can_air_slide
    }

    /// Whether a new wall run may start.
    pub fn can_wall_run(&self) -> bool {
        self.can_wall_run
    }

    /// Time left in the current slide.
    pub fn slide_timer(&self) -> f32 {
        self.slide_timer
    }

    /// Direction of the current or last slide.
    pub fn slide_direction(&self) -> Vec3 {
        self.slide_direction
    }

    /// The ongoing wall run, if any.
    pub fn wall_run(&self) -> Option<&WallRun> {
        self.wall_run.as_ref()
    }

    /// Side of the wall being run on.
    pub fn wall_side(&self) -> Option<WallSide> {
        self.wall_run.map(|run| run.contact.side)
    }

    /// Time left on the wall-run cooldown (and movement lock).
    pub fn exit_wall_timer(&self) -> f32 {
        self.exit_wall_timer
    }

    /// Current body scale.
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Yaw in radians (0 faces -Z).
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in radians (positive looks up).
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Flat facing direction.
    pub fn forward(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::NEG_Z
    }

    /// Flat right direction.
    pub fn right(&self) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * Vec3::X
    }

    /// Camera rotation from yaw and pitch.
    pub fn view_rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    /// Whether headbob should play.
    pub fn headbob_active(&self) -> bool {
        headbob_active(self.state, self.grounded, self.moving)
    }

    /// The camera hook prediction rays are cast from.
    pub fn aim_view(&self, camera: &CameraConfig, position: Vec3) -> AimView {
        AimView {
            origin: position + Vec3::Y * camera.eye_height * self.scale.y,
            rotation: self.view_rotation(),
            vertical_fov: camera.base_fov.to_radians(),
            aspect: camera.aspect_ratio,
        }
    }

    /// Write the locomotion half of the readout.
    pub fn publish(&self, camera: &CameraConfig, speed: f32, readout: &mut ControllerReadout) {
        readout.state = self.state;
        readout.speed = speed;
        readout.grounded = self.grounded;
        readout.wall_side = self.wall_side();
        readout.headbob_active = self.headbob_active();
        readout.fov_target = fov_target(camera, self.state);
        readout.tilt_target = tilt_target(camera, self.state, self.wall_side());
    }

    fn apply_look(&mut self, config: &MovementConfig, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        let sensitivity = config.look_sensitivity.to_radians();
        let limit = config.max_look_angle.to_radians();
        self.yaw -= delta.x * sensitivity;
        self.pitch = (self.pitch + delta.y * sensitivity).clamp(-limit, limit);
    }

    fn input_direction(&self, intent: &MovementIntent) -> Vec3 {
        horizontal(self.forward() * intent.forward + self.right() * intent.right)
    }

    fn evaluate_state(&self, grapple: GrappleInfluence) -> LocomotionState {
        if self.locked {
            LocomotionState::Locked
        } else if let Some(grapple_override) = grapple.override_state {
            grapple_override.state()
        } else if self.wall_run.is_some() {
            LocomotionState::WallRunning
        } else if self.slide_timer > 0.0 {
            LocomotionState::Sliding
        } else if self.grounded {
            LocomotionState::Grounded
        } else {
            LocomotionState::Airborne
        }
    }

    fn start_slide<C>(
        &mut self,
        config: &MovementConfig,
        intent: &MovementIntent,
        velocity: Vec3,
        ctx: &mut C,
    ) -> Vec3
    where
        C: KinematicBody + ?Sized,
    {
        if !self.grounded {
            self.can_air_slide = false;
        }

        let input = self.input_direction(intent);
        let flat = horizontal(velocity);
        let direction = if input.length_squared() > MIN_DIRECTION_SQ {
            input.normalize()
        } else if flat.length_squared() > MIN_DIRECTION_SQ {
            flat.normalize()
        } else {
            self.forward()
        };

        let speed = (flat.length() + config.slide_speed_boost)
            .clamp(config.slide_speed, config.max_slide_speed);
        ctx.set_velocity(direction * speed + Vec3::Y * velocity.y);
        if self.grounded {
            ctx.apply_impulse(Vec3::NEG_Y * config.slide_ground_snap);
        }

        self.slide_timer = config.slide_duration;
        self.slide_direction = direction;
        self.scale = Vec3::new(
            self.standing_scale.x,
            self.standing_scale.y * config.slide_scale_y,
            self.standing_scale.z,
        );
        ctx.set_scale(self.scale);

        debug!(
            speed,
            ?direction,
            air = !self.grounded,
            "slide started"
        );
        ctx.velocity()
    }

    fn end_slide(&mut self) {
        self.slide_timer = 0.0;
        trace!("slide ended");
    }

    #[allow(clippy::too_many_arguments)]
    fn update_wall_run<C>(
        &mut self,
        config: &MovementConfig,
        intent: &MovementIntent,
        overridden: bool,
        position: Vec3,
        mut velocity: Vec3,
        ctx: &mut C,
        dt: f32,
    ) -> Vec3
    where
        C: GeometryProbe + KinematicBody + ?Sized,
    {
        // Cooldown and lock
        if !self.can_wall_run || self.locked {
            self.exit_wall_timer -= dt;
            if self.exit_wall_timer <= 0.0 {
                self.exit_wall_timer = 0.0;
                self.can_wall_run = true;
                if self.locked {
                    self.locked = false;
                    trace!("movement unlocked");
                }
            }
        }

        let walls = probe_walls(&*ctx, position, self.right(), config);
        let contact = match walls.contact() {
            Some(contact)
                if !overridden
                    && !self.grounded
                    && intent.is_moving_forward()
                    && above_min_height(&*ctx, position, config) =>
            {
                Some(contact)
            }
            _ => None,
        };

        let Some(mut run) = self.wall_run else {
            if let (Some(contact), true) = (contact, self.can_wall_run) {
                velocity = self.start_wall_run(contact, velocity, ctx);
            }
            return velocity;
        };

        let Some(contact) = contact else {
            self.exit_wall_run(config, false);
            debug!(overridden, grounded = self.grounded, "wall run ended");
            return velocity;
        };

        if intent.jump_just_pressed() {
            self.exit_wall_run(config, true);
            velocity.y = 0.0;
            ctx.set_velocity(velocity);
            ctx.apply_impulse(
                Vec3::Y * config.wall_jump_up_force + contact.normal() * config.wall_jump_side_force,
            );
            debug!(side = ?contact.side, "wall jump");
            return ctx.velocity();
        }

        run.contact = contact;
        run.forward = wall_forward(contact.normal(), run.forward);

        let along = velocity.dot(run.forward).abs();
        if !run.timer_started && along <= config.max_wall_run_speed {
            run.timer_started = true;
            run.timer = config.max_wall_run_time;
            trace!(along, "wall run timer started");
        }

        if run.timer_started {
            run.timer -= dt;
            if run.timer <= 0.0 {
                self.exit_wall_run(config, false);
                debug!("wall run timed out");
                return velocity;
            }
        }

        self.wall_run = Some(run);
        velocity
    }

    fn start_wall_run<C>(&mut self, contact: WallContact, velocity: Vec3, ctx: &mut C) -> Vec3
    where
        C: KinematicBody + ?Sized,
    {
        let forward = wall_forward(contact.normal(), self.forward());
        let flat = horizontal(velocity);
        let along = flat.dot(forward);

        let velocity = forward * along;
        ctx.set_velocity(velocity);

        self.wall_run = Some(WallRun {
            contact,
            forward,
            timer_started: false,
            timer: 0.0,
        });
        if self.slide_timer > 0.0 {
            self.end_slide();
        }
        debug!(side = ?contact.side, along, "wall run started");
        velocity
    }

    fn exit_wall_run(&mut self, config: &MovementConfig, jumped: bool) {
        self.wall_run = None;
        self.can_wall_run = false;
        self.exit_wall_timer = config.exit_wall_time;
        self.locked = jumped;
    }

    fn wall_run_velocity(&self, config: &MovementConfig, velocity: Vec3, dt: f32) -> Vec3 {
        let Some(run) = self.wall_run else {
            return velocity;
        };
        let along = horizontal(velocity).dot(run.forward);

        let t = (run.elapsed(config) / config.max_wall_run_time).clamp(0.0, 1.0);
        let step = config.wall_run_drag_curve.evaluate(t) * config.wall_run_acceleration * dt;
        let along = move_towards(along, config.max_wall_run_speed, step);

        run.forward * along
    }

    fn ground_air_velocity(
        &self,
        config: &MovementConfig,
        intent: &MovementIntent,
        velocity: Vec3,
        dt: f32,
    ) -> Vec3 {
        let input = self.input_direction(intent);
        let target = if input.length_squared() > MIN_DIRECTION_SQ {
            input.normalize() * config.move_speed
        } else {
            Vec3::ZERO
        };

        let flat = horizontal(velocity);
        let t = (dt / config.drag_time).clamp(0.0, 1.0);
        let blended = if flat.length() <= config.high_speed_threshold * config.move_speed {
            flat.lerp(target, t)
        } else {
            let keep = config.horizontal_drag_curve.evaluate(t);
            target.lerp(flat, keep)
        };

        Vec3::new(blended.x, velocity.y, blended.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GROUND_LAYER, WALL_LAYER};
    use crate::headless::HeadlessWorld;
    use crate::state::GrappleOverride;
    use proptest::prelude::*;

    const DT: f32 = 1.0 / 60.0;

    fn tick(
        machine: &mut MovementStateMachine,
        config: &MovementConfig,
        intent: &mut MovementIntent,
        world: &mut HeadlessWorld,
    ) {
        machine.tick(config, intent, GrappleInfluence::NONE, world, DT);
    }

    /// Floor at y = 0 plus a wall along the Z axis whose face is at x = 0.5.
    fn wall_world(config: &MovementConfig) -> HeadlessWorld {
        let mut world = HeadlessWorld::with_floor(config.ground_layers);
        world.add_box(
            Vec3::new(1.0, 10.0, 0.0),
            Vec3::new(0.5, 10.0, 100.0),
            config.wall_layers,
        );
        world
    }

    #[test]
    fn jump_from_rest_sets_vertical_speed() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Grounded);

        intent.set_jump_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);

        assert_eq!(world.body.velocity.y, config.jump_force);
        assert_eq!(world.body.velocity.x, 0.0);
        assert_eq!(world.body.velocity.z, 0.0);

        // Holding jump does not jump again
        world.body.velocity = Vec3::ZERO;
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(world.body.velocity.y, 0.0);
    }

    #[test]
    fn jump_out_of_slide_is_scaled() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Sliding);

        intent.set_jump_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);

        let expected = config.jump_force * config.slide_jump_modifier;
        assert!((world.body.velocity.y - expected).abs() < 1e-4);
        assert!(world.body.velocity.y > config.jump_force);
    }

    #[test]
    fn slide_uses_momentum_direction() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        world.body.velocity = Vec3::new(0.0, 0.0, 5.0);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);

        let expected = (5.0 + config.slide_speed_boost)
            .clamp(config.slide_speed, config.max_slide_speed);
        assert_eq!(machine.state(), LocomotionState::Sliding);
        assert_eq!(machine.slide_direction(), Vec3::Z);
        let flat = horizontal(world.body.velocity);
        assert!((flat - Vec3::Z * expected).length() < 1e-4);
        assert!(world.body.velocity.y < 0.0);
        assert_eq!(world.body.scale.y, config.slide_scale_y);
    }

    #[test]
    fn slide_prefers_input_direction() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        world.body.velocity = Vec3::new(0.0, 0.0, 5.0);

        intent.set_move(0.0, 1.0);
        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);

        assert!((machine.slide_direction() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn slide_ends_on_release_and_restores_scale() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Sliding);

        intent.set_slide_pressed(false);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.slide_timer(), 0.0);
        assert_ne!(machine.state(), LocomotionState::Sliding);
        assert_eq!(world.body.scale, Vec3::ONE);
    }

    #[test]
    fn builders_set_facing_and_standing_scale() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new()
            .with_standing_scale(Vec3::splat(2.0))
            .with_yaw(std::f32::consts::FRAC_PI_2);
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        assert!((machine.forward() - Vec3::NEG_X).length() < 1e-5);
        assert_eq!(machine.scale(), Vec3::splat(2.0));

        // From rest the slide follows the facing
        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert!((machine.slide_direction() - Vec3::NEG_X).length() < 1e-5);
        assert_eq!(
            world.body.scale,
            Vec3::new(2.0, 2.0 * config.slide_scale_y, 2.0)
        );

        intent.set_slide_pressed(false);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(world.body.scale, Vec3::splat(2.0));
    }

    #[test]
    fn slide_times_out() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.set_slide_pressed(true);
        let ticks = (config.slide_duration / DT).ceil() as usize + 2;
        for _ in 0..ticks {
            tick(&mut machine, &config, &mut intent, &mut world);
            world.body.velocity.y = 0.0;
        }
        assert_eq!(machine.state(), LocomotionState::Grounded);
    }

    #[test]
    fn scale_restore_waits_for_headroom() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        // Low ceiling at y = 1.5
        let ceiling = world.add_box(Vec3::new(0.0, 2.0, 0.0), Vec3::new(5.0, 0.5, 5.0), GROUND_LAYER);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        intent.set_slide_pressed(false);
        tick(&mut machine, &config, &mut intent, &mut world);

        assert_eq!(machine.slide_timer(), 0.0);
        assert_eq!(world.body.scale.y, config.slide_scale_y);

        world.geometry.boxes.remove(ceiling);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(world.body.scale, Vec3::ONE);
    }

    #[test]
    fn headroom_check_uses_standing_scale() {
        let config = MovementConfig::default();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        // Ceiling above a unit-scale body but below a doubled one
        let ceiling_y = config.standing_height * 1.5;
        world.add_box(
            Vec3::new(0.0, ceiling_y + 0.5, 0.0),
            Vec3::new(5.0, 0.5, 5.0),
            GROUND_LAYER,
        );

        for (standing, blocked) in [(1.0, false), (2.0, true)] {
            let mut machine =
                MovementStateMachine::new().with_standing_scale(Vec3::splat(standing));
            let mut intent = MovementIntent::new();
            world.body.position = Vec3::ZERO;
            world.body.velocity = Vec3::ZERO;

            intent.set_slide_pressed(true);
            tick(&mut machine, &config, &mut intent, &mut world);
            intent.set_slide_pressed(false);
            tick(&mut machine, &config, &mut intent, &mut world);

            let crouched = standing * config.slide_scale_y;
            let expected_y = if blocked { crouched } else { standing };
            assert_eq!(machine.scale().y, expected_y, "standing scale {standing}");
        }
    }

    #[test]
    fn air_slide_needs_ground_contact_in_between() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        world.body.position = Vec3::new(0.0, 10.0, 0.0);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Sliding);
        assert!(!machine.can_air_slide());

        intent.set_slide_pressed(false);
        tick(&mut machine, &config, &mut intent, &mut world);
        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Airborne);

        // Touch the ground, then take off again
        world.body.position = Vec3::ZERO;
        intent.set_slide_pressed(false);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert!(machine.can_air_slide());
    }

    #[test]
    fn ground_blend_approaches_move_speed() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.set_move(1.0, 0.0);
        for _ in 0..120 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        let flat = horizontal(world.body.velocity);
        assert!((flat - Vec3::NEG_Z * config.move_speed).length() < 0.01);
        assert!(machine.headbob_active());
    }

    #[test]
    fn high_speed_uses_drag_curve() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        world.body.velocity = Vec3::new(0.0, 0.0, -30.0);

        tick(&mut machine, &config, &mut intent, &mut world);

        let t = DT / config.drag_time;
        let keep = config.horizontal_drag_curve.evaluate(t);
        assert!((world.body.velocity.z - (-30.0 * keep)).abs() < 1e-3);
    }

    #[test]
    fn look_clamps_pitch() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.add_look(Vec2::new(90.0, 500.0));
        tick(&mut machine, &config, &mut intent, &mut world);

        assert!((machine.pitch() - config.max_look_angle.to_radians()).abs() < 1e-5);
        // Turning right by 90 degrees faces +X
        assert!((machine.forward() - Vec3::X).length() < 1e-5);
        assert_eq!(intent.look_delta, Vec2::ZERO);
    }

    #[test]
    fn wall_run_keeps_only_along_wall_speed() {
        let config = MovementConfig {
            wall_run_acceleration: 0.0,
            ..default()
        };
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = wall_world(&config);
        world.body.position = Vec3::new(0.0, 3.0, 0.0);
        world.body.velocity = Vec3::new(2.0, -3.0, -8.0);

        intent.set_move(1.0, 0.0);
        tick(&mut machine, &config, &mut intent, &mut world);

        assert_eq!(machine.state(), LocomotionState::WallRunning);
        assert_eq!(machine.wall_side(), Some(WallSide::Right));
        assert!(!world.body.gravity_enabled);
        assert!((world.body.velocity - Vec3::new(0.0, 0.0, -8.0)).length() < 1e-4);

        // Wall disappears
        world.clear_boxes();
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Airborne);
        assert!(world.body.gravity_enabled);
        assert!(!machine.can_wall_run());
    }

    #[test]
    fn wall_run_timer_waits_for_speed_cap() {
        let config = MovementConfig {
            wall_run_acceleration: 0.0,
            ..default()
        };
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = wall_world(&config);
        world.body.position = Vec3::new(0.0, 3.0, 0.0);
        world.body.velocity = Vec3::new(0.0, 0.0, -30.0);

        intent.set_move(1.0, 0.0);
        for _ in 0..10 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        let run = machine.wall_run().unwrap();
        assert!(!run.timer_started);

        world.body.velocity = Vec3::new(0.0, 0.0, -10.0);
        tick(&mut machine, &config, &mut intent, &mut world);
        let run = machine.wall_run().unwrap();
        assert!(run.timer_started);
        assert!(run.timer < config.max_wall_run_time);
    }

    #[test]
    fn wall_run_times_out() {
        let config = MovementConfig::default().with_wall_run(18.0, 0.5);
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = wall_world(&config);
        world.body.position = Vec3::new(0.0, 3.0, 0.0);
        world.body.velocity = Vec3::new(0.0, 0.0, -5.0);

        intent.set_move(1.0, 0.0);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::WallRunning);

        for _ in 0..35 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        assert_ne!(machine.state(), LocomotionState::WallRunning);
        assert!(world.body.gravity_enabled);
    }

    #[test]
    fn wall_run_accelerates_toward_cap() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = wall_world(&config);
        world.body.position = Vec3::new(0.0, 3.0, 0.0);
        world.body.velocity = Vec3::new(0.0, 0.0, -5.0);

        intent.set_move(1.0, 0.0);
        for _ in 0..10 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        let speed = -world.body.velocity.z;
        assert!(speed > 5.0);
        assert!(speed <= config.max_wall_run_speed);
        assert_eq!(world.body.velocity.y, 0.0);
    }

    #[test]
    fn wall_jump_locks_then_releases() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = wall_world(&config);
        world.body.position = Vec3::new(0.0, 3.0, 0.0);
        world.body.velocity = Vec3::new(0.0, 0.0, -5.0);

        intent.set_move(1.0, 0.0);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::WallRunning);

        intent.set_jump_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(machine.state(), LocomotionState::Locked);
        assert!(world.body.gravity_enabled);
        assert!((world.body.velocity.y - config.wall_jump_up_force).abs() < 1e-4);
        // Pushed away from the wall (normal -X)
        assert!((world.body.velocity.x + config.wall_jump_side_force).abs() < 1e-4);

        for _ in 0..5 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        assert_eq!(machine.state(), LocomotionState::Locked);

        for _ in 0..15 {
            tick(&mut machine, &config, &mut intent, &mut world);
        }
        assert_ne!(machine.state(), LocomotionState::Locked);
        assert!(machine.can_wall_run());
    }

    #[test]
    fn grapple_override_wins_and_leaves_velocity_alone() {
        let config = MovementConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
        world.body.position = Vec3::new(0.0, 5.0, 0.0);
        world.body.velocity = Vec3::new(40.0, 2.0, 0.0);

        let grapple = GrappleInfluence {
            override_state: Some(GrappleOverride::Grappling),
            suspends_gravity: true,
        };
        intent.set_move(1.0, 0.0);
        machine.tick(&config, &mut intent, grapple, &mut world, DT);

        assert_eq!(machine.state(), LocomotionState::Grappling);
        assert_eq!(world.body.velocity, Vec3::new(40.0, 2.0, 0.0));
        assert!(!world.body.gravity_enabled);
    }

    #[test]
    fn custom_gravity_and_fall_clamp() {
        let config = MovementConfig::default().with_gravity(20.0, 10.0);
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::new();
        world.body.position = Vec3::new(0.0, 50.0, 0.0);

        tick(&mut machine, &config, &mut intent, &mut world);
        assert!((world.body.velocity.y + 20.0 * DT).abs() < 1e-5);

        world.body.velocity.y = -50.0;
        tick(&mut machine, &config, &mut intent, &mut world);
        assert_eq!(world.body.velocity.y, -10.0);
    }

    proptest! {
        #[test]
        fn air_slide_only_after_ground_contact(
            steps in prop::collection::vec((any::<bool>(), any::<bool>()), 1..80)
        ) {
            let config = MovementConfig::default();
            let mut machine = MovementStateMachine::new();
            let mut intent = MovementIntent::new();
            let mut world = HeadlessWorld::with_floor(GROUND_LAYER);
            let mut used_since_ground = false;

            for (on_ground, slide) in steps {
                world.body.position = if on_ground { Vec3::ZERO } else { Vec3::new(0.0, 5.0, 0.0) };
                world.body.velocity = Vec3::ZERO;
                intent.set_slide_pressed(slide);
                let was_available = machine.can_air_slide();
                tick(&mut machine, &config, &mut intent, &mut world);

                if on_ground {
                    used_since_ground = false;
                    prop_assert!(machine.can_air_slide());
                } else if was_available && !machine.can_air_slide() {
                    prop_assert!(!used_since_ground);
                    used_since_ground = true;
                }
                if used_since_ground {
                    prop_assert!(!machine.can_air_slide());
                }
            }
        }

        #[test]
        fn exactly_one_state_and_bounded_velocity(
            inputs in prop::collection::vec(
                (-1.0f32..1.0, -1.0f32..1.0, any::<bool>(), any::<bool>()),
                1..120,
            )
        ) {
            let config = MovementConfig::default();
            let mut machine = MovementStateMachine::new();
            let mut intent = MovementIntent::new();
            let mut world = wall_world(&config);

            for (forward, right, jump, slide) in inputs {
                intent.set_move(forward, right);
                intent.set_jump_pressed(jump);
                intent.set_slide_pressed(slide);
                tick(&mut machine, &config, &mut intent, &mut world);
                world.step(DT);

                let gravity_off = !world.body.gravity_enabled;
                prop_assert_eq!(
                    gravity_off,
                    machine.state() == LocomotionState::WallRunning
                );
                prop_assert!(world.body.velocity.y >= -config.max_fall_speed);
                prop_assert!(world.body.velocity.is_finite());
                prop_assert!(machine.slide_timer() >= 0.0);
            }
        }
    }

    #[test]
    fn readout_reflects_state() {
        let config = MovementConfig::default();
        let camera = CameraConfig::default();
        let mut machine = MovementStateMachine::new();
        let mut intent = MovementIntent::new();
        let mut world = HeadlessWorld::with_floor(GROUND_LAYER);

        intent.set_slide_pressed(true);
        tick(&mut machine, &config, &mut intent, &mut world);

        let mut readout = ControllerReadout::default();
        machine.publish(&camera, world.body.velocity.length(), &mut readout);
        assert_eq!(readout.state, LocomotionState::Sliding);
        assert_eq!(readout.fov_target, camera.slide_fov);
        assert!(readout.grounded);
        assert_eq!(readout.tilt_target, 0.0);
    }

    #[test]
    fn wall_layer_is_not_ground() {
        assert!(!GROUND_LAYER.intersects(WALL_LAYER));
    }
}
