//! Dual-hook grapple controller.
//!
//! Two hooks, each bound to one half of the screen. A single attached hook
//! hangs the body from a spring constraint (swinging). Attaching both hooks
//! within `grapple_window` of each other starts a dual grapple instead, which
//! drops the springs and steers the body's velocity toward the midpoint of
//! the two anchors until it arrives or times out.
//!
//! The controller runs before the movement state machine each tick and hands
//! it a [`GrappleInfluence`]; it never toggles body gravity itself.

use bevy::prelude::*;
use tracing::{debug, trace};

use crate::backend::{ConstraintHandle, GeometryProbe, KinematicBody, SpringConstraint};
use crate::config::GrappleConfig;
use crate::curve::blend_factor;
use crate::fuel::FuelTank;
use crate::intent::{GrappleIntent, HookSide};
use crate::prediction::{predict_side, AimView, Prediction};
use crate::state::{GrappleInfluence, GrappleOverride};

/// Distance to the midpoint below which no steering direction is computed.
const MIN_STEER_DISTANCE: f32 = 0.01;

/// Minimum alignment with the midpoint direction for momentum to count.
const MOMENTUM_ALIGNMENT: f32 = 0.1;

/// One hook.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct HookSlot {
    anchor: Option<Vec3>,
    constraint: Option<ConstraintHandle>,
    last_pressed_at: Option<f32>,
}

impl HookSlot {
    /// Whether the hook is attached.
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Attachment point, while attached.
    pub fn anchor(&self) -> Option<Vec3> {
        self.anchor
    }

    /// Spring constraint held by the hook, while swinging.
    pub fn constraint(&self) -> Option<ConstraintHandle> {
        self.constraint
    }

    /// Controller time of the last press.
    pub fn last_pressed_at(&self) -> Option<f32> {
        self.last_pressed_at
    }

    fn drop_constraint<B: KinematicBody + ?Sized>(&mut self, body: &mut B) {
        if let Some(handle) = self.constraint.take() {
            body.remove_constraint(handle);
        }
    }
}

/// A running dual grapple.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DualGrapple {
    /// Midpoint of the two anchors.
    pub midpoint: Vec3,
    /// Body position when the grapple started.
    pub start_position: Vec3,
    /// Distance to the midpoint when the grapple started.
    pub start_distance: f32,
    /// Time since the grapple started.
    pub elapsed: f32,
    /// Speed the grapple steers toward.
    pub final_speed: f32,
    /// Whether the body has not yet got closer than the start distance.
    pub elastic: bool,
}

/// Grapple state for one body.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(GrappleConfig, GrappleIntent)]
pub struct GrappleController {
    hooks: [HookSlot; 2],
    fuel: FuelTank,
    dual: Option<DualGrapple>,
    predictions: [Option<Prediction>; 2],
    swinging: bool,
    gravity_restore_timer: f32,
    clock: f32,
    prediction_parity: bool,
}

impl GrappleController {
    /// Create a controller with a full tank.
    pub fn new(config: &GrappleConfig) -> Self {
        Self {
            hooks: [HookSlot::default(); 2],
            fuel: FuelTank::full(config.max_fuel),
            dual: None,
            predictions: [None, None],
            swinging: false,
            gravity_restore_timer: 0.0,
            clock: 0.0,
            prediction_parity: false,
        }
    }

    /// Advance the controller by one fixed tick.
    ///
    /// Order: clock and fuel capacity, hook input (skipped during a dual grapple), dual-grapple
    /// steering, gravity restore countdown, fuel recharge, prediction.
    pub fn tick<C>(
        &mut self,
        config: &GrappleConfig,
        intent: &mut GrappleIntent,
        view: &AimView,
        ctx: &mut C,
        dt: f32,
    ) -> GrappleInfluence
    where
        C: GeometryProbe + KinematicBody + ?Sized,
    {
        let dt = dt.max(0.0);
        self.clock += dt;
        self.fuel.clamp_to(config.max_fuel);

        if self.dual.is_none() {
            for side in HookSide::BOTH {
                if intent.hook_just_pressed(side) {
                    self.press(config, side, ctx);
                }
            }
            for side in HookSide::BOTH {
                if intent.hook_just_released(side) {
                    self.release(side, ctx);
                }
            }
        }

        if self.dual.is_some() {
            self.steer(config, ctx, dt);
        }

        if self.gravity_restore_timer > 0.0 {
            self.gravity_restore_timer = (self.gravity_restore_timer - dt).max(0.0);
        }

        if !self.any_hook_active() && self.dual.is_none() {
            self.fuel.recharge(config, dt);
        }

        self.update_predictions(config, intent.prediction_held, view, &*ctx);

        intent.latch();
        self.influence()
    }

    /// What the movement machine must respect this tick.
    pub fn influence(&self) -> GrappleInfluence {
        let override_state = if self.dual.is_some() {
            Some(GrappleOverride::Grappling)
        } else if self.swinging {
            Some(GrappleOverride::Swinging)
        } else {
            None
        };
        GrappleInfluence {
            override_state,
            suspends_gravity: self.suspends_gravity(),
        }
    }

    /// Whether body gravity must stay off.
    pub fn suspends_gravity(&self) -> bool {
        self.dual.is_some() || self.gravity_restore_timer > 0.0
    }

    /// A hook slot.
    pub fn hook(&self, side: HookSide) -> &HookSlot {
        &self.hooks[side.index()]
    }

    /// Whether any hook is attached.
    pub fn any_hook_active(&self) -> bool {
        self.hooks.iter().any(HookSlot::is_active)
    }

    /// The running dual grapple, if any.
    pub fn dual(&self) -> Option<&DualGrapple> {
        self.dual.as_ref()
    }

    /// Check if a dual grapple is running.
    pub fn is_dual_active(&self) -> bool {
        self.dual.is_some()
    }

    /// Check if a single hook is swinging the body.
    pub fn is_swinging(&self) -> bool {
        self.swinging
    }

    /// Current prediction for a hook.
    pub fn prediction(&self, side: HookSide) -> Option<&Prediction> {
        self.predictions[side.index()].as_ref()
    }

    /// Fuel reservoir.
    pub fn fuel(&self) -> &FuelTank {
        &self.fuel
    }

    /// Mutable fuel reservoir, for pickups and debugging.
    pub fn fuel_mut(&mut self) -> &mut FuelTank {
        &mut self.fuel
    }

    /// Time left before gravity returns after a dual grapple.
    pub fn gravity_restore_timer(&self) -> f32 {
        self.gravity_restore_timer
    }

    /// Anchors of both hooks, left then right.
    pub fn anchors(&self) -> [Option<Vec3>; 2] {
        [self.hooks[0].anchor, self.hooks[1].anchor]
    }

    /// Prediction points of both hooks, left then right.
    pub fn prediction_points(&self) -> [Option<Vec3>; 2] {
        [
            self.predictions[0].map(|p| p.point()),
            self.predictions[1].map(|p| p.point()),
        ]
    }

    fn press<C>(&mut self, config: &GrappleConfig, side: HookSide, ctx: &mut C)
    where
        C: KinematicBody + ?Sized,
    {
        let i = side.index();
        self.hooks[i].last_pressed_at = Some(self.clock);

        if self.hooks[i].is_active() {
            return;
        }
        let Some(prediction) = self.predictions[i] else {
            trace!(?side, "hook press ignored: no prediction");
            return;
        };
        let anchor = prediction.point();

        let other = &self.hooks[side.other().index()];
        let within_window = match (self.hooks[i].last_pressed_at, other.last_pressed_at) {
            (Some(a), Some(b)) => (a - b).abs() <= config.grapple_window,
            _ => false,
        };
        if other.is_active() && within_window {
            if !self.fuel.can_afford(config.dual_hook_cost) {
                trace!(?side, fuel = self.fuel.fuel(), "dual grapple refused: not enough fuel");
                return;
            }
            self.hooks[i].anchor = Some(anchor);
            self.predictions[i] = None;
            self.start_dual(config, ctx);
            return;
        }

        if !self.fuel.can_afford(config.single_hook_cost) {
            trace!(?side, fuel = self.fuel.fuel(), "hook press refused: not enough fuel");
            return;
        }
        self.hooks[i].anchor = Some(anchor);
        self.predictions[i] = None;

        self.fuel
            .spend(config.single_hook_cost, config.fuel_recharge_delay);

        let distance = ctx.position().distance(anchor);
        let handle = ctx.add_constraint(SpringConstraint {
            anchor,
            min_distance: distance * config.swing_distance_ratio.min,
            max_distance: distance * config.swing_distance_ratio.max,
            stiffness: config.spring_force,
            damping: config.spring_damping,
            mass_scale: config.spring_mass_scale,
        });
        self.hooks[i].constraint = Some(handle);
        self.swinging = true;
        debug!(?side, ?anchor, distance, fuel = self.fuel.fuel(), "hook attached");
    }

    fn release<C>(&mut self, side: HookSide, ctx: &mut C)
    where
        C: KinematicBody + ?Sized,
    {
        let slot = &mut self.hooks[side.index()];
        if !slot.is_active() {
            return;
        }
        slot.anchor = None;
        slot.drop_constraint(ctx);
        if !self.any_hook_active() {
            self.swinging = false;
        }
        debug!(?side, "hook released");
    }

    fn start_dual<C>(&mut self, config: &GrappleConfig, ctx: &mut C)
    where
        C: KinematicBody + ?Sized,
    {
        let (Some(left), Some(right)) = (self.hooks[0].anchor, self.hooks[1].anchor) else {
            return;
        };

        for slot in &mut self.hooks {
            slot.drop_constraint(ctx);
        }
        self.swinging = false;

        let midpoint = (left + right) * 0.5;
        let position = ctx.position();
        let velocity = ctx.velocity();
        let start_distance = position.distance(midpoint);
        let direction = (midpoint - position).normalize_or_zero();

        let speed_from_distance =
            config.grapple_speed * config.distance_speed_modifier * start_distance;
        let alignment = velocity.normalize_or_zero().dot(direction);
        let momentum = if alignment > MOMENTUM_ALIGNMENT {
            velocity.length() * alignment
        } else {
            0.0
        };
        let final_speed = (momentum + speed_from_distance)
            .max(config.min_grapple_speed)
            .min(config.max_grapple_speed);

        self.fuel
            .spend(config.dual_hook_cost, config.fuel_recharge_delay);
        self.gravity_restore_timer = 0.0;
        self.dual = Some(DualGrapple {
            midpoint,
            start_position: position,
            start_distance,
            elapsed: 0.0,
            final_speed,
            elastic: true,
        });
        debug!(
            ?midpoint,
            start_distance,
            final_speed,
            fuel = self.fuel.fuel(),
            "dual grapple started"
        );
    }

    fn steer<C>(&mut self, config: &GrappleConfig, ctx: &mut C, dt: f32)
    where
        C: KinematicBody + ?Sized,
    {
        let Some(dual) = self.dual.as_mut() else {
            return;
        };
        dual.elapsed += dt;

        let to_midpoint = dual.midpoint - ctx.position();
        let distance = to_midpoint.length();

        if distance >= MIN_STEER_DISTANCE {
            let direction = to_midpoint / distance;
            let velocity = ctx.velocity();

            if dual.elastic && distance < dual.start_distance {
                dual.elastic = false;
            }

            let steered = if dual.elastic {
                velocity.lerp(
                    direction * dual.final_speed,
                    blend_factor(config.elastic_blend_rate, dt),
                )
            } else {
                let t = (dual.elapsed / config.max_grapple_time).clamp(0.0, 1.0);
                let curve = config.grapple_acceleration_curve.evaluate(t);
                let target_speed = velocity.length().lerp(dual.final_speed, curve);
                velocity.lerp(
                    direction * target_speed,
                    blend_factor(config.reel_in_speed, dt),
                )
            };
            ctx.set_velocity(steered);
        }

        let timed_out = dual.elapsed >= config.max_grapple_time;
        if distance <= config.grapple_release_distance || timed_out {
            let elapsed = dual.elapsed;
            self.finish_dual(config);
            debug!(elapsed, timed_out, "dual grapple finished");
        }
    }

    fn finish_dual(&mut self, config: &GrappleConfig) {
        self.dual = None;
        self.gravity_restore_timer = config.gravity_restore_delay;
        for slot in &mut self.hooks {
            slot.anchor = None;
            slot.constraint = None;
        }
        self.swinging = false;
    }

    fn update_predictions<P>(
        &mut self,
        config: &GrappleConfig,
        held: bool,
        view: &AimView,
        probe: &P,
    ) where
        P: GeometryProbe + KinematicBody + ?Sized,
    {
        if !held {
            self.predictions = [None, None];
            self.prediction_parity = false;
            return;
        }

        let run = !self.prediction_parity;
        self.prediction_parity = !self.prediction_parity;
        if !run {
            return;
        }

        let position = probe.position();
        let speed = probe.velocity().length();

        let reachable = HookSide::BOTH.iter().any(|&side| {
            let i = side.index();
            !self.hooks[i].is_active()
                && self.predictions[i]
                    .is_some_and(|p| position.distance(p.point()) <= config.max_swing_distance)
        });
        let range = if reachable {
            config.max_swing_distance + config.grapple_distance_leniency
        } else {
            config.max_swing_distance
        };

        for side in HookSide::BOTH {
            let i = side.index();
            if self.hooks[i].is_active() {
                continue;
            }
            self.predictions[i] = predict_side(probe, view, config, side, range, speed);
            trace!(?side, found = self.predictions[i].is_some(), "prediction updated");
        }
    }
}

impl Default for GrappleController {
    fn default() -> Self {
        Self::new(&GrappleConfig::default())
    }
}
