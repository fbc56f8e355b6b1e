//! Physics backend abstraction.
//!
//! The controller core never talks to a physics engine directly. It reaches
//! the world through two collaborator traits:
//!
//! - [`GeometryProbe`]: raycasts and overlap queries filtered by [`LayerMask`]
//! - [`KinematicBody`]: the controlled body's velocity, gravity and constraints
//!
//! Both are handed to the controllers on every tick, so any engine (or a plain
//! in-memory world, see [`crate::headless`]) can drive them.
//!
//! For Bevy, implement [`PhysicsBackend`] for your engine and add
//! [`crate::FreerunControllerPlugin`]; [`BackendContext`] adapts the backend to
//! both traits for one entity.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::collision::{LayerMask, ProbeHit};

/// World queries used for ground, wall, headroom and hook prediction checks.
pub trait GeometryProbe {
    /// Cast a ray and return the closest hit on a layer in `mask`.
    ///
    /// `direction` should be normalized. Misses return `None`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit>;

    /// Whether a sphere at `point` overlaps any geometry on a layer in `mask`.
    fn sphere_overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> bool;
}

/// Opaque handle to a spring constraint owned by the physics collaborator.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintHandle(pub u64);

/// A distance-limited spring between the body and a world anchor.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SpringConstraint {
    /// World-space anchor point.
    pub anchor: Vec3,
    /// Distance below which the spring pushes the body away.
    pub min_distance: f32,
    /// Distance above which the spring pulls the body in.
    pub max_distance: f32,
    /// Spring stiffness.
    pub stiffness: f32,
    /// Spring damping.
    pub damping: f32,
    /// Mass scale applied by the joint solver.
    pub mass_scale: f32,
}

/// The controlled body.
///
/// The controller is the only writer of the body during a tick.
pub trait KinematicBody {
    /// World-space position of the body origin (at the feet).
    fn position(&self) -> Vec3;

    /// World-space rotation of the body.
    fn rotation(&self) -> Quat;

    /// Current linear velocity.
    fn velocity(&self) -> Vec3;

    /// Overwrite the linear velocity.
    fn set_velocity(&mut self, velocity: Vec3);

    /// Apply an instantaneous, mass-normalized velocity change.
    fn apply_impulse(&mut self, impulse: Vec3);

    /// Toggle engine gravity for the body.
    fn set_gravity_enabled(&mut self, enabled: bool);

    /// Attach a spring constraint and return its handle.
    fn add_constraint(&mut self, constraint: SpringConstraint) -> ConstraintHandle;

    /// Remove a constraint. Removing an unknown handle is a no-op.
    fn remove_constraint(&mut self, handle: ConstraintHandle);

    /// Set the body's visual/collision scale.
    ///
    /// Default implementation ignores the request.
    fn set_scale(&mut self, _scale: Vec3) {}
}

/// Trait for Bevy physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller
/// plugin. All functions are static and receive the ECS world, mirroring how
/// backends are usually written against engine components.
pub trait PhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Cast a ray, ignoring `exclude` (usually the controlled entity).
    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        exclude: Entity,
    ) -> Option<ProbeHit>;

    /// Sphere overlap query, ignoring `exclude`.
    fn sphere_overlap(
        world: &World,
        point: Vec3,
        radius: f32,
        mask: LayerMask,
        exclude: Entity,
    ) -> bool;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the current rotation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply a mass-normalized impulse to an entity.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Enable or disable engine gravity for an entity.
    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Attach a spring constraint to an entity.
    fn add_constraint(
        world: &mut World,
        entity: Entity,
        constraint: SpringConstraint,
    ) -> ConstraintHandle;

    /// Remove a constraint from an entity. Unknown handles are ignored.
    fn remove_constraint(world: &mut World, entity: Entity, handle: ConstraintHandle);

    /// Set the scale of an entity.
    fn set_scale(world: &mut World, entity: Entity, scale: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.scale = scale;
        }
    }

    /// Get the fixed timestep, falling back to 60 Hz.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.timestep().as_secs_f32())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Adapts a [`PhysicsBackend`] to [`GeometryProbe`] and [`KinematicBody`] for one entity.
pub struct BackendContext<'w, B: PhysicsBackend> {
    world: &'w mut World,
    entity: Entity,
    _marker: PhantomData<B>,
}

impl<'w, B: PhysicsBackend> BackendContext<'w, B> {
    /// Create a context for `entity`.
    pub fn new(world: &'w mut World, entity: Entity) -> Self {
        Self {
            world,
            entity,
            _marker: PhantomData,
        }
    }

    /// The entity this context acts on.
    pub fn entity(&self) -> Entity {
        self.entity
    }
}

impl<B: PhysicsBackend> GeometryProbe for BackendContext<'_, B> {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        B::raycast(&*self.world, origin, direction, max_distance, mask, self.entity)
    }

    fn sphere_overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> bool {
        B::sphere_overlap(&*self.world, point, radius, mask, self.entity)
    }
}

impl<B: PhysicsBackend> KinematicBody for BackendContext<'_, B> {
    fn position(&self) -> Vec3 {
        B::get_position(&*self.world, self.entity)
    }

    fn rotation(&self) -> Quat {
        B::get_rotation(&*self.world, self.entity)
    }

    fn velocity(&self) -> Vec3 {
        B::get_velocity(&*self.world, self.entity)
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        B::set_velocity(self.world, self.entity, velocity);
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        B::apply_impulse(self.world, self.entity, impulse);
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        B::set_gravity_enabled(self.world, self.entity, enabled);
    }

    fn add_constraint(&mut self, constraint: SpringConstraint) -> ConstraintHandle {
        B::add_constraint(self.world, self.entity, constraint)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) {
        B::remove_constraint(self.world, self.entity, handle);
    }

    fn set_scale(&mut self, scale: Vec3) {
        B::set_scale(self.world, self.entity, scale);
    }
}
