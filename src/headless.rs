//! In-memory physics backend.
//!
//! A small kinematic world made of axis-aligned boxes and point bodies. It
//! answers the controller's probes exactly, integrates velocity, gravity and
//! spring constraints, and pushes bodies out of boxes. Useful for dedicated
//! servers, replays and tests; games with a real physics engine implement
//! [`PhysicsBackend`] for that engine instead.
//!
//! - [`HeadlessWorld`] implements [`GeometryProbe`] and [`KinematicBody`]
//!   directly for driving the core without Bevy.
//! - [`HeadlessBackend`] implements [`PhysicsBackend`] over a
//!   [`HeadlessGeometry`] resource and [`HeadlessBody`] components.

use std::collections::HashMap;

use bevy::prelude::*;
use tracing::warn;

use crate::backend::{
    ConstraintHandle, GeometryProbe, KinematicBody, PhysicsBackend, SpringConstraint,
};
use crate::collision::{LayerMask, ProbeHit};

/// Standard gravity.
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// An axis-aligned box collider.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ColliderBox {
    /// Box centre.
    pub center: Vec3,
    /// Half the box size along each axis.
    pub half_extents: Vec3,
    /// Layers the box belongs to.
    pub layers: LayerMask,
}

impl ColliderBox {
    /// Create a box from its centre and half extents.
    pub fn new(center: Vec3, half_extents: Vec3, layers: LayerMask) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
            layers,
        }
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    /// Whether `point` is strictly inside the box.
    pub fn contains(&self, point: Vec3) -> bool {
        let local = (point - self.center).abs();
        local.cmplt(self.half_extents).all()
    }

    /// Slab test. Returns the entry distance and the face normal.
    ///
    /// Rays starting inside the box do not hit it.
    fn ray_entry(&self, origin: Vec3, direction: Vec3) -> Option<(f32, Vec3)> {
        let min = self.min();
        let max = self.max();
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            if d.abs() < f32::EPSILON {
                if o < min[axis] || o > max[axis] {
                    return None;
                }
                continue;
            }
            let (near, far, sign) = if d > 0.0 {
                ((min[axis] - o) / d, (max[axis] - o) / d, -1.0)
            } else {
                ((max[axis] - o) / d, (min[axis] - o) / d, 1.0)
            };
            if near > t_enter {
                t_enter = near;
                normal = Vec3::ZERO;
                normal[axis] = sign;
            }
            t_exit = t_exit.min(far);
        }

        (t_enter >= 0.0 && t_enter <= t_exit).then_some((t_enter, normal))
    }

    /// Squared distance from `point` to the box.
    fn distance_squared(&self, point: Vec3) -> f32 {
        let closest = point.clamp(self.min(), self.max());
        closest.distance_squared(point)
    }
}

/// Static geometry and gravity shared by all headless bodies.
#[derive(Resource, Reflect, Debug, Clone)]
#[reflect(Resource)]
pub struct HeadlessGeometry {
    /// Colliders.
    pub boxes: Vec<ColliderBox>,
    /// Gravity acceleration.
    pub gravity: Vec3,
}

impl Default for HeadlessGeometry {
    fn default() -> Self {
        Self {
            boxes: Vec::new(),
            gravity: DEFAULT_GRAVITY,
        }
    }
}

impl HeadlessGeometry {
    /// Add a box and return its index.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> usize {
        self.boxes
            .push(ColliderBox::new(center, half_extents, layers));
        self.boxes.len() - 1
    }

    /// Closest hit along a ray.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }
        self.boxes
            .iter()
            .filter(|b| b.layers.intersects(mask))
            .filter_map(|b| b.ray_entry(origin, direction))
            .filter(|(distance, _)| *distance <= max_distance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(distance, normal)| ProbeHit::new(origin + direction * distance, normal, distance))
    }

    /// Whether a sphere touches any box in `mask`.
    pub fn sphere_overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> bool {
        let radius_sq = radius * radius;
        self.boxes
            .iter()
            .filter(|b| b.layers.intersects(mask))
            .any(|b| b.distance_squared(point) <= radius_sq)
    }

    /// Push `position` out of any box it sits inside, cancelling velocity into the face.
    fn resolve_penetration(&self, position: &mut Vec3, velocity: &mut Vec3) {
        for collider in &self.boxes {
            if !collider.contains(*position) {
                continue;
            }
            let offset = *position - collider.center;
            let depth = collider.half_extents - offset.abs();
            let axis = if depth.x <= depth.y && depth.x <= depth.z {
                0
            } else if depth.y <= depth.z {
                1
            } else {
                2
            };
            let sign = if offset[axis] >= 0.0 { 1.0 } else { -1.0 };
            position[axis] = collider.center[axis] + sign * collider.half_extents[axis];
            if velocity[axis] * sign < 0.0 {
                velocity[axis] = 0.0;
            }
        }
    }
}

/// A point body simulated by the headless backend.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(Transform)]
pub struct HeadlessBody {
    /// Position of the body origin.
    pub position: Vec3,
    /// Rotation.
    pub rotation: Quat,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Scale written by the controller.
    pub scale: Vec3,
    /// Whether gravity is applied.
    pub gravity_enabled: bool,
    /// Attached spring constraints.
    #[reflect(ignore)]
    pub constraints: HashMap<ConstraintHandle, SpringConstraint>,
    next_handle: u64,
}

impl Default for HeadlessBody {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl HeadlessBody {
    /// A body resting at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
            velocity: Vec3::ZERO,
            scale: Vec3::ONE,
            gravity_enabled: true,
            constraints: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Builder: set the initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Attach a constraint and return its handle.
    pub fn add_constraint(&mut self, constraint: SpringConstraint) -> ConstraintHandle {
        self.next_handle += 1;
        let handle = ConstraintHandle(self.next_handle);
        self.constraints.insert(handle, constraint);
        handle
    }

    /// Remove a constraint. Unknown handles are ignored.
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) {
        self.constraints.remove(&handle);
    }

    /// Advance the body by `dt`: gravity, springs, motion, then collision.
    pub fn step(&mut self, geometry: &HeadlessGeometry, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        if self.gravity_enabled {
            self.velocity += geometry.gravity * dt;
        }
        for constraint in self.constraints.values() {
            self.velocity += spring_acceleration(constraint, self.position, self.velocity) * dt;
        }
        self.position += self.velocity * dt;
        geometry.resolve_penetration(&mut self.position, &mut self.velocity);
    }
}

/// Acceleration a distance-limited spring applies to a body.
fn spring_acceleration(constraint: &SpringConstraint, position: Vec3, velocity: Vec3) -> Vec3 {
    let offset = position - constraint.anchor;
    let distance = offset.length();
    if distance <= f32::EPSILON {
        return Vec3::ZERO;
    }
    let direction = offset / distance;
    let stretch = if distance > constraint.max_distance {
        distance - constraint.max_distance
    } else if distance < constraint.min_distance {
        distance - constraint.min_distance
    } else {
        return Vec3::ZERO;
    };
    let radial_speed = velocity.dot(direction);
    let scale = constraint.mass_scale.max(f32::EPSILON);
    -direction * (constraint.stiffness * stretch + constraint.damping * radial_speed) / scale
}

/// A standalone world with one body, for driving the core without Bevy.
#[derive(Debug, Clone, Default)]
pub struct HeadlessWorld {
    /// Static geometry.
    pub geometry: HeadlessGeometry,
    /// The controlled body.
    pub body: HeadlessBody,
}

impl HeadlessWorld {
    /// Create an empty world with default gravity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a world with a flat floor whose top is at `y = 0`.
    pub fn with_floor(layers: LayerMask) -> Self {
        let mut world = Self::new();
        world.add_box(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(500.0, 0.5, 500.0),
            layers,
        );
        world
    }

    /// Add a box and return its index.
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3, layers: LayerMask) -> usize {
        self.geometry.add_box(center, half_extents, layers)
    }

    /// Remove every box.
    pub fn clear_boxes(&mut self) {
        self.geometry.boxes.clear();
    }

    /// Advance the body by `dt`.
    pub fn step(&mut self, dt: f32) {
        self.body.step(&self.geometry, dt);
    }
}

impl GeometryProbe for HeadlessWorld {
    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<ProbeHit> {
        self.geometry.raycast(origin, direction, max_distance, mask)
    }

    fn sphere_overlap(&self, point: Vec3, radius: f32, mask: LayerMask) -> bool {
        self.geometry.sphere_overlap(point, radius, mask)
    }
}

impl KinematicBody for HeadlessWorld {
    fn position(&self) -> Vec3 {
        self.body.position
    }

    fn rotation(&self) -> Quat {
        self.body.rotation
    }

    fn velocity(&self) -> Vec3 {
        self.body.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.body.velocity = velocity;
    }

    fn apply_impulse(&mut self, impulse: Vec3) {
        self.body.velocity += impulse;
    }

    fn set_gravity_enabled(&mut self, enabled: bool) {
        self.body.gravity_enabled = enabled;
    }

    fn add_constraint(&mut self, constraint: SpringConstraint) -> ConstraintHandle {
        self.body.add_constraint(constraint)
    }

    fn remove_constraint(&mut self, handle: ConstraintHandle) {
        self.body.remove_constraint(handle);
    }

    fn set_scale(&mut self, scale: Vec3) {
        self.body.scale = scale;
    }
}

/// Headless physics backend for the controller plugin.
///
/// Bodies need a [`HeadlessBody`]; geometry lives in the [`HeadlessGeometry`]
/// resource. Bodies are stepped in `FixedPostUpdate`, after the controller.
pub struct HeadlessBackend;

impl PhysicsBackend for HeadlessBackend {
    fn plugin() -> impl Plugin {
        HeadlessBackendPlugin
    }

    fn raycast(
        world: &World,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
        _exclude: Entity,
    ) -> Option<ProbeHit> {
        world
            .get_resource::<HeadlessGeometry>()
            .and_then(|g| g.raycast(origin, direction, max_distance, mask))
    }

    fn sphere_overlap(
        world: &World,
        point: Vec3,
        radius: f32,
        mask: LayerMask,
        _exclude: Entity,
    ) -> bool {
        world
            .get_resource::<HeadlessGeometry>()
            .is_some_and(|g| g.sphere_overlap(point, radius, mask))
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.position)
            .or_else(|| world.get::<Transform>(entity).map(|t| t.translation))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<HeadlessBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.velocity += impulse;
        }
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.gravity_enabled = enabled;
        }
    }

    fn add_constraint(
        world: &mut World,
        entity: Entity,
        constraint: SpringConstraint,
    ) -> ConstraintHandle {
        match world.get_mut::<HeadlessBody>(entity) {
            Some(mut body) => body.add_constraint(constraint),
            None => {
                warn!(?entity, "constraint requested for an entity without HeadlessBody");
                ConstraintHandle(0)
            }
        }
    }

    fn remove_constraint(world: &mut World, entity: Entity, handle: ConstraintHandle) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.remove_constraint(handle);
        }
    }

    fn set_scale(world: &mut World, entity: Entity, scale: Vec3) {
        if let Some(mut body) = world.get_mut::<HeadlessBody>(entity) {
            body.scale = scale;
        }
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.scale = scale;
        }
    }
}

/// Plugin that registers headless geometry and steps headless bodies.
pub struct HeadlessBackendPlugin;

impl Plugin for HeadlessBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<HeadlessGeometry>();
        app.register_type::<HeadlessBody>();
        app.init_resource::<HeadlessGeometry>();
        app.add_systems(FixedPostUpdate, step_headless_bodies);
    }
}

/// Integrate every headless body and mirror it into its `Transform`.
pub fn step_headless_bodies(
    time: Res<Time<Fixed>>,
    geometry: Res<HeadlessGeometry>,
    mut bodies: Query<(&mut HeadlessBody, &mut Transform)>,
) {
    let dt = time.timestep().as_secs_f32();
    for (mut body, mut transform) in &mut bodies {
        body.step(&geometry, dt);
        transform.translation = body.position;
        transform.rotation = body.rotation;
        transform.scale = body.scale;
    }
}
