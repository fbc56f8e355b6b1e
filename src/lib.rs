//! # `freerun_controller`
//!
//! A first-person freerunning controller with a physics backend abstraction.
//!
//! The controller provides:
//! - Ground running with a speed-dependent velocity blend, jumping and custom gravity
//! - Sliding (including one air slide per ground contact) with a deferred stand-up
//! - Wall-running on two side probes, with wall jumps and a re-entry cooldown
//! - Two independent grapple hooks that swing on springs, with screen-space
//!   target prediction and a shared fuel tank
//! - A dual grapple that pulls the body toward the midpoint of both anchors
//! - Camera effect targets (FOV, tilt, headbob) published for presentation
//!
//! ## Architecture
//!
//! The simulation core is engine-agnostic. [`MovementStateMachine`] and
//! [`GrappleController`] advance once per fixed tick against a context that
//! implements [`GeometryProbe`] and [`KinematicBody`]. When a hook is attached
//! the grapple controller overrides locomotion and owns the body's velocity.
//!
//! The Bevy side is a thin layer: [`FreerunControllerPlugin`] runs the core in an
//! exclusive `FixedUpdate` system, adapting a [`PhysicsBackend`] through
//! [`BackendContext`]. The [`headless`] module provides an in-memory backend
//! used by the tests.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use freerun_controller::prelude::*;
//!
//! // Components for a player body
//! let config = MovementConfig::player();
//! let grapple_config = GrappleConfig::default();
//! let machine = MovementStateMachine::new();
//! let grapple = GrappleController::new(&grapple_config);
//!
//! // Spawn them with a body understood by your backend
//! ```
//!
//! [`MovementStateMachine`]: movement::MovementStateMachine
//! [`GrappleController`]: grapple::GrappleController
//! [`GeometryProbe`]: backend::GeometryProbe
//! [`KinematicBody`]: backend::KinematicBody
//! [`PhysicsBackend`]: backend::PhysicsBackend
//! [`BackendContext`]: backend::BackendContext

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod curve;
pub mod detection;
pub mod error;
pub mod fuel;
pub mod grapple;
pub mod headless;
pub mod intent;
pub mod movement;
pub mod prediction;
pub mod state;
pub mod systems;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::{
        BackendContext, ConstraintHandle, GeometryProbe, KinematicBody, PhysicsBackend,
        SpringConstraint,
    };
    pub use crate::camera::CameraRig;
    pub use crate::collision::{LayerMask, ProbeHit};
    pub use crate::config::{
        CameraConfig, ControllerTuning, DistanceBand, GrappleConfig, MovementConfig,
        GRAPPLEABLE_LAYER, GROUND_LAYER, WALL_LAYER,
    };
    pub use crate::curve::ResponseCurve;
    pub use crate::detection::WallSide;
    pub use crate::error::ConfigError;
    pub use crate::grapple::GrappleController;
    pub use crate::intent::{GrappleIntent, HookSide, MovementIntent};
    pub use crate::movement::MovementStateMachine;
    pub use crate::state::{
        Airborne, ControllerReadout, GrappleInfluence, GrappleOverride, Grounded,
        LocomotionState,
    };
    pub use crate::systems::{ActiveTuning, TuningRejected};
    pub use crate::FreerunControllerPlugin;
}

/// Main plugin for the freerunning controller.
///
/// Generic over a physics backend `B` which provides raycasts, body access and
/// spring constraints.
///
/// # Examples
///
/// With the in-memory backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use freerun_controller::headless::HeadlessBackend;
/// use freerun_controller::prelude::*;
///
/// App::new()
///     .add_plugins(MinimalPlugins)
///     .add_plugins(FreerunControllerPlugin::<HeadlessBackend>::default())
///     .run();
/// ```
pub struct FreerunControllerPlugin<B: backend::PhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::PhysicsBackend> Default for FreerunControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::PhysicsBackend> Plugin for FreerunControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::MovementConfig>();
        app.register_type::<config::GrappleConfig>();
        app.register_type::<config::CameraConfig>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<intent::GrappleIntent>();
        app.register_type::<movement::MovementStateMachine>();
        app.register_type::<grapple::GrappleController>();
        app.register_type::<state::ControllerReadout>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<camera::CameraRig>();
        app.register_type::<systems::TuningRejected>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // The whole core runs in one fixed step
        app.add_systems(
            FixedUpdate,
            (
                systems::validate_tuning,
                systems::tick_controllers::<B>,
                systems::sync_state_markers,
            )
                .chain(),
        );

        app.add_systems(Update, systems::update_camera_rigs);
    }
}
