//! Controller systems.
//!
//! The fixed-step core runs in one exclusive system per backend so the grapple
//! controller and the locomotion state machine see the same body within a
//! tick. Everything else reads the published [`ControllerReadout`].

use std::sync::Arc;

use bevy::prelude::*;
use tracing::{trace, warn};

use crate::backend::{BackendContext, KinematicBody, PhysicsBackend};
use crate::camera::CameraRig;
use crate::config::{CameraConfig, ControllerTuning, GrappleConfig, MovementConfig};
use crate::grapple::GrappleController;
use crate::intent::{GrappleIntent, MovementIntent};
use crate::movement::MovementStateMachine;
use crate::state::{Airborne, ControllerReadout, Grounded, GrappleInfluence};

/// Marker for bodies whose tuning failed validation.
///
/// The controller skips these until a valid config is inserted.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct TuningRejected;

/// Snapshot of a body's configs, taken when they last passed validation.
///
/// The fixed tick reads tuning from here, so configs are only copied when
/// they change.
#[derive(Component, Debug, Clone)]
pub struct ActiveTuning(Arc<ControllerTuning>);

impl ActiveTuning {
    /// The validated tuning.
    pub fn tuning(&self) -> &ControllerTuning {
        &self.0
    }
}

/// Validate configs when they are added or changed.
pub fn validate_tuning(
    mut commands: Commands,
    q_configs: Query<
        (
            Entity,
            &MovementConfig,
            &CameraConfig,
            Option<&GrappleConfig>,
            Has<TuningRejected>,
        ),
        Or<(
            Changed<MovementConfig>,
            Changed<CameraConfig>,
            Changed<GrappleConfig>,
        )>,
    >,
) {
    for (entity, movement, camera, grapple, rejected) in &q_configs {
        let result = movement
            .validate()
            .and_then(|()| camera.validate())
            .and_then(|()| grapple.map_or(Ok(()), GrappleConfig::validate));

        match result {
            Ok(()) => {
                let tuning = ControllerTuning {
                    movement: movement.clone(),
                    grapple: grapple.cloned().unwrap_or_default(),
                    camera: camera.clone(),
                };
                let mut entity_commands = commands.entity(entity);
                entity_commands.insert(ActiveTuning(Arc::new(tuning)));
                if rejected {
                    entity_commands.remove::<TuningRejected>();
                }
                trace!(?entity, "controller tuning accepted");
            }
            Err(error) => {
                warn!(?entity, %error, "controller tuning rejected");
                commands
                    .entity(entity)
                    .insert(TuningRejected)
                    .remove::<ActiveTuning>();
            }
        }
    }
}

/// Run one fixed tick of every controller: grapple first, then locomotion.
///
/// Bodies without an [`ActiveTuning`] snapshot are skipped.
pub fn tick_controllers<B: PhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    // Collect entities that need updating
    let controllers: Vec<(
        Entity,
        MovementStateMachine,
        Arc<ControllerTuning>,
        MovementIntent,
        Option<(GrappleController, GrappleIntent)>,
    )> = world
        .query::<(
            Entity,
            &MovementStateMachine,
            &ActiveTuning,
            &MovementIntent,
            Option<(&GrappleController, &GrappleIntent)>,
        )>()
        .iter(world)
        .map(|(e, machine, active, intent, grapple)| {
            (
                e,
                machine.clone(),
                Arc::clone(&active.0),
                intent.clone(),
                grapple.map(|(g, i)| (g.clone(), i.clone())),
            )
        })
        .collect();

    for (entity, mut machine, tuning, mut intent, mut grapple) in controllers {
        let ControllerTuning {
            movement,
            grapple: grapple_config,
            camera,
        } = &*tuning;
        let speed = {
            let mut ctx = BackendContext::<B>::new(world, entity);
            let view = machine.aim_view(camera, ctx.position());

            let influence = match grapple.as_mut() {
                Some((controller, grapple_intent)) => {
                    controller.tick(grapple_config, grapple_intent, &view, &mut ctx, dt)
                }
                None => GrappleInfluence::NONE,
            };
            machine.tick(movement, &mut intent, influence, &mut ctx, dt);
            ctx.velocity().length()
        };

        // Publish
        if let Some(mut readout) = world.get_mut::<ControllerReadout>(entity) {
            machine.publish(camera, speed, &mut readout);
            match &grapple {
                Some((controller, _)) => {
                    readout.hook_anchors = controller.anchors();
                    readout.predictions = controller.prediction_points();
                    readout.fuel = controller.fuel().fuel();
                    readout.max_fuel = grapple_config.max_fuel;
                }
                None => {
                    readout.hook_anchors = [None; 2];
                    readout.predictions = [None; 2];
                }
            }
        }

        // Write back
        if let Some(mut stored) = world.get_mut::<MovementStateMachine>(entity) {
            *stored = machine;
        }
        if let Some(mut stored) = world.get_mut::<MovementIntent>(entity) {
            *stored = intent;
        }
        if let Some((controller, grapple_intent)) = grapple {
            if let Some(mut stored) = world.get_mut::<GrappleController>(entity) {
                *stored = controller;
            }
            if let Some(mut stored) = world.get_mut::<GrappleIntent>(entity) {
                *stored = grapple_intent;
            }
        }
    }
}

/// Synchronize the [`Grounded`] and [`Airborne`] markers with the state machine.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(Entity, &MovementStateMachine, Has<Grounded>, Has<Airborne>)>,
) {
    for (entity, machine, has_grounded, has_airborne) in &q_controllers {
        if machine.is_grounded() && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !machine.is_grounded() && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}

/// Smooth camera effects toward the published targets.
pub fn update_camera_rigs(
    time: Res<Time>,
    mut q_rigs: Query<(&mut CameraRig, &ControllerReadout, Option<&CameraConfig>)>,
) {
    let dt = time.delta_secs();
    let fallback = CameraConfig::default();
    for (mut rig, readout, config) in &mut q_rigs {
        rig.update(config.unwrap_or(&fallback), readout, dt);
    }
}
