//! Vehicle physics simulation.
//!
//! Bridges the raycast vehicle model in [`super::core`] to Avian: suspension
//! rays go through the spatial query pipeline, and the resulting impulses are
//! written back as velocity changes before the physics step.

use std::f32::consts::FRAC_PI_2;

use avian3d::prelude::*;
use bevy::color::palettes::css::{ORANGE, RED, YELLOW};
use bevy::prelude::*;
use leafwing_input_manager::prelude::ActionState;

use super::components::{DriveTuning, Vehicle, VehicleInput, VehicleState, VehicleWheels};
use super::core::{ChassisState, GroundHit, GroundProbe};
use crate::input::{DriveAction, drive_commands};

/// Ground probe backed by Avian's spatial query pipeline.
struct SpatialProbe<'a> {
    pipeline: &'a SpatialQueryPipeline,
    filter: SpatialQueryFilter,
}

impl GroundProbe for SpatialProbe<'_> {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<GroundHit> {
        let direction = Dir3::new(direction).ok()?;
        self.pipeline
            .cast_ray(origin, direction, max_distance, true, &self.filter)
            .map(|hit| GroundHit {
                distance: hit.distance,
                normal: hit.normal,
            })
    }
}

/// Capture vehicle input from the drive actions.
pub fn vehicle_input_system(
    actions: Single<&ActionState<DriveAction>>,
    mut query: Query<&mut VehicleInput, With<Vehicle>>,
) {
    let axis = actions.clamped_axis_pair(&DriveAction::Drive);
    let brake = actions.pressed(&DriveAction::Brake);

    for mut input in &mut query {
        let next = VehicleInput {
            throttle: axis.y,
            steer: axis.x,
            brake,
        };
        // Avoid triggering change detection every frame.
        input.set_if_neq(next);
    }
}

/// Step the raycast vehicle and apply wheel impulses to the chassis.
///
/// Runs in the fixed schedule before the physics step; gravity and contacts
/// are left to Avian.
#[allow(clippy::type_complexity)]
pub fn vehicle_physics_system(
    time: Res<Time<Fixed>>,
    spatial_query: Res<SpatialQueryPipeline>,
    mut query: Query<(
        Entity,
        &Vehicle,
        &DriveTuning,
        &VehicleInput,
        &mut VehicleWheels,
        &mut VehicleState,
        &Position,
        &Rotation,
        &mut LinearVelocity,
        &mut AngularVelocity,
    )>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (
        entity,
        vehicle,
        tuning,
        input,
        mut wheels,
        mut state,
        position,
        rotation,
        mut linear_velocity,
        mut angular_velocity,
    ) in &mut query
    {
        drive_commands(input, tuning).apply(&mut wheels.0, tuning);

        let mut chassis = ChassisState::at_rest(
            position.0,
            rotation.0,
            vehicle.chassis_mass,
            vehicle.chassis_half_extents,
        );
        chassis.linear_velocity = linear_velocity.0;
        chassis.angular_velocity = angular_velocity.0;

        // Raycast filter excludes self.
        let probe = SpatialProbe {
            pipeline: &spatial_query,
            filter: SpatialQueryFilter::default().with_excluded_entities([entity]),
        };

        state.last_step = wheels.0.step(&mut chassis, &probe, dt);

        linear_velocity.0 = chassis.linear_velocity;
        angular_velocity.0 = chassis.angular_velocity;
    }
}

/// Draw wheels and suspension rays alongside the collider wireframes.
pub fn draw_wheel_gizmos(
    mut gizmos: Gizmos,
    query: Query<(&VehicleWheels, &Position, &Rotation)>,
) {
    for (wheels, position, rotation) in &query {
        let chassis = ChassisState {
            position: position.0,
            rotation: rotation.0,
            ..ChassisState::at_rest(Vec3::ZERO, Quat::IDENTITY, 0.0, Vec3::ZERO)
        };

        for wheel in &wheels.0.wheels {
            let (hub, hub_rotation) = wheel.world_pose(&chassis);
            // Circle gizmos lie in the XY plane; turn the normal onto the axle.
            let isometry = Isometry3d::new(hub, hub_rotation * Quat::from_rotation_y(FRAC_PI_2));
            let color = if wheel.state.sliding { RED } else { YELLOW };
            gizmos.circle(isometry, wheel.params.radius, color);

            let start = position.0 + rotation.0 * wheel.params.connection_point_local;
            let end = start + rotation.0 * wheel.params.direction_local * wheel.params.ray_length();
            gizmos.line(start, end, ORANGE);
        }
    }
}
