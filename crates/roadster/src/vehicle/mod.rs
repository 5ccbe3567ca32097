//! Raycast vehicle system.
//!
//! A single car: a dynamic chassis box carrying four raycast wheels and a glTF
//! model as its visual. The car respawns at the spawn point when it falls
//! below the respawn height or when the reset action fires.

mod components;
pub mod core;
mod physics;

use avian3d::prelude::*;
use bevy::prelude::*;
use leafwing_input_manager::prelude::ActionState;

pub use components::{
    CarModel, DriveTuning, PendingChassisFit, Vehicle, VehicleInput, VehicleModel, VehicleState,
    VehicleWheels, four_wheel_layout,
};

use crate::camera::FollowedEntity;
use crate::input::DriveAction;
use crate::launch_params::LaunchParams;
use crate::model::load_model;
use crate::physics::physics_debug_enabled;

/// Spin given to a freshly spawned chassis (rad/s).
const INITIAL_ANGULAR_VELOCITY: Vec3 = Vec3::new(0.0, 0.5, 0.0);

/// Plugin for vehicle functionality.
pub struct VehiclePlugin;

impl Plugin for VehiclePlugin {
    fn build(&self, app: &mut App) {
        // Register reflectable types for inspection.
        app.register_type::<Vehicle>()
            .register_type::<DriveTuning>()
            .register_type::<VehicleModel>()
            .init_resource::<RespawnCounter>()
            .add_systems(Startup, spawn_initial_vehicle)
            .add_systems(FixedPreUpdate, physics::vehicle_physics_system)
            .add_systems(
                Update,
                (
                    physics::vehicle_input_system,
                    respawn_vehicles,
                    physics::draw_wheel_gizmos.run_if(physics_debug_enabled),
                ),
            );
    }
}

/// Number of times the car has been respawned.
#[derive(Resource, Default, Debug)]
pub struct RespawnCounter {
    pub count: u32,
}

/// Spawn a car at the spawn point and start loading its model.
pub fn spawn_vehicle(
    commands: &mut Commands,
    asset_server: &AssetServer,
    params: &LaunchParams,
) -> Entity {
    let vehicle = Vehicle::default();
    let model = VehicleModel {
        path: params.model.clone(),
        ..VehicleModel::default()
    };
    let half_extents = vehicle.chassis_half_extents;

    let vehicle_entity = commands
        .spawn((
            Name::new(vehicle.name.clone()),
            RigidBody::Dynamic,
            Collider::cuboid(
                half_extents.x * 2.0,
                half_extents.y * 2.0,
                half_extents.z * 2.0,
            ),
            ColliderDensity(vehicle.chassis_density()),
            SleepingDisabled,
            Transform::from_translation(spawn_position(params)),
            LinearVelocity::default(),
            AngularVelocity(INITIAL_ANGULAR_VELOCITY),
            VehicleWheels::four_wheel(),
            DriveTuning::default(),
            PendingChassisFit,
            // Mark as followable for the camera system.
            FollowedEntity,
            vehicle,
            model.clone(),
        ))
        .id();

    // Load the glTF model as a child.
    let load = load_model(asset_server, &model.path);
    let model_entity = commands
        .spawn((
            Name::new("Car model"),
            CarModel,
            SceneRoot(load.scene.clone()),
            load,
            model.transform(),
        ))
        .id();
    commands.entity(vehicle_entity).add_child(model_entity);

    tracing::info!(
        "Spawned vehicle at {} with model {}",
        spawn_position(params),
        model.path
    );
    vehicle_entity
}

fn spawn_position(params: &LaunchParams) -> Vec3 {
    Vec3::new(0.0, params.spawn_height, 0.0)
}

fn spawn_initial_vehicle(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    params: Res<LaunchParams>,
) {
    spawn_vehicle(&mut commands, &asset_server, &params);
}

/// Whether a car at height `y` should be put back at the spawn point.
pub fn should_respawn(y: f32, respawn_height: f32, reset_pressed: bool) -> bool {
    reset_pressed || y < respawn_height
}

/// Replace fallen (or reset) cars with a fresh one at the spawn point.
fn respawn_vehicles(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    params: Res<LaunchParams>,
    mut counter: ResMut<RespawnCounter>,
    actions: Single<&ActionState<DriveAction>>,
    query: Query<(Entity, &Position), With<Vehicle>>,
) {
    let reset_pressed = actions.just_pressed(&DriveAction::Reset);

    for (entity, position) in &query {
        if !should_respawn(position.y, params.respawn_height, reset_pressed) {
            continue;
        }

        // Despawns the model child along with the chassis.
        commands.entity(entity).despawn();
        counter.count += 1;
        tracing::info!(
            "Respawning vehicle (#{}) from {}",
            counter.count,
            position.0
        );
        spawn_vehicle(&mut commands, &asset_server, &params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_respawn_below_threshold() {
        assert!(!should_respawn(0.6, -10.0, false));
        assert!(!should_respawn(-10.0, -10.0, false));
        assert!(should_respawn(-10.01, -10.0, false));
        assert!(should_respawn(-500.0, -10.0, false));
    }

    #[test]
    fn test_reset_always_respawns() {
        assert!(should_respawn(4.0, -10.0, true));
    }

    #[test]
    fn test_spawn_position_uses_spawn_height() {
        let params = LaunchParams {
            spawn_height: 7.5,
            ..LaunchParams::default()
        };
        assert_eq!(spawn_position(&params), Vec3::new(0.0, 7.5, 0.0));
    }

    #[test]
    fn test_chassis_density_gives_mass() {
        let vehicle = Vehicle::default();
        let he = vehicle.chassis_half_extents;
        let mass = vehicle.chassis_density() * 8.0 * he.x * he.y * he.z;
        assert!((mass - 700.0).abs() < 1e-3);
    }
}
