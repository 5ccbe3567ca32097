//! Physics integration using Avian 3D.
//!
//! Sets up the physics world (gravity, fixed rate), the static ground slab,
//! and the collider debug overlay that can be toggled at runtime.

use avian3d::debug_render::{PhysicsDebugPlugin, PhysicsGizmos};
use avian3d::prelude::*;
use bevy::gizmos::config::{GizmoConfig, GizmoConfigStore};
use bevy::prelude::*;
use leafwing_input_manager::prelude::ActionState;

use crate::constants::{
    DEBUG_COLLIDER_COLOR, GRAVITY, GROUND_CENTER_Y, GROUND_COLOR, GROUND_FRICTION,
    GROUND_HALF_EXTENTS, GROUND_VISUAL_SIZE, PHYSICS_HZ,
};
use crate::input::DebugAction;
use crate::launch_params::LaunchParams;

/// Plugin for the physics world.
pub struct PhysicsIntegrationPlugin;

impl Plugin for PhysicsIntegrationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(PhysicsPlugins::default())
            // Add debug rendering plugin (visibility comes from launch params).
            .add_plugins(PhysicsDebugPlugin)
            .insert_resource(Gravity(Vec3::NEG_Y * GRAVITY))
            .insert_resource(Time::<Fixed>::from_hz(PHYSICS_HZ))
            .add_systems(Startup, (configure_physics_debug_on_startup, create_ground))
            .add_systems(Update, toggle_physics_debug_on_key);
    }
}

/// Marker for the static ground slab.
#[derive(Component)]
pub struct Ground;

/// Configure physics debug rendering on startup.
fn configure_physics_debug_on_startup(
    mut config_store: ResMut<GizmoConfigStore>,
    params: Res<LaunchParams>,
) {
    let [r, g, b] = DEBUG_COLLIDER_COLOR;
    let physics_gizmos = PhysicsGizmos {
        collider_color: Some(Color::srgb_u8(r, g, b)),
        ..Default::default()
    };

    // Use negative depth_bias to render gizmos on top of geometry.
    let gizmo_config = GizmoConfig {
        enabled: params.physics_debug,
        depth_bias: -1.0,
        ..Default::default()
    };

    // insert takes (GizmoConfig, T: GizmoConfigGroup).
    config_store.insert(gizmo_config, physics_gizmos);
}

/// Toggle physics debug visualization.
pub fn toggle_physics_debug(config_store: &mut GizmoConfigStore) {
    let (config, _) = config_store.config_mut::<PhysicsGizmos>();
    config.enabled = !config.enabled;
    tracing::info!("Physics debug visualization: {}", config.enabled);
}

/// Check if physics debug is currently enabled.
pub fn is_physics_debug_enabled(config_store: &GizmoConfigStore) -> bool {
    let (config, _) = config_store.config::<PhysicsGizmos>();
    config.enabled
}

/// Run condition: physics debug rendering is on.
pub fn physics_debug_enabled(config_store: Res<GizmoConfigStore>) -> bool {
    is_physics_debug_enabled(&config_store)
}

fn toggle_physics_debug_on_key(
    actions: Single<&ActionState<DebugAction>>,
    mut config_store: ResMut<GizmoConfigStore>,
) {
    if actions.just_pressed(&DebugAction::TogglePhysicsDebug) {
        toggle_physics_debug(&mut config_store);
    }
}

/// Spawn the static ground slab and the plane drawn on top of it.
pub fn create_ground(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let [hx, hy, hz] = GROUND_HALF_EXTENTS;
    let [r, g, b] = GROUND_COLOR;

    commands
        .spawn((
            Name::new("Ground"),
            Ground,
            RigidBody::Static,
            Collider::cuboid(hx * 2.0, hy * 2.0, hz * 2.0),
            Friction::new(GROUND_FRICTION),
            Restitution::new(0.0),
            Transform::from_xyz(0.0, GROUND_CENTER_Y, 0.0),
            Visibility::default(),
        ))
        .with_child((
            Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(GROUND_VISUAL_SIZE / 2.0)))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::srgb_u8(r, g, b),
                perceptual_roughness: 0.9,
                ..default()
            })),
            // The plane sits on the slab's top face.
            Transform::from_xyz(0.0, hy, 0.0),
        ));

    tracing::info!("Created ground slab {}x{} m", hx * 2.0, hz * 2.0);
}

/// Half extents of a box fitted to a bounding box of the given size.
///
/// The height is divided by `height_divisor` instead of 2, which lets a car
/// body sit lower than its model's full height.
pub fn box_half_extents_from_bounds(size: Vec3, height_divisor: f32) -> Vec3 {
    Vec3::new(size.x / 2.0, size.y / height_divisor, size.z / 2.0)
}
