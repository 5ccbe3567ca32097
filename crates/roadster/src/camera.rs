//! Chase camera.
//!
//! The camera sits at a fixed world-space offset from the followed car and
//! looks at it, so its orientation does not turn with the car.

use bevy::prelude::*;

/// Vertical field of view (degrees).
const FOV_DEGREES: f32 = 75.0;

/// Camera position before the car is spawned.
const START_POSITION: Vec3 = Vec3::new(0.0, 5.0, 5.0);

/// Ambient light brightness (cd/m^2).
const AMBIENT_BRIGHTNESS: f32 = 400.0;

/// Plugin for the camera.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<FollowCameraConfig>()
            .add_systems(Startup, spawn_camera)
            .add_systems(Update, follow_camera_system);
    }
}

/// Marker for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Marker component for entities that can be followed by the camera.
#[derive(Component)]
pub struct FollowedEntity;

/// Configuration for the follow camera.
#[derive(Component, Reflect, Clone)]
#[reflect(Component)]
pub struct FollowCameraConfig {
    /// Camera offset from the target in world space.
    pub offset: Vec3,
    /// Time constant of the position smoothing (s). Zero snaps to the target.
    pub smoothing: f32,
}

impl Default for FollowCameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 7.0, 7.0),
            smoothing: 0.0,
        }
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Name::new("Main camera"),
        MainCamera,
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: FOV_DEGREES.to_radians(),
            near: 0.1,
            far: 1000.0,
            ..Default::default()
        }),
        Transform::from_translation(START_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
        AmbientLight {
            color: Color::WHITE,
            brightness: AMBIENT_BRIGHTNESS,
            ..default()
        },
        FollowCameraConfig::default(),
    ));
}

/// Camera position for this frame.
///
/// With `smoothing > 0` the camera closes the gap to `target + offset`
/// exponentially, independent of frame rate.
pub fn follow_position(current: Vec3, target: Vec3, offset: Vec3, smoothing: f32, dt: f32) -> Vec3 {
    let desired = target + offset;
    if smoothing <= 0.0 {
        return desired;
    }
    let t = 1.0 - (-dt / smoothing).exp();
    current.lerp(desired, t)
}

/// Keep the camera at its offset from the followed entity, looking at it.
fn follow_camera_system(
    time: Res<Time>,
    mut camera_query: Query<(&mut Transform, &FollowCameraConfig), With<MainCamera>>,
    target_query: Query<&Transform, (With<FollowedEntity>, Without<MainCamera>)>,
) {
    let Some(target) = target_query.iter().next() else {
        return;
    };
    let dt = time.delta_secs();

    for (mut camera_transform, config) in &mut camera_query {
        camera_transform.translation = follow_position(
            camera_transform.translation,
            target.translation,
            config.offset,
            config.smoothing,
            dt,
        );
        camera_transform.look_at(target.translation, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_without_smoothing() {
        let pos = follow_position(
            Vec3::new(100.0, 0.0, 0.0),
            Vec3::new(1.0, 0.5, -3.0),
            Vec3::new(0.0, 7.0, 7.0),
            0.0,
            1.0 / 60.0,
        );
        assert_eq!(pos, Vec3::new(1.0, 7.5, 4.0));
    }

    #[test]
    fn test_smoothing_moves_part_way() {
        let offset = Vec3::new(0.0, 7.0, 7.0);
        let pos = follow_position(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), offset, 0.5, 0.1);
        let desired = Vec3::new(10.0, 7.0, 7.0);
        assert!(pos.distance(desired) < desired.length());
        assert!(pos.distance(desired) > 0.0);
    }

    #[test]
    fn test_smoothing_converges() {
        let offset = Vec3::new(0.0, 7.0, 7.0);
        let target = Vec3::new(3.0, 1.0, -2.0);
        let mut pos = Vec3::ZERO;
        for _ in 0..600 {
            pos = follow_position(pos, target, offset, 0.25, 1.0 / 60.0);
        }
        assert!(pos.distance(target + offset) < 1e-3);
    }

    #[test]
    fn test_default_offset() {
        let config = FollowCameraConfig::default();
        assert_eq!(config.offset, Vec3::new(0.0, 7.0, 7.0));
        assert_eq!(config.smoothing, 0.0);
    }
}
