//! Sky, sun and shadows.

use bevy::color::palettes::css::GOLD;
use bevy::light::light_consts::lux;
use bevy::light::{CascadeShadowConfigBuilder, DirectionalLightShadowMap};
use bevy::prelude::*;

use crate::constants::SKY_COLOR;
use crate::physics::physics_debug_enabled;

/// Sun position; it shines towards the origin.
const SUN_POSITION: Vec3 = Vec3::new(100.0, 100.0, 50.0);

/// Shadow map resolution (texels per side).
const SHADOW_MAP_SIZE: usize = 4096;

/// Distance from the camera covered by shadow cascades (m).
const SHADOW_RANGE: f32 = 200.0;

/// Half width and height of the sun's shadow volume (m).
const SHADOW_VOLUME_HALF_SIZE: f32 = 80.0;

/// Near plane of the sun's shadow volume (m).
const SHADOW_VOLUME_NEAR: f32 = 0.5;

/// Plugin for scene lighting.
pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        let [r, g, b] = SKY_COLOR;
        app.insert_resource(ClearColor(Color::srgb_u8(r, g, b)))
            .insert_resource(DirectionalLightShadowMap {
                size: SHADOW_MAP_SIZE,
            })
            .add_systems(Startup, spawn_sun)
            .add_systems(Update, draw_shadow_volume.run_if(physics_debug_enabled));
    }
}

/// Marker for the sun light.
#[derive(Component)]
pub struct Sun;

fn spawn_sun(mut commands: Commands) {
    commands.spawn((
        Name::new("Sun"),
        Sun,
        DirectionalLight {
            color: Color::WHITE,
            illuminance: lux::AMBIENT_DAYLIGHT,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(SUN_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
        CascadeShadowConfigBuilder {
            maximum_distance: SHADOW_RANGE,
            ..default()
        }
        .build(),
    ));

    tracing::info!("Scene setup complete - WASD/arrows to drive, B to brake, R to reset");
}

/// Box covering the sun's shadow volume, as a transform of the unit cube.
pub fn shadow_volume_transform(
    light: &Transform,
    half_size: f32,
    near: f32,
    far: f32,
) -> Transform {
    let forward = light.forward();
    Transform {
        translation: light.translation + forward * ((near + far) / 2.0),
        rotation: light.rotation,
        scale: Vec3::new(half_size * 2.0, half_size * 2.0, far - near),
    }
}

/// Outline the sun's shadow volume.
fn draw_shadow_volume(mut gizmos: Gizmos, suns: Query<&Transform, With<Sun>>) {
    for transform in &suns {
        let volume = shadow_volume_transform(
            transform,
            SHADOW_VOLUME_HALF_SIZE,
            SHADOW_VOLUME_NEAR,
            SHADOW_RANGE,
        );
        gizmos.cube(volume, GOLD);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_volume_reaches_past_origin() {
        let light = Transform::from_translation(SUN_POSITION).looking_at(Vec3::ZERO, Vec3::Y);
        let volume = shadow_volume_transform(&light, 80.0, 0.5, 200.0);

        assert_eq!(volume.scale, Vec3::new(160.0, 160.0, 199.5));
        // The sun is 150 m from the origin, so the volume's centre lies
        // between the two along the light direction.
        let to_origin = -SUN_POSITION.normalize();
        let along = (volume.translation - SUN_POSITION).dot(to_origin);
        assert!((along - 100.25).abs() < 1e-3);
        assert!((volume.translation - SUN_POSITION).cross(to_origin).length() < 1e-3);
    }
}
