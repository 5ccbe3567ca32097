//! Car model loading and chassis fitting.
//!
//! The car's glTF scene is loaded as a child of the chassis. Once it is in
//! the world its meshes are set to cast but not receive shadows, and the
//! chassis collider is refitted to the model's bounds. If the model fails to
//! load, a plain box stands in for it.

use avian3d::prelude::*;
use bevy::asset::LoadState;
use bevy::camera::primitives::Aabb;
use bevy::gltf::Gltf;
use bevy::light::NotShadowReceiver;
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;

use crate::error::Error;
use crate::physics::box_half_extents_from_bounds;
use crate::vehicle::{CarModel, PendingChassisFit, Vehicle};

/// Height divisor for the car's chassis box.
pub const CAR_HEIGHT_DIVISOR: f32 = 2.6;

/// Colour of the stand-in body used when the model is missing.
const FALLBACK_BODY_COLOR: Color = Color::srgb(0.75, 0.12, 0.1);

/// Plugin for model loading.
pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (track_model_loads, fit_chassis_to_model))
            .add_observer(on_model_scene_ready);
    }
}

/// Coarse load progress, used to log transitions once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadProgress {
    #[default]
    NotLoaded,
    Loading,
    Loaded,
    Failed,
}

impl From<&LoadState> for LoadProgress {
    fn from(state: &LoadState) -> Self {
        match state {
            LoadState::NotLoaded => Self::NotLoaded,
            LoadState::Loading => Self::Loading,
            LoadState::Loaded => Self::Loaded,
            LoadState::Failed(_) => Self::Failed,
        }
    }
}

impl LoadProgress {
    /// Progress of a model made of a file and a labelled scene inside it.
    ///
    /// Either part failing fails the model; it is loaded once both are.
    pub fn combine(file: Self, scene: Self) -> Self {
        match (file, scene) {
            (Self::Failed, _) | (_, Self::Failed) => Self::Failed,
            (Self::Loaded, Self::Loaded) => Self::Loaded,
            (Self::NotLoaded, Self::NotLoaded) => Self::NotLoaded,
            _ => Self::Loading,
        }
    }
}

/// An in-flight model load.
#[derive(Component)]
pub struct ModelLoad {
    /// Asset path of the glTF file.
    pub path: String,
    /// The whole glTF file.
    pub gltf: Handle<Gltf>,
    /// Scene 0 of the file. Fails on its own when the file has no scene.
    pub scene: Handle<Scene>,
    progress: LoadProgress,
}

impl ModelLoad {
    /// Record new progress, returning it if it changed.
    pub fn advance(&mut self, progress: LoadProgress) -> Option<LoadProgress> {
        (progress != self.progress).then(|| {
            self.progress = progress;
            progress
        })
    }

    pub fn progress(&self) -> LoadProgress {
        self.progress
    }
}

/// Start loading scene 0 of a glTF asset.
pub fn load_model(asset_server: &AssetServer, path: &str) -> ModelLoad {
    ModelLoad {
        path: path.to_string(),
        gltf: asset_server.load(path.to_string()),
        scene: asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.to_string())),
        progress: LoadProgress::NotLoaded,
    }
}

/// Log load progress and swap in a box body when a model fails to load.
fn track_model_loads(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut loads: Query<(Entity, &mut ModelLoad, Option<&ChildOf>)>,
    vehicles: Query<&Vehicle>,
) {
    for (entity, mut load, child_of) in &mut loads {
        let file_state = asset_server.load_state(&load.gltf);
        let scene_state = asset_server.load_state(&load.scene);
        let progress = LoadProgress::combine((&file_state).into(), (&scene_state).into());
        let Some(progress) = load.advance(progress) else {
            continue;
        };

        match progress {
            LoadProgress::NotLoaded => {}
            LoadProgress::Loading => tracing::info!("Loading model {}", load.path),
            LoadProgress::Loaded => {
                tracing::info!("Loaded model {}", load.path);
                commands.entity(entity).remove::<ModelLoad>();
            }
            LoadProgress::Failed => {
                let message = [&file_state, &scene_state]
                    .into_iter()
                    .find_map(|state| match state {
                        LoadState::Failed(err) => Some(err.to_string()),
                        _ => None,
                    })
                    .unwrap_or_default();
                let error = Error::ModelLoad {
                    path: load.path.clone(),
                    message,
                };
                tracing::error!("{error}; using a plain box body");

                let parent = child_of.map(ChildOf::parent);
                let half_extents = parent
                    .and_then(|parent| vehicles.get(parent).ok())
                    .map_or_else(
                        || Vehicle::default().chassis_half_extents,
                        |vehicle| vehicle.chassis_half_extents,
                    );

                commands
                    .entity(entity)
                    .remove::<(SceneRoot, ModelLoad)>()
                    .insert((
                        Transform::IDENTITY,
                        Mesh3d(meshes.add(Cuboid::from_size(half_extents * 2.0))),
                        MeshMaterial3d(materials.add(FALLBACK_BODY_COLOR)),
                        NotShadowReceiver,
                    ));
                // The fallback collider already matches the box.
                if let Some(parent) = parent {
                    commands.entity(parent).remove::<PendingChassisFit>();
                }
            }
        }
    }
}

/// Marker for a car model whose scene has been spawned.
#[derive(Component)]
pub struct ModelReady;

/// Observer called when a car model scene finishes spawning.
fn on_model_scene_ready(
    trigger: On<SceneInstanceReady>,
    mut commands: Commands,
    models: Query<(), With<CarModel>>,
    children: Query<&Children>,
    meshes: Query<(), With<Mesh3d>>,
) {
    let entity = trigger.event_target();
    if !models.contains(entity) {
        return;
    }

    // Meshes cast shadows by default; the car body must not receive them.
    let mut count = 0;
    for descendant in children.iter_descendants(entity) {
        if meshes.contains(descendant) {
            commands.entity(descendant).insert(NotShadowReceiver);
            count += 1;
        }
    }
    commands.entity(entity).insert(ModelReady);

    tracing::info!("Car model scene ready ({count} meshes)");
}

/// Replace the fallback chassis collider with a box fitted to the model.
///
/// Waits until every mesh in the model has its bounds computed.
fn fit_chassis_to_model(
    mut commands: Commands,
    mut vehicles: Query<(Entity, &mut Vehicle, &GlobalTransform), With<PendingChassisFit>>,
    models: Query<(), (With<CarModel>, With<ModelReady>)>,
    children: Query<&Children>,
    meshes: Query<(Option<&Aabb>, &GlobalTransform), With<Mesh3d>>,
) {
    for (entity, mut vehicle, chassis_transform) in &mut vehicles {
        let Some(model) = children
            .iter_descendants(entity)
            .find(|child| models.contains(*child))
        else {
            continue;
        };

        // Express mesh bounds in the chassis frame.
        let to_chassis = chassis_transform.affine().inverse();
        let mut corners = Vec::new();
        let mut bounds_pending = false;
        for descendant in children.iter_descendants(model) {
            let Ok((aabb, mesh_transform)) = meshes.get(descendant) else {
                continue;
            };
            let Some(aabb) = aabb else {
                bounds_pending = true;
                break;
            };
            corners.extend(
                aabb_corners(aabb).map(|corner| {
                    to_chassis.transform_point3(mesh_transform.transform_point(corner))
                }),
            );
        }
        if bounds_pending {
            continue;
        }

        commands.entity(entity).remove::<PendingChassisFit>();
        let Some(half_extents) = fit_chassis_half_extents(corners, CAR_HEIGHT_DIVISOR) else {
            tracing::warn!("Car model has no usable bounds; keeping the default chassis box");
            continue;
        };

        vehicle.chassis_half_extents = half_extents;
        commands.entity(entity).insert((
            Collider::cuboid(
                half_extents.x * 2.0,
                half_extents.y * 2.0,
                half_extents.z * 2.0,
            ),
            ColliderDensity(vehicle.chassis_density()),
        ));
        tracing::info!("Fitted chassis collider to model: half extents {half_extents}");
    }
}

fn aabb_corners(aabb: &Aabb) -> [Vec3; 8] {
    let center = Vec3::from(aabb.center);
    let half = Vec3::from(aabb.half_extents);
    [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
    ]
    .map(|sign| center + half * sign)
}

/// Size of the axis-aligned box enclosing `points`.
///
/// Returns `None` for no points or a box that is flat along any axis.
pub fn bounds_size(points: impl IntoIterator<Item = Vec3>) -> Option<Vec3> {
    let (min, max) = points.into_iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), p| (min.min(p), max.max(p)),
    );
    let size = max - min;
    (size.is_finite() && size.min_element() > 0.0).then_some(size)
}

/// Chassis half extents for a model whose bounding box corners (in the
/// chassis frame) are `corners`.
pub fn fit_chassis_half_extents(
    corners: impl IntoIterator<Item = Vec3>,
    height_divisor: f32,
) -> Option<Vec3> {
    bounds_size(corners).map(|size| box_half_extents_from_bounds(size, height_divisor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_size() {
        let size = bounds_size([
            Vec3::new(-1.0, 0.0, 2.0),
            Vec3::new(1.5, 0.5, -2.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        assert_eq!(size, Some(Vec3::new(2.5, 1.0, 4.0)));
    }

    #[test]
    fn test_bounds_size_rejects_empty_and_flat() {
        assert_eq!(bounds_size(Vec::new()), None);
        assert_eq!(bounds_size([Vec3::ONE]), None);
        assert_eq!(bounds_size([Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)]), None);
    }

    #[test]
    fn test_fit_chassis_half_extents() {
        let aabb = Aabb::from_min_max(Vec3::new(-0.9, -0.2, -2.2), Vec3::new(0.9, 1.1, 2.2));
        let half = fit_chassis_half_extents(aabb_corners(&aabb), CAR_HEIGHT_DIVISOR).unwrap();
        assert!((half - Vec3::new(0.9, 0.5, 2.2)).length() < 1e-5);
    }

    #[test]
    fn test_fit_follows_rotated_model() {
        // A model lying along X, turned a quarter so it lies along Z.
        let aabb = Aabb::from_min_max(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 1.3, 1.0));
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let corners = aabb_corners(&aabb).map(|c| rotation * c);
        let half = fit_chassis_half_extents(corners, CAR_HEIGHT_DIVISOR).unwrap();
        assert!((half - Vec3::new(1.0, 0.5, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_load_progress_logs_changes_once() {
        let mut load = ModelLoad {
            path: "car.glb".to_string(),
            gltf: Handle::default(),
            scene: Handle::default(),
            progress: LoadProgress::NotLoaded,
        };
        assert_eq!(load.advance(LoadProgress::from(&LoadState::NotLoaded)), None);
        assert_eq!(
            load.advance(LoadProgress::from(&LoadState::Loading)),
            Some(LoadProgress::Loading)
        );
        assert_eq!(load.advance(LoadProgress::Loading), None);
        assert_eq!(load.advance(LoadProgress::Loaded), Some(LoadProgress::Loaded));
        assert_eq!(load.progress(), LoadProgress::Loaded);
    }

    #[test]
    fn test_missing_scene_fails_a_loaded_file() {
        use LoadProgress::{Failed, Loaded, Loading, NotLoaded};

        assert_eq!(LoadProgress::combine(Loaded, Failed), Failed);
        assert_eq!(LoadProgress::combine(Failed, Loading), Failed);
        assert_eq!(LoadProgress::combine(Loaded, Loading), Loading);
        assert_eq!(LoadProgress::combine(Loading, NotLoaded), Loading);
        assert_eq!(LoadProgress::combine(NotLoaded, NotLoaded), NotLoaded);
        assert_eq!(LoadProgress::combine(Loaded, Loaded), Loaded);

        // A file without scene 0 loads, then its scene label fails: the
        // model goes straight from loading to failed.
        let mut load = ModelLoad {
            path: "no_scene.glb".to_string(),
            gltf: Handle::default(),
            scene: Handle::default(),
            progress: LoadProgress::Loading,
        };
        assert_eq!(load.advance(LoadProgress::combine(Loaded, Failed)), Some(Failed));
    }
}
