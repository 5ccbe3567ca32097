//! Procedural hill terrain.
//!
//! Builds a heightfield collider and a matching render mesh from a grid of
//! heights. The grid is sampled from a product of cosines with a raised rim.

use avian3d::prelude::*;
use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;

use crate::constants::{GROUND_CENTER_Y, GROUND_COLOR, GROUND_FRICTION, GROUND_VISUAL_SIZE};
use crate::launch_params::LaunchParams;

/// Samples per side of the hill grid.
pub const HILL_GRID_SIZE: usize = 64;

/// Height of the rim cells (m).
const RIM_HEIGHT: f32 = 3.0;

/// Number of half waves across the grid.
const WAVE_FREQUENCY: f32 = 5.0;

/// Hill amplitude (m).
const WAVE_AMPLITUDE: f32 = 2.0;

/// Hill base height (m).
const WAVE_OFFSET: f32 = 2.0;

/// Ground shape selected at launch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
#[cfg_attr(not(target_family = "wasm"), derive(clap::ValueEnum))]
pub enum TerrainKind {
    /// Only the flat ground slab.
    #[default]
    Flat,
    /// Rolling hills on top of the ground slab.
    Hills,
}

/// Marker for the hill terrain entity.
#[derive(Component)]
pub struct HillTerrain;

/// Plugin that spawns the terrain selected in [`LaunchParams`].
pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<TerrainKind>()
            .add_systems(Startup, spawn_terrain);
    }
}

/// Heights of the hill grid, indexed `[x][z]`.
///
/// Rim cells sit at a fixed height so the car cannot roll off the edge.
pub fn hill_heights(size_x: usize, size_z: usize) -> Vec<Vec<f32>> {
    (0..size_x)
        .map(|i| {
            (0..size_z)
                .map(|j| {
                    if i == 0 || i + 1 == size_x || j == 0 || j + 1 == size_z {
                        return RIM_HEIGHT;
                    }
                    let u = i as f32 / size_x as f32 * std::f32::consts::PI * WAVE_FREQUENCY;
                    let v = j as f32 / size_z as f32 * std::f32::consts::PI * WAVE_FREQUENCY;
                    u.cos() * v.cos() * WAVE_AMPLITUDE + WAVE_OFFSET
                })
                .collect()
        })
        .collect()
}

/// Distance between neighbouring samples of a grid spanning the ground.
pub fn element_size(samples: usize) -> f32 {
    GROUND_VISUAL_SIZE / samples.max(1) as f32
}

/// Vertex data for a heightfield centred on the origin.
#[derive(Debug, Default)]
pub struct HeightfieldGeometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

/// Triangulate a `[x][z]` height grid with smooth normals.
pub fn heightfield_geometry(heights: &[Vec<f32>], element_size: f32) -> HeightfieldGeometry {
    let nx = heights.len();
    let nz = heights.first().map_or(0, Vec::len);
    if nx < 2 || nz < 2 || heights.iter().any(|row| row.len() != nz) {
        return HeightfieldGeometry::default();
    }

    let half_x = (nx - 1) as f32 * element_size / 2.0;
    let half_z = (nz - 1) as f32 * element_size / 2.0;
    let height = |i: usize, j: usize| heights[i.min(nx - 1)][j.min(nz - 1)];

    let mut geometry = HeightfieldGeometry::default();
    for i in 0..nx {
        for j in 0..nz {
            let x = i as f32 * element_size - half_x;
            let z = j as f32 * element_size - half_z;
            geometry.positions.push([x, heights[i][j], z]);

            // Central differences, one-sided at the edges.
            let (i0, i1) = (i.saturating_sub(1), i + 1);
            let (j0, j1) = (j.saturating_sub(1), j + 1);
            let dx = (height(i1, j) - height(i0, j))
                / ((i1.min(nx - 1) - i0) as f32 * element_size);
            let dz = (height(i, j1) - height(i, j0))
                / ((j1.min(nz - 1) - j0) as f32 * element_size);
            geometry
                .normals
                .push(Vec3::new(-dx, 1.0, -dz).normalize().to_array());

            geometry
                .uvs
                .push([i as f32 / (nx - 1) as f32, j as f32 / (nz - 1) as f32]);
        }
    }

    for i in 0..nx - 1 {
        for j in 0..nz - 1 {
            let a = (i * nz + j) as u32;
            let b = ((i + 1) * nz + j) as u32;
            let c = (i * nz + j + 1) as u32;
            let d = ((i + 1) * nz + j + 1) as u32;
            // Counter-clockwise seen from above.
            geometry.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    geometry
}

/// Build a render mesh from heightfield geometry.
pub fn heightfield_mesh(geometry: HeightfieldGeometry) -> Mesh {
    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, geometry.positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, geometry.normals)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, geometry.uvs)
        .with_inserted_indices(Indices::U32(geometry.indices))
}

/// Heightfield collider matching [`heightfield_geometry`].
pub fn heightfield_collider(heights: Vec<Vec<f32>>, element_size: f32) -> Collider {
    let nx = heights.len().saturating_sub(1) as f32;
    let nz = heights.first().map_or(0, Vec::len).saturating_sub(1) as f32;
    Collider::heightfield(heights, Vec3::new(nx * element_size, 1.0, nz * element_size))
}

fn spawn_terrain(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    params: Res<LaunchParams>,
) {
    if params.terrain != TerrainKind::Hills {
        return;
    }

    let heights = hill_heights(HILL_GRID_SIZE, HILL_GRID_SIZE);
    let element_size = element_size(HILL_GRID_SIZE);
    let mesh = heightfield_mesh(heightfield_geometry(&heights, element_size));
    let [r, g, b] = GROUND_COLOR;

    commands.spawn((
        Name::new("Hills"),
        HillTerrain,
        RigidBody::Static,
        heightfield_collider(heights, element_size),
        Friction::new(GROUND_FRICTION),
        Restitution::new(0.0),
        Mesh3d(meshes.add(mesh)),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb_u8(r, g, b),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, GROUND_CENTER_Y, 0.0),
    ));

    tracing::info!(
        "Spawned {HILL_GRID_SIZE}x{HILL_GRID_SIZE} hill terrain (element size {element_size:.3} m)"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hill_heights_rim() {
        let heights = hill_heights(64, 64);
        assert_eq!(heights.len(), 64);
        assert!(heights.iter().all(|row| row.len() == 64));
        for k in 0..64 {
            assert_eq!(heights[0][k], 3.0);
            assert_eq!(heights[63][k], 3.0);
            assert_eq!(heights[k][0], 3.0);
            assert_eq!(heights[k][63], 3.0);
        }
    }

    #[test]
    fn test_hill_heights_interior() {
        let heights = hill_heights(64, 64);
        let expected = |i: usize, j: usize| {
            let u = (i as f32 / 64.0 * std::f32::consts::PI * 5.0).cos();
            let v = (j as f32 / 64.0 * std::f32::consts::PI * 5.0).cos();
            u * v * 2.0 + 2.0
        };
        for (i, j) in [(1, 1), (10, 20), (32, 32), (62, 5)] {
            assert!((heights[i][j] - expected(i, j)).abs() < 1e-5);
        }
        // Interior heights stay within the wave band.
        for row in &heights[1..63] {
            for &h in &row[1..63] {
                assert!((0.0..=4.0).contains(&h));
            }
        }
    }

    #[test]
    fn test_element_size() {
        assert!((element_size(64) - 1.5625).abs() < 1e-6);
    }

    #[test]
    fn test_geometry_counts_and_centering() {
        let heights = vec![vec![0.0; 3]; 4];
        let geometry = heightfield_geometry(&heights, 2.0);
        assert_eq!(geometry.positions.len(), 12);
        assert_eq!(geometry.normals.len(), 12);
        assert_eq!(geometry.indices.len(), 3 * 2 * 6);
        assert_eq!(geometry.positions[0], [-3.0, 0.0, -2.0]);
        assert_eq!(geometry.positions[11], [3.0, 0.0, 2.0]);
    }

    #[test]
    fn test_flat_geometry_faces_up() {
        let heights = vec![vec![1.0; 3]; 3];
        let geometry = heightfield_geometry(&heights, 1.0);
        for normal in &geometry.normals {
            assert_eq!(*normal, [0.0, 1.0, 0.0]);
        }
        for tri in geometry.indices.chunks(3) {
            let p = |k: u32| Vec3::from_array(geometry.positions[k as usize]);
            let n = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(n.y > 0.0);
        }
    }

    #[test]
    fn test_slope_normals_lean_downhill() {
        // Height rises with x.
        let heights: Vec<Vec<f32>> = (0..3).map(|i| vec![i as f32; 3]).collect();
        let geometry = heightfield_geometry(&heights, 1.0);
        let n = Vec3::from_array(geometry.normals[4]);
        assert!(n.x < 0.0);
        assert!((n - Vec3::new(-1.0, 1.0, 0.0).normalize()).length() < 1e-6);
    }

    #[test]
    fn test_collider_matches_mesh() {
        // A tilted plane rising faster along x than z, so a swapped grid
        // would put every hit at the wrong height.
        let heights: Vec<Vec<f32>> = (0..5)
            .map(|i| (0..5).map(|j| i as f32 * 0.5 + j as f32 * 0.1).collect())
            .collect();
        let element_size = 2.0;
        let geometry = heightfield_geometry(&heights, element_size);
        let collider = heightfield_collider(heights, element_size);

        for (i, j) in [(0, 0), (3, 0), (0, 3), (1, 2), (3, 3)] {
            // A point inside the cell, off both diagonals. The grid is planar,
            // so either triangulation gives the bilinear height.
            let corner = |ci: usize, cj: usize| Vec3::from_array(geometry.positions[ci * 5 + cj]);
            let (u, v) = (0.3_f32, 0.6_f32);
            let sample = corner(i, j) * (1.0 - u) * (1.0 - v)
                + corner(i + 1, j) * u * (1.0 - v)
                + corner(i, j + 1) * (1.0 - u) * v
                + corner(i + 1, j + 1) * u * v;

            let origin = Vec3::new(sample.x, 10.0, sample.z);
            let (distance, _) = collider
                .cast_ray(
                    Position::default(),
                    Rotation::default(),
                    origin,
                    Vec3::NEG_Y,
                    20.0,
                    true,
                )
                .unwrap();
            assert!(
                (origin.y - distance - sample.y).abs() < 1e-4,
                "cell ({i}, {j}): hit at {} but mesh at {}",
                origin.y - distance,
                sample.y
            );
        }
    }

    #[test]
    fn test_ragged_grid_is_rejected() {
        let heights = vec![vec![0.0; 3], vec![0.0; 2]];
        assert!(heightfield_geometry(&heights, 1.0).positions.is_empty());
    }
}
