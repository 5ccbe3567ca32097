//! 3D driving demo with raycast vehicle physics using Bevy.
//!
//! A car loaded from a glTF model drives over a ground slab (and optional
//! hills) under Avian physics. The wheel model lives in [`vehicle::core`] and
//! has no Bevy dependencies.

pub mod camera;
pub mod constants;
mod error;
pub mod input;
pub mod launch_params;
pub mod model;
pub mod physics;
pub mod scene;
pub mod terrain;
pub mod ui;
pub mod vehicle;

use bevy::prelude::*;

pub use error::{Error, Result};
pub use launch_params::LaunchParams;

/// Plugin for the main application.
///
/// Expects [`LaunchParams`] to be inserted before startup.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            physics::PhysicsIntegrationPlugin,
            input::InputPlugin,
            scene::ScenePlugin,
            terrain::TerrainPlugin,
            camera::CameraPlugin,
            model::ModelPlugin,
            vehicle::VehiclePlugin,
            ui::HudPlugin,
        ));
    }
}
