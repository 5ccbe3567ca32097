//! Vehicle component definitions.
//!
//! Tuning components use `Reflect` so they show up in the type registry.
//! Runtime state (`VehicleWheels`, `VehicleInput`, `VehicleState`) is not
//! reflected.

use std::f32::consts::PI;

use bevy::prelude::*;

use super::core::{RaycastVehicle, StepReport, WheelParams};

/// Vehicle marker with chassis metadata.
#[derive(Component, Reflect, Clone)]
#[reflect(Component)]
#[require(VehicleState, VehicleInput)]
pub struct Vehicle {
    /// Display name for the vehicle.
    pub name: String,
    /// Chassis mass in kg.
    pub chassis_mass: f32,
    /// Chassis collider half extents. Replaced once the model has been measured.
    pub chassis_half_extents: Vec3,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            name: "Classic muscle car".to_string(),
            chassis_mass: 700.0,
            chassis_half_extents: Vec3::new(1.0, 0.5, 2.0),
        }
    }
}

impl Vehicle {
    /// Collider density that yields `chassis_mass` for the current box.
    pub fn chassis_density(&self) -> f32 {
        let he = self.chassis_half_extents;
        let volume = 8.0 * he.x * he.y * he.z;
        if volume > 0.0 {
            self.chassis_mass / volume
        } else {
            1.0
        }
    }
}

/// Which wheels respond to which controls, and how strongly.
#[derive(Component, Reflect, Clone)]
#[reflect(Component)]
pub struct DriveTuning {
    /// Steering angle at full lock (rad).
    pub max_steer: f32,
    /// Engine force at full throttle (N).
    pub max_engine_force: f32,
    /// Brake force while braking (N).
    pub brake_force: f32,
    /// Indices of steered wheels.
    pub steered_wheels: Vec<usize>,
    /// Indices of driven wheels.
    pub driven_wheels: Vec<usize>,
    /// Indices of braked wheels.
    pub braked_wheels: Vec<usize>,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            max_steer: 0.5,
            max_engine_force: 1000.0,
            brake_force: 1_000_000.0,
            steered_wheels: vec![0, 1],
            driven_wheels: vec![2, 3],
            braked_wheels: vec![0, 1, 2, 3],
        }
    }
}

/// Model asset configuration.
#[derive(Component, Reflect, Clone)]
#[reflect(Component)]
pub struct VehicleModel {
    /// Path to the glTF model asset.
    pub path: String,
    /// Uniform scale applied to the model.
    pub scale: f32,
    /// Model offset from the chassis origin.
    pub offset: Vec3,
    /// Yaw turning the model's nose towards the chassis -Z axis (rad).
    pub yaw: f32,
}

impl Default for VehicleModel {
    fn default() -> Self {
        Self {
            path: String::new(),
            scale: 0.3,
            offset: Vec3::new(0.0, -0.2, 0.0),
            yaw: PI,
        }
    }
}

impl VehicleModel {
    /// Local transform of the model relative to the chassis.
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.offset)
            .with_rotation(Quat::from_rotation_y(self.yaw))
            .with_scale(Vec3::splat(self.scale))
    }
}

/// Wheels and suspension of a vehicle.
#[derive(Component, Default)]
pub struct VehicleWheels(pub RaycastVehicle);

impl VehicleWheels {
    /// The demo car: front wheels steer, rear wheels drive.
    pub fn four_wheel() -> Self {
        Self(RaycastVehicle::new(four_wheel_layout()))
    }
}

/// Wheel layout of the demo car (front-left, front-right, rear-left, rear-right).
pub fn four_wheel_layout() -> [WheelParams; 4] {
    [
        WheelParams::at(Vec3::new(-1.0, 0.0, -1.0)),
        WheelParams::at(Vec3::new(1.0, 0.0, -1.0)),
        WheelParams::at(Vec3::new(-1.0, 0.0, 1.0)),
        WheelParams::at(Vec3::new(1.0, 0.0, 1.0)),
    ]
}

/// Input state for vehicle (not serialized).
#[derive(Component, Default, Clone, Copy, Debug, PartialEq)]
pub struct VehicleInput {
    /// Throttle input (-1 to 1, positive = forward).
    pub throttle: f32,
    /// Steer input (-1 to 1, positive = right).
    pub steer: f32,
    /// Whether the brake is held.
    pub brake: bool,
}

/// Runtime state for vehicle diagnostics.
#[derive(Component, Default)]
pub struct VehicleState {
    /// Result of the latest physics step.
    pub last_step: StepReport,
}

/// Marker for the model child of a vehicle.
#[derive(Component)]
pub struct CarModel;

/// Marker for a chassis whose collider still has the fallback size.
#[derive(Component)]
pub struct PendingChassisFit;
