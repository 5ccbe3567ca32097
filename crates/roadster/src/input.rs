//! Input action definitions and the mapping from held keys to wheel controls.
//!
//! Actions use `leafwing-input-manager` so bindings stay declarative. Both
//! maps live on a single input entity spawned at startup.

use bevy::prelude::*;
use bevy_egui::EguiContexts;
use leafwing_input_manager::{plugin::InputManagerSystem, prelude::*};

use crate::vehicle::core::RaycastVehicle;
use crate::vehicle::{DriveTuning, VehicleInput};

// ============================================================================
// Action enums
// ============================================================================

/// Actions for driving the car.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum DriveAction {
    /// Throttle on Y, steering on X (WASD or arrow keys).
    #[actionlike(DualAxis)]
    Drive,
    /// Brake all wheels (B).
    Brake,
    /// Put the car back at the spawn point (R).
    Reset,
}

/// Actions for debug overlays.
#[derive(Actionlike, PartialEq, Eq, Hash, Clone, Copy, Debug, Reflect)]
pub enum DebugAction {
    /// Toggle collider wireframes (F1).
    TogglePhysicsDebug,
    /// Toggle the HUD window (H).
    ToggleHud,
}

// ============================================================================
// Input maps
// ============================================================================

/// Create the default input map for driving.
pub fn default_drive_input_map() -> InputMap<DriveAction> {
    InputMap::default()
        .with_dual_axis(DriveAction::Drive, VirtualDPad::wasd())
        .with_dual_axis(DriveAction::Drive, VirtualDPad::arrow_keys())
        .with(DriveAction::Brake, KeyCode::KeyB)
        .with(DriveAction::Reset, KeyCode::KeyR)
}

/// Create the default input map for debug toggles.
pub fn default_debug_input_map() -> InputMap<DebugAction> {
    InputMap::default()
        .with(DebugAction::TogglePhysicsDebug, KeyCode::F1)
        .with(DebugAction::ToggleHud, KeyCode::KeyH)
}

// ============================================================================
// Plugin
// ============================================================================

/// Plugin that registers input action types and the input focus management system.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(InputManagerPlugin::<DriveAction>::default())
            .add_plugins(InputManagerPlugin::<DebugAction>::default())
            .add_systems(Startup, spawn_input_maps)
            .add_systems(
                PreUpdate,
                manage_input_focus.after(InputManagerSystem::Update),
            );
    }
}

/// Marker for the entity holding the input maps.
#[derive(Component)]
pub struct PlayerInput;

fn spawn_input_maps(mut commands: Commands) {
    commands.spawn((
        Name::new("Player input"),
        PlayerInput,
        default_drive_input_map(),
        default_debug_input_map(),
    ));
}

/// Disable keyboard actions while egui has keyboard focus.
fn manage_input_focus(
    mut drive_query: Query<&mut ActionState<DriveAction>>,
    mut debug_query: Query<&mut ActionState<DebugAction>>,
    mut contexts: EguiContexts,
) {
    let egui_wants_kb = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.wants_keyboard_input());

    for mut action_state in &mut drive_query {
        if egui_wants_kb {
            action_state.disable_all_actions();
        } else {
            action_state.enable_all_actions();
        }
    }
    for mut action_state in &mut debug_query {
        if egui_wants_kb {
            action_state.disable_all_actions();
        } else {
            action_state.enable_all_actions();
        }
    }
}

// ============================================================================
// Drive commands
// ============================================================================

/// Per-wheel controls derived from the held keys.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommands {
    /// Force for every driven wheel (N).
    pub engine_force: f32,
    /// Steering angle for every steered wheel (rad, positive = left).
    pub steering: f32,
    /// Brake force for every braked wheel (N).
    pub brake: f32,
}

impl DriveCommands {
    /// Write the commands onto the wheels selected by `tuning`.
    pub fn apply(&self, vehicle: &mut RaycastVehicle, tuning: &DriveTuning) {
        for &wheel in &tuning.driven_wheels {
            vehicle.apply_engine_force(self.engine_force, wheel);
        }
        for &wheel in &tuning.steered_wheels {
            vehicle.set_steering_value(self.steering, wheel);
        }
        for &wheel in &tuning.braked_wheels {
            vehicle.set_brake(self.brake, wheel);
        }
    }
}

/// Map held input to wheel controls.
///
/// Keys act as switches: any throttle applies full engine force in its
/// direction and any steering applies full lock. Releasing a key zeroes its
/// control.
pub fn drive_commands(input: &VehicleInput, tuning: &DriveTuning) -> DriveCommands {
    DriveCommands {
        engine_force: full_scale(input.throttle) * tuning.max_engine_force,
        // Positive input steers right, positive wheel angle turns left.
        steering: -full_scale(input.steer) * tuning.max_steer,
        brake: if input.brake { tuning.brake_force } else { 0.0 },
    }
}

/// Threshold below which an axis counts as released.
const AXIS_DEADZONE: f32 = 0.1;

fn full_scale(axis: f32) -> f32 {
    if axis > AXIS_DEADZONE {
        1.0
    } else if axis < -AXIS_DEADZONE {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::four_wheel_layout;

    fn input(throttle: f32, steer: f32, brake: bool) -> VehicleInput {
        VehicleInput {
            throttle,
            steer,
            brake,
        }
    }

    #[test]
    fn test_released_keys_zero_everything() {
        let commands = drive_commands(&VehicleInput::default(), &DriveTuning::default());
        assert_eq!(commands, DriveCommands::default());
    }

    #[test]
    fn test_throttle_and_reverse() {
        let tuning = DriveTuning::default();
        assert_eq!(drive_commands(&input(1.0, 0.0, false), &tuning).engine_force, 1000.0);
        assert_eq!(drive_commands(&input(-1.0, 0.0, false), &tuning).engine_force, -1000.0);
        // Partial axis values still act as a held key.
        assert_eq!(drive_commands(&input(0.5, 0.0, false), &tuning).engine_force, 1000.0);
        assert_eq!(drive_commands(&input(0.05, 0.0, false), &tuning).engine_force, 0.0);
    }

    #[test]
    fn test_steering_direction() {
        let tuning = DriveTuning::default();
        assert_eq!(drive_commands(&input(0.0, 1.0, false), &tuning).steering, -0.5);
        assert_eq!(drive_commands(&input(0.0, -1.0, false), &tuning).steering, 0.5);
    }

    #[test]
    fn test_brake() {
        let tuning = DriveTuning::default();
        assert_eq!(drive_commands(&input(0.0, 0.0, true), &tuning).brake, 1_000_000.0);
    }

    #[test]
    fn test_apply_targets_configured_wheels() {
        let tuning = DriveTuning::default();
        let mut vehicle = RaycastVehicle::new(four_wheel_layout());
        drive_commands(&input(1.0, -1.0, true), &tuning).apply(&mut vehicle, &tuning);

        let engine: Vec<f32> = vehicle.wheels.iter().map(|w| w.state.engine_force).collect();
        let steering: Vec<f32> = vehicle.wheels.iter().map(|w| w.state.steering).collect();
        let brake: Vec<f32> = vehicle.wheels.iter().map(|w| w.state.brake).collect();
        assert_eq!(engine, vec![0.0, 0.0, 1000.0, 1000.0]);
        assert_eq!(steering, vec![0.5, 0.5, 0.0, 0.0]);
        assert_eq!(brake, vec![1_000_000.0; 4]);
    }

    #[test]
    fn test_apply_ignores_missing_wheels() {
        let tuning = DriveTuning {
            driven_wheels: vec![2, 3, 8],
            ..DriveTuning::default()
        };
        let mut vehicle = RaycastVehicle::new(four_wheel_layout());
        drive_commands(&input(1.0, 0.0, false), &tuning).apply(&mut vehicle, &tuning);
        assert_eq!(vehicle.wheels.len(), 4);
        assert_eq!(vehicle.wheels[3].state.engine_force, 1000.0);
    }
}
