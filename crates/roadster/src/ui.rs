//! HUD overlay for driving diagnostics.
//!
//! Shows FPS, speed, wheel contact and respawn count, a speed plot, per-wheel
//! suspension readouts and drive tuning sliders.

use std::collections::VecDeque;

use bevy::{
    diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin},
    ecs::system::SystemParam,
    gizmos::config::GizmoConfigStore,
    prelude::*,
};
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};
use egui_plot::{Line, Plot, PlotPoints};
use leafwing_input_manager::prelude::*;

use crate::input::DebugAction;
use crate::physics::{is_physics_debug_enabled, toggle_physics_debug};
use crate::vehicle::{DriveTuning, RespawnCounter, Vehicle, VehicleState, VehicleWheels};

/// Number of samples to keep in the speed history.
const SPEED_HISTORY_SIZE: usize = 240;

/// Key bindings shown in the HUD.
const CONTROLS_HELP: &[(&str, &str)] = &[
    ("W / Up", "throttle"),
    ("S / Down", "reverse"),
    ("A D / Left Right", "steer"),
    ("B", "brake"),
    ("R", "reset car"),
    ("F1", "collider wireframes"),
    ("H", "hide this window"),
];

/// Resource controlling whether the HUD is visible.
#[derive(Resource)]
pub struct HudVisible(pub bool);

impl Default for HudVisible {
    fn default() -> Self {
        Self(true)
    }
}

/// Recent speed samples for the HUD plot.
#[derive(Resource, Default)]
pub struct SpeedHistory {
    /// Speed history (km/h).
    speed: VecDeque<f32>,
}

impl SpeedHistory {
    /// Push a new sample, maintaining the history size limit.
    pub fn push_sample(&mut self, speed_kmh: f32) {
        let speed = if speed_kmh.is_finite() { speed_kmh } else { 0.0 };
        self.speed.push_back(speed);
        if self.speed.len() > SPEED_HISTORY_SIZE {
            self.speed.pop_front();
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = f32> + '_ {
        self.speed.iter().copied()
    }
}

/// Plugin for the HUD overlay.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_plugins(FrameTimeDiagnosticsPlugin::default())
            .init_resource::<HudVisible>()
            .init_resource::<SpeedHistory>()
            .add_systems(Update, (toggle_hud_visible, record_speed_history))
            .add_systems(
                EguiPrimaryContextPass,
                hud_system.run_if(|visible: Res<HudVisible>| visible.0),
            );
    }
}

/// Toggle HUD visibility with H.
fn toggle_hud_visible(
    action_query: Query<&ActionState<DebugAction>>,
    mut visible: ResMut<HudVisible>,
) {
    let Ok(action_state) = action_query.single() else {
        return;
    };

    if action_state.just_pressed(&DebugAction::ToggleHud) {
        visible.0 = !visible.0;
    }
}

fn record_speed_history(
    vehicles: Query<&VehicleState, With<Vehicle>>,
    mut history: ResMut<SpeedHistory>,
) {
    if let Some(state) = vehicles.iter().next() {
        history.push_sample(state.last_step.speed_kmh);
    }
}

/// Resources for the HUD.
#[derive(SystemParam)]
struct HudParams<'w, 's> {
    diagnostics: Res<'w, DiagnosticsStore>,
    config_store: ResMut<'w, GizmoConfigStore>,
    respawns: Res<'w, RespawnCounter>,
    history: Res<'w, SpeedHistory>,
    vehicle_query: Query<
        'w,
        's,
        (
            &'static Vehicle,
            &'static VehicleState,
            &'static VehicleWheels,
            &'static mut DriveTuning,
        ),
    >,
}

/// Render the HUD window.
fn hud_system(mut contexts: EguiContexts, mut params: HudParams) -> Result {
    let ctx = contexts.ctx_mut()?;

    let fps = params
        .diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(bevy::diagnostic::Diagnostic::smoothed)
        .unwrap_or(0.0);

    egui::Window::new("roadster")
        .default_pos([10.0, 10.0])
        .default_width(260.0)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(format!("FPS: {fps:.0}"));

            let mut debug_enabled = is_physics_debug_enabled(&params.config_store);
            if ui
                .checkbox(&mut debug_enabled, "Collider wireframes")
                .changed()
            {
                toggle_physics_debug(&mut params.config_store);
            }

            ui.separator();

            let Some((vehicle, state, wheels, mut tuning)) = params.vehicle_query.iter_mut().next()
            else {
                ui.label("No vehicle");
                return;
            };

            let step = state.last_step;
            ui.heading(&vehicle.name);
            egui::Grid::new("vehicle_grid")
                .num_columns(2)
                .spacing([20.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Speed:");
                    ui.label(format!("{:.1} km/h", step.speed_kmh));
                    ui.end_row();

                    ui.label("Wheels on ground:");
                    ui.label(format!("{} / {}", step.wheels_in_contact, wheels.0.wheels.len()));
                    ui.end_row();

                    ui.label("Sliding:");
                    ui.label(if step.sliding { "yes" } else { "no" });
                    ui.end_row();

                    ui.label("Respawns:");
                    ui.label(format!("{}", params.respawns.count));
                    ui.end_row();
                });

            ui.separator();

            // Speed plot.
            ui.label("Speed history:");
            let speed_points: PlotPoints = params
                .history
                .samples()
                .enumerate()
                .map(|(i, v)| [i as f64, f64::from(v)])
                .collect();
            Plot::new("speed_plot")
                .height(60.0)
                .show_axes(false)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| {
                    plot_ui.line(
                        Line::new("speed", speed_points).color(egui::Color32::LIGHT_BLUE),
                    );
                });

            ui.collapsing("Wheels", |ui| {
                egui::Grid::new("wheel_grid")
                    .num_columns(4)
                    .spacing([12.0, 2.0])
                    .show(ui, |ui| {
                        ui.label("#");
                        ui.label("Length");
                        ui.label("Force");
                        ui.label("Skid");
                        ui.end_row();
                        for (i, wheel) in wheels.0.wheels.iter().enumerate() {
                            ui.label(format!("{i}"));
                            ui.label(format!("{:.2} m", wheel.state.suspension_length));
                            ui.label(format!("{:.0} N", wheel.state.suspension_force));
                            ui.label(format!("{:.2}", wheel.state.skid_info));
                            ui.end_row();
                        }
                    });
            });

            ui.collapsing("Drive tuning", |ui| {
                ui.add(
                    egui::Slider::new(&mut tuning.max_steer, 0.1..=1.0).text("Max steer (rad)"),
                );
                ui.add(
                    egui::Slider::new(&mut tuning.max_engine_force, 100.0..=5000.0)
                        .text("Engine force (N)"),
                );
            });

            ui.collapsing("Controls", |ui| {
                for (key, action) in CONTROLS_HELP {
                    ui.label(format!("{key}: {action}"));
                }
            });
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut history = SpeedHistory::default();
        for i in 0..SPEED_HISTORY_SIZE + 10 {
            history.push_sample(i as f32);
        }
        let samples: Vec<f32> = history.samples().collect();
        assert_eq!(samples.len(), SPEED_HISTORY_SIZE);
        assert_eq!(samples[0], 10.0);
        assert_eq!(samples.last().copied(), Some((SPEED_HISTORY_SIZE + 9) as f32));
    }

    #[test]
    fn test_history_replaces_non_finite() {
        let mut history = SpeedHistory::default();
        history.push_sample(f32::NAN);
        history.push_sample(12.5);
        assert_eq!(history.samples().collect::<Vec<_>>(), vec![0.0, 12.5]);
    }
}
