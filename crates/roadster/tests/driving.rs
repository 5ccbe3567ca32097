//! Drives the raycast vehicle model over a flat plane for several simulated seconds.

use glam::{Quat, Vec3};
use roadster::constants::GRAVITY;
use roadster::vehicle::core::{ChassisState, FlatGround, RaycastVehicle, StepReport, WheelParams};

const DT: f32 = 1.0 / 60.0;

fn car() -> (RaycastVehicle, ChassisState) {
    let vehicle = RaycastVehicle::new([
        WheelParams::at(Vec3::new(-1.0, 0.0, -1.0)),
        WheelParams::at(Vec3::new(1.0, 0.0, -1.0)),
        WheelParams::at(Vec3::new(-1.0, 0.0, 1.0)),
        WheelParams::at(Vec3::new(1.0, 0.0, 1.0)),
    ]);
    let chassis = ChassisState::at_rest(
        Vec3::new(0.0, 0.8, 0.0),
        Quat::IDENTITY,
        700.0,
        Vec3::new(1.0, 0.5, 2.0),
    );
    (vehicle, chassis)
}

/// Semi-implicit Euler integration standing in for the physics engine.
fn simulate(
    vehicle: &mut RaycastVehicle,
    chassis: &mut ChassisState,
    seconds: f32,
) -> StepReport {
    let ground = FlatGround { height: 0.0 };
    let mut report = StepReport::default();
    let steps = (seconds / DT).round() as usize;
    for _ in 0..steps {
        chassis.linear_velocity.y -= GRAVITY * DT;
        report = vehicle.step(chassis, &ground, DT);
        chassis.position += chassis.linear_velocity * DT;
        chassis.rotation =
            (Quat::from_scaled_axis(chassis.angular_velocity * DT) * chassis.rotation).normalize();
    }
    report
}

fn throttle(vehicle: &mut RaycastVehicle, force: f32) {
    vehicle.apply_engine_force(force, 2);
    vehicle.apply_engine_force(force, 3);
}

#[test]
fn settles_on_suspension() {
    let (mut vehicle, mut chassis) = car();
    let report = simulate(&mut vehicle, &mut chassis, 5.0);

    assert_eq!(report.wheels_in_contact, 4);
    // Rest height: radius + rest length - static compression (~0.59 m).
    assert!(
        (0.5..0.68).contains(&chassis.position.y),
        "y = {}",
        chassis.position.y
    );
    assert!(chassis.linear_velocity.length() < 0.05);
    assert!(chassis.angular_velocity.length() < 0.05);
}

#[test]
fn throttle_drives_forward() {
    let (mut vehicle, mut chassis) = car();
    simulate(&mut vehicle, &mut chassis, 2.0);

    throttle(&mut vehicle, 1000.0);
    let report = simulate(&mut vehicle, &mut chassis, 3.0);

    assert!(chassis.linear_velocity.z < -5.0, "v = {}", chassis.linear_velocity);
    assert!(chassis.linear_velocity.x.abs() < 0.5);
    assert!(report.speed_kmh > 18.0);
    assert_eq!(report.wheels_in_contact, 4);
}

#[test]
fn reverse_drives_backward() {
    let (mut vehicle, mut chassis) = car();
    simulate(&mut vehicle, &mut chassis, 2.0);

    throttle(&mut vehicle, -1000.0);
    let report = simulate(&mut vehicle, &mut chassis, 2.0);

    assert!(chassis.linear_velocity.z > 2.0);
    assert!(report.speed_kmh < 0.0);
}

#[test]
fn steering_left_turns_left() {
    let (mut vehicle, mut chassis) = car();
    simulate(&mut vehicle, &mut chassis, 2.0);

    throttle(&mut vehicle, 1000.0);
    vehicle.set_steering_value(0.5, 0);
    vehicle.set_steering_value(0.5, 1);
    simulate(&mut vehicle, &mut chassis, 1.5);

    let heading = chassis.rotation * Vec3::NEG_Z;
    assert!(heading.x < -0.1, "heading = {heading}");
    assert!(chassis.angular_velocity.y > 0.0);
}

#[test]
fn brakes_stop_the_car() {
    let (mut vehicle, mut chassis) = car();
    simulate(&mut vehicle, &mut chassis, 2.0);

    throttle(&mut vehicle, 1000.0);
    simulate(&mut vehicle, &mut chassis, 3.0);
    assert!(chassis.linear_velocity.length() > 5.0);

    throttle(&mut vehicle, 0.0);
    for wheel in 0..4 {
        vehicle.set_brake(1_000_000.0, wheel);
    }
    simulate(&mut vehicle, &mut chassis, 3.0);

    let horizontal = Vec3::new(chassis.linear_velocity.x, 0.0, chassis.linear_velocity.z);
    assert!(horizontal.length() < 0.5, "v = {}", chassis.linear_velocity);
}
