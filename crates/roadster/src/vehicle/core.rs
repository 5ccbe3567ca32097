//! Core raycast vehicle calculations.
//!
//! Pure functions that can be tested in isolation without Bevy dependencies.
//! The chassis is a rigid body owned by the physics engine; this module only
//! casts one ray per wheel through a [`GroundProbe`], computes suspension and
//! tyre friction impulses, and applies them to a [`ChassisState`] snapshot.
//! The caller writes the resulting velocities back to the engine.
//!
//! Conventions: chassis local forward is -Z, up is +Y, right is +X. Positive
//! engine force drives forward, positive steering turns left.

use glam::{Quat, Vec3};

/// Chassis local forward axis.
pub const CHASSIS_FORWARD: Vec3 = Vec3::NEG_Z;

/// Damping applied to the lateral contact velocity when computing side impulses.
const SIDE_FRICTION_DAMPING: f32 = 0.2;

/// Weight of the forward impulse when testing the friction budget.
const FORWARD_IMPULSE_WEIGHT: f32 = 0.5;

/// Weight of the side impulse when testing the friction budget.
const SIDE_IMPULSE_WEIGHT: f32 = 1.0;

/// Contact normals flatter than this against the suspension axis disable damping.
const MIN_CONTACT_DENOMINATOR: f32 = -0.1;

/// Per-step decay of the wheel spin rate.
const SPIN_DECAY: f32 = 0.99;

/// Conversion from m/s to km/h.
const MS_TO_KMH: f32 = 3.6;

/// Static parameters of a single wheel.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelParams {
    /// Wheel radius (m).
    pub radius: f32,
    /// Suspension axis in chassis space (points from the chassis to the ground).
    pub direction_local: Vec3,
    /// Axle in chassis space.
    pub axle_local: Vec3,
    /// Suspension attachment point in chassis space.
    pub connection_point_local: Vec3,
    /// Spring stiffness per unit chassis mass.
    pub suspension_stiffness: f32,
    /// Suspension length at rest (m).
    pub suspension_rest_length: f32,
    /// Maximum deviation of the suspension from its rest length (m).
    pub max_suspension_travel: f32,
    /// Damping while the spring extends.
    pub damping_relaxation: f32,
    /// Damping while the spring compresses.
    pub damping_compression: f32,
    /// Upper bound of the suspension force (N).
    pub max_suspension_force: f32,
    /// Friction budget multiplier. Higher values slide later.
    pub friction_slip: f32,
    /// Scale of the vertical lever arm for side impulses (0 = no body roll).
    pub roll_influence: f32,
    /// Spin rate shown while the wheel slides under engine force (rad/s).
    pub custom_sliding_rotational_speed: f32,
    /// Whether `custom_sliding_rotational_speed` is used.
    pub use_custom_sliding_rotational_speed: bool,
}

impl Default for WheelParams {
    fn default() -> Self {
        Self {
            radius: 0.22,
            direction_local: Vec3::NEG_Y,
            axle_local: Vec3::X,
            connection_point_local: Vec3::ZERO,
            suspension_stiffness: 30.0,
            suspension_rest_length: 0.45,
            max_suspension_travel: 0.3,
            damping_relaxation: 2.3,
            damping_compression: 4.4,
            max_suspension_force: 100_000.0,
            friction_slip: 1.0,
            roll_influence: 0.01,
            custom_sliding_rotational_speed: 30.0,
            use_custom_sliding_rotational_speed: true,
        }
    }
}

impl WheelParams {
    /// Default wheel attached at the given chassis-space point.
    pub fn at(connection_point_local: Vec3) -> Self {
        Self {
            connection_point_local,
            ..Self::default()
        }
    }

    /// Length of the suspension ray (rest length plus radius).
    pub fn ray_length(&self) -> f32 {
        self.suspension_rest_length + self.radius
    }
}

/// Runtime state of a single wheel.
#[derive(Clone, Debug, PartialEq)]
pub struct WheelState {
    /// Steering angle (rad, positive = left).
    pub steering: f32,
    /// Engine force (N, positive = forward).
    pub engine_force: f32,
    /// Brake force (N).
    pub brake: f32,
    /// Current suspension length (m).
    pub suspension_length: f32,
    /// Suspension force from the last step (N).
    pub suspension_force: f32,
    /// Suspension compression speed along the contact normal.
    pub suspension_relative_velocity: f32,
    /// Inverse of the contact normal against the suspension axis, clipped.
    pub clipped_inv_contact_dot_suspension: f32,
    /// Whether the suspension ray hit the ground.
    pub in_contact: bool,
    /// Ground contact point (world space).
    pub contact_point: Vec3,
    /// Ground normal at the contact point.
    pub contact_normal: Vec3,
    /// Accumulated spin angle (rad, positive = rolling forward).
    pub rotation: f32,
    /// Spin applied in the last step (rad).
    pub delta_rotation: f32,
    /// Side friction impulse from the last step.
    pub side_impulse: f32,
    /// Forward friction impulse from the last step.
    pub forward_impulse: f32,
    /// Fraction of the requested friction that could be applied.
    pub skid_info: f32,
    /// Whether the tyre exceeded its friction budget.
    pub sliding: bool,
    /// Suspension attachment point (world space).
    pub connection_point_world: Vec3,
    /// Suspension axis (world space).
    pub direction_world: Vec3,
    /// Steered axle (world space).
    pub axle_world: Vec3,
    /// Axle projected onto the contact plane.
    pub ground_axle: Vec3,
    /// Rolling direction on the contact plane.
    pub ground_forward: Vec3,
}

impl Default for WheelState {
    fn default() -> Self {
        Self {
            steering: 0.0,
            engine_force: 0.0,
            brake: 0.0,
            suspension_length: 0.0,
            suspension_force: 0.0,
            suspension_relative_velocity: 0.0,
            clipped_inv_contact_dot_suspension: 1.0,
            in_contact: false,
            contact_point: Vec3::ZERO,
            contact_normal: Vec3::ZERO,
            rotation: 0.0,
            delta_rotation: 0.0,
            side_impulse: 0.0,
            forward_impulse: 0.0,
            skid_info: 1.0,
            sliding: false,
            connection_point_world: Vec3::ZERO,
            direction_world: Vec3::NEG_Y,
            axle_world: Vec3::X,
            ground_axle: Vec3::ZERO,
            ground_forward: Vec3::ZERO,
        }
    }
}

/// A wheel: parameters plus runtime state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Wheel {
    pub params: WheelParams,
    pub state: WheelState,
}

impl Wheel {
    pub fn new(params: WheelParams) -> Self {
        let state = WheelState {
            suspension_length: params.suspension_rest_length,
            ..WheelState::default()
        };
        Self { params, state }
    }

    /// Wheel hub pose relative to the chassis, for attaching visuals.
    ///
    /// The returned rotation steers about the suspension axis and spins about
    /// the axle.
    pub fn local_pose(&self) -> (Vec3, Quat) {
        let translation = self.params.connection_point_local
            + self.params.direction_local * self.state.suspension_length;
        let steer = Quat::from_axis_angle(-self.params.direction_local, self.state.steering);
        let spin = Quat::from_axis_angle(self.params.axle_local, -self.state.rotation);
        (translation, steer * spin)
    }

    /// Wheel hub pose in world space.
    pub fn world_pose(&self, chassis: &ChassisState) -> (Vec3, Quat) {
        let (translation, rotation) = self.local_pose();
        (
            chassis.position + chassis.rotation * translation,
            chassis.rotation * rotation,
        )
    }
}

/// Snapshot of the chassis rigid body.
#[derive(Clone, Debug, PartialEq)]
pub struct ChassisState {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Mass (kg).
    pub mass: f32,
    /// Principal moments of inertia in chassis space.
    pub local_inertia: Vec3,
}

impl ChassisState {
    /// Chassis at rest with box inertia derived from `half_extents`.
    pub fn at_rest(position: Vec3, rotation: Quat, mass: f32, half_extents: Vec3) -> Self {
        Self {
            position,
            rotation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass,
            local_inertia: box_inertia(mass, half_extents),
        }
    }

    pub fn inv_mass(&self) -> f32 {
        if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 }
    }

    /// Multiply a world-space vector by the world-space inverse inertia tensor.
    pub fn apply_inv_inertia(&self, v: Vec3) -> Vec3 {
        let inv_local = Vec3::new(
            inv_or_zero(self.local_inertia.x),
            inv_or_zero(self.local_inertia.y),
            inv_or_zero(self.local_inertia.z),
        );
        let local = self.rotation.inverse() * v;
        self.rotation * (local * inv_local)
    }

    /// Velocity of a world-space point rigidly attached to the chassis.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    /// Apply an impulse at a point given relative to the chassis position.
    pub fn apply_impulse(&mut self, impulse: Vec3, rel_pos: Vec3) {
        self.linear_velocity += impulse * self.inv_mass();
        self.angular_velocity += self.apply_inv_inertia(rel_pos.cross(impulse));
    }

    /// Inverse effective mass for an impulse along `normal` at `point`.
    pub fn impulse_denominator(&self, point: Vec3, normal: Vec3) -> f32 {
        let r = point - self.position;
        let angular = self.apply_inv_inertia(r.cross(normal)).cross(r);
        self.inv_mass() + normal.dot(angular)
    }

    /// Chassis forward direction in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * CHASSIS_FORWARD
    }
}

fn inv_or_zero(value: f32) -> f32 {
    if value > 0.0 { 1.0 / value } else { 0.0 }
}

/// Ground contact returned by a [`GroundProbe`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    /// Distance from the ray origin to the hit (m).
    pub distance: f32,
    /// Surface normal at the hit.
    pub normal: Vec3,
}

/// Ray queries against the static world.
pub trait GroundProbe {
    /// Cast a ray from `origin` along the unit vector `direction`.
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<GroundHit>;
}

/// An infinite horizontal plane.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatGround {
    pub height: f32,
}

impl GroundProbe for FlatGround {
    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<GroundHit> {
        if direction.y >= 0.0 {
            return None;
        }
        let distance = (origin.y - self.height) / -direction.y;
        (0.0..=max_distance).contains(&distance).then_some(GroundHit {
            distance,
            normal: Vec3::Y,
        })
    }
}

/// Summary of a vehicle step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Signed chassis speed (km/h, negative when reversing).
    pub speed_kmh: f32,
    /// Number of wheels touching the ground.
    pub wheels_in_contact: usize,
    /// Whether any tyre exceeded its friction budget.
    pub sliding: bool,
}

/// A raycast vehicle: a set of wheels hung off a chassis body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RaycastVehicle {
    pub wheels: Vec<Wheel>,
    /// Signed speed from the last step (km/h).
    pub speed_kmh: f32,
    /// Whether any wheel slid in the last step.
    pub sliding: bool,
}

impl RaycastVehicle {
    pub fn new(wheels: impl IntoIterator<Item = WheelParams>) -> Self {
        Self {
            wheels: wheels.into_iter().map(Wheel::new).collect(),
            speed_kmh: 0.0,
            sliding: false,
        }
    }

    /// Set the engine force of one wheel. Unknown indices are ignored.
    pub fn apply_engine_force(&mut self, force: f32, wheel: usize) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.state.engine_force = force;
        }
    }

    /// Set the steering angle of one wheel. Unknown indices are ignored.
    pub fn set_steering_value(&mut self, value: f32, wheel: usize) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.state.steering = value;
        }
    }

    /// Set the brake force of one wheel. Unknown indices are ignored.
    pub fn set_brake(&mut self, force: f32, wheel: usize) {
        if let Some(w) = self.wheels.get_mut(wheel) {
            w.state.brake = force;
        }
    }

    pub fn wheels_in_contact(&self) -> usize {
        self.wheels.iter().filter(|w| w.state.in_contact).count()
    }

    /// Advance the vehicle by `dt`, applying wheel impulses to `chassis`.
    pub fn step(
        &mut self,
        chassis: &mut ChassisState,
        probe: &impl GroundProbe,
        dt: f32,
    ) -> StepReport {
        let forward = chassis.forward();
        let speed = chassis.linear_velocity.length() * MS_TO_KMH;
        self.speed_kmh = if forward.dot(chassis.linear_velocity) < 0.0 {
            -speed
        } else {
            speed
        };

        for wheel in &mut self.wheels {
            update_wheel_frame(wheel, chassis);
            cast_suspension_ray(wheel, chassis, probe);
            update_suspension(wheel, chassis.mass);
        }

        // Suspension impulses.
        for wheel in &self.wheels {
            let state = &wheel.state;
            if !state.in_contact {
                continue;
            }
            let impulse = state.contact_normal * state.suspension_force * dt;
            chassis.apply_impulse(impulse, state.contact_point - chassis.position);
        }

        self.update_friction(chassis, dt);
        self.update_wheel_spin(chassis, dt);

        StepReport {
            speed_kmh: self.speed_kmh,
            wheels_in_contact: self.wheels_in_contact(),
            sliding: self.sliding,
        }
    }

    fn update_friction(&mut self, chassis: &mut ChassisState, dt: f32) {
        let wheels_on_ground = self.wheels_in_contact().max(1) as f32;

        // Side impulses from the pre-step velocity.
        for wheel in &mut self.wheels {
            let state = &mut wheel.state;
            state.side_impulse = 0.0;
            state.forward_impulse = 0.0;
            state.skid_info = 1.0;
            state.sliding = false;
            state.ground_axle = Vec3::ZERO;
            state.ground_forward = Vec3::ZERO;
            if !state.in_contact {
                continue;
            }

            let normal = state.contact_normal;
            let axle =
                (state.axle_world - normal * state.axle_world.dot(normal)).normalize_or_zero();
            state.ground_axle = axle;
            state.ground_forward = normal.cross(axle).normalize_or_zero();

            let lateral_velocity = axle.dot(chassis.velocity_at(state.contact_point));
            state.side_impulse = -SIDE_FRICTION_DAMPING * lateral_velocity * chassis.mass;
        }

        // Forward impulses and the friction budget.
        self.sliding = false;
        for wheel in &mut self.wheels {
            let state = &mut wheel.state;
            if !state.in_contact {
                continue;
            }

            let rolling = if state.engine_force == 0.0 {
                let max_impulse = state.brake * dt;
                rolling_friction(
                    chassis,
                    state.contact_point,
                    state.ground_forward,
                    max_impulse,
                    wheels_on_ground,
                )
            } else {
                state.engine_force * dt
            };
            state.forward_impulse = rolling;

            let max_impulse = state.suspension_force * dt * wheel.params.friction_slip;
            let x = state.forward_impulse * FORWARD_IMPULSE_WEIGHT;
            let y = state.side_impulse * SIDE_IMPULSE_WEIGHT;
            let impulse_squared = x * x + y * y;
            if impulse_squared > max_impulse * max_impulse {
                self.sliding = true;
                state.sliding = true;
                state.skid_info = max_impulse / impulse_squared.sqrt();
            }
        }

        if self.sliding {
            for wheel in &mut self.wheels {
                let state = &mut wheel.state;
                if state.skid_info < 1.0 {
                    state.forward_impulse *= state.skid_info;
                    state.side_impulse *= state.skid_info;
                }
            }
        }

        let up = chassis.rotation * Vec3::Y;
        for wheel in &self.wheels {
            let state = &wheel.state;
            if !state.in_contact {
                continue;
            }
            let rel_pos = state.contact_point - chassis.position;

            if state.forward_impulse != 0.0 {
                chassis.apply_impulse(state.ground_forward * state.forward_impulse, rel_pos);
            }

            if state.side_impulse != 0.0 {
                // Lift the lever arm towards the centre of mass to limit body roll.
                let vertical = up * rel_pos.dot(up);
                let side_rel_pos = rel_pos - vertical + vertical * wheel.params.roll_influence;
                chassis.apply_impulse(state.ground_axle * state.side_impulse, side_rel_pos);
            }
        }
    }

    fn update_wheel_spin(&mut self, chassis: &ChassisState, dt: f32) {
        let chassis_forward = chassis.forward();
        for wheel in &mut self.wheels {
            let params = &wheel.params;
            let state = &mut wheel.state;

            if state.in_contact {
                let normal = state.contact_normal;
                let forward = chassis_forward - normal * chassis_forward.dot(normal);
                let velocity = chassis.velocity_at(state.connection_point_world);
                state.delta_rotation = forward.dot(velocity) * dt / params.radius;
            }

            if (state.sliding || !state.in_contact)
                && state.engine_force != 0.0
                && params.use_custom_sliding_rotational_speed
            {
                state.delta_rotation = state.engine_force.signum()
                    * params.custom_sliding_rotational_speed
                    * dt;
            }

            if state.brake.abs() > state.engine_force.abs() {
                state.delta_rotation = 0.0;
            }

            state.rotation += state.delta_rotation;
            state.delta_rotation *= SPIN_DECAY;
        }
    }
}

/// Recompute the world-space suspension frame of a wheel.
fn update_wheel_frame(wheel: &mut Wheel, chassis: &ChassisState) {
    let params = &wheel.params;
    let state = &mut wheel.state;
    state.connection_point_world =
        chassis.position + chassis.rotation * params.connection_point_local;
    state.direction_world = chassis.rotation * params.direction_local;
    let steer = Quat::from_axis_angle(-state.direction_world, state.steering);
    state.axle_world = steer * (chassis.rotation * params.axle_local);
}

/// Cast the suspension ray and record contact, length and compression speed.
fn cast_suspension_ray(wheel: &mut Wheel, chassis: &ChassisState, probe: &impl GroundProbe) {
    let params = &wheel.params;
    let state = &mut wheel.state;

    let hit = probe.cast_ray(
        state.connection_point_world,
        state.direction_world,
        params.ray_length(),
    );

    let Some(hit) = hit else {
        state.in_contact = false;
        state.suspension_length = params.suspension_rest_length;
        state.suspension_relative_velocity = 0.0;
        state.contact_normal = -state.direction_world;
        state.clipped_inv_contact_dot_suspension = 1.0;
        return;
    };

    state.in_contact = true;
    state.contact_normal = hit.normal;
    state.contact_point = state.connection_point_world + state.direction_world * hit.distance;

    let min_length = params.suspension_rest_length - params.max_suspension_travel;
    let max_length = params.suspension_rest_length + params.max_suspension_travel;
    state.suspension_length = (hit.distance - params.radius).clamp(min_length, max_length);

    let denominator = hit.normal.dot(state.direction_world);
    if denominator >= MIN_CONTACT_DENOMINATOR {
        state.suspension_relative_velocity = 0.0;
        state.clipped_inv_contact_dot_suspension = 1.0 / -MIN_CONTACT_DENOMINATOR;
    } else {
        let inv = -1.0 / denominator;
        let projected_velocity = hit.normal.dot(chassis.velocity_at(state.contact_point));
        state.suspension_relative_velocity = projected_velocity * inv;
        state.clipped_inv_contact_dot_suspension = inv;
    }
}

/// Spring-damper force for one wheel, scaled by chassis mass.
fn update_suspension(wheel: &mut Wheel, chassis_mass: f32) {
    let params = &wheel.params;
    let state = &mut wheel.state;
    if !state.in_contact {
        state.suspension_force = 0.0;
        return;
    }

    let length_diff = params.suspension_rest_length - state.suspension_length;
    let mut force =
        params.suspension_stiffness * length_diff * state.clipped_inv_contact_dot_suspension;
    let damping = if state.suspension_relative_velocity < 0.0 {
        params.damping_compression
    } else {
        params.damping_relaxation
    };
    force -= damping * state.suspension_relative_velocity;
    state.suspension_force = (force * chassis_mass).clamp(0.0, params.max_suspension_force);
}

/// This wheel's share of the impulse along `direction` that stops the contact
/// point, clamped to `max_impulse`.
fn rolling_friction(
    chassis: &ChassisState,
    point: Vec3,
    direction: Vec3,
    max_impulse: f32,
    wheels_on_ground: f32,
) -> f32 {
    let denominator = chassis.impulse_denominator(point, direction);
    if denominator <= 0.0 {
        return 0.0;
    }
    let relative_velocity = direction.dot(chassis.velocity_at(point));
    (-relative_velocity / denominator / wheels_on_ground).clamp(-max_impulse, max_impulse)
}

/// Principal moments of inertia of a solid box.
pub fn box_inertia(mass: f32, half_extents: Vec3) -> Vec3 {
    let size = half_extents * 2.0;
    let sq = size * size;
    Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * (mass / 12.0)
}
