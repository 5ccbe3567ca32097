//! Shared physical and scene constants.

/// Gravitational acceleration (m/s^2).
pub const GRAVITY: f32 = 9.82;

/// Fixed physics update rate (Hz).
pub const PHYSICS_HZ: f64 = 60.0;

/// Half extents of the static ground slab collider.
pub const GROUND_HALF_EXTENTS: [f32; 3] = [50.0, 1.0, 50.0];

/// Centre height of the ground slab. Its top surface sits at `y = 0`.
pub const GROUND_CENTER_Y: f32 = -1.0;

/// Edge length of the rendered ground plane.
pub const GROUND_VISUAL_SIZE: f32 = 100.0;

/// Friction of ground surfaces against the car.
pub const GROUND_FRICTION: f32 = 0.3;

/// Sky background colour (`#87CEEB`).
pub const SKY_COLOR: [u8; 3] = [0x87, 0xce, 0xeb];

/// Ground plane colour (`#01C75A`).
pub const GROUND_COLOR: [u8; 3] = [0x01, 0xc7, 0x5a];

/// Collider wireframe colour for physics debug rendering (`#00FF00`).
pub const DEBUG_COLLIDER_COLOR: [u8; 3] = [0x00, 0xff, 0x00];
