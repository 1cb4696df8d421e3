//! Plain value types for the transform carried by creation and sync events.
//! Continuous transform replication happens elsewhere; these only describe
//! the initial pose of an instance.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub const fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Quat,
    pub scale: Vector3,
}

impl Transform {
    pub const fn new(position: Vector3, rotation: Quat, scale: Vector3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub const fn identity() -> Self {
        Self::new(Vector3::zero(), Quat::identity(), Vector3::one())
    }

    pub const fn from_position(position: Vector3) -> Self {
        Self::new(position, Quat::identity(), Vector3::one())
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
