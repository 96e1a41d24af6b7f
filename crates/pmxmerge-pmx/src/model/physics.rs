//! Rigid bodies and joints.

use super::Vec3;
use crate::named::impl_named;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigidShape {
    #[default]
    Sphere,
    Box,
    Capsule,
}

impl RigidShape {
    pub fn from_i8(value: i8) -> Result<Self> {
        match value {
            0 => Ok(Self::Sphere),
            1 => Ok(Self::Box),
            2 => Ok(Self::Capsule),
            other => Err(Error::InvalidValue {
                field: "rigid body shape",
                value: other.into(),
            }),
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// How the physics engine drives a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigidMode {
    /// Follows its bone.
    #[default]
    Static,
    Dynamic,
    /// Simulated, with position pinned to the bone.
    DynamicWithBone,
}

impl RigidMode {
    pub fn from_i8(value: i8) -> Result<Self> {
        match value {
            0 => Ok(Self::Static),
            1 => Ok(Self::Dynamic),
            2 => Ok(Self::DynamicWithBone),
            other => Err(Error::InvalidValue {
                field: "rigid body mode",
                value: other.into(),
            }),
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    name: String,
    pub name_en: String,
    pub bone: Option<String>,
    pub group: i8,
    /// Bit set of groups this body does not collide with.
    pub no_collision_mask: u16,
    pub shape: RigidShape,
    pub size: Vec3,
    pub position: Vec3,
    pub rotation: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    pub mode: RigidMode,
}

impl_named!(RigidBody, "rigid body");

impl RigidBody {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            bone: None,
            group: 0,
            no_collision_mask: 0,
            shape: RigidShape::Sphere,
            size: [1.0; 3],
            position: [0.0; 3],
            rotation: [0.0; 3],
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            restitution: 0.0,
            friction: 0.5,
            mode: RigidMode::Static,
        }
    }
}

/// A spring 6DOF constraint between two rigid bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    name: String,
    pub name_en: String,
    pub rigid_a: Option<String>,
    pub rigid_b: Option<String>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub min_location: Vec3,
    pub max_location: Vec3,
    pub min_rotation: Vec3,
    pub max_rotation: Vec3,
    pub spring_location: Vec3,
    pub spring_rotation: Vec3,
}

impl_named!(Joint, "joint");

impl Joint {
    /// The only joint mode this codec reads or writes.
    pub(crate) const SPRING_6DOF: i8 = 0;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            rigid_a: None,
            rigid_b: None,
            position: [0.0; 3],
            rotation: [0.0; 3],
            min_location: [0.0; 3],
            max_location: [0.0; 3],
            min_rotation: [0.0; 3],
            max_rotation: [0.0; 3],
            spring_location: [0.0; 3],
            spring_rotation: [0.0; 3],
        }
    }

    pub fn between(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.rigid_a = Some(a.into());
        self.rigid_b = Some(b.into());
        self
    }
}
