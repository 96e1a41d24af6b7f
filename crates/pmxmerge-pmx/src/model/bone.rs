//! Bones and IK chains.

use bitflags::bitflags;

use super::Vec3;
use crate::named::impl_named;

bitflags! {
    /// Bone flag word.
    ///
    /// Presence bits (`DISPLAY_BONE`, `IK`, `ADDITIONAL_*`, `FIXED_AXIS`,
    /// `LOCAL_COORDINATE`, `EXTERNAL_PARENT`) are derived from the optional
    /// blocks of [`Bone`] when saving; the rest are stored as read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoneFlags: u16 {
        const DISPLAY_BONE = 0x0001;
        const ROTATABLE = 0x0002;
        const MOVABLE = 0x0004;
        const VISIBLE = 0x0008;
        const CONTROLLABLE = 0x0010;
        const IK = 0x0020;
        const LOCAL_ADDITIONAL = 0x0080;
        const ADDITIONAL_ROTATION = 0x0100;
        const ADDITIONAL_LOCATION = 0x0200;
        const FIXED_AXIS = 0x0400;
        const LOCAL_COORDINATE = 0x0800;
        const AFTER_PHYSICS = 0x1000;
        const EXTERNAL_PARENT = 0x2000;

        const PRESENCE = Self::DISPLAY_BONE.bits()
            | Self::IK.bits()
            | Self::ADDITIONAL_ROTATION.bits()
            | Self::ADDITIONAL_LOCATION.bits()
            | Self::FIXED_AXIS.bits()
            | Self::LOCAL_COORDINATE.bits()
            | Self::EXTERNAL_PARENT.bits();
    }
}

/// Where the bone's tail is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayConnection {
    Offset(Vec3),
    Bone(Option<String>),
}

impl Default for DisplayConnection {
    fn default() -> Self {
        Self::Offset([0.0; 3])
    }
}

/// Inherited rotation and/or translation from another bone.
#[derive(Debug, Clone, PartialEq)]
pub struct AdditionalTransform {
    pub bone: Option<String>,
    pub influence: f32,
    pub rotation: bool,
    pub location: bool,
}

/// Local axes of a bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalCoordinate {
    pub x_axis: Vec3,
    pub z_axis: Vec3,
}

/// Angle limits of an IK link, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleLimit {
    pub min: Vec3,
    pub max: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IkLink {
    pub bone: Option<String>,
    pub limit: Option<AngleLimit>,
}

/// Inverse kinematics block of an IK bone.
#[derive(Debug, Clone, PartialEq)]
pub struct Ik {
    pub target: Option<String>,
    pub loop_count: i32,
    pub limit_angle: f32,
    pub links: Vec<IkLink>,
}

/// A skeleton bone. Every bone reference is a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    name: String,
    pub name_en: String,
    pub location: Vec3,
    pub parent: Option<String>,
    pub transform_order: i32,
    pub flags: BoneFlags,
    pub display: DisplayConnection,
    pub additional: Option<AdditionalTransform>,
    pub fixed_axis: Option<Vec3>,
    pub local_coordinate: Option<LocalCoordinate>,
    pub external_parent: Option<i32>,
    pub ik: Option<Ik>,
}

impl_named!(Bone, "bone");

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            location: [0.0; 3],
            parent: None,
            transform_order: 0,
            flags: BoneFlags::ROTATABLE
                | BoneFlags::MOVABLE
                | BoneFlags::VISIBLE
                | BoneFlags::CONTROLLABLE,
            display: DisplayConnection::default(),
            additional: None,
            fixed_axis: None,
            local_coordinate: None,
            external_parent: None,
            ik: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Flag word as written: stored behaviour bits plus presence bits
    /// derived from the optional blocks.
    pub fn effective_flags(&self) -> BoneFlags {
        let mut flags = self.flags - BoneFlags::PRESENCE;
        flags.set(
            BoneFlags::DISPLAY_BONE,
            matches!(self.display, DisplayConnection::Bone(_)),
        );
        flags.set(BoneFlags::IK, self.ik.is_some());
        if let Some(additional) = &self.additional {
            flags.set(BoneFlags::ADDITIONAL_ROTATION, additional.rotation);
            flags.set(BoneFlags::ADDITIONAL_LOCATION, additional.location);
        }
        flags.set(BoneFlags::FIXED_AXIS, self.fixed_axis.is_some());
        flags.set(BoneFlags::LOCAL_COORDINATE, self.local_coordinate.is_some());
        flags.set(BoneFlags::EXTERNAL_PARENT, self.external_parent.is_some());
        flags
    }

    /// Copy location and display connection from `other`.
    pub fn copy_location_from(&mut self, other: &Bone) {
        self.location = other.location;
        self.display.clone_from(&other.display);
    }

    /// Copy every field except name, location and display connection.
    pub fn copy_settings_from(&mut self, other: &Bone) {
        self.name_en.clone_from(&other.name_en);
        self.parent.clone_from(&other.parent);
        self.transform_order = other.transform_order;
        self.flags = other.flags;
        self.additional.clone_from(&other.additional);
        self.fixed_axis = other.fixed_axis;
        self.local_coordinate = other.local_coordinate;
        self.external_parent = other.external_parent;
        self.ik.clone_from(&other.ik);
    }

    /// Every bone reference held by this bone, mutably.
    pub(crate) fn bone_refs_mut(&mut self) -> impl Iterator<Item = &mut Option<String>> {
        let display = match &mut self.display {
            DisplayConnection::Bone(bone) => Some(bone),
            DisplayConnection::Offset(_) => None,
        };
        let additional = self.additional.as_mut().map(|a| &mut a.bone);
        let (target, links) = match &mut self.ik {
            Some(ik) => (Some(&mut ik.target), ik.links.as_mut_slice()),
            None => (None, Default::default()),
        };
        [Some(&mut self.parent), display, additional, target]
            .into_iter()
            .flatten()
            .chain(links.iter_mut().map(|link| &mut link.bone))
    }
}
