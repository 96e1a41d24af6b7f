//! Morphs and their offset payloads.

use super::{Vec3, Vec4, VertexId};
use crate::named::impl_named;

/// Panel a morph is listed under.
pub mod category {
    pub const SYSTEM: i8 = 0;
    pub const EYEBROW: i8 = 1;
    pub const EYE: i8 = 2;
    pub const MOUTH: i8 = 3;
    pub const OTHER: i8 = 4;
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupOffset {
    pub morph: Option<String>,
    pub factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexOffset {
    pub vertex: VertexId,
    pub offset: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvOffset {
    pub vertex: VertexId,
    pub offset: Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneOffset {
    pub bone: Option<String>,
    pub location: Vec3,
    /// Quaternion (x, y, z, w).
    pub rotation: Vec4,
}

/// Whether a material offset multiplies or adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialOffsetOp {
    #[default]
    Multiply,
    Add,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialOffset {
    /// Target material; `None` applies to every material.
    pub material: Option<String>,
    pub op: MaterialOffsetOp,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture_factor: Vec4,
    pub sphere_factor: Vec4,
    pub toon_factor: Vec4,
}

/// Morph payload. The variant is fixed when the morph is created.
#[derive(Debug, Clone, PartialEq)]
pub enum MorphKind {
    Group(Vec<GroupOffset>),
    Vertex(Vec<VertexOffset>),
    Bone(Vec<BoneOffset>),
    /// UV morph on channel 0 (the base UV) to 4 (extra UV 4).
    Uv { channel: u8, offsets: Vec<UvOffset> },
    Material(Vec<MaterialOffset>),
}

impl MorphKind {
    pub(crate) const GROUP: i8 = 0;
    pub(crate) const VERTEX: i8 = 1;
    pub(crate) const BONE: i8 = 2;
    pub(crate) const UV: i8 = 3;
    pub(crate) const MATERIAL: i8 = 8;
    pub(crate) const FLIP: i8 = 9;
    pub(crate) const IMPULSE: i8 = 10;

    /// Type tag written to the file. Only channels up to
    /// [`MAX_EXTRA_UVS`](super::MAX_EXTRA_UVS) give a valid UV tag; saving
    /// rejects the others.
    pub fn tag(&self) -> i8 {
        match self {
            Self::Group(_) => Self::GROUP,
            Self::Vertex(_) => Self::VERTEX,
            Self::Bone(_) => Self::BONE,
            Self::Uv { channel, .. } => {
                Self::UV.saturating_add(i8::try_from(*channel).unwrap_or(i8::MAX))
            }
            Self::Material(_) => Self::MATERIAL,
        }
    }

    /// Short label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::Vertex(_) => "vertex",
            Self::Bone(_) => "bone",
            Self::Uv { .. } => "uv",
            Self::Material(_) => "material",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Group(o) => o.len(),
            Self::Vertex(o) => o.len(),
            Self::Bone(o) => o.len(),
            Self::Uv { offsets, .. } => offsets.len(),
            Self::Material(o) => o.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the offsets target vertices.
    pub fn is_mesh(&self) -> bool {
        matches!(self, Self::Vertex(_) | Self::Uv { .. })
    }

    /// Whether `self` and `other` are the same variant (and UV channel).
    pub fn same_kind(&self, other: &MorphKind) -> bool {
        self.tag() == other.tag()
    }
}

/// A named morph.
#[derive(Debug, Clone, PartialEq)]
pub struct Morph {
    name: String,
    pub name_en: String,
    pub category: i8,
    pub kind: MorphKind,
}

impl_named!(Morph, "morph");

impl Morph {
    pub fn new(name: impl Into<String>, kind: MorphKind) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            category: category::OTHER,
            kind,
        }
    }

    /// Drop vertex and UV offsets whose vertex fails `keep`.
    pub(crate) fn retain_vertices(&mut self, mut keep: impl FnMut(VertexId) -> bool) {
        match &mut self.kind {
            MorphKind::Vertex(offsets) => offsets.retain(|o| keep(o.vertex)),
            MorphKind::Uv { offsets, .. } => offsets.retain(|o| keep(o.vertex)),
            _ => {}
        }
    }
}
