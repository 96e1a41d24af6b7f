//! Vertices, bone weights and faces.

use std::fmt;

use super::{Vec2, Vec3, Vec4};

/// Model-local handle of a vertex.
///
/// Handles are issued by the owning [`Model`](crate::Model) and never reused
/// within it. They carry no meaning across models: a vertex copied from one
/// model into another receives a fresh handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) u32);

impl VertexId {
    /// Raw handle value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A triangle, in winding order. The file stores the indices reversed.
pub type Face = [VertexId; 3];

/// Skinning weights of a vertex. Bones are referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub enum BoneWeight {
    Bdef1 {
        bone: Option<String>,
    },
    Bdef2 {
        bones: [Option<String>; 2],
        weight: f32,
    },
    Bdef4 {
        bones: [Option<String>; 4],
        weights: [f32; 4],
    },
    Sdef {
        bones: [Option<String>; 2],
        weight: f32,
        c: Vec3,
        r0: Vec3,
        r1: Vec3,
    },
}

impl BoneWeight {
    pub(crate) const BDEF1: u8 = 0;
    pub(crate) const BDEF2: u8 = 1;
    pub(crate) const BDEF4: u8 = 2;
    pub(crate) const SDEF: u8 = 3;
    pub(crate) const QDEF: u8 = 4;

    /// Weight fully bound to a single bone.
    pub fn single(bone: impl Into<String>) -> Self {
        Self::Bdef1 {
            bone: Some(bone.into()),
        }
    }

    /// Type tag written to the file.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bdef1 { .. } => Self::BDEF1,
            Self::Bdef2 { .. } => Self::BDEF2,
            Self::Bdef4 { .. } => Self::BDEF4,
            Self::Sdef { .. } => Self::SDEF,
        }
    }

    /// Bone references, in file order.
    pub fn bones(&self) -> &[Option<String>] {
        match self {
            Self::Bdef1 { bone } => std::slice::from_ref(bone),
            Self::Bdef2 { bones, .. } | Self::Sdef { bones, .. } => bones,
            Self::Bdef4 { bones, .. } => bones,
        }
    }

    pub fn bones_mut(&mut self) -> &mut [Option<String>] {
        match self {
            Self::Bdef1 { bone } => std::slice::from_mut(bone),
            Self::Bdef2 { bones, .. } | Self::Sdef { bones, .. } => bones,
            Self::Bdef4 { bones, .. } => bones,
        }
    }
}

impl Default for BoneWeight {
    fn default() -> Self {
        Self::Bdef1 { bone: None }
    }
}

/// A mesh vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    /// One entry per extra UV channel declared by the model.
    pub extra_uvs: Vec<Vec4>,
    pub weight: BoneWeight,
    pub edge_scale: f32,
    pub(crate) id: VertexId,
    pub(crate) deleted: bool,
}

impl Vertex {
    /// A vertex not yet added to any model.
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, weight: BoneWeight) -> Self {
        Self {
            position,
            normal,
            uv,
            extra_uvs: Vec::new(),
            weight,
            edge_scale: 1.0,
            id: VertexId(u32::MAX),
            deleted: false,
        }
    }

    /// Handle assigned by the owning model.
    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Whether the vertex is marked for removal at the next purge.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}
