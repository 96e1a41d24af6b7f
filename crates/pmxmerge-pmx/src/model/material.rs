//! Materials and texture paths.

use bitflags::bitflags;

use super::{Face, Vec3, Vec4};
use crate::named::impl_named;
use crate::{Error, Result};

bitflags! {
    /// Material drawing flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u8 {
        const DOUBLE_SIDED = 0x01;
        const GROUND_SHADOW = 0x02;
        const SELF_SHADOW_MAP = 0x04;
        const SELF_SHADOW = 0x08;
        const EDGE = 0x10;
    }
}

/// How the sphere map is blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SphereMode {
    #[default]
    Disabled,
    Multiply,
    Add,
    SubTexture,
}

impl SphereMode {
    pub fn from_i8(value: i8) -> Result<Self> {
        match value {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::Multiply),
            2 => Ok(Self::Add),
            3 => Ok(Self::SubTexture),
            other => Err(Error::InvalidValue {
                field: "material sphere mode",
                value: other.into(),
            }),
        }
    }

    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// Toon shading source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toon {
    /// One of the ten shared toon textures (`toon01.bmp`..`toon10.bmp`).
    Shared(i8),
    /// A model texture, or none.
    Texture(Option<String>),
}

impl Default for Toon {
    fn default() -> Self {
        Self::Shared(0)
    }
}

/// A material and the faces it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    pub name_en: String,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub ambient: Vec3,
    pub flags: MaterialFlags,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture: Option<String>,
    pub sphere_texture: Option<String>,
    pub sphere_mode: SphereMode,
    pub toon: Toon,
    pub comment: String,
    pub faces: Vec<Face>,
}

impl_named!(Material, "material");

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            name_en: String::new(),
            diffuse: [1.0, 1.0, 1.0, 1.0],
            specular: [0.0; 3],
            shininess: 5.0,
            ambient: [0.5; 3],
            flags: MaterialFlags::DOUBLE_SIDED
                | MaterialFlags::GROUND_SHADOW
                | MaterialFlags::SELF_SHADOW_MAP
                | MaterialFlags::SELF_SHADOW,
            edge_color: [0.0, 0.0, 0.0, 1.0],
            edge_size: 1.0,
            texture: None,
            sphere_texture: None,
            sphere_mode: SphereMode::Disabled,
            toon: Toon::default(),
            comment: String::new(),
            faces: Vec::new(),
        }
    }

    /// Copy every setting from `other`, leaving name and faces untouched.
    pub fn copy_settings_from(&mut self, other: &Material) {
        self.name_en.clone_from(&other.name_en);
        self.diffuse = other.diffuse;
        self.specular = other.specular;
        self.shininess = other.shininess;
        self.ambient = other.ambient;
        self.flags = other.flags;
        self.edge_color = other.edge_color;
        self.edge_size = other.edge_size;
        self.texture.clone_from(&other.texture);
        self.sphere_texture.clone_from(&other.sphere_texture);
        self.sphere_mode = other.sphere_mode;
        self.toon.clone_from(&other.toon);
        self.comment.clone_from(&other.comment);
    }

    /// Texture paths referenced by this material.
    pub fn texture_refs(&self) -> impl Iterator<Item = &str> {
        let toon = match &self.toon {
            Toon::Texture(path) => path.as_deref(),
            Toon::Shared(_) => None,
        };
        [self.texture.as_deref(), self.sphere_texture.as_deref(), toon]
            .into_iter()
            .flatten()
    }

    pub(crate) fn texture_refs_mut(&mut self) -> impl Iterator<Item = &mut Option<String>> {
        let toon = match &mut self.toon {
            Toon::Texture(path) => Some(path),
            Toon::Shared(_) => None,
        };
        [Some(&mut self.texture), Some(&mut self.sphere_texture), toon]
            .into_iter()
            .flatten()
    }
}

/// Canonical form used to compare texture paths: backslash separators and
/// no leading `.\`.
pub fn normalize_texture_path(path: &str) -> String {
    let mut normalized = path.replace('/', "\\");
    while let Some(rest) = normalized.strip_prefix(".\\") {
        normalized = rest.to_owned();
    }
    normalized
}
