//! PMX header structures.

use pmxmerge_common::{IndexWidth, TextEncoding};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::model::MAX_EXTRA_UVS;
use crate::{Error, Model, Result};

/// Signature at the start of every PMX file.
pub const PMX_MAGIC: [u8; 4] = *b"PMX ";

/// The only supported format version.
pub const PMX_VERSION: f32 = 2.0;

/// Number of global settings bytes that follow the version.
const SETTINGS_COUNT: u8 = 8;

/// Fixed-size leading block of a PMX file, exactly as stored.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawHeader {
    pub magic: [u8; 4],
    pub version: f32,
    pub settings_count: u8,
    pub encoding: u8,
    pub extra_uvs: u8,
    pub vertex_index_size: u8,
    pub texture_index_size: u8,
    pub material_index_size: u8,
    pub bone_index_size: u8,
    pub morph_index_size: u8,
    pub rigid_index_size: u8,
}

impl RawHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 17;
}

/// Per-family index widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexWidths {
    pub vertex: IndexWidth,
    pub texture: IndexWidth,
    pub material: IndexWidth,
    pub bone: IndexWidth,
    pub morph: IndexWidth,
    pub rigid: IndexWidth,
}

/// Validated header settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub encoding: TextEncoding,
    pub extra_uv_count: u8,
    pub widths: IndexWidths,
}

impl Header {
    /// Validate a raw header.
    pub fn from_raw(raw: &RawHeader) -> Result<Self> {
        let magic = raw.magic;
        if magic != PMX_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }
        // Copy out of the packed struct before comparing.
        let version = raw.version;
        if version != PMX_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        if raw.settings_count != SETTINGS_COUNT {
            return Err(Error::InvalidHeader(format!(
                "expected {} global settings, found {}",
                SETTINGS_COUNT, raw.settings_count
            )));
        }
        if raw.extra_uvs > MAX_EXTRA_UVS {
            return Err(Error::InvalidHeader(format!(
                "{} extra UV channels (at most {} allowed)",
                raw.extra_uvs, MAX_EXTRA_UVS
            )));
        }
        Ok(Self {
            encoding: TextEncoding::from_selector(raw.encoding)?,
            extra_uv_count: raw.extra_uvs,
            widths: IndexWidths {
                vertex: IndexWidth::from_byte(raw.vertex_index_size)?,
                texture: IndexWidth::from_byte(raw.texture_index_size)?,
                material: IndexWidth::from_byte(raw.material_index_size)?,
                bone: IndexWidth::from_byte(raw.bone_index_size)?,
                morph: IndexWidth::from_byte(raw.morph_index_size)?,
                rigid: IndexWidth::from_byte(raw.rigid_index_size)?,
            },
        })
    }

    /// Header for saving `model`, with the smallest widths that fit its
    /// current collection sizes.
    pub fn for_model(model: &Model) -> Self {
        Self {
            encoding: model.encoding,
            extra_uv_count: model.extra_uv_count(),
            widths: IndexWidths {
                vertex: IndexWidth::for_unsigned(model.vertices().len()),
                texture: IndexWidth::for_signed(model.textures().len()),
                material: IndexWidth::for_signed(model.materials.len()),
                bone: IndexWidth::for_signed(model.bones.len()),
                morph: IndexWidth::for_signed(model.morphs.len()),
                rigid: IndexWidth::for_signed(model.rigid_bodies.len()),
            },
        }
    }

    pub fn to_raw(&self) -> RawHeader {
        RawHeader {
            magic: PMX_MAGIC,
            version: PMX_VERSION,
            settings_count: SETTINGS_COUNT,
            encoding: self.encoding.selector(),
            extra_uvs: self.extra_uv_count,
            vertex_index_size: self.widths.vertex.bytes(),
            texture_index_size: self.widths.texture.bytes(),
            material_index_size: self.widths.material.bytes(),
            bone_index_size: self.widths.bone.bytes(),
            morph_index_size: self.widths.morph.bytes(),
            rigid_index_size: self.widths.rigid.bytes(),
        }
    }
}
