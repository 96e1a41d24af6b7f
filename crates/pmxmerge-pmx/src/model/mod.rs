//! The in-memory model graph.
//!
//! Cross references between records are names (bones, materials, morphs,
//! rigid bodies) or model-local [`VertexId`] handles (vertices). Positional
//! indices only exist on disk; the codec derives them when saving.
//!
//! Vertices are removed in two phases: they are first marked deleted, then a
//! purge compacts the vertex list and drops every vertex or UV morph offset
//! that pointed at a removed vertex.

mod bone;
mod display;
mod material;
mod morph;
mod physics;
mod vertex;

use std::fmt;

pub use bone::{
    AdditionalTransform, AngleLimit, Bone, BoneFlags, DisplayConnection, Ik, IkLink,
    LocalCoordinate,
};
pub use display::{DisplayGroup, DisplayItem};
pub use material::{normalize_texture_path, Material, MaterialFlags, SphereMode, Toon};
pub use morph::{
    category, BoneOffset, GroupOffset, MaterialOffset, MaterialOffsetOp, Morph, MorphKind,
    UvOffset, VertexOffset,
};
pub use physics::{Joint, RigidBody, RigidMode, RigidShape};
pub use vertex::{BoneWeight, Face, Vertex, VertexId};

use pmxmerge_common::TextEncoding;

use crate::named::{NameIssue, Named, NamedList};
use crate::{Error, FxHashMap, FxHashSet, Result};

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

/// Largest number of extra UV channels a vertex may carry.
pub const MAX_EXTRA_UVS: u8 = 4;

/// A PMX model.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub name_en: String,
    pub comment: String,
    pub comment_en: String,
    /// Text encoding used when saving.
    pub encoding: TextEncoding,
    extra_uv_count: u8,
    vertices: Vec<Vertex>,
    vertex_positions: FxHashMap<VertexId, usize>,
    next_vertex_id: u32,
    textures: Vec<String>,
    pub materials: NamedList<Material>,
    pub bones: NamedList<Bone>,
    pub morphs: NamedList<Morph>,
    pub display_groups: NamedList<DisplayGroup>,
    pub rigid_bodies: NamedList<RigidBody>,
    pub joints: NamedList<Joint>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            name: String::new(),
            name_en: String::new(),
            comment: String::new(),
            comment_en: String::new(),
            encoding: TextEncoding::Utf16Le,
            extra_uv_count: 0,
            vertices: Vec::new(),
            vertex_positions: FxHashMap::default(),
            next_vertex_id: 0,
            textures: Vec::new(),
            materials: NamedList::new(),
            bones: NamedList::new(),
            morphs: NamedList::new(),
            display_groups: NamedList::new(),
            rigid_bodies: NamedList::new(),
            joints: NamedList::new(),
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    // Vertices

    pub fn extra_uv_count(&self) -> u8 {
        self.extra_uv_count
    }

    /// Change the number of extra UV channels, padding or truncating every
    /// vertex to match.
    pub fn set_extra_uv_count(&mut self, count: u8) -> Result<()> {
        if count > MAX_EXTRA_UVS {
            return Err(Error::InvalidValue {
                field: "extra UV count",
                value: count.into(),
            });
        }
        self.extra_uv_count = count;
        for vertex in &mut self.vertices {
            vertex.extra_uvs.resize(count as usize, [0.0; 4]);
        }
        Ok(())
    }

    /// All vertices, including ones marked deleted but not yet purged.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_index(id).map(|i| &self.vertices[i])
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertex_index(id).map(move |i| &mut self.vertices[i])
    }

    /// Current position of a vertex in the vertex list.
    pub fn vertex_index(&self, id: VertexId) -> Option<usize> {
        self.vertex_positions.get(&id).copied()
    }

    /// Add a vertex under a fresh handle.
    ///
    /// Any handle the vertex carried is discarded, and its extra UVs are
    /// fitted to this model's channel count.
    pub fn add_vertex(&mut self, mut vertex: Vertex) -> VertexId {
        let id = VertexId(self.next_vertex_id);
        self.next_vertex_id += 1;
        vertex.id = id;
        vertex.deleted = false;
        vertex
            .extra_uvs
            .resize(self.extra_uv_count as usize, [0.0; 4]);
        self.vertex_positions.insert(id, self.vertices.len());
        self.vertices.push(vertex);
        id
    }

    /// Copy every vertex of `source` into this model, returning the handle
    /// each source vertex received here.
    pub fn import_vertices(&mut self, source: &Model) -> FxHashMap<VertexId, VertexId> {
        self.vertices.reserve(source.vertices.len());
        source
            .vertices
            .iter()
            .filter(|v| !v.deleted)
            .map(|v| (v.id, self.add_vertex(v.clone())))
            .collect()
    }

    /// Mark a vertex for removal at the next purge.
    pub fn mark_deleted(&mut self, id: VertexId) -> bool {
        match self.vertex_mut(id) {
            Some(vertex) => {
                vertex.deleted = true;
                true
            }
            None => false,
        }
    }

    /// Handles referenced by any material face.
    pub fn used_vertices(&self) -> FxHashSet<VertexId> {
        self.materials
            .iter()
            .flat_map(|m| m.faces.iter().flatten().copied())
            .collect()
    }

    fn mark_unused_except(&mut self, used: &FxHashSet<VertexId>) {
        for vertex in &mut self.vertices {
            if !used.contains(&vertex.id) {
                vertex.deleted = true;
            }
        }
    }

    /// Physically remove vertices marked deleted, along with the vertex and
    /// UV morph offsets that reference them. Returns the number removed.
    pub fn purge_deleted_vertices(&mut self) -> usize {
        let deleted: FxHashSet<VertexId> = self
            .vertices
            .iter()
            .filter(|v| v.deleted)
            .map(|v| v.id)
            .collect();
        if deleted.is_empty() {
            return 0;
        }
        for morph in self.morphs.iter_mut() {
            morph.retain_vertices(|id| !deleted.contains(&id));
        }
        self.vertices.retain(|v| !v.deleted);
        self.rebuild_vertex_positions();
        log::debug!("purged {} deleted vertices", deleted.len());
        deleted.len()
    }

    /// Purge every vertex not referenced by a material face. Vertices marked
    /// deleted but still referenced are kept.
    pub fn purge_unused_vertices(&mut self) -> usize {
        let used = self.used_vertices();
        for vertex in &mut self.vertices {
            vertex.deleted = !used.contains(&vertex.id);
        }
        self.purge_deleted_vertices()
    }

    fn rebuild_vertex_positions(&mut self) {
        self.vertex_positions.clear();
        self.vertex_positions
            .extend(self.vertices.iter().enumerate().map(|(i, v)| (v.id, i)));
    }

    // Materials

    pub fn face_count(&self) -> usize {
        self.materials.iter().map(|m| m.faces.len()).sum()
    }

    /// Remove a material with its faces.
    ///
    /// Vertices no longer used by any remaining material are marked deleted,
    /// and material morph offsets targeting it are dropped.
    pub fn remove_material(&mut self, name: &str) -> Result<Material> {
        let material = self.materials.remove(name).ok_or_else(|| Error::NotFound {
            kind: Material::KIND,
            name: name.to_owned(),
        })?;
        let used = self.used_vertices();
        self.mark_unused_except(&used);
        for morph in self.morphs.iter_mut() {
            if let MorphKind::Material(offsets) = &mut morph.kind {
                offsets.retain(|o| o.material.as_deref() != Some(name));
            }
        }
        Ok(material)
    }

    /// Swap the face list of a material, returning the old faces.
    ///
    /// The new faces must only reference vertices of this model. Vertices
    /// left unused by every material are marked deleted.
    pub fn replace_material_faces(&mut self, name: &str, faces: Vec<Face>) -> Result<Vec<Face>> {
        if let Some(missing) = faces
            .iter()
            .flatten()
            .find(|id| !self.vertex_positions.contains_key(*id))
        {
            return Err(Error::DanglingVertex(missing.get()));
        }
        let material = self.materials.get_mut(name).ok_or_else(|| Error::NotFound {
            kind: Material::KIND,
            name: name.to_owned(),
        })?;
        let old = std::mem::replace(&mut material.faces, faces);
        let used = self.used_vertices();
        self.mark_unused_except(&used);
        Ok(old)
    }

    // Textures

    /// Texture paths in file order.
    pub fn textures(&self) -> &[String] {
        &self.textures
    }

    /// Position of a texture path, compared after normalisation.
    pub fn texture_index(&self, path: &str) -> Option<usize> {
        let wanted = normalize_texture_path(path);
        self.textures
            .iter()
            .position(|t| normalize_texture_path(t) == wanted)
    }

    /// Return the stored path equal to `path`, adding it if missing.
    pub fn ensure_texture(&mut self, path: &str) -> String {
        match self.texture_index(path) {
            Some(i) => self.textures[i].clone(),
            None => {
                self.textures.push(path.to_owned());
                path.to_owned()
            }
        }
    }

    /// Register every texture `material` references and point the material
    /// at the stored spelling of each path.
    pub fn ensure_material_textures(&mut self, material: &mut Material) {
        for slot in material.texture_refs_mut() {
            if let Some(path) = slot.as_deref() {
                *slot = Some(self.ensure_texture(path));
            }
        }
    }

    pub(crate) fn push_texture_unchecked(&mut self, path: String) {
        self.textures.push(path);
    }

    /// Drop textures no material references. Returns the number removed.
    pub fn purge_unused_textures(&mut self) -> usize {
        let used: FxHashSet<String> = self
            .materials
            .iter()
            .flat_map(Material::texture_refs)
            .map(normalize_texture_path)
            .collect();
        let before = self.textures.len();
        self.textures
            .retain(|t| used.contains(&normalize_texture_path(t)));
        before - self.textures.len()
    }

    // Integrity

    /// Every empty or duplicated name across the six named collections.
    pub fn validate(&self) -> Vec<NameIssue> {
        let mut issues = self.bones.validate();
        issues.extend(self.materials.validate());
        issues.extend(self.morphs.validate());
        issues.extend(self.display_groups.validate());
        issues.extend(self.rigid_bodies.validate());
        issues.extend(self.joints.validate());
        issues
    }

    /// Unset every reference whose target does not exist in this model.
    ///
    /// Faces and vertex morph offsets pointing at unknown vertices cannot be
    /// unset and are dropped instead. Returns the number of references
    /// cleared or dropped.
    pub fn clear_dangling_references(&mut self) -> usize {
        let bones = name_set(&self.bones);
        let materials = name_set(&self.materials);
        let morphs = name_set(&self.morphs);
        let rigid_bodies = name_set(&self.rigid_bodies);
        let textures: FxHashSet<String> =
            self.textures.iter().map(|t| normalize_texture_path(t)).collect();
        let vertices = &self.vertex_positions;
        let mut cleared = 0;

        for vertex in &mut self.vertices {
            for slot in vertex.weight.bones_mut() {
                cleared += clear_if_missing(slot, &bones);
            }
        }

        for material in self.materials.iter_mut() {
            let before = material.faces.len();
            material
                .faces
                .retain(|face| face.iter().all(|id| vertices.contains_key(id)));
            cleared += before - material.faces.len();
            for slot in material.texture_refs_mut() {
                if slot
                    .as_deref()
                    .is_some_and(|t| !textures.contains(&normalize_texture_path(t)))
                {
                    *slot = None;
                    cleared += 1;
                }
            }
        }

        for bone in self.bones.iter_mut() {
            for slot in bone.bone_refs_mut() {
                cleared += clear_if_missing(slot, &bones);
            }
        }

        for morph in self.morphs.iter_mut() {
            if morph.kind.is_mesh() {
                let before = morph.kind.len();
                morph.retain_vertices(|id| vertices.contains_key(&id));
                cleared += before - morph.kind.len();
                continue;
            }
            match &mut morph.kind {
                MorphKind::Group(offsets) => {
                    for offset in offsets {
                        cleared += clear_if_missing(&mut offset.morph, &morphs);
                    }
                }
                MorphKind::Bone(offsets) => {
                    for offset in offsets {
                        cleared += clear_if_missing(&mut offset.bone, &bones);
                    }
                }
                MorphKind::Material(offsets) => {
                    for offset in offsets {
                        cleared += clear_if_missing(&mut offset.material, &materials);
                    }
                }
                MorphKind::Vertex(_) | MorphKind::Uv { .. } => {}
            }
        }

        for group in self.display_groups.iter_mut() {
            for item in &mut group.items {
                cleared += match item {
                    DisplayItem::Bone(slot) => clear_if_missing(slot, &bones),
                    DisplayItem::Morph(slot) => clear_if_missing(slot, &morphs),
                };
            }
        }

        for body in self.rigid_bodies.iter_mut() {
            cleared += clear_if_missing(&mut body.bone, &bones);
        }

        for joint in self.joints.iter_mut() {
            cleared += clear_if_missing(&mut joint.rigid_a, &rigid_bodies);
            cleared += clear_if_missing(&mut joint.rigid_b, &rigid_bodies);
        }

        cleared
    }

    // Reporting

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            vertices: self.vertices.iter().filter(|v| !v.deleted).count(),
            faces: self.face_count(),
            textures: self.textures.len(),
            materials: self.materials.len(),
            bones: self.bones.len(),
            morphs: self.morphs.len(),
            display_groups: self.display_groups.len(),
            rigid_bodies: self.rigid_bodies.len(),
            joints: self.joints.len(),
        }
    }

    /// Vertex morphs without any offset, with their positions.
    pub fn empty_vertex_morphs(&self) -> Vec<(usize, &str)> {
        self.morphs
            .iter()
            .enumerate()
            .filter(|(_, m)| matches!(&m.kind, MorphKind::Vertex(o) if o.is_empty()))
            .map(|(i, m)| (i, m.name()))
            .collect()
    }
}

fn name_set<T: Named>(list: &NamedList<T>) -> FxHashSet<String> {
    list.names().map(str::to_owned).collect()
}

fn clear_if_missing(slot: &mut Option<String>, names: &FxHashSet<String>) -> usize {
    match slot {
        Some(name) if !names.contains(name.as_str()) => {
            *slot = None;
            1
        }
        _ => 0,
    }
}

/// Record counts of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModelSummary {
    pub vertices: usize,
    pub faces: usize,
    pub textures: usize,
    pub materials: usize,
    pub bones: usize,
    pub morphs: usize,
    pub display_groups: usize,
    pub rigid_bodies: usize,
    pub joints: usize,
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vertices, {} faces, {} textures, {} materials, {} bones, {} morphs, \
             {} display groups, {} rigid bodies, {} joints",
            self.vertices,
            self.faces,
            self.textures,
            self.materials,
            self.bones,
            self.morphs,
            self.display_groups,
            self.rigid_bodies,
            self.joints
        )
    }
}
