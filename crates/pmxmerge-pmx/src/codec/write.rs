//! PMX saving.
//!
//! Index widths are recomputed from the current collection sizes, so a saved
//! file may use different widths than the one it was loaded from. Faces are
//! written material by material; the face count in the file is their sum.

use std::io::Write;
use std::path::Path;

use pmxmerge_common::{BinaryWriter, IndexWidth};
use tempfile::NamedTempFile;

use crate::header::Header;
use crate::model::{
    normalize_texture_path, Bone, BoneFlags, BoneWeight, DisplayConnection, DisplayGroup,
    DisplayItem, Joint, Material, MaterialOffset, MaterialOffsetOp, Morph, MorphKind, RigidBody,
    Toon, Vertex, VertexId, MAX_EXTRA_UVS,
};
use crate::named::{Named, NamedList};
use crate::{Error, FxHashMap, Model, Result};

impl Model {
    /// Serialise the model into `out`.
    ///
    /// Vertices marked deleted are purged first, which is why this takes
    /// `&mut self`.
    pub fn write_to<W: Write>(&mut self, out: W) -> Result<()> {
        self.purge_deleted_vertices();
        let header = Header::for_model(self);
        let textures = self
            .textures()
            .iter()
            .enumerate()
            .rev()
            .map(|(i, t)| (normalize_texture_path(t), i))
            .collect();
        Saver {
            writer: BinaryWriter::new(out),
            header,
            model: self,
            textures,
        }
        .save()
    }

    /// Serialise the model into a byte vector.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Save the model to `path`.
    ///
    /// The file is serialised in memory, written to a temporary file next to
    /// `path` and moved into place only once complete, so a failure never
    /// leaves a partially written destination.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|err| Error::Io(err.error))?;
        log::debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

struct Saver<'m, W: Write> {
    writer: BinaryWriter<W>,
    header: Header,
    model: &'m Model,
    /// Normalised path → first position.
    textures: FxHashMap<String, usize>,
}

impl<W: Write> Saver<'_, W> {
    fn save(mut self) -> Result<()> {
        let model = self.model;
        self.writer.write_struct(&self.header.to_raw())?;

        self.text(&model.name)?;
        self.text(&model.name_en)?;
        self.text(&model.comment)?;
        self.text(&model.comment_en)?;

        self.writer.write_count(model.vertices().len())?;
        for vertex in model.vertices() {
            self.vertex(vertex)?;
        }
        log::debug!("saved {} vertices", model.vertices().len());

        let face_count = model.face_count();
        self.writer.write_count(face_count * 3)?;
        for material in &model.materials {
            for [a, b, c] in &material.faces {
                self.vertex_index(*c)?;
                self.vertex_index(*b)?;
                self.vertex_index(*a)?;
            }
        }
        log::debug!("saved {} faces from {} materials", face_count, model.materials.len());

        self.writer.write_count(model.textures().len())?;
        for path in model.textures() {
            self.text(path)?;
        }

        self.writer.write_count(model.materials.len())?;
        for material in &model.materials {
            self.material(material)?;
        }

        self.writer.write_count(model.bones.len())?;
        for bone in &model.bones {
            self.bone(bone)?;
        }

        self.writer.write_count(model.morphs.len())?;
        for morph in &model.morphs {
            self.morph(morph)?;
        }

        self.writer.write_count(model.display_groups.len())?;
        for group in &model.display_groups {
            self.display_group(group)?;
        }

        self.writer.write_count(model.rigid_bodies.len())?;
        for body in &model.rigid_bodies {
            self.rigid_body(body)?;
        }

        self.writer.write_count(model.joints.len())?;
        for joint in &model.joints {
            self.joint(joint)?;
        }
        log::debug!(
            "saved {} materials, {} bones, {} morphs",
            model.materials.len(),
            model.bones.len(),
            model.morphs.len()
        );
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        Ok(self.writer.write_text(text, self.header.encoding)?)
    }

    fn vec(&mut self, values: &[f32]) -> Result<()> {
        Ok(self.writer.write_floats(values)?)
    }

    fn f32(&mut self, value: f32) -> Result<()> {
        Ok(self.writer.write_f32(value)?)
    }

    fn vertex_index(&mut self, id: VertexId) -> Result<()> {
        let index = self
            .model
            .vertex_index(id)
            .ok_or(Error::DanglingVertex(id.get()))?;
        Ok(self
            .writer
            .write_unsigned_index(index as u32, self.header.widths.vertex)?)
    }

    /// Writes the position of `name` in `list`, or `-1` if it is unset or
    /// no longer exists.
    fn named_index<T: Named>(
        &mut self,
        list: &NamedList<T>,
        name: Option<&str>,
        width: IndexWidth,
    ) -> Result<()> {
        let index = name.and_then(|n| list.index_of(n));
        Ok(self.writer.write_signed_index(index, width)?)
    }

    fn bone_ref(&mut self, name: Option<&str>) -> Result<()> {
        let model = self.model;
        self.named_index(&model.bones, name, self.header.widths.bone)
    }

    fn texture_ref(&mut self, path: Option<&str>) -> Result<()> {
        let index = path.and_then(|p| self.textures.get(&normalize_texture_path(p)).copied());
        Ok(self
            .writer
            .write_signed_index(index, self.header.widths.texture)?)
    }

    fn vertex(&mut self, vertex: &Vertex) -> Result<()> {
        self.vec(&vertex.position)?;
        self.vec(&vertex.normal)?;
        self.vec(&vertex.uv)?;
        for i in 0..self.header.extra_uv_count as usize {
            let uv = vertex.extra_uvs.get(i).copied().unwrap_or_default();
            self.vec(&uv)?;
        }

        self.writer.write_u8(vertex.weight.tag())?;
        for bone in vertex.weight.bones() {
            self.bone_ref(bone.as_deref())?;
        }
        match &vertex.weight {
            BoneWeight::Bdef1 { .. } => {}
            BoneWeight::Bdef2 { weight, .. } => self.f32(*weight)?,
            BoneWeight::Bdef4 { weights, .. } => self.vec(weights)?,
            BoneWeight::Sdef {
                weight, c, r0, r1, ..
            } => {
                self.f32(*weight)?;
                self.vec(c)?;
                self.vec(r0)?;
                self.vec(r1)?;
            }
        }
        self.f32(vertex.edge_scale)
    }

    fn material(&mut self, material: &Material) -> Result<()> {
        self.text(material.name())?;
        self.text(&material.name_en)?;
        self.vec(&material.diffuse)?;
        self.vec(&material.specular)?;
        self.f32(material.shininess)?;
        self.vec(&material.ambient)?;
        self.writer.write_u8(material.flags.bits())?;
        self.vec(&material.edge_color)?;
        self.f32(material.edge_size)?;
        self.texture_ref(material.texture.as_deref())?;
        self.texture_ref(material.sphere_texture.as_deref())?;
        self.writer.write_i8(material.sphere_mode.as_i8())?;
        match &material.toon {
            Toon::Shared(index) => {
                self.writer.write_i8(1)?;
                self.writer.write_i8(*index)?;
            }
            Toon::Texture(path) => {
                self.writer.write_i8(0)?;
                self.texture_ref(path.as_deref())?;
            }
        }
        self.text(&material.comment)?;
        self.writer.write_count(material.faces.len() * 3)?;
        Ok(())
    }

    fn bone(&mut self, bone: &Bone) -> Result<()> {
        let flags = bone.effective_flags();
        self.text(bone.name())?;
        self.text(&bone.name_en)?;
        self.vec(&bone.location)?;
        self.bone_ref(bone.parent.as_deref())?;
        self.writer.write_i32(bone.transform_order)?;
        self.writer.write_i16(flags.bits() as i16)?;

        match &bone.display {
            DisplayConnection::Bone(target) => self.bone_ref(target.as_deref())?,
            DisplayConnection::Offset(offset) => self.vec(offset)?,
        }
        if flags.intersects(BoneFlags::ADDITIONAL_ROTATION | BoneFlags::ADDITIONAL_LOCATION) {
            if let Some(additional) = &bone.additional {
                self.bone_ref(additional.bone.as_deref())?;
                self.f32(additional.influence)?;
            }
        }
        if let Some(axis) = &bone.fixed_axis {
            self.vec(axis)?;
        }
        if let Some(local) = &bone.local_coordinate {
            self.vec(&local.x_axis)?;
            self.vec(&local.z_axis)?;
        }
        if let Some(key) = bone.external_parent {
            self.writer.write_i32(key)?;
        }
        if let Some(ik) = &bone.ik {
            self.bone_ref(ik.target.as_deref())?;
            self.writer.write_i32(ik.loop_count)?;
            self.f32(ik.limit_angle)?;
            self.writer.write_count(ik.links.len())?;
            for link in &ik.links {
                self.bone_ref(link.bone.as_deref())?;
                match &link.limit {
                    Some(limit) => {
                        self.writer.write_u8(1)?;
                        self.vec(&limit.min)?;
                        self.vec(&limit.max)?;
                    }
                    None => self.writer.write_u8(0)?,
                }
            }
        }
        Ok(())
    }

    fn morph(&mut self, morph: &Morph) -> Result<()> {
        let model = self.model;
        let widths = self.header.widths;
        self.text(morph.name())?;
        self.text(&morph.name_en)?;
        self.writer.write_i8(morph.category)?;
        if let MorphKind::Uv { channel, .. } = morph.kind {
            if channel > MAX_EXTRA_UVS {
                return Err(Error::InvalidValue {
                    field: "UV morph channel",
                    value: channel.into(),
                });
            }
        }
        self.writer.write_i8(morph.kind.tag())?;
        self.writer.write_count(morph.kind.len())?;
        match &morph.kind {
            MorphKind::Group(offsets) => {
                for offset in offsets {
                    self.named_index(&model.morphs, offset.morph.as_deref(), widths.morph)?;
                    self.f32(offset.factor)?;
                }
            }
            MorphKind::Vertex(offsets) => {
                for offset in offsets {
                    self.vertex_index(offset.vertex)?;
                    self.vec(&offset.offset)?;
                }
            }
            MorphKind::Bone(offsets) => {
                for offset in offsets {
                    self.bone_ref(offset.bone.as_deref())?;
                    self.vec(&offset.location)?;
                    self.vec(&offset.rotation)?;
                }
            }
            MorphKind::Uv { offsets, .. } => {
                for offset in offsets {
                    self.vertex_index(offset.vertex)?;
                    self.vec(&offset.offset)?;
                }
            }
            MorphKind::Material(offsets) => {
                for offset in offsets {
                    self.material_offset(offset)?;
                }
            }
        }
        Ok(())
    }

    fn material_offset(&mut self, offset: &MaterialOffset) -> Result<()> {
        let model = self.model;
        self.named_index(
            &model.materials,
            offset.material.as_deref(),
            self.header.widths.material,
        )?;
        self.writer.write_i8(match offset.op {
            MaterialOffsetOp::Multiply => 0,
            MaterialOffsetOp::Add => 1,
        })?;
        self.vec(&offset.diffuse)?;
        self.vec(&offset.specular)?;
        self.f32(offset.shininess)?;
        self.vec(&offset.ambient)?;
        self.vec(&offset.edge_color)?;
        self.f32(offset.edge_size)?;
        self.vec(&offset.texture_factor)?;
        self.vec(&offset.sphere_factor)?;
        self.vec(&offset.toon_factor)
    }

    fn display_group(&mut self, group: &DisplayGroup) -> Result<()> {
        let model = self.model;
        self.text(group.name())?;
        self.text(&group.name_en)?;
        self.writer.write_u8(group.special.into())?;
        self.writer.write_count(group.items.len())?;
        for item in &group.items {
            match item {
                DisplayItem::Bone(name) => {
                    self.writer.write_u8(DisplayItem::BONE)?;
                    self.bone_ref(name.as_deref())?;
                }
                DisplayItem::Morph(name) => {
                    self.writer.write_u8(DisplayItem::MORPH)?;
                    self.named_index(&model.morphs, name.as_deref(), self.header.widths.morph)?;
                }
            }
        }
        Ok(())
    }

    fn rigid_body(&mut self, body: &RigidBody) -> Result<()> {
        self.text(body.name())?;
        self.text(&body.name_en)?;
        self.bone_ref(body.bone.as_deref())?;
        self.writer.write_i8(body.group)?;
        self.writer.write_u16(body.no_collision_mask)?;
        self.writer.write_i8(body.shape.as_i8())?;
        self.vec(&body.size)?;
        self.vec(&body.position)?;
        self.vec(&body.rotation)?;
        self.f32(body.mass)?;
        self.f32(body.linear_damping)?;
        self.f32(body.angular_damping)?;
        self.f32(body.restitution)?;
        self.f32(body.friction)?;
        self.writer.write_i8(body.mode.as_i8())?;
        Ok(())
    }

    fn joint(&mut self, joint: &Joint) -> Result<()> {
        let model = self.model;
        let width = self.header.widths.rigid;
        self.text(joint.name())?;
        self.text(&joint.name_en)?;
        self.writer.write_i8(Joint::SPRING_6DOF)?;
        self.named_index(&model.rigid_bodies, joint.rigid_a.as_deref(), width)?;
        self.named_index(&model.rigid_bodies, joint.rigid_b.as_deref(), width)?;
        for value in [
            &joint.position,
            &joint.rotation,
            &joint.min_location,
            &joint.max_location,
            &joint.min_rotation,
            &joint.max_rotation,
            &joint.spring_location,
            &joint.spring_rotation,
        ] {
            self.vec(value)?;
        }
        Ok(())
    }
}
