//! PMX loading.
//!
//! Sections are read strictly in file order. Positional references are
//! turned into names as soon as the referenced collection is complete: bone
//! references after the bone section, group morph references after the
//! morph section, everything else on the spot.

use std::fs;
use std::path::Path;

use pmxmerge_common::{BinaryReader, IndexWidth};

use crate::header::{Header, RawHeader};
use crate::model::{
    AdditionalTransform, AngleLimit, Bone, BoneFlags, BoneOffset, BoneWeight, DisplayConnection,
    DisplayGroup, DisplayItem, Face, GroupOffset, Ik, IkLink, Joint, LocalCoordinate, Material,
    MaterialFlags, MaterialOffset, MaterialOffsetOp, Morph, MorphKind, RigidBody, RigidMode,
    RigidShape, SphereMode, Toon, UvOffset, Vertex, VertexId, VertexOffset,
};
use crate::named::{Named, NamedList};
use crate::{Error, Model, Result};

impl Model {
    /// Load a model from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        Self::parse(&data)
    }

    /// Parse a model from an in-memory PMX file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let raw: RawHeader = reader.read_struct()?;
        let header = Header::from_raw(&raw)?;
        Loader { reader, header }.load()
    }
}

/// Bone references of one record, in the order `Bone::bone_refs_mut` yields
/// them.
type PendingRefs = Vec<Option<usize>>;

struct Loader<'a> {
    reader: BinaryReader<'a>,
    header: Header,
}

impl Loader<'_> {
    fn load(mut self) -> Result<Model> {
        let mut model = Model::new();
        model.encoding = self.header.encoding;
        model.set_extra_uv_count(self.header.extra_uv_count)?;

        model.name = self.text()?;
        model.name_en = self.text()?;
        model.comment = self.text()?;
        model.comment_en = self.text()?;

        let vertex_count = self.count()?;
        let mut vertex_ids = Vec::with_capacity(vertex_count);
        let mut weight_refs = Vec::with_capacity(vertex_count);
        for _ in 0..vertex_count {
            let (vertex, refs) = self.vertex()?;
            vertex_ids.push(model.add_vertex(vertex));
            weight_refs.push(refs);
        }
        log::debug!("loaded {} vertices", vertex_count);

        let faces = self.faces(&vertex_ids)?;
        log::debug!("loaded {} faces", faces.len());

        for _ in 0..self.count()? {
            let path = self.text()?;
            model.push_texture_unchecked(path);
        }
        log::debug!("loaded {} textures", model.textures().len());

        let material_count = self.count()?;
        let mut materials = Vec::with_capacity(material_count);
        let mut face_start = 0usize;
        for _ in 0..material_count {
            let (mut material, index_count) = self.material(model.textures())?;
            let face_end = face_start + index_count / 3;
            let owned = faces
                .get(face_start..face_end)
                .ok_or(Error::FaceCountMismatch {
                    assigned: face_end,
                    stored: faces.len(),
                })?;
            material.faces = owned.to_vec();
            face_start = face_end;
            materials.push(material);
        }
        if face_start != faces.len() {
            return Err(Error::FaceCountMismatch {
                assigned: face_start,
                stored: faces.len(),
            });
        }
        model.materials = NamedList::from_unchecked(materials);
        log::debug!("loaded {} materials", model.materials.len());

        let bone_count = self.count()?;
        let mut bones = Vec::with_capacity(bone_count);
        let mut bone_refs = Vec::with_capacity(bone_count);
        for _ in 0..bone_count {
            let (bone, refs) = self.bone()?;
            bones.push(bone);
            bone_refs.push(refs);
        }
        let bone_names = names_of(&bones);
        for (bone, refs) in bones.iter_mut().zip(bone_refs) {
            for (slot, index) in bone.bone_refs_mut().zip(refs) {
                *slot = resolve(&bone_names, index);
            }
        }
        for (vertex, refs) in model.vertices_mut().iter_mut().zip(weight_refs) {
            for (slot, index) in vertex.weight.bones_mut().iter_mut().zip(refs) {
                *slot = resolve(&bone_names, index);
            }
        }
        model.bones = NamedList::from_unchecked(bones);
        log::debug!("loaded {} bones", model.bones.len());

        let material_names = names_of(model.materials.as_slice());
        let morph_count = self.count()?;
        let mut morphs = Vec::with_capacity(morph_count);
        let mut group_refs = Vec::new();
        for index in 0..morph_count {
            let (morph, refs) = self.morph(&vertex_ids, &bone_names, &material_names)?;
            if let Some(refs) = refs {
                group_refs.push((index, refs));
            }
            morphs.push(morph);
        }
        let morph_names = names_of(&morphs);
        for (index, refs) in group_refs {
            if let MorphKind::Group(offsets) = &mut morphs[index].kind {
                for (offset, target) in offsets.iter_mut().zip(refs) {
                    offset.morph = resolve(&morph_names, target);
                }
            }
        }
        model.morphs = NamedList::from_unchecked(morphs);
        log::debug!("loaded {} morphs", model.morphs.len());

        let display_count = self.count()?;
        let mut groups = Vec::with_capacity(display_count);
        for _ in 0..display_count {
            groups.push(self.display_group(&bone_names, &morph_names)?);
        }
        model.display_groups = NamedList::from_unchecked(groups);
        log::debug!("loaded {} display groups", model.display_groups.len());

        let rigid_count = self.count()?;
        let mut bodies = Vec::with_capacity(rigid_count);
        for _ in 0..rigid_count {
            bodies.push(self.rigid_body(&bone_names)?);
        }
        let rigid_names = names_of(&bodies);
        model.rigid_bodies = NamedList::from_unchecked(bodies);
        log::debug!("loaded {} rigid bodies", model.rigid_bodies.len());

        let joint_count = self.count()?;
        let mut joints = Vec::with_capacity(joint_count);
        for _ in 0..joint_count {
            joints.push(self.joint(&rigid_names)?);
        }
        model.joints = NamedList::from_unchecked(joints);
        log::debug!("loaded {} joints", model.joints.len());

        Ok(model)
    }

    fn text(&mut self) -> Result<String> {
        Ok(self.reader.read_text(self.header.encoding)?)
    }

    /// Reads an element count. Every element takes at least one byte, so a
    /// count beyond the remaining input means the file is cut short.
    fn count(&mut self) -> Result<usize> {
        let count = self.reader.read_i32()?;
        let count = usize::try_from(count).map_err(|_| Error::InvalidValue {
            field: "record count",
            value: count,
        })?;
        if count > self.reader.remaining() {
            return Err(Error::Corrupted(pmxmerge_common::Error::UnexpectedEof {
                needed: count,
                available: self.reader.remaining(),
            }));
        }
        Ok(count)
    }

    fn index(&mut self, width: IndexWidth) -> Result<Option<usize>> {
        Ok(self.reader.read_signed_index(width)?)
    }

    fn vertex_id(&mut self, ids: &[VertexId]) -> Result<VertexId> {
        let index = self.reader.read_unsigned_index(self.header.widths.vertex)?;
        ids.get(index as usize)
            .copied()
            .ok_or(Error::DanglingVertex(index))
    }

    fn vertex(&mut self) -> Result<(Vertex, PendingRefs)> {
        let position = self.reader.read_floats()?;
        let normal = self.reader.read_floats()?;
        let uv = self.reader.read_floats()?;
        let mut extra_uvs = Vec::with_capacity(self.header.extra_uv_count as usize);
        for _ in 0..self.header.extra_uv_count {
            extra_uvs.push(self.reader.read_floats()?);
        }
        let (weight, refs) = self.bone_weight()?;
        let mut vertex = Vertex::new(position, normal, uv, weight);
        vertex.extra_uvs = extra_uvs;
        vertex.edge_scale = self.reader.read_f32()?;
        Ok((vertex, refs))
    }

    fn bone_weight(&mut self) -> Result<(BoneWeight, PendingRefs)> {
        let width = self.header.widths.bone;
        let tag = self.reader.read_u8()?;
        let mut refs = PendingRefs::with_capacity(4);
        let weight = match tag {
            BoneWeight::BDEF1 => {
                refs.push(self.index(width)?);
                BoneWeight::Bdef1 { bone: None }
            }
            BoneWeight::BDEF2 => {
                refs.push(self.index(width)?);
                refs.push(self.index(width)?);
                BoneWeight::Bdef2 {
                    bones: Default::default(),
                    weight: self.reader.read_f32()?,
                }
            }
            BoneWeight::BDEF4 => {
                for _ in 0..4 {
                    refs.push(self.index(width)?);
                }
                BoneWeight::Bdef4 {
                    bones: Default::default(),
                    weights: self.reader.read_floats()?,
                }
            }
            BoneWeight::SDEF => {
                refs.push(self.index(width)?);
                refs.push(self.index(width)?);
                BoneWeight::Sdef {
                    bones: Default::default(),
                    weight: self.reader.read_f32()?,
                    c: self.reader.read_floats()?,
                    r0: self.reader.read_floats()?,
                    r1: self.reader.read_floats()?,
                }
            }
            BoneWeight::QDEF => return Err(Error::Unsupported("QDEF bone weights".into())),
            other => {
                return Err(Error::InvalidValue {
                    field: "bone weight type",
                    value: other.into(),
                })
            }
        };
        Ok((weight, refs))
    }

    fn faces(&mut self, ids: &[VertexId]) -> Result<Vec<Face>> {
        let index_count = self.count()?;
        if index_count % 3 != 0 {
            return Err(Error::InvalidValue {
                field: "face index count",
                value: index_count as i32,
            });
        }
        let mut faces = Vec::with_capacity(index_count / 3);
        for _ in 0..index_count / 3 {
            let c = self.vertex_id(ids)?;
            let b = self.vertex_id(ids)?;
            let a = self.vertex_id(ids)?;
            faces.push([a, b, c]);
        }
        Ok(faces)
    }

    fn texture_ref(&mut self, textures: &[String]) -> Result<Option<String>> {
        let index = self.index(self.header.widths.texture)?;
        Ok(index.and_then(|i| textures.get(i)).cloned())
    }

    /// Returns the material and its face index count.
    fn material(&mut self, textures: &[String]) -> Result<(Material, usize)> {
        let mut material = Material::new(self.text()?);
        material.name_en = self.text()?;
        material.diffuse = self.reader.read_floats()?;
        material.specular = self.reader.read_floats()?;
        material.shininess = self.reader.read_f32()?;
        material.ambient = self.reader.read_floats()?;
        material.flags = MaterialFlags::from_bits_retain(self.reader.read_u8()?);
        material.edge_color = self.reader.read_floats()?;
        material.edge_size = self.reader.read_f32()?;
        material.texture = self.texture_ref(textures)?;
        material.sphere_texture = self.texture_ref(textures)?;
        material.sphere_mode = SphereMode::from_i8(self.reader.read_i8()?)?;
        material.toon = if self.reader.read_i8()? == 1 {
            Toon::Shared(self.reader.read_i8()?)
        } else {
            Toon::Texture(self.texture_ref(textures)?)
        };
        material.comment = self.text()?;
        let index_count = self.reader.read_i32()?;
        let index_count = usize::try_from(index_count).map_err(|_| Error::InvalidValue {
            field: "material vertex count",
            value: index_count,
        })?;
        if index_count % 3 != 0 {
            return Err(Error::InvalidValue {
                field: "material index count",
                value: index_count as i32,
            });
        }
        Ok((material, index_count))
    }

    fn bone(&mut self) -> Result<(Bone, PendingRefs)> {
        let width = self.header.widths.bone;
        let mut bone = Bone::new(self.text()?);
        let mut refs = PendingRefs::new();
        bone.name_en = self.text()?;
        bone.location = self.reader.read_floats()?;
        refs.push(self.index(width)?);
        bone.transform_order = self.reader.read_i32()?;

        let flags = BoneFlags::from_bits_retain(self.reader.read_i16()? as u16);
        bone.flags = flags;

        bone.display = if flags.contains(BoneFlags::DISPLAY_BONE) {
            refs.push(self.index(width)?);
            DisplayConnection::Bone(None)
        } else {
            DisplayConnection::Offset(self.reader.read_floats()?)
        };

        let rotation = flags.contains(BoneFlags::ADDITIONAL_ROTATION);
        let location = flags.contains(BoneFlags::ADDITIONAL_LOCATION);
        if rotation || location {
            refs.push(self.index(width)?);
            bone.additional = Some(AdditionalTransform {
                bone: None,
                influence: self.reader.read_f32()?,
                rotation,
                location,
            });
        }

        if flags.contains(BoneFlags::FIXED_AXIS) {
            bone.fixed_axis = Some(self.reader.read_floats()?);
        }
        if flags.contains(BoneFlags::LOCAL_COORDINATE) {
            bone.local_coordinate = Some(LocalCoordinate {
                x_axis: self.reader.read_floats()?,
                z_axis: self.reader.read_floats()?,
            });
        }
        if flags.contains(BoneFlags::EXTERNAL_PARENT) {
            bone.external_parent = Some(self.reader.read_i32()?);
        }

        if flags.contains(BoneFlags::IK) {
            refs.push(self.index(width)?);
            let loop_count = self.reader.read_i32()?;
            let limit_angle = self.reader.read_f32()?;
            let link_count = self.count()?;
            let mut links = Vec::with_capacity(link_count);
            for _ in 0..link_count {
                refs.push(self.index(width)?);
                let limit = if self.reader.read_u8()? == 1 {
                    Some(AngleLimit {
                        min: self.reader.read_floats()?,
                        max: self.reader.read_floats()?,
                    })
                } else {
                    None
                };
                links.push(IkLink { bone: None, limit });
            }
            bone.ik = Some(Ik {
                target: None,
                loop_count,
                limit_angle,
                links,
            });
        }

        Ok((bone, refs))
    }

    /// Returns the morph and, for group morphs, the raw morph indices of its
    /// offsets.
    fn morph(
        &mut self,
        vertex_ids: &[VertexId],
        bones: &[Option<String>],
        materials: &[Option<String>],
    ) -> Result<(Morph, Option<PendingRefs>)> {
        let name = self.text()?;
        let name_en = self.text()?;
        let category = self.reader.read_i8()?;
        let tag = self.reader.read_i8()?;
        let count = self.count()?;
        let widths = self.header.widths;
        let mut group_refs = None;

        let kind = match tag {
            MorphKind::GROUP => {
                let mut refs = PendingRefs::with_capacity(count);
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    refs.push(self.index(widths.morph)?);
                    offsets.push(GroupOffset {
                        morph: None,
                        factor: self.reader.read_f32()?,
                    });
                }
                group_refs = Some(refs);
                MorphKind::Group(offsets)
            }
            MorphKind::VERTEX => {
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    offsets.push(VertexOffset {
                        vertex: self.vertex_id(vertex_ids)?,
                        offset: self.reader.read_floats()?,
                    });
                }
                MorphKind::Vertex(offsets)
            }
            MorphKind::BONE => {
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    let bone = resolve(bones, self.index(widths.bone)?);
                    let location = self.reader.read_floats()?;
                    let mut rotation: [f32; 4] = self.reader.read_floats()?;
                    if rotation == [0.0; 4] {
                        rotation = [0.0, 0.0, 0.0, 1.0];
                    }
                    offsets.push(BoneOffset {
                        bone,
                        location,
                        rotation,
                    });
                }
                MorphKind::Bone(offsets)
            }
            tag @ MorphKind::UV..=7 => {
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    offsets.push(UvOffset {
                        vertex: self.vertex_id(vertex_ids)?,
                        offset: self.reader.read_floats()?,
                    });
                }
                MorphKind::Uv {
                    channel: (tag - MorphKind::UV) as u8,
                    offsets,
                }
            }
            MorphKind::MATERIAL => {
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    offsets.push(self.material_offset(materials)?);
                }
                MorphKind::Material(offsets)
            }
            MorphKind::FLIP => return Err(Error::Unsupported("flip morphs".into())),
            MorphKind::IMPULSE => return Err(Error::Unsupported("impulse morphs".into())),
            other => {
                return Err(Error::InvalidValue {
                    field: "morph type",
                    value: other.into(),
                })
            }
        };

        let mut morph = Morph::new(name, kind);
        morph.name_en = name_en;
        morph.category = category;
        Ok((morph, group_refs))
    }

    fn material_offset(&mut self, materials: &[Option<String>]) -> Result<MaterialOffset> {
        let material = resolve(materials, self.index(self.header.widths.material)?);
        let op = match self.reader.read_i8()? {
            0 => MaterialOffsetOp::Multiply,
            1 => MaterialOffsetOp::Add,
            other => {
                return Err(Error::InvalidValue {
                    field: "material morph operation",
                    value: other.into(),
                })
            }
        };
        Ok(MaterialOffset {
            material,
            op,
            diffuse: self.reader.read_floats()?,
            specular: self.reader.read_floats()?,
            shininess: self.reader.read_f32()?,
            ambient: self.reader.read_floats()?,
            edge_color: self.reader.read_floats()?,
            edge_size: self.reader.read_f32()?,
            texture_factor: self.reader.read_floats()?,
            sphere_factor: self.reader.read_floats()?,
            toon_factor: self.reader.read_floats()?,
        })
    }

    fn display_group(
        &mut self,
        bones: &[Option<String>],
        morphs: &[Option<String>],
    ) -> Result<DisplayGroup> {
        let mut group = DisplayGroup::new(self.text()?);
        group.name_en = self.text()?;
        group.special = self.reader.read_u8()? == 1;
        let count = self.count()?;
        group.items.reserve(count);
        for _ in 0..count {
            let item = match self.reader.read_u8()? {
                DisplayItem::BONE => {
                    DisplayItem::Bone(resolve(bones, self.index(self.header.widths.bone)?))
                }
                DisplayItem::MORPH => {
                    DisplayItem::Morph(resolve(morphs, self.index(self.header.widths.morph)?))
                }
                other => {
                    return Err(Error::InvalidValue {
                        field: "display item type",
                        value: other.into(),
                    })
                }
            };
            group.items.push(item);
        }
        Ok(group)
    }

    fn rigid_body(&mut self, bones: &[Option<String>]) -> Result<RigidBody> {
        let mut body = RigidBody::new(self.text()?);
        body.name_en = self.text()?;
        body.bone = resolve(bones, self.index(self.header.widths.bone)?);
        body.group = self.reader.read_i8()?;
        body.no_collision_mask = self.reader.read_u16()?;
        body.shape = RigidShape::from_i8(self.reader.read_i8()?)?;
        body.size = self.reader.read_floats()?;
        body.position = self.reader.read_floats()?;
        body.rotation = self.reader.read_floats()?;
        body.mass = self.reader.read_f32()?;
        body.linear_damping = self.reader.read_f32()?;
        body.angular_damping = self.reader.read_f32()?;
        body.restitution = self.reader.read_f32()?;
        body.friction = self.reader.read_f32()?;
        body.mode = RigidMode::from_i8(self.reader.read_i8()?)?;
        Ok(body)
    }

    /// Reads a joint. Once the name and both rigid body references are in,
    /// a stream ending early leaves the remaining vectors at zero.
    fn joint(&mut self, rigid_bodies: &[Option<String>]) -> Result<Joint> {
        let mut joint = Joint::new(self.text()?);
        joint.name_en = self.text()?;
        let mode = self.reader.read_i8()?;
        if mode != Joint::SPRING_6DOF {
            return Err(Error::Unsupported(format!("joint mode {mode}")));
        }
        let width = self.header.widths.rigid;
        joint.rigid_a = resolve(rigid_bodies, self.index(width)?);
        joint.rigid_b = resolve(rigid_bodies, self.index(width)?);

        let name = joint.name().to_owned();
        let tail = [
            &mut joint.position,
            &mut joint.rotation,
            &mut joint.min_location,
            &mut joint.max_location,
            &mut joint.min_rotation,
            &mut joint.max_rotation,
            &mut joint.spring_location,
            &mut joint.spring_rotation,
        ];
        for (read, field) in tail.into_iter().enumerate() {
            match self.reader.read_floats() {
                Ok(value) => *field = value,
                Err(err) if err.is_eof() => {
                    log::warn!(
                        "joint '{}' is truncated after {} of 8 vectors; the rest default to zero",
                        name,
                        read
                    );
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(joint)
    }
}

/// Names by position, with empty names treated as unresolvable.
fn names_of<T: Named>(records: &[T]) -> Vec<Option<String>> {
    records
        .iter()
        .map(|r| Some(r.name()).filter(|n| !n.is_empty()).map(str::to_owned))
        .collect()
}

fn resolve(names: &[Option<String>], index: Option<usize>) -> Option<String> {
    index.and_then(|i| names.get(i)).cloned().flatten()
}
