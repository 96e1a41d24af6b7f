//! Material pass, together with the data that hangs off the mesh: vertices,
//! textures and vertex/UV morphs.
//!
//! Every patch vertex is imported, referenced or not; the final purge drops
//! whatever no face uses. A material new to the base arrives with its faces.
//! A material the base already has keeps its settings (unless material
//! settings are updated) and takes the patch faces.

use pmxmerge_pmx::{Face, FxHashMap, Material, Morph, MorphKind, Named, VertexId};

use super::Merger;
use crate::diagnostics::MergeEvent;
use crate::options::UpdateFeatures;
use crate::Result;

type VertexMap = FxHashMap<VertexId, VertexId>;

impl Merger<'_> {
    pub(super) fn merge_materials(&mut self) -> Result<()> {
        let patch = self.patch;

        let from = self.base.extra_uv_count();
        if patch.extra_uv_count() > from {
            self.base.set_extra_uv_count(patch.extra_uv_count())?;
            self.emit(MergeEvent::ExtraUvsWidened {
                from,
                to: patch.extra_uv_count(),
            });
        }

        let vertices = self.base.import_vertices(patch);
        for path in patch.textures() {
            self.base.ensure_texture(path);
        }

        let update_settings = self.options.update.contains(UpdateFeatures::MATERIAL_SETTING);
        for material in &patch.materials {
            let faces = rekey_faces(&material.faces, &vertices);
            let Some(index) = self.base.materials.index_of(material.name()) else {
                let mut added = material.clone();
                added.faces = faces;
                self.base.ensure_material_textures(&mut added);
                let index = self.base.materials.push(added)?;
                self.appended(Material::KIND, material.name(), index);
                continue;
            };

            let settings = update_settings.then(|| {
                let mut settings = Material::new(material.name());
                settings.copy_settings_from(material);
                self.base.ensure_material_textures(&mut settings);
                settings
            });
            let face_count = faces.len();
            if let Some(existing) = self.base.materials.at_mut(index) {
                existing.faces = faces;
                if let Some(settings) = &settings {
                    existing.copy_settings_from(settings);
                }
            }
            self.stats.faces_replaced += 1;
            self.emit(MergeEvent::FacesReplaced {
                material: material.name().to_owned(),
                faces: face_count,
            });
            if settings.is_some() {
                self.updated(Material::KIND, material.name(), index);
            }
        }

        let purged = self.base.purge_unused_textures();
        if purged > 0 {
            self.stats.textures_purged += purged;
            self.emit(MergeEvent::TexturesPurged { count: purged });
        }

        self.merge_mesh_morphs(&vertices)?;
        self.family_done(Material::KIND, self.base.materials.len());
        Ok(())
    }

    /// Same-named vertex or UV morphs of the same type gain the patch
    /// offsets; a type clash is settled in favour of the patch morph.
    fn merge_mesh_morphs(&mut self, vertices: &VertexMap) -> Result<()> {
        let patch = self.patch;
        for morph in patch.morphs.iter().filter(|m| m.kind.is_mesh()) {
            let mut incoming = morph.clone();
            rekey_offsets(&mut incoming.kind, vertices);

            let Some(index) = self.base.morphs.index_of(morph.name()) else {
                let index = self.base.morphs.push(incoming)?;
                self.appended(Morph::KIND, morph.name(), index);
                continue;
            };

            let Some(existing) = self.base.morphs.at_mut(index) else {
                continue;
            };
            if existing.kind.same_kind(&incoming.kind) {
                let added = incoming.kind.len();
                match (&mut existing.kind, incoming.kind) {
                    (MorphKind::Vertex(into), MorphKind::Vertex(from)) => into.extend(from),
                    (MorphKind::Uv { offsets: into, .. }, MorphKind::Uv { offsets: from, .. }) => {
                        into.extend(from)
                    }
                    _ => {}
                }
                self.updated(Morph::KIND, morph.name(), index);
                self.emit(MergeEvent::OffsetsConcatenated {
                    morph: morph.name().to_owned(),
                    added,
                });
            } else {
                let base_kind = existing.kind.label();
                let patch_kind = incoming.kind.label();
                self.base.morphs.replace_at(index, incoming)?;
                self.emit(MergeEvent::MorphTypeMismatch {
                    morph: morph.name().to_owned(),
                    base: base_kind,
                    patch: patch_kind,
                });
                self.replaced(Morph::KIND, morph.name(), index);
            }
        }
        Ok(())
    }
}

/// Faces with every corner moved to the base handles. Faces touching a
/// vertex that was not imported are dropped.
fn rekey_faces(faces: &[Face], vertices: &VertexMap) -> Vec<Face> {
    faces
        .iter()
        .filter_map(|&[a, b, c]| {
            Some([
                *vertices.get(&a)?,
                *vertices.get(&b)?,
                *vertices.get(&c)?,
            ])
        })
        .collect()
}

fn rekey_offsets(kind: &mut MorphKind, vertices: &VertexMap) {
    let rekey = |vertex: &mut VertexId| match vertices.get(vertex) {
        Some(&id) => {
            *vertex = id;
            true
        }
        None => false,
    };
    match kind {
        MorphKind::Vertex(offsets) => offsets.retain_mut(|o| rekey(&mut o.vertex)),
        MorphKind::Uv { offsets, .. } => offsets.retain_mut(|o| rekey(&mut o.vertex)),
        _ => {}
    }
}
