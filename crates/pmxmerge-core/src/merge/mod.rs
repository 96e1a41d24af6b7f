//! The merge engine.
//!
//! A merge copies records from a patch model into a base model family by
//! family: bones, then materials with their mesh data, then the remaining
//! morphs, physics and display groups. Records are matched by name, and
//! since every cross reference in the model graph is a name, copied records
//! need no index remapping. Only vertex handles are re-keyed, when the patch
//! vertices are imported into the base.
//!
//! Both inputs are validated before anything changes, and the merge runs on
//! a working copy of the base that replaces it only on success.

mod bones;
mod display;
mod mesh;
mod morphs;
mod physics;

use std::fmt;

use pmxmerge_pmx::{Model, Named, NamedList};

use crate::diagnostics::{Diagnostics, MergeEvent};
use crate::options::MergeOptions;
use crate::validate::ValidationReport;
use crate::{Error, Result};

/// Counts of what a merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub appended: usize,
    pub updated: usize,
    pub replaced: usize,
    pub faces_replaced: usize,
    pub textures_purged: usize,
    pub vertices_purged: usize,
    pub references_cleared: usize,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} appended, {} updated, {} replaced, {} materials re-meshed, \
             {} textures and {} vertices purged, {} references unset",
            self.appended,
            self.updated,
            self.replaced,
            self.faces_replaced,
            self.textures_purged,
            self.vertices_purged,
            self.references_cleared
        )
    }
}

/// Merge `patch` into `base`.
///
/// Fails with [`Error::Validation`] if either model holds an empty or
/// duplicate name, in which case `base` is left untouched. References that
/// do not resolve in the result are unset rather than treated as errors.
pub fn merge_models(
    base: &mut Model,
    patch: &Model,
    options: &MergeOptions,
    diagnostics: &mut dyn Diagnostics,
) -> Result<MergeStats> {
    let report = ValidationReport::for_inputs(base, patch);
    if !report.is_empty() {
        return Err(Error::Validation(report));
    }

    let mut work = base.clone();
    let stats = Merger {
        base: &mut work,
        patch,
        options: *options,
        diagnostics,
        stats: MergeStats::default(),
    }
    .run()?;
    *base = work;
    Ok(stats)
}

/// Shared state of the merge passes. Each pass lives in its own module.
struct Merger<'a> {
    base: &'a mut Model,
    patch: &'a Model,
    options: MergeOptions,
    diagnostics: &'a mut dyn Diagnostics,
    stats: MergeStats,
}

impl Merger<'_> {
    fn run(mut self) -> Result<MergeStats> {
        self.merge_bones()?;
        self.merge_materials()?;
        self.merge_morphs()?;
        self.merge_physics()?;
        self.merge_display()?;

        let purged = self.base.purge_unused_vertices();
        self.stats.vertices_purged += purged;
        self.emit(MergeEvent::VerticesPurged { count: purged });

        let cleared = self.base.clear_dangling_references();
        self.stats.references_cleared += cleared;
        self.emit(MergeEvent::DanglingReferencesCleared { count: cleared });

        Ok(self.stats)
    }

    fn emit(&mut self, event: MergeEvent) {
        self.diagnostics.emit(event);
    }

    fn appended(&mut self, kind: &'static str, name: &str, index: usize) {
        self.stats.appended += 1;
        self.emit(MergeEvent::Appended {
            kind,
            name: name.to_owned(),
            index,
        });
    }

    fn updated(&mut self, kind: &'static str, name: &str, index: usize) {
        self.stats.updated += 1;
        self.emit(MergeEvent::Updated {
            kind,
            name: name.to_owned(),
            index,
        });
    }

    fn replaced(&mut self, kind: &'static str, name: &str, index: usize) {
        self.stats.replaced += 1;
        self.emit(MergeEvent::Replaced {
            kind,
            name: name.to_owned(),
            index,
        });
    }

    fn family_done(&mut self, kind: &'static str, count: usize) {
        self.emit(MergeEvent::FamilyMerged { kind, count });
    }

    /// Append every record of `source` whose name `list` lacks.
    fn append_missing<T: Named + Clone>(
        &mut self,
        source: &NamedList<T>,
        list: fn(&mut Model) -> &mut NamedList<T>,
    ) -> Result<()> {
        for record in source {
            if list(self.base).contains(record.name()) {
                continue;
            }
            let index = list(self.base).push(record.clone())?;
            self.appended(T::KIND, record.name(), index);
        }
        Ok(())
    }

    /// Replace, in place, every record of `list` that `source` also holds.
    fn replace_existing<T: Named + Clone>(
        &mut self,
        source: &NamedList<T>,
        list: fn(&mut Model) -> &mut NamedList<T>,
    ) -> Result<()> {
        for record in source {
            if let Some(index) = list(self.base).index_of(record.name()) {
                list(self.base).replace_at(index, record.clone())?;
                self.replaced(T::KIND, record.name(), index);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{AppendFeatures, UpdateFeatures};
    use pmxmerge_pmx::fixtures::{add_mesh, bone, bone_chain, fresh_faces, sample_model};
    use pmxmerge_pmx::{
        Bone, BoneOffset, DisplayGroup, DisplayItem, GroupOffset, Joint, Material, Morph,
        MorphKind, RigidBody, Toon, VertexOffset,
    };

    fn merge(base: &mut Model, patch: &Model, options: MergeOptions) -> Vec<MergeEvent> {
        let mut events = Vec::new();
        merge_models(base, patch, &options, &mut events).unwrap();
        events
    }

    fn names<T: Named>(list: &NamedList<T>) -> Vec<&str> {
        list.names().collect()
    }

    #[test]
    fn test_bone_append_keeps_base_settings() {
        let mut base = bone_chain(&["root", "arm_L"]);
        base.bones.get_mut("arm_L").unwrap().location = [1.0, 0.0, 0.0];
        let mut patch = bone_chain(&["arm_L", "arm_R"]);
        patch.bones.get_mut("arm_L").unwrap().location = [9.0, 9.0, 9.0];

        merge(&mut base, &patch, MergeOptions::minimal());

        assert_eq!(names(&base.bones), ["root", "arm_L", "arm_R"]);
        assert_eq!(base.bones.get("arm_R").unwrap().parent.as_deref(), Some("arm_L"));
        let arm = base.bones.get("arm_L").unwrap();
        assert_eq!(arm.location, [1.0, 0.0, 0.0]);
        assert_eq!(arm.parent.as_deref(), Some("root"));
    }

    #[test]
    fn test_bone_update_grains() {
        let base = bone_chain(&["root", "arm_L"]);
        let mut patch = bone_chain(&["arm_L"]);
        {
            let arm = patch.bones.get_mut("arm_L").unwrap();
            arm.location = [2.0, 0.0, 0.0];
            arm.transform_order = 4;
            arm.name_en = "left arm".into();
        }

        let mut located = base.clone();
        merge(
            &mut located,
            &patch,
            MergeOptions::minimal().with_update(UpdateFeatures::BONE_LOCATION),
        );
        let arm = located.bones.get("arm_L").unwrap();
        assert_eq!(arm.location, [2.0, 0.0, 0.0]);
        assert_eq!(arm.transform_order, 0);
        assert_eq!(arm.parent.as_deref(), Some("root"));

        let mut configured = base.clone();
        merge(
            &mut configured,
            &patch,
            MergeOptions::minimal().with_update(UpdateFeatures::BONE_SETTING),
        );
        let arm = configured.bones.get("arm_L").unwrap();
        assert_eq!(arm.location, [0.0, 0.0, 0.0]);
        assert_eq!(arm.transform_order, 4);
        assert_eq!(arm.name_en, "left arm");
        // The patch bone has no parent; the unset parent is copied too.
        assert_eq!(arm.parent, None);
        assert_eq!(configured.bones.index_of("arm_L"), Some(1));
    }

    #[test]
    fn test_material_faces_replaced_and_old_vertices_purged() {
        let mut base = bone_chain(&["root"]);
        add_mesh(&mut base, "skin", 100, "root");
        add_mesh(&mut base, "body", 10, "root");
        base.materials.get_mut("skin").unwrap().diffuse = [1.0, 0.0, 0.0, 1.0];

        let mut patch = bone_chain(&["root"]);
        add_mesh(&mut patch, "skin", 120, "root");
        patch.materials.get_mut("skin").unwrap().diffuse = [0.0, 0.0, 1.0, 1.0];

        let events = merge(&mut base, &patch, MergeOptions::minimal());

        assert_eq!(names(&base.materials), ["skin", "body"]);
        let skin = base.materials.get("skin").unwrap();
        assert_eq!(skin.faces.len(), 120);
        assert_eq!(skin.diffuse, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(base.vertices().len(), 10 * 3 + 120 * 3);
        assert!(events.contains(&MergeEvent::FacesReplaced {
            material: "skin".into(),
            faces: 120,
        }));
        assert!(events.contains(&MergeEvent::VerticesPurged { count: 300 }));
    }

    #[test]
    fn test_material_settings_update_leaves_faces_alone() {
        let mut base = bone_chain(&["root"]);
        add_mesh(&mut base, "skin", 4, "root");
        let mut patch = bone_chain(&["root"]);
        add_mesh(&mut patch, "skin", 2, "root");
        {
            let skin = patch.materials.get_mut("skin").unwrap();
            skin.diffuse = [0.0, 0.0, 1.0, 1.0];
            skin.texture = Some("tex/skin.png".into());
        }
        patch.ensure_texture("tex/skin.png");

        merge(
            &mut base,
            &patch,
            MergeOptions::minimal().with_update(UpdateFeatures::MATERIAL_SETTING),
        );
        let skin = base.materials.get("skin").unwrap();
        assert_eq!(skin.diffuse, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(skin.texture.as_deref(), Some("tex/skin.png"));
        assert_eq!(skin.faces.len(), 2);
        assert_eq!(base.textures(), ["tex/skin.png"]);
    }

    #[test]
    fn test_new_material_textures_are_shared_and_purged() {
        let mut base = bone_chain(&["root"]);
        add_mesh(&mut base, "body", 1, "root");
        base.ensure_texture("tex\\shared.png");
        base.ensure_texture("old\\unused.png");
        base.materials.get_mut("body").unwrap().texture = Some("tex\\shared.png".into());

        let mut patch = bone_chain(&["root"]);
        add_mesh(&mut patch, "hat", 1, "root");
        patch.ensure_texture("./tex/shared.png");
        patch.ensure_texture("tex/toon.bmp");
        {
            let hat = patch.materials.get_mut("hat").unwrap();
            hat.texture = Some("./tex/shared.png".into());
            hat.toon = Toon::Texture(Some("tex/toon.bmp".into()));
        }

        let events = merge(&mut base, &patch, MergeOptions::minimal());
        assert_eq!(base.textures(), ["tex\\shared.png", "tex/toon.bmp"]);
        let hat = base.materials.get("hat").unwrap();
        assert_eq!(hat.texture.as_deref(), Some("tex\\shared.png"));
        assert!(events.contains(&MergeEvent::TexturesPurged { count: 1 }));
    }

    #[test]
    fn test_vertex_morphs_concatenate_and_mismatches_replace() {
        let mut base = bone_chain(&["root"]);
        let base_ids = add_mesh(&mut base, "body", 1, "root");
        let offsets = |ids: &[pmxmerge_pmx::VertexId]| {
            ids.iter()
                .map(|&vertex| VertexOffset {
                    vertex,
                    offset: [0.0, 1.0, 0.0],
                })
                .collect::<Vec<_>>()
        };
        base.morphs
            .push(Morph::new("smile", MorphKind::Vertex(offsets(&base_ids))))
            .unwrap();
        base.morphs
            .push(Morph::new("blink", MorphKind::Group(Vec::new())))
            .unwrap();

        let mut patch = bone_chain(&["root"]);
        let patch_ids = add_mesh(&mut patch, "hat", 1, "root");
        patch
            .morphs
            .push(Morph::new("smile", MorphKind::Vertex(offsets(&patch_ids[..2]))))
            .unwrap();
        patch
            .morphs
            .push(Morph::new("blink", MorphKind::Vertex(offsets(&patch_ids))))
            .unwrap();

        // Mesh morphs merge even when morph append and update are off.
        let events = merge(&mut base, &patch, MergeOptions::minimal());

        let smile = base.morphs.get("smile").unwrap();
        assert_eq!(smile.kind.len(), 5);
        let blink = base.morphs.get("blink").unwrap();
        assert!(matches!(&blink.kind, MorphKind::Vertex(o) if o.len() == 3));
        assert_eq!(base.morphs.index_of("blink"), Some(1));

        let MorphKind::Vertex(offsets) = &smile.kind else {
            panic!("smile should stay a vertex morph");
        };
        let hat = &base.materials.get("hat").unwrap().faces[0];
        assert_eq!(offsets[3].vertex, hat[0]);
        assert!(events.contains(&MergeEvent::MorphTypeMismatch {
            morph: "blink".into(),
            base: "group",
            patch: "vertex",
        }));
    }

    #[test]
    fn test_morph_append_and_update_are_independent() {
        let mut base = bone_chain(&["root"]);
        base.morphs
            .push(Morph::new("raise", MorphKind::Bone(Vec::new())))
            .unwrap();
        let mut patch = bone_chain(&["root"]);
        patch
            .morphs
            .push(Morph::new(
                "raise",
                MorphKind::Bone(vec![BoneOffset {
                    bone: Some("root".into()),
                    location: [0.0, 1.0, 0.0],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                }]),
            ))
            .unwrap();
        patch
            .morphs
            .push(Morph::new(
                "combo",
                MorphKind::Group(vec![GroupOffset {
                    morph: Some("raise".into()),
                    factor: 1.0,
                }]),
            ))
            .unwrap();

        let mut appended = base.clone();
        merge(
            &mut appended,
            &patch,
            MergeOptions::minimal().with_append(AppendFeatures::MORPH),
        );
        assert_eq!(names(&appended.morphs), ["raise", "combo"]);
        assert!(appended.morphs.get("raise").unwrap().kind.is_empty());

        let mut updated = base.clone();
        merge(
            &mut updated,
            &patch,
            MergeOptions::minimal().with_update(UpdateFeatures::MORPH),
        );
        assert_eq!(names(&updated.morphs), ["raise"]);
        assert_eq!(updated.morphs.get("raise").unwrap().kind.len(), 1);
    }

    #[test]
    fn test_physics_merge() {
        let mut base = bone_chain(&["root"]);
        base.rigid_bodies.push(RigidBody::new("head")).unwrap();
        let mut patch = bone_chain(&["root"]);
        let mut head = RigidBody::new("head");
        head.mass = 3.0;
        patch.rigid_bodies.push(head).unwrap();
        patch.rigid_bodies.push(RigidBody::new("hair")).unwrap();
        patch
            .joints
            .push(Joint::new("neck").between("head", "hair"))
            .unwrap();

        let mut skipped = base.clone();
        merge(&mut skipped, &patch, MergeOptions::minimal());
        assert_eq!(skipped.rigid_bodies.len(), 1);
        assert!(skipped.joints.is_empty());

        let options = MergeOptions::minimal()
            .with_append(AppendFeatures::PHYSICS)
            .with_update(UpdateFeatures::PHYSICS);
        merge(&mut base, &patch, options);
        assert_eq!(names(&base.rigid_bodies), ["head", "hair"]);
        assert_eq!(base.rigid_bodies.get("head").unwrap().mass, 3.0);
        let neck = base.joints.get("neck").unwrap();
        assert_eq!(neck.rigid_b.as_deref(), Some("hair"));
    }

    #[test]
    fn test_display_groups_merge_as_sets() {
        let mut base = bone_chain(&["root", "arm_L", "arm_R"]);
        let mut arms = DisplayGroup::new("arms");
        arms.items = vec![
            DisplayItem::Bone(Some("arm_L".into())),
            DisplayItem::Bone(Some("root".into())),
        ];
        base.display_groups.push(arms).unwrap();

        let mut patch = bone_chain(&["root", "arm_L", "arm_R"]);
        let mut arms = DisplayGroup::new("arms");
        arms.items = vec![
            DisplayItem::Bone(Some("arm_R".into())),
            DisplayItem::Bone(Some("arm_L".into())),
        ];
        patch.display_groups.push(arms).unwrap();
        patch.display_groups.push(DisplayGroup::new("extra")).unwrap();

        let mut appended = base.clone();
        merge(
            &mut appended,
            &patch,
            MergeOptions::minimal().with_append(AppendFeatures::DISPLAY),
        );
        assert_eq!(names(&appended.display_groups), ["arms", "extra"]);
        assert_eq!(
            appended.display_groups.get("arms").unwrap().items,
            vec![
                DisplayItem::Bone(Some("arm_L".into())),
                DisplayItem::Bone(Some("root".into())),
                DisplayItem::Bone(Some("arm_R".into())),
            ]
        );

        merge(&mut base, &patch, MergeOptions::default());
        assert_eq!(
            base.display_groups.get("arms").unwrap().items,
            patch.display_groups.get("arms").unwrap().items
        );
    }

    #[test]
    fn test_duplicate_names_refuse_without_mutation() {
        let mut base = bone_chain(&["root"]);
        add_mesh(&mut base, "body", 2, "root");
        let before = base.summary();

        let mut patch = bone_chain(&["root"]);
        patch.bones = NamedList::from_unchecked(vec![
            bone("root", None),
            bone("eye", Some("root")),
            bone("eye", Some("root")),
        ]);
        add_mesh(&mut patch, "hat", 2, "root");

        let mut events = Vec::new();
        let err =
            merge_models(&mut base, &patch, &MergeOptions::default(), &mut events).unwrap_err();
        let Error::Validation(report) = err else {
            panic!("expected a validation error, got {err}");
        };
        assert_eq!(report.len(), 1);
        let issue = &report.issues[0].1;
        assert_eq!(issue.name, "eye");
        assert_eq!(issue.index, 2);
        assert_eq!(
            issue.problem,
            pmxmerge_pmx::NameProblem::Duplicate { first: 1 }
        );

        assert!(events.is_empty());
        assert_eq!(base.summary(), before);
        assert_eq!(names(&base.bones), ["root"]);
    }

    #[test]
    fn test_unresolvable_references_are_unset() {
        let mut base = bone_chain(&["root"]);
        let mut patch = bone_chain(&["root"]);
        patch.bones.push(bone("tail", Some("ghost"))).unwrap();
        let mut stray = Material::new("stray");
        stray.faces = fresh_faces(&mut patch, 1, "ghost");
        patch.materials.push(stray).unwrap();

        let stats = merge_models(&mut base, &patch, &MergeOptions::default(), &mut ()).unwrap();
        assert_eq!(base.bones.get("tail").unwrap().parent, None);
        assert!(base
            .vertices()
            .iter()
            .all(|v| v.weight.bones() == [None]));
        assert_eq!(stats.references_cleared, 4);
    }

    #[test]
    fn test_sample_models_merge_and_save() {
        let mut base = sample_model();
        let mut patch = sample_model();
        patch.bones.push(bone("arm_R", Some("root"))).unwrap();
        add_mesh(&mut patch, "glove", 2, "arm_R");

        let stats = merge_models(&mut base, &patch, &MergeOptions::default(), &mut ()).unwrap();
        assert_eq!(stats.appended, 2);
        assert_eq!(base.materials.len(), 3);
        assert_eq!(base.clone().clear_dangling_references(), 0);

        let bytes = base.to_bytes().unwrap();
        let reloaded = Model::parse(&bytes).unwrap();
        assert_eq!(reloaded.summary(), base.summary());
    }

    /// Deterministic generator for the randomised merge checks.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: usize) -> usize {
            (self.next() % n as u64) as usize
        }

        fn chance(&mut self) -> bool {
            self.next() & 1 == 1
        }

        /// A random subset of `pool`, rotated to a random start.
        fn subset<'p>(&mut self, pool: &[&'p str]) -> Vec<&'p str> {
            let start = self.below(pool.len());
            (0..pool.len())
                .map(|i| pool[(start + i) % pool.len()])
                .filter(|_| self.chance())
                .collect()
        }

        fn pick<'p>(&mut self, pool: &[&'p str]) -> &'p str {
            pool[self.below(pool.len())]
        }
    }

    const BONES: &[&str] = &["root", "hip", "spine", "head", "arm_L", "arm_R", "eye"];
    const MATERIALS: &[&str] = &["skin", "hair", "cloth", "shoe"];
    const MORPHS: &[&str] = &["smile", "blink", "angry", "wink"];
    const RIGID_BODIES: &[&str] = &["r_head", "r_hair", "r_skirt"];
    const JOINTS: &[&str] = &["j_neck", "j_hair", "j_skirt"];

    fn random_model(rng: &mut XorShift) -> Model {
        let mut model = Model::new();
        for name in rng.subset(BONES) {
            let mut bone = Bone::new(name);
            bone.parent = Some(rng.pick(BONES).to_owned()).filter(|_| rng.chance());
            model.bones.push(bone).unwrap();
        }
        let mut vertices = Vec::new();
        for name in rng.subset(MATERIALS) {
            let faces = 1 + rng.below(4);
            let bone = rng.pick(BONES);
            vertices.extend(add_mesh(&mut model, name, faces, bone));
        }
        for name in rng.subset(MORPHS) {
            let kind = match rng.below(3) {
                0 if !vertices.is_empty() => MorphKind::Vertex(vec![VertexOffset {
                    vertex: vertices[rng.below(vertices.len())],
                    offset: [0.0, 0.1, 0.0],
                }]),
                1 => MorphKind::Group(vec![GroupOffset {
                    morph: Some(rng.pick(MORPHS).to_owned()),
                    factor: 1.0,
                }]),
                _ => MorphKind::Bone(vec![BoneOffset {
                    bone: Some(rng.pick(BONES).to_owned()),
                    location: [0.0; 3],
                    rotation: [0.0, 0.0, 0.0, 1.0],
                }]),
            };
            model.morphs.push(Morph::new(name, kind)).unwrap();
        }
        for name in rng.subset(RIGID_BODIES) {
            let mut body = RigidBody::new(name);
            body.bone = Some(rng.pick(BONES).to_owned());
            model.rigid_bodies.push(body).unwrap();
        }
        for name in rng.subset(JOINTS) {
            let joint = Joint::new(name).between(rng.pick(RIGID_BODIES), rng.pick(RIGID_BODIES));
            model.joints.push(joint).unwrap();
        }
        let mut group = DisplayGroup::new("main");
        group.items = (0..3)
            .map(|_| DisplayItem::Bone(Some(rng.pick(BONES).to_owned())))
            .collect();
        group
            .items
            .push(DisplayItem::Morph(Some(rng.pick(MORPHS).to_owned())));
        model.display_groups.push(group).unwrap();
        model
    }

    #[test]
    fn test_random_merges_keep_names_unique_and_references_resolved() {
        let mut rng = XorShift(0x9e37_79b9_7f4a_7c15);
        let option_sets = [
            MergeOptions::default(),
            MergeOptions::minimal(),
            MergeOptions::minimal().with_append(AppendFeatures::all()),
            MergeOptions::minimal().with_update(UpdateFeatures::all()),
        ];

        for round in 0..64 {
            let original = random_model(&mut rng);
            let patch = random_model(&mut rng);
            let options = option_sets[round % option_sets.len()];

            let mut merged = original.clone();
            merge_models(&mut merged, &patch, &options, &mut ()).unwrap();

            assert!(merged.validate().is_empty(), "round {round}");
            assert_eq!(merged.clone().clear_dangling_references(), 0, "round {round}");

            assert!(merged.bones.len() >= original.bones.len());
            assert!(merged.materials.len() >= original.materials.len());
            for bone in &original.bones {
                if !patch.bones.contains(bone.name()) {
                    let kept = merged.bones.get(bone.name()).unwrap();
                    if bone.parent.as_ref().map_or(true, |p| merged.bones.contains(p)) {
                        assert_eq!(kept, bone, "round {round}");
                    }
                }
            }
            for material in &original.materials {
                assert!(merged.materials.contains(material.name()));
            }

            assert!(merged.to_bytes().is_ok(), "round {round}");
        }
    }
}
