//! Load and save.
//!
//! Both directions walk the sections in file order. Loading turns positional
//! indices into names; saving recomputes index widths and turns names back
//! into positions.

mod read;
mod write;

#[cfg(test)]
mod tests {
    use crate::fixtures::{add_mesh, bone, bone_chain, sample_model};
    use crate::model::*;
    use crate::named::Named;
    use crate::Error;

    /// Header (17) plus four empty texts.
    const BODY_START: usize = 17 + 16;

    fn reload(model: &mut Model) -> Model {
        let bytes = model.to_bytes().unwrap();
        Model::parse(&bytes).unwrap()
    }

    #[test]
    fn test_round_trip_is_fixed_point() {
        let mut model = sample_model();
        let first = model.to_bytes().unwrap();
        let mut loaded = Model::parse(&first).unwrap();
        let second = loaded.to_bytes().unwrap();
        assert_eq!(first, second);

        let again = Model::parse(&second).unwrap();
        assert_eq!(loaded.summary(), again.summary());
        assert_eq!(loaded.vertices(), again.vertices());
        assert_eq!(loaded.textures(), again.textures());
        assert_eq!(loaded.materials.as_slice(), again.materials.as_slice());
        assert_eq!(loaded.bones.as_slice(), again.bones.as_slice());
        assert_eq!(loaded.morphs.as_slice(), again.morphs.as_slice());
        assert_eq!(
            loaded.display_groups.as_slice(),
            again.display_groups.as_slice()
        );
        assert_eq!(loaded.rigid_bodies.as_slice(), again.rigid_bodies.as_slice());
        assert_eq!(loaded.joints.as_slice(), again.joints.as_slice());
        assert_eq!(again.name, "サンプル");
        assert_eq!(again.comment_en, "for tests");
    }

    #[test]
    fn test_round_trip_keeps_records() {
        let mut model = sample_model();
        let expected = model.summary();
        let loaded = reload(&mut model);
        assert_eq!(loaded.summary(), expected);
        assert_eq!(loaded.extra_uv_count(), 1);

        for name in ["skin", "cloth"] {
            assert_eq!(
                loaded.materials.get(name).unwrap().faces.len(),
                model.materials.get(name).unwrap().faces.len()
            );
        }
        assert_eq!(loaded.materials.get("skin"), model.materials.get("skin"));
        assert_eq!(loaded.morphs.get("smile"), model.morphs.get("smile"));
        assert_eq!(loaded.morphs.get("fade"), model.morphs.get("fade"));
        assert_eq!(loaded.joints.get("elbow_L"), model.joints.get("elbow_L"));
        assert_eq!(loaded.vertices(), model.vertices());
    }

    #[test]
    fn test_references_load_as_names() {
        let mut model = sample_model();
        let loaded = reload(&mut model);

        let twist = loaded.bones.get("twist_L").unwrap();
        assert_eq!(twist.parent.as_deref(), Some("arm_L"));
        let additional = twist.additional.as_ref().unwrap();
        assert_eq!(additional.bone.as_deref(), Some("arm_L"));
        assert!(additional.rotation && !additional.location);
        assert_eq!(twist.external_parent, Some(3));
        assert!(twist.flags.contains(BoneFlags::ADDITIONAL_ROTATION));

        let root = loaded.bones.get("root").unwrap();
        assert_eq!(root.parent, None);
        assert_eq!(root.display, DisplayConnection::Bone(Some("arm_L".into())));

        let ik = loaded.bones.get("ik_L").unwrap().ik.as_ref().unwrap();
        assert_eq!(ik.target.as_deref(), Some("twist_L"));
        assert_eq!(ik.links[0].bone.as_deref(), Some("arm_L"));
        assert!(ik.links[0].limit.is_some());
        assert_eq!(ik.links[1].limit, None);

        let MorphKind::Group(offsets) = &loaded.morphs.get("combo").unwrap().kind else {
            panic!("combo should stay a group morph");
        };
        assert_eq!(offsets[1].morph.as_deref(), Some("raise"));

        let skin = loaded.materials.get("skin").unwrap();
        assert_eq!(skin.texture.as_deref(), Some("tex\\body.png"));
        assert_eq!(skin.toon, Toon::Shared(3));
        let cloth = loaded.materials.get("cloth").unwrap();
        assert_eq!(cloth.toon, Toon::Texture(Some("toon\\custom.bmp".into())));

        let lower = loaded.rigid_bodies.get("lower_L").unwrap();
        assert_eq!(lower.bone.as_deref(), Some("twist_L"));
        let elbow = loaded.joints.get("elbow_L").unwrap();
        assert_eq!(elbow.rigid_b.as_deref(), Some("lower_L"));

        let group = loaded.display_groups.get("表情").unwrap();
        assert_eq!(group.items[1], DisplayItem::Morph(Some("combo".into())));
    }

    #[test]
    fn test_unresolved_reference_saves_as_unset() {
        let mut model = bone_chain(&["root"]);
        let mut orphan = bone("orphan", None);
        orphan.parent = Some("ghost".into());
        model.bones.push(orphan).unwrap();
        model
            .display_groups
            .push(DisplayGroup::new("g"))
            .unwrap();
        model.display_groups.at_mut(0).unwrap().items =
            vec![DisplayItem::Morph(Some("missing".into()))];

        let loaded = reload(&mut model);
        assert_eq!(loaded.bones.get("orphan").unwrap().parent, None);
        assert_eq!(loaded.display_groups[0].items, vec![DisplayItem::Morph(None)]);
    }

    #[test]
    fn test_faces_are_stored_reversed() {
        let mut model = Model::new();
        add_mesh(&mut model, "m", 1, "none");
        let bytes = model.to_bytes().unwrap();

        // count, position, normal, uv, weight tag, bone index, edge scale
        let vertex_size = 12 + 12 + 8 + 1 + 1 + 4;
        let faces = BODY_START + 4 + 3 * vertex_size;
        assert_eq!(&bytes[faces..faces + 4], &3i32.to_le_bytes());
        assert_eq!(&bytes[faces + 4..faces + 7], &[2, 1, 0]);

        let loaded = Model::parse(&bytes).unwrap();
        let [a, b, c] = loaded.materials[0].faces[0];
        assert_eq!(
            [a, b, c].map(|id| loaded.vertex_index(id).unwrap()),
            [0, 1, 2]
        );
    }

    #[test]
    fn test_index_widths_follow_current_counts() {
        let names: Vec<String> = (0..200).map(|i| format!("b{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut model = bone_chain(&refs);
        add_mesh(&mut model, "m", 100, "b199");

        let bytes = model.to_bytes().unwrap();
        // vertex, texture, material, bone, morph, rigid
        assert_eq!(&bytes[11..17], &[2, 1, 1, 2, 1, 1]);

        let loaded = Model::parse(&bytes).unwrap();
        assert_eq!(loaded.bones.get("b150").unwrap().parent.as_deref(), Some("b149"));
        assert_eq!(
            loaded.vertices()[299].weight.bones(),
            &[Some("b199".to_string())]
        );
    }

    #[test]
    fn test_deleted_vertices_are_purged_on_save() {
        let mut model = Model::new();
        let ids = add_mesh(&mut model, "m", 2, "none");
        model
            .morphs
            .push(Morph::new(
                "bulge",
                MorphKind::Vertex(
                    ids.iter()
                        .map(|&vertex| VertexOffset {
                            vertex,
                            offset: [0.0, 1.0, 0.0],
                        })
                        .collect(),
                ),
            ))
            .unwrap();
        let [first, second] = [model.materials[0].faces[0], model.materials[0].faces[1]];
        model.replace_material_faces("m", vec![first]).unwrap();
        assert!(second.iter().all(|&id| model.vertex(id).unwrap().is_deleted()));

        let loaded = reload(&mut model);
        assert_eq!(model.vertices().len(), 3);
        assert_eq!(loaded.vertices().len(), 3);
        assert_eq!(loaded.morphs[0].kind.len(), 3);
    }

    #[test]
    fn test_zero_bone_morph_rotation_loads_as_identity() {
        let mut model = bone_chain(&["root"]);
        model
            .morphs
            .push(Morph::new(
                "still",
                MorphKind::Bone(vec![BoneOffset {
                    bone: Some("root".into()),
                    location: [0.0; 3],
                    rotation: [0.0; 4],
                }]),
            ))
            .unwrap();

        let loaded = reload(&mut model);
        let MorphKind::Bone(offsets) = &loaded.morphs[0].kind else {
            panic!("expected a bone morph");
        };
        assert_eq!(offsets[0].rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_texture_paths_match_after_normalisation() {
        let mut model = Model::new();
        add_mesh(&mut model, "m", 1, "none");
        let stored = model.ensure_texture("tex\\body.png");
        assert_eq!(model.ensure_texture("./tex/body.png"), stored);
        model.materials.at_mut(0).unwrap().texture = Some("./tex/body.png".into());

        let loaded = reload(&mut model);
        assert_eq!(loaded.textures().len(), 1);
        assert_eq!(loaded.materials[0].texture.as_deref(), Some("tex\\body.png"));
    }

    #[test]
    fn test_truncated_joint_tail_defaults_to_zero() {
        let mut model = sample_model();
        let bytes = model.to_bytes().unwrap();

        // Keep the position vector and half of the rotation vector.
        let cut = bytes.len() - 8 * 12 + 12 + 6;
        let loaded = Model::parse(&bytes[..cut]).unwrap();
        let joint = loaded.joints.get("elbow_L").unwrap();
        assert_eq!(joint.position, [1.0, 2.0, 0.0]);
        assert_eq!(joint.rotation, [0.0; 3]);
        assert_eq!(joint.max_rotation, [0.0; 3]);
        assert_eq!(joint.spring_rotation, [0.0; 3]);
        assert_eq!(joint.rigid_a.as_deref(), Some("upper_L"));
    }

    #[test]
    fn test_truncated_joint_head_is_corrupted() {
        let mut model = sample_model();
        let bytes = model.to_bytes().unwrap();

        // Drop the tail and the second rigid body index.
        let cut = bytes.len() - 8 * 12 - 1;
        let err = Model::parse(&bytes[..cut]).unwrap_err();
        assert!(err.is_truncation(), "{err}");
    }

    #[test]
    fn test_truncated_stream_is_corrupted() {
        let mut model = sample_model();
        let bytes = model.to_bytes().unwrap();
        for cut in [10, 40, bytes.len() / 3, bytes.len() / 2, bytes.len() - 200] {
            let err = Model::parse(&bytes[..cut]).unwrap_err();
            assert!(err.is_truncation(), "cut at {cut}: {err}");
        }
    }

    #[test]
    fn test_rejects_qdef_weights() {
        let mut model = Model::new();
        model.add_vertex(crate::fixtures::vertex(0.0, "none"));
        let mut bytes = model.to_bytes().unwrap();
        let tag = BODY_START + 4 + 12 + 12 + 8;
        assert_eq!(bytes[tag], 0);
        bytes[tag] = 4;
        assert!(matches!(Model::parse(&bytes), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_rejects_flip_morphs() {
        let mut model = Model::new();
        model
            .morphs
            .push(Morph::new("m", MorphKind::Group(Vec::new())))
            .unwrap();
        let mut bytes = model.to_bytes().unwrap();
        // six counts, UTF-16 name "m", empty English name, category
        let tag = BODY_START + 6 * 4 + 6 + 4 + 1;
        assert_eq!(bytes[tag], 0);
        bytes[tag] = 9;
        assert!(matches!(Model::parse(&bytes), Err(Error::Unsupported(_))));
        bytes[tag] = 10;
        assert!(matches!(Model::parse(&bytes), Err(Error::Unsupported(_))));
        bytes[tag] = 11;
        assert!(matches!(
            Model::parse(&bytes),
            Err(Error::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_non_spring_joints() {
        let mut model = Model::new();
        model.joints.push(Joint::new("j")).unwrap();
        let mut bytes = model.to_bytes().unwrap();
        let mode = BODY_START + 9 * 4 + 6 + 4;
        assert_eq!(bytes[mode], 0);
        bytes[mode] = 1;
        assert!(matches!(Model::parse(&bytes), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_face_beyond_vertex_list_is_rejected() {
        let mut model = Model::new();
        add_mesh(&mut model, "m", 1, "none");
        let mut bytes = model.to_bytes().unwrap();
        let vertex_size = 12 + 12 + 8 + 1 + 1 + 4;
        bytes[BODY_START + 4 + 3 * vertex_size + 4] = 7;
        assert!(matches!(Model::parse(&bytes), Err(Error::DanglingVertex(7))));
    }

    #[test]
    fn test_material_face_counts_must_cover_the_face_list() {
        let mut model = bone_chain(&["root"]);
        model.encoding = pmxmerge_common::TextEncoding::Utf8;
        add_mesh(&mut model, "first", 2, "root");
        add_mesh(&mut model, "second", 1, "root");
        model.materials.get_mut("first").unwrap().comment = "first-end".into();
        let bytes = model.to_bytes().unwrap();

        // The index count follows the material comment.
        let at = bytes.windows(9).position(|w| w == b"first-end").unwrap() + 9;
        assert_eq!(bytes[at..at + 4], 6i32.to_le_bytes());
        let with_count = |count: i32| {
            let mut edited = bytes.clone();
            edited[at..at + 4].copy_from_slice(&count.to_le_bytes());
            Model::parse(&edited)
        };

        assert!(matches!(
            with_count(4),
            Err(Error::InvalidValue {
                field: "material index count",
                value: 4
            })
        ));
        assert!(matches!(
            with_count(3),
            Err(Error::FaceCountMismatch {
                assigned: 2,
                stored: 3
            })
        ));
        assert!(matches!(
            with_count(12),
            Err(Error::FaceCountMismatch {
                assigned: 4,
                stored: 3
            })
        ));

        let loaded = with_count(6).unwrap();
        assert_eq!(loaded.materials[0].faces.len(), 2);
        assert_eq!(loaded.materials[1].faces.len(), 1);
    }

    #[test]
    fn test_save_rejects_out_of_range_uv_channel() {
        let mut model = bone_chain(&["root"]);
        let ids = add_mesh(&mut model, "m", 1, "root");
        let offsets = vec![UvOffset {
            vertex: ids[0],
            offset: [0.1; 4],
        }];
        model
            .morphs
            .push(Morph::new(
                "shift",
                MorphKind::Uv {
                    channel: 4,
                    offsets: offsets.clone(),
                },
            ))
            .unwrap();
        assert!(model.to_bytes().is_ok());

        model.morphs.at_mut(0).unwrap().kind = MorphKind::Uv {
            channel: 200,
            offsets,
        };
        assert_eq!(model.morphs[0].kind.tag(), i8::MAX);
        assert!(matches!(
            model.to_bytes(),
            Err(Error::InvalidValue {
                field: "UV morph channel",
                value: 200
            })
        ));
    }

    #[test]
    fn test_save_rejects_faces_from_another_model() {
        let mut model = Model::new();
        add_mesh(&mut model, "m", 1, "none");
        model.materials.at_mut(0).unwrap().faces[0][1] = VertexId(999);
        assert!(matches!(model.to_bytes(), Err(Error::DanglingVertex(999))));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pmx");
        let mut model = sample_model();
        model.save(&path).unwrap();

        let loaded = Model::open(&path).unwrap();
        assert_eq!(loaded.summary(), model.summary());
        assert_eq!(loaded.bones.names().collect::<Vec<_>>(), ["root", "arm_L", "twist_L", "ik_L"]);
    }

    #[test]
    fn test_failed_save_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pmx");
        std::fs::write(&path, b"original").unwrap();

        let mut model = Model::new();
        add_mesh(&mut model, "m", 1, "none");
        model.materials.at_mut(0).unwrap().faces[0][0] = VertexId(42);
        assert!(model.save(&path).is_err());

        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_names_survive_utf8_encoding() {
        let mut model = sample_model();
        model.encoding = pmxmerge_common::TextEncoding::Utf8;
        let loaded = reload(&mut model);
        assert_eq!(loaded.encoding, pmxmerge_common::TextEncoding::Utf8);
        assert_eq!(loaded.display_groups[1].name(), "表情");
        assert_eq!(loaded.name, "サンプル");
    }
}
