//! Small in-memory models for tests.
//!
//! Enabled for this crate's own tests and, through the `test-fixtures`
//! feature, for downstream crates that need models without binary files.

use crate::model::{
    category, AdditionalTransform, AngleLimit, Bone, BoneFlags, BoneOffset, BoneWeight,
    DisplayConnection, DisplayGroup, DisplayItem, GroupOffset, Ik, IkLink, Joint, Material,
    MaterialOffset, MaterialOffsetOp, Morph, MorphKind, RigidBody, RigidMode, RigidShape,
    SphereMode, Toon, UvOffset, Vertex, VertexId, VertexOffset,
};
use crate::{Face, Model};

/// A vertex at `x` on the X axis, fully weighted to `bone`.
pub fn vertex(x: f32, bone: &str) -> Vertex {
    Vertex::new(
        [x, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [x / 10.0, 0.5],
        BoneWeight::single(bone),
    )
}

/// A bone with the usual editor flags and an optional parent.
pub fn bone(name: &str, parent: Option<&str>) -> Bone {
    let mut bone = Bone::new(name);
    bone.parent = parent.map(str::to_owned);
    bone.flags = BoneFlags::ROTATABLE | BoneFlags::VISIBLE | BoneFlags::CONTROLLABLE;
    bone
}

/// A model holding only a chain of bones, each parented to the previous one.
pub fn bone_chain(names: &[&str]) -> Model {
    let mut model = Model::new();
    let mut parent = None;
    for name in names {
        model
            .bones
            .push(bone(name, parent))
            .unwrap_or_else(|err| panic!("fixture bone '{name}': {err}"));
        parent = Some(*name);
    }
    model
}

/// Add `faces` fresh triangles, each with its own three vertices weighted to
/// `bone`, and return them.
pub fn fresh_faces(model: &mut Model, faces: usize, bone: &str) -> Vec<Face> {
    (0..faces)
        .map(|i| {
            let x = i as f32;
            [
                model.add_vertex(vertex(x, bone)),
                model.add_vertex(vertex(x + 0.25, bone)),
                model.add_vertex(vertex(x + 0.5, bone)),
            ]
        })
        .collect()
}

/// Add a material named `name` with `faces` fresh triangles.
pub fn add_mesh(model: &mut Model, name: &str, faces: usize, bone: &str) -> Vec<VertexId> {
    let faces = fresh_faces(model, faces, bone);
    let ids = faces.iter().flatten().copied().collect();
    let mut material = Material::new(name);
    material.faces = faces;
    model
        .materials
        .push(material)
        .unwrap_or_else(|err| panic!("fixture material '{name}': {err}"));
    ids
}

/// A model that touches every section and every record variant the codec
/// supports.
pub fn sample_model() -> Model {
    let mut model = Model::new();
    model.name = "サンプル".into();
    model.name_en = "sample".into();
    model.comment = "テスト用".into();
    model.comment_en = "for tests".into();
    model
        .set_extra_uv_count(1)
        .unwrap_or_else(|err| panic!("fixture extra UVs: {err}"));

    // Bones
    let mut root = bone("root", None);
    root.flags |= BoneFlags::MOVABLE;
    root.display = DisplayConnection::Bone(Some("arm_L".into()));

    let mut arm = bone("arm_L", Some("root"));
    arm.location = [1.0, 2.0, 0.0];
    arm.display = DisplayConnection::Offset([0.5, 0.0, 0.0]);
    arm.fixed_axis = Some([1.0, 0.0, 0.0]);
    arm.local_coordinate = Some(crate::model::LocalCoordinate {
        x_axis: [1.0, 0.0, 0.0],
        z_axis: [0.0, 0.0, 1.0],
    });

    let mut twist = bone("twist_L", Some("arm_L"));
    twist.additional = Some(AdditionalTransform {
        bone: Some("arm_L".into()),
        influence: 0.5,
        rotation: true,
        location: false,
    });
    twist.external_parent = Some(3);
    twist.transform_order = 1;

    let mut ik = bone("ik_L", Some("root"));
    ik.flags |= BoneFlags::MOVABLE;
    ik.ik = Some(Ik {
        target: Some("twist_L".into()),
        loop_count: 40,
        limit_angle: 0.1,
        links: vec![
            IkLink {
                bone: Some("arm_L".into()),
                limit: Some(AngleLimit {
                    min: [-1.0, 0.0, 0.0],
                    max: [1.0, 0.0, 0.0],
                }),
            },
            IkLink {
                bone: Some("root".into()),
                limit: None,
            },
        ],
    });
    for bone in [root, arm, twist, ik] {
        model
            .bones
            .push(bone)
            .unwrap_or_else(|err| panic!("fixture bone: {err}"));
    }

    // Mesh
    let skin = add_mesh(&mut model, "skin", 3, "arm_L");
    let cloth = add_mesh(&mut model, "cloth", 2, "root");
    if let Some(vertex) = model.vertex_mut(cloth[0]) {
        vertex.weight = BoneWeight::Bdef2 {
            bones: [Some("root".into()), Some("arm_L".into())],
            weight: 0.75,
        };
        vertex.edge_scale = 0.5;
    }
    if let Some(vertex) = model.vertex_mut(cloth[1]) {
        vertex.weight = BoneWeight::Bdef4 {
            bones: [
                Some("root".into()),
                Some("arm_L".into()),
                Some("twist_L".into()),
                None,
            ],
            weights: [0.4, 0.3, 0.3, 0.0],
        };
        vertex.extra_uvs[0] = [0.1, 0.2, 0.3, 0.4];
    }
    if let Some(vertex) = model.vertex_mut(cloth[2]) {
        vertex.weight = BoneWeight::Sdef {
            bones: [Some("arm_L".into()), Some("twist_L".into())],
            weight: 0.6,
            c: [0.0, 1.0, 0.0],
            r0: [0.0, 1.1, 0.0],
            r1: [0.0, 0.9, 0.0],
        };
    }

    let body_texture = model.ensure_texture("tex\\body.png");
    let sphere = model.ensure_texture("tex\\skin.spa");
    let toon = model.ensure_texture("toon\\custom.bmp");
    if let Some(material) = model.materials.get_mut("skin") {
        material.texture = Some(body_texture);
        material.sphere_texture = Some(sphere);
        material.sphere_mode = SphereMode::Add;
        material.toon = Toon::Shared(3);
        material.comment = "face and hands".into();
    }
    if let Some(material) = model.materials.get_mut("cloth") {
        material.toon = Toon::Texture(Some(toon));
        material.diffuse = [0.2, 0.3, 0.4, 1.0];
        material.edge_size = 0.5;
    }

    // Morphs
    let mut smile = Morph::new(
        "smile",
        MorphKind::Vertex(
            skin.iter()
                .take(3)
                .map(|&vertex| VertexOffset {
                    vertex,
                    offset: [0.0, 0.1, 0.0],
                })
                .collect(),
        ),
    );
    smile.category = category::MOUTH;
    let scroll = Morph::new(
        "scroll",
        MorphKind::Uv {
            channel: 1,
            offsets: vec![UvOffset {
                vertex: cloth[1],
                offset: [0.5, 0.0, 0.0, 0.0],
            }],
        },
    );
    let raise = Morph::new(
        "raise",
        MorphKind::Bone(vec![BoneOffset {
            bone: Some("arm_L".into()),
            location: [0.0, 1.0, 0.0],
            rotation: [0.0, 0.0, 0.383, 0.924],
        }]),
    );
    let fade = Morph::new(
        "fade",
        MorphKind::Material(vec![MaterialOffset {
            material: Some("cloth".into()),
            op: MaterialOffsetOp::Multiply,
            diffuse: [1.0, 1.0, 1.0, 0.0],
            specular: [1.0; 3],
            shininess: 1.0,
            ambient: [1.0; 3],
            edge_color: [1.0; 4],
            edge_size: 1.0,
            texture_factor: [1.0; 4],
            sphere_factor: [1.0; 4],
            toon_factor: [1.0; 4],
        }]),
    );
    let mut combo = Morph::new(
        "combo",
        MorphKind::Group(vec![
            GroupOffset {
                morph: Some("smile".into()),
                factor: 1.0,
            },
            GroupOffset {
                morph: Some("raise".into()),
                factor: 0.5,
            },
        ]),
    );
    combo.category = category::OTHER;
    for morph in [smile, scroll, raise, fade, combo] {
        model
            .morphs
            .push(morph)
            .unwrap_or_else(|err| panic!("fixture morph: {err}"));
    }

    // Display groups
    let mut root_group = DisplayGroup::new("Root");
    root_group.special = true;
    root_group.items.push(DisplayItem::Bone(Some("root".into())));
    let mut faces = DisplayGroup::new("表情");
    faces.special = true;
    faces.items.push(DisplayItem::Morph(Some("smile".into())));
    faces.items.push(DisplayItem::Morph(Some("combo".into())));
    let mut arms = DisplayGroup::new("arms");
    arms.items.push(DisplayItem::Bone(Some("arm_L".into())));
    arms.items.push(DisplayItem::Bone(Some("ik_L".into())));
    for group in [root_group, faces, arms] {
        model
            .display_groups
            .push(group)
            .unwrap_or_else(|err| panic!("fixture display group: {err}"));
    }

    // Physics
    let mut upper = RigidBody::new("upper_L");
    upper.bone = Some("arm_L".into());
    upper.group = 2;
    upper.no_collision_mask = 0xfffe;
    upper.shape = RigidShape::Capsule;
    upper.size = [0.3, 1.0, 0.0];
    let mut lower = RigidBody::new("lower_L");
    lower.bone = Some("twist_L".into());
    lower.mode = RigidMode::Dynamic;
    lower.mass = 2.0;
    for body in [upper, lower] {
        model
            .rigid_bodies
            .push(body)
            .unwrap_or_else(|err| panic!("fixture rigid body: {err}"));
    }
    let mut elbow = Joint::new("elbow_L").between("upper_L", "lower_L");
    elbow.position = [1.0, 2.0, 0.0];
    elbow.max_rotation = [0.5, 0.5, 0.5];
    elbow.spring_rotation = [10.0, 0.0, 0.0];
    model
        .joints
        .push(elbow)
        .unwrap_or_else(|err| panic!("fixture joint: {err}"));

    model
}
