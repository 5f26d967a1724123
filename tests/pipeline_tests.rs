//! Export / import through an in-memory host scene.

mod common;

use std::path::Path;

use common::{cube, triangle, uv_sphere, MockScene};
use pdx_asset::codec::{encode, read_file};
use pdx_asset::pipeline::{
    apply_anim_file, build_anim_file, build_mesh_file, export_animation, export_mesh, import_animation,
    import_mesh,
};
use pdx_asset::scene::{
    HostLocator, HostMaterial, HostMeshGroup, HostShape, HostSkeleton, HostSkin, HostTransform,
};
use pdx_asset::schema::{AnimFile, MeshFile};
use pdx_asset::util::{Affine3A, Quat, Vec2, Vec3};
use pdx_asset::{Error, ExportOptions, ImportOptions, PdxConfig};
use smallvec::smallvec;
use tempfile::tempdir;

fn pdx_material(name: &str) -> HostMaterial {
    HostMaterial {
        name: name.to_string(),
        shader: Some("PdxMeshStandard".to_string()),
        diffuse: Some(format!("/art/textures/{}_diffuse.dds", name).into()),
        normal: Some(format!("/art/textures/{}_normal.dds", name).into()),
        specular: None,
    }
}

fn shape(name: &str, mesh: pdx_asset::geom::SourceMesh) -> HostShape {
    HostShape {
        name: name.to_string(),
        mesh_index: None,
        groups: vec![HostMeshGroup { material: pdx_material(name), mesh }],
        skin: None,
    }
}

/// root -> spine -> arm, with exactly representable bind transforms.
fn rig() -> HostSkeleton {
    let mut s = HostSkeleton::default();
    let root = s.add("root", None, Affine3A::IDENTITY);
    let spine = s.add("spine", Some(root), Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0)));
    s.add("arm", Some(spine), Affine3A::from_translation(Vec3::new(1.0, 1.0, 0.0)));
    s
}

/// A skinned quad bound to [`rig`].
fn skinned_scene() -> MockScene {
    let p = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.5),
        Vec3::new(0.0, 1.0, 0.5),
    ];
    let uv = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
    let corners = (0..4)
        .map(|i| pdx_asset::geom::FaceVertex::new(i as u32, p[i], Vec3::Z).with_uv(uv[i]))
        .collect();
    let mesh = pdx_asset::geom::SourceMesh {
        faces: vec![pdx_asset::geom::SourceFace::new(corners)],
        uv_channels: 1,
    };

    let mut body = shape("body", mesh);
    body.skin = Some(HostSkin {
        influences: vec![
            smallvec![(0, 1.0)],
            smallvec![(1, 0.5), (0, 0.5)],
            smallvec![(2, 1.0)],
            smallvec![(1, 0.75), (2, 0.25)],
        ],
    });

    MockScene {
        shapes: vec![body],
        skeleton: rig(),
        locators: vec![HostLocator {
            name: "attach".to_string(),
            translation: Vec3::new(0.5, 0.0, 0.0),
            rotation: Quat::IDENTITY,
            parent: Some("arm".to_string()),
        }],
        ..Default::default()
    }
}

fn export_to(dir: &Path, name: &str, scene: &MockScene) -> std::path::PathBuf {
    let path = dir.join(name);
    export_mesh(scene, &path, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to export mesh");
    path
}

#[test]
fn test_cube_export() {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene = MockScene { shapes: vec![shape("cube", cube())], ..Default::default() };
    let path = export_to(dir.path(), "cube.mesh", &scene);

    let file = MeshFile::from_tree(&read_file(&path).expect("Failed to read")).expect("Failed to map");
    assert_eq!(file.shapes.len(), 1);
    let mesh = &file.shapes[0].meshes[0];
    assert_eq!(mesh.vertex_count(), 24, "4 distinct corners per face");
    assert_eq!(mesh.triangles.len(), 36);
    assert_eq!(mesh.tangents.len(), 24);
    assert_eq!(mesh.aabb.min, Vec3::splat(-1.0));
    assert_eq!(mesh.aabb.max, Vec3::splat(1.0));
    assert_eq!(mesh.material.diffuse.as_deref(), Some("cube_diffuse.dds"));
    assert_eq!(mesh.material.normal.as_deref(), Some("cube_normal.dds"));
    assert!(mesh.skin.is_none());
    assert!(file.shapes[0].skeleton.is_empty());
}

#[test]
fn test_no_merge_expands_corners() {
    let scene = MockScene { shapes: vec![shape("cube", cube())], ..Default::default() };
    let options = ExportOptions { merge_vertices: false, ..Default::default() };
    let file = build_mesh_file(&scene, &PdxConfig::default(), &options).expect("Failed to build");
    assert_eq!(file.shapes[0].meshes[0].vertex_count(), 36);
}

#[test]
fn test_smooth_sphere_keeps_source_vertex_count() {
    let (mesh, source_vertices) = uv_sphere(8, 12);
    let scene = MockScene { shapes: vec![shape("ball", mesh)], ..Default::default() };
    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");
    let block = &file.shapes[0].meshes[0];
    assert_eq!(block.vertex_count(), source_vertices);
    assert_eq!(block.triangles.len(), 8 * 12 * 2 * 3);
}

#[test]
fn test_bounding_box_in_file_space() {
    let face = triangle(
        [0, 1, 2],
        [Vec3::new(-1.0, 0.0, 3.0), Vec3::new(1.0, 2.0, -3.0), Vec3::new(0.0, 1.0, 0.0)],
    );
    let mesh = pdx_asset::geom::SourceMesh { faces: vec![face], uv_channels: 1 };
    let scene = MockScene { shapes: vec![shape("tri", mesh)], ..Default::default() };
    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");

    let aabb = file.shapes[0].meshes[0].aabb;
    assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, -3.0));
    assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_shapes_sorted_by_mesh_index() {
    let mut a = shape("a", cube());
    a.mesh_index = Some(2);
    let b = shape("b", cube());
    let mut c = shape("c", cube());
    c.mesh_index = Some(0);
    let scene = MockScene { shapes: vec![a, b, c], ..Default::default() };

    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");
    let names: Vec<&str> = file.shapes.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["c", "a", "b"]);
}

#[test]
fn test_non_engine_materials_skipped() {
    let mut mixed = shape("mixed", cube());
    mixed.groups.push(HostMeshGroup {
        material: HostMaterial { name: "lambert1".to_string(), ..Default::default() },
        mesh: cube(),
    });
    let mut plain = shape("plain", cube());
    plain.groups[0].material.shader = None;
    let scene = MockScene { shapes: vec![mixed, plain], ..Default::default() };

    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");
    assert_eq!(file.shapes.len(), 1, "shape without engine materials is dropped");
    assert_eq!(file.shapes[0].name, "mixed");
    assert_eq!(file.shapes[0].meshes.len(), 1);
}

#[test]
fn test_skinned_export_layout() {
    let scene = skinned_scene();
    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");
    let shape = &file.shapes[0];

    let bones: Vec<(&str, u32, Option<u32>)> =
        shape.skeleton.iter().map(|b| (b.name.as_str(), b.index, b.parent)).collect();
    assert_eq!(bones, vec![("root", 0, None), ("spine", 1, Some(0)), ("arm", 2, Some(1))]);

    let skin = shape.meshes[0].skin.as_ref().expect("mesh should be skinned");
    assert_eq!(skin.bones_per_vertex, 2, "largest influence count");
    assert_eq!(skin.indices.len(), 4 * 4, "packed at the configured width");
    assert_eq!(skin.weights.len(), 4 * 4);
}

#[test]
fn test_unweighted_skin_exported_unskinned() {
    let mut scene = skinned_scene();
    let skin = scene.shapes[0].skin.as_mut().expect("fixture skin");
    for vertex in &mut skin.influences {
        for (_, w) in vertex.iter_mut() {
            *w = 0.0;
        }
    }

    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default())
        .expect("a skin without weights must not fail the export");
    assert_eq!(file.shapes.len(), 1);
    assert!(file.shapes[0].skeleton.is_empty());
    assert!(file.shapes[0].meshes[0].skin.is_none());
}

#[test]
fn test_export_is_deterministic() {
    let scene = skinned_scene();
    let config = PdxConfig::default();
    let a = build_mesh_file(&scene, &config, &ExportOptions::default()).expect("Failed to build");
    let b = build_mesh_file(&scene, &config, &ExportOptions::default()).expect("Failed to build");
    assert_eq!(
        encode(&a.to_tree()).expect("Failed to encode"),
        encode(&b.to_tree()).expect("Failed to encode")
    );
}

/// Host triangles as source positions, rotated to a canonical start so
/// winding is compared but not the starting corner.
fn canonical_triangles(positions: &[Vec3], triangles: &[[u32; 3]]) -> Vec<[[i32; 3]; 3]> {
    let key = |p: Vec3| [(p.x * 2.0) as i32, (p.y * 2.0) as i32, (p.z * 2.0) as i32];
    let mut out: Vec<[[i32; 3]; 3]> = triangles
        .iter()
        .map(|t| {
            let mut k = t.map(|i| key(positions[i as usize]));
            let min = (0..3).min_by_key(|&i| k[i]).unwrap_or(0);
            k.rotate_left(min);
            k
        })
        .collect();
    out.sort();
    out
}

#[test]
fn test_skinned_mesh_roundtrip() {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene = skinned_scene();
    let path = export_to(dir.path(), "body.mesh", &scene);

    let mut host = MockScene::default();
    import_mesh(&mut host, &path, &PdxConfig::default(), &ImportOptions::default()).expect("Failed to import");

    // Skeleton: names, hierarchy and bind transforms survive.
    assert_eq!(host.skeletons.len(), 1);
    let (shape_name, bones) = &host.skeletons[0];
    assert_eq!(shape_name, "body");
    let rig = rig();
    for (bone, joint) in bones.iter().zip(&rig.joints) {
        assert_eq!(bone.name, joint.name);
        assert!(bone.world.abs_diff_eq(joint.world, 1e-5), "{} bind transform", bone.name);
    }

    // Geometry: every vertex maps back to a source vertex.
    assert_eq!(host.meshes.len(), 1);
    let created = &host.meshes[0];
    let source = &scene.shapes[0].groups[0].mesh.faces[0].corners;
    assert_eq!(created.data.positions.len(), 4);
    let source_of = |p: Vec3| {
        source
            .iter()
            .find(|c| c.position == p)
            .unwrap_or_else(|| panic!("imported position {:?} not in source", p))
    };
    for (i, &p) in created.data.positions.iter().enumerate() {
        let src = source_of(p);
        assert_eq!(created.data.normals[i], src.normal);
        assert!(created.data.uvs[0][i].abs_diff_eq(src.uvs[0].unwrap_or_default(), 1e-6));
    }

    let source_positions: Vec<Vec3> = source.iter().map(|c| c.position).collect();
    assert_eq!(
        canonical_triangles(&created.data.positions, &created.data.triangles),
        canonical_triangles(&source_positions, &[[0, 1, 2], [0, 2, 3]]),
        "host winding restored"
    );

    // Skin: weights land on the same joints.
    let (bone_names, influences) = created.skin.as_ref().expect("skin should be bound");
    let host_skin = scene.shapes[0].skin.as_ref().expect("fixture skin");
    for (i, &p) in created.data.positions.iter().enumerate() {
        let id = source_of(p).vertex_id as usize;
        let mut expected: Vec<(String, f32)> = host_skin.influences[id]
            .iter()
            .map(|&(j, w)| (rig.joints[j].name.clone(), w))
            .collect();
        let mut actual: Vec<(String, f32)> =
            influences[i].iter().map(|&(b, w)| (bone_names[b as usize].clone(), w)).collect();
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        actual.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(actual, expected, "influences of vertex {}", id);
    }
}

#[test]
fn test_texture_paths_resolved_next_to_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = export_to(dir.path(), "body.mesh", &skinned_scene());

    let mut host = MockScene::default();
    import_mesh(&mut host, &path, &PdxConfig::default(), &ImportOptions::default()).expect("Failed to import");

    let material = host.meshes[0].material.as_ref().expect("material assigned");
    assert_eq!(material.shader, "PdxMeshStandard");
    assert_eq!(material.diffuse.as_deref(), Some(dir.path().join("body_diffuse.dds").as_path()));
    assert_eq!(material.normal.as_deref(), Some(dir.path().join("body_normal.dds").as_path()));
    assert_eq!(material.specular, None);
}

#[test]
fn test_locator_parented_to_existing_joint() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = export_to(dir.path(), "body.mesh", &skinned_scene());

    let mut host = MockScene::default();
    import_mesh(&mut host, &path, &PdxConfig::default(), &ImportOptions::default()).expect("Failed to import");

    assert_eq!(host.created_locators.len(), 1);
    let loc = &host.created_locators[0];
    assert_eq!(loc.name, "attach");
    assert_eq!(loc.parent.as_deref(), Some("arm"));
    assert_eq!(loc.translation, Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn test_locator_baked_without_joint() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = export_to(dir.path(), "body.mesh", &skinned_scene());

    let mut host = MockScene::default();
    let options = ImportOptions { skeleton: false, ..Default::default() };
    import_mesh(&mut host, &path, &PdxConfig::default(), &options).expect("Failed to import");

    assert!(host.skeletons.is_empty());
    assert!(host.meshes[0].skin.is_none(), "no skin without a skeleton");
    let loc = &host.created_locators[0];
    assert_eq!(loc.parent, None);
    assert!(
        loc.translation.abs_diff_eq(Vec3::new(1.5, 1.0, 0.0), 1e-5),
        "arm bind transform baked in: {:?}",
        loc.translation
    );
}

#[test]
fn test_locator_with_unknown_parent_skipped() {
    let mut scene = skinned_scene();
    scene.locators[0].parent = Some("ghost".to_string());
    let file = build_mesh_file(&scene, &PdxConfig::default(), &ExportOptions::default()).expect("Failed to build");

    let mut host = MockScene::default();
    pdx_asset::pipeline::apply_mesh_file(&mut host, &file, None, &PdxConfig::default(), &ImportOptions::default())
        .expect("unknown parent is not fatal");
    assert!(host.created_locators.is_empty());
}

// ----------------------------------------------------------------------------
// Animation
// ----------------------------------------------------------------------------

const TURN: Quat = Quat::from_xyzw(0.0, 0.6, 0.0, 0.8);

/// Four frames: `root` static, `spine` translating, `arm` rotating and scaling.
fn animated_scene() -> MockScene {
    let mut scene = MockScene { skeleton: rig(), animated: vec![0, 1, 2], fps: 30.0, ..Default::default() };
    let frames = 0..4;
    scene.tracks.insert(0, frames.clone().map(|_| HostTransform::IDENTITY).collect());
    scene.tracks.insert(
        1,
        frames
            .clone()
            .map(|f| HostTransform {
                translation: Vec3::new(0.0, 1.0 + 0.5 * f as f32, 0.0),
                ..Default::default()
            })
            .collect(),
    );
    scene.tracks.insert(
        2,
        frames
            .map(|f| HostTransform {
                translation: Vec3::new(1.0, 0.0, 0.0),
                rotation: if f % 2 == 0 { Quat::IDENTITY } else { TURN },
                scale: Vec3::splat(1.0 + 0.5 * f as f32),
            })
            .collect(),
    );
    scene
}

#[test]
fn test_animation_channels() {
    let file = build_anim_file(&animated_scene(), &PdxConfig::default(), 0, 3).expect("Failed to build");
    assert_eq!(file.info.frames, 4);
    assert_eq!(file.info.fps, 30.0);

    let channels: Vec<(String, String)> =
        file.info.bones.iter().map(|b| (b.name.clone(), b.channels.to_string())).collect();
    assert_eq!(
        channels,
        vec![
            ("root".to_string(), "".to_string()),
            ("spine".to_string(), "t".to_string()),
            ("arm".to_string(), "qs".to_string()),
        ]
    );
    assert_eq!(file.samples.translations.len(), 4 * 3);
    assert_eq!(file.samples.rotations.len(), 4 * 4);
    assert_eq!(file.samples.scales.len(), 4);
}

#[test]
fn test_animation_roundtrip_and_clips() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = PdxConfig::default();
    let scene = animated_scene();
    let walk = dir.path().join("walk.anim");
    export_animation(&scene, &walk, &config, 0, 3).expect("Failed to export animation");

    let mut host = MockScene::with_joints(&["root", "spine", "arm"]);
    let clip = import_animation(&mut host, &walk, &config, 0).expect("Failed to import animation");
    assert_eq!((clip.name.as_str(), clip.start, clip.end), ("walk", 0, 3));
    assert_eq!(host.playback, Some((30.0, 0, 3)));
    assert_eq!(host.clip_attrs.get("root").map(String::as_str), Some("walk~0~3"));

    // Rest pose is the first frame.
    let pose = host.poses.get("spine").expect("spine pose");
    assert!(pose.translation.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-6));

    assert!(!host.keys.contains_key("root"), "static bone gets no keys");

    let spine = &host.keys["spine"];
    assert_eq!(spine.len(), 4);
    for (f, (frame, key)) in spine.iter().enumerate() {
        assert_eq!(*frame, f as i32);
        let expected = scene.tracks[&1][f].translation;
        assert!(key.translation.expect("translation key").abs_diff_eq(expected, 1e-6));
        assert_eq!(key.rotation, None);
        assert_eq!(key.scale, None);
    }

    let arm = &host.keys["arm"];
    for (f, (_, key)) in arm.iter().enumerate() {
        let expected = scene.tracks[&2][f];
        assert_eq!(key.translation, None);
        assert!(key.rotation.expect("rotation key").abs_diff_eq(expected.rotation, 1e-4));
        assert_eq!(key.scale, Some(expected.scale.x));
    }

    // A second clip lands after the first; re-importing edits in place.
    let run = dir.path().join("run.anim");
    export_animation(&scene, &run, &config, 0, 3).expect("Failed to export animation");
    import_animation(&mut host, &run, &config, 4).expect("Failed to import animation");
    assert_eq!(host.clip_attrs["root"], "walk~0~3@run~4~7");

    import_animation(&mut host, &walk, &config, 0).expect("Failed to import animation");
    assert_eq!(host.clip_attrs["root"], "walk~0~3@run~4~7");
}

#[test]
fn test_animation_missing_bones_reported_together() {
    let file = build_anim_file(&animated_scene(), &PdxConfig::default(), 0, 3).expect("Failed to build");
    let mut host = MockScene::with_joints(&["root"]);

    let err = apply_anim_file(&mut host, &file, "walk", 0, &PdxConfig::default()).expect_err("bones missing");
    match err {
        Error::MissingBones(names) => assert_eq!(names, vec!["spine".to_string(), "arm".to_string()]),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(host.playback, None, "nothing applied before the check");
}

#[test]
fn test_animation_sample_underflow() {
    let mut file = build_anim_file(&animated_scene(), &PdxConfig::default(), 0, 3).expect("Failed to build");
    file.samples.rotations.truncate(8);
    let mut host = MockScene::with_joints(&["root", "spine", "arm"]);

    let err = apply_anim_file(&mut host, &file, "walk", 0, &PdxConfig::default()).expect_err("short data");
    assert!(matches!(err, Error::SampleUnderflow { channel: 'q', .. }), "got {:?}", err);
}

#[test]
fn test_animation_file_on_disk() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("idle.anim");
    export_animation(&animated_scene(), &path, &PdxConfig::default(), 0, 3).expect("Failed to export");

    let file = AnimFile::from_tree(&read_file(&path).expect("Failed to read")).expect("Failed to map");
    assert_eq!(file.info.bones.len(), 3);
    assert_eq!(file.info.bones[1].translation, Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_animation_bad_range() {
    let err = build_anim_file(&animated_scene(), &PdxConfig::default(), 5, 2).expect_err("reversed range");
    assert!(matches!(err, Error::InvalidFrameRange { start: 5, end: 2 }));
}

#[test]
fn test_animation_range_wider_than_i32() {
    let err = build_anim_file(&animated_scene(), &PdxConfig::default(), -10, i32::MAX).expect_err("span overflows");
    assert!(matches!(err, Error::InvalidFrameRange { start: -10, end: i32::MAX }), "got {:?}", err);
}

#[test]
fn test_animation_import_past_last_frame() {
    let file = build_anim_file(&animated_scene(), &PdxConfig::default(), 0, 3).expect("Failed to build");
    let mut host = MockScene::with_joints(&["root", "spine", "arm"]);

    let err = apply_anim_file(&mut host, &file, "walk", i32::MAX - 2, &PdxConfig::default())
        .expect_err("end frame overflows");
    assert!(matches!(err, Error::InvalidFrameRange { .. }), "got {:?}", err);
    assert_eq!(host.playback, None);
}

#[test]
fn test_animation_huge_declared_frame_count() {
    let mut file = build_anim_file(&animated_scene(), &PdxConfig::default(), 0, 3).expect("Failed to build");
    file.info.frames = i32::MAX as u32;
    let mut host = MockScene::with_joints(&["root", "spine", "arm"]);

    let err = apply_anim_file(&mut host, &file, "walk", 0, &PdxConfig::default()).expect_err("not enough samples");
    assert!(matches!(err, Error::SampleUnderflow { frame: 4, .. }), "got {:?}", err);
    assert!(host.keys.is_empty());
}
