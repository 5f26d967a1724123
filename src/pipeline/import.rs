//! File to scene.

use std::path::Path;
use std::time::Instant;

use crate::anim::{unpack, AnimClip, BoneSample, ClipTable};
use crate::codec::read_file;
use crate::config::{ImportOptions, PdxConfig};
use crate::geom::HostMeshData;
use crate::scene::{HostKey, HostLocator, ImportedMaterial, SceneWriter};
use crate::schema::{AnimFile, Locator, Material, MeshFile, ShapeGroup};
use crate::skeleton::import_bones;
use crate::skin::SkinPacker;
use crate::util::{Affine3A, Error, Result};

/// Drop the namespace (everything up to the last `:`) and replace `|`
/// with `_`, so `ns:arm|hand` becomes `arm_hand`.
pub fn clean_imported_name(name: &str) -> String {
    let base = match name.rfind(':') {
        Some(i) => &name[i + 1..],
        None => name,
    };
    base.replace('|', "_")
}

/// Import a `.mesh` file. Textures are resolved next to the file.
pub fn import_mesh<W: SceneWriter + ?Sized>(
    writer: &mut W,
    path: impl AsRef<Path>,
    config: &PdxConfig,
    options: &ImportOptions,
) -> Result<MeshFile> {
    let path = path.as_ref();
    let file = MeshFile::from_tree(&read_file(path)?)?;
    apply_mesh_file(writer, &file, path.parent(), config, options)?;
    Ok(file)
}

/// Create scene objects for a mapped mesh file.
///
/// Objects created before an error stay in the scene.
pub fn apply_mesh_file<W: SceneWriter + ?Sized>(
    writer: &mut W,
    file: &MeshFile,
    texture_dir: Option<&Path>,
    config: &PdxConfig,
    options: &ImportOptions,
) -> Result<()> {
    let started = Instant::now();
    let packer = SkinPacker::new(config.max_influences);

    for (mesh_index, shape) in file.shapes.iter().enumerate() {
        let name = clean_imported_name(&shape.name);
        tracing::info!("creating node {}", name);

        let bones = if options.skeleton && !shape.skeleton.is_empty() {
            let mut bones = import_bones(&shape.skeleton, &config.space)?;
            for bone in &mut bones {
                bone.name = clean_imported_name(&bone.name);
            }
            writer.create_skeleton(&name, &bones)?;
            bones
        } else {
            Vec::new()
        };
        let bone_names: Vec<String> = bones.iter().map(|b| b.name.clone()).collect();

        if !options.mesh {
            continue;
        }
        for mesh in &shape.meshes {
            let data = HostMeshData::from_block(mesh, &config.space);
            let handle = writer.create_mesh(&name, mesh_index, &data)?;
            writer.assign_material(handle, &imported_material(&mesh.material, texture_dir))?;

            if let Some(skin) = mesh.skin.as_ref().filter(|_| !bones.is_empty()) {
                let influences = packer.unpack(skin)?;
                if influences.len() != mesh.vertex_count() {
                    return Err(Error::invalid(
                        "skin",
                        "ix",
                        format!("{} skinned vertices for {} vertices", influences.len(), mesh.vertex_count()),
                    ));
                }
                if let Some(&(bone, _)) = influences.iter().flatten().find(|(b, _)| *b as usize >= bones.len()) {
                    return Err(Error::invalid("skin", "ix", format!("bone index {} out of range", bone)));
                }
                writer.bind_skin(handle, &bone_names, &influences)?;
            }
        }
    }

    if options.locators {
        for loc in &file.locators {
            import_locator(writer, loc, &file.shapes, config)?;
        }
    }

    tracing::info!("import finished in {:.2?}", started.elapsed());
    Ok(())
}

fn imported_material(material: &Material, texture_dir: Option<&Path>) -> ImportedMaterial {
    let resolve = |t: &Option<String>| {
        t.as_ref().map(|t| match texture_dir {
            Some(dir) => dir.join(t),
            None => t.into(),
        })
    };
    ImportedMaterial {
        shader: material.shader.clone(),
        diffuse: resolve(&material.diffuse),
        normal: resolve(&material.normal),
        specular: resolve(&material.specular),
    }
}

/// Parent to a scene joint when there is one; otherwise bake the file bone's
/// bind transform into the locator.
fn import_locator<W: SceneWriter + ?Sized>(
    writer: &mut W,
    loc: &Locator,
    shapes: &[ShapeGroup],
    config: &PdxConfig,
) -> Result<()> {
    let space = &config.space;
    let mut host = HostLocator {
        name: clean_imported_name(&loc.name),
        translation: space.point(loc.position),
        rotation: space.quat(loc.rotation),
        parent: None,
    };

    let Some(parent) = loc.parent.as_deref().map(clean_imported_name) else {
        return writer.create_locator(&host);
    };
    if writer.has_joint(&parent) {
        host.parent = Some(parent);
        return writer.create_locator(&host);
    }

    let bone = shapes
        .iter()
        .flat_map(|s| &s.skeleton)
        .find(|b| clean_imported_name(&b.name) == parent);
    match bone {
        Some(bone) => {
            let parent_world = space.affine(bone.inverse_world.inverse());
            let world = parent_world * Affine3A::from_rotation_translation(host.rotation, host.translation);
            let (_, rotation, translation) = world.to_scale_rotation_translation();
            host.rotation = rotation;
            host.translation = translation;
            writer.create_locator(&host)
        }
        None => {
            tracing::warn!("locator {}: parent {} not found, skipped", host.name, parent);
            Ok(())
        }
    }
}

/// Import a `.anim` file starting at `start`. The clip is named after the
/// file stem.
pub fn import_animation<W: SceneWriter + ?Sized>(
    writer: &mut W,
    path: impl AsRef<Path>,
    config: &PdxConfig,
    start: i32,
) -> Result<AnimClip> {
    let path = path.as_ref();
    let file = AnimFile::from_tree(&read_file(path)?)?;
    let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    apply_anim_file(writer, &file, &name, start, config)
}

/// Key a mapped animation onto existing joints and record it as a clip.
pub fn apply_anim_file<W: SceneWriter + ?Sized>(
    writer: &mut W,
    file: &AnimFile,
    clip_name: &str,
    start: i32,
    config: &PdxConfig,
) -> Result<AnimClip> {
    let started = Instant::now();
    let info = &file.info;
    let frames = info.frames as usize;
    let end = i32::try_from(info.frames.saturating_sub(1))
        .ok()
        .and_then(|last| start.checked_add(last))
        .ok_or(Error::InvalidFrameRange { start, end: i32::MAX })?;

    let names: Vec<String> = info.bones.iter().map(|b| clean_imported_name(&b.name)).collect();
    let missing: Vec<String> = names.iter().filter(|n| !writer.has_joint(n)).cloned().collect();
    if !missing.is_empty() {
        return Err(Error::MissingBones(missing));
    }

    writer.set_playback(info.fps, start, end)?;

    for (name, bone) in names.iter().zip(&info.bones) {
        let pose = BoneSample { translation: bone.translation, rotation: bone.rotation, scale: bone.scale };
        writer.set_pose(name, &pose.to_host(config))?;
    }

    let keyframes = unpack(&info.bones, &file.samples, frames)?;
    let space = &config.space;
    for (name, keys) in names.iter().zip(&keyframes) {
        if keys.channels().is_empty() {
            continue;
        }
        for frame in 0..frames {
            let (t, q, s) = keys.at(frame);
            let key = HostKey {
                translation: t.map(|t| space.point(t)),
                rotation: q.map(|q| space.quat(q)),
                scale: s,
            };
            writer.set_key(name, start + frame as i32, &key)?;
        }
    }

    let clip = AnimClip::new(clip_name, start, end);
    if let Some(root) = names.first() {
        let mut table = ClipTable::parse(&writer.clips(root).unwrap_or_default())?;
        table.edit(clip.clone())?;
        writer.set_clips(root, &table.to_attr_string())?;
    }

    tracing::info!("animation import finished: {} bones, {} frames in {:.2?}", names.len(), frames, started.elapsed());
    Ok(clip)
}
