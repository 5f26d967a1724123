//! Scene to file.

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::anim::{is_uniform_scale, pack, BoneKeyframes, BoneSample};
use crate::codec::write_file;
use crate::config::{ExportOptions, PdxConfig};
use crate::geom::{GeometryReducer, ReducedMesh};
use crate::scene::{HostMaterial, HostMeshGroup, HostShape, HostSkeleton, SceneReader};
use crate::schema::{AnimFile, AnimInfo, BoneInfo, Locator, Material, MeshBlock, MeshFile, ShapeGroup, SkinBlock};
use crate::skeleton::resolve;
use crate::skin::SkinPacker;
use crate::util::{round_quat, round_vec3, Error, Result};

/// Mesh index given to shapes without one.
pub const DEFAULT_MESH_INDEX: u32 = 255;

/// Export meshes, skeletons and locators to a `.mesh` file.
pub fn export_mesh<R: SceneReader + ?Sized>(
    reader: &R,
    path: impl AsRef<Path>,
    config: &PdxConfig,
    options: &ExportOptions,
) -> Result<MeshFile> {
    let file = build_mesh_file(reader, config, options)?;
    write_file(path, &file.to_tree())?;
    Ok(file)
}

/// Build the mesh file without writing it.
pub fn build_mesh_file<R: SceneReader + ?Sized>(
    reader: &R,
    config: &PdxConfig,
    options: &ExportOptions,
) -> Result<MeshFile> {
    let started = Instant::now();
    let mut file = MeshFile::default();

    if options.mesh {
        let mut shapes = reader.shapes()?;
        shapes.sort_by_key(|s| s.mesh_index.unwrap_or(DEFAULT_MESH_INDEX));

        let needs_skeleton = options.skeleton && shapes.iter().any(|s| s.skin.is_some());
        let host = if needs_skeleton { reader.skeleton()? } else { HostSkeleton::default() };

        file.shapes = export_shapes(&shapes, &host, config, options)?;
    }

    if options.locators {
        let digits = config.round_data.then_some(config.decimal_digits);
        file.locators = reader
            .locators()?
            .into_iter()
            .map(|l| {
                let mut position = config.space.point(l.translation);
                let mut rotation = config.space.quat(l.rotation);
                if let Some(d) = digits {
                    position = round_vec3(position, d);
                    rotation = round_quat(rotation, d);
                }
                Locator { name: l.name, position, rotation, parent: l.parent }
            })
            .collect();
    }

    tracing::info!(
        "export finished: {} shapes, {} meshes, {} bones, {} locators in {:.2?}",
        file.shapes.len(),
        file.mesh_count(),
        file.bone_count(),
        file.locators.len(),
        started.elapsed()
    );
    Ok(file)
}

fn export_shapes(
    shapes: &[HostShape],
    host: &HostSkeleton,
    config: &PdxConfig,
    options: &ExportOptions,
) -> Result<Vec<ShapeGroup>> {
    // Engine material groups of every shape, flattened so reduction can run
    // across shapes. Reassembled in the same order below.
    let work: Vec<(usize, &HostMeshGroup)> = shapes
        .iter()
        .enumerate()
        .flat_map(|(i, shape)| {
            shape.groups.iter().filter_map(move |g| match &g.material.shader {
                Some(_) => Some((i, g)),
                None => {
                    tracing::warn!("{}: skipping non-PDX material {}", shape.name, g.material.name);
                    None
                }
            })
        })
        .collect();

    let reducer = GeometryReducer::new(config).merge_vertices(options.merge_vertices);
    let reduced: Vec<ReducedMesh> = work.par_iter().map(|(_, g)| reducer.reduce(&g.mesh)).collect();

    let packer = SkinPacker::new(config.max_influences);
    let mut out = Vec::with_capacity(shapes.len());
    let mut results = work.iter().zip(reduced).peekable();

    for (i, shape) in shapes.iter().enumerate() {
        tracing::info!("writing node {}", shape.name);

        let skeleton = match (&shape.skin, options.skeleton) {
            (Some(skin), true) => {
                let mut joints: Vec<usize> =
                    skin.influences.iter().flatten().filter(|(_, w)| *w != 0.0).map(|(j, _)| *j).collect();
                joints.sort_unstable();
                joints.dedup();
                if joints.is_empty() {
                    tracing::warn!("{}: skin has no weighted joints, exported unskinned", shape.name);
                    None
                } else {
                    Some(resolve(host, &joints)?)
                }
            }
            _ => None,
        };

        let mut group = ShapeGroup { name: shape.name.clone(), ..Default::default() };
        while let Some(((_, g), mesh)) = results.next_if(|((owner, _), _)| *owner == i) {
            let skin = match (&shape.skin, &skeleton) {
                (Some(skin), Some(resolved)) => {
                    let influences = packer.resolve(&shape.name, skin, &mesh.source_vertex_ids, host, resolved)?;
                    Some(packer.pack(&influences)?)
                }
                _ => None,
            };
            group.meshes.push(mesh_block(mesh, &g.material, skin));
        }

        if group.meshes.is_empty() {
            tracing::warn!("{}: no PDX material groups, shape skipped", shape.name);
            continue;
        }
        if let Some(resolved) = &skeleton {
            group.skeleton = resolved.to_records(host, &config.space);
        }
        out.push(group);
    }
    Ok(out)
}

fn mesh_block(mesh: ReducedMesh, material: &HostMaterial, skin: Option<SkinBlock>) -> MeshBlock {
    let file_name = |p: &Option<PathBuf>| {
        p.as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
    };
    MeshBlock {
        positions: mesh.positions,
        normals: mesh.normals,
        tangents: mesh.tangents,
        uvs: mesh.uvs,
        triangles: mesh.triangles,
        aabb: mesh.aabb,
        material: Material {
            shader: material.shader.clone().unwrap_or_default(),
            diffuse: file_name(&material.diffuse),
            normal: file_name(&material.normal),
            specular: file_name(&material.specular),
        },
        skin,
    }
}

/// Export the selected joints' animation over `start..=end` to a `.anim` file.
pub fn export_animation<R: SceneReader + ?Sized>(
    reader: &R,
    path: impl AsRef<Path>,
    config: &PdxConfig,
    start: i32,
    end: i32,
) -> Result<AnimFile> {
    let file = build_anim_file(reader, config, start, end)?;
    write_file(path, &file.to_tree())?;
    Ok(file)
}

/// Sample and pack an animation without writing it.
pub fn build_anim_file<R: SceneReader + ?Sized>(
    reader: &R,
    config: &PdxConfig,
    start: i32,
    end: i32,
) -> Result<AnimFile> {
    let frames = end
        .checked_sub(start)
        .and_then(|span| usize::try_from(span).ok())
        .map(|span| span + 1)
        .ok_or(Error::InvalidFrameRange { start, end })?;
    let started = Instant::now();

    let host = reader.skeleton()?;
    let resolved = resolve(&host, &reader.animated_joints()?)?;
    let joints: Vec<usize> = resolved.bones.iter().map(|b| b.joint).collect();

    let mut samples: Vec<Vec<BoneSample>> = vec![Vec::with_capacity(frames); joints.len()];
    let mut non_uniform = vec![false; joints.len()];

    for frame in start..=end {
        let transforms = reader.sample(frame, &joints)?;
        if transforms.len() != joints.len() {
            return Err(Error::invalid(
                "samples",
                "t",
                format!("frame {}: {} transforms for {} bones", frame, transforms.len(), joints.len()),
            ));
        }
        for (i, t) in transforms.iter().enumerate() {
            non_uniform[i] |= !is_uniform_scale(t.scale);
            samples[i].push(BoneSample::from_host(t, config));
        }
    }

    for (bone, _) in resolved.bones.iter().zip(&non_uniform).filter(|(_, n)| **n) {
        tracing::warn!("{}: non-uniform scale, exporting X axis only", bone.name);
    }

    let keyframes: Vec<BoneKeyframes> = samples.iter().map(|s| BoneKeyframes::from_samples(s)).collect();
    let bones = resolved
        .bones
        .iter()
        .zip(&samples)
        .zip(&keyframes)
        .map(|((bone, s), k)| {
            let first = s[0];
            BoneInfo {
                name: bone.name.clone(),
                channels: k.channels(),
                translation: first.translation,
                rotation: first.rotation,
                scale: first.scale,
            }
        })
        .collect();

    let file = AnimFile {
        info: AnimInfo { fps: reader.frame_rate(), frames: frames as u32, bones },
        samples: pack(&keyframes, frames)?,
    };
    tracing::info!(
        "animation export finished: {} bones, {} frames in {:.2?}",
        joints.len(),
        frames,
        started.elapsed()
    );
    Ok(file)
}
