//! Skeleton resolution.
//!
//! Linearizes a host joint hierarchy into the file's bone list: one root at
//! index 0, every parent before its children. The same hierarchy and ignore
//! flags always produce the same indices, so skins and animations written in
//! separate passes agree on bone numbering.

use std::collections::HashMap;

use crate::scene::HostSkeleton;
use crate::schema::BoneRecord;
use crate::space::CoordinateSpace;
use crate::util::{Affine3A, Error, Result};

/// A bone after resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedBone {
    pub name: String,
    /// Index into [`HostSkeleton::joints`].
    pub joint: usize,
    pub parent: Option<u32>,
}

/// Bones in file order. A bone's position is its index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedSkeleton {
    pub bones: Vec<ResolvedBone>,
    by_joint: HashMap<usize, u32>,
}

impl ResolvedSkeleton {
    #[inline]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// File index of a host joint, `None` if it was not resolved.
    pub fn index_of_joint(&self, joint: usize) -> Option<u32> {
        self.by_joint.get(&joint).copied()
    }

    pub fn root(&self) -> Option<&ResolvedBone> {
        self.bones.first()
    }

    /// Parent index per bone, `-1` for the root.
    pub fn parent_indices(&self) -> Vec<i32> {
        self.bones.iter().map(|b| b.parent.map_or(-1, |p| p as i32)).collect()
    }

    /// Bone records with inverse bind transforms, file space.
    pub fn to_records(&self, host: &HostSkeleton, space: &CoordinateSpace) -> Vec<BoneRecord> {
        self.bones
            .iter()
            .enumerate()
            .map(|(i, bone)| {
                let world = host.joints.get(bone.joint).map_or(Affine3A::IDENTITY, |j| j.world);
                BoneRecord {
                    name: bone.name.clone(),
                    index: i as u32,
                    parent: bone.parent,
                    inverse_world: space.affine(world).inverse(),
                }
            })
            .collect()
    }
}

/// Resolve the skeleton that owns `bones`.
///
/// `bones` are host joint indices (typically the skin influences). The result
/// covers the whole hierarchy under their common root, depth first with
/// children in declaration order. Ignored joints are dropped; their children
/// attach to the nearest kept ancestor.
pub fn resolve(host: &HostSkeleton, bones: &[usize]) -> Result<ResolvedSkeleton> {
    if bones.is_empty() {
        return Err(Error::EmptySkeleton);
    }

    let mut roots: Vec<usize> = Vec::new();
    for &b in bones {
        let root = find_root(host, b)?;
        if !roots.contains(&root) {
            roots.push(root);
        }
    }
    if roots.len() > 1 {
        return Err(Error::MultipleRoots(roots.iter().map(|&r| host.joints[r].name.clone()).collect()));
    }
    let root = roots[0];
    if host.joints[root].ignored {
        return Err(Error::IgnoredRoot(host.joints[root].name.clone()));
    }

    let children = host.child_lists();
    let mut resolved = ResolvedSkeleton::default();
    let mut stack: Vec<(usize, Option<u32>)> = vec![(root, None)];

    while let Some((joint, parent)) = stack.pop() {
        let j = &host.joints[joint];
        let attach = if j.ignored {
            tracing::debug!("skipping ignored bone {}", j.name);
            parent
        } else {
            let index = resolved.bones.len() as u32;
            resolved.bones.push(ResolvedBone { name: j.name.clone(), joint, parent });
            resolved.by_joint.insert(joint, index);
            Some(index)
        };
        for &child in children[joint].iter().rev() {
            stack.push((child, attach));
        }
    }

    tracing::debug!("resolved {} bones under {}", resolved.len(), host.joints[root].name);
    Ok(resolved)
}

fn find_root(host: &HostSkeleton, joint: usize) -> Result<usize> {
    let mut current = joint;
    for _ in 0..=host.joints.len() {
        let j = host.joints.get(current).ok_or_else(|| Error::InvalidBoneOrder {
            bone: format!("#{}", current),
            index: current,
            parent: None,
        })?;
        match j.parent {
            Some(p) => current = p,
            None => return Ok(current),
        }
    }
    Err(Error::InvalidBoneOrder {
        bone: host.joints[joint].name.clone(),
        index: joint,
        parent: host.joints[joint].parent.map(|p| p as i32),
    })
}

/// A bone as created on import: host-space world transform.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedBone {
    pub name: String,
    pub parent: Option<u32>,
    pub world: Affine3A,
}

/// Check that file bones are in resolved order.
pub fn validate_order(bones: &[BoneRecord]) -> Result<()> {
    for (i, bone) in bones.iter().enumerate() {
        let ok = bone.index as usize == i
            && match bone.parent {
                None => i == 0,
                Some(p) => (p as usize) < i,
            };
        if !ok {
            return Err(Error::InvalidBoneOrder {
                bone: bone.name.clone(),
                index: i,
                parent: bone.parent.map(|p| p as i32),
            });
        }
    }
    Ok(())
}

/// Validate file bones and recover host-space bind transforms.
pub fn import_bones(bones: &[BoneRecord], space: &CoordinateSpace) -> Result<Vec<ImportedBone>> {
    validate_order(bones)?;
    Ok(bones
        .iter()
        .map(|b| ImportedBone {
            name: b.name.clone(),
            parent: b.parent,
            world: space.affine(b.inverse_world.inverse()),
        })
        .collect())
}
