//! Skin weight packing.
//!
//! Per-vertex influences are stored as two parallel arrays with a fixed
//! number of slots per vertex. Unused slots hold index `-1` and weight `0.0`.

use smallvec::SmallVec;

use crate::scene::{HostSkeleton, HostSkin};
use crate::schema::SkinBlock;
use crate::skeleton::ResolvedSkeleton;
use crate::util::{Error, Result};

/// Sparse influences of one vertex as `(bone index, weight)`.
pub type Influences = SmallVec<[(u32, f32); 4]>;

/// Fixed-width skin packing.
#[derive(Clone, Copy, Debug)]
pub struct SkinPacker {
    width: usize,
}

impl SkinPacker {
    /// `width` is the number of slots per vertex.
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Map host joint influences onto resolved bone indices, one entry per
    /// output vertex. `source_vertex_ids` is the reducer's vertex order.
    ///
    /// A joint missing from the resolved skeleton fails the whole mesh. Zero
    /// weights are dropped. A vertex with no influences is kept empty.
    pub fn resolve(
        &self,
        mesh: &str,
        skin: &HostSkin,
        source_vertex_ids: &[u32],
        host: &HostSkeleton,
        skeleton: &ResolvedSkeleton,
    ) -> Result<Vec<Influences>> {
        source_vertex_ids
            .iter()
            .map(|&id| {
                let Some(host_influences) = skin.influences.get(id as usize) else {
                    return Ok(Influences::new());
                };
                host_influences
                    .iter()
                    .filter(|(_, w)| *w != 0.0)
                    .map(|&(joint, weight)| match skeleton.index_of_joint(joint) {
                        Some(bone) => Ok((bone, weight)),
                        None => Err(Error::SkinBoneExcluded {
                            bone: host.joints.get(joint).map_or_else(|| format!("#{}", joint), |j| j.name.clone()),
                            mesh: mesh.to_string(),
                        }),
                    })
                    .collect()
            })
            .collect()
    }

    /// Pack influences into a fixed-width skin block.
    pub fn pack(&self, influences: &[Influences]) -> Result<SkinBlock> {
        let mut indices = Vec::with_capacity(influences.len() * self.width);
        let mut weights = Vec::with_capacity(influences.len() * self.width);
        let mut max = 0;

        for (vertex, inf) in influences.iter().enumerate() {
            let count = inf.iter().filter(|(_, w)| *w != 0.0).count();
            if count > self.width {
                return Err(Error::TooManyInfluences { vertex, count, max: self.width });
            }
            max = max.max(count);

            for &(bone, weight) in inf.iter().filter(|(_, w)| *w != 0.0) {
                indices.push(bone as i32);
                weights.push(weight);
            }
            for _ in count..self.width {
                indices.push(-1);
                weights.push(0.0);
            }
        }

        Ok(SkinBlock { bones_per_vertex: max as u32, indices, weights })
    }

    /// Unpack a skin block, dropping padding.
    pub fn unpack(&self, skin: &SkinBlock) -> Result<Vec<Influences>> {
        let used = skin.bones_per_vertex as usize;
        if used > self.width {
            return Err(Error::invalid(
                "skin",
                "bones",
                format!("{} influences per vertex exceeds width {}", used, self.width),
            ));
        }
        if skin.indices.len() % self.width != 0 || skin.weights.len() != skin.indices.len() {
            return Err(Error::invalid(
                "skin",
                "ix",
                format!("{} slots is not a multiple of {}", skin.indices.len(), self.width),
            ));
        }

        Ok(skin
            .indices
            .chunks_exact(self.width)
            .zip(skin.weights.chunks_exact(self.width))
            .map(|(ix, w)| {
                ix.iter()
                    .zip(w)
                    .take(used)
                    .filter(|&(&i, &w)| i >= 0 && w != 0.0)
                    .map(|(&i, &w)| (i as u32, w))
                    .collect()
            })
            .collect())
    }
}
