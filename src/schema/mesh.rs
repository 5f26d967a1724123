//! Mesh file blocks: shapes, meshes, materials, skins, skeletons, locators.

use serde::Serialize;

use super::{check_version, flatten, names, new_root, require_vec3, vec2s, vec3s, vec4s};
use crate::tree::TaggedNode;
use crate::util::{Aabb, Affine3A, Error, Quat, Result, Vec2, Vec3, Vec4};

/// Engine material slots. `shader` is the engine shader identifier; textures
/// are bare file names.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Material {
    pub shader: String,
    pub diffuse: Option<String>,
    pub normal: Option<String>,
    pub specular: Option<String>,
}

impl Material {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(names::MATERIAL).with_attr(names::SHADER, self.shader.as_str());
        let slots = [
            (names::DIFFUSE, &self.diffuse),
            (names::NORMAL_MAP, &self.normal),
            (names::SPECULAR, &self.specular),
        ];
        for (name, texture) in slots {
            if let Some(t) = texture {
                node.set_attr(name, t.as_str());
            }
        }
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        Ok(Self {
            shader: node.require_string(names::SHADER)?.to_string(),
            diffuse: node.opt_string(names::DIFFUSE)?.map(str::to_string),
            normal: node.opt_string(names::NORMAL_MAP)?.map(str::to_string),
            specular: node.opt_string(names::SPECULAR)?.map(str::to_string),
        })
    }

    /// Texture slots that are set, as `(attribute, file)`.
    pub fn textures(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            (names::DIFFUSE, self.diffuse.as_deref()),
            (names::NORMAL_MAP, self.normal.as_deref()),
            (names::SPECULAR, self.specular.as_deref()),
        ]
        .into_iter()
        .filter_map(|(slot, t)| t.map(|t| (slot, t)))
    }
}

/// Packed skin: `indices` and `weights` hold `stride` slots per vertex,
/// padded with `-1` / `0.0`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SkinBlock {
    /// Largest influence count of any vertex (the `bones` header).
    pub bones_per_vertex: u32,
    pub indices: Vec<i32>,
    pub weights: Vec<f32>,
}

impl SkinBlock {
    pub fn to_tree(&self) -> TaggedNode {
        TaggedNode::new(names::SKIN)
            .with_attr(names::BONES, vec![self.bones_per_vertex as i32])
            .with_attr(names::INDEX, self.indices.clone())
            .with_attr(names::WEIGHT, self.weights.clone())
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let bones = node.require_int(names::BONES)?;
        let bones_per_vertex = u32::try_from(bones)
            .map_err(|_| Error::invalid(&node.name, names::BONES, format!("negative influence count {}", bones)))?;
        let indices = node.require_ints(names::INDEX)?.to_vec();
        let weights = node.require_floats(names::WEIGHT)?.to_vec();
        if indices.len() != weights.len() {
            return Err(Error::invalid(
                &node.name,
                names::WEIGHT,
                format!("{} weights for {} indices", weights.len(), indices.len()),
            ));
        }
        Ok(Self { bones_per_vertex, indices, weights })
    }
}

/// One material group of a shape.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeshBlock {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    /// Up to four UV channels, each as long as `positions`.
    pub uvs: Vec<Vec<Vec2>>,
    pub triangles: Vec<u32>,
    pub aabb: Aabb,
    pub material: Material,
    pub skin: Option<SkinBlock>,
}

impl MeshBlock {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(names::MESH);
        node.set_attr(names::POSITION, flatten(&self.positions));
        node.set_attr_nonempty(names::NORMAL, flatten(&self.normals));
        node.set_attr_nonempty(names::TANGENT, flatten(&self.tangents));
        for (name, uv) in names::UV.iter().zip(&self.uvs) {
            node.set_attr(name, flatten(uv));
        }
        node.set_attr(names::TRIANGLES, self.triangles.iter().map(|&i| i as i32).collect::<Vec<_>>());

        node.add_child(
            TaggedNode::new(names::AABB)
                .with_attr(names::MIN, self.aabb.min.to_array().to_vec())
                .with_attr(names::MAX, self.aabb.max.to_array().to_vec()),
        );
        node.add_child(self.material.to_tree());
        if let Some(skin) = &self.skin {
            node.add_child(skin.to_tree());
        }
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let positions = vec3s(node, names::POSITION, node.require_floats(names::POSITION)?)?;
        let count = positions.len();

        let normals = match node.floats(names::NORMAL)? {
            Some(n) => vec3s(node, names::NORMAL, n)?,
            None => Vec::new(),
        };
        let tangents = match node.floats(names::TANGENT)? {
            Some(t) => vec4s(node, names::TANGENT, t)?,
            None => Vec::new(),
        };
        let mut uvs = Vec::new();
        for name in names::UV {
            match node.floats(name)? {
                Some(uv) => uvs.push(vec2s(node, name, uv)?),
                None => break,
            }
        }

        let sized = [(names::NORMAL, normals.len()), (names::TANGENT, tangents.len())];
        let uv_sized = names::UV.iter().zip(&uvs).map(|(n, uv)| (*n, uv.len()));
        for (name, len) in sized.into_iter().chain(uv_sized) {
            if len != 0 && len != count {
                return Err(Error::invalid(
                    &node.name,
                    name,
                    format!("{} elements for {} vertices", len, count),
                ));
            }
        }

        let tri = node.require_ints(names::TRIANGLES)?;
        if tri.len() % 3 != 0 {
            return Err(Error::invalid(&node.name, names::TRIANGLES, "index count is not a multiple of 3"));
        }
        let triangles = tri
            .iter()
            .map(|&i| match u32::try_from(i) {
                Ok(i) if (i as usize) < count => Ok(i),
                _ => Err(Error::invalid(&node.name, names::TRIANGLES, format!("index {} out of range", i))),
            })
            .collect::<Result<Vec<_>>>()?;

        let aabb = match node.child(names::AABB) {
            Some(b) => Aabb::new(require_vec3(b, names::MIN)?, require_vec3(b, names::MAX)?),
            None => Aabb::from_points(&positions),
        };
        let material = Material::from_tree(node.require_child(names::MATERIAL)?)?;
        let skin = node.child(names::SKIN).map(SkinBlock::from_tree).transpose()?;

        Ok(Self { positions, normals, tangents, uvs, triangles, aabb, material, skin })
    }
}

/// One bone of a shape's skeleton.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoneRecord {
    pub name: String,
    pub index: u32,
    pub parent: Option<u32>,
    /// Inverse bind (world) transform, file space.
    pub inverse_world: Affine3A,
}

impl BoneRecord {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(self.name.as_str()).with_attr(names::INDEX, vec![self.index as i32]);
        if let Some(p) = self.parent {
            node.set_attr(names::PARENT, vec![p as i32]);
        }
        node.with_attr(names::TRANSFORM, self.inverse_world.to_cols_array().to_vec())
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let index = node.require_int(names::INDEX)?;
        let index = u32::try_from(index)
            .map_err(|_| Error::invalid(&node.name, names::INDEX, format!("negative bone index {}", index)))?;
        let parent = match node.opt_int(names::PARENT)? {
            Some(p) => Some(u32::try_from(p).map_err(|_| Error::InvalidBoneOrder {
                bone: node.name.clone(),
                index: index as usize,
                parent: Some(p),
            })?),
            None => None,
        };
        let tx = node.require_floats(names::TRANSFORM)?;
        let cols: &[f32; 12] = tx
            .try_into()
            .map_err(|_| Error::invalid(&node.name, names::TRANSFORM, format!("expected 12 floats, got {}", tx.len())))?;
        Ok(Self {
            name: node.name.clone(),
            index,
            parent,
            inverse_world: Affine3A::from_cols_array(cols),
        })
    }
}

/// A named attachment point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Locator {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    /// Bone the locator is attached to.
    pub parent: Option<String>,
}

impl Locator {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(self.name.as_str())
            .with_attr(names::POSITION, self.position.to_array().to_vec())
            .with_attr(names::ROTATION, self.rotation.to_array().to_vec());
        if let Some(parent) = &self.parent {
            node.set_attr(names::PARENT, parent.as_str());
        }
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let q = node.require_floats(names::ROTATION)?;
        let rotation = match q {
            [x, y, z, w] => Quat::from_xyzw(*x, *y, *z, *w),
            _ => return Err(Error::invalid(&node.name, names::ROTATION, format!("expected 4 floats, got {}", q.len()))),
        };
        Ok(Self {
            name: node.name.clone(),
            position: require_vec3(node, names::POSITION)?,
            rotation,
            parent: node.opt_string(names::PARENT)?.map(str::to_string),
        })
    }
}

/// A host shape: its material groups and, when skinned, its skeleton.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ShapeGroup {
    pub name: String,
    pub meshes: Vec<MeshBlock>,
    /// Bones in resolved order. Empty when the shape is not skinned.
    pub skeleton: Vec<BoneRecord>,
}

impl ShapeGroup {
    pub fn to_tree(&self) -> TaggedNode {
        let mut node = TaggedNode::new(self.name.as_str());
        for mesh in &self.meshes {
            node.add_child(mesh.to_tree());
        }
        if !self.skeleton.is_empty() {
            let skeleton = node.add_child(TaggedNode::new(names::SKELETON));
            for bone in &self.skeleton {
                skeleton.add_child(bone.to_tree());
            }
        }
        node
    }

    pub fn from_tree(node: &TaggedNode) -> Result<Self> {
        let meshes = node.children_named(names::MESH).map(MeshBlock::from_tree).collect::<Result<Vec<_>>>()?;
        let skeleton = match node.child(names::SKELETON) {
            Some(s) => s.children().iter().map(BoneRecord::from_tree).collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self { name: node.name.clone(), meshes, skeleton })
    }
}

/// A `.mesh` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeshFile {
    pub shapes: Vec<ShapeGroup>,
    pub locators: Vec<Locator>,
}

impl MeshFile {
    /// Build the full file tree. `object` is always written; `locator` only
    /// when there are locators.
    pub fn to_tree(&self) -> TaggedNode {
        let mut root = new_root();
        let object = root.add_child(TaggedNode::new(names::OBJECT));
        for shape in &self.shapes {
            object.add_child(shape.to_tree());
        }
        if !self.locators.is_empty() {
            let locators = root.add_child(TaggedNode::new(names::LOCATOR));
            for loc in &self.locators {
                locators.add_child(loc.to_tree());
            }
        }
        root
    }

    pub fn from_tree(root: &TaggedNode) -> Result<Self> {
        check_version(root)?;
        let shapes = match root.child(names::OBJECT) {
            Some(o) => o.children().iter().map(ShapeGroup::from_tree).collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        let locators = match root.child(names::LOCATOR) {
            Some(l) => l.children().iter().map(Locator::from_tree).collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self { shapes, locators })
    }

    /// Total number of bones across every shape's skeleton.
    pub fn bone_count(&self) -> usize {
        self.shapes.iter().map(|s| s.skeleton.len()).sum()
    }

    pub fn mesh_count(&self) -> usize {
        self.shapes.iter().map(|s| s.meshes.len()).sum()
    }
}
