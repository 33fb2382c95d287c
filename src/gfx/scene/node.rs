//! Scene graph nodes
//!
//! Loaded models are trees of [`SceneNode`]s. Group nodes only carry a
//! transform; mesh nodes additionally hold shared [`Geometry`] and an optional
//! material slot that the animator overwrites.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use cgmath::{
    EuclideanSpace, InnerSpace, Matrix4, One, Point3, Quaternion, Rad, Rotation3,
    Transform as _, Vector3,
};

use super::vertex::Vertex3D;
use crate::gfx::resources::material::SharedMaterial;

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

/// Rotation for XYZ-ordered Euler angles in radians
pub fn euler_xyz(angles: Vector3<f32>) -> Quaternion<f32> {
    Quaternion::from_angle_x(Rad(angles.x))
        * Quaternion::from_angle_y(Rad(angles.y))
        * Quaternion::from_angle_z(Rad(angles.z))
}

/// Local translation, rotation and scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn set_euler(&mut self, angles: Vector3<f32>) {
        self.rotation = euler_xyz(angles);
    }

    pub fn set_uniform_scale(&mut self, scale: f32) {
        self.scale = Vector3::new(scale, scale, scale);
    }

    /// Local matrix, composed as translation * rotation * scale
    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, point: Point3<f32>) {
        self.min.x = self.min.x.min(point.x);
        self.min.y = self.min.y.min(point.y);
        self.min.z = self.min.z.min(point.z);
        self.max.x = self.max.x.max(point.x);
        self.max.y = self.max.y.max(point.y);
        self.max.z = self.max.z.max(point.z);
    }

    pub fn union(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.expand(other.min);
        self.expand(other.max);
    }

    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3::new(a.x, a.y, a.z),
            Point3::new(b.x, a.y, a.z),
            Point3::new(a.x, b.y, a.z),
            Point3::new(b.x, b.y, a.z),
            Point3::new(a.x, a.y, b.z),
            Point3::new(b.x, a.y, b.z),
            Point3::new(a.x, b.y, b.z),
            Point3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing this box's corners after `matrix` is applied
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        let mut out = Aabb::empty();
        if self.is_empty() {
            return out;
        }
        for corner in self.corners() {
            out.expand(matrix.transform_point(corner));
        }
        out
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::from_vec((self.min.to_vec() + self.max.to_vec()) * 0.5)
    }
}

/// Immutable triangle geometry, shared between clones of a loaded model
#[derive(Debug)]
pub struct Geometry {
    id: u64,
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    edges: Vec<u32>,
    bounds: Aabb,
}

impl Geometry {
    /// Builds geometry from triangle lists.
    ///
    /// Triangles referencing vertices out of range are dropped. Normals are
    /// recomputed when missing or when their count does not match the
    /// positions.
    pub fn new(positions: Vec<[f32; 3]>, normals: Option<Vec<[f32; 3]>>, indices: Vec<u32>) -> Self {
        let vertex_count = positions.len() as u32;
        let indices: Vec<u32> = indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < vertex_count))
            .flatten()
            .copied()
            .collect();

        let normals = match normals {
            Some(normals) if normals.len() == positions.len() => normals,
            _ => calculate_vertex_normals(&positions, &indices),
        };

        let mut bounds = Aabb::empty();
        for p in &positions {
            bounds.expand(Point3::new(p[0], p[1], p[2]));
        }

        let edges = unique_edges(&indices);

        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            positions,
            normals,
            indices,
            edges,
            bounds,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Line-list indices, one pair per unique triangle edge
    pub fn edge_indices(&self) -> &[u32] {
        &self.edges
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertices(&self) -> Vec<Vertex3D> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(position, normal)| Vertex3D {
                position: *position,
                normal: *normal,
            })
            .collect()
    }
}

/// Averaged face normals, for meshes that ship without normals
pub fn calculate_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];

    for tri in indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let v0 = Vector3::from(positions[i0]);
        let v1 = Vector3::from(positions[i1]);
        let v2 = Vector3::from(positions[i2]);
        let face = (v1 - v0).cross(v2 - v0);
        for i in [i0, i1, i2] {
            accum[i] += face;
        }
    }

    accum
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

fn unique_edges(indices: &[u32]) -> Vec<u32> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let key = (a.min(b), a.max(b));
            if seen.insert(key) {
                edges.push(key.0);
                edges.push(key.1);
            }
        }
    }
    edges
}

/// Geometry plus the material slot the renderer draws it with
#[derive(Debug, Clone)]
pub struct MeshData {
    pub geometry: Arc<Geometry>,
    pub material: Option<Arc<SharedMaterial>>,
}

impl MeshData {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Arc::new(geometry),
            material: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshData),
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::Group,
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshData) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            kind: NodeKind::Mesh(mesh),
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// True for mesh nodes that have at least one triangle to draw
    pub fn is_renderable_mesh(&self) -> bool {
        matches!(&self.kind, NodeKind::Mesh(mesh) if !mesh.geometry.indices().is_empty())
    }

    pub fn mesh_data(&self) -> Option<&MeshData> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    pub fn mesh_data_mut(&mut self) -> Option<&mut MeshData> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            NodeKind::Group => None,
        }
    }

    /// Depth-first traversal with each node's world matrix
    pub fn visit<F>(&self, parent: &Matrix4<f32>, f: &mut F)
    where
        F: FnMut(&SceneNode, &Matrix4<f32>),
    {
        let world = *parent * self.transform.matrix();
        f(self, &world);
        for child in &self.children {
            child.visit(&world, f);
        }
    }

    /// Depth-first mutable traversal, parents before children
    pub fn visit_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut SceneNode),
    {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.visit(&Matrix4::one(), &mut |node, _| {
            if node.is_renderable_mesh() {
                count += 1;
            }
        });
        count
    }

    /// World-space bounds of every renderable mesh below this node.
    ///
    /// Returns `None` when the subtree has nothing to draw.
    pub fn world_bounding_box(&self, parent: &Matrix4<f32>) -> Option<Aabb> {
        let mut bounds = Aabb::empty();
        self.visit(parent, &mut |node, world| {
            if let Some(mesh) = node.mesh_data() {
                if node.is_renderable_mesh() {
                    bounds.union(&mesh.geometry.bounds().transformed(world));
                }
            }
        });
        (!bounds.is_empty()).then_some(bounds)
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }
}
