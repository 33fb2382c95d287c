//! Flattening the scene graph into ordered draw calls

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, One, Point3, Transform};

use crate::gfx::{
    resources::material::SharedMaterial,
    scene::node::{Geometry, SceneNode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPass {
    Opaque,
    Wireframe,
    Translucent,
}

impl DrawPass {
    /// Pass for a mesh slot; meshes without a material draw opaque
    pub fn for_material(material: Option<&SharedMaterial>) -> Self {
        match material.map(SharedMaterial::descriptor) {
            Some(m) if m.wireframe => DrawPass::Wireframe,
            Some(m) if m.is_translucent() => DrawPass::Translucent,
            _ => DrawPass::Opaque,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DrawItem {
    pub geometry: Arc<Geometry>,
    pub material: Option<Arc<SharedMaterial>>,
    pub world: Matrix4<f32>,
    /// Squared distance from the eye to the mesh's world-space center
    pub depth: f32,
}

/// Renderable meshes grouped by pass, in submission order
#[derive(Debug, Default)]
pub struct DrawList {
    pub opaque: Vec<DrawItem>,
    pub wireframe: Vec<DrawItem>,
    /// Sorted back to front
    pub translucent: Vec<DrawItem>,
}

impl DrawList {
    pub fn collect(root: &SceneNode, eye: Point3<f32>) -> Self {
        let mut list = DrawList::default();

        root.visit(&Matrix4::one(), &mut |node, world| {
            if !node.is_renderable_mesh() {
                return;
            }
            let Some(mesh) = node.mesh_data() else {
                return;
            };
            let center = world.transform_point(mesh.geometry.bounds().center());
            let item = DrawItem {
                geometry: Arc::clone(&mesh.geometry),
                material: mesh.material.clone(),
                world: *world,
                depth: (center - eye).magnitude2(),
            };
            match DrawPass::for_material(mesh.material.as_deref()) {
                DrawPass::Opaque => list.opaque.push(item),
                DrawPass::Wireframe => list.wireframe.push(item),
                DrawPass::Translucent => list.translucent.push(item),
            }
        });

        list.translucent.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        list
    }

    pub fn len(&self) -> usize {
        self.opaque.len() + self.wireframe.len() + self.translucent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All items with their pass, in draw order
    pub fn iter(&self) -> impl Iterator<Item = (DrawPass, &DrawItem)> {
        self.opaque
            .iter()
            .map(|item| (DrawPass::Opaque, item))
            .chain(self.wireframe.iter().map(|item| (DrawPass::Wireframe, item)))
            .chain(self.translucent.iter().map(|item| (DrawPass::Translucent, item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        resources::material::Material,
        scene::node::{MeshData, Transform as NodeTransform},
    };
    use cgmath::Vector3;

    fn mesh_at(name: &str, x: f32, material: Option<Material>) -> SceneNode {
        let geometry = Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            vec![0, 1, 2],
        );
        let mut data = MeshData::new(geometry);
        data.material = material.map(SharedMaterial::shared);
        SceneNode::mesh(name, data).with_transform(NodeTransform::from_position(Vector3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_meshes_are_grouped_by_pass() {
        let glass = Material::new("glass").with_transmission(0.7, 2.0, 1.45);
        let wire = Material::new("wire").with_wireframe();
        let root = SceneNode::group("root")
            .with_child(mesh_at("plain", 0.0, None))
            .with_child(mesh_at("glass", 0.0, Some(glass)))
            .with_child(mesh_at("wire", 0.0, Some(wire)))
            .with_child(SceneNode::group("empty"));

        let list = DrawList::collect(&root, Point3::new(0.0, 0.0, 5.0));
        assert_eq!((list.opaque.len(), list.wireframe.len(), list.translucent.len()), (1, 1, 1));

        let order: Vec<DrawPass> = list.iter().map(|(pass, _)| pass).collect();
        assert_eq!(order, vec![DrawPass::Opaque, DrawPass::Wireframe, DrawPass::Translucent]);
    }

    #[test]
    fn test_translucent_meshes_sort_back_to_front() {
        let glass = || Some(Material::new("glass").with_alpha(0.5));
        let root = SceneNode::group("root")
            .with_child(mesh_at("near", 4.0, glass()))
            .with_child(mesh_at("far", -6.0, glass()));

        let list = DrawList::collect(&root, Point3::new(5.0, 0.0, 0.0));
        assert!(list.translucent[0].world.w.x < list.translucent[1].world.w.x);
        assert!(list.translucent[0].depth > list.translucent[1].depth);
    }
}
