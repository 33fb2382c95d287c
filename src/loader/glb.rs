use std::path::Path;

use cgmath::{Quaternion, Vector3};

use super::{finish_root, read_file, LoadError};
use crate::gfx::scene::node::{Geometry, MeshData, SceneNode, Transform};

/// Binary glTF (or self-contained .gltf), keeping the node hierarchy
pub(super) fn load(path: &Path, scale: f32) -> Result<SceneNode, LoadError> {
    let bytes = read_file(path)?;
    let (document, buffers, _images) = gltf::import_slice(&bytes)?;

    log::debug!(
        "glTF: {} scenes, {} nodes, {} meshes",
        document.scenes().count(),
        document.nodes().count(),
        document.meshes().count()
    );

    let mut root = SceneNode::group("gltf");
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            root.add_child(convert_node(&node, &buffers));
        }
    }

    finish_root(root, path, scale)
}

fn convert_node(node: &gltf::Node, buffers: &[gltf::buffer::Data]) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Transform {
        position: Vector3::from(translation),
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: Vector3::from(scale),
    };

    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));
    let mut out = SceneNode::group(name.clone()).with_transform(transform);

    if let Some(mesh) = node.mesh() {
        for (i, primitive) in mesh.primitives().enumerate() {
            if let Some(geometry) = read_primitive(&primitive, buffers) {
                out.add_child(SceneNode::mesh(format!("{name}_{i}"), MeshData::new(geometry)));
            }
        }
    }

    for child in node.children() {
        out.add_child(convert_node(&child, buffers));
    }
    out
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<Geometry> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!("Skipping {:?} primitive", primitive.mode());
        return None;
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }
    let normals = reader.read_normals().map(|n| n.collect());
    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    Some(Geometry::new(positions, normals, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_support;

    /// Single-triangle GLB with one translated node
    fn triangle_glb() -> Vec<u8> {
        let json = r#"{"asset":{"version":"2.0"},"scene":0,"scenes":[{"nodes":[0]}],"nodes":[{"name":"tri","mesh":0,"translation":[1,0,0]}],"meshes":[{"primitives":[{"attributes":{"POSITION":0}}]}],"buffers":[{"byteLength":36}],"bufferViews":[{"buffer":0,"byteOffset":0,"byteLength":36}],"accessors":[{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}]}"#;
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn test_glb_hierarchy_and_transform() {
        let path = test_support::fixture("hierarchy.glb", &triangle_glb());
        let root = load(&path, 3.0).unwrap();

        // The root takes the file stem; the glTF node keeps its own name
        assert_eq!(root.name, "hierarchy");
        assert_eq!(root.mesh_count(), 1);
        let node = root.find("tri").unwrap();
        assert_eq!(node.transform.position, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(node.children.len(), 1);
        assert_eq!(root.transform.scale, Vector3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_garbage_is_a_gltf_error() {
        let path = test_support::fixture("garbage.glb", b"definitely not gltf");
        assert!(matches!(load(&path, 1.0), Err(LoadError::Gltf(_))));
    }
}
