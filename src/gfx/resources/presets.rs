//! Product material presets
//!
//! The glossy and wireframe materials are process-wide singletons: created on
//! first request and kept until exit, so remounting a model never allocates
//! them again. Only their emissive values change after creation.

use std::sync::{Arc, OnceLock};

use super::material::{Material, SharedMaterial, Shading};
use crate::{
    config::{rgb, Finish},
    gfx::scene::node::SceneNode,
};

static GLOSSY: OnceLock<Arc<SharedMaterial>> = OnceLock::new();
static WIREFRAME: OnceLock<Arc<SharedMaterial>> = OnceLock::new();

/// Silver satin finish that reads well under directional and ambient light
pub fn truffle_metallic() -> Material {
    Material::new("Truffle Metallic")
        .with_color(rgb(0xc0c0c0))
        .with_metallic(0.4)
        .with_roughness(0.45)
}

/// Frosted glass-like shell
pub fn glossy_translucent() -> Material {
    Material::new("Glossy Translucent")
        .with_color(rgb(0xdce4ec))
        .with_metallic(0.0)
        .with_roughness(0.55)
        .with_transmission(0.68, 2.0, 1.45)
}

/// Unlit edge rendering for the x-ray effect
pub fn wireframe() -> Material {
    Material::new("Wireframe")
        .with_shading(Shading::Unlit)
        .with_color(rgb(0xe8ecf0))
        .with_wireframe()
}

/// Stylised studio look without scene lights
pub fn matcap() -> Material {
    Material::new("Matcap")
        .with_shading(Shading::Matcap)
        .with_color(rgb(0xd8e4f0))
}

pub fn shared_glossy() -> Arc<SharedMaterial> {
    Arc::clone(GLOSSY.get_or_init(|| SharedMaterial::shared(glossy_translucent())))
}

pub fn shared_wireframe() -> Arc<SharedMaterial> {
    Arc::clone(WIREFRAME.get_or_init(|| SharedMaterial::shared(wireframe())))
}

/// Base material for `finish`.
///
/// The glossy finish is the shared singleton; the others are created per call.
pub fn shared_finish(finish: Finish) -> Arc<SharedMaterial> {
    match finish {
        Finish::Glossy => shared_glossy(),
        Finish::Metallic => SharedMaterial::shared(truffle_metallic()),
        Finish::Matcap => SharedMaterial::shared(matcap()),
    }
}

/// Points every renderable mesh under `root` at `material`.
///
/// Returns how many meshes were updated.
pub fn apply_material(root: &mut SceneNode, material: &Arc<SharedMaterial>) -> usize {
    let mut applied = 0;
    root.visit_mut(&mut |node| {
        if !node.is_renderable_mesh() {
            return;
        }
        if let Some(mesh) = node.mesh_data_mut() {
            mesh.material = Some(Arc::clone(material));
            applied += 1;
        }
    });
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::node::{Geometry, MeshData};

    fn tri() -> MeshData {
        MeshData::new(Geometry::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            None,
            vec![0, 1, 2],
        ))
    }

    #[test]
    fn test_singletons_are_shared() {
        assert!(Arc::ptr_eq(&shared_glossy(), &shared_glossy()));
        assert!(Arc::ptr_eq(&shared_wireframe(), &shared_wireframe()));
        assert!(!Arc::ptr_eq(&shared_glossy(), &shared_wireframe()));
    }

    #[test]
    fn test_preset_values() {
        let glossy = glossy_translucent();
        assert_eq!(glossy.transmission, 0.68);
        assert_eq!(glossy.ior, 1.45);
        assert!(glossy.is_translucent());

        let metal = truffle_metallic();
        assert_eq!(metal.metallic, 0.4);
        assert_eq!(metal.roughness, 0.45);

        assert!(wireframe().wireframe);
        assert_eq!(matcap().shading, Shading::Matcap);
    }

    #[test]
    fn test_finish_selects_base_material() {
        assert!(Arc::ptr_eq(&shared_finish(Finish::Glossy), &shared_glossy()));
        assert_eq!(shared_finish(Finish::Metallic).descriptor().name, "Truffle Metallic");
        assert_eq!(shared_finish(Finish::Matcap).descriptor().shading, Shading::Matcap);
    }

    #[test]
    fn test_apply_material_skips_groups() {
        let mut root = SceneNode::group("root")
            .with_child(SceneNode::mesh("a", tri()))
            .with_child(SceneNode::group("inner").with_child(SceneNode::mesh("b", tri())));
        let material = SharedMaterial::shared(truffle_metallic());

        assert_eq!(apply_material(&mut root, &material), 2);
        root.visit(&cgmath::Matrix4::from_scale(1.0), &mut |node, _| {
            if let Some(mesh) = node.mesh_data() {
                assert!(Arc::ptr_eq(mesh.material.as_ref().unwrap(), &material));
            }
        });
    }
}
