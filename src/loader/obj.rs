use std::{io::Cursor, path::Path};

use super::{finish_root, read_file, LoadError};
use crate::gfx::scene::node::{Geometry, MeshData, SceneNode};

/// Wavefront OBJ, one mesh node per object/group.
///
/// MTL libraries are ignored; every mesh is restyled after loading.
pub(super) fn load(path: &Path, scale: f32) -> Result<SceneNode, LoadError> {
    let bytes = read_file(path)?;
    let (models, _materials) = tobj::load_obj_buf(
        &mut Cursor::new(bytes),
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )?;

    let mut root = SceneNode::group("obj");
    for (i, model) in models.into_iter().enumerate() {
        let mesh = model.mesh;
        let positions = to_triples(&mesh.positions);
        let normals = (!mesh.normals.is_empty()).then(|| to_triples(&mesh.normals));

        let name = if model.name.is_empty() {
            format!("object_{i}")
        } else {
            model.name
        };
        log::debug!("OBJ object '{name}': {} vertices", positions.len());

        let geometry = Geometry::new(positions, normals, mesh.indices);
        root.add_child(SceneNode::mesh(name, MeshData::new(geometry)));
    }

    finish_root(root, path, scale)
}

fn to_triples(flat: &[f32]) -> Vec<[f32; 3]> {
    flat.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect()
}
