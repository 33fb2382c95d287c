//! USDZ packages with an ASCII USD layer
//!
//! A USDZ file is an uncompressed zip archive whose first USD file is the
//! root layer. Mesh prims are read from `points`, `faceVertexCounts` and
//! `faceVertexIndices`; everything else in the layer is skipped.

use std::path::Path;

use super::{finish_root, read_file, LoadError, UsdzError};
use crate::gfx::scene::node::{Geometry, MeshData, SceneNode};

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const LOCAL_HEADER_LEN: usize = 30;
const BINARY_LAYER_MAGIC: &[u8] = b"PXR-USDC";

pub(super) fn load(path: &Path, scale: f32) -> Result<SceneNode, LoadError> {
    let bytes = read_file(path)?;
    let (name, layer) = root_layer(&bytes)?;
    if layer.starts_with(BINARY_LAYER_MAGIC) {
        return Err(UsdzError::BinaryLayer(name).into());
    }
    log::debug!("USDZ root layer '{name}' ({} bytes)", layer.len());

    let text = String::from_utf8_lossy(layer);
    let mut root = SceneNode::group("usdz");
    for (mesh_name, geometry) in parse_meshes(&text)? {
        root.add_child(SceneNode::mesh(mesh_name, MeshData::new(geometry)));
    }

    finish_root(root, path, scale)
}

/// First `.usd`/`.usda`/`.usdc` entry of the archive
fn root_layer(bytes: &[u8]) -> Result<(String, &[u8]), UsdzError> {
    let mut pos = 0;
    let mut first = true;

    loop {
        let header = match bytes.get(pos..pos + LOCAL_HEADER_LEN) {
            Some(header) => header,
            None if first => return Err(UsdzError::NotZip),
            None => return Err(UsdzError::NoLayer),
        };
        let u16_at = |at: usize| u16::from_le_bytes([header[at], header[at + 1]]) as usize;
        let u32_at = |at: usize| {
            u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
        };

        if u32_at(0) != LOCAL_HEADER_SIGNATURE {
            return Err(if first { UsdzError::NotZip } else { UsdzError::NoLayer });
        }
        first = false;

        let compression = u16_at(8);
        let size = u32_at(18) as usize;
        let name_len = u16_at(26);
        let extra_len = u16_at(28);

        let name_start = pos + LOCAL_HEADER_LEN;
        let data_start = name_start + name_len + extra_len;
        let data_end = data_start + size;
        let name = bytes
            .get(name_start..name_start + name_len)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .ok_or_else(|| UsdzError::Malformed("truncated entry name".into()))?;
        let data = bytes
            .get(data_start..data_end)
            .ok_or_else(|| UsdzError::Malformed(format!("truncated entry '{name}'")))?;

        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".usd") || lower.ends_with(".usda") || lower.ends_with(".usdc") {
            if compression != 0 {
                return Err(UsdzError::CompressedEntry(name));
            }
            return Ok((name, data));
        }
        pos = data_end;
    }
}

fn parse_meshes(text: &str) -> Result<Vec<(String, Geometry)>, UsdzError> {
    let starts: Vec<usize> = text.match_indices("def Mesh").map(|(i, _)| i).collect();
    let mut meshes = Vec::with_capacity(starts.len());

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let block = &text[start..end];

        let name = block
            .split('"')
            .nth(1)
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{i}"));

        let points = number_array(block, "points")?.unwrap_or_default();
        let counts = number_array(block, "faceVertexCounts")?.unwrap_or_default();
        let indices = number_array(block, "faceVertexIndices")?.unwrap_or_default();

        if points.len() % 3 != 0 {
            return Err(UsdzError::Malformed(format!("mesh '{name}' has a partial point")));
        }
        let positions = points
            .chunks_exact(3)
            .map(|c| [c[0] as f32, c[1] as f32, c[2] as f32])
            .collect();
        let triangles = triangulate_faces(&counts, &indices, &name)?;

        meshes.push((name, Geometry::new(positions, None, triangles)));
    }
    Ok(meshes)
}

/// Values of `name = [ ... ]` in `block`, with tuple parentheses flattened
fn number_array(block: &str, name: &str) -> Result<Option<Vec<f64>>, UsdzError> {
    for (at, _) in block.match_indices(name) {
        let rest = &block[at + name.len()..];
        let Some(rest) = rest.trim_start().strip_prefix('=') else {
            continue;
        };
        let Some(open) = rest.find('[') else {
            continue;
        };
        let close = rest[open..]
            .find(']')
            .ok_or_else(|| UsdzError::Malformed(format!("unterminated '{name}' array")))?;

        let values = rest[open + 1..open + close]
            .split(|c: char| c == ',' || c == '(' || c == ')' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .map_err(|_| UsdzError::Malformed(format!("bad number '{s}' in '{name}'")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(values));
    }
    Ok(None)
}

fn triangulate_faces(counts: &[f64], indices: &[f64], mesh: &str) -> Result<Vec<u32>, UsdzError> {
    let mut triangles = Vec::new();
    let mut offset = 0usize;

    let run_short = || UsdzError::Malformed(format!("mesh '{mesh}' face indices run short"));
    for &count in counts {
        if count < 0.0 || count.fract() != 0.0 {
            return Err(UsdzError::Malformed(format!("mesh '{mesh}' has face size {count}")));
        }
        let count = count as usize;
        let end = offset.checked_add(count).ok_or_else(run_short)?;
        let face = indices.get(offset..end).ok_or_else(run_short)?;
        for i in 1..count.saturating_sub(1) {
            triangles.extend_from_slice(&[face[0] as u32, face[i] as u32, face[i + 1] as u32]);
        }
        offset = end;
    }
    Ok(triangles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_support;

    const QUAD_USDA: &str = r#"#usda 1.0
(
    upAxis = "Y"
)

def Xform "Root"
{
    def Mesh "Plate"
    {
        float3[] extent = [(0, 0, 0), (1, 1, 0)]
        int[] faceVertexCounts = [4]
        int[] faceVertexIndices = [0, 1, 2, 3]
        point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0), (0, 1, 0)]
    }
}
"#;

    fn zip_entry(out: &mut Vec<u8>, name: &str, data: &[u8], compression: u16) {
        out.extend_from_slice(&LOCAL_HEADER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);
    }

    #[test]
    fn test_stored_package_loads() {
        let mut bytes = Vec::new();
        zip_entry(&mut bytes, "textures/readme.txt", b"ignored", 0);
        zip_entry(&mut bytes, "plate.usda", QUAD_USDA.as_bytes(), 0);
        let path = test_support::fixture("plate.usdz", &bytes);

        let root = load(&path, 1.0).unwrap();
        let plate = root.find("Plate").unwrap();
        assert_eq!(plate.mesh_data().unwrap().geometry.triangle_count(), 2);
    }

    #[test]
    fn test_rejections() {
        let mut compressed = Vec::new();
        zip_entry(&mut compressed, "a.usda", b"xx", 8);
        assert_eq!(root_layer(&compressed), Err(UsdzError::CompressedEntry("a.usda".into())));

        let mut binary = Vec::new();
        zip_entry(&mut binary, "a.usdc", b"PXR-USDC\0\0", 0);
        let path = test_support::fixture("binary.usdz", &binary);
        assert!(matches!(
            load(&path, 1.0),
            Err(LoadError::Usdz(UsdzError::BinaryLayer(_)))
        ));

        assert_eq!(root_layer(b"plain text"), Err(UsdzError::NotZip));

        let mut no_layer = Vec::new();
        zip_entry(&mut no_layer, "image.png", b"png", 0);
        assert_eq!(root_layer(&no_layer), Err(UsdzError::NoLayer));
    }

    #[test]
    fn test_short_face_indices_are_malformed() {
        let err = triangulate_faces(&[4.0], &[0.0, 1.0, 2.0], "m").unwrap_err();
        assert!(matches!(err, UsdzError::Malformed(_)));
    }

    #[test]
    fn test_huge_face_count_is_malformed() {
        // Saturates to usize::MAX, so the offset after the first face overflows
        let err = triangulate_faces(&[3.0, 1e30], &[0.0, 1.0, 2.0], "m").unwrap_err();
        assert!(matches!(err, UsdzError::Malformed(_)));

        let err = triangulate_faces(&[-3.0], &[0.0, 1.0, 2.0], "m").unwrap_err();
        assert!(matches!(err, UsdzError::Malformed(_)));
    }
}
