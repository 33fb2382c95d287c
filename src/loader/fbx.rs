//! Binary FBX reader
//!
//! Only what is needed to pull triangle meshes out of `Objects/Geometry`
//! records is decoded. Animation, skinning and material records are walked
//! over but ignored.

use std::{io::Read, path::Path};

use flate2::read::ZlibDecoder;

use super::{finish_root, read_file, FbxError, LoadError};
use crate::gfx::scene::node::{Geometry, MeshData, SceneNode};

const MAGIC: &[u8] = b"Kaydara FBX Binary  \0";
const HEADER_LEN: usize = 27;
/// Files from this version on use 64-bit record headers
const WIDE_RECORDS_VERSION: u32 = 7500;
/// Real exports nest a handful of levels; the reader recurses per level
const MAX_DEPTH: usize = 64;
/// Upper bound for one decoded array property
const MAX_ARRAY_BYTES: usize = 1 << 30;

#[derive(Debug, Clone, PartialEq)]
enum Property {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Raw,
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
}

#[derive(Debug)]
struct FbxNode {
    name: String,
    properties: Vec<Property>,
    children: Vec<FbxNode>,
}

impl FbxNode {
    fn child(&self, name: &str) -> Option<&FbxNode> {
        self.children.iter().find(|c| c.name == name)
    }
}

pub(super) fn load(path: &Path, scale: f32) -> Result<SceneNode, LoadError> {
    let bytes = read_file(path)?;
    let nodes = parse(&bytes)?;

    let objects = nodes
        .iter()
        .find(|n| n.name == "Objects")
        .ok_or(FbxError::MissingGeometry)?;

    let mut root = SceneNode::group("fbx");
    let mut found = false;
    for (i, node) in objects.children.iter().filter(|n| n.name == "Geometry").enumerate() {
        found = true;
        if let Some(geometry) = read_geometry(node) {
            root.add_child(SceneNode::mesh(geometry_name(node, i), MeshData::new(geometry)));
        }
    }
    if !found {
        return Err(FbxError::MissingGeometry.into());
    }

    finish_root(root, path, scale)
}

/// Object names are stored as `"Name\0\x01Class"`
fn geometry_name(node: &FbxNode, index: usize) -> String {
    node.properties
        .iter()
        .find_map(|p| match p {
            Property::String(s) => s.split("\0\u{1}").next().filter(|s| !s.is_empty()),
            _ => None,
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("geometry_{index}"))
}

fn read_geometry(node: &FbxNode) -> Option<Geometry> {
    let vertices = match node.child("Vertices")?.properties.first()? {
        Property::FloatArray(values) => values,
        _ => return None,
    };
    let polygon_indices = match node.child("PolygonVertexIndex")?.properties.first()? {
        Property::IntArray(values) => values,
        _ => return None,
    };

    let positions: Vec<[f32; 3]> = vertices
        .chunks_exact(3)
        .map(|c| [c[0] as f32, c[1] as f32, c[2] as f32])
        .collect();

    Some(Geometry::new(positions, None, triangulate_polygons(polygon_indices)))
}

/// Fan-triangulates FBX polygon indices; a negative index `i` closes its
/// polygon and stands for vertex `!i`.
fn triangulate_polygons(polygon_indices: &[i64]) -> Vec<u32> {
    let mut triangles = Vec::new();
    let mut polygon: Vec<u32> = Vec::new();

    for &raw in polygon_indices {
        let (index, last) = if raw < 0 { (!raw, true) } else { (raw, false) };
        polygon.push(index as u32);
        if last {
            for i in 1..polygon.len().saturating_sub(1) {
                triangles.extend_from_slice(&[polygon[0], polygon[i], polygon[i + 1]]);
            }
            polygon.clear();
        }
    }
    triangles
}

fn parse(bytes: &[u8]) -> Result<Vec<FbxNode>, FbxError> {
    if bytes.len() < HEADER_LEN || !bytes.starts_with(MAGIC) {
        return Err(FbxError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[23], bytes[24], bytes[25], bytes[26]]);
    log::debug!("FBX binary version {version}");

    let mut reader = Reader {
        bytes,
        pos: HEADER_LEN,
        wide: version >= WIDE_RECORDS_VERSION,
    };

    let mut nodes = Vec::new();
    while let Some(node) = reader.node(0)? {
        nodes.push(node);
    }
    Ok(nodes)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    wide: bool,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], FbxError> {
        let end = self.pos.checked_add(len).ok_or(FbxError::Truncated(self.pos))?;
        let slice = self.bytes.get(self.pos..end).ok_or(FbxError::Truncated(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], FbxError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, FbxError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, FbxError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn record_field(&mut self) -> Result<u64, FbxError> {
        if self.wide {
            Ok(u64::from_le_bytes(self.array()?))
        } else {
            Ok(self.u32()? as u64)
        }
    }

    /// Reads one record at nesting level `depth`, `None` at a null terminator
    fn node(&mut self, depth: usize) -> Result<Option<FbxNode>, FbxError> {
        if depth > MAX_DEPTH {
            return Err(FbxError::TooDeep(MAX_DEPTH));
        }
        let start = self.pos;
        let end_offset = self.record_field()? as usize;
        let property_count = self.record_field()?;
        let _property_bytes = self.record_field()?;
        let name_len = self.u8()? as usize;

        if end_offset == 0 {
            return Ok(None);
        }
        if end_offset <= start || end_offset > self.bytes.len() {
            return Err(FbxError::Truncated(start));
        }

        let name = String::from_utf8_lossy(self.take(name_len)?).into_owned();
        let mut properties = Vec::with_capacity(property_count.min(64) as usize);
        for _ in 0..property_count {
            properties.push(self.property()?);
        }

        let mut children = Vec::new();
        while self.pos < end_offset {
            match self.node(depth + 1)? {
                Some(child) => children.push(child),
                None => break,
            }
        }
        self.pos = end_offset;

        Ok(Some(FbxNode {
            name,
            properties,
            children,
        }))
    }

    fn property(&mut self) -> Result<Property, FbxError> {
        let code = self.u8()? as char;
        Ok(match code {
            'Y' => Property::Int(i16::from_le_bytes(self.array()?) as i64),
            'C' => Property::Bool(self.u8()? != 0),
            'I' => Property::Int(i32::from_le_bytes(self.array()?) as i64),
            'L' => Property::Int(i64::from_le_bytes(self.array()?)),
            'F' => Property::Float(f32::from_le_bytes(self.array()?) as f64),
            'D' => Property::Float(f64::from_le_bytes(self.array()?)),
            'S' => {
                let len = self.u32()? as usize;
                Property::String(String::from_utf8_lossy(self.take(len)?).into_owned())
            }
            'R' => {
                let len = self.u32()? as usize;
                self.take(len)?;
                Property::Raw
            }
            'f' => Property::FloatArray(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                    .collect(),
            ),
            'd' => Property::FloatArray(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            'i' => Property::IntArray(
                self.array_data(4)?
                    .chunks_exact(4)
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as i64)
                    .collect(),
            ),
            'l' => Property::IntArray(
                self.array_data(8)?
                    .chunks_exact(8)
                    .map(|c| i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
            'b' => Property::IntArray(self.array_data(1)?.into_iter().map(|b| b as i64).collect()),
            other => return Err(FbxError::UnsupportedProperty(other)),
        })
    }

    /// Raw little-endian element bytes of an array property
    fn array_data(&mut self, element_size: usize) -> Result<Vec<u8>, FbxError> {
        let count = self.u32()? as usize;
        let encoding = self.u32()?;
        let stored_len = self.u32()? as usize;
        let stored = self.take(stored_len)?;

        let expected = count
            .checked_mul(element_size)
            .filter(|&len| len <= MAX_ARRAY_BYTES)
            .ok_or(FbxError::ArrayTooLarge {
                count,
                element_size,
            })?;

        let data = match encoding {
            0 => stored.to_vec(),
            1 => {
                // Growth is bounded by the output actually produced, not the header
                let mut out = Vec::with_capacity(stored_len.min(expected));
                ZlibDecoder::new(stored)
                    .take(expected as u64 + 1)
                    .read_to_end(&mut out)
                    .map_err(|e| FbxError::Decompress(e.to_string()))?;
                out
            }
            other => return Err(FbxError::Decompress(format!("unknown encoding {other}"))),
        };

        if data.len() != expected {
            return Err(FbxError::Decompress(format!(
                "expected {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::test_support;
    use flate2::{write::ZlibEncoder, Compression};
    use std::io::Write;

    struct Record {
        name: &'static str,
        properties: Vec<Vec<u8>>,
        children: Vec<Record>,
    }

    fn write_record(out: &mut Vec<u8>, record: &Record) {
        let start = out.len();
        out.extend_from_slice(&[0u8; 12]);
        out.push(record.name.len() as u8);
        out.extend_from_slice(record.name.as_bytes());
        let props_start = out.len();
        for p in &record.properties {
            out.extend_from_slice(p);
        }
        let props_len = (out.len() - props_start) as u32;
        if !record.children.is_empty() {
            for child in &record.children {
                write_record(out, child);
            }
            out.extend_from_slice(&[0u8; 13]);
        }
        let end = out.len() as u32;
        out[start..start + 4].copy_from_slice(&end.to_le_bytes());
        out[start + 4..start + 8].copy_from_slice(&(record.properties.len() as u32).to_le_bytes());
        out[start + 8..start + 12].copy_from_slice(&props_len.to_le_bytes());
    }

    fn string(s: &str) -> Vec<u8> {
        let mut out = vec![b'S'];
        out.extend_from_slice(&(s.len() as u32).to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        out
    }

    fn array(code: u8, count: usize, raw: Vec<u8>, compress: bool) -> Vec<u8> {
        let (encoding, stored) = if compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&raw).unwrap();
            (1u32, encoder.finish().unwrap())
        } else {
            (0u32, raw)
        };
        let mut out = vec![code];
        out.extend_from_slice(&(count as u32).to_le_bytes());
        out.extend_from_slice(&encoding.to_le_bytes());
        out.extend_from_slice(&(stored.len() as u32).to_le_bytes());
        out.extend_from_slice(&stored);
        out
    }

    /// Unit quad as one polygon, vertices zlib-compressed
    fn quad_fbx() -> Vec<u8> {
        let vertices: Vec<f64> = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let vertex_bytes: Vec<u8> = vertices.iter().flat_map(|v| v.to_le_bytes()).collect();
        let indices: Vec<i32> = vec![0, 1, 2, !3];
        let index_bytes: Vec<u8> = indices.iter().flat_map(|v| v.to_le_bytes()).collect();

        let geometry = Record {
            name: "Geometry",
            properties: vec![string("Quad\0\u{1}Geometry"), string("Mesh")],
            children: vec![
                Record {
                    name: "Vertices",
                    properties: vec![array(b'd', vertices.len(), vertex_bytes, true)],
                    children: Vec::new(),
                },
                Record {
                    name: "PolygonVertexIndex",
                    properties: vec![array(b'i', indices.len(), index_bytes, false)],
                    children: Vec::new(),
                },
            ],
        };
        let objects = Record {
            name: "Objects",
            properties: Vec::new(),
            children: vec![geometry],
        };

        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[0x1a, 0x00]);
        out.extend_from_slice(&7400u32.to_le_bytes());
        write_record(&mut out, &objects);
        out.extend_from_slice(&[0u8; 13]);
        out
    }

    #[test]
    fn test_polygon_fan_triangulation() {
        assert_eq!(triangulate_polygons(&[0, 1, 2, !3]), vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(triangulate_polygons(&[0, 1, !2, 2, 3, !4]), vec![0, 1, 2, 2, 3, 4]);
        assert!(triangulate_polygons(&[0, !1]).is_empty());
    }

    #[test]
    fn test_binary_quad_loads() {
        let path = test_support::fixture("quad.fbx", &quad_fbx());
        let root = load(&path, 1.0).unwrap();
        let quad = root.find("Quad").unwrap();
        assert_eq!(quad.mesh_data().unwrap().geometry.triangle_count(), 2);
    }

    #[test]
    fn test_ascii_fbx_is_rejected() {
        let path = test_support::fixture("ascii.fbx", b"; FBX 7.4.0 project file\nFBXHeaderExtension: {\n}\n");
        assert!(matches!(load(&path, 1.0), Err(LoadError::Fbx(FbxError::BadMagic))));
    }

    fn header() -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[0x1a, 0x00]);
        out.extend_from_slice(&7400u32.to_le_bytes());
        out
    }

    #[test]
    fn test_oversized_array_count_is_rejected() {
        // Claims u32::MAX doubles behind a tiny compressed payload
        let mut property = array(b'd', 3, vec![0u8; 24], true);
        property[1..5].copy_from_slice(&u32::MAX.to_le_bytes());
        let record = Record {
            name: "Vertices",
            properties: vec![property],
            children: Vec::new(),
        };
        let mut bytes = header();
        write_record(&mut bytes, &record);
        bytes.extend_from_slice(&[0u8; 13]);

        assert_eq!(
            parse(&bytes).unwrap_err(),
            FbxError::ArrayTooLarge {
                count: u32::MAX as usize,
                element_size: 8
            }
        );
    }

    #[test]
    fn test_array_shorter_than_declared_errors() {
        let mut property = array(b'd', 3, vec![0u8; 24], true);
        property[1..5].copy_from_slice(&4u32.to_le_bytes());
        let record = Record {
            name: "Vertices",
            properties: vec![property],
            children: Vec::new(),
        };
        let mut bytes = header();
        write_record(&mut bytes, &record);
        bytes.extend_from_slice(&[0u8; 13]);

        assert!(matches!(parse(&bytes), Err(FbxError::Decompress(_))));
    }

    #[test]
    fn test_deep_nesting_is_an_error_not_a_crash() {
        // 200k empty records, each opening the next one
        const LEVELS: usize = 200_000;
        const RECORD: usize = 13 + 1;
        let mut bytes = header();
        // Every record ends where the whole chain ends
        let end = (bytes.len() + LEVELS * RECORD) as u32;
        for _ in 0..LEVELS {
            bytes.extend_from_slice(&end.to_le_bytes());
            bytes.extend_from_slice(&0u32.to_le_bytes());
            bytes.extend_from_slice(&0u32.to_le_bytes());
            bytes.push(1);
            bytes.push(b'N');
        }
        bytes.extend_from_slice(&[0u8; 13]);

        let result = std::thread::Builder::new()
            .name("load-fbx".into())
            .spawn(move || parse(&bytes).map(|nodes| nodes.len()))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(result.unwrap_err(), FbxError::TooDeep(MAX_DEPTH));
    }

    #[test]
    fn test_truncated_file_errors() {
        let mut bytes = quad_fbx();
        bytes.truncate(bytes.len() / 2);
        let path = test_support::fixture("truncated.fbx", &bytes);
        assert!(matches!(load(&path, 1.0), Err(LoadError::Fbx(FbxError::Truncated(_)))));
    }
}
