//! Binary glTF (GLB) encoding of a triangle mesh.
//!
//! The scene is a single non-indexed triangle list. Vertices are interleaved
//! as `position, color, normal` (nine `f32`s, 36 bytes) in one buffer view,
//! read through three accessors.

use std::borrow::Cow;
use std::mem;

use gltf::json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use stepglb_tessellate::TriangleMesh;

use crate::engine::ConversionError;

const GENERATOR: &str = concat!("stepglb ", env!("CARGO_PKG_VERSION"));

#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Vertex {
    position: [f32; 3],
    color: [f32; 3],
    normal: [f32; 3],
}

/// Encode `mesh` as a self-contained GLB file.
pub fn encode_glb(mesh: &TriangleMesh) -> Result<Vec<u8>, ConversionError> {
    let vertices = unindex(mesh)?;
    if vertices.is_empty() {
        return Err(ConversionError::EmptyMesh { skipped_faces: 0 });
    }
    let (min, max) = bounding_coords(&vertices);

    let mut root = json::Root::default();
    root.asset.generator = Some(GENERATOR.to_string());

    let buffer_length = vertices.len() * mem::size_of::<Vertex>();
    let buffer = root.push(json::Buffer {
        byte_length: USize64::from(buffer_length),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: None,
    });
    let buffer_view = root.push(json::buffer::View {
        buffer,
        byte_length: USize64::from(buffer_length),
        byte_offset: None,
        byte_stride: Some(json::buffer::Stride(mem::size_of::<Vertex>())),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(json::buffer::Target::ArrayBuffer)),
    });

    let vec3_accessor = |offset: usize, bounds: Option<([f32; 3], [f32; 3])>| json::Accessor {
        buffer_view: Some(buffer_view),
        byte_offset: Some(USize64::from(offset)),
        count: USize64::from(vertices.len()),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Vec3),
        min: bounds.map(|(min, _)| json::Value::from(Vec::from(min))),
        max: bounds.map(|(_, max)| json::Value::from(Vec::from(max))),
        name: None,
        normalized: false,
        sparse: None,
    };
    let positions = root.push(vec3_accessor(
        mem::offset_of!(Vertex, position),
        Some((min, max)),
    ));
    let colors = root.push(vec3_accessor(mem::offset_of!(Vertex, color), None));
    let normals = root.push(vec3_accessor(mem::offset_of!(Vertex, normal), None));

    let primitive = json::mesh::Primitive {
        attributes: {
            let mut map = std::collections::BTreeMap::new();
            map.insert(Valid(json::mesh::Semantic::Positions), positions);
            map.insert(Valid(json::mesh::Semantic::Colors(0)), colors);
            map.insert(Valid(json::mesh::Semantic::Normals), normals);
            map
        },
        extensions: Default::default(),
        extras: Default::default(),
        indices: None,
        material: None,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };
    let mesh_index = root.push(json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        primitives: vec![primitive],
        weights: None,
    });
    let node = root.push(json::Node {
        mesh: Some(mesh_index),
        ..Default::default()
    });
    let scene = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes: vec![node],
    });
    root.scene = Some(scene);

    let json_bytes = json::serialize::to_string(&root)?.into_bytes();
    let bin = to_padded_byte_vector(&vertices);
    let length = 12 + 8 + align_to_multiple_of_four(json_bytes.len()) + 8 + bin.len();
    let length = u32::try_from(length).map_err(|_| ConversionError::TooLarge(length))?;

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length,
        },
        json: Cow::Owned(json_bytes),
        bin: Some(Cow::Owned(bin)),
    };
    let out = glb.to_vec()?;
    tracing::debug!(
        vertices = vertices.len(),
        bytes = out.len(),
        "encoded GLB"
    );
    Ok(out)
}

/// Expand the indexed mesh into one vertex per triangle corner.
fn unindex(mesh: &TriangleMesh) -> Result<Vec<Vertex>, ConversionError> {
    mesh.indices
        .iter()
        .map(|&index| vertex_at(mesh, index as usize).ok_or(ConversionError::InvalidMesh(index)))
        .collect()
}

fn vertex_at(mesh: &TriangleMesh, index: usize) -> Option<Vertex> {
    let attribute = |data: &[f32]| -> Option<[f32; 3]> {
        let start = index.checked_mul(3)?;
        let slice = data.get(start..start.checked_add(3)?)?;
        Some([slice[0], slice[1], slice[2]])
    };
    Some(Vertex {
        position: attribute(&mesh.vertices)?,
        color: attribute(&mesh.colors)?,
        normal: attribute(&mesh.normals)?,
    })
}

fn bounding_coords(vertices: &[Vertex]) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex.position[axis]);
            max[axis] = max[axis].max(vertex.position[axis]);
        }
    }
    (min, max)
}

fn align_to_multiple_of_four(n: usize) -> usize {
    (n + 3) & !3
}

fn to_padded_byte_vector(vertices: &[Vertex]) -> Vec<u8> {
    let mut bytes = bytemuck::cast_slice::<Vertex, u8>(vertices).to_vec();
    bytes.resize(align_to_multiple_of_four(bytes.len()), 0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> TriangleMesh {
        TriangleMesh {
            vertices: vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 1.0],
            indices: vec![0, 1, 2],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            colors: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn test_header_and_chunks() {
        let glb = encode_glb(&triangle()).unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes(glb[4..8].try_into().unwrap()), 2);
        assert_eq!(
            u32::from_le_bytes(glb[8..12].try_into().unwrap()) as usize,
            glb.len()
        );
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_document_layout() {
        let glb = encode_glb(&triangle()).unwrap();
        let gltf = gltf::Gltf::from_slice(&glb).unwrap();

        assert_eq!(gltf.blob.as_ref().map(Vec::len), Some(3 * 36));
        assert_eq!(gltf.meshes().count(), 1);
        assert_eq!(gltf.nodes().count(), 1);
        assert!(gltf.default_scene().is_some());

        let view = gltf.views().next().unwrap();
        assert_eq!(view.stride(), Some(36));

        let primitive = gltf.meshes().next().unwrap().primitives().next().unwrap();
        assert_eq!(primitive.mode(), gltf::mesh::Mode::Triangles);
        assert!(primitive.indices().is_none());
        for semantic in [
            gltf::mesh::Semantic::Positions,
            gltf::mesh::Semantic::Colors(0),
            gltf::mesh::Semantic::Normals,
        ] {
            let accessor = primitive.get(&semantic).unwrap();
            assert_eq!(accessor.count(), 3);
        }

        let positions = primitive.get(&gltf::mesh::Semantic::Positions).unwrap();
        let min: Vec<f32> = serde_json::from_value(positions.min().unwrap()).unwrap();
        let max: Vec<f32> = serde_json::from_value(positions.max().unwrap()).unwrap();
        assert_eq!(min, vec![0.0, 0.0, 0.0]);
        assert_eq!(max, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_accessor_offsets() {
        let glb = encode_glb(&triangle()).unwrap();
        let json_len = u32::from_le_bytes(glb[12..16].try_into().unwrap()) as usize;
        assert_eq!(&glb[16..20], b"JSON");
        let doc: serde_json::Value = serde_json::from_slice(&glb[20..20 + json_len]).unwrap();

        let offsets: Vec<u64> = doc["accessors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["byteOffset"].as_u64().unwrap())
            .collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        assert_eq!(doc["bufferViews"][0]["byteStride"], 36);
        assert_eq!(doc["scene"], 0);
    }

    #[test]
    fn test_interleaved_bytes() {
        let glb = encode_glb(&triangle()).unwrap();
        let gltf = gltf::Gltf::from_slice(&glb).unwrap();
        let blob = gltf.blob.unwrap();
        let floats: Vec<f32> = blob[..36]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes(b.try_into().unwrap()))
            .collect();
        assert_eq!(floats, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let err = encode_glb(&TriangleMesh::new()).unwrap_err();
        assert!(matches!(err, ConversionError::EmptyMesh { .. }));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let mut mesh = triangle();
        mesh.indices[2] = 7;
        let err = encode_glb(&mesh).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidMesh(7)));
    }

    #[test]
    fn test_short_attribute_array_rejected() {
        let mut mesh = triangle();
        mesh.colors.truncate(6);
        let err = encode_glb(&mesh).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidMesh(2)));
    }
}
