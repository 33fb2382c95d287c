//! GPU mesh uploads and the render pass helpers that draw them

use cgmath::{Matrix, Matrix4, SquareMatrix};
use wgpu::{util::DeviceExt, *};

use crate::{
    gfx::scene::node::Geometry,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Vertex, triangle and edge buffers for one [`Geometry`]
pub struct GpuMesh {
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    edge_buffer: Option<Buffer>,
    index_count: u32,
    edge_count: u32,
}

impl GpuMesh {
    pub fn new(device: &Device, geometry: &Geometry) -> Self {
        let vertex_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.vertices()),
            usage: BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(geometry.indices()),
            usage: BufferUsages::INDEX,
        });
        let edges = geometry.edge_indices();
        let edge_buffer = (!edges.is_empty()).then(|| {
            device.create_buffer_init(&util::BufferInitDescriptor {
                label: Some("Mesh Edge Buffer"),
                contents: bytemuck::cast_slice(edges),
                usage: BufferUsages::INDEX,
            })
        });

        Self {
            vertex_buffer,
            index_buffer,
            edge_buffer,
            index_count: geometry.indices().len() as u32,
            edge_count: edges.len() as u32,
        }
    }
}

/// Per-draw model and normal matrices, bound to slot 1
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl TransformUniform {
    pub fn new(world: &Matrix4<f32>) -> Self {
        let normal = world.invert().map(|m| m.transpose()).unwrap_or(*world);
        Self {
            model: (*world).into(),
            normal: normal.into(),
        }
    }
}

struct TransformSlot {
    ubo: UniformBuffer<TransformUniform>,
    bind_group: BindGroup,
}

/// Grow-only pool of transform uniforms, one slot per draw call in a frame
pub struct TransformPool {
    layout: BindGroupLayoutWithDesc,
    slots: Vec<TransformSlot>,
}

impl TransformPool {
    pub fn new(device: &Device) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(device, "Transform Bind Group");
        Self {
            layout,
            slots: Vec::new(),
        }
    }

    pub fn bind_group_layout(&self) -> &BindGroupLayout {
        &self.layout.layout
    }

    /// Writes `world` into slot `index`, allocating slots as needed
    pub fn write(&mut self, device: &Device, queue: &Queue, index: usize, world: &Matrix4<f32>) {
        while self.slots.len() <= index {
            let ubo = UniformBuffer::new(device);
            let bind_group = BindGroupBuilder::new(&self.layout)
                .resource(ubo.binding_resource())
                .create(device, "Transform Bind Group");
            self.slots.push(TransformSlot { ubo, bind_group });
        }
        self.slots[index]
            .ubo
            .update_content(queue, TransformUniform::new(world));
    }

    pub fn bind_group(&self, index: usize) -> Option<&BindGroup> {
        self.slots.get(index).map(|slot| &slot.bind_group)
    }
}

/// Draw helpers for uploaded meshes
pub trait RenderPassExt {
    fn draw_mesh(&mut self, mesh: &GpuMesh);
    /// Draws the unique triangle edges as a line list
    fn draw_mesh_edges(&mut self, mesh: &GpuMesh);
}

impl RenderPassExt for RenderPass<'_> {
    fn draw_mesh(&mut self, mesh: &GpuMesh) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
        self.draw_indexed(0..mesh.index_count, 0, 0..1);
    }

    fn draw_mesh_edges(&mut self, mesh: &GpuMesh) {
        let Some(edges) = &mesh.edge_buffer else {
            return;
        };
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(edges.slice(..), IndexFormat::Uint32);
        self.draw_indexed(0..mesh.edge_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn test_normal_matrix_undoes_nonuniform_scale() {
        let world = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let uniform = TransformUniform::new(&world);
        assert_eq!(uniform.model[0][0], 2.0);
        assert!((uniform.normal[0][0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_translation_does_not_leak_into_normal_rotation() {
        let world = Matrix4::from_translation(Vector3::new(3.0, 0.0, 0.0));
        let uniform = TransformUniform::new(&world);
        assert_eq!(uniform.normal[0][0], 1.0);
        assert_eq!(uniform.normal[1][1], 1.0);
        assert_eq!(uniform.normal[2][2], 1.0);
    }
}
