use std::marker::PhantomData;
use wgpu::util::DeviceExt;

/// Last path segment of a type name, used for buffer labels
fn short_type_name(type_name: &str) -> &str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// Typed uniform buffer.
///
/// Keeps a copy of the last uploaded bytes so per-frame updates with an
/// unchanged value (a paused animation, a still camera) cost no queue write.
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    last_upload: Option<Vec<u8>>,
    content: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    fn label() -> String {
        format!("Uniform {}", short_type_name(std::any::type_name::<Content>()))
    }

    const USAGE: wgpu::BufferUsages = wgpu::BufferUsages::UNIFORM.union(wgpu::BufferUsages::COPY_DST);

    /// Zero-initialised buffer; the first [`Self::update_content`] always uploads
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&Self::label()),
            size: std::mem::size_of::<Content>() as u64,
            usage: Self::USAGE,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            last_upload: None,
            content: PhantomData,
        }
    }

    pub fn new_with_data(device: &wgpu::Device, initial: &Content) -> Self {
        let bytes = bytemuck::bytes_of(initial);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&Self::label()),
            contents: bytes,
            usage: Self::USAGE,
        });
        Self {
            buffer,
            last_upload: Some(bytes.to_vec()),
            content: PhantomData,
        }
    }

    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let bytes = bytemuck::bytes_of(&content);
        if self.last_upload.as_deref() == Some(bytes) {
            return;
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        self.last_upload = Some(bytes.to_vec());
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_uses_last_path_segment() {
        assert_eq!(short_type_name("truffle_showcase::gfx::GlobalUBO"), "GlobalUBO");
        assert_eq!(short_type_name("f32"), "f32");
    }
}
