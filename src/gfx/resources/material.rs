//! Surface materials
//!
//! A [`Material`] is a plain description of how a surface is shaded. Meshes
//! reference materials through [`SharedMaterial`], which wraps the description
//! together with the only properties animated at runtime (emissive color and
//! intensity). Those are stored as atomics so one material can be shared by
//! every mesh in the process without locking.

use std::sync::{
    atomic::{AtomicU32, AtomicU64, Ordering},
    Arc,
};

use wgpu::Device;

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Lighting model used by the fragment shader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Metal/roughness lighting from the scene lights
    Standard,
    /// Flat base color, no lighting
    Unlit,
    /// Studio look-up from the view-space normal
    Matcap,
}

impl Shading {
    fn as_gpu(self) -> f32 {
        match self {
            Shading::Standard => 0.0,
            Shading::Unlit => 1.0,
            Shading::Matcap => 2.0,
        }
    }
}

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    /// metallic, roughness, transmission, ior
    pub surface: [f32; 4],
    /// thickness, shading model, opacity, unused
    pub extra: [f32; 4],
}

pub type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Layout shared by every material bind group, bound to slot 2
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Material Bind Group");

        MaterialBindings { bind_group_layout }
    }

    pub fn create_bind_group(&self, device: &Device, ubo: &MaterialUBO, label: &str) -> wgpu::BindGroup {
        BindGroupBuilder::new(&self.bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, label)
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }
}

/// Uniform buffer and bind group uploaded for one [`SharedMaterial`]
pub struct GpuMaterial {
    ubo: MaterialUBO,
    bind_group: wgpu::BindGroup,
}

impl GpuMaterial {
    pub fn new(device: &Device, bindings: &MaterialBindings, uniform: &MaterialUniform, label: &str) -> Self {
        let ubo = MaterialUBO::new_with_data(device, uniform);
        let bind_group = bindings.create_bind_group(device, &ubo, label);
        Self { ubo, bind_group }
    }

    /// Uploads the uniform if it changed since the last frame
    pub fn update(&mut self, queue: &wgpu::Queue, uniform: MaterialUniform) {
        self.ubo.update_content(queue, uniform);
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Surface description
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub shading: Shading,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub transmission: f32,
    pub thickness: f32,
    pub ior: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    /// Drawn as triangle edges instead of filled faces
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            shading: Shading::Standard,
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            transmission: 0.0,
            thickness: 0.0,
            ior: 1.5,
            emissive: [0.0, 0.0, 0.0],
            emissive_intensity: 0.0,
            wireframe: false,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: [f32; 3]) -> Self {
        self.base_color = [color[0], color[1], color[2], self.base_color[3]];
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.base_color[3] = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_transmission(mut self, transmission: f32, thickness: f32, ior: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self.thickness = thickness.max(0.0);
        self.ior = ior.max(1.0);
        self
    }

    pub fn with_shading(mut self, shading: Shading) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_wireframe(mut self) -> Self {
        self.wireframe = true;
        self
    }

    /// Whether the surface needs blending and must not write depth
    pub fn is_translucent(&self) -> bool {
        !self.wireframe && (self.transmission > 0.0 || self.base_color[3] < 1.0)
    }
}

/// A material shared between meshes with animatable emission
#[derive(Debug)]
pub struct SharedMaterial {
    id: u64,
    descriptor: Material,
    emissive: [AtomicU32; 3],
    emissive_intensity: AtomicU32,
}

impl SharedMaterial {
    pub fn new(descriptor: Material) -> Self {
        let [r, g, b] = descriptor.emissive;
        Self {
            id: NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed),
            emissive: [
                AtomicU32::new(r.to_bits()),
                AtomicU32::new(g.to_bits()),
                AtomicU32::new(b.to_bits()),
            ],
            emissive_intensity: AtomicU32::new(descriptor.emissive_intensity.to_bits()),
            descriptor,
        }
    }

    pub fn shared(descriptor: Material) -> Arc<Self> {
        Arc::new(Self::new(descriptor))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn descriptor(&self) -> &Material {
        &self.descriptor
    }

    pub fn set_emissive(&self, color: [f32; 3], intensity: f32) {
        for (slot, value) in self.emissive.iter().zip(color) {
            slot.store(value.to_bits(), Ordering::Relaxed);
        }
        self.emissive_intensity
            .store(intensity.max(0.0).to_bits(), Ordering::Relaxed);
    }

    pub fn emissive(&self) -> ([f32; 3], f32) {
        let color = [
            f32::from_bits(self.emissive[0].load(Ordering::Relaxed)),
            f32::from_bits(self.emissive[1].load(Ordering::Relaxed)),
            f32::from_bits(self.emissive[2].load(Ordering::Relaxed)),
        ];
        let intensity = f32::from_bits(self.emissive_intensity.load(Ordering::Relaxed));
        (color, intensity)
    }

    /// Snapshot of the current GPU-facing parameters
    pub fn uniform(&self) -> MaterialUniform {
        let m = &self.descriptor;
        let (emissive, emissive_intensity) = self.emissive();
        let opacity = if m.transmission > 0.0 {
            // Transmission is approximated with alpha blending
            m.base_color[3] * (1.0 - m.transmission * 0.5)
        } else {
            m.base_color[3]
        };
        MaterialUniform {
            base_color: m.base_color,
            emissive,
            emissive_intensity,
            surface: [m.metallic, m.roughness, m.transmission, m.ior],
            extra: [m.thickness, m.shading.as_gpu(), opacity, 0.0],
        }
    }
}
