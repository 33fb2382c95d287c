//! Global uniform bindings for camera and lighting
//!
//! Everything shaders need once per frame: camera matrices, the summed
//! ambient term and up to [`MAX_DIRECTIONAL_LIGHTS`] directional lights.

use cgmath::{InnerSpace, Vector3};

use crate::{
    gfx::camera::camera_utils::CameraUniform,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Light shining from `position` towards the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Lights configured once per surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightingRig {
    pub ambient: Vec<AmbientLight>,
    pub directional: Vec<DirectionalLight>,
}

impl LightingRig {
    /// Sum of all ambient contributions
    pub fn ambient_term(&self) -> [f32; 3] {
        self.ambient.iter().fold([0.0; 3], |acc, light| {
            [
                acc[0] + light.color[0] * light.intensity,
                acc[1] + light.color[1] * light.intensity,
                acc[2] + light.color[2] * light.intensity,
            ]
        })
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// Unit vector pointing from the surface towards the light
    pub direction: [f32; 4],
    /// Premultiplied by intensity
    pub color: [f32; 4],
}

/// MUST match the Globals struct in showcase.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    ambient: [f32; 4],
    lights: [LightUniform; MAX_DIRECTIONAL_LIGHTS],
    /// light count, environment reflection strength, unused, unused
    params: [f32; 4],
}

pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Packs camera and lights into the uniform layout.
///
/// Lights beyond [`MAX_DIRECTIONAL_LIGHTS`] are ignored.
pub fn global_content(
    camera: &CameraUniform,
    rig: &LightingRig,
    environment_strength: f32,
) -> GlobalUBOContent {
    let mut lights = [LightUniform::default(); MAX_DIRECTIONAL_LIGHTS];
    let mut count = 0;
    for (slot, light) in lights.iter_mut().zip(&rig.directional) {
        let dir = Vector3::from(light.position);
        if dir.magnitude2() == 0.0 {
            continue;
        }
        let dir = dir.normalize();
        *slot = LightUniform {
            direction: [dir.x, dir.y, dir.z, 0.0],
            color: [
                light.color[0] * light.intensity,
                light.color[1] * light.intensity,
                light.color[2] * light.intensity,
                1.0,
            ],
        };
        count += 1;
    }

    let [ar, ag, ab] = rig.ambient_term();
    GlobalUBOContent {
        view_position: camera.view_position,
        view_proj: camera.view_proj,
        view: camera.view,
        ambient: [ar, ag, ab, 1.0],
        lights,
        params: [count as f32, environment_strength, 0.0, 0.0],
    }
}

/// Manages the bind group layout and bind group for global uniforms
///
/// Bound to slot 0 in every scene pipeline.
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(&mut self, device: &wgpu::Device, ubo: &GlobalUBO) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .create(device, "Global Bind Group"),
        );
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}
