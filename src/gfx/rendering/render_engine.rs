//! WGPU-based rendering engine for the showcase surface
//!
//! Renders the scene into an offscreen linear target sized by the surface's
//! [`RenderQuality`], scales that onto the window and finally hands the
//! surface view to the UI callback. Opaque meshes draw first, then wireframes,
//! then translucent meshes back to front.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use wgpu::TextureFormat;

use super::{
    draw_list::{DrawList, DrawPass},
    pipeline_manager::{PipelineConfig, PipelineManager},
    render_pass_ext::{GpuMesh, RenderPassExt, TransformPool},
};
use crate::{
    canvas::RenderQuality,
    gfx::{
        resources::{
            global_bindings::{global_content, GlobalBindings, GlobalUBO, LightingRig},
            material::{GpuMaterial, Material, MaterialBindings, SharedMaterial},
            texture_resource::TextureResource,
        },
        scene::scene::Scene,
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
    },
};

/// Linear HDR format of the offscreen scene target
pub const SCENE_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

const OPAQUE: &str = "Opaque";
const TRANSLUCENT: &str = "Translucent";
const WIREFRAME: &str = "Wireframe";
const BLIT: &str = "Blit";

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}

/// What happened to a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// Nothing was drawn this frame; try again next frame
    Skipped,
    /// The surface was outdated and has been reconfigured
    Reconfigured,
    /// The device or surface is gone and the engine must be recreated
    Lost,
}

/// Per-surface settings fixed when the engine is created
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub quality: RenderQuality,
    pub lighting: LightingRig,
    /// sRGB clear color
    pub background: [f32; 3],
    pub scale_factor: f64,
}

struct SceneTargets {
    depth: TextureResource,
    msaa_color: Option<TextureResource>,
    color: TextureResource,
    blit_bind_group: wgpu::BindGroup,
}

impl SceneTargets {
    fn new(
        device: &wgpu::Device,
        blit_layout: &BindGroupLayoutWithDesc,
        width: u32,
        height: u32,
        samples: u32,
    ) -> Self {
        let depth =
            TextureResource::create_depth_texture(device, width, height, samples, "Scene Depth");
        let msaa_color = (samples > 1).then(|| {
            TextureResource::create_color_target(
                device,
                width,
                height,
                SCENE_FORMAT,
                samples,
                "Scene MSAA Color",
            )
        });
        let color =
            TextureResource::create_color_target(device, width, height, SCENE_FORMAT, 1, "Scene Color");
        let blit_bind_group = BindGroupBuilder::new(blit_layout)
            .texture(&color.view)
            .sampler(&color.sampler)
            .create(device, "Blit Bind Group");

        Self {
            depth,
            msaa_color,
            color,
            blit_bind_group,
        }
    }

    /// Attachment to draw into and the texture it resolves to, if any
    fn color_attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match &self.msaa_color {
            Some(msaa) => (&msaa.view, Some(&self.color.view)),
            None => (&self.color.view, None),
        }
    }
}

/// Scene size in physical pixels after the quality's pixel-ratio cap
pub fn scene_extent(width: u32, height: u32, quality: &RenderQuality, scale_factor: f64) -> (u32, u32) {
    let scale = quality.resolution_scale(scale_factor);
    let scaled = |v: u32| ((v as f32 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Linear clear color for an sRGB background
pub fn linear_clear_color(srgb: [f32; 3]) -> wgpu::Color {
    let to_linear = |c: f32| f64::from(c.clamp(0.0, 1.0).powf(2.2));
    wgpu::Color {
        r: to_linear(srgb[0]),
        g: to_linear(srgb[1]),
        b: to_linear(srgb[2]),
        a: 1.0,
    }
}

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    settings: EngineSettings,
    clear_color: wgpu::Color,
    device_lost: Arc<AtomicBool>,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    material_bindings: MaterialBindings,
    default_material: GpuMaterial,
    materials: HashMap<u64, GpuMaterial>,
    meshes: HashMap<u64, GpuMesh>,
    transforms: TransformPool,
    blit_layout: BindGroupLayoutWithDesc,
    targets: SceneTargets,
}

impl RenderEngine {
    /// Creates the surface, device and pipelines for a window
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        settings: EngineSettings,
    ) -> Result<RenderEngine, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let lost_flag = Arc::clone(&device_lost);
        device.set_device_lost_callback(move |reason, message| {
            // Raised when the engine itself is dropped
            if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                return;
            }
            log::error!("GPU device lost ({reason:?}): {message}");
            lost_flag.store(true, Ordering::SeqCst);
        });

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let mut global_ubo = GlobalUBO::new(&device);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo);
        let material_bindings = MaterialBindings::new(&device);
        let transforms = TransformPool::new(&device);
        let default_material = GpuMaterial::new(
            &device,
            &material_bindings,
            &SharedMaterial::new(Material::default()).uniform(),
            "Default Material",
        );

        let blit_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(&device, "Blit Bind Group");

        let samples = settings.quality.msaa_samples.max(1);
        let (scene_width, scene_height) =
            scene_extent(config.width, config.height, &settings.quality, settings.scale_factor);
        let targets = SceneTargets::new(&device, &blit_layout, scene_width, scene_height, samples);

        let mut pipeline_manager = PipelineManager::new(Arc::clone(&device));
        pipeline_manager.load_shader("showcase", include_str!("showcase.wgsl"));
        pipeline_manager.load_shader("blit", include_str!("blit.wgsl"));

        let scene_layouts = vec![
            global_bindings.bind_group_layout().clone(),
            transforms.bind_group_layout().clone(),
            material_bindings.bind_group_layout().clone(),
        ];
        let scene_pipeline = |label: &str| {
            PipelineConfig::default_with_shader("showcase")
                .with_label(label)
                .with_bind_group_layouts(scene_layouts.clone())
                .with_sample_count(samples)
        };

        pipeline_manager.register_pipeline(
            OPAQUE,
            scene_pipeline("Opaque Pipeline")
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_color_target(SCENE_FORMAT, Some(wgpu::BlendState::REPLACE)),
        );
        pipeline_manager.register_pipeline(
            TRANSLUCENT,
            scene_pipeline("Translucent Pipeline")
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT, false)
                .with_color_target(SCENE_FORMAT, Some(wgpu::BlendState::ALPHA_BLENDING)),
        );
        pipeline_manager.register_pipeline(
            WIREFRAME,
            scene_pipeline("Wireframe Pipeline")
                .with_cull_mode(None)
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_color_target(SCENE_FORMAT, Some(wgpu::BlendState::ALPHA_BLENDING)),
        );
        pipeline_manager.register_pipeline(
            BLIT,
            PipelineConfig::default_with_shader("blit")
                .with_label("Blit Pipeline")
                .with_bind_group_layouts(vec![blit_layout.layout.clone()])
                .with_cull_mode(None)
                .with_no_vertex_buffers()
                .with_color_target(format, Some(wgpu::BlendState::REPLACE)),
        );
        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            for error in errors {
                log::error!("{error}");
            }
        }

        global_ubo.update_content(
            &queue,
            global_content(
                &Default::default(),
                &settings.lighting,
                settings.quality.environment_strength(),
            ),
        );

        log::info!(
            "Render engine ready: {}x{} surface, {}x{} scene, {}x MSAA",
            config.width,
            config.height,
            scene_width,
            scene_height,
            samples
        );

        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            format,
            clear_color: linear_clear_color(settings.background),
            settings,
            device_lost,
            pipeline_manager,
            global_ubo,
            global_bindings,
            material_bindings,
            default_material,
            materials: HashMap::new(),
            meshes: HashMap::new(),
            transforms,
            blit_layout,
            targets,
        })
    }

    /// Draws one frame.
    ///
    /// Without a scene only the background is drawn, which keeps the UI
    /// overlays visible while no model is mounted.
    pub fn render_frame<F>(&mut self, scene: Option<&Scene>, ui_callback: F) -> FrameStatus
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        if self.is_device_lost() {
            return FrameStatus::Lost;
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return FrameStatus::Reconfigured;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring surface texture");
                return FrameStatus::Skipped;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory acquiring surface texture");
                return FrameStatus::Lost;
            }
            Err(e) => {
                log::warn!("Failed to acquire surface texture: {e}");
                return FrameStatus::Skipped;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draw_list = match scene {
            Some(scene) => self.prepare_scene(scene),
            None => DrawList::default(),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.record_scene_pass(&mut encoder, &draw_list);
        self.record_blit_pass(&mut encoder, &surface_view);

        ui_callback(&self.device, &self.queue, &mut encoder, &surface_view);

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();

        self.release_unused(&draw_list);
        FrameStatus::Presented
    }

    /// Uploads globals, meshes, materials and transforms for this frame
    fn prepare_scene(&mut self, scene: &Scene) -> DrawList {
        let camera = &scene.camera_manager.camera;
        self.global_ubo.update_content(
            &self.queue,
            global_content(
                &camera.uniform,
                &self.settings.lighting,
                self.settings.quality.environment_strength(),
            ),
        );

        let draw_list = DrawList::collect(scene.root(), camera.uniform.eye());

        for (index, (_, item)) in draw_list.iter().enumerate() {
            let geometry = &item.geometry;
            self.meshes
                .entry(geometry.id())
                .or_insert_with(|| GpuMesh::new(&self.device, geometry));

            if let Some(material) = &item.material {
                let uniform = material.uniform();
                self.materials
                    .entry(material.id())
                    .or_insert_with(|| {
                        GpuMaterial::new(
                            &self.device,
                            &self.material_bindings,
                            &uniform,
                            &material.descriptor().name,
                        )
                    })
                    .update(&self.queue, uniform);
            }

            self.transforms
                .write(&self.device, &self.queue, index, &item.world);
        }

        draw_list
    }

    fn record_scene_pass(&mut self, encoder: &mut wgpu::CommandEncoder, draw_list: &DrawList) {
        let opaque = self.pipeline_manager.get_pipeline(OPAQUE).cloned();
        let wireframe = self.pipeline_manager.get_pipeline(WIREFRAME).cloned();
        let translucent = self.pipeline_manager.get_pipeline(TRANSLUCENT).cloned();

        let (view, resolve_target) = self.targets.color_attachment();
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let Some(globals) = self.global_bindings.bind_group() else {
            return;
        };
        render_pass.set_bind_group(0, globals, &[]);

        let mut bound_pass = None;
        for (index, (pass, item)) in draw_list.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&item.geometry.id()) else {
                continue;
            };
            let Some(transform) = self.transforms.bind_group(index) else {
                continue;
            };

            if bound_pass != Some(pass) {
                let pipeline = match pass {
                    DrawPass::Opaque => opaque.as_ref(),
                    DrawPass::Wireframe => wireframe.as_ref(),
                    DrawPass::Translucent => translucent.as_ref(),
                };
                let Some(pipeline) = pipeline else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                bound_pass = Some(pass);
            }

            let material = item
                .material
                .as_ref()
                .and_then(|m| self.materials.get(&m.id()))
                .unwrap_or(&self.default_material);

            render_pass.set_bind_group(1, transform, &[]);
            render_pass.set_bind_group(2, material.bind_group(), &[]);
            match pass {
                DrawPass::Wireframe => render_pass.draw_mesh_edges(mesh),
                DrawPass::Opaque | DrawPass::Translucent => render_pass.draw_mesh(mesh),
            }
        }
    }

    fn record_blit_pass(&mut self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let Some(blit) = self.pipeline_manager.get_pipeline(BLIT).cloned() else {
            return;
        };
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&blit);
        render_pass.set_bind_group(0, &self.targets.blit_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    /// Frees GPU copies of meshes and materials that were not drawn
    fn release_unused(&mut self, draw_list: &DrawList) {
        let geometries: HashSet<u64> = draw_list.iter().map(|(_, item)| item.geometry.id()).collect();
        let materials: HashSet<u64> = draw_list
            .iter()
            .filter_map(|(_, item)| item.material.as_ref().map(|m| m.id()))
            .collect();
        self.meshes.retain(|id, _| geometries.contains(id));
        self.materials.retain(|id, _| materials.contains(id));
    }

    /// Resizes the surface and recreates the scene targets
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f64) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.settings.scale_factor = scale_factor;
        self.surface.configure(&self.device, &self.config);

        let (scene_width, scene_height) =
            scene_extent(width, height, &self.settings.quality, scale_factor);
        self.targets = SceneTargets::new(
            &self.device,
            &self.blit_layout,
            scene_width,
            scene_height,
            self.settings.quality.msaa_samples.max(1),
        );
    }

    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> TextureFormat {
        self.format
    }

    pub fn quality(&self) -> RenderQuality {
        self.settings.quality
    }

    /// Set once the device reports a loss other than being dropped
    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_extent_caps_pixel_ratio() {
        // 3x display, full quality caps at 2x
        let (w, h) = scene_extent(3000, 1500, &RenderQuality::FULL, 3.0);
        assert_eq!((w, h), (2000, 1000));
        // Reduced quality renders at 1x
        let (w, h) = scene_extent(3000, 1500, &RenderQuality::REDUCED, 3.0);
        assert_eq!((w, h), (1000, 500));
        // Never upscales past the window
        assert_eq!(scene_extent(800, 600, &RenderQuality::FULL, 1.0), (800, 600));
    }

    #[test]
    fn test_clear_color_is_linearized() {
        let color = linear_clear_color([0.5, 0.0, 1.0]);
        assert!((color.r - 0.5f64.powf(2.2)).abs() < 1e-3);
        assert_eq!(color.g, 0.0);
        assert_eq!(color.b, 1.0);
        assert_eq!(color.a, 1.0);
    }
}
