use anyhow::Context as _;
use cgmath::Vector2;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    animation::{model_state_at, FrameInput, SceneAnimator},
    canvas::{CanvasState, ContextGuard, LoadOutcome, ModelSlot, RenderQuality},
    config::SceneConfig,
    gfx::{
        camera::camera_utils::CameraManager,
        rendering::render_engine::{EngineSettings, FrameStatus, RenderEngine},
        scene::scene::Scene,
    },
    scroll::ScrollDriver,
    ui::{draw_overlay, draw_page, Overlay, RecoveryAction, UiManager},
};

/// Longest frame step fed to the animator, so a stall does not jump the model
const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

pub struct ShowcaseApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

impl ShowcaseApp {
    pub fn new(config: SceneConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState::new(config),
        })
    }

    /// Runs the event loop until the window closes
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop
            .run_app(&mut self.app_state)
            .context("event loop terminated with an error")?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Surface-independent state, rebuilt as a whole by "Reload page"
struct Showcase {
    scene: Scene,
    scroll: ScrollDriver,
    slot: ModelSlot,
    guard: ContextGuard,
    animator: SceneAnimator,
}

impl Showcase {
    fn new(config: &SceneConfig, viewport: PhysicalSize<u32>) -> Self {
        let aspect = viewport.width.max(1) as f32 / viewport.height.max(1) as f32;
        let camera_manager = CameraManager::from_config(&config.camera, aspect);
        let mut showcase = Self {
            scene: Scene::new(camera_manager, config.stage_offset),
            scroll: ScrollDriver::new(config.page, viewport.height as f32),
            slot: ModelSlot::new(config.defaults.scale),
            guard: ContextGuard::new(config.context_lost_grace),
            animator: SceneAnimator::new(config.animator),
        };
        showcase.request_model(config);
        showcase
    }

    fn request_model(&mut self, config: &SceneConfig) {
        self.scene.set_model(ModelSlot::placeholder());
        if let Some(outcome) = self.slot.request(config.model.clone()) {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Loaded(model) => {
                if let Some(descriptor) = self.slot.descriptor() {
                    self.animator.set_descriptor(descriptor);
                }
                self.scene.set_model(model);
                if let Some(name) = self.scene.model_name() {
                    log::info!("Mounted model '{name}'");
                }
            }
            LoadOutcome::Failed(err) => {
                log::warn!("Showing scene error: {err}");
                self.scene.clear_model();
                self.animator.reset();
            }
        }
    }
}

struct AppState {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    ui_manager: Option<UiManager>,
    showcase: Showcase,
    pointer: Vector2<f32>,
    last_frame: Instant,
    /// A surface-level loss that clears once a frame presents again
    restore_on_present: bool,
    fatal: Option<anyhow::Error>,
}

impl AppState {
    fn new(config: SceneConfig) -> Self {
        let showcase = Showcase::new(&config, PhysicalSize::new(1200, 800));
        Self {
            config,
            window: None,
            render_engine: None,
            ui_manager: None,
            showcase,
            pointer: Vector2::new(0.0, 0.0),
            last_frame: Instant::now(),
            restore_on_present: false,
            fatal: None,
        }
    }

    /// Creates the render engine and UI for the current window.
    ///
    /// Any previous engine is dropped first so the old device is released
    /// before the new one is requested.
    fn create_surface(&mut self) -> anyhow::Result<()> {
        let window = self.window.clone().context("no window")?;
        self.ui_manager = None;
        self.render_engine = None;

        let quality = RenderQuality::for_format(self.config.model.format);
        log::info!(
            "Creating surface generation {} ({} model, {:?})",
            self.showcase.guard.generation(),
            self.config.model.format,
            quality
        );

        let size = window.inner_size();
        let settings = EngineSettings {
            quality,
            lighting: self.config.lighting.clone(),
            background: self.config.background,
            scale_factor: window.scale_factor(),
        };
        let engine = pollster::block_on(RenderEngine::new(
            window.clone(),
            size.width,
            size.height,
            settings,
        ))
        .context("failed to create render engine")?;

        let ui_manager = UiManager::new(
            engine.device(),
            engine.queue(),
            engine.surface_format(),
            &window,
        );

        self.showcase.scene.resize(size.width, size.height);
        self.showcase.scroll.set_viewport_height(size.height as f32);
        self.ui_manager = Some(ui_manager);
        self.render_engine = Some(engine);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn context_lost(&mut self, event_loop: &ActiveEventLoop, device_lost: bool) {
        if !self.showcase.guard.on_context_lost(Instant::now()) {
            return;
        }
        self.showcase.slot.unmount();
        self.showcase.animator.reset();
        self.showcase.scene.clear_model();

        if device_lost {
            // The overlay needs a working device to be drawn at all
            self.restore_on_present = false;
            if let Err(err) = self.create_surface() {
                self.fail(event_loop, err);
            }
        } else {
            self.restore_on_present = true;
        }
    }

    fn recover(&mut self, event_loop: &ActiveEventLoop, action: RecoveryAction) {
        match action {
            RecoveryAction::TryAgain => {
                let generation = self.showcase.guard.request_retry();
                log::info!("Retrying display, surface generation {generation}");
            }
            RecoveryAction::ReloadPage => {
                log::info!("Reloading showcase");
                let size = self
                    .window
                    .as_ref()
                    .map(|window| window.inner_size())
                    .unwrap_or(PhysicalSize::new(1200, 800));
                self.showcase = Showcase::new(&self.config, size);
            }
        }
        self.restore_on_present = false;

        if let Err(err) = self.create_surface() {
            self.fail(event_loop, err);
            return;
        }
        if self.showcase.slot.descriptor().is_none() {
            self.showcase.request_model(&self.config);
        }
        self.showcase.guard.mount(Instant::now());
    }

    fn handle_keyboard(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Pressed {
            let scroll = &mut self.showcase.scroll;
            match event.physical_key {
                PhysicalKey::Code(KeyCode::Escape) => event_loop.exit(),
                PhysicalKey::Code(KeyCode::PageDown | KeyCode::Space) => scroll.scroll_pages(1.0),
                PhysicalKey::Code(KeyCode::PageUp) => scroll.scroll_pages(-1.0),
                PhysicalKey::Code(KeyCode::ArrowDown) => scroll.scroll_lines(1.0),
                PhysicalKey::Code(KeyCode::ArrowUp) => scroll.scroll_lines(-1.0),
                PhysicalKey::Code(KeyCode::Home) => scroll.scroll_to(0.0),
                PhysicalKey::Code(KeyCode::End) => {
                    let range = scroll.scroll_range();
                    scroll.scroll_to(range);
                }
                _ => {}
            }
        }
        self.showcase
            .scene
            .camera_manager
            .process_keyboard_event(event);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).min(MAX_FRAME_DELTA);
        self.last_frame = now;

        if let Some(outcome) = self.showcase.slot.poll() {
            self.showcase.apply_outcome(outcome);
        }
        if self
            .render_engine
            .as_ref()
            .is_some_and(RenderEngine::is_device_lost)
        {
            self.context_lost(event_loop, true);
        }

        let (Some(window), Some(render_engine), Some(ui_manager)) = (
            self.window.as_ref(),
            self.render_engine.as_mut(),
            self.ui_manager.as_mut(),
        ) else {
            return;
        };

        let showcase = &mut self.showcase;
        let overlay = Overlay::choose(showcase.guard.state(), showcase.slot.state());
        let draw_scene = showcase.guard.should_render() && overlay.shows_scene();

        let (width, height) = render_engine.get_surface_size();
        let viewport = [width as f32, height as f32];
        let progress = showcase.scroll.progress();

        showcase.scene.update();
        if draw_scene {
            let input = FrameInput {
                delta: delta.as_secs_f32(),
                progress,
                model_state: model_state_at(progress, &self.config.scroll_points, self.config.defaults),
                pointer: self.pointer,
                pulse_intensity: self
                    .config
                    .animator
                    .pulse
                    .window
                    .map_or(0.0, |window| window.intensity(progress)),
                view_proj: showcase.scene.camera_manager.get_view_proj_matrix(),
                viewport,
                parent: showcase.scene.stage_matrix(),
            };
            showcase.animator.update(showcase.scene.rig_mut(), &input);
        }

        let slide = showcase.scroll.slide_offset_percent();
        let mut action = None;
        let status = render_engine.render_frame(
            draw_scene.then_some(&showcase.scene),
            |device, queue, encoder, color_attachment| {
                ui_manager.draw(device, queue, encoder, window, color_attachment, |ui| {
                    draw_page(ui, slide, viewport);
                    action = draw_overlay(ui, &overlay, viewport);
                });
            },
        );

        match status {
            FrameStatus::Presented => {
                if self.restore_on_present && self.showcase.guard.state() == CanvasState::ContextLost {
                    self.restore_on_present = false;
                    self.showcase.guard.on_context_restored();
                    self.showcase.request_model(&self.config);
                }
            }
            FrameStatus::Lost => {
                let device_lost = self
                    .render_engine
                    .as_ref()
                    .is_some_and(RenderEngine::is_device_lost);
                self.context_lost(event_loop, device_lost);
            }
            FrameStatus::Skipped | FrameStatus::Reconfigured => {}
        }

        if let Some(action) = action {
            self.recover(event_loop, action);
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title("truffle1")
            .with_inner_size(winit::dpi::LogicalSize::new(1200, 800));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(event_loop, anyhow::Error::new(err).context("failed to create window"));
                return;
            }
        };
        self.window = Some(window);

        match self.create_surface() {
            Ok(()) => self.showcase.guard.mount(Instant::now()),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if let Some(ui_manager) = self.ui_manager.as_mut() {
            if ui_manager.handle_window_event(&window, window_id, &event) {
                window.request_redraw();
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.showcase.scene.resize(width, height);
                self.showcase.scroll.set_viewport_height(height as f32);
                if let Some(render_engine) = self.render_engine.as_mut() {
                    render_engine.resize(width, height, window.scale_factor());
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // With zoom enabled the wheel belongs to the camera
                if self.showcase.scene.camera_manager.controller.handles_wheel() {
                    return;
                }
                match delta {
                    MouseScrollDelta::LineDelta(_, lines) => {
                        self.showcase.scroll.scroll_lines(-lines)
                    }
                    MouseScrollDelta::PixelDelta(pixels) => {
                        self.showcase.scroll.scroll_by(-pixels.y as f32)
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let size = window.inner_size();
                if size.width > 0 && size.height > 0 {
                    self.pointer = Vector2::new(
                        (position.x / f64::from(size.width)) as f32 * 2.0 - 1.0,
                        1.0 - (position.y / f64::from(size.height)) as f32 * 2.0,
                    );
                }
            }
            WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(event_loop, &event),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if self
            .ui_manager
            .as_ref()
            .is_some_and(UiManager::wants_input)
        {
            self.showcase.scene.camera_manager.controller.release();
            return;
        }
        self.showcase.scene.camera_manager.process_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}
