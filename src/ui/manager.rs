//! ImGui integration with wgpu and winit
//!
//! The page copy and every overlay are drawn through one [`UiManager`] after
//! the scene has been scaled onto the surface.

use imgui::{Context, FontConfig, FontSource, MouseCursor, Style, StyleColor};
use imgui_wgpu::{Renderer, RendererConfig};
use imgui_winit_support::{HiDpiMode, WinitPlatform};
use std::time::Instant;
use wgpu::{CommandEncoder, Device, Queue, TextureFormat, TextureView};
use winit::{
    event::{Event, WindowEvent},
    window::{Window, WindowId},
};

const BASE_FONT_SIZE: f32 = 17.0;

/// Font size in physical pixels for a window scale factor
pub fn font_size_for(scale_factor: f64) -> f32 {
    (BASE_FONT_SIZE * scale_factor.clamp(1.0, 3.0) as f32).round()
}

/// Dark page palette: transparent panels, white copy, light buttons
fn apply_page_theme(style: &mut Style) {
    style.use_dark_colors();
    style.window_border_size = 0.0;
    style.window_rounding = 8.0;
    style.frame_rounding = 18.0;
    style.frame_padding = [18.0, 8.0];
    style.item_spacing = [12.0, 10.0];

    style[StyleColor::WindowBg] = [0.04, 0.04, 0.04, 0.92];
    style[StyleColor::Text] = [1.0, 1.0, 1.0, 1.0];
    style[StyleColor::Button] = [1.0, 1.0, 1.0, 0.12];
    style[StyleColor::ButtonHovered] = [1.0, 1.0, 1.0, 0.24];
    style[StyleColor::ButtonActive] = [1.0, 1.0, 1.0, 0.36];
}

pub struct UiManager {
    context: Context,
    platform: WinitPlatform,
    renderer: Renderer,
    last_frame: Instant,
    last_cursor: Option<MouseCursor>,
}

impl UiManager {
    /// Sets up ImGui for `window`.
    ///
    /// DPI is locked to 1.0 so that layout works in physical pixels, the same
    /// units the scroll driver uses. The font is scaled up instead.
    pub fn new(
        device: &Device,
        queue: &Queue,
        output_color_format: TextureFormat,
        window: &Window,
    ) -> Self {
        let mut context = Context::create();
        context.set_ini_filename(None);
        apply_page_theme(context.style_mut());

        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(context.io_mut(), window, HiDpiMode::Locked(1.0));

        let size_pixels = font_size_for(window.scale_factor());
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels,
                ..Default::default()
            }),
        }]);
        log::debug!("UI font at {size_pixels}px");

        let renderer = Renderer::new(
            &mut context,
            device,
            queue,
            RendererConfig {
                texture_format: output_color_format,
                ..Default::default()
            },
        );

        Self {
            context,
            platform,
            renderer,
            last_frame: Instant::now(),
            last_cursor: None,
        }
    }

    /// Feeds pointer, keyboard and focus events to ImGui.
    ///
    /// Returns true when the UI wants the input for itself, e.g. while a
    /// recovery button is hovered.
    pub fn handle_window_event(&mut self, window: &Window, window_id: WindowId, event: &WindowEvent) -> bool {
        if !matches!(
            event,
            WindowEvent::CursorMoved { .. }
                | WindowEvent::MouseInput { .. }
                | WindowEvent::MouseWheel { .. }
                | WindowEvent::KeyboardInput { .. }
                | WindowEvent::Focused(_)
        ) {
            return false;
        }

        let wrapped: Event<()> = Event::WindowEvent {
            window_id,
            event: event.clone(),
        };
        self.platform
            .handle_event(self.context.io_mut(), window, &wrapped);
        self.wants_input()
    }

    pub fn wants_input(&self) -> bool {
        let io = self.context.io();
        io.want_capture_mouse || io.want_capture_keyboard
    }

    /// Builds this frame's UI with `run_ui` and records it on top of
    /// `color_attachment`, keeping what the scene pass left there.
    pub fn draw<F>(
        &mut self,
        device: &Device,
        queue: &Queue,
        encoder: &mut CommandEncoder,
        window: &Window,
        color_attachment: &TextureView,
        run_ui: F,
    ) where
        F: FnOnce(&imgui::Ui),
    {
        let now = Instant::now();
        self.context
            .io_mut()
            .update_delta_time(now - self.last_frame);
        self.last_frame = now;

        if let Err(e) = self.platform.prepare_frame(self.context.io_mut(), window) {
            log::warn!("Failed to prepare UI frame: {e}");
        }

        let ui = self.context.frame();
        run_ui(ui);
        if self.last_cursor != ui.mouse_cursor() {
            self.last_cursor = ui.mouse_cursor();
            self.platform.prepare_render(ui, window);
        }

        let draw_data = self.context.render();
        if draw_data.display_size[0] <= 0.0 || draw_data.display_size[1] <= 0.0 {
            return;
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Page Overlay Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_attachment,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Err(e) = self
            .renderer
            .render(draw_data, queue, device, &mut render_pass)
        {
            log::error!("Failed to render UI: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_scales_with_display_density() {
        assert_eq!(font_size_for(1.0), 17.0);
        assert_eq!(font_size_for(2.0), 34.0);
        // Fractional and out-of-range factors stay readable
        assert_eq!(font_size_for(0.5), 17.0);
        assert_eq!(font_size_for(1.25), 21.0);
        assert_eq!(font_size_for(8.0), 51.0);
    }
}
