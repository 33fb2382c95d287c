use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
};

use super::orbit_camera::OrbitCamera;
use crate::config::CameraConfig;

/// Drag-to-orbit input handling. Zoom and pan are only honoured when the
/// camera config enables them; otherwise the wheel belongs to the page.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    enable_zoom: bool,
    enable_pan: bool,
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: 0.01,
            enable_zoom: config.enable_zoom,
            enable_pan: config.enable_pan,
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    /// Whether wheel input is consumed by the camera
    pub fn handles_wheel(&self) -> bool {
        self.enable_zoom
    }

    /// Drops a drag in progress, e.g. when the pointer is over the UI
    pub fn release(&mut self) {
        self.is_mouse_pressed = false;
    }

    pub fn process_events(&mut self, event: &DeviceEvent, camera: &mut OrbitCamera) {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
            }
            DeviceEvent::MouseWheel { delta } if self.enable_zoom => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32 / 100.0
                    }
                };
                camera.add_distance(scroll_amount * self.zoom_speed);
            }
            DeviceEvent::MouseMotion { delta } if self.is_mouse_pressed => {
                if self.is_shift_held && self.enable_pan {
                    camera.pan((
                        -delta.0 as f32 * self.pan_speed,
                        delta.1 as f32 * self.pan_speed,
                    ));
                } else {
                    camera.add_azimuth(-delta.0 as f32 * self.rotate_speed);
                    camera.add_polar(-delta.1 as f32 * self.rotate_speed);
                }
            }
            _ => (),
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                ..
            } if self.is_shift_held => {
                log::info!("Resetting camera");
                camera.reset_to_default();
            }
            _ => (),
        }
    }
}
