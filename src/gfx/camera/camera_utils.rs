use cgmath::{Matrix4, Point3, SquareMatrix};
use winit::event::{DeviceEvent, KeyEvent};

use super::{camera_controller::CameraController, orbit_camera::OrbitCamera};
use crate::config::CameraConfig;

/// Orbit camera plus the controller that turns input into orbit moves
pub struct CameraManager {
    pub camera: OrbitCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            camera: OrbitCamera::from_config(config, aspect),
            controller: CameraController::new(config),
        }
    }

    pub fn process_event(&mut self, event: &DeviceEvent) {
        self.controller.process_events(event, &mut self.camera);
    }

    pub fn process_keyboard_event(&mut self, event: &KeyEvent) {
        self.controller.process_keyed_events(event, &mut self.camera);
    }

    pub fn get_view_proj_matrix(&self) -> Matrix4<f32> {
        self.camera.build_view_projection_matrix()
    }
}

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

/// Camera block of the global uniform
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// Eye position, w = 1 to keep the 16 byte alignment
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// View matrix alone, for the matcap lookup
    pub view: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(eye: Point3<f32>, view: Matrix4<f32>, proj: Matrix4<f32>) -> Self {
        Self {
            view_position: [eye.x, eye.y, eye.z, 1.0],
            view_proj: convert_matrix4_to_array(proj * view),
            view: convert_matrix4_to_array(view),
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let [x, y, z, _] = self.view_position;
        Point3::new(x, y, z)
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new(Point3::new(0.0, 0.0, 0.0), Matrix4::identity(), Matrix4::identity())
    }
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}
