use super::camera_utils::{Camera, CameraUniform};
use crate::config::CameraConfig;
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Y-up orbit camera described by spherical coordinates around `target`.
///
/// `polar` is measured from +Y, so `PI / 2` sits on the horizon; `azimuth`
/// is measured from +Z towards +X.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub polar: f32,
    pub azimuth: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
    home: (f32, f32, f32),
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.build_projection_matrix() * self.build_view_matrix()
    }
}

impl OrbitCamera {
    /// Places the camera at `config.position`, orbiting `config.target`
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let target = Vector3::from(config.target);
        let offset = Vector3::from(config.position) - target;
        let distance = offset.magnitude().max(f32::EPSILON);
        let polar = (offset.y / distance).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);

        let mut camera = Self {
            distance,
            polar,
            azimuth,
            eye: Vector3::zero(), // Derived in `update()`
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds {
                min_polar: config.min_polar,
                max_polar: config.max_polar,
                ..Default::default()
            },
            aspect,
            fovy: Deg(config.fov_degrees).into(),
            znear: config.near,
            zfar: config.far,
            uniform: CameraUniform::default(),
            home: (distance, polar, azimuth),
        };
        camera.set_polar(polar);
        camera
    }

    pub fn build_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn build_view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    pub fn reset_to_default(&mut self) {
        let (distance, polar, azimuth) = self.home;
        self.distance = distance;
        self.azimuth = azimuth;
        self.set_polar(polar);
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance * (1.0 + delta));
    }

    pub fn set_polar(&mut self, polar: f32) {
        self.polar = polar.clamp(self.bounds.min_polar, self.bounds.max_polar);
        self.update();
    }

    pub fn add_polar(&mut self, delta: f32) {
        self.set_polar(self.polar + delta);
    }

    pub fn add_azimuth(&mut self, delta: f32) {
        self.azimuth += delta;
        self.update();
    }

    /// Moves eye and target together, in the camera's screen plane
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        let movement = (right * delta.0 + up * delta.1) * self.distance;
        self.eye += movement;
        self.target += movement;
    }

    /// Updates the eye after changing `distance`, `polar` or `azimuth`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.polar, self.azimuth, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn update_view_proj(&mut self) {
        self.uniform = CameraUniform::new(
            Point3::from_vec(self.eye),
            self.build_view_matrix(),
            self.build_projection_matrix(),
        );
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_polar: f32,
    pub max_polar: f32,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: None,
            max_distance: None,
            min_polar: f32::EPSILON,
            max_polar: std::f32::consts::PI - f32::EPSILON,
        }
    }
}

fn calculate_cartesian_eye_position(
    polar: f32,
    azimuth: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * polar.sin() * azimuth.sin(),
        distance * polar.cos(),
        distance * polar.sin() * azimuth.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }

    #[test]
    fn test_config_position_round_trips() {
        let camera = camera();
        assert!((camera.distance - 0.05).abs() < 1e-6);
        assert!((camera.eye.z - 0.05).abs() < 1e-6);
        assert!(camera.eye.x.abs() < 1e-6 && camera.eye.y.abs() < 1e-6);
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut camera = camera();
        camera.add_polar(-10.0);
        assert_eq!(camera.polar, std::f32::consts::FRAC_PI_4);
        camera.add_polar(10.0);
        assert_eq!(camera.polar, std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_reset_restores_home() {
        let mut camera = camera();
        camera.add_azimuth(1.0);
        camera.add_polar(-0.3);
        camera.reset_to_default();
        assert!((camera.eye.z - 0.05).abs() < 1e-6);
    }
}
