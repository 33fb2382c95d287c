//! Static scene configuration
//!
//! Everything the showcase needs to know about the product scene is compiled
//! in here. [`SceneConfig::default`] reproduces the main product scene; the
//! binary only overrides the model descriptor and the pointer tilt toggle.

use std::{f32::consts::PI, time::Duration};

use cgmath::Vector3;

use crate::{
    animation::keyframes::{ModelState, ScrollPoint},
    gfx::resources::global_bindings::{AmbientLight, DirectionalLight, LightingRig},
    loader::{ModelDescriptor, ModelFormat},
};

/// Model shown when no override is given on the command line
pub const DEFAULT_MODEL_PATH: &str = "assets/models/truffle-os-latest.glb";

/// Model scale used when no keyframe provides one
pub const DEFAULT_SCALE: f32 = 800.2;
/// Model rotation used when no keyframe provides one
pub const DEFAULT_ROTATION: [f32; 3] = [1.7, 3.3, 4.3];

/// Context-loss signals this soon after a surface is created are ignored
pub const CONTEXT_LOST_GRACE: Duration = Duration::from_millis(300);

const BASE_X: f32 = 1.7;
const BASE_Y: f32 = 3.3;
const BASE_Z: f32 = 4.3;
const BASE_SCALE: f32 = 15.2;

/// The product keyframes: a full turn around Z over the page, with a close-up
/// hold over the second section and the model hidden in the middle sections.
pub fn default_scroll_points() -> Vec<ScrollPoint> {
    vec![
        ScrollPoint::at(0.0)
            .with_rotation(BASE_X, BASE_Y, BASE_Z)
            .with_scale(BASE_SCALE),
        ScrollPoint::at(0.15)
            .with_position(-0.02, 0.0, 0.0)
            .with_rotation(BASE_X, BASE_Y - PI / 1.7, BASE_Z + PI * 0.5)
            .with_scale(BASE_SCALE * 1.2),
        ScrollPoint::at(0.25)
            .with_position(-0.02, 0.0, 0.0)
            .with_rotation(BASE_X, BASE_Y - PI / 1.7, BASE_Z + PI * 0.5)
            .with_scale(BASE_SCALE * 1.2),
        ScrollPoint::at(0.5)
            .with_rotation(BASE_X, BASE_Y, BASE_Z + PI)
            .with_scale(0.0),
        ScrollPoint::at(0.75)
            .with_rotation(BASE_X, BASE_Y, BASE_Z + PI * 1.5)
            .with_scale(0.0),
        ScrollPoint::at(1.0)
            .with_rotation(BASE_X, BASE_Y, BASE_Z + PI * 2.0)
            .with_scale(BASE_SCALE),
    ]
}

/// Converts a `0xRRGGBB` literal into linear-ish float RGB
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Idle bounce perturbation
#[derive(Debug, Clone, Copy)]
pub struct BounceConfig {
    pub height: f32,
    pub height_frequency: f32,
    pub scale: f32,
    pub scale_frequency: f32,
    pub scale_phase: f32,
}

impl Default for BounceConfig {
    fn default() -> Self {
        Self {
            height: 0.003,
            height_frequency: 0.1,
            scale: 0.004,
            scale_frequency: 1.8,
            scale_phase: 0.3,
        }
    }
}

/// Pointer-follow tilt
#[derive(Debug, Clone, Copy)]
pub struct TiltConfig {
    /// Max tilt in radians
    pub max_tilt: f32,
    /// Follow rate; lower is smoother
    pub smoothness: f32,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            max_tilt: 0.08,
            smoothness: 0.08,
        }
    }
}

/// Scroll window over which the pulse glow ramps in
#[derive(Debug, Clone, Copy)]
pub struct PulseWindow {
    pub start: f32,
    pub full: f32,
}

impl PulseWindow {
    /// Pulse intensity in `[0, 1]` for a scroll progress
    pub fn intensity(&self, progress: f32) -> f32 {
        if self.full <= self.start {
            return if progress >= self.start { 1.0 } else { 0.0 };
        }
        ((progress - self.start) / (self.full - self.start)).clamp(0.0, 1.0)
    }
}

/// Emissive pulse glow
#[derive(Debug, Clone, Copy)]
pub struct PulseConfig {
    pub frequency: f32,
    pub base: f32,
    pub swing: f32,
    pub color: [f32; 3],
    pub window: Option<PulseWindow>,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            frequency: 2.5,
            base: 0.08,
            swing: 0.12,
            color: rgb(0xe8ecf0),
            window: Some(PulseWindow {
                start: 0.8,
                full: 0.95,
            }),
        }
    }
}

/// On-screen glass panel that turns the model into a wireframe when overlapped
#[derive(Debug, Clone, Copy)]
pub struct GlassPanelConfig {
    pub progress_start: f32,
    pub progress_end: f32,
    /// Panel rectangle as viewport fractions `[left, top, right, bottom]`
    pub rect: [f32; 4],
    pub blend_speed: f32,
    pub threshold: f32,
}

impl Default for GlassPanelConfig {
    fn default() -> Self {
        Self {
            progress_start: 0.55,
            progress_end: 0.95,
            rect: [0.1, 0.1, 0.9, 0.9],
            blend_speed: 4.0,
            threshold: 0.5,
        }
    }
}

impl GlassPanelConfig {
    pub fn contains_progress(&self, progress: f32) -> bool {
        progress >= self.progress_start && progress <= self.progress_end
    }
}

/// Base material the model wears outside the x-ray panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Finish {
    #[default]
    Glossy,
    Metallic,
    Matcap,
}

/// Tuning for the per-frame scene animator
#[derive(Debug, Clone, Copy)]
pub struct AnimatorConfig {
    pub entry_animation: bool,
    pub entry_duration: f32,
    pub bounce: BounceConfig,
    pub tilt: Option<TiltConfig>,
    pub pulse: PulseConfig,
    pub glass: Option<GlassPanelConfig>,
    pub finish: Finish,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            entry_animation: false,
            entry_duration: 1.2,
            bounce: BounceConfig::default(),
            tilt: Some(TiltConfig::default()),
            pulse: PulseConfig::default(),
            glass: Some(GlassPanelConfig::default()),
            finish: Finish::default(),
        }
    }
}

/// Camera and orbit control setup, fixed for the lifetime of a surface
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Polar angle range measured from +Y, in radians
    pub min_polar: f32,
    pub max_polar: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.05],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            near: 0.001,
            far: 1000.0,
            min_polar: PI / 4.0,
            max_polar: PI / 2.0,
            enable_zoom: false,
            enable_pan: false,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }
}

/// Scroll layout of the page
#[derive(Debug, Clone, Copy)]
pub struct PageConfig {
    pub section_count: usize,
    /// Viewport heights of scroll per section, in percent (200 = two screens)
    pub vh_per_section: f32,
    /// Pixels scrolled per wheel line
    pub line_height: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            section_count: crate::ui::sections::SECTIONS.len(),
            vh_per_section: 200.0,
            line_height: 60.0,
        }
    }
}

/// Complete showcase configuration
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub model: ModelDescriptor,
    pub defaults: ModelState,
    pub scroll_points: Vec<ScrollPoint>,
    /// Offset of the model stage relative to the world origin
    pub stage_offset: [f32; 3],
    pub background: [f32; 3],
    pub context_lost_grace: Duration,
    pub animator: AnimatorConfig,
    pub camera: CameraConfig,
    pub lighting: LightingRig,
    pub page: PageConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            model: ModelDescriptor::new(DEFAULT_MODEL_PATH, ModelFormat::Glb),
            defaults: ModelState::new(
                Vector3::from(DEFAULT_ROTATION),
                DEFAULT_SCALE,
                Vector3::new(0.0, 0.0, 0.0),
            ),
            scroll_points: default_scroll_points(),
            stage_offset: [0.0, 0.0, -0.005],
            background: rgb(0x0a0a0a),
            context_lost_grace: CONTEXT_LOST_GRACE,
            animator: AnimatorConfig::default(),
            camera: CameraConfig::default(),
            lighting: default_lighting(),
            page: PageConfig::default(),
        }
    }
}

impl SceneConfig {
    /// Replaces the model descriptor
    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.model = model;
        self
    }

    /// Disables the pointer-follow tilt
    pub fn without_tilt(mut self) -> Self {
        self.animator.tilt = None;
        self
    }
}

/// Two ambient fills (neutral and cool) plus a key and a back light
pub fn default_lighting() -> LightingRig {
    LightingRig {
        ambient: vec![
            AmbientLight {
                color: rgb(0xffffff),
                intensity: 0.4,
            },
            AmbientLight {
                color: rgb(0x4488ff),
                intensity: 0.3,
            },
        ],
        directional: vec![
            DirectionalLight {
                position: [5.0, 5.0, 5.0],
                color: rgb(0xffffff),
                intensity: 0.8,
            },
            DirectionalLight {
                position: [-5.0, 5.0, -5.0],
                color: rgb(0xffffff),
                intensity: 0.5,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_hex_conversion() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
        let c = rgb(0x4488ff);
        assert!((c[0] - 68.0 / 255.0).abs() < 1e-6);
        assert!((c[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_pulse_window_ramp() {
        let window = PulseWindow {
            start: 0.8,
            full: 0.9,
        };
        assert_eq!(window.intensity(0.5), 0.0);
        assert!((window.intensity(0.85) - 0.5).abs() < 1e-5);
        assert_eq!(window.intensity(1.0), 1.0);
    }

    #[test]
    fn test_default_scene_is_glb_with_sorted_keyframes() {
        let config = SceneConfig::default();
        assert_eq!(config.model.format, ModelFormat::Glb);
        assert_eq!(config.page.section_count, 5);
        assert!(config
            .scroll_points
            .windows(2)
            .all(|pair| pair[0].at <= pair[1].at));
    }
}
