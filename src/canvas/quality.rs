use crate::loader::ModelFormat;

/// Per-surface render settings, picked from the model format at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderQuality {
    /// Upper bound on physical pixels per logical pixel
    pub max_pixel_ratio: f32,
    pub msaa_samples: u32,
    /// Adds the studio reflection term to lit materials
    pub environment_map: bool,
}

impl RenderQuality {
    pub const FULL: RenderQuality = RenderQuality {
        max_pixel_ratio: 2.0,
        msaa_samples: 4,
        environment_map: true,
    };

    pub const REDUCED: RenderQuality = RenderQuality {
        max_pixel_ratio: 1.0,
        msaa_samples: 1,
        environment_map: false,
    };

    pub fn for_format(format: ModelFormat) -> Self {
        if format.is_heavy() {
            Self::REDUCED
        } else {
            Self::FULL
        }
    }

    /// Render-target scale relative to the window's physical size
    pub fn resolution_scale(&self, scale_factor: f64) -> f32 {
        let scale_factor = scale_factor.max(1.0) as f32;
        (self.max_pixel_ratio / scale_factor).min(1.0)
    }

    /// Strength of the environment reflection term fed to the shaders
    pub fn environment_strength(&self) -> f32 {
        if self.environment_map {
            1.0
        } else {
            0.0
        }
    }
}
