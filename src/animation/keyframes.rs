//! Scroll keyframes
//!
//! A [`ScrollPoint`] pins the model to a rotation, scale and/or position at a
//! given scroll progress. [`model_state_at`] linearly interpolates between the
//! two points that bracket the current progress, field by field.

use cgmath::{Vector3, VectorSpace};

/// Keyframe declared at a scroll progress value in `[0, 1]`.
///
/// Any field left as `None` falls back to the defaults passed to
/// [`model_state_at`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPoint {
    /// Scroll progress where this keyframe applies.
    pub at: f32,
    /// Model rotation in radians (XYZ Euler order).
    pub rotation: Option<Vector3<f32>>,
    /// Uniform model scale.
    pub scale: Option<f32>,
    /// Model position.
    pub position: Option<Vector3<f32>>,
}

impl ScrollPoint {
    /// Creates a keyframe at `at` with every field falling back to defaults
    pub fn at(at: f32) -> Self {
        Self {
            at,
            rotation: None,
            scale: None,
            position: None,
        }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Some(Vector3::new(x, y, z));
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Some(Vector3::new(x, y, z));
        self
    }

    fn resolve(&self, defaults: &ModelState) -> ModelState {
        ModelState {
            rotation: self.rotation.unwrap_or(defaults.rotation),
            scale: self.scale.unwrap_or(defaults.scale),
            position: self.position.unwrap_or(defaults.position),
        }
    }
}

/// Interpolated model transform for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelState {
    pub rotation: Vector3<f32>,
    pub scale: f32,
    pub position: Vector3<f32>,
}

impl ModelState {
    pub fn new(rotation: Vector3<f32>, scale: f32, position: Vector3<f32>) -> Self {
        Self {
            rotation,
            scale,
            position,
        }
    }

    /// Field-wise linear interpolation towards `other`
    pub fn lerp(&self, other: &ModelState, t: f32) -> ModelState {
        ModelState {
            rotation: self.rotation.lerp(other.rotation, t),
            scale: self.scale + (other.scale - self.scale) * t,
            position: self.position.lerp(other.position, t),
        }
    }
}

/// Returns the model state at `progress` for the given keyframes.
///
/// Keyframes are sorted by `at` (stable for ties). Progress before the first
/// or after the last keyframe clamps to that keyframe. An empty keyframe list
/// yields `defaults` unchanged.
pub fn model_state_at(progress: f32, points: &[ScrollPoint], defaults: ModelState) -> ModelState {
    if points.is_empty() {
        return defaults;
    }

    let mut sorted: Vec<&ScrollPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.at.total_cmp(&b.at));

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];

    if progress <= first.at {
        return first.resolve(&defaults);
    }
    if progress >= last.at {
        return last.resolve(&defaults);
    }

    let mut i = 0;
    while i < sorted.len() - 1 && sorted[i + 1].at <= progress {
        i += 1;
    }
    let a = sorted[i];
    let b = sorted[i + 1];
    let t = (progress - a.at) / (b.at - a.at);

    a.resolve(&defaults).lerp(&b.resolve(&defaults), t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn defaults() -> ModelState {
        ModelState::new(Vector3::new(0.0, 0.0, 0.0), 0.0, Vector3::new(0.0, 0.0, 0.0))
    }

    fn between(value: f32, a: f32, b: f32) -> bool {
        value >= a.min(b) - EPS && value <= a.max(b) + EPS
    }

    #[test]
    fn test_midpoint_scale() {
        let points = [
            ScrollPoint::at(0.0).with_scale(10.0),
            ScrollPoint::at(1.0).with_scale(20.0),
        ];
        let state = model_state_at(0.5, &points, defaults());
        assert!((state.scale - 15.0).abs() < EPS);
    }

    #[test]
    fn test_empty_keyframes_return_defaults() {
        let defaults = ModelState::new(Vector3::new(1.0, 2.0, 3.0), 4.0, Vector3::new(5.0, 6.0, 7.0));
        for p in [0.0, 0.3, 1.0, -2.0, 5.0] {
            assert_eq!(model_state_at(p, &[], defaults), defaults);
        }
    }

    #[test]
    fn test_endpoints_use_keyframe_values_with_default_gaps() {
        let defaults = ModelState::new(Vector3::new(9.0, 9.0, 9.0), 3.0, Vector3::new(1.0, 1.0, 1.0));
        let points = [
            ScrollPoint::at(0.2).with_rotation(1.0, 2.0, 3.0),
            ScrollPoint::at(0.8).with_scale(7.0),
        ];

        let start = model_state_at(0.2, &points, defaults);
        assert_eq!(start.rotation, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(start.scale, 3.0);
        assert_eq!(start.position, defaults.position);

        let end = model_state_at(0.8, &points, defaults);
        assert_eq!(end.rotation, defaults.rotation);
        assert_eq!(end.scale, 7.0);

        // Outside the keyframe range clamps to the nearest end
        assert_eq!(model_state_at(0.0, &points, defaults), start);
        assert_eq!(model_state_at(1.0, &points, defaults), end);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let points = [
            ScrollPoint::at(1.0).with_scale(20.0),
            ScrollPoint::at(0.0).with_scale(10.0),
        ];
        let state = model_state_at(0.25, &points, defaults());
        assert!((state.scale - 12.5).abs() < EPS);
    }

    #[test]
    fn test_duplicate_keyframes_keep_input_order() {
        let points = [
            ScrollPoint::at(0.0).with_scale(0.0),
            ScrollPoint::at(0.5).with_scale(4.0),
            ScrollPoint::at(0.5).with_scale(8.0),
            ScrollPoint::at(1.0).with_scale(8.0),
        ];
        // The scan stops on the last point at or below progress, so the second
        // duplicate starts the 0.5..1.0 segment.
        assert!((model_state_at(0.75, &points, defaults()).scale - 8.0).abs() < EPS);
        assert!((model_state_at(0.25, &points, defaults()).scale - 2.0).abs() < EPS);
    }

    #[test]
    fn test_interpolation_is_pure() {
        let points = crate::config::default_scroll_points();
        let defaults = ModelState::new(Vector3::new(1.7, 3.3, 4.3), 800.2, Vector3::new(0.0, 0.0, 0.0));
        let a = model_state_at(0.37, &points, defaults);
        let b = model_state_at(0.37, &points, defaults);
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_stay_between_bracketing_keyframes() {
        let points = [
            ScrollPoint::at(0.0)
                .with_rotation(0.0, 1.0, -1.0)
                .with_scale(2.0),
            ScrollPoint::at(0.4).with_position(1.0, -2.0, 0.5),
            ScrollPoint::at(1.0)
                .with_rotation(3.0, -1.0, 2.0)
                .with_scale(0.0)
                .with_position(-1.0, 0.0, 0.0),
        ];
        let defaults = defaults();

        for step in 0..=40 {
            let p = step as f32 / 40.0;
            let state = model_state_at(p, &points, defaults);
            let (a, b) = if p < 0.4 {
                (points[0].resolve(&defaults), points[1].resolve(&defaults))
            } else {
                (points[1].resolve(&defaults), points[2].resolve(&defaults))
            };

            assert!(between(state.scale, a.scale, b.scale), "scale at {p}");
            for axis in 0..3 {
                assert!(between(state.rotation[axis], a.rotation[axis], b.rotation[axis]));
                assert!(between(state.position[axis], a.position[axis], b.position[axis]));
            }
        }
    }
}
