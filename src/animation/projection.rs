//! Screen-space projection of bounding boxes

use cgmath::{Matrix4, Vector4};

use crate::gfx::scene::node::Aabb;

/// Pixel rectangle with y growing downwards
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl ScreenRect {
    /// Rectangle from viewport fractions `[left, top, right, bottom]`
    pub fn from_fractions(fractions: [f32; 4], width: f32, height: f32) -> Self {
        Self {
            left: width * fractions[0],
            top: height * fractions[1],
            right: width * fractions[2],
            bottom: height * fractions[3],
        }
    }

    /// Strict overlap; rectangles that only touch do not overlap
    pub fn overlaps(&self, other: &ScreenRect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }
}

/// Projects the eight corners of `bounds` and returns their pixel extent.
///
/// Corners behind the camera or outside the depth range are skipped. Returns
/// `None` when no corner is visible.
pub fn project_box_to_screen(
    bounds: &Aabb,
    view_proj: &Matrix4<f32>,
    width: f32,
    height: f32,
) -> Option<ScreenRect> {
    let mut rect: Option<ScreenRect> = None;

    for corner in bounds.corners() {
        let clip = *view_proj * Vector4::new(corner.x, corner.y, corner.z, 1.0);
        if clip.w <= 0.0 {
            continue;
        }
        let ndc_z = clip.z / clip.w;
        if !(0.0..=1.0).contains(&ndc_z) {
            continue;
        }
        let px = (clip.x / clip.w + 1.0) * 0.5 * width;
        let py = (1.0 - (clip.y / clip.w + 1.0) * 0.5) * height;

        rect = Some(match rect {
            None => ScreenRect {
                left: px,
                right: px,
                top: py,
                bottom: py,
            },
            Some(r) => ScreenRect {
                left: r.left.min(px),
                right: r.right.max(px),
                top: r.top.min(py),
                bottom: r.bottom.max(py),
            },
        });
    }

    rect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::orbit_camera::OPENGL_TO_WGPU_MATRIX;
    use cgmath::{perspective, Deg, Point3, Vector3};

    fn view_proj() -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(45.0), 1.0, 0.1, 100.0) * view
    }

    fn unit_box(center_z: f32) -> Aabb {
        Aabb {
            min: Point3::new(-0.5, -0.5, center_z - 0.5),
            max: Point3::new(0.5, 0.5, center_z + 0.5),
        }
    }

    #[test]
    fn test_box_in_front_projects_around_center() {
        let rect = project_box_to_screen(&unit_box(0.0), &view_proj(), 800.0, 600.0).unwrap();
        assert!(rect.left < 400.0 && rect.right > 400.0);
        assert!(rect.top < 300.0 && rect.bottom > 300.0);
    }

    #[test]
    fn test_box_behind_camera_is_invisible() {
        assert!(project_box_to_screen(&unit_box(10.0), &view_proj(), 800.0, 600.0).is_none());
    }

    #[test]
    fn test_touching_rects_do_not_overlap() {
        let a = ScreenRect::from_fractions([0.0, 0.0, 0.5, 1.0], 100.0, 100.0);
        let b = ScreenRect::from_fractions([0.5, 0.0, 1.0, 1.0], 100.0, 100.0);
        assert!(!a.overlaps(&b));
        let c = ScreenRect::from_fractions([0.4, 0.4, 0.6, 0.6], 100.0, 100.0);
        assert!(a.overlaps(&c) && c.overlaps(&b));
    }
}
