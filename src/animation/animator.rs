//! Per-frame model animation
//!
//! [`SceneAnimator::update`] runs once per rendered frame on the model rig: the
//! group node that wraps the loaded model. It applies, in order, the x-ray
//! wireframe blend, material assignment, idle bounce, pulse glow, pointer tilt
//! and finally the keyframed transform.

use std::sync::Arc;

use cgmath::{Matrix4, Vector2, Vector3};

use super::{
    keyframes::ModelState,
    projection::{project_box_to_screen, ScreenRect},
};
use crate::{
    config::AnimatorConfig,
    gfx::{
        resources::{
            material::SharedMaterial,
            presets::{apply_material, shared_finish, shared_wireframe},
        },
        scene::node::SceneNode,
    },
    loader::ModelDescriptor,
};

/// Cubic ease-out on `[0, 1]`
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Fraction of the remaining distance to cover this frame for an exponential
/// approach with rate `rate` per second
pub fn smoothing_factor(rate: f32, delta: f32) -> f32 {
    1.0 - (-rate * delta).exp()
}

/// Snapshot of everything one frame depends on
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Seconds since the previous frame
    pub delta: f32,
    pub progress: f32,
    pub model_state: ModelState,
    /// Pointer position with x right and y up, both in `[-1, 1]`
    pub pointer: Vector2<f32>,
    pub pulse_intensity: f32,
    pub view_proj: Matrix4<f32>,
    /// Viewport size in pixels
    pub viewport: [f32; 2],
    /// World matrix of the rig's parent
    pub parent: Matrix4<f32>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub mesh_count: usize,
    /// Set on the frame the material is first applied to a freshly loaded model
    pub loaded: bool,
    pub wireframe: bool,
}

/// Mutable per-model animation state
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct AnimationRuntime {
    pub pulse_time: f32,
    pub bounce_time: f32,
    pub entry_elapsed: f32,
    pub tilt: [f32; 2],
    pub wireframe_blend: f32,
    pub wireframe_target: bool,
    pub material_applied: bool,
}

pub struct SceneAnimator {
    config: AnimatorConfig,
    base: Arc<SharedMaterial>,
    wireframe: Arc<SharedMaterial>,
    descriptor: Option<ModelDescriptor>,
    runtime: AnimationRuntime,
}

impl SceneAnimator {
    /// Animator wearing the configured finish and the shared wireframe
    pub fn new(config: AnimatorConfig) -> Self {
        let base = shared_finish(config.finish);
        Self::with_materials(config, base, shared_wireframe())
    }

    pub fn with_materials(
        config: AnimatorConfig,
        base: Arc<SharedMaterial>,
        wireframe: Arc<SharedMaterial>,
    ) -> Self {
        Self {
            config,
            base,
            wireframe,
            descriptor: None,
            runtime: AnimationRuntime::default(),
        }
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn runtime(&self) -> &AnimationRuntime {
        &self.runtime
    }

    pub fn base_material(&self) -> &Arc<SharedMaterial> {
        &self.base
    }

    /// Records the model being animated.
    ///
    /// A different descriptor restarts the entry animation and schedules the
    /// material to be applied again. Returns whether anything was reset.
    pub fn set_descriptor(&mut self, descriptor: &ModelDescriptor) -> bool {
        if self.descriptor.as_ref() == Some(descriptor) {
            return false;
        }
        self.descriptor = Some(descriptor.clone());
        self.runtime.entry_elapsed = 0.0;
        self.runtime.material_applied = false;
        true
    }

    /// Drops all runtime state, as when the model is unmounted
    pub fn reset(&mut self) {
        self.runtime = AnimationRuntime::default();
    }

    /// Animates `rig` for one frame. A missing rig is a no-op.
    pub fn update(&mut self, rig: Option<&mut SceneNode>, input: &FrameInput) -> FrameReport {
        let Some(rig) = rig else {
            return FrameReport::default();
        };
        let dt = input.delta.max(0.0);
        let [width, height] = input.viewport;

        // X-ray: the bounds are those of the previous frame's transforms
        self.runtime.wireframe_target = match self.config.glass {
            Some(glass) if glass.contains_progress(input.progress) => {
                let panel = ScreenRect::from_fractions(glass.rect, width, height);
                rig.world_bounding_box(&input.parent)
                    .and_then(|bounds| project_box_to_screen(&bounds, &input.view_proj, width, height))
                    .is_some_and(|model_rect| model_rect.overlaps(&panel))
            }
            _ => false,
        };
        let (blend_speed, threshold) = self
            .config
            .glass
            .map(|glass| (glass.blend_speed, glass.threshold))
            .unwrap_or((4.0, 0.5));
        let target = if self.runtime.wireframe_target { 1.0 } else { 0.0 };
        self.runtime.wireframe_blend +=
            (target - self.runtime.wireframe_blend) * smoothing_factor(blend_speed, dt);
        let show_wireframe = self.runtime.wireframe_blend > threshold;

        let mesh_count = rig.mesh_count();
        let mut loaded = false;
        if !self.runtime.material_applied && mesh_count > 0 {
            let applied = apply_material(rig, &self.base);
            self.runtime.material_applied = true;
            loaded = true;
            log::debug!("Applied {} to {applied} meshes", self.base.descriptor().name);
        }
        let active = if show_wireframe {
            &self.wireframe
        } else {
            &self.base
        };
        apply_material(rig, active);

        self.runtime.bounce_time += dt;
        let bounce = &self.config.bounce;
        let bt = self.runtime.bounce_time;
        let bounce_y = bounce.height * (bt * bounce.height_frequency).sin();
        let bounce_scale = 1.0 + bounce.scale * (bt * bounce.scale_frequency + bounce.scale_phase).sin();

        let pulse = &self.config.pulse;
        if input.pulse_intensity > 0.0 {
            self.runtime.pulse_time += dt;
            let wave = 0.5 + 0.5 * (self.runtime.pulse_time * pulse.frequency).sin();
            self.base.set_emissive(
                pulse.color,
                input.pulse_intensity * (pulse.base + wave * pulse.swing),
            );
        } else {
            self.base.set_emissive([0.0; 3], 0.0);
        }

        match self.config.tilt {
            Some(tilt) => {
                let target_x = input.pointer.y * tilt.max_tilt;
                let target_y = input.pointer.x * tilt.max_tilt;
                let lerp = smoothing_factor(tilt.smoothness * 60.0, dt);
                self.runtime.tilt[0] += (target_x - self.runtime.tilt[0]) * lerp;
                self.runtime.tilt[1] += (target_y - self.runtime.tilt[1]) * lerp;
            }
            None => self.runtime.tilt = [0.0, 0.0],
        }
        let [tilt_x, tilt_y] = self.runtime.tilt;

        let state = &input.model_state;
        rig.transform.position = state.position + Vector3::new(0.0, bounce_y, 0.0);

        let r = state.rotation;
        let settled = (bounce_scale, Vector3::new(r.x + tilt_x, r.y + tilt_y, r.z));
        let (scale, rotation) = if self.config.entry_animation {
            self.runtime.entry_elapsed += dt;
            let t = if self.config.entry_duration > 0.0 {
                (self.runtime.entry_elapsed / self.config.entry_duration).min(1.0)
            } else {
                1.0
            };
            if t < 1.0 {
                let eased = ease_out_cubic(t);
                (
                    eased * bounce_scale,
                    Vector3::new(r.x * eased + tilt_x, r.y * eased + tilt_y, r.z * eased),
                )
            } else {
                settled
            }
        } else {
            settled
        };
        rig.transform.set_uniform_scale(scale);
        rig.transform.set_euler(rotation);

        if let Some(model) = rig.children.first_mut() {
            model.transform.set_uniform_scale(state.scale);
        }

        FrameReport {
            mesh_count,
            loaded,
            wireframe: show_wireframe,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Finish, GlassPanelConfig, TiltConfig},
        gfx::{
            camera::orbit_camera::OPENGL_TO_WGPU_MATRIX,
            resources::{material::Shading, presets},
            scene::node::{euler_xyz, Geometry, MeshData},
        },
        loader::ModelFormat,
    };
    use cgmath::{perspective, Deg, One, Point3};

    const EPS: f32 = 1e-5;

    fn animator(config: AnimatorConfig) -> SceneAnimator {
        SceneAnimator::with_materials(
            config,
            SharedMaterial::shared(presets::glossy_translucent()),
            SharedMaterial::shared(presets::wireframe()),
        )
    }

    fn plain_config() -> AnimatorConfig {
        AnimatorConfig {
            tilt: None,
            glass: None,
            ..AnimatorConfig::default()
        }
    }

    fn model() -> SceneNode {
        SceneNode::group("model").with_child(SceneNode::mesh(
            "shell",
            MeshData::new(Geometry::new(
                vec![[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]],
                None,
                vec![0, 1, 2],
            )),
        ))
    }

    fn rig_with_model() -> SceneNode {
        SceneNode::group("rig").with_child(model())
    }

    fn view_proj() -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(45.0), 1.0, 0.1, 100.0) * view
    }

    fn input(delta: f32) -> FrameInput {
        FrameInput {
            delta,
            progress: 0.0,
            model_state: ModelState::new(Vector3::new(0.0, 0.0, 0.0), 1.0, Vector3::new(0.0, 0.0, 0.0)),
            pointer: Vector2::new(0.0, 0.0),
            pulse_intensity: 0.0,
            view_proj: view_proj(),
            viewport: [800.0, 800.0],
            parent: Matrix4::one(),
        }
    }

    fn mesh_material(rig: &SceneNode) -> Option<Arc<SharedMaterial>> {
        let mut found = None;
        rig.visit(&Matrix4::one(), &mut |node, _| {
            if let Some(mesh) = node.mesh_data() {
                found = mesh.material.clone();
            }
        });
        found
    }

    #[test]
    fn test_missing_rig_is_noop() {
        let mut animator = animator(plain_config());
        let report = animator.update(None, &input(0.5));
        assert_eq!(report, FrameReport::default());
        assert_eq!(*animator.runtime(), AnimationRuntime::default());
    }

    #[test]
    fn test_material_retried_until_meshes_exist() {
        let mut animator = animator(plain_config());
        let mut rig = SceneNode::group("rig").with_child(SceneNode::group("placeholder"));

        let report = animator.update(Some(&mut rig), &input(0.016));
        assert!(!report.loaded);
        assert!(!animator.runtime().material_applied);

        rig.children[0] = model();
        let report = animator.update(Some(&mut rig), &input(0.016));
        assert!(report.loaded);
        assert_eq!(report.mesh_count, 1);
        assert!(Arc::ptr_eq(&mesh_material(&rig).unwrap(), animator.base_material()));

        let report = animator.update(Some(&mut rig), &input(0.016));
        assert!(!report.loaded);
    }

    #[test]
    fn test_configured_finish_is_worn() {
        let config = AnimatorConfig {
            finish: Finish::Matcap,
            ..plain_config()
        };
        let mut animator = SceneAnimator::new(config);
        let mut rig = rig_with_model();
        animator.update(Some(&mut rig), &input(0.016));

        let material = mesh_material(&rig).unwrap();
        assert!(Arc::ptr_eq(&material, animator.base_material()));
        assert_eq!(material.descriptor().shading, Shading::Matcap);
    }

    #[test]
    fn test_descriptor_change_resets_entry_and_material() {
        let config = AnimatorConfig {
            entry_animation: true,
            ..plain_config()
        };
        let mut animator = animator(config);
        let first = ModelDescriptor::new("a.glb", ModelFormat::Glb);
        assert!(animator.set_descriptor(&first));
        assert!(!animator.set_descriptor(&first));

        let mut rig = rig_with_model();
        animator.update(Some(&mut rig), &input(0.5));
        assert!(animator.runtime().entry_elapsed > 0.0);
        assert!(animator.runtime().material_applied);

        assert!(animator.set_descriptor(&ModelDescriptor::new("a.glb", ModelFormat::Obj)));
        assert_eq!(animator.runtime().entry_elapsed, 0.0);
        assert!(!animator.runtime().material_applied);

        let report = animator.update(Some(&mut rig), &input(0.016));
        assert!(report.loaded);
    }

    #[test]
    fn test_entry_animation_eases_scale_and_rotation() {
        let config = AnimatorConfig {
            entry_animation: true,
            ..plain_config()
        };
        let mut animator = animator(config);
        let mut rig = rig_with_model();
        let mut frame = input(0.6);
        frame.model_state.rotation = Vector3::new(1.0, 2.0, 3.0);
        frame.model_state.scale = 15.0;

        animator.update(Some(&mut rig), &frame);

        let eased = ease_out_cubic(0.5);
        let bounce = &animator.config().bounce;
        let bounce_scale = 1.0 + bounce.scale * (0.6 * bounce.scale_frequency + bounce.scale_phase).sin();
        assert!((rig.transform.scale.x - eased * bounce_scale).abs() < EPS);
        let expected = euler_xyz(Vector3::new(eased, 2.0 * eased, 3.0 * eased));
        assert!((rig.transform.rotation.s - expected.s).abs() < EPS);
        assert!((rig.children[0].transform.scale.x - 15.0).abs() < EPS);

        // Past the entry duration the full rotation applies
        animator.update(Some(&mut rig), &frame);
        let expected = euler_xyz(Vector3::new(1.0, 2.0, 3.0));
        assert!((rig.transform.rotation.v.x - expected.v.x).abs() < EPS);
    }

    #[test]
    fn test_bounce_offsets_keyframe_position() {
        let mut animator = animator(plain_config());
        let mut rig = rig_with_model();
        let mut frame = input(2.0);
        frame.model_state.position = Vector3::new(-0.02, 0.0, 0.0);

        animator.update(Some(&mut rig), &frame);
        let expected_y = 0.003 * (2.0f32 * 0.1).sin();
        assert!((rig.transform.position.x + 0.02).abs() < EPS);
        assert!((rig.transform.position.y - expected_y).abs() < EPS);
    }

    #[test]
    fn test_tilt_is_frame_rate_independent() {
        let config = AnimatorConfig {
            tilt: Some(TiltConfig::default()),
            ..plain_config()
        };
        let mut frame = input(0.1);
        frame.pointer = Vector2::new(1.0, -0.5);

        let mut coarse = animator(config);
        coarse.update(Some(&mut rig_with_model()), &frame);

        let mut fine = animator(config);
        let mut rig = rig_with_model();
        frame.delta = 0.05;
        fine.update(Some(&mut rig), &frame);
        fine.update(Some(&mut rig), &frame);

        let [cx, cy] = coarse.runtime().tilt;
        let [fx, fy] = fine.runtime().tilt;
        assert!((cx - fx).abs() < EPS && (cy - fy).abs() < EPS);
        // Pointer y drives rotation about X, pointer x drives rotation about Y
        assert!(cx < 0.0 && cy > 0.0);
        assert!(cy <= 0.08);
    }

    #[test]
    fn test_pulse_sets_and_clears_emission() {
        let mut animator = animator(plain_config());
        let mut rig = rig_with_model();
        let mut frame = input(0.2);
        frame.pulse_intensity = 1.0;

        animator.update(Some(&mut rig), &frame);
        let (color, intensity) = animator.base_material().emissive();
        let wave = 0.5 + 0.5 * (0.2f32 * 2.5).sin();
        assert!((intensity - (0.08 + wave * 0.12)).abs() < EPS);
        assert_eq!(color, crate::config::rgb(0xe8ecf0));

        frame.pulse_intensity = 0.0;
        animator.update(Some(&mut rig), &frame);
        assert_eq!(animator.base_material().emissive(), ([0.0; 3], 0.0));
        assert!((animator.runtime().pulse_time - 0.2).abs() < EPS);
    }

    #[test]
    fn test_xray_blends_to_wireframe_inside_gate() {
        let config = AnimatorConfig {
            glass: Some(GlassPanelConfig::default()),
            ..plain_config()
        };
        let mut animator = animator(config);
        let mut rig = rig_with_model();
        let mut frame = input(0.1);
        frame.progress = 0.7;

        let first = animator.update(Some(&mut rig), &frame);
        assert!(animator.runtime().wireframe_target);
        assert!(!first.wireframe);

        for _ in 0..5 {
            animator.update(Some(&mut rig), &frame);
        }
        let material = mesh_material(&rig).unwrap();
        assert!(material.descriptor().wireframe);

        frame.progress = 0.3;
        for _ in 0..20 {
            animator.update(Some(&mut rig), &frame);
        }
        assert!(!animator.runtime().wireframe_target);
        assert!(Arc::ptr_eq(&mesh_material(&rig).unwrap(), animator.base_material()));
    }

    #[test]
    fn test_reset_clears_runtime() {
        let mut animator = animator(plain_config());
        animator.update(Some(&mut rig_with_model()), &input(1.0));
        animator.reset();
        assert_eq!(*animator.runtime(), AnimationRuntime::default());
    }

    #[test]
    fn test_ease_out_cubic_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }
}
