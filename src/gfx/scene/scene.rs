use cgmath::{Matrix4, Vector3};

use crate::gfx::{
    camera::camera_utils::CameraManager,
    scene::node::{SceneNode, Transform},
};

const STAGE: &str = "stage";
const RIG: &str = "model-rig";

/// Camera plus the node tree the renderer draws.
///
/// The tree is always `stage -> rig -> content`: the stage carries the fixed
/// offset, the rig is what the animator moves and the content is either the
/// loaded model or a placeholder.
pub struct Scene {
    pub camera_manager: CameraManager,
    stage: SceneNode,
}

impl Scene {
    pub fn new(camera_manager: CameraManager, stage_offset: [f32; 3]) -> Self {
        let stage = SceneNode::group(STAGE)
            .with_transform(Transform::from_position(Vector3::from(stage_offset)))
            .with_child(SceneNode::group(RIG));
        Self {
            camera_manager,
            stage,
        }
    }

    /// Updates the camera matrices
    pub fn update(&mut self) {
        self.camera_manager.camera.update_view_proj();
    }

    pub fn root(&self) -> &SceneNode {
        &self.stage
    }

    pub fn rig(&self) -> Option<&SceneNode> {
        self.stage.children.first()
    }

    pub fn rig_mut(&mut self) -> Option<&mut SceneNode> {
        self.stage.children.first_mut()
    }

    /// World matrix of the rig's parent
    pub fn stage_matrix(&self) -> Matrix4<f32> {
        self.stage.transform.matrix()
    }

    /// Replaces the rig's content, keeping the rig's own transform
    pub fn set_model(&mut self, model: SceneNode) {
        if let Some(rig) = self.rig_mut() {
            rig.children.clear();
            rig.children.push(model);
        }
    }

    pub fn clear_model(&mut self) {
        if let Some(rig) = self.rig_mut() {
            rig.children.clear();
        }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.rig()?.children.first().map(|model| model.name.as_str())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera_manager.camera.resize_projection(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;

    fn scene() -> Scene {
        Scene::new(CameraManager::from_config(&CameraConfig::default(), 1.5), [0.0, 0.0, -0.005])
    }

    #[test]
    fn test_model_replaces_rig_content() {
        let mut scene = scene();
        assert_eq!(scene.model_name(), None);

        scene.set_model(SceneNode::group("placeholder"));
        scene.set_model(SceneNode::group("truffle"));
        assert_eq!(scene.model_name(), Some("truffle"));
        assert_eq!(scene.rig().map(|rig| rig.children.len()), Some(1));

        scene.clear_model();
        assert_eq!(scene.model_name(), None);
    }

    #[test]
    fn test_stage_offset_is_rig_parent() {
        let scene = scene();
        assert_eq!(scene.stage_matrix().w.z, -0.005);
        assert_eq!(scene.root().children[0].name, RIG);
    }
}
