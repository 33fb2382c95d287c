//! # Graphics
//!
//! - [`camera`]: orbit camera and its pointer controller
//! - [`rendering`]: pipelines and the frame renderer
//! - [`resources`]: materials, lighting uniforms and render targets
//! - [`scene`]: the node tree loaders produce and the animator moves

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
