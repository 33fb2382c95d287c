//! Frame rendering
//!
//! Pipelines, GPU uploads of scene meshes and the per-frame render passes.

pub mod draw_list;
pub mod pipeline_manager;
pub mod render_engine;
pub mod render_pass_ext;

pub use pipeline_manager::{PipelineConfig, PipelineError, PipelineManager};
pub use render_engine::{EngineSettings, FrameStatus, RenderEngine, RenderError};
