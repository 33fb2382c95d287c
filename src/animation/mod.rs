//! Scroll-driven model animation
//!
//! [`keyframes`] turns scroll progress into a target model state,
//! [`animator`] applies that state plus the procedural effects every frame and
//! [`projection`] supports the screen-space overlap test.

pub mod animator;
pub mod keyframes;
pub mod projection;

pub use animator::{FrameInput, FrameReport, SceneAnimator};
pub use keyframes::{model_state_at, ModelState, ScrollPoint};
