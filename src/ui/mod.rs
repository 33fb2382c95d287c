//! In-window page and overlays
//!
//! - [`manager`]: ImGui context, platform and renderer
//! - [`sections`]: the sliding copy strip, footer and pre-order badge
//! - [`overlays`]: loading, scene error and lost-display views

pub mod manager;
pub mod overlays;
pub mod sections;

pub use manager::UiManager;
pub use overlays::{draw_overlay, Overlay, RecoveryAction};
pub use sections::{draw_page, SECTIONS};
