//! Canvas host state: surface loss, model slot and render quality

pub mod context_guard;
pub mod model_slot;
pub mod quality;

pub use context_guard::{CanvasState, ContextGuard};
pub use model_slot::{LoadOutcome, ModelSlot, SlotState};
pub use quality::RenderQuality;
