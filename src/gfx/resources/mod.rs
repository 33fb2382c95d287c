//! GPU resource management
//!
//! Uniform layouts, materials and render targets.

pub mod global_bindings;
pub mod material;
pub mod presets;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUBO, LightingRig};
pub use material::{Material, MaterialBindings, SharedMaterial};
pub use texture_resource::TextureResource;
