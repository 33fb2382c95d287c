//! Truffle showcase
//!
//! A scroll-driven 3D product viewer: scrolling the page moves a keyframed
//! model, swaps its material under a glass panel and slides the copy
//! sections, while a context guard recovers from a lost GPU device.

pub mod animation;
pub mod app;
pub mod canvas;
pub mod cli;
pub mod config;
pub mod gfx;
pub mod loader;
pub mod scroll;
pub mod ui;
pub mod wgpu_utils;

pub use app::ShowcaseApp;
pub use config::SceneConfig;
