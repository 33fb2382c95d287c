//! Surface loss tracking
//!
//! The GPU device can go away underneath us (driver reset, memory exhaustion
//! on heavy models). [`ContextGuard`] decides when that becomes user-visible
//! and hands out a new surface generation when the user asks to retry.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasState {
    Active,
    ContextLost,
    /// Retry requested; waiting for a fresh surface to mount
    Recovering,
}

#[derive(Debug)]
pub struct ContextGuard {
    state: CanvasState,
    grace: Duration,
    mounted_at: Option<Instant>,
    generation: u64,
}

impl ContextGuard {
    pub fn new(grace: Duration) -> Self {
        Self {
            state: CanvasState::Active,
            grace,
            mounted_at: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> CanvasState {
        self.state
    }

    /// Bumped on every retry; surfaces from older generations are discarded
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Only an active surface may present frames
    pub fn should_render(&self) -> bool {
        self.state == CanvasState::Active
    }

    /// Records that a surface was created at `now`
    pub fn mount(&mut self, now: Instant) {
        self.mounted_at = Some(now);
        if self.state != CanvasState::Active {
            log::info!("Surface generation {} mounted", self.generation);
        }
        self.state = CanvasState::Active;
    }

    pub fn unmount(&mut self) {
        self.mounted_at = None;
    }

    /// Handles a loss signal; returns whether the loss became visible.
    ///
    /// Signals arriving within the grace window after mount are treated as
    /// fallout from a quick remount and ignored.
    pub fn on_context_lost(&mut self, now: Instant) -> bool {
        if let Some(mounted_at) = self.mounted_at {
            let since_mount = now.saturating_duration_since(mounted_at);
            if since_mount < self.grace {
                log::warn!("Ignoring context loss {since_mount:?} after mount");
                return false;
            }
        }
        if self.state == CanvasState::ContextLost {
            return false;
        }
        log::error!("Rendering context lost");
        self.state = CanvasState::ContextLost;
        true
    }

    /// The platform restored the context on its own
    pub fn on_context_restored(&mut self) {
        if self.state != CanvasState::Active {
            log::info!("Rendering context restored");
            self.state = CanvasState::Active;
        }
    }

    /// User pressed "try again"; returns the generation the new surface must use
    pub fn request_retry(&mut self) -> u64 {
        self.generation += 1;
        self.state = CanvasState::Recovering;
        self.mounted_at = None;
        log::info!("Recreating rendering surface (generation {})", self.generation);
        self.generation
    }
}
