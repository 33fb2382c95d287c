//! Model slot: which model the canvas shows and whether it is ready
//!
//! Requests start a background [`LoadTask`]; the slot is polled once per frame
//! and yields a [`LoadOutcome`] when the task finishes. Results for a
//! descriptor that is no longer current are dropped.

use crate::{
    gfx::scene::node::SceneNode,
    loader::{LoadError, LoadTask, ModelCache, ModelDescriptor},
};

#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Result of a finished load, consumed by the host
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(SceneNode),
    Failed(LoadError),
}

pub struct ModelSlot {
    descriptor: Option<ModelDescriptor>,
    scale: f32,
    state: SlotState,
    task: Option<LoadTask>,
    cache: ModelCache,
}

impl ModelSlot {
    pub fn new(scale: f32) -> Self {
        Self {
            descriptor: None,
            scale,
            state: SlotState::Idle,
            task: None,
            cache: ModelCache::new(),
        }
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn descriptor(&self) -> Option<&ModelDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    /// Empty stand-in rendered while a model is loading
    pub fn placeholder() -> SceneNode {
        SceneNode::group("placeholder")
    }

    /// Switches to `descriptor`.
    ///
    /// A background load starts and the result arrives through
    /// [`Self::poll`]. `None` is returned unless the load could not even be
    /// started. Requesting the current descriptor again is a no-op unless it
    /// failed.
    pub fn request(&mut self, descriptor: ModelDescriptor) -> Option<LoadOutcome> {
        if self.descriptor.as_ref() == Some(&descriptor)
            && !matches!(self.state, SlotState::Failed(_))
        {
            return None;
        }

        self.evict_current();
        self.descriptor = Some(descriptor.clone());
        self.state = SlotState::Loading;
        match LoadTask::spawn(descriptor, self.scale) {
            Ok(task) => {
                self.task = Some(task);
                None
            }
            Err(err) => Some(self.fail(err)),
        }
    }

    /// Non-blocking; returns the outcome on the frame the load finishes
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let result = self.task.as_mut()?.poll()?;
        let Some(task) = self.task.take() else {
            return None;
        };

        if self.descriptor.as_ref() != Some(task.descriptor()) {
            log::debug!("Discarding stale load of {}", task.descriptor().key());
            return None;
        }

        Some(match result {
            Ok(root) => {
                self.cache.insert(task.descriptor(), root.clone());
                self.state = SlotState::Ready;
                LoadOutcome::Loaded(root)
            }
            Err(err) => self.fail(err),
        })
    }

    /// Forgets the current model; an in-flight load is abandoned
    pub fn unmount(&mut self) {
        self.evict_current();
        self.descriptor = None;
        self.state = SlotState::Idle;
    }

    fn fail(&mut self, err: LoadError) -> LoadOutcome {
        self.state = SlotState::Failed(err.to_string());
        LoadOutcome::Failed(err)
    }

    fn evict_current(&mut self) {
        self.task = None;
        if let Some(previous) = &self.descriptor {
            match self.cache.evict(previous) {
                Ok(()) => log::debug!("Evicted {} from model cache", previous.key()),
                Err(err) => log::debug!("Cache eviction skipped: {err}"),
            }
        }
    }
}
