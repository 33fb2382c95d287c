//! Background model loading
//!
//! Parsing happens on a worker thread; the render loop polls the task once per
//! frame and never blocks on it.

use std::thread;

use futures::channel::oneshot;

use super::{load_model, LoadError, ModelDescriptor};
use crate::gfx::scene::node::SceneNode;

pub struct LoadTask {
    descriptor: ModelDescriptor,
    receiver: oneshot::Receiver<Result<SceneNode, LoadError>>,
}

impl LoadTask {
    pub fn spawn(descriptor: ModelDescriptor, scale: f32) -> Result<Self, LoadError> {
        let (sender, receiver) = oneshot::channel();
        let worker_descriptor = descriptor.clone();

        thread::Builder::new()
            .name(format!("load-{}", descriptor.format))
            .spawn(move || {
                let result = load_model(&worker_descriptor, scale);
                // Receiver gone means the request was superseded
                if sender.send(result).is_err() {
                    log::debug!("Dropping stale load of {}", worker_descriptor.key());
                }
            })
            .map_err(|source| LoadError::io(&descriptor.path, source))?;

        Ok(Self {
            descriptor,
            receiver,
        })
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    /// Non-blocking check; `None` while the worker is still parsing
    pub fn poll(&mut self) -> Option<Result<SceneNode, LoadError>> {
        match self.receiver.try_recv() {
            Ok(None) => None,
            Ok(Some(result)) => Some(result),
            Err(oneshot::Canceled) => Some(Err(LoadError::Cancelled)),
        }
    }

    /// Blocks until the worker finishes
    #[cfg(test)]
    pub fn wait(self) -> Result<SceneNode, LoadError> {
        pollster::block_on(self.receiver).unwrap_or(Err(LoadError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{test_support, ModelFormat};

    #[test]
    fn test_task_delivers_result() {
        let path = test_support::fixture("task.obj", test_support::CUBE_OBJ.as_bytes());
        let task = LoadTask::spawn(ModelDescriptor::new(path, ModelFormat::Obj), 1.0).unwrap();
        let root = task.wait().unwrap();
        assert_eq!(root.mesh_count(), 1);
    }

    #[test]
    fn test_task_reports_errors() {
        let descriptor = ModelDescriptor::new("/missing/model.fbx", ModelFormat::Fbx);
        let mut task = LoadTask::spawn(descriptor, 1.0).unwrap();
        let result = loop {
            if let Some(result) = task.poll() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(matches!(result, Err(LoadError::Io { .. })));
    }
}
