//! Loaded model cache keyed by [`ModelDescriptor::key`]

use std::collections::HashMap;

use super::ModelDescriptor;
use crate::gfx::scene::node::SceneNode;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CacheError {
    #[error("model '{0}' is not cached")]
    NotCached(String),
}

/// Parsed scene trees of the mounted models.
///
/// Entries are evicted when their model is unmounted or replaced, which keeps
/// memory bounded to what is on screen. Geometry is reference counted, so the
/// entry shares its buffers with the clone handed to the scene.
#[derive(Default)]
pub struct ModelCache {
    entries: HashMap<String, SceneNode>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, descriptor: &ModelDescriptor) -> Option<SceneNode> {
        self.entries.get(&descriptor.key()).cloned()
    }

    pub fn insert(&mut self, descriptor: &ModelDescriptor, root: SceneNode) {
        self.entries.insert(descriptor.key(), root);
    }

    /// Drops a cached model; errors if it was never cached
    pub fn evict(&mut self, descriptor: &ModelDescriptor) -> Result<(), CacheError> {
        let key = descriptor.key();
        match self.entries.remove(&key) {
            Some(_) => Ok(()),
            None => Err(CacheError::NotCached(key)),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ModelFormat;

    #[test]
    fn test_insert_get_evict() {
        let mut cache = ModelCache::new();
        let descriptor = ModelDescriptor::new("a.glb", ModelFormat::Glb);
        assert!(cache.get(&descriptor).is_none());

        cache.insert(&descriptor, SceneNode::group("a"));
        assert_eq!(cache.get(&descriptor).map(|n| n.name), Some("a".to_string()));
        assert_eq!(cache.len(), 1);

        assert!(cache.evict(&descriptor).is_ok());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evicting_unknown_entry_errors() {
        let mut cache = ModelCache::new();
        let descriptor = ModelDescriptor::new("a.obj", ModelFormat::Obj);
        assert_eq!(
            cache.evict(&descriptor),
            Err(CacheError::NotCached("obj-a.obj".to_string()))
        );
    }

    #[test]
    fn test_same_path_different_format_is_separate() {
        let mut cache = ModelCache::new();
        cache.insert(&ModelDescriptor::new("m", ModelFormat::Obj), SceneNode::group("obj"));
        assert!(cache.get(&ModelDescriptor::new("m", ModelFormat::Fbx)).is_none());
    }
}
