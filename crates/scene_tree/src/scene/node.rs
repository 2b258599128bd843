//! Node records held by the registry

use std::sync::Arc;

use crate::render::RenderableFactory;
use super::path;

/// Structural record for one node of the scene tree
///
/// The record only carries structure: its path, the ordered paths of its
/// direct children and the factory used to instantiate it. Visibility,
/// transforms and live objects are kept in separate overlays by the store.
#[derive(Debug, Clone)]
pub struct SceneNode {
    path: String,
    children: Vec<String>,
    factory: Arc<dyn RenderableFactory>,
    generation: u64,
}

impl SceneNode {
    /// Create a childless node
    pub fn new(path: impl Into<String>, factory: impl RenderableFactory + 'static) -> Self {
        Self::from_shared(path, Arc::new(factory))
    }

    /// Create a childless node from an already shared factory
    pub fn from_shared(path: impl Into<String>, factory: Arc<dyn RenderableFactory>) -> Self {
        Self {
            path: path.into(),
            children: Vec::new(),
            factory,
            generation: 0,
        }
    }

    /// Hierarchical path (unique key)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Display name: the last path segment
    pub fn name(&self) -> &str {
        path::name_of(&self.path)
    }

    /// Paths of the direct children, in insertion order
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Factory that builds this node's renderable object
    pub fn factory(&self) -> &Arc<dyn RenderableFactory> {
        &self.factory
    }

    /// Store-assigned identity of this record
    ///
    /// Changes whenever the store inserts or re-skins the record, so a path
    /// removed and added back carries a different generation even when the
    /// factory instance is shared.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(super) fn replace_factory(&mut self, factory: Arc<dyn RenderableFactory>, generation: u64) {
        self.factory = factory;
        self.generation = generation;
    }

    pub(super) fn stamp(&mut self, generation: u64) {
        self.generation = generation;
        self.children.clear();
    }

    pub(super) fn push_child(&mut self, child: &str) {
        if !self.children.iter().any(|c| c == child) {
            self.children.push(child.to_string());
        }
    }

    pub(super) fn remove_child(&mut self, child: &str) {
        self.children.retain(|c| c != child);
    }
}
