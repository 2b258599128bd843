//! Shared store handle
//!
//! Lets a control channel running on another thread issue mutations while the
//! render thread runs projection passes. Each mutation and each pass holds the
//! write lock for its whole duration, so neither ever observes the other half
//! done.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::SceneTreeConfig;
use crate::foundation::math::Mat4;
use crate::render::{RenderBackend, Renderable};
use super::commands::SceneCommand;
use super::projector::{ProjectionReport, SceneProjector};
use super::store::{SceneResult, SceneStore};

/// Cloneable, thread-safe handle to a [`SceneStore`]
#[derive(Debug, Clone)]
pub struct SharedScene {
    store: Arc<RwLock<SceneStore>>,
}

impl SharedScene {
    /// Wrap a new store seeded from `config`
    pub fn new(config: SceneTreeConfig) -> Self {
        Self::from_store(SceneStore::with_config(config))
    }

    /// Wrap an existing store
    pub fn from_store(store: SceneStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Add or re-skin a node
    pub fn add(&self, path: &str, renderable: Renderable) -> SceneResult<()> {
        self.write().add(path, renderable)
    }

    /// Remove a subtree
    pub fn remove_node(&self, path: &str) -> SceneResult<()> {
        self.write().remove_node(path)
    }

    /// Write the visibility overlay
    pub fn set_visibility(&self, path: &str, visible: bool) -> SceneResult<()> {
        self.write().set_visibility(path, visible)
    }

    /// Write the transform overlay
    pub fn set_transform(&self, path: &str, transform: Mat4) -> SceneResult<()> {
        self.write().set_transform(path, transform)
    }

    /// Restore the seeded tree
    pub fn reset(&self) {
        self.write().reset();
    }

    /// Apply a command
    pub fn apply(&self, command: SceneCommand) -> SceneResult<()> {
        self.write().apply(command)
    }

    /// Run one projection pass with the store locked throughout
    pub fn project(&self, projector: &mut SceneProjector, backend: &mut dyn RenderBackend) -> ProjectionReport {
        projector.update(&mut self.write(), backend)
    }

    /// Read access to the store
    pub fn read(&self) -> RwLockReadGuard<'_, SceneStore> {
        // mutations validate before writing, so a poisoned store is still consistent
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the store
    pub fn write(&self) -> RwLockWriteGuard<'_, SceneStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedScene {
    fn default() -> Self {
        Self::new(SceneTreeConfig::default())
    }
}
