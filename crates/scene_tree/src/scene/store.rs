//! Scene state store
//!
//! The store is the single owner of the node registry and the three attribute
//! overlays (visibility, transform, renderable handle). Structural data and
//! attributes live in separate maps so that high-frequency attribute writes
//! never touch the registry.
//!
//! Every mutation runs to completion before any observer can look at the
//! store: observers only learn about changes by draining their notification
//! queue, which happens between mutations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::SceneTreeConfig;
use crate::foundation::math::Mat4;
use crate::render::{ObjectHandle, Renderable, RenderableFactory};
use super::node::SceneNode;
use super::path::{self, ROOT_PATH, WORLD_AXES_PATH};
use super::subscription::{Notification, ObserverId, Slice, SubscriptionId, SubscriptionRegistry};

/// Scene store errors
///
/// All of these are caller contract violations. In lenient mode the store logs
/// them and drops the offending mutation instead of returning them.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A node was added before its parent
    #[error("Cannot add '{path}': parent '{parent}' does not exist")]
    ParentMissing {
        /// Path being added
        path: String,
        /// Missing parent path
        parent: String,
    },

    /// The path is not `""` or a `/`-prefixed sequence of non-empty segments
    #[error("Invalid node path: '{0}'")]
    InvalidPath(String),

    /// The root node cannot be removed
    #[error("Node '{0}' is permanent and cannot be removed")]
    PermanentNode(String),

    /// A transform could not be built from the supplied parameters
    #[error("Degenerate transform for '{0}'")]
    InvalidTransform(String),
}

/// Result type for store operations
pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone)]
struct SceneState {
    nodes: HashMap<String, SceneNode>,
    visibility: HashMap<String, bool>,
    transforms: HashMap<String, Mat4>,
    handles: HashMap<String, ObjectHandle>,
}

impl SceneState {
    fn seeded(config: &SceneTreeConfig, generation: &mut u64) -> Self {
        let mut stamped = |node: &mut SceneNode| {
            *generation += 1;
            node.stamp(*generation);
        };
        let axes = &config.world_axes;
        let mut root = SceneNode::new(ROOT_PATH, Renderable::Root);
        stamped(&mut root);
        root.push_child(WORLD_AXES_PATH);
        let mut world_axes = SceneNode::new(WORLD_AXES_PATH, Renderable::frame(axes.axes_length, axes.axes_radius));
        stamped(&mut world_axes);

        Self {
            nodes: HashMap::from([
                (ROOT_PATH.to_string(), root),
                (WORLD_AXES_PATH.to_string(), world_axes),
            ]),
            visibility: HashMap::from([
                (ROOT_PATH.to_string(), true),
                (WORLD_AXES_PATH.to_string(), axes.visible),
            ]),
            transforms: HashMap::new(),
            handles: HashMap::new(),
        }
    }
}

/// Scene store - owns the registry, the overlays and the subscriptions
#[derive(Debug)]
pub struct SceneStore {
    config: SceneTreeConfig,
    state: SceneState,
    subscriptions: SubscriptionRegistry,
    revision: u64,
    generation: u64,
}

impl SceneStore {
    /// Create a store with the default (strict) configuration
    pub fn new() -> Self {
        Self::with_config(SceneTreeConfig::default())
    }

    /// Create a store seeded from `config`
    pub fn with_config(config: SceneTreeConfig) -> Self {
        let mut generation = 0;
        let state = SceneState::seeded(&config, &mut generation);
        Self {
            config,
            state,
            subscriptions: SubscriptionRegistry::new(),
            revision: 0,
            generation,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &SceneTreeConfig {
        &self.config
    }

    /// Monotonic counter bumped by every mutation that changed something
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ========================================================================
    // Structural mutations
    // ========================================================================

    /// Add `renderable` at `path`; see [`SceneStore::add_node`]
    pub fn add(&mut self, path: &str, renderable: impl RenderableFactory + 'static) -> SceneResult<()> {
        self.add_node(SceneNode::new(path, renderable))
    }

    /// Add a node, or re-skin it if the path already exists
    ///
    /// Re-skinning swaps the factory and keeps the existing child list. A new
    /// node starts without children whatever record it was built from, is
    /// appended to its parent's child list and defaults to visible unless a
    /// visibility write for its path arrived first. The parent must already
    /// exist; callers add nodes root-to-leaf.
    ///
    /// Either way the stored record gets a fresh [`SceneNode::generation`].
    pub fn add_node(&mut self, mut node: SceneNode) -> SceneResult<()> {
        let path = node.path().to_string();
        if let Err(err) = path::validate(&path) {
            return self.violation(err);
        }
        let generation = self.next_generation();

        if let Some(existing) = self.state.nodes.get_mut(&path) {
            existing.replace_factory(Arc::clone(node.factory()), generation);
            log::debug!("Re-skinned '{}' with {}", path, node.factory().describe());
            self.subscriptions.notify(&path, Slice::NODE);
            self.revision += 1;
            return Ok(());
        }

        let parent = path::parent_of(&path).unwrap_or(ROOT_PATH).to_string();
        let Some(parent_node) = self.state.nodes.get_mut(&parent) else {
            return self.violation(SceneError::ParentMissing { path, parent });
        };
        parent_node.push_child(&path);
        node.stamp(generation);

        log::debug!("Added '{}' ({}) under '{}'", path, node.factory().describe(), parent);
        let mut changed = Slice::NODE;
        if !self.state.visibility.contains_key(&path) {
            self.state.visibility.insert(path.clone(), true);
            changed |= Slice::VISIBILITY;
        }
        self.state.nodes.insert(path.clone(), node);

        self.subscriptions.notify(&path, changed);
        self.subscriptions.notify(&parent, Slice::CHILDREN);
        self.revision += 1;
        Ok(())
    }

    /// Remove the subtree rooted at `path`
    ///
    /// Removing a path that does not exist is logged and ignored. Descendants
    /// are found by segment-aware prefix matching, so removing `/a` removes
    /// `/a/b` but leaves `/ab` alone. Overlay entries buffered for paths inside
    /// the subtree are dropped as well. Live objects are not touched here; the
    /// projector detaches them on its next pass.
    pub fn remove_node(&mut self, path: &str) -> SceneResult<()> {
        if let Err(err) = path::validate(path) {
            return self.violation(err);
        }
        if path == ROOT_PATH {
            return self.violation(SceneError::PermanentNode(path.to_string()));
        }
        if !self.state.nodes.contains_key(path) {
            log::warn!("Ignoring removal of unknown node '{path}'");
            return Ok(());
        }

        let parent = path::parent_of(path).unwrap_or(ROOT_PATH).to_string();
        if let Some(parent_node) = self.state.nodes.get_mut(&parent) {
            parent_node.remove_child(path);
        }

        let state = &self.state;
        let doomed: HashSet<String> = state
            .nodes
            .keys()
            .chain(state.visibility.keys())
            .chain(state.transforms.keys())
            .chain(state.handles.keys())
            .filter(|candidate| candidate.as_str() == path || path::is_descendant(candidate, path))
            .cloned()
            .collect();

        for doomed_path in &doomed {
            self.state.nodes.remove(doomed_path);
            self.state.visibility.remove(doomed_path);
            self.state.transforms.remove(doomed_path);
            self.state.handles.remove(doomed_path);
            self.subscriptions.notify(
                doomed_path,
                Slice::NODE | Slice::CHILDREN | Slice::ATTRIBUTES | Slice::HANDLE,
            );
        }
        self.subscriptions.notify(&parent, Slice::CHILDREN);

        log::debug!("Removed '{}' ({} paths cleared)", path, doomed.len());
        self.revision += 1;
        Ok(())
    }

    /// Restore the seeded tree: root and world axes, default overlays
    pub fn reset(&mut self) {
        self.state = SceneState::seeded(&self.config, &mut self.generation);
        self.subscriptions.notify_all();
        self.revision += 1;
        log::debug!("Scene reset");
    }

    // ========================================================================
    // Overlay writes
    // ========================================================================

    /// Write the visibility overlay; the path does not have to exist yet
    pub fn set_visibility(&mut self, path: &str, visible: bool) -> SceneResult<()> {
        if let Err(err) = path::validate(path) {
            return self.violation(err);
        }
        if !self.state.nodes.contains_key(path) {
            log::trace!("Buffering visibility for absent node '{path}'");
        }
        if self.state.visibility.insert(path.to_string(), visible) != Some(visible) {
            self.subscriptions.notify(path, Slice::VISIBILITY);
            self.revision += 1;
        }
        Ok(())
    }

    /// Write the transform overlay; the path does not have to exist yet
    pub fn set_transform(&mut self, path: &str, transform: Mat4) -> SceneResult<()> {
        if let Err(err) = path::validate(path) {
            return self.violation(err);
        }
        if !self.state.nodes.contains_key(path) {
            log::trace!("Buffering transform for absent node '{path}'");
        }
        if self.state.transforms.insert(path.to_string(), transform) != Some(transform) {
            self.subscriptions.notify(path, Slice::TRANSFORM);
            self.revision += 1;
        }
        Ok(())
    }

    /// Record the live object mounted for `path`
    pub fn set_renderable_handle(&mut self, path: &str, handle: ObjectHandle) {
        if self.state.handles.insert(path.to_string(), handle) != Some(handle) {
            self.subscriptions.notify(path, Slice::HANDLE);
        }
    }

    /// Forget the live object recorded for `path`, returning it
    pub fn clear_renderable_handle(&mut self, path: &str) -> Option<ObjectHandle> {
        let previous = self.state.handles.remove(path);
        if previous.is_some() {
            self.subscriptions.notify(path, Slice::HANDLE);
        }
        previous
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether a node exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.state.nodes.contains_key(path)
    }

    /// Node record at `path`
    pub fn node(&self, path: &str) -> Option<&SceneNode> {
        self.state.nodes.get(path)
    }

    /// Child list of `path`
    pub fn children(&self, path: &str) -> Option<&[String]> {
        self.state.nodes.get(path).map(SceneNode::children)
    }

    /// Visibility overlay entry for `path`
    pub fn visibility(&self, path: &str) -> Option<bool> {
        self.state.visibility.get(path).copied()
    }

    /// Transform overlay entry for `path`; `None` means no transform was set
    pub fn transform(&self, path: &str) -> Option<&Mat4> {
        self.state.transforms.get(path)
    }

    /// Renderable handle overlay entry for `path`
    pub fn renderable_handle(&self, path: &str) -> Option<ObjectHandle> {
        self.state.handles.get(path).copied()
    }

    /// Whether any overlay still holds an entry for `path`
    pub fn has_overlay_entries(&self, path: &str) -> bool {
        self.state.visibility.contains_key(path)
            || self.state.transforms.contains_key(path)
            || self.state.handles.contains_key(path)
    }

    /// Number of nodes in the registry
    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    /// Number of transform overlay entries
    pub fn transform_count(&self) -> usize {
        self.state.transforms.len()
    }

    /// All node paths, sorted
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.state.nodes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a notification consumer
    pub fn register_observer(&mut self) -> ObserverId {
        self.subscriptions.register_observer()
    }

    /// Drop a consumer and everything it subscribed to
    pub fn unregister_observer(&mut self, observer: ObserverId) {
        self.subscriptions.unregister_observer(observer);
    }

    /// Watch `slices` of `path`
    pub fn subscribe(&mut self, observer: ObserverId, path: &str, slices: Slice) -> SubscriptionId {
        self.subscriptions.subscribe(observer, path, slices)
    }

    /// Cancel a subscription
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.subscriptions.unsubscribe(subscription);
    }

    /// Take the pending notifications of `observer`
    pub fn drain_notifications(&mut self, observer: ObserverId) -> Vec<Notification> {
        self.subscriptions.drain(observer)
    }

    /// Whether `observer` has notifications waiting
    pub fn has_pending(&self, observer: ObserverId) -> bool {
        self.subscriptions.has_pending(observer)
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn violation(&self, err: SceneError) -> SceneResult<()> {
        if self.config.strict {
            Err(err)
        } else {
            log::warn!("Dropping mutation: {err}");
            Ok(())
        }
    }
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new()
    }
}
