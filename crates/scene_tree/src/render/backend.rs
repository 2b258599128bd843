//! Backend abstraction traits for the rendering seam
//!
//! This module defines the trait that rendering backends must implement so
//! the projector can mount, update and tear down objects without knowing what
//! they are.

use crate::foundation::math::Mat4;
use super::Renderable;

slotmap::new_key_type! {
    /// Opaque handle to an object living in a rendering backend
    pub struct ObjectHandle;
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Where a freshly instantiated object gets attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachPoint<'a> {
    /// Object to parent under, `None` for the scene root
    pub parent: Option<ObjectHandle>,
    /// Path of the node being mounted (used for labelling only)
    pub path: &'a str,
}

/// Errors raised by rendering backends and renderable factories
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The backend has no live object for this handle
    #[error("Unknown render object: {0:?}")]
    UnknownObject(ObjectHandle),

    /// A renderable factory could not build its object
    #[error("Factory for '{path}' failed: {reason}")]
    FactoryFailed {
        /// Node path being mounted
        path: String,
        /// Failure description
        reason: String,
    },

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Main rendering backend trait
///
/// Objects form a hierarchy inside the backend: an object created with a
/// parent is positioned in that parent's frame and hidden with it. The scene
/// tree relies on this structural parenting instead of composing matrices.
pub trait RenderBackend {
    /// Create an object for `renderable` under `attach.parent`
    fn create_object(&mut self, attach: AttachPoint<'_>, renderable: &Renderable) -> BackendResult<ObjectHandle>;

    /// Show or hide an object (and, implicitly, everything parented under it)
    fn set_visible(&mut self, object: ObjectHandle, visible: bool) -> BackendResult<()>;

    /// Set an object's transform relative to its parent
    fn set_transform(&mut self, object: ObjectHandle, transform: &Mat4) -> BackendResult<()>;

    /// Detach and dispose an object together with all of its descendants
    fn dispose(&mut self, object: ObjectHandle) -> BackendResult<()>;
}
