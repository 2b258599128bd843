//! Rendering seam
//!
//! The scene tree never draws anything itself. It hands node descriptors to a
//! [`RenderBackend`], receives opaque [`ObjectHandle`]s back, and afterwards
//! only toggles visibility, writes transforms and disposes objects.
//!
//! ## Architecture
//!
//! ```text
//! SceneStore (state)
//!      ↓
//! SceneProjector (reconciliation)
//!      ↓
//! RenderBackend (objects parented under objects)
//! ```
//!
//! [`HeadlessBackend`] is an in-memory backend used by tests and by the replay
//! tool. Real backends (a GPU renderer, a remote viewer) implement the same
//! trait.

mod backend;
mod renderable;
mod headless;

pub use backend::{AttachPoint, BackendResult, ObjectHandle, RenderBackend, RenderError};
pub use renderable::{FnFactory, Renderable, RenderableFactory};
pub use headless::{BackendEvent, HeadlessBackend};
