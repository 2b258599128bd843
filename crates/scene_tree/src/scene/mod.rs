//! Scene tree state management
//!
//! Bridges external controllers and a rendering backend:
//!
//! ```text
//! Controller (commands)
//!      ↓
//! SceneStore (registry + overlays + subscriptions)
//!      ↓
//! SceneProjector (incremental reconciliation)
//!      ↓
//! RenderBackend (objects)
//! ```
//!
//! The store:
//! - Holds node records keyed by hierarchical path
//! - Keeps visibility, transforms and live object handles in separate overlays
//! - Notifies observers per path and per slice, coalescing repeated writes
//!
//! The projector:
//! - Invokes each node's factory once per mount
//! - Parents objects structurally, never composing matrices itself
//! - Applies visibility/transform changes in place

pub mod path;
mod node;
mod subscription;
mod store;
mod commands;
mod projector;
mod shared;

pub use node::SceneNode;
pub use subscription::{Notification, ObserverId, Slice, SubscriptionId, SubscriptionRegistry};
pub use store::{SceneError, SceneResult, SceneStore};
pub use commands::SceneCommand;
pub use projector::{ProjectionReport, SceneProjector};
pub use shared::SharedScene;
