//! # Scene Tree
//!
//! A live, path-keyed 3D scene tree and the machinery that keeps a rendering
//! backend synchronized with it while it is mutated from outside.
//!
//! ## Features
//!
//! - **Node Registry**: nodes keyed by slash-delimited paths, ordered child lists
//! - **Attribute Overlays**: visibility, transforms and object handles kept apart
//!   from structure so attribute churn never touches the registry
//! - **Fine-grained Subscriptions**: per path, per slice, coalesced between passes
//! - **Incremental Projection**: factories run once per mount; attribute changes
//!   are applied in place
//! - **Command Vocabulary**: serializable mutations for remote controllers
//!
//! ## Quick Start
//!
//! ```rust
//! use scene_tree::prelude::*;
//!
//! let mut store = SceneStore::new();
//! let mut projector = SceneProjector::new(&mut store);
//! let mut backend = HeadlessBackend::new();
//!
//! store.add("/box", Renderable::Box { dimensions: [1.0; 3], color: [255, 0, 0] })?;
//! store.set_transform("/box", transforms::planar_pose(1.0, 0.0, 0.0))?;
//! let report = projector.update(&mut store, &mut backend);
//!
//! assert_eq!(report.mounted, 3); // root, world axes, box
//! assert!(projector.is_mounted("/box"));
//! # Ok::<(), scene_tree::scene::SceneError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod render;
pub mod scene;

/// Common imports for scene tree users
pub mod prelude {
    pub use crate::{
        config::{Config, SceneTreeConfig},
        foundation::{
            math::{Mat4, Vec3},
            transforms,
        },
        render::{FnFactory, HeadlessBackend, ObjectHandle, RenderBackend, Renderable, RenderableFactory},
        scene::{ProjectionReport, SceneCommand, SceneError, SceneNode, SceneProjector, SceneStore, SharedScene, Slice},
    };
}
