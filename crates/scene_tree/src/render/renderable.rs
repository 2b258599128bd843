//! Renderable kinds and the factory contract
//!
//! A node does not hold a renderable object, it holds a *factory* for one.
//! The projector invokes the factory once per mount and keeps the resulting
//! handle for attribute updates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::foundation::math::Mat4;
use crate::foundation::transforms;
use super::{AttachPoint, BackendResult, ObjectHandle, RenderBackend};

/// Constructor for a node's visual representation
///
/// Implementations must not reach for sibling or ancestor state: everything a
/// factory may use is its own data, the attachment point and the backend.
pub trait RenderableFactory: fmt::Debug + Send + Sync {
    /// Build the object under `attach` and return its handle
    fn instantiate(&self, attach: AttachPoint<'_>, backend: &mut dyn RenderBackend) -> BackendResult<ObjectHandle>;

    /// Short label used in logs
    fn describe(&self) -> &str;
}

/// Built-in renderable kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Renderable {
    /// Invisible group that turns the backend's Y-up frame into Z-up
    Root,
    /// Invisible group, only used for parenting
    Group,
    /// Coordinate frame, optionally drawing its three axes
    Frame {
        /// Axis length
        axes_length: f32,
        /// Axis radius
        axes_radius: f32,
        /// Whether the axes are drawn at all
        show_axes: bool,
    },
    /// Axis-aligned box centered on the node origin
    Box {
        /// Edge lengths along x, y, z
        dimensions: [f32; 3],
        /// RGB color
        color: [u8; 3],
    },
    /// Text label
    Label {
        /// Label text
        text: String,
    },
    /// Colored point cloud
    PointCloud {
        /// Point positions
        points: Vec<[f32; 3]>,
        /// Per-point colors; a single entry colors every point
        colors: Vec<[u8; 3]>,
        /// Rendered point size
        point_size: f32,
    },
    /// Triangle mesh
    Mesh {
        /// Vertex positions
        vertices: Vec<[f32; 3]>,
        /// Triangle vertex indices
        faces: Vec<[u32; 3]>,
        /// RGB color
        color: [u8; 3],
    },
}

impl Renderable {
    /// Coordinate frame with its axes drawn
    pub fn frame(axes_length: f32, axes_radius: f32) -> Self {
        Self::Frame {
            axes_length,
            axes_radius,
            show_axes: true,
        }
    }

    /// Kind name used in logs and by backends
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Group => "group",
            Self::Frame { .. } => "frame",
            Self::Box { .. } => "box",
            Self::Label { .. } => "label",
            Self::PointCloud { .. } => "point_cloud",
            Self::Mesh { .. } => "mesh",
        }
    }

    /// Fixed transform the backend bakes into the object, below any overlay
    /// transform. Only the root has one.
    pub fn base_transform(&self) -> Option<Mat4> {
        match self {
            Self::Root => Some(transforms::z_up_basis()),
            _ => None,
        }
    }
}

impl RenderableFactory for Renderable {
    fn instantiate(&self, attach: AttachPoint<'_>, backend: &mut dyn RenderBackend) -> BackendResult<ObjectHandle> {
        backend.create_object(attach, self)
    }

    fn describe(&self) -> &str {
        self.kind_name()
    }
}

/// Factory backed by a closure
///
/// Useful for custom renderables that compose several backend objects, and
/// for tests that need to observe or fail factory invocations.
pub struct FnFactory<F> {
    name: String,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(AttachPoint<'_>, &mut dyn RenderBackend) -> BackendResult<ObjectHandle> + Send + Sync,
{
    /// Wrap `build` under a descriptive `name`
    pub fn new(name: impl Into<String>, build: F) -> Self {
        Self {
            name: name.into(),
            build,
        }
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> RenderableFactory for FnFactory<F>
where
    F: Fn(AttachPoint<'_>, &mut dyn RenderBackend) -> BackendResult<ObjectHandle> + Send + Sync,
{
    fn instantiate(&self, attach: AttachPoint<'_>, backend: &mut dyn RenderBackend) -> BackendResult<ObjectHandle> {
        (self.build)(attach, backend)
    }

    fn describe(&self) -> &str {
        &self.name
    }
}
