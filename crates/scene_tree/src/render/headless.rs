//! In-memory rendering backend
//!
//! Keeps an object hierarchy in a slot map and records every call it
//! receives. It has no GPU behind it, which makes it the backend of choice for
//! tests and for replaying command scripts on a headless machine.

use slotmap::SlotMap;

use crate::foundation::math::Mat4;
use super::{AttachPoint, BackendResult, ObjectHandle, RenderBackend, RenderError, Renderable};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Object created for a node
    Created {
        /// Node path
        path: String,
        /// Renderable kind
        kind: &'static str,
    },
    /// Visibility written
    Visibility {
        /// Node path
        path: String,
        /// New visibility
        visible: bool,
    },
    /// Transform written
    Transform {
        /// Node path
        path: String,
    },
    /// Object disposed (descendants get their own event)
    Disposed {
        /// Node path
        path: String,
    },
}

#[derive(Debug)]
struct HeadlessObject {
    path: String,
    kind: &'static str,
    parent: Option<ObjectHandle>,
    children: Vec<ObjectHandle>,
    visible: bool,
    base: Mat4,
    overlay: Mat4,
}

impl HeadlessObject {
    fn local_transform(&self) -> Mat4 {
        self.base * self.overlay
    }
}

/// Headless rendering backend
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    objects: SlotMap<ObjectHandle, HeadlessObject>,
    events: Vec<BackendEvent>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when no objects are alive
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether `object` is still alive
    pub fn contains(&self, object: ObjectHandle) -> bool {
        self.objects.contains_key(object)
    }

    /// Live object created for `path`, if any
    pub fn find(&self, path: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|(_, object)| object.path == path)
            .map(|(handle, _)| handle)
    }

    /// Node path an object was created for
    pub fn path(&self, object: ObjectHandle) -> Option<&str> {
        self.objects.get(object).map(|o| o.path.as_str())
    }

    /// Renderable kind of an object
    pub fn kind(&self, object: ObjectHandle) -> Option<&'static str> {
        self.objects.get(object).map(|o| o.kind)
    }

    /// Parent object in the backend hierarchy
    pub fn parent(&self, object: ObjectHandle) -> Option<ObjectHandle> {
        self.objects.get(object).and_then(|o| o.parent)
    }

    /// Objects parented directly under `object`, in creation order
    pub fn children(&self, object: ObjectHandle) -> &[ObjectHandle] {
        self.objects.get(object).map_or(&[], |o| o.children.as_slice())
    }

    /// The object's own visibility flag
    pub fn is_visible(&self, object: ObjectHandle) -> Option<bool> {
        self.objects.get(object).map(|o| o.visible)
    }

    /// Visibility after inheriting from every ancestor
    pub fn is_world_visible(&self, object: ObjectHandle) -> bool {
        let mut current = Some(object);
        while let Some(handle) = current {
            match self.objects.get(handle) {
                Some(o) if o.visible => current = o.parent,
                _ => return false,
            }
        }
        true
    }

    /// Transform relative to the parent object
    pub fn local_transform(&self, object: ObjectHandle) -> Option<Mat4> {
        self.objects.get(object).map(HeadlessObject::local_transform)
    }

    /// Transform relative to the backend's world frame
    ///
    /// This is where structural parenting turns into matrix composition; the
    /// scene tree itself never multiplies transforms.
    pub fn world_transform(&self, object: ObjectHandle) -> Option<Mat4> {
        let mut world = self.objects.get(object)?.local_transform();
        let mut current = self.objects.get(object)?.parent;
        while let Some(handle) = current {
            let parent = self.objects.get(handle)?;
            world = parent.local_transform() * world;
            current = parent.parent;
        }
        Some(world)
    }

    /// Every call recorded so far
    pub fn events(&self) -> &[BackendEvent] {
        &self.events
    }

    /// Drain the recorded calls
    pub fn take_events(&mut self) -> Vec<BackendEvent> {
        std::mem::take(&mut self.events)
    }

    /// How many objects have ever been created for `path`
    pub fn creation_count(&self, path: &str) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, BackendEvent::Created { path: p, .. } if p == path))
            .count()
    }

    fn get_mut(&mut self, object: ObjectHandle) -> BackendResult<&mut HeadlessObject> {
        self.objects.get_mut(object).ok_or(RenderError::UnknownObject(object))
    }

    fn dispose_recursive(&mut self, object: ObjectHandle) {
        if let Some(removed) = self.objects.remove(object) {
            for child in removed.children {
                self.dispose_recursive(child);
            }
            self.events.push(BackendEvent::Disposed { path: removed.path });
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_object(&mut self, attach: AttachPoint<'_>, renderable: &Renderable) -> BackendResult<ObjectHandle> {
        if let Some(parent) = attach.parent {
            if !self.objects.contains_key(parent) {
                return Err(RenderError::UnknownObject(parent));
            }
        }

        let handle = self.objects.insert(HeadlessObject {
            path: attach.path.to_string(),
            kind: renderable.kind_name(),
            parent: attach.parent,
            children: Vec::new(),
            visible: true,
            base: renderable.base_transform().unwrap_or_else(Mat4::identity),
            overlay: Mat4::identity(),
        });

        if let Some(parent) = attach.parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.push(handle);
        }

        log::trace!("Created {} object for '{}'", renderable.kind_name(), attach.path);
        self.events.push(BackendEvent::Created {
            path: attach.path.to_string(),
            kind: renderable.kind_name(),
        });
        Ok(handle)
    }

    fn set_visible(&mut self, object: ObjectHandle, visible: bool) -> BackendResult<()> {
        let entry = self.get_mut(object)?;
        entry.visible = visible;
        let path = entry.path.clone();
        self.events.push(BackendEvent::Visibility { path, visible });
        Ok(())
    }

    fn set_transform(&mut self, object: ObjectHandle, transform: &Mat4) -> BackendResult<()> {
        let entry = self.get_mut(object)?;
        entry.overlay = *transform;
        let path = entry.path.clone();
        self.events.push(BackendEvent::Transform { path });
        Ok(())
    }

    fn dispose(&mut self, object: ObjectHandle) -> BackendResult<()> {
        let parent = self.objects.get(object).ok_or(RenderError::UnknownObject(object))?.parent;
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.retain(|child| *child != object);
        }
        self.dispose_recursive(object);
        Ok(())
    }
}
