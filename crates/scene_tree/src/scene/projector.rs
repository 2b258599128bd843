//! Render tree projector
//!
//! Keeps a rendering backend in step with a [`SceneStore`]. Each mounted path
//! owns exactly one backend object, created by invoking the node's factory
//! once and parented under the object of the node's structural parent.
//!
//! Every mounted path holds two independent subscriptions:
//! - **structure** (`NODE | CHILDREN`): the node was re-skinned or removed, or
//!   its child list changed. Handled by mounting/unmounting objects.
//! - **attributes** (`VISIBILITY | TRANSFORM`): applied in place to the held
//!   object. The factory is never re-run and no other path is touched.
//!
//! Work happens in [`SceneProjector::update`], once per frame. Writes that
//! landed between two passes have already been coalesced by the store, so the
//! pass only ever sees the latest value of each slice.

use std::collections::HashMap;
use std::sync::Arc;

use crate::render::{AttachPoint, ObjectHandle, RenderBackend, RenderError, RenderableFactory};
use super::path::{self, ROOT_PATH};
use super::store::SceneStore;
use super::subscription::{Notification, ObserverId, Slice, SubscriptionId};

/// What a single update pass did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProjectionReport {
    /// Objects created by factories
    pub mounted: usize,
    /// Objects detached and disposed
    pub unmounted: usize,
    /// Visibility/transform writes applied in place
    pub attribute_updates: usize,
    /// Paths whose factory failed; they stay unmounted until the next
    /// structural event touching them
    pub failures: Vec<String>,
    /// Backend errors raised while updating or disposing mounted objects
    pub errors: Vec<RenderError>,
}

impl ProjectionReport {
    /// True when the pass changed nothing
    pub fn is_idle(&self) -> bool {
        self.mounted == 0
            && self.unmounted == 0
            && self.attribute_updates == 0
            && self.failures.is_empty()
            && self.errors.is_empty()
    }
}

#[derive(Debug)]
struct Mount {
    /// `None` when the factory failed
    object: Option<ObjectHandle>,
    /// Generation of the node record this mount was built from
    generation: u64,
    children: Vec<String>,
    structure: SubscriptionId,
    attributes: SubscriptionId,
}

struct Pass<'a> {
    store: &'a mut SceneStore,
    backend: &'a mut dyn RenderBackend,
    report: ProjectionReport,
}

/// Incrementally projects the scene tree into a rendering backend
#[derive(Debug)]
pub struct SceneProjector {
    observer: ObserverId,
    mounts: HashMap<String, Mount>,
}

impl SceneProjector {
    /// Create a projector observing `store`
    ///
    /// Nothing is mounted until the first [`SceneProjector::update`].
    pub fn new(store: &mut SceneStore) -> Self {
        Self {
            observer: store.register_observer(),
            mounts: HashMap::new(),
        }
    }

    /// Run one update pass
    ///
    /// Mounts the tree on the first call; afterwards reconciles only the paths
    /// whose subscriptions fired since the previous pass.
    pub fn update(&mut self, store: &mut SceneStore, backend: &mut dyn RenderBackend) -> ProjectionReport {
        let mut pass = Pass {
            store,
            backend,
            report: ProjectionReport::default(),
        };

        if !self.mounts.contains_key(ROOT_PATH) {
            self.mount(&mut pass, ROOT_PATH, None);
        }

        for notification in pass.store.drain_notifications(self.observer) {
            self.dispatch(&mut pass, &notification);
        }

        let report = pass.report;
        if report.is_idle() {
            log::trace!("Projection pass idle");
        } else {
            log::debug!(
                "Projection pass: {} mounted, {} unmounted, {} attribute updates, {} failures",
                report.mounted,
                report.unmounted,
                report.attribute_updates,
                report.failures.len()
            );
        }
        report
    }

    /// Unmount everything and stop observing `store`
    pub fn detach(mut self, store: &mut SceneStore, backend: &mut dyn RenderBackend) -> ProjectionReport {
        let mut pass = Pass {
            store,
            backend,
            report: ProjectionReport::default(),
        };
        self.unmount(&mut pass, ROOT_PATH);
        pass.store.unregister_observer(self.observer);
        pass.report
    }

    /// Backend object currently mounted for `path`
    pub fn object(&self, path: &str) -> Option<ObjectHandle> {
        self.mounts.get(path).and_then(|m| m.object)
    }

    /// Whether `path` has a live object
    pub fn is_mounted(&self, path: &str) -> bool {
        self.object(path).is_some()
    }

    /// Number of paths with a live object
    pub fn mounted_count(&self) -> usize {
        self.mounts.values().filter(|m| m.object.is_some()).count()
    }

    fn dispatch(&mut self, pass: &mut Pass<'_>, notification: &Notification) {
        let path = notification.path.as_str();
        let Some((structure, attributes)) = self.mounts.get(path).map(|m| (m.structure, m.attributes)) else {
            return;
        };

        if notification.subscription == structure {
            if notification.changed.contains(Slice::NODE) {
                self.on_node_changed(pass, path);
            } else {
                self.reconcile_children(pass, path);
            }
        } else if notification.subscription == attributes {
            self.apply_attributes(pass, path, notification.changed);
        }
        // anything else belongs to a mount that has since been replaced
    }

    fn on_node_changed(&mut self, pass: &mut Pass<'_>, path: &str) {
        let Some(mount) = self.mounts.get(path) else {
            return;
        };
        let failed = mount.object.is_none();
        let generation = mount.generation;

        // a re-skin, or a removal followed by a re-add, leaves a new record
        let needs_remount = match pass.store.node(path) {
            None => {
                self.unmount(pass, path);
                self.forget_child(path);
                return;
            }
            Some(node) => failed || node.generation() != generation,
        };

        if needs_remount {
            self.remount(pass, path);
        } else {
            self.reconcile_children(pass, path);
        }
    }

    fn reconcile_children(&mut self, pass: &mut Pass<'_>, path: &str) {
        let Some(mount) = self.mounts.get(path) else {
            return;
        };
        let Some(object) = mount.object else {
            // failed earlier; a structural event is the cue to retry
            self.remount(pass, path);
            return;
        };
        let previous = mount.children.clone();
        let Some(current) = pass.store.children(path).map(<[String]>::to_vec) else {
            self.unmount(pass, path);
            self.forget_child(path);
            return;
        };

        for child in previous.iter().filter(|child| !current.contains(child)) {
            self.unmount(pass, child);
        }

        for child in &current {
            match self.mounts.get(child.as_str()).map(|m| m.object.is_some()) {
                None => self.mount(pass, child, Some(object)),
                Some(false) => self.remount(pass, child),
                Some(true) => {}
            }
        }

        let mounted: Vec<String> = current
            .into_iter()
            .filter(|child| self.mounts.contains_key(child.as_str()))
            .collect();
        if let Some(mount) = self.mounts.get_mut(path) {
            mount.children = mounted;
        }
    }

    fn apply_attributes(&mut self, pass: &mut Pass<'_>, path: &str, changed: Slice) {
        let Some(object) = self.object(path) else {
            return;
        };

        if changed.contains(Slice::VISIBILITY) {
            let visible = pass.store.visibility(path).unwrap_or(true);
            match pass.backend.set_visible(object, visible) {
                Ok(()) => pass.report.attribute_updates += 1,
                Err(err) => Self::backend_error(pass, path, err),
            }
        }

        if changed.contains(Slice::TRANSFORM) {
            // an absent entry means nothing to apply, not identity
            if let Some(transform) = pass.store.transform(path).copied() {
                match pass.backend.set_transform(object, &transform) {
                    Ok(()) => pass.report.attribute_updates += 1,
                    Err(err) => Self::backend_error(pass, path, err),
                }
            }
        }
    }

    fn mount(&mut self, pass: &mut Pass<'_>, path: &str, parent_object: Option<ObjectHandle>) {
        let Some(node) = pass.store.node(path) else {
            return;
        };
        let factory = Arc::clone(node.factory());
        let generation = node.generation();
        let children = node.children().to_vec();

        let structure = pass.store.subscribe(self.observer, path, Slice::NODE | Slice::CHILDREN);
        let attributes = pass.store.subscribe(self.observer, path, Slice::ATTRIBUTES);

        let attach = AttachPoint {
            parent: parent_object,
            path,
        };
        let object = match factory.instantiate(attach, pass.backend) {
            Ok(object) => Some(object),
            Err(err) => {
                log::warn!("Factory {} failed for '{}': {}", factory.describe(), path, err);
                pass.report.failures.push(path.to_string());
                None
            }
        };

        self.mounts.insert(
            path.to_string(),
            Mount {
                object,
                generation,
                children: Vec::new(),
                structure,
                attributes,
            },
        );

        let Some(object) = object else {
            return;
        };
        log::trace!("Mounted '{path}'");
        pass.report.mounted += 1;
        pass.store.set_renderable_handle(path, object);

        let visible = pass.store.visibility(path).unwrap_or(true);
        if let Err(err) = pass.backend.set_visible(object, visible) {
            Self::backend_error(pass, path, err);
        }
        if let Some(transform) = pass.store.transform(path).copied() {
            if let Err(err) = pass.backend.set_transform(object, &transform) {
                Self::backend_error(pass, path, err);
            }
        }

        for child in &children {
            self.mount(pass, child, Some(object));
        }
        if let Some(mount) = self.mounts.get_mut(path) {
            mount.children = children;
        }
    }

    fn remount(&mut self, pass: &mut Pass<'_>, path: &str) {
        let parent_object = path::parent_of(path).and_then(|parent| self.object(parent));
        if path != ROOT_PATH && parent_object.is_none() {
            // parent is not live either; its own retry will bring us back
            return;
        }
        self.unmount(pass, path);
        self.mount(pass, path, parent_object);
    }

    fn unmount(&mut self, pass: &mut Pass<'_>, path: &str) {
        let Some(mount) = self.mounts.remove(path) else {
            return;
        };

        for child in &mount.children {
            self.unmount(pass, child);
        }

        pass.store.unsubscribe(mount.structure);
        pass.store.unsubscribe(mount.attributes);

        let Some(object) = mount.object else {
            return;
        };
        if let Err(err) = pass.backend.dispose(object) {
            Self::backend_error(pass, path, err);
        }
        if pass.store.renderable_handle(path) == Some(object) {
            pass.store.clear_renderable_handle(path);
        }
        log::trace!("Unmounted '{path}'");
        pass.report.unmounted += 1;
    }

    fn forget_child(&mut self, path: &str) {
        let Some(parent) = path::parent_of(path) else {
            return;
        };
        if let Some(mount) = self.mounts.get_mut(parent) {
            mount.children.retain(|child| child != path);
        }
    }

    fn backend_error(pass: &mut Pass<'_>, path: &str, err: RenderError) {
        log::error!("Backend rejected update for '{path}': {err}");
        pass.report.errors.push(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::foundation::math::Mat4;
    use crate::foundation::transforms;
    use crate::render::{BackendEvent, FnFactory, HeadlessBackend, Renderable};
    use crate::scene::path::WORLD_AXES_PATH;
    use crate::scene::SceneNode;

    fn counting_factory(counter: &Arc<AtomicUsize>) -> impl RenderableFactory + 'static {
        let counter = Arc::clone(counter);
        FnFactory::new("counting", move |attach, backend| {
            counter.fetch_add(1, Ordering::SeqCst);
            backend.create_object(attach, &Renderable::Group)
        })
    }

    fn failing_factory() -> impl RenderableFactory + 'static {
        FnFactory::new("failing", |attach, _backend| {
            Err(RenderError::FactoryFailed {
                path: attach.path.to_string(),
                reason: "no mesh".into(),
            })
        })
    }

    fn assert_handles_agree(store: &SceneStore, projector: &SceneProjector) {
        for path in store.paths() {
            assert_eq!(
                store.renderable_handle(path),
                projector.object(path),
                "recorded handle for '{path}' differs from the mounted object"
            );
        }
    }

    fn setup() -> (SceneStore, SceneProjector, HeadlessBackend) {
        let mut store = SceneStore::new();
        let projector = SceneProjector::new(&mut store);
        (store, projector, HeadlessBackend::new())
    }

    #[test]
    fn test_first_pass_mounts_seeded_tree() {
        let (mut store, mut projector, mut backend) = setup();
        let report = projector.update(&mut store, &mut backend);

        assert_eq!(report.mounted, 2);
        let root = projector.object("").unwrap();
        let axes = projector.object(WORLD_AXES_PATH).unwrap();
        assert_eq!(backend.parent(axes), Some(root));
        assert_eq!(backend.kind(axes), Some("frame"));
        assert_eq!(store.renderable_handle(""), Some(root));
        assert_eq!(store.renderable_handle(WORLD_AXES_PATH), Some(axes));
        assert_handles_agree(&store, &projector);

        assert!(projector.update(&mut store, &mut backend).is_idle());
    }

    #[test]
    fn test_children_parented_structurally() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);

        let a = projector.object("/a").unwrap();
        let b = projector.object("/a/b").unwrap();
        assert_eq!(backend.parent(a), projector.object(""));
        assert_eq!(backend.parent(b), Some(a));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_transform_updates_never_rerun_factories() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", counting_factory(&counter)).unwrap();
        store.add("/a/b", counting_factory(&counter)).unwrap();
        store.add("/c", counting_factory(&counter)).unwrap();
        projector.update(&mut store, &mut backend);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        backend.take_events();

        for step in 0..10 {
            store.set_transform("/a", transforms::planar_pose(step as f32, 0.0, 0.0)).unwrap();
        }
        let report = projector.update(&mut store, &mut backend);

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(report.mounted, 0);
        assert_eq!(report.attribute_updates, 1);
        assert_eq!(backend.take_events(), vec![BackendEvent::Transform { path: "/a".into() }]);
        let a = projector.object("/a").unwrap();
        assert_eq!(backend.local_transform(a), Some(transforms::planar_pose(9.0, 0.0, 0.0)));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_visibility_writes_coalesce_between_passes() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);
        backend.take_events();

        store.set_visibility("/a", false).unwrap();
        store.set_visibility("/a", true).unwrap();
        projector.update(&mut store, &mut backend);

        assert_eq!(
            backend.take_events(),
            vec![BackendEvent::Visibility { path: "/a".into(), visible: true }]
        );
    }

    #[test]
    fn test_hidden_parent_hides_subtree_in_backend() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        store.set_visibility("/a", false).unwrap();
        projector.update(&mut store, &mut backend);

        let b = projector.object("/a/b").unwrap();
        assert_eq!(backend.is_visible(b), Some(true));
        assert!(!backend.is_world_visible(b));
    }

    #[test]
    fn test_buffered_attributes_applied_on_mount() {
        let (mut store, mut projector, mut backend) = setup();
        projector.update(&mut store, &mut backend);

        let pose = transforms::planar_pose(0.0, 3.0, 1.0);
        store.set_transform("/late", pose).unwrap();
        store.set_visibility("/late", false).unwrap();
        store.add("/late", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);

        let late = projector.object("/late").unwrap();
        assert_eq!(backend.local_transform(late), Some(pose));
        assert_eq!(backend.is_visible(late), Some(false));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_removal_unmounts_subtree_only() {
        let (mut store, mut projector, mut backend) = setup();
        for path in ["/a", "/a/b", "/ab"] {
            store.add(path, Renderable::Group).unwrap();
        }
        projector.update(&mut store, &mut backend);
        let a = projector.object("/a").unwrap();
        let b = projector.object("/a/b").unwrap();

        store.remove_node("/a").unwrap();
        let report = projector.update(&mut store, &mut backend);

        assert_eq!(report.unmounted, 2);
        assert!(!backend.contains(a));
        assert!(!backend.contains(b));
        assert!(projector.is_mounted("/ab"));
        assert!(store.renderable_handle("/a").is_none());
        assert!(store.renderable_handle("/a/b").is_none());
        assert_eq!(backend.len(), 3);
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_reskin_remounts_with_children_preserved() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);
        let old = projector.object("/a").unwrap();

        store.add("/a", Renderable::Label { text: "hello".into() }).unwrap();
        projector.update(&mut store, &mut backend);

        let new = projector.object("/a").unwrap();
        assert_ne!(old, new);
        assert!(!backend.contains(old));
        assert_eq!(backend.kind(new), Some("label"));
        let b = projector.object("/a/b").unwrap();
        assert_eq!(backend.parent(b), Some(new));
        assert_eq!(store.renderable_handle("/a"), Some(new));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_factory_failure_leaves_state_intact() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/broken", failing_factory()).unwrap();
        store.set_visibility("/broken", false).unwrap();
        let report = projector.update(&mut store, &mut backend);

        assert_eq!(report.failures, vec!["/broken".to_string()]);
        assert!(store.contains("/broken"));
        assert_eq!(store.visibility("/broken"), Some(false));
        assert!(store.renderable_handle("/broken").is_none());
        assert!(!projector.is_mounted("/broken"));

        store.add("/broken", Renderable::Group).unwrap();
        let report = projector.update(&mut store, &mut backend);
        assert!(report.failures.is_empty());
        let fixed = projector.object("/broken").unwrap();
        assert_eq!(backend.is_visible(fixed), Some(false));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_failed_mount_retried_on_structural_event() {
        let fail_next = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&fail_next);
        let flaky = FnFactory::new("flaky", move |attach, backend| {
            if flag.swap(false, Ordering::SeqCst) {
                return Err(RenderError::Backend("device lost".into()));
            }
            backend.create_object(attach, &Renderable::Group)
        });

        let (mut store, mut projector, mut backend) = setup();
        store.add("/flaky", flaky).unwrap();
        projector.update(&mut store, &mut backend);
        assert!(!projector.is_mounted("/flaky"));

        store.add("/flaky/child", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);

        let flaky = projector.object("/flaky").unwrap();
        let child = projector.object("/flaky/child").unwrap();
        assert_eq!(backend.parent(child), Some(flaky));
        assert!(!fail_next.load(Ordering::SeqCst));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_remove_and_readd_in_one_pass() {
        let counter = Arc::new(AtomicUsize::new(0));
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);

        store.remove_node("/a").unwrap();
        store.add("/a", counting_factory(&counter)).unwrap();
        projector.update(&mut store, &mut backend);

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(projector.is_mounted("/a"));
        assert!(!projector.is_mounted("/a/b"));
        assert!(backend.find("/a/b").is_none());
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_readd_of_same_record_mounts_fresh_object() {
        let (mut store, mut projector, mut backend) = setup();
        let node = SceneNode::new("/a", Renderable::Group);
        store.add_node(node.clone()).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        store.set_transform("/a", transforms::planar_pose(5.0, 0.0, 0.0)).unwrap();
        projector.update(&mut store, &mut backend);
        let old = projector.object("/a").unwrap();

        store.remove_node("/a").unwrap();
        store.add_node(node).unwrap();
        let report = projector.update(&mut store, &mut backend);

        let new = projector.object("/a").unwrap();
        assert_ne!(old, new);
        assert!(!backend.contains(old));
        assert_eq!(report.mounted, 1);
        assert_eq!(backend.creation_count("/a"), 2);
        assert_eq!(store.renderable_handle("/a"), Some(new));
        assert!(store.transform("/a").is_none());
        assert_eq!(backend.local_transform(new), Some(Mat4::identity()));
        assert!(!projector.is_mounted("/a/b"));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_reset_restores_seeded_objects() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        store.add("/a/b", Renderable::Group).unwrap();
        store.set_transform(WORLD_AXES_PATH, Mat4::new_scaling(2.0)).unwrap();
        projector.update(&mut store, &mut backend);

        store.reset();
        projector.update(&mut store, &mut backend);

        assert_eq!(backend.len(), 2);
        assert_eq!(projector.mounted_count(), 2);
        let axes = projector.object(WORLD_AXES_PATH).unwrap();
        assert_eq!(backend.local_transform(axes), Some(Mat4::identity()));
        assert_eq!(store.renderable_handle(WORLD_AXES_PATH), Some(axes));
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_box_label_end_to_end() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/box", Renderable::Box { dimensions: [1.0; 3], color: [200, 10, 10] }).unwrap();
        store.set_transform("/box", Mat4::identity()).unwrap();
        projector.update(&mut store, &mut backend);
        store.add("/box/label", Renderable::Label { text: "box".into() }).unwrap();
        projector.update(&mut store, &mut backend);
        store.set_visibility("/box", false).unwrap();
        projector.update(&mut store, &mut backend);
        assert!(!backend.is_world_visible(projector.object("/box/label").unwrap()));

        store.remove_node("/box").unwrap();
        projector.update(&mut store, &mut backend);

        for path in ["/box", "/box/label"] {
            assert!(!store.contains(path));
            assert!(!store.has_overlay_entries(path));
            assert!(backend.find(path).is_none());
        }
        assert_handles_agree(&store, &projector);
    }

    #[test]
    fn test_detach_disposes_everything() {
        let (mut store, mut projector, mut backend) = setup();
        store.add("/a", Renderable::Group).unwrap();
        projector.update(&mut store, &mut backend);

        let report = projector.detach(&mut store, &mut backend);

        assert_eq!(report.unmounted, 3);
        assert!(backend.is_empty());
        assert!(store.renderable_handle("").is_none());
    }
}
