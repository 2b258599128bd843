//! Mutation commands
//!
//! The vocabulary an external controller (a remote command channel, a script)
//! speaks to the store. Commands are plain data so they can be serialized,
//! queued and replayed.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, RIGID_EPSILON};
use crate::foundation::transforms;
use crate::render::Renderable;
use super::store::{SceneError, SceneResult, SceneStore};

/// A single mutation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneCommand {
    /// Add a node, or re-skin an existing one
    AddNode {
        /// Node path
        path: String,
        /// What to instantiate
        renderable: Renderable,
    },
    /// Remove a subtree
    RemoveNode {
        /// Subtree root
        path: String,
    },
    /// Show or hide a node
    SetVisibility {
        /// Node path
        path: String,
        /// New visibility
        visible: bool,
    },
    /// Set a node's transform relative to its parent
    SetTransform {
        /// Node path
        path: String,
        /// 4x4 homogeneous transform
        matrix: Mat4,
    },
    /// Set a node's transform from a `wxyz` quaternion and a position
    SetPose {
        /// Node path
        path: String,
        /// Rotation quaternion, scalar first
        wxyz: [f32; 4],
        /// Translation
        position: [f32; 3],
    },
    /// Restore the seeded tree
    Reset,
}

impl SceneCommand {
    /// Path targeted by the command, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::AddNode { path, .. }
            | Self::RemoveNode { path }
            | Self::SetVisibility { path, .. }
            | Self::SetTransform { path, .. }
            | Self::SetPose { path, .. } => Some(path.as_str()),
            Self::Reset => None,
        }
    }
}

impl SceneStore {
    /// Apply a command, honoring strict/lenient mode for contract violations
    pub fn apply(&mut self, command: SceneCommand) -> SceneResult<()> {
        log::trace!("Applying {command:?}");
        match command {
            SceneCommand::AddNode { path, renderable } => self.add(&path, renderable),
            SceneCommand::RemoveNode { path } => self.remove_node(&path),
            SceneCommand::SetVisibility { path, visible } => self.set_visibility(&path, visible),
            SceneCommand::SetTransform { path, matrix } => {
                if !transforms::is_rigid(&matrix, RIGID_EPSILON) {
                    log::warn!("Transform for '{path}' is not rigid; applying as given");
                }
                self.set_transform(&path, matrix)
            }
            SceneCommand::SetPose { path, wxyz, position } => {
                match transforms::from_wxyz_position(wxyz, position) {
                    Some(matrix) => self.set_transform(&path, matrix),
                    None => self.violation(SceneError::InvalidTransform(path)),
                }
            }
            SceneCommand::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Apply a batch in order, stopping at the first error
    pub fn apply_all(&mut self, commands: impl IntoIterator<Item = SceneCommand>) -> SceneResult<()> {
        commands.into_iter().try_for_each(|command| self.apply(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneTreeConfig;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn add(path: &str) -> SceneCommand {
        SceneCommand::AddNode {
            path: path.into(),
            renderable: Renderable::Group,
        }
    }

    #[test]
    fn test_script_applies_in_order() {
        let mut store = SceneStore::new();
        store
            .apply_all([
                add("/robot"),
                add("/robot/arm"),
                SceneCommand::SetVisibility { path: "/robot/arm".into(), visible: false },
                SceneCommand::RemoveNode { path: "/robot".into() },
                add("/robot"),
            ])
            .unwrap();

        assert!(store.contains("/robot"));
        assert!(!store.contains("/robot/arm"));
        assert!(store.children("/robot").unwrap().is_empty());
    }

    #[test]
    fn test_set_pose_builds_rigid_transform() {
        let mut store = SceneStore::new();
        store
            .apply(SceneCommand::SetPose {
                path: "/cam".into(),
                wxyz: [1.0, 0.0, 0.0, 0.0],
                position: [1.0, 2.0, 3.0],
            })
            .unwrap();

        let expected = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(*store.transform("/cam").unwrap(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_pose_strict_and_lenient() {
        let pose = SceneCommand::SetPose {
            path: "/cam".into(),
            wxyz: [0.0; 4],
            position: [0.0; 3],
        };

        let mut strict = SceneStore::new();
        assert_eq!(strict.apply(pose.clone()), Err(SceneError::InvalidTransform("/cam".into())));

        let mut lenient = SceneStore::with_config(SceneTreeConfig::lenient());
        assert!(lenient.apply(pose).is_ok());
        assert!(lenient.transform("/cam").is_none());
    }

    #[test]
    fn test_batch_stops_at_first_violation() {
        let mut store = SceneStore::new();
        let result = store.apply_all([add("/a/b"), add("/c")]);

        assert!(matches!(result, Err(SceneError::ParentMissing { .. })));
        assert!(!store.contains("/c"));
    }

    #[test]
    fn test_commands_deserialize_from_ron() {
        let script = r#"[
            AddNode(path: "/box", renderable: Box(dimensions: (1.0, 1.0, 1.0), color: (255, 0, 0))),
            SetVisibility(path: "/box", visible: false),
            SetPose(path: "/box", wxyz: (1.0, 0.0, 0.0, 0.0), position: (0.0, 0.0, 1.0)),
            Reset,
        ]"#;
        let commands: Vec<SceneCommand> = ron::from_str(script).unwrap();

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].path(), Some("/box"));
        assert_eq!(commands[3], SceneCommand::Reset);
    }
}
