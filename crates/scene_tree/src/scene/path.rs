//! Hierarchical node paths
//!
//! Paths are slash-delimited strings. The root is the empty string and every
//! other path starts with `/`, e.g. `/robot/base/camera`. A path's parent is
//! the path with its last `/segment` removed, so `/robot` is parented under
//! the root.

use super::store::SceneError;

/// Path of the permanent root node
pub const ROOT_PATH: &str = "";

/// Path of the permanent world-axes node
pub const WORLD_AXES_PATH: &str = "/WorldAxes";

/// Validate a path: either the root, or `/`-prefixed with non-empty segments.
pub fn validate(path: &str) -> Result<(), SceneError> {
    if path == ROOT_PATH {
        return Ok(());
    }
    let valid = path
        .strip_prefix('/')
        .is_some_and(|rest| rest.split('/').all(|segment| !segment.is_empty()));
    if valid {
        Ok(())
    } else {
        Err(SceneError::InvalidPath(path.to_string()))
    }
}

/// Parent path, or `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == ROOT_PATH {
        return None;
    }
    path.rfind('/').map(|index| &path[..index])
}

/// Last segment of a path (the node's display name). The root's name is empty.
pub fn name_of(path: &str) -> &str {
    path.rfind('/').map_or(path, |index| &path[index + 1..])
}

/// True when `candidate` lies strictly below `ancestor`.
///
/// Matching is segment-aware: `/a/b` is below `/a`, `/ab` is not.
pub fn is_descendant(candidate: &str, ancestor: &str) -> bool {
    candidate
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}
