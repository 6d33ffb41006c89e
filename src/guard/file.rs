//! File-access guard for workspace handles on pods.

use std::path::PathBuf;

use super::{ensure_in_scope, GuardError};
use crate::node::Node;
use crate::scope::Scope;

/// Handle on a path of a node's file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Node the path lives on.
    pub node: String,
    /// Path on that node.
    pub path: PathBuf,
}

impl FileHandle {
    /// Handle on `path` of `node`.
    pub fn new(node: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            node: node.into(),
            path: path.into(),
        }
    }
}

/// Single-shot check applied whenever a file handle bound to a node is requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAccessGuard;

impl FileAccessGuard {
    /// Return `current` if it may be used from `scope`.
    ///
    /// Handles on non-pod nodes, and absent handles, pass through unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ProtectedTemplateOutOfScope`] for a protected pod
    /// whose template is not in the scope's context.
    pub fn resolve(
        &self,
        current: Option<FileHandle>,
        node: Option<&Node>,
        scope: &Scope,
    ) -> Result<Option<FileHandle>, GuardError> {
        let pod = match node {
            Some(Node::Pod(pod)) if current.is_some() => pod,
            _ => return Ok(current),
        };
        ensure_in_scope(pod, scope)?;
        Ok(current)
    }
}
