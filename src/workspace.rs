// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Workspace path resolution.
//!
//! Every command operates on one project working directory. The [`Workspace`]
//! handle resolves all well-known file paths from that single root. It is
//! constructed once per invocation and handed to whatever component needs it,
//! so nothing in this crate consults the process working directory behind the
//! caller's back.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   .progress_config.json        project configuration
//!   <project_id>_progress.json   progress document
//!   .sync_queue.json             deferred sync tasks
//!   .progress_repo/              local mirror of the central repository
//!     projects/                  progress documents across all projects
//!   pages/                       default static site output
//! ```
//!
//! A working directory has one owner: one project, one process at a time.
//! Concurrent writers are out of scope.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Project configuration file name.
pub const CONFIG_FILE: &str = ".progress_config.json";

/// Sync queue file name.
pub const QUEUE_FILE: &str = ".sync_queue.json";

/// Local mirror directory name.
pub const MIRROR_DIR: &str = ".progress_repo";

/// Subdirectory of the central repository holding progress documents.
pub const PROJECTS_DIR: &str = "projects";

/// Default static site output directory name.
pub const PAGES_DIR: &str = "pages";

/// Path handle for one project working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Construct workspace rooted at target directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Construct workspace rooted at the process working directory.
    ///
    /// # Errors
    ///
    /// - Return [`NoWorkingDirectory`] if the working directory cannot be
    ///   determined, i.e., it was deleted out from under the process or is
    ///   not accessible.
    pub fn from_current_dir() -> Result<Self> {
        std::env::current_dir().map(Self::new).map_err(|_| NoWorkingDirectory)
    }

    /// Root of the project working directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path to the project configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Full path to the progress document of target project.
    pub fn progress_path(&self, project_id: &str) -> PathBuf {
        self.root.join(progress_filename(project_id))
    }

    /// Full path to the sync queue file.
    pub fn queue_path(&self) -> PathBuf {
        self.root.join(QUEUE_FILE)
    }

    /// Full path to the local mirror of the central repository.
    pub fn mirror_path(&self) -> PathBuf {
        self.root.join(MIRROR_DIR)
    }

    /// Full path to the mirror's cross-project document directory.
    pub fn mirror_projects_path(&self) -> PathBuf {
        self.mirror_path().join(PROJECTS_DIR)
    }

    /// Full path to the mirror's copy of target project's document.
    pub fn mirror_progress_path(&self, project_id: &str) -> PathBuf {
        self.mirror_projects_path().join(progress_filename(project_id))
    }

    /// Full path to the default static site output directory.
    pub fn pages_path(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }
}

/// File name of a project's progress document.
pub fn progress_filename(project_id: &str) -> String {
    format!("{project_id}_progress.json")
}

/// Generate a fresh opaque project identifier.
///
/// First eight characters of a random v4 UUID, matching the identifiers
/// embedded in progress document file names.
pub fn generate_project_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// No way to determine process working directory.
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine process working directory")]
pub struct NoWorkingDirectory;

/// Friendly result alias :3
type Result<T, E = NoWorkingDirectory> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[test]
    fn paths_hang_off_root() {
        let workspace = Workspace::new("/srv/mesh-router");
        assert_eq!(
            workspace.config_path(),
            PathBuf::from("/srv/mesh-router/.progress_config.json")
        );
        assert_eq!(
            workspace.progress_path("ab12cd34"),
            PathBuf::from("/srv/mesh-router/ab12cd34_progress.json")
        );
        assert_eq!(workspace.queue_path(), PathBuf::from("/srv/mesh-router/.sync_queue.json"));
        assert_eq!(
            workspace.mirror_progress_path("ab12cd34"),
            PathBuf::from("/srv/mesh-router/.progress_repo/projects/ab12cd34_progress.json")
        );
        assert_eq!(workspace.pages_path(), PathBuf::from("/srv/mesh-router/pages"));
    }

    #[test]
    fn project_ids_are_short_hex() {
        let id = generate_project_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_project_id());
    }

    #[sealed_test]
    fn workspace_from_current_dir() -> anyhow::Result<()> {
        let workspace = Workspace::from_current_dir()?;
        assert!(workspace.config_path().ends_with(CONFIG_FILE));
        Ok(())
    }
}
