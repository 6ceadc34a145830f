// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project configuration layout.
//!
//! Each project working directory carries one configuration document at
//! `.progress_config.json`. It is created by `init` and afterwards mutated
//! for exactly one reason: refreshing [`last_sync`] after a successful push.
//! Everything else is read-only state describing the project and where its
//! progress gets published.
//!
//! [`last_sync`]: ProjectConfig::last_sync

use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs,
    io::ErrorKind,
    str::FromStr,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::workspace::{self, Workspace};

/// Central repository used when `init` is not given an explicit remote.
pub const DEFAULT_REMOTE_URL: &str = "https://github.com/awkless/progress-central.git";

/// Configuration of one tracked project.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Opaque short identifier, unique per project.
    pub project_id: String,

    /// Human-readable project name.
    pub project_name: String,

    /// Category label grouping related projects. Free-form, not a key into
    /// anything.
    pub parent_project: String,

    /// One-line statement of what the project is trying to achieve.
    pub development_goal: String,

    /// URL of the central repository aggregating progress documents.
    pub remote_url: String,

    /// Instant of the last successful synchronization.
    pub last_sync: DateTime<Utc>,

    /// When synchronization should happen.
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl ProjectConfig {
    /// Construct configuration for a freshly initialized project.
    pub fn new(
        project_name: impl Into<String>,
        parent_project: impl Into<String>,
        development_goal: impl Into<String>,
        remote_url: impl Into<String>,
    ) -> Self {
        Self {
            project_id: workspace::generate_project_id(),
            project_name: project_name.into(),
            parent_project: parent_project.into(),
            development_goal: development_goal.into(),
            remote_url: remote_url.into(),
            last_sync: Utc::now(),
            sync_mode: SyncMode::default(),
        }
    }

    /// Load configuration from target workspace.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Missing`] if no configuration exists, i.e.,
    ///   the project was never initialized.
    /// - Return [`ConfigError::Read`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the content is not a
    ///   well-formed configuration document.
    #[instrument(skip(workspace), level = "debug")]
    pub fn load(workspace: &Workspace) -> Result<Self> {
        let path = workspace.config_path();
        debug!("load project configuration from {:?}", path.display());
        let data = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ConfigError::Missing,
            _ => ConfigError::Read(err),
        })?;

        data.parse()
    }

    /// Persist configuration into target workspace.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Write`] if the file cannot be written.
    pub fn save(&self, workspace: &Workspace) -> Result<()> {
        fs::write(workspace.config_path(), self.to_string()).map_err(ConfigError::Write)
    }

    /// Record a successful synchronization at the current instant.
    pub fn touch_last_sync(&mut self) {
        self.last_sync = Utc::now();
    }
}

impl FromStr for ProjectConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ProjectConfig =
            serde_json::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on remote url field so remotes
        // like "~/central.git" or "$FORGE/progress.git" resolve.
        config.remote_url = shellexpand::full(config.remote_url.as_str())?.into_owned();

        Ok(config)
    }
}

impl Display for ProjectConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let data = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fmt.write_str(data.as_str())
    }
}

/// Synchronization trigger policy.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Attempt a push after every appended entry.
    #[default]
    Realtime,

    /// Leave pushing to explicit `sync` invocations.
    Scheduled,
}

impl Display for SyncMode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Realtime => fmt.write_str("realtime"),
            Self::Scheduled => fmt.write_str("scheduled"),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration document exists in the workspace.
    #[error("no project configuration found, run `worklog init` first")]
    Missing,

    /// Configuration document cannot be read.
    #[error("failed to read project configuration")]
    Read(#[source] std::io::Error),

    /// Configuration document cannot be written.
    #[error("failed to write project configuration")]
    Write(#[source] std::io::Error),

    /// Configuration content is not a well-formed document.
    #[error("malformed project configuration")]
    Deserialize(#[source] serde_json::Error),

    /// Configuration cannot be rendered back to JSON.
    #[error("cannot serialize project configuration")]
    Serialize(#[source] serde_json::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn fixture() -> anyhow::Result<ProjectConfig> {
        Ok(ProjectConfig {
            project_id: "ab12cd34".into(),
            project_name: "mesh-router".into(),
            parent_project: "Networking".into(),
            development_goal: "Ship v1 of the mesh routing daemon".into(),
            remote_url: "https://forge.example.com/progress.git".into(),
            last_sync: "2024-06-01T09:00:00Z".parse()?,
            sync_mode: SyncMode::Scheduled,
        })
    }

    #[sealed_test(env = [("FORGE", "https://forge.example.com")])]
    fn deserialize_project_config() -> anyhow::Result<()> {
        let result: ProjectConfig = indoc! {r#"
            {
              "project_id": "ab12cd34",
              "project_name": "mesh-router",
              "parent_project": "Networking",
              "development_goal": "Ship v1 of the mesh routing daemon",
              "remote_url": "$FORGE/progress.git",
              "last_sync": "2024-06-01T09:00:00Z",
              "sync_mode": "scheduled"
            }
        "#}
        .parse()?;

        assert_eq!(result, fixture()?);

        Ok(())
    }

    #[test]
    fn serialize_project_config() -> anyhow::Result<()> {
        let expect = indoc! {r#"
            {
              "project_id": "ab12cd34",
              "project_name": "mesh-router",
              "parent_project": "Networking",
              "development_goal": "Ship v1 of the mesh routing daemon",
              "remote_url": "https://forge.example.com/progress.git",
              "last_sync": "2024-06-01T09:00:00Z",
              "sync_mode": "scheduled"
            }"#};

        assert_eq!(fixture()?.to_string(), expect);

        Ok(())
    }

    #[test]
    fn missing_sync_mode_defaults_to_realtime() -> anyhow::Result<()> {
        let result: ProjectConfig = indoc! {r#"
            {
              "project_id": "ab12cd34",
              "project_name": "mesh-router",
              "parent_project": "Networking",
              "development_goal": "Ship v1 of the mesh routing daemon",
              "remote_url": "https://forge.example.com/progress.git",
              "last_sync": "2024-06-01T09:00:00Z"
            }
        "#}
        .parse()?;

        assert_eq!(result.sync_mode, SyncMode::Realtime);

        Ok(())
    }

    #[test]
    fn load_reports_missing_configuration() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::new(root.path());
        let result = ProjectConfig::load(&workspace);
        assert!(matches!(result, Err(ConfigError::Missing)));

        Ok(())
    }

    #[test]
    fn save_load_round_trip() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::new(root.path());
        let config = fixture()?;
        config.save(&workspace)?;

        assert_eq!(ProjectConfig::load(&workspace)?, config);

        Ok(())
    }
}
