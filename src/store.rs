// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Progress document storage.
//!
//! One progress document per project: a small JSON file holding the project
//! description and an append-only sequence of timestamped entries. Saves are
//! whole-document replacements written through a temporary sibling and
//! renamed into place, so a crash mid-write never leaves a half-old half-new
//! document behind.
//!
//! Appending is pure with respect to the document value. Persistence is a
//! separate, explicit [`save`], which is what lets the sync layer treat "the
//! entry is durable" and "the entry is published" as independent events.
//!
//! [`save`]: ProgressDocument::save

use std::{
    collections::BTreeSet,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// One timestamped note of work done on a project.
///
/// Immutable once appended. `date` and `time` stay strings end to end; the
/// month view matches dates by lexical prefix, so no calendar parsing ever
/// happens on this type.
#[derive(Debug, Default, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProgressEntry {
    /// Calendar date of the work, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,

    /// Clock time of the work, `HH:MM`.
    #[serde(default)]
    pub time: String,

    /// What was done.
    #[serde(default)]
    pub description: String,

    /// Free-form elaboration, empty when absent.
    #[serde(default)]
    pub notes: String,

    /// Labels for future filtering.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ProgressEntry {
    /// Construct entry stamped with the current local date and time.
    pub fn now(description: impl Into<String>, notes: impl Into<String>) -> Self {
        let instant = Local::now();
        Self {
            date: instant.format("%Y-%m-%d").to_string(),
            time: instant.format("%H:%M").to_string(),
            description: description.into(),
            notes: notes.into(),
            tags: BTreeSet::new(),
        }
    }
}

/// A project's full progress record.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProgressDocument {
    /// Human-readable project name.
    #[serde(default)]
    pub project_name: String,

    /// Category label grouping related projects.
    #[serde(default)]
    pub parent_project: String,

    /// One-line statement of what the project is trying to achieve.
    #[serde(default)]
    pub development_goal: String,

    /// Date the project was initialized.
    #[serde(default = "today")]
    pub created_date: NaiveDate,

    /// Instant of the last append.
    #[serde(default = "now")]
    pub last_updated: DateTime<Utc>,

    /// Append-only entry sequence, oldest first.
    #[serde(default)]
    pub entries: Vec<ProgressEntry>,
}

impl ProgressDocument {
    /// Construct document for a freshly initialized project.
    pub fn create(
        project_name: impl Into<String>,
        parent_project: impl Into<String>,
        development_goal: impl Into<String>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            parent_project: parent_project.into(),
            development_goal: development_goal.into(),
            created_date: today(),
            last_updated: now(),
            entries: Vec::new(),
        }
    }

    /// Append one entry, returning the extended document.
    ///
    /// Entries keep append order, which is not necessarily date order when
    /// entries were added out of band.
    #[must_use]
    pub fn append(mut self, entry: ProgressEntry) -> Self {
        self.entries.push(entry);
        self.last_updated = now();
        self
    }

    /// Load a progress document from target path.
    ///
    /// Individual missing fields fall back to their defaults; malformed
    /// JSON is fatal for the operation.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::NotFound`] if no document exists at target
    ///   path.
    /// - Return [`StoreError::Read`] if the document cannot be read.
    /// - Return [`StoreError::Corrupt`] if the content is not a well-formed
    ///   progress document.
    #[instrument(skip(path), level = "debug")]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound { path: path.to_path_buf() },
            _ => StoreError::Read { source: err, path: path.to_path_buf() },
        })?;

        serde_json::from_str(&data)
            .map_err(|err| StoreError::Corrupt { source: err, path: path.to_path_buf() })
    }

    /// Persist the document as a complete replacement of target file.
    ///
    /// The bytes land in a temporary sibling first and get renamed over the
    /// target, so readers never observe a torn document.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Write`] if the temporary file cannot be
    ///   written or renamed into place.
    #[instrument(skip(self, path), level = "debug")]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self).map_err(|err| StoreError::Write {
            source: std::io::Error::other(err),
            path: path.to_path_buf(),
        })?;

        let staged = path.with_extension("json.tmp");
        fs::write(&staged, data)
            .map_err(|err| StoreError::Write { source: err, path: staged.clone() })?;
        fs::rename(&staged, path)
            .map_err(|err| StoreError::Write { source: err, path: path.to_path_buf() })?;
        debug!("saved progress document at {:?}", path.display());

        Ok(())
    }
}

/// A progress document paired with the project identifier recovered from
/// its file name.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct StoredProject {
    /// Opaque short identifier of the project.
    pub project_id: String,

    /// The project's progress record.
    pub document: ProgressDocument,
}

/// Load every progress document under target directory.
///
/// Scans for `*_progress.json`. Documents that fail to parse are skipped
/// with a warning so one corrupt project cannot take down a whole page
/// build. Results come out ordered by project identifier.
///
/// # Errors
///
/// - Return [`StoreError::Scan`] if target directory cannot be scanned.
#[instrument(skip(dir), level = "debug")]
pub fn load_all(dir: impl AsRef<Path>) -> Result<Vec<StoredProject>> {
    let dir = dir.as_ref();
    let pattern = dir.join("*_progress.json");
    let paths = glob::glob(&pattern.to_string_lossy())
        .map_err(|err| StoreError::Scan { source: err, path: dir.to_path_buf() })?;

    let mut projects = Vec::new();
    for path in paths.flatten() {
        let Some(project_id) = project_id_from_filename(&path) else {
            continue;
        };

        match ProgressDocument::load(&path) {
            Ok(document) => projects.push(StoredProject { project_id, document }),
            Err(err) => warn!("skipping {:?}: {err}", path.display()),
        }
    }
    projects.sort_by(|a, b| a.project_id.cmp(&b.project_id));

    Ok(projects)
}

/// Recover the project identifier from a progress document file name.
pub fn project_id_from_filename(path: &Path) -> Option<String> {
    path.file_name()?
        .to_str()?
        .strip_suffix("_progress.json")
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
}

/// Progress document storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document exists at target path.
    #[error("no progress document at {:?}", path.display())]
    NotFound { path: PathBuf },

    /// Document exists but cannot be read.
    #[error("failed to read progress document at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Document content is not a well-formed progress document.
    #[error("corrupt progress document at {:?}", path.display())]
    Corrupt {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Document cannot be written to durable storage.
    #[error("failed to write progress document at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory of progress documents cannot be scanned.
    #[error("failed to scan progress documents under {:?}", path.display())]
    Scan {
        #[source]
        source: glob::PatternError,
        path: PathBuf,
    },
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Friendly result alias :3
type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn entry(date: &str, time: &str, description: &str) -> ProgressEntry {
        ProgressEntry {
            date: date.into(),
            time: time.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    #[test]
    fn append_preserves_order() {
        let document = ProgressDocument::create("mesh-router", "Networking", "Ship v1")
            .append(entry("2024-06-02", "10:00", "second day"))
            .append(entry("2024-06-01", "09:00", "first day, added late"))
            .append(entry("2024-06-02", "11:30", "second day again"));

        let descriptions: Vec<&str> =
            document.entries.iter().map(|entry| entry.description.as_str()).collect();
        assert_eq!(descriptions, ["second day", "first day, added late", "second day again"]);
    }

    #[test]
    fn save_load_round_trip() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("ab12cd34_progress.json");
        let document = ProgressDocument::create("mesh-router", "Networking", "Ship v1")
            .append(entry("2024-06-01", "09:00", "完成数据模型设计"))
            .append(ProgressEntry {
                date: "2024-06-01".into(),
                time: "14:30".into(),
                description: "wired up the packet scheduler".into(),
                notes: "saturates a 1GbE link now".into(),
                tags: ["perf".to_string()].into_iter().collect(),
            });
        document.save(&path)?;

        assert_eq!(ProgressDocument::load(&path)?, document);

        Ok(())
    }

    #[test]
    fn save_leaves_no_staging_file_behind() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("ab12cd34_progress.json");
        let document = ProgressDocument::create("mesh-router", "Networking", "Ship v1");
        document.save(&path)?;
        document.append(entry("2024-06-01", "09:00", "start")).save(&path)?;

        assert!(path.exists());
        assert!(!root.path().join("ab12cd34_progress.json.tmp").exists());
        assert_eq!(ProgressDocument::load(&path)?.entries.len(), 1);

        Ok(())
    }

    #[test]
    fn load_missing_document_is_not_found() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let result = ProgressDocument::load(root.path().join("nope_progress.json"));
        assert!(matches!(result, Err(StoreError::NotFound { .. })));

        Ok(())
    }

    #[test]
    fn load_rejects_malformed_document() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("ab12cd34_progress.json");
        fs::write(&path, "{ these are not the droids")?;

        let result = ProgressDocument::load(&path);
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));

        Ok(())
    }

    #[test]
    fn load_tolerates_missing_fields() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join("ab12cd34_progress.json");
        fs::write(
            &path,
            indoc! {r#"
                {
                  "project_name": "mesh-router"
                }
            "#},
        )?;

        let document = ProgressDocument::load(&path)?;
        assert_eq!(document.project_name, "mesh-router");
        assert_eq!(document.development_goal, "");
        assert!(document.entries.is_empty());

        Ok(())
    }

    #[test]
    fn load_all_skips_corrupt_documents() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        ProgressDocument::create("beta", "Tools", "B")
            .save(root.path().join("bb22bb22_progress.json"))?;
        ProgressDocument::create("alpha", "Tools", "A")
            .save(root.path().join("aa11aa11_progress.json"))?;
        fs::write(root.path().join("cc33cc33_progress.json"), "not json at all")?;
        fs::write(root.path().join("unrelated.json"), "{}")?;

        let projects = load_all(root.path())?;
        let ids: Vec<&str> = projects.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, ["aa11aa11", "bb22bb22"]);

        Ok(())
    }

    #[test]
    fn project_id_recovery_from_filename() {
        let id = project_id_from_filename(Path::new("/tmp/ab12cd34_progress.json"));
        assert_eq!(id.as_deref(), Some("ab12cd34"));
        assert_eq!(project_id_from_filename(Path::new("/tmp/unrelated.json")), None);
        assert_eq!(project_id_from_filename(Path::new("/tmp/_progress.json")), None);
    }
}
