// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Synchronization orchestration.
//!
//! One sync attempt walks a small state machine:
//!
//! ```text
//! Idle -> NetworkCheck -> { RemoteReady | Offline }
//! RemoteReady -> { Pushed | NoChanges | PushFailed } -> Idle
//! Offline -> Queued -> Idle
//! ```
//!
//! Offline is not a failure: the attempt lands in the durable [`SyncQueue`]
//! and gets replayed by a later drain. The local progress document is always
//! saved before any of this runs, so a failed or deferred sync never loses
//! an appended entry. Pushes go through a local mirror of the central
//! repository: copy the document in, commit, push, whole file at a time.

pub mod probe;
pub mod remote;

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::{
    config::{ConfigError, ProjectConfig},
    queue::{QueueError, SyncQueue, SyncTask},
    store::{ProgressDocument, StoreError},
    sync::{
        probe::{ConnectivityProbe, HttpProbe},
        remote::{GitRemote, RemoteError, RemoteRepository},
    },
    workspace::{self, Workspace},
};

/// Result of one push attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Changes committed and pushed to the central repository.
    Pushed,

    /// Mirror already matched the local document; nothing to push.
    NoChanges,

    /// Network unreachable; a task was queued for a later drain.
    Queued,
}

/// Synchronization coordinator.
///
/// Orchestrates the reachability probe, mirror upkeep, whole-file copy,
/// commit and push, and queue draining for one project workspace.
#[derive(Debug)]
pub struct SyncCoordinator<R = GitRemote, P = HttpProbe>
where
    R: RemoteRepository,
    P: ConnectivityProbe,
{
    workspace: Workspace,
    remote: R,
    probe: P,
}

impl SyncCoordinator {
    /// Construct coordinator with the libgit2 remote and HTTP probe.
    pub fn new(workspace: Workspace) -> Self {
        Self::with_collaborators(workspace, GitRemote::new(), HttpProbe::new())
    }
}

impl<R, P> SyncCoordinator<R, P>
where
    R: RemoteRepository,
    P: ConnectivityProbe,
{
    /// Construct coordinator over explicit collaborators.
    pub fn with_collaborators(workspace: Workspace, remote: R, probe: P) -> Self {
        Self { workspace, remote, probe }
    }

    /// Push the project's progress document to the central repository.
    ///
    /// When the network is unreachable the attempt is queued instead;
    /// `force` skips the probe and goes straight to the remote. On success,
    /// including the no-op case, `last_sync` is refreshed and the
    /// configuration persisted.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::RemoteUnavailable`] if mirror setup or remote
    ///   interaction fails despite a reachable network. The queue is left
    ///   untouched.
    /// - Return [`SyncError::PushConflict`] if the central repository
    ///   advanced concurrently. Resolve with `pull`, then sync again.
    /// - Return [`SyncError::Queue`] if the offline queue cannot be
    ///   written.
    #[instrument(skip(self, config), level = "debug")]
    pub fn sync_to_central(&self, config: &mut ProjectConfig, force: bool) -> Result<SyncOutcome> {
        if !force && !self.probe.is_reachable(&config.remote_url) {
            info!("network unreachable, queueing sync for later");
            let mut queue = SyncQueue::load(self.workspace.queue_path())?;
            queue.enqueue(SyncTask::new(
                &config.project_id,
                &config.project_name,
                workspace::progress_filename(&config.project_id),
            ))?;

            return Ok(SyncOutcome::Queued);
        }

        self.remote
            .ensure_local_mirror(&config.remote_url, &self.workspace.mirror_path())
            .map_err(SyncError::RemoteUnavailable)?;

        let outcome = self.push_file(
            &config.project_id,
            &config.project_name,
            &workspace::progress_filename(&config.project_id),
        )?;
        config.touch_last_sync();
        config.save(&self.workspace)?;

        Ok(outcome)
    }

    /// Replay queued sync tasks.
    ///
    /// The mirror is brought up once for the whole pass; a setup failure
    /// aborts before any task is consumed. Each task then runs the full
    /// copy, commit, and push sequence and leaves the queue on success. A
    /// task whose local document is missing or corrupt stays queued and the
    /// pass moves on; remote failures abort the pass with already-consumed
    /// tasks staying consumed.
    ///
    /// Returns the number of tasks replayed.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::StillOffline`] if the network is unreachable;
    ///   every task stays queued.
    /// - Return [`SyncError::RemoteUnavailable`] if mirror setup or remote
    ///   interaction fails.
    /// - Return [`SyncError::PushConflict`] if the central repository
    ///   advanced mid-pass.
    #[instrument(skip(self, config), level = "debug")]
    pub fn drain_queue(&self, config: &mut ProjectConfig) -> Result<usize> {
        let mut queue = SyncQueue::load(self.workspace.queue_path())?;
        if queue.is_empty() {
            info!("sync queue empty, nothing to drain");
            return Ok(0);
        }

        if !self.probe.is_reachable(&config.remote_url) {
            return Err(SyncError::StillOffline);
        }

        // INVARIANT: One mirror setup per pass. Remote state is shared by
        // every task in the drain.
        self.remote
            .ensure_local_mirror(&config.remote_url, &self.workspace.mirror_path())
            .map_err(SyncError::RemoteUnavailable)?;

        let replayed = queue.drain(|task| {
            match self.push_file(&task.project_id, &task.project_name, &task.progress_filename) {
                Ok(_) => Ok(true),
                // A task whose document is unreadable stays queued; the rest
                // of the pass still runs.
                Err(SyncError::Store(err)) => {
                    warn!("keeping sync task for {} queued: {err}", task.project_name);
                    Ok(false)
                }
                Err(err) => Err(err),
            }
        })?;

        if replayed > 0 {
            config.touch_last_sync();
            config.save(&self.workspace)?;
        }
        info!("replayed {replayed} queued sync task(s)");

        Ok(replayed)
    }

    /// Overwrite the local progress document with the central copy.
    ///
    /// Whole-file replacement, never a field-by-field merge. The central
    /// copy is validated before it clobbers anything local.
    ///
    /// # Errors
    ///
    /// - Return [`SyncError::StillOffline`] if the network is unreachable.
    /// - Return [`SyncError::RemoteUnavailable`] if mirror setup fails.
    /// - Return [`SyncError::CentralCopyMissing`] if the central repository
    ///   holds no document for this project yet.
    /// - Return [`SyncError::Store`] if the central copy is corrupt or the
    ///   local overwrite fails.
    #[instrument(skip(self, config), level = "debug")]
    pub fn pull_from_central(&self, config: &ProjectConfig) -> Result<()> {
        if !self.probe.is_reachable(&config.remote_url) {
            return Err(SyncError::StillOffline);
        }

        self.remote
            .ensure_local_mirror(&config.remote_url, &self.workspace.mirror_path())
            .map_err(SyncError::RemoteUnavailable)?;

        let central = self.workspace.mirror_progress_path(&config.project_id);
        if !central.exists() {
            return Err(SyncError::CentralCopyMissing { project_id: config.project_id.clone() });
        }

        // Route the overwrite through the store so it stays atomic and a
        // corrupt central copy never clobbers local state.
        let document = ProgressDocument::load(&central)?;
        document.save(self.workspace.progress_path(&config.project_id))?;
        info!("pulled central copy of {}", config.project_name);

        Ok(())
    }

    fn push_file(
        &self,
        project_id: &str,
        project_name: &str,
        filename: &str,
    ) -> Result<SyncOutcome> {
        let mirror = self.workspace.mirror_path();
        let local = self.workspace.root().join(filename);
        // A corrupt local document must never reach the central repository.
        ProgressDocument::load(&local)?;

        let rel_path = Path::new(workspace::PROJECTS_DIR).join(filename);
        self.remote
            .copy_file_in(&local, &mirror, &rel_path)
            .map_err(SyncError::RemoteUnavailable)?;

        if !self.remote.has_pending_changes(&mirror).map_err(SyncError::RemoteUnavailable)? {
            info!("mirror already current, nothing to push");
            return Ok(SyncOutcome::NoChanges);
        }

        let message = format!("Update progress for {project_name} ({project_id})");
        self.remote.commit(&mirror, &message).map_err(SyncError::RemoteUnavailable)?;
        match self.remote.push(&mirror) {
            Ok(()) => {
                info!("pushed progress for {project_name}");
                Ok(SyncOutcome::Pushed)
            }
            Err(RemoteError::PushConflict { status }) => Err(SyncError::PushConflict { status }),
            Err(err) => Err(SyncError::RemoteUnavailable(err)),
        }
    }
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Mirror setup or remote interaction failed despite a reachable
    /// network.
    #[error("central repository unavailable")]
    RemoteUnavailable(#[source] RemoteError),

    /// Central repository advanced concurrently. Never auto-retried.
    #[error("push rejected by central repository ({status}), pull and sync again")]
    PushConflict {
        /// Status message reported by the remote.
        status: String,
    },

    /// Queue drain or pull attempted while the network is unreachable.
    #[error("network unreachable, queued tasks were kept")]
    StillOffline,

    /// Central repository holds no document for this project yet.
    #[error("central repository has no progress document for project {project_id}")]
    CentralCopyMissing { project_id: String },

    /// Offline queue manipulation failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Local document access failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration update failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Friendly result alias :3
type Result<T, E = SyncError> = std::result::Result<T, E>;
