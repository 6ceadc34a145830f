// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Central repository access.
//!
//! The coordinator never talks to version control directly. It goes through
//! the [`RemoteRepository`] trait, which keeps the sync pipeline testable
//! against a plain-directory double and keeps libgit2 details in one place.
//! [`GitRemote`] is the real implementation: it maintains a working clone of
//! the central repository under the workspace and maps libgit2 outcomes onto
//! the trait contract.

use std::{
    fs,
    path::{Path, PathBuf},
    time,
};

use auth_git2::GitAuthenticator;
use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    Config, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository, ResetType,
    Signature, StatusOptions,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, instrument, warn};

/// Layer of indirection for central repository access.
///
/// Every method takes the mirror location explicitly; implementations hold
/// no per-project state.
pub trait RemoteRepository {
    /// Make sure a local mirror of the central repository exists and is
    /// current: clone when absent, fetch and fast-forward when present.
    fn ensure_local_mirror(&self, url: &str, mirror_path: &Path) -> Result<()>;

    /// Overwrite the mirror's copy of a file with local bytes, creating
    /// parent directories as needed.
    fn copy_file_in(&self, local_file: &Path, mirror_path: &Path, rel_path: &Path) -> Result<()>;

    /// Check whether the mirror differs from its last committed state.
    fn has_pending_changes(&self, mirror_path: &Path) -> Result<bool>;

    /// Stage everything and commit with target message.
    fn commit(&self, mirror_path: &Path, message: &str) -> Result<()>;

    /// Push the mirror's current branch to the central repository.
    fn push(&self, mirror_path: &Path) -> Result<()>;

    /// Bring the mirror up to date with the central repository.
    fn pull(&self, mirror_path: &Path) -> Result<()>;
}

/// Central repository access through libgit2.
#[derive(Debug, Default)]
pub struct GitRemote;

impl GitRemote {
    /// Construct new libgit2-backed remote.
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self, url, mirror_path), level = "debug")]
    fn clone_mirror(&self, url: &str, mirror_path: &Path) -> Result<()> {
        info!("clone central repository {url}");
        let bar = ProgressBar::no_length();
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(url.to_string());
        bar.enable_steady_tick(time::Duration::from_millis(100));

        let authenticator = GitAuthenticator::default();
        let config = Config::open_default()?;

        let mut throttle = time::Instant::now();
        let mut remote_callbacks = RemoteCallbacks::new();
        remote_callbacks.credentials(authenticator.credentials(&config));
        remote_callbacks.transfer_progress(|progress| {
            let stats = progress.to_owned();
            let bar_size = stats.total_objects() as u64;
            let bar_pos = stats.received_objects() as u64;
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                bar.set_length(bar_size);
                bar.set_position(bar_pos);
            }

            true
        });

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks);
        RepoBuilder::new().fetch_options(fetch_options).clone(url, mirror_path)?;
        bar.finish_and_clear();

        Ok(())
    }
}

impl RemoteRepository for GitRemote {
    /// Make sure a local mirror of the central repository exists and is
    /// current.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Git2`] if the clone, fetch, or fast-forward
    ///   fails, i.e., the central repository cannot be reached or refuses
    ///   the offered credentials.
    #[instrument(skip(self, url, mirror_path), level = "debug")]
    fn ensure_local_mirror(&self, url: &str, mirror_path: &Path) -> Result<()> {
        if mirror_path.join(".git").exists() {
            debug!("update existing mirror at {:?}", mirror_path.display());
            self.pull(mirror_path)
        } else {
            self.clone_mirror(url, mirror_path)
        }
    }

    /// Overwrite the mirror's copy of a file with local bytes.
    ///
    /// Whole-file replacement. The central copy is never merged field by
    /// field.
    fn copy_file_in(&self, local_file: &Path, mirror_path: &Path, rel_path: &Path) -> Result<()> {
        let target = mirror_path.join(rel_path);
        if let Some(parent) = target.parent() {
            mkdirp::mkdirp(parent)
                .map_err(|err| RemoteError::CopyIn { source: err, target: target.clone() })?;
        }

        fs::copy(local_file, &target)
            .map_err(|err| RemoteError::CopyIn { source: err, target: target.clone() })?;
        debug!("copied {:?} into mirror", local_file.display());

        Ok(())
    }

    /// Check whether the mirror differs from its last committed state.
    ///
    /// Untracked files count as pending; a first-ever document copy must
    /// register as a change.
    fn has_pending_changes(&self, mirror_path: &Path) -> Result<bool> {
        let repository = Repository::open(mirror_path)?;
        let mut options = StatusOptions::new();
        options.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = repository.statuses(Some(&mut options))?;

        Ok(!statuses.is_empty())
    }

    /// Stage everything and commit with target message.
    #[instrument(skip(self, mirror_path, message), level = "debug")]
    fn commit(&self, mirror_path: &Path, message: &str) -> Result<()> {
        let repository = Repository::open(mirror_path)?;

        let mut index = repository.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.write()?;

        // INVARIANT: Always use the tree produced by the index after
        // staging.
        let tree_oid = index.write_tree()?;
        let tree = repository.find_tree(tree_oid)?;

        // INVARIANT: Always determine latest parent commit to append to.
        let mut parents = Vec::new();
        if let Some(oid) = repository.head().ok().and_then(|head| head.target()) {
            parents.push(repository.find_commit(oid)?);
        }
        let parents = parents.iter().collect::<Vec<_>>();

        let signature = signature(&repository)?;
        repository.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!("committed mirror changes: {message}");

        Ok(())
    }

    /// Push the mirror's current branch to the central repository.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::PushConflict`] if the central repository
    ///   rejected the update, i.e., it advanced concurrently.
    /// - Return [`RemoteError::Git2`] for any other libgit2 failure.
    #[instrument(skip(self, mirror_path), level = "debug")]
    fn push(&self, mirror_path: &Path) -> Result<()> {
        let repository = Repository::open(mirror_path)?;
        let head = repository.head()?;
        let Some(branch) = head.name().map(ToOwned::to_owned) else {
            return Err(RemoteError::DetachedMirror { mirror_path: mirror_path.to_path_buf() });
        };

        let mut remote = repository.find_remote("origin")?;
        let authenticator = GitAuthenticator::default();
        let config = Config::open_default()?;

        let mut rejection: Option<String> = None;
        let outcome = {
            let mut remote_callbacks = RemoteCallbacks::new();
            remote_callbacks.credentials(authenticator.credentials(&config));
            remote_callbacks.push_update_reference(|_reference, status| {
                if let Some(message) = status {
                    rejection = Some(message.to_string());
                }

                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(remote_callbacks);
            let refspec = format!("{branch}:{branch}");
            remote.push(&[refspec.as_str()], Some(&mut push_options))
        };

        if let Some(status) = rejection {
            return Err(RemoteError::PushConflict { status });
        }

        match outcome {
            Ok(()) => {
                info!("pushed mirror to central repository");
                Ok(())
            }
            Err(err)
                if err.code() == git2::ErrorCode::NotFastForward
                    || err.message().contains("fastforward")
                    || err.message().contains("fast-forward") =>
            {
                Err(RemoteError::PushConflict { status: err.message().to_owned() })
            }
            Err(err) => Err(RemoteError::Git2(err)),
        }
    }

    /// Bring the mirror up to date with the central repository.
    ///
    /// Fetches the configured refspecs and fast-forwards the checked-out
    /// branch. A mirror that diverged from the central history gets hard
    /// reset to the fetched head: the mirror is a scratch checkout, and the
    /// next copy-in reapplies the local document on top.
    #[instrument(skip(self, mirror_path), level = "debug")]
    fn pull(&self, mirror_path: &Path) -> Result<()> {
        let repository = Repository::open(mirror_path)?;
        let mut remote = repository.find_remote("origin")?;

        let authenticator = GitAuthenticator::default();
        let config = Config::open_default()?;
        let mut remote_callbacks = RemoteCallbacks::new();
        remote_callbacks.credentials(authenticator.credentials(&config));
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks);
        remote.fetch(&[] as &[&str], Some(&mut fetch_options), None)?;

        let fetch_head = match repository.find_reference("FETCH_HEAD") {
            Ok(reference) => reference,
            // INVARIANT: Fresh central repository with no history to merge
            // yet.
            Err(_) => return Ok(()),
        };
        let fetch_commit = repository.reference_to_annotated_commit(&fetch_head)?;
        let (analysis, _) = repository.merge_analysis(&[&fetch_commit])?;

        if analysis.is_up_to_date() {
            debug!("mirror already up to date");
            return Ok(());
        }

        let head = repository.find_reference("HEAD")?;
        let Some(branch) = head.symbolic_target().map(ToOwned::to_owned) else {
            return Err(RemoteError::DetachedMirror { mirror_path: mirror_path.to_path_buf() });
        };

        if analysis.is_fast_forward() || analysis.is_unborn() {
            repository.reference(&branch, fetch_commit.id(), true, "fast-forward")?;
            repository.set_head(&branch)?;
            let mut checkout = CheckoutBuilder::new();
            checkout.force();
            repository.checkout_head(Some(&mut checkout))?;
            info!("fast-forwarded mirror to {}", fetch_commit.id());

            return Ok(());
        }

        warn!("mirror diverged from central history, resetting to fetched head");
        let target = repository.find_commit(fetch_commit.id())?;
        repository.reset(target.as_object(), ResetType::Hard, None)?;

        Ok(())
    }
}

fn signature(repository: &Repository) -> Result<Signature<'static>> {
    match repository.signature() {
        Ok(signature) => Ok(signature),
        // No user.name/user.email configured. Commit under a tool identity
        // instead of refusing to sync.
        Err(_) => Ok(Signature::now("worklog", "worklog@localhost")?),
    }
}

/// Central repository error types.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Central repository rejected a push, i.e., it advanced concurrently.
    #[error("push rejected by central repository: {status}")]
    PushConflict {
        /// Status message reported by the remote.
        status: String,
    },

    /// Mirror HEAD is not on a branch.
    #[error("mirror at {:?} has a detached HEAD", mirror_path.display())]
    DetachedMirror { mirror_path: PathBuf },

    /// File cannot be copied into the mirror.
    #[error("failed to copy file into mirror at {:?}", target.display())]
    CopyIn {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
