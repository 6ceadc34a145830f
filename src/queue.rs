// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Durable synchronization queue.
//!
//! When the central repository is unreachable, push attempts are deferred
//! into a small FIFO persisted at `.sync_queue.json`. Tasks are append and
//! remove only; a queued task is never edited in place. A task leaves the
//! queue exactly when its processor confirms success, and removals hit disk
//! as they happen, so an aborted pass never resurrects an already-pushed
//! task.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One deferred push.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SyncTask {
    /// Identifier of the project to push.
    pub project_id: String,

    /// Name of the project to push, for reporting.
    pub project_name: String,

    /// Instant the task entered the queue.
    pub enqueued_at: DateTime<Utc>,

    /// File name of the progress document to push.
    pub progress_filename: String,
}

impl SyncTask {
    /// Construct task for target project, stamped now.
    pub fn new(
        project_id: impl Into<String>,
        project_name: impl Into<String>,
        progress_filename: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            project_name: project_name.into(),
            enqueued_at: Utc::now(),
            progress_filename: progress_filename.into(),
        }
    }
}

/// Durable FIFO of pending synchronization tasks.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SyncQueue {
    queue_path: PathBuf,
    tasks: Vec<SyncTask>,
}

impl SyncQueue {
    /// Load queue from target path.
    ///
    /// A missing queue file is an empty queue, not an error.
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Read`] if the queue file cannot be read.
    /// - Return [`QueueError::Corrupt`] if the content is not a well-formed
    ///   task list.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let queue_path = path.into();
        let tasks = match fs::read_to_string(&queue_path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|err| QueueError::Corrupt { source: err, queue_path: queue_path.clone() })?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(QueueError::Read { source: err, queue_path }),
        };
        debug!("loaded sync queue with {} task(s)", tasks.len());

        Ok(Self { queue_path, tasks })
    }

    /// Append task and persist immediately.
    ///
    /// # Errors
    ///
    /// - Return [`QueueError::Write`] if the queue file cannot be written,
    ///   in which case the in-memory task is rolled back as well.
    pub fn enqueue(&mut self, task: SyncTask) -> Result<()> {
        self.tasks.push(task);
        if let Err(err) = self.persist() {
            self.tasks.pop();
            return Err(err);
        }
        info!("queued sync task ({} pending)", self.tasks.len());

        Ok(())
    }

    /// Process tasks in enqueue order.
    ///
    /// A task is removed exactly when `process` answers `Ok(true)`;
    /// `Ok(false)` keeps the task queued and moves on. The first `Err`
    /// aborts the pass. Removals are persisted as they happen, so tasks
    /// consumed before an abort never reappear.
    ///
    /// Returns the number of tasks removed.
    ///
    /// # Errors
    ///
    /// - Return whatever `process` raised, unchanged.
    /// - Return [`QueueError::Write`] if the queue file cannot be rewritten
    ///   after a removal.
    pub fn drain<E, F>(&mut self, mut process: F) -> Result<usize, E>
    where
        E: From<QueueError>,
        F: FnMut(&SyncTask) -> Result<bool, E>,
    {
        let mut removed = 0;
        let mut index = 0;
        while index < self.tasks.len() {
            if process(&self.tasks[index])? {
                self.tasks.remove(index);
                self.persist()?;
                removed += 1;
            } else {
                index += 1;
            }
        }

        Ok(removed)
    }

    /// Tasks currently queued, oldest first.
    pub fn tasks(&self) -> &[SyncTask] {
        &self.tasks
    }

    /// Number of tasks currently queued.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check whether no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Path the queue persists itself to.
    pub fn path(&self) -> &Path {
        &self.queue_path
    }

    fn persist(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&self.tasks).map_err(|err| QueueError::Write {
            source: std::io::Error::other(err),
            queue_path: self.queue_path.clone(),
        })?;

        fs::write(&self.queue_path, data)
            .map_err(|err| QueueError::Write { source: err, queue_path: self.queue_path.clone() })
    }
}

/// Sync queue error types.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Queue file cannot be read.
    #[error("failed to read sync queue at {:?}", queue_path.display())]
    Read {
        #[source]
        source: std::io::Error,
        queue_path: PathBuf,
    },

    /// Queue file content is not a well-formed task list.
    #[error("corrupt sync queue at {:?}", queue_path.display())]
    Corrupt {
        #[source]
        source: serde_json::Error,
        queue_path: PathBuf,
    },

    /// Queue file cannot be written.
    #[error("failed to write sync queue at {:?}", queue_path.display())]
    Write {
        #[source]
        source: std::io::Error,
        queue_path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = QueueError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use pretty_assertions::assert_eq;

    fn task(project_id: &str) -> SyncTask {
        SyncTask::new(project_id, format!("{project_id} project"), format!("{project_id}_progress.json"))
    }

    #[test]
    fn missing_queue_file_is_empty_queue() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let queue = SyncQueue::load(root.path().join(".sync_queue.json"))?;
        assert!(queue.is_empty());

        Ok(())
    }

    #[test]
    fn enqueue_persists_immediately() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(".sync_queue.json");

        let mut queue = SyncQueue::load(&path)?;
        queue.enqueue(task("ab12cd34"))?;
        drop(queue);

        let reloaded = SyncQueue::load(&path)?;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.tasks()[0].project_id, "ab12cd34");
        assert_eq!(reloaded.tasks()[0].progress_filename, "ab12cd34_progress.json");

        Ok(())
    }

    #[test]
    fn drain_removes_only_confirmed_tasks() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(".sync_queue.json");

        let mut queue = SyncQueue::load(&path)?;
        queue.enqueue(task("aaaa1111"))?;
        queue.enqueue(task("bbbb2222"))?;
        queue.enqueue(task("cccc3333"))?;

        let removed = queue.drain::<QueueError, _>(|task| Ok(task.project_id != "bbbb2222"))?;
        assert_eq!(removed, 2);

        let survivors: Vec<&str> =
            queue.tasks().iter().map(|task| task.project_id.as_str()).collect();
        assert_eq!(survivors, ["bbbb2222"]);

        let reloaded = SyncQueue::load(&path)?;
        assert_eq!(reloaded.tasks(), queue.tasks());

        Ok(())
    }

    #[test]
    fn drain_preserves_order_of_kept_tasks() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let mut queue = SyncQueue::load(root.path().join(".sync_queue.json"))?;
        for id in ["aaaa1111", "bbbb2222", "cccc3333", "dddd4444"] {
            queue.enqueue(task(id))?;
        }

        queue.drain::<QueueError, _>(|task| {
            Ok(task.project_id.starts_with('a') || task.project_id.starts_with('c'))
        })?;

        let survivors: Vec<&str> =
            queue.tasks().iter().map(|task| task.project_id.as_str()).collect();
        assert_eq!(survivors, ["bbbb2222", "dddd4444"]);

        Ok(())
    }

    #[test]
    fn drain_abort_keeps_earlier_removals() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(".sync_queue.json");

        let mut queue = SyncQueue::load(&path)?;
        queue.enqueue(task("aaaa1111"))?;
        queue.enqueue(task("bbbb2222"))?;
        queue.enqueue(task("cccc3333"))?;

        let result = queue.drain::<anyhow::Error, _>(|task| match task.project_id.as_str() {
            "bbbb2222" => Err(anyhow!("remote went away")),
            _ => Ok(true),
        });
        assert!(result.is_err());

        let reloaded = SyncQueue::load(&path)?;
        let survivors: Vec<&str> =
            reloaded.tasks().iter().map(|task| task.project_id.as_str()).collect();
        assert_eq!(survivors, ["bbbb2222", "cccc3333"]);

        Ok(())
    }

    #[test]
    fn corrupt_queue_file_is_an_error() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let path = root.path().join(".sync_queue.json");
        fs::write(&path, "[ not a task list")?;

        let result = SyncQueue::load(&path);
        assert!(matches!(result, Err(QueueError::Corrupt { .. })));

        Ok(())
    }
}
