// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! # Worklog
//!
//! Worklog is a personal project-progress tracker. Each project working
//! directory owns a small JSON progress document; entries append locally
//! first, then get published to a central Git repository, with durable
//! offline queueing when the network is down. Across projects, entries
//! aggregate into day, week, and month views rendered as a static HTML
//! site.
//!
//! Everything operates through one explicit [`Workspace`] handle resolving
//! the paths of a single project directory:
//!
//! - [`config`]: the per-project configuration document.
//! - [`store`]: progress document load, append, and atomic save.
//! - [`queue`]: the durable offline sync queue.
//! - [`sync`]: the coordinator plus the central repository boundary.
//! - [`view`]: temporal bucketing of entries.
//! - [`site`]: static page rendering.

pub mod config;
pub mod queue;
pub mod site;
pub mod store;
pub mod sync;
pub mod view;
pub mod workspace;

pub use crate::{
    config::{ProjectConfig, SyncMode},
    queue::{SyncQueue, SyncTask},
    store::{ProgressDocument, ProgressEntry, StoredProject},
    sync::{SyncCoordinator, SyncOutcome},
    workspace::Workspace,
};
