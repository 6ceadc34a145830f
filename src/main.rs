// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use std::{path::PathBuf, process::exit};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use worklog::{
    config::{ProjectConfig, SyncMode, DEFAULT_REMOTE_URL},
    site::SiteBuilder,
    store::{self, ProgressDocument, ProgressEntry},
    sync::{SyncCoordinator, SyncOutcome},
    workspace::{self, Workspace},
};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "worklog [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Init(options) => run_init(options),
            Command::Add(options) => run_add(options),
            Command::Show => run_show(),
            Command::Sync(options) => run_sync(options),
            Command::Pull => run_pull(),
            Command::Queue => run_queue(),
            Command::Pages(options) => run_pages(options),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Initialize progress tracking in the current directory.
    #[command(
        override_usage = "worklog init [options] <project_name> <parent_project> <development_goal>"
    )]
    Init(InitOptions),

    /// Append a progress entry to the project's document.
    #[command(override_usage = "worklog add [options] <description> [notes]")]
    Add(AddOptions),

    /// Show the project's progress record, newest entries first.
    #[command(override_usage = "worklog show")]
    Show,

    /// Push the progress document to the central repository.
    #[command(override_usage = "worklog sync [options]")]
    Sync(SyncOptions),

    /// Overwrite the local progress document with the central copy.
    #[command(override_usage = "worklog pull")]
    Pull,

    /// Replay sync tasks queued while offline.
    #[command(override_usage = "worklog queue")]
    Queue,

    /// Build the static progress site.
    #[command(override_usage = "worklog pages [options]")]
    Pages(PagesOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Human-readable project name.
    #[arg(value_name = "project_name")]
    pub project_name: String,

    /// Category label grouping related projects.
    #[arg(value_name = "parent_project")]
    pub parent_project: String,

    /// One-line statement of what the project is trying to achieve.
    #[arg(value_name = "development_goal")]
    pub development_goal: String,

    /// Central repository to publish progress documents to.
    #[arg(short, long, value_name = "url")]
    pub remote: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// What was done.
    #[arg(value_name = "description")]
    pub description: String,

    /// Free-form elaboration.
    #[arg(value_name = "notes")]
    pub notes: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Skip the reachability probe and contact the remote directly.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PagesOptions {
    /// Output directory for the generated site.
    #[arg(short, long, value_name = "dir")]
    pub out: Option<PathBuf>,
}

fn run_init(options: InitOptions) -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    if workspace.config_path().exists() {
        bail!("project already initialized in {:?}", workspace.root().display());
    }

    let remote = options.remote.unwrap_or_else(|| DEFAULT_REMOTE_URL.to_string());
    let config = ProjectConfig::new(
        options.project_name,
        options.parent_project,
        options.development_goal,
        remote,
    );
    config.save(&workspace)?;

    let document = ProgressDocument::create(
        &config.project_name,
        &config.parent_project,
        &config.development_goal,
    );
    document.save(workspace.progress_path(&config.project_id))?;

    println!("Initialized project {} ({})", config.project_name, config.project_id);
    println!("Progress document: {}", workspace::progress_filename(&config.project_id));

    Ok(())
}

fn run_add(options: AddOptions) -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let mut config = ProjectConfig::load(&workspace)?;

    let description = options.description.trim().to_string();
    if description.is_empty() {
        bail!("progress description cannot be empty");
    }

    let path = workspace.progress_path(&config.project_id);
    let entry = ProgressEntry::now(description, options.notes.unwrap_or_default());
    println!("Added entry {} {}: {}", entry.date, entry.time, entry.description);
    ProgressDocument::load(&path)?.append(entry).save(&path)?;

    // INVARIANT: The append is durable before any sync attempt. A failed
    // push never rolls back local state, so sync trouble downgrades to a
    // warning here and can be replayed with `worklog sync` later.
    if config.sync_mode == SyncMode::Realtime {
        let coordinator = SyncCoordinator::new(workspace);
        match coordinator.sync_to_central(&mut config, false) {
            Ok(outcome) => report_outcome(&outcome),
            Err(error) => warn!("sync after add failed: {error}"),
        }
    }

    Ok(())
}

fn run_show() -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let config = ProjectConfig::load(&workspace)?;
    let document = ProgressDocument::load(workspace.progress_path(&config.project_id))?;

    println!("Project: {} ({})", document.project_name, config.project_id);
    println!("Parent: {}", document.parent_project);
    println!("Goal: {}", document.development_goal);
    println!("Created: {}", document.created_date);
    println!("Sync: {} mode, last synced {}", config.sync_mode, config.last_sync);
    println!();
    println!("{} entries:", document.entries.len());
    for entry in document.entries.iter().rev() {
        println!("  {} {}  {}", entry.date, entry.time, entry.description);
        if !entry.notes.is_empty() {
            println!("            {}", entry.notes);
        }
    }

    Ok(())
}

fn run_sync(options: SyncOptions) -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let mut config = ProjectConfig::load(&workspace)?;
    let coordinator = SyncCoordinator::new(workspace);
    let outcome = coordinator.sync_to_central(&mut config, options.force)?;
    report_outcome(&outcome);

    Ok(())
}

fn run_pull() -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let config = ProjectConfig::load(&workspace)?;
    let coordinator = SyncCoordinator::new(workspace);
    coordinator.pull_from_central(&config)?;
    println!("Pulled central copy of {}.", config.project_name);

    Ok(())
}

fn run_queue() -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let mut config = ProjectConfig::load(&workspace)?;
    let coordinator = SyncCoordinator::new(workspace);
    let replayed = coordinator.drain_queue(&mut config)?;
    if replayed == 0 {
        println!("No queued sync tasks to replay.");
    } else {
        println!("Replayed {replayed} queued sync task(s).");
    }

    Ok(())
}

fn run_pages(options: PagesOptions) -> Result<()> {
    let workspace = Workspace::from_current_dir()?;
    let out_dir = options.out.unwrap_or_else(|| workspace.pages_path());

    // Prefer the mirror's cross-project collection; fall back to this
    // project's own document when no mirror exists yet.
    let source = if workspace.mirror_projects_path().exists() {
        workspace.mirror_projects_path()
    } else {
        workspace.root().to_path_buf()
    };

    let projects = store::load_all(source)?;
    SiteBuilder::new(&out_dir)?.build(&projects)?;
    println!("Site written to {} ({} projects).", out_dir.display(), projects.len());

    Ok(())
}

fn report_outcome(outcome: &SyncOutcome) {
    match outcome {
        SyncOutcome::Pushed => println!("Synced to central repository."),
        SyncOutcome::NoChanges => println!("Central repository already up to date."),
        SyncOutcome::Queued => println!("Network unreachable, sync queued for later."),
    }
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn main() {
    let layer = fmt::layer().compact().with_target(false).without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry().with(layer).with(filter).init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}
