// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Static site generation.
//!
//! Renders the aggregated views into a handful of static HTML pages plus a
//! stylesheet: a dashboard, one detail page per project, and timeline,
//! daily, weekly, and monthly views. Output is inert files only; no
//! scripts, no server. Every page is rebuilt from scratch on each run, so
//! the output directory is always internally consistent.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Datelike, Local};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    store::StoredProject,
    view::{self, MonthView, TimelineEntry, WeekView},
};

/// Render the whole progress site into one output directory.
pub struct SiteBuilder {
    registry: Handlebars<'static>,
    out_dir: PathBuf,
}

impl SiteBuilder {
    /// Construct builder writing into target directory.
    ///
    /// # Errors
    ///
    /// - Return [`SiteError::Template`] if a page template fails to parse,
    ///   which is a bug rather than an input problem.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_template_string("header", HEADER_TEMPLATE)?;
        registry.register_template_string("footer", FOOTER_TEMPLATE)?;
        registry.register_template_string("entry_list", ENTRY_LIST_TEMPLATE)?;
        registry.register_template_string("index", INDEX_TEMPLATE)?;
        registry.register_template_string("project", PROJECT_TEMPLATE)?;
        registry.register_template_string("timeline", TIMELINE_TEMPLATE)?;
        registry.register_template_string("daily", DAILY_TEMPLATE)?;
        registry.register_template_string("weekly", WEEKLY_TEMPLATE)?;
        registry.register_template_string("monthly", MONTHLY_TEMPLATE)?;

        Ok(Self { registry, out_dir: out_dir.into() })
    }

    /// Build every page from loaded projects.
    ///
    /// # Errors
    ///
    /// - Return [`SiteError::OutputDirectory`] if the output directory
    ///   cannot be created.
    /// - Return [`SiteError::Render`] if a context fails to render.
    /// - Return [`SiteError::Write`] if a page cannot be written.
    #[instrument(skip(self, projects), level = "debug")]
    pub fn build(&self, projects: &[StoredProject]) -> Result<()> {
        mkdirp::mkdirp(self.out_dir.join("projects")).map_err(|err| {
            SiteError::OutputDirectory { source: err, path: self.out_dir.clone() }
        })?;

        let entries = view::collect_entries(projects);
        let today = Local::now().date_naive();
        let cards: Vec<ProjectCard> = projects.iter().map(ProjectCard::new).collect();

        let mut categories: Vec<&str> =
            cards.iter().map(|card| card.parent_project.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();

        self.write_page(
            "index.html",
            "index",
            &Page::new(
                "Dashboard",
                "",
                IndexBody {
                    project_count: cards.len(),
                    entry_count: entries.len(),
                    category_count: categories.len(),
                    projects: &cards,
                },
            ),
        )?;

        for (project, card) in projects.iter().zip(&cards) {
            let mut recent = view::collect_entries(std::slice::from_ref(project));
            recent.reverse();
            self.write_page(
                format!("projects/{}.html", project.project_id),
                "project",
                &Page::new(
                    card.project_name.clone(),
                    "../",
                    ProjectBody { project: card, entries: recent },
                ),
            )?;
        }

        self.write_page(
            "timeline.html",
            "timeline",
            &Page::new("Timeline", "", TimelineBody { entries: view::timeline_all(&entries) }),
        )?;

        let focus = view::default_focus_date(&entries, today);
        let day_entries = view::by_day(&entries).remove(&focus).unwrap_or_default();
        self.write_page(
            "daily.html",
            "daily",
            &Page::new("Daily", "", DailyBody { date: focus, entries: day_entries }),
        )?;

        self.write_page(
            "weekly.html",
            "weekly",
            &Page::new("Weekly", "", WeeklyBody { week: view::by_week(&entries, today) }),
        )?;

        let month = view::by_month(&entries, today.year(), today.month());
        self.write_page(
            "monthly.html",
            "monthly",
            &Page::new(
                "Monthly",
                "",
                MonthlyBody { label: format!("{:04}-{:02}", month.year, month.month), month },
            ),
        )?;

        let css_path = self.out_dir.join("style.css");
        fs::write(&css_path, STYLESHEET)
            .map_err(|err| SiteError::Write { source: err, path: css_path })?;

        info!("site written to {:?}", self.out_dir.display());

        Ok(())
    }

    fn write_page(
        &self,
        file: impl AsRef<Path>,
        template: &str,
        context: &impl Serialize,
    ) -> Result<()> {
        let html = self.registry.render(template, context)?;
        let target = self.out_dir.join(file.as_ref());
        fs::write(&target, html).map_err(|err| SiteError::Write { source: err, path: target })
    }
}

/// Shared envelope every page renders through: navigation metadata around a
/// page-specific body.
#[derive(Debug, Serialize)]
struct Page<T: Serialize> {
    title: String,
    root: &'static str,
    generated: String,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Page<T> {
    fn new(title: impl Into<String>, root: &'static str, body: T) -> Self {
        Self {
            title: title.into(),
            root,
            generated: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            body,
        }
    }
}

/// Dashboard card for one project.
#[derive(Debug, Serialize)]
struct ProjectCard {
    project_id: String,
    project_name: String,
    parent_project: String,
    development_goal: String,
    created_date: String,
    last_updated: String,
    entry_count: usize,
}

impl ProjectCard {
    fn new(project: &StoredProject) -> Self {
        Self {
            project_id: project.project_id.clone(),
            project_name: project.document.project_name.clone(),
            parent_project: project.document.parent_project.clone(),
            development_goal: project.document.development_goal.clone(),
            created_date: project.document.created_date.format("%Y-%m-%d").to_string(),
            last_updated: project.document.last_updated.format("%Y-%m-%d %H:%M").to_string(),
            entry_count: project.document.entries.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct IndexBody<'a> {
    project_count: usize,
    entry_count: usize,
    category_count: usize,
    projects: &'a [ProjectCard],
}

#[derive(Debug, Serialize)]
struct ProjectBody<'a> {
    project: &'a ProjectCard,
    entries: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
struct TimelineBody {
    entries: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
struct DailyBody {
    date: String,
    entries: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
struct WeeklyBody {
    week: WeekView,
}

#[derive(Debug, Serialize)]
struct MonthlyBody {
    label: String,
    month: MonthView,
}

const HEADER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}} | Worklog</title>
<link rel="stylesheet" href="{{root}}style.css">
</head>
<body>
<nav>
  <span class="brand">Worklog</span>
  <a href="{{root}}index.html">Dashboard</a>
  <a href="{{root}}timeline.html">Timeline</a>
  <a href="{{root}}daily.html">Daily</a>
  <a href="{{root}}weekly.html">Weekly</a>
  <a href="{{root}}monthly.html">Monthly</a>
</nav>
<main>
"#;

const FOOTER_TEMPLATE: &str = r#"</main>
<footer>Generated {{generated}} by worklog</footer>
</body>
</html>
"#;

const ENTRY_LIST_TEMPLATE: &str = r#"<ul class="entries">
{{#each entries}}
  <li>
    <span class="stamp">{{date}} {{time}}</span>
    {{#if project_name}}<a class="project" href="{{@root.root}}projects/{{project_id}}.html">{{project_name}}</a>{{/if}}
    <span class="desc">{{description}}</span>
    {{#if notes}}<span class="notes">{{notes}}</span>{{/if}}
  </li>
{{/each}}
{{#unless entries}}
  <li class="empty">No entries.</li>
{{/unless}}
</ul>
"#;

const INDEX_TEMPLATE: &str = r#"{{> header}}
<h1>Project Progress</h1>
<section class="stats">
  <div class="stat"><span class="num">{{project_count}}</span> projects</div>
  <div class="stat"><span class="num">{{entry_count}}</span> entries</div>
  <div class="stat"><span class="num">{{category_count}}</span> categories</div>
</section>
<section class="cards">
{{#each projects}}
  <article class="card">
    <h2><a href="projects/{{project_id}}.html">{{project_name}}</a></h2>
    <p class="meta">{{parent_project}}</p>
    <p>{{development_goal}}</p>
    <p class="meta">{{entry_count}} entries, updated {{last_updated}}</p>
  </article>
{{/each}}
{{#unless projects}}
  <p class="empty">No projects yet.</p>
{{/unless}}
</section>
{{> footer}}
"#;

const PROJECT_TEMPLATE: &str = r#"{{> header}}
<h1>{{project.project_name}}</h1>
<p class="meta">{{project.parent_project}}</p>
<p>{{project.development_goal}}</p>
<p class="meta">Created {{project.created_date}}, updated {{project.last_updated}},
{{project.entry_count}} entries</p>
{{> entry_list}}
{{> footer}}
"#;

const TIMELINE_TEMPLATE: &str = r#"{{> header}}
<h1>Timeline</h1>
{{> entry_list}}
{{> footer}}
"#;

const DAILY_TEMPLATE: &str = r#"{{> header}}
<h1>Daily View</h1>
<h2>{{date}}</h2>
{{> entry_list}}
{{> footer}}
"#;

const WEEKLY_TEMPLATE: &str = r#"{{> header}}
<h1>Weekly View</h1>
<h2>{{week.start}} to {{week.end}}</h2>
<div class="week">
{{#each week.days}}
  <section class="day">
    <h3>{{label}} <span class="date">{{date}}</span></h3>
    {{#each entries}}
    <p class="entry"><span class="stamp">{{time}}</span> {{description}}</p>
    {{/each}}
    {{#unless entries}}
    <p class="empty">No entries.</p>
    {{/unless}}
  </section>
{{/each}}
</div>
{{> footer}}
"#;

const MONTHLY_TEMPLATE: &str = r#"{{> header}}
<h1>Monthly View</h1>
<h2>{{label}} ({{month.entry_count}} entries)</h2>
<table class="month">
  <tr>
    <th>Mon</th><th>Tue</th><th>Wed</th><th>Thu</th><th>Fri</th><th>Sat</th><th>Sun</th>
  </tr>
{{#each month.weeks}}
  <tr>
  {{#each this}}
    {{#if day}}
    <td>
      <div class="daynum">{{day}}</div>
      {{#each entries}}
      <p class="entry"><span class="stamp">{{time}}</span> {{description}}</p>
      {{/each}}
    </td>
    {{else}}
    <td class="other-month"></td>
    {{/if}}
  {{/each}}
  </tr>
{{/each}}
</table>
{{> footer}}
"#;

const STYLESHEET: &str = r#"* { box-sizing: border-box; }
body {
  margin: 0;
  font-family: -apple-system, "Segoe UI", Roboto, sans-serif;
  color: #2d3436;
  background: #f5f6fa;
}
nav {
  display: flex;
  gap: 1rem;
  align-items: center;
  padding: 0.75rem 1.5rem;
  background: #2d3436;
}
nav .brand { color: #ffeaa7; font-weight: 700; margin-right: 1rem; }
nav a { color: #dfe6e9; text-decoration: none; }
nav a:hover { color: #ffffff; }
main { max-width: 60rem; margin: 0 auto; padding: 1.5rem; }
footer { text-align: center; color: #636e72; padding: 1.5rem; font-size: 0.85rem; }
.stats { display: flex; gap: 1rem; margin-bottom: 1.5rem; }
.stat {
  background: #ffffff;
  border-radius: 0.5rem;
  padding: 1rem 1.5rem;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
}
.stat .num { font-size: 1.5rem; font-weight: 700; display: block; }
.cards { display: grid; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); gap: 1rem; }
.card {
  background: #ffffff;
  border-radius: 0.5rem;
  padding: 1rem;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
}
.card h2 { margin: 0 0 0.5rem; font-size: 1.1rem; }
.card a { color: #0984e3; text-decoration: none; }
.meta { color: #636e72; font-size: 0.85rem; }
.entries { list-style: none; padding: 0; }
.entries li {
  background: #ffffff;
  border-radius: 0.5rem;
  padding: 0.75rem 1rem;
  margin-bottom: 0.5rem;
  box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
}
.stamp { color: #636e72; font-size: 0.85rem; margin-right: 0.75rem; white-space: nowrap; }
.project { color: #0984e3; margin-right: 0.75rem; text-decoration: none; }
.notes { display: block; color: #636e72; font-size: 0.9rem; margin-top: 0.25rem; }
.empty { color: #b2bec3; }
.week { display: grid; grid-template-columns: repeat(7, 1fr); gap: 0.5rem; }
.day { background: #ffffff; border-radius: 0.5rem; padding: 0.5rem; min-height: 8rem; }
.day h3 { margin: 0 0 0.5rem; font-size: 0.9rem; }
.day .date { display: block; color: #636e72; font-weight: 400; font-size: 0.75rem; }
.month { width: 100%; border-collapse: collapse; background: #ffffff; }
.month th { padding: 0.5rem; background: #2d3436; color: #dfe6e9; }
.month td { border: 1px solid #dfe6e9; vertical-align: top; padding: 0.25rem; height: 6rem; width: 14.28%; }
.month .daynum { font-weight: 700; color: #636e72; }
.month .other-month { background: #f5f6fa; }
.entry { margin: 0.15rem 0; font-size: 0.8rem; }
"#;

/// Static site error types.
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// Page template failed to parse.
    #[error(transparent)]
    Template(#[from] handlebars::TemplateError),

    /// Page context failed to render.
    #[error(transparent)]
    Render(#[from] handlebars::RenderError),

    /// Output directory cannot be created.
    #[error("failed to create site output directory at {:?}", path.display())]
    OutputDirectory {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Page cannot be written to the output directory.
    #[error("failed to write page at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
type Result<T, E = SiteError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProgressDocument, ProgressEntry};

    fn stored(project_id: &str, name: &str, parent: &str) -> StoredProject {
        let document = ProgressDocument::create(name, parent, "Ship v1").append(ProgressEntry {
            date: "2024-06-01".into(),
            time: "09:00".into(),
            description: format!("kick off {name}"),
            notes: "first pass".into(),
            ..Default::default()
        });

        StoredProject { project_id: project_id.into(), document }
    }

    #[test]
    fn build_writes_every_page() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let out = root.path().join("pages");
        let projects =
            vec![stored("aa11aa11", "mesh-router", "Networking"), stored("bb22bb22", "kv-cache", "Storage")];

        SiteBuilder::new(&out)?.build(&projects)?;

        for page in
            ["index.html", "timeline.html", "daily.html", "weekly.html", "monthly.html", "style.css"]
        {
            assert!(out.join(page).exists(), "missing {page}");
        }
        assert!(out.join("projects/aa11aa11.html").exists());
        assert!(out.join("projects/bb22bb22.html").exists());

        Ok(())
    }

    #[test]
    fn dashboard_lists_projects_and_counts() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let out = root.path().join("pages");
        let projects =
            vec![stored("aa11aa11", "mesh-router", "Networking"), stored("bb22bb22", "kv-cache", "Storage")];

        SiteBuilder::new(&out)?.build(&projects)?;

        let index = fs::read_to_string(out.join("index.html"))?;
        assert!(index.contains("mesh-router"));
        assert!(index.contains("kv-cache"));
        assert!(index.contains(r#"<span class="num">2</span> projects"#));
        assert!(index.contains(r#"<span class="num">2</span> entries"#));
        assert!(index.contains(r#"<span class="num">2</span> categories"#));

        Ok(())
    }

    #[test]
    fn project_page_escapes_markup_in_descriptions() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let out = root.path().join("pages");
        let document = ProgressDocument::create("mesh-router", "Networking", "Ship v1").append(
            ProgressEntry {
                date: "2024-06-01".into(),
                time: "09:00".into(),
                description: "compare a < b cases".into(),
                ..Default::default()
            },
        );
        let projects = vec![StoredProject { project_id: "aa11aa11".into(), document }];

        SiteBuilder::new(&out)?.build(&projects)?;

        let page = fs::read_to_string(out.join("projects/aa11aa11.html"))?;
        assert!(page.contains("compare a &lt; b cases"));
        assert!(!page.contains("a < b"));

        Ok(())
    }

    #[test]
    fn empty_site_still_renders() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let out = root.path().join("pages");
        SiteBuilder::new(&out)?.build(&[])?;

        let index = fs::read_to_string(out.join("index.html"))?;
        assert!(index.contains("No projects yet."));

        Ok(())
    }
}
