// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Temporal aggregation of progress entries.
//!
//! Pure functions that bucket a flat, cross-project collection of entries
//! into the shapes the page builder renders: per-day groups, a Monday-first
//! seven-slot week, a whole-month calendar grid with placeholder cells, and
//! a descending timeline.
//!
//! Entry dates stay strings throughout. Month membership is a lexical
//! `YYYY-MM` prefix match, so a malformed date with the right prefix still
//! counts toward the month total even though it can never land in a real
//! day cell. Dates never parse, so they never error.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use crate::store::StoredProject;

/// One progress entry flattened with its project attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub project_id: String,
    pub project_name: String,
    pub parent_project: String,
    pub date: String,
    pub time: String,
    pub description: String,
    pub notes: String,
    pub tags: Vec<String>,
}

/// Flatten loaded projects into attributed entries, preserving each
/// document's append order.
pub fn collect_entries(projects: &[StoredProject]) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();
    for project in projects {
        for entry in &project.document.entries {
            entries.push(TimelineEntry {
                project_id: project.project_id.clone(),
                project_name: project.document.project_name.clone(),
                parent_project: project.document.parent_project.clone(),
                date: entry.date.clone(),
                time: entry.time.clone(),
                description: entry.description.clone(),
                notes: entry.notes.clone(),
                tags: entry.tags.iter().cloned().collect(),
            });
        }
    }

    entries
}

/// Group entries by exact date string.
///
/// Within a day, entries come out ordered by time ascending; equal times
/// keep their input order. Days come out date-ordered.
pub fn by_day(entries: &[TimelineEntry]) -> BTreeMap<String, Vec<TimelineEntry>> {
    let mut days: BTreeMap<String, Vec<TimelineEntry>> = BTreeMap::new();
    for entry in entries {
        days.entry(entry.date.clone()).or_default().push(entry.clone());
    }

    for bucket in days.values_mut() {
        bucket.sort_by(|a, b| a.time.cmp(&b.time));
    }

    days
}

/// One day column of the week view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySlot {
    /// Calendar date of the slot, `YYYY-MM-DD`.
    pub date: String,

    /// Weekday label, `Monday` through `Sunday`.
    pub label: String,

    /// Entries on this date, time ascending.
    pub entries: Vec<TimelineEntry>,
}

/// The Monday-first week containing a reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekView {
    /// Date of the week's Monday, `YYYY-MM-DD`.
    pub start: String,

    /// Date of the week's Sunday, `YYYY-MM-DD`.
    pub end: String,

    /// Exactly seven slots, Monday through Sunday.
    pub days: Vec<DaySlot>,
}

/// Bucket entries into the week containing `reference`.
///
/// The view always holds exactly seven day slots in Monday-first order;
/// days without entries stay as empty buckets. Assignment is by exact date
/// string equality with each slot's date.
pub fn by_week(entries: &[TimelineEntry], reference: NaiveDate) -> WeekView {
    let week = reference.week(Weekday::Mon);
    let monday = week.first_day();

    let mut days = Vec::with_capacity(7);
    for offset in 0..7u64 {
        let date = monday + Days::new(offset);
        let date_string = date.format("%Y-%m-%d").to_string();
        let mut slot_entries: Vec<TimelineEntry> =
            entries.iter().filter(|entry| entry.date == date_string).cloned().collect();
        slot_entries.sort_by(|a, b| a.time.cmp(&b.time));

        days.push(DaySlot {
            date: date_string,
            label: weekday_label(date.weekday()).to_string(),
            entries: slot_entries,
        });
    }

    WeekView {
        start: monday.format("%Y-%m-%d").to_string(),
        end: week.last_day().format("%Y-%m-%d").to_string(),
        days,
    }
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCell {
    /// Day of month, absent for placeholder cells padding the grid.
    pub day: Option<u32>,

    /// Full date of the cell, `YYYY-MM-DD`, absent for placeholders.
    pub date: Option<String>,

    /// Entries on this date, time ascending.
    pub entries: Vec<TimelineEntry>,
}

impl MonthCell {
    fn placeholder() -> Self {
        Self { day: None, date: None, entries: Vec::new() }
    }
}

/// A whole calendar month laid out Monday-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub year: i32,
    pub month: u32,

    /// Count of entries whose date carries this month's `YYYY-MM` prefix,
    /// including entries too malformed to land in any day cell.
    pub entry_count: usize,

    /// Rows of exactly seven cells each.
    pub weeks: Vec<Vec<MonthCell>>,
}

/// Lay out the month grid and assign entries to day cells.
///
/// Month membership is a lexical prefix match on `YYYY-MM`; day cells then
/// match by full date equality. Cells padding the grid out to whole weeks
/// are placeholders.
pub fn by_month(entries: &[TimelineEntry], year: i32, month: u32) -> MonthView {
    let prefix = format!("{year:04}-{month:02}");
    let in_month: Vec<&TimelineEntry> =
        entries.iter().filter(|entry| entry.date.starts_with(&prefix)).collect();

    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return MonthView { year, month, entry_count: in_month.len(), weeks: Vec::new() };
    };

    let mut weeks = Vec::new();
    let mut week: Vec<MonthCell> = Vec::with_capacity(7);
    for _ in 0..first.weekday().num_days_from_monday() {
        week.push(MonthCell::placeholder());
    }

    for day in 1..=days_in_month(year, month) {
        let date = format!("{prefix}-{day:02}");
        let mut cell_entries: Vec<TimelineEntry> = in_month
            .iter()
            .filter(|entry| entry.date == date)
            .map(|&entry| entry.clone())
            .collect();
        cell_entries.sort_by(|a, b| a.time.cmp(&b.time));

        week.push(MonthCell { day: Some(day), date: Some(date), entries: cell_entries });
        if week.len() == 7 {
            weeks.push(week);
            week = Vec::with_capacity(7);
        }
    }

    if !week.is_empty() {
        while week.len() < 7 {
            week.push(MonthCell::placeholder());
        }
        weeks.push(week);
    }

    MonthView { year, month, entry_count: in_month.len(), weeks }
}

/// All entries sorted by date descending.
///
/// Stable: entries sharing a date keep their input order.
pub fn timeline_all(entries: &[TimelineEntry]) -> Vec<TimelineEntry> {
    let mut timeline = entries.to_vec();
    timeline.sort_by(|a, b| b.date.cmp(&a.date));

    timeline
}

/// Date the daily page should open on: the most recent entry date when any
/// exist, today otherwise.
pub fn default_focus_date(entries: &[TimelineEntry], today: NaiveDate) -> String {
    entries
        .iter()
        .map(|entry| entry.date.as_str())
        .max()
        .map(ToString::to_string)
        .unwrap_or_else(|| today.format("%Y-%m-%d").to_string())
}

/// Number of days in target month, leap-aware.
fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };

    match next.and_then(|date| date.pred_opt()) {
        Some(last) => last.day(),
        None => 0,
    }
}

fn weekday_label(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn entry(date: &str, time: &str, description: &str) -> TimelineEntry {
        TimelineEntry {
            project_id: "ab12cd34".into(),
            project_name: "mesh-router".into(),
            parent_project: "Networking".into(),
            date: date.into(),
            time: time.into(),
            description: description.into(),
            notes: String::new(),
            tags: Vec::new(),
        }
    }

    #[test]
    fn by_day_orders_by_time_and_keeps_ties_stable() {
        let entries = vec![
            entry("2024-06-01", "10:00", "late morning"),
            entry("2024-06-01", "09:00", "first nine"),
            entry("2024-06-01", "09:00", "second nine"),
            entry("2024-06-02", "08:00", "next day"),
        ];

        let days = by_day(&entries);
        assert_eq!(days.len(), 2);

        let first_day: Vec<&str> =
            days["2024-06-01"].iter().map(|entry| entry.description.as_str()).collect();
        assert_eq!(first_day, ["first nine", "second nine", "late morning"]);
    }

    #[test]
    fn by_week_always_has_seven_monday_first_slots() {
        let week = by_week(&[], date(2024, 6, 5));
        assert_eq!(week.start, "2024-06-03");
        assert_eq!(week.end, "2024-06-09");
        assert_eq!(week.days.len(), 7);
        assert_eq!(week.days[0].label, "Monday");
        assert_eq!(week.days[6].label, "Sunday");
        assert!(week.days.iter().all(|slot| slot.entries.is_empty()));
    }

    #[test]
    fn by_week_buckets_entries_into_their_slots() {
        let entries = vec![
            entry("2024-06-03", "09:00", "monday standup"),
            entry("2024-06-09", "21:00", "sunday wrap-up"),
            entry("2024-06-10", "09:00", "outside the week"),
        ];

        let week = by_week(&entries, date(2024, 6, 5));
        assert_eq!(week.days[0].entries.len(), 1);
        assert_eq!(week.days[6].entries.len(), 1);
        let total: usize = week.days.iter().map(|slot| slot.entries.len()).sum();
        assert_eq!(total, 2);
    }

    #[test_case(2024, 2, 29; "leap year february")]
    #[test_case(2023, 2, 28; "regular february")]
    #[test_case(2024, 6, 30; "thirty day month")]
    #[test_case(2024, 12, 31; "december wraps the year")]
    #[test]
    fn month_grid_has_expected_day_cells(year: i32, month: u32, expect: usize) {
        use pretty_assertions::assert_eq;

        let view = by_month(&[], year, month);
        let day_cells: usize = view
            .weeks
            .iter()
            .flatten()
            .filter(|cell| cell.day.is_some())
            .count();
        assert_eq!(day_cells, expect);
        assert!(view.weeks.iter().all(|week| week.len() == 7));
    }

    #[test]
    fn month_grid_places_days_under_their_weekday() {
        // February 2024 starts on a Thursday.
        let view = by_month(&[], 2024, 2);
        assert_eq!(view.weeks[0][0].day, None);
        assert_eq!(view.weeks[0][2].day, None);
        assert_eq!(view.weeks[0][3].day, Some(1));
        assert_eq!(view.weeks[4][3].day, Some(29));
        assert_eq!(view.weeks[4][6].day, None);
    }

    #[test]
    fn month_membership_is_a_lexical_prefix_match() {
        let entries = vec![
            entry("2024-02-14", "09:00", "well-formed"),
            entry("2024-02-banana", "09:00", "malformed but in month"),
            entry("2024-03-01", "09:00", "next month"),
        ];

        let view = by_month(&entries, 2024, 2);
        assert_eq!(view.entry_count, 2);

        let placed: usize = view
            .weeks
            .iter()
            .flatten()
            .map(|cell| cell.entries.len())
            .sum();
        assert_eq!(placed, 1);
    }

    #[test]
    fn timeline_is_date_descending_and_stable() {
        let entries = vec![
            entry("2024-06-01", "09:00", "older first"),
            entry("2024-06-02", "09:00", "newest"),
            entry("2024-06-01", "08:00", "older second"),
        ];

        let timeline = timeline_all(&entries);
        let order: Vec<&str> =
            timeline.iter().map(|entry| entry.description.as_str()).collect();
        assert_eq!(order, ["newest", "older first", "older second"]);
    }

    #[test]
    fn focus_date_prefers_latest_entry() {
        let entries =
            vec![entry("2024-06-01", "09:00", "a"), entry("2024-06-03", "09:00", "b")];
        assert_eq!(default_focus_date(&entries, date(2024, 7, 1)), "2024-06-03");
        assert_eq!(default_focus_date(&[], date(2024, 7, 1)), "2024-07-01");
    }
}
