use std::collections::BTreeMap;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::trace;

use crate::datetime::day_key;
use crate::task::Task;

/// Dot shown under a calendar day. Variants are declared in ascending
/// precedence so `max` picks the one to show.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DotColor {
  Pending,
  Completed,
  Overdue
}

impl DotColor {
  pub fn for_task(
    task: &Task,
    now: DateTime<Utc>
  ) -> Self {
    if task.is_overdue(now) {
      Self::Overdue
    } else if task.is_completed() {
      Self::Completed
    } else {
      Self::Pending
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct DayMark {
  pub marked:   bool,
  pub selected: bool,
  /// `None` only for days marked without any task (today, the selection).
  pub dot:      Option<DotColor>
}

pub type MarkedDates =
  BTreeMap<NaiveDate, DayMark>;

/// Builds the per-day marks shown on the month grid.
///
/// Today is always marked, the selected day is always present, and every
/// day with a due task carries exactly one dot.
#[tracing::instrument(skip(tasks, now, tz), fields(count = tasks.len()))]
pub fn build_marked_dates(
  tasks: &[Task],
  selected_day: Option<NaiveDate>,
  now: DateTime<Utc>,
  tz: &Tz
) -> MarkedDates {
  let mut dates = MarkedDates::new();

  dates
    .entry(day_key(now, tz))
    .or_default()
    .marked = true;

  for task in tasks {
    let Some(due) = task.due_date else {
      continue;
    };
    let dot =
      DotColor::for_task(task, now);
    let mark = dates
      .entry(day_key(due, tz))
      .or_default();
    mark.marked = true;
    mark.dot = mark.dot.max(Some(dot));
    trace!(id = %task.id, ?dot, "marked due date");
  }

  if let Some(day) = selected_day {
    dates.entry(day).or_default().selected =
      true;
  }

  dates
}
