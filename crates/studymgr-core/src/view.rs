use std::cmp::Ordering;
use std::fmt;

use chrono::{
  DateTime,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use tracing::{
  debug,
  trace
};

use crate::datetime::day_key;
use crate::task::{
  Source,
  Status,
  Task
};

/// Look-ahead of the `upcoming` filter.
pub const UPCOMING_FILTER_DAYS: i64 = 7;

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub enum FilterKey {
  #[default]
  All,
  Status(Status),
  /// Open tasks due within the look-ahead, overdue ones included.
  Upcoming,
  Source(Source),
  /// Anything else; selects every task.
  Unrecognized(String)
}

impl FilterKey {
  pub fn parse(raw: &str) -> Self {
    let key = raw.trim();
    if key.eq_ignore_ascii_case("all") {
      return Self::All;
    }
    if key
      .eq_ignore_ascii_case("upcoming")
    {
      return Self::Upcoming;
    }
    let lower = key.to_ascii_lowercase();
    if let Ok(status) =
      lower.parse::<Status>()
    {
      return Self::Status(status);
    }
    if let Ok(source) =
      lower.parse::<Source>()
    {
      return Self::Source(source);
    }
    Self::Unrecognized(key.to_string())
  }

  pub fn label(&self) -> &str {
    match self {
      | Self::All => "All Tasks",
      | Self::Status(Status::Pending) => {
        "Pending"
      }
      | Self::Status(
        Status::InProgress
      ) => "In Progress",
      | Self::Status(
        Status::Completed
      ) => "Completed",
      | Self::Upcoming => "Due Soon",
      | Self::Source(Source::Canvas) => {
        "Canvas"
      }
      | Self::Source(Source::Manual) => {
        "Manual"
      }
      | Self::Source(
        Source::GoogleCalendar
      ) => "Google Calendar",
      | Self::Unrecognized(raw) => raw
    }
  }
}

impl fmt::Display for FilterKey {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | Self::All => f.write_str("all"),
      | Self::Status(status) => {
        f.write_str(status.as_str())
      }
      | Self::Upcoming => {
        f.write_str("upcoming")
      }
      | Self::Source(source) => {
        f.write_str(source.as_str())
      }
      | Self::Unrecognized(raw) => {
        f.write_str(raw)
      }
    }
  }
}

#[derive(Debug, Clone)]
pub struct ViewSpec {
  pub filter:       FilterKey,
  pub reference:    DateTime<Utc>,
  pub selected_day: Option<NaiveDate>
}

impl ViewSpec {
  pub fn new(
    filter: FilterKey,
    reference: DateTime<Utc>
  ) -> Self {
    Self {
      filter,
      reference,
      selected_day: None
    }
  }

  #[must_use]
  pub fn on_day(
    mut self,
    day: NaiveDate
  ) -> Self {
    self.selected_day = Some(day);
    self
  }
}

/// Applies the view's filter, then orders by due date.
///
/// When a day is selected it narrows the filter key's result to tasks due on
/// that calendar day.
#[tracing::instrument(skip(tasks, spec, tz), fields(filter = %spec.filter, count = tasks.len()))]
pub fn filter_and_sort(
  tasks: &[Task],
  spec: &ViewSpec,
  tz: &Tz
) -> Vec<Task> {
  if let FilterKey::Unrecognized(raw) =
    &spec.filter
  {
    debug!(
      key = %raw,
      "unrecognized filter key; selecting all tasks"
    );
  }

  let mut rows: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      matches_filter(
        task,
        &spec.filter,
        spec.reference
      )
    })
    .filter(|task| {
      spec.selected_day.is_none_or(
        |day| {
          is_due_on(task, day, tz)
        }
      )
    })
    .cloned()
    .collect();

  sort_by_due(&mut rows);
  rows
}

pub fn matches_filter(
  task: &Task,
  filter: &FilterKey,
  reference: DateTime<Utc>
) -> bool {
  let ok = match filter {
    | FilterKey::All
    | FilterKey::Unrecognized(_) => {
      true
    }
    | FilterKey::Status(status) => {
      task.status == *status
    }
    | FilterKey::Upcoming => {
      let horizon = horizon_after(
        reference,
        UPCOMING_FILTER_DAYS
      );
      !task.is_completed()
        && task.due_date.is_some_and(
          |due| {
            horizon.is_none_or(|end| {
              due <= end
            })
          }
        )
    }
    | FilterKey::Source(source) => {
      task.source == *source
    }
  };

  trace!(filter = %filter, id = %task.id, ok, "filter predicate evaluation");
  ok
}

pub fn is_due_on(
  task: &Task,
  day: NaiveDate,
  tz: &Tz
) -> bool {
  task
    .due_date
    .map(|due| day_key(due, tz) == day)
    .unwrap_or(false)
}

/// Open tasks due between `reference` and `reference + days`, both ends
/// inclusive, earliest first.
pub fn due_soon(
  tasks: &[Task],
  reference: DateTime<Utc>,
  days: i64
) -> Vec<Task> {
  let horizon =
    horizon_after(reference, days);
  let mut rows: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      !task.is_completed()
        && task.due_date.is_some_and(
          |due| {
            due >= reference
              && horizon.is_none_or(
                |end| due <= end
              )
          }
        )
    })
    .cloned()
    .collect();
  sort_by_due(&mut rows);
  rows
}

/// `reference + days`; `None` past the end of the calendar, which callers
/// read as no upper bound.
fn horizon_after(
  reference: DateTime<Utc>,
  days: i64
) -> Option<DateTime<Utc>> {
  Duration::try_days(days).and_then(
    |window| {
      reference.checked_add_signed(window)
    }
  )
}

/// Stable; tasks without a due date go last.
pub fn sort_by_due(rows: &mut [Task]) {
  rows.sort_by(|a, b| {
    cmp_optional(
      a.due_date.as_ref(),
      b.due_date.as_ref()
    )
  });
}

pub(crate) fn cmp_optional<T: Ord>(
  left: Option<&T>,
  right: Option<&T>
) -> Ordering {
  match (left, right) {
    | (Some(a), Some(b)) => a.cmp(b),
    | (Some(_), None) => Ordering::Less,
    | (None, Some(_)) => {
      Ordering::Greater
    }
    | (None, None) => Ordering::Equal
  }
}
