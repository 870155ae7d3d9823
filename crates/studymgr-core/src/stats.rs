use chrono::{
  DateTime,
  Utc
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::datetime::day_key;
use crate::task::{
  Source,
  Status,
  Task
};
use crate::view::{
  due_soon,
  sort_by_due
};

pub const DEFAULT_UPCOMING_LIMIT: usize =
  5;

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Stats {
  pub total:           usize,
  pub completed_count: usize,
  /// Everything not completed, in-progress tasks included.
  pub pending_count:   usize,
  pub completion_rate: u8,
  pub upcoming_tasks:  Vec<Task>
}

pub fn compute_stats(
  tasks: &[Task],
  reference: DateTime<Utc>
) -> Stats {
  compute_stats_with_limit(
    tasks,
    reference,
    DEFAULT_UPCOMING_LIMIT
  )
}

#[tracing::instrument(skip(tasks, reference), fields(count = tasks.len()))]
pub fn compute_stats_with_limit(
  tasks: &[Task],
  reference: DateTime<Utc>,
  limit: usize
) -> Stats {
  let total = tasks.len();
  let completed_count = tasks
    .iter()
    .filter(|task| task.is_completed())
    .count();

  let mut upcoming_tasks: Vec<Task> =
    tasks
      .iter()
      .filter(|task| {
        !task.is_completed()
          && task.due_date.is_some_and(
            |due| due > reference
          )
      })
      .cloned()
      .collect();
  sort_by_due(&mut upcoming_tasks);
  upcoming_tasks.truncate(limit);

  let stats = Stats {
    total,
    completed_count,
    pending_count: total
      - completed_count,
    completion_rate: completion_rate(
      completed_count,
      total
    ),
    upcoming_tasks
  };
  tracing::debug!(
    completed = stats.completed_count,
    pending = stats.pending_count,
    rate = stats.completion_rate,
    "computed stats"
  );
  stats
}

/// Percentage rounded half up; zero for an empty collection.
pub fn completion_rate(
  completed: usize,
  total: usize
) -> u8 {
  if total == 0 {
    return 0;
  }
  let completed = completed.min(total);
  let rate = (completed * 200 + total)
    / (total * 2);
  u8::try_from(rate).unwrap_or(100)
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
pub struct DashboardSummary {
  pub total:           usize,
  /// Strictly `status == pending`.
  pub pending:         usize,
  pub in_progress:     usize,
  pub completed:       usize,
  pub completed_today: usize,
  pub from_canvas:     usize,
  pub due_soon:        usize
}

/// Counters shown on the home screen cards.
pub fn dashboard_summary(
  tasks: &[Task],
  now: DateTime<Utc>,
  tz: &Tz,
  due_soon_days: i64
) -> DashboardSummary {
  let today = day_key(now, tz);
  let count_status = |status: Status| {
    tasks
      .iter()
      .filter(|task| {
        task.status == status
      })
      .count()
  };

  DashboardSummary {
    total:           tasks.len(),
    pending:         count_status(
      Status::Pending
    ),
    in_progress:     count_status(
      Status::InProgress
    ),
    completed:       count_status(
      Status::Completed
    ),
    completed_today: tasks
      .iter()
      .filter(|task| {
        task.is_completed()
          && day_key(task.updated_at, tz)
            == today
      })
      .count(),
    from_canvas:     tasks
      .iter()
      .filter(|task| {
        task.source == Source::Canvas
      })
      .count(),
    due_soon:        due_soon(
      tasks,
      now,
      due_soon_days
    )
    .len()
  }
}
