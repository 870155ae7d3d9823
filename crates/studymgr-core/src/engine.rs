//! One entry point over the task projections.
//!
//! `TaskViewEngine` binds the timezone and report sizes once and derives
//! every view from the snapshot handed to it. It keeps no state between
//! calls, so a single engine can be shared freely across threads.

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::calendar::{
  MarkedDates,
  build_marked_dates
};
use crate::datetime::day_key;
use crate::heatmap::{
  DEFAULT_WINDOW_DAYS,
  HeatBucket,
  build_heatmap
};
use crate::stats::{
  DEFAULT_UPCOMING_LIMIT,
  DashboardSummary,
  Stats,
  compute_stats_with_limit,
  dashboard_summary
};
use crate::task::Task;
use crate::view::{
  UPCOMING_FILTER_DAYS,
  ViewSpec,
  due_soon,
  filter_and_sort
};

#[derive(Debug, Clone)]
pub struct EngineSettings {
  pub timezone:       Tz,
  /// Window of the dashboard's due-soon list.
  pub upcoming_days:  i64,
  pub upcoming_limit: usize,
  pub heatmap_days:   u32
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      timezone:       chrono_tz::UTC,
      upcoming_days:  UPCOMING_FILTER_DAYS,
      upcoming_limit:
        DEFAULT_UPCOMING_LIMIT,
      heatmap_days:   DEFAULT_WINDOW_DAYS
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskViews {
  pub filtered_tasks: Vec<Task>,
  pub marked_dates:   MarkedDates,
  pub stats:          Stats,
  pub heatmap:        Vec<HeatBucket>
}

#[derive(Debug, Clone, Default)]
pub struct TaskViewEngine {
  settings: EngineSettings
}

impl TaskViewEngine {
  pub fn new(
    settings: EngineSettings
  ) -> Self {
    Self { settings }
  }

  pub fn settings(
    &self
  ) -> &EngineSettings {
    &self.settings
  }

  pub fn timezone(&self) -> &Tz {
    &self.settings.timezone
  }

  pub fn today(
    &self,
    now: DateTime<Utc>
  ) -> NaiveDate {
    day_key(now, self.timezone())
  }

  /// Every projection for one refresh of the screen.
  #[tracing::instrument(skip(self, tasks, spec), fields(count = tasks.len(), filter = %spec.filter))]
  pub fn compute(
    &self,
    tasks: &[Task],
    spec: &ViewSpec
  ) -> TaskViews {
    TaskViews {
      filtered_tasks: self
        .filter_and_sort(tasks, spec),
      marked_dates:   self
        .build_marked_dates(
          tasks,
          spec.selected_day,
          spec.reference
        ),
      stats:          self
        .compute_stats(
          tasks,
          spec.reference
        ),
      heatmap:        self.build_heatmap(
        tasks,
        self.settings.heatmap_days,
        self.today(spec.reference)
      )
    }
  }

  pub fn filter_and_sort(
    &self,
    tasks: &[Task],
    spec: &ViewSpec
  ) -> Vec<Task> {
    filter_and_sort(
      tasks,
      spec,
      self.timezone()
    )
  }

  pub fn build_marked_dates(
    &self,
    tasks: &[Task],
    selected_day: Option<NaiveDate>,
    now: DateTime<Utc>
  ) -> MarkedDates {
    build_marked_dates(
      tasks,
      selected_day,
      now,
      self.timezone()
    )
  }

  pub fn compute_stats(
    &self,
    tasks: &[Task],
    reference: DateTime<Utc>
  ) -> Stats {
    compute_stats_with_limit(
      tasks,
      reference,
      self.settings.upcoming_limit
    )
  }

  pub fn build_heatmap(
    &self,
    tasks: &[Task],
    window_days: u32,
    end_date: NaiveDate
  ) -> Vec<HeatBucket> {
    build_heatmap(
      tasks,
      window_days,
      end_date,
      self.timezone()
    )
  }

  pub fn due_soon(
    &self,
    tasks: &[Task],
    now: DateTime<Utc>
  ) -> Vec<Task> {
    due_soon(
      tasks,
      now,
      self.settings.upcoming_days
    )
  }

  pub fn dashboard(
    &self,
    tasks: &[Task],
    now: DateTime<Utc>
  ) -> DashboardSummary {
    dashboard_summary(
      tasks,
      now,
      self.timezone(),
      self.settings.upcoming_days
    )
  }
}
