use std::fs;

use chrono::{
  Duration,
  NaiveDate,
  TimeZone,
  Utc
};
use studymgr_core::calendar::DotColor;
use studymgr_core::heatmap::IntensityBand;
use studymgr_core::{
  EngineSettings,
  FilterKey,
  TaskViewEngine,
  ViewSpec,
  snapshot
};
use tempfile::tempdir;

const SNAPSHOT: &str = r#"[
  {"id": "essay", "title": "History essay", "due_date": "2024-01-10T17:00:00Z",
   "priority": "high", "status": "pending", "source": "manual",
   "created_at": "2024-01-01T08:00:00Z", "updated_at": "2024-01-01T08:00:00Z"},
  {"id": "lab", "title": "Lab 3", "due_date": "2024-01-05T23:59:00Z",
   "priority": "medium", "status": "in_progress", "source": "canvas",
   "created_at": "2024-01-02T08:00:00Z", "updated_at": "2024-01-04T10:00:00Z"},
  {"id": "notes", "title": "Tidy notes", "due_date": "not a date",
   "priority": "low", "status": "pending", "source": "manual",
   "created_at": "2024-01-01T08:00:00Z", "updated_at": "2024-01-01T08:00:00Z"},
  {"id": "quiz", "title": "Quiz 1", "due_date": "2024-01-03T09:00:00Z",
   "priority": "medium", "status": "completed", "source": "canvas",
   "created_at": "2024-01-01T08:00:00Z", "updated_at": "2024-01-06T12:00:00Z"},
  {"id": "reading", "title": "Reading", "due_date": "2024-01-04T09:00:00Z",
   "priority": "low", "status": "pending", "source": "google_calendar",
   "created_at": "2024-01-01T08:00:00Z", "updated_at": "2024-01-01T08:00:00Z"},
  {"id": "slides", "title": "Slides", "priority": "low", "status": "completed",
   "source": "manual",
   "created_at": "2024-01-01T08:00:00Z", "updated_at": "2024-01-06T18:00:00Z"}
]"#;

#[test]
fn snapshot_file_through_every_view() {
  let temp = tempdir().expect("tempdir");
  let path = temp.path().join("tasks.json");
  fs::write(&path, SNAPSHOT)
    .expect("write snapshot");

  let engine = TaskViewEngine::new(
    EngineSettings {
      heatmap_days: 30,
      ..EngineSettings::default()
    }
  );
  let tasks =
    snapshot::load(&path, engine.timezone())
      .expect("load snapshot");
  assert_eq!(tasks.len(), 6);

  let now = Utc
    .with_ymd_and_hms(2024, 1, 6, 20, 0, 0)
    .single()
    .expect("valid now");

  let views = engine.compute(
    &tasks,
    &ViewSpec::new(FilterKey::All, now)
  );

  let order: Vec<&str> = views
    .filtered_tasks
    .iter()
    .map(|task| task.id.as_str())
    .collect();
  assert_eq!(order, vec![
    "quiz", "reading", "lab", "essay",
    "notes", "slides"
  ]);

  assert_eq!(views.stats.completed_count, 2);
  assert_eq!(views.stats.pending_count, 4);
  assert_eq!(views.stats.completion_rate, 33);
  assert_eq!(
    views
      .stats
      .upcoming_tasks
      .iter()
      .map(|task| task.id.as_str())
      .collect::<Vec<_>>(),
    vec!["essay"]
  );

  let day = |d: u32| {
    NaiveDate::from_ymd_opt(2024, 1, d)
      .expect("valid day")
  };
  assert_eq!(
    views.marked_dates[&day(5)].dot,
    Some(DotColor::Overdue)
  );
  assert_eq!(
    views.marked_dates[&day(3)].dot,
    Some(DotColor::Completed)
  );
  assert_eq!(
    views.marked_dates[&day(10)].dot,
    Some(DotColor::Pending)
  );
  assert!(views.marked_dates[&day(6)].marked);

  assert_eq!(views.heatmap.len(), 30);
  let last = views
    .heatmap
    .last()
    .expect("non-empty heatmap");
  assert_eq!(last.date, day(6));
  assert_eq!(last.count, 2);
  assert_eq!(last.band, IntensityBand::Low);
  assert_eq!(
    views
      .heatmap
      .iter()
      .map(|bucket| bucket.count)
      .sum::<usize>(),
    2
  );
}

#[test]
fn upcoming_and_source_views_over_snapshot() {
  let engine = TaskViewEngine::default();
  let tasks = snapshot::parse_tasks(
    SNAPSHOT,
    engine.timezone()
  )
  .expect("valid snapshot");
  let now = Utc
    .with_ymd_and_hms(2024, 1, 6, 20, 0, 0)
    .single()
    .expect("valid now");

  let select = |key: &str| {
    engine
      .filter_and_sort(
        &tasks,
        &ViewSpec::new(
          FilterKey::parse(key),
          now
        )
      )
      .into_iter()
      .map(|task| task.id.to_string())
      .collect::<Vec<_>>()
  };

  assert_eq!(select("upcoming"), vec![
    "reading", "lab", "essay"
  ]);
  assert_eq!(select("canvas"), vec![
    "quiz", "lab"
  ]);
  assert_eq!(select("google_calendar"), vec![
    "reading"
  ]);

  let due_soon = engine.due_soon(
    &tasks,
    now - Duration::days(3)
  );
  assert_eq!(
    due_soon
      .iter()
      .map(|task| task.id.as_str())
      .collect::<Vec<_>>(),
    vec!["reading", "lab", "essay"]
  );

  let dashboard =
    engine.dashboard(&tasks, now);
  assert_eq!(dashboard.completed_today, 2);
  assert_eq!(dashboard.from_canvas, 2);
}
