use std::fmt;
use std::str::FromStr;

use chrono::{
  DateTime,
  Utc
};
use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
  pub fn new(
    raw: impl Into<String>
  ) -> Self {
    Self(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TaskId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for TaskId {
  fn from(raw: &str) -> Self {
    Self(raw.to_string())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  Pending,
  InProgress,
  Completed
}

impl Status {
  pub const ALL: [Status; 3] = [
    Status::Pending,
    Status::InProgress,
    Status::Completed
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      | Status::Pending => "pending",
      | Status::InProgress => {
        "in_progress"
      }
      | Status::Completed => {
        "completed"
      }
    }
  }

  /// Successor offered by the status toggle.
  #[must_use]
  pub fn next(self) -> Status {
    match self {
      | Status::Pending => {
        Status::InProgress
      }
      | Status::InProgress => {
        Status::Completed
      }
      | Status::Completed => {
        Status::Pending
      }
    }
  }
}

impl FromStr for Status {
  type Err = ();

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Status::ALL
      .into_iter()
      .find(|status| {
        status.as_str() == s.trim()
      })
      .ok_or(())
  }
}

impl fmt::Display for Status {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
  Low,
  Medium,
  High
}

impl Priority {
  pub const ALL: [Priority; 3] = [
    Priority::Low,
    Priority::Medium,
    Priority::High
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      | Priority::Low => "low",
      | Priority::Medium => "medium",
      | Priority::High => "high"
    }
  }
}

impl FromStr for Priority {
  type Err = ();

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Priority::ALL
      .into_iter()
      .find(|priority| {
        priority.as_str() == s.trim()
      })
      .ok_or(())
  }
}

impl fmt::Display for Priority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Where a record came from. Only used for grouping and display.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Source {
  Manual,
  Canvas,
  GoogleCalendar
}

impl Source {
  pub const ALL: [Source; 3] = [
    Source::Manual,
    Source::Canvas,
    Source::GoogleCalendar
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      | Source::Manual => "manual",
      | Source::Canvas => "canvas",
      | Source::GoogleCalendar => {
        "google_calendar"
      }
    }
  }
}

impl FromStr for Source {
  type Err = ();

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Source::ALL
      .into_iter()
      .find(|source| {
        source.as_str() == s.trim()
      })
      .ok_or(())
  }
}

impl fmt::Display for Source {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(
  Debug, Clone, PartialEq, Serialize,
)]
pub struct Task {
  pub id:          TaskId,
  pub title:       String,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub description: Option<String>,
  pub due_date:    Option<DateTime<Utc>>,
  pub priority:    Priority,
  pub status:      Status,
  pub source:      Source,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,

  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub user_id: Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub canvas_assignment_id:
    Option<String>,
  #[serde(
    skip_serializing_if = "Option::is_none"
  )]
  pub google_event_id: Option<String>
}

impl Task {
  /// A pending, medium priority, manually entered task with no deadline.
  pub fn new_manual(
    id: impl Into<String>,
    title: impl Into<String>,
    now: DateTime<Utc>
  ) -> Self {
    Self {
      id: TaskId::new(id),
      title: title.into(),
      description: None,
      due_date: None,
      priority: Priority::Medium,
      status: Status::Pending,
      source: Source::Manual,
      created_at: now,
      updated_at: now,
      user_id: None,
      canvas_assignment_id: None,
      google_event_id: None
    }
  }

  pub fn is_completed(&self) -> bool {
    self.status == Status::Completed
  }

  pub fn is_overdue(
    &self,
    now: DateTime<Utc>
  ) -> bool {
    !self.is_completed()
      && self
        .due_date
        .map(|due| due < now)
        .unwrap_or(false)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    Source,
    Status,
    Task
  };

  #[test]
  fn overdue_requires_past_due_and_open_status()
   {
    let now = Utc
      .with_ymd_and_hms(
        2024, 1, 10, 12, 0, 0
      )
      .single()
      .expect("valid now");
    let mut task = Task::new_manual(
      "t1", "essay", now
    );
    task.due_date =
      Some(now - Duration::days(1));

    assert!(task.is_overdue(now));

    task.status = Status::Completed;
    assert!(!task.is_overdue(now));

    task.status = Status::InProgress;
    task.due_date = None;
    assert!(!task.is_overdue(now));

    task.due_date = Some(now);
    assert!(!task.is_overdue(now));
  }

  #[test]
  fn status_cycle_wraps_around() {
    assert_eq!(
      Status::Pending.next(),
      Status::InProgress
    );
    assert_eq!(
      Status::InProgress.next(),
      Status::Completed
    );
    assert_eq!(
      Status::Completed.next(),
      Status::Pending
    );
  }

  #[test]
  fn enums_parse_their_wire_names() {
    assert_eq!(
      "in_progress".parse::<Status>(),
      Ok(Status::InProgress)
    );
    assert_eq!(
      "google_calendar"
        .parse::<Source>(),
      Ok(Source::GoogleCalendar)
    );
    assert!(
      "done".parse::<Status>().is_err()
    );
  }
}
