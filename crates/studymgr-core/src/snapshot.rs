use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::{
  DateTime,
  Utc
};
use chrono_tz::Tz;
use serde_json::{
  Map,
  Value
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::parse_timestamp;
use crate::error::TaskError;
use crate::task::{
  Task,
  TaskId
};

type Record = Map<String, Value>;

/// Reads a task collection exported by the task store.
#[tracing::instrument(skip(path, tz), fields(file = %path.display()))]
pub fn load(
  path: &Path,
  tz: &Tz
) -> anyhow::Result<Vec<Task>> {
  let text = fs::read_to_string(path)
    .with_context(|| {
      format!(
        "failed to read {}",
        path.display()
      )
    })?;
  let tasks = parse_tasks(&text, tz)
    .with_context(|| {
      format!(
        "failed to load tasks from {}",
        path.display()
      )
    })?;
  info!(
    count = tasks.len(),
    "loaded task snapshot"
  );
  Ok(tasks)
}

/// Decodes a JSON array of task objects, or one object per line.
///
/// Missing or invalid required fields are errors. An unreadable `due_date`
/// is treated as no deadline.
pub fn parse_tasks(
  text: &str,
  tz: &Tz
) -> Result<Vec<Task>, TaskError> {
  let records = split_records(text)?;
  debug!(
    count = records.len(),
    "decoding task records"
  );

  let mut seen = HashSet::new();
  let mut tasks =
    Vec::with_capacity(records.len());
  for (index, value) in
    records.into_iter().enumerate()
  {
    let Value::Object(record) = value
    else {
      return Err(
        TaskError::NotAnObject { index }
      );
    };
    let task =
      decode_task(index, &record, tz)?;
    if !seen.insert(task.id.clone()) {
      return Err(TaskError::DuplicateId {
        id: task.id
      });
    }
    tasks.push(task);
  }

  Ok(tasks)
}

fn split_records(
  text: &str
) -> Result<Vec<Value>, TaskError> {
  let trimmed = text.trim();
  if trimmed.is_empty() {
    return Ok(Vec::new());
  }

  if trimmed.starts_with('{') {
    let mut out = Vec::new();
    for (idx, line) in
      text.lines().enumerate()
    {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      let value = serde_json::from_str(
        line
      )
      .map_err(|source| {
        TaskError::Json {
          line: idx + 1,
          source
        }
      })?;
      out.push(value);
    }
    return Ok(out);
  }

  match serde_json::from_str(trimmed)
    .map_err(|source| TaskError::Json {
      line: 1,
      source
    })? {
    | Value::Array(items) => Ok(items),
    | _ => Err(TaskError::NotACollection)
  }
}

fn decode_task(
  index: usize,
  record: &Record,
  tz: &Tz
) -> Result<Task, TaskError> {
  let id = TaskId::new(
    required_id(index, record)?
  );

  let title = required_str(
    index, record, "title"
  )?;
  if title.trim().is_empty() {
    return Err(TaskError::EmptyTitle {
      index
    });
  }

  let created_at = required_timestamp(
    index,
    record,
    "created_at",
    tz
  )?;
  let updated_at = required_timestamp(
    index,
    record,
    "updated_at",
    tz
  )?;
  if updated_at < created_at {
    return Err(
      TaskError::UpdatedBeforeCreated {
        id
      }
    );
  }

  let due_date = optional_str(
    record, "due_date"
  )
  .and_then(|raw| {
    let parsed =
      parse_timestamp(raw, tz);
    if parsed.is_none() {
      warn!(
        index,
        id = %id,
        value = raw,
        "unparseable due_date; treating as absent"
      );
    }
    parsed
  });

  Ok(Task {
    title: title.to_string(),
    description: optional_str(
      record,
      "description"
    )
    .map(ToString::to_string),
    due_date,
    priority: required_enum(
      index, record, "priority"
    )?,
    status: required_enum(
      index, record, "status"
    )?,
    source: required_enum(
      index, record, "source"
    )?,
    created_at,
    updated_at,
    user_id: optional_str(
      record, "user_id"
    )
    .map(ToString::to_string),
    canvas_assignment_id:
      optional_scalar(
        record,
        "canvas_assignment_id"
      ),
    google_event_id: optional_str(
      record,
      "google_event_id"
    )
    .map(ToString::to_string),
    id
  })
}

fn required_id(
  index: usize,
  record: &Record
) -> Result<String, TaskError> {
  match record.get("id") {
    | None | Some(Value::Null) => {
      Err(TaskError::MissingField {
        index,
        field: "id"
      })
    }
    | Some(Value::String(raw))
      if !raw.trim().is_empty() =>
    {
      Ok(raw.clone())
    }
    | Some(Value::Number(n)) => {
      Ok(n.to_string())
    }
    | Some(other) => {
      Err(TaskError::InvalidField {
        index,
        field: "id",
        value: other.to_string()
      })
    }
  }
}

fn required_str<'a>(
  index: usize,
  record: &'a Record,
  field: &'static str
) -> Result<&'a str, TaskError> {
  match record.get(field) {
    | None | Some(Value::Null) => {
      Err(TaskError::MissingField {
        index,
        field
      })
    }
    | Some(Value::String(raw)) => {
      Ok(raw.as_str())
    }
    | Some(other) => {
      Err(TaskError::InvalidField {
        index,
        field,
        value: other.to_string()
      })
    }
  }
}

fn required_enum<T: FromStr>(
  index: usize,
  record: &Record,
  field: &'static str
) -> Result<T, TaskError> {
  let raw =
    required_str(index, record, field)?;
  raw.parse::<T>().map_err(|_| {
    TaskError::InvalidField {
      index,
      field,
      value: raw.to_string()
    }
  })
}

fn required_timestamp(
  index: usize,
  record: &Record,
  field: &'static str,
  tz: &Tz
) -> Result<DateTime<Utc>, TaskError> {
  let raw =
    required_str(index, record, field)?;
  parse_timestamp(raw, tz).ok_or_else(
    || TaskError::InvalidField {
      index,
      field,
      value: raw.to_string()
    }
  )
}

fn optional_str<'a>(
  record: &'a Record,
  field: &str
) -> Option<&'a str> {
  record
    .get(field)
    .and_then(Value::as_str)
    .filter(|raw| !raw.trim().is_empty())
}

fn optional_scalar(
  record: &Record,
  field: &str
) -> Option<String> {
  match record.get(field)? {
    | Value::String(raw)
      if !raw.trim().is_empty() =>
    {
      Some(raw.clone())
    }
    | Value::Number(n) => {
      Some(n.to_string())
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::parse_tasks;
  use crate::error::TaskError;
  use crate::task::{
    Priority,
    Source,
    Status
  };

  const ARRAY: &str = r#"[
    {
      "id": "6f1c",
      "user_id": "u1",
      "title": "Lab report",
      "description": "chem",
      "due_date": "2024-01-10T23:59:00+00:00",
      "priority": "high",
      "status": "in_progress",
      "source": "canvas",
      "canvas_assignment_id": 991,
      "created_at": "2024-01-01T08:00:00Z",
      "updated_at": "2024-01-02T08:00:00Z"
    },
    {
      "id": "7a2d",
      "title": "Read ch. 4",
      "due_date": null,
      "priority": "low",
      "status": "pending",
      "source": "manual",
      "created_at": "2024-01-01 08:00:00+00",
      "updated_at": "2024-01-01 08:00:00+00"
    }
  ]"#;

  fn record(
    overrides: &[(&str, &str)]
  ) -> String {
    let mut map = serde_json::json!({
      "id": "x",
      "title": "t",
      "priority": "medium",
      "status": "pending",
      "source": "manual",
      "created_at": "2024-01-01T00:00:00Z",
      "updated_at": "2024-01-01T00:00:00Z"
    });
    for (key, value) in overrides {
      map[*key] = serde_json::Value::String(
        (*value).to_string()
      );
    }
    format!("[{map}]")
  }

  #[test]
  fn decodes_store_rows() {
    let tasks =
      parse_tasks(ARRAY, &chrono_tz::UTC)
        .expect("valid snapshot");

    assert_eq!(tasks.len(), 2);
    let lab = &tasks[0];
    assert_eq!(lab.id.as_str(), "6f1c");
    assert_eq!(lab.priority, Priority::High);
    assert_eq!(
      lab.status,
      Status::InProgress
    );
    assert_eq!(lab.source, Source::Canvas);
    assert_eq!(
      lab.canvas_assignment_id.as_deref(),
      Some("991")
    );
    assert_eq!(
      lab.due_date,
      Utc
        .with_ymd_and_hms(
          2024, 1, 10, 23, 59, 0
        )
        .single()
    );
    assert_eq!(tasks[1].due_date, None);
    assert_eq!(tasks[1].description, None);
  }

  #[test]
  fn accepts_json_lines() {
    let lines = [
      r#"{"id":"a","title":"A","priority":"low","status":"pending","source":"manual","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#,
      "",
      r#"{"id":"b","title":"B","priority":"low","status":"completed","source":"google_calendar","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-03T00:00:00Z"}"#
    ]
    .join("\n");

    let tasks =
      parse_tasks(&lines, &chrono_tz::UTC)
        .expect("valid jsonl");
    assert_eq!(tasks.len(), 2);
    assert_eq!(
      tasks[1].source,
      Source::GoogleCalendar
    );
  }

  #[test]
  fn empty_text_is_an_empty_collection()
  {
    assert!(
      parse_tasks("  \n", &chrono_tz::UTC)
        .expect("empty")
        .is_empty()
    );
  }

  #[test]
  fn bad_due_date_becomes_absent() {
    let tasks = parse_tasks(
      &record(&[("due_date", "soon")]),
      &chrono_tz::UTC
    )
    .expect("lenient due date");
    assert_eq!(tasks[0].due_date, None);
  }

  #[test]
  fn non_array_input_is_rejected() {
    let err = parse_tasks(
      r#""tasks""#,
      &chrono_tz::UTC
    )
    .expect_err("scalar input");
    assert!(matches!(
      err,
      TaskError::NotACollection
    ));

    let err = parse_tasks(
      "[1]",
      &chrono_tz::UTC
    )
    .expect_err("scalar record");
    assert!(matches!(
      err,
      TaskError::NotAnObject { index: 0 }
    ));
  }

  #[test]
  fn missing_required_field_names_it() {
    let text = r#"[{"id":"a","title":"A","priority":"low","status":"pending","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}]"#;
    let err = parse_tasks(
      text,
      &chrono_tz::UTC
    )
    .expect_err("missing source");

    assert!(matches!(
      err,
      TaskError::MissingField {
        index: 0,
        field: "source"
      }
    ));
    assert!(
      err.to_string().contains("`source`")
    );
  }

  #[test]
  fn invalid_values_are_rejected() {
    let cases = [
      ("status", "done"),
      ("priority", "urgent"),
      ("created_at", "yesterday")
    ];
    for (field, value) in cases {
      let err = parse_tasks(
        &record(&[(field, value)]),
        &chrono_tz::UTC
      )
      .expect_err(field);
      assert!(
        matches!(
          &err,
          TaskError::InvalidField { field: f, .. } if *f == field
        ),
        "{field}: {err}"
      );
    }

    assert!(matches!(
      parse_tasks(
        &record(&[("title", "  ")]),
        &chrono_tz::UTC
      ),
      Err(TaskError::EmptyTitle {
        index: 0
      })
    ));
    assert!(matches!(
      parse_tasks(
        &record(&[(
          "updated_at",
          "2023-12-31T00:00:00Z"
        )]),
        &chrono_tz::UTC
      ),
      Err(
        TaskError::UpdatedBeforeCreated { .. }
      )
    ));
  }

  #[test]
  fn duplicate_ids_are_rejected() {
    let text = format!(
      "[{0},{0}]",
      record(&[])
        .trim_start_matches('[')
        .trim_end_matches(']')
    );
    let err = parse_tasks(
      &text,
      &chrono_tz::UTC
    )
    .expect_err("duplicate");
    assert!(matches!(
      err,
      TaskError::DuplicateId { .. }
    ));
  }
}
