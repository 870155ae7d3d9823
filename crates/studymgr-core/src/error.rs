//! Errors raised while turning raw records into a task collection.
//!
//! Only required fields produce errors. Optional fields that cannot be
//! interpreted (an unparseable `due_date`, for example) are dropped by the
//! loader instead.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Error)]
pub enum TaskError {
  /// The input is neither a JSON array nor JSON lines of objects.
  #[error(
    "task collection must be a JSON \
     array of task objects"
  )]
  NotACollection,

  /// A record at `index` is not a JSON object.
  #[error(
    "task record {index} is not an \
     object"
  )]
  NotAnObject { index: usize },

  #[error(
    "task record {index} is missing \
     required field `{field}`"
  )]
  MissingField {
    index: usize,
    field: &'static str
  },

  #[error(
    "task record {index} has invalid \
     `{field}`: {value}"
  )]
  InvalidField {
    index: usize,
    field: &'static str,
    value: String
  },

  #[error(
    "task record {index} has an empty \
     `title`"
  )]
  EmptyTitle { index: usize },

  #[error(
    "duplicate task id in collection: \
     {id}"
  )]
  DuplicateId { id: TaskId },

  #[error(
    "task {id} has `updated_at` before \
     `created_at`"
  )]
  UpdatedBeforeCreated { id: TaskId },

  #[error(
    "failed parsing task json on line \
     {line}"
  )]
  Json {
    line:   usize,
    #[source]
    source: serde_json::Error
  }
}
