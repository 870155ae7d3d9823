//! Daily completion activity over a fixed window of days.
//!
//! Completion day is read from `updated_at`: a completed task that is edited
//! later moves to the day of the edit. Records carry no dedicated completion
//! timestamp.

use std::collections::BTreeMap;

use chrono::{
  Days,
  NaiveDate
};
use chrono_tz::Tz;
use serde::Serialize;

use crate::datetime::day_key;
use crate::task::Task;

pub const DEFAULT_WINDOW_DAYS: u32 = 90;
/// Longest window, about ten years. Longer requests are cut to it.
pub const MAX_WINDOW_DAYS: u32 = 3660;

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
#[serde(into = "u8")]
pub enum IntensityBand {
  None,
  Low,
  Medium,
  High,
  Peak
}

impl IntensityBand {
  pub fn from_count(count: usize) -> Self {
    match count {
      | 0 => Self::None,
      | 1..=2 => Self::Low,
      | 3..=4 => Self::Medium,
      | 5..=6 => Self::High,
      | _ => Self::Peak
    }
  }

  pub fn level(self) -> u8 {
    self as u8
  }
}

impl From<IntensityBand> for u8 {
  fn from(band: IntensityBand) -> u8 {
    band.level()
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct HeatBucket {
  pub date:  NaiveDate,
  pub count: usize,
  pub band:  IntensityBand
}

/// One bucket per day for `window_days` days ending at `end_date`.
///
/// `window_days` is capped at [`MAX_WINDOW_DAYS`]. The window also never
/// starts before [`NaiveDate::MIN`], so an `end_date` within that many days
/// of the first representable date yields a shorter list.
#[tracing::instrument(skip(tasks, tz), fields(count = tasks.len()))]
pub fn build_heatmap(
  tasks: &[Task],
  window_days: u32,
  end_date: NaiveDate,
  tz: &Tz
) -> Vec<HeatBucket> {
  if window_days == 0 {
    return Vec::new();
  }
  if window_days > MAX_WINDOW_DAYS {
    tracing::warn!(
      requested = window_days,
      max = MAX_WINDOW_DAYS,
      "heatmap window capped"
    );
  }
  let window_days =
    window_days.min(MAX_WINDOW_DAYS);

  let start_date = end_date
    .checked_sub_days(Days::new(
      u64::from(window_days) - 1
    ))
    .unwrap_or(NaiveDate::MIN);

  let mut activity: BTreeMap<
    NaiveDate,
    usize
  > = BTreeMap::new();
  for task in tasks
    .iter()
    .filter(|task| task.is_completed())
  {
    let day =
      day_key(task.updated_at, tz);
    if day >= start_date
      && day <= end_date
    {
      *activity.entry(day).or_default() +=
        1;
    }
  }

  let buckets: Vec<HeatBucket> =
    start_date
      .iter_days()
      .take_while(|day| *day <= end_date)
      .map(|date| {
        let count = activity
          .get(&date)
          .copied()
          .unwrap_or(0);
        HeatBucket {
          date,
          count,
          band: IntensityBand::from_count(
            count
          )
        }
      })
      .collect();

  tracing::debug!(
    buckets = buckets.len(),
    active_days = activity.len(),
    "built heatmap"
  );
  buckets
}
