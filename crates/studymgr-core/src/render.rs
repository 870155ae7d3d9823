use std::io::{
  IsTerminal,
  Write
};

use anyhow::anyhow;
use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::calendar::MarkedDates;
use crate::config::Config;
use crate::datetime::{
  format_day,
  format_local
};
use crate::heatmap::{
  HeatBucket,
  IntensityBand
};
use crate::stats::{
  DashboardSummary,
  Stats
};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color_cfg = cfg
      .get("color")
      .unwrap_or_else(|| "on".to_string());
    let color = match color_cfg
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        std::io::stdout().is_terminal()
      }
      | "off" | "no" | "false" | "0" => {
        false
      }
      | other => {
        return Err(anyhow!(
          "invalid color setting: \
           {other}"
        ));
      }
    };

    Ok(Self { color })
  }

  pub fn plain() -> Self {
    Self { color: false }
  }

  #[tracing::instrument(skip_all)]
  pub fn write_task_table<W: Write>(
    &self,
    out: W,
    tasks: &[Task],
    now: DateTime<Utc>,
    tz: &Tz
  ) -> anyhow::Result<()> {
    let rows: Vec<Vec<String>> = tasks
      .iter()
      .map(|task| {
        let due = task
          .due_date
          .map(|due| format_local(due, tz))
          .unwrap_or_else(|| {
            "No date".to_string()
          });
        let due = if task.is_overdue(now)
        {
          self.paint(&due, "31")
        } else {
          due
        };

        vec![
          task.id.to_string(),
          due,
          self.paint(
            task.priority.label(),
            task.priority.ansi()
          ),
          self.paint(
            task.status.label(),
            task.status.ansi()
          ),
          task.source.label().to_string(),
          task.title.clone(),
        ]
      })
      .collect();

    write_table(
      out,
      &["ID", "Due", "Pri", "Status", "Source", "Title"],
      &rows
    )
  }

  pub fn write_marked_dates<W: Write>(
    &self,
    mut out: W,
    marks: &MarkedDates
  ) -> anyhow::Result<()> {
    for (day, mark) in marks {
      let dot = match mark.dot {
        | Some(dot) => {
          self.paint("●", dot.ansi())
        }
        | None if mark.marked => {
          "○".to_string()
        }
        | None => " ".to_string()
      };
      let selected = if mark.selected {
        self.paint("selected", "7")
      } else {
        String::new()
      };
      writeln!(
        out,
        "{} {dot} {selected}",
        format_day(*day)
      )?;
    }
    Ok(())
  }

  pub fn write_stats<W: Write>(
    &self,
    mut out: W,
    stats: &Stats,
    now: DateTime<Utc>,
    tz: &Tz
  ) -> anyhow::Result<()> {
    writeln!(
      out,
      "Completion  {}%",
      stats.completion_rate
    )?;
    writeln!(
      out,
      "Completed   {}",
      stats.completed_count
    )?;
    writeln!(
      out,
      "Pending     {}",
      stats.pending_count
    )?;
    writeln!(
      out,
      "Total       {}",
      stats.total
    )?;
    writeln!(out)?;

    if stats.upcoming_tasks.is_empty() {
      writeln!(out, "No upcoming deadlines")?;
      return Ok(());
    }
    writeln!(out, "Upcoming deadlines")?;
    self.write_task_table(
      out,
      &stats.upcoming_tasks,
      now,
      tz
    )
  }

  /// One row per week, oldest first.
  pub fn write_heatmap<W: Write>(
    &self,
    mut out: W,
    buckets: &[HeatBucket]
  ) -> anyhow::Result<()> {
    for week in buckets.chunks(7) {
      let Some(first) = week.first()
      else {
        continue;
      };
      write!(
        out,
        "{} ",
        format_day(first.date)
      )?;
      for bucket in week {
        write!(
          out,
          "{}",
          self.heat_cell(bucket.band)
        )?;
      }
      let total: usize = week
        .iter()
        .map(|bucket| bucket.count)
        .sum();
      writeln!(out, "  {total}")?;
    }
    Ok(())
  }

  pub fn write_dashboard<W: Write>(
    &self,
    mut out: W,
    summary: &DashboardSummary,
    due_soon: &[Task],
    now: DateTime<Utc>,
    tz: &Tz
  ) -> anyhow::Result<()> {
    writeln!(
      out,
      "Total tasks      {} ({} pending)",
      summary.total, summary.pending
    )?;
    writeln!(
      out,
      "In progress      {}",
      summary.in_progress
    )?;
    writeln!(
      out,
      "Completed today  {}",
      summary.completed_today
    )?;
    writeln!(
      out,
      "Due soon         {}",
      summary.due_soon
    )?;
    writeln!(
      out,
      "From Canvas      {}",
      summary.from_canvas
    )?;

    if !due_soon.is_empty() {
      writeln!(out)?;
      writeln!(out, "Due soon")?;
      self.write_task_table(
        out, due_soon, now, tz
      )?;
    }
    Ok(())
  }

  pub fn write_day_header<W: Write>(
    &self,
    out: W,
    day: NaiveDate,
    count: usize
  ) -> anyhow::Result<()> {
    self.write_list_header(
      out,
      &format!(
        "Tasks for {}",
        day.format("%A, %B %-d")
      ),
      count
    )
  }

  pub fn write_list_header<W: Write>(
    &self,
    mut out: W,
    title: &str,
    count: usize
  ) -> anyhow::Result<()> {
    let plural =
      if count == 1 { "" } else { "s" };
    writeln!(
      out,
      "{}: {count} task{plural}",
      self.paint(title, "1")
    )?;
    Ok(())
  }

  fn heat_cell(
    &self,
    band: IntensityBand
  ) -> String {
    if self.color {
      return self.paint("  ", band.ansi());
    }
    match band {
      | IntensityBand::None => "·",
      | IntensityBand::Low => "░",
      | IntensityBand::Medium => "▒",
      | IntensityBand::High => "▓",
      | IntensityBand::Peak => "█"
    }
    .to_string()
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

/// Left-aligned columns sized to their widest visible cell, a dashed rule
/// under the header, single-space gutters.
fn write_table<W: Write>(
  mut out: W,
  headers: &[&str],
  rows: &[Vec<String>]
) -> anyhow::Result<()> {
  let widths: Vec<usize> = headers
    .iter()
    .enumerate()
    .map(|(col, header)| {
      rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(|cell| visible_width(cell))
        .fold(visible_width(header), usize::max)
    })
    .collect();

  let header: Vec<String> =
    headers.iter().map(|h| h.to_string()).collect();
  let rule: Vec<String> =
    widths.iter().map(|w| "-".repeat(*w)).collect();

  for line in [&header, &rule].into_iter().chain(rows) {
    let cells: Vec<String> = line
      .iter()
      .zip(&widths)
      .map(|(cell, width)| pad(cell, *width))
      .collect();
    writeln!(out, "{}", cells.join(" ").trim_end())?;
  }
  Ok(())
}

fn pad(cell: &str, width: usize) -> String {
  let fill =
    width.saturating_sub(visible_width(cell));
  format!("{cell}{:fill$}", "")
}

/// Terminal columns taken by `text`, ignoring `ESC ... m` color sequences.
fn visible_width(text: &str) -> usize {
  let mut rest = text;
  let mut width = 0;
  while let Some(esc) = rest.find('\x1b') {
    width += UnicodeWidthStr::width(&rest[..esc]);
    rest = match rest[esc..].find('m') {
      | Some(end) => &rest[esc + end + 1..],
      | None => ""
    };
  }
  width + UnicodeWidthStr::width(rest)
}
