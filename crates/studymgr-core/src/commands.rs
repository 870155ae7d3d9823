use std::io::{
  self,
  Write
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Utc
};
use tracing::{
  debug,
  info,
  instrument
};

use crate::cli::Command;
use crate::config::Config;
use crate::datetime::parse_day_expr;
use crate::engine::TaskViewEngine;
use crate::heatmap::MAX_WINDOW_DAYS;
use crate::render::Renderer;
use crate::task::{
  Status,
  Task
};
use crate::view::{
  FilterKey,
  ViewSpec
};

/// Everything a command needs besides its own arguments.
pub struct Session<'a> {
  pub cfg:      &'a Config,
  pub engine:   &'a TaskViewEngine,
  pub renderer: &'a Renderer,
  pub tasks:    &'a [Task],
  pub now:      DateTime<Utc>
}

/// Commands that never look at the task snapshot.
pub fn needs_tasks(
  command: &Command
) -> bool {
  !matches!(
    command,
    Command::NextStatus { .. }
      | Command::Show
  )
}

#[instrument(skip(session, out))]
pub fn dispatch<W: Write>(
  session: &Session<'_>,
  command: &Command,
  out: W
) -> anyhow::Result<()> {
  debug!(
    tasks = session.tasks.len(),
    now = %session.now,
    "dispatching command"
  );

  match command {
    | Command::List { filter, day } => {
      cmd_list(
        session,
        filter,
        day.as_deref(),
        out
      )
    }
    | Command::Calendar { day } => {
      cmd_calendar(
        session,
        day.as_deref(),
        out
      )
    }
    | Command::Stats { limit } => {
      cmd_stats(session, *limit, out)
    }
    | Command::Heatmap { days } => {
      cmd_heatmap(session, *days, out)
    }
    | Command::Dashboard => {
      cmd_dashboard(session, out)
    }
    | Command::NextStatus { status } => {
      cmd_next_status(status, out)
    }
    | Command::Show => {
      cmd_show(session.cfg, out)
    }
  }
}

pub fn dispatch_stdout(
  session: &Session<'_>,
  command: &Command
) -> anyhow::Result<()> {
  dispatch(
    session,
    command,
    io::stdout().lock()
  )
}

fn cmd_list<W: Write>(
  session: &Session<'_>,
  filter: &str,
  day: Option<&str>,
  mut out: W
) -> anyhow::Result<()> {
  info!(filter, ?day, "command list");

  let mut spec = ViewSpec::new(
    FilterKey::parse(filter),
    session.now
  );
  if let Some(raw) = day {
    spec = spec.on_day(parse_day_expr(
      raw,
      session.now,
      session.engine.timezone()
    )?);
  }

  let rows = session
    .engine
    .filter_and_sort(session.tasks, &spec);
  session.renderer.write_list_header(
    &mut out,
    spec.filter.label(),
    rows.len()
  )?;
  session.renderer.write_task_table(
    out,
    &rows,
    session.now,
    session.engine.timezone()
  )
}

fn cmd_calendar<W: Write>(
  session: &Session<'_>,
  day: Option<&str>,
  mut out: W
) -> anyhow::Result<()> {
  info!(?day, "command calendar");

  let tz = session.engine.timezone();
  let selected = match day {
    | Some(raw) => {
      parse_day_expr(raw, session.now, tz)?
    }
    | None => {
      session.engine.today(session.now)
    }
  };

  let marks =
    session.engine.build_marked_dates(
      session.tasks,
      Some(selected),
      session.now
    );
  session
    .renderer
    .write_marked_dates(&mut out, &marks)?;
  writeln!(out)?;

  let spec = ViewSpec::new(
    FilterKey::All,
    session.now
  )
  .on_day(selected);
  let day_tasks = session
    .engine
    .filter_and_sort(session.tasks, &spec);
  session.renderer.write_day_header(
    &mut out,
    selected,
    day_tasks.len()
  )?;
  if day_tasks.is_empty() {
    return Ok(());
  }
  session.renderer.write_task_table(
    out,
    &day_tasks,
    session.now,
    tz
  )
}

fn cmd_stats<W: Write>(
  session: &Session<'_>,
  limit: Option<usize>,
  out: W
) -> anyhow::Result<()> {
  info!(?limit, "command stats");

  let stats = match limit {
    | Some(limit) => {
      crate::stats::compute_stats_with_limit(
        session.tasks,
        session.now,
        limit
      )
    }
    | None => {
      session
        .engine
        .compute_stats(
          session.tasks,
          session.now
        )
    }
  };
  session.renderer.write_stats(
    out,
    &stats,
    session.now,
    session.engine.timezone()
  )
}

fn cmd_heatmap<W: Write>(
  session: &Session<'_>,
  days: Option<u32>,
  out: W
) -> anyhow::Result<()> {
  let window = days.unwrap_or(
    session.engine.settings().heatmap_days
  );
  info!(window, "command heatmap");
  if window > MAX_WINDOW_DAYS {
    return Err(anyhow!(
      "--days {window}: at most \
       {MAX_WINDOW_DAYS}"
    ));
  }

  let buckets =
    session.engine.build_heatmap(
      session.tasks,
      window,
      session.engine.today(session.now)
    );
  session
    .renderer
    .write_heatmap(out, &buckets)
}

fn cmd_dashboard<W: Write>(
  session: &Session<'_>,
  out: W
) -> anyhow::Result<()> {
  info!("command dashboard");

  let summary = session
    .engine
    .dashboard(session.tasks, session.now);
  let due_soon = session
    .engine
    .due_soon(session.tasks, session.now);
  session.renderer.write_dashboard(
    out,
    &summary,
    &due_soon,
    session.now,
    session.engine.timezone()
  )
}

fn cmd_next_status<W: Write>(
  raw: &str,
  mut out: W
) -> anyhow::Result<()> {
  let status = raw
    .to_ascii_lowercase()
    .parse::<Status>()
    .map_err(|_| {
      anyhow!(
        "unknown status: {raw} \
         (expected pending, \
         in_progress or completed)"
      )
    })?;
  writeln!(out, "{}", status.next())
    .context("failed writing status")?;
  Ok(())
}

fn cmd_show<W: Write>(
  cfg: &Config,
  mut out: W
) -> anyhow::Result<()> {
  for (key, value) in cfg.iter() {
    writeln!(out, "{key}={value}")?;
  }
  for file in &cfg.sources {
    writeln!(
      out,
      "# loaded {}",
      file.display()
    )?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    Session,
    dispatch
  };
  use crate::cli::Command;
  use crate::config::Config;
  use crate::engine::TaskViewEngine;
  use crate::render::Renderer;
  use crate::task::Task;

  fn now() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 1, 3, 9, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn run(
    tasks: &[Task],
    command: Command
  ) -> String {
    let cfg = Config::default();
    let engine =
      TaskViewEngine::default();
    let renderer = Renderer::plain();
    let session = Session {
      cfg: &cfg,
      engine: &engine,
      renderer: &renderer,
      tasks,
      now: now()
    };
    let mut out = Vec::new();
    dispatch(&session, &command, &mut out)
      .expect("command succeeds");
    String::from_utf8(out).expect("utf8")
  }

  #[test]
  fn heatmap_rejects_window_above_limit() {
    let cfg = Config::default();
    let engine =
      TaskViewEngine::default();
    let renderer = Renderer::plain();
    let session = Session {
      cfg: &cfg,
      engine: &engine,
      renderer: &renderer,
      tasks: &[],
      now: now()
    };

    let err = dispatch(
      &session,
      &Command::Heatmap {
        days: Some(4_000_000_000)
      },
      Vec::new()
    )
    .expect_err("window too long");
    assert!(
      err.to_string().contains("at most")
    );

    let text = run(&[], Command::Heatmap {
      days: Some(14)
    });
    assert_eq!(text.lines().count(), 2);
  }

  #[test]
  fn next_status_prints_successor() {
    assert_eq!(
      run(&[], Command::NextStatus {
        status: "in_progress".to_string()
      }),
      "completed\n"
    );
  }

  #[test]
  fn calendar_lists_selected_day_tasks()
  {
    let mut quiz = Task::new_manual(
      "q",
      "Quiz",
      now() - Duration::days(1)
    );
    quiz.due_date =
      Some(now() + Duration::days(1));

    let text = run(&[quiz], Command::Calendar {
      day: Some("tomorrow".to_string())
    });
    assert!(text.contains(
      "Tasks for Thursday, January 4: 1 task"
    ));
    assert!(text.contains("Quiz"));
  }

  #[test]
  fn list_with_unknown_filter_shows_everything()
   {
    let tasks = vec![
      Task::new_manual("a", "Alpha", now()),
      Task::new_manual("b", "Beta", now()),
    ];

    let text = run(&tasks, Command::List {
      filter: "starred".to_string(),
      day:    None
    });
    assert!(
      text.starts_with("starred: 2 tasks\n")
    );
    assert!(text.contains("Alpha"));
    assert!(text.contains("Beta"));
  }

  #[test]
  fn list_header_names_the_filter() {
    let mut done =
      Task::new_manual("d", "Done", now());
    done.status =
      crate::task::Status::Completed;
    let tasks = vec![
      Task::new_manual("a", "Alpha", now()),
      done,
    ];

    let text = run(&tasks, Command::List {
      filter: "in_progress".to_string(),
      day:    None
    });
    assert!(
      text.starts_with("In Progress: 0 tasks\n")
    );

    let text = run(&tasks, Command::List {
      filter: "completed".to_string(),
      day:    None
    });
    assert!(
      text.starts_with("Completed: 1 task\n")
    );
    assert!(text.contains("Done"));
    assert!(!text.contains("Alpha"));
  }
}
