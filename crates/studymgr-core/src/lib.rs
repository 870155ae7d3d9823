pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod engine;
pub mod error;
pub mod heatmap;
pub mod palette;
pub mod render;
pub mod snapshot;
pub mod stats;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use engine::{
  EngineSettings,
  TaskViewEngine,
  TaskViews
};
pub use error::TaskError;
pub use task::{
  Priority,
  Source,
  Status,
  Task,
  TaskId
};
pub use view::{
  FilterKey,
  ViewSpec
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting studymgr"
  );
  debug!(
    positional = pre.rc_overrides.len(),
    flags = cli.rc_overrides.len(),
    "rc overrides"
  );

  let mut cfg =
    config::Config::load(cli.config.as_deref())?;
  let flag_overrides = cli
    .rc_overrides
    .into_iter()
    .map(|cli::KeyVal { key, value }| (key, value));
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(flag_overrides)
  );

  let engine = TaskViewEngine::new(
    cfg
      .engine_settings()
      .context("invalid engine settings")?
  );
  let renderer =
    render::Renderer::new(&cfg)?;

  let wall_clock = Utc::now();
  let now = match cli.now.as_deref() {
    | Some(raw) => {
      datetime::parse_date_expr(
        raw,
        wall_clock,
        engine.timezone()
      )
      .context("invalid --now")?
    }
    | None => wall_clock
  };

  let command = cli
    .command
    .unwrap_or(cli::Command::Dashboard);

  let tasks = if commands::needs_tasks(
    &command
  ) {
    let path = cli
      .tasks
      .or_else(|| cfg.tasks_location())
      .ok_or_else(|| {
        anyhow!(
          "no task snapshot given; \
           pass --tasks or set \
           tasks.location"
        )
      })?;
    snapshot::load(
      &path,
      engine.timezone()
    )?
  } else {
    Vec::new()
  };

  commands::dispatch_stdout(
    &commands::Session {
      cfg:      &cfg,
      engine:   &engine,
      renderer: &renderer,
      tasks:    &tasks,
      now
    },
    &command
  )?;

  info!("done");
  Ok(())
}
