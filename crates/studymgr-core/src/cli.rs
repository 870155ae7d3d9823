use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
  pub cleaned_args: Vec<OsString>,
  pub rc_overrides: Vec<(String, String)>
}

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) = s
      .split_once('=')
      .ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "studymgr",
  version,
  about = "Task views for a student planner: lists, calendar marks, progress stats and activity heatmap",
  disable_help_subcommand = true
)]
pub struct GlobalCli {
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append
  )]
  pub rc_overrides: Vec<KeyVal>,

  /// rc file to read instead of `~/.studymgrrc`
  #[arg(long = "config")]
  pub config: Option<PathBuf>,

  /// Task snapshot (JSON array or JSON lines)
  #[arg(long = "tasks")]
  pub tasks: Option<PathBuf>,

  /// Reference time for overdue and upcoming checks
  #[arg(long = "now")]
  pub now: Option<String>,

  #[command(subcommand)]
  pub command: Option<Command>
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// Filtered task list, earliest deadline first
  List {
    #[arg(short = 'f', long = "filter", default_value = "all")]
    filter: String,

    /// Only tasks due on this day
    #[arg(long = "day")]
    day: Option<String>
  },

  /// Calendar marks and the tasks due on the selected day
  Calendar {
    #[arg(long = "day")]
    day: Option<String>
  },

  /// Completion rate and the next deadlines
  Stats {
    #[arg(long = "limit")]
    limit: Option<usize>
  },

  /// Completed tasks per day
  Heatmap {
    #[arg(long = "days")]
    days: Option<u32>
  },

  /// Summary cards and tasks due soon
  Dashboard,

  /// Status that follows STATUS in the toggle cycle
  NextStatus { status: String },

  /// Effective configuration
  Show
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `-v`/`-q`.
pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let level = match (quiet, verbose) {
    | (2.., _) => "error",
    | (1, _) | (0, 0) => "warn",
    | (0, 1) => "info",
    | (0, 2) => "debug",
    | (0, _) => "trace"
  };

  let filter = match EnvFilter::try_from_default_env() {
    | Ok(filter) => filter,
    | Err(_) => EnvFilter::try_new(level)
      .map_err(|e| anyhow!("bad log filter {level}: {e}"))?
  };

  let installed = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .with_target(true)
    .try_init();
  if installed.is_err() {
    debug!("subscriber already installed");
  }

  Ok(())
}

/// Splits positional `rc.key=value` / `rc.key:value` words out of the raw
/// arguments; everything else, including the binary name, goes to clap.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(
  raw: &[OsString]
) -> anyhow::Result<PreprocessedArgs> {
  let mut out = PreprocessedArgs {
    cleaned_args: Vec::with_capacity(raw.len()),
    rc_overrides: Vec::new()
  };

  for (idx, arg) in raw.iter().enumerate() {
    let positional_rc = (idx > 0)
      .then(|| arg.to_str())
      .flatten()
      .and_then(|word| word.strip_prefix("rc."))
      .and_then(|rest| {
        rest
          .split_once('=')
          .or_else(|| rest.split_once(':'))
      });

    match positional_rc {
      | Some((key, value)) => {
        debug!(key, value, "positional rc override");
        out
          .rc_overrides
          .push((format!("rc.{key}"), value.to_string()));
      }
      | None => out.cleaned_args.push(arg.clone())
    }
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use std::ffi::OsString;

  use clap::Parser;

  use super::{
    Command,
    GlobalCli,
    preprocess_args
  };

  fn args(raw: &[&str]) -> Vec<OsString> {
    raw.iter().map(OsString::from).collect()
  }

  #[test]
  fn positional_rc_overrides_are_extracted()
  {
    let pre = preprocess_args(&args(&[
      "studymgr",
      "rc.heatmap.days=30",
      "list",
      "rc.timezone:UTC"
    ]))
    .expect("preprocess");

    assert_eq!(pre.rc_overrides, vec![
      (
        "rc.heatmap.days".to_string(),
        "30".to_string()
      ),
      (
        "rc.timezone".to_string(),
        "UTC".to_string()
      ),
    ]);
    assert_eq!(
      pre.cleaned_args,
      args(&["studymgr", "list"])
    );
  }

  #[test]
  fn parses_list_with_filter_and_day() {
    let cli = GlobalCli::try_parse_from([
      "studymgr",
      "--rc",
      "color=off",
      "-vv",
      "list",
      "--filter",
      "upcoming",
      "--day",
      "2024-01-05"
    ])
    .expect("parse");

    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.rc_overrides.len(), 1);
    assert!(matches!(
      cli.command,
      Some(Command::List { ref filter, day: Some(_) }) if filter == "upcoming"
    ));
  }
}
