use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow,
  bail
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::engine::EngineSettings;
use crate::heatmap::{
  DEFAULT_WINDOW_DAYS,
  MAX_WINDOW_DAYS
};
use crate::stats::DEFAULT_UPCOMING_LIMIT;
use crate::view::UPCOMING_FILTER_DAYS;

pub const RC_ENV_VAR: &str =
  "STUDYMGRRC";
const RC_FILE_NAME: &str = ".studymgrrc";
const MAX_INCLUDE_DEPTH: usize = 8;

/// Settings read from the rc file, layered over built-in defaults.
#[derive(Debug, Clone)]
pub struct Config {
  values:      BTreeMap<String, String>,
  /// rc files read, in the order they were opened.
  pub sources: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let values = [
      ("timezone", "UTC".to_string()),
      (
        "upcoming.days",
        UPCOMING_FILTER_DAYS.to_string()
      ),
      (
        "report.upcoming.limit",
        DEFAULT_UPCOMING_LIMIT
          .to_string()
      ),
      (
        "heatmap.days",
        DEFAULT_WINDOW_DAYS.to_string()
      ),
      ("color", "on".to_string()),
      (
        "tasks.location",
        "~/.studymgr/tasks.json"
          .to_string()
      )
    ]
    .into_iter()
    .map(|(key, value)| {
      (key.to_string(), value)
    })
    .collect();

    Self {
      values,
      sources: Vec::new()
    }
  }
}

enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting(&'a str, &'a str)
}

impl Config {
  /// Defaults, then the first rc file found: `explicit`, `$STUDYMGRRC`
  /// (`/dev/null` disables it), `~/.studymgrrc`.
  #[tracing::instrument]
  pub fn load(
    explicit: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();
    match locate_rc(explicit) {
      | Some(path) => {
        info!(rc = %path.display(), "reading rc file");
        cfg.read_rc(&path, 0)?;
      }
      | None => {
        debug!("no rc file; defaults only")
      }
    }
    Ok(cfg)
  }

  /// `rc.`-prefixed keys are accepted as-is.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (raw_key, value) in overrides {
      let key = raw_key
        .strip_prefix("rc.")
        .map(str::to_string)
        .unwrap_or(raw_key);
      debug!(%key, %value, "override");
      self.values.insert(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.values.get(key).cloned()
  }

  pub fn get_parsed<T>(
    &self,
    key: &str
  ) -> anyhow::Result<Option<T>>
  where
    T: std::str::FromStr,
    T::Err: std::fmt::Display
  {
    let Some(raw) = self.values.get(key)
    else {
      return Ok(None);
    };
    raw
      .trim()
      .parse::<T>()
      .map(Some)
      .map_err(|err| {
        anyhow!(
          "{key} = {raw}: {err}"
        )
      })
  }

  /// Entries sorted by key.
  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&str, &str)>
  {
    self
      .values
      .iter()
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Engine knobs, falling back to the built-in defaults.
  pub fn engine_settings(
    &self
  ) -> anyhow::Result<EngineSettings> {
    let defaults =
      EngineSettings::default();
    let heatmap_days = self
      .get_parsed("heatmap.days")?
      .unwrap_or(defaults.heatmap_days);
    if heatmap_days > MAX_WINDOW_DAYS {
      bail!(
        "heatmap.days = {heatmap_days}: \
         at most {MAX_WINDOW_DAYS}"
      );
    }

    Ok(EngineSettings {
      timezone:       crate::datetime::resolve_timezone(
        self.get("timezone").as_deref()
      ),
      upcoming_days:  self
        .get_parsed("upcoming.days")?
        .unwrap_or(defaults.upcoming_days),
      upcoming_limit: self
        .get_parsed(
          "report.upcoming.limit"
        )?
        .unwrap_or(
          defaults.upcoming_limit
        ),
      heatmap_days
    })
  }

  pub fn tasks_location(
    &self
  ) -> Option<PathBuf> {
    self
      .get("tasks.location")
      .map(|raw| expand_tilde(Path::new(&raw)))
  }

  fn read_rc(
    &mut self,
    path: &Path,
    depth: usize
  ) -> anyhow::Result<()> {
    if depth > MAX_INCLUDE_DEPTH {
      bail!(
        "rc includes nested deeper than \
         {MAX_INCLUDE_DEPTH} levels at {}",
        path.display()
      );
    }

    let path = expand_tilde(path);
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "cannot read rc file {}",
          path.display()
        )
      })?;
    self.sources.push(path.clone());
    let dir = path
      .parent()
      .unwrap_or(Path::new("."))
      .to_path_buf();

    for (idx, raw) in
      text.lines().enumerate()
    {
      match parse_rc_line(raw) {
        | Some(RcLine::Blank) => {}
        | Some(RcLine::Include(target)) => {
          let nested =
            include_target(&dir, target);
          if nested.is_file() {
            debug!(
              from = %path.display(),
              line = idx + 1,
              nested = %nested.display(),
              "following include"
            );
            self.read_rc(&nested, depth + 1)?;
          } else {
            warn!(
              nested = %nested.display(),
              "missing include skipped"
            );
          }
        }
        | Some(RcLine::Setting(key, value)) => {
          trace!(key, value, "rc setting");
          self
            .values
            .insert(key.to_string(), value.to_string());
        }
        | None => {
          bail!(
            "invalid config line {}:{}: {}",
            path.display(),
            idx + 1,
            raw.trim()
          );
        }
      }
    }

    Ok(())
  }
}

/// `None` for a line that is neither blank, an include, nor `key = value`.
fn parse_rc_line(raw: &str) -> Option<RcLine<'_>> {
  let line = raw
    .split_once('#')
    .map_or(raw, |(before, _)| before)
    .trim();
  if line.is_empty() {
    return Some(RcLine::Blank);
  }
  if let Some(target) = line
    .strip_prefix("include ")
    .map(str::trim)
    .filter(|target| !target.is_empty())
  {
    return Some(RcLine::Include(target));
  }
  let (key, value) =
    line.split_once('=')?;
  let key = key.trim();
  if key.is_empty() {
    return None;
  }
  Some(RcLine::Setting(key, value.trim()))
}

fn locate_rc(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  match std::env::var(RC_ENV_VAR) {
    | Ok(raw) if raw == "/dev/null" => {
      return None;
    }
    | Ok(raw) => {
      return Some(PathBuf::from(raw));
    }
    | Err(_) => {}
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!("no home directory; rc file skipped");
    return None;
  };
  Some(home.join(RC_FILE_NAME))
    .filter(|candidate| candidate.is_file())
}

fn include_target(
  dir: &Path,
  target: &str
) -> PathBuf {
  let expanded =
    expand_tilde(Path::new(target));
  if expanded.is_relative() {
    dir.join(expanded)
  } else {
    expanded
  }
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  match (
    path.strip_prefix("~"),
    dirs::home_dir()
  ) {
    | (Ok(rest), Some(home)) => {
      home.join(rest)
    }
    | _ => path.to_path_buf()
  }
}
