use std::sync::OnceLock;

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  DateTime,
  Datelike,
  Days,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  TimeZone,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

pub const TIMEZONE_ENV_VAR: &str =
  "STUDYMGR_TIMEZONE";
const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Picks the timezone used to cut timestamps into calendar days.
///
/// `$STUDYMGR_TIMEZONE` wins over the configured value; anything that does
/// not name an IANA zone is logged and skipped.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  let from_env =
    std::env::var(TIMEZONE_ENV_VAR).ok();
  [
    (from_env.as_deref(), TIMEZONE_ENV_VAR),
    (configured, "rc timezone")
  ]
  .into_iter()
  .find_map(|(raw, source)| {
    parse_timezone(raw?, source)
  })
  .unwrap_or(chrono_tz::UTC)
}

/// IANA zone name to `Tz`; blank or unknown names are `None`.
fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let name = raw.trim();
  if name.is_empty() {
    return None;
  }
  name
    .parse::<Tz>()
    .inspect(|tz| {
      tracing::debug!(source, %tz, "timezone");
    })
    .inspect_err(|err| {
      tracing::warn!(source, name, error = %err, "unknown timezone ignored");
    })
    .ok()
}

/// Calendar date of `dt` in `tz`; time of day is discarded.
#[must_use]
pub fn day_key(
  dt: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  dt.with_timezone(tz).date_naive()
}

#[must_use]
pub fn format_day(
  day: NaiveDate
) -> String {
  day.format(DAY_KEY_FORMAT).to_string()
}

#[must_use]
pub fn format_local(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format("%Y-%m-%d %H:%M")
    .to_string()
}

/// Lenient timestamp reader for upstream records.
///
/// Accepts RFC 3339, Postgres-style `YYYY-MM-DD HH:MM:SS+00`, naive
/// date-times (read in `tz`) and bare dates (local midnight). Anything else
/// is `None`.
pub fn parse_timestamp(
  raw: &str,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let token = raw.trim();
  if token.is_empty() {
    return None;
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.with_timezone(&Utc));
  }

  for fmt in [
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z"
  ] {
    if let Ok(dt) =
      DateTime::parse_from_str(token, fmt)
    {
      return Some(
        dt.with_timezone(&Utc)
      );
    }
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return to_utc_from_local(ndt, tz);
    }
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token,
      DAY_KEY_FORMAT
    )
  {
    return to_utc_from_local(
      date.and_time(NaiveTime::MIN),
      tz
    );
  }

  None
}

/// Earliest instant for a local wall-clock time; `None` inside a DST gap.
fn to_utc_from_local(
  local: NaiveDateTime,
  tz: &Tz
) -> Option<DateTime<Utc>> {
  let resolved =
    tz.from_local_datetime(&local);
  if let LocalResult::Ambiguous(..) =
    resolved
  {
    tracing::debug!(%local, %tz, "ambiguous local time; taking the earlier one");
  }
  resolved
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
}

fn local_midnight(
  day: NaiveDate,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  to_utc_from_local(
    day.and_time(NaiveTime::MIN),
    tz
  )
  .ok_or_else(|| {
    anyhow!(
      "{day} has no midnight in {tz}"
    )
  })
}

fn relative_regex()
-> anyhow::Result<&'static Regex> {
  static RELATIVE: OnceLock<Regex> =
    OnceLock::new();
  if let Some(re) = RELATIVE.get() {
    return Ok(re);
  }
  let re = Regex::new(
    r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$"
  )
  .map_err(|e| {
    anyhow!(
      "internal regex compile \
       failure: {e}"
    )
  })?;
  Ok(RELATIVE.get_or_init(|| re))
}

/// Parses the date expressions accepted on the command line.
#[tracing::instrument(skip(now, tz), fields(input = input))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<DateTime<Utc>> {
  let token = input.trim();
  let lower =
    token.to_ascii_lowercase();
  let today = day_key(now, tz);

  match lower.as_str() {
    | "now" => return Ok(now),
    | "today" => {
      return local_midnight(today, tz);
    }
    | "tomorrow" => {
      return local_midnight(
        today.succ_opt().ok_or_else(
          || anyhow!("no day after {today}")
        )?,
        tz
      );
    }
    | "yesterday" => {
      return local_midnight(
        today.pred_opt().ok_or_else(
          || anyhow!("no day before {today}")
        )?,
        tz
      );
    }
    | _ => {}
  }

  if let Ok(target) =
    lower.parse::<Weekday>()
  {
    let day = next_weekday(today, target)
      .ok_or_else(|| {
        anyhow!(
          "no {target} after {today}"
        )
      })?;
    return local_midnight(day, tz);
  }

  if let Some(caps) =
    relative_regex()?.captures(token)
  {
    let num: i64 = caps
      .name("num")
      .map(|m| m.as_str())
      .ok_or_else(|| {
        anyhow!(
          "missing relative amount"
        )
      })?
      .parse()
      .context(
        "invalid relative number"
      )?;
    let duration = match caps
      .name("unit")
      .map(|m| m.as_str())
    {
      | Some("d") => Duration::try_days(num),
      | Some("h") => {
        Duration::try_hours(num)
      }
      | Some("m") => {
        Duration::try_minutes(num)
      }
      | other => {
        return Err(anyhow!(
          "unknown relative unit: \
           {other:?}"
        ));
      }
    };
    let backwards = caps
      .name("sign")
      .is_some_and(|m| m.as_str() == "-");

    return duration
      .and_then(|duration| {
        if backwards {
          now.checked_sub_signed(duration)
        } else {
          now.checked_add_signed(duration)
        }
      })
      .ok_or_else(|| {
        anyhow!(
          "relative date out of range: \
           {input}"
        )
      });
  }

  parse_timestamp(token, tz)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date expression: \
         {input}"
      )
    })
    .with_context(|| {
      "supported formats: \
       now/today/tomorrow/yesterday, \
       weekday names (e.g. monday), \
       +Nd/+Nh/+Nm, RFC3339, \
       YYYY-MM-DD, YYYY-MM-DDTHH:MM, \
       YYYY-MM-DD HH:MM"
    })
}

/// Same expressions as [`parse_date_expr`], reduced to a day key.
pub fn parse_day_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: &Tz
) -> anyhow::Result<NaiveDate> {
  parse_date_expr(input, now, tz)
    .map(|dt| day_key(dt, tz))
}

/// Next `target` strictly after `from`; a week ahead when they match.
fn next_weekday(
  from: NaiveDate,
  target: Weekday
) -> Option<NaiveDate> {
  let ahead = (target
    .days_since(from.weekday())
    + 6)
    % 7
    + 1;
  from.checked_add_days(Days::new(
    u64::from(ahead)
  ))
}
