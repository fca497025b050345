use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "tasklens-time.toml";
const TIMEZONE_ENV_VAR: &str = "TASKLENS_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "TASKLENS_TIME_CONFIG";
const DEFAULT_TIMEZONE: &str = "UTC";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

/// The timezone every "calendar day" comparison is made in. Resolved once
/// per process from the environment, then a config file, then UTC.
pub fn local_timezone() -> &'static Tz {
    static LOCAL_TZ: OnceLock<Tz> = OnceLock::new();
    LOCAL_TZ.get_or_init(resolve_local_timezone)
}

#[must_use]
pub fn to_local_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(local_timezone()).date_naive()
}

#[must_use]
pub fn format_local_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(local_timezone())
        .format("%Y-%m-%d")
        .to_string()
}

#[must_use]
pub fn format_local_datetime(dt: DateTime<Utc>) -> String {
    dt.with_timezone(local_timezone())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn resolve_local_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR) {
        if let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR) {
            return tz;
        }
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    parse_timezone(DEFAULT_TIMEZONE, "DEFAULT_TIMEZONE").unwrap_or(chrono_tz::UTC)
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "timezone config file not found");
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed reading timezone config file"
            );
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed parsing timezone config file"
            );
            return None;
        }
    };

    let timezone = parsed
        .timezone
        .or_else(|| parsed.time.and_then(|section| section.timezone));
    let Some(timezone) = timezone else {
        tracing::warn!(file = %path.display(), "timezone config had no timezone field");
        return None;
    };

    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured local timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(
                source,
                timezone = %trimmed,
                error = %err,
                "failed to parse timezone id"
            );
            None
        }
    }
}

fn to_utc_from_local(local_naive: NaiveDateTime, context: &str) -> anyhow::Result<DateTime<Utc>> {
    match local_timezone().from_local_datetime(&local_naive) {
        LocalResult::Single(local_dt) => Ok(local_dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => {
            tracing::warn!(
                context,
                first = %first,
                second = %second,
                "ambiguous local datetime; using earliest"
            );
            let chosen = if first <= second { first } else { second };
            Ok(chosen.with_timezone(&Utc))
        }
        LocalResult::None => Err(anyhow!(
            "local datetime does not exist in configured timezone: {context}"
        )),
    }
}

/// Parses the date expressions accepted by `due:` and friends on the CLI.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Ok(now),
        "today" => {
            let date = now.with_timezone(local_timezone()).date_naive();
            let midnight = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("failed to construct midnight for today"))?;
            return to_utc_from_local(midnight, "today");
        }
        "tomorrow" => {
            let today = parse_date_expr("today", now)?;
            return Ok(today + Duration::days(1));
        }
        "yesterday" => {
            let today = parse_date_expr("today", now)?;
            return Ok(today - Duration::days(1));
        }
        _ => {}
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    if let Some(caps) = rel_re.captures(token) {
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let unit = caps
            .name("unit")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative unit"))?;

        let duration = match unit {
            "d" => Duration::days(num),
            "h" => Duration::hours(num),
            "m" => Duration::minutes(num),
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return Ok(if sign == "-" { now - duration } else { now + duration });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("failed to construct midnight for date"))?;
        return to_utc_from_local(midnight, "date");
    }

    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(token, fmt) {
            return to_utc_from_local(ndt, fmt);
        }
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: now/today/tomorrow/yesterday, +Nd/+Nh/+Nm, \
         RFC3339, YYYY-MM-DD, YYYY-MM-DDTHH:MM, YYYY-MM-DD HH:MM"
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{parse_date_expr, to_local_date};

    #[test]
    fn parses_plain_date_as_local_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        let parsed = parse_date_expr("2024-07-01", now).expect("parse date");
        assert_eq!(to_local_date(parsed).format("%Y-%m-%d").to_string(), "2024-07-01");
    }

    #[test]
    fn parses_relative_offsets_from_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        assert_eq!(parse_date_expr("+2d", now).expect("parse +2d"), now + Duration::days(2));
        assert_eq!(parse_date_expr("-3h", now).expect("parse -3h"), now - Duration::hours(3));
    }

    #[test]
    fn parses_rfc3339_instants() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        let parsed = parse_date_expr("2024-06-09T23:00:00Z", now).expect("parse rfc3339");
        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2024, 6, 9, 23, 0, 0).single().expect("valid instant")
        );
    }

    #[test]
    fn tomorrow_is_one_day_after_today_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        let today = parse_date_expr("today", now).expect("parse today");
        let tomorrow = parse_date_expr("tomorrow", now).expect("parse tomorrow");
        assert_eq!(tomorrow - today, Duration::days(1));
    }

    #[test]
    fn rejects_garbage_expressions() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).single().expect("valid now");
        assert!(parse_date_expr("someday", now).is_err());
    }
}
