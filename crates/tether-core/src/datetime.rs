use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "tether-time.toml";
const TIMEZONE_ENV_VAR: &str = "TETHER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "TETHER_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
    time: Option<TimezoneSection>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    timezone: Option<String>,
}

pub fn project_timezone() -> &'static Tz {
    static PROJECT_TZ: OnceLock<Tz> = OnceLock::new();
    PROJECT_TZ.get_or_init(resolve_project_timezone)
}

#[must_use]
pub fn format_project_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(project_timezone())
        .format("%Y-%m-%d")
        .to_string()
}

#[must_use]
pub fn format_project_datetime(dt: DateTime<Utc>) -> String {
    dt.with_timezone(project_timezone())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn resolve_project_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    chrono_tz::UTC
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
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed reading timezone config file");
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(file = %path.display(), error = %err, "failed parsing timezone config file");
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
            tracing::info!(source, timezone = %trimmed, "configured project timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(source, timezone = %trimmed, error = %err, "failed to parse timezone id");
            None
        }
    }
}

fn to_utc_from_project_local(
    local_naive: NaiveDateTime,
    context: &str,
) -> anyhow::Result<DateTime<Utc>> {
    match project_timezone().from_local_datetime(&local_naive) {
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

fn project_midnight(date: NaiveDate, context: &str) -> anyhow::Result<DateTime<Utc>> {
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("failed to construct midnight for {context}"))?;
    to_utc_from_project_local(midnight, context)
}

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_due_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let token = input.trim();
    if token.is_empty() {
        return Err(anyhow!("empty due date expression"));
    }
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Ok(now),
        "today" => {
            let date = now.with_timezone(project_timezone()).date_naive();
            return project_midnight(date, "today");
        }
        "tomorrow" => {
            let today = parse_due_expr("today", now)?;
            return Ok(today + Duration::days(1));
        }
        "eow" => {
            let today = now.with_timezone(project_timezone()).date_naive();
            let days_left =
                7 - today.weekday().days_since(Weekday::Mon) as i64;
            return project_midnight(
                today
                    .checked_add_signed(Duration::days(days_left))
                    .ok_or_else(|| anyhow!("date overflow computing end of week"))?,
                "eow",
            );
        }
        "eom" => {
            let today = now.with_timezone(project_timezone()).date_naive();
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)
                .ok_or_else(|| anyhow!("date overflow computing end of month"))?;
            return project_midnight(first_of_next, "eom");
        }
        _ => {}
    }

    let rel_re = Regex::new(r"^\+?(?P<num>\d+)(?P<unit>[dwh])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;
    if let Some(caps) = rel_re.captures(&lower) {
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
            "w" => Duration::weeks(num),
            "h" => Duration::hours(num),
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };
        return Ok(now + duration);
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return project_midnight(date, "date");
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(anyhow!(
        "cannot parse due date: {token} (try 2026-03-01, today, tomorrow, eow, eom, 3d, 2w)"
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration, TimeZone, Timelike, Utc};

    use super::parse_due_expr;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn calendar_date_parses_to_midnight() {
        let parsed = parse_due_expr("2026-03-01", now()).expect("parse date");
        assert_eq!(parsed.date_naive().day(), 1);
        assert_eq!(parsed.date_naive().month(), 3);
    }

    #[test]
    fn named_days_and_offsets() {
        let today = parse_due_expr("today", now()).expect("today");
        let tomorrow = parse_due_expr("tomorrow", now()).expect("tomorrow");
        assert_eq!(tomorrow - today, Duration::days(1));

        let in_three = parse_due_expr("3d", now()).expect("3d");
        assert_eq!(in_three - now(), Duration::days(3));

        let in_two_weeks = parse_due_expr("+2w", now()).expect("2w");
        assert_eq!(in_two_weeks - now(), Duration::weeks(2));
    }

    #[test]
    fn rfc3339_passes_through() {
        let parsed = parse_due_expr("2026-03-01T12:30:00Z", now()).expect("rfc3339");
        assert_eq!(parsed.hour(), 12);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_due_expr("soonish", now()).is_err());
        assert!(parse_due_expr("", now()).is_err());
    }
}
