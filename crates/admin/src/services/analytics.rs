//! Report date ranges for the analytics dashboard.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use mistore_core::validation::FieldErrors;

/// Longest custom range accepted.
const MAX_RANGE_DAYS: u64 = 366;

/// An inclusive range of UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportRange {
    /// Resolve `range=7d|30d|90d|ytd` or an explicit `from`/`to` pair.
    ///
    /// Explicit dates win over a preset. Without either, the last 30 days.
    ///
    /// # Errors
    ///
    /// Returns field errors for an unknown preset, a half-open pair, a
    /// reversed pair or a span over a year.
    pub fn resolve(
        preset: Option<&str>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<Self, FieldErrors> {
        match (from, to) {
            (Some(from), Some(to)) => {
                if from > to {
                    return Err(FieldErrors::single("from", "must not be after `to`"));
                }
                if from.checked_add_days(Days::new(MAX_RANGE_DAYS)).is_some_and(|end| to >= end) {
                    return Err(FieldErrors::single(
                        "to",
                        format!("range must not exceed {MAX_RANGE_DAYS} days"),
                    ));
                }
                Ok(Self { from, to })
            }
            (Some(_), None) => Err(FieldErrors::single("to", "is required with `from`")),
            (None, Some(_)) => Err(FieldErrors::single("from", "is required with `to`")),
            (None, None) => {
                let from = match preset.map(str::trim).unwrap_or("30d") {
                    "7d" => days_back(today, 7),
                    "30d" => days_back(today, 30),
                    "90d" => days_back(today, 90),
                    "ytd" => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                    other => {
                        return Err(FieldErrors::single(
                            "range",
                            format!("unknown range '{other}'; use 7d, 30d, 90d or ytd"),
                        ));
                    }
                };
                Ok(Self { from, to: today })
            }
        }
    }

    /// Half-open timestamps `[from 00:00, day after to 00:00)`.
    #[must_use]
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.to.succ_opt().unwrap_or(self.to);
        (
            self.from.and_time(NaiveTime::MIN).and_utc(),
            end.and_time(NaiveTime::MIN).and_utc(),
        )
    }
}

/// `n` days ending today, inclusive.
fn days_back(today: NaiveDate, n: u64) -> NaiveDate {
    today.checked_sub_days(Days::new(n - 1)).unwrap_or(today)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_presets() {
        let today = date(2026, 10, 16);
        let week = ReportRange::resolve(Some("7d"), None, None, today).unwrap();
        assert_eq!(week.from, date(2026, 10, 10));
        assert_eq!(week.to, today);

        let default = ReportRange::resolve(None, None, None, today).unwrap();
        assert_eq!(default.from, date(2026, 9, 17));

        let ytd = ReportRange::resolve(Some("ytd"), None, None, today).unwrap();
        assert_eq!(ytd.from, date(2026, 1, 1));
    }

    #[test]
    fn test_explicit_dates_win() {
        let range = ReportRange::resolve(
            Some("7d"),
            Some(date(2026, 3, 1)),
            Some(date(2026, 3, 31)),
            date(2026, 10, 16),
        )
        .unwrap();
        assert_eq!(range.from, date(2026, 3, 1));
        assert_eq!(range.to, date(2026, 3, 31));
    }

    #[test]
    fn test_rejections() {
        let today = date(2026, 10, 16);
        assert!(ReportRange::resolve(Some("2w"), None, None, today).is_err());
        assert!(ReportRange::resolve(None, Some(today), None, today).is_err());
        assert!(ReportRange::resolve(None, Some(date(2026, 5, 2)), Some(date(2026, 5, 1)), today).is_err());
        assert!(ReportRange::resolve(None, Some(date(2024, 1, 1)), Some(date(2026, 1, 1)), today).is_err());
    }

    #[test]
    fn test_bounds_are_half_open() {
        let range = ReportRange {
            from: date(2026, 10, 1),
            to: date(2026, 10, 1),
        };
        let (start, end) = range.bounds();
        assert_eq!((end - start).num_hours(), 24);
    }
}
