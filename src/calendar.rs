use chrono::{Datelike, Days, Local, NaiveDate, NaiveDateTime, Weekday};

use crate::error::{DashboardError, DashboardResult};

/// The instant every date-relative field is computed against.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub today: NaiveDate,
    pub now: NaiveDateTime,
}

impl EvalContext {
    pub fn new(today: NaiveDate, now: NaiveDateTime) -> Self {
        Self { today, now }
    }

    /// Local wall clock, optionally pinned to another calendar day.
    pub fn local(today_override: Option<NaiveDate>) -> Self {
        let now = Local::now().naive_local();
        match today_override {
            Some(today) => Self::new(today, today.and_time(now.time())),
            None => Self::new(now.date(), now),
        }
    }

    pub fn yesterday(&self) -> Option<NaiveDate> {
        self.today.pred_opt()
    }

    pub fn month_to_date(&self) -> DateWindow {
        DateWindow {
            start: first_of_month(self.today),
            end: self.today,
        }
    }

    pub fn report_month(&self) -> String {
        report_month(self.today)
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn report_month(&self) -> String {
        report_month(self.start)
    }
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn report_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn last_day_of_month(year: i32, month: u32) -> DashboardResult<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .ok_or(DashboardError::InvalidMonth { year, month })
}

/// Window for a requested month: up to today when it is the running month,
/// otherwise the whole calendar month. No request means month-to-date.
pub fn month_window(
    ctx: &EvalContext,
    year: Option<i32>,
    month: Option<u32>,
) -> DashboardResult<DateWindow> {
    let (year, month) = match (year, month) {
        (Some(year), Some(month)) => (year, month),
        _ => return Ok(ctx.month_to_date()),
    };

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or(DashboardError::InvalidMonth { year, month })?;
    let end = if start.year() == ctx.today.year() && start.month() == ctx.today.month() {
        ctx.today
    } else {
        last_day_of_month(year, month)?
    };

    Ok(DateWindow { start, end })
}

/// Calendar days in the window, Sundays excluded.
pub fn working_days(window: &DateWindow) -> i32 {
    let mut count = 0;
    let mut cursor = window.start;
    while cursor <= window.end {
        if cursor.weekday() != Weekday::Sun {
            count += 1;
        }
        match cursor.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    count
}

pub fn parse_iso_date(value: &str) -> DashboardResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DashboardError::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ctx(today: NaiveDate) -> EvalContext {
        EvalContext::new(today, today.and_hms_opt(12, 0, 0).unwrap())
    }

    #[test]
    fn working_days_skip_sundays() {
        // 2026-10-01 is a Thursday; the 4th, 11th and 18th are Sundays.
        let window = DateWindow {
            start: date(2026, 10, 1),
            end: date(2026, 10, 19),
        };
        assert_eq!(working_days(&window), 16);
    }

    #[test]
    fn working_days_of_a_lone_sunday_is_zero() {
        let window = DateWindow {
            start: date(2026, 10, 4),
            end: date(2026, 10, 4),
        };
        assert_eq!(working_days(&window), 0);
    }

    #[test]
    fn month_window_defaults_to_month_to_date() {
        let window = month_window(&ctx(date(2026, 10, 19)), None, None).unwrap();
        assert_eq!(window.start, date(2026, 10, 1));
        assert_eq!(window.end, date(2026, 10, 19));
    }

    #[test]
    fn month_window_for_past_month_runs_to_last_day() {
        let window = month_window(&ctx(date(2026, 10, 19)), Some(2024), Some(2)).unwrap();
        assert_eq!(window.start, date(2024, 2, 1));
        assert_eq!(window.end, date(2024, 2, 29));
    }

    #[test]
    fn month_window_for_running_month_stops_today() {
        let window = month_window(&ctx(date(2026, 10, 19)), Some(2026), Some(10)).unwrap();
        assert_eq!(window.end, date(2026, 10, 19));
    }

    #[test]
    fn month_window_rejects_bad_month() {
        let err = month_window(&ctx(date(2026, 10, 19)), Some(2026), Some(13)).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidMonth { month: 13, .. }));
    }

    #[test]
    fn december_ends_on_the_31st() {
        assert_eq!(last_day_of_month(2025, 12).unwrap(), date(2025, 12, 31));
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_iso_date("2026-10-02").unwrap(), date(2026, 10, 2));
        assert!(parse_iso_date("02/10/2026").is_err());
    }
}
