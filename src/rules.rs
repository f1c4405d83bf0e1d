use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::calendar::{self, EvalContext};
use crate::models::{DashboardReport, ReportType, Tag};

/// Parses an "H:MM" time-taken value into fractional hours. Anything that
/// does not parse counts as zero.
pub fn parse_time_taken(value: &str) -> f64 {
    let mut parts = value.split(':');
    let (Some(hours), Some(minutes), None) = (parts.next(), parts.next(), parts.next()) else {
        return 0.0;
    };

    match (hours.trim().parse::<i64>(), minutes.trim().parse::<i64>()) {
        (Ok(h), Ok(m)) => h as f64 + m as f64 / 60.0,
        _ => 0.0,
    }
}

pub fn total_hours<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> f64 {
    values
        .into_iter()
        .flatten()
        .filter(|value| !value.is_empty())
        .map(parse_time_taken)
        .sum()
}

pub fn tag_for_hours(working_hours: f64) -> Tag {
    if working_hours < 8.0 {
        Tag::Red
    } else if working_hours > 10.0 {
        Tag::Green
    } else {
        Tag::Blue
    }
}

pub fn submission_deadline(report_type: ReportType, report_date: NaiveDate) -> NaiveDateTime {
    let cutoff = match report_type {
        ReportType::Dwr | ReportType::Sod => NaiveTime::from_hms_opt(23, 59, 59),
        ReportType::Pod => NaiveTime::from_hms_opt(10, 0, 0),
    }
    .unwrap_or(NaiveTime::MIN);
    report_date.and_time(cutoff)
}

pub fn is_late(
    report_type: ReportType,
    report_date: Option<NaiveDate>,
    submitted_on: Option<NaiveDateTime>,
) -> bool {
    match (report_date, submitted_on) {
        (Some(date), Some(submitted)) => submitted > submission_deadline(report_type, date),
        _ => false,
    }
}

pub fn is_current_month(report_date: Option<NaiveDate>, ctx: &EvalContext) -> bool {
    report_date.is_some_and(|d| d.year() == ctx.today.year() && d.month() == ctx.today.month())
}

pub fn is_today(report_date: Option<NaiveDate>, ctx: &EvalContext) -> bool {
    report_date == Some(ctx.today)
}

pub fn is_yesterday(report_date: Option<NaiveDate>, ctx: &EvalContext) -> bool {
    match (report_date, ctx.yesterday()) {
        (Some(date), Some(yesterday)) => date == yesterday,
        _ => false,
    }
}

/// Recomputes every derived column of a dashboard row.
pub fn refresh_derived(report: &mut DashboardReport, ctx: &EvalContext) {
    report.is_late = is_late(report.report_type, report.report_date, report.submitted_on);
    report.is_missed = report.submitted_on.is_none();
    report.tag = tag_for_hours(report.working_hours);
    report.report_month = report.report_date.map(calendar::report_month);
    report.is_current_month = is_current_month(report.report_date, ctx);
    report.is_today = is_today(report.report_date, ctx);
    report.is_yesterday = is_yesterday(report.report_date, ctx);
}

pub fn missed_count(working_days: i32, submitted: i32) -> i32 {
    if working_days <= 0 {
        return 0;
    }
    (working_days - submitted).max(0)
}

pub fn round_hours(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
