use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::{DateWindow, EvalContext};
use crate::error::{DashboardError, DashboardResult};
use crate::models::{DailyTask, DashboardReport, ReportType, Tag, WorkReport};
use crate::store::ReportStore;
use crate::{missed, monthly, rules};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    MissedReports,
    EmployeeMonthly,
    DepartmentMonthly,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::MissedReports => "missed reports",
            Stage::EmployeeMonthly => "employee monthly",
            Stage::DepartmentMonthly => "department monthly",
        })
    }
}

/// Outcome of one downstream stage. A failed stage never aborts its siblings.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub error: Option<String>,
}

impl StageReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    pub dwr_upserted: usize,
    pub pod_upserted: usize,
    pub sod_upserted: usize,
    pub skipped: usize,
    pub stages: Vec<StageReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerateSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub removed: u64,
    pub created: u64,
    pub skipped: usize,
    pub stages: Vec<StageReport>,
}

/// Incremental pass: upserts DWR rows from work reports and POD/SOD rows from
/// daily tasks, then refreshes the downstream rollups.
pub async fn sync_dashboard(
    store: &dyn ReportStore,
    ctx: &EvalContext,
) -> DashboardResult<SyncSummary> {
    let mut summary = SyncSummary::default();

    for work_report in store.work_reports().await? {
        upsert_report(store, ctx, dwr_draft(&work_report), false).await?;
        summary.dwr_upserted += 1;
    }

    for task in store.daily_tasks(None).await? {
        let keep_pod_stamp = task.pod_is_submitted() && task.pod_submitted_date.is_none();
        match upsert_report(store, ctx, pod_draft(&task, ctx), keep_pod_stamp).await {
            Ok(()) => summary.pod_upserted += 1,
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "skipping POD upsert");
                summary.skipped += 1;
            }
        }

        let submitted_on = task.sod_is_submitted().then_some(ctx.now);
        match upsert_report(store, ctx, sod_draft(&task, submitted_on), true).await {
            Ok(()) => summary.sod_upserted += 1,
            Err(err) => {
                warn!(task_id = %task.id, error = %err, "skipping SOD upsert");
                summary.skipped += 1;
            }
        }
    }

    info!(
        dwr = summary.dwr_upserted,
        pod = summary.pod_upserted,
        sod = summary.sod_upserted,
        skipped = summary.skipped,
        "dashboard reports synced"
    );

    summary.stages = run_downstream(store, ctx).await;
    Ok(summary)
}

/// Deletes POD/SOD rows in the window and rebuilds them from daily tasks.
/// Defaults to month-to-date. The delete is not guarded.
pub async fn regenerate_pod_sod(
    store: &dyn ReportStore,
    ctx: &EvalContext,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> DashboardResult<RegenerateSummary> {
    let default_window = ctx.month_to_date();
    let window = DateWindow {
        start: start.unwrap_or(default_window.start),
        end: end.unwrap_or(default_window.end),
    };
    if window.start > window.end {
        return Err(DashboardError::InvalidDate(format!(
            "start {} is after end {}",
            window.start, window.end
        )));
    }

    let removed = store.delete_pod_sod_reports(window).await?;

    let mut created = 0u64;
    let mut skipped = 0usize;
    let tasks = store.daily_tasks(Some(window)).await?;
    for task in tasks.iter().filter(|task| window.contains(task.date)) {
        let sod_submitted_on = task.sod_is_submitted().then_some(ctx.now);

        for draft in [pod_draft(task, ctx), sod_draft(task, sod_submitted_on)] {
            let mut report = draft;
            rules::refresh_derived(&mut report, ctx);
            match store.insert_dashboard_report(&report).await {
                Ok(()) => created += 1,
                Err(err) => {
                    warn!(
                        task_id = %task.id,
                        report_type = report.report_type.as_str(),
                        error = %err,
                        "skipping regenerated row"
                    );
                    skipped += 1;
                }
            }
        }
    }

    info!(
        start = %window.start,
        end = %window.end,
        removed,
        created,
        "POD/SOD rows regenerated"
    );

    let stages = run_downstream(store, ctx).await;
    Ok(RegenerateSummary {
        start: window.start,
        end: window.end,
        removed,
        created,
        skipped,
        stages,
    })
}

/// Runs the rollup stages in order, recording each outcome.
pub async fn run_downstream(store: &dyn ReportStore, ctx: &EvalContext) -> Vec<StageReport> {
    let outcomes = [
        (Stage::MissedReports, missed::sync_missed_reports(store, ctx).await),
        (
            Stage::EmployeeMonthly,
            monthly::sync_employee_monthly(store, ctx, None, None).await,
        ),
        (
            Stage::DepartmentMonthly,
            monthly::sync_department_monthly(store, ctx, None, None).await,
        ),
    ];

    outcomes
        .into_iter()
        .map(|(stage, result)| match result {
            Ok(_) => StageReport { stage, error: None },
            Err(err) => {
                warn!(%stage, error = %err, "downstream stage failed");
                StageReport {
                    stage,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect()
}

async fn upsert_report(
    store: &dyn ReportStore,
    ctx: &EvalContext,
    mut report: DashboardReport,
    keep_submission: bool,
) -> DashboardResult<()> {
    let Some(report_date) = report.report_date else {
        return Err(DashboardError::other("dashboard row without a report date"));
    };

    let existing = store
        .find_dashboard_report(report.report_type, report.employee_id, report_date)
        .await?;

    match existing {
        Some(existing) => {
            report.id = existing.id;
            report.manager_marks = existing.manager_marks;
            if keep_submission && existing.submitted_on.is_some() {
                report.submitted_on = existing.submitted_on;
            }
            rules::refresh_derived(&mut report, ctx);
            store.update_dashboard_report(&report).await
        }
        None => {
            rules::refresh_derived(&mut report, ctx);
            store.insert_dashboard_report(&report).await
        }
    }
}

fn draft(
    report_type: ReportType,
    employee_name: Option<&str>,
    employee_id: Option<Uuid>,
    department_id: Option<Uuid>,
    date: NaiveDate,
    working_hours: f64,
    submitted_on: Option<NaiveDateTime>,
) -> DashboardReport {
    DashboardReport {
        id: Uuid::new_v4(),
        name: format!(
            "{} {} {}",
            report_type.label(),
            employee_name.unwrap_or_default(),
            date
        ),
        report_date: Some(date),
        employee_id,
        department_id,
        report_type,
        working_hours,
        submitted_on,
        manager_marks: 0,
        is_late: false,
        is_missed: submitted_on.is_none(),
        tag: Tag::Red,
        report_month: None,
        is_current_month: false,
        is_today: false,
        is_yesterday: false,
    }
}

fn dwr_draft(work_report: &WorkReport) -> DashboardReport {
    let hours = rules::total_hours(work_report.lines.iter().map(|line| line.time_taken.as_deref()));
    draft(
        ReportType::Dwr,
        work_report.employee_name.as_deref(),
        work_report.employee_id,
        work_report.department_id,
        work_report.date,
        hours,
        None,
    )
}

/// Flagged tasks without a recorded POD time are stamped with `ctx.now`.
/// The timestamp is ignored when the flag is not set.
fn pod_draft(task: &DailyTask, ctx: &EvalContext) -> DashboardReport {
    let submitted_on = task
        .pod_is_submitted()
        .then(|| task.pod_submitted_date.unwrap_or(ctx.now));
    draft(
        ReportType::Pod,
        task.employee_name.as_deref(),
        task.employee_id,
        task.department_id,
        task.date,
        0.0,
        submitted_on,
    )
}

fn sod_draft(task: &DailyTask, submitted_on: Option<NaiveDateTime>) -> DashboardReport {
    draft(
        ReportType::Sod,
        task.employee_name.as_deref(),
        task.employee_id,
        task.department_id,
        task.date,
        0.0,
        submitted_on,
    )
}
