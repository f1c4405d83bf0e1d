use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::{self, EvalContext};
use crate::error::DashboardResult;
use crate::models::{DashboardReport, Employee, MissedReport, Tag};
use crate::rules;
use crate::store::ReportStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionCounts {
    pub pod: i32,
    pub sod: i32,
    pub dwr: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MissedFlags {
    pub current_month: bool,
    pub today: bool,
    pub yesterday: bool,
    pub tag_red: bool,
    pub tag_blue: bool,
    pub tag_green: bool,
}

/// Rebuilds the per-employee missed report rows for the running month.
pub async fn sync_missed_reports(
    store: &dyn ReportStore,
    ctx: &EvalContext,
) -> DashboardResult<bool> {
    let window = ctx.month_to_date();
    let working_days = calendar::working_days(&window);

    let employees = store.active_employees().await?;
    for employee in &employees {
        let tasks = store.employee_daily_tasks(employee.id, window).await?;
        let work_reports = store.employee_work_reports(employee.id, window).await?;

        let counts = SubmissionCounts {
            pod: tasks.iter().filter(|t| t.pod_is_submitted()).count() as i32,
            sod: tasks.iter().filter(|t| t.sod_is_submitted()).count() as i32,
            dwr: work_reports
                .iter()
                .filter(|r| r.submitted_time.is_some())
                .count() as i32,
        };

        let missed_rows = store.missed_dashboard_reports(employee.id).await?;
        let flags = missed_flags(&missed_rows, ctx);

        let existing = store.find_missed_report(employee.id).await?;
        let id = existing.as_ref().map(|row| row.id).unwrap_or_else(Uuid::new_v4);
        let row = build_missed_report(id, employee, working_days, counts, flags);

        debug!(
            employee_id = %employee.id,
            working_days,
            total_missed = row.total_missed,
            "missed report computed"
        );
        store.save_missed_report(&row, existing.is_some()).await?;
    }

    info!(employees = employees.len(), working_days, "missed reports synced");
    Ok(true)
}

pub fn build_missed_report(
    id: Uuid,
    employee: &Employee,
    working_days: i32,
    counts: SubmissionCounts,
    flags: MissedFlags,
) -> MissedReport {
    let missed_pod = rules::missed_count(working_days, counts.pod);
    let missed_sod = rules::missed_count(working_days, counts.sod);
    let missed_dwr = rules::missed_count(working_days, counts.dwr);

    MissedReport {
        id,
        employee_id: employee.id,
        department_id: employee.department_id,
        missed_pod,
        missed_sod,
        missed_dwr,
        total_missed: missed_pod + missed_sod + missed_dwr,
        total_working_days: working_days,
        pod_submitted_count: counts.pod,
        sod_submitted_count: counts.sod,
        dwr_submitted_count: counts.dwr,
        has_missed_current_month: flags.current_month,
        has_missed_today: flags.today,
        has_missed_yesterday: flags.yesterday,
        has_tag_red: flags.tag_red,
        has_tag_blue: flags.tag_blue,
        has_tag_green: flags.tag_green,
    }
}

/// Flags over an employee's missed dashboard rows. Date flags are taken from
/// the report date rather than the stored booleans, which may be stale.
pub fn missed_flags(rows: &[DashboardReport], ctx: &EvalContext) -> MissedFlags {
    let mut flags = MissedFlags::default();
    for row in rows.iter().filter(|r| r.is_missed) {
        flags.current_month |= rules::is_current_month(row.report_date, ctx);
        flags.today |= rules::is_today(row.report_date, ctx);
        flags.yesterday |= rules::is_yesterday(row.report_date, ctx);
        match row.tag {
            Tag::Red => flags.tag_red = true,
            Tag::Blue => flags.tag_blue = true,
            Tag::Green => flags.tag_green = true,
        }
    }
    flags
}
