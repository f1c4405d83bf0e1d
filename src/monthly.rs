use std::collections::BTreeMap;

use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::{self, EvalContext};
use crate::error::DashboardResult;
use crate::models::{DepartmentMonthly, EmployeeMonthly, ReportType};
use crate::rules;
use crate::store::ReportStore;

/// Sums submitted work-report minutes per active employee for the requested
/// month (month-to-date when omitted).
pub async fn sync_employee_monthly(
    store: &dyn ReportStore,
    ctx: &EvalContext,
    year: Option<i32>,
    month: Option<u32>,
) -> DashboardResult<bool> {
    let window = calendar::month_window(ctx, year, month)?;
    let report_month = window.report_month();

    let employees = store.active_employees().await?;
    for employee in &employees {
        let total_work_minutes: i64 = store
            .employee_work_reports(employee.id, window)
            .await?
            .iter()
            .filter(|r| r.submitted_time.is_some())
            .map(|r| r.total_work_minutes)
            .sum();

        let existing = store.find_employee_monthly(employee.id, &report_month).await?;
        let row = EmployeeMonthly {
            id: existing.as_ref().map(|row| row.id).unwrap_or_else(Uuid::new_v4),
            employee_id: employee.id,
            department_id: employee.department_id,
            report_month: report_month.clone(),
            total_work_minutes,
            working_hours: rules::round_hours(total_work_minutes as f64 / 60.0),
        };
        store.save_employee_monthly(&row, existing.is_some()).await?;
    }

    info!(
        employees = employees.len(),
        month = %report_month,
        "employee monthly totals synced"
    );
    Ok(true)
}

/// Sums DWR working hours per department. The window is always the running
/// month to date; a requested year/month is validated but not applied.
pub async fn sync_department_monthly(
    store: &dyn ReportStore,
    ctx: &EvalContext,
    year: Option<i32>,
    month: Option<u32>,
) -> DashboardResult<bool> {
    let requested = calendar::month_window(ctx, year, month)?;
    let window = ctx.month_to_date();
    if requested.start != window.start {
        warn!(
            requested = %requested.report_month(),
            applied = %window.report_month(),
            "department totals always cover the current month"
        );
    }

    let reports = store
        .dashboard_reports_in_window(ReportType::Dwr, window)
        .await?;
    let report_month = window.report_month();

    let mut hours_by_department: BTreeMap<Uuid, f64> = BTreeMap::new();
    for report in &reports {
        if let Some(department_id) = report.department_id {
            *hours_by_department.entry(department_id).or_insert(0.0) += report.working_hours;
        }
    }

    for (department_id, hours) in &hours_by_department {
        let existing = store
            .find_department_monthly(*department_id, &report_month)
            .await?;
        let row = DepartmentMonthly {
            id: existing.as_ref().map(|row| row.id).unwrap_or_else(Uuid::new_v4),
            department_id: *department_id,
            report_month: report_month.clone(),
            total_work_minutes: (hours * 60.0) as i64,
            working_hours: rules::round_hours(*hours),
        };
        store.save_department_monthly(&row, existing.is_some()).await?;
    }

    info!(
        departments = hours_by_department.len(),
        month = %report_month,
        "department monthly totals synced"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DashboardReport, Employee, WorkReport};
    use crate::store::memory::{MemoryStore, Tables};
    use chrono::{NaiveDate, NaiveDateTime};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32) -> NaiveDateTime {
        d.and_hms_opt(h, 0, 0).unwrap()
    }

    fn ctx() -> EvalContext {
        let today = date(2026, 10, 19);
        EvalContext::new(today, at(today, 12))
    }

    fn work_report(
        employee: &Employee,
        day: NaiveDate,
        minutes: i64,
        submitted: bool,
    ) -> WorkReport {
        WorkReport {
            id: Uuid::new_v4(),
            employee_id: Some(employee.id),
            employee_name: Some(employee.name.clone()),
            department_id: employee.department_id,
            date: day,
            submitted_time: submitted.then(|| at(day, 18)),
            total_work_minutes: minutes,
            lines: Vec::new(),
        }
    }

    fn dwr_row(department_id: Option<Uuid>, day: NaiveDate, hours: f64) -> DashboardReport {
        DashboardReport {
            id: Uuid::new_v4(),
            name: "DWR".to_string(),
            report_date: Some(day),
            employee_id: Some(Uuid::new_v4()),
            department_id,
            report_type: ReportType::Dwr,
            working_hours: hours,
            submitted_on: None,
            manager_marks: 0,
            is_late: false,
            is_missed: true,
            tag: rules::tag_for_hours(hours),
            report_month: None,
            is_current_month: false,
            is_today: false,
            is_yesterday: false,
        }
    }

    #[tokio::test]
    async fn employee_totals_count_submitted_reports_in_window() {
        let avery = Employee {
            id: Uuid::new_v4(),
            name: "Avery Lee".to_string(),
            department_id: Some(Uuid::new_v4()),
        };
        let store = MemoryStore::with(Tables {
            employees: vec![avery.clone()],
            work_reports: vec![
                work_report(&avery, date(2026, 10, 2), 480, true),
                work_report(&avery, date(2026, 10, 5), 125, true),
                work_report(&avery, date(2026, 10, 6), 300, false),
                work_report(&avery, date(2026, 9, 30), 600, true),
            ],
            ..Default::default()
        });

        assert!(sync_employee_monthly(&store, &ctx(), None, None).await.unwrap());
        sync_employee_monthly(&store, &ctx(), None, None).await.unwrap();

        let rows = store.snapshot(|t| t.employee_monthly.clone());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report_month, "2026-10");
        assert_eq!(rows[0].total_work_minutes, 605);
        assert_eq!(rows[0].working_hours, 10.08);
    }

    #[tokio::test]
    async fn employee_totals_for_a_past_month() {
        let avery = Employee {
            id: Uuid::new_v4(),
            name: "Avery Lee".to_string(),
            department_id: None,
        };
        let store = MemoryStore::with(Tables {
            employees: vec![avery.clone()],
            work_reports: vec![work_report(&avery, date(2026, 9, 30), 600, true)],
            ..Default::default()
        });

        sync_employee_monthly(&store, &ctx(), Some(2026), Some(9))
            .await
            .unwrap();

        let row = store.snapshot(|t| t.employee_monthly[0].clone());
        assert_eq!(row.report_month, "2026-09");
        assert_eq!(row.working_hours, 10.0);
    }

    #[tokio::test]
    async fn department_totals_group_dwr_hours() {
        let engineering = Uuid::new_v4();
        let support = Uuid::new_v4();
        let store = MemoryStore::with(Tables {
            dashboard: vec![
                dwr_row(Some(engineering), date(2026, 10, 2), 7.5),
                dwr_row(Some(engineering), date(2026, 10, 3), 8.25),
                dwr_row(Some(support), date(2026, 10, 3), 4.0),
                dwr_row(None, date(2026, 10, 3), 9.0),
                dwr_row(Some(support), date(2026, 9, 29), 9.0),
            ],
            ..Default::default()
        });

        assert!(sync_department_monthly(&store, &ctx(), None, None).await.unwrap());

        let rows = store.snapshot(|t| t.department_monthly.clone());
        assert_eq!(rows.len(), 2);
        let eng = rows.iter().find(|r| r.department_id == engineering).unwrap();
        assert_eq!(eng.working_hours, 15.75);
        assert_eq!(eng.total_work_minutes, 945);
        let sup = rows.iter().find(|r| r.department_id == support).unwrap();
        assert_eq!(sup.working_hours, 4.0);
    }

    #[tokio::test]
    async fn department_totals_ignore_requested_month() {
        let engineering = Uuid::new_v4();
        let store = MemoryStore::with(Tables {
            dashboard: vec![
                dwr_row(Some(engineering), date(2026, 10, 2), 6.0),
                dwr_row(Some(engineering), date(2026, 8, 12), 9.0),
            ],
            ..Default::default()
        });

        sync_department_monthly(&store, &ctx(), Some(2026), Some(8))
            .await
            .unwrap();

        let rows = store.snapshot(|t| t.department_monthly.clone());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].report_month, "2026-10");
        assert_eq!(rows[0].working_hours, 6.0);
    }

    #[tokio::test]
    async fn department_rollup_links_employee_rows() {
        let engineering = Uuid::new_v4();
        let avery = Employee {
            id: Uuid::new_v4(),
            name: "Avery Lee".to_string(),
            department_id: Some(engineering),
        };
        let store = MemoryStore::with(Tables {
            employees: vec![avery.clone()],
            work_reports: vec![work_report(&avery, date(2026, 10, 1), 90, true)],
            ..Default::default()
        });

        sync_employee_monthly(&store, &ctx(), None, None).await.unwrap();
        let linked = store
            .department_employees(engineering, "2026-10")
            .await
            .unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].employee_id, avery.id);
        assert_eq!(linked[0].working_hours, 1.5);
    }
}
