use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;
use uuid::Uuid;

use crate::calendar::EvalContext;
use crate::error::DashboardResult;
use crate::models::{DepartmentMonthly, EmployeeMonthly, MissedReport};
use crate::store::ReportStore;

pub struct DepartmentSection {
    pub totals: DepartmentMonthly,
    pub employees: Vec<EmployeeMonthly>,
}

pub async fn load_report(store: &dyn ReportStore, ctx: &EvalContext) -> DashboardResult<String> {
    let names = employee_names(store).await?;
    let missed = store.missed_reports().await?;

    let report_month = ctx.report_month();
    let mut departments = Vec::new();
    for totals in store.department_monthly(&report_month).await? {
        let employees = store
            .department_employees(totals.department_id, &report_month)
            .await?;
        departments.push(DepartmentSection { totals, employees });
    }

    Ok(build_report(ctx, &missed, &names, &departments))
}

async fn employee_names(store: &dyn ReportStore) -> DashboardResult<HashMap<Uuid, String>> {
    Ok(store
        .active_employees()
        .await?
        .into_iter()
        .map(|employee| (employee.id, employee.name))
        .collect())
}

fn display_name(names: &HashMap<Uuid, String>, id: Uuid) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

pub fn build_report(
    ctx: &EvalContext,
    missed: &[MissedReport],
    names: &HashMap<Uuid, String>,
    departments: &[DepartmentSection],
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Report Compliance Dashboard");
    let _ = writeln!(
        output,
        "Generated for {} (evaluated on {})",
        ctx.report_month(),
        ctx.today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Missed Reports");

    let mut ranked: Vec<&MissedReport> = missed.iter().filter(|r| r.total_missed > 0).collect();
    ranked.sort_by(|a, b| b.total_missed.cmp(&a.total_missed));

    if ranked.is_empty() {
        let _ = writeln!(output, "No missed reports this month.");
    } else {
        for row in ranked.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} missed over {} working days (POD {}, SOD {}, DWR {})",
                display_name(names, row.employee_id),
                row.total_missed,
                row.total_working_days,
                row.missed_pod,
                row.missed_sod,
                row.missed_dwr
            );
        }
    }

    let flagged_today: Vec<String> = missed
        .iter()
        .filter(|r| r.has_missed_today || r.has_missed_yesterday)
        .map(|r| display_name(names, r.employee_id))
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Missing Today or Yesterday");

    if flagged_today.is_empty() {
        let _ = writeln!(output, "Everyone is up to date.");
    } else {
        for name in &flagged_today {
            let _ = writeln!(output, "- {name}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Department Hours");

    if departments.is_empty() {
        let _ = writeln!(output, "No department totals for this month.");
    } else {
        for section in departments {
            let _ = writeln!(
                output,
                "- {}: {:.2} hours",
                section.totals.department_id, section.totals.working_hours
            );
            for employee in &section.employees {
                let _ = writeln!(
                    output,
                    "  - {}: {:.2} hours",
                    display_name(names, employee.employee_id),
                    employee.working_hours
                );
            }
        }
    }

    output
}

#[derive(Serialize)]
struct MissedCsvRow {
    employee: String,
    employee_id: Uuid,
    department_id: Option<Uuid>,
    total_working_days: i32,
    missed_pod: i32,
    missed_sod: i32,
    missed_dwr: i32,
    total_missed: i32,
    pod_submitted_count: i32,
    sod_submitted_count: i32,
    dwr_submitted_count: i32,
    has_missed_today: bool,
    has_missed_yesterday: bool,
}

impl MissedCsvRow {
    fn new(report: &MissedReport, employee: String) -> Self {
        Self {
            employee,
            employee_id: report.employee_id,
            department_id: report.department_id,
            total_working_days: report.total_working_days,
            missed_pod: report.missed_pod,
            missed_sod: report.missed_sod,
            missed_dwr: report.missed_dwr,
            total_missed: report.total_missed,
            pod_submitted_count: report.pod_submitted_count,
            sod_submitted_count: report.sod_submitted_count,
            dwr_submitted_count: report.dwr_submitted_count,
            has_missed_today: report.has_missed_today,
            has_missed_yesterday: report.has_missed_yesterday,
        }
    }
}

pub async fn export_missed_csv<W: std::io::Write>(
    store: &dyn ReportStore,
    writer: W,
) -> DashboardResult<usize> {
    let names = employee_names(store).await?;
    let rows = store.missed_reports().await?;
    write_missed_csv(writer, &rows, &names)
}

pub fn write_missed_csv<W: std::io::Write>(
    writer: W,
    rows: &[MissedReport],
    names: &HashMap<Uuid, String>,
) -> DashboardResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for report in rows {
        csv_writer.serialize(MissedCsvRow::new(
            report,
            display_name(names, report.employee_id),
        ))?;
    }
    csv_writer.flush()?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> EvalContext {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        EvalContext::new(today, today.and_hms_opt(8, 0, 0).unwrap())
    }

    fn missed(employee_id: Uuid, missed_pod: i32, today: bool) -> MissedReport {
        MissedReport {
            id: Uuid::new_v4(),
            employee_id,
            department_id: None,
            missed_pod,
            missed_sod: 1,
            missed_dwr: 0,
            total_missed: missed_pod + 1,
            total_working_days: 16,
            pod_submitted_count: 16 - missed_pod,
            sod_submitted_count: 15,
            dwr_submitted_count: 16,
            has_missed_current_month: true,
            has_missed_today: today,
            has_missed_yesterday: false,
            has_tag_red: true,
            has_tag_blue: false,
            has_tag_green: false,
        }
    }

    #[test]
    fn report_ranks_employees_by_missed_total() {
        let avery = Uuid::new_v4();
        let jules = Uuid::new_v4();
        let names = HashMap::from([
            (avery, "Avery Lee".to_string()),
            (jules, "Jules Moreno".to_string()),
        ]);
        let rows = vec![missed(avery, 1, false), missed(jules, 5, true)];

        let report = build_report(&ctx(), &rows, &names, &[]);

        let jules_at = report.find("- Jules Moreno: 6 missed").unwrap();
        let avery_at = report.find("- Avery Lee: 2 missed").unwrap();
        assert!(jules_at < avery_at);
        assert!(report.contains("## Missing Today or Yesterday\n- Jules Moreno"));
        assert!(report.contains("No department totals for this month."));
    }

    #[test]
    fn report_lists_department_members() {
        let avery = Uuid::new_v4();
        let department_id = Uuid::new_v4();
        let names = HashMap::from([(avery, "Avery Lee".to_string())]);
        let sections = vec![DepartmentSection {
            totals: DepartmentMonthly {
                id: Uuid::new_v4(),
                department_id,
                report_month: "2026-10".to_string(),
                total_work_minutes: 2_700,
                working_hours: 45.0,
            },
            employees: vec![EmployeeMonthly {
                id: Uuid::new_v4(),
                employee_id: avery,
                department_id: Some(department_id),
                report_month: "2026-10".to_string(),
                total_work_minutes: 2_700,
                working_hours: 45.0,
            }],
        }];

        let report = build_report(&ctx(), &[], &names, &sections);

        assert!(report.contains(&format!("- {department_id}: 45.00 hours")));
        assert!(report.contains("  - Avery Lee: 45.00 hours"));
        assert!(report.contains("No missed reports this month."));
    }

    #[test]
    fn csv_export_names_each_employee() {
        let avery = Uuid::new_v4();
        let names = HashMap::from([(avery, "Avery Lee".to_string())]);
        let mut buffer = Vec::new();

        let written = write_missed_csv(&mut buffer, &[missed(avery, 3, false)], &names).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("employee,employee_id,department_id,total_working_days"));
        assert!(lines.next().unwrap().starts_with("Avery Lee,"));
        assert_eq!(written, 1);
    }
}
