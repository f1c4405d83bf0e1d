use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::DateWindow;
use crate::error::{DashboardError, DashboardResult};
use crate::models::{
    DailyTask, DashboardReport, DepartmentMonthly, Employee, EmployeeMonthly, MissedReport,
    ReportType, Tag, WorkReport, WorkReportLine,
};
use crate::store::ReportStore;

pub async fn init_db(pool: &PgPool) -> DashboardResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Optional `daily_tasks` columns present in this installation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskColumns {
    pub pod_submitted: bool,
    pub pod_submitted_date: bool,
    pub state: bool,
    pub sod_description: bool,
}

impl TaskColumns {
    pub async fn probe(pool: &PgPool) -> DashboardResult<Self> {
        let rows = sqlx::query(
            r#"
            SELECT column_name
            FROM information_schema.columns
            WHERE table_name = 'daily_tasks'
              AND table_schema = ANY (current_schemas(false))
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut columns = TaskColumns::default();
        for row in rows {
            let name: String = row.try_get("column_name")?;
            match name.as_str() {
                "pod_submitted" => columns.pod_submitted = true,
                "pod_submitted_date" => columns.pod_submitted_date = true,
                "state" => columns.state = true,
                "sod_description" => columns.sod_description = true,
                _ => {}
            }
        }
        Ok(columns)
    }

    fn select_list(&self) -> String {
        let pick = |present: bool, column: &str, null: &str| {
            if present {
                format!("t.{column}")
            } else {
                format!("{null} AS {column}")
            }
        };
        [
            pick(self.pod_submitted, "pod_submitted", "NULL::BOOLEAN"),
            pick(self.pod_submitted_date, "pod_submitted_date", "NULL::TIMESTAMP"),
            pick(self.state, "state", "NULL::TEXT"),
            pick(self.sod_description, "sod_description", "NULL::TEXT"),
        ]
        .join(", ")
    }
}

pub struct PgStore {
    pool: PgPool,
    task_columns: TaskColumns,
}

impl PgStore {
    pub async fn connect(pool: PgPool) -> DashboardResult<Self> {
        let task_columns = TaskColumns::probe(&pool).await?;
        info!(?task_columns, "daily task columns detected");
        Ok(Self { pool, task_columns })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn task_query(&self, filter: &str) -> String {
        format!(
            "SELECT t.id, t.employee_id, e.name AS employee_name, t.department_id, \
             t.task_date, {} \
             FROM daily_tasks t \
             LEFT JOIN employees e ON e.id = t.employee_id \
             {filter} \
             ORDER BY t.task_date, t.id",
            self.task_columns.select_list()
        )
    }
}

const WORK_REPORT_COLUMNS: &str = "r.id, r.employee_id, e.name AS employee_name, r.department_id, \
     r.report_date, r.submitted_time, COALESCE(r.total_work_minutes, 0)::BIGINT AS total_work_minutes";

const DASHBOARD_COLUMNS: &str = "id, name, report_date, employee_id, department_id, report_type, \
     working_hours, submitted_on, manager_marks, is_late, is_missed, tag, report_month, \
     is_current_month, is_today, is_yesterday";

const MISSED_COLUMNS: &str = "id, employee_id, department_id, missed_pod, missed_sod, missed_dwr, \
     total_missed, total_working_days, pod_submitted_count, sod_submitted_count, \
     dwr_submitted_count, has_missed_current_month, has_missed_today, has_missed_yesterday, \
     has_tag_red, has_tag_blue, has_tag_green";

fn work_report_from_row(row: &PgRow) -> DashboardResult<WorkReport> {
    Ok(WorkReport {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        date: row.try_get("report_date")?,
        submitted_time: row.try_get("submitted_time")?,
        total_work_minutes: row.try_get("total_work_minutes")?,
        lines: Vec::new(),
    })
}

fn task_from_row(row: &PgRow) -> DashboardResult<DailyTask> {
    Ok(DailyTask {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        date: row.try_get("task_date")?,
        pod_submitted: row.try_get("pod_submitted")?,
        pod_submitted_date: row.try_get("pod_submitted_date")?,
        state: row.try_get("state")?,
        sod_description: row.try_get("sod_description")?,
    })
}

fn dashboard_from_row(row: &PgRow) -> DashboardResult<DashboardReport> {
    let report_type: String = row.try_get("report_type")?;
    let tag: String = row.try_get("tag")?;
    Ok(DashboardReport {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        report_date: row.try_get("report_date")?,
        employee_id: row.try_get("employee_id")?,
        department_id: row.try_get("department_id")?,
        report_type: ReportType::parse(&report_type)
            .ok_or_else(|| DashboardError::other(format!("unknown report type {report_type}")))?,
        working_hours: row.try_get("working_hours")?,
        submitted_on: row.try_get("submitted_on")?,
        manager_marks: row.try_get("manager_marks")?,
        is_late: row.try_get("is_late")?,
        is_missed: row.try_get("is_missed")?,
        tag: Tag::parse(&tag).ok_or_else(|| DashboardError::other(format!("unknown tag {tag}")))?,
        report_month: row.try_get("report_month")?,
        is_current_month: row.try_get("is_current_month")?,
        is_today: row.try_get("is_today")?,
        is_yesterday: row.try_get("is_yesterday")?,
    })
}

fn missed_from_row(row: &PgRow) -> DashboardResult<MissedReport> {
    Ok(MissedReport {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        department_id: row.try_get("department_id")?,
        missed_pod: row.try_get("missed_pod")?,
        missed_sod: row.try_get("missed_sod")?,
        missed_dwr: row.try_get("missed_dwr")?,
        total_missed: row.try_get("total_missed")?,
        total_working_days: row.try_get("total_working_days")?,
        pod_submitted_count: row.try_get("pod_submitted_count")?,
        sod_submitted_count: row.try_get("sod_submitted_count")?,
        dwr_submitted_count: row.try_get("dwr_submitted_count")?,
        has_missed_current_month: row.try_get("has_missed_current_month")?,
        has_missed_today: row.try_get("has_missed_today")?,
        has_missed_yesterday: row.try_get("has_missed_yesterday")?,
        has_tag_red: row.try_get("has_tag_red")?,
        has_tag_blue: row.try_get("has_tag_blue")?,
        has_tag_green: row.try_get("has_tag_green")?,
    })
}

fn employee_monthly_from_row(row: &PgRow) -> DashboardResult<EmployeeMonthly> {
    Ok(EmployeeMonthly {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        department_id: row.try_get("department_id")?,
        report_month: row.try_get("report_month")?,
        total_work_minutes: row.try_get("total_work_minutes")?,
        working_hours: row.try_get("working_hours")?,
    })
}

fn department_monthly_from_row(row: &PgRow) -> DashboardResult<DepartmentMonthly> {
    Ok(DepartmentMonthly {
        id: row.try_get("id")?,
        department_id: row.try_get("department_id")?,
        report_month: row.try_get("report_month")?,
        total_work_minutes: row.try_get("total_work_minutes")?,
        working_hours: row.try_get("working_hours")?,
    })
}

#[async_trait]
impl ReportStore for PgStore {
    async fn active_employees(&self) -> DashboardResult<Vec<Employee>> {
        let rows = sqlx::query(
            "SELECT id, name, department_id FROM employees WHERE active ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DashboardResult<Employee> {
                Ok(Employee {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    department_id: row.try_get("department_id")?,
                })
            })
            .collect()
    }

    async fn work_reports(&self) -> DashboardResult<Vec<WorkReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {WORK_REPORT_COLUMNS} \
             FROM work_reports r \
             LEFT JOIN employees e ON e.id = r.employee_id \
             ORDER BY r.report_date, r.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let line_rows =
            sqlx::query("SELECT work_report_id, time_taken FROM work_report_lines ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        let mut lines: HashMap<Uuid, Vec<WorkReportLine>> = HashMap::new();
        for row in line_rows {
            let report_id: Uuid = row.try_get("work_report_id")?;
            lines.entry(report_id).or_default().push(WorkReportLine {
                time_taken: row.try_get("time_taken")?,
            });
        }

        let mut reports = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut report = work_report_from_row(row)?;
            report.lines = lines.remove(&report.id).unwrap_or_default();
            reports.push(report);
        }
        debug!(count = reports.len(), "work reports loaded");
        Ok(reports)
    }

    /// Lines are not loaded; callers only need minutes and submission times.
    async fn employee_work_reports(
        &self,
        employee_id: Uuid,
        window: DateWindow,
    ) -> DashboardResult<Vec<WorkReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {WORK_REPORT_COLUMNS} \
             FROM work_reports r \
             LEFT JOIN employees e ON e.id = r.employee_id \
             WHERE r.employee_id = $1 AND r.report_date BETWEEN $2 AND $3"
        ))
        .bind(employee_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(work_report_from_row).collect()
    }

    async fn daily_tasks(&self, window: Option<DateWindow>) -> DashboardResult<Vec<DailyTask>> {
        let rows = match window {
            Some(window) => {
                sqlx::query(&self.task_query("WHERE t.task_date BETWEEN $1 AND $2"))
                    .bind(window.start)
                    .bind(window.end)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&self.task_query(""))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(task_from_row).collect()
    }

    async fn employee_daily_tasks(
        &self,
        employee_id: Uuid,
        window: DateWindow,
    ) -> DashboardResult<Vec<DailyTask>> {
        let rows = sqlx::query(
            &self.task_query("WHERE t.employee_id = $1 AND t.task_date BETWEEN $2 AND $3"),
        )
        .bind(employee_id)
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn find_dashboard_report(
        &self,
        report_type: ReportType,
        employee_id: Option<Uuid>,
        report_date: NaiveDate,
    ) -> DashboardResult<Option<DashboardReport>> {
        let row = sqlx::query(&format!(
            "SELECT {DASHBOARD_COLUMNS} FROM hr_dashboard.dashboard_reports \
             WHERE report_type = $1 \
               AND employee_id IS NOT DISTINCT FROM $2 \
               AND report_date = $3 \
             LIMIT 1"
        ))
        .bind(report_type.as_str())
        .bind(employee_id)
        .bind(report_date)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(dashboard_from_row).transpose()
    }

    async fn insert_dashboard_report(&self, report: &DashboardReport) -> DashboardResult<()> {
        sqlx::query(
            r#"
            INSERT INTO hr_dashboard.dashboard_reports
            (id, name, report_date, employee_id, department_id, report_type, working_hours,
             submitted_on, manager_marks, is_late, is_missed, tag, report_month,
             is_current_month, is_today, is_yesterday)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(report.id)
        .bind(&report.name)
        .bind(report.report_date)
        .bind(report.employee_id)
        .bind(report.department_id)
        .bind(report.report_type.as_str())
        .bind(report.working_hours)
        .bind(report.submitted_on)
        .bind(report.manager_marks)
        .bind(report.is_late)
        .bind(report.is_missed)
        .bind(report.tag.as_str())
        .bind(&report.report_month)
        .bind(report.is_current_month)
        .bind(report.is_today)
        .bind(report.is_yesterday)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_dashboard_report(&self, report: &DashboardReport) -> DashboardResult<()> {
        sqlx::query(
            r#"
            UPDATE hr_dashboard.dashboard_reports
            SET name = $2, report_date = $3, employee_id = $4, department_id = $5,
                report_type = $6, working_hours = $7, submitted_on = $8, manager_marks = $9,
                is_late = $10, is_missed = $11, tag = $12, report_month = $13,
                is_current_month = $14, is_today = $15, is_yesterday = $16
            WHERE id = $1
            "#,
        )
        .bind(report.id)
        .bind(&report.name)
        .bind(report.report_date)
        .bind(report.employee_id)
        .bind(report.department_id)
        .bind(report.report_type.as_str())
        .bind(report.working_hours)
        .bind(report.submitted_on)
        .bind(report.manager_marks)
        .bind(report.is_late)
        .bind(report.is_missed)
        .bind(report.tag.as_str())
        .bind(&report.report_month)
        .bind(report.is_current_month)
        .bind(report.is_today)
        .bind(report.is_yesterday)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_pod_sod_reports(&self, window: DateWindow) -> DashboardResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM hr_dashboard.dashboard_reports
            WHERE report_type IN ('pod', 'sod')
              AND report_date BETWEEN $1 AND $2
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn dashboard_reports_in_window(
        &self,
        report_type: ReportType,
        window: DateWindow,
    ) -> DashboardResult<Vec<DashboardReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {DASHBOARD_COLUMNS} FROM hr_dashboard.dashboard_reports \
             WHERE report_type = $1 AND report_date BETWEEN $2 AND $3"
        ))
        .bind(report_type.as_str())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(dashboard_from_row).collect()
    }

    async fn missed_dashboard_reports(
        &self,
        employee_id: Uuid,
    ) -> DashboardResult<Vec<DashboardReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {DASHBOARD_COLUMNS} FROM hr_dashboard.dashboard_reports \
             WHERE employee_id = $1 AND is_missed"
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(dashboard_from_row).collect()
    }

    async fn find_missed_report(
        &self,
        employee_id: Uuid,
    ) -> DashboardResult<Option<MissedReport>> {
        let row = sqlx::query(&format!(
            "SELECT {MISSED_COLUMNS} FROM hr_dashboard.missed_reports \
             WHERE employee_id = $1 LIMIT 1"
        ))
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(missed_from_row).transpose()
    }

    async fn save_missed_report(
        &self,
        report: &MissedReport,
        exists: bool,
    ) -> DashboardResult<()> {
        let statement = if exists {
            r#"
            UPDATE hr_dashboard.missed_reports
            SET employee_id = $2, department_id = $3, missed_pod = $4, missed_sod = $5,
                missed_dwr = $6, total_missed = $7, total_working_days = $8,
                pod_submitted_count = $9, sod_submitted_count = $10, dwr_submitted_count = $11,
                has_missed_current_month = $12, has_missed_today = $13,
                has_missed_yesterday = $14, has_tag_red = $15, has_tag_blue = $16,
                has_tag_green = $17
            WHERE id = $1
            "#
        } else {
            r#"
            INSERT INTO hr_dashboard.missed_reports
            (id, employee_id, department_id, missed_pod, missed_sod, missed_dwr, total_missed,
             total_working_days, pod_submitted_count, sod_submitted_count, dwr_submitted_count,
             has_missed_current_month, has_missed_today, has_missed_yesterday, has_tag_red,
             has_tag_blue, has_tag_green)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#
        };

        sqlx::query(statement)
            .bind(report.id)
            .bind(report.employee_id)
            .bind(report.department_id)
            .bind(report.missed_pod)
            .bind(report.missed_sod)
            .bind(report.missed_dwr)
            .bind(report.total_missed)
            .bind(report.total_working_days)
            .bind(report.pod_submitted_count)
            .bind(report.sod_submitted_count)
            .bind(report.dwr_submitted_count)
            .bind(report.has_missed_current_month)
            .bind(report.has_missed_today)
            .bind(report.has_missed_yesterday)
            .bind(report.has_tag_red)
            .bind(report.has_tag_blue)
            .bind(report.has_tag_green)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn missed_reports(&self) -> DashboardResult<Vec<MissedReport>> {
        let rows = sqlx::query(&format!(
            "SELECT {MISSED_COLUMNS} FROM hr_dashboard.missed_reports \
             ORDER BY total_missed DESC, employee_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(missed_from_row).collect()
    }

    async fn find_employee_monthly(
        &self,
        employee_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Option<EmployeeMonthly>> {
        let row = sqlx::query(
            r#"
            SELECT id, employee_id, department_id, report_month, total_work_minutes, working_hours
            FROM hr_dashboard.employee_monthly
            WHERE employee_id = $1 AND report_month = $2
            LIMIT 1
            "#,
        )
        .bind(employee_id)
        .bind(report_month)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(employee_monthly_from_row).transpose()
    }

    async fn save_employee_monthly(
        &self,
        row: &EmployeeMonthly,
        exists: bool,
    ) -> DashboardResult<()> {
        let statement = if exists {
            r#"
            UPDATE hr_dashboard.employee_monthly
            SET employee_id = $2, department_id = $3, report_month = $4,
                total_work_minutes = $5, working_hours = $6
            WHERE id = $1
            "#
        } else {
            r#"
            INSERT INTO hr_dashboard.employee_monthly
            (id, employee_id, department_id, report_month, total_work_minutes, working_hours)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        };

        sqlx::query(statement)
            .bind(row.id)
            .bind(row.employee_id)
            .bind(row.department_id)
            .bind(&row.report_month)
            .bind(row.total_work_minutes)
            .bind(row.working_hours)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_department_monthly(
        &self,
        department_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Option<DepartmentMonthly>> {
        let row = sqlx::query(
            r#"
            SELECT id, department_id, report_month, total_work_minutes, working_hours
            FROM hr_dashboard.department_monthly
            WHERE department_id = $1 AND report_month = $2
            LIMIT 1
            "#,
        )
        .bind(department_id)
        .bind(report_month)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(department_monthly_from_row).transpose()
    }

    async fn save_department_monthly(
        &self,
        row: &DepartmentMonthly,
        exists: bool,
    ) -> DashboardResult<()> {
        let statement = if exists {
            r#"
            UPDATE hr_dashboard.department_monthly
            SET department_id = $2, report_month = $3, total_work_minutes = $4,
                working_hours = $5
            WHERE id = $1
            "#
        } else {
            r#"
            INSERT INTO hr_dashboard.department_monthly
            (id, department_id, report_month, total_work_minutes, working_hours)
            VALUES ($1, $2, $3, $4, $5)
            "#
        };

        sqlx::query(statement)
            .bind(row.id)
            .bind(row.department_id)
            .bind(&row.report_month)
            .bind(row.total_work_minutes)
            .bind(row.working_hours)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn department_monthly(
        &self,
        report_month: &str,
    ) -> DashboardResult<Vec<DepartmentMonthly>> {
        let rows = sqlx::query(
            r#"
            SELECT id, department_id, report_month, total_work_minutes, working_hours
            FROM hr_dashboard.department_monthly
            WHERE report_month = $1
            ORDER BY working_hours DESC
            "#,
        )
        .bind(report_month)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(department_monthly_from_row).collect()
    }

    async fn department_employees(
        &self,
        department_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Vec<EmployeeMonthly>> {
        let rows = sqlx::query(
            r#"
            SELECT id, employee_id, department_id, report_month, total_work_minutes, working_hours
            FROM hr_dashboard.employee_monthly
            WHERE department_id = $1 AND report_month = $2
            ORDER BY working_hours DESC
            "#,
        )
        .bind(department_id)
        .bind(report_month)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(employee_monthly_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_task_columns_read_as_null() {
        let columns = TaskColumns {
            pod_submitted: true,
            state: true,
            ..Default::default()
        };
        assert_eq!(
            columns.select_list(),
            "t.pod_submitted, NULL::TIMESTAMP AS pod_submitted_date, t.state, \
             NULL::TEXT AS sod_description"
        );
    }
}
