use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::DateWindow;
use crate::error::DashboardResult;
use crate::models::{
    DailyTask, DashboardReport, DepartmentMonthly, Employee, EmployeeMonthly, MissedReport,
    ReportType, WorkReport,
};

/// Source reads and dashboard writes the sync stages need. Upserts are
/// expressed as lookup + insert/update so the caller decides what to keep
/// from an existing row.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn active_employees(&self) -> DashboardResult<Vec<Employee>>;

    async fn work_reports(&self) -> DashboardResult<Vec<WorkReport>>;

    async fn employee_work_reports(
        &self,
        employee_id: Uuid,
        window: DateWindow,
    ) -> DashboardResult<Vec<WorkReport>>;

    async fn daily_tasks(&self, window: Option<DateWindow>) -> DashboardResult<Vec<DailyTask>>;

    async fn employee_daily_tasks(
        &self,
        employee_id: Uuid,
        window: DateWindow,
    ) -> DashboardResult<Vec<DailyTask>>;

    async fn find_dashboard_report(
        &self,
        report_type: ReportType,
        employee_id: Option<Uuid>,
        report_date: NaiveDate,
    ) -> DashboardResult<Option<DashboardReport>>;

    async fn insert_dashboard_report(&self, report: &DashboardReport) -> DashboardResult<()>;

    async fn update_dashboard_report(&self, report: &DashboardReport) -> DashboardResult<()>;

    async fn delete_pod_sod_reports(&self, window: DateWindow) -> DashboardResult<u64>;

    async fn dashboard_reports_in_window(
        &self,
        report_type: ReportType,
        window: DateWindow,
    ) -> DashboardResult<Vec<DashboardReport>>;

    async fn missed_dashboard_reports(
        &self,
        employee_id: Uuid,
    ) -> DashboardResult<Vec<DashboardReport>>;

    async fn find_missed_report(&self, employee_id: Uuid)
        -> DashboardResult<Option<MissedReport>>;

    async fn save_missed_report(&self, report: &MissedReport, exists: bool)
        -> DashboardResult<()>;

    async fn missed_reports(&self) -> DashboardResult<Vec<MissedReport>>;

    async fn find_employee_monthly(
        &self,
        employee_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Option<EmployeeMonthly>>;

    async fn save_employee_monthly(
        &self,
        row: &EmployeeMonthly,
        exists: bool,
    ) -> DashboardResult<()>;

    async fn find_department_monthly(
        &self,
        department_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Option<DepartmentMonthly>>;

    async fn save_department_monthly(
        &self,
        row: &DepartmentMonthly,
        exists: bool,
    ) -> DashboardResult<()>;

    async fn department_monthly(&self, report_month: &str)
        -> DashboardResult<Vec<DepartmentMonthly>>;

    /// Employee rollups sharing a department and month.
    async fn department_employees(
        &self,
        department_id: Uuid,
        report_month: &str,
    ) -> DashboardResult<Vec<EmployeeMonthly>>;
}
