use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Dwr,
    Sod,
    Pod,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Dwr => "dwr",
            ReportType::Sod => "sod",
            ReportType::Pod => "pod",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dwr" => Some(ReportType::Dwr),
            "sod" => Some(ReportType::Sod),
            "pod" => Some(ReportType::Pod),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReportType::Dwr => "DWR",
            ReportType::Sod => "SOD",
            ReportType::Pod => "POD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    Red,
    Blue,
    Green,
}

impl Tag {
    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Red => "red",
            Tag::Blue => "blue",
            Tag::Green => "green",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "red" => Some(Tag::Red),
            "blue" => Some(Tag::Blue),
            "green" => Some(Tag::Green),
            _ => None,
        }
    }
}

/// Normalized dashboard row, one per (employee, date, report type).
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardReport {
    pub id: Uuid,
    pub name: String,
    pub report_date: Option<NaiveDate>,
    pub employee_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub report_type: ReportType,
    pub working_hours: f64,
    pub submitted_on: Option<NaiveDateTime>,
    pub manager_marks: i32,
    pub is_late: bool,
    pub is_missed: bool,
    pub tag: Tag,
    pub report_month: Option<String>,
    pub is_current_month: bool,
    pub is_today: bool,
    pub is_yesterday: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissedReport {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub department_id: Option<Uuid>,
    pub missed_pod: i32,
    pub missed_sod: i32,
    pub missed_dwr: i32,
    pub total_missed: i32,
    pub total_working_days: i32,
    pub pod_submitted_count: i32,
    pub sod_submitted_count: i32,
    pub dwr_submitted_count: i32,
    pub has_missed_current_month: bool,
    pub has_missed_today: bool,
    pub has_missed_yesterday: bool,
    pub has_tag_red: bool,
    pub has_tag_blue: bool,
    pub has_tag_green: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeMonthly {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub department_id: Option<Uuid>,
    pub report_month: String,
    pub total_work_minutes: i64,
    pub working_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentMonthly {
    pub id: Uuid,
    pub department_id: Uuid,
    pub report_month: String,
    pub total_work_minutes: i64,
    pub working_hours: f64,
}

#[derive(Debug, Clone)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct WorkReport {
    pub id: Uuid,
    pub employee_id: Option<Uuid>,
    pub employee_name: Option<String>,
    pub department_id: Option<Uuid>,
    pub date: NaiveDate,
    pub submitted_time: Option<NaiveDateTime>,
    pub total_work_minutes: i64,
    pub lines: Vec<WorkReportLine>,
}

#[derive(Debug, Clone)]
pub struct WorkReportLine {
    pub time_taken: Option<String>,
}

/// Daily task entry as read from the ERP. The POD/SOD columns are optional
/// because not every installation carries them.
#[derive(Debug, Clone)]
pub struct DailyTask {
    pub id: Uuid,
    pub employee_id: Option<Uuid>,
    pub employee_name: Option<String>,
    pub department_id: Option<Uuid>,
    pub date: NaiveDate,
    pub pod_submitted: Option<bool>,
    pub pod_submitted_date: Option<NaiveDateTime>,
    pub state: Option<String>,
    pub sod_description: Option<String>,
}

impl DailyTask {
    pub fn pod_is_submitted(&self) -> bool {
        self.pod_submitted.unwrap_or(false)
    }

    pub fn sod_is_submitted(&self) -> bool {
        self.state.as_deref() == Some("done")
            || self
                .sod_description
                .as_deref()
                .is_some_and(|text| !text.is_empty())
    }
}
