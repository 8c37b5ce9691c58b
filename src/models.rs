use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    CollectorFault,
    ResidentFault,
}

impl FaultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultType::CollectorFault => "collector_fault",
            FaultType::ResidentFault => "resident_fault",
        }
    }

    pub fn parse(value: &str) -> Option<FaultType> {
        match value {
            "collector_fault" => Some(FaultType::CollectorFault),
            "resident_fault" => Some(FaultType::ResidentFault),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Reported,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Reported => "reported",
            ReportStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<ReportStatus> {
        match value {
            "reported" => Some(ReportStatus::Reported),
            "resolved" => Some(ReportStatus::Resolved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<TaskStatus> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    MissedCollection,
    CatchupCompleted,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::MissedCollection => "missed_collection",
            ActionType::CatchupCompleted => "catchup_completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MissedCollection {
    pub id: Uuid,
    pub stop_id: Option<i64>,
    pub schedule_id: Option<i64>,
    pub user_id: i64,
    pub collector_id: i64,
    pub fault_type: FaultType,
    pub issue_type: Option<String>,
    pub issue_description: Option<String>,
    pub severity: String,
    pub estimated_delay_days: i32,
    pub additional_notes: Option<String>,
    pub status: ReportStatus,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct CatchupTask {
    pub id: Uuid,
    pub missed_collection_id: Uuid,
    pub user_id: i64,
    pub collector_id: i64,
    pub scheduled_date: NaiveDate,
    pub priority: i32,
    pub status: TaskStatus,
    pub issue_type: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion_notes: Option<String>,
}

/// A pending or in-progress task joined with resident context, annotated
/// for the collector backlog view.
#[derive(Debug, Clone)]
pub struct BacklogTask {
    pub task: CatchupTask,
    pub resident_name: String,
    pub resident_address: String,
    pub is_overdue: bool,
    pub days_until_due: i64,
}

#[derive(Debug, Clone)]
pub struct CompletedCatchup {
    pub task_id: Uuid,
    pub missed_collection_id: Uuid,
    pub resident_id: i64,
    pub collector_id: i64,
    pub scheduled_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub completion_notes: Option<String>,
}

/// Result of recording a missed collection. The task is present exactly
/// when the fault lies with the collection operation.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: MissedCollection,
    pub catchup: Option<CatchupTask>,
}

#[derive(Debug, Clone)]
pub struct ResidentProfile {
    pub id: i64,
    pub full_name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DailySnapshot {
    pub day: NaiveDate,
    pub total_missed: i64,
    pub collector_fault_count: i64,
    pub resident_fault_count: i64,
    pub high_severity_count: i64,
    pub pending_catchups: i64,
}

/// Row shape fetched for the aggregated analytics read.
#[derive(Debug, Clone)]
pub struct ReportStatRow {
    pub fault_type: FaultType,
    pub issue_type: Option<String>,
    pub severity: String,
    pub status: ReportStatus,
}
