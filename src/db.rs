use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::intake::{self, RawReport, ReportRequest};
use crate::models::{
    ActionType, BacklogTask, CatchupTask, CompletedCatchup, DailySnapshot, FaultType,
    MissedCollection, ReportOutcome, ReportStatRow, ReportStatus, ResidentProfile, TaskStatus,
};
use crate::{policy, schedule};

pub async fn init_db(pool: &PgPool) -> Result<(), WorkflowError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Records a missed collection and, for collector-fault reports, schedules
/// the catch-up task in the same transaction. Either everything lands
/// (report, optional task, action-log row) or nothing does.
pub async fn report_missed_collection(
    pool: &PgPool,
    request: &ReportRequest,
) -> Result<ReportOutcome, WorkflowError> {
    let now = Utc::now();
    let today = now.date_naive();
    let delay_days = request
        .delay_override
        .unwrap_or_else(|| policy::default_delay_days(request.issue_type.as_deref()));

    let report = MissedCollection {
        id: Uuid::new_v4(),
        stop_id: request.stop_id,
        schedule_id: request.schedule_id,
        user_id: request.user_id,
        collector_id: request.collector_id,
        fault_type: request.fault_type,
        issue_type: request.issue_type.clone(),
        issue_description: request.issue_description.clone(),
        severity: request.severity.clone(),
        estimated_delay_days: delay_days,
        additional_notes: request.additional_notes.clone(),
        status: ReportStatus::Reported,
        reported_at: now,
        resolved_at: None,
    };

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO collection_catchup.missed_collections
        (id, stop_id, schedule_id, user_id, collector_id, fault_type, issue_type,
         issue_description, severity, estimated_delay_days, additional_notes,
         status, reported_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(report.id)
    .bind(report.stop_id)
    .bind(report.schedule_id)
    .bind(report.user_id)
    .bind(report.collector_id)
    .bind(report.fault_type.as_str())
    .bind(&report.issue_type)
    .bind(&report.issue_description)
    .bind(&report.severity)
    .bind(report.estimated_delay_days)
    .bind(&report.additional_notes)
    .bind(report.status.as_str())
    .bind(report.reported_at)
    .execute(&mut *tx)
    .await?;

    let catchup = match report.fault_type {
        FaultType::CollectorFault => Some(schedule_catchup(&mut tx, &report, today).await?),
        FaultType::ResidentFault => None,
    };

    let details = json!({
        "missed_collection_id": report.id,
        "fault_type": report.fault_type.as_str(),
        "issue_type": report.issue_type,
        "severity": report.severity,
        "estimated_delay_days": report.estimated_delay_days,
        "catchup_task_id": catchup.as_ref().map(|t| t.id),
        "scheduled_date": catchup.as_ref().map(|t| t.scheduled_date),
    });
    append_action_log(
        &mut tx,
        report.user_id,
        report.collector_id,
        ActionType::MissedCollection,
        details,
        now,
    )
    .await?;

    tx.commit().await?;

    Ok(ReportOutcome { report, catchup })
}

/// Scheduler sub-step, always inside the recorder's transaction.
async fn schedule_catchup(
    tx: &mut Transaction<'_, Postgres>,
    report: &MissedCollection,
    today: NaiveDate,
) -> Result<CatchupTask, WorkflowError> {
    let task = CatchupTask {
        id: Uuid::new_v4(),
        missed_collection_id: report.id,
        user_id: report.user_id,
        collector_id: report.collector_id,
        scheduled_date: schedule::catchup_date(today, report.estimated_delay_days),
        priority: policy::priority_from_severity(&report.severity),
        status: TaskStatus::Pending,
        issue_type: report.issue_type.clone(),
        notes: report.additional_notes.clone(),
        created_at: report.reported_at,
        completed_at: None,
        completion_notes: None,
    };

    sqlx::query(
        r#"
        INSERT INTO collection_catchup.catchup_tasks
        (id, missed_collection_id, user_id, collector_id, scheduled_date,
         priority, status, issue_type, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(task.id)
    .bind(task.missed_collection_id)
    .bind(task.user_id)
    .bind(task.collector_id)
    .bind(task.scheduled_date)
    .bind(task.priority)
    .bind(task.status.as_str())
    .bind(&task.issue_type)
    .bind(&task.notes)
    .bind(task.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(task)
}

/// Completes a catch-up task and resolves its parent report. The guard is a
/// single atomic UPDATE keyed on task id, owning collector, and
/// not-already-completed, so repeat or cross-collector calls miss.
pub async fn complete_task(
    pool: &PgPool,
    task_id: Uuid,
    collector_id: i64,
    completion_notes: Option<&str>,
) -> Result<CompletedCatchup, WorkflowError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        UPDATE collection_catchup.catchup_tasks
        SET status = 'completed', completed_at = $3, completion_notes = $4
        WHERE id = $1 AND collector_id = $2 AND status <> 'completed'
        RETURNING missed_collection_id, user_id, scheduled_date
        "#,
    )
    .bind(task_id)
    .bind(collector_id)
    .bind(now)
    .bind(completion_notes)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        return Err(WorkflowError::not_found(format!(
            "no open catch-up task {task_id} for collector {collector_id}"
        )));
    };

    let completion = CompletedCatchup {
        task_id,
        missed_collection_id: row.get("missed_collection_id"),
        resident_id: row.get("user_id"),
        collector_id,
        scheduled_date: row.get("scheduled_date"),
        completed_at: now,
        completion_notes: completion_notes.map(str::to_string),
    };

    sqlx::query(
        r#"
        UPDATE collection_catchup.missed_collections
        SET status = 'resolved', resolved_at = $2
        WHERE id = $1
        "#,
    )
    .bind(completion.missed_collection_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let details = json!({
        "catchup_task_id": task_id,
        "missed_collection_id": completion.missed_collection_id,
        "scheduled_date": completion.scheduled_date,
        "completion_notes": completion.completion_notes,
    });
    append_action_log(
        &mut tx,
        completion.resident_id,
        collector_id,
        ActionType::CatchupCompleted,
        details,
        now,
    )
    .await?;

    tx.commit().await?;

    Ok(completion)
}

async fn append_action_log(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    collector_id: i64,
    action: ActionType,
    details: serde_json::Value,
    at: DateTime<Utc>,
) -> Result<(), WorkflowError> {
    sqlx::query(
        r#"
        INSERT INTO collection_catchup.collection_action_log
        (id, user_id, collector_id, action_type, details, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(collector_id)
    .bind(action.as_str())
    .bind(details)
    .bind(at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Open tasks for one collector, scheduled within the last 7 days or later.
/// Callers rank and annotate the result via `schedule::rank_backlog`.
pub async fn fetch_backlog(
    pool: &PgPool,
    collector_id: i64,
) -> Result<Vec<BacklogTask>, WorkflowError> {
    let cutoff = schedule::backlog_cutoff(schedule::today());
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.missed_collection_id, t.user_id, t.collector_id,
               t.scheduled_date, t.priority, t.status, t.issue_type, t.notes,
               t.created_at, t.completed_at, t.completion_notes,
               u.full_name, u.address
        FROM collection_catchup.catchup_tasks t
        JOIN collection_catchup.users u ON u.id = t.user_id
        WHERE t.collector_id = $1
          AND t.status IN ('pending', 'in_progress')
          AND t.scheduled_date >= $2
        "#,
    )
    .bind(collector_id)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(BacklogTask {
            task: map_task(&row)?,
            resident_name: row.get("full_name"),
            resident_address: row.get("address"),
            is_overdue: false,
            days_until_due: 0,
        });
    }
    Ok(tasks)
}

pub async fn fetch_resident_profile(
    pool: &PgPool,
    user_id: i64,
) -> Result<ResidentProfile, WorkflowError> {
    let row = sqlx::query(
        "SELECT id, full_name, address FROM collection_catchup.users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Err(WorkflowError::not_found(format!("no user {user_id}")));
    };
    Ok(ResidentProfile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        address: row.get("address"),
    })
}

pub async fn fetch_admin_ids(pool: &PgPool) -> Result<Vec<i64>, WorkflowError> {
    let rows = sqlx::query(
        "SELECT id FROM collection_catchup.users WHERE role = 'admin' ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(|row| row.get("id")).collect())
}

/// Same-day aggregate used for the admin trend notification. UTC day
/// bounds, matching every other date comparison in the workflow.
pub async fn daily_snapshot(pool: &PgPool, day: NaiveDate) -> Result<DailySnapshot, WorkflowError> {
    let day_start = day.and_time(NaiveTime::MIN).and_utc();
    let day_end = (day + chrono::Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total_missed,
               COUNT(*) FILTER (WHERE fault_type = 'collector_fault') AS collector_fault_count,
               COUNT(*) FILTER (WHERE fault_type = 'resident_fault') AS resident_fault_count,
               COUNT(*) FILTER (WHERE severity = 'high') AS high_severity_count
        FROM collection_catchup.missed_collections
        WHERE reported_at >= $1 AND reported_at < $2
        "#,
    )
    .bind(day_start)
    .bind(day_end)
    .fetch_one(pool)
    .await?;

    let pending: i64 = sqlx::query(
        "SELECT COUNT(*) AS pending FROM collection_catchup.catchup_tasks WHERE status = 'pending'",
    )
    .fetch_one(pool)
    .await?
    .get("pending");

    Ok(DailySnapshot {
        day,
        total_missed: row.get("total_missed"),
        collector_fault_count: row.get("collector_fault_count"),
        resident_fault_count: row.get("resident_fault_count"),
        high_severity_count: row.get("high_severity_count"),
        pending_catchups: pending,
    })
}

/// Report rows for the aggregated analytics read, optionally narrowed to
/// one collector.
pub async fn fetch_report_stats(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    collector_id: Option<i64>,
) -> Result<Vec<ReportStatRow>, WorkflowError> {
    let mut query = String::from(
        "SELECT fault_type, issue_type, severity, status \
         FROM collection_catchup.missed_collections \
         WHERE reported_at >= $1 AND reported_at < $2",
    );
    if collector_id.is_some() {
        query.push_str(" AND collector_id = $3");
    }

    let mut rows = sqlx::query(&query).bind(from).bind(to);
    if let Some(id) = collector_id {
        rows = rows.bind(id);
    }

    let records = rows.fetch_all(pool).await?;
    let mut stats = Vec::new();
    for row in records {
        let fault_raw: String = row.get("fault_type");
        let status_raw: String = row.get("status");
        stats.push(ReportStatRow {
            fault_type: FaultType::parse(&fault_raw)
                .ok_or_else(|| decode_error("fault_type", &fault_raw))?,
            issue_type: row.get("issue_type"),
            severity: row.get("severity"),
            status: ReportStatus::parse(&status_raw)
                .ok_or_else(|| decode_error("status", &status_raw))?,
        });
    }
    Ok(stats)
}

/// Bulk intake: each row goes through the same normalization and the same
/// transactional recorder as a live report. No notifications are
/// dispatched for imported rows.
pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> Result<usize, WorkflowError> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        user_id: String,
        collector_id: Option<String>,
        fault_type: String,
        issue_type: Option<String>,
        issue_description: Option<String>,
        severity: Option<String>,
        estimated_delay_days: Option<i32>,
        additional_notes: Option<String>,
        stop_id: Option<i64>,
        schedule_id: Option<i64>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .map_err(|err| WorkflowError::validation(format!("cannot read csv: {err}")))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result
            .map_err(|err| WorkflowError::validation(format!("malformed csv row: {err}")))?;
        let request = intake::normalize(RawReport {
            user_id: row.user_id,
            collector_id: row.collector_id,
            fault_type: row.fault_type,
            issue_type: row.issue_type,
            issue_description: row.issue_description,
            severity: row.severity,
            estimated_delay_days: row.estimated_delay_days,
            additional_notes: row.additional_notes,
            stop_id: row.stop_id,
            schedule_id: row.schedule_id,
        })?;
        report_missed_collection(pool, &request).await?;
        inserted += 1;
    }

    Ok(inserted)
}

pub async fn seed(pool: &PgPool) -> Result<(), WorkflowError> {
    let users = vec![
        (1i64, "Operations Desk", "City Environment Office", "admin"),
        (5, "Ramon Dizon", "Route 3 depot", "collector"),
        (6, "Ed Manalo", "Route 5 depot", "collector"),
        (10, "Maria Santos", "14 Mabini St", "resident"),
        (11, "Jose Reyes", "7 Rizal Ave", "resident"),
        (12, "Lita Cruz", "22 Bonifacio St", "resident"),
    ];

    for (id, full_name, address, role) in users {
        sqlx::query(
            r#"
            INSERT INTO collection_catchup.users (id, full_name, address, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET full_name = EXCLUDED.full_name, address = EXCLUDED.address,
                role = EXCLUDED.role
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(address)
        .bind(role)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    let today = now.date_naive();

    let resident_fault_id = Uuid::from_u128(0x6f1f2c0a_7c36_4f0e_9b63_6c9a2f5d1a01);
    sqlx::query(
        r#"
        INSERT INTO collection_catchup.missed_collections
        (id, user_id, collector_id, fault_type, severity, estimated_delay_days,
         additional_notes, status, reported_at)
        VALUES ($1, $2, $3, 'resident_fault', 'low', 0, $4, 'reported', $5)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(resident_fault_id)
    .bind(11i64)
    .bind(6i64)
    .bind("Bins not set out before 6am")
    .bind(now)
    .execute(pool)
    .await?;

    let collector_fault_id = Uuid::from_u128(0x9a4d7b7e_3d2a_41bb_8f0c_2f8e6f0b5c02);
    sqlx::query(
        r#"
        INSERT INTO collection_catchup.missed_collections
        (id, user_id, collector_id, fault_type, issue_type, severity,
         estimated_delay_days, status, reported_at)
        VALUES ($1, $2, $3, 'collector_fault', 'truck_breakdown', 'high', 3, 'reported', $4)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(collector_fault_id)
    .bind(10i64)
    .bind(5i64)
    .bind(now)
    .execute(pool)
    .await?;

    let task_id = Uuid::from_u128(0xc2d6e9b1_58a4_4a6f_b1d3_9e7a4c8f2b03);
    sqlx::query(
        r#"
        INSERT INTO collection_catchup.catchup_tasks
        (id, missed_collection_id, user_id, collector_id, scheduled_date,
         priority, status, issue_type, created_at)
        VALUES ($1, $2, $3, $4, $5, 3, 'pending', 'truck_breakdown', $6)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(task_id)
    .bind(collector_fault_id)
    .bind(10i64)
    .bind(5i64)
    .bind(schedule::catchup_date(today, 3))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

fn map_task(row: &PgRow) -> Result<CatchupTask, WorkflowError> {
    let status_raw: String = row.get("status");
    Ok(CatchupTask {
        id: row.get("id"),
        missed_collection_id: row.get("missed_collection_id"),
        user_id: row.get("user_id"),
        collector_id: row.get("collector_id"),
        scheduled_date: row.get("scheduled_date"),
        priority: row.get("priority"),
        status: TaskStatus::parse(&status_raw)
            .ok_or_else(|| decode_error("status", &status_raw))?,
        issue_type: row.get("issue_type"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
        completion_notes: row.get("completion_notes"),
    })
}

fn decode_error(column: &str, value: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unrecognized {column} value '{value}'").into(),
    }
}
