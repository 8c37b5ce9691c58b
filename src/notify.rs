use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{CompletedCatchup, DailySnapshot, FaultType, ReportOutcome, ResidentProfile};
use crate::policy;

/// Delivery collaborator. Implementations own durability and retry; the
/// workflow only hands over one message per recipient.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        category: &str,
    ) -> anyhow::Result<()>;
}

/// Stand-in sink for CLI runs: writes each message to the log.
pub struct ConsoleSink;

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn send(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
        category: &str,
    ) -> anyhow::Result<()> {
        info!(user_id, category, "{title}: {message}");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub category: String,
}

/// Post-commit context for report notifications. Admin ids and the
/// snapshot are only fetched (and only used) for high-severity reports.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub resident: ResidentProfile,
    pub admin_ids: Vec<i64>,
    pub snapshot: Option<DailySnapshot>,
}

pub fn report_notifications(
    outcome: &ReportOutcome,
    ctx: &ReportContext,
) -> Vec<OutboundNotification> {
    let report = &outcome.report;
    let mut batch = Vec::new();

    let resident_message = match report.fault_type {
        FaultType::CollectorFault => {
            let issue = report.issue_type.as_deref().unwrap_or("a collection issue");
            match &outcome.catchup {
                Some(task) => format!(
                    "Your scheduled collection was missed due to {issue}. \
                     A catch-up collection is scheduled for {}.",
                    task.scheduled_date
                ),
                None => format!(
                    "Your scheduled collection was missed due to {issue}. \
                     A catch-up collection will be scheduled shortly."
                ),
            }
        }
        FaultType::ResidentFault => "Your collection was marked missed because the waste \
             was not available for pickup. It will be collected on your next regular \
             collection schedule."
            .to_string(),
    };
    batch.push(OutboundNotification {
        user_id: report.user_id,
        title: "Missed collection reported".to_string(),
        message: resident_message,
        category: "missed_collection".to_string(),
    });

    if let Some(task) = &outcome.catchup {
        let issue = task.issue_type.as_deref().unwrap_or("collection issue");
        batch.push(OutboundNotification {
            user_id: task.collector_id,
            title: "Catch-up collection assigned".to_string(),
            message: format!(
                "Catch-up collection for {} at {}: {issue}. Scheduled {} ({} priority).",
                ctx.resident.full_name,
                ctx.resident.address,
                task.scheduled_date,
                policy::priority_label(task.priority)
            ),
            category: "catchup_task".to_string(),
        });
    }

    if report.severity == "high" {
        if let Some(snapshot) = &ctx.snapshot {
            for admin_id in &ctx.admin_ids {
                batch.push(OutboundNotification {
                    user_id: *admin_id,
                    title: "High-severity missed collection".to_string(),
                    message: format!(
                        "A high-severity missed collection was reported. Today so far: \
                         {} missed ({} collector fault, {} resident fault), \
                         {} high severity, {} catch-up tasks pending.",
                        snapshot.total_missed,
                        snapshot.collector_fault_count,
                        snapshot.resident_fault_count,
                        snapshot.high_severity_count,
                        snapshot.pending_catchups
                    ),
                    category: "daily_analytics".to_string(),
                });
            }
        }
    }

    batch
}

pub fn completion_notifications(completion: &CompletedCatchup) -> Vec<OutboundNotification> {
    let mut message = format!(
        "Your catch-up collection was completed on {}.",
        completion.completed_at.date_naive()
    );
    if let Some(notes) = &completion.completion_notes {
        message.push_str(&format!(" Notes: {notes}"));
    }
    vec![OutboundNotification {
        user_id: completion.resident_id,
        title: "Catch-up collection completed".to_string(),
        message,
        category: "catchup_completed".to_string(),
    }]
}

/// Fire-and-forget delivery, always after commit. A failed send is logged
/// and swallowed; the committed report/task state is the authoritative
/// outcome either way.
pub async fn dispatch(sink: &dyn NotificationSink, batch: &[OutboundNotification]) {
    for notification in batch {
        if let Err(err) = sink
            .send(
                notification.user_id,
                &notification.title,
                &notification.message,
                &notification.category,
            )
            .await
        {
            warn!(
                user_id = notification.user_id,
                category = %notification.category,
                "notification send failed: {err:#}"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CatchupTask, MissedCollection, ReportStatus, TaskStatus,
    };
    use chrono::{NaiveDate, Utc};
    use std::sync::Mutex;
    use uuid::Uuid;

    fn report(fault_type: FaultType, severity: &str) -> MissedCollection {
        MissedCollection {
            id: Uuid::new_v4(),
            stop_id: None,
            schedule_id: None,
            user_id: 10,
            collector_id: 5,
            fault_type,
            issue_type: match fault_type {
                FaultType::CollectorFault => Some("truck_breakdown".to_string()),
                FaultType::ResidentFault => None,
            },
            issue_description: None,
            severity: severity.to_string(),
            estimated_delay_days: 3,
            additional_notes: None,
            status: ReportStatus::Reported,
            reported_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn task(report: &MissedCollection) -> CatchupTask {
        CatchupTask {
            id: Uuid::new_v4(),
            missed_collection_id: report.id,
            user_id: report.user_id,
            collector_id: report.collector_id,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            priority: 3,
            status: TaskStatus::Pending,
            issue_type: report.issue_type.clone(),
            notes: None,
            created_at: report.reported_at,
            completed_at: None,
            completion_notes: None,
        }
    }

    fn context(admin_ids: Vec<i64>, snapshot: Option<DailySnapshot>) -> ReportContext {
        ReportContext {
            resident: ResidentProfile {
                id: 10,
                full_name: "Maria Santos".to_string(),
                address: "14 Mabini St".to_string(),
            },
            admin_ids,
            snapshot,
        }
    }

    fn snapshot() -> DailySnapshot {
        DailySnapshot {
            day: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            total_missed: 4,
            collector_fault_count: 3,
            resident_fault_count: 1,
            high_severity_count: 2,
            pending_catchups: 5,
        }
    }

    #[test]
    fn collector_fault_notifies_resident_and_collector() {
        let report = report(FaultType::CollectorFault, "medium");
        let task = task(&report);
        let outcome = ReportOutcome {
            report,
            catchup: Some(task),
        };
        let batch = report_notifications(&outcome, &context(vec![1], None));

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].user_id, 10);
        assert!(batch[0].message.contains("truck_breakdown"));
        assert!(batch[0].message.contains("2024-06-04"));
        assert_eq!(batch[1].user_id, 5);
        assert!(batch[1].message.contains("Maria Santos"));
        assert!(batch[1].message.contains("14 Mabini St"));
        assert!(batch[1].message.contains("high priority"));
    }

    #[test]
    fn resident_fault_notifies_resident_only_with_rollover_phrasing() {
        let outcome = ReportOutcome {
            report: report(FaultType::ResidentFault, "low"),
            catchup: None,
        };
        let batch = report_notifications(&outcome, &context(vec![1], None));

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user_id, 10);
        assert!(batch[0].message.contains("next regular collection schedule"));
    }

    #[test]
    fn high_severity_fans_out_to_every_admin() {
        let report = report(FaultType::CollectorFault, "high");
        let task = task(&report);
        let outcome = ReportOutcome {
            report,
            catchup: Some(task),
        };
        let batch = report_notifications(&outcome, &context(vec![1, 2], Some(snapshot())));

        let admin_messages: Vec<&OutboundNotification> = batch
            .iter()
            .filter(|n| n.category == "daily_analytics")
            .collect();
        assert_eq!(admin_messages.len(), 2);
        assert_eq!(admin_messages[0].user_id, 1);
        assert_eq!(admin_messages[1].user_id, 2);
        assert!(admin_messages[0].message.contains("4 missed"));
        assert!(admin_messages[0].message.contains("5 catch-up tasks pending"));
    }

    #[test]
    fn medium_severity_sends_no_admin_notification() {
        let report = report(FaultType::CollectorFault, "medium");
        let task = task(&report);
        let outcome = ReportOutcome {
            report,
            catchup: Some(task),
        };
        let batch = report_notifications(&outcome, &context(vec![1], Some(snapshot())));
        assert!(batch.iter().all(|n| n.category != "daily_analytics"));
    }

    #[test]
    fn completion_message_carries_date_and_notes() {
        let completion = CompletedCatchup {
            task_id: Uuid::new_v4(),
            missed_collection_id: Uuid::new_v4(),
            resident_id: 10,
            collector_id: 5,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            completed_at: NaiveDate::from_ymd_opt(2024, 6, 4)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap()
                .and_utc(),
            completion_notes: Some("done, gate was open".to_string()),
        };
        let batch = completion_notifications(&completion);

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].category, "catchup_completed");
        assert!(batch[0].message.contains("2024-06-04"));
        assert!(batch[0].message.contains("gate was open"));
    }

    struct FlakySink {
        fail_for: i64,
        delivered: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn send(
            &self,
            user_id: i64,
            _title: &str,
            _message: &str,
            _category: &str,
        ) -> anyhow::Result<()> {
            if user_id == self.fail_for {
                anyhow::bail!("sink unavailable");
            }
            self.delivered.lock().unwrap().push(user_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_swallows_failures_and_delivers_the_rest() {
        let sink = FlakySink {
            fail_for: 10,
            delivered: Mutex::new(Vec::new()),
        };
        let report = report(FaultType::CollectorFault, "medium");
        let task = task(&report);
        let outcome = ReportOutcome {
            report,
            catchup: Some(task),
        };
        let batch = report_notifications(&outcome, &context(vec![], None));

        dispatch(&sink, &batch).await;

        assert_eq!(*sink.delivered.lock().unwrap(), vec![5]);
    }
}
