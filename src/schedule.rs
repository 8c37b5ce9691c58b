use chrono::{Duration, NaiveDate, Utc};

use crate::models::BacklogTask;

/// All date-only arithmetic in the workflow runs on the UTC calendar date,
/// so reported/scheduled comparisons never mix clock conventions.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn catchup_date(today: NaiveDate, delay_days: i32) -> NaiveDate {
    today + Duration::days(i64::from(delay_days.max(0)))
}

/// Oldest scheduled date the backlog view still fetches. Overdue tasks
/// inside the window surface; anything older is left to reporting tools.
pub fn backlog_cutoff(today: NaiveDate) -> NaiveDate {
    today - Duration::days(7)
}

/// Annotates due-date state and orders the backlog: highest priority
/// first, earliest due date within equal priority.
pub fn rank_backlog(mut tasks: Vec<BacklogTask>, today: NaiveDate) -> Vec<BacklogTask> {
    for entry in tasks.iter_mut() {
        entry.days_until_due = (entry.task.scheduled_date - today).num_days();
        entry.is_overdue = entry.task.scheduled_date < today;
    }
    tasks.sort_by(|a, b| {
        b.task
            .priority
            .cmp(&a.task.priority)
            .then(a.task.scheduled_date.cmp(&b.task.scheduled_date))
    });
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatchupTask, TaskStatus};
    use uuid::Uuid;

    fn backlog_entry(priority: i32, scheduled_date: NaiveDate) -> BacklogTask {
        BacklogTask {
            task: CatchupTask {
                id: Uuid::new_v4(),
                missed_collection_id: Uuid::new_v4(),
                user_id: 10,
                collector_id: 5,
                scheduled_date,
                priority,
                status: TaskStatus::Pending,
                issue_type: Some("truck_breakdown".to_string()),
                notes: None,
                created_at: Utc::now(),
                completed_at: None,
                completion_notes: None,
            },
            resident_name: "Maria Santos".to_string(),
            resident_address: "14 Mabini St".to_string(),
            is_overdue: false,
            days_until_due: 0,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn catchup_date_adds_delay_days() {
        assert_eq!(catchup_date(date(2024, 6, 1), 3), date(2024, 6, 4));
        assert_eq!(catchup_date(date(2024, 6, 1), 0), date(2024, 6, 1));
        assert_eq!(catchup_date(date(2024, 6, 30), 2), date(2024, 7, 2));
    }

    #[test]
    fn negative_delay_never_schedules_in_the_past() {
        assert_eq!(catchup_date(date(2024, 6, 1), -4), date(2024, 6, 1));
    }

    #[test]
    fn backlog_cutoff_is_seven_days_back() {
        assert_eq!(backlog_cutoff(date(2024, 6, 10)), date(2024, 6, 3));
    }

    #[test]
    fn ranks_by_priority_descending() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            backlog_entry(1, date(2024, 6, 11)),
            backlog_entry(3, date(2024, 6, 13)),
            backlog_entry(2, date(2024, 6, 12)),
        ];
        let ranked = rank_backlog(tasks, today);
        let priorities: Vec<i32> = ranked.iter().map(|t| t.task.priority).collect();
        assert_eq!(priorities, vec![3, 2, 1]);
    }

    #[test]
    fn equal_priority_orders_by_earliest_date() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            backlog_entry(2, date(2024, 6, 14)),
            backlog_entry(2, date(2024, 6, 11)),
            backlog_entry(2, date(2024, 6, 12)),
        ];
        let ranked = rank_backlog(tasks, today);
        let dates: Vec<NaiveDate> = ranked.iter().map(|t| t.task.scheduled_date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 6, 11), date(2024, 6, 12), date(2024, 6, 14)]
        );
    }

    #[test]
    fn annotates_overdue_and_days_until_due() {
        let today = date(2024, 6, 10);
        let tasks = vec![
            backlog_entry(2, date(2024, 6, 8)),
            backlog_entry(2, date(2024, 6, 12)),
        ];
        let ranked = rank_backlog(tasks, today);
        assert!(ranked[0].is_overdue);
        assert_eq!(ranked[0].days_until_due, -2);
        assert!(!ranked[1].is_overdue);
        assert_eq!(ranked[1].days_until_due, 2);
    }
}
