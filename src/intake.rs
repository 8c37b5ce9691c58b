use serde::Deserialize;

use crate::error::WorkflowError;
use crate::models::FaultType;

/// Report payload as it arrives from the client boundary. Identifiers may
/// be plain integers or a single composite string `"<userId>-<collectorId>"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReport {
    pub user_id: String,
    pub collector_id: Option<String>,
    pub fault_type: String,
    pub issue_type: Option<String>,
    pub issue_description: Option<String>,
    pub severity: Option<String>,
    pub estimated_delay_days: Option<i32>,
    pub additional_notes: Option<String>,
    pub stop_id: Option<i64>,
    pub schedule_id: Option<i64>,
}

/// Normalized, validated report. The core never sees delimited strings.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub user_id: i64,
    pub collector_id: i64,
    pub fault_type: FaultType,
    pub issue_type: Option<String>,
    pub issue_description: Option<String>,
    pub severity: String,
    pub delay_override: Option<i32>,
    pub additional_notes: Option<String>,
    pub stop_id: Option<i64>,
    pub schedule_id: Option<i64>,
}

pub fn normalize(raw: RawReport) -> Result<ReportRequest, WorkflowError> {
    let (user_id, collector_id) = parse_party_ids(&raw.user_id, raw.collector_id.as_deref())?;

    let fault_type = FaultType::parse(raw.fault_type.trim()).ok_or_else(|| {
        WorkflowError::validation(format!(
            "fault_type must be collector_fault or resident_fault, got '{}'",
            raw.fault_type
        ))
    })?;

    let issue_type = raw
        .issue_type
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if fault_type == FaultType::CollectorFault && issue_type.is_none() {
        return Err(WorkflowError::validation(
            "issue_type is required for collector_fault reports",
        ));
    }

    if let Some(days) = raw.estimated_delay_days {
        if days < 0 {
            return Err(WorkflowError::validation(
                "estimated_delay_days must be zero or greater",
            ));
        }
    }

    let severity = raw
        .severity
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "medium".to_string());

    Ok(ReportRequest {
        user_id,
        collector_id,
        fault_type,
        issue_type,
        issue_description: non_blank(raw.issue_description),
        severity,
        delay_override: raw.estimated_delay_days,
        additional_notes: non_blank(raw.additional_notes),
        stop_id: raw.stop_id,
        schedule_id: raw.schedule_id,
    })
}

/// Splits the legacy composite `"<userId>-<collectorId>"` form, or pairs a
/// plain user id with the separately supplied collector id.
fn parse_party_ids(
    user_field: &str,
    collector_field: Option<&str>,
) -> Result<(i64, i64), WorkflowError> {
    let user_field = user_field.trim();
    if let Some((user_part, collector_part)) = user_field.split_once('-') {
        if collector_field.is_some() {
            return Err(WorkflowError::validation(
                "collector_id was supplied both in the composite user_id and separately",
            ));
        }
        let user_id = positive_id("user_id", user_part)?;
        let collector_id = positive_id("collector_id", collector_part)?;
        return Ok((user_id, collector_id));
    }

    let user_id = positive_id("user_id", user_field)?;
    let collector_id = match collector_field {
        Some(value) => positive_id("collector_id", value)?,
        None => {
            return Err(WorkflowError::validation("collector_id is required"));
        }
    };
    Ok((user_id, collector_id))
}

fn positive_id(field: &str, value: &str) -> Result<i64, WorkflowError> {
    let parsed: i64 = value
        .trim()
        .parse()
        .map_err(|_| WorkflowError::validation(format!("{field} must be an integer, got '{value}'")))?;
    if parsed <= 0 {
        return Err(WorkflowError::validation(format!(
            "{field} must be a positive integer, got {parsed}"
        )));
    }
    Ok(parsed)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
