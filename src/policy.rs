/// Default catch-up delay in calendar days for a reported issue category.
/// Unrecognized or absent categories fall back to a one-day delay.
pub fn default_delay_days(issue_type: Option<&str>) -> i32 {
    match issue_type {
        Some("truck_breakdown") => 3,
        Some("equipment_failure") => 1,
        Some("route_blocked") => 2,
        Some("traffic_delay") => 1,
        Some("weather_conditions") => 1,
        Some("collector_emergency") => 2,
        Some("fuel_shortage") => 1,
        Some("safety_concern") => 1,
        Some("custom") | Some("other") => 1,
        _ => 1,
    }
}

pub fn priority_from_severity(severity: &str) -> i32 {
    match severity {
        "high" => 3,
        "medium" => 2,
        _ => 1,
    }
}

pub fn priority_label(priority: i32) -> &'static str {
    match priority {
        3 => "high",
        2 => "medium",
        _ => "low",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_table_matches_issue_categories() {
        assert_eq!(default_delay_days(Some("truck_breakdown")), 3);
        assert_eq!(default_delay_days(Some("route_blocked")), 2);
        assert_eq!(default_delay_days(Some("collector_emergency")), 2);
        assert_eq!(default_delay_days(Some("equipment_failure")), 1);
        assert_eq!(default_delay_days(Some("traffic_delay")), 1);
        assert_eq!(default_delay_days(Some("weather_conditions")), 1);
        assert_eq!(default_delay_days(Some("fuel_shortage")), 1);
        assert_eq!(default_delay_days(Some("safety_concern")), 1);
        assert_eq!(default_delay_days(Some("custom")), 1);
        assert_eq!(default_delay_days(Some("other")), 1);
    }

    #[test]
    fn unmapped_issue_defaults_to_one_day() {
        assert_eq!(default_delay_days(Some("alien_invasion")), 1);
        assert_eq!(default_delay_days(None), 1);
    }

    #[test]
    fn priority_is_total_and_strictly_ordered() {
        assert_eq!(priority_from_severity("high"), 3);
        assert_eq!(priority_from_severity("medium"), 2);
        assert_eq!(priority_from_severity("low"), 1);
        assert_eq!(priority_from_severity("catastrophic"), 1);
        assert_eq!(priority_from_severity(""), 1);
        assert!(priority_from_severity("high") > priority_from_severity("medium"));
        assert!(priority_from_severity("medium") > priority_from_severity("low"));
    }

    #[test]
    fn labels_round_trip_priorities() {
        assert_eq!(priority_label(3), "high");
        assert_eq!(priority_label(2), "medium");
        assert_eq!(priority_label(1), "low");
        assert_eq!(priority_label(0), "low");
    }
}
