use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use crate::models::Catalog;

/// Resolve the slots a staff member cannot be booked for on a given date.
///
/// Union of the rule's three tiers (always-blocked, weekday, specific date),
/// filtered to the salon's slot grid. Walking the grid in order makes the
/// result ascending and duplicate-free. Unknown staff ids resolve to no
/// blocked slots; an unparseable date only silences the weekday tier.
pub fn blocked_slots(catalog: &Catalog, staff_id: &str, date_iso: &str) -> Vec<String> {
    let Some(rule) = catalog.unavailable.get(staff_id) else {
        return Vec::new();
    };

    let mut blocked: HashSet<&str> = rule.default.iter().map(String::as_str).collect();

    if let Ok(date) = NaiveDate::parse_from_str(date_iso, "%Y-%m-%d") {
        let weekday = date.weekday().num_days_from_sunday();
        if let Some(slots) = rule.by_weekday.get(&weekday) {
            blocked.extend(slots.iter().map(String::as_str));
        }
    }

    if let Some(slots) = rule.by_date.get(date_iso) {
        blocked.extend(slots.iter().map(String::as_str));
    }

    catalog
        .time_slots
        .iter()
        .filter(|t| blocked.contains(t.as_str()))
        .cloned()
        .collect()
}
