use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{Service, Staff};

/// Slots a staff member cannot be booked for, in three independent tiers.
/// Tier entries naming times outside the salon's slot grid are ignored by
/// the availability resolver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnavailabilityRule {
    /// Always blocked, regardless of date.
    #[serde(default)]
    pub default: Vec<String>,
    /// Blocked on a given day of week, 0 = Sunday .. 6 = Saturday.
    #[serde(default)]
    pub by_weekday: HashMap<u32, Vec<String>>,
    /// Blocked on one specific `YYYY-MM-DD` date.
    #[serde(default)]
    pub by_date: HashMap<String, Vec<String>>,
}

/// The salon's reference data: immutable for the process lifetime, built
/// once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub services: Vec<Service>,
    pub staff: Vec<Staff>,
    /// Ordered half-hour grid spanning the operating hours.
    pub time_slots: Vec<String>,
    /// Keyed by staff id; staff without an entry have no blocked slots.
    #[serde(default)]
    pub unavailable: HashMap<String, UnavailabilityRule>,
}

impl Catalog {
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(s)?;
        let mut prev: Option<(u32, &str)> = None;
        for slot in &catalog.time_slots {
            let minutes = parse_time(slot)?;
            if let Some((prev_minutes, prev_slot)) = prev {
                anyhow::ensure!(
                    minutes > prev_minutes,
                    "time slots not ascending: {slot} after {prev_slot}"
                );
            }
            prev = Some((minutes, slot));
        }
        for rule in catalog.unavailable.values() {
            for weekday in rule.by_weekday.keys() {
                anyhow::ensure!(*weekday <= 6, "invalid weekday: {weekday}");
            }
        }
        Ok(catalog)
    }

    pub fn from_json_file(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {path}"))?;
        Self::from_json(&raw).with_context(|| format!("invalid catalog file {path}"))
    }

    /// Built-in fixture for Beauty Salon Natali.
    pub fn salon_natali() -> Self {
        let services = vec![
            service("haircut", "Haircut", 45, 50, Some("Stylist")),
            service("color", "Hair coloring", 120, 180, Some("Stylist")),
            service("manicure", "Manicure", 60, 70, Some("Nails")),
            service("pedicure", "Pedicure", 75, 90, Some("Nails")),
        ];

        let staff = vec![
            member("nino", "Nino", &["Stylist"], 4.9),
            member("dato", "Dato", &["Stylist"], 4.8),
            member("mariam", "Mariam", &["Nails"], 4.9),
        ];

        let time_slots = [
            "10:00", "10:30", "11:00", "11:30", "12:00", "12:30", "13:00", "13:30", "14:00",
            "14:30", "15:00", "15:30", "16:00", "16:30", "17:00", "17:30", "18:00", "18:30",
        ]
        .iter()
        .map(|t| t.to_string())
        .collect();

        let mut unavailable = HashMap::new();
        unavailable.insert(
            "nino".to_string(),
            UnavailabilityRule {
                default: vec!["15:30".to_string()],
                by_weekday: HashMap::from([(1, vec!["10:00".to_string()])]),
                by_date: HashMap::from([(
                    "2025-09-14".to_string(),
                    vec!["12:00".to_string(), "12:30".to_string()],
                )]),
            },
        );
        unavailable.insert(
            "dato".to_string(),
            UnavailabilityRule {
                by_weekday: HashMap::from([(
                    6,
                    vec!["17:00".to_string(), "17:30".to_string()],
                )]),
                ..Default::default()
            },
        );

        Self {
            services,
            staff,
            time_slots,
            unavailable,
        }
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == id)
    }

    pub fn staff_member(&self, id: &str) -> Option<&Staff> {
        self.staff.iter().find(|m| m.id == id)
    }

    pub fn is_valid_slot(&self, slot: &str) -> bool {
        self.time_slots.iter().any(|t| t == slot)
    }
}

fn service(id: &str, name: &str, duration: u32, price: u32, role: Option<&str>) -> Service {
    Service {
        id: id.to_string(),
        name: name.to_string(),
        duration_minutes: duration,
        price_gel: price,
        required_role: role.map(str::to_string),
    }
}

fn member(id: &str, name: &str, roles: &[&str], rating: f32) -> Staff {
    Staff {
        id: id.to_string(),
        name: name.to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        rating,
    }
}

/// Validate an `HH:MM` string and return it as minutes since midnight.
fn parse_time(s: &str) -> anyhow::Result<u32> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    if hour > 23 || minute > 59 {
        return Err(anyhow::anyhow!("time out of range: {s}"));
    }
    Ok(hour * 60 + minute)
}
