use chrono::Local;
use serde::{Deserialize, Serialize};

/// The five wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Service,
    Master,
    Schedule,
    Contact,
    Confirm,
}

impl WizardStep {
    pub fn index(self) -> usize {
        match self {
            WizardStep::Service => 0,
            WizardStep::Master => 1,
            WizardStep::Schedule => 2,
            WizardStep::Contact => 3,
            WizardStep::Confirm => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Service => "Service",
            WizardStep::Master => "Master",
            WizardStep::Schedule => "Date/Time",
            WizardStep::Contact => "Contact",
            WizardStep::Confirm => "Confirm",
        }
    }

    /// Following step, saturating at `Confirm`.
    pub fn next(self) -> Self {
        match self {
            WizardStep::Service => WizardStep::Master,
            WizardStep::Master => WizardStep::Schedule,
            WizardStep::Schedule => WizardStep::Contact,
            WizardStep::Contact | WizardStep::Confirm => WizardStep::Confirm,
        }
    }

    /// Preceding step, saturating at `Service`.
    pub fn prev(self) -> Self {
        match self {
            WizardStep::Service | WizardStep::Master => WizardStep::Service,
            WizardStep::Schedule => WizardStep::Master,
            WizardStep::Contact => WizardStep::Schedule,
            WizardStep::Confirm => WizardStep::Contact,
        }
    }
}

/// The in-progress booking, accumulated field by field as the visitor moves
/// through the wizard. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDraft {
    pub service_id: Option<String>,
    pub staff_id: Option<String>,
    /// ISO `YYYY-MM-DD`, defaults to today.
    pub date: String,
    pub time: Option<String>,
    pub name: String,
    pub phone: String,
    pub note: String,
    pub consent: bool,
}

impl BookingDraft {
    pub fn new() -> Self {
        Self {
            service_id: None,
            staff_id: None,
            date: Local::now().date_naive().to_string(),
            time: None,
            name: String::new(),
            phone: String::new(),
            note: String::new(),
            consent: true,
        }
    }
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self::new()
    }
}
