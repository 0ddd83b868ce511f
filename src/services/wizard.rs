use serde::Serialize;

use crate::models::{BookingDraft, Catalog, Staff, WizardStep};
use crate::services::{availability, eligibility};

/// Generic message shown for any submission transport failure. The real
/// cause is logged, not surfaced.
pub const SUBMIT_ERROR_MESSAGE: &str =
    "Could not reach the booking service. Check the webhook configuration or use demo mode.";

/// Why a `submit` call did not start a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitBlocked {
    /// A send for this draft is already running; the call is a no-op.
    InFlight,
    /// The draft was already sent successfully; sends are one-shot.
    AlreadySent,
    /// Required fields are missing.
    Incomplete,
}

/// The five-step booking flow. Owns the draft; every mutation runs its
/// cascading invalidation synchronously, so the draft never holds a staff
/// member ineligible for the selected service or a time blocked for the
/// selected staff and date.
#[derive(Debug, Clone)]
pub struct BookingWizard {
    draft: BookingDraft,
    step: WizardStep,
    sending: bool,
    sent: bool,
    error: Option<String>,
}

impl BookingWizard {
    pub fn new() -> Self {
        Self {
            draft: BookingDraft::new(),
            step: WizardStep::Service,
            sending: false,
            sent: false,
            error: None,
        }
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// A send claimed through `begin_submit` has not reported back yet.
    pub fn is_in_flight(&self) -> bool {
        self.sending
    }

    pub fn select_service(&mut self, catalog: &Catalog, id: &str) {
        if catalog.service(id).is_none() {
            tracing::debug!(service = %id, "ignoring unknown service");
            return;
        }
        self.draft.service_id = Some(id.to_string());

        if self.step == WizardStep::Service {
            // Landing shortcut: a fresh pick drops any staff choice and
            // moves straight to the master step.
            if self.draft.staff_id.take().is_some() {
                self.revalidate_time(catalog);
            }
            self.step = WizardStep::Master;
        } else if let Some(staff_id) = self.draft.staff_id.clone() {
            // Revising the service later only clears a staff selection that
            // is no longer eligible.
            if !eligibility::is_eligible(catalog, id, &staff_id) {
                self.draft.staff_id = None;
                self.revalidate_time(catalog);
            }
        }
    }

    pub fn select_staff(&mut self, catalog: &Catalog, id: &str) {
        let service_id = self.draft.service_id.as_deref().unwrap_or("");
        if !eligibility::is_eligible(catalog, service_id, id) {
            tracing::debug!(staff = %id, "ignoring staff not eligible for selected service");
            return;
        }
        self.draft.staff_id = Some(id.to_string());
        self.revalidate_time(catalog);
    }

    pub fn set_date(&mut self, catalog: &Catalog, iso: &str) {
        self.draft.date = iso.trim().to_string();
        self.revalidate_time(catalog);
    }

    pub fn set_time(&mut self, catalog: &Catalog, slot: &str) {
        if !catalog.is_valid_slot(slot) {
            tracing::debug!(time = %slot, "ignoring time outside the slot grid");
            return;
        }
        if self.blocked_slots(catalog).iter().any(|t| t == slot) {
            tracing::debug!(time = %slot, "ignoring blocked time");
            return;
        }
        self.draft.time = Some(slot.to_string());
    }

    pub fn set_name(&mut self, name: &str) {
        self.draft.name = name.to_string();
    }

    pub fn set_phone(&mut self, phone: &str) {
        self.draft.phone = phone.to_string();
    }

    pub fn set_note(&mut self, note: &str) {
        self.draft.note = note.to_string();
    }

    pub fn set_consent(&mut self, consent: bool) {
        self.draft.consent = consent;
    }

    /// Gate for leaving the current step.
    pub fn can_advance(&self) -> bool {
        match self.step {
            WizardStep::Service => self.draft.service_id.is_some(),
            WizardStep::Master => self.draft.staff_id.is_some(),
            WizardStep::Schedule => !self.draft.date.is_empty() && self.draft.time.is_some(),
            WizardStep::Contact => {
                self.draft.name.trim().chars().count() > 1
                    && self.draft.phone.trim().chars().count() >= 8
                    && self.draft.consent
            }
            WizardStep::Confirm => true,
        }
    }

    /// Move forward one step if the gate holds; a failed gate is a no-op,
    /// not an error.
    pub fn advance(&mut self) {
        if self.can_advance() {
            self.step = self.step.next();
        }
    }

    /// Move back one step; never gated.
    pub fn retreat(&mut self) {
        self.step = self.step.prev();
    }

    /// Blocked slots for the currently selected staff and date. No staff
    /// selected means nothing is blocked.
    pub fn blocked_slots(&self, catalog: &Catalog) -> Vec<String> {
        match &self.draft.staff_id {
            Some(id) => availability::blocked_slots(catalog, id, &self.draft.date),
            None => Vec::new(),
        }
    }

    /// Claim the in-flight flag. The caller sends the lead (or runs the
    /// demo delay) and must report back through `finish_submit` exactly
    /// once.
    pub fn begin_submit(&mut self) -> Result<(), SubmitBlocked> {
        if self.sending {
            return Err(SubmitBlocked::InFlight);
        }
        if self.sent {
            return Err(SubmitBlocked::AlreadySent);
        }
        if !self.is_complete() {
            return Err(SubmitBlocked::Incomplete);
        }
        self.sending = true;
        self.error = None;
        Ok(())
    }

    /// Record the single outcome of a send started with `begin_submit`.
    /// Success is terminal; failure keeps the step and enables a manual
    /// retry.
    pub fn finish_submit(&mut self, result: anyhow::Result<()>) {
        self.sending = false;
        match result {
            Ok(()) => {
                self.sent = true;
                self.error = None;
                self.step = WizardStep::Confirm;
            }
            Err(err) => {
                tracing::warn!(error = %err, "booking submission failed");
                self.error = Some(SUBMIT_ERROR_MESSAGE.to_string());
            }
        }
    }

    /// Every gate up to and including Contact holds.
    fn is_complete(&self) -> bool {
        self.draft.service_id.is_some()
            && self.draft.staff_id.is_some()
            && !self.draft.date.is_empty()
            && self.draft.time.is_some()
            && self.draft.name.trim().chars().count() > 1
            && self.draft.phone.trim().chars().count() >= 8
            && self.draft.consent
    }

    fn revalidate_time(&mut self, catalog: &Catalog) {
        let blocked = self.blocked_slots(catalog);
        if let Some(time) = &self.draft.time {
            if blocked.iter().any(|t| t == time) {
                tracing::debug!(time = %time, "clearing time blocked under new staff/date");
                self.draft.time = None;
            }
        }
    }

    pub fn view(&self, catalog: &Catalog) -> WizardView {
        let service_id = self.draft.service_id.as_deref().unwrap_or("");
        WizardView {
            step: self.step.index(),
            step_label: self.step.label(),
            can_advance: self.can_advance(),
            eligible_staff: eligibility::eligible_staff(catalog, service_id)
                .into_iter()
                .cloned()
                .collect(),
            blocked_slots: self.blocked_slots(catalog),
            draft: self.draft.clone(),
            sending: self.sending,
            sent: self.sent,
            error: self.error.clone(),
        }
    }
}

impl Default for BookingWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the rendering side needs: current position, whether "next"
/// is enabled, the derived constraints, and the submission flags.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: usize,
    pub step_label: &'static str,
    pub can_advance: bool,
    pub eligible_staff: Vec<Staff>,
    pub blocked_slots: Vec<String>,
    pub draft: BookingDraft,
    pub sending: bool,
    pub sent: bool,
    pub error: Option<String>,
}
