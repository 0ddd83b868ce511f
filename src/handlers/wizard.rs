use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Catalog;
use crate::services::crm::{self, LeadRecord};
use crate::services::wizard::{BookingWizard, SubmitBlocked, WizardView};
use crate::state::{AppState, WizardSession};

// POST /api/wizard
#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: WizardView,
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    state.evict_stale_sessions();

    let session_id = Uuid::new_v4();
    let wizard = BookingWizard::new();
    let view = wizard.view(&state.catalog);

    state
        .sessions
        .lock()
        .unwrap()
        .insert(session_id, WizardSession::new(wizard));
    tracing::info!(session = %session_id, "created booking session");

    Json(SessionResponse { session_id, view })
}

// GET /api/wizard/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    let sessions = state.sessions.lock().unwrap();
    let session = sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    Ok(Json(session.wizard.view(&state.catalog)))
}

/// Run one wizard command under the session lock and return the fresh view.
fn with_wizard<F>(state: &AppState, id: Uuid, command: F) -> Result<Json<WizardView>, AppError>
where
    F: FnOnce(&mut BookingWizard, &Catalog),
{
    let mut sessions = state.sessions.lock().unwrap();
    let session = sessions
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    command(&mut session.wizard, &state.catalog);
    session.touch();
    Ok(Json(session.wizard.view(&state.catalog)))
}

// POST /api/wizard/:id/service
#[derive(Deserialize)]
pub struct SelectServiceRequest {
    pub service_id: String,
}

pub async fn select_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectServiceRequest>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, catalog| {
        w.select_service(catalog, &req.service_id);
    })
}

// POST /api/wizard/:id/staff
#[derive(Deserialize)]
pub struct SelectStaffRequest {
    pub staff_id: String,
}

pub async fn select_staff(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectStaffRequest>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, catalog| {
        w.select_staff(catalog, &req.staff_id);
    })
}

// POST /api/wizard/:id/schedule
#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
}

pub async fn set_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ScheduleRequest>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, catalog| {
        if let Some(date) = &req.date {
            w.set_date(catalog, date);
        }
        if let Some(time) = &req.time {
            w.set_time(catalog, time);
        }
    })
}

// POST /api/wizard/:id/contact
#[derive(Deserialize)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub consent: Option<bool>,
}

pub async fn set_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, _| {
        if let Some(name) = &req.name {
            w.set_name(name);
        }
        if let Some(phone) = &req.phone {
            w.set_phone(phone);
        }
        if let Some(note) = &req.note {
            w.set_note(note);
        }
        if let Some(consent) = req.consent {
            w.set_consent(consent);
        }
    })
}

// POST /api/wizard/:id/advance
pub async fn advance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, _| w.advance())
}

// POST /api/wizard/:id/retreat
pub async fn retreat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    with_wizard(&state, id, |w, _| w.retreat())
}

// POST /api/wizard/:id/submit
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardView>, AppError> {
    // Claim the in-flight flag and snapshot the lead under the lock. A
    // concurrent duplicate lands in SubmitBlocked and gets the current view
    // back unchanged.
    let lead = {
        let mut sessions = state.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        session.touch();

        match session.wizard.begin_submit() {
            Ok(()) => LeadRecord::from_draft(session.wizard.draft(), &state.catalog),
            Err(SubmitBlocked::Incomplete) => {
                return Err(AppError::Validation(
                    "booking draft is incomplete".to_string(),
                ));
            }
            Err(SubmitBlocked::InFlight | SubmitBlocked::AlreadySent) => {
                return Ok(Json(session.wizard.view(&state.catalog)));
            }
        }
    };

    // The send and its bookkeeping run in a spawned task: axum drops this
    // handler future if the client disconnects, and the claimed in-flight
    // flag must still get its one outcome. The lock is not held across the
    // network call (or demo delay).
    let send_state = Arc::clone(&state);
    let send_task = tokio::spawn(async move {
        let result = match &send_state.crm {
            Some(crm) => {
                tracing::info!(session = %id, "submitting booking to CRM");
                crm.create_lead(&lead).await
            }
            None => {
                tracing::info!(session = %id, "demo mode: simulating booking submission");
                tokio::time::sleep(crm::DEMO_SEND_DELAY).await;
                Ok(())
            }
        };

        let mut sessions = send_state.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&id) {
            session.wizard.finish_submit(result);
            session.touch();
        }
    });
    let _ = send_task.await;

    let sessions = state.sessions.lock().unwrap();
    let session = sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    Ok(Json(session.wizard.view(&state.catalog)))
}
