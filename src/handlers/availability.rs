use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::services::availability;
use crate::state::AppState;

// GET /api/availability?staff_id=nino&date=2025-09-14
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub staff_id: String,
    pub date: String,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub staff_id: String,
    pub date: String,
    pub blocked_slots: Vec<String>,
}

pub async fn get_blocked_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Json<AvailabilityResponse> {
    let blocked = availability::blocked_slots(&state.catalog, &query.staff_id, &query.date);
    Json(AvailabilityResponse {
        staff_id: query.staff_id,
        date: query.date,
        blocked_slots: blocked,
    })
}
