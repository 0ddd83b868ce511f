use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::models::{Service, Staff};
use crate::services::eligibility;
use crate::state::AppState;

// GET /api/catalog
#[derive(Serialize)]
pub struct CatalogResponse {
    pub services: Vec<Service>,
    pub staff: Vec<Staff>,
    pub time_slots: Vec<String>,
}

pub async fn get_catalog(State(state): State<Arc<AppState>>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        services: state.catalog.services.clone(),
        staff: state.catalog.staff.clone(),
        time_slots: state.catalog.time_slots.clone(),
    })
}

// GET /api/catalog/services/:service_id/staff
pub async fn get_eligible_staff(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> Json<Vec<Staff>> {
    let staff = eligibility::eligible_staff(&state.catalog, &service_id)
        .into_iter()
        .cloned()
        .collect();
    Json(staff)
}
