use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::PORTAL_RESOLUTIONS_TOTAL;
use crate::models::ResolvePortalsRequest;
use crate::portal::PortalAccess;
use crate::state::AppState;

pub async fn resolve_portals_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResolvePortalsRequest>, JsonRejection>,
) -> Result<Json<PortalAccess>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    PORTAL_RESOLUTIONS_TOTAL.inc();

    let access = state.portal_policy.resolve(payload.rows.as_deref());
    tracing::debug!(
        portals = access.portals.len(),
        landing = access.landing.as_str(),
        "resolved portal access"
    );

    Ok(Json(access))
}
