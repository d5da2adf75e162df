use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::CurrentUser;
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::models::{Rsvp, RsvpCreate};
use crate::store::StoreError;

const DUPLICATE_RSVP: &str = "duplicate RSVP for this attendee/event";

pub async fn create_rsvp(
    State(state): State<AppState>,
    _user: CurrentUser,
    event_id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<RsvpCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Rsvp>)> {
    let Path(event_id) = event_id?;
    let Json(payload) = payload?;

    let rsvp = state
        .store
        .create_rsvp(event_id, payload)
        .map_err(|err| match err {
            StoreError::Conflict(_) => ApiError::Conflict(DUPLICATE_RSVP.into()),
            other => other.into(),
        })?;
    tracing::info!(event_id, rsvp_id = rsvp.id, "RSVP recorded");
    Ok((StatusCode::CREATED, Json(rsvp)))
}

pub async fn list_rsvps(
    State(state): State<AppState>,
    event_id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Vec<Rsvp>>> {
    let Path(event_id) = event_id?;
    Ok(Json(state.store.list_rsvps(event_id)?))
}

pub async fn delete_rsvp(
    State(state): State<AppState>,
    _user: CurrentUser,
    ids: Result<Path<(u64, u64)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((event_id, rsvp_id)) = ids?;
    state.store.delete_rsvp(event_id, rsvp_id)?;
    Ok(StatusCode::NO_CONTENT)
}
