use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::auth::CurrentUser;
use crate::http::error::ApiResult;
use crate::http::server::AppState;
use crate::store::models::{Attendee, AttendeeCreate};

pub async fn create_attendee(
    State(state): State<AppState>,
    _user: CurrentUser,
    payload: Result<Json<AttendeeCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Attendee>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let attendee = state.store.create_attendee(payload)?;
    Ok((StatusCode::CREATED, Json(attendee)))
}

pub async fn get_attendee(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Attendee>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_attendee(id)?))
}
