//! Event CRUD, listing and RSVP statistics.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::models::{parse_timestamp, Event, EventCreate, EventStats, EventUpdate, Page};
use crate::store::{EventFilter, EventSort};

const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub location: Option<String>,
    pub start_after: Option<String>,
    pub start_before: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> ApiResult<EventFilter> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let sort = match self.sort.as_deref() {
            None => EventSort::default(),
            Some(raw) => EventSort::parse(raw).ok_or_else(|| {
                ApiError::Validation(format!("unsupported sort key: {raw}"))
            })?,
        };

        Ok(EventFilter {
            q: self.q,
            location: self.location,
            start_after: timestamp_param("start_after", self.start_after)?,
            start_before: timestamp_param("start_before", self.start_before)?,
            sort,
            limit,
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn timestamp_param(
    name: &str,
    raw: Option<String>,
) -> ApiResult<Option<chrono::DateTime<chrono::Utc>>> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("{name} is not a valid datetime"))),
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    payload: Result<Json<EventCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Event>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let event = state.store.create_event(payload);
    tracing::info!(event_id = event.id, "Event created");
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Event>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    Ok(Json(state.store.list_events(&filter)))
}

pub async fn get_event(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Event>> {
    let Path(id) = id?;
    Ok(Json(state.store.get_event(id)?))
}

pub async fn patch_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> ApiResult<Json<Event>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;

    Ok(Json(state.store.update_event(id, patch)?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    _user: CurrentUser,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.store.delete_event(id)?;
    tracing::info!(event_id = id, "Event deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn event_stats(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<EventStats>> {
    let Path(id) = id?;
    Ok(Json(state.store.event_stats(id)?))
}
