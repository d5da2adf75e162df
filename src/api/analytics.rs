//! Seasonality, trending and per-user recommendations.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{CurrentUser, INVALID_CREDENTIALS};
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::models::{Recommendations, Seasonality, TrendingItem};

const DEFAULT_WINDOW_DAYS: u32 = 30;
const MAX_WINDOW_DAYS: u32 = 365;
const DEFAULT_TRENDING_LIMIT: usize = 5;
const MAX_TRENDING_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct TrendingQuery {
    pub window_days: Option<u32>,
    pub limit: Option<usize>,
}

pub async fn seasonality(State(state): State<AppState>) -> Json<Seasonality> {
    Json(state.store.seasonality())
}

pub async fn trending(
    State(state): State<AppState>,
    query: Result<Query<TrendingQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<TrendingItem>>> {
    let Query(query) = query?;
    let window_days = query.window_days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(ApiError::Validation(format!(
            "window_days must be between 1 and {MAX_WINDOW_DAYS}"
        )));
    }
    let limit = query.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    if !(1..=MAX_TRENDING_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_TRENDING_LIMIT}"
        )));
    }

    Ok(Json(state.store.trending(Utc::now(), window_days, limit)))
}

pub async fn recommendations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Recommendations>> {
    let account = state
        .store
        .find_user(&user.username)
        .ok_or_else(|| ApiError::Unauthenticated(INVALID_CREDENTIALS.into()))?;

    Ok(Json(state.store.recommendations(
        account.id,
        &account.email,
        Utc::now(),
    )))
}
