//! Registration and token issuance.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::Deserialize;

use crate::auth::{hash_blocking, verify_blocking};
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::models::{Token, UserCreate, UserOut};
use crate::store::StoreError;

/// OAuth2 password-flow form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserOut>)> {
    let Json(payload) = payload?;
    payload.validate()?;

    let hash = hash_blocking(state.auth.clone(), payload.password).await?;
    let is_admin = state.auth.is_configured_admin(&payload.username);
    let user = state
        .store
        .create_user(payload.username, payload.email, hash, is_admin)
        .map_err(|err| match err {
            StoreError::Conflict("username") => {
                ApiError::BadRequest("Username already registered".into())
            }
            StoreError::Conflict("email") => ApiError::BadRequest("Email already registered".into()),
            other => other.into(),
        })?;

    tracing::info!(user_id = user.id, is_admin = user.is_admin, "User registered");
    Ok((StatusCode::CREATED, Json(UserOut::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> ApiResult<Json<Token>> {
    let Form(form) = form?;

    let user = state.store.find_user(&form.username);
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let verified = verify_blocking(state.auth.clone(), form.password, stored).await;

    match user {
        Some(user) if verified => Ok(Json(Token {
            access_token: state.auth.issue_token(&user.username),
            token_type: "bearer".to_string(),
        })),
        _ => Err(ApiError::Unauthenticated(
            "Incorrect username or password".into(),
        )),
    }
}
