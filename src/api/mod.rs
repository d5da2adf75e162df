//! Route handlers for the event API.
//!
//! Handlers validate input, call the store and return records. Failures are
//! returned as [`ApiError`](crate::http::error::ApiError); rendering them is
//! the pipeline's job.

pub mod admin;
pub mod analytics;
pub mod attendees;
pub mod auth;
pub mod events;
pub mod rsvps;

use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/events", get(events::list_events).post(events::create_event))
        .route("/events/recommendations", get(analytics::recommendations))
        .route(
            "/events/{event_id}",
            get(events::get_event)
                .patch(events::patch_event)
                .delete(events::delete_event),
        )
        .route("/events/{event_id}/stats", get(events::event_stats))
        .route(
            "/events/{event_id}/rsvps",
            get(rsvps::list_rsvps).post(rsvps::create_rsvp),
        )
        .route(
            "/events/{event_id}/rsvps/{rsvp_id}",
            delete(rsvps::delete_rsvp),
        )
        .route("/attendees", post(attendees::create_attendee))
        .route("/attendees/{attendee_id}", get(attendees::get_attendee))
        .route("/analytics/events/seasonality", get(analytics::seasonality))
        .route("/analytics/events/trending", get(analytics::trending))
        .route("/admin/imports/run", post(admin::run_import))
        .route("/admin/imports", get(admin::list_imports))
        .route("/admin/dataset/meta", get(admin::dataset_meta))
        .fallback(not_found)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("route".into())
}
