//! Dataset import and provenance endpoints. Every route requires an admin.

use std::path::Path;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::AdminUser;
use crate::config::validation::is_bare_file_name;
use crate::dataset;
use crate::http::error::{ApiError, ApiResult};
use crate::http::server::AppState;
use crate::store::models::ImportRun;

const DEFAULT_RUN_LIMIT: usize = 10;
const MAX_RUN_LIMIT: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct RunImportQuery {
    pub source_type: Option<String>,
    /// File name inside the configured import directory.
    pub file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListImportsQuery {
    pub limit: Option<usize>,
}

pub async fn run_import(
    State(state): State<AppState>,
    admin: AdminUser,
    query: Result<Query<RunImportQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Query(query) = query?;

    match query.source_type.as_deref() {
        None | Some("csv") => {}
        Some(other) => {
            return Err(ApiError::Validation(format!(
                "unsupported source_type: {other}"
            )))
        }
    }
    let file = query
        .file
        .unwrap_or_else(|| state.dataset.default_file.clone());
    if !is_bare_file_name(&file) {
        return Err(ApiError::Validation(
            "file must name a file inside the import directory".into(),
        ));
    }

    let path = Path::new(&state.dataset.import_dir).join(&file);
    tracing::info!(admin = %admin.username, file = %file, "Dataset import requested");
    let run = dataset::import_file(&state.store, &state.dataset.source_name, &path)
        .await
        .map_err(ApiError::internal)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Import finished",
            "source": file,
            "run": run,
        })),
    ))
}

pub async fn list_imports(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<ListImportsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ImportRun>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT);
    if !(1..=MAX_RUN_LIMIT).contains(&limit) {
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_RUN_LIMIT}"
        )));
    }
    Ok(Json(state.store.list_imports(limit)))
}

pub async fn dataset_meta(State(state): State<AppState>, _admin: AdminUser) -> Json<Value> {
    let Some((source, last_run)) = state.store.dataset_meta() else {
        return Json(json!({ "message": "No dataset imported yet" }));
    };
    Json(json!({
        "source_name": source.name,
        "source_url": source.url,
        "license": source.license,
        "last_import": last_run.as_ref().map(|r| r.started_at),
        "rows_inserted": last_run.as_ref().map_or(0, |r| r.rows_inserted),
        "sha256_hash": last_run.and_then(|r| r.sha256_hash),
    }))
}
