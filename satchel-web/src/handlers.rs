//! HTTP handlers for the demo server
//!
//! Each handler maps one session operation onto an endpoint.

use crate::{middleware, ActiveSession, AppState, WebResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use satchel_core::CacheStats;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub cache: CacheStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub id: String,
    pub is_modified: bool,
    pub is_lazy: bool,
    pub store: Map<String, Value>,
    pub extras: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct FlashRequest {
    pub message: Value,
    #[serde(default, rename = "override")]
    pub is_override: bool,
}

#[derive(Debug, Deserialize)]
pub struct LazyRequest {
    pub enabled: bool,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: state.cache.stats(),
    })
}

/// Skipped route: reports whether a session was attached
pub async fn public_info(session: Option<ActiveSession>) -> Json<Value> {
    Json(json!({ "session": session.is_some() }))
}

pub async fn get_session(session: ActiveSession) -> Json<SessionView> {
    let record = session.snapshot();

    Json(SessionView {
        id: record.id().to_string(),
        is_modified: record.is_modified(),
        is_lazy: record.is_lazy(),
        store: record.store().clone(),
        extras: record.extras().clone(),
    })
}

pub async fn get_value(session: ActiveSession, Path(key): Path<String>) -> Json<Value> {
    let value = session.get(&key);
    Json(json!({ "key": key, "value": value }))
}

pub async fn put_value(
    session: ActiveSession,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> WebResult<Json<Value>> {
    let value = session.set_one(&key, value)?;
    Ok(Json(json!({ "key": key, "value": value })))
}

pub async fn set_values(
    session: ActiveSession,
    Json(values): Json<Value>,
) -> WebResult<Json<Map<String, Value>>> {
    Ok(Json(session.set_many(values)?))
}

/// Read a value and drop it from the session
pub async fn take_value(session: ActiveSession, Path(key): Path<String>) -> Json<Value> {
    let value = session.take(&key);
    Json(json!({ "key": key, "value": value }))
}

pub async fn clear_value(session: ActiveSession, Path(key): Path<String>) -> StatusCode {
    session.clear(&key);
    StatusCode::NO_CONTENT
}

pub async fn add_flash(
    session: ActiveSession,
    Path(kind): Path<String>,
    Json(request): Json<FlashRequest>,
) -> WebResult<Json<Vec<Value>>> {
    Ok(Json(session.flash(
        &kind,
        request.message,
        request.is_override,
    )?))
}

pub async fn get_flash(session: ActiveSession, Path(kind): Path<String>) -> Json<Vec<Value>> {
    Json(session.flash_take(&kind))
}

pub async fn get_all_flash(session: ActiveSession) -> Json<Map<String, Value>> {
    Json(session.flash_all())
}

pub async fn reset_session(session: ActiveSession) -> WebResult<Json<Value>> {
    let id = session.reset()?;
    Ok(Json(json!({ "id": id })))
}

/// Toggle lazy mode and set lazy properties
pub async fn set_lazy(
    session: ActiveSession,
    Json(request): Json<LazyRequest>,
) -> WebResult<Json<Value>> {
    session.lazy(request.enabled);
    for (key, value) in request.properties {
        session.set_extra(&key, value)?;
    }

    Ok(Json(json!({ "lazy": session.is_lazy() })))
}

pub async fn touch_session(session: ActiveSession) -> StatusCode {
    session.touch();
    StatusCode::NO_CONTENT
}

/// Commit before returning; the middleware then leaves the response alone
pub async fn commit_now(session: ActiveSession) -> WebResult<Response> {
    let mut response = Json(json!({ "id": session.id() })).into_response();
    middleware::commit(&session, &mut response).await?;
    Ok(response)
}

pub async fn revoke_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> WebResult<StatusCode> {
    state.revoke(&id).await?;
    info!(session_id = %id, "Revoked session via admin endpoint");
    Ok(StatusCode::NO_CONTENT)
}
