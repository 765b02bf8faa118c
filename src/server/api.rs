//! REST API handlers
//!
//! Request bodies are loose JSON objects; each handler pulls the fields it
//! needs and reports a missing or mistyped one as a 400. Errors are returned
//! as `{"success": false, "error": "..."}`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Error, ErrorCategory, RedirectErrorTrait};
use crate::models::CuePayload;
use crate::storage::presets::encode as encode_presets;

use super::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Crate error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.category() {
            ErrorCategory::Validation | ErrorCategory::Scheduler => StatusCode::BAD_REQUEST,
            ErrorCategory::Authorization => StatusCode::UNAUTHORIZED,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::Remote => StatusCode::BAD_GATEWAY,
            ErrorCategory::Storage | ErrorCategory::Config | ErrorCategory::Other => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, recoverable = self.0.is_recoverable(), "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Loose request body
type Body = Json<Map<String, Value>>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Non-empty string field
fn required_str<'a>(body: &'a Map<String, Value>, field: &str) -> ApiResult<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(Error::missing(field).into()),
        Some(_) => Err(Error::validation(format!("'{field}' must be a string")).into()),
    }
}

/// String field defaulting to empty
fn optional_str<'a>(body: &'a Map<String, Value>, field: &str) -> ApiResult<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(Value::Null) | None => Ok(""),
        Some(_) => Err(Error::validation(format!("'{field}' must be a string")).into()),
    }
}

/// Boolean field; JSON truthiness for non-boolean values
fn flag(body: &Map<String, Value>, field: &str) -> Option<bool> {
    body.get(field).map(|value| match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    })
}

/// Integer field given as a JSON number or a numeric string
fn integer(body: &Map<String, Value>, field: &str) -> ApiResult<i64> {
    let invalid = || Error::validation(format!("'{field}' must be an integer"));
    match body.get(field) {
        None | Some(Value::Null) => Err(Error::missing(field).into()),
        Some(Value::Number(n)) => n.as_i64().ok_or_else(|| invalid().into()),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| invalid().into()),
        Some(_) => Err(invalid().into()),
    }
}

fn index(body: &Map<String, Value>) -> ApiResult<usize> {
    let value = integer(body, "index")?;
    usize::try_from(value)
        .map_err(|_| Error::validation("'index' must not be negative").into())
}

fn cue(body: &Map<String, Value>) -> ApiResult<Option<CuePayload>> {
    match body.get("cue") {
        None | Some(Value::Null) => Ok(None),
        Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| Error::validation(format!("Invalid 'cue': {e}")).into()),
        Some(_) => Err(Error::validation("'cue' must be an object or null").into()),
    }
}

fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Redirect endpoint used by the NFC tags
        .route("/redirect", get(redirect))
        // Redirect target
        .route("/api/current", get(current))
        .route("/api/set", post(set_current))
        .route("/api/temp", post(set_temporary))
        .route("/api/set-default", post(set_default))
        .route("/api/clear-timer", post(clear_timer))
        // Presets
        .route("/api/presets", get(list_presets))
        .route("/api/presets/add", post(add_preset))
        .route("/api/presets/delete", post(delete_preset))
        .route("/api/presets/rename", post(rename_preset))
        // Security gate
        .route("/api/security/status", get(security_status))
        .route("/api/security/toggle", post(security_toggle))
        .route("/api/security/set-key", post(security_set_key))
        .route("/api/security/regenerate", post(security_regenerate))
        // Port
        .route("/api/port", get(get_port).post(set_port))
        // Remote API
        .route(
            "/api/supabase/config",
            get(get_remote_config).post(set_remote_config),
        )
        .route("/api/supabase/test", post(test_remote))
        // Events
        .route("/api/events/scheduled", get(list_scheduled))
        .route("/api/events/scheduled/add", post(add_scheduled))
        .route("/api/events/scheduled/update", post(update_scheduled))
        .route("/api/events/scheduled/delete", post(delete_scheduled))
        .route("/api/events/manual", get(list_manual))
        .route("/api/events/manual/add", post(add_manual))
        .route("/api/events/manual/delete", post(delete_manual))
        .route("/api/events/create-now", post(create_event_now))
        // Preset activation
        .route("/preset/{name}", get(activate_by_url))
        .route("/api/preset/activate", post(activate))
        // Health
        .route("/api/health", get(health_check))
        .with_state(state)
}

// ============================================================================
// Handlers: redirect target
// ============================================================================

async fn redirect(State(state): State<AppState>) -> ApiResult<Response> {
    let target = state.service.state().current_url()?;
    Ok((StatusCode::FOUND, [(header::LOCATION, target)]).into_response())
}

async fn current(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.state().info()?))
}

async fn set_current(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let url = required_str(&body, "url")?;
    state.service.state().set_current_url(url)?;
    Ok(Json(json!({ "status": "ok", "current_url": url.trim() })))
}

async fn set_temporary(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let url = required_str(&body, "url")?;
    let seconds = integer(&body, "seconds")?;
    let seconds = u64::try_from(seconds)
        .map_err(|_| Error::validation("'seconds' must not be negative"))?;

    let expires = state.service.state().set_temporary_url(url, seconds)?;
    Ok(Json(json!({
        "status": "ok",
        "current_url": url.trim(),
        "expires_in": seconds,
        "expires_at": expires.timestamp_millis() as f64 / 1000.0,
    })))
}

async fn set_default(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let url = required_str(&body, "url")?;
    state.service.state().set_default_url(url)?;
    Ok(Json(json!({ "status": "ok", "default_url": url.trim() })))
}

async fn clear_timer(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.service.state().clear_timer()?;
    Ok(ok())
}

// ============================================================================
// Handlers: presets
// ============================================================================

async fn list_presets(State(state): State<AppState>) -> Json<Value> {
    Json(encode_presets(&state.service.state().presets()))
}

async fn add_preset(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let name = required_str(&body, "name")?;
    let url = required_str(&body, "url")?;
    let cue = cue(&body)?;
    state.service.state().upsert_preset(name, url, cue)?;
    Ok(ok())
}

async fn delete_preset(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let name = required_str(&body, "name")?;
    let deleted = state.service.state().delete_preset(name)?;
    Ok(Json(json!({ "status": "ok", "deleted": deleted })))
}

async fn rename_preset(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let old = required_str(&body, "old")?;
    let new = required_str(&body, "new")?;
    let renamed = state.service.state().rename_preset(old, new)?;
    Ok(Json(json!({ "status": "ok", "renamed": renamed })))
}

// ============================================================================
// Handlers: security gate
// ============================================================================

async fn security_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.state().security_info())
}

async fn security_toggle(State(state): State<AppState>, Json(body): Body) -> ApiResult<impl IntoResponse> {
    let enabled = flag(&body, "enabled").ok_or_else(|| Error::missing("enabled"))?;
    let redirect_state = state.service.state();
    redirect_state.set_api_key_enabled(enabled)?;
    Ok(Json(redirect_state.security_info()))
}

async fn security_set_key(State(state): State<AppState>, Json(body): Body) -> ApiResult<impl IntoResponse> {
    let key = required_str(&body, "api_key")?;
    let redirect_state = state.service.state();
    redirect_state.set_api_key(key)?;
    Ok(Json(redirect_state.security_info()))
}

async fn security_regenerate(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let redirect_state = state.service.state();
    redirect_state.regenerate_api_key()?;
    Ok(Json(redirect_state.security_info()))
}

// ============================================================================
// Handlers: port
// ============================================================================

async fn get_port(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "port": state.service.state().port() }))
}

async fn set_port(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let port = integer(&body, "port")?;
    let port = u16::try_from(port)
        .map_err(|_| Error::validation("Port must be between 1024 and 65535"))?;
    state.service.state().set_port(port)?;
    Ok(Json(json!({
        "status": "ok",
        "port": port,
        "requires_restart": true,
    })))
}

// ============================================================================
// Handlers: remote API
// ============================================================================

async fn get_remote_config(State(state): State<AppState>) -> Json<Value> {
    let remote = state.service.state().remote_config();
    Json(json!({
        "url": remote.url,
        "api_key": remote.masked_key(),
        "api_key_full": remote.api_key,
        "configured": remote.is_configured(),
    }))
}

async fn set_remote_config(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let url = optional_str(&body, "url")?;
    let api_key = optional_str(&body, "api_key")?;
    let remote = state.service.state().set_remote_config(url, api_key)?;
    Ok(Json(json!({ "status": "ok", "configured": remote.is_configured() })))
}

/// Diagnostic: reports failure in the body, not the status code
async fn test_remote(State(state): State<AppState>) -> Json<Value> {
    match state.service.test_connection().await {
        Ok(()) => Json(json!({ "success": true, "message": "Connection successful" })),
        // Unwrapped so the body reads "HTTP 401: ..." rather than nesting prefixes
        Err(Error::Remote(e)) => Json(json!({ "success": false, "error": e.to_string() })),
        Err(e) => Json(json!({ "success": false, "error": e.to_string() })),
    }
}

// ============================================================================
// Handlers: events
// ============================================================================

async fn list_scheduled(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.state().scheduled_events())
}

async fn add_scheduled(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let day = required_str(&body, "day")?;
    let time = required_str(&body, "time")?;
    let enabled = flag(&body, "enabled").unwrap_or(true);
    state.service.state().add_scheduled_event(day, time, enabled)?;
    Ok(ok())
}

async fn update_scheduled(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let index = index(&body)?;
    let day = required_str(&body, "day")?;
    let time = required_str(&body, "time")?;
    let enabled = flag(&body, "enabled").unwrap_or(true);
    state
        .service
        .state()
        .update_scheduled_event(index, day, time, enabled)?;
    Ok(ok())
}

async fn delete_scheduled(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let index = index(&body)?;
    state.service.state().remove_scheduled_event(index)?;
    Ok(ok())
}

async fn list_manual(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.state().manual_events())
}

async fn add_manual(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let date = required_str(&body, "date")?;
    let time = required_str(&body, "time")?;
    state.service.state().add_manual_event(date, time)?;
    Ok(ok())
}

async fn delete_manual(State(state): State<AppState>, Json(body): Body) -> ApiResult<Json<Value>> {
    let index = index(&body)?;
    state.service.state().remove_manual_event(index)?;
    Ok(ok())
}

async fn create_event_now(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let event_id = state.service.create_event_now().await?;
    Ok(Json(json!({ "status": "ok", "event_id": event_id })))
}

// ============================================================================
// Handlers: preset activation
// ============================================================================

/// `GET /preset/{name}?key=...`, for shortcuts and NFC automations
async fn activate_by_url(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<KeyQuery>,
) -> ApiResult<impl IntoResponse> {
    let activation = state
        .service
        .activate_preset_with_key(&name, query.key.as_deref())
        .await?;
    Ok(Json(activation.summary()))
}

/// `POST /api/preset/activate`, used by the control UI
async fn activate(State(state): State<AppState>, Json(body): Body) -> ApiResult<impl IntoResponse> {
    let name = required_str(&body, "name")?;
    let activation = state.service.activate_preset(name).await?;
    Ok(Json(activation.summary()))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "ez-redirect",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
