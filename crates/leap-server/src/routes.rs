// crates/leap-server/src/routes.rs
// ============================================================================
// Module: LEAP HTTP Routes
// Description: axum router for experiment RPC, log queries, and admin.
// Purpose: Translate HTTP requests into experiment registry operations.
// Dependencies: axum, leap-core, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! Routes are grouped by surface:
//! - `/api/health` and `/api/experiments` describe the server.
//! - `/exp/{experiment}/...` serves calls, logs, functions and the README.
//! - `/exp/{experiment}/admin/...` manages students and reloads functions
//!   behind [`AdminAccess`].
//!
//! Core operations touch SQLite and the filesystem, so handlers run them on
//! the blocking pool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::extract::rejection::QueryRejection;
use axum::routing::get;
use axum::routing::post;
use leap_core::CallRequest;
use leap_core::DEFAULT_LOG_LIMIT;
use leap_core::ExperimentContext;
use leap_core::ExperimentRegistry;
use leap_core::LogOrder;
use leap_core::LogQuery;
use leap_core::MAX_LOG_LIMIT;
use leap_core::MIN_LOG_LIMIT;
use leap_core::Timestamp;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::auth::AdminAccess;
use crate::auth::AdminAuth;
use crate::error::ApiError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded experiments.
    pub registry: Arc<ExperimentRegistry>,
    /// Admin route policy.
    pub auth: Arc<AdminAuth>,
}

impl AppState {
    /// Bundles a registry with an admin policy.
    #[must_use]
    pub fn new(registry: ExperimentRegistry, auth: AdminAuth) -> Self {
        Self {
            registry: Arc::new(registry),
            auth: Arc::new(auth),
        }
    }

    /// Resolves an experiment by name.
    fn experiment(&self, name: &str) -> Result<Arc<ExperimentContext>, ApiError> {
        Ok(self.registry.lookup(name)?)
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the application router.
#[must_use]
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/experiments", get(list_experiments))
        .route("/exp/{experiment}/call", post(call_function))
        .route("/exp/{experiment}/logs", get(get_logs))
        .route("/exp/{experiment}/log-options", get(get_log_options))
        .route("/exp/{experiment}/functions", get(list_functions))
        .route("/exp/{experiment}/readme", get(get_readme))
        .route("/exp/{experiment}/is-registered", get(is_registered))
        .route("/exp/{experiment}/admin/add-student", post(add_student))
        .route("/exp/{experiment}/admin/students", get(list_students))
        .route("/exp/{experiment}/admin/delete-student", post(delete_student))
        .route("/exp/{experiment}/admin/reload-functions", post(reload_functions))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Runs a blocking core operation off the async executor.
async fn blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ApiError::internal(format!("worker failed: {err}")))?
}

// ============================================================================
// SECTION: Server Routes
// ============================================================================

/// `GET /api/health`
async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }))
}

/// `GET /api/experiments`
async fn list_experiments(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let experiments =
        blocking(move || Ok(registry.iter().map(|ctx| ctx.summary()).collect::<Vec<_>>())).await?;
    Ok(Json(json!({ "experiments": experiments })))
}

/// Fallback for unmatched paths.
async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}

// ============================================================================
// SECTION: Experiment Routes
// ============================================================================

/// RPC request body.
#[derive(Debug, Deserialize)]
struct CallBody {
    /// Caller identity.
    student_id: String,
    /// Function to invoke.
    func_name: String,
    /// Positional arguments.
    #[serde(default)]
    args: Option<Vec<Value>>,
    /// Keyword arguments.
    #[serde(default)]
    kwargs: Option<Map<String, Value>>,
    /// Optional trial label.
    #[serde(default)]
    trial: Option<String>,
}

impl From<CallBody> for CallRequest {
    fn from(body: CallBody) -> Self {
        let mut request = Self::new(body.func_name, body.student_id, body.args.unwrap_or_default())
            .with_kwargs(body.kwargs.unwrap_or_default());
        request.trial = body.trial;
        request
    }
}

/// `POST /exp/{experiment}/call`
async fn call_function(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
    body: Result<Json<CallBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let Json(body) = body?;
    let result = blocking(move || Ok(ctx.call(body.into())?)).await?;
    Ok(Json(json!({ "result": result })))
}

/// Log query parameters.
#[derive(Debug, Default, Deserialize)]
struct LogParams {
    /// Student filter.
    student_id: Option<String>,
    /// Trial filter.
    trial_name: Option<String>,
    /// Function filter.
    func_name: Option<String>,
    /// Inclusive lower bound.
    start_time: Option<String>,
    /// Inclusive upper bound.
    end_time: Option<String>,
    /// Page size.
    n: Option<i64>,
    /// `latest` or `earliest`.
    order: Option<String>,
    /// Pagination cursor.
    after_id: Option<i64>,
}

impl LogParams {
    /// Validates parameters into a store query.
    ///
    /// Empty filter values count as absent.
    fn into_query(self, ctx: &ExperimentContext) -> Result<LogQuery, ApiError> {
        let student_id = non_empty(self.student_id);
        let trial = non_empty(self.trial_name);
        let func_name = non_empty(self.func_name);
        let start_time = non_empty(self.start_time);
        let end_time = non_empty(self.end_time);
        let limit = self.n.unwrap_or(DEFAULT_LOG_LIMIT);
        if !(MIN_LOG_LIMIT ..= MAX_LOG_LIMIT).contains(&limit) {
            return Err(ApiError::bad_request(format!(
                "n must be between {MIN_LOG_LIMIT} and {MAX_LOG_LIMIT}"
            )));
        }
        let order = match self.order.as_deref() {
            Some(raw) => raw.parse::<LogOrder>().map_err(ApiError::bad_request)?,
            None => LogOrder::Latest,
        };
        if let Some(name) = func_name.as_deref()
            && !ctx.functions().contains(name)
        {
            return Err(ApiError::bad_request(format!("Unknown function: '{name}'")));
        }
        Ok(LogQuery {
            student_id,
            trial,
            func_name,
            start: parse_bound("start_time", start_time.as_deref())?,
            end: parse_bound("end_time", end_time.as_deref())?,
            limit,
            order,
            after_id: self.after_id,
        })
    }
}

/// Drops empty query values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

/// Parses an optional timestamp query bound.
fn parse_bound(field: &str, raw: Option<&str>) -> Result<Option<Timestamp>, ApiError> {
    raw.map(|text| {
        Timestamp::parse(text)
            .map_err(|err| ApiError::bad_request(format!("invalid {field} '{text}': {err}")))
    })
    .transpose()
}

/// `GET /exp/{experiment}/logs`
async fn get_logs(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
    params: Result<Query<LogParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let Query(params) = params?;
    let query = params.into_query(&ctx)?;
    let logs = blocking(move || Ok(ctx.query_logs(&query)?)).await?;
    Ok(Json(json!({ "logs": logs })))
}

/// `GET /exp/{experiment}/log-options`
async fn get_log_options(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let options = blocking(move || Ok(ctx.log_options()?)).await?;
    Ok(Json(json!(options)))
}

/// `GET /exp/{experiment}/functions`
async fn list_functions(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    Ok(Json(json!(ctx.describe_functions())))
}

/// `GET /exp/{experiment}/readme`
async fn get_readme(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let readme = blocking(move || Ok(ctx.readme()?)).await?;
    let document =
        readme.ok_or_else(|| ApiError::not_found("No README found for this experiment"))?;
    Ok(Json(json!(document)))
}

/// Registration probe parameters.
#[derive(Debug, Deserialize)]
struct RegisteredParams {
    /// Identity to look up.
    student_id: String,
}

/// `GET /exp/{experiment}/is-registered`
async fn is_registered(
    State(state): State<AppState>,
    Path(experiment): Path<String>,
    params: Result<Query<RegisteredParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let Query(params) = params?;
    let registered = blocking(move || Ok(ctx.is_registered(&params.student_id)?)).await?;
    Ok(Json(json!({ "registered": registered })))
}

// ============================================================================
// SECTION: Admin Routes
// ============================================================================

/// Student registration body.
#[derive(Debug, Deserialize)]
struct AddStudentBody {
    /// New student id.
    student_id: String,
    /// Display name.
    name: String,
    /// Optional contact email.
    #[serde(default)]
    email: Option<String>,
}

/// Student removal body.
#[derive(Debug, Deserialize)]
struct DeleteStudentBody {
    /// Student id to remove.
    student_id: String,
}

/// `POST /exp/{experiment}/admin/add-student`
async fn add_student(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(experiment): Path<String>,
    body: Result<Json<AddStudentBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let Json(body) = body?;
    let student = blocking(move || {
        Ok(ctx.add_student(&body.student_id, &body.name, body.email.as_deref())?)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "student_id": student.student_id })))
}

/// `GET /exp/{experiment}/admin/students`
async fn list_students(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(experiment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let students = blocking(move || Ok(ctx.list_students()?)).await?;
    Ok(Json(json!({ "students": students })))
}

/// `POST /exp/{experiment}/admin/delete-student`
async fn delete_student(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(experiment): Path<String>,
    body: Result<Json<DeleteStudentBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let ctx = state.experiment(&experiment)?;
    let Json(body) = body?;
    let student_id = body.student_id;
    let lookup_id = student_id.clone();
    let deleted = blocking(move || Ok(ctx.delete_student(&lookup_id)?)).await?;
    if !deleted {
        return Err(ApiError::not_found(format!("Student '{student_id}' not found")));
    }
    Ok(Json(json!({ "ok": true, "student_id": student_id })))
}

/// `POST /exp/{experiment}/admin/reload-functions`
async fn reload_functions(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(experiment): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let registry = Arc::clone(&state.registry);
    let count = blocking(move || Ok(registry.reload_functions(&experiment)?)).await?;
    Ok(Json(json!({ "ok": true, "functions_loaded": count })))
}
