//! HTTP API for the ChoreHub web client.
//!
//! Reads go through the per-household snapshot cache; every mutation writes
//! to the store and then invalidates the affected household.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, patch, post},
    Router,
};
use chore_core::{
    config::Config,
    error::ChoreError,
    model::{
        Activity, HouseholdId, NewHousehold, NewMember, NewTask, NewUser, Task, TaskId,
        TaskPatch, User, UserId,
    },
};
use chore_stats::{
    completion_timeliness, dashboard, household_summary_for, member_stats, member_view,
    recurrence_breakdown, summary_trend, tasks_on_day,
};
use chore_store::{SnapshotCache, Store};
use chrono::{FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

type ApiError = (StatusCode, Json<Value>);

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    store: Store,
    cache: Arc<SnapshotCache>,
    api_key: Option<String>,
    uptime: Instant,
    /// Zone whose calendar decides "today" and schedule days.
    offset: FixedOffset,
    timeliness_limit: usize,
}

impl ApiState {
    pub fn new(store: Store, config: &Config) -> Result<Self, ChoreError> {
        let api_key = if config.api.api_key.is_empty() {
            None
        } else {
            Some(config.api.api_key.clone())
        };
        Ok(Self {
            cache: Arc::new(SnapshotCache::new(Arc::new(store.clone()))),
            store,
            api_key,
            uptime: Instant::now(),
            offset: config.stats.offset()?,
            timeliness_limit: config.stats.timeliness_limit,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteRequest {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HouseholdQuery {
    household_id: HouseholdId,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ScheduleQuery {
    date: Option<String>,
}

/// A task with its assignee inlined for list views.
#[derive(Serialize)]
struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<&'a User>,
}

#[derive(Serialize)]
struct ActivityView<'a> {
    #[serde(flatten)]
    activity: &'a Activity,
    user: Option<&'a User>,
}

const DEFAULT_ACTIVITY_LIMIT: usize = 50;

/// Constant-time string comparison to prevent timing attacks on API token validation.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check bearer token auth. Returns `None` if authorized, `Some(response)` if rejected.
fn check_auth(headers: &HeaderMap, api_key: &Option<String>) -> Option<ApiError> {
    let key = api_key.as_ref()?;

    let Some(header) = headers.get("authorization") else {
        return Some(unauthorized("missing Authorization header"));
    };
    let Ok(value) = header.to_str() else {
        return Some(unauthorized("invalid Authorization header"));
    };

    match value.strip_prefix("Bearer ") {
        Some(token) if constant_time_eq(token, key) => None,
        _ => Some(unauthorized("invalid token")),
    }
}

fn unauthorized(message: &str) -> ApiError {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": message})))
}

/// Map a domain error onto a status code and `{ "error": ... }` body.
fn error_response(e: ChoreError) -> ApiError {
    let status = match &e {
        ChoreError::Validation(_) => StatusCode::BAD_REQUEST,
        ChoreError::NotFound(_) => StatusCode::NOT_FOUND,
        ChoreError::Conflict(_) => StatusCode::CONFLICT,
        ChoreError::Config(_)
        | ChoreError::Store(_)
        | ChoreError::Io(_)
        | ChoreError::Serialization(_) => {
            error!("request failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({"error": e.to_string()})))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|e| bad_request(format!("invalid request: {e}")))
}

fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| bad_request(format!("invalid query: {e}")))
}

fn to_json<T: Serialize>(value: &T) -> Result<Json<Value>, ApiError> {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|e| error_response(e.into()))
}

fn created<T: Serialize>(value: &T) -> Result<(StatusCode, Json<Value>), ApiError> {
    Ok((StatusCode::CREATED, to_json(value)?))
}

/// `GET /api/health`
async fn health(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    Ok(Json(json!({
        "status": "ok",
        "uptimeSecs": state.uptime.elapsed().as_secs(),
    })))
}

/// `POST /api/users`
async fn create_user(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let new = parse_body(body)?;
    let user = state.store.create_user(&new).await.map_err(error_response)?;
    created(&user)
}

/// `GET /api/households`
async fn list_households(
    headers: HeaderMap,
    State(state): State<ApiState>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let households = state.store.list_households().await.map_err(error_response)?;
    to_json(&households)
}

/// `POST /api/households`
async fn create_household(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<NewHousehold>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let new = parse_body(body)?;
    let household = state
        .store
        .create_household(&new)
        .await
        .map_err(error_response)?;
    created(&household)
}

/// `GET /api/households/{id}`
async fn get_household(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    to_json(&snapshot.household)
}

/// `GET /api/households/{id}/users`
async fn household_users(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    if state
        .store
        .get_household(id)
        .await
        .map_err(error_response)?
        .is_none()
    {
        return Err(error_response(ChoreError::NotFound(format!("household {id}"))));
    }
    let members = state.store.members(id).await.map_err(error_response)?;
    to_json(&members)
}

/// `POST /api/households/{id}/members`
async fn add_member(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
    body: Result<Json<NewMember>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let new = parse_body(body)?;
    let member = state
        .store
        .add_member(id, &new)
        .await
        .map_err(error_response)?;
    state.cache.invalidate(id).await;
    created(&member)
}

/// `GET /api/households/{id}/tasks`
async fn household_tasks(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    let tasks: Vec<TaskView> = snapshot
        .tasks
        .iter()
        .map(|task| TaskView {
            task,
            assignee: task.assigned_to_id.and_then(|uid| snapshot.user(uid)),
        })
        .collect();
    to_json(&tasks)
}

/// `POST /api/tasks`
async fn create_task(
    headers: HeaderMap,
    State(state): State<ApiState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let new = parse_body(body)?;
    let task = state.store.create_task(&new).await.map_err(error_response)?;
    state.cache.invalidate(task.household_id).await;
    created(&task)
}

/// `PATCH /api/tasks/{id}`
async fn update_task(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<TaskId>,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let patch = parse_body(body)?;
    let task = state
        .store
        .update_task(id, &patch)
        .await
        .map_err(error_response)?;
    state.cache.invalidate(task.household_id).await;
    to_json(&task)
}

/// `POST /api/tasks/{id}/complete`
async fn complete_task(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<TaskId>,
    body: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let request = parse_body(body)?;
    let completion = state
        .store
        .complete_task(id, request.user_id, Utc::now())
        .await
        .map_err(error_response)?;
    state.cache.invalidate(completion.task.household_id).await;
    to_json(&completion)
}

/// `GET /api/households/{id}/activities?limit=`
async fn activities(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let limit = parse_query(query)?.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT);
    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    let feed = state
        .store
        .activities(id, i64::try_from(limit).unwrap_or(i64::MAX))
        .await
        .map_err(error_response)?;
    let views: Vec<ActivityView> = feed
        .iter()
        .map(|activity| ActivityView {
            activity,
            user: snapshot.user(activity.user_id),
        })
        .collect();
    to_json(&views)
}

/// `GET /api/households/{id}/dashboard`
///
/// Also records this week's summary so next week's trend has a baseline.
async fn household_dashboard(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    let now = Utc::now();
    let previous = state
        .store
        .previous_weekly_summary(id, now)
        .await
        .map_err(error_response)?;

    let view = dashboard(&snapshot, &now.with_timezone(&state.offset), previous.as_ref());

    if let Err(e) = state
        .store
        .record_weekly_summary(id, &view.summary, now)
        .await
    {
        warn!("failed to record weekly summary for household {id}: {e}");
    }

    to_json(&view)
}

/// `GET /api/stats/household/{id}`
async fn household_stats(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    let previous = state
        .store
        .previous_weekly_summary(id, Utc::now())
        .await
        .map_err(error_response)?;

    let summary = household_summary_for(&snapshot.tasks, &snapshot.users);
    to_json(&json!({
        "summary": summary,
        "trend": summary_trend(&summary, previous.as_ref()),
        "members": member_stats(&snapshot.tasks, &snapshot.users),
    }))
}

/// `GET /api/stats/user?householdId=`
async fn user_stats(
    headers: HeaderMap,
    State(state): State<ApiState>,
    query: Result<Query<HouseholdQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let household_id = parse_query(query)?.household_id;
    let snapshot = state
        .cache
        .get(household_id)
        .await
        .map_err(error_response)?;
    to_json(&member_stats(&snapshot.tasks, &snapshot.users))
}

/// `GET /api/households/{id}/timeliness?limit=`
async fn timeliness(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let limit = parse_query(query)?.limit.unwrap_or(state.timeliness_limit);
    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    to_json(&completion_timeliness(&snapshot.tasks, limit))
}

/// `GET /api/households/{id}/breakdown`
async fn breakdown(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    to_json(&recurrence_breakdown(&snapshot.tasks))
}

/// `GET /api/households/{id}/schedule?date=YYYY-MM-DD`; today when no date is given.
async fn schedule(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(id): Path<HouseholdId>,
    query: Result<Query<ScheduleQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let day = match parse_query(query)?.date {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|e| bad_request(format!("invalid date '{date}': {e}")))?,
        None => Utc::now().with_timezone(&state.offset).date_naive(),
    };
    let snapshot = state.cache.get(id).await.map_err(error_response)?;
    to_json(&json!({
        "date": day.to_string(),
        "tasks": tasks_on_day(&snapshot.tasks, day, &state.offset),
    }))
}

/// `GET /api/users/{id}/chores?householdId=`
async fn user_chores(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(user_id): Path<UserId>,
    query: Result<Query<HouseholdQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    let household_id = parse_query(query)?.household_id;
    let snapshot = state
        .cache
        .get(household_id)
        .await
        .map_err(error_response)?;
    if !snapshot.is_member(user_id) {
        return Err(error_response(ChoreError::NotFound(format!(
            "user {user_id} in household {household_id}"
        ))));
    }
    to_json(&member_view(&snapshot.tasks, user_id))
}

/// `GET /api/users/{id}/notifications`
async fn notifications(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    require_user(&state, user_id).await?;
    let list = state
        .store
        .notifications(user_id)
        .await
        .map_err(error_response)?;
    to_json(&list)
}

/// `POST /api/users/{id}/notifications/read-all`
async fn read_all_notifications(
    headers: HeaderMap,
    State(state): State<ApiState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Value>, ApiError> {
    if let Some(err) = check_auth(&headers, &state.api_key) {
        return Err(err);
    }

    require_user(&state, user_id).await?;
    let updated = state
        .store
        .mark_all_read(user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "updated": updated })))
}

async fn require_user(state: &ApiState, user_id: UserId) -> Result<(), ApiError> {
    match state.store.get_user(user_id).await.map_err(error_response)? {
        Some(_) => Ok(()),
        None => Err(error_response(ChoreError::NotFound(format!("user {user_id}")))),
    }
}

/// Build the axum router with shared state.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/users", post(create_user))
        .route("/api/households", get(list_households).post(create_household))
        .route("/api/households/{id}", get(get_household))
        .route("/api/households/{id}/users", get(household_users))
        .route("/api/households/{id}/members", post(add_member))
        .route("/api/households/{id}/tasks", get(household_tasks))
        .route("/api/households/{id}/activities", get(activities))
        .route("/api/households/{id}/dashboard", get(household_dashboard))
        .route("/api/households/{id}/timeliness", get(timeliness))
        .route("/api/households/{id}/breakdown", get(breakdown))
        .route("/api/households/{id}/schedule", get(schedule))
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/{id}", patch(update_task))
        .route("/api/tasks/{id}/complete", post(complete_task))
        .route("/api/stats/household/{id}", get(household_stats))
        .route("/api/stats/user", get(user_stats))
        .route("/api/users/{id}/chores", get(user_chores))
        .route("/api/users/{id}/notifications", get(notifications))
        .route(
            "/api/users/{id}/notifications/read-all",
            post(read_all_notifications),
        )
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024)) // 1 MB max request body
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config, store: Store) -> Result<(), ChoreError> {
    let state = ApiState::new(store, config)?;
    let app = build_router(state);
    let addr = format!("{}:{}", config.api.host, config.api.port);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!("API server failed to bind to {addr}: {e}");
        e
    })?;

    info!("API server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {e}");
            }
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
