//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ChatHistoryResponse, ChatResponse, CourseListResponse, CourseResponse, CreateCourseRequest, ErrorResponse,
    SavedContentListResponse, SavedContentResponse, SelectCourseRequest, SendMessageRequest,
    SuccessResponse, UpdateCourseRequest,
};
use super::AppState;
use crate::db::DbError;
use crate::promote::PromoteError;
use crate::runtime::{SessionError, SessionSnapshot};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Course browser
        .route("/api/courses", get(list_courses).post(create_course))
        .route("/api/courses/:id", put(update_course).delete(delete_course))
        // Stored exchanges across users
        .route("/api/history", get(list_history))
        // Live session
        .route("/api/users/:user_id/session", get(get_session))
        .route("/api/users/:user_id/session/course", post(select_course))
        .route("/api/users/:user_id/session/messages", post(send_message))
        .route("/api/users/:user_id/session/stream", get(stream_session))
        .route(
            "/api/users/:user_id/session/turns/:turn_id/save",
            post(save_turn),
        )
        // Saved content
        .route("/api/users/:user_id/saved", get(list_saved))
        .route(
            "/api/users/:user_id/saved/:id",
            get(get_saved).delete(delete_saved),
        )
        .with_state(state)
}

// ============================================================
// Courses
// ============================================================

async fn list_courses(State(state): State<AppState>) -> Result<Json<CourseListResponse>, AppError> {
    let courses = state.db.list_courses()?;
    Ok(Json(CourseListResponse { courses }))
}

async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Course title is required".to_string()));
    }
    let course = state
        .db
        .create_course(&req.title, &req.content, req.created_by.as_deref())?;
    tracing::info!(course_id = %course.id, title = %course.title, "Created course");
    Ok((StatusCode::CREATED, Json(CourseResponse { course })))
}

async fn update_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> Result<Json<CourseResponse>, AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Course title is required".to_string()));
    }
    let course = state.db.update_course(&id, &req.title, &req.content)?;
    Ok(Json(CourseResponse { course }))
}

async fn delete_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_course(&id)?;
    tracing::info!(course_id = %id, "Deleted course");
    Ok(Json(SuccessResponse { ok: true }))
}

// ============================================================
// Chat history review
// ============================================================

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    user_id: Option<String>,
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ChatHistoryResponse>, AppError> {
    let pairs = state.db.list_all_pairs(query.user_id.as_deref())?;
    Ok(Json(ChatHistoryResponse { pairs }))
}

// ============================================================
// Session
// ============================================================

async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<SessionSnapshot> {
    let handle = state.sessions.get_or_create(&user_id).await;
    Json(handle.snapshot())
}

async fn select_course(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SelectCourseRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let course = state.db.get_course(&req.course_id)?;
    let handle = state.sessions.get_or_create(&user_id).await;
    handle.select_course(course).await?;
    Ok(Json(SuccessResponse { ok: true }))
}

async fn send_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    let handle = state.sessions.get_or_create(&user_id).await;
    handle.send(req.text).await?;
    Ok((StatusCode::ACCEPTED, Json(ChatResponse { queued: true })))
}

async fn stream_session(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let handle = state.sessions.get_or_create(&user_id).await;
    sse_stream(handle.subscribe()).into_response()
}

async fn save_turn(
    State(state): State<AppState>,
    Path((user_id, turn_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SavedContentResponse>), AppError> {
    let handle = state.sessions.get_or_create(&user_id).await;
    let saved = handle.promote(&turn_id).await?;
    Ok((StatusCode::CREATED, Json(SavedContentResponse { saved })))
}

// ============================================================
// Saved content
// ============================================================

async fn list_saved(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<SavedContentListResponse>, AppError> {
    let saved = state.db.list_saved_content(&user_id)?;
    Ok(Json(SavedContentListResponse { saved }))
}

async fn get_saved(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<Json<SavedContentResponse>, AppError> {
    let saved = state
        .db
        .get_saved_content(&user_id, &id)?
        .ok_or_else(|| AppError::NotFound(format!("Saved content not found: {id}")))?;
    Ok(Json(SavedContentResponse { saved }))
}

async fn delete_saved(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.delete_saved_content(&user_id, &id)?;
    Ok(Json(SuccessResponse { ok: true }))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::CourseNotFound(_) | DbError::SavedContentNotFound(_) => {
                AppError::NotFound(e.to_string())
            }
            DbError::Sqlite(_) | DbError::LockPoisoned => AppError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<PromoteError> for AppError {
    fn from(e: PromoteError) -> Self {
        match e {
            PromoteError::NoCourse | PromoteError::NotAssistant => {
                AppError::BadRequest(e.to_string())
            }
            PromoteError::TurnNotFound(_) => AppError::NotFound(e.to_string()),
            PromoteError::Storage(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
