//! Session endpoints
//!
//! One handler per user action:
//! - `POST /api/sessions` - upload a CSV (multipart `file` field)
//! - `GET /api/sessions/{id}` - current session view
//! - `DELETE /api/sessions/{id}` - drop the session and its upload file
//! - `POST /api/sessions/{id}/question` - ask a question
//! - `POST /api/sessions/{id}/chart` - pick chart column(s) and render
//! - `GET /api/sessions/{id}/columns/{name}/json` - JSON-normalized column

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::charts::ColumnSelection;
use crate::models::{AppState, ChartResponse, JsonColumnResponse, QuestionRequest, SessionView};
use crate::session::{SessionEvent, SessionState, Upload};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/question", post(ask_question))
        .route("/api/sessions/{id}/chart", post(render_chart))
        .route("/api/sessions/{id}/columns/{name}/json", get(json_column))
        .with_state(state)
}

async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Failed to read upload: {}", e)))?;
        return Ok(Upload { filename, bytes });
    }

    Err(AppError::InvalidRequest(
        "multipart field 'file' is missing".to_string(),
    ))
}

async fn session(state: &AppState, id: Uuid) -> AppResult<SessionState> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {}", id)))
}

async fn create_session(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<SessionView>)> {
    let upload = read_upload(&mut multipart).await?;
    info!(filename = %upload.filename, bytes = upload.bytes.len(), "Upload received");

    let session = SessionState::from_upload(&upload, state.llm.clone(), &state.config)
        .map_err(|e| {
            warn!(filename = %upload.filename, error = %e, "Upload rejected");
            e
        })?;

    let view = session.view(state.config.data.preview_rows, &state.charts);
    state.sessions.insert(session).await;

    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionView>> {
    let session = session(&state, id).await?;
    Ok(Json(session.view(state.config.data.preview_rows, &state.charts)))
}

async fn ask_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuestionRequest>,
) -> AppResult<Json<SessionView>> {
    info!(session_id = %id, question_len = request.question.len(), "Question received");

    let next = state
        .sessions
        .apply(id, SessionEvent::SubmitQuestion(request.question))
        .await
        .map_err(|e| {
            error!(session_id = %id, error = %e, "Question failed");
            e
        })?;

    Ok(Json(next.view(state.config.data.preview_rows, &state.charts)))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<StatusCode> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("session {}", id)))
    }
}

async fn render_chart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<ColumnSelection>,
) -> AppResult<Json<ChartResponse>> {
    // Render and store under one session lock so the selection always
    // belongs to the chart kind it was drawn for.
    let (next, chart) = state
        .sessions
        .update(id, |current| {
            let kind = current.chart.ok_or_else(|| {
                AppError::InvalidRequest(
                    "the current question does not ask for a chart".to_string(),
                )
            })?;
            let chart = state.charts.render(kind, &selection, &current.dataset)?;
            let next = current.select_columns(selection.clone())?;
            Ok((next, chart))
        })
        .await
        .map_err(|e| {
            error!(session_id = %id, error = %e, "Chart failed");
            e
        })?;

    Ok(Json(ChartResponse {
        session_id: id,
        revision: next.revision,
        kind: chart.kind,
        title: chart.title,
        format: chart.format,
        svg: chart.body,
    }))
}

async fn json_column(
    State(state): State<AppState>,
    Path((id, name)): Path<(Uuid, String)>,
) -> AppResult<Json<JsonColumnResponse>> {
    let session = session(&state, id).await?;
    let values = session.dataset.parse_json_column(&name)?;
    Ok(Json(JsonColumnResponse { column: name, values }))
}
