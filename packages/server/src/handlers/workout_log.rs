use std::path::Path as FsPath;

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, ErrorBody, FieldErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::workout_log::{
    CreateWorkoutLogRequest, DeletedSetVideoResponse, DeletedWorkoutLogResponse,
    WorkoutLogSummary, validate_create_request,
};
use crate::state::AppState;
use crate::workout::{
    UploadedVideo, WorkoutLog, parse_upload_filename, plan_uploads, repository, service,
    store_uploads,
};

/// Multipart field carrying the set videos.
pub const VIDEO_FIELD: &str = "formVideos";

/// Room for a full batch of maximum-size videos plus multipart framing.
pub fn upload_body_limit(storage: &StorageConfig) -> DefaultBodyLimit {
    let batch = storage
        .max_video_size
        .saturating_mul(storage.max_videos_per_upload as u64)
        .saturating_add(1024 * 1024);
    DefaultBodyLimit::max(usize::try_from(batch).unwrap_or(usize::MAX))
}

/// Unparseable ids are reported like unknown ones.
pub(crate) fn parse_log_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::NotFound("Workout log not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Workout Logs",
    operation_id = "createWorkoutLog",
    summary = "Create a workout log",
    description = "Creates a log with its exercises and sets. Exercise and set ids are optional \
        and generated when omitted. Payload problems are reported as 406 with the offending field.",
    request_body = CreateWorkoutLogRequest,
    responses(
        (status = 201, description = "Workout log created", body = WorkoutLog),
        (status = 400, description = "Malformed JSON (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 406, description = "Invalid field", body = FieldErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_workout_log(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateWorkoutLogRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_request(&payload)?;

    let log = payload.into_workout_log();
    repository::create_log(&state.db, auth_user.user_id, &log).await?;

    info!(workout_log_id = %log.id, "Created workout log");
    Ok((StatusCode::CREATED, Json(log)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Workout Logs",
    operation_id = "listWorkoutLogs",
    summary = "List the caller's workout logs",
    description = "Returns header summaries in creation order.",
    responses(
        (status = 200, description = "Workout log summaries", body = Vec<WorkoutLogSummary>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_workout_logs(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkoutLogSummary>>, AppError> {
    let user = repository::find_user(&state.db, auth_user.user_id).await?;
    let logs = repository::list_owned_logs(&state.db, &user).await?;
    Ok(Json(logs.iter().map(WorkoutLogSummary::from).collect()))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Workout Logs",
    operation_id = "getWorkoutLog",
    summary = "Get a workout log",
    params(("id" = String, Path, description = "Workout log ID (UUID)")),
    responses(
        (status = 200, description = "Workout log", body = WorkoutLog),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn get_workout_log(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkoutLog>, AppError> {
    let log_id = parse_log_id(&id)?;
    let log = repository::load_owned_log(&state.db, auth_user.user_id, log_id).await?;
    Ok(Json(log))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Workout Logs",
    operation_id = "deleteWorkoutLog",
    summary = "Delete a workout log and its videos",
    description = "Deletes every set video first, then the log and the owner's reference to it. \
        A failed delete can be retried.",
    params(("id" = String, Path, description = "Workout log ID (UUID)")),
    responses(
        (status = 200, description = "Workout log deleted", body = DeletedWorkoutLogResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage or database failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_workout_log(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletedWorkoutLogResponse>, AppError> {
    let log_id = parse_log_id(&id)?;
    let log = repository::load_owned_log(&state.db, auth_user.user_id, log_id).await?;

    service::delete_workout_log(&state.db, &*state.blob_store, auth_user.user_id, &log).await?;

    Ok(Json(DeletedWorkoutLogResponse { id: log.id }))
}

#[utoipa::path(
    post,
    path = "/{id}/videoUpload",
    tag = "Set Videos",
    operation_id = "uploadSetVideos",
    summary = "Upload form videos for sets",
    description = "Accepts up to `storage.max_videos_per_upload` files in the `formVideos` field. \
        Each filename must be `{exerciseId}.{setId}.{extension}` naming a set of this log. \
        The whole batch is validated before anything is stored.",
    params(("id" = String, Path, description = "Workout log ID (UUID)")),
    request_body(content_type = "multipart/form-data", description = "One or more `formVideos` files"),
    responses(
        (status = 200, description = "Videos stored"),
        (status = 400, description = "Invalid batch (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found or not owned (NOT_FOUND)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_set_videos(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let log_id = parse_log_id(&id)?;
    let mut log = repository::load_owned_log(&state.db, auth_user.user_id, log_id).await?;

    // Removed with everything in it when the request finishes.
    let spool = tempfile::Builder::new()
        .prefix("formlog-upload-")
        .tempdir()
        .map_err(|e| AppError::Internal(format!("Failed to create upload spool: {e}")))?;

    let files = collect_videos(multipart, &state.config.storage, spool.path()).await?;
    let plan = plan_uploads(&log, auth_user.user_id, files)?;
    store_uploads(
        &state.db,
        &*state.blob_store,
        &mut log,
        auth_user.user_id,
        plan,
    )
    .await?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/{id}/exercises/{exercise_id}/sets/{set_id}",
    tag = "Set Videos",
    operation_id = "deleteSetVideo",
    summary = "Delete a set's form video",
    params(
        ("id" = String, Path, description = "Workout log ID (UUID)"),
        ("exercise_id" = String, Path, description = "Exercise ID"),
        ("set_id" = String, Path, description = "Set ID"),
    ),
    responses(
        (status = 200, description = "Video deleted", body = DeletedSetVideoResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Log not owned, or the set has no video (empty body)"),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn delete_set_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, exercise_id, set_id)): Path<(String, String, String)>,
) -> Result<Json<DeletedSetVideoResponse>, AppError> {
    let log_id = parse_log_id(&id)?;
    let mut log = repository::load_owned_log(&state.db, auth_user.user_id, log_id).await?;

    let deleted = service::delete_set_video(
        &state.db,
        &*state.blob_store,
        &mut log,
        &exercise_id,
        &set_id,
        auth_user.user_id,
    )
    .await?;

    if !deleted {
        return Err(AppError::NotFoundEmpty);
    }
    Ok(Json(DeletedSetVideoResponse {
        set_id,
        exercise_id,
    }))
}

/// Spool every `formVideos` file into `spool`, enforcing the per-file size
/// and per-request count limits. Other fields are ignored.
async fn collect_videos(
    mut multipart: Multipart,
    limits: &StorageConfig,
    spool: &FsPath,
) -> Result<Vec<UploadedVideo>, AppError> {
    let mut files = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        if files.len() == limits.max_videos_per_upload {
            return Err(AppError::Validation(format!(
                "At most {} videos can be uploaded at once",
                limits.max_videos_per_upload
            )));
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::Validation("Video field must have a filename".into()))?;
        parse_upload_filename(&filename)?;

        let path = spool.join(format!("{}.part", files.len()));
        let mut out = tokio::fs::File::create(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create spool file: {e}")))?;

        let mut size: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            size += chunk.len() as u64;
            if size > limits.max_video_size {
                return Err(AppError::Validation(format!(
                    "'{filename}' exceeds maximum size of {} bytes",
                    limits.max_video_size
                )));
            }
            out.write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Spool write failed: {e}")))?;
        }
        out.flush()
            .await
            .map_err(|e| AppError::Internal(format!("Spool flush failed: {e}")))?;

        files.push(UploadedVideo {
            filename,
            path,
            size,
        });
    }

    Ok(files)
}
