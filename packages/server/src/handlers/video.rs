use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::workout_log::parse_log_id;
use crate::state::AppState;
use crate::utils::range::parse_range_header;
use crate::workout::{blob_key, repository};

#[utoipa::path(
    get,
    path = "/{id}/exercises/{exercise_id}/sets/{set_id}/video",
    tag = "Set Videos",
    operation_id = "streamSetVideo",
    summary = "Stream a set's form video",
    description = "Streams the video as an attachment. A `Range: bytes=<start>-[<end>]` header \
        returns 206 with that slice; suffix and multi-range requests are refused with 416.",
    params(
        ("id" = String, Path, description = "Workout log ID (UUID)"),
        ("exercise_id" = String, Path, description = "Exercise ID"),
        ("set_id" = String, Path, description = "Set ID"),
    ),
    responses(
        (status = 200, description = "Whole video"),
        (status = 206, description = "Requested byte range"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Log not owned, or the set has no video (empty body)"),
        (status = 416, description = "Unsatisfiable range (RANGE_NOT_SATISFIABLE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, headers), fields(user_id = auth_user.user_id))]
pub async fn stream_set_video(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, exercise_id, set_id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let log_id = parse_log_id(&id)?;
    let log = repository::load_owned_log(&state.db, auth_user.user_id, log_id).await?;

    let Some(exercise) = log.find_exercise(&exercise_id) else {
        return Err(AppError::NotFoundEmpty);
    };
    let Some(video) = log
        .find_set(&exercise_id, &set_id)
        .and_then(|set| set.form_video)
    else {
        debug!("Set has no video");
        return Err(AppError::NotFoundEmpty);
    };

    let total = video.size;
    let range = match headers.get(header::RANGE) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::RangeNotSatisfiable { total })?;
            Some(
                parse_range_header(value, total)
                    .map_err(|_| AppError::RangeNotSatisfiable { total })?,
            )
        }
        None => None,
    };

    let key = blob_key(
        auth_user.user_id,
        log.id,
        &exercise_id,
        &set_id,
        video.extension,
    );
    let reader = state.blob_store.get_stream(&key, range).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let display_name = format!(
        "{}_{}_{}.{}",
        exercise.name, exercise_id, set_id, video.extension
    );

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, video.extension.mime_type())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&display_name),
        )
        .header(header::ACCEPT_RANGES, "bytes");

    builder = match range {
        Some(range) => builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_LENGTH, range.len().to_string())
            .header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{total}", range.start, range.end),
            ),
        None => builder
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, total.to_string()),
    };

    builder
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "video".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
