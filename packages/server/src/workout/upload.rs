use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use common::storage::{BlobStore, BoxReader, StorageError};
use sea_orm::ConnectionTrait;
use tracing::{error, info, instrument, warn};

use super::aggregate::WorkoutLog;
use super::service;
use super::video::{VideoExtension, VideoMetadata, blob_key};
use crate::error::AppError;
use crate::utils::filename::VideoFilename;

/// Attempts made to remove blobs left behind by a change of extension.
const REPLACED_DELETE_ATTEMPTS: u32 = 3;

/// One file received in an upload request, spooled to disk.
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
}

/// A validated file, bound to the set it will be attached to.
#[derive(Debug, Clone)]
pub struct PlannedUpload {
    pub exercise_id: String,
    pub set_id: String,
    pub metadata: VideoMetadata,
    pub key: String,
    pub path: PathBuf,
}

/// Parse an upload filename, turning grammar errors into a batch rejection.
pub fn parse_upload_filename(filename: &str) -> Result<VideoFilename, AppError> {
    VideoFilename::parse(filename)
        .map_err(|e| AppError::Validation(format!("'{filename}': {}", e.message())))
}

/// Validate a whole batch against the log before anything is written.
///
/// Any malformed filename, disallowed extension, empty file, unknown set, or
/// set targeted twice rejects the entire batch.
pub fn plan_uploads(
    log: &WorkoutLog,
    owner_id: i32,
    files: Vec<UploadedVideo>,
) -> Result<Vec<PlannedUpload>, AppError> {
    if files.is_empty() {
        return Err(AppError::Validation("No video files were uploaded".into()));
    }

    let mut seen = HashSet::new();
    let mut plan = Vec::with_capacity(files.len());

    for file in files {
        let parsed = parse_upload_filename(&file.filename)?;

        let extension = VideoExtension::parse(&parsed.extension).ok_or_else(|| {
            AppError::Validation(format!(
                "'{}': unsupported video extension '{}'",
                file.filename, parsed.extension
            ))
        })?;

        if file.size == 0 {
            return Err(AppError::Validation(format!(
                "'{}': file is empty",
                file.filename
            )));
        }

        if log.find_set(&parsed.exercise_id, &parsed.set_id).is_none() {
            return Err(AppError::Validation(format!(
                "'{}': exercise '{}' has no set '{}'",
                file.filename, parsed.exercise_id, parsed.set_id
            )));
        }

        if !seen.insert((parsed.exercise_id.clone(), parsed.set_id.clone())) {
            return Err(AppError::Validation(format!(
                "'{}': more than one video for the same set",
                file.filename
            )));
        }

        plan.push(PlannedUpload {
            key: blob_key(
                owner_id,
                log.id,
                &parsed.exercise_id,
                &parsed.set_id,
                extension,
            ),
            metadata: VideoMetadata {
                size: file.size,
                extension,
            },
            exercise_id: parsed.exercise_id,
            set_id: parsed.set_id,
            path: file.path,
        });
    }

    Ok(plan)
}

/// Write the planned blobs and persist the resulting metadata once.
///
/// Metadata is only recorded for blobs that were written. If a write fails,
/// the sets written before it are still persisted and the write error is
/// returned. If persisting fails, every blob this call wrote is removed.
#[instrument(skip_all, fields(workout_log_id = %log.id, files = plan.len()))]
pub async fn store_uploads<C: ConnectionTrait>(
    db: &C,
    blobs: &dyn BlobStore,
    log: &mut WorkoutLog,
    owner_id: i32,
    plan: Vec<PlannedUpload>,
) -> Result<(), AppError> {
    let mut written = Vec::with_capacity(plan.len());
    let mut failure = None;

    for upload in plan {
        if let Err(e) = put_video(blobs, &upload).await {
            warn!(key = %upload.key, error = %e, "Video upload failed");
            failure = Some(e);
            break;
        }
        written.push(upload);
    }

    if written.is_empty() {
        return match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        };
    }

    let previous: Vec<Option<VideoMetadata>> = written
        .iter()
        .map(|u| {
            log.find_set(&u.exercise_id, &u.set_id)
                .and_then(|set| set.form_video)
        })
        .collect();

    let attachments: Vec<(&str, &str, VideoMetadata)> = written
        .iter()
        .map(|u| (u.exercise_id.as_str(), u.set_id.as_str(), u.metadata))
        .collect();

    if let Err(e) = service::attach_videos(db, log, &attachments).await {
        discard_unsaved(blobs, &written, &previous).await;
        return Err(e);
    }

    let replaced: Vec<String> = written
        .iter()
        .zip(previous.iter().copied())
        .filter_map(|(upload, prev)| {
            prev.filter(|p| p.extension != upload.metadata.extension)
                .map(|p| {
                    blob_key(
                        owner_id,
                        log.id,
                        &upload.exercise_id,
                        &upload.set_id,
                        p.extension,
                    )
                })
        })
        .collect();

    if !replaced.is_empty()
        && let Err(e) = remove_replaced(blobs, &replaced).await
    {
        error!(keys = ?replaced, error = %e, "Replaced videos could not be removed");
        return Err(e.into());
    }

    if let Some(e) = failure {
        return Err(e.into());
    }

    info!("Stored set videos");
    Ok(())
}

async fn put_video(blobs: &dyn BlobStore, upload: &PlannedUpload) -> Result<(), StorageError> {
    let file = tokio::fs::File::open(&upload.path).await?;
    let reader: BoxReader = Box::new(file);
    blobs.put_stream(&upload.key, reader).await?;
    Ok(())
}

/// Remove every blob written for a batch whose metadata was never saved.
///
/// A blob that overwrote an earlier video in place is removed too, so the
/// stored size of that video can never describe different bytes. Those sets
/// answer 404 until a video is uploaded again.
async fn discard_unsaved(
    blobs: &dyn BlobStore,
    written: &[PlannedUpload],
    previous: &[Option<VideoMetadata>],
) {
    for (upload, prev) in written.iter().zip(previous) {
        if let Some(prev) = prev
            && prev.extension == upload.metadata.extension
        {
            warn!(
                key = %upload.key,
                recorded_size = prev.size,
                "Overwritten video removed after failed save"
            );
        }
    }

    let keys: Vec<String> = written.iter().map(|u| u.key.clone()).collect();
    if let Err(e) = blobs.delete_many(&keys).await {
        warn!(error = %e, "Failed to remove unsaved videos");
    }
}

async fn remove_replaced(blobs: &dyn BlobStore, keys: &[String]) -> Result<(), StorageError> {
    let mut attempt = 1;
    loop {
        match blobs.delete_many(keys).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < REPLACED_DELETE_ATTEMPTS => {
                warn!(attempt, error = %e, "Retrying removal of replaced videos");
                tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
