use common::storage::BlobStore;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use tracing::{debug, info, instrument};

use super::aggregate::WorkoutLog;
use super::repository;
use super::video::VideoMetadata;
use crate::error::AppError;

/// Record a video on an existing set and persist the aggregate.
pub async fn attach_video<C: ConnectionTrait>(
    db: &C,
    log: &mut WorkoutLog,
    exercise_id: &str,
    set_id: &str,
    metadata: VideoMetadata,
) -> Result<(), AppError> {
    attach_videos(db, log, &[(exercise_id, set_id, metadata)]).await
}

/// Record videos on several sets and persist the aggregate once.
///
/// Nothing is saved unless every `(exercise_id, set_id)` names an existing
/// set.
pub async fn attach_videos<C: ConnectionTrait>(
    db: &C,
    log: &mut WorkoutLog,
    attachments: &[(&str, &str, VideoMetadata)],
) -> Result<(), AppError> {
    for &(exercise_id, set_id, metadata) in attachments {
        log.attach_video(exercise_id, set_id, metadata)?;
    }
    repository::save_log(db, log).await
}

/// Delete one set's video.
///
/// Returns `false` without touching storage when the set is missing or has
/// no video. The blob is removed before the metadata is cleared; if the blob
/// delete fails the log is left untouched.
#[instrument(skip(db, blobs, log), fields(workout_log_id = %log.id))]
pub async fn delete_set_video<C: ConnectionTrait>(
    db: &C,
    blobs: &dyn BlobStore,
    log: &mut WorkoutLog,
    exercise_id: &str,
    set_id: &str,
    owner_id: i32,
) -> Result<bool, AppError> {
    let Some(key) = log.video_key(owner_id, exercise_id, set_id) else {
        debug!("No video recorded for set");
        return Ok(false);
    };

    blobs.delete_many(std::slice::from_ref(&key)).await?;

    log.clear_video(exercise_id, set_id);
    repository::save_log(db, log).await?;
    info!(%key, "Deleted set video");
    Ok(true)
}

/// Delete every video blob of a log in one batch.
pub async fn delete_all_set_videos(
    blobs: &dyn BlobStore,
    log: &WorkoutLog,
    owner_id: i32,
) -> Result<(), AppError> {
    let keys = log.video_keys(owner_id);
    if keys.is_empty() {
        return Ok(());
    }
    blobs.delete_many(&keys).await?;
    Ok(())
}

/// Tear down a whole log.
///
/// Blobs go first, then the row and the owner's reference go together in one
/// transaction. A failure after the blob step leaves a log whose videos
/// answer 404; repeating the delete finishes the job.
#[instrument(skip(db, blobs, log), fields(workout_log_id = %log.id))]
pub async fn delete_workout_log(
    db: &DatabaseConnection,
    blobs: &dyn BlobStore,
    owner_id: i32,
    log: &WorkoutLog,
) -> Result<(), AppError> {
    delete_all_set_videos(blobs, log, owner_id).await?;
    repository::remove_log(db, owner_id, log.id).await?;
    info!(videos = log.video_count(), "Deleted workout log");
    Ok(())
}
