use chrono::Utc;
use sea_orm::*;
use uuid::Uuid;

use super::aggregate::WorkoutLog;
use crate::entity::{user, workout_log};
use crate::error::AppError;

/// Find a user by ID or return 404.
pub async fn find_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// The user's back-reference list, in creation order.
pub fn workout_log_ids(user: &user::Model) -> Result<Vec<Uuid>, AppError> {
    serde_json::from_value(user.workout_log_ids.clone()).map_err(|e| {
        AppError::Internal(format!(
            "Corrupt workout log list for user {}: {e}",
            user.id
        ))
    })
}

/// Whether `workout_log_id` appears in the user's back-reference list.
pub fn user_owns(user: &user::Model, workout_log_id: Uuid) -> bool {
    workout_log_ids(user)
        .map(|ids| ids.contains(&workout_log_id))
        .unwrap_or(false)
}

/// Load a log the given user owns.
///
/// Logs owned by someone else are reported exactly like missing ones.
pub async fn load_owned_log<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    workout_log_id: Uuid,
) -> Result<WorkoutLog, AppError> {
    let user = find_user(db, user_id).await?;
    if !user_owns(&user, workout_log_id) {
        return Err(AppError::NotFound("Workout log not found".into()));
    }
    find_log(db, workout_log_id).await
}

/// Find a log by ID or return 404.
pub async fn find_log<C: ConnectionTrait>(
    db: &C,
    workout_log_id: Uuid,
) -> Result<WorkoutLog, AppError> {
    let model = workout_log::Entity::find_by_id(workout_log_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Workout log not found".into()))?;
    WorkoutLog::try_from(model)
}

/// Load every log in the user's list, keeping list order.
///
/// Ids whose log no longer exists are skipped.
pub async fn list_owned_logs<C: ConnectionTrait>(
    db: &C,
    user: &user::Model,
) -> Result<Vec<WorkoutLog>, AppError> {
    let ids = workout_log_ids(user)?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut models = workout_log::Entity::find()
        .filter(workout_log::Column::Id.is_in(ids.clone()))
        .all(db)
        .await?;

    let mut logs = Vec::with_capacity(models.len());
    for id in ids {
        if let Some(pos) = models.iter().position(|m| m.id == id) {
            logs.push(WorkoutLog::try_from(models.swap_remove(pos))?);
        }
    }
    Ok(logs)
}

/// Persist the exercise tree of an already stored log.
pub async fn save_log<C: ConnectionTrait>(db: &C, log: &mut WorkoutLog) -> Result<(), AppError> {
    log.updated_at = Utc::now();
    workout_log::ActiveModel {
        id: Unchanged(log.id),
        exercises: Set(log.exercises_document()?),
        updated_at: Set(log.updated_at),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}

/// Insert a new log and append it to its owner's list in one transaction.
pub async fn create_log(
    db: &DatabaseConnection,
    user_id: i32,
    log: &WorkoutLog,
) -> Result<(), AppError> {
    let txn = db.begin().await?;

    let owner = find_user(&txn, user_id).await?;
    let mut ids = workout_log_ids(&owner)?;

    workout_log::ActiveModel {
        id: Set(log.id),
        name: Set(log.name.clone()),
        notes: Set(log.notes.clone()),
        performed_at: Set(log.performed_at),
        exercises: Set(log.exercises_document()?),
        created_at: Set(log.created_at),
        updated_at: Set(log.updated_at),
    }
    .insert(&txn)
    .await?;

    ids.push(log.id);
    set_workout_log_ids(&txn, owner.id, &ids).await?;

    txn.commit().await?;
    Ok(())
}

/// Delete a log row and drop it from its owner's list in one transaction.
pub async fn remove_log(
    db: &DatabaseConnection,
    user_id: i32,
    workout_log_id: Uuid,
) -> Result<(), AppError> {
    let txn = db.begin().await?;

    workout_log::Entity::delete_by_id(workout_log_id)
        .exec(&txn)
        .await?;

    let owner = find_user(&txn, user_id).await?;
    let mut ids = workout_log_ids(&owner)?;
    ids.retain(|id| *id != workout_log_id);
    set_workout_log_ids(&txn, owner.id, &ids).await?;

    txn.commit().await?;
    Ok(())
}

async fn set_workout_log_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    ids: &[Uuid],
) -> Result<(), AppError> {
    let value = serde_json::to_value(ids)
        .map_err(|e| AppError::Internal(format!("Failed to encode workout log list: {e}")))?;
    user::ActiveModel {
        id: Unchanged(user_id),
        workout_log_ids: Set(value),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(())
}
