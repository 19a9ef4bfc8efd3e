use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::video::{VideoMetadata, blob_key};
use crate::entity::workout_log;
use crate::error::AppError;

/// A mutation targeted a set the log does not contain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("set '{set_id}' of exercise '{exercise_id}' does not exist")]
pub struct SetNotFound {
    pub exercise_id: String,
    pub set_id: String,
}

impl From<SetNotFound> for AppError {
    fn from(err: SetNotFound) -> Self {
        AppError::NotFound(err.to_string())
    }
}

/// One performed set of an exercise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSet {
    /// Unique within the owning exercise.
    #[schema(example = "s1")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    /// Present exactly when a video blob exists for this set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_video: Option<VideoMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggedExercise {
    /// Unique within the owning log.
    #[schema(example = "e1")]
    pub id: String,
    #[schema(example = "Back Squat")]
    pub name: String,
    pub sets: Vec<LoggedSet>,
}

/// The workout-log aggregate: the log plus every exercise, set and video
/// record it owns. Loaded and persisted as one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog {
    pub id: Uuid,
    #[schema(example = "Leg day")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub exercises: Vec<LoggedExercise>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkoutLog {
    pub fn find_exercise(&self, exercise_id: &str) -> Option<&LoggedExercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    /// Look up a set by exercise and set id. A miss is `None`, not an error.
    pub fn find_set(&self, exercise_id: &str, set_id: &str) -> Option<&LoggedSet> {
        self.find_exercise(exercise_id)?
            .sets
            .iter()
            .find(|s| s.id == set_id)
    }

    pub fn find_set_mut(&mut self, exercise_id: &str, set_id: &str) -> Option<&mut LoggedSet> {
        self.exercises
            .iter_mut()
            .find(|e| e.id == exercise_id)?
            .sets
            .iter_mut()
            .find(|s| s.id == set_id)
    }

    /// Record a video on a set, returning whatever was recorded before.
    pub fn attach_video(
        &mut self,
        exercise_id: &str,
        set_id: &str,
        metadata: VideoMetadata,
    ) -> Result<Option<VideoMetadata>, SetNotFound> {
        let set = self
            .find_set_mut(exercise_id, set_id)
            .ok_or_else(|| SetNotFound {
                exercise_id: exercise_id.to_string(),
                set_id: set_id.to_string(),
            })?;
        Ok(set.form_video.replace(metadata))
    }

    /// Forget a set's video, returning it if there was one.
    pub fn clear_video(&mut self, exercise_id: &str, set_id: &str) -> Option<VideoMetadata> {
        self.find_set_mut(exercise_id, set_id)?.form_video.take()
    }

    /// Blob key of one set's video, if it has one.
    pub fn video_key(&self, owner_id: i32, exercise_id: &str, set_id: &str) -> Option<String> {
        let video = self.find_set(exercise_id, set_id)?.form_video?;
        Some(blob_key(
            owner_id,
            self.id,
            exercise_id,
            set_id,
            video.extension,
        ))
    }

    /// Blob keys of every set carrying a video, in exercise then set order.
    pub fn video_keys(&self, owner_id: i32) -> Vec<String> {
        self.exercises
            .iter()
            .flat_map(|exercise| {
                exercise.sets.iter().filter_map(move |set| {
                    set.form_video.map(|video| {
                        blob_key(owner_id, self.id, &exercise.id, &set.id, video.extension)
                    })
                })
            })
            .collect()
    }

    pub fn set_count(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    pub fn video_count(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| &e.sets)
            .filter(|s| s.form_video.is_some())
            .count()
    }

    /// Serialize the exercise tree into the document column.
    pub fn exercises_document(&self) -> Result<serde_json::Value, AppError> {
        serde_json::to_value(&self.exercises)
            .map_err(|e| AppError::Internal(format!("Failed to encode exercises: {e}")))
    }
}

impl TryFrom<workout_log::Model> for WorkoutLog {
    type Error = AppError;

    fn try_from(model: workout_log::Model) -> Result<Self, Self::Error> {
        let exercises = serde_json::from_value(model.exercises).map_err(|e| {
            AppError::Internal(format!("Corrupt exercises document in log {}: {e}", model.id))
        })?;
        Ok(Self {
            id: model.id,
            name: model.name,
            notes: model.notes,
            performed_at: model.performed_at,
            exercises,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
