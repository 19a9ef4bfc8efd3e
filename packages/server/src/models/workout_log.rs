use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::workout::{LoggedExercise, LoggedSet, WorkoutLog};

const MAX_NAME_LEN: usize = 128;
const MAX_NOTES_LEN: usize = 2000;
const MAX_ID_LEN: usize = 64;

/// Request body for creating a workout log.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkoutLogRequest {
    /// Display name (1-128 characters).
    #[schema(example = "Leg day")]
    pub name: String,
    /// Free-form notes (up to 2000 characters).
    #[serde(default)]
    pub notes: Option<String>,
    /// When the workout happened. Defaults to now.
    #[serde(default)]
    pub performed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercises: Vec<CreateExercise>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExercise {
    /// Unique within the log; generated when omitted.
    #[serde(default)]
    #[schema(example = "e1")]
    pub id: Option<String>,
    #[schema(example = "Back Squat")]
    pub name: String,
    #[serde(default)]
    pub sets: Vec<CreateSet>,
}

#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSet {
    /// Unique within the exercise; generated when omitted.
    #[serde(default)]
    #[schema(example = "s1")]
    pub id: Option<String>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

/// Check a create payload, reporting the first offending field by path
/// (e.g. `exercises.0.sets.1.id`).
pub fn validate_create_request(payload: &CreateWorkoutLogRequest) -> Result<(), AppError> {
    let name = payload.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::field("name", "must be 1-128 characters"));
    }
    if let Some(notes) = &payload.notes
        && notes.chars().count() > MAX_NOTES_LEN
    {
        return Err(AppError::field("notes", "must be at most 2000 characters"));
    }

    let mut exercise_ids = HashSet::new();
    for (i, exercise) in payload.exercises.iter().enumerate() {
        let path = format!("exercises.{i}");
        if let Some(id) = &exercise.id {
            validate_id(&format!("{path}.id"), id)?;
            if !exercise_ids.insert(id.as_str()) {
                return Err(AppError::field(
                    format!("{path}.id"),
                    "duplicates another exercise id",
                ));
            }
        }
        let exercise_name = exercise.name.trim();
        if exercise_name.is_empty() || exercise_name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::field(
                format!("{path}.name"),
                "must be 1-128 characters",
            ));
        }

        let mut set_ids = HashSet::new();
        for (j, set) in exercise.sets.iter().enumerate() {
            let set_path = format!("{path}.sets.{j}");
            if let Some(id) = &set.id {
                validate_id(&format!("{set_path}.id"), id)?;
                if !set_ids.insert(id.as_str()) {
                    return Err(AppError::field(
                        format!("{set_path}.id"),
                        "duplicates another set id",
                    ));
                }
            }
            if let Some(weight) = set.weight
                && (!weight.is_finite() || weight < 0.0)
            {
                return Err(AppError::field(
                    format!("{set_path}.weight"),
                    "must be a non-negative number",
                ));
            }
        }
    }
    Ok(())
}

/// Ids end up inside filenames and blob keys, so `.` and `/` are excluded.
fn validate_id(field: &str, id: &str) -> Result<(), AppError> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(AppError::field(field, "must be 1-64 characters"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::field(
            field,
            "must contain only letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn generated_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl CreateWorkoutLogRequest {
    /// Build a fresh aggregate from a validated payload.
    pub fn into_workout_log(self) -> WorkoutLog {
        let now = Utc::now();
        WorkoutLog {
            id: Uuid::now_v7(),
            name: self.name.trim().to_string(),
            notes: self.notes,
            performed_at: self.performed_at.unwrap_or(now),
            exercises: self
                .exercises
                .into_iter()
                .map(|exercise| LoggedExercise {
                    id: exercise.id.unwrap_or_else(generated_id),
                    name: exercise.name.trim().to_string(),
                    sets: exercise
                        .sets
                        .into_iter()
                        .map(|set| LoggedSet {
                            id: set.id.unwrap_or_else(generated_id),
                            reps: set.reps,
                            weight: set.weight,
                            duration_seconds: set.duration_seconds,
                            completed: set.completed,
                            form_video: None,
                        })
                        .collect(),
                })
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Header-only view of a log used by the list endpoint.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLogSummary {
    pub id: Uuid,
    #[schema(example = "Leg day")]
    pub name: String,
    pub performed_at: DateTime<Utc>,
    pub exercise_count: usize,
    pub set_count: usize,
    pub video_count: usize,
}

impl From<&WorkoutLog> for WorkoutLogSummary {
    fn from(log: &WorkoutLog) -> Self {
        Self {
            id: log.id,
            name: log.name.clone(),
            performed_at: log.performed_at,
            exercise_count: log.exercises.len(),
            set_count: log.set_count(),
            video_count: log.video_count(),
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeletedWorkoutLogResponse {
    pub id: Uuid,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSetVideoResponse {
    #[schema(example = "s1")]
    pub set_id: String,
    #[schema(example = "e1")]
    pub exercise_id: String,
}
