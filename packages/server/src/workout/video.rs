use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Video container formats accepted as set evidence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoExtension {
    Mp4,
    Mov,
    Webm,
    M4v,
    Avi,
    Mkv,
}

impl VideoExtension {
    pub const ALL: [VideoExtension; 6] = [
        Self::Mp4,
        Self::Mov,
        Self::Webm,
        Self::M4v,
        Self::Avi,
        Self::Mkv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::Webm => "webm",
            Self::M4v => "m4v",
            Self::Avi => "avi",
            Self::Mkv => "mkv",
        }
    }

    /// Case-insensitive lookup; `None` for anything outside the allowed set.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ext| ext.as_str().eq_ignore_ascii_case(s))
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_ext(self.as_str())
            .first_or_octet_stream()
            .to_string()
    }
}

impl fmt::Display for VideoExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is known about the video recorded for one set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VideoMetadata {
    /// Size in bytes.
    #[schema(example = 1048576)]
    pub size: u64,
    pub extension: VideoExtension,
}

/// Object-store key of a set's video: `{ownerId}/{workoutLogId}/{exerciseId}.{setId}.{extension}`.
pub fn blob_key(
    owner_id: i32,
    workout_log_id: Uuid,
    exercise_id: &str,
    set_id: &str,
    extension: VideoExtension,
) -> String {
    format!("{owner_id}/{workout_log_id}/{exercise_id}.{set_id}.{extension}")
}
