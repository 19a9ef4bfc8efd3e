/// Why an uploaded video filename was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename contains null bytes or other control characters.
    ControlCharacter,
    /// Filename does not have exactly three dot-separated segments.
    WrongSegmentCount(usize),
    /// One of the three segments is empty.
    EmptySegment,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> String {
        match self {
            Self::Empty => "Filename cannot be empty".into(),
            Self::ContainsPathSeparator => {
                "Invalid filename: path separators are not allowed".into()
            }
            Self::ControlCharacter => "Invalid filename: control characters are not allowed".into(),
            Self::WrongSegmentCount(n) => format!(
                "Filename must be '<exerciseId>.<setId>.<extension>', found {n} segment(s)"
            ),
            Self::EmptySegment => "Filename segments must not be empty".into(),
        }
    }
}

/// The identifiers carried by a per-set video filename.
///
/// Grammar: `segment "." segment "." segment`, read as
/// `{exerciseId}.{setId}.{extension}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFilename {
    pub exercise_id: String,
    pub set_id: String,
    pub extension: String,
}

impl VideoFilename {
    pub fn parse(filename: &str) -> Result<Self, FilenameError> {
        let trimmed = filename.trim();

        if trimmed.is_empty() {
            return Err(FilenameError::Empty);
        }

        // Rejecting control characters also keeps CRLF out of response headers.
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(FilenameError::ControlCharacter);
        }

        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(FilenameError::ContainsPathSeparator);
        }

        let segments: Vec<&str> = trimmed.split('.').collect();
        let [exercise_id, set_id, extension] = segments.as_slice() else {
            return Err(FilenameError::WrongSegmentCount(segments.len()));
        };

        if exercise_id.is_empty() || set_id.is_empty() || extension.is_empty() {
            return Err(FilenameError::EmptySegment);
        }

        Ok(Self {
            exercise_id: exercise_id.to_string(),
            set_id: set_id.to_string(),
            extension: extension.to_string(),
        })
    }
}
