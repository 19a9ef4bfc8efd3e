//! The workout-log aggregate and everything that reads or mutates its videos.

pub mod aggregate;
pub mod repository;
pub mod service;
pub mod upload;
pub mod video;

pub use aggregate::{LoggedExercise, LoggedSet, SetNotFound, WorkoutLog};
pub use upload::{
    PlannedUpload, UploadedVideo, parse_upload_filename, plan_uploads, store_uploads,
};
pub use video::{VideoExtension, VideoMetadata, blob_key};
