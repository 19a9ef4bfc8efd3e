pub mod auth;
pub mod video;
pub mod workout_log;
