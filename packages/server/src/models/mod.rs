pub mod auth;
pub mod workout_log;
