pub mod user;
pub mod workout_log;
