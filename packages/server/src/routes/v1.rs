use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/workoutLogs", workout_log_routes(config))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn workout_log_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::workout_log::list_workout_logs,
            handlers::workout_log::create_workout_log
        ))
        .routes(routes!(
            handlers::workout_log::get_workout_log,
            handlers::workout_log::delete_workout_log
        ))
        .routes(routes!(handlers::workout_log::delete_set_video))
        .routes(routes!(handlers::video::stream_set_video));

    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::workout_log::upload_set_videos))
        .layer(handlers::workout_log::upload_body_limit(&config.storage));

    crud.merge(upload)
}
