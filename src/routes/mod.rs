pub mod admin;
pub mod applications;
pub mod auth;
pub mod health;
pub mod processes;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::{require_admin, require_candidate};
use crate::middleware::rate_limit::{new_rps_state, rps_middleware};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let base_routes = Router::new().route("/health", get(health::health));

    let public_api = Router::new()
        .route(
            "/api/auth/candidates/register",
            post(auth::register_candidate),
        )
        .route("/api/auth/candidates/login", post(auth::login_candidate))
        .route("/api/auth/admins/login", post(auth::login_admin))
        .layer(from_fn_with_state(
            new_rps_state(config.public_rps),
            rps_middleware,
        ));

    let candidate_api = Router::new()
        .route("/api/processes", get(processes::list_processes))
        .route("/api/processes/:id", get(processes::get_process))
        .route("/api/processes/:id/apply", post(processes::apply))
        .route("/api/applications", get(applications::list_applications))
        .route("/api/applications/:id", get(applications::get_application))
        .route(
            "/api/applications/:id/rounds/:round_id/answers",
            put(applications::record_answer),
        )
        .route(
            "/api/applications/:id/rounds/:round_id/submit",
            post(applications::submit_round),
        )
        .route(
            "/api/applications/:id/rounds/:round_id/timeline",
            get(applications::get_timeline).post(applications::set_timeline),
        )
        .route_layer(from_fn_with_state(state.clone(), require_candidate))
        .layer(from_fn_with_state(
            new_rps_state(config.api_rps),
            rps_middleware,
        ));

    let admin_api = Router::new()
        .route(
            "/api/admin/processes",
            get(admin::list_processes).post(admin::create_process),
        )
        .route(
            "/api/admin/processes/:id",
            get(admin::get_process)
                .patch(admin::update_process)
                .delete(admin::delete_process),
        )
        .route(
            "/api/admin/processes/:id/publish",
            post(admin::publish_process),
        )
        .route(
            "/api/admin/processes/:id/applications",
            get(admin::list_process_applications),
        )
        .route(
            "/api/admin/applications/:id",
            axum::routing::delete(admin::archive_application),
        )
        .route(
            "/api/admin/timelines/expired",
            get(admin::list_expired_timelines),
        )
        .route("/api/admin/candidates/:id", get(admin::get_candidate))
        .route(
            "/api/admin/candidates/:id/block",
            post(admin::block_candidate),
        )
        .route(
            "/api/admin/candidates/:id/unblock",
            post(admin::unblock_candidate),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin))
        .layer(from_fn_with_state(
            new_rps_state(config.api_rps),
            rps_middleware,
        ));

    base_routes
        .merge(public_api)
        .merge(candidate_api)
        .merge(admin_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
