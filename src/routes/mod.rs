use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod candidates;
pub mod checklist;
pub mod expiry;
pub mod health;
pub mod stages;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let candidates_routes = Router::new()
        .route(
            "/",
            get(candidates::list_candidates).post(candidates::create_candidate),
        )
        .route(
            "/:id",
            get(candidates::get_candidate).patch(candidates::update_candidate),
        )
        .route("/:id/advance", post(candidates::advance_stage))
        .route("/:id/stage", put(candidates::set_stage))
        .route("/:id/history", get(candidates::stage_history))
        .route("/:id/checklist", get(checklist::get_checklist))
        .route(
            "/:id/documents/:stage_document_id",
            patch(checklist::toggle_document),
        )
        .route(
            "/:id/documents/:stage_document_id/file",
            get(checklist::document_file_url)
                .post(checklist::attach_document_file)
                .delete(checklist::remove_document_file),
        );

    Router::new()
        .nest("/api/candidates", candidates_routes)
        .route("/api/stages", get(stages::list_stages))
        .route("/api/expiry/assess", get(expiry::assess_expiry))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}
