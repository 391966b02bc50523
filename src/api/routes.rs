use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Feed
        .route("/feed", get(handlers::get_feed))
        .route("/feed/refresh", post(handlers::refresh_feed))
        .route("/home", get(handlers::get_home))
        .route("/continue-watching", get(handlers::get_continue_watching))
        .route("/discovery", get(handlers::get_discovery))
        // Interactions
        .route(
            "/interactions",
            get(handlers::get_interactions).delete(handlers::reset_interactions),
        )
        .route("/videos/:id/like", post(handlers::like_video))
        .route("/videos/:id/dislike", post(handlers::dislike_video))
        .route("/videos/:id/restore", post(handlers::restore_video))
        .route("/videos/:id/save", post(handlers::save_video))
        .route("/videos/:id/progress", post(handlers::record_progress))
        .route("/videos/:id/next", get(handlers::next_video))
        .route("/library/:shelf", get(handlers::get_library))
        // Search
        .route(
            "/search",
            get(handlers::get_search)
                .post(handlers::submit_search)
                .delete(handlers::clear_search),
        )
}
