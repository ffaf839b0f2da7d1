use crate::AppState;
use crate::api::{ApiDoc, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Routes without state or middleware
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .route("/info", get(handlers::system::info))
        .route("/models", get(handlers::system::models))
        .route("/test", get(handlers::system::test_endpoint))
        .route("/chat", post(handlers::chat::chat))
        .route("/history", post(handlers::history::get_history))
        .route("/history/{user_id}", delete(handlers::history::clear_history))
}

#[cfg(feature = "swagger-ui")]
fn docs_routes() -> Router<AppState> {
    use utoipa_swagger_ui::SwaggerUi;

    Router::new().merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn docs_routes() -> Router<AppState> {
    Router::new().route(
        "/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    )
}

/// The complete application: routes, docs, state and middleware
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config_manager.config().server.max_body_bytes;

    api_routes()
        .merge(docs_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
