pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me));

    // Key routes are public, the rest require a token
    let invitation_routes = Router::new()
        .route(
            "/",
            get(routes::invitation::list).post(routes::invitation::create),
        )
        .route("/stats", get(routes::invitation::stats))
        .route("/key/{key}", get(routes::invitation::lookup))
        .route("/key/{key}/register", post(routes::invitation::register))
        .route("/reward", post(routes::invitation::reward))
        .route("/give", post(routes::invitation::give))
        .route("/purge", post(routes::invitation::purge));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/invitation", invitation_routes);

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
