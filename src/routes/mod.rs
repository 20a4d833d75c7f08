use std::path::Path;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::AppState;

pub mod home_routes;
pub mod holdings_routes;
pub mod alerts_routes;
pub mod portfolio_routes;
pub mod realtime_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = holdings_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);
    let router = portfolio_routes::add_routes(router);
    let router = realtime_routes::add_routes(router);

    // built frontend; unknown paths and directories fall back to index.html
    let static_dir = Path::new(&state.settings.static_dir);
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    router
        .fallback_service(spa)
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
}
