mod api;
mod cart;
mod fonts;
mod icons;
mod layout;
mod openapi;
mod perf;
mod render;
mod util;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
pub struct AppState {
    /// Icon sprites resolved once at startup; immutable afterwards.
    pub icons: Arc<icons::Icons>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let host = std::env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("BACKEND_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let icon_set = icons::process_icons();
    for kind in [icons::IconKind::Money, icons::IconKind::Heart] {
        if icon_set.sprite(kind).is_none() {
            warn!("{kind:?} icon missing under {}; using glyph fallback", icons::icons_dir().display());
        }
    }
    if fonts::FontSet::resolve().is_err() {
        warn!("no usable font found; /order-image will return 500 until one is provided");
    }

    let state = AppState { icons: icon_set };

    let openapi = openapi::ApiDoc::openapi();

    let app = Router::new()
        // Swagger UI + OpenAPI schema
        .merge(SwaggerUi::new("/docs").url("/openapi.json", openapi))
        // API
        .route("/order-image", post(api::order_image))
        .route("/health", get(api::health))
        .with_state(Arc::new(state));

    let addr: SocketAddr = format!("{host}:{port}").parse().expect("bind addr");
    info!("Starting order-image-backend on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
