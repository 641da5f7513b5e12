mod health;
mod login;
mod metrics;
mod portals;

pub use health::health_handler;
pub use login::login_check_handler;
pub use metrics::metrics_handler;
pub use portals::resolve_portals_handler;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/auth/login-check", post(login_check_handler))
        .route("/api/portals/resolve", post(resolve_portals_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
