pub mod error;
pub mod handlers;

pub use error::ApiError;
pub use handlers::*;

use crate::service::SessionStore;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;

/// 构建路由
pub fn router(store: SessionStore) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/reference", put(select_reference))
        .route("/api/sessions/:id/swap", post(swap_targets))
        .route("/api/sessions/:id/auto-match", post(auto_match))
        .route("/api/sessions/:id/targets/:target_id/toggle", post(toggle_target))
        .route("/api/sessions/:id/export", get(export_csv))
        .layer(ServiceBuilder::new())
        .with_state(store)
}
