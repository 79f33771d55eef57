//! Route definitions for the demo server

use crate::{handlers, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};

/// Matched routes served without a session
pub const SESSIONLESS_ROUTES: &[&str] = &["/api/health", "/api/public"];

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route("/public", get(handlers::public_info))
        // Session values
        .route("/session", get(handlers::get_session))
        .route("/session/values", post(handlers::set_values))
        .route(
            "/session/values/{key}",
            get(handlers::get_value)
                .put(handlers::put_value)
                .delete(handlers::clear_value),
        )
        .route("/session/take/{key}", post(handlers::take_value))
        // Flash messages
        .route("/session/flash", get(handlers::get_all_flash))
        .route(
            "/session/flash/{kind}",
            get(handlers::get_flash).post(handlers::add_flash),
        )
        // Lifecycle
        .route("/session/reset", post(handlers::reset_session))
        .route("/session/lazy", post(handlers::set_lazy))
        .route("/session/touch", post(handlers::touch_session))
        .route("/session/commit", post(handlers::commit_now))
        // Administration
        .route("/admin/sessions/{id}", delete(handlers::revoke_session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WebConfig;
    use axum::http::StatusCode;
    use satchel_core::SessionSettings;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_route() {
        let settings = SessionSettings::with_password("password-should-be-32-characters-long");
        let state = AppState::new(WebConfig::default(), settings).unwrap();
        let app = api_routes().with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
