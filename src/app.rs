use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/dashboard/refresh", post(handlers::refresh))
        .route("/dashboard/filter", post(handlers::change_filter))
        .route("/meals", post(handlers::add_meal))
        .route("/meals/:id/delete", post(handlers::request_delete))
        .route("/meals/:id/delete/cancel", post(handlers::cancel_delete))
        .route("/meals/:id/delete/confirm", post(handlers::confirm_delete))
        .route("/notices/dismiss", post(handlers::dismiss_notice))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/stats", get(handlers::get_stats))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}
