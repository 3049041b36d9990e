//! Staff Order API Module
//!
//! All routes require a staff bearer token; the tenant comes from the token.
//! All mutations go through OrdersManager.

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/events", get(handler::events))
        .route("/{id}/status", post(handler::update_status))
        .route(
            "/{id}/items/{item_id}/status",
            post(handler::update_item_status),
        )
        .route("/{id}/items/{item_id}/remove", post(handler::remove_item))
        .route("/{id}/mark-paid", post(handler::mark_paid))
        .route("/{id}/reconcile-payment", post(handler::reconcile_payment))
        .route("/{id}/abandon-payment", post(handler::abandon_payment))
}
