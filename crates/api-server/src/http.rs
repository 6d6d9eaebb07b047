use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use shared::conversation::ConversationManager;
use shared::dispatch::DispatchEngine;
use shared::store::RideStore;

mod admin;
mod bookings;
mod chat;
mod errors;
mod health;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RideStore>,
    pub dispatcher: DispatchEngine,
    pub conversation: ConversationManager,
    pub admin_updates_wait: Duration,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/v1/bookings", post(bookings::book_ride))
        .route("/v1/bookings/estimate", post(bookings::quick_estimate))
        .route("/v1/chat", post(chat::chat_turn))
        .route("/v1/admin/bookings", get(admin::list_bookings))
        .route("/v1/admin/drivers", get(admin::list_drivers))
        .route("/v1/admin/drivers/status", post(admin::update_driver_status))
        .route("/v1/admin/updates", get(admin::poll_updates))
        .with_state(app_state)
}
