use axum::{
    Router,
    routing::{get, post},
};

use crate::modules::outbox::use_cases::enqueue_message::inbound::http as enqueue_http;
use crate::modules::outbox::use_cases::process_outbox::inbound::http as process_http;
use crate::shell::health;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/outbox/messages", post(enqueue_http::handle))
        .route("/outbox/run", post(process_http::handle))
        .route("/health/outbox", get(health::handle))
        .with_state(state)
}
