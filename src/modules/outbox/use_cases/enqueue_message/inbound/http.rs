use axum::{
    Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::modules::outbox::core::scope::OutboxScopeFactory;
use crate::modules::outbox::use_cases::enqueue_message::outgoing_message::JsonMessage;
use crate::shell::state::AppState;

#[derive(Deserialize)]
pub struct EnqueueMessageBody {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: serde_json::Value,
}

#[derive(Serialize)]
pub struct EnqueueMessageResponse {
    pub id: String,
}

pub async fn handle(
    State(state): State<AppState>,
    body: Result<Json<EnqueueMessageBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(body) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };

    let scope = match state.scope_factory.create_scope().await {
        Ok(scope) => scope,
        Err(err) => {
            error!(error = %err, "Failed to open outbox scope");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let message = JsonMessage::new(body.message_type, body.payload);
    let id = match state
        .client
        .add_to_outbox(scope.repository.as_ref(), &message)
        .await
    {
        Ok(id) => id,
        Err(err) => {
            error!(error = %err, "Failed to add message to outbox");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match scope.context.save_changes().await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(EnqueueMessageResponse { id: id.to_string() }),
        )
            .into_response(),
        Err(err) => {
            error!(message_id = %id, error = %err, "Failed to commit outbox message");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
