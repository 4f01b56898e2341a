//! Slack callback endpoints.
//!
//! - `POST /slack/interactions` - form field `payload` holding the interaction JSON
//! - `POST /slack/commands`     - slash-command form fields
//!
//! Replies are always Block Kit JSON. Dispatch failures still answer `200`
//! with a failure block so the platform has something to render; only an
//! unhandled slash command answers `400`, on either route. The verification
//! token is checked before the payload is classified.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;
use switchboard_slack::{interaction, CommandStatus, Dispatcher, SlashCommand};
use tracing::warn;
use uuid::Uuid;

#[derive(Clone)]
pub struct SlackState {
    dispatcher: Dispatcher,
    verification_token: Option<Arc<str>>,
}

impl SlackState {
    pub fn new(dispatcher: Dispatcher, verification_token: Option<&str>) -> Self {
        Self { dispatcher, verification_token: verification_token.map(Arc::from) }
    }

    /// Accepts everything when no token is configured.
    fn verify(&self, token: Option<&str>, request_id: &str) -> bool {
        let Some(expected) = self.verification_token.as_deref() else {
            return true;
        };
        let verified = token == Some(expected);
        if !verified {
            warn!(
                event_name = "slack.request.unverified",
                correlation_id = request_id,
                token_present = token.is_some(),
                "rejecting request with mismatched verification token"
            );
        }
        verified
    }
}

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: Option<String>,
}

pub fn router(state: SlackState) -> Router {
    Router::new()
        .route("/slack/interactions", post(interactions))
        .route("/slack/commands", post(commands))
        .with_state(state)
}

pub async fn interactions(
    State(state): State<SlackState>,
    Form(form): Form<InteractionForm>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let Some(payload) = form.payload.filter(|payload| !payload.trim().is_empty()) else {
        warn!(
            event_name = "slack.request.missing_payload",
            correlation_id = %request_id,
            "interaction request without payload field"
        );
        return StatusCode::BAD_REQUEST.into_response();
    };

    let token = interaction::peek_token(&payload);
    if !state.verify(token.as_deref(), &request_id) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let outcome = state.dispatcher.dispatch_payload(&payload, &request_id).await;
    let status =
        if outcome.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::OK };
    match outcome.reply() {
        Some(reply) => (status, Json(reply)).into_response(),
        None => status.into_response(),
    }
}

pub async fn commands(
    State(state): State<SlackState>,
    Form(command): Form<SlashCommand>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let token = (!command.token.is_empty()).then_some(command.token.as_str());
    if !state.verify(token, &request_id) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let reply = state.dispatcher.dispatch_command(&command, &request_id).await;
    let status = match reply.status {
        CommandStatus::Unhandled => StatusCode::BAD_REQUEST,
        CommandStatus::Handled | CommandStatus::Failed => StatusCode::OK,
    };
    (status, Json(reply.message)).into_response()
}
