use async_trait::async_trait;
use thiserror::Error;

use crate::blocks::MessageTemplate;
use crate::commands::SlashCommand;
use crate::correlation::{CorrelationError, CorrelationStore};
use crate::interaction::{ActionRequest, ViewSubmission};

/// Per-request state handed to every handler.
#[derive(Clone)]
pub struct InteractionContext {
    pub request_id: String,
    pub correlation: CorrelationStore,
}

impl InteractionContext {
    pub fn new(request_id: impl Into<String>, correlation: CorrelationStore) -> Self {
        Self { request_id: request_id.into(), correlation }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("{message}")]
    FailedWithReply { message: String, reply: MessageTemplate },
    #[error(transparent)]
    Correlation(#[from] CorrelationError),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// A failure that still has something specific to tell the user.
    pub fn with_reply(message: impl Into<String>, reply: MessageTemplate) -> Self {
        Self::FailedWithReply { message: message.into(), reply }
    }

    pub fn reply(&self) -> Option<&MessageTemplate> {
        match self {
            Self::FailedWithReply { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

/// Handles a message action. Handlers that open a modal record the view id
/// with [`CorrelationStore::put`] so the later submission can be routed back.
#[async_trait]
pub trait StartActionHandler: Send + Sync {
    async fn start(
        &self,
        action: &ActionRequest,
        ctx: &InteractionContext,
    ) -> Result<HandlerResult, HandlerError>;
}

/// Handles the submission of a modal opened by the start handler of the same name.
#[async_trait]
pub trait CompleteActionHandler: Send + Sync {
    async fn complete(
        &self,
        submission: &ViewSubmission,
        ctx: &InteractionContext,
    ) -> Result<HandlerResult, HandlerError>;
}

#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    async fn handle(
        &self,
        command: &SlashCommand,
        ctx: &InteractionContext,
    ) -> Result<MessageTemplate, HandlerError>;
}
