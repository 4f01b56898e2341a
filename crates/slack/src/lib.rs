//! Slack interaction dispatch and correlation
//!
//! This crate routes Slack callbacks to application handlers:
//! - **Classification** (`interaction`) - discriminator peek, then a typed decode
//! - **Registry** (`registry`) - start, complete and slash-command handlers by name
//! - **Correlation** (`correlation`) - links a modal's view id to the action that opened it
//! - **Dispatch** (`dispatch`) - lookup, invocation, and failure-to-reply mapping
//! - **Block Kit** (`blocks`) - reply builders
//!
//! # Architecture
//!
//! ```text
//! payload → classify/decode → Dispatcher ─┬→ start handler ──→ CorrelationStore::put
//!                                         ├→ CorrelationStore::get → complete handler
//!                                         └→ command handler (or default)
//!                                  ↓
//!                        MessageTemplate ← reply   (failures → ErrorReporter)
//! ```
//!
//! # Modal round trip
//!
//! A start handler that opens a modal records the assigned view id. When the
//! submission arrives in a later request it carries the same view id and
//! workspace id, and the dispatcher uses them to find the complete handler
//! registered under the same action name. A submission whose record is
//! missing or older than [`correlation::CORRELATION_TTL`] is acknowledged
//! without running any handler.

pub mod blocks;
pub mod commands;
pub mod correlation;
pub mod dispatch;
pub mod handler;
pub mod interaction;
pub mod registry;
pub mod report;
pub mod timestamp;

pub use blocks::{MessageBuilder, MessageTemplate, ResponseType};
pub use commands::{PingCommandHandler, SlashCommand, UnknownCommandHandler};
pub use correlation::{spawn_purge_task, CorrelationError, CorrelationStore, CORRELATION_TTL};
pub use dispatch::{
    CommandReply, CommandStatus, DispatchError, DispatchOutcome, Dispatcher, FailureKind,
};
pub use handler::{
    CompleteActionHandler, HandlerError, HandlerResult, InteractionContext, SlashCommandHandler,
    StartActionHandler,
};
pub use interaction::{ActionRequest, ClassifyError, Interaction, InteractionKind, ViewSubmission};
pub use registry::{ActionName, HandlerRegistry};
pub use report::{ErrorReporter, TracingErrorReporter};
