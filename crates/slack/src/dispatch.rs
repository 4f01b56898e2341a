use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::blocks::{self, MessageTemplate};
use crate::commands::SlashCommand;
use crate::correlation::CorrelationStore;
use crate::handler::{HandlerError, HandlerResult, InteractionContext};
use crate::interaction::{self, ActionRequest, ClassifyError, Interaction, ViewSubmission};
use crate::registry::HandlerRegistry;
use crate::report::ErrorReporter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    Malformed,
    UnregisteredTarget,
    HandlerFailed,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::UnregisteredTarget => "unregistered_target",
            Self::HandlerFailed => "handler_failed",
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("malformed interaction payload: {0}")]
    Malformed(#[from] ClassifyError),
    #[error("no start handler registered for action `{action}`")]
    UnregisteredStart { action: String },
    #[error("no complete handler registered for correlated action `{action}` (view `{view_id}`)")]
    UnregisteredComplete { action: String, view_id: String },
    #[error("no handler registered for command `{command}`")]
    UnregisteredCommand { command: String },
    #[error("handler for `{target}` failed: {source}")]
    Handler {
        target: String,
        #[source]
        source: HandlerError,
    },
    #[error("command `{command}` failed for user `{user_id}` in `{team_id}/{channel_id}`: {source}")]
    CommandFailed {
        command: String,
        team_id: String,
        channel_id: String,
        user_id: String,
        text: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Malformed(_) => FailureKind::Malformed,
            Self::UnregisteredStart { .. }
            | Self::UnregisteredComplete { .. }
            | Self::UnregisteredCommand { .. } => FailureKind::UnregisteredTarget,
            Self::Handler { .. } | Self::CommandFailed { .. } => FailureKind::HandlerFailed,
        }
    }
}

/// What the HTTP layer hands back to the platform for one interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Responded(MessageTemplate),
    /// Handler ran and has nothing to say.
    Processed,
    /// Submission without a live correlation record; no handler ran.
    Ignored,
    /// Slash command with no registered handler, answered by the default handler.
    Unhandled(MessageTemplate),
    Failed { kind: FailureKind, reply: MessageTemplate },
}

impl DispatchOutcome {
    pub fn reply(&self) -> Option<&MessageTemplate> {
        match self {
            Self::Responded(reply) | Self::Unhandled(reply) | Self::Failed { reply, .. } => {
                Some(reply)
            }
            Self::Processed | Self::Ignored => None,
        }
    }

    /// True when the platform should see a client-error status.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Unhandled(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Handled,
    /// No handler for the command; the default handler produced the reply.
    Unhandled,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandReply {
    pub status: CommandStatus,
    pub message: MessageTemplate,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    correlation: CorrelationStore,
    reporter: Arc<dyn ErrorReporter>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        correlation: CorrelationStore,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self { registry, correlation, reporter }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn correlation(&self) -> &CorrelationStore {
        &self.correlation
    }

    /// Classifies and decodes a raw `payload` field, then dispatches it.
    pub async fn dispatch_payload(&self, raw: &str, request_id: &str) -> DispatchOutcome {
        match interaction::decode(raw) {
            Ok(interaction) => self.dispatch(interaction, request_id).await,
            Err(error) => self.malformed(error, request_id),
        }
    }

    /// Reports a payload that could not be classified or decoded.
    pub fn malformed(&self, error: ClassifyError, request_id: &str) -> DispatchOutcome {
        self.fail(DispatchError::from(error), request_id, None)
    }

    pub async fn dispatch(&self, interaction: Interaction, request_id: &str) -> DispatchOutcome {
        info!(
            event_name = "slack.dispatch.received",
            correlation_id = request_id,
            interaction_kind = interaction.kind().as_str(),
            workspace_id = interaction.workspace_id(),
            actor_id = interaction.actor_id(),
            "interaction received"
        );

        match interaction {
            Interaction::SlashCommand(command) => {
                let reply = self.dispatch_command(&command, request_id).await;
                match reply.status {
                    CommandStatus::Handled => DispatchOutcome::Responded(reply.message),
                    CommandStatus::Unhandled => DispatchOutcome::Unhandled(reply.message),
                    CommandStatus::Failed => DispatchOutcome::Failed {
                        kind: FailureKind::HandlerFailed,
                        reply: reply.message,
                    },
                }
            }
            Interaction::MessageAction(action) => self.start_action(&action, request_id).await,
            Interaction::ViewSubmission(submission) => {
                self.complete_action(&submission, request_id).await
            }
        }
    }

    async fn start_action(&self, action: &ActionRequest, request_id: &str) -> DispatchOutcome {
        let Some(handler) = self.registry.start_handler(&action.callback_id) else {
            return self.fail(
                DispatchError::UnregisteredStart { action: action.callback_id.clone() },
                request_id,
                None,
            );
        };

        debug!(
            event_name = "slack.dispatch.start_action",
            correlation_id = request_id,
            action = %action.callback_id,
            workspace_id = action.workspace_id(),
            "invoking start handler"
        );
        let ctx = self.context(request_id);
        let result = handler.start(action, &ctx).await;
        self.finish(result, &action.callback_id, request_id)
    }

    async fn complete_action(
        &self,
        submission: &ViewSubmission,
        request_id: &str,
    ) -> DispatchOutcome {
        let view_id = submission.view_id();
        let workspace_id = submission.workspace_id();

        let Some(action) = self.correlation.get(view_id, workspace_id).await else {
            debug!(
                event_name = "slack.dispatch.correlation_miss",
                correlation_id = request_id,
                view_id,
                workspace_id,
                "no correlation record for submission; ignoring"
            );
            return DispatchOutcome::Ignored;
        };

        let Some(handler) = self.registry.complete_handler(action.as_str()) else {
            return self.fail(
                DispatchError::UnregisteredComplete {
                    action: action.to_string(),
                    view_id: view_id.to_owned(),
                },
                request_id,
                None,
            );
        };

        debug!(
            event_name = "slack.dispatch.complete_action",
            correlation_id = request_id,
            action = %action,
            view_id,
            workspace_id,
            "invoking complete handler"
        );
        let ctx = self.context(request_id);
        let result = handler.complete(submission, &ctx).await;
        self.finish(result, action.as_str(), request_id)
    }

    /// Routes a slash command. Always yields a renderable reply; the status
    /// tells the HTTP layer whether a handler for the command existed.
    pub async fn dispatch_command(&self, command: &SlashCommand, request_id: &str) -> CommandReply {
        let ctx = self.context(request_id);
        let (status, handler) = match self.registry.command_handler(&command.command) {
            Some(handler) => (CommandStatus::Handled, handler),
            None => {
                self.reporter.report(
                    &DispatchError::UnregisteredCommand { command: command.command.clone() },
                    request_id,
                );
                (CommandStatus::Unhandled, self.registry.default_command())
            }
        };

        debug!(
            event_name = "slack.dispatch.command",
            correlation_id = request_id,
            command = %command.name(),
            workspace_id = %command.team_id,
            handled = status == CommandStatus::Handled,
            "invoking command handler"
        );

        match handler.handle(command, &ctx).await {
            Ok(message) => CommandReply { status, message },
            Err(source) => {
                let message =
                    source.reply().cloned().unwrap_or_else(|| blocks::failure_message(request_id));
                self.reporter.report(
                    &DispatchError::CommandFailed {
                        command: command.command.clone(),
                        team_id: command.team_id.clone(),
                        channel_id: command.channel_id.clone(),
                        user_id: command.user_id.clone(),
                        text: command.text.clone(),
                        source,
                    },
                    request_id,
                );
                let status = match status {
                    CommandStatus::Handled => CommandStatus::Failed,
                    other => other,
                };
                CommandReply { status, message }
            }
        }
    }

    fn context(&self, request_id: &str) -> InteractionContext {
        InteractionContext::new(request_id, self.correlation.clone())
    }

    fn finish(
        &self,
        result: Result<HandlerResult, HandlerError>,
        target: &str,
        request_id: &str,
    ) -> DispatchOutcome {
        match result {
            Ok(HandlerResult::Responded(reply)) => DispatchOutcome::Responded(reply),
            Ok(HandlerResult::Processed) => DispatchOutcome::Processed,
            Err(source) => {
                let reply = source.reply().cloned();
                self.fail(DispatchError::Handler { target: target.to_owned(), source }, request_id, reply)
            }
        }
    }

    fn fail(
        &self,
        error: DispatchError,
        request_id: &str,
        reply: Option<MessageTemplate>,
    ) -> DispatchOutcome {
        self.reporter.report(&error, request_id);
        DispatchOutcome::Failed {
            kind: error.kind(),
            reply: reply.unwrap_or_else(|| blocks::failure_message(request_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use switchboard_db::InMemoryKvStore;

    use super::{CommandStatus, DispatchOutcome, Dispatcher, FailureKind};
    use crate::blocks::{self, MessageTemplate};
    use crate::commands::SlashCommand;
    use crate::correlation::{CorrelationStore, CORRELATION_TTL};
    use crate::handler::{
        CompleteActionHandler, HandlerError, HandlerResult, InteractionContext,
        SlashCommandHandler, StartActionHandler,
    };
    use crate::interaction::{ActionRequest, ViewSubmission};
    use crate::registry::HandlerRegistry;
    use crate::test_support::RecordingReporter;

    #[derive(Clone, Default)]
    struct Calls(Arc<AtomicUsize>);

    impl Calls {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Opens a "modal" by recording the view id it pretends the platform assigned.
    struct OpenSurvey {
        calls: Calls,
        view_id: &'static str,
    }

    #[async_trait]
    impl StartActionHandler for OpenSurvey {
        async fn start(
            &self,
            action: &ActionRequest,
            ctx: &InteractionContext,
        ) -> Result<HandlerResult, HandlerError> {
            self.calls.hit();
            ctx.correlation.put(&action.callback_id, self.view_id, action.workspace_id()).await?;
            Ok(HandlerResult::Processed)
        }
    }

    struct Respond {
        calls: Calls,
        text: &'static str,
    }

    #[async_trait]
    impl StartActionHandler for Respond {
        async fn start(
            &self,
            _action: &ActionRequest,
            _ctx: &InteractionContext,
        ) -> Result<HandlerResult, HandlerError> {
            self.calls.hit();
            Ok(HandlerResult::Responded(blocks::text_message(self.text)))
        }
    }

    #[async_trait]
    impl CompleteActionHandler for Respond {
        async fn complete(
            &self,
            submission: &ViewSubmission,
            _ctx: &InteractionContext,
        ) -> Result<HandlerResult, HandlerError> {
            self.calls.hit();
            Ok(HandlerResult::Responded(blocks::text_message(&format!(
                "{} {}",
                self.text,
                submission.view_id()
            ))))
        }
    }

    #[async_trait]
    impl SlashCommandHandler for Respond {
        async fn handle(
            &self,
            _command: &SlashCommand,
            _ctx: &InteractionContext,
        ) -> Result<MessageTemplate, HandlerError> {
            self.calls.hit();
            Ok(blocks::text_message(self.text))
        }
    }

    struct Broken;

    #[async_trait]
    impl StartActionHandler for Broken {
        async fn start(
            &self,
            _action: &ActionRequest,
            _ctx: &InteractionContext,
        ) -> Result<HandlerResult, HandlerError> {
            Err(HandlerError::failed("upstream timed out"))
        }
    }

    #[async_trait]
    impl SlashCommandHandler for Broken {
        async fn handle(
            &self,
            _command: &SlashCommand,
            _ctx: &InteractionContext,
        ) -> Result<MessageTemplate, HandlerError> {
            Err(HandlerError::with_reply("bad input", blocks::text_message("Try `/deploy <env>`")))
        }
    }

    fn dispatcher(registry: HandlerRegistry) -> (Dispatcher, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let correlation = CorrelationStore::new(Arc::new(InMemoryKvStore::new()));
        (Dispatcher::new(Arc::new(registry), correlation, reporter.clone()), reporter)
    }

    fn message_action(callback_id: &str) -> String {
        json!({
            "type": "message_action",
            "callback_id": callback_id,
            "team": {"id": "T1", "domain": "acme"},
            "user": {"id": "U1", "name": "ada"},
            "channel": {"id": "C1", "name": "general"},
            "trigger_id": "trig-1",
            "message": {"text": "hello"}
        })
        .to_string()
    }

    fn view_submission(view_id: &str, team_id: &str) -> String {
        json!({
            "type": "view_submission",
            "team": {"id": team_id},
            "user": {"id": "U1"},
            "view": {"id": view_id, "team_id": team_id, "state": {"values": {}}}
        })
        .to_string()
    }

    fn slash_command(command: &str, text: &str) -> SlashCommand {
        SlashCommand {
            team_id: "T1".to_owned(),
            channel_id: "C1".to_owned(),
            user_id: "U1".to_owned(),
            command: command.to_owned(),
            text: text.to_owned(),
            ..SlashCommand::default()
        }
    }

    #[tokio::test]
    async fn unknown_command_falls_back_to_default_and_is_unhandled() {
        let (dispatcher, reporter) = dispatcher(HandlerRegistry::new());

        let reply = dispatcher.dispatch_command(&slash_command("/foo", "bar"), "req-a").await;

        assert_eq!(reply.status, CommandStatus::Unhandled);
        assert!(reply.message.rendered_text().contains("can't do this: foo bar"));
        assert_eq!(reporter.kinds(), vec![FailureKind::UnregisteredTarget]);
    }

    #[tokio::test]
    async fn failing_default_handler_keeps_command_unhandled() {
        let mut registry = HandlerRegistry::new();
        registry.register_default_command(Broken);
        let (dispatcher, reporter) = dispatcher(registry);

        let reply = dispatcher.dispatch_command(&slash_command("/foo", "bar"), "req-a2").await;

        assert_eq!(reply.status, CommandStatus::Unhandled);
        assert_eq!(reply.message, blocks::text_message("Try `/deploy <env>`"));
        assert_eq!(
            reporter.kinds(),
            vec![FailureKind::UnregisteredTarget, FailureKind::HandlerFailed]
        );
    }

    #[tokio::test]
    async fn unknown_slash_command_envelope_is_a_client_error() {
        let (dispatcher, reporter) = dispatcher(HandlerRegistry::new());

        let raw = json!({"type": "slash_command", "command": "/foo", "text": "bar", "team_id": "T1"})
            .to_string();
        let outcome = dispatcher.dispatch_payload(&raw, "req-a3").await;

        assert!(outcome.is_client_error());
        assert_eq!(outcome, DispatchOutcome::Unhandled(blocks::unknown_command_message("foo bar")));
        assert_eq!(reporter.kinds(), vec![FailureKind::UnregisteredTarget]);
    }

    #[tokio::test]
    async fn message_action_matches_start_handler_case_insensitively() {
        let calls = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry.register_start("widget", Respond { calls: calls.clone(), text: "widget!" });
        let (dispatcher, reporter) = dispatcher(registry);

        let outcome = dispatcher.dispatch_payload(&message_action("Widget"), "req-b").await;

        assert_eq!(outcome, DispatchOutcome::Responded(blocks::text_message("widget!")));
        assert_eq!(calls.count(), 1);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn submission_routes_to_complete_handler_through_correlation() {
        let started = Calls::default();
        let completed = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry
            .register_start("survey", OpenSurvey { calls: started.clone(), view_id: "V123" })
            .register_complete("Survey", Respond { calls: completed.clone(), text: "thanks" });
        let (dispatcher, reporter) = dispatcher(registry);

        let opened = dispatcher.dispatch_payload(&message_action("survey"), "req-c1").await;
        assert_eq!(opened, DispatchOutcome::Processed);
        assert_eq!(started.count(), 1);

        let submitted = dispatcher.dispatch_payload(&view_submission("V123", "T1"), "req-c2").await;
        assert_eq!(submitted, DispatchOutcome::Responded(blocks::text_message("thanks V123")));
        assert_eq!(completed.count(), 1);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn correlated_submission_without_complete_handler_is_reported() {
        let mut registry = HandlerRegistry::new();
        registry.register_start("survey", OpenSurvey { calls: Calls::default(), view_id: "V123" });
        let (dispatcher, reporter) = dispatcher(registry);

        dispatcher.dispatch_payload(&message_action("survey"), "req-c3").await;
        let outcome = dispatcher.dispatch_payload(&view_submission("V123", "T1"), "req-c4").await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Failed { kind: FailureKind::UnregisteredTarget, .. }
        ));
        assert_eq!(reporter.kinds(), vec![FailureKind::UnregisteredTarget]);
        assert!(reporter.messages()[0].contains("survey"));
    }

    #[tokio::test]
    async fn submission_without_correlation_is_a_silent_no_op() {
        let completed = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry.register_complete("survey", Respond { calls: completed.clone(), text: "thanks" });
        let (dispatcher, reporter) = dispatcher(registry);

        let outcome = dispatcher.dispatch_payload(&view_submission("V999", "T1"), "req-d").await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(outcome.reply(), None);
        assert_eq!(completed.count(), 0);
        assert!(reporter.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submission_after_ttl_is_ignored() {
        let completed = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry
            .register_start("survey", OpenSurvey { calls: Calls::default(), view_id: "V123" })
            .register_complete("survey", Respond { calls: completed.clone(), text: "thanks" });
        let (dispatcher, reporter) = dispatcher(registry);

        dispatcher.dispatch_payload(&message_action("survey"), "req-e1").await;
        tokio::time::advance(CORRELATION_TTL + Duration::from_secs(1)).await;
        let outcome = dispatcher.dispatch_payload(&view_submission("V123", "T1"), "req-e2").await;

        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert_eq!(completed.count(), 0);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn malformed_payloads_are_reported_with_generic_reply() {
        let (dispatcher, reporter) = dispatcher(HandlerRegistry::new());

        for raw in ["not json", r#"{"callback_id":"x"}"#, r#"{"type":"shortcut"}"#] {
            let outcome = dispatcher.dispatch_payload(raw, "req-m").await;
            let DispatchOutcome::Failed { kind, reply } = outcome else {
                panic!("expected failure for `{raw}`");
            };
            assert_eq!(kind, FailureKind::Malformed);
            assert_eq!(reply, blocks::failure_message("req-m"));
        }
        assert_eq!(reporter.kinds(), vec![FailureKind::Malformed; 3]);
    }

    #[tokio::test]
    async fn unregistered_start_action_is_reported() {
        let (dispatcher, reporter) = dispatcher(HandlerRegistry::new());

        let outcome = dispatcher.dispatch_payload(&message_action("nope"), "req-u").await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                kind: FailureKind::UnregisteredTarget,
                reply: blocks::failure_message("req-u"),
            }
        );
        assert_eq!(reporter.kinds(), vec![FailureKind::UnregisteredTarget]);
    }

    #[tokio::test]
    async fn start_handler_failure_becomes_generic_reply() {
        let mut registry = HandlerRegistry::new();
        registry.register_start("widget", Broken);
        let (dispatcher, reporter) = dispatcher(registry);

        let outcome = dispatcher.dispatch_payload(&message_action("widget"), "req-f").await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                kind: FailureKind::HandlerFailed,
                reply: blocks::failure_message("req-f"),
            }
        );
        assert_eq!(reporter.kinds(), vec![FailureKind::HandlerFailed]);
        assert!(reporter.messages()[0].contains("upstream timed out"));
    }

    #[tokio::test]
    async fn command_handler_failure_keeps_handler_reply_and_metadata() {
        let mut registry = HandlerRegistry::new();
        registry.register_command("/deploy", Broken);
        let (dispatcher, reporter) = dispatcher(registry);

        let reply = dispatcher.dispatch_command(&slash_command("/Deploy", "prod"), "req-g").await;

        assert_eq!(reply.status, CommandStatus::Failed);
        assert_eq!(reply.message, blocks::text_message("Try `/deploy <env>`"));
        assert_eq!(reporter.kinds(), vec![FailureKind::HandlerFailed]);
        let message = &reporter.messages()[0];
        assert!(message.contains("/Deploy") && message.contains("T1/C1") && message.contains("U1"));
    }

    #[tokio::test]
    async fn registered_command_is_handled() {
        let calls = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("deploy", Respond { calls: calls.clone(), text: "deploying" });
        let (dispatcher, reporter) = dispatcher(registry);

        let reply = dispatcher.dispatch_command(&slash_command("/DEPLOY", "prod"), "req-h").await;

        assert_eq!(reply.status, CommandStatus::Handled);
        assert_eq!(reply.message, blocks::text_message("deploying"));
        assert_eq!(calls.count(), 1);
        assert!(reporter.is_empty());
    }

    #[tokio::test]
    async fn slash_command_envelope_in_payload_is_routed() {
        let calls = Calls::default();
        let mut registry = HandlerRegistry::new();
        registry.register_command("deploy", Respond { calls: calls.clone(), text: "deploying" });
        let (dispatcher, _) = dispatcher(registry);

        let raw = json!({"type": "slash_command", "command": "/deploy", "team_id": "T1"}).to_string();
        let outcome = dispatcher.dispatch_payload(&raw, "req-i").await;

        assert_eq!(outcome, DispatchOutcome::Responded(blocks::text_message("deploying")));
        assert_eq!(calls.count(), 1);
    }
}
