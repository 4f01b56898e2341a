use async_trait::async_trait;
use serde::Deserialize;

use crate::blocks::{self, MessageTemplate, ResponseType};
use crate::handler::{HandlerError, InteractionContext, SlashCommandHandler};
use crate::registry::ActionName;

/// Slash-command form fields as posted by the platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlashCommand {
    pub token: String,
    pub team_id: String,
    pub team_domain: String,
    pub enterprise_id: String,
    pub enterprise_name: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub verb: Option<String>,
    pub rest: String,
}

impl SlashCommand {
    /// Registry key for this command (`"/Deploy"` -> `deploy`).
    pub fn name(&self) -> ActionName {
        ActionName::new(&self.command)
    }

    /// Splits `text` into a lowercase leading verb and the untouched remainder.
    pub fn args(&self) -> CommandArgs {
        let text = self.text.trim();
        match text.split_once(char::is_whitespace) {
            Some((verb, rest)) => {
                CommandArgs { verb: Some(verb.to_ascii_lowercase()), rest: rest.trim().to_owned() }
            }
            None if text.is_empty() => CommandArgs::default(),
            None => CommandArgs { verb: Some(text.to_ascii_lowercase()), rest: String::new() },
        }
    }

    /// The command as typed, without its slash: `"/foo"` + `"bar"` -> `"foo bar"`.
    pub fn command_line(&self) -> String {
        let command = self.command.trim();
        let command = command.strip_prefix('/').unwrap_or(command);
        format!("{command} {}", self.text.trim()).trim().to_owned()
    }
}

/// Default command handler: tells the user the command is not supported.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnknownCommandHandler;

#[async_trait]
impl SlashCommandHandler for UnknownCommandHandler {
    async fn handle(
        &self,
        command: &SlashCommand,
        _ctx: &InteractionContext,
    ) -> Result<MessageTemplate, HandlerError> {
        Ok(blocks::unknown_command_message(&command.command_line()))
    }
}

/// Liveness check for the command route: `/ping` answers `pong`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PingCommandHandler;

#[async_trait]
impl SlashCommandHandler for PingCommandHandler {
    async fn handle(
        &self,
        command: &SlashCommand,
        ctx: &InteractionContext,
    ) -> Result<MessageTemplate, HandlerError> {
        let args = command.args();
        let text = match args.verb.as_deref() {
            None => "pong".to_owned(),
            Some("echo") => format!("pong: {}", args.rest),
            Some("backend") => format!("pong (correlation: {})", ctx.correlation.backend_name()),
            Some(other) => {
                return Err(HandlerError::with_reply(
                    format!("unsupported ping argument `{other}`"),
                    blocks::text_message("Usage: `/ping [echo <text> | backend]`"),
                ))
            }
        };

        Ok(blocks::MessageBuilder::new(text.clone())
            .response_type(ResponseType::Ephemeral)
            .section("switchboard.ping.v1", |section| {
                section.plain(text);
            })
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandArgs, PingCommandHandler, SlashCommand, UnknownCommandHandler};
    use crate::handler::{HandlerError, InteractionContext, SlashCommandHandler};
    use crate::test_support::memory_context;

    fn command(command: &str, text: &str) -> SlashCommand {
        SlashCommand { command: command.to_owned(), text: text.to_owned(), ..SlashCommand::default() }
    }

    #[test]
    fn name_is_normalized_without_slash() {
        assert_eq!(command("/Deploy", "").name().as_str(), "deploy");
        assert_eq!(command(" /foo ", "").name().as_str(), "foo");
    }

    #[test]
    fn args_split_verb_from_remainder() {
        assert_eq!(
            command("/quote", "  Status  Q-1  extra ").args(),
            CommandArgs { verb: Some("status".to_owned()), rest: "Q-1  extra".to_owned() }
        );
        assert_eq!(command("/quote", "   ").args(), CommandArgs::default());
        assert_eq!(
            command("/quote", "HELP").args(),
            CommandArgs { verb: Some("help".to_owned()), rest: String::new() }
        );
    }

    #[test]
    fn command_line_drops_slash_and_blank_text() {
        assert_eq!(command("/foo", "bar").command_line(), "foo bar");
        assert_eq!(command("/foo", "").command_line(), "foo");
    }

    #[tokio::test]
    async fn unknown_handler_echoes_command_line() {
        let ctx: InteractionContext = memory_context("req-1");
        let reply = UnknownCommandHandler.handle(&command("/foo", "bar"), &ctx).await.expect("reply");
        assert!(reply.rendered_text().contains("can't do this: foo bar"));
    }

    #[tokio::test]
    async fn ping_answers_and_rejects_unknown_arguments() {
        let ctx = memory_context("req-2");

        let reply = PingCommandHandler.handle(&command("/ping", ""), &ctx).await.expect("pong");
        assert_eq!(reply.fallback_text, "pong");

        let reply =
            PingCommandHandler.handle(&command("/ping", "echo hi there"), &ctx).await.expect("echo");
        assert_eq!(reply.fallback_text, "pong: hi there");

        let reply =
            PingCommandHandler.handle(&command("/ping", "backend"), &ctx).await.expect("backend");
        assert_eq!(reply.fallback_text, "pong (correlation: memory)");

        let error =
            PingCommandHandler.handle(&command("/ping", "dance"), &ctx).await.expect_err("usage");
        assert!(matches!(error, HandlerError::FailedWithReply { .. }));
        assert!(error.reply().is_some());
    }
}
