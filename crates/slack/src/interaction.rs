//! Interaction payloads and their two-pass decode.
//!
//! Message actions and view submissions share nothing but the `type` field,
//! so decoding first reads that discriminator alone and only then commits to
//! a full schema. Fields the engine does not route on are kept in `extra`
//! and handed to handlers untouched.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::commands::SlashCommand;
use crate::timestamp::SlackTimestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    SlashCommand,
    MessageAction,
    ViewSubmission,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlashCommand => "slash_command",
            Self::MessageAction => "message_action",
            Self::ViewSubmission => "view_submission",
        }
    }

    fn from_discriminator(value: &str) -> Option<Self> {
        match value {
            "slash_command" => Some(Self::SlashCommand),
            "message_action" => Some(Self::MessageAction),
            "view_submission" => Some(Self::ViewSubmission),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("payload is not a JSON object with a string `type`: {0}")]
    InvalidJson(String),
    #[error("payload has no `type` discriminator")]
    MissingType,
    #[error("unknown interaction type `{0}`")]
    UnknownType(String),
    #[error("could not decode `{kind}` payload: {message}")]
    Decode { kind: &'static str, message: String },
}

#[derive(Deserialize)]
struct InteractionPeek {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct TokenPeek {
    #[serde(default)]
    token: Option<String>,
}

/// Reads only the `token` field of `raw`, so a request can be verified
/// before anything else about it is trusted.
pub fn peek_token(raw: &str) -> Option<String> {
    serde_json::from_str::<TokenPeek>(raw)
        .ok()
        .and_then(|peek| peek.token)
        .filter(|token| !token.is_empty())
}

/// Reads only the `type` field of `raw`.
pub fn classify(raw: &str) -> Result<InteractionKind, ClassifyError> {
    let peek: InteractionPeek =
        serde_json::from_str(raw).map_err(|error| ClassifyError::InvalidJson(error.to_string()))?;

    let kind = peek.kind.map(|kind| kind.trim().to_owned()).unwrap_or_default();
    if kind.is_empty() {
        return Err(ClassifyError::MissingType);
    }

    InteractionKind::from_discriminator(&kind).ok_or(ClassifyError::UnknownType(kind))
}

/// Classifies `raw`, then decodes the full payload for that kind.
pub fn decode(raw: &str) -> Result<Interaction, ClassifyError> {
    let kind = classify(raw)?;
    let decode_error =
        |error: serde_json::Error| ClassifyError::Decode { kind: kind.as_str(), message: error.to_string() };

    Ok(match kind {
        InteractionKind::SlashCommand => {
            Interaction::SlashCommand(serde_json::from_str(raw).map_err(decode_error)?)
        }
        InteractionKind::MessageAction => {
            Interaction::MessageAction(serde_json::from_str(raw).map_err(decode_error)?)
        }
        InteractionKind::ViewSubmission => {
            Interaction::ViewSubmission(serde_json::from_str(raw).map_err(decode_error)?)
        }
    })
}

#[derive(Clone, Debug, PartialEq)]
pub enum Interaction {
    SlashCommand(SlashCommand),
    MessageAction(ActionRequest),
    ViewSubmission(ViewSubmission),
}

impl Interaction {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::SlashCommand(_) => InteractionKind::SlashCommand,
            Self::MessageAction(_) => InteractionKind::MessageAction,
            Self::ViewSubmission(_) => InteractionKind::ViewSubmission,
        }
    }

    pub fn workspace_id(&self) -> &str {
        match self {
            Self::SlashCommand(command) => &command.team_id,
            Self::MessageAction(action) => action.workspace_id(),
            Self::ViewSubmission(submission) => submission.workspace_id(),
        }
    }

    pub fn actor_id(&self) -> &str {
        match self {
            Self::SlashCommand(command) => &command.user_id,
            Self::MessageAction(action) => action.user.as_ref().map_or("", |user| &user.id),
            Self::ViewSubmission(submission) => {
                submission.user.as_ref().map_or("", |user| &user.id)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct TeamRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub domain: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserRef {
    #[serde(default)]
    pub id: String,
    #[serde(default, alias = "username")]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A `message_action` payload: the user picked a custom action on a message.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub action_ts: String,
    pub team: Option<TeamRef>,
    pub user: Option<UserRef>,
    pub channel: Option<ChannelRef>,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub trigger_id: String,
    #[serde(default)]
    pub message_ts: String,
    #[serde(default)]
    pub response_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActionRequest {
    pub fn workspace_id(&self) -> &str {
        self.team.as_ref().map_or("", |team| &team.id)
    }

    pub fn action_timestamp(&self) -> Option<SlackTimestamp> {
        self.action_ts.parse().ok()
    }
}

/// The modal view carried by a submission.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct View {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub private_metadata: String,
    #[serde(default)]
    pub hash: String,
    pub state: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `view_submission` payload: the user submitted a previously opened modal.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ViewSubmission {
    #[serde(default)]
    pub token: String,
    pub team: Option<TeamRef>,
    pub user: Option<UserRef>,
    #[serde(default)]
    pub trigger_id: String,
    pub view: View,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewSubmission {
    pub fn view_id(&self) -> &str {
        &self.view.id
    }

    /// Team of the submitting user, falling back to the team that owns the view.
    pub fn workspace_id(&self) -> &str {
        match self.team.as_ref() {
            Some(team) if !team.id.is_empty() => &team.id,
            _ => &self.view.team_id,
        }
    }
}
