use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// Who sees a reply posted back into the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    InChannel,
    Ephemeral,
}

/// The reply body returned to the platform: `{"text": ..., "blocks": [...]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    #[serde(rename = "text")]
    pub fallback_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
    pub blocks: Vec<Block>,
}

impl MessageTemplate {
    pub fn rendered_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Section { text, .. } => Some(text_of(text)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn text_of(text: &TextObject) -> &str {
    match text {
        TextObject::Plain { text } | TextObject::Mrkdwn { text } => text,
    }
}

pub struct MessageBuilder {
    fallback_text: String,
    response_type: Option<ResponseType>,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), response_type: None, blocks: Vec::new() }
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            response_type: self.response_type,
            blocks: self.blocks,
        }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

/// Single-section ephemeral reply.
pub fn text_message(text: &str) -> MessageTemplate {
    MessageBuilder::new(text.to_owned())
        .response_type(ResponseType::Ephemeral)
        .section("switchboard.text.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

/// Rendered when a slash command has no registered handler.
pub fn unknown_command_message(command_line: &str) -> MessageTemplate {
    let summary = format!("Sorry, but I can't do this: {command_line}");
    MessageBuilder::new(summary.clone())
        .response_type(ResponseType::Ephemeral)
        .section("switchboard.command.unknown.v1", |section| {
            section.mrkdwn(summary);
        })
        .build()
}

/// Generic user-facing reply for any failure the user cannot act on.
pub fn failure_message(correlation_id: &str) -> MessageTemplate {
    let summary = "Something went wrong while handling this request.";
    MessageBuilder::new(summary)
        .response_type(ResponseType::Ephemeral)
        .section("switchboard.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("switchboard.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}
