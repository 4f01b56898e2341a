use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::commands::UnknownCommandHandler;
use crate::handler::{CompleteActionHandler, SlashCommandHandler, StartActionHandler};

/// Case-normalized handler key.
///
/// The same rule applies to callback ids, correlated action names and
/// command verbs: surrounding whitespace and one leading `/` are dropped,
/// the rest is lowercased.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionName(String);

impl ActionName {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
        Self(trimmed.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegistrySummary {
    pub start_handlers: usize,
    pub complete_handlers: usize,
    pub command_handlers: usize,
}

/// Handlers by namespace. Built with `&mut` access during startup, then
/// shared read-only behind an `Arc`.
pub struct HandlerRegistry {
    start: HashMap<ActionName, Arc<dyn StartActionHandler>>,
    complete: HashMap<ActionName, Arc<dyn CompleteActionHandler>>,
    commands: HashMap<ActionName, Arc<dyn SlashCommandHandler>>,
    default_command: Arc<dyn SlashCommandHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            start: HashMap::new(),
            complete: HashMap::new(),
            commands: HashMap::new(),
            default_command: Arc::new(UnknownCommandHandler),
        }
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_start<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: StartActionHandler + 'static,
    {
        self.start.insert(ActionName::new(name), Arc::new(handler));
        self
    }

    pub fn register_complete<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: CompleteActionHandler + 'static,
    {
        self.complete.insert(ActionName::new(name), Arc::new(handler));
        self
    }

    pub fn register_command<H>(&mut self, name: &str, handler: H) -> &mut Self
    where
        H: SlashCommandHandler + 'static,
    {
        self.commands.insert(ActionName::new(name), Arc::new(handler));
        self
    }

    pub fn register_default_command<H>(&mut self, handler: H) -> &mut Self
    where
        H: SlashCommandHandler + 'static,
    {
        self.default_command = Arc::new(handler);
        self
    }

    pub fn start_handler(&self, name: &str) -> Option<Arc<dyn StartActionHandler>> {
        self.start.get(&ActionName::new(name)).cloned()
    }

    pub fn complete_handler(&self, name: &str) -> Option<Arc<dyn CompleteActionHandler>> {
        self.complete.get(&ActionName::new(name)).cloned()
    }

    pub fn command_handler(&self, name: &str) -> Option<Arc<dyn SlashCommandHandler>> {
        self.commands.get(&ActionName::new(name)).cloned()
    }

    pub fn default_command(&self) -> Arc<dyn SlashCommandHandler> {
        Arc::clone(&self.default_command)
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            start_handlers: self.start.len(),
            complete_handlers: self.complete.len(),
            command_handlers: self.commands.len(),
        }
    }
}
