use std::sync::Arc;

use crate::chat::{ChatSender, ChatSink};
use crate::engine::ActionEngine;
use crate::error::{RelayError, Result};
use crate::types::ActionId;

const USAGE: &str = "usage: list | active | on <id> | off <id> | help";

/// A parsed inbound chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    List,
    Active,
    Activate(ActionId),
    Deactivate(ActionId),
    Help,
}

impl Command {
    /// Parse `text`. A leading slash-command word (`/fca on 5`) is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_some_and(|w| w.starts_with('/')) {
            words.next();
        }

        let verb = words.next().map(str::to_ascii_lowercase);
        let arg = words.next();
        if words.next().is_some() {
            return Err(RelayError::Usage(USAGE.to_string()));
        }

        match (verb.as_deref(), arg) {
            (None | Some("help"), None) => Ok(Command::Help),
            (Some("list"), None) => Ok(Command::List),
            (Some("active"), None) => Ok(Command::Active),
            (Some("on" | "activate"), Some(id)) => Ok(Command::Activate(parse_id(id)?)),
            (Some("off" | "deactivate"), Some(id)) => Ok(Command::Deactivate(parse_id(id)?)),
            _ => Err(RelayError::Usage(USAGE.to_string())),
        }
    }
}

fn parse_id(s: &str) -> Result<ActionId> {
    s.parse()
        .map_err(|_| RelayError::Usage(format!("'{s}' is not an action id")))
}

/// Runs chat commands against an engine and replies through a sink.
pub struct CommandHandler<S> {
    engine: Arc<ActionEngine>,
    chat: ChatSender<S>,
}

impl<S: ChatSink> CommandHandler<S> {
    pub fn new(engine: Arc<ActionEngine>, sink: S) -> Self {
        Self {
            engine,
            chat: ChatSender::new(sink),
        }
    }

    pub fn chat(&self) -> &ChatSender<S> {
        &self.chat
    }

    /// Parse and run `text`, sending one chat line per reply line.
    pub fn handle(&self, text: &str) {
        let lines = match Command::parse(text) {
            Ok(cmd) => self.respond(cmd),
            Err(e) => vec![e.to_string()],
        };
        for line in lines {
            self.chat.send(&line);
        }
    }

    pub fn respond(&self, cmd: Command) -> Vec<String> {
        match cmd {
            Command::Help => vec![USAGE.to_string()],
            Command::List => {
                let mut lines = vec!["Company actions:".to_string()];
                lines.extend(self.engine.all_actions().into_iter().map(|a| {
                    format!("[{}] {} - {} ({} credits)", a.id, a.name, a.description, a.cost)
                }));
                lines
            }
            Command::Active => {
                let active = self.engine.active_actions();
                if active.is_empty() {
                    return vec!["No company actions are active.".to_string()];
                }
                active
                    .into_iter()
                    .map(|a| {
                        format!(
                            "slot {}: {} [{}], {} remaining",
                            a.slot_index + 1,
                            a.name,
                            a.id,
                            a.time_remaining
                        )
                    })
                    .collect()
            }
            Command::Activate(id) => match self.engine.activate(id) {
                Ok(()) => vec![format!("Activating {}...", self.display_name(id))],
                Err(e) => vec![e.to_string()],
            },
            Command::Deactivate(id) => match self.engine.deactivate(id) {
                Ok(()) => vec![format!("Deactivating {}...", self.display_name(id))],
                Err(e) => vec![e.to_string()],
            },
        }
    }

    fn display_name(&self, id: ActionId) -> String {
        self.engine
            .action(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| format!("action {id}"))
    }
}
