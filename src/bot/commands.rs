//! Slash commands
//!
//! Commands are registered by name in a [`CommandRegistry`]. The Discord
//! adapter publishes [`CommandRegistry::definitions`] on startup and routes
//! every command interaction through [`CommandRegistry::dispatch`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn, Instrument};

use crate::bot::flow::FlowController;
use crate::bot::interaction::InteractionUser;
use crate::errors::{error_logging, AppResult};
use crate::observability;

/// Reply shown when a command fails
pub const COMMAND_FAILED_REPLY: &str = "There was an error executing that command!";

/// A slash command invocation, stripped of platform details
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub name: String,
    pub channel_id: u64,
    pub user: InteractionUser,
}

/// Interaction reply for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    /// Only the invoking user sees the reply
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn execute(&self, invocation: &CommandInvocation) -> AppResult<CommandReply>;
}

/// Name and description of a registered command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command; a later registration under the same name wins.
    pub fn register(&mut self, command: Arc<dyn SlashCommand>) {
        if self.commands.insert(command.name(), command).is_some() {
            warn!("Slash command registered twice, keeping the latest");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SlashCommand>> {
        self.commands.get(name)
    }

    pub fn definitions(&self) -> Vec<CommandDefinition> {
        self.commands
            .values()
            .map(|command| CommandDefinition {
                name: command.name(),
                description: command.description(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run the named command.
    ///
    /// Returns `None` for names that are not registered. A failing command
    /// is logged and answered with [`COMMAND_FAILED_REPLY`].
    pub async fn dispatch(&self, invocation: &CommandInvocation) -> Option<CommandReply> {
        let Some(command) = self.get(&invocation.name) else {
            warn!(command = %invocation.name, "No command matching name was found");
            return None;
        };

        let span = observability::discord_span("slash_command", invocation.channel_id);
        let result = command.execute(invocation).instrument(span).await;

        Some(match result {
            Ok(reply) => {
                observability::record_interaction(command.name(), "transitioned");
                reply
            }
            Err(e) => {
                observability::record_interaction(command.name(), "error");
                error_logging::log_flow_error(
                    &e,
                    command.name(),
                    invocation.channel_id,
                    Some(invocation.user.id),
                );
                CommandReply::ephemeral(COMMAND_FAILED_REPLY)
            }
        })
    }
}

/// `/buy`: start the purchase flow over in the current channel
pub struct BuyCommand {
    flow: Arc<FlowController>,
}

impl BuyCommand {
    pub fn new(flow: Arc<FlowController>) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl SlashCommand for BuyCommand {
    fn name(&self) -> &'static str {
        "buy"
    }

    fn description(&self) -> &'static str {
        "Start a purchase in this channel"
    }

    async fn execute(&self, invocation: &CommandInvocation) -> AppResult<CommandReply> {
        self.flow.restart(invocation.channel_id).await?;
        info!(
            channel_id = %invocation.channel_id,
            user_id = %invocation.user.id,
            "Purchase flow restarted by command"
        );
        Ok(CommandReply::ephemeral("Purchase prompt posted."))
    }
}

/// Registry with every command the bot ships
pub fn default_registry(flow: Arc<FlowController>) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(BuyCommand::new(flow)));
    registry
}
