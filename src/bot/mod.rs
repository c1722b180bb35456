//! Bot module for handling Discord interactions
//!
//! This module is split into several submodules:
//! - `interaction`: custom ids and platform-neutral interaction events
//! - `prompt`: messages and components posted at each purchase step
//! - `flow`: the purchase state machine
//! - `commands`: slash command registry
//! - `sink`: outbound boundary used by the flow
//! - `discord`: serenity adapter

pub mod commands;
pub mod discord;
pub mod flow;
pub mod interaction;
pub mod prompt;
pub mod sink;

pub use commands::{default_registry, CommandRegistry, SlashCommand};
pub use discord::{run_bot, DiscordSink, Handler};
pub use flow::{FlowController, FlowOutcome, FlowStage, StepFailure};
pub use interaction::{ChannelCreated, InteractionEvent, InteractionId};
pub use sink::PromptSink;
