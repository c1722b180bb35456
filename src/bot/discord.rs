//! Discord adapter
//!
//! Renders [`Prompt`]s with serenity builders, converts gateway events into
//! flow events and runs the gateway client.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{
    ButtonStyle as DiscordButtonStyle, ChannelId, ChannelType, Command, CommandInteraction,
    ComponentInteraction, ComponentInteractionDataKind, Context, CreateActionRow, CreateButton,
    CreateCommand, CreateEmbed, CreateEmbedFooter, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, EventHandler, GatewayIntents, GuildChannel, Http, Interaction,
    MessageId, Ready, Timestamp, User,
};
use serenity::Client;
use tracing::{debug, info, warn};

use crate::bot::commands::{CommandInvocation, CommandRegistry};
use crate::bot::flow::FlowController;
use crate::bot::interaction::{
    ChannelCreated, InteractionEvent, InteractionKind, InteractionUser,
};
use crate::bot::prompt::{ButtonStyle, ComponentRow, Embed, Prompt};
use crate::bot::sink::PromptSink;
use crate::config::BotConfig;
use crate::errors::{error_logging, AppError, AppResult};
use crate::observability::GatewayStatus;

/// Render one component row
pub fn render_row(row: &ComponentRow) -> CreateActionRow {
    match row {
        ComponentRow::Buttons(buttons) => CreateActionRow::Buttons(
            buttons
                .iter()
                .map(|button| {
                    CreateButton::new(button.custom_id.clone())
                        .label(button.label.clone())
                        .style(match button.style {
                            ButtonStyle::Primary => DiscordButtonStyle::Primary,
                            ButtonStyle::Danger => DiscordButtonStyle::Danger,
                        })
                })
                .collect(),
        ),
        ComponentRow::SelectMenu(menu) => {
            let options = menu
                .options
                .iter()
                .map(|option| CreateSelectMenuOption::new(option.label.clone(), option.value.clone()))
                .collect();
            CreateActionRow::SelectMenu(
                CreateSelectMenu::new(
                    menu.custom_id.clone(),
                    CreateSelectMenuKind::String { options },
                )
                .placeholder(menu.placeholder.clone()),
            )
        }
    }
}

/// Render one embed
pub fn render_embed(embed: &Embed) -> CreateEmbed {
    let mut rendered = CreateEmbed::new()
        .description(embed.description.clone())
        .colour(embed.colour);

    if let Some(thumbnail) = &embed.thumbnail {
        rendered = rendered.thumbnail(thumbnail.clone());
    }
    if let Some(footer) = &embed.footer {
        let mut rendered_footer = CreateEmbedFooter::new(footer.text.clone());
        if let Some(icon_url) = &footer.icon_url {
            rendered_footer = rendered_footer.icon_url(icon_url.clone());
        }
        rendered = rendered.footer(rendered_footer);
    }
    if embed.timestamp {
        rendered = rendered.timestamp(Timestamp::now());
    }
    rendered
}

/// Render a whole prompt as a channel message
pub fn render_message(prompt: &Prompt) -> CreateMessage {
    let mut message = CreateMessage::new();
    if let Some(content) = &prompt.content {
        message = message.content(content.clone());
    }
    if !prompt.embeds.is_empty() {
        message = message.embeds(prompt.embeds.iter().map(render_embed).collect());
    }
    if !prompt.components.is_empty() {
        message = message.components(prompt.components.iter().map(render_row).collect());
    }
    message
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http_err) => {
            http_err.status_code().map(|status| status.as_u16()) == Some(404)
        }
        _ => false,
    }
}

/// [`PromptSink`] over the Discord REST API
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PromptSink for DiscordSink {
    async fn send(&self, channel_id: u64, prompt: Prompt) -> AppResult<u64> {
        let message = ChannelId::new(channel_id)
            .send_message(&self.http, render_message(&prompt))
            .await
            .inspect_err(|e| error_logging::log_discord_error(e, "send_message", channel_id))?;
        Ok(message.id.get())
    }

    async fn delete(&self, channel_id: u64, message_id: u64) -> AppResult<()> {
        match ChannelId::new(channel_id)
            .delete_message(&self.http, MessageId::new(message_id))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(channel_id, message_id, "Prompt already deleted");
                Ok(())
            }
            Err(e) => Err(AppError::from(e)),
        }
    }
}

fn interaction_user(user: &User) -> InteractionUser {
    InteractionUser {
        id: user.id.get(),
        name: user.name.clone(),
        avatar_url: Some(user.face()),
    }
}

/// Convert a component interaction into a flow event
pub fn component_event(component: &ComponentInteraction) -> InteractionEvent {
    let (kind, values) = match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            (InteractionKind::SelectMenu, values.clone())
        }
        _ => (InteractionKind::Button, Vec::new()),
    };

    InteractionEvent {
        custom_id: component.data.custom_id.clone(),
        kind,
        values,
        channel_id: component.channel_id.get(),
        message_id: Some(component.message.id.get()),
        user: interaction_user(&component.user),
    }
}

/// Gateway event handler
pub struct Handler {
    flow: Arc<FlowController>,
    commands: Arc<CommandRegistry>,
    register_commands: bool,
    gateway: GatewayStatus,
}

impl Handler {
    pub fn new(
        flow: Arc<FlowController>,
        commands: Arc<CommandRegistry>,
        register_commands: bool,
        gateway: GatewayStatus,
    ) -> Self {
        Self {
            flow,
            commands,
            register_commands,
            gateway,
        }
    }

    async fn handle_component(&self, ctx: &Context, component: ComponentInteraction) {
        // Acknowledge first; the flow answers with channel messages
        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            error_logging::log_discord_error(
                &e,
                "acknowledge_interaction",
                component.channel_id.get(),
            );
        }

        let event = component_event(&component);
        if let Err(e) = self.flow.handle_interaction(&event).await {
            error_logging::log_discord_error(&e, "handle_interaction", event.channel_id);
        }
    }

    async fn handle_command(&self, ctx: &Context, command: CommandInteraction) {
        let invocation = CommandInvocation {
            name: command.data.name.clone(),
            channel_id: command.channel_id.get(),
            user: interaction_user(&command.user),
        };

        let Some(reply) = self.commands.dispatch(&invocation).await else {
            return;
        };

        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(reply.content)
                .ephemeral(reply.ephemeral),
        );
        if let Err(e) = command.create_response(&ctx.http, response).await {
            error_logging::log_discord_error(&e, "command_response", invocation.channel_id);
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Discord gateway ready");
        self.gateway.mark_connected();

        if !self.register_commands {
            return;
        }

        let definitions = self
            .commands
            .definitions()
            .into_iter()
            .map(|definition| CreateCommand::new(definition.name).description(definition.description))
            .collect();

        match Command::set_global_commands(&ctx.http, definitions).await {
            Ok(registered) => info!(count = registered.len(), "Registered slash commands"),
            Err(e) => warn!(error = %e, "Failed to register slash commands"),
        }
    }

    async fn channel_create(&self, _ctx: Context, channel: GuildChannel) {
        if channel.kind != ChannelType::Text {
            return;
        }

        let event = ChannelCreated {
            channel_id: channel.id.get(),
            parent_id: channel.parent_id.map(|id| id.get()),
        };
        if let Err(e) = self.flow.handle_channel_created(event).await {
            error_logging::log_discord_error(&e, "ticket_created", event.channel_id);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(component) => self.handle_component(&ctx, component).await,
            Interaction::Command(command) => self.handle_command(&ctx, command).await,
            _ => {}
        }
    }
}

/// Connect to the gateway and process events until shutdown
pub async fn run_bot(config: &BotConfig, handler: Handler) -> AppResult<()> {
    let gateway = handler.gateway.clone();
    let intents = GatewayIntents::GUILDS;
    let mut client = Client::builder(&config.token, intents)
        .event_handler(handler)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, closing gateway connections");
            shard_manager.shutdown_all().await;
        }
    });

    info!("Starting Discord client");
    let result = client.start().await;
    gateway.mark_disconnected();
    result.map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::prompt;

    #[test]
    fn test_render_rows_matches_prompt_layout() {
        let prompt = prompt::payment_page_prompt(crate::bot::interaction::PaymentPage::First);
        let rows: Vec<CreateActionRow> = prompt.components.iter().map(render_row).collect();

        assert_eq!(rows.len(), 2);
        assert!(matches!(&rows[0], CreateActionRow::Buttons(buttons) if buttons.len() == 5));
        assert!(matches!(&rows[1], CreateActionRow::Buttons(buttons) if buttons.len() == 1));
    }

    #[test]
    fn test_render_select_menu_row() {
        let prompt = prompt::product_menu_prompt(
            crate::bot::interaction::ProductCategory::CounterStrike2,
            &[crate::catalog::Product {
                id: 7,
                name: "Prime".to_string(),
                price: "5.00".to_string(),
                permalink: String::new(),
                variations: Vec::new(),
            }],
        );

        let row = render_row(&prompt.components[0]);
        assert!(matches!(row, CreateActionRow::SelectMenu(_)));
    }

    #[test]
    fn test_user_without_avatar_gets_default_icon() {
        let mut user = User::default();
        user.avatar = None;

        let converted = interaction_user(&user);

        let icon = converted.avatar_url.expect("footer icon");
        assert!(icon.contains("/embed/avatars/"));
    }
}
