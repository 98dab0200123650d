//! Serenity gateway glue: slash commands, message events and shard lifecycle.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serenity::all::{
    ChannelId, ChannelType, Client, Colour, Command, CommandInteraction, Context, CreateCommand,
    CreateEmbed, CreateEmbedFooter, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, CreateThread, EventHandler, GatewayIntents,
    Http, Interaction, Mentionable, Message, ModelError, Ready, ShardManager,
};

use super::support::{
    IncomingMessage, NewThread, PlatformError, Requester, Screening, SupportChannel, SupportDesk,
    WelcomeNotice,
};
use crate::core::errors::BotError;

/// Discord rejects messages longer than this many characters.
pub const MESSAGE_LIMIT: usize = 2000;

type ShardSlot = Arc<OnceLock<Arc<ShardManager>>>;

pub struct Handler {
    desk: SupportDesk,
    shard_manager: ShardSlot,
}

impl Handler {
    pub fn new(desk: SupportDesk) -> Self {
        Self {
            desk,
            shard_manager: Arc::new(OnceLock::new()),
        }
    }

    async fn ping(&self, ctx: &Context, command: &CommandInteraction) {
        let started = Instant::now();
        if let Err(err) = command.defer(&ctx.http).await {
            tracing::error!("Failed to defer ping: {}", err);
            return;
        }
        let measured = started.elapsed();
        let latency = self.gateway_latency(ctx).await.unwrap_or(measured);
        let millis = latency.as_millis();

        let followup =
            CreateInteractionResponseFollowup::new().content(format!("Pong! Latency: {}ms", millis));
        if let Err(err) = command.create_followup(&ctx.http, followup).await {
            tracing::error!("Failed to answer ping: {}", err);
            return;
        }
        tracing::info!(
            "Ping command executed by {} (ID: {}). Latency: {}ms",
            command.user.name,
            command.user.id,
            millis
        );
    }

    async fn support(&self, ctx: &Context, command: &CommandInteraction) {
        let channel = DiscordChannel {
            http: ctx.http.clone(),
            channel_id: command.channel_id,
        };
        let requester = Requester {
            id: command.user.id.to_string(),
            name: command.user.name.clone(),
            mention: command.user.mention().to_string(),
        };

        let outcome = self.desk.open_ticket(&channel, &requester).await;

        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(outcome.reply())
                .ephemeral(true),
        );
        if let Err(err) = command.create_response(&ctx.http, response).await {
            tracing::error!("Failed to answer support command: {}", err);
        }
    }

    /// Heartbeat latency of the shard that delivered the event, once known.
    async fn gateway_latency(&self, ctx: &Context) -> Option<Duration> {
        let manager = self.shard_manager.get()?;
        let runners = manager.runners.lock().await;
        runners.get(&ctx.shard_id).and_then(|runner| runner.latency)
    }

    async fn on_message(&self, ctx: &Context, msg: &Message) -> Result<(), BotError> {
        // cheap check first; the thread lookup may hit the REST API
        if msg.author.bot {
            return Ok(());
        }

        let incoming = IncomingMessage {
            channel_id: msg.channel_id.to_string(),
            in_thread: is_thread(ctx, msg.channel_id).await,
            author_id: msg.author.id.to_string(),
            author_is_bot: msg.author.bot,
            content: msg.content.clone(),
        };

        if let Screening::Ignored(reason) = self.desk.screen(&incoming).await? {
            tracing::trace!("Ignoring message {}: {:?}", msg.id, reason);
            return Ok(());
        }

        let typing = msg.channel_id.start_typing(&ctx.http);
        let answer = self.desk.answer(&incoming).await;
        typing.stop();

        for part in split_message(&answer, MESSAGE_LIMIT) {
            msg.channel_id
                .say(&ctx.http, part)
                .await
                .map_err(|err| BotError::Platform(err.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!("{} has connected to Discord!", ready.user.name);
        tracing::info!("Serving {} guilds", ready.guilds.len());

        let commands = vec![
            CreateCommand::new("ping").description("Check bot latency"),
            CreateCommand::new("support").description("Create a support ticket"),
        ];
        match Command::set_global_commands(&ctx.http, commands).await {
            Ok(registered) => tracing::info!("Registered {} slash commands", registered.len()),
            Err(err) => tracing::error!("Failed to register slash commands: {}", err),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        match command.data.name.as_str() {
            "ping" => self.ping(&ctx, &command).await,
            "support" => self.support(&ctx, &command).await,
            other => tracing::warn!("Unknown command: {}", other),
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(err) = self.on_message(&ctx, &msg).await {
            tracing::error!("Failed to handle message in {}: {}", msg.channel_id, err);
        }
    }
}

/// Channel a `/support` command was used in.
struct DiscordChannel {
    http: Arc<Http>,
    channel_id: ChannelId,
}

#[async_trait]
impl SupportChannel for DiscordChannel {
    async fn create_private_thread(&self, name: &str) -> Result<NewThread, PlatformError> {
        let builder = CreateThread::new(name)
            .kind(ChannelType::PrivateThread)
            .audit_log_reason("Support ticket created");
        let thread = self
            .channel_id
            .create_thread(&self.http, builder)
            .await
            .map_err(platform_error)?;

        Ok(NewThread {
            id: thread.id.to_string(),
            name: thread.name.clone(),
            mention: thread.id.mention().to_string(),
        })
    }

    async fn send_welcome(&self, thread_id: &str, notice: &WelcomeNotice) -> Result<(), PlatformError> {
        let id: u64 = thread_id
            .parse()
            .map_err(|_| PlatformError::Other(format!("invalid thread id {}", thread_id)))?;

        let embed = notice.fields.iter().fold(
            CreateEmbed::new()
                .title(notice.title)
                .description(notice.description)
                .colour(Colour::BLUE)
                .footer(CreateEmbedFooter::new(notice.footer)),
            |embed, (name, value)| embed.field(name, value, false),
        );

        ChannelId::new(id)
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await
            .map_err(platform_error)?;
        Ok(())
    }
}

fn platform_error(err: serenity::Error) -> PlatformError {
    match err {
        serenity::Error::Http(http_err) => {
            if http_err.status_code().map(|status| status.as_u16()) == Some(403) {
                PlatformError::Forbidden
            } else {
                PlatformError::Http(http_err.to_string())
            }
        }
        serenity::Error::Model(ModelError::InvalidPermissions { .. }) => PlatformError::Forbidden,
        other => PlatformError::Other(other.to_string()),
    }
}

async fn is_thread(ctx: &Context, channel_id: ChannelId) -> bool {
    match channel_id.to_channel(ctx).await {
        Ok(channel) => channel.guild().is_some_and(|guild_channel| {
            matches!(
                guild_channel.kind,
                ChannelType::PublicThread | ChannelType::PrivateThread | ChannelType::NewsThread
            )
        }),
        Err(err) => {
            tracing::warn!("Could not resolve channel {}: {}", channel_id, err);
            false
        }
    }
}

/// Splits text into pieces of at most `limit` characters, preferring line breaks.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                parts.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Connects to the gateway and runs until shutdown is requested.
///
/// Ctrl-C stops every shard; the caller then closes the pipeline.
pub async fn run(token: &str, desk: SupportDesk) -> Result<(), BotError> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let handler = Handler::new(desk);
    let shard_slot = handler.shard_manager.clone();

    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await
        .map_err(|err| BotError::Platform(err.to_string()))?;

    let shard_manager = client.shard_manager.clone();
    let _ = shard_slot.set(shard_manager.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested, stopping shards");
            shard_manager.shutdown_all().await;
        }
    });

    client
        .start()
        .await
        .map_err(|err| BotError::Platform(err.to_string()))
}
