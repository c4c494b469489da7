//! Telegram integration
//!
//! Long-polling dispatcher over teloxide. Every message first passes through
//! a pre-processing stage that records its author and username, then reaches
//! `RatingBot::handle_message`. Reaction updates go to `handle_reaction`.
//!
//! The bot has to be a group admin to receive reactions and delete messages.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use teloxide::{
    dispatching::{Dispatcher, UpdateFilterExt},
    dptree,
    error_handlers::LoggingErrorHandler,
    prelude::*,
    types::{
        AllowedUpdate, MessageEntityKind, MessageId, MessageReactionUpdated, ReactionType,
        Update, User,
    },
    update_listeners::Polling,
    ApiError, RequestError,
};

use crate::classifier::ModerationClient;
use crate::config::Config;
use crate::handlers::{HandlerError, RatingBot};
use crate::store::RatingStore;
use crate::transport::{
    ChatTransport, IncomingMessage, Participant, ReactionEvent, SentMessage, TransportError,
};

/// `ChatTransport` over the Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<SentMessage, TransportError> {
        let sent = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(transport_error)?;
        Ok(SentMessage {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i32) -> Result<(), TransportError> {
        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id))
            .await
            .map_err(transport_error)?;
        Ok(())
    }
}

/// Map teloxide errors onto the benign/non-benign split
pub(crate) fn transport_error(e: RequestError) -> TransportError {
    match e {
        RequestError::Api(api) => match api {
            ApiError::MessageToDeleteNotFound | ApiError::MessageIdInvalid => {
                TransportError::MessageNotFound(api.to_string())
            }
            ApiError::MessageCantBeDeleted | ApiError::BotKicked | ApiError::BotBlocked => {
                TransportError::Forbidden(api.to_string())
            }
            other => TransportError::Rejected(other.to_string()),
        },
        other => TransportError::Network(other.to_string()),
    }
}

fn participant(user: &User) -> Participant {
    Participant::new(user.id.0 as i64, user.username.as_deref(), &user.first_name)
}

/// Convert a teloxide message into the handler's view of it
pub(crate) fn incoming_message(msg: &Message) -> IncomingMessage {
    let mentions = msg
        .entities()
        .unwrap_or(&[])
        .iter()
        .filter_map(|entity| match &entity.kind {
            MessageEntityKind::TextMention { user } => Some(participant(user)),
            _ => None,
        })
        .collect();

    IncomingMessage {
        chat_id: msg.chat.id.0,
        message_id: msg.id.0,
        sender: msg.from.as_ref().map(participant),
        text: msg.text().map(|t| t.to_string()),
        reply_to: msg
            .reply_to_message()
            .and_then(|reply| reply.from.as_ref())
            .map(participant),
        mentions,
    }
}

/// Convert a reaction update, keeping plain emoji reactions only
pub(crate) fn reaction_event(update: &MessageReactionUpdated) -> ReactionEvent {
    ReactionEvent {
        chat_id: update.chat.id.0,
        message_id: update.message_id.0,
        reactor_id: update.user.as_ref().map(|u| u.id.0 as i64),
        emojis: update
            .new_reaction
            .iter()
            .filter_map(|r| match r {
                ReactionType::Emoji { emoji } => Some(emoji.clone()),
                _ => None,
            })
            .collect(),
    }
}

/// Run the bot until Ctrl-C
pub async fn run_bot(config: Config) -> Result<()> {
    let store = RatingStore::open(&config.data_path)
        .with_context(|| format!("Failed to open rating store at {:?}", config.data_path))?;

    let classifier = ModerationClient::http(
        &config.moderation_url,
        config.moderation_timeout,
        config.moderation_max_retries,
    )
    .context("Failed to build moderation client")?;

    tracing::info!("===========================================");
    tracing::info!("  Social Rating Bot - Starting...");
    tracing::info!("===========================================");
    tracing::info!("Rating file: {:?}", config.data_path);
    tracing::info!(
        "Moderation endpoint: {} (timeout {:?}, {} attempts)",
        config.moderation_url,
        config.moderation_timeout,
        classifier.max_retries()
    );
    tracing::info!("Designated subject: {:?}", config.bot.subject_username);
    tracing::info!("Blocked user: {:?}", config.bot.blocked_username);
    tracing::info!("Reset admin: {:?}", config.bot.reset_admin_username);

    let bot = Bot::new(&config.telegram_token);

    tracing::info!("Verifying bot token...");
    let mut settings = config.bot.clone();
    match bot.get_me().await {
        Ok(me) => {
            tracing::info!(
                "Bot authenticated: @{} (ID: {})",
                me.username.as_deref().unwrap_or("unknown"),
                me.id
            );
            settings.bot_username = me.username.clone();
        }
        Err(e) => {
            tracing::error!("Failed to authenticate bot: {}", e);
            anyhow::bail!("Bot authentication failed: {}", e);
        }
    }

    // Polling is unreliable while a webhook is set
    if let Err(e) = bot.delete_webhook().await {
        tracing::warn!("Failed to delete webhook: {} (continuing anyway)", e);
    }

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let state = RatingBot::new(settings, store, classifier, transport);

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .map(|msg: Message| incoming_message(&msg))
                .inspect_async(|incoming: IncomingMessage, state: Arc<RatingBot>| async move {
                    state.observe(&incoming).await;
                })
                .endpoint(message_handler),
        )
        .branch(Update::filter_message_reaction_updated().endpoint(reaction_handler));

    // Reaction updates are only delivered when requested explicitly
    let listener = Polling::builder(bot.clone())
        .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::MessageReaction])
        .build();

    tracing::info!("Starting dispatcher with long polling...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state.clone()])
        .default_handler(|upd| async move {
            tracing::debug!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("Error in update handler"))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Error from the update listener"),
        )
        .await;

    tracing::warn!("Dispatcher stopped");
    tracing::info!("Author cache: {:?}", state.authors().stats());
    tracing::info!("Username cache: {:?}", state.usernames().stats());
    Ok(())
}

/// Message endpoint
async fn message_handler(incoming: IncomingMessage, state: Arc<RatingBot>) -> Result<(), HandlerError> {
    tracing::debug!(
        "Message: user={:?}, chat={}, id={}",
        incoming.sender_id(),
        incoming.chat_id,
        incoming.message_id
    );

    let outcome = state.handle_message(&incoming).await?;
    tracing::debug!("Message {} -> {:?}", incoming.message_id, outcome);
    Ok(())
}

/// Reaction endpoint
async fn reaction_handler(
    update: MessageReactionUpdated,
    state: Arc<RatingBot>,
) -> Result<(), HandlerError> {
    let event = reaction_event(&update);
    let outcome = state.handle_reaction(&event).await?;
    tracing::debug!("Reaction on {} -> {:?}", event.message_id, outcome);
    Ok(())
}
