//! Command and event handlers
//!
//! `RatingBot` owns the store, caches and classifier, and talks to chat
//! through a `ChatTransport`. The Telegram adapter converts updates into
//! `IncomingMessage` / `ReactionEvent`, runs `observe` as a pre-processing
//! stage, then hands the event to `handle_message` or `handle_reaction`.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{MessageAuthorCache, UsernameCache};
use crate::classifier::{ModerationClient, Verdict};
use crate::commands::{Command, ParsedCommand, HELP_TEXT};
use crate::config::BotSettings;
use crate::store::{RatingStore, StoreError, Subject};
use crate::target::{resolve_target, TargetOutcome};
use crate::tiers::resolve_tier;
use crate::transport::{
    ChatTransport, IncomingMessage, Participant, ReactionEvent, SentMessage, TransportError,
};
use crate::RATING_STEP;

const SELF_TARGET_TEXT: &str = "Себе рейтинг менять нельзя";
const RESET_TEXT: &str = "✅ Рейтинг сброшен на 0";
const ROAST_TEXT: &str = "Ты еблан, самолайк — это как самоотсос, че ты делаешь?";

const CLOWN: &str = "🤡";
const FIRE: &str = "🔥";

/// Handler errors that reach the dispatcher
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// What a handler did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Score changed
    Adjusted { subject: Subject, score: i64 },
    /// Score and tier shown
    Reported { subject: Subject, score: i64, tier: &'static str },
    /// Self-targeting refused
    SelfRejected,
    /// No target, or malformed command; usage hint sent
    Usage,
    /// Global rating zeroed
    Reset,
    /// Unauthorized reset, no reply
    Denied,
    Help,
    /// Sender is blocked
    Dropped,
    /// Plain text, after the predicate-gated handlers
    Passed { moderating: bool, roasted: bool },
    /// Nothing to do
    Ignored,
}

/// Bot state shared by all handlers
pub struct RatingBot {
    settings: BotSettings,
    store: RatingStore,
    authors: MessageAuthorCache,
    usernames: UsernameCache,
    classifier: ModerationClient,
    transport: Arc<dyn ChatTransport>,
}

impl RatingBot {
    pub fn new(
        settings: BotSettings,
        store: RatingStore,
        classifier: ModerationClient,
        transport: Arc<dyn ChatTransport>,
    ) -> Arc<Self> {
        let authors = MessageAuthorCache::new(settings.author_cache_capacity);
        Arc::new(Self {
            settings,
            store,
            authors,
            usernames: UsernameCache::default(),
            classifier,
            transport,
        })
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn authors(&self) -> &MessageAuthorCache {
        &self.authors
    }

    pub fn usernames(&self) -> &UsernameCache {
        &self.usernames
    }

    /// Pre-processing stage: remember the message author and username.
    /// Runs for every message, blocked senders included.
    pub async fn observe(&self, msg: &IncomingMessage) {
        let Some(sender) = msg.sender.as_ref() else {
            return;
        };
        self.authors.record(msg.chat_id, msg.message_id, sender.id);
        if let Some(username) = sender.username.as_deref() {
            self.usernames.record(username, sender.id).await;
        }
        if let Some(author) = msg.reply_to.as_ref() {
            if let Some(username) = author.username.as_deref() {
                self.usernames.record(username, author.id).await;
            }
        }
    }

    /// Route an inbound message
    pub async fn handle_message(self: &Arc<Self>, msg: &IncomingMessage) -> Result<Outcome, HandlerError> {
        let Some(sender) = msg.sender.as_ref() else {
            return Ok(Outcome::Ignored);
        };

        if let Some(blocked) = self.settings.blocked_username.as_deref() {
            if sender.has_username(blocked) {
                debug!("Dropping message from blocked user {}", sender.id);
                return Ok(Outcome::Dropped);
            }
        }

        let Some(text) = msg.text.as_deref() else {
            return Ok(Outcome::Ignored);
        };

        if let Some(parsed) = Command::parse(text, self.settings.bot_username.as_deref()) {
            return self.handle_command(msg, sender, parsed).await;
        }

        let moderating = match self.settings.subject_username.as_deref() {
            Some(subject) if sender.has_username(subject) => {
                self.spawn_moderation(msg.chat_id, text.to_string());
                true
            }
            _ => false,
        };

        let roasted = self.settings.roast_user_id == Some(sender.id);
        if roasted {
            self.reply_and_cleanup(msg.chat_id, msg.message_id, ROAST_TEXT).await?;
        }

        Ok(Outcome::Passed { moderating, roasted })
    }

    /// Execute a parsed command
    pub async fn handle_command(
        &self,
        msg: &IncomingMessage,
        sender: &Participant,
        parsed: ParsedCommand,
    ) -> Result<Outcome, HandlerError> {
        info!(
            "Command {:?} from user={} chat={}",
            parsed.command, sender.id, msg.chat_id
        );

        match parsed.command {
            Command::Lower | Command::Raise => {
                let delta = parsed.command.delta().unwrap_or(0);
                let target = resolve_target(sender.id, msg, &parsed.args, &self.usernames).await;
                match target {
                    TargetOutcome::Unresolved => {
                        self.reply_and_cleanup(msg.chat_id, msg.message_id, parsed.command.usage_hint())
                            .await?;
                        Ok(Outcome::Usage)
                    }
                    TargetOutcome::SelfTarget => {
                        self.reply_and_cleanup(msg.chat_id, msg.message_id, SELF_TARGET_TEXT)
                            .await?;
                        Ok(Outcome::SelfRejected)
                    }
                    TargetOutcome::Resolved(target) => {
                        let subject = Subject::User(target.id);
                        let score = self.store.adjust(subject, delta)?;
                        let text = format!(
                            "{} {:+}. Рейтинг {}: {}",
                            trend_emoji(delta),
                            delta,
                            target.display_name(),
                            score
                        );
                        self.reply_and_cleanup(msg.chat_id, msg.message_id, &text).await?;
                        Ok(Outcome::Adjusted { subject, score })
                    }
                }
            }

            Command::GlobalLower | Command::GlobalRaise => {
                let delta = parsed.command.delta().unwrap_or(0);
                let score = self.store.adjust(Subject::Global, delta)?;
                let text = format!(
                    "{} {:+}. Рейтинг {}: {}",
                    trend_emoji(delta),
                    delta,
                    self.settings.subject_display_name,
                    score
                );
                self.reply_and_cleanup(msg.chat_id, msg.message_id, &text).await?;
                Ok(Outcome::Adjusted { subject: Subject::Global, score })
            }

            Command::GlobalUsage => {
                self.reply_and_cleanup(msg.chat_id, msg.message_id, parsed.command.usage_hint())
                    .await?;
                Ok(Outcome::Usage)
            }

            Command::Status => {
                let score = self.store.score(Subject::Global)?;
                let tier = resolve_tier(score);
                let text = format!(
                    "📊 Социальный рейтинг {}: {}\n📍 Положение: {}",
                    self.settings.subject_display_name, score, tier
                );
                self.report(msg, &text).await?;
                Ok(Outcome::Reported { subject: Subject::Global, score, tier })
            }

            Command::MyStatus => {
                let subject = Subject::User(sender.id);
                let score = self.store.score(subject)?;
                let tier = resolve_tier(score);
                let text = format!("📊 Мой рейтинг: {}\n📍 Положение: {}", score, tier);
                self.report(msg, &text).await?;
                Ok(Outcome::Reported { subject, score, tier })
            }

            Command::Reset => {
                let authorized = self
                    .settings
                    .reset_admin_username
                    .as_deref()
                    .is_some_and(|admin| sender.has_username(admin));
                if !authorized {
                    debug!("Ignoring reset from user {}", sender.id);
                    return Ok(Outcome::Denied);
                }
                self.store.reset_global()?;
                self.reply_and_cleanup(msg.chat_id, msg.message_id, RESET_TEXT).await?;
                Ok(Outcome::Reset)
            }

            Command::Help => {
                self.reply_and_cleanup(msg.chat_id, msg.message_id, HELP_TEXT).await?;
                Ok(Outcome::Help)
            }
        }
    }

    /// 🤡 = -10, 🔥 = +10 to the author of the reacted message.
    /// Only the first recognized emoji counts.
    pub async fn handle_reaction(&self, event: &ReactionEvent) -> Result<Outcome, HandlerError> {
        let Some(author_id) = self.authors.author_of(event.chat_id, event.message_id) else {
            debug!("Reaction on uncached message {}/{}", event.chat_id, event.message_id);
            return Ok(Outcome::Ignored);
        };

        if event.reactor_id == Some(author_id) {
            return Ok(Outcome::Ignored);
        }

        let Some((emoji, delta)) = event.emojis.iter().find_map(|e| reaction_delta(e)) else {
            return Ok(Outcome::Ignored);
        };

        let subject = Subject::User(author_id);
        let score = self.store.adjust(subject, delta)?;
        info!(
            "Reaction {} by {:?}: user {} -> {}",
            emoji, event.reactor_id, author_id, score
        );
        self.send(event.chat_id, &format!("{} {:+}. Рейтинг: {}", emoji, delta, score))
            .await?;
        Ok(Outcome::Adjusted { subject, score })
    }

    /// Classify a designated-subject message and penalize on `Bad`
    pub async fn moderate(&self, chat_id: i64, text: &str) -> Result<Verdict, HandlerError> {
        let verdict = self.classifier.classify(text).await;
        if verdict == Verdict::Bad {
            let score = self.store.adjust(Subject::Global, -RATING_STEP)?;
            info!("Moderation penalty applied, global rating {}", score);
            let text = format!(
                "🤖 НейроРодион: -{}. Рейтинг {}: {}",
                RATING_STEP, self.settings.subject_display_name, score
            );
            self.send(chat_id, &text).await?;
        }
        Ok(verdict)
    }

    /// Run `moderate` off the event path
    pub fn spawn_moderation(self: &Arc<Self>, chat_id: i64, text: String) -> JoinHandle<Option<Verdict>> {
        let bot = Arc::clone(self);
        tokio::spawn(async move {
            match bot.moderate(chat_id, &text).await {
                Ok(verdict) => Some(verdict),
                Err(e) => {
                    error!("Moderation failed: {}", e);
                    None
                }
            }
        })
    }

    /// Send text; benign transport errors are swallowed
    async fn send(&self, chat_id: i64, text: &str) -> Result<Option<SentMessage>, HandlerError> {
        match self.transport.send_text(chat_id, text).await {
            Ok(sent) => Ok(Some(sent)),
            Err(e) if e.is_benign() => {
                debug!("Ignoring send error in chat {}: {}", chat_id, e);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Reply, then delete the trigger and, after the cleanup delay, the reply
    async fn reply_and_cleanup(
        &self,
        chat_id: i64,
        trigger_id: i32,
        text: &str,
    ) -> Result<(), HandlerError> {
        if let Some(sent) = self.send(chat_id, text).await? {
            spawn_cleanup(
                Arc::clone(&self.transport),
                chat_id,
                trigger_id,
                sent,
                self.settings.cleanup_delay,
            );
        }
        Ok(())
    }

    /// Delete the trigger right away, keep the reply
    async fn report(&self, msg: &IncomingMessage, text: &str) -> Result<(), HandlerError> {
        if let Err(e) = self.transport.delete_message(msg.chat_id, msg.message_id).await {
            debug!("Could not delete command message: {}", e);
        }
        self.send(msg.chat_id, text).await?;
        Ok(())
    }
}

/// Best-effort cleanup: delete the trigger, wait, delete the reply.
/// Every failure is logged at debug and dropped; nothing is retried.
pub fn spawn_cleanup(
    transport: Arc<dyn ChatTransport>,
    chat_id: i64,
    trigger_id: i32,
    reply: SentMessage,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = transport.delete_message(chat_id, trigger_id).await {
            debug!("Cleanup: trigger {}/{} not deleted: {}", chat_id, trigger_id, e);
        }
        tokio::time::sleep(delay).await;
        if let Err(e) = transport.delete_message(reply.chat_id, reply.message_id).await {
            debug!("Cleanup: reply {} not deleted: {}", reply, e);
        }
    })
}

fn trend_emoji(delta: i64) -> &'static str {
    if delta < 0 {
        "📉"
    } else {
        "📈"
    }
}

/// Rating change for a reaction emoji
fn reaction_delta(emoji: &str) -> Option<(&'static str, i64)> {
    match emoji {
        CLOWN => Some((CLOWN, -RATING_STEP)),
        FIRE => Some((FIRE, RATING_STEP)),
        _ => None,
    }
}
