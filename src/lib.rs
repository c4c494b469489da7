//! Social Rating Bot
//!
//! Telegram bot that keeps a "social rating" for chat members.
//!
//! # Features
//!
//! - **Per-user rating**: `/plus` and `/minus` on a reply, `@username` or mention
//! - **Global rating**: one designated subject, with rank tiers
//! - **Reactions**: 🔥 = +10, 🤡 = -10 to the message author
//! - **Moderation**: a local LLM endpoint reviews the designated subject's messages
//! - **Cleanup**: command and reply are deleted shortly after the reply
//!
//! # Architecture
//!
//! ```text
//! Telegram ──► teloxide Dispatcher ──► observe (caches) ──► RatingBot
//!                                                           │
//!                                                           ├── Commands + Target resolution
//!                                                           ├── RatingStore (JSON file)
//!                                                           ├── Tiers
//!                                                           ├── MessageAuthorCache / UsernameCache
//!                                                           └── ModerationClient (chat completions)
//! ```

pub mod cache;
pub mod classifier;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod store;
pub mod target;
pub mod telegram;
pub mod tiers;
pub mod transport;


/// Size of every rating change
pub const RATING_STEP: i64 = 10;

pub use cache::{MessageAuthorCache, UsernameCache};
pub use classifier::{CompletionBackend, ModerationClient, Verdict};
pub use commands::{Command, ParsedCommand};
pub use config::{BotSettings, Config};
pub use handlers::{HandlerError, Outcome, RatingBot};
pub use store::{RatingStore, StoreError, Subject};
pub use target::{resolve_target, TargetOutcome};
pub use tiers::resolve_tier;
pub use transport::{ChatTransport, IncomingMessage, Participant, ReactionEvent, SentMessage, TransportError};
