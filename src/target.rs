//! Target resolution for per-user commands
//!
//! Order: replied-to author, then the first `@username` argument known to the
//! username cache, then the first structured mention on the message.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::cache::UsernameCache;
use crate::transport::{IncomingMessage, Participant};

static USERNAME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@([A-Za-z0-9_]{1,32})$").unwrap()
});

/// Who a command is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Resolved to the invoker; always rejected
    SelfTarget,
    Resolved(Participant),
    Unresolved,
}

/// Resolve the target of a per-user command sent by `invoker_id`
pub async fn resolve_target(
    invoker_id: i64,
    message: &IncomingMessage,
    args: &[String],
    usernames: &UsernameCache,
) -> TargetOutcome {
    let target = match message.reply_to.clone() {
        Some(author) => Some(author),
        None => match from_username_args(args, usernames).await {
            Some(p) => Some(p),
            None => message.mentions.first().cloned(),
        },
    };

    match target {
        Some(p) if p.id == invoker_id => TargetOutcome::SelfTarget,
        Some(p) => TargetOutcome::Resolved(p),
        None => TargetOutcome::Unresolved,
    }
}

async fn from_username_args(args: &[String], usernames: &UsernameCache) -> Option<Participant> {
    for arg in args {
        let Some(caps) = USERNAME_TOKEN.captures(arg) else {
            continue;
        };
        let username = &caps[1];
        if let Some(id) = usernames.lookup(username).await {
            return Some(Participant::new(id, Some(username), ""));
        }
    }
    None
}
