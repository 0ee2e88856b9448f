//! src/permissions.rs
//!
//! Pure checks over a parsed message. Missing or malformed tags read as
//! "no" (or "the sender") rather than failing.

use twitchbot_common::models::Config;

use crate::message::ChatMessage;

pub fn is_moderator(msg: &ChatMessage) -> bool {
    msg.badges().iter().any(|b| b.starts_with("moderator/"))
}

pub fn is_subscriber(msg: &ChatMessage) -> bool {
    msg.badges()
        .iter()
        .any(|b| b.starts_with("founder/") || b.starts_with("subscriber/"))
}

/// True when the sender owns the channel the bot is configured for.
pub fn is_broadcaster(config: &Config, msg: &ChatMessage) -> bool {
    msg.name_key() == config.channel.to_lowercase()
}

/// Moderators and the broadcaster may run the state-changing commands.
pub fn is_privileged(config: &Config, msg: &ChatMessage) -> bool {
    is_moderator(msg) || is_broadcaster(config, msg)
}

/// First token after the command, without a leading `@`; the sender's own
/// display name when there is none.
pub fn optional_user_arg(msg: &ChatMessage) -> String {
    msg.text
        .split_whitespace()
        .nth(1)
        .map(|arg| arg.trim_start_matches('@'))
        .filter(|arg| !arg.is_empty())
        .unwrap_or_else(|| msg.display_name())
        .to_string()
}

/// Everything after the command token, trimmed.
pub fn command_rest(msg: &ChatMessage) -> &str {
    msg.text
        .trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}
