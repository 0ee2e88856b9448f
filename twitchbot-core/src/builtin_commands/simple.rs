//! Commands that always answer with the same text.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::{Handler, Registry};
use crate::Error;

/// Listed in `!help`. Replies may use `{user}` and `{channel}`.
pub const TEXT_COMMANDS: &[(&str, &str)] = &[
    ("!bot", "I wrote the bot! it is a small async chat bot written in rust"),
    ("!discord", "We do have Dicsord, you are welcome to join: https://discord.gg/xDKGPaW"),
    ("!donate", "donations are appreciated but not necessary -- thanks for watching!"),
    ("!github", "the stream's code lives on github, look for the link below the stream"),
    ("!job", "lmao. streamer? youtuber? ceo?"),
    ("!lurk", "thanks for lurking, {user}!"),
    ("!ohai", "ohai, {user}!"),
    ("!schedule", "streams happen most weekday evenings -- check !discord for updates"),
    ("!twitter", "no twitter, come hang out in !discord instead"),
    ("!youtube", "past streams end up on youtube, links below the stream"),
];

/// Registered but left out of `!help`.
pub const SECRET_COMMANDS: &[(&str, &str)] = &[
    ("!homeland", "WE WILL PROTECT OUR HOMELAND!"),
    ("!letsgo", "CAN WE GET A LETS GO"),
    ("!question", "\"udp your questions, don't tcp your questions\""),
    ("!water", "DRINK WATER"),
];

/// Canonical command -> extra names.
pub const ALIASES: &[(&str, &[&str])] = &[
    ("!discord", &["!dicsord"]),
    ("!job", &["!jorb"]),
    ("!question", &["!ask", "!questions", "!tcp", "!udp"]),
    ("!youtube", &["!yt"]),
];

pub struct TextReply(pub &'static str);

#[async_trait]
impl Handler for TextReply {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        Ok(Some(self.0.to_string()))
    }
}

pub fn register(registry: &mut Registry) -> Result<(), Error> {
    for &(cmd, text) in TEXT_COMMANDS {
        registry.command(&[cmd], false, Arc::new(TextReply(text)))?;
    }
    for &(cmd, text) in SECRET_COMMANDS {
        registry.command(&[cmd], true, Arc::new(TextReply(text)))?;
    }
    for (canonical, aliases) in ALIASES {
        registry.alias(canonical, aliases)?;
    }
    Ok(())
}
