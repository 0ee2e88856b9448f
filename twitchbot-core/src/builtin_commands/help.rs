use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::Handler;
use crate::template::esc;
use crate::utils::close_matches::get_close_matches;
use crate::Error;

const SUGGESTIONS: usize = 3;
const SIMILARITY_CUTOFF: f64 = 0.7;

/// `!help` listing, and the reply to any `!word` nothing else claimed.
/// Must be the last pattern registered.
pub struct Help;

#[async_trait]
impl Handler for Help {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        let commands = ctx.registry.visible_commands();
        let listing = commands.join(", ");
        let cmd = msg.text.split_whitespace().next().unwrap_or_default();

        if cmd.starts_with("!help") || cmd.starts_with("!halp") {
            return Ok(Some(format!(" possible commands: {}", listing)));
        }

        let mut reply = format!("unknown command ({}).", esc(cmd));
        let suggestions = get_close_matches(cmd, &commands, SUGGESTIONS, SIMILARITY_CUTOFF);
        if suggestions.is_empty() {
            reply.push_str(&format!(" possible commands: {}", listing));
        } else {
            reply.push_str(&format!(" did you mean: {}?", suggestions.join(", ")));
        }
        Ok(Some(reply))
    }
}
