use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::Handler;
use crate::utils::time::seconds_to_readable;
use crate::Error;

/// How long this bot process has been up.
pub struct BotUptime;

#[async_trait]
impl Handler for BotUptime {
    async fn invoke(&self, ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        let elapsed = ctx.started_at.elapsed().as_secs();
        let readable = match seconds_to_readable(elapsed) {
            s if s.is_empty() => "0 seconds".to_string(),
            s => s,
        };
        Ok(Some(format!("bot has been running for: {}", readable)))
    }
}
