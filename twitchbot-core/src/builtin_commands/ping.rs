use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::Handler;
use crate::template::esc;
use crate::Error;

/// Answers a chat `PING <x>` with `PONG <x>`.
pub struct ChatPing;

#[async_trait]
impl Handler for ChatPing {
    async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        let rest = msg.text.split_once(' ').map_or("", |(_, rest)| rest);
        Ok(Some(format!("PONG {}", esc(rest))))
    }
}
