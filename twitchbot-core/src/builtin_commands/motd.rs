//! Message of the day, bought with channel points.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::Handler;
use crate::repositories::MotdRepository;
use crate::template::esc;
use crate::Error;

/// Channel-points reward that sets the motd.
pub const MOTD_REWARD_ID: &str = "a2fa47a2-851e-40db-b909-df001801cade";

pub struct Motd {
    pub repo: Arc<dyn MotdRepository>,
}

#[async_trait]
impl Handler for Motd {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        let reply = match self.repo.get_motd().await? {
            Some(motd) => esc(&motd),
            None => "nothing???".to_string(),
        };
        Ok(Some(reply))
    }
}

pub struct SetMotd {
    pub repo: Arc<dyn MotdRepository>,
}

#[async_trait]
impl Handler for SetMotd {
    async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        let count = self.repo.set_motd(&msg.sender, &msg.text).await?;
        let mut reply = "motd updated!  thanks for spending points!".to_string();
        if msg.text == "!motd" {
            reply.push_str(&format!("  it has been set to !motd {} times!", count));
        }
        Ok(Some(reply))
    }
}
