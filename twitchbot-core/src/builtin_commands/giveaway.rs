//! Giveaways: moderators open and close, viewers enter.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::info;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::permissions::is_privileged;
use crate::registry::Handler;
use crate::repositories::{GiveawayOutcome, GiveawayRepository};
use crate::template::esc;
use crate::Error;

const NOT_ACTIVE: &str = "no current giveaway active!";

/// Silently ignored for anyone but moderators and the broadcaster.
pub struct StartGiveaway {
    pub repo: Arc<dyn GiveawayRepository>,
}

#[async_trait]
impl Handler for StartGiveaway {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !is_privileged(&ctx.config, msg) {
            return Ok(None);
        }
        self.repo.start().await?;
        info!("giveaway started by {}", msg.display_name());
        Ok(Some("giveaway started!  use !giveaway to enter".to_string()))
    }
}

pub struct EnterGiveaway {
    pub repo: Arc<dyn GiveawayRepository>,
}

#[async_trait]
impl Handler for EnterGiveaway {
    async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !self.repo.enter(msg.display_name()).await? {
            return Ok(Some(NOT_ACTIVE.to_string()));
        }
        Ok(Some(format!("{} has been entered!", esc(msg.display_name()))))
    }
}

/// Silently ignored for anyone but moderators and the broadcaster.
pub struct EndGiveaway {
    pub repo: Arc<dyn GiveawayRepository>,
}

#[async_trait]
impl Handler for EndGiveaway {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !is_privileged(&ctx.config, msg) {
            return Ok(None);
        }
        let reply = match self.repo.end().await? {
            GiveawayOutcome::NotActive => NOT_ACTIVE.to_string(),
            GiveawayOutcome::NoEntrants => "no users entered giveaway!".to_string(),
            GiveawayOutcome::Entrants(users) => {
                let winner = &users[rand::rng().random_range(0..users.len())];
                info!("giveaway winner {} out of {} entrants", winner, users.len());
                format!("!giveaway winner is {}", esc(winner))
            }
        };
        Ok(Some(reply))
    }
}
