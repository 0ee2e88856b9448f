//! Viewers can force the streamer to use vim by cheering an amount ending
//! in 51. A timer watches the clock and announces when the time is up.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::permissions::{is_privileged, optional_user_arg};
use crate::registry::Handler;
use crate::repositories::{VimBits, VimRepository};
use crate::template::esc;
use crate::utils::ranking::tied_rank;
use crate::utils::time::seconds_to_readable;
use crate::Error;

use super::REFUSAL;

/// Bits amounts ending in this suffix buy vim time.
pub const VIM_BITS_SUFFIX: u64 = 51;

/// Users listed by the leaderboard command.
const TOP_USERS: usize = 5;

pub struct VimBitsHandler {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for VimBitsHandler {
    async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        let bits = msg
            .bits()
            .ok_or_else(|| Error::Parse("vim bits handler ran without a bits tag".into()))?;

        let reply = match self.repo.add_bits(&msg.name_key(), bits).await? {
            VimBits::Added(time_left) => {
                info!("{} bought vim time with {} bits", msg.display_name(), bits);
                format!("MOAR VIM: {} remaining", seconds_to_readable(time_left))
            }
            VimBits::Banked(banked) => format!(
                "vim is currently disabled {} banked",
                seconds_to_readable(banked)
            ),
        };
        Ok(Some(reply))
    }
}

pub struct VimTimeLeft {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for VimTimeLeft {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !self.repo.is_enabled().await? {
            return Ok(Some("vim is currently disabled".to_string()));
        }
        let reply = match self.repo.time_left().await? {
            0 => "not currently using vim".to_string(),
            secs => format!("vim time remaining: {}", seconds_to_readable(secs)),
        };
        Ok(Some(reply))
    }
}

pub struct DisableVim {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for DisableVim {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !is_privileged(&ctx.config, msg) {
            return Ok(Some(REFUSAL.to_string()));
        }
        self.repo.disable().await?;
        Ok(Some("vim has been disabled".to_string()))
    }
}

pub struct EnableVim {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for EnableVim {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !is_privileged(&ctx.config, msg) {
            return Ok(Some(REFUSAL.to_string()));
        }
        let reply = match self.repo.enable().await? {
            0 => "vim has been enabled".to_string(),
            secs => format!(
                "vim has been enabled: time remaining {}",
                seconds_to_readable(secs)
            ),
        };
        Ok(Some(reply))
    }
}

pub struct Editor {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for Editor {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        let reply = if self.repo.time_left().await? > 0 {
            "I am currently being forced to use vim by viewers. \
             I normally use babi, a text editor I made! https://github.com/asottile/babi"
        } else {
            "this is babi, a text editor I made! https://github.com/asottile/babi"
        };
        Ok(Some(reply.to_string()))
    }
}

/// `1. name (bits), 2. a, b (bits), ...` for the biggest donors.
pub struct TopVimBits {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for TopVimBits {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        let mut totals = self.repo.user_totals().await?;
        if totals.is_empty() {
            return Ok(Some("nobody has bought any vim yet".to_string()));
        }
        totals.truncate(TOP_USERS);

        let board: Vec<String> = tied_rank(&totals)
            .into_iter()
            .map(|tier| format!("{}. {} ({})", tier.rank, esc(&tier.names.join(", ")), tier.count))
            .collect();
        Ok(Some(board.join(", ")))
    }
}

pub struct VimBitsRank {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for VimBitsRank {
    async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        let user = optional_user_arg(msg).to_lowercase();
        let totals = self.repo.user_totals().await?;

        let found = tied_rank(&totals)
            .into_iter()
            .find(|tier| tier.names.iter().any(|name| name.to_lowercase() == user))
            .map(|tier| (tier.rank, tier.count));

        let reply = match found {
            Some((rank, count)) => {
                format!("{} is ranked #{} with {} vim bits", esc(&user), rank, count)
            }
            None => format!("user not found {}", esc(&user)),
        };
        Ok(Some(reply))
    }
}

/// Runs on a timer; speaks up once when bought vim time has run out.
pub struct VimExpiry {
    pub repo: Arc<dyn VimRepository>,
}

#[async_trait]
impl Handler for VimExpiry {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        if self.repo.sync_active().await? {
            info!("vim time ran out");
            Ok(Some("vim no more! you are free!".to_string()))
        } else {
            Ok(None)
        }
    }
}
