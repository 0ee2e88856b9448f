//! `!today`: what is being worked on, settable by moderators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::permissions::{command_rest, is_privileged};
use crate::registry::Handler;
use crate::repositories::TodayRepository;
use crate::template::esc;
use crate::Error;

use super::REFUSAL;

pub struct Today {
    pub repo: Arc<dyn TodayRepository>,
}

#[async_trait]
impl Handler for Today {
    async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
        let reply = match self.repo.get_today().await? {
            Some(topic) => esc(&topic),
            None => "not working on anything?".to_string(),
        };
        Ok(Some(reply))
    }
}

pub struct SetToday {
    pub repo: Arc<dyn TodayRepository>,
}

#[async_trait]
impl Handler for SetToday {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
        if !is_privileged(&ctx.config, msg) {
            return Ok(Some(REFUSAL.to_string()));
        }
        self.repo.set_today(command_rest(msg)).await?;
        Ok(Some("updated!".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::repositories::sqlite::SqliteTodayRepository;
    use crate::test_utils::helpers::{test_context, test_database, FakeMsg};

    #[tokio::test]
    async fn set_and_show() -> Result<(), Error> {
        let db = test_database().await?;
        let repo: Arc<dyn TodayRepository> = Arc::new(SqliteTodayRepository::new(db.pool().clone()));
        let ctx = test_context(Registry::new());
        let today = Today { repo: repo.clone() };
        let set_today = SetToday { repo };

        let msg = FakeMsg::new(&ctx.config, "!today").parsed();
        assert_eq!(today.invoke(&ctx, &msg).await?.as_deref(), Some("not working on anything?"));

        let msg = FakeMsg::new(&ctx.config, "!settoday building a {thing}").moderator().parsed();
        assert_eq!(set_today.invoke(&ctx, &msg).await?.as_deref(), Some("updated!"));

        let msg = FakeMsg::new(&ctx.config, "!today").parsed();
        assert_eq!(today.invoke(&ctx, &msg).await?.as_deref(), Some("building a {{thing}}"));
        Ok(())
    }

    #[tokio::test]
    async fn viewers_cannot_set() -> Result<(), Error> {
        let db = test_database().await?;
        let repo: Arc<dyn TodayRepository> = Arc::new(SqliteTodayRepository::new(db.pool().clone()));
        let ctx = test_context(Registry::new());
        let set_today = SetToday { repo: repo.clone() };

        let msg = FakeMsg::new(&ctx.config, "!settoday nope").parsed();
        assert_eq!(set_today.invoke(&ctx, &msg).await?.as_deref(), Some(REFUSAL));
        assert_eq!(repo.get_today().await?, None);

        let msg = FakeMsg::new(&ctx.config, "!settoday streaming").user("TestChannel").parsed();
        assert_eq!(set_today.invoke(&ctx, &msg).await?.as_deref(), Some("updated!"));
        Ok(())
    }
}
