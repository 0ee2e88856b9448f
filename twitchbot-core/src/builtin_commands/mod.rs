//! Handlers the bot ships with, and the one place they get registered.

use std::sync::Arc;

use crate::db::Database;
use crate::registry::Registry;
use crate::repositories::sqlite::{
    SqliteGiveawayRepository, SqliteMotdRepository, SqliteTodayRepository, SqliteVimRepository,
};
use crate::repositories::{GiveawayRepository, MotdRepository, TodayRepository, VimRepository};
use crate::tasks::periodic::seconds;
use crate::Error;

pub mod giveaway;
pub mod help;
pub mod motd;
pub mod ping;
pub mod simple;
pub mod today;
pub mod uptime;
pub mod vim_timer;

/// Reply to viewers trying a moderator-only command.
pub const REFUSAL: &str = "https://youtu.be/RfiQYRn7fBg";

/// Populates `registry` with every built-in handler. Order matters for
/// patterns: the help catch-all goes last.
pub fn register_all(registry: &mut Registry, db: &Database) -> Result<(), Error> {
    let pool = db.pool().clone();

    registry.on_message("PING", Arc::new(ping::ChatPing))?;

    simple::register(registry)?;

    let today_repo: Arc<dyn TodayRepository> = Arc::new(SqliteTodayRepository::new(pool.clone()));
    registry.command(
        &["!today", "!project"],
        false,
        Arc::new(today::Today { repo: today_repo.clone() }),
    )?;
    registry.command(&["!settoday"], true, Arc::new(today::SetToday { repo: today_repo }))?;

    let motd_repo: Arc<dyn MotdRepository> = Arc::new(SqliteMotdRepository::new(pool.clone()));
    registry.command(&["!motd"], false, Arc::new(motd::Motd { repo: motd_repo.clone() }))?;
    registry.channel_points(motd::MOTD_REWARD_ID, Arc::new(motd::SetMotd { repo: motd_repo }))?;

    let giveaway_repo: Arc<dyn GiveawayRepository> =
        Arc::new(SqliteGiveawayRepository::new(pool.clone()));
    registry.command(
        &["!giveawaystart"],
        true,
        Arc::new(giveaway::StartGiveaway { repo: giveaway_repo.clone() }),
    )?;
    registry.command(
        &["!giveaway"],
        true,
        Arc::new(giveaway::EnterGiveaway { repo: giveaway_repo.clone() }),
    )?;
    registry.command(
        &["!giveawayend"],
        true,
        Arc::new(giveaway::EndGiveaway { repo: giveaway_repo }),
    )?;

    let vim_repo: Arc<dyn VimRepository> = Arc::new(SqliteVimRepository::new(pool));
    registry.bits(
        vim_timer::VIM_BITS_SUFFIX,
        Arc::new(vim_timer::VimBitsHandler { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &["!top5vimbits", "!topvimbits"],
        true,
        Arc::new(vim_timer::TopVimBits { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &["!vimbitsrank"],
        true,
        Arc::new(vim_timer::VimBitsRank { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &["!vimtimeleft"],
        true,
        Arc::new(vim_timer::VimTimeLeft { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &["!disablevim"],
        true,
        Arc::new(vim_timer::DisableVim { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &["!enablevim"],
        true,
        Arc::new(vim_timer::EnableVim { repo: vim_repo.clone() }),
    )?;
    registry.command(
        &[
            "!editor",
            "!babi",
            "!nano",
            "!vim",
            "!emacs",
            "!vscode",
            "!wheredobabiscomefrom",
        ],
        false,
        Arc::new(vim_timer::Editor { repo: vim_repo.clone() }),
    )?;
    registry.periodic(seconds(5), Arc::new(vim_timer::VimExpiry { repo: vim_repo }))?;

    registry.command(&["!botuptime"], true, Arc::new(uptime::BotUptime))?;

    registry.on_message(r"!+\w", Arc::new(help::Help))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::helpers::{test_database, test_dispatcher, FakeMsg, TestDispatcher};

    async fn bot() -> TestDispatcher {
        let db = test_database().await.unwrap();
        let mut registry = Registry::new();
        register_all(&mut registry, &db).unwrap();
        test_dispatcher(registry)
    }

    async fn say(t: &mut TestDispatcher, msg: FakeMsg) -> Vec<String> {
        if let Some(task) = t.dispatcher.handle(&msg.build()) {
            task.await.unwrap();
        }
        t.sent()
    }

    fn reply(text: &str) -> Vec<String> {
        vec![format!("PRIVMSG #testchannel :{}\r\n", text)]
    }

    #[tokio::test]
    async fn help_lists_only_public_commands() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!help");
        assert_eq!(
            say(&mut t, msg).await,
            reply(
                " possible commands: !help, !bot, !discord, !donate, !editor, !github, !job, \
                 !lurk, !motd, !ohai, !schedule, !today, !twitter, !youtube"
            )
        );
    }

    #[tokio::test]
    async fn unknown_commands_get_suggestions() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!discrod please");
        assert_eq!(
            say(&mut t, msg).await,
            reply("unknown command (!discrod). did you mean: !discord?")
        );

        let msg = FakeMsg::new(&t.config, "!zzzzzzzz");
        let sent = say(&mut t, msg).await;
        assert!(sent[0].contains("unknown command (!zzzzzzzz). possible commands: !help, "));
    }

    #[tokio::test]
    async fn text_commands_and_aliases() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!lurk").user("Viewer");
        assert_eq!(say(&mut t, msg).await, reply("thanks for lurking, Viewer!"));

        let msg = FakeMsg::new(&t.config, "!discord");
        let direct = say(&mut t, msg).await;
        let msg = FakeMsg::new(&t.config, "!!DICSORD");
        assert_eq!(say(&mut t, msg).await, direct);
    }

    #[tokio::test]
    async fn chat_ping() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "PING {hello}");
        assert_eq!(say(&mut t, msg).await, reply("PONG {hello}"));
    }

    #[tokio::test]
    async fn motd_reward_and_unknown_reward() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!help").reward(motd::MOTD_REWARD_ID);
        assert_eq!(
            say(&mut t, msg).await,
            reply("motd updated!  thanks for spending points!")
        );
        let msg = FakeMsg::new(&t.config, "!motd");
        assert_eq!(say(&mut t, msg).await, reply("!help"));

        let msg = FakeMsg::new(&t.config, "!motd").reward("some-other-reward");
        assert!(say(&mut t, msg).await.is_empty());
    }

    #[tokio::test]
    async fn vim_bits_beat_commands() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!lurk cheer51").bits(51);
        let sent = say(&mut t, msg).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].starts_with("PRIVMSG #testchannel :MOAR VIM: "), "{}", sent[0]);
    }

    #[tokio::test]
    async fn silent_giveaway_commands_for_viewers() {
        let mut t = bot().await;
        let msg = FakeMsg::new(&t.config, "!giveawaystart");
        assert!(say(&mut t, msg).await.is_empty());
    }

    #[tokio::test]
    async fn registers_one_vim_timer() {
        let db = test_database().await.unwrap();
        let mut registry = Registry::new();
        register_all(&mut registry, &db).unwrap();
        assert_eq!(registry.periodic_entries().len(), 1);
        assert_eq!(registry.canonical_for("!project"), Some("!today"));
        assert!(registry.is_secret("!botuptime"));
        assert!(registry.is_secret("!top5vimbits"));
        assert!(registry.is_secret("!topvimbits"));
        assert!(registry.is_secret("!vimbitsrank"));
    }
}
