// File: twitchbot-core/src/test_utils/helpers.rs

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use twitchbot_common::models::config::{Config, DEFAULT_HOST, DEFAULT_PORT};

use crate::context::HandlerContext;
use crate::db::Database;
use crate::message::ChatMessage;
use crate::registry::Registry;
use crate::services::dispatcher::Dispatcher;
use crate::services::session_log::SessionLog;
use crate::Error;

pub fn test_config() -> Config {
    Config {
        username: "testbot".to_string(),
        channel: "testchannel".to_string(),
        oauth_token: "oauth:testtoken".to_string(),
        client_id: "testclient".to_string(),
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
        db_path: ":memory:".to_string(),
        log_dir: PathBuf::from("logs"),
    }
}

/// Builds a tagged `PRIVMSG` line the way Twitch would send it.
#[derive(Debug, Clone)]
pub struct FakeMsg {
    channel: String,
    text: String,
    user: String,
    badges: String,
    bits: u64,
    extra_tags: Vec<(String, String)>,
}

impl FakeMsg {
    pub fn new(config: &Config, text: &str) -> Self {
        Self {
            channel: config.channel.clone(),
            text: text.to_string(),
            user: "username".to_string(),
            badges: String::new(),
            bits: 0,
            extra_tags: Vec::new(),
        }
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }

    pub fn moderator(self) -> Self {
        self.badges("moderator/1")
    }

    pub fn badges(mut self, badges: &str) -> Self {
        self.badges = badges.to_string();
        self
    }

    pub fn bits(mut self, bits: u64) -> Self {
        self.bits = bits;
        self
    }

    pub fn reward(self, reward_id: &str) -> Self {
        self.tag("custom-reward-id", reward_id)
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.extra_tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(&self) -> String {
        let mut info = format!(
            "badges={};bits={};color=;display-name={}",
            self.badges, self.bits, self.user
        );
        for (k, v) in &self.extra_tags {
            info.push_str(&format!(";{}={}", k, v));
        }
        let login = self.user.to_lowercase();
        format!(
            "@{} :{login}!{login}@{login}.tmi.twitch.tv PRIVMSG #{} :{}\r\n",
            info, self.channel, self.text
        )
    }

    pub fn parsed(&self) -> ChatMessage {
        ChatMessage::parse(&self.build()).expect("fake message parses")
    }
}

pub async fn test_database() -> Result<Database, Error> {
    Database::in_memory().await
}

pub fn test_context(registry: Registry) -> HandlerContext {
    HandlerContext::new(Arc::new(test_config()), Arc::new(registry))
}

/// A dispatcher whose outbound lines land in `outbound` and whose session
/// log lives in a temporary directory.
pub struct TestDispatcher {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub outbound: UnboundedReceiver<String>,
    pub session_log: Arc<SessionLog>,
    _log_dir: TempDir,
}

impl TestDispatcher {
    /// Everything queued so far.
    pub fn sent(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.outbound.try_recv() {
            lines.push(line);
        }
        lines
    }
}

pub fn test_dispatcher(registry: Registry) -> TestDispatcher {
    let log_dir = tempfile::tempdir().expect("create temp log dir");
    let ctx = test_context(registry);
    let session_log = Arc::new(SessionLog::new(log_dir.path(), false));
    let (tx, rx) = mpsc::unbounded_channel();
    TestDispatcher {
        config: ctx.config.clone(),
        dispatcher: Dispatcher::new(ctx, tx, session_log.clone()),
        outbound: rx,
        session_log,
        _log_dir: log_dir,
    }
}
