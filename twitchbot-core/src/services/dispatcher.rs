// twitchbot-core/src/services/dispatcher.rs
//
// Turns inbound lines into handler runs. Every run gets its own task so the
// reader never waits on a handler; a handler error or panic ends up as a
// single generic reply instead of reaching the connection.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::context::HandlerContext;
use crate::message::ChatMessage;
use crate::registry::{Handler, Resolution};
use crate::services::session_log::{render_input, render_output, SessionLog};
use crate::template::{format_msg, privmsg};
use crate::Error;

/// Body of the message handed to timer-driven handlers.
pub const PERIODIC_PLACEHOLDER: &str = "dummy message";

/// How one handler run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The full wire line that was queued.
    Sent(String),
    NoReply,
    /// The handler failed; the generic failure line was queued.
    Failed(&'static str),
}

#[derive(Clone)]
pub struct Dispatcher {
    ctx: HandlerContext,
    outbound: UnboundedSender<String>,
    session_log: Arc<SessionLog>,
}

impl Dispatcher {
    pub fn new(
        ctx: HandlerContext,
        outbound: UnboundedSender<String>,
        session_log: Arc<SessionLog>,
    ) -> Self {
        Self {
            ctx,
            outbound,
            session_log,
        }
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Entry point for every inbound line. Returns the spawned handler task,
    /// if any; callers are free to drop it.
    pub fn handle(&self, line: &str) -> Option<JoinHandle<Outcome>> {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(rest) = line.strip_prefix("PING ") {
            self.send(format!("PONG {}\r\n", rest));
            return None;
        }

        if let Some(msg) = ChatMessage::parse(line) {
            self.log_line(&render_input(&msg));
        }

        match self.ctx.registry.resolve(line) {
            Resolution::Handler {
                handler,
                message,
                route,
            } => {
                debug!("dispatching {:?} for: {}", route, line);
                Some(self.spawn(handler, message))
            }
            Resolution::Line {
                handler,
                line,
                route,
            } => {
                debug!("dispatching {:?} for: {}", route, line);
                let message = ChatMessage::synthetic(&self.ctx.config, &line);
                Some(self.spawn(handler, message))
            }
            Resolution::UnhandledReward { reward_id, message } => {
                warn!(
                    "unhandled channel points redemption: reward_id={} user={}",
                    reward_id,
                    message.display_name()
                );
                None
            }
            Resolution::Unhandled => {
                debug!("UNHANDLED: {}", line);
                None
            }
        }
    }

    /// Runs a timer-driven handler against a synthetic message from the bot
    /// itself.
    pub fn run_periodic(&self, handler: Arc<dyn Handler>) -> JoinHandle<Outcome> {
        let msg = ChatMessage::synthetic(&self.ctx.config, PERIODIC_PLACEHOLDER);
        self.spawn(handler, msg)
    }

    fn spawn(&self, handler: Arc<dyn Handler>, msg: ChatMessage) -> JoinHandle<Outcome> {
        let this = self.clone();
        tokio::spawn(async move { this.execute(handler.as_ref(), &msg).await })
    }

    /// Invokes `handler` inside the error boundary and queues whatever it
    /// produced.
    pub async fn execute(&self, handler: &dyn Handler, msg: &ChatMessage) -> Outcome {
        let result = AssertUnwindSafe(handler.invoke(&self.ctx, msg))
            .catch_unwind()
            .await;

        let rendered = match result {
            Ok(Ok(None)) => return Outcome::NoReply,
            Ok(Ok(Some(text))) => format_msg(msg, &text),
            Ok(Err(e)) => Err(e),
            Err(payload) => {
                error!(
                    "handler panicked on {:?}: {}",
                    msg.text,
                    panic_message(payload.as_ref())
                );
                return self.fail("Panic");
            }
        };

        match rendered {
            Ok(text) => {
                let line = privmsg(&msg.channel, &text);
                self.log_line(&render_output(&self.ctx.config.username, &text));
                self.send(line.clone());
                Outcome::Sent(line)
            }
            Err(e) => {
                error!("handler failed on {:?}: {:?}", msg.text, e);
                self.fail(e.kind())
            }
        }
    }

    fn fail(&self, kind: &'static str) -> Outcome {
        let text = format!("*** unhandled {} -- see logs", kind);
        self.log_line(&render_output(&self.ctx.config.username, &text));
        self.send(privmsg(&self.ctx.config.channel, &text));
        Outcome::Failed(kind)
    }

    fn send(&self, line: String) {
        if self.outbound.send(line).is_err() {
            warn!("outbound channel closed; dropping line");
        }
    }

    fn log_line(&self, line: &str) {
        if let Err(e) = self.session_log.write_message(line) {
            warn!("could not write session log: {}", e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Convenience for callers holding an `Error` from outside a handler run.
pub fn failure_reply(channel: &str, e: &Error) -> String {
    privmsg(channel, &format!("*** unhandled {} -- see logs", e.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::registry::Registry;
    use crate::test_utils::helpers::{test_dispatcher, test_config, FakeMsg, TestDispatcher};

    struct Reply(&'static str);

    #[async_trait]
    impl Handler for Reply {
        async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct Silent;

    #[async_trait]
    impl Handler for Silent {
        async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
            Ok(None)
        }
    }

    struct Fails;

    #[async_trait]
    impl Handler for Fails {
        async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
            Err(Error::NotFound("secret detail".into()))
        }
    }

    struct Panics;

    #[async_trait]
    impl Handler for Panics {
        async fn invoke(&self, _ctx: &HandlerContext, _msg: &ChatMessage) -> Result<Option<String>, Error> {
            panic!("boom");
        }
    }

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn invoke(&self, _ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error> {
            Ok(Some(format!("you said: {}", crate::template::esc(&msg.text))))
        }
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.command(&["!reply"], false, Arc::new(Reply("hi {user}"))).unwrap();
        registry.command(&["!silent"], false, Arc::new(Silent)).unwrap();
        registry.command(&["!fails"], false, Arc::new(Fails)).unwrap();
        registry.command(&["!panics"], false, Arc::new(Panics)).unwrap();
        registry.command(&["!echo"], false, Arc::new(Echo)).unwrap();
        registry.command(&["!broken"], false, Arc::new(Reply("{nope}"))).unwrap();
        registry
    }

    async fn run(t: &TestDispatcher, text: &str) -> Option<Outcome> {
        let line = FakeMsg::new(&t.config, text).user("Viewer").build();
        match t.dispatcher.handle(&line) {
            Some(task) => Some(task.await.unwrap()),
            None => None,
        }
    }

    #[tokio::test]
    async fn reply_is_rendered_and_sent() {
        let mut t = test_dispatcher(registry());
        let outcome = run(&t, "!reply").await;
        assert_eq!(outcome, Some(Outcome::Sent("PRIVMSG #testchannel :hi Viewer\r\n".into())));
        assert_eq!(t.sent(), vec!["PRIVMSG #testchannel :hi Viewer\r\n"]);
    }

    #[tokio::test]
    async fn no_reply_sends_nothing() {
        let mut t = test_dispatcher(registry());
        assert_eq!(run(&t, "!silent").await, Some(Outcome::NoReply));
        assert!(t.sent().is_empty());
    }

    #[tokio::test]
    async fn error_sends_exactly_one_generic_reply() {
        let mut t = test_dispatcher(registry());
        assert_eq!(run(&t, "!fails").await, Some(Outcome::Failed("NotFound")));
        let sent = t.sent();
        assert_eq!(sent, vec!["PRIVMSG #testchannel :*** unhandled NotFound -- see logs\r\n"]);
        assert!(!sent[0].contains("secret detail"));
    }

    #[tokio::test]
    async fn panic_sends_exactly_one_generic_reply() {
        let mut t = test_dispatcher(registry());
        assert_eq!(run(&t, "!panics").await, Some(Outcome::Failed("Panic")));
        assert_eq!(t.sent(), vec!["PRIVMSG #testchannel :*** unhandled Panic -- see logs\r\n"]);

        // the dispatcher keeps working afterwards
        assert!(matches!(run(&t, "!reply").await, Some(Outcome::Sent(_))));
    }

    #[tokio::test]
    async fn bad_template_is_a_handler_failure() {
        let mut t = test_dispatcher(registry());
        assert_eq!(run(&t, "!broken").await, Some(Outcome::Failed("Template")));
        assert_eq!(t.sent().len(), 1);
    }

    #[tokio::test]
    async fn chat_braces_cannot_inject_fields() {
        let mut t = test_dispatcher(registry());
        run(&t, "!echo {user} {channel} }{").await;
        assert_eq!(t.sent(), vec!["PRIVMSG #testchannel :you said: !echo {user} {channel} }{\r\n"]);
    }

    #[tokio::test]
    async fn keepalive_is_answered_directly() {
        let mut t = test_dispatcher(registry());
        assert!(t.dispatcher.handle("PING :tmi.twitch.tv\r\n").is_none());
        assert_eq!(t.sent(), vec!["PONG :tmi.twitch.tv\r\n"]);
    }

    #[tokio::test]
    async fn unhandled_lines_spawn_nothing() {
        let mut t = test_dispatcher(registry());
        assert!(run(&t, "just chatting").await.is_none());
        assert!(t.dispatcher.handle(":tmi.twitch.tv 001 testbot :Welcome").is_none());
        let line = FakeMsg::new(&t.config, "!reply").reward("not-registered").build();
        assert!(t.dispatcher.handle(&line).is_none());
        assert!(t.sent().is_empty());
    }

    #[tokio::test]
    async fn line_patterns_answer_in_the_configured_channel() {
        let mut registry = registry();
        registry
            .on_line(r":tmi\.twitch\.tv CLEARCHAT #\S+.*", Arc::new(Reply("chat cleared by {user}")))
            .unwrap();
        let mut t = test_dispatcher(registry);

        let task = t.dispatcher.handle(":tmi.twitch.tv CLEARCHAT #elsewhere\r\n").unwrap();
        assert_eq!(
            task.await.unwrap(),
            Outcome::Sent("PRIVMSG #testchannel :chat cleared by testbot\r\n".into())
        );
        assert_eq!(t.sent().len(), 1);
    }

    #[tokio::test]
    async fn input_and_output_reach_the_session_log() {
        let t = test_dispatcher(registry());
        run(&t, "!reply").await;
        t.session_log.flush().await.unwrap();
        let content = std::fs::read_to_string(t.session_log.path_for_today()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("<Viewer> !reply"));
        assert!(lines[1].ends_with("<testbot> hi Viewer"));
    }

    #[tokio::test]
    async fn periodic_runs_use_the_bot_identity() {
        let mut t = test_dispatcher(Registry::new());
        let outcome = t.dispatcher.run_periodic(Arc::new(Reply("tick from {user}"))).await.unwrap();
        assert_eq!(outcome, Outcome::Sent("PRIVMSG #testchannel :tick from testbot\r\n".into()));
        assert_eq!(t.sent().len(), 1);
    }

    #[test]
    fn failure_reply_hides_details() {
        let config = test_config();
        let line = failure_reply(&config.channel, &Error::Config("token=abc".into()));
        assert_eq!(line, "PRIVMSG #testchannel :*** unhandled Config -- see logs\r\n");
    }
}
