//! src/platforms/twitch_irc/runtime.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tracing::{error, info, warn};

use twitchbot_common::models::Config;

use crate::context::HandlerContext;
use crate::registry::Registry;
use crate::services::dispatcher::Dispatcher;
use crate::services::session_log::SessionLog;
use crate::tasks::periodic::spawn_periodic_tasks;
use crate::Error;

use super::client::{connect_tls, run_session, SessionEnd};

const BACKOFF_STEP: Duration = Duration::from_secs(5);
const BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Delay before the next connection attempt: grows by a fixed step after
/// every failure, resets once a connection succeeds.
#[derive(Debug, Default)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn current(&self) -> Duration {
        self.delay
    }

    pub fn fail(&mut self) {
        self.delay = (self.delay + BACKOFF_STEP).min(BACKOFF_MAX);
    }

    pub fn reset(&mut self) {
        self.delay = Duration::ZERO;
    }
}

/// Owns the outbound queue and keeps a connection alive until shutdown.
pub struct TwitchIrcRuntime {
    config: Arc<Config>,
    dispatcher: Dispatcher,
    outbound: UnboundedReceiver<String>,
}

impl TwitchIrcRuntime {
    /// `registry` must be fully populated: it is frozen from here on.
    pub fn new(config: Arc<Config>, registry: Registry, session_log: Arc<SessionLog>) -> Self {
        let ctx = HandlerContext::new(config.clone(), Arc::new(registry));
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            dispatcher: Dispatcher::new(ctx, tx, session_log),
            outbound: rx,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Connects, runs sessions back to back with backoff in between, and
    /// returns once `shutdown` flips to `true`.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), Error> {
        let config = self.config.clone();
        self.run_with(
            move || {
                let config = config.clone();
                async move { connect_tls(&config).await }
            },
            shutdown,
        )
        .await
    }

    /// Same as [`run`](Self::run) with a custom way of opening the stream.
    pub async fn run_with<C, F, S>(
        mut self,
        mut connect: C,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Error>
    where
        C: FnMut() -> F,
        F: Future<Output = Result<S, Error>>,
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let periodic = spawn_periodic_tasks(
            &self.dispatcher,
            self.dispatcher.context().registry.periodic_entries(),
        );

        let mut backoff = Backoff::default();
        loop {
            if !backoff.current().is_zero() {
                warn!("reconnecting in {} seconds", backoff.current().as_secs());
                tokio::select! {
                    _ = tokio::time::sleep(backoff.current()) => {}
                    _ = shutdown.changed() => {}
                }
            }
            if *shutdown.borrow() {
                break;
            }

            info!("connecting to {}:{}", self.config.host, self.config.port);
            let stream = match connect().await {
                Ok(stream) => {
                    backoff.reset();
                    stream
                }
                Err(e) => {
                    error!("connect failed: {}", e);
                    backoff.fail();
                    continue;
                }
            };

            match run_session(
                stream,
                &self.config,
                &self.dispatcher,
                &mut self.outbound,
                &mut shutdown,
            )
            .await
            {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Disconnected) => info!("disconnected"),
                Err(e) => error!("session failed: {}", e),
            }
            backoff.fail();
        }

        for task in periodic {
            task.abort();
        }
        info!("bye!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let mut backoff = Backoff::default();
        assert_eq!(backoff.current(), Duration::ZERO);
        backoff.fail();
        assert_eq!(backoff.current(), Duration::from_secs(5));
        backoff.fail();
        assert_eq!(backoff.current(), Duration::from_secs(10));
        for _ in 0..20 {
            backoff.fail();
        }
        assert_eq!(backoff.current(), Duration::from_secs(60));
        backoff.reset();
        assert_eq!(backoff.current(), Duration::ZERO);
    }
}
