// twitchbot-core/src/context.rs

use std::sync::Arc;
use std::time::Instant;

use twitchbot_common::models::Config;

use crate::registry::Registry;

/// Everything a handler may look at besides the message itself. Built once
/// after registration and shared by every dispatch.
#[derive(Clone)]
pub struct HandlerContext {
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    pub started_at: Instant,
}

impl HandlerContext {
    pub fn new(config: Arc<Config>, registry: Arc<Registry>) -> Self {
        Self {
            config,
            registry,
            started_at: Instant::now(),
        }
    }
}
