// src/lib.rs

pub mod builtin_commands;
pub mod context;
pub mod db;
pub mod message;
pub mod permissions;
pub mod platforms;
pub mod registry;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod template;
pub mod test_utils;
pub mod utils;

pub use context::HandlerContext;
pub use db::Database;
pub use message::ChatMessage;
pub use registry::{Handler, Registry};
pub use twitchbot_common::error::Error;
