pub mod client;
pub mod runtime;

pub use client::{connect_tls, registration_lines, run_session, SessionEnd};
pub use runtime::{Backoff, TwitchIrcRuntime};
