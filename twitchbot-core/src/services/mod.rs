pub mod dispatcher;
pub mod session_log;

pub use dispatcher::{Dispatcher, Outcome};
pub use session_log::SessionLog;
