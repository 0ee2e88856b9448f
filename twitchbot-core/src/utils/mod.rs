pub mod close_matches;
pub mod ranking;
pub mod time;
