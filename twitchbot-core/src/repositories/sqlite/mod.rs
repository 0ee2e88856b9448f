// src/repositories/sqlite/mod.rs

pub mod giveaway;
pub mod motd;
pub mod today;
pub mod vim;

pub use giveaway::SqliteGiveawayRepository;
pub use motd::SqliteMotdRepository;
pub use today::SqliteTodayRepository;
pub use vim::SqliteVimRepository;
