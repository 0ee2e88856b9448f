// src/repositories/mod.rs

use async_trait::async_trait;

use crate::Error;

pub mod sqlite;

/// What the streamer is working on today.
#[async_trait]
pub trait TodayRepository: Send + Sync {
    async fn set_today(&self, msg: &str) -> Result<(), Error>;
    async fn get_today(&self) -> Result<Option<String>, Error>;
}

/// Message of the day, bought with channel points.
#[async_trait]
pub trait MotdRepository: Send + Sync {
    /// Stores a new motd and returns how many times this exact text has
    /// been set, this time included.
    async fn set_motd(&self, user: &str, msg: &str) -> Result<u64, Error>;
    async fn get_motd(&self) -> Result<Option<String>, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiveawayOutcome {
    NotActive,
    NoEntrants,
    Entrants(Vec<String>),
}

#[async_trait]
pub trait GiveawayRepository: Send + Sync {
    async fn start(&self) -> Result<(), Error>;
    /// `false` when no giveaway is running. Entering twice is a no-op.
    async fn enter(&self, user: &str) -> Result<bool, Error>;
    /// Closes the giveaway and clears its entrants.
    async fn end(&self) -> Result<GiveawayOutcome, Error>;
}

/// Result of donating vim bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimBits {
    /// Seconds of vim left after adding the donation.
    Added(u64),
    /// Vim is disabled; total seconds banked for when it is enabled again.
    Banked(u64),
}

#[async_trait]
pub trait VimRepository: Send + Sync {
    async fn is_enabled(&self) -> Result<bool, Error>;
    /// Zero while disabled.
    async fn time_left(&self) -> Result<u64, Error>;
    async fn add_bits(&self, user: &str, bits: u64) -> Result<VimBits, Error>;
    async fn disable(&self) -> Result<(), Error>;
    /// Re-enables vim and moves banked time onto the clock. Returns the
    /// seconds left afterwards.
    async fn enable(&self) -> Result<u64, Error>;
    /// Bits donated per user while vim was enabled (banked donations count
    /// once vim is enabled again), highest first; ties ordered by name.
    async fn user_totals(&self) -> Result<Vec<(String, u64)>, Error>;
    /// Tracks whether vim time is running. Returns `true` exactly once when
    /// running time has run out.
    async fn sync_active(&self) -> Result<bool, Error>;
}
