//! Arguments for the `cache` subcommand.

use clap::{Args, Subcommand};

/// Manage the result cache.
#[derive(Args, Debug)]
pub struct CacheArgs {
    /// Cache action
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache actions.
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove all cached results
    Clear,
    /// Print cache configuration and entry count
    Stats,
}
