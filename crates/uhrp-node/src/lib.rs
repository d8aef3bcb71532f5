//! Command-line driver for the UHRP overlay
//!
//! Exposes the full admit/spend/evict/lookup cycle over a redb index so the
//! overlay can be exercised from a shell.

pub mod commands;
pub mod config;
