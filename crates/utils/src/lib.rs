//! Shared helpers for the DisplayPort AUX crates.
//!
//! TEAM_211: Lock API is the `spin` crate, re-exported so every crate agrees on one Mutex.

#![no_std]

pub mod hex;
pub mod ratelimit;

pub use hex::HexBytes;
pub use ratelimit::RateLimit;
pub use spin::{Mutex, MutexGuard};
