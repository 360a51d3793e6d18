//! neutrader: benchmark-relative scoring and market-neutral order generation.
//!
//! Hexagonal architecture: the scoring → selection → allocation pipeline lives
//! in [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
