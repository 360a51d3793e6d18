//! Core domain types and logic.

pub mod error;
pub mod ohlcv;
pub mod indicator;
pub mod snapshot;
pub mod order;
pub mod config;
pub mod config_validation;
pub mod score;
pub mod selection;
pub mod allocation;
pub mod summary;
pub mod pipeline;
pub mod universe;
