//! Core domain types and logic.

pub mod analysis;
pub mod backtest;
pub mod catalog;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod fibonacci;
pub mod heikin_ashi;
pub mod market_data;
pub mod metrics;
pub mod ohlcv;
pub mod position;
pub mod report;
pub mod resample;
pub mod scan;
pub mod signal;
pub mod source;
