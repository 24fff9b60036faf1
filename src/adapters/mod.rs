//! Concrete adapter implementations for ports.

pub mod catalog_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "http")]
pub mod http_retry;
pub mod json_report_adapter;
#[cfg(feature = "http")]
pub mod upbit_adapter;
#[cfg(feature = "http")]
pub mod yahoo_adapter;
