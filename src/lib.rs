//! Inventory Forecast Library
//!
//! Predicts near-term per-item demand from order history and flags items whose
//! predicted demand will exceed stock. See [`services::forecasting`].
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use services::forecasting::ForecastingService;
