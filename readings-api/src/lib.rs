//! HTTP service that records temperature/humidity readings per device and
//! answers max/min/mean/median/mode queries over them.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod errors;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod rest;

pub use rest::{create_router, AppState};
