//! HTTP middleware
//!
//! Author: hephaex@gmail.com

pub mod metrics;

pub use metrics::request_counter_middleware;
