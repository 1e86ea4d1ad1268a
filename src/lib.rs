//! Nexus Oracle Library
//!
//! Oracle price cache, feature builder and confidence predictor for
//! prediction markets

pub mod config;
pub mod error;
pub mod features;
pub mod ml_engine;
pub mod oracle;
pub mod pipeline;
pub mod types;
