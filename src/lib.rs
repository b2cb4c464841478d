pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;

// Observability: metrics recorder and per-stage metrics
pub mod observability;

// Domain data shapes shared across stages
pub mod domain;
