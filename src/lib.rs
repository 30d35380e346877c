//! healthcheck - team health check survey engine
//!
//! Users vote green, amber or red on a fixed set of health cards once per
//! session. Every vote write recomputes the voter's team summary for that
//! (session, card), and every team summary change recomputes its
//! department's summary. Trends compare a summary with the same entity's
//! summary in the previous session.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod seed;
pub mod store;
pub mod voting;

pub use error::{HealthCheckError, Result};
