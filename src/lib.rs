// src/lib.rs

//! Register Crawler Library
//!
//! Harvests paginated public registers (doctors, foreign doctors, clinical
//! officers), archives a snapshot whenever the data changes, and replaces
//! the site's documents in a search index.

pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod services;
pub mod storage;
pub mod utils;
