//! Network acquisition and local caching for the CLI.
//!
//! The library pipeline is offline; this module fetches quotes and rates,
//! going through the SQLite cache unless told otherwise.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
