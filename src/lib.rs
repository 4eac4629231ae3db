//! Article ingestion pipeline.
//!
//! Fetch ([`fetch`]) → render ([`render`]) → extract ([`extract`], [`dates`])
//! → store ([`store`]), driven per URL by [`ingest::Ingestor`]. The
//! `article_ingest` binary wires these together behind a CLI.

pub mod config;
pub mod dates;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod listing;
pub mod models;
pub mod render;
pub mod store;
pub mod utils;
