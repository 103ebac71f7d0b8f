//! Command line interface for the Tessera engine.
//!
//! The CLI drives an engine against a snapshot on disk: ingest a JSON corpus,
//! run any of the query entry points, and inspect index state.

pub mod args;
pub mod commands;
