//! Species catalog ingestion from PokeAPI into SQLite, plus the in-process
//! species cache used for faceted filtering.

pub mod admission;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod evolution;
pub mod ingest;
pub mod normalize;
pub mod output;
pub mod pokeapi;
pub mod remediation;
pub mod store;
