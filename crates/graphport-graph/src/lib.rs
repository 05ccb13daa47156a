//! # Graphport Graph
//!
//! Neo4j backend for graph exports.
//!
//! Provides the connection client, the Cypher used for introspection and
//! row extraction, and a [`graphport_core::GraphSource`] over a live server.

pub mod client;
pub mod cypher;
pub mod source;

pub use client::{GraphClient, GraphConfig};
pub use source::Neo4jSource;
