//! K2Geo - MaxMind DB (MMDB) writer for country and ASN databases.
//!
//! This crate builds GeoIP2-compatible database files from lists of network
//! prefixes, each tagged with a structured record. The files can be read by
//! any compliant MaxMind DB reader.
//!
//! # Features
//!
//! - **Prefix trie**: Longest-prefix match over IPv4 and IPv6 in one tree
//! - **Structured values**: Maps, arrays, strings and integers in the MMDB data format
//! - **Data deduplication**: Equal records are stored once in the data section
//! - **IPv4 aliasing**: IPv4-mapped and 6to4 space resolve to the IPv4 subtree
//! - **Record sizes**: 24, 28 and 32-bit search tree records
//! - **Parallel builds**: Country and ASN databases built concurrently
//!
//! # Quick Start
//!
//! ```
//! use k2geo::{Database, DatabaseOptions, Value};
//!
//! let mut db = Database::new(DatabaseOptions::new("GeoIP2-Country"));
//! let us = Value::map([("country", Value::map([("iso_code", Value::from("US"))]))]);
//! db.insert(&"203.0.113.0/24".parse().unwrap(), us).unwrap();
//!
//! let mut bytes = Vec::new();
//! let stats = db.write_to(&mut bytes).unwrap();
//! assert_eq!(stats.total_size, bytes.len());
//! ```
//!
//! # Building From Source Files
//!
//! The [`build`] module walks a directory of `aggregated.json` files and
//! writes one database per request:
//!
//! ```no_run
//! use k2geo::build::{run_builds, BuildRequest, DatabaseKind};
//!
//! let requests = [
//!     BuildRequest::new(DatabaseKind::Country, "rir-ip/country", "GeoIP2-Country.mmdb"),
//!     BuildRequest::new(DatabaseKind::Asn, "asn-ip/as", "GeoIP2-ASN.mmdb"),
//! ];
//! let report = run_builds(&requests);
//! for (kind, err) in report.failures() {
//!     eprintln!("{} build failed: {}", kind, err);
//! }
//! ```
//!
//! # Overlapping Networks
//!
//! - A more specific network inserted after a covering one overrides it only
//!   inside its own range.
//! - A covering network inserted after more specific ones replaces them.
//! - Inserting the same network twice keeps the last value.

mod database;
mod error;
mod inserter;
mod network;
mod pool;
mod trie;
mod value;

pub mod binary;
pub mod build;
pub mod source;

// Re-export core types
pub use error::{Error, InsertError, PrefixError, Result, ValidationError};
pub use network::{Family, NetworkPrefix};
pub use value::Value;

// Re-export building blocks
pub use database::{Database, DatabaseOptions, WriteStats, IPV4_ALIASES};
pub use inserter::{ApplyStats, Inserter, RecordUnit, SourceUnit};
pub use pool::{DataId, DataPool, PoolEntry};
pub use trie::{Node, NodeId, PrefixTrie};

// Re-export build tasks
pub use build::{BuildOutcome, BuildReport, BuildRequest, DatabaseKind};
