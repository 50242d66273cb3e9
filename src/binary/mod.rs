//! MaxMind DB binary format.
//!
//! # File Structure
//!
//! ```text
//! +--------------------+
//! |   SEARCH TREE      |  node_count * record_size * 2 / 8 bytes
//! +--------------------+
//! |   SEPARATOR        |  16 zero bytes
//! +--------------------+
//! |   DATA SECTION     |  encoded record values
//! +--------------------+
//! |   METADATA MARKER  |  "\xAB\xCD\xEFMaxMind.com"
//! +--------------------+
//! |   METADATA         |  encoded map
//! +--------------------+
//! ```
//!
//! A record value below `node_count` points at another node, `node_count`
//! itself means "no data", and anything above points into the data section at
//! `value - node_count - 16`.

mod format;
mod metadata;
pub mod writer;


pub use format::*;
pub use metadata::{now_epoch, Metadata};
pub use writer::MmdbWriter;
