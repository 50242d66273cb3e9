//! Error types for k2geo.

use thiserror::Error;

/// Error type for k2geo operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid network prefix
    #[error(transparent)]
    Prefix(#[from] PrefixError),

    /// Prefix cannot be placed in this database
    #[error(transparent)]
    Insert(#[from] InsertError),

    /// Source unit failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Internal invariant violated while writing the database
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record value does not fit in the configured record size
    #[error("record value {value} exceeds {record_size}-bit record size")]
    RecordOverflow { value: u64, record_size: u16 },

    /// Source root could not be walked
    #[error("error walking {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Written database failed verification
    #[error("verification failed: {0}")]
    Verify(String),

    /// Build task ended without a result
    #[error("build task failed: {0}")]
    Task(String),
}

/// Result type alias for k2geo operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for network prefix parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrefixError {
    /// Not CIDR notation
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    /// Address has bits set beyond the prefix length
    #[error("host bits set in network prefix: {0}")]
    HostBitsSet(String),
}

/// Error type for trie insertion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// Prefix lies inside a network that aliases the IPv4 subtree
    #[error("cannot insert {0} into an aliased network")]
    AliasedNetwork(String),

    /// IPv6 prefix given to an IPv4-only database
    #[error("cannot insert IPv6 network {0} into an IPv4 database")]
    Ipv6InIpv4Database(String),
}

/// Error type for source unit validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Country code is missing or blank
    #[error("country-code is empty in {0}")]
    EmptyCountryCode(String),

    /// AS number is missing or zero
    #[error("asn is 0 or missing in {0}")]
    ZeroAsn(String),
}
