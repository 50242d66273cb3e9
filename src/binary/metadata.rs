//! Trailing metadata map.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::format::{IpVersion, RecordSize, FORMAT_MAJOR_VERSION, FORMAT_MINOR_VERSION};
use crate::Value;

/// Self-describing metadata written after the data section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub database_type: String,
    pub description: BTreeMap<String, String>,
    pub languages: Vec<String>,
    pub build_epoch: u64,
    pub ip_version: IpVersion,
    pub record_size: RecordSize,
    pub node_count: u32,
}

impl Metadata {
    /// Metadata as a map value, ready to encode.
    pub fn to_value(&self) -> Value {
        let description = self
            .description
            .iter()
            .map(|(lang, text)| (lang.clone(), Value::from(text.as_str())));
        let languages = self
            .languages
            .iter()
            .map(|lang| Value::from(lang.as_str()))
            .collect::<Vec<_>>();

        Value::map([
            ("binary_format_major_version", Value::Uint16(FORMAT_MAJOR_VERSION)),
            ("binary_format_minor_version", Value::Uint16(FORMAT_MINOR_VERSION)),
            ("build_epoch", Value::Uint64(self.build_epoch)),
            ("database_type", Value::from(self.database_type.as_str())),
            ("description", Value::Map(description.collect())),
            ("ip_version", Value::Uint16(self.ip_version.as_u16())),
            ("languages", Value::Array(languages)),
            ("node_count", Value::Uint32(self.node_count)),
            ("record_size", Value::Uint16(self.record_size.bits())),
        ])
    }
}

/// Seconds since the Unix epoch.
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
