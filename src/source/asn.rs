//! Autonomous system source files.

use serde::Deserialize;

use super::{SourceFile, Subnets};
use crate::error::ValidationError;
use crate::inserter::SourceUnit;
use crate::Value;

/// One ASN `aggregated.json`.
///
/// ```json
/// {"asn": 13335, "description": "CLOUDFLARENET",
///  "subnets": {"ipv4": ["1.1.1.0/24"], "ipv6": ["2606:4700::/32"]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AsnFile {
    #[serde(skip)]
    pub id: String,
    #[serde(default)]
    pub asn: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subnets: Subnets,
}

impl SourceFile for AsnFile {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl SourceUnit for AsnFile {
    fn id(&self) -> &str {
        &self.id
    }

    /// GeoIP2-ASN record.
    fn to_record(&self) -> Result<Value, ValidationError> {
        if self.asn == 0 {
            return Err(ValidationError::ZeroAsn(self.id.clone()));
        }
        Ok(Value::map([
            ("autonomous_system_number", Value::Uint32(self.asn)),
            (
                "autonomous_system_organization",
                Value::from(self.description.as_str()),
            ),
        ]))
    }

    fn prefixes(&self) -> Vec<&str> {
        self.subnets.all()
    }
}
