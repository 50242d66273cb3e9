//! Country source files.

use serde::Deserialize;

use super::{SourceFile, Subnets};
use crate::error::ValidationError;
use crate::inserter::SourceUnit;
use crate::Value;

/// One country `aggregated.json`.
///
/// ```json
/// {"country-code": "US", "country": "United States",
///  "subnets": {"ipv4": ["3.0.0.0/9"], "ipv6": ["2600::/12"]}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountryFile {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "country-code", default)]
    pub country_code: String,
    #[serde(rename = "country", default)]
    pub country_name: String,
    #[serde(default)]
    pub subnets: Subnets,
}

impl SourceFile for CountryFile {
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl SourceUnit for CountryFile {
    fn id(&self) -> &str {
        &self.id
    }

    /// GeoIP2-Country record: `{country: {iso_code, names: {en}}}`.
    fn to_record(&self) -> Result<Value, ValidationError> {
        let code = self.country_code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyCountryCode(self.id.clone()));
        }
        Ok(Value::map([(
            "country",
            Value::map([
                ("iso_code", Value::from(code)),
                (
                    "names",
                    Value::map([("en", Value::from(self.country_name.as_str()))]),
                ),
            ]),
        )]))
    }

    fn prefixes(&self) -> Vec<&str> {
        self.subnets.all()
    }
}
