//! Applies source units to a database with the skip and reject policy.

use log::{debug, warn};

use crate::error::ValidationError;
use crate::network::NetworkPrefix;
use crate::{Database, Value};

/// A batch of networks sharing one record, read from one source.
pub trait SourceUnit {
    /// Stable identifier; units are applied in ascending order of it.
    fn id(&self) -> &str;

    /// Validate mandatory fields and build the record.
    fn to_record(&self) -> Result<Value, ValidationError>;

    /// Network prefixes in CIDR notation, in insertion order.
    fn prefixes(&self) -> Vec<&str>;
}

/// A unit with a prebuilt record and no mandatory fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUnit {
    pub id: String,
    pub record: Value,
    pub prefixes: Vec<String>,
}

impl RecordUnit {
    pub fn new(id: &str, record: Value, prefixes: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            record,
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl SourceUnit for RecordUnit {
    fn id(&self) -> &str {
        &self.id
    }

    fn to_record(&self) -> Result<Value, ValidationError> {
        Ok(self.record.clone())
    }

    fn prefixes(&self) -> Vec<&str> {
        self.prefixes.iter().map(String::as_str).collect()
    }
}

/// Counters from one [`Inserter::apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub units_applied: usize,
    pub units_rejected: usize,
    pub prefixes_inserted: usize,
    pub prefixes_skipped: usize,
}

impl ApplyStats {
    fn add(&mut self, other: ApplyStats) {
        self.units_applied += other.units_applied;
        self.units_rejected += other.units_rejected;
        self.prefixes_inserted += other.prefixes_inserted;
        self.prefixes_skipped += other.prefixes_skipped;
    }
}

/// Single writer over one [`Database`].
///
/// - A malformed prefix skips that prefix only.
/// - A unit failing validation is skipped whole, before any insert.
/// - Units are applied in ascending `id` order so discovery order never
///   changes the result.
pub struct Inserter<'a> {
    db: &'a mut Database,
    stats: ApplyStats,
}

impl<'a> Inserter<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        Self {
            db,
            stats: ApplyStats::default(),
        }
    }

    /// Apply `units` in canonical order and return the counters for this call.
    pub fn apply<U: SourceUnit>(&mut self, mut units: Vec<U>) -> ApplyStats {
        units.sort_by(|a, b| a.id().cmp(b.id()));

        let mut stats = ApplyStats::default();
        for unit in &units {
            stats.add(self.apply_unit(unit));
        }
        self.stats.add(stats);
        stats
    }

    /// Apply one unit. Callers are responsible for ordering.
    pub fn apply_unit<U: SourceUnit + ?Sized>(&mut self, unit: &U) -> ApplyStats {
        let mut stats = ApplyStats::default();

        let record = match unit.to_record() {
            Ok(record) => record,
            Err(e) => {
                warn!("Rejecting {}: {}", unit.id(), e);
                stats.units_rejected = 1;
                return stats;
            }
        };
        let data = match self.db.intern(record) {
            Ok(data) => data,
            Err(e) => {
                warn!("Rejecting {}: {}", unit.id(), e);
                stats.units_rejected = 1;
                return stats;
            }
        };

        for cidr in unit.prefixes() {
            let result = cidr
                .parse::<NetworkPrefix>()
                .map_err(crate::Error::from)
                .and_then(|prefix| self.db.insert_data(&prefix, data));
            match result {
                Ok(()) => stats.prefixes_inserted += 1,
                Err(e) => {
                    warn!("Skipping invalid CIDR '{}' in {}: {}", cidr, unit.id(), e);
                    stats.prefixes_skipped += 1;
                }
            }
        }

        debug!(
            "Applied {}: {} inserted, {} skipped",
            unit.id(),
            stats.prefixes_inserted,
            stats.prefixes_skipped
        );
        stats.units_applied = 1;
        stats
    }

    /// Counters accumulated over every call on this inserter.
    pub fn stats(&self) -> ApplyStats {
        self.stats
    }
}
