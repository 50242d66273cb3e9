//! Deduplicating store of record values.

use ahash::AHashMap;

use crate::{Result, Value};

/// Identifier of a distinct value in a [`DataPool`].
///
/// Stable for the lifetime of one pool; never meaningful across pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataId(pub(crate) u32);

impl DataId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One distinct value together with its canonical encoding.
#[derive(Debug)]
pub struct PoolEntry {
    pub value: Value,
    pub encoded: Vec<u8>,
}

/// Append-only pool keyed by canonical encoding.
///
/// Content-equal values always intern to the same [`DataId`].
#[derive(Debug, Default)]
pub struct DataPool {
    entries: Vec<PoolEntry>,
    index: AHashMap<Vec<u8>, DataId>,
}

impl DataPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `value`, adding it if it is not yet present.
    pub fn intern(&mut self, value: Value) -> Result<DataId> {
        let encoded = value.to_bytes()?;
        if let Some(id) = self.index.get(&encoded) {
            return Ok(*id);
        }

        let id = DataId(self.entries.len() as u32);
        self.index.insert(encoded.clone(), id);
        self.entries.push(PoolEntry { value, encoded });
        Ok(id)
    }

    pub fn get(&self, id: DataId) -> Option<&PoolEntry> {
        self.entries.get(id.index())
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(code: &str) -> Value {
        Value::map([(
            "country",
            Value::map([
                ("iso_code", Value::from(code)),
                ("names", Value::map([("en", Value::from("Somewhere"))])),
            ]),
        )])
    }

    #[test]
    fn test_equal_values_share_one_entry() {
        let mut pool = DataPool::new();
        let ids: Vec<DataId> = (0..10).map(|_| pool.intern(country("US")).unwrap()).collect();

        assert_eq!(pool.len(), 1);
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[test]
    fn test_distinct_values_get_distinct_entries() {
        let mut pool = DataPool::new();
        let codes = ["US", "CA", "DE", "FR", "JP"];
        let ids: Vec<DataId> = codes.iter().map(|c| pool.intern(country(c)).unwrap()).collect();

        assert_eq!(pool.len(), codes.len());
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn test_construction_order_does_not_matter() {
        let mut pool = DataPool::new();
        let a = pool
            .intern(Value::map([
                ("autonomous_system_number", Value::from(13335u32)),
                ("autonomous_system_organization", Value::from("CLOUDFLARENET")),
            ]))
            .unwrap();
        let b = pool
            .intern(Value::map([
                ("autonomous_system_organization", Value::from("CLOUDFLARENET")),
                ("autonomous_system_number", Value::from(13335u32)),
            ]))
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_same_number_different_type_is_distinct() {
        let mut pool = DataPool::new();
        let a = pool.intern(Value::Uint16(7)).unwrap();
        let b = pool.intern(Value::Uint32(7)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_get_returns_value_and_encoding() {
        let mut pool = DataPool::new();
        let id = pool.intern(Value::from("US")).unwrap();
        let entry = pool.get(id).unwrap();

        assert_eq!(entry.value, Value::from("US"));
        assert_eq!(entry.encoded, vec![0x42, b'U', b'S']);
        assert!(pool.get(DataId(5)).is_none());
    }
}
