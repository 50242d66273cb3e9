//! A single buildable database: one trie plus one data pool.

use std::collections::BTreeMap;
use std::io::Write;
use std::net::IpAddr;

use log::debug;

use crate::binary::{now_epoch, IpVersion, MmdbWriter, RecordSize};
use crate::error::InsertError;
use crate::network::{address_key, Family, NetworkPrefix, IPV4_EMBED_BITS};
use crate::pool::{DataId, DataPool};
use crate::trie::PrefixTrie;
use crate::{Result, Value};

/// Networks that share the IPv4 subtree in an IPv6 database.
pub const IPV4_ALIASES: [&str; 2] = ["::ffff:0:0/96", "2002::/16"];

/// Immutable options for one database build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
    pub database_type: String,
    pub description: BTreeMap<String, String>,
    pub languages: Vec<String>,
    pub record_size: RecordSize,
    pub ip_version: IpVersion,
    /// Alias IPv4-mapped and 6to4 space onto the IPv4 subtree.
    pub ipv4_aliasing: bool,
    /// Fixed build time; the current time is used when unset.
    pub build_epoch: Option<u64>,
}

impl DatabaseOptions {
    /// Dual-stack options with 24-bit records.
    pub fn new(database_type: &str) -> Self {
        Self {
            database_type: database_type.to_string(),
            description: BTreeMap::new(),
            languages: Vec::new(),
            record_size: RecordSize::Bits24,
            ip_version: IpVersion::V6,
            ipv4_aliasing: true,
            build_epoch: None,
        }
    }

    pub fn with_description(mut self, language: &str, text: &str) -> Self {
        self.description
            .insert(language.to_string(), text.to_string());
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_record_size(mut self, record_size: RecordSize) -> Self {
        self.record_size = record_size;
        self
    }

    pub fn with_ip_version(mut self, ip_version: IpVersion) -> Self {
        self.ip_version = ip_version;
        self
    }

    pub fn with_ipv4_aliasing(mut self, enabled: bool) -> Self {
        self.ipv4_aliasing = enabled;
        self
    }

    pub fn with_build_epoch(mut self, epoch: u64) -> Self {
        self.build_epoch = Some(epoch);
        self
    }

    pub(crate) fn aliasing_active(&self) -> bool {
        self.ipv4_aliasing && self.ip_version == IpVersion::V6
    }
}

/// Summary of a finished write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub node_count: u32,
    pub data_section_size: usize,
    pub total_size: usize,
}

/// Trie and data pool built together and serialized once.
///
/// Not internally synchronized: all inserts and the final write must be
/// sequenced by the owner.
///
/// # Examples
/// ```
/// use k2geo::{Database, DatabaseOptions, Value};
///
/// let mut db = Database::new(DatabaseOptions::new("Test"));
/// db.insert(&"203.0.113.0/24".parse().unwrap(), Value::from("US")).unwrap();
/// db.insert(&"203.0.113.128/25".parse().unwrap(), Value::from("CA")).unwrap();
///
/// assert_eq!(db.lookup("203.0.113.10".parse().unwrap()), Some(&Value::from("US")));
/// assert_eq!(db.lookup("203.0.113.200".parse().unwrap()), Some(&Value::from("CA")));
/// ```
#[derive(Debug)]
pub struct Database {
    options: DatabaseOptions,
    trie: PrefixTrie,
    pool: DataPool,
    aliases: Vec<NetworkPrefix>,
}

impl Database {
    pub fn new(options: DatabaseOptions) -> Self {
        let aliases = if options.aliasing_active() {
            IPV4_ALIASES
                .iter()
                .filter_map(|cidr| cidr.parse().ok())
                .collect()
        } else {
            Vec::new()
        };
        Self {
            trie: PrefixTrie::new(options.ip_version.tree_depth()),
            pool: DataPool::new(),
            options,
            aliases,
        }
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn trie(&self) -> &PrefixTrie {
        &self.trie
    }

    pub fn pool(&self) -> &DataPool {
        &self.pool
    }

    /// Intern `value` and attach it to `prefix`.
    pub fn insert(&mut self, prefix: &NetworkPrefix, value: Value) -> Result<DataId> {
        // Check the prefix first so a rejected insert leaves the pool untouched.
        let (key, len) = self.tree_key(prefix)?;
        let id = self.pool.intern(value)?;
        self.trie.insert(key, len, id);
        Ok(id)
    }

    /// Intern a value without attaching it to any network.
    pub fn intern(&mut self, value: Value) -> Result<DataId> {
        self.pool.intern(value)
    }

    /// Attach an already-interned value to `prefix`.
    pub fn insert_data(&mut self, prefix: &NetworkPrefix, id: DataId) -> Result<()> {
        let (key, len) = self.tree_key(prefix)?;
        self.trie.insert(key, len, id);
        Ok(())
    }

    /// Value of the most specific network containing `addr`.
    pub fn lookup(&self, addr: IpAddr) -> Option<&Value> {
        let key = match (self.options.ip_version, addr) {
            (IpVersion::V6, _) => address_key(addr),
            (IpVersion::V4, IpAddr::V4(v4)) => (u32::from(v4) as u128) << IPV4_EMBED_BITS,
            (IpVersion::V4, IpAddr::V6(_)) => return None,
        };
        let id = self.trie.lookup(key)?;
        self.pool.get(id).map(|entry| &entry.value)
    }

    /// Serialize into `out`. Consumes the database.
    pub fn write_to<W: Write>(self, mut out: W) -> Result<WriteStats> {
        let mut writer = MmdbWriter::new();
        let bytes = writer.write(self)?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(writer.stats(bytes.len()))
    }

    pub(crate) fn build_epoch(&self) -> u64 {
        self.options.build_epoch.unwrap_or_else(now_epoch)
    }

    /// Prepare the trie for writing: merge identical siblings, then alias.
    pub(crate) fn finalize(&mut self) {
        self.trie.merge_identical();
        if self.aliases.is_empty() {
            return;
        }
        let ipv4_root = self.trie.ensure_node(0, IPV4_EMBED_BITS);
        for alias in &self.aliases {
            debug!("aliasing {} to ::/{}", alias, IPV4_EMBED_BITS);
            self.trie.alias(alias.bits(), alias.len(), ipv4_root);
        }
    }

    pub(crate) fn parts(&self) -> (&DatabaseOptions, &PrefixTrie, &DataPool) {
        (&self.options, &self.trie, &self.pool)
    }

    fn tree_key(&self, prefix: &NetworkPrefix) -> std::result::Result<(u128, u8), InsertError> {
        match self.options.ip_version {
            IpVersion::V6 => {
                if self.aliases.iter().any(|alias| alias.covers(prefix)) {
                    return Err(InsertError::AliasedNetwork(prefix.to_string()));
                }
                Ok((prefix.bits(), prefix.len()))
            }
            IpVersion::V4 => match prefix.family() {
                Family::V4 => Ok((
                    prefix.bits() << IPV4_EMBED_BITS,
                    prefix.len() - IPV4_EMBED_BITS,
                )),
                Family::V6 => Err(InsertError::Ipv6InIpv4Database(prefix.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn prefix(cidr: &str) -> NetworkPrefix {
        cidr.parse().unwrap()
    }

    fn country(code: &str) -> Value {
        Value::map([("country", Value::map([("iso_code", Value::from(code))]))])
    }

    fn iso(db: &Database, ip: &str) -> Option<String> {
        db.lookup(ip.parse().unwrap())
            .and_then(|v| v.get("country"))
            .and_then(|c| c.get("iso_code"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    #[test]
    fn test_end_to_end_overlap() {
        let mut db = Database::new(DatabaseOptions::new("Test"));
        db.insert(&prefix("203.0.113.0/24"), country("US")).unwrap();
        db.insert(&prefix("203.0.113.128/25"), country("CA")).unwrap();

        assert_eq!(iso(&db, "203.0.113.10").as_deref(), Some("US"));
        assert_eq!(iso(&db, "203.0.113.200").as_deref(), Some("CA"));
        assert_eq!(iso(&db, "203.0.113.127").as_deref(), Some("US"));
        assert_eq!(iso(&db, "203.0.112.255"), None);
    }

    #[test]
    fn test_coarser_insert_discards_finer() {
        let mut db = Database::new(DatabaseOptions::new("Test"));
        db.insert(&prefix("203.0.113.128/25"), country("CA")).unwrap();
        db.insert(&prefix("203.0.113.0/24"), country("US")).unwrap();

        assert_eq!(iso(&db, "203.0.113.10").as_deref(), Some("US"));
        assert_eq!(iso(&db, "203.0.113.200").as_deref(), Some("US"));
    }

    #[test]
    fn test_dedup_across_prefixes() {
        let mut db = Database::new(DatabaseOptions::new("Test"));
        let a = db.insert(&prefix("1.0.0.0/24"), country("AU")).unwrap();
        let b = db.insert(&prefix("1.0.4.0/22"), country("AU")).unwrap();
        let c = db.insert(&prefix("2001:db8::/32"), country("AU")).unwrap();

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(db.pool().len(), 1);
    }

    #[test]
    fn test_aliased_network_rejected() {
        let mut db = Database::new(DatabaseOptions::new("Test"));
        let err = db
            .insert(&prefix("::ffff:1.2.3.0/120"), country("US"))
            .unwrap_err();
        assert!(matches!(err, Error::Insert(InsertError::AliasedNetwork(_))));

        let err = db.insert(&prefix("2002::/16"), country("US")).unwrap_err();
        assert!(matches!(err, Error::Insert(InsertError::AliasedNetwork(_))));
        assert!(db.pool().is_empty());
    }

    #[test]
    fn test_aliasing_disabled_allows_mapped_space() {
        let options = DatabaseOptions::new("Test").with_ipv4_aliasing(false);
        let mut db = Database::new(options);
        assert!(db.insert(&prefix("2002::/16"), country("US")).is_ok());
    }

    #[test]
    fn test_finalize_aliases_ipv4() {
        let mut db = Database::new(DatabaseOptions::new("Test"));
        db.insert(&prefix("8.8.8.0/24"), country("US")).unwrap();
        db.finalize();

        assert_eq!(iso(&db, "8.8.8.8").as_deref(), Some("US"));
        assert_eq!(iso(&db, "::ffff:8.8.8.8").as_deref(), Some("US"));
        assert_eq!(iso(&db, "2002:808:808::1").as_deref(), Some("US"));
        assert_eq!(iso(&db, "2002:909:909::1"), None);
    }

    #[test]
    fn test_ipv4_only_database() {
        let options = DatabaseOptions::new("Test").with_ip_version(IpVersion::V4);
        let mut db = Database::new(options);
        db.insert(&prefix("10.0.0.0/8"), country("ZZ")).unwrap();

        assert_eq!(iso(&db, "10.1.2.3").as_deref(), Some("ZZ"));
        assert_eq!(iso(&db, "11.0.0.1"), None);
        assert_eq!(iso(&db, "::a01:203"), None);

        let err = db.insert(&prefix("2001:db8::/32"), country("ZZ")).unwrap_err();
        assert!(matches!(err, Error::Insert(InsertError::Ipv6InIpv4Database(_))));
    }

    #[test]
    fn test_options_builder() {
        let options = DatabaseOptions::new("GeoIP2-ASN")
            .with_description("en", "ASN data")
            .with_languages(&["en"])
            .with_record_size(RecordSize::Bits28)
            .with_build_epoch(7);

        assert_eq!(options.database_type, "GeoIP2-ASN");
        assert_eq!(options.description.get("en").map(String::as_str), Some("ASN data"));
        assert_eq!(options.languages, vec!["en".to_string()]);
        assert_eq!(options.record_size, RecordSize::Bits28);
        assert_eq!(options.build_epoch, Some(7));
        assert!(options.aliasing_active());
    }
}
