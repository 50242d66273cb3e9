//! Database build tasks.
//!
//! A build walks one source root, applies every source file to a fresh
//! [`Database`] and writes it to one output file. Independent builds share no
//! state and run on their own threads; their results are joined into a
//! [`BuildReport`].

use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread;

use crate::binary::RecordSize;
use crate::database::WriteStats;
use crate::inserter::{ApplyStats, Inserter, SourceUnit};
use crate::source::{self, AsnFile, CountryFile, SourceFile};
use crate::{Database, DatabaseOptions, Error, Result};

/// Database flavours produced by the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    Country,
    Asn,
}

impl DatabaseKind {
    /// `database_type` written to the metadata.
    pub fn database_type(&self) -> &'static str {
        match self {
            DatabaseKind::Country => "GeoIP2-Country",
            DatabaseKind::Asn => "GeoIP2-ASN",
        }
    }

    /// Default source root.
    pub fn default_source(&self) -> &'static str {
        match self {
            DatabaseKind::Country => "rir-ip/country",
            DatabaseKind::Asn => "asn-ip/as",
        }
    }

    /// Default output file.
    pub fn default_output(&self) -> &'static str {
        match self {
            DatabaseKind::Country => "GeoIP2-Country.mmdb",
            DatabaseKind::Asn => "GeoIP2-ASN.mmdb",
        }
    }

    /// Default options for this kind.
    pub fn options(&self) -> DatabaseOptions {
        let options = DatabaseOptions::new(self.database_type());
        match self {
            DatabaseKind::Country => options
                .with_languages(&["en"])
                .with_description("en", "Country data aggregated from RIR delegations"),
            DatabaseKind::Asn => {
                options.with_description("en", "Autonomous system data aggregated from RIR delegations")
            }
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseKind::Country => write!(f, "country"),
            DatabaseKind::Asn => write!(f, "ASN"),
        }
    }
}

/// One requested build. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub kind: DatabaseKind,
    pub source_root: PathBuf,
    pub output: PathBuf,
    pub options: DatabaseOptions,
    /// Re-open the written file with a MaxMind DB reader.
    pub verify: bool,
}

impl BuildRequest {
    pub fn new(kind: DatabaseKind, source_root: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            kind,
            source_root: source_root.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            options: kind.options(),
            verify: false,
        }
    }

    pub fn with_record_size(mut self, record_size: RecordSize) -> Self {
        self.options.record_size = record_size;
        self
    }

    pub fn with_build_epoch(mut self, epoch: u64) -> Self {
        self.options.build_epoch = Some(epoch);
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.output.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub kind: DatabaseKind,
    pub output: PathBuf,
    pub files_found: usize,
    pub files_unreadable: usize,
    pub apply: ApplyStats,
    pub write: WriteStats,
    /// Lowercase hex SHA-256 of the output file.
    pub sha256: String,
}

/// Run one build to completion.
pub fn build(request: &BuildRequest) -> Result<BuildOutcome> {
    info!(
        "Starting {} MMDB generation. Source: {}, Output: {}",
        request.kind,
        request.source_root.display(),
        request.output.display()
    );

    let files = source::discover(&request.source_root)?;
    let (files_found, files_unreadable, apply, db) = match request.kind {
        DatabaseKind::Country => populate::<CountryFile>(request, &files),
        DatabaseKind::Asn => populate::<AsnFile>(request, &files),
    };
    info!(
        "Applied {} {} files: {} networks inserted, {} skipped, {} files rejected",
        apply.units_applied,
        request.kind,
        apply.prefixes_inserted,
        apply.prefixes_skipped,
        apply.units_rejected + files_unreadable
    );

    // Write next to the target and rename, so a failed write never leaves a
    // truncated database behind.
    let temp_path = request.temp_path();
    let write = match write_file(db, &temp_path) {
        Ok(write) => write,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
    };
    fs::rename(&temp_path, &request.output)?;

    let bytes = fs::read(&request.output)?;
    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    if request.verify {
        verify(request, &bytes, &write)?;
    }

    info!(
        "Successfully created {} ({} bytes, {} nodes, sha256 {})",
        request.output.display(),
        write.total_size,
        write.node_count,
        sha256
    );

    Ok(BuildOutcome {
        kind: request.kind,
        output: request.output.clone(),
        files_found,
        files_unreadable,
        apply,
        write,
        sha256,
    })
}

fn populate<T>(request: &BuildRequest, files: &[PathBuf]) -> (usize, usize, ApplyStats, Database)
where
    T: SourceFile + SourceUnit,
{
    let mut units = Vec::with_capacity(files.len());
    let mut unreadable = 0;
    for path in files {
        debug!("Processing {} file: {}", request.kind, path.display());
        match source::load::<T>(path) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                warn!("Error processing {} file {}: {}", request.kind, path.display(), e);
                unreadable += 1;
            }
        }
    }

    let mut db = Database::new(request.options.clone());
    let apply = Inserter::new(&mut db).apply(units);
    (files.len(), unreadable, apply, db)
}

fn write_file(db: Database, path: &Path) -> Result<WriteStats> {
    let file = File::create(path)?;
    let stats = db.write_to(BufWriter::new(&file))?;
    file.sync_all()?;
    Ok(stats)
}

/// Check the written bytes with an independent MaxMind DB reader.
fn verify(request: &BuildRequest, bytes: &[u8], write: &WriteStats) -> Result<()> {
    let reader = maxminddb::Reader::from_source(bytes)
        .map_err(|e| Error::Verify(format!("{}: {}", request.output.display(), e)))?;
    let meta = &reader.metadata;

    if meta.database_type != request.options.database_type {
        return Err(Error::Verify(format!(
            "database_type is {:?}, expected {:?}",
            meta.database_type, request.options.database_type
        )));
    }
    if meta.node_count != write.node_count {
        return Err(Error::Verify(format!(
            "node_count is {}, expected {}",
            meta.node_count, write.node_count
        )));
    }
    if meta.record_size != request.options.record_size.bits() {
        return Err(Error::Verify(format!(
            "record_size is {}, expected {}",
            meta.record_size,
            request.options.record_size.bits()
        )));
    }
    debug!("Verified {}", request.output.display());
    Ok(())
}

/// Joined results of independent builds.
#[derive(Debug)]
pub struct BuildReport {
    pub results: Vec<(DatabaseKind, Result<BuildOutcome>)>,
}

impl BuildReport {
    /// True when every attempted build succeeded.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, result)| result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (DatabaseKind, &Error)> {
        self.results
            .iter()
            .filter_map(|(kind, result)| result.as_ref().err().map(|e| (*kind, e)))
    }

    pub fn successes(&self) -> impl Iterator<Item = &BuildOutcome> {
        self.results.iter().filter_map(|(_, result)| result.as_ref().ok())
    }
}

/// Run every request on its own thread and wait for all of them.
///
/// A failing or panicking build never affects its siblings.
pub fn run_builds(requests: &[BuildRequest]) -> BuildReport {
    let results = thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|request| (request.kind, scope.spawn(move || build(request))))
            .collect();

        handles
            .into_iter()
            .map(|(kind, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(Error::Task(format!("{} build panicked", kind)))
                });
                (kind, result)
            })
            .collect()
    });

    BuildReport { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_kind_defaults() {
        assert_eq!(DatabaseKind::Country.database_type(), "GeoIP2-Country");
        assert_eq!(DatabaseKind::Asn.database_type(), "GeoIP2-ASN");
        assert_eq!(DatabaseKind::Country.default_source(), "rir-ip/country");
        assert_eq!(DatabaseKind::Asn.default_output(), "GeoIP2-ASN.mmdb");
        assert_eq!(DatabaseKind::Country.options().record_size, RecordSize::Bits24);
    }

    #[test]
    fn test_temp_path() {
        let request = BuildRequest::new(DatabaseKind::Asn, "src", "out/GeoIP2-ASN.mmdb");
        assert_eq!(request.temp_path(), PathBuf::from("out/GeoIP2-ASN.mmdb.tmp"));
    }

    #[test]
    fn test_missing_source_root_fails_build() {
        let dir = tempdir().unwrap();
        let request = BuildRequest::new(
            DatabaseKind::Country,
            dir.path().join("missing"),
            dir.path().join("out.mmdb"),
        );

        assert!(matches!(build(&request), Err(Error::Walk { .. })));
        assert!(!dir.path().join("out.mmdb").exists());
    }

    #[test]
    fn test_unwritable_output_fails_build() {
        let dir = tempdir().unwrap();
        let request = BuildRequest::new(
            DatabaseKind::Asn,
            dir.path(),
            dir.path().join("no/such/dir/out.mmdb"),
        );

        assert!(matches!(build(&request), Err(Error::Io(_))));
    }

    #[test]
    fn test_empty_source_root_builds_empty_database() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir(&source).unwrap();
        let request = BuildRequest::new(DatabaseKind::Country, &source, dir.path().join("c.mmdb"))
            .with_verify(true);

        let outcome = build(&request).unwrap();
        assert_eq!(outcome.files_found, 0);
        assert_eq!(outcome.apply, ApplyStats::default());
        assert_eq!(outcome.sha256.len(), 64);
        assert!(!dir.path().join("c.mmdb.tmp").exists());
    }
}
