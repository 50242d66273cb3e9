//! Aggregated JSON source files.
//!
//! Each `*aggregated.json` file under a source root is one source unit. Files
//! are discovered recursively and returned sorted by path, so the order units
//! are applied in never depends on directory iteration order.

mod asn;
mod country;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub use asn::AsnFile;
pub use country::CountryFile;

/// File name suffix of source files.
pub const SOURCE_FILE_SUFFIX: &str = "aggregated.json";

/// IPv4 and IPv6 subnet lists of a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Subnets {
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub ipv6: Vec<String>,
}

impl Subnets {
    /// IPv4 subnets followed by IPv6 subnets.
    pub fn all(&self) -> Vec<&str> {
        self.ipv4
            .iter()
            .chain(self.ipv6.iter())
            .map(String::as_str)
            .collect()
    }
}

/// A source file type that carries its own path as unit id.
pub trait SourceFile: DeserializeOwned {
    fn set_id(&mut self, id: String);
}

/// Read and parse one source file.
pub fn load<T: SourceFile>(path: &Path) -> Result<T> {
    let data = fs::read(path)?;
    let mut file: T = serde_json::from_slice(&data)?;
    file.set_id(path.display().to_string());
    Ok(file)
}

/// All source files under `root`, sorted by path.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files).map_err(|source| Error::Walk {
        path: root.display().to_string(),
        source,
    })?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk(&path, files)?;
        } else if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(SOURCE_FILE_SUFFIX))
        {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discover_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("us")).unwrap();
        fs::create_dir_all(root.join("ca/nested")).unwrap();
        fs::write(root.join("us/aggregated.json"), "{}").unwrap();
        fs::write(root.join("ca/nested/aggregated.json"), "{}").unwrap();
        fs::write(root.join("ca/ipv4-aggregated.json"), "{}").unwrap();
        fs::write(root.join("ca/readme.md"), "").unwrap();
        fs::write(root.join("us/aggregated.json.bak"), "").unwrap();

        let files = discover(root).unwrap();
        let relative: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("ca/ipv4-aggregated.json"),
                PathBuf::from("ca/nested/aggregated.json"),
                PathBuf::from("us/aggregated.json"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root() {
        let result = discover(Path::new("/nonexistent/k2geo/source"));
        assert!(matches!(result, Err(Error::Walk { .. })));
    }

    #[test]
    fn test_subnets_order() {
        let subnets = Subnets {
            ipv4: vec!["1.0.0.0/24".to_string()],
            ipv6: vec!["2001:db8::/32".to_string()],
        };
        assert_eq!(subnets.all(), vec!["1.0.0.0/24", "2001:db8::/32"]);
    }

    #[test]
    fn test_load_bad_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aggregated.json");
        fs::write(&path, "{ not json").unwrap();

        let result = load::<CountryFile>(&path);
        assert!(matches!(result, Err(Error::Json(_))));
    }
}
