//! TOML catalog files that replace the built-in option table.
//!
//! Format:
//!
//! ```toml
//! [[option]]
//! id = "cardkb"
//! category = "ext"
//! help = "Enable M5Stack CardKB support"
//! max_revision = "0.4"
//! requires = ["i2c0"]
//! ```
use serde::Deserialize;
use std::path::Path;

use super::{Category, DeviceRevision, ItemDef, Registry};
use crate::error::RegistryError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    option: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogEntry {
    id: String,
    category: String,
    title: Option<String>,
    #[serde(default)]
    help: String,
    min_revision: Option<String>,
    max_revision: Option<String>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    conflicts: Vec<String>,
}

impl CatalogEntry {
    fn into_def(self) -> Result<ItemDef, RegistryError> {
        let category: Category = self.category.parse()?;
        let rank = |rev: Option<String>| -> Result<Option<u8>, RegistryError> {
            rev.map(|r| r.parse::<DeviceRevision>().map(DeviceRevision::rank))
                .transpose()
                .map(Option::flatten)
        };
        Ok(ItemDef {
            title: self.title.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            category,
            help: self.help,
            min_rank: rank(self.min_revision)?,
            max_rank: rank(self.max_revision)?,
            requires: self.requires,
            conflicts: self.conflicts,
        })
    }
}

/// Parse a catalog from TOML text and build a validated [`Registry`].
///
/// Entry order in the file becomes registry order.
///
/// # Errors
///
/// Returns [`RegistryError::Catalog`] for TOML errors, and the usual
/// validation errors for bad categories, revisions or references.
pub fn parse(content: &str, origin: &str) -> Result<Registry, RegistryError> {
    let file: CatalogFile = toml::from_str(content).map_err(|e| RegistryError::Catalog {
        path: origin.to_string(),
        message: e.message().to_string(),
    })?;
    let defs = file
        .option
        .into_iter()
        .map(CatalogEntry::into_def)
        .collect::<Result<Vec<_>, _>>()?;
    Registry::from_defs(defs)
}

/// Load a catalog file from disk.
///
/// # Errors
///
/// Returns [`RegistryError::Catalog`] if the file cannot be read or parsed,
/// or a validation error if the catalog is malformed.
pub fn load(path: &Path) -> Result<Registry, RegistryError> {
    let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Catalog {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let registry = parse(&content, &path.display().to_string())?;
    tracing::debug!(path = %path.display(), options = registry.len(), "catalog loaded");
    Ok(registry)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[option]]
id = "i2c0"
category = "interface"
help = "Enable I2C0"

[[option]]
id = "i2s0"
category = "interface"
title = "I2S audio"
min_revision = "0.5"

[[option]]
id = "imu"
category = "ext"
max_revision = "0.4"
requires = ["i2c0"]
conflicts = ["i2s0"]
"#;

    #[test]
    fn parse_builds_registry_in_file_order() {
        let reg = parse(SAMPLE, "sample.toml").unwrap();
        let ids: Vec<&str> = reg.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["i2c0", "i2s0", "imu"]);
    }

    #[test]
    fn parse_resolves_bounds_and_edges() {
        let reg = parse(SAMPLE, "sample.toml").unwrap();
        let i2s = &reg.items()[1];
        assert_eq!(i2s.title, "I2S audio");
        assert_eq!(i2s.min_rank, Some(2));
        assert_eq!(i2s.max_rank, None);

        let imu = &reg.items()[2];
        assert_eq!(imu.category, Category::Extension);
        assert_eq!(imu.title, "imu");
        assert_eq!(imu.max_rank, Some(1));
        assert_eq!(imu.requires(), &[0]);
        assert_eq!(imu.declared_conflicts(), &[1]);
    }

    #[test]
    fn parse_rejects_unknown_category() {
        let err = parse("[[option]]\nid = \"x\"\ncategory = \"misc\"\n", "c.toml").unwrap_err();
        assert_eq!(err, RegistryError::UnknownCategory("misc".to_string()));
    }

    #[test]
    fn parse_rejects_unknown_revision() {
        let err = parse(
            "[[option]]\nid = \"x\"\ncategory = \"ext\"\nmin_revision = \"2.0\"\n",
            "c.toml",
        )
        .unwrap_err();
        assert_eq!(err, RegistryError::UnknownRevision("2.0".to_string()));
    }

    #[test]
    fn parse_rejects_unknown_fields() {
        let err = parse(
            "[[option]]\nid = \"x\"\ncategory = \"ext\"\ncolour = \"red\"\n",
            "c.toml",
        )
        .unwrap_err();
        assert!(matches!(err, RegistryError::Catalog { .. }));
    }

    #[test]
    fn empty_catalog_is_empty_registry() {
        let reg = parse("", "empty.toml").unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn load_missing_file_is_catalog_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, RegistryError::Catalog { .. }));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load(&path).unwrap().len(), 3);
    }
}
