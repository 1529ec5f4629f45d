//! Subcommand implementations and the setup they share.

pub mod device;
pub mod list;
pub mod show;
pub mod toggle;
pub mod version;

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::cli::GlobalOpts;
use crate::device::DeviceInfo;
use crate::logging::Logger;
use crate::registry::{self, DeviceRevision, Registry, catalog};
use crate::uenv::UenvFile;

/// Environment variable overriding the default uEnv path.
pub const UENV_PATH_ENV: &str = "EPASS_UENV_PATH";

/// uEnv path used when neither `--uenv` nor the environment names one.
pub const DEFAULT_UENV_PATH: &str = "/boot/uEnv.txt";

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates path resolution, registry loading, revision detection and
/// file loading so that each command does not have to repeat the
/// boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved uEnv path.
    pub uenv_path: PathBuf,
    /// Option catalog in effect.
    pub registry: Registry,
    /// Revision used for availability checks.
    pub revision: DeviceRevision,
    /// Loaded uEnv file.
    pub file: UenvFile,
}

impl CommandSetup {
    /// Resolve the uEnv path, load the registry, detect the revision, and
    /// load the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog is invalid, the device cannot be
    /// probed (and no `--revision` was given), or the file cannot be read.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let uenv_path = resolve_uenv_path(global.uenv.as_deref(), std::env::var(UENV_PATH_ENV).ok());
        log.debug(&format!("uEnv path: {}", uenv_path.display()));

        let registry = resolve_registry(global)?;
        log.debug(&format!("{} options in catalog", registry.len()));

        let revision = resolve_revision(global)?;
        log.debug(&format!("device: {revision}"));
        if revision == DeviceRevision::Unknown {
            log.warn("device revision not recognised; no option can be enabled");
        }

        let file = UenvFile::load(&uenv_path)?;

        Ok(Self {
            uenv_path,
            registry,
            revision,
            file,
        })
    }
}

/// Pick the uEnv path: explicit flag, then a non-empty environment value,
/// then [`DEFAULT_UENV_PATH`].
#[must_use]
pub fn resolve_uenv_path(flag: Option<&Path>, env: Option<String>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    env.filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_UENV_PATH), PathBuf::from)
}

/// What this run will act on, for the log file header.
///
/// Nothing is probed or read here; the revision entry says where the
/// revision will come from.
#[must_use]
pub fn session_context(global: &GlobalOpts) -> Vec<(&'static str, String)> {
    let uenv = resolve_uenv_path(global.uenv.as_deref(), std::env::var(UENV_PATH_ENV).ok());
    let revision = global.revision.map_or_else(
        || format!("probe {}", global.devcfg.display()),
        |r| format!("{r} (--revision)"),
    );
    let catalog = global
        .catalog
        .as_ref()
        .map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
    let mut context = vec![
        ("uenv", uenv.display().to_string()),
        ("revision", revision),
        ("catalog", catalog),
    ];
    if global.dry_run {
        context.push(("mode", "dry run".to_string()));
    }
    context
}

/// Load the catalog named by `--catalog`, or the built-in one.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or is malformed.
pub fn resolve_registry(global: &GlobalOpts) -> Result<Registry> {
    match &global.catalog {
        Some(path) => Ok(catalog::load(path)?),
        None => Ok(registry::load_registry()?),
    }
}

/// Use `--revision` if given, otherwise probe the device.
///
/// # Errors
///
/// Returns an error if probing fails.
pub fn resolve_revision(global: &GlobalOpts) -> Result<DeviceRevision> {
    if let Some(revision) = global.revision {
        return Ok(revision);
    }
    let info = DeviceInfo::probe(&global.devcfg).with_context(|| {
        format!(
            "cannot detect device revision from {} (use --revision to set it)",
            global.devcfg.display()
        )
    })?;
    Ok(info.revision)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::device::DEFAULT_DEVCFG_PATH;
    use crate::error::RegistryError;

    fn global() -> GlobalOpts {
        GlobalOpts {
            uenv: None,
            revision: None,
            devcfg: PathBuf::from(DEFAULT_DEVCFG_PATH),
            catalog: None,
            dry_run: false,
        }
    }

    #[test]
    fn uenv_flag_wins_over_env() {
        let flag = Path::new("/explicit/uEnv.txt");
        let path = resolve_uenv_path(Some(flag), Some("/env/uEnv.txt".to_string()));
        assert_eq!(path, flag);
    }

    #[test]
    fn uenv_env_used_when_non_empty() {
        let path = resolve_uenv_path(None, Some("/env/uEnv.txt".to_string()));
        assert_eq!(path, PathBuf::from("/env/uEnv.txt"));
    }

    #[test]
    fn uenv_default_when_env_empty_or_unset() {
        assert_eq!(
            resolve_uenv_path(None, Some(String::new())),
            PathBuf::from(DEFAULT_UENV_PATH)
        );
        assert_eq!(resolve_uenv_path(None, None), PathBuf::from(DEFAULT_UENV_PATH));
    }

    #[test]
    fn revision_override_skips_probe() {
        let mut g = global();
        g.revision = Some(DeviceRevision::V0_2);
        g.devcfg = PathBuf::from("/definitely/not/here");
        assert_eq!(resolve_revision(&g).unwrap(), DeviceRevision::V0_2);
    }

    #[test]
    fn probe_failure_suggests_override() {
        let dir = tempfile::tempdir().unwrap();
        let mut g = global();
        g.devcfg = dir.path().join("mtdblock0");
        let err = resolve_revision(&g).unwrap_err();
        assert!(format!("{err}").contains("--revision"), "{err}");
    }

    #[test]
    fn session_context_names_revision_source() {
        let mut g = global();
        g.uenv = Some(PathBuf::from("/mnt/boot/uEnv.txt"));
        let context = session_context(&g);
        assert_eq!(context[0], ("uenv", "/mnt/boot/uEnv.txt".to_string()));
        assert_eq!(context[1], ("revision", "probe /dev/mtdblock0".to_string()));
        assert_eq!(context[2], ("catalog", "built-in".to_string()));
        assert_eq!(context.len(), 3);

        g.revision = Some(DeviceRevision::V0_5);
        g.dry_run = true;
        let context = session_context(&g);
        assert_eq!(context[1].1, "EPass 0.5 (--revision)");
        assert_eq!(context[3], ("mode", "dry run".to_string()));
    }

    #[test]
    fn builtin_registry_without_catalog() {
        assert_eq!(resolve_registry(&global()).unwrap().len(), 12);
    }

    #[test]
    fn catalog_errors_keep_their_type_through_anyhow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, "[[option]]\nid = \"x\"\ncategory = \"misc\"\n").unwrap();
        let mut g = global();
        g.catalog = Some(path);
        let err = resolve_registry(&g).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::UnknownCategory(name)) if name == "misc"
        ));
    }

    #[test]
    fn catalog_flag_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, "[[option]]\nid = \"x\"\ncategory = \"ext\"\n").unwrap();
        let mut g = global();
        g.catalog = Some(path);
        assert_eq!(resolve_registry(&g).unwrap().len(), 1);
    }
}
