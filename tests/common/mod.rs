// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed boot partition and a fluent builder
// so each integration test can set up an isolated uEnv.txt without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use epass_config::registry::Registry;
use epass_config::state::ConfigState;
use epass_config::uenv::UenvFile;

/// A typical uEnv.txt shipped on the SD card image.
pub const STOCK_UENV: &str = "\
# EPass boot environment
bootdelay=0
console=ttyS0,115200
interface=i2c0
ext=
bootcmd=run load_kernel; bootz
";

/// An isolated boot partition backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct BootPartition {
    /// Temporary directory standing in for `/boot`.
    pub root: tempfile::TempDir,
}

impl BootPartition {
    /// Create an empty partition.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        Self { root }
    }

    /// Path of the uEnv file inside the partition.
    pub fn uenv_path(&self) -> PathBuf {
        self.root.path().join("uEnv.txt")
    }

    /// Write raw bytes as the uEnv file.
    #[must_use]
    pub fn with_uenv(self, content: impl AsRef<[u8]>) -> Self {
        std::fs::write(self.uenv_path(), content).expect("write uEnv.txt");
        self
    }

    /// Write a file next to the uEnv file and return its path.
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// Current raw content of the uEnv file.
    pub fn read_uenv(&self) -> Vec<u8> {
        std::fs::read(self.uenv_path()).expect("read uEnv.txt")
    }

    /// Current content of the uEnv file as text.
    pub fn read_uenv_string(&self) -> String {
        String::from_utf8(self.read_uenv()).expect("uEnv.txt is UTF-8")
    }

    /// Load the uEnv file through the store.
    pub fn load(&self) -> UenvFile {
        UenvFile::load(&self.uenv_path()).expect("load uEnv.txt")
    }
}

/// Built-in registry.
pub fn builtin_registry() -> Registry {
    Registry::builtin().expect("built-in registry is valid")
}

/// Write `state` back to `path` through the store, the way the enable and
/// disable commands do.
pub fn save_state(path: &Path, file: &UenvFile, state: &ConfigState<'_>) {
    use epass_config::registry::Category;
    use epass_config::uenv::{join_tokens, write_file};

    let interface = join_tokens(&state.build_tokens(Category::Interface));
    let ext = join_tokens(&state.build_tokens(Category::Extension));
    write_file(path, file, &interface, &ext).expect("write uEnv.txt");
}
