//! Domain-specific error types for the configuration engine.
//!
//! Each subsystem returns its own [`thiserror`] enum:
//!
//! - [`RegistryError`]: catalog integrity, revision and category names
//! - [`ToggleError`]: enable/disable protocol outcomes
//! - [`StoreError`]: uEnv file load and atomic rewrite
//! - [`DeviceError`]: device-info probe
//!
//! Command handlers at the CLI boundary convert them to [`anyhow::Error`]
//! with `?` and add context there.

use thiserror::Error;

/// Errors that arise while building or querying the option registry.
///
/// These are authoring errors in the catalog, never user errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two options share the same identifier.
    #[error("duplicate option id '{0}'")]
    DuplicateId(String),

    /// A `requires` or `conflicts` entry names an option that does not exist.
    #[error("option '{option}' references unknown option '{reference}'")]
    UnknownReference {
        /// Option carrying the dangling reference.
        option: String,
        /// The identifier that could not be resolved.
        reference: String,
    },

    /// The `requires` graph contains a cycle.
    #[error("requires cycle detected: {0}")]
    DependencyCycle(String),

    /// A category name is not one of the two tracked categories.
    #[error("unknown category '{0}': must be one of interface, ext")]
    UnknownCategory(String),

    /// A device revision name could not be parsed.
    #[error("unknown device revision '{0}': must be one of 0.2, 0.3, 0.4, 0.5, 0.6")]
    UnknownRevision(String),

    /// A catalog file could not be read or parsed.
    #[error("failed to load catalog {path}: {message}")]
    Catalog {
        /// Path of the catalog file.
        path: String,
        /// Human-readable reason.
        message: String,
    },
}

/// Distinguishable failure signals of the toggle protocol.
///
/// Every variant leaves the configuration state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToggleError {
    /// The option (or one of its dependencies) is not permitted on this
    /// device revision.
    #[error("option '{option}' is unavailable on the current device revision")]
    Unavailable {
        /// Identifier of the unavailable option.
        option: String,
    },

    /// A conflicting option is enabled and no confirmation oracle was supplied.
    #[error("enabling '{option}' requires disabling '{conflict}', but no confirmation is available")]
    ConfirmationRequired {
        /// Option being enabled.
        option: String,
        /// First enabled option that conflicts with it.
        conflict: String,
    },

    /// The confirmation oracle declined one of the prompts.
    #[error("enabling '{option}' was cancelled")]
    UserRejected {
        /// Option being enabled.
        option: String,
    },

    /// Invalid option index or a registry-integrity failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors that arise from loading or rewriting the boot configuration file.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An I/O operation failed; the message carries the OS error text.
    #[error("failed to {action} {path}: {source}")]
    Io {
        /// Short description of the failed step (e.g. `"read"`, `"replace"`).
        action: &'static str,
        /// Path the operation was applied to.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while probing the device-info block.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// The block device could not be opened or read.
    #[error("failed to read device info from {path}: {source}")]
    Io {
        /// Path of the block device.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required `key=` field is absent from the device-info block.
    #[error("{0} not found in device info")]
    MissingField(&'static str),
}
