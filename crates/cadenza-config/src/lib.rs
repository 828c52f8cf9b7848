// SPDX-FileCopyrightText: 2026 Cadenza Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Cadenza runtime.
//!
//! TOML files are layered with figment (system, user, local, then
//! `CADENZA_*` environment variables), deserialized strictly with
//! `deny_unknown_fields`, validated, and reported as miette diagnostics
//! with "did you mean" suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use cadenza_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("enabled plugins: {:?}", config.plugins.enabled);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, SourceFiles, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CadenzaConfig;

/// Load from the standard locations (plus env overrides) and validate.
pub fn load_and_validate() -> Result<CadenzaConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || {
        SourceFiles::read(loader::config_paths())
    })
}

/// Load one explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<CadenzaConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        SourceFiles::read([path.to_path_buf()])
    })
}

/// Load a TOML string and validate. Env vars are not consulted.
pub fn load_and_validate_str(toml_content: &str) -> Result<CadenzaConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        SourceFiles::inline(toml_content)
    })
}

/// Sources are only read back when there is an error to point into.
fn checked(
    loaded: Result<CadenzaConfig, figment::Error>,
    sources: impl FnOnce() -> SourceFiles,
) -> Result<CadenzaConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::from_figment(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}
