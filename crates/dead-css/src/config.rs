//! Configuration loading.
//!
//! Options come from `dead-css.config.json`, or from a JavaScript config
//! module whose default export (or `module.exports`) is the options object.
//! Script configs are evaluated in the same sandbox as CSS modules, so they
//! may compute values but cannot import anything.

use camino::{Utf8Path, Utf8PathBuf};
use css_module_sandbox::{Exports, Sandbox, SandboxError};
use dead_css_core::DeadCssOptions;
use std::fs;
use thiserror::Error;

/// Config file names looked up next to the graph, in order.
pub const CONFIG_FILES: [&str; 3] = [
    "dead-css.config.json",
    "dead-css.config.js",
    "dead-css.config.mjs",
];

/// Why a config file could not be turned into options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error(transparent)]
    Script(#[from] SandboxError),

    #[error("the config module exports nothing")]
    NoExports,

    #[error("invalid options: {0}")]
    Options(#[source] serde_json::Error),
}

/// Finds the config file in `dir`, if any.
pub fn find(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Loads options from `path`, choosing the format by extension.
pub fn load(path: &Utf8Path) -> Result<DeadCssOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value = match path.extension() {
        Some("js" | "mjs" | "cjs") => evaluate_script(path, &content)?,
        _ => serde_json::from_str(&content).map_err(ConfigError::Json)?,
    };
    serde_json::from_value(value).map_err(ConfigError::Options)
}

/// Runs a config module and returns the exported options object.
fn evaluate_script(path: &Utf8Path, content: &str) -> Result<serde_json::Value, ConfigError> {
    let resolver = |_: &str| -> Option<Exports> { None };
    let mut exports = Sandbox::new(&resolver).run(path.as_str(), content)?;

    if let Some(default) = exports.shift_remove("default") {
        return Ok(default);
    }
    if exports.is_empty() {
        return Err(ConfigError::NoExports);
    }
    // CommonJS: `module.exports = { ... }` exposes the keys directly.
    Ok(serde_json::Value::Object(
        exports
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect(),
    ))
}
