//! Graph file I/O and summary formatting.

use crate::cli::SummaryFormat;
use camino::Utf8Path;
use dead_css_core::{CssAsset, ModuleRecord, RunSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

/// The serialized module graph a run reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    pub modules: Vec<ModuleRecord>,
    #[serde(default)]
    pub assets: Vec<CssAsset>,
}

impl Graph {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }

    /// Writes the graph to `path`, or to stdout when `None`.
    pub fn write(&self, path: Option<&Utf8Path>) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        match path {
            Some(path) => fs::write(path, json),
            None => io::stdout().lock().write_all(json.as_bytes()),
        }
    }
}

/// JSON form of a [`RunSummary`].
#[derive(Debug, Serialize)]
struct SummaryJson {
    modules: usize,
    passes: usize,
    patched: usize,
    kept: usize,
    assets: usize,
}

/// Formats a run summary.
pub fn format_summary(summary: &RunSummary, format: SummaryFormat) -> String {
    match format {
        SummaryFormat::Human => {
            let mut line = format!(
                "{} CSS module(s) compiled in {} pass(es): {} pruned, {} fully used",
                summary.modules, summary.passes, summary.patched, summary.kept
            );
            if summary.assets > 0 {
                line.push_str(&format!(", {} extracted asset(s) pruned", summary.assets));
            }
            line
        }
        SummaryFormat::Json => {
            let json = SummaryJson {
                modules: summary.modules,
                passes: summary.passes,
                patched: summary.patched,
                kept: summary.kept,
                assets: summary.assets,
            };
            serde_json::to_string(&json).unwrap_or_default()
        }
    }
}
