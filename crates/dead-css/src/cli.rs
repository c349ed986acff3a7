//! CLI argument parsing.

use crate::logging::LogFormat;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueEnum};
use dead_css_core::DeadCssOptions;

/// Removes unused CSS-module selectors from a bundled module graph.
#[derive(Debug, Parser)]
#[command(name = "dead-css")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Module graph to prune (JSON with `modules` and `assets`)
    pub graph: Utf8PathBuf,

    /// Configuration file (defaults to dead-css.config.{json,js,mjs} next to the graph)
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Write the pruned graph here instead of stdout
    #[arg(long, short)]
    pub output: Option<Utf8PathBuf>,

    /// Export names or literal selectors that are always kept
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Allow selectors containing ids
    #[arg(long = "allow-ids")]
    pub allow_ids: bool,

    /// Keep selectors without any class
    #[arg(long = "allow-non-class-selectors")]
    pub allow_non_class_selectors: bool,

    /// Allow classes combined with non-class compounds
    #[arg(long = "allow-non-class-combinators")]
    pub allow_non_class_combinators: bool,

    /// Prune this extracted asset instead of each module
    #[arg(long)]
    pub filename: Option<String>,

    /// Loader stage that marks a module as a CSS module
    #[arg(long)]
    pub loader: Option<String>,

    /// Run summary format
    #[arg(long, value_enum, default_value = "human")]
    pub summary: SummaryFormat,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Summary format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    /// One human-readable line (default)
    #[default]
    Human,
    /// JSON object
    Json,
}

impl Args {
    /// Layers command-line flags over options read from a file.
    pub fn apply(&self, options: &mut DeadCssOptions) {
        options.ignore.extend(self.ignore.iter().cloned());
        options.allow_ids |= self.allow_ids;
        options.allow_non_class_selectors |= self.allow_non_class_selectors;
        options.allow_non_class_combinators |= self.allow_non_class_combinators;
        if let Some(filename) = &self.filename {
            options.filename = Some(filename.clone());
        }
        if let Some(loader) = &self.loader {
            options.loader = loader.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["dead-css", "graph.json"]);
        assert_eq!(args.graph.as_str(), "graph.json");
        assert!(args.config.is_none());
        assert!(args.output.is_none());
        assert_eq!(args.summary, SummaryFormat::Human);
        assert_eq!(args.log_format, LogFormat::Compact);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_graph_is_required() {
        assert!(Args::try_parse_from(["dead-css"]).is_err());
    }

    #[test]
    fn test_repeated_flags() {
        let args = Args::parse_from([
            "dead-css",
            "graph.json",
            "--ignore",
            "title",
            "--ignore",
            ".global",
            "-vv",
            "--log-format",
            "json",
        ]);
        assert_eq!(args.ignore, vec!["title", ".global"]);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_flags_override_file_options() {
        let args = Args::parse_from([
            "dead-css",
            "graph.json",
            "--ignore",
            "b",
            "--allow-ids",
            "--filename",
            "main.css",
            "--loader",
            "my-css-loader",
        ]);
        let mut options = DeadCssOptions {
            ignore: vec!["a".to_string()],
            allow_non_class_selectors: true,
            ..DeadCssOptions::default()
        };
        args.apply(&mut options);

        assert_eq!(options.ignore, vec!["a", "b"]);
        assert!(options.allow_ids);
        assert!(options.allow_non_class_selectors);
        assert!(!options.allow_non_class_combinators);
        assert_eq!(options.filename.as_deref(), Some("main.css"));
        assert_eq!(options.loader, "my-css-loader");
    }
}
