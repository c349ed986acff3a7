//! Main orchestration logic.

use crate::cli::Args;
use crate::config::{self, ConfigError};
use crate::output::Graph;
use camino::{Utf8Path, Utf8PathBuf};
use css_pruner::{DeadSelectorPruner, PruneError, SelectorViolation};
use dead_css_core::{DeadCss, DeadCssError, DeadCssOptions, RunSummary};
use miette::Diagnostic;
use std::fs;
use thiserror::Error;

/// Errors reported by the CLI.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to read {path}")]
    #[diagnostic(code(dead_css::read))]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", .path.as_deref().map_or("stdout", Utf8Path::as_str))]
    #[diagnostic(code(dead_css::write))]
    Write {
        path: Option<Utf8PathBuf>,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a module graph")]
    #[diagnostic(
        code(dead_css::graph),
        help("expected a JSON object with a `modules` array and an optional `assets` array")
    )]
    Graph {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load configuration from {path}")]
    #[diagnostic(
        code(dead_css::config),
        help("accepted keys: ignore, allowIds, allowNonClassSelectors, allowNonClassCombinators, filename, loader")
    )]
    Config {
        path: Utf8PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("dead CSS removal failed")]
    #[diagnostic(code(dead_css::run))]
    Run {
        #[source]
        source: DeadCssError,
        #[help]
        help: Option<String>,
    },
}

impl From<DeadCssError> for CliError {
    fn from(source: DeadCssError) -> Self {
        let help = run_help(&source);
        CliError::Run { source, help }
    }
}

fn run_help(error: &DeadCssError) -> Option<String> {
    let help = match error {
        DeadCssError::Convergence { .. } => {
            "a module reads an import that never compiled; check that every imported stylesheet is part of the graph"
        }
        DeadCssError::UsageMismatch { .. } => {
            "usage data and compiled exports disagree; was the graph produced from the same build?"
        }
        DeadCssError::PatchSentinelMissing { .. } | DeadCssError::PatchOverflow { .. } => {
            "the module was not generated by a compatible CSS loader"
        }
        DeadCssError::AssetNotFound { .. } => "`filename` must name one of the graph's assets",
        DeadCssError::Prune {
            source: PruneError::DisallowedSelector { reason, .. },
            ..
        } => match reason {
            SelectorViolation::NoClass => "pass --allow-non-class-selectors to keep such selectors",
            SelectorViolation::Id => "pass --allow-ids to accept id selectors",
            SelectorViolation::NonClassCombinator => {
                "pass --allow-non-class-combinators to accept such selectors"
            }
        },
        _ => return None,
    };
    Some(help.to_string())
}

/// Loads options and the graph, prunes, writes the result.
pub fn run(args: &Args) -> Result<RunSummary, CliError> {
    let mut options = load_options(args)?;
    args.apply(&mut options);
    tracing::debug!(?options, "resolved options");

    let content = fs::read_to_string(&args.graph).map_err(|source| CliError::Read {
        path: args.graph.clone(),
        source,
    })?;
    let mut graph = Graph::parse(&content).map_err(|source| CliError::Graph {
        path: args.graph.clone(),
        source,
    })?;

    let summary =
        DeadCss::new(options, DeadSelectorPruner).run(&mut graph.modules, &mut graph.assets)?;

    graph
        .write(args.output.as_deref())
        .map_err(|source| CliError::Write {
            path: args.output.clone(),
            source,
        })?;
    Ok(summary)
}

fn load_options(args: &Args) -> Result<DeadCssOptions, CliError> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let dir = args.graph.parent().unwrap_or(Utf8Path::new(""));
            match config::find(dir) {
                Some(path) => path,
                None => return Ok(DeadCssOptions::default()),
            }
        }
    };
    tracing::info!(config = %path, "loading configuration");
    config::load(&path).map_err(|source| CliError::Config { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const SOURCE: &str = "const cssImports = [];\n\
// module\n\
export const $css = {\n\
\t id: module.id,\n\
\t content: \".used-hash{color:red} .unused-hash{color:blue}\",\n\
\t imports: cssImports\n\
}\n\
// exports\n\
export const used = \"used-hash\";\n\
export const unused = \"unused-hash\";\n";

    fn graph_json() -> String {
        serde_json::json!({
            "modules": [{
                "id": 1,
                "context": "/app/src",
                "name": "/app/node_modules/css-loader/index.js!/app/src/a.css",
                "source": SOURCE,
                "stages": ["/app/node_modules/css-loader/index.js"],
                "usedExports": ["used"]
            }]
        })
        .to_string()
    }

    fn setup() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("graph.json"), graph_json()).unwrap();
        (dir, root)
    }

    fn args(root: &Utf8Path, extra: &[&str]) -> Args {
        let graph = root.join("graph.json");
        let output = root.join("out.json");
        let mut argv = vec!["dead-css", graph.as_str(), "--output", output.as_str()];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn read_output(root: &Utf8Path) -> Graph {
        Graph::parse(&fs::read_to_string(root.join("out.json")).unwrap()).unwrap()
    }

    #[test]
    fn test_prunes_graph_file() {
        let (_dir, root) = setup();
        let summary = run(&args(&root, &[])).unwrap();
        assert_eq!(summary.patched, 1);

        let graph = read_output(&root);
        let source = &graph.modules[0].source;
        assert_eq!(source.len(), SOURCE.len());
        assert!(source.contains(r#"content: ".used-hash{color:red}""#));
        assert!(!source.contains(".unused-hash{"));
    }

    #[test]
    fn test_config_next_to_graph() {
        let (_dir, root) = setup();
        fs::write(
            root.join("dead-css.config.json"),
            r#"{ "ignore": ["unused"] }"#,
        )
        .unwrap();
        run(&args(&root, &[])).unwrap();
        assert_eq!(read_output(&root).modules[0].source, SOURCE);
    }

    #[test]
    fn test_explicit_config_and_flags() {
        let (_dir, root) = setup();
        let config = root.join("custom.js");
        fs::write(&config, r#"export default { loader: "other-loader" };"#).unwrap();

        // The configured loader matches nothing.
        let summary = run(&args(&root, &["--config", config.as_str()])).unwrap();
        assert_eq!(summary.modules, 0);

        // A flag wins over the file.
        let summary = run(&args(
            &root,
            &["--config", config.as_str(), "--loader", "css-loader"],
        ))
        .unwrap();
        assert_eq!(summary.modules, 1);
    }

    #[test]
    fn test_error_reporting() {
        let (_dir, root) = setup();
        fs::write(root.join("graph.json"), "[]").unwrap();
        assert!(matches!(
            run(&args(&root, &[])),
            Err(CliError::Graph { .. })
        ));

        let err = run(&args(&root, &["--config", "/nonexistent.json"])).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.code().map(|c| c.to_string()).as_deref(), Some("dead_css::config"));
    }

    #[test]
    fn test_run_errors_carry_help() {
        let (_dir, root) = setup();
        let err = run(&args(&root, &["--filename", "main.css"])).unwrap_err();
        assert!(matches!(
            &err,
            CliError::Run {
                source: DeadCssError::AssetNotFound { .. },
                ..
            }
        ));
        assert_eq!(
            err.help().map(|h| h.to_string()).as_deref(),
            Some("`filename` must name one of the graph's assets")
        );
    }
}
