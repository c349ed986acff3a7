//! One pruning run over a module graph.

use crate::cache::ModuleCache;
use crate::compiler::SandboxCompiler;
use crate::error::DeadCssError;
use crate::exports::CompiledExports;
use crate::options::DeadCssOptions;
use crate::patch::{build_css_block, patch, rewrite_map_sources};
use crate::path::strip_loader_prefix;
use crate::record::{CssAsset, ModuleRecord};
use crate::scheduler::compile_all;
use crate::usage::{all_selectors, ignored_selectors, used_selectors, Usage};
use css_pruner::{CssPruner, PruneRequest, SelectorSet};
use camino::Utf8Path;
use rayon::prelude::*;
use source_map::SourceMapV3;
use std::sync::Arc;

/// Counts reported by [`DeadCss::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Modules that went through the configured loader.
    pub modules: usize,
    /// Compile passes needed to converge.
    pub passes: usize,
    /// Modules whose source was rewritten.
    pub patched: usize,
    /// Modules left untouched because all their exports are used.
    pub kept: usize,
    /// Extracted assets rewritten.
    pub assets: usize,
}

/// Removes unused selectors from the stylesheets of a module graph.
#[derive(Debug, Clone)]
pub struct DeadCss<P> {
    options: DeadCssOptions,
    pruner: P,
}

impl<P: CssPruner> DeadCss<P> {
    pub fn new(options: DeadCssOptions, pruner: P) -> Self {
        Self { options, pruner }
    }

    pub fn options(&self) -> &DeadCssOptions {
        &self.options
    }

    /// Compiles every qualifying module, then prunes either each module's
    /// `$css` block in place or the extracted asset named by
    /// [`DeadCssOptions::filename`].
    ///
    /// Nothing is modified unless the whole run succeeds.
    #[tracing::instrument(skip_all, fields(modules = modules.len()))]
    pub fn run(
        &self,
        modules: &mut [ModuleRecord],
        assets: &mut [CssAsset],
    ) -> Result<RunSummary, DeadCssError> {
        let qualifying: Vec<usize> = modules
            .iter()
            .enumerate()
            .filter(|(_, module)| self.options.qualifies(module))
            .map(|(index, _)| index)
            .collect();
        let records: Vec<&ModuleRecord> = qualifying.iter().map(|&index| &modules[index]).collect();

        let mut compiler = SandboxCompiler::new();
        let report = compile_all(&mut compiler, &records)?;
        let cache = compiler.into_cache();

        let mut summary = RunSummary {
            modules: records.len(),
            passes: report.passes,
            ..RunSummary::default()
        };

        match &self.options.filename {
            Some(name) => {
                self.prune_asset(name, &records, &cache, assets)?;
                summary.assets = 1;
            }
            None => {
                let patched: Vec<Option<String>> = records
                    .par_iter()
                    .map(|module| self.prune_module(module, &cache))
                    .collect::<Result<_, _>>()?;

                for (index, source) in qualifying.into_iter().zip(patched) {
                    match source {
                        Some(source) => {
                            modules[index].source = source;
                            summary.patched += 1;
                        }
                        None => summary.kept += 1,
                    }
                }
            }
        }

        tracing::info!(
            modules = summary.modules,
            passes = summary.passes,
            patched = summary.patched,
            kept = summary.kept,
            assets = summary.assets,
            "dead css removed"
        );
        Ok(summary)
    }

    /// New source of `module`, or `None` when it must stay as is.
    fn prune_module(
        &self,
        module: &ModuleRecord,
        cache: &ModuleCache,
    ) -> Result<Option<String>, DeadCssError> {
        let exports = lookup(cache, module)?;
        let used = match used_selectors(module, exports)? {
            Usage::KeepAll => {
                tracing::trace!(module = %module.id, "all exports used");
                return Ok(None);
            }
            Usage::Selectors(used) => used,
        };
        let css = exports
            .css()
            .ok_or(DeadCssError::MissingCssMetadata { module: module.id })?;
        let ignore = ignored_selectors(&self.options.ignore, exports);

        let origin = module.id.to_string();
        let prev_map = parse_map(css.source_map.as_ref(), &origin)?;
        let request = PruneRequest {
            css: &css.content,
            from: css.file.as_deref().unwrap_or(&module.name),
            to: output_file(module),
            prev_map: prev_map.as_ref(),
            used: &used,
            ignore: &ignore,
            policy: self.options.policy(),
            emit_map: prev_map.is_some(),
        };
        let output = self
            .pruner
            .prune(request)
            .map_err(|source| DeadCssError::Prune { origin, source })?;

        let mut map = output.map;
        if let Some(map) = &mut map {
            rewrite_map_sources(map);
        }
        tracing::trace!(
            module = %module.id,
            before = css.content.len(),
            after = output.css.len(),
            "pruned"
        );
        let block = build_css_block(&output.css, map.as_ref())
            .map_err(|source| DeadCssError::InvalidSourceMap {
                origin: module.id.to_string(),
                source,
            })?;
        patch(module.id, &module.source, &block).map(Some)
    }

    /// Prunes the asset `name` with the usage of all modules at once.
    fn prune_asset(
        &self,
        name: &str,
        modules: &[&ModuleRecord],
        cache: &ModuleCache,
        assets: &mut [CssAsset],
    ) -> Result<(), DeadCssError> {
        let mut used = SelectorSet::new();
        let mut ignore = SelectorSet::new();
        for module in modules {
            let exports = lookup(cache, module)?;
            match used_selectors(module, exports)? {
                Usage::KeepAll => used.extend(all_selectors(exports)),
                Usage::Selectors(selectors) => used.extend(selectors),
            }
            ignore.extend(ignored_selectors(&self.options.ignore, exports));
        }

        let asset = assets
            .iter_mut()
            .find(|asset| asset.name == name)
            .ok_or_else(|| DeadCssError::AssetNotFound {
                name: name.to_string(),
            })?;
        let prev_map = parse_map(asset.source_map.as_ref(), name)?;
        let request = PruneRequest {
            css: &asset.content,
            from: name,
            to: name,
            prev_map: prev_map.as_ref(),
            used: &used,
            ignore: &ignore,
            policy: self.options.policy(),
            emit_map: prev_map.is_some(),
        };
        let output = self
            .pruner
            .prune(request)
            .map_err(|source| DeadCssError::Prune {
                origin: name.to_string(),
                source,
            })?;

        tracing::debug!(
            asset = name,
            used = used.len(),
            before = asset.content.len(),
            after = output.css.len(),
            "pruned extracted asset"
        );
        asset.content = output.css;
        if let Some(map) = output.map {
            let json = map
                .to_json()
                .map_err(|source| DeadCssError::InvalidSourceMap {
                    origin: name.to_string(),
                    source,
                })?;
            asset.source_map = Some(json);
        }
        Ok(())
    }
}

/// Name written to the `file` of a rebuilt map: the file name of the
/// module's resource, the way the loader's own map names its output.
fn output_file(module: &ModuleRecord) -> &str {
    let resource = strip_loader_prefix(module.request.as_deref().unwrap_or(&module.name));
    Utf8Path::new(resource).file_name().unwrap_or(resource)
}

fn lookup<'a>(
    cache: &'a ModuleCache,
    module: &ModuleRecord,
) -> Result<&'a Arc<CompiledExports>, DeadCssError> {
    // Keyed by path: two records for one file share a single compilation.
    cache
        .get_path(&SandboxCompiler::module_key(module))
        .ok_or(DeadCssError::MissingCssMetadata { module: module.id })
}

fn parse_map(
    value: Option<&serde_json::Value>,
    origin: &str,
) -> Result<Option<SourceMapV3>, DeadCssError> {
    value
        .map(SourceMapV3::from_json)
        .transpose()
        .map_err(|source| DeadCssError::InvalidSourceMap {
            origin: origin.to_string(),
            source,
        })
}
