//! Splices a rebuilt `$css` block into module source without moving
//! anything around it.
//!
//! Generated modules delimit their stylesheet with two marker comments:
//!
//! ```text
//! // module
//! export const $css = { ... }
//! // exports
//! ```
//!
//! The replacement block is padded with spaces and newlines so that the
//! module keeps its exact byte length and line count. Source maps of the
//! surrounding bundle therefore stay valid without being regenerated.

use crate::error::DeadCssError;
use crate::record::ModuleId;
use source_map::{count_lines, SourceMapError, SourceMapV3};

/// Marker line opening the stylesheet block.
pub const MODULE_MARKER: &str = "// module\n";
/// Marker line closing the stylesheet block.
pub const EXPORTS_MARKER: &str = "// exports\n";

/// Binding holding the `$css` records of imported stylesheets.
const IMPORTS_BINDING: &str = "cssImports";
const SOURCE_ROOT: &str = "webpack://";

/// Builds the `export const $css = {...}` statement for pruned CSS.
pub fn build_css_block(
    pruned_css: &str,
    source_map: Option<&SourceMapV3>,
) -> Result<String, SourceMapError> {
    let content = serde_json::Value::String(pruned_css.to_string());
    let mut block = format!(
        "export const $css = {{\n\t id: module.id,\n\t content: {content},\n\t imports: {IMPORTS_BINDING}"
    );
    if let Some(map) = source_map {
        block.push_str(",\n\t sourceMap: ");
        // Field order of the struct, not the sorted keys of a JSON value.
        block.push_str(&map.to_json_string()?);
    }
    block.push_str("\n}");
    Ok(block)
}

/// Points map sources at the bundler's virtual file tree:
/// `webpack:///./src/a.css` becomes `/././src/a.css` under `webpack://`.
pub fn rewrite_map_sources(map: &mut SourceMapV3) {
    for source in &mut map.sources {
        let tail = match source.rfind("://") {
            Some(scheme) => &source[scheme + 3..],
            None => source.as_str(),
        };
        *source = format!("/.{tail}");
    }
    map.source_root = Some(SOURCE_ROOT.to_string());
}

/// Replaces the marked block of `source` with `block`.
///
/// The result has the same byte length and line count as `source`; the
/// closing marker stays on its original line.
pub fn patch(module: ModuleId, source: &str, block: &str) -> Result<String, DeadCssError> {
    let (start, end) =
        marker_span(source).ok_or(DeadCssError::PatchSentinelMissing { module })?;
    let original = &source[start..end];
    let old_bytes = original.len();
    let old_lines = count_lines(original);

    let bare = format!("{MODULE_MARKER}{block}{EXPORTS_MARKER}");
    let new_lines = count_lines(&bare);
    let overflow = || DeadCssError::PatchOverflow {
        module,
        old_bytes,
        old_lines,
        new_bytes: bare.len(),
        new_lines,
    };

    let newlines = old_lines.checked_sub(new_lines).ok_or_else(overflow)?;
    let spaces = old_bytes
        .checked_sub(bare.len() + newlines)
        .ok_or_else(overflow)?;

    let mut patched = String::with_capacity(source.len());
    patched.push_str(&source[..start]);
    patched.push_str(MODULE_MARKER);
    patched.push_str(block);
    patched.extend(std::iter::repeat(' ').take(spaces));
    patched.extend(std::iter::repeat('\n').take(newlines));
    patched.push_str(EXPORTS_MARKER);
    patched.push_str(&source[end..]);

    if patched.len() != source.len() || count_lines(&patched) != count_lines(source) {
        return Err(overflow());
    }
    Ok(patched)
}

/// From the first module marker to the end of the last exports marker
/// after it.
fn marker_span(source: &str) -> Option<(usize, usize)> {
    let start = source.find(MODULE_MARKER)?;
    let body = start + MODULE_MARKER.len();
    let end = source[body..].rfind(EXPORTS_MARKER)? + body + EXPORTS_MARKER.len();
    Some((start, end))
}
