//! Span-level mapping builder used while a transform assembles its output.

use crate::line_index::LineIndex;
use crate::v3::{Segment, SourceMapError, SourceMapV3, SourcePosition};
use crate::{ByteOffset, Span};
use text_size::TextSize;

/// A single mapping from generated position to original position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// The span in the generated output.
    pub generated: Span,
    /// The span in the original source.
    pub original: Span,
}

impl Mapping {
    /// True when the generated text is a verbatim copy of the original span.
    #[inline]
    pub fn is_copy(&self) -> bool {
        self.generated.len() == self.original.len()
    }
}

/// Mappings from generated byte spans back to original byte spans.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    /// Sorted by generated position.
    mappings: Vec<Mapping>,
}

impl SourceMap {
    /// Creates a source map builder.
    pub fn builder() -> SourceMapBuilder {
        SourceMapBuilder::new()
    }

    /// Returns the number of mappings in this source map.
    #[inline]
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Returns true if this source map has no mappings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Returns an iterator over all mappings.
    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.iter()
    }

    /// Finds the original position corresponding to a generated position.
    pub fn original_position(&self, generated: ByteOffset) -> Option<ByteOffset> {
        let idx = match self
            .mappings
            .binary_search_by(|m| m.generated.start.cmp(&generated))
        {
            Ok(idx) => idx,
            Err(idx) => idx.checked_sub(1)?,
        };
        let mapping = self
            .mappings
            .get(idx)
            .filter(|m| m.generated.contains(generated))?;
        let delta = u32::from(generated) - u32::from(mapping.generated.start);
        Some(mapping.original.start + TextSize::from(delta))
    }

    /// Encodes the mappings as a Source Map v3 with a single source.
    ///
    /// Every mapping produces a segment at its generated start. Verbatim
    /// copies additionally get a segment at the start of each generated line
    /// they span, so multi-line rules stay mapped line by line. Columns are
    /// byte columns.
    pub fn to_v3(
        &self,
        original: &str,
        generated: &str,
        source_name: &str,
    ) -> Result<SourceMapV3, SourceMapError> {
        let original_index = LineIndex::new(original);
        let generated_index = LineIndex::new(generated);
        let mut lines: Vec<Vec<Segment>> = vec![Vec::new(); generated_index.line_count()];

        let mut push = |generated_offset: ByteOffset, original_offset: ByteOffset| {
            let at = generated_index.line_col(generated_offset);
            let from = original_index.line_col(original_offset);
            lines[at.line as usize].push(Segment {
                generated_column: at.col,
                source: Some(SourcePosition {
                    source: 0,
                    line: from.line,
                    column: from.col,
                    name: None,
                }),
            });
        };

        for mapping in &self.mappings {
            push(mapping.generated.start, mapping.original.start);
            if !mapping.is_copy() {
                continue;
            }
            let text = mapping.generated.text(generated);
            for (idx, _) in text.match_indices('\n') {
                let delta = TextSize::from((idx + 1) as u32);
                if mapping.generated.start + delta < mapping.generated.end {
                    push(
                        mapping.generated.start + delta,
                        mapping.original.start + delta,
                    );
                }
            }
        }

        for line in &mut lines {
            line.sort_by_key(|s| s.generated_column);
            line.dedup_by_key(|s| s.generated_column);
        }

        SourceMapV3::from_segments(
            vec![source_name.to_string()],
            Some(vec![Some(original.to_string())]),
            &lines,
        )
    }
}

/// A builder for constructing source maps during transformation.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    mappings: Vec<Mapping>,
    /// Current position in the generated output.
    generated_offset: ByteOffset,
}

impl SourceMapBuilder {
    /// Creates a new source map builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current generated offset.
    #[inline]
    pub fn generated_offset(&self) -> ByteOffset {
        self.generated_offset
    }

    /// Records text copied unchanged from `original`.
    pub fn add_source(&mut self, original: Span) {
        self.add_transformed(original, u32::from(original.len()));
    }

    /// Records generated text of `generated_len` bytes that stands for `original`.
    pub fn add_transformed(&mut self, original: Span, generated_len: u32) {
        let start = self.generated_offset;
        let end = start + TextSize::from(generated_len);
        self.mappings.push(Mapping {
            generated: Span::new(start, end),
            original,
        });
        self.generated_offset = end;
    }

    /// Records generated text without a corresponding original position.
    pub fn add_generated(&mut self, text: &str) {
        self.generated_offset += TextSize::from(text.len() as u32);
    }

    /// Builds the final source map.
    pub fn build(mut self) -> SourceMap {
        self.mappings.sort_by_key(|m| m.generated.start);
        SourceMap {
            mappings: self.mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_add_source() {
        let mut builder = SourceMapBuilder::new();
        builder.add_source(Span::from(0..5));
        builder.add_generated(" ");
        builder.add_source(Span::from(10..15));

        let map = builder.build();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.original_position(TextSize::from(4)),
            Some(TextSize::from(4))
        );
        assert_eq!(map.original_position(TextSize::from(5)), None);
        assert_eq!(
            map.original_position(TextSize::from(6)),
            Some(TextSize::from(10))
        );
    }

    #[test]
    fn test_to_v3_maps_each_copied_line() {
        let original = ".gone{}\n.kept {\n  color: red;\n}";
        let generated = ".kept {\n  color: red;\n}";
        let mut builder = SourceMapBuilder::new();
        builder.add_source(Span::from(8..original.len()));
        let map = builder.build().to_v3(original, generated, "a.css").unwrap();

        assert_eq!(map.sources, vec!["a.css".to_string()]);
        assert_eq!(map.mappings, "AACA;AACA;AACA");
    }
}
