//! Source Map revision 3 model, mapping codec and composition.
//!
//! Segment fields are VLQ-coded with `swc_sourcemap`; the JSON document is
//! kept as its own serde model so field order and unknown shapes follow what
//! bundlers emit.

use swc_sourcemap::vlq;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while reading a serialized source map.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceMapError {
    /// The JSON value is not a source map object.
    #[error("invalid source map: {0}")]
    Invalid(String),

    /// The `mappings` string could not be decoded.
    #[error("malformed mappings on line {line}: {segment:?}")]
    MalformedMappings {
        /// 0-indexed generated line of the bad segment.
        line: usize,
        /// The offending segment text.
        segment: String,
    },

    /// The map could not be serialized.
    #[error("cannot encode source map: {0}")]
    Encode(String),
}

/// A serialized Source Map v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapV3 {
    /// Always 3.
    pub version: u8,
    /// Name of the generated file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Prefix applied to every entry of `sources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Original source names.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Original source texts, parallel to `sources`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// Symbol names referenced by segments.
    #[serde(default)]
    pub names: Vec<String>,
    /// VLQ-encoded mappings.
    pub mappings: String,
}

/// Where a generated position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Index into `sources`.
    pub source: u32,
    /// 0-indexed original line.
    pub line: u32,
    /// 0-indexed original column.
    pub column: u32,
    /// Index into `names`.
    pub name: Option<u32>,
}

/// One decoded mapping segment of a generated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 0-indexed column in the generated line.
    pub generated_column: u32,
    /// Original position, absent for unmapped segments.
    pub source: Option<SourcePosition>,
}

impl SourceMapV3 {
    /// Parses a map from a JSON value, as found in a CSS module's `$css.sourceMap`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, SourceMapError> {
        serde_json::from_value(value.clone()).map_err(|e| SourceMapError::Invalid(e.to_string()))
    }

    /// Serializes this map to a JSON value.
    pub fn to_json(&self) -> Result<serde_json::Value, SourceMapError> {
        serde_json::to_value(self).map_err(|e| SourceMapError::Encode(e.to_string()))
    }

    /// Serializes this map to JSON text, fields in declaration order.
    pub fn to_json_string(&self) -> Result<String, SourceMapError> {
        serde_json::to_string(self).map_err(|e| SourceMapError::Encode(e.to_string()))
    }

    /// Builds a map from decoded per-line segments.
    pub fn from_segments(
        sources: Vec<String>,
        sources_content: Option<Vec<Option<String>>>,
        lines: &[Vec<Segment>],
    ) -> Result<Self, SourceMapError> {
        Ok(Self {
            version: 3,
            file: None,
            source_root: None,
            sources,
            sources_content,
            names: Vec::new(),
            mappings: encode_mappings(lines)?,
        })
    }

    /// Decodes `mappings` into per-line segments.
    pub fn decode(&self) -> Result<Vec<Vec<Segment>>, SourceMapError> {
        let mut lines = Vec::new();
        let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);

        for (line_no, text) in self.mappings.split(';').enumerate() {
            let mut segments = Vec::new();
            let mut generated_column = 0i64;

            for raw in text.split(',').filter(|s| !s.is_empty()) {
                let malformed = || SourceMapError::MalformedMappings {
                    line: line_no,
                    segment: raw.to_string(),
                };
                let values = vlq::parse_vlq_segment(raw).map_err(|_| malformed())?;
                generated_column += values[0];
                let position = match values.len() {
                    1 => None,
                    4 | 5 => {
                        source += values[1];
                        line += values[2];
                        column += values[3];
                        let name = values.get(4).map(|delta| {
                            name += delta;
                            name as u32
                        });
                        Some(SourcePosition {
                            source: source as u32,
                            line: line as u32,
                            column: column as u32,
                            name,
                        })
                    }
                    _ => return Err(malformed()),
                };
                if generated_column < 0 || source < 0 || line < 0 || column < 0 {
                    return Err(malformed());
                }
                segments.push(Segment {
                    generated_column: generated_column as u32,
                    source: position,
                });
            }
            lines.push(segments);
        }

        Ok(lines)
    }

    /// Rewrites this map (generated → intermediate) through `previous`
    /// (intermediate → original), like `applySourceMap` in JS tooling.
    ///
    /// Each segment is resolved to the greatest segment of `previous` on the
    /// same intermediate line whose column does not exceed it. Segments that
    /// resolve to nothing, or to an unmapped segment, are dropped. Sources, contents, names and root come
    /// from `previous`.
    pub fn compose(&self, previous: &SourceMapV3) -> Result<SourceMapV3, SourceMapError> {
        let ours = self.decode()?;
        let theirs = previous.decode()?;

        let lines: Vec<Vec<Segment>> = ours
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .filter_map(|segment| {
                        let at = segment.source?;
                        let resolved = theirs
                            .get(at.line as usize)?
                            .iter()
                            .take_while(|s| s.generated_column <= at.column)
                            .last()?
                            .source?;
                        Some(Segment {
                            generated_column: segment.generated_column,
                            source: Some(resolved),
                        })
                    })
                    .collect()
            })
            .collect();

        Ok(SourceMapV3 {
            version: 3,
            file: self.file.clone(),
            source_root: previous.source_root.clone(),
            sources: previous.sources.clone(),
            sources_content: previous.sources_content.clone(),
            names: previous.names.clone(),
            mappings: encode_mappings(&lines)?,
        })
    }
}

fn encode_mappings(lines: &[Vec<Segment>]) -> Result<String, SourceMapError> {
    let mut out = String::new();
    let mut fields = Vec::with_capacity(5);
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);

    for (idx, segments) in lines.iter().enumerate() {
        if idx > 0 {
            out.push(';');
        }
        let mut generated_column = 0i64;
        for (n, segment) in segments.iter().enumerate() {
            if n > 0 {
                out.push(',');
            }
            fields.clear();
            fields.push(i64::from(segment.generated_column) - generated_column);
            generated_column = i64::from(segment.generated_column);

            if let Some(position) = segment.source {
                fields.push(i64::from(position.source) - source);
                fields.push(i64::from(position.line) - line);
                fields.push(i64::from(position.column) - column);
                source = i64::from(position.source);
                line = i64::from(position.line);
                column = i64::from(position.column);
                if let Some(id) = position.name {
                    fields.push(i64::from(id) - name);
                    name = i64::from(id);
                }
            }
            let encoded = vlq::generate_vlq_segment(&fields)
                .map_err(|e| SourceMapError::Encode(e.to_string()))?;
            out.push_str(&encoded);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(mappings: &str) -> SourceMapV3 {
        SourceMapV3 {
            version: 3,
            file: None,
            source_root: None,
            sources: vec!["a.css".into()],
            sources_content: None,
            names: Vec::new(),
            mappings: mappings.into(),
        }
    }

    #[test]
    fn test_decode_relative_fields() {
        let lines = map("AAAA,KAAK;AACA").decode().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0][1].generated_column, 5);
        assert_eq!(lines[0][1].source.unwrap().column, 5);
        assert_eq!(lines[1][0].generated_column, 0);
        let second = lines[1][0].source.unwrap();
        assert_eq!((second.line, second.column), (1, 5));
    }

    #[test]
    fn test_encode_decode_stable() {
        let original = map("AAAA,KAAK;;AACA,IAAI");
        let lines = original.decode().unwrap();
        assert_eq!(encode_mappings(&lines).unwrap(), original.mappings);
    }

    #[test]
    fn test_malformed_mappings() {
        let err = map("AAAA;AA").decode().unwrap_err();
        assert_eq!(
            err,
            SourceMapError::MalformedMappings {
                line: 1,
                segment: "AA".into()
            }
        );
    }

    #[test]
    fn test_compose_resolves_through_previous() {
        // ours: generated 0:0 -> intermediate 1:4
        let ours = map("AACI");
        // previous: intermediate line 1 has segments at col 0 (-> 3:0) and col 2 (-> 7:2)
        let mut previous = map(";AAGA,EAIE");
        previous.sources = vec!["webpack:///./src/a.css".into()];

        let composed = ours.compose(&previous).unwrap();
        assert_eq!(composed.sources, previous.sources);
        let lines = composed.decode().unwrap();
        let resolved = lines[0][0].source.unwrap();
        assert_eq!((resolved.line, resolved.column), (7, 2));
    }

    #[test]
    fn test_compose_drops_segment_resolving_to_unmapped() {
        // previous line 0: col 0 -> 0:0, col 5 unmapped
        let previous = map("AAAA,K");
        let near = map("AAAA");
        let past = map("AAAK");

        let lines = near.compose(&previous).unwrap().decode().unwrap();
        assert_eq!(lines[0].len(), 1);
        assert_eq!(lines[0][0].source.unwrap().column, 0);

        // Column 5 lands on the unmapped segment, not on the one at column 0.
        let lines = past.compose(&previous).unwrap().decode().unwrap();
        assert!(lines[0].is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_characters() {
        assert!(matches!(
            map("AA*A").decode(),
            Err(SourceMapError::MalformedMappings { line: 0, .. })
        ));
    }

    #[test]
    fn test_serde_camel_case() {
        let json = serde_json::json!({
            "version": 3,
            "sources": ["a.css"],
            "sourcesContent": [".a{}"],
            "names": [],
            "mappings": "AAAA",
            "sourceRoot": ""
        });
        let parsed = SourceMapV3::from_json(&json).unwrap();
        assert_eq!(parsed.source_root.as_deref(), Some(""));
        assert_eq!(parsed.to_json().unwrap()["sourcesContent"][0], ".a{}");
    }
}
