//! Source position tracking and Source Map v3 support for dead-css.
//!
//! Two layers live here:
//! - byte-level bookkeeping ([`Span`], [`LineIndex`], [`SourceMapBuilder`]) used
//!   while a transform copies or rewrites pieces of a text, and
//! - the serialized [Source Map v3](https://sourcemaps.info/spec.html) model
//!   ([`SourceMapV3`]) with segment coding on top of `swc_sourcemap`'s VLQ
//!   codec and composition with a previous map, which is what bundlers
//!   exchange.

mod builder;
mod line_index;
mod span;
mod v3;

pub use builder::{Mapping, SourceMap, SourceMapBuilder};
pub use line_index::{count_lines, LineCol, LineIndex};
pub use span::{ByteOffset, Span};
pub use v3::{Segment, SourceMapError, SourceMapV3, SourcePosition};
