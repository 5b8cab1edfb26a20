//! Range anchors
//!
//! A persisted, path-based encoding of a text selection inside a page's
//! text layer, replayable after the layer is rebuilt. An anchor records
//! the span index and span-level character offset of both ends, plus the
//! layer's content hash at capture time.
//!
//! Offsets address the span's full text, never its current segments:
//! wrapping splits segments but preserves span text, so an anchor
//! captured while search overlays (or any other wrappers) are live stays
//! valid after they are cleared and after the layer is rebuilt.
//!
//! Anchoring is best effort: a rebuilt layer with different text yields an
//! explicit [`AnchorError::Stale`] rather than a silently wrong range, and
//! a structurally incompatible path yields an out-of-bounds error the
//! caller is expected to skip and log, not propagate.
//!
//! String form:
//!
//! ```text
//! L3/0:5,1:2@a1b2c3d4e5f67890
//!  │ │ │ │ │ └── content hash at capture time
//!  │ │ │ └─┴──── end point (span 1, offset 2)
//!  │ │ └──────── character offset within the span's text
//!  │ └────────── span index within the layer
//!  └──────────── page number
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::model::TextLayer;

/// One end of an anchored range: a span index plus a character offset
/// into that span's full text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    pub span: usize,
    pub offset: usize,
}

impl AnchorPoint {
    pub fn new(span: usize, offset: usize) -> Self {
        Self { span, offset }
    }
}

impl Ord for AnchorPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.span, self.offset).cmp(&(other.span, other.offset))
    }
}

impl PartialOrd for AnchorPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Position-order comparison of two anchor points.
pub fn is_before(a: &AnchorPoint, b: &AnchorPoint) -> bool {
    a < b
}

/// A serialized selection range within one page's text layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeAnchor {
    /// 1-based page number.
    pub page_number: usize,
    pub start: AnchorPoint,
    pub end: AnchorPoint,
    /// Layer content hash at capture time.
    pub content_hash: String,
}

/// A resolved anchor, validated against a live layer. `start_offset` is
/// inclusive within the start span, `end_offset` counts characters into
/// the end span (exclusive range end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start_span: usize,
    pub start_offset: usize,
    pub end_span: usize,
    pub end_offset: usize,
}

/// Anchor resolution failures. All are soft: callers skip the affected
/// highlight and continue.
#[derive(Debug, Error)]
pub enum AnchorError {
    /// The layer was rebuilt with different text content.
    #[error("anchor is stale: captured against hash {expected}, layer has {found}")]
    Stale { expected: String, found: String },

    #[error("anchor is for page {anchor}, layer is page {layer}")]
    PageMismatch { anchor: usize, layer: usize },

    #[error("span index {index} out of bounds ({count} spans)")]
    SpanOutOfBounds { index: usize, count: usize },

    #[error("offset {offset} out of bounds in span {span}")]
    OffsetOutOfBounds { offset: usize, span: usize },

    #[error("anchor end precedes its start")]
    Inverted,
}

impl RangeAnchor {
    /// Capture an anchor from span-level character offsets against a live
    /// layer. `end_offset` counts characters into the end span (exclusive
    /// range end). The layer's current wrapper segmentation does not
    /// enter the anchor.
    pub fn capture(
        layer: &TextLayer,
        start_span: usize,
        start_offset: usize,
        end_span: usize,
        end_offset: usize,
    ) -> Result<Self, AnchorError> {
        check_point(layer, start_span, start_offset)?;
        check_point(layer, end_span, end_offset)?;

        let start = AnchorPoint::new(start_span, start_offset);
        let end = AnchorPoint::new(end_span, end_offset);
        if is_before(&end, &start) {
            return Err(AnchorError::Inverted);
        }
        Ok(Self {
            page_number: layer.page_number,
            start,
            end,
            content_hash: layer.content_hash().to_string(),
        })
    }

    /// Replay this anchor against a (possibly rebuilt) layer.
    pub fn resolve(&self, layer: &TextLayer) -> Result<ResolvedRange, AnchorError> {
        if self.page_number != layer.page_number {
            return Err(AnchorError::PageMismatch {
                anchor: self.page_number,
                layer: layer.page_number,
            });
        }
        if self.content_hash != layer.content_hash() {
            return Err(AnchorError::Stale {
                expected: self.content_hash.clone(),
                found: layer.content_hash().to_string(),
            });
        }

        check_point(layer, self.start.span, self.start.offset)?;
        check_point(layer, self.end.span, self.end.offset)?;
        if is_before(&self.end, &self.start) {
            return Err(AnchorError::Inverted);
        }

        Ok(ResolvedRange {
            start_span: self.start.span,
            start_offset: self.start.offset,
            end_span: self.end.span,
            end_offset: self.end.offset,
        })
    }

    /// Parse the compact string form.
    pub fn parse(input: &str) -> Result<Self, AnchorParseError> {
        parse(input)
    }
}

fn check_point(layer: &TextLayer, span_index: usize, offset: usize) -> Result<(), AnchorError> {
    let span = layer
        .spans
        .get(span_index)
        .ok_or(AnchorError::SpanOutOfBounds {
            index: span_index,
            count: layer.spans.len(),
        })?;
    if offset > span.char_len() {
        return Err(AnchorError::OffsetOutOfBounds {
            offset,
            span: span_index,
        });
    }
    Ok(())
}

impl fmt::Display for RangeAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{}/{},{}@{}",
            self.page_number, self.start, self.end, self.content_hash
        )
    }
}

impl fmt::Display for AnchorPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.span, self.offset)
    }
}

/// Anchor string parsing errors.
#[derive(Debug, Error)]
pub enum AnchorParseError {
    #[error("empty anchor string")]
    Empty,

    #[error("anchor must start with 'L'")]
    MissingPrefix,

    #[error("expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("missing content hash")]
    MissingHash,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), AnchorParseError> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(AnchorParseError::UnexpectedChar(
                self.peek().unwrap_or('\0'),
                self.pos,
            ))
        }
    }

    fn parse_number(&mut self) -> Result<usize, AnchorParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(AnchorParseError::ExpectedNumber(start));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| AnchorParseError::ExpectedNumber(start))
    }

    fn parse_point(&mut self) -> Result<AnchorPoint, AnchorParseError> {
        let span = self.parse_number()?;
        self.expect(':')?;
        let offset = self.parse_number()?;
        Ok(AnchorPoint::new(span, offset))
    }
}

fn parse(input: &str) -> Result<RangeAnchor, AnchorParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AnchorParseError::Empty);
    }

    let mut parser = Parser::new(input);
    if !parser.skip_if('L') {
        return Err(AnchorParseError::MissingPrefix);
    }

    let page_number = parser.parse_number()?;
    parser.expect('/')?;
    let start = parser.parse_point()?;
    parser.expect(',')?;
    let end = parser.parse_point()?;
    parser.expect('@')?;

    let content_hash = parser.input[parser.pos..].to_string();
    if content_hash.is_empty() {
        return Err(AnchorParseError::MissingHash);
    }

    Ok(RangeAnchor {
        page_number,
        start,
        end,
        content_hash,
    })
}
