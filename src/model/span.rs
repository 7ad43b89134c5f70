//! Character spans for text annotations
//!
//! A text-span annotation remembers where its text came from as a list of
//! `Span` ranges into the original source content. Positions are counted
//! in characters, not bytes, so derived segments line up regardless of the
//! source encoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from span projection
#[derive(Debug, Error)]
pub enum SpanError {
    #[error("range {start}..{end} exceeds segment length {len}")]
    OutOfRange {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
}

/// A half-open character range into the original source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True if the two ranges share at least one character position
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Total number of characters described by a span list
pub fn total_len(spans: &[Span]) -> usize {
    spans.iter().map(Span::len).sum()
}

/// Smallest single range covering every span in the list
pub fn envelope(spans: &[Span]) -> Option<Span> {
    let start = spans.iter().map(|s| s.start).min()?;
    let end = spans.iter().map(|s| s.end).max()?;
    Some(Span::new(start, end))
}

/// Extract sub-segments of a text segment.
///
/// `text` is the segment's own text and `spans` maps its character
/// positions back onto the original source content. Each `(start, end)`
/// range is relative to `text`; the returned text is the concatenation of
/// the extracted pieces and the returned spans locate those pieces in the
/// original source coordinates.
pub fn extract(
    text: &str,
    spans: &[Span],
    ranges: &[(usize, usize)],
) -> Result<(String, Vec<Span>), SpanError> {
    let chars: Vec<char> = text.chars().collect();

    let mut out_text = String::new();
    let mut out_spans = Vec::new();
    for &(start, end) in ranges {
        if start > end {
            return Err(SpanError::InvalidRange { start, end });
        }
        if end > chars.len() {
            return Err(SpanError::OutOfRange {
                start,
                end,
                len: chars.len(),
            });
        }
        out_text.extend(&chars[start..end]);
        out_spans.extend(project_range(spans, start, end));
    }
    Ok((out_text, out_spans))
}

/// Project one segment-relative range through the segment's span list.
fn project_range(spans: &[Span], start: usize, end: usize) -> Vec<Span> {
    let mut projected = Vec::new();
    let mut offset = 0;
    for span in spans {
        let lo = start.max(offset);
        let hi = end.min(offset + span.len());
        if lo < hi {
            projected.push(Span::new(
                span.start + (lo - offset),
                span.start + (hi - offset),
            ));
        }
        offset += span.len();
    }
    projected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_from_single_span() {
        // a segment covering chars 10..30 of the source
        let text: String = ('a'..='t').collect();
        let spans = vec![Span::new(10, 30)];

        let (sub, sub_spans) = extract(&text, &spans, &[(5, 8)]).unwrap();
        assert_eq!(sub, "fgh");
        assert_eq!(sub_spans, vec![Span::new(15, 18)]);
    }

    #[test]
    fn extract_across_discontinuous_spans() {
        // segment text "abcdef" stitched from source 0..3 and 10..13
        let spans = vec![Span::new(0, 3), Span::new(10, 13)];

        let (sub, sub_spans) = extract("abcdef", &spans, &[(2, 5)]).unwrap();
        assert_eq!(sub, "cde");
        assert_eq!(sub_spans, vec![Span::new(2, 3), Span::new(10, 12)]);
    }

    #[test]
    fn extract_counts_characters_not_bytes() {
        let text = "mère et sœur";
        let spans = vec![Span::new(0, 12)];

        let (sub, sub_spans) = extract(text, &spans, &[(8, 12)]).unwrap();
        assert_eq!(sub, "sœur");
        assert_eq!(sub_spans, vec![Span::new(8, 12)]);
    }

    #[test]
    fn extract_rejects_out_of_range() {
        let err = extract("abc", &[Span::new(0, 3)], &[(1, 9)]).unwrap_err();
        assert!(matches!(err, SpanError::OutOfRange { .. }));
    }

    #[test]
    fn overlap_is_strict() {
        let a = Span::new(0, 37);
        assert!(a.overlaps(&Span::new(17, 37)));
        assert!(!a.overlaps(&Span::new(37, 73)));
        assert!(!Span::new(66, 73).overlaps(&a));
    }

    #[test]
    fn envelope_covers_all_spans() {
        let spans = vec![Span::new(5, 8), Span::new(1, 3), Span::new(10, 12)];
        assert_eq!(envelope(&spans), Some(Span::new(1, 12)));
        assert_eq!(envelope(&[]), None);
    }
}
