//! Conservation score responses (UCSC getData shape).
//!
//! The service returns spans in 0-based half-open coordinates under a key
//! named after the chromosome. Spans are shifted to 1-based positions here.

use locus_core::{Chromosome, ParseError};
use serde_json::Value;

use super::{parse_json, ResponseAdapter};

const SERVICE: &str = "conservation";

/// A run of positions sharing one score, in 1-based half-open coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSpan {
    pub start: u64,
    pub end: u64,
    pub value: f32,
}

impl ScoreSpan {
    /// Per-position samples for the part of this span inside `[start, end)`.
    pub fn positions_within(&self, start: u64, end: u64) -> impl Iterator<Item = (u64, f32)> {
        let value = self.value;
        (self.start.max(start)..self.end.min(end)).map(move |pos| (pos, value))
    }
}

/// Adapter for one chromosome's score track.
#[derive(Debug, Clone)]
pub struct ConservationAdapter {
    chrom: Chromosome,
}

impl ConservationAdapter {
    pub fn for_chrom(chrom: Chromosome) -> Self {
        Self { chrom }
    }

    fn span(item: &Value) -> Option<ScoreSpan> {
        let start = item.get("start")?.as_u64()?;
        let end = item.get("end")?.as_u64()?;
        let value = item.get("value")?.as_f64()?;
        if end <= start || !value.is_finite() {
            return None;
        }
        Some(ScoreSpan {
            start: start + 1,
            end: end + 1,
            value: value as f32,
        })
    }
}

impl ResponseAdapter for ConservationAdapter {
    type Output = Vec<ScoreSpan>;

    fn service(&self) -> &'static str {
        SERVICE
    }

    fn parse(&self, body: &str) -> Result<Self::Output, ParseError> {
        let json = parse_json(SERVICE, body)?;
        let object = json
            .as_object()
            .ok_or_else(|| ParseError::invalid(SERVICE, "expected a JSON object"))?;

        if let Some(error) = object.get("error").and_then(Value::as_str) {
            return Err(ParseError::invalid(SERVICE, error));
        }

        let items = match object.get(self.chrom.as_str()) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ParseError::invalid(
                    SERVICE,
                    format!("{} is not an array", self.chrom),
                ));
            }
        };

        let mut spans: Vec<ScoreSpan> = items.iter().filter_map(Self::span).collect();
        spans.sort_by_key(|s| s.start);
        Ok(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> ConservationAdapter {
        ConservationAdapter::for_chrom(Chromosome::parse("1").unwrap())
    }

    #[test]
    fn test_parse_shifts_to_one_based() {
        let body = r#"{"genome":"hg38","track":"phyloP100way","chrom":"chr1",
            "chr1":[{"start":99,"end":100,"value":3.2},{"start":100,"end":103,"value":-0.5}]}"#;
        let spans = adapter().parse(body).unwrap();
        assert_eq!(
            spans,
            vec![
                ScoreSpan { start: 100, end: 101, value: 3.2 },
                ScoreSpan { start: 101, end: 104, value: -0.5 },
            ]
        );
    }

    #[test]
    fn test_positions_within_clips() {
        let span = ScoreSpan { start: 100, end: 110, value: 1.0 };
        let positions: Vec<u64> = span.positions_within(105, 200).map(|(p, _)| p).collect();
        assert_eq!(positions, vec![105, 106, 107, 108, 109]);
        assert_eq!(span.positions_within(200, 300).count(), 0);
    }

    #[test]
    fn test_bad_items_are_skipped() {
        let body = r#"{"chr1":[{"start":5,"end":5,"value":1.0},{"start":1},"x",{"start":1,"end":2,"value":0.25}]}"#;
        let spans = adapter().parse(body).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, 2);
    }

    #[test]
    fn test_missing_chromosome_is_empty() {
        assert!(adapter().parse(r#"{"chr2":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_shapes_are_parse_failures() {
        assert!(adapter().parse("[]").is_err());
        assert!(adapter().parse("not json").is_err());
        assert!(adapter().parse(r#"{"chr1":{"start":1}}"#).is_err());
        assert!(adapter().parse(r#"{"error":"track not found"}"#).is_err());
    }
}
