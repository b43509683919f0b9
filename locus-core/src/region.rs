//! Genomic coordinates: chromosome names, intervals and regions.

use crate::{LocusResult, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest valid 1-based position.
pub const MIN_POSITION: u64 = 1;

static REGION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_.]+)\s*:\s*([0-9,]+)\s*-\s*([0-9,]+)\s*$")
        .expect("region pattern is valid")
});

// ============================================================================
// CHROMOSOME
// ============================================================================

/// A chromosome name in canonical `chr`-prefixed form.
///
/// `"1"`, `"chr1"` and `"CHR1"` all normalize to `chr1`; the mitochondrial
/// aliases `M`, `MT` and `chrMT` normalize to `chrM`. The inner string is
/// private so a non-canonical name cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chromosome(String);

impl Chromosome {
    /// Normalize a user or service supplied chromosome name.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        let body = strip_chr_prefix(trimmed);

        if body.is_empty()
            || !body
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(ValidationError::InvalidChromosome {
                name: name.to_string(),
            });
        }

        let body = if body.eq_ignore_ascii_case("m") || body.eq_ignore_ascii_case("mt") {
            "M".to_string()
        } else if body.len() == 1 {
            body.to_ascii_uppercase()
        } else {
            body.to_string()
        };

        Ok(Self(format!("chr{}", body)))
    }

    /// Canonical name, e.g. `chr1`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name without the `chr` prefix, as some services expect (`1`, `X`, `MT`).
    pub fn bare(&self) -> &str {
        &self.0[3..]
    }
}

fn strip_chr_prefix(name: &str) -> &str {
    if name.len() >= 3 && name[..3].eq_ignore_ascii_case("chr") {
        &name[3..]
    } else {
        name
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Chromosome {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Chromosome> for String {
    fn from(value: Chromosome) -> Self {
        value.0
    }
}

// ============================================================================
// INTERVAL
// ============================================================================

/// Half-open interval `[start, end)` over 1-based genomic positions.
///
/// Invariant: `start < end`. Zero-length intervals are rejected at
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    start: u64,
    end: u64,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Result<Self, ValidationError> {
        if start >= end {
            return Err(ValidationError::InvalidInterval {
                start,
                end,
                reason: "start must be less than end".to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of positions covered.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_position(&self, position: u64) -> bool {
        self.start <= position && position < self.end
    }

    /// Smallest interval covering both.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Pad both sides by up to `buffer` positions without letting the result
    /// exceed `max_span`. Intervals already at or beyond `max_span` are
    /// returned unchanged. The start never drops below [`MIN_POSITION`]
    /// unless it already was.
    pub fn widen(&self, buffer: u64, max_span: u64) -> Interval {
        let len = self.len();
        if len >= max_span {
            return *self;
        }
        let pad = buffer.min((max_span - len) / 2);
        let floor = MIN_POSITION.min(self.start);
        Interval {
            start: self.start.saturating_sub(pad).max(floor),
            end: self.end.saturating_add(pad),
        }
    }

    /// Snap the boundaries outward onto a grid of `grid` positions.
    pub fn round_outward(&self, grid: u64) -> Interval {
        let grid = grid.max(1);
        let start = (self.start / grid) * grid;
        let end = self.end.div_ceil(grid) * grid;
        Interval { start, end }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// REGION
// ============================================================================

/// An interval scoped to a chromosome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub chrom: Chromosome,
    pub interval: Interval,
}

impl Region {
    pub fn new(chrom: &str, start: u64, end: u64) -> LocusResult<Self> {
        Ok(Self {
            chrom: Chromosome::parse(chrom)?,
            interval: Interval::new(start, end)?,
        })
    }

    /// Parse `chr1:100-200`, tolerating thousands separators.
    pub fn parse(input: &str) -> LocusResult<Self> {
        let invalid = || ValidationError::InvalidRegion {
            input: input.to_string(),
        };
        let caps = REGION_RE.captures(input).ok_or_else(invalid)?;
        let number = |idx: usize| -> Result<u64, ValidationError> {
            caps[idx].replace(',', "").parse::<u64>().map_err(|_| invalid())
        };
        let start = number(2)?;
        let end = number(3)?;
        Self::new(&caps[1], start, end)
    }

    pub fn start(&self) -> u64 {
        self.interval.start()
    }

    pub fn end(&self) -> u64 {
        self.interval.end()
    }

    pub fn span(&self) -> u64 {
        self.interval.len()
    }

    pub fn with_interval(&self, interval: Interval) -> Region {
        Region {
            chrom: self.chrom.clone(),
            interval,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chrom, self.start(), self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chromosome_normalization() {
        assert_eq!(Chromosome::parse("1").unwrap().as_str(), "chr1");
        assert_eq!(Chromosome::parse("chr1").unwrap().as_str(), "chr1");
        assert_eq!(Chromosome::parse("CHR1").unwrap().as_str(), "chr1");
        assert_eq!(Chromosome::parse(" x ").unwrap().as_str(), "chrX");
        assert_eq!(Chromosome::parse("MT").unwrap().as_str(), "chrM");
        assert_eq!(Chromosome::parse("chrMT").unwrap().as_str(), "chrM");
        assert_eq!(Chromosome::parse("chr22").unwrap().bare(), "22");
        assert_eq!(Chromosome::parse("M").unwrap().bare(), "M");
    }

    #[test]
    fn test_chromosome_rejects_garbage() {
        assert!(Chromosome::parse("").is_err());
        assert!(Chromosome::parse("chr").is_err());
        assert!(Chromosome::parse("chr1/../../etc").is_err());
        assert!(Chromosome::parse("chr 1").is_err());
    }

    #[test]
    fn test_interval_rejects_zero_length() {
        assert!(Interval::new(100, 100).is_err());
        assert!(Interval::new(200, 100).is_err());
        assert!(Interval::new(100, 101).is_ok());
    }

    #[test]
    fn test_interval_containment() {
        let outer = Interval::new(100, 200).unwrap();
        assert!(outer.contains(&Interval::new(120, 180).unwrap()));
        assert!(outer.contains(&outer));
        assert!(!outer.contains(&Interval::new(190, 250).unwrap()));
        assert!(outer.contains_position(100));
        assert!(!outer.contains_position(200));
    }

    #[test]
    fn test_interval_widen_respects_max_span() {
        let iv = Interval::new(10_000, 10_100).unwrap();
        let wide = iv.widen(5_000, 1_000_000);
        assert_eq!(wide, Interval::new(5_000, 15_100).unwrap());

        let capped = iv.widen(5_000, 1_100);
        assert_eq!(capped.len(), 1_100);
        assert!(capped.contains(&iv));

        let near_origin = Interval::new(10, 20).unwrap().widen(5_000, 1_000_000);
        assert_eq!(near_origin.start(), MIN_POSITION);
    }

    #[test]
    fn test_interval_round_outward() {
        let iv = Interval::new(12_345, 23_456).unwrap();
        assert_eq!(iv.round_outward(10_000), Interval::new(10_000, 30_000).unwrap());

        let aligned = Interval::new(10_000, 20_000).unwrap();
        assert_eq!(aligned.round_outward(10_000), aligned);
    }

    #[test]
    fn test_region_parse() {
        let region = Region::parse("1:1,000-2,000").unwrap();
        assert_eq!(region.chrom.as_str(), "chr1");
        assert_eq!(region.start(), 1_000);
        assert_eq!(region.end(), 2_000);
        assert_eq!(region.to_string(), "chr1:1000-2000");

        assert!(Region::parse("chr1:2000-1000").is_err());
        assert!(Region::parse("chr1-1000-2000").is_err());
    }

    #[test]
    fn test_chromosome_serde_normalizes() {
        let chrom: Chromosome = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(chrom.as_str(), "chr7");
        assert_eq!(serde_json::to_string(&chrom).unwrap(), "\"chr7\"");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Widening never loses the original interval.
        #[test]
        fn prop_widen_contains_original(
            start in 0u64..1_000_000,
            len in 1u64..100_000,
            buffer in 0u64..50_000,
            max_span in 1u64..500_000,
        ) {
            let iv = Interval::new(start, start + len).unwrap();
            let wide = iv.widen(buffer, max_span);
            prop_assert!(wide.contains(&iv));
            prop_assert!(wide.len() <= max_span.max(iv.len()));
        }

        /// Rounding is outward and grid-aligned.
        #[test]
        fn prop_round_outward_contains_original(
            start in 0u64..10_000_000,
            len in 1u64..100_000,
            grid in 1u64..50_000,
        ) {
            let iv = Interval::new(start, start + len).unwrap();
            let rounded = iv.round_outward(grid);
            prop_assert!(rounded.contains(&iv));
            prop_assert_eq!(rounded.start() % grid, 0);
            prop_assert_eq!(rounded.end() % grid, 0);
        }
    }
}
