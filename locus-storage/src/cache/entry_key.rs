//! Cache keys and data type partitions.
//!
//! An [`EntryKey`] can only be built from a normalized [`Chromosome`] and a
//! validated [`Interval`], so `"1"` and `"chr1"` can never produce two keys for
//! the same region. The encoded form doubles as the on-disk file stem.

use locus_core::{CacheIoError, Chromosome, Interval};
use std::fmt;

/// Separator between key components.
const SEPARATOR: char = '_';

/// Longest accepted key or data type name, in bytes.
const MAX_COMPONENT_LEN: usize = 200;

/// Logical store partition, one per remote service. Used as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType(String);

impl DataType {
    /// Lowercase ASCII letters, digits, `-` and `_` only.
    pub fn new(name: &str) -> Result<Self, CacheIoError> {
        let valid = !name.is_empty()
            && name.len() <= MAX_COMPONENT_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !valid {
            return Err(CacheIoError::InvalidKey {
                component: name.to_string(),
                reason: "data type must be lowercase [a-z0-9_-]".to_string(),
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that a raw store key is safe to use as a file stem.
pub fn validate_store_key(key: &str) -> Result<(), CacheIoError> {
    let valid = !key.is_empty()
        && key.len() <= MAX_COMPONENT_LEN
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(CacheIoError::InvalidKey {
            component: key.to_string(),
            reason: "store keys must be [A-Za-z0-9._-] and not start with '.'".to_string(),
        })
    }
}

/// Key for a range-cached region: `<chrom>_<start>_<end>[_<variant>]`.
///
/// # Format
///
/// Chromosome names may themselves contain `_` (`chrUn_KI270302v1`), so the
/// key is decoded from the right. The optional variant must start with a
/// letter and may not contain `_`; that keeps the trailing numeric pair
/// unambiguous and makes the encoding injective.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    inner: EntryKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKeyInner {
    chrom: Chromosome,
    interval: Interval,
    variant: Option<String>,
}

impl EntryKey {
    pub fn new(
        chrom: Chromosome,
        interval: Interval,
        variant: Option<&str>,
    ) -> Result<Self, CacheIoError> {
        if let Some(v) = variant {
            validate_variant(v)?;
        }
        Ok(Self {
            inner: EntryKeyInner {
                chrom,
                interval,
                variant: variant.map(str::to_string),
            },
        })
    }

    pub fn chrom(&self) -> &Chromosome {
        &self.inner.chrom
    }

    pub fn interval(&self) -> Interval {
        self.inner.interval
    }

    pub fn variant(&self) -> Option<&str> {
        self.inner.variant.as_deref()
    }

    pub fn encode(&self) -> String {
        let mut key = format!(
            "{}{sep}{}{sep}{}",
            self.inner.chrom,
            self.inner.interval.start(),
            self.inner.interval.end(),
            sep = SEPARATOR
        );
        if let Some(variant) = &self.inner.variant {
            key.push(SEPARATOR);
            key.push_str(variant);
        }
        key
    }

    /// Decode a key produced by [`EntryKey::encode`].
    ///
    /// Returns `None` for anything that is not a well-formed key, including
    /// non-canonical chromosome spellings.
    pub fn parse(encoded: &str) -> Option<Self> {
        let mut parts: Vec<&str> = encoded.split(SEPARATOR).collect();
        if parts.len() < 3 {
            return None;
        }

        let last = *parts.last()?;
        let variant = if last.parse::<u64>().is_err() {
            validate_variant(last).ok()?;
            parts.pop();
            Some(last.to_string())
        } else {
            None
        };

        if parts.len() < 3 {
            return None;
        }
        let end: u64 = parts.pop()?.parse().ok()?;
        let start: u64 = parts.pop()?.parse().ok()?;
        let chrom_name = parts.join("_");
        let chrom = Chromosome::parse(&chrom_name).ok()?;
        if chrom.as_str() != chrom_name {
            return None;
        }
        let interval = Interval::new(start, end).ok()?;

        Some(Self {
            inner: EntryKeyInner {
                chrom,
                interval,
                variant,
            },
        })
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn validate_variant(variant: &str) -> Result<(), CacheIoError> {
    let mut chars = variant.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid = starts_with_letter
        && variant.len() <= MAX_COMPONENT_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(CacheIoError::InvalidKey {
            component: variant.to_string(),
            reason: "variant must start with a letter and contain only [A-Za-z0-9.-]"
                .to_string(),
        })
    }
}
