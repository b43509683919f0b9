//! Population variant responses (gnomAD GraphQL shape).

use locus_core::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_json, ResponseAdapter};

const SERVICE: &str = "variants";

/// Coarse severity of a variant's most severe consequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Moderate,
    Low,
    Modifier,
}

/// VEP consequence terms with a non-modifier impact. Anything not listed is
/// [`Impact::Modifier`].
const IMPACT_TABLE: &[(&str, Impact)] = &[
    ("transcript_ablation", Impact::High),
    ("splice_acceptor_variant", Impact::High),
    ("splice_donor_variant", Impact::High),
    ("stop_gained", Impact::High),
    ("frameshift_variant", Impact::High),
    ("stop_lost", Impact::High),
    ("start_lost", Impact::High),
    ("transcript_amplification", Impact::High),
    ("inframe_insertion", Impact::Moderate),
    ("inframe_deletion", Impact::Moderate),
    ("missense_variant", Impact::Moderate),
    ("protein_altering_variant", Impact::Moderate),
    ("splice_region_variant", Impact::Low),
    ("splice_donor_5th_base_variant", Impact::Low),
    ("splice_donor_region_variant", Impact::Low),
    ("splice_polypyrimidine_tract_variant", Impact::Low),
    ("incomplete_terminal_codon_variant", Impact::Low),
    ("start_retained_variant", Impact::Low),
    ("stop_retained_variant", Impact::Low),
    ("synonymous_variant", Impact::Low),
];

impl Impact {
    /// Classify a VEP consequence term. Case-insensitive.
    pub fn from_consequence(term: &str) -> Self {
        let term = term.trim();
        IMPACT_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(term))
            .map(|(_, impact)| *impact)
            .unwrap_or(Impact::Modifier)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Moderate => "moderate",
            Impact::Low => "low",
            Impact::Modifier => "modifier",
        }
    }
}

/// One population variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub variant_id: String,
    /// 1-based position of the first reference base.
    pub position: u64,
    pub reference: String,
    pub alternate: String,
    pub consequence: Option<String>,
    pub impact: Impact,
    pub rsids: Vec<String>,
    /// Allele count summed over exome and genome callsets.
    pub allele_count: u64,
    pub allele_number: u64,
}

impl VariantRecord {
    pub fn allele_frequency(&self) -> Option<f64> {
        if self.allele_number == 0 {
            None
        } else {
            Some(self.allele_count as f64 / self.allele_number as f64)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    #[serde(default)]
    variant_id: Option<String>,
    #[serde(default)]
    pos: Option<u64>,
    #[serde(default, rename = "ref")]
    reference: Option<String>,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    consequence: Option<String>,
    #[serde(default)]
    rsids: Option<Vec<String>>,
    #[serde(default)]
    exome: Option<RawCallset>,
    #[serde(default)]
    genome: Option<RawCallset>,
}

#[derive(Debug, Default, Deserialize)]
struct RawCallset {
    #[serde(default)]
    ac: Option<u64>,
    #[serde(default)]
    an: Option<u64>,
}

/// Adapter for region variant queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantAdapter;

impl VariantAdapter {
    fn convert(raw: RawVariant) -> Option<VariantRecord> {
        // Without a position the record cannot be placed.
        let position = raw.pos?;
        let reference = raw.reference.unwrap_or_default();
        let alternate = raw.alt.unwrap_or_default();
        let variant_id = raw
            .variant_id
            .unwrap_or_else(|| format!("{}-{}-{}", position, reference, alternate));
        let callsets = [raw.exome, raw.genome];
        let allele_count = callsets.iter().flatten().filter_map(|c| c.ac).sum();
        let allele_number = callsets.iter().flatten().filter_map(|c| c.an).sum();
        let impact = raw
            .consequence
            .as_deref()
            .map(Impact::from_consequence)
            .unwrap_or(Impact::Modifier);

        Some(VariantRecord {
            variant_id,
            position,
            reference,
            alternate,
            consequence: raw.consequence,
            impact,
            rsids: raw.rsids.unwrap_or_default(),
            allele_count,
            allele_number,
        })
    }
}

impl ResponseAdapter for VariantAdapter {
    type Output = Vec<VariantRecord>;

    fn service(&self) -> &'static str {
        SERVICE
    }

    fn parse(&self, body: &str) -> Result<Self::Output, ParseError> {
        let json = parse_json(SERVICE, body)?;

        let data = match json.get("data") {
            Some(data) if !data.is_null() => data,
            _ => {
                let message = json
                    .get("errors")
                    .and_then(Value::as_array)
                    .and_then(|errors| errors.first())
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("missing data object");
                return Err(ParseError::invalid(SERVICE, message));
            }
        };

        let variants = match data.get("region").and_then(|r| r.get("variants")) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ParseError::invalid(SERVICE, "region.variants is not an array"));
            }
        };

        let records = variants
            .iter()
            .filter_map(|item| serde_json::from_value::<RawVariant>(item.clone()).ok())
            .filter_map(Self::convert)
            .collect();
        Ok(records)
    }
}
