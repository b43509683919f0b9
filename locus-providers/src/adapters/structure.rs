//! Structure prediction metadata (AlphaFold DB prediction endpoint).

use locus_core::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{parse_json, ResponseAdapter};

const SERVICE: &str = "structure";

/// Model confidence band derived from the global pLDDT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    VeryHigh,
    Confident,
    Low,
    VeryLow,
}

/// Lower pLDDT bounds (exclusive), highest first.
const CONFIDENCE_TABLE: &[(f64, ConfidenceBand)] = &[
    (90.0, ConfidenceBand::VeryHigh),
    (70.0, ConfidenceBand::Confident),
    (50.0, ConfidenceBand::Low),
];

impl ConfidenceBand {
    pub fn from_plddt(plddt: f64) -> Self {
        CONFIDENCE_TABLE
            .iter()
            .find(|(bound, _)| plddt > *bound)
            .map(|(_, band)| *band)
            .unwrap_or(ConfidenceBand::VeryLow)
    }
}

/// Metadata for one predicted structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMetadata {
    pub entry_id: String,
    pub accession: String,
    pub description: Option<String>,
    pub gene: Option<String>,
    pub organism: Option<String>,
    pub model_version: Option<u32>,
    pub global_plddt: Option<f64>,
    pub confidence: Option<ConfidenceBand>,
    pub pdb_url: Option<String>,
    pub cif_url: Option<String>,
    pub pae_image_url: Option<String>,
    /// First and last modelled residue (1-based, inclusive).
    pub residue_range: Option<(u32, u32)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrediction {
    #[serde(default)]
    entry_id: Option<String>,
    #[serde(default)]
    uniprot_accession: Option<String>,
    #[serde(default)]
    uniprot_description: Option<String>,
    #[serde(default)]
    gene: Option<String>,
    #[serde(default)]
    organism_scientific_name: Option<String>,
    #[serde(default)]
    latest_version: Option<u32>,
    #[serde(default)]
    global_metric_value: Option<f64>,
    #[serde(default)]
    pdb_url: Option<String>,
    #[serde(default)]
    cif_url: Option<String>,
    #[serde(default)]
    pae_image_url: Option<String>,
    #[serde(default)]
    uniprot_start: Option<u32>,
    #[serde(default)]
    uniprot_end: Option<u32>,
}

/// Adapter for prediction lookups by UniProt accession.
///
/// Output is `None` when the service returns no prediction.
#[derive(Debug, Clone)]
pub struct StructureAdapter {
    accession: String,
}

impl StructureAdapter {
    pub fn for_accession(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
        }
    }

    fn convert(&self, raw: RawPrediction) -> StructureMetadata {
        let accession = raw
            .uniprot_accession
            .unwrap_or_else(|| self.accession.clone());
        let entry_id = raw
            .entry_id
            .unwrap_or_else(|| format!("AF-{}-F1", accession));
        let residue_range = match (raw.uniprot_start, raw.uniprot_end) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        };
        StructureMetadata {
            entry_id,
            accession,
            description: raw.uniprot_description,
            gene: raw.gene,
            organism: raw.organism_scientific_name,
            model_version: raw.latest_version,
            global_plddt: raw.global_metric_value,
            confidence: raw.global_metric_value.map(ConfidenceBand::from_plddt),
            pdb_url: raw.pdb_url,
            cif_url: raw.cif_url,
            pae_image_url: raw.pae_image_url,
            residue_range,
        }
    }
}

impl ResponseAdapter for StructureAdapter {
    type Output = Option<StructureMetadata>;

    fn service(&self) -> &'static str {
        SERVICE
    }

    fn parse(&self, body: &str) -> Result<Self::Output, ParseError> {
        let json = parse_json(SERVICE, body)?;
        let items = match json {
            Value::Array(items) => items,
            _ => return Err(ParseError::invalid(SERVICE, "expected a JSON array")),
        };

        // Several fragments may come back for long proteins; prefer the one
        // for the requested accession, then the first.
        let predictions: Vec<RawPrediction> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        let chosen = predictions
            .iter()
            .position(|p| {
                p.uniprot_accession
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(&self.accession))
            })
            .unwrap_or(0);

        Ok(predictions
            .into_iter()
            .nth(chosen)
            .map(|raw| self.convert(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_table() {
        assert_eq!(ConfidenceBand::from_plddt(98.1), ConfidenceBand::VeryHigh);
        assert_eq!(ConfidenceBand::from_plddt(90.0), ConfidenceBand::Confident);
        assert_eq!(ConfidenceBand::from_plddt(70.5), ConfidenceBand::Confident);
        assert_eq!(ConfidenceBand::from_plddt(55.0), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_plddt(50.0), ConfidenceBand::VeryLow);
        assert_eq!(ConfidenceBand::from_plddt(f64::NAN), ConfidenceBand::VeryLow);
    }

    #[test]
    fn test_parse_prediction() {
        let body = r#"[{"entryId":"AF-P69905-F1","uniprotAccession":"P69905",
            "uniprotDescription":"Hemoglobin subunit alpha","gene":"HBA1",
            "organismScientificName":"Homo sapiens","latestVersion":4,
            "globalMetricValue":98.06,"pdbUrl":"https://example.org/AF-P69905-F1.pdb",
            "uniprotStart":1,"uniprotEnd":142}]"#;
        let meta = StructureAdapter::for_accession("P69905")
            .parse(body)
            .unwrap()
            .unwrap();
        assert_eq!(meta.entry_id, "AF-P69905-F1");
        assert_eq!(meta.gene.as_deref(), Some("HBA1"));
        assert_eq!(meta.confidence, Some(ConfidenceBand::VeryHigh));
        assert_eq!(meta.residue_range, Some((1, 142)));
        assert_eq!(meta.cif_url, None);
    }

    #[test]
    fn test_prefers_requested_accession() {
        let body = r#"[{"uniprotAccession":"Q1"},{"uniprotAccession":"P69905","entryId":"AF-P69905-F1"}]"#;
        let meta = StructureAdapter::for_accession("P69905")
            .parse(body)
            .unwrap()
            .unwrap();
        assert_eq!(meta.entry_id, "AF-P69905-F1");
    }

    #[test]
    fn test_sparse_entry_gets_defaults() {
        let meta = StructureAdapter::for_accession("P69905")
            .parse("[{}]")
            .unwrap()
            .unwrap();
        assert_eq!(meta.accession, "P69905");
        assert_eq!(meta.entry_id, "AF-P69905-F1");
        assert_eq!(meta.confidence, None);
    }

    #[test]
    fn test_empty_array_is_no_prediction() {
        assert_eq!(StructureAdapter::for_accession("P69905").parse("[]").unwrap(), None);
    }

    #[test]
    fn test_non_array_is_parse_failure() {
        let adapter = StructureAdapter::for_accession("P69905");
        assert!(adapter.parse(r#"{"detail":"oops"}"#).is_err());
        assert!(adapter.parse("").is_err());
    }
}
