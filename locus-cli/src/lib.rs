//! Command-line front end for locus lookups.
//!
//! Every command prints one JSON document on stdout: the lookup outcome
//! tagged with `status` (`success`, `empty` or `failure`). Logs go to
//! stderr.

pub mod command;
pub mod error;

pub use command::{Command, ScoreRow};
pub use error::CliError;

use locus_core::{FetchResult, LocusConfig};
use locus_providers::GenomeServices;
use serde::Serialize;

/// Run one parsed command against freshly built services.
pub async fn run(config: &LocusConfig, command: Command) -> Result<String, CliError> {
    let services = GenomeServices::from_config(config)?;
    execute(&services, command).await
}

/// Run one command and render its outcome as JSON.
pub async fn execute(services: &GenomeServices, command: Command) -> Result<String, CliError> {
    match command {
        Command::Variants { region, refresh } => {
            render(&services.variants.variants_in_region(&region, refresh).await)
        }
        Command::Conservation {
            region,
            bins: None,
            refresh,
        } => {
            let result = services.conservation.scores_in_region(&region, refresh).await;
            render(&result.map(|slice| {
                slice
                    .iter()
                    .map(|(position, score)| ScoreRow {
                        position,
                        score: *score,
                    })
                    .collect::<Vec<_>>()
            }))
        }
        Command::Conservation {
            region,
            bins: Some(bins),
            refresh,
        } => render(&services.conservation.binned_scores(&region, bins, refresh).await),
        Command::Structure {
            identifier,
            refresh,
        } => render(&services.structure.metadata_for(&identifier, refresh).await),
        Command::Clear { data_type: None } => {
            let removed = services.clear_all().await;
            Ok(serde_json::json!({ "removed": removed }).to_string())
        }
        Command::Clear {
            data_type: Some(data_type),
        } => {
            let removed = match data_type.as_str() {
                locus_providers::VARIANTS => services.variants.clear_cache().await,
                locus_providers::CONSERVATION => services.conservation.clear_cache().await,
                locus_providers::STRUCTURE => services.structure.clear_cache().await,
                _ => return Err(CliError::UnknownDataType(data_type)),
            };
            Ok(serde_json::json!({ "dataType": data_type, "removed": removed }).to_string())
        }
    }
}

fn render<T: Serialize>(result: &FetchResult<T>) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(result)?)
}
