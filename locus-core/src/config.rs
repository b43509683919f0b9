//! Configuration loading.
//!
//! Fields are required unless they carry a serde default. The file is TOML and
//! unknown keys are rejected so typos surface at startup.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LOCUS_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocusConfig {
    pub cache: CacheSection,
    pub network: NetworkSection,
    pub services: ServicesSection,
}

/// Cache tier and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    /// Root directory; one subdirectory per data type is created beneath it.
    pub root_dir: PathBuf,
    /// Disk entry lifetime in seconds.
    pub ttl_secs: u64,
    /// Retained samples per partition before the range cache is trimmed.
    pub max_samples_per_partition: usize,
    /// Entries kept by the keyed memory tier per data type.
    #[serde(default = "default_max_memo_entries")]
    pub max_memo_entries: usize,
    /// Consecutive failures tolerated per rounded region.
    pub retry_cap: u32,
    /// Grid used to round regions for failure tracking.
    pub failure_grid: u64,
    /// Positions added on each side of a range fetch.
    pub fetch_buffer: u64,
    /// Upper bound on a widened fetch.
    pub max_fetch_span: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    pub request_timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesSection {
    pub variants: VariantServiceConfig,
    pub conservation: ConservationServiceConfig,
    pub structure: StructureServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantServiceConfig {
    pub base_url: String,
    pub dataset: String,
    pub max_region_span: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConservationServiceConfig {
    pub base_url: String,
    pub genome: String,
    pub track: String,
    pub max_region_span: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StructureServiceConfig {
    pub base_url: String,
}

fn default_max_memo_entries() -> usize {
    512
}

fn default_user_agent() -> String {
    format!("locus/{}", env!("CARGO_PKG_VERSION"))
}

impl CacheSection {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl NetworkSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl LocusConfig {
    /// Defaults suitable for a desktop session, caching under `root_dir`.
    pub fn default_for(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: CacheSection {
                root_dir: root_dir.into(),
                ttl_secs: 7 * 24 * 3600,
                max_samples_per_partition: 2_000_000,
                max_memo_entries: default_max_memo_entries(),
                retry_cap: 3,
                failure_grid: 10_000,
                fetch_buffer: 5_000,
                max_fetch_span: 250_000,
            },
            network: NetworkSection {
                request_timeout_ms: 30_000,
                user_agent: default_user_agent(),
            },
            services: ServicesSection {
                variants: VariantServiceConfig {
                    base_url: "https://gnomad.broadinstitute.org/api".to_string(),
                    dataset: "gnomad_r4".to_string(),
                    max_region_span: 100_000,
                },
                conservation: ConservationServiceConfig {
                    base_url: "https://api.genome.ucsc.edu".to_string(),
                    genome: "hg38".to_string(),
                    track: "phyloP100way".to_string(),
                    max_region_span: 250_000,
                },
                structure: StructureServiceConfig {
                    base_url: "https://alphafold.ebi.ac.uk/api".to_string(),
                },
            },
        }
    }

    /// Locate, parse and validate the config file.
    ///
    /// The path comes from `--config <path>` on the command line, falling back
    /// to the `LOCUS_CONFIG` environment variable.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: LocusConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cache.root_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.max_samples_per_partition < 2 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_samples_per_partition",
                reason: "must be >= 2".to_string(),
            });
        }
        if self.cache.max_memo_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_memo_entries",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.retry_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.retry_cap",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.failure_grid == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.failure_grid",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache.max_fetch_span == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.max_fetch_span",
                reason: "must be > 0".to_string(),
            });
        }
        if self.network.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        let urls = [
            ("services.variants.base_url", &self.services.variants.base_url),
            (
                "services.conservation.base_url",
                &self.services.conservation.base_url,
            ),
            ("services.structure.base_url", &self.services.structure.base_url),
        ];
        for (field, url) in urls {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{:?} is not an http(s) URL", url),
                });
            }
        }
        if self.services.variants.max_region_span == 0 {
            return Err(ConfigError::InvalidValue {
                field: "services.variants.max_region_span",
                reason: "must be > 0".to_string(),
            });
        }
        if self.services.conservation.max_region_span == 0 {
            return Err(ConfigError::InvalidValue {
                field: "services.conservation.max_region_span",
                reason: "must be > 0".to_string(),
            });
        }
        if self.services.conservation.track.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "services.conservation.track",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[cache]
root_dir = "/tmp/locus-cache"
ttl_secs = 86400
max_samples_per_partition = 100000
retry_cap = 3
failure_grid = 10000
fetch_buffer = 5000
max_fetch_span = 250000

[network]
request_timeout_ms = 30000

[services.variants]
base_url = "https://gnomad.example.org/api"
dataset = "gnomad_r4"
max_region_span = 100000

[services.conservation]
base_url = "https://ucsc.example.org"
genome = "hg38"
track = "phyloP100way"
max_region_span = 250000

[services.structure]
base_url = "https://alphafold.example.org/api"
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = LocusConfig::from_toml(SAMPLE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.cache.retry_cap, 3);
        assert_eq!(config.cache.max_memo_entries, 512);
        assert_eq!(config.network.request_timeout(), Duration::from_secs(30));
        assert!(config.network.user_agent.starts_with("locus/"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let with_typo = SAMPLE.replace("retry_cap", "retry_cpa");
        assert!(matches!(
            LocusConfig::from_toml(&with_typo),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_retry_cap() {
        let mut config = LocusConfig::default_for("/tmp/locus");
        config.cache.retry_cap = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "cache.retry_cap",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = LocusConfig::default_for("/tmp/locus");
        config.services.structure.base_url = "ftp://example.org".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        LocusConfig::default_for("/tmp/locus").validate().unwrap();
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("locus.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = LocusConfig::from_path(&path).unwrap();
        assert_eq!(config.services.conservation.track, "phyloP100way");
    }
}
