//! Argument parsing.

use locus_core::Region;
use serde::Serialize;

use crate::error::CliError;

pub const USAGE: &str = "locus [--config <path>] <command>

Commands:
  variants <chr:start-end> [--refresh]
  conservation <chr:start-end> [--bins <n>] [--refresh]
  structure <accession> [--refresh]
  clear [variants|conservation|structure]";

/// One lookup or maintenance action.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Variants {
        region: Region,
        refresh: bool,
    },
    Conservation {
        region: Region,
        bins: Option<usize>,
        refresh: bool,
    },
    Structure {
        identifier: String,
        refresh: bool,
    },
    /// Clear one data type, or everything when `None`.
    Clear { data_type: Option<String> },
}

/// A single per-base score in command output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreRow {
    pub position: u64,
    pub score: f32,
}

impl Command {
    /// Parse arguments without the program name. `--config <path>` is
    /// skipped since configuration loading reads it separately.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positional = Vec::new();
        let mut refresh = false;
        let mut bins = None;

        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    args.next()
                        .ok_or_else(|| CliError::Usage("--config needs a path".to_string()))?;
                }
                "--refresh" => refresh = true,
                "--bins" => {
                    let value = args
                        .next()
                        .ok_or_else(|| CliError::Usage("--bins needs a count".to_string()))?;
                    let count = value
                        .parse::<usize>()
                        .map_err(|_| CliError::Usage(format!("invalid bin count '{}'", value)))?;
                    bins = Some(count);
                }
                flag if flag.starts_with("--") => {
                    return Err(CliError::Usage(format!("unknown flag '{}'", flag)));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or_else(|| CliError::Usage(USAGE.to_string()))?;
        let operand = positional.next();
        if let Some(extra) = positional.next() {
            return Err(CliError::Usage(format!("unexpected argument '{}'", extra)));
        }
        let required = |what: &str| {
            operand
                .clone()
                .ok_or_else(|| CliError::Usage(format!("{} needs {}", name, what)))
        };

        let command = match name.as_str() {
            "variants" => Command::Variants {
                region: Region::parse(&required("a region")?)?,
                refresh,
            },
            "conservation" => Command::Conservation {
                region: Region::parse(&required("a region")?)?,
                bins,
                refresh,
            },
            "structure" => Command::Structure {
                identifier: required("an accession")?,
                refresh,
            },
            "clear" => Command::Clear {
                data_type: operand.clone().filter(|dt| dt != "all"),
            },
            other => return Err(CliError::Usage(format!("unknown command '{}'", other))),
        };

        if bins.is_some() && !matches!(command, Command::Conservation { .. }) {
            return Err(CliError::Usage("--bins only applies to conservation".to_string()));
        }
        Ok(command)
    }
}
