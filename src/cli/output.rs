use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

/// Prints `value` as JSON/YAML, or the `human` rendering.
pub fn emit<T, F>(format: OutputFormat, value: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    let text = match format {
        OutputFormat::Human => human(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to encode JSON output")?
        }
        OutputFormat::Yaml => serde_yaml::to_string(value).context("Failed to encode YAML output")?,
    };
    println!("{}", text.trim_end());
    Ok(())
}
