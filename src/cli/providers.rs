use anyhow::Result;
use mailpilot_core_types::LogicalTarget;
use serde::Serialize;

use super::output::{emit, OutputFormat};
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct ProviderSummary {
    name: String,
    display_name: String,
    url: String,
    targets: Vec<TargetSummary>,
}

#[derive(Debug, Serialize)]
struct TargetSummary {
    target: LogicalTarget,
    candidates: usize,
}

pub fn cmd_providers(config: &AppConfig, output: OutputFormat) -> Result<()> {
    let catalog = config.providers.catalog()?;
    let providers: Vec<ProviderSummary> = catalog
        .profiles()
        .map(|profile| ProviderSummary {
            name: profile.id.clone(),
            display_name: profile.display_name().to_string(),
            url: profile.home_url.clone(),
            targets: LogicalTarget::ALL
                .iter()
                .filter_map(|target| {
                    profile.candidates(*target).ok().map(|candidates| TargetSummary {
                        target: *target,
                        candidates: candidates.len(),
                    })
                })
                .collect(),
        })
        .collect();

    emit(output, &providers, || {
        let mut lines = Vec::new();
        for provider in &providers {
            lines.push(format!(
                "{} ({}) - {}",
                provider.name, provider.display_name, provider.url
            ));
            for target in &provider.targets {
                lines.push(format!(
                    "  {:<36} {} candidates",
                    target.target.name(),
                    target.candidates
                ));
            }
        }
        lines.join("\n")
    })
}
