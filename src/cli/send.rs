use std::collections::BTreeMap;
use std::sync::Arc;

use action_flow::ProviderRunState;
use anyhow::{bail, Result};
use cdp_adapter::{ScriptedDriver, ScriptedSessionFactory, SessionOptions};
use clap::Args;
use mailpilot_core_types::EmailIntent;
use mailpilot_scheduler::{normalize_providers, TaskReport};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::output::{emit, OutputFormat};
use crate::app_context::AppContext;
use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct SendArgs {
    /// Instruction, e.g. "send an email to bob@example.com about lunch"
    #[arg(required = true, num_args = 1..)]
    pub instruction: Vec<String>,

    /// Providers to send through, in order
    #[arg(short, long, num_args = 1.., default_values_t = vec!["gmail".to_string()])]
    pub providers: Vec<String>,

    /// Run the browser without a window
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window (needed for a manual sign-in)
    #[arg(long)]
    pub headed: bool,

    /// Drive an in-process scripted page instead of a real browser
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct SendSummary<'a> {
    intent: &'a EmailIntent,
    dry_run: bool,
    results: &'a BTreeMap<String, bool>,
    outcomes: BTreeMap<String, ProviderRunState>,
}

pub async fn cmd_send(args: SendArgs, mut config: AppConfig, output: OutputFormat) -> Result<()> {
    let headless = if args.headless {
        true
    } else if args.headed {
        false
    } else {
        config.browser.headless
    };

    let context = if args.dry_run {
        config.automation.post_navigate_settle_ms = 0;
        config.automation.post_compose_delay_ms = 0;
        config.automation.inter_field_delay_ms = 0;
        config.automation.provider_settle_ms = 0;
        config.artifacts.screenshot_dir = None;
        let sessions = Arc::new(ScriptedSessionFactory::new(dry_run_driver()));
        AppContext::new(config, sessions)?
    } else {
        AppContext::with_chromium(config)?
    };

    let instruction = args.instruction.join(" ");
    let intent = context.parser().parse(&instruction)?;
    let providers = normalize_providers(&args.providers);
    for provider in &providers {
        if !context.catalog().contains(provider) {
            warn!(
                provider = %provider,
                supported = ?context.catalog().known_providers(),
                "unknown provider will be reported as not sent"
            );
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; stopping after the current step");
                cancel.cancel();
            }
        })
    };

    info!(
        recipient = %intent.recipient,
        providers = ?providers,
        headless,
        dry_run = args.dry_run,
        "sending email"
    );
    let result = context
        .orchestrator()
        .run(&intent, &providers, &SessionOptions { headless }, &cancel)
        .await;
    ctrl_c.abort();
    let report: TaskReport = result?;

    let summary = SendSummary {
        intent: &intent,
        dry_run: args.dry_run,
        results: &report.results,
        outcomes: report.final_states(),
    };
    emit(output, &summary, || render_human(&summary))?;

    if !report.results.values().all(|sent| *sent) {
        bail!("email was not sent through every provider");
    }
    Ok(())
}

/// Every element exists and clicking Gmail's compose button opens the
/// compose URL, so a dry run walks the whole flow without waiting.
fn dry_run_driver() -> ScriptedDriver {
    ScriptedDriver::permissive().with_url_after_click(
        "div[gh='cm']",
        "https://mail.google.com/mail/u/0/#inbox?compose=new",
    )
}

fn render_human(summary: &SendSummary<'_>) -> String {
    let mut lines = vec![
        format!("To:      {}", summary.intent.recipient),
        format!("Subject: {}", summary.intent.subject),
        String::new(),
        "Results:".to_string(),
    ];
    for (provider, sent) in summary.results {
        let detail = match summary.outcomes.get(provider) {
            Some(ProviderRunState::Succeeded) => "sent".to_string(),
            Some(ProviderRunState::RequiresManualIntervention) => {
                "form filled; press send manually".to_string()
            }
            Some(ProviderRunState::Failed(kind)) => format!("failed: {kind}"),
            Some(other) => other.name().to_string(),
            None if !sent => "unknown provider".to_string(),
            None => "sent".to_string(),
        };
        let mark = if *sent { "ok " } else { "err" };
        lines.push(format!("  [{mark}] {provider}: {detail}"));
    }
    if summary.dry_run {
        lines.push(String::new());
        lines.push("(dry run: no browser was started)".to_string());
    }
    lines.join("\n")
}
