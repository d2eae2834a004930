use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::diary::config::load_config;
use crate::diary::orchestrate::{RunMode, prompt_user_for_mode, run_pipeline};
use crate::diary::paths::DigestPaths;
use crate::diary::store::DigestStore;
use crate::diary::summarize::{AnthropicCompleter, SummaryEngine};
use crate::drive::client::{DocumentSource, DriveClient};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cache_only: bool,
    pub scan: bool,
    pub folder_id: Option<String>,
    pub output_dir: Option<PathBuf>,
}

fn api_key_from_env() -> Option<String> {
    env::var("ANTHROPIC_API_KEY")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn run(opts: &RunOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("run");

    let mut cfg = load_config()?;
    if let Some(dir) = &opts.output_dir {
        cfg.output_dir = dir.clone();
    }
    if let Some(folder_id) = &opts.folder_id {
        cfg.folder_id = Some(folder_id.clone());
    }

    // Missing credentials are fatal before any work begins.
    let Some(api_key) = api_key_from_env() else {
        report.issue("ANTHROPIC_API_KEY is not set; add it to your environment or .env file");
        return Ok(report);
    };
    if opts.cache_only && opts.scan {
        report.issue("choose at most one of --cache-only and --scan");
        return Ok(report);
    }

    let paths = DigestPaths::new(&cfg.output_dir);
    let store = DigestStore::new(paths.clone());

    let mode = if opts.cache_only {
        RunMode::CacheOnly
    } else if opts.scan {
        RunMode::Scan
    } else {
        prompt_user_for_mode(&store.cached_years()?)?
    };

    let drive: Option<DriveClient> = if mode == RunMode::Scan {
        if cfg.folder_id.is_none() {
            report.issue(
                "FOLDER_ID is not set; pass --folder-id or set it in the environment or config",
            );
            return Ok(report);
        }
        match DriveClient::from_env() {
            Ok(client) => Some(client),
            Err(err) => {
                report.issue(format!("{err:#}"));
                return Ok(report);
            }
        }
    } else {
        None
    };

    let completer = match AnthropicCompleter::new(api_key, &cfg.model) {
        Ok(completer) => completer,
        Err(err) => {
            report.issue(format!("failed to build completion client: {err}"));
            return Ok(report);
        }
    };
    let engine = SummaryEngine::new(&completer, cfg.rate.clone());

    let pipeline = run_pipeline(
        &engine,
        &store,
        &paths,
        drive.as_ref().map(|d| d as &dyn DocumentSource),
        cfg.folder_id.as_deref(),
        mode,
    )?;

    report.detail(format!("output_dir={}", cfg.output_dir.display()));
    report.detail(format!("years_processed={}", pipeline.years_processed));
    report.detail(format!("years_skipped={}", pipeline.years_skipped));
    report.detail(format!("months_generated={}", pipeline.months_generated));
    report.detail(format!("months_reused={}", pipeline.months_reused));
    for scope in &pipeline.failed_scopes {
        report.issue(format!("summary failed for {scope}; delete its file to re-trigger"));
    }

    Ok(report)
}
