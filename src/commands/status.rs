use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::diary::config::load_config;
use crate::diary::paths::DigestPaths;
use crate::diary::store::DigestStore;

#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub output_dir: Option<PathBuf>,
}

/// Inventory of local artifacts: which years have a raw cache, which months
/// and years already carry summaries.
pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("status");

    let mut cfg = load_config()?;
    if let Some(dir) = &opts.output_dir {
        cfg.output_dir = dir.clone();
    }

    let store = DigestStore::new(DigestPaths::new(&cfg.output_dir));
    let cached_years = store.cached_years()?;

    report.detail(format!("output_dir={}", cfg.output_dir.display()));
    report.detail(format!("cached_years={}", cached_years.len()));

    for year in cached_years {
        let months_done: Vec<u32> = (1..=12)
            .filter(|&m| store.has_monthly_summary(year, m))
            .collect();
        let yearly = if store.has_yearly_summary(year) {
            "done"
        } else {
            "pending"
        };
        report.detail(format!(
            "{year}: months_summarized={} yearly={yearly}",
            months_done.len()
        ));
    }

    Ok(report)
}
