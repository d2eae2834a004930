use crate::diary::audit;
use crate::diary::entry::{DiaryEntry, YearIndex, YearMonthIndex};
use crate::diary::group::{
    group_documents_by_year, group_documents_by_year_month, group_entries_by_month,
};
use crate::diary::parse::natural_key;
use crate::diary::paths::DigestPaths;
use crate::diary::store::DigestStore;
use crate::diary::summarize::SummaryEngine;
use crate::drive::client::{DocumentSource, RemoteDocument};
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    CacheOnly,
    Scan,
}

/// Per-run outcome counters for the completion report.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub years_processed: usize,
    pub years_skipped: usize,
    pub months_generated: usize,
    pub months_reused: usize,
    pub failed_scopes: Vec<String>,
}

/// Choice prompt offered only when cached years exist. Invalid input is
/// re-prompted indefinitely; `1` maps to cache-only, `2` to a remote scan.
pub fn prompt_user_for_mode(cached_years: &[i32]) -> Result<RunMode> {
    if cached_years.is_empty() {
        return Ok(RunMode::Scan);
    }

    let min = cached_years.first().expect("non-empty");
    let max = cached_years.last().expect("non-empty");
    println!(
        "Found local cache: {} years ({min}-{max})",
        cached_years.len()
    );
    println!("Options:");
    println!("  1. Use local cache only, skip Google Drive scan (fast)");
    println!("  2. Scan Google Drive, find new diaries and update cache");

    let stdin = std::io::stdin();
    loop {
        print!("Please choose (1/2): ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            anyhow::bail!("stdin closed before a mode was chosen");
        }
        match line.trim() {
            "1" => {
                println!("Using local cache mode");
                return Ok(RunMode::CacheOnly);
            }
            "2" => {
                println!("Will scan Google Drive");
                return Ok(RunMode::Scan);
            }
            _ => println!("Invalid choice, please enter 1 or 2"),
        }
    }
}

/// Fetch content for one month's listed documents. Export failures and empty
/// exports skip the document with a warning; the run continues with whatever
/// succeeded. Entries come back naturally sorted by path.
fn fetch_entries(source: &dyn DocumentSource, documents: &[RemoteDocument]) -> Vec<DiaryEntry> {
    let mut entries = Vec::new();

    for doc in documents {
        println!("    Reading: {}", doc.path);
        let content = match source.export_text(&doc.id) {
            Ok(content) => content,
            Err(err) => {
                println!("Warning: failed to fetch '{}': {err:#}", doc.path);
                continue;
            }
        };
        if content.is_empty() {
            println!("Warning: empty content for '{}', skipping file", doc.path);
            continue;
        }

        entries.push(DiaryEntry {
            filename: doc.name.clone(),
            path: doc.path.clone(),
            content,
            created_at: doc.created_time.clone().unwrap_or_default(),
            modified_at: doc.modified_time.clone().unwrap_or_default(),
        });
    }

    entries.sort_by(|a, b| natural_key(&a.path).cmp(&natural_key(&b.path)));
    entries
}

/// Scan the remote store and build both indexes, persisting each year's raw
/// concatenation as soon as that year's fetch finishes so an interrupted run
/// can resume in cache-only mode.
pub fn load_indexes_from_drive(
    source: &dyn DocumentSource,
    folder_id: &str,
    store: &DigestStore,
) -> Result<(YearIndex, YearMonthIndex)> {
    println!("Recursively scanning folders and subfolders...");
    let documents = source.list_documents(folder_id)?;
    if documents.is_empty() {
        println!("No files found");
        return Ok((YearIndex::new(), YearMonthIndex::new()));
    }
    println!("Total of {} documents found", documents.len());

    let documents_by_year = group_documents_by_year(documents.clone());
    let listing = group_documents_by_year_month(documents);
    let total_months: usize = listing.values().map(BTreeMap::len).sum();
    println!(
        "Found diaries for {} years, {total_months} months",
        documents_by_year.len()
    );

    let mut by_year = YearIndex::new();
    let mut by_year_month = YearMonthIndex::new();

    for (year, year_docs) in documents_by_year {
        println!("\nProcessing year {year}...");

        // Documents already claimed by a month bucket; the rest only carry a
        // year marker and are fetched afterwards so nothing is read twice.
        let mut monthly_ids = BTreeSet::new();
        if let Some(months) = listing.get(&year) {
            for (month, docs) in months {
                println!("  Processing month {month}...");
                for doc in docs {
                    monthly_ids.insert(doc.id.clone());
                }
                let entries = fetch_entries(source, docs);
                if entries.is_empty() {
                    continue;
                }
                by_year.entry(year).or_default().extend(entries.clone());
                by_year_month.entry(year).or_default().insert(*month, entries);
            }
        }

        let year_only: Vec<RemoteDocument> = year_docs
            .into_iter()
            .filter(|doc| !monthly_ids.contains(&doc.id))
            .collect();
        if !year_only.is_empty() {
            println!(
                "  Reading {} documents without a month marker...",
                year_only.len()
            );
            let entries = fetch_entries(source, &year_only);
            if !entries.is_empty() {
                by_year.entry(year).or_default().extend(entries);
            }
        }

        if let Some(entries) = by_year.get(&year) {
            println!("  Saving original text for year {year} to file...");
            store.save_raw_year(year, entries)?;
        }
    }

    Ok((by_year, by_year_month))
}

/// Rebuild the year index from the raw-text caches alone.
pub fn load_indexes_from_cache(store: &DigestStore, cached_years: &[i32]) -> Result<YearIndex> {
    println!("Loading diaries from local cache...");
    let mut by_year = YearIndex::new();

    for &year in cached_years {
        if let Some(entries) = store.load_raw_year(year)?
            && !entries.is_empty()
        {
            by_year.insert(year, entries);
        }
    }

    Ok(by_year)
}

/// Generate or reuse every monthly summary for one year, in month order.
fn monthly_summaries_for_year(
    engine: &SummaryEngine<'_>,
    store: &DigestStore,
    paths: &DigestPaths,
    year: i32,
    month_entries: &BTreeMap<u32, Vec<DiaryEntry>>,
    report: &mut PipelineReport,
) -> Result<BTreeMap<u32, String>> {
    let mut monthly_summaries = BTreeMap::new();

    for (&month, entries) in month_entries {
        if store.has_monthly_summary(year, month) {
            println!(
                "  Summary for month {month} already exists, skipping generation: {}",
                store.monthly_summary_path(year, month).display()
            );
            if let Some(cached) = store.load_monthly_summary(year, month)?
                && !cached.is_empty()
            {
                monthly_summaries.insert(month, cached);
            }
            report.months_reused += 1;
            continue;
        }

        println!("  Processing month {month}...");
        let summary = match engine.summarize_month(year, month, entries) {
            Ok(summary) => {
                audit::append_event(paths, "summarize-month", "ok", &format!("{year}-{month:02}"))?;
                summary
            }
            Err(err) => {
                // Persisted as a visible placeholder so the scope can be
                // re-triggered later by deleting the artifact.
                println!("Error occurred while generating monthly summary: {err}");
                report.failed_scopes.push(format!("{year}-{month:02}"));
                audit::append_event(
                    paths,
                    "summarize-month",
                    "failed",
                    &format!("{year}-{month:02}: {err}"),
                )?;
                format!("Failed to generate summary: {err}")
            }
        };

        store.save_monthly_summary(year, month, &summary)?;
        monthly_summaries.insert(month, summary);
        report.months_generated += 1;
    }

    Ok(monthly_summaries)
}

/// Process one year end to end: monthly summaries first, then the yearly
/// rollup synthesized from them. An existing yearly summary skips the whole
/// year — it is the terminal artifact.
pub fn process_year(
    engine: &SummaryEngine<'_>,
    store: &DigestStore,
    paths: &DigestPaths,
    year: i32,
    entries: &[DiaryEntry],
    month_index: Option<&BTreeMap<u32, Vec<DiaryEntry>>>,
    report: &mut PipelineReport,
) -> Result<()> {
    println!("\nProcessing year {year}...");

    if store.has_yearly_summary(year) {
        println!(
            "  Yearly summary for {year} already exists, skipping: {}",
            store.yearly_summary_path(year).display()
        );
        report.years_skipped += 1;
        return Ok(());
    }

    let month_entries = match month_index {
        Some(map) => map.clone(),
        None => {
            println!("  Grouping diaries for year {year} by month...");
            group_entries_by_month(entries)
        }
    };

    let monthly_summaries =
        monthly_summaries_for_year(engine, store, paths, year, &month_entries, report)?;

    if monthly_summaries.is_empty() && entries.is_empty() {
        println!("  Warning: no content for year {year}, skipping yearly summary");
        return Ok(());
    }

    // A year whose paths never resolve a month still gets a yearly summary,
    // generated straight from the raw entries.
    let outcome = if monthly_summaries.is_empty() {
        println!("  No monthly summaries for year {year}, summarizing raw entries directly...");
        engine.summarize_year(year, entries)
    } else {
        println!(
            "\n  Generating yearly summary based on {} monthly summaries...",
            monthly_summaries.len()
        );
        engine.summarize_year_from_monthly(year, &monthly_summaries)
    };
    let yearly = match outcome {
        Ok(summary) => {
            audit::append_event(paths, "summarize-year", "ok", &year.to_string())?;
            summary
        }
        Err(err) => {
            println!("Error occurred while generating yearly summary: {err}");
            report.failed_scopes.push(year.to_string());
            audit::append_event(paths, "summarize-year", "failed", &format!("{year}: {err}"))?;
            format!("Failed to generate summary: {err}")
        }
    };
    store.save_yearly_summary(year, &yearly)?;
    report.years_processed += 1;

    Ok(())
}

/// Drive the full pipeline for one run. `source` is only consulted in scan
/// mode; cache-only runs never touch the network for documents.
pub fn run_pipeline(
    engine: &SummaryEngine<'_>,
    store: &DigestStore,
    paths: &DigestPaths,
    source: Option<&dyn DocumentSource>,
    folder_id: Option<&str>,
    mode: RunMode,
) -> Result<PipelineReport> {
    let mut report = PipelineReport::default();

    let (by_year, by_year_month) = match mode {
        RunMode::CacheOnly => {
            let cached_years = store.cached_years()?;
            (load_indexes_from_cache(store, &cached_years)?, None)
        }
        RunMode::Scan => {
            let source =
                source.ok_or_else(|| anyhow::anyhow!("scan mode requires a document source"))?;
            let folder_id =
                folder_id.ok_or_else(|| anyhow::anyhow!("scan mode requires a folder id"))?;
            let (by_year, by_year_month) = load_indexes_from_drive(source, folder_id, store)?;
            (by_year, Some(by_year_month))
        }
    };

    if by_year.is_empty() {
        println!("Failed to read any diary content");
        return Ok(report);
    }

    for (year, entries) in &by_year {
        let month_index = by_year_month.as_ref().and_then(|idx| idx.get(year));
        process_year(engine, store, paths, *year, entries, month_index, &mut report)?;
    }

    Ok(report)
}
