use crate::diary::entry::{DiaryEntry, Scope, SummaryArtifact};
use crate::diary::paths::DigestPaths;
use crate::diary::util::now_local_stamp;
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Rule-line widths. These are part of the on-disk format of existing cache
/// files and must not change.
const SUMMARY_RULE_LEN: usize = 50;
const RAW_RULE_LEN: usize = 60;

static RAW_CACHE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})年日记原文\.txt$").expect("cache name pattern is valid"));

fn rule(len: usize) -> String {
    "=".repeat(len)
}

/// Owns all durable artifacts: yearly/monthly summary envelopes and the
/// per-year raw-text cache. Existence of a persisted file is the sole resume
/// signal; regeneration requires deleting the artifact first.
#[derive(Debug, Clone)]
pub struct DigestStore {
    paths: DigestPaths,
}

impl DigestStore {
    pub fn new(paths: DigestPaths) -> Self {
        Self { paths }
    }

    pub fn yearly_summary_path(&self, year: i32) -> PathBuf {
        self.paths.output_dir.join(format!("{year}_summary.txt"))
    }

    pub fn monthly_summary_path(&self, year: i32, month: u32) -> PathBuf {
        self.paths
            .output_dir
            .join(year.to_string())
            .join(format!("{year}年{month}月_summary.txt"))
    }

    pub fn raw_text_path(&self, year: i32) -> PathBuf {
        self.paths.output_dir.join(format!("{year}年日记原文.txt"))
    }

    pub fn has_yearly_summary(&self, year: i32) -> bool {
        self.yearly_summary_path(year).exists()
    }

    pub fn has_monthly_summary(&self, year: i32, month: u32) -> bool {
        self.monthly_summary_path(year, month).exists()
    }

    fn render_summary_envelope(title: &str, artifact: &SummaryArtifact) -> String {
        let mut out = String::new();
        out.push_str(title);
        out.push('\n');
        out.push_str(&rule(SUMMARY_RULE_LEN));
        out.push_str("\n\n");
        out.push_str(&artifact.text);
        out.push_str("\n\n");
        out.push_str(&rule(SUMMARY_RULE_LEN));
        out.push('\n');
        out.push_str(&format!("生成时间: {}\n", artifact.generated_at));
        out
    }

    pub fn save_yearly_summary(&self, year: i32, summary: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.paths.output_dir)
            .with_context(|| format!("failed to create {}", self.paths.output_dir.display()))?;

        let artifact = SummaryArtifact {
            scope: Scope::Year(year),
            text: summary.to_string(),
            generated_at: now_local_stamp(),
        };
        let body = Self::render_summary_envelope(&format!("{year}年日记摘要"), &artifact);

        let path = self.yearly_summary_path(year);
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Summary saved to: {}", path.display());
        Ok(path)
    }

    pub fn save_monthly_summary(&self, year: i32, month: u32, summary: &str) -> Result<PathBuf> {
        let year_dir = self.paths.output_dir.join(year.to_string());
        fs::create_dir_all(&year_dir)
            .with_context(|| format!("failed to create {}", year_dir.display()))?;

        let artifact = SummaryArtifact {
            scope: Scope::Month(year, month),
            text: summary.to_string(),
            generated_at: now_local_stamp(),
        };
        let body = Self::render_summary_envelope(&format!("{year}年{month}月日记摘要"), &artifact);

        let path = self.monthly_summary_path(year, month);
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Monthly summary saved to: {}", path.display());
        Ok(path)
    }

    /// Load the body of a cached monthly summary, stripping the envelope:
    /// everything between the first and second rule lines.
    pub fn load_monthly_summary(&self, year: i32, month: u32) -> Result<Option<String>> {
        let path = self.monthly_summary_path(year, month);
        if !path.exists() {
            return Ok(None);
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;

        let mut summary_lines = Vec::new();
        let mut in_summary = false;
        for line in content.lines() {
            if line.starts_with('=') {
                if in_summary {
                    break;
                }
                in_summary = true;
                continue;
            }
            if in_summary {
                summary_lines.push(line);
            }
        }

        Ok(Some(summary_lines.join("\n").trim().to_string()))
    }

    /// Persist a year's entries as one concatenated raw-text file. This is
    /// written immediately after the year's documents are fetched so an
    /// interrupted run can resume from cache without re-fetching.
    pub fn save_raw_year(&self, year: i32, entries: &[DiaryEntry]) -> Result<PathBuf> {
        fs::create_dir_all(&self.paths.output_dir)
            .with_context(|| format!("failed to create {}", self.paths.output_dir.display()))?;

        let wide = rule(RAW_RULE_LEN);
        let mut out = String::new();
        out.push_str(&format!("{year}年日记原文合集\n"));
        out.push_str(&wide);
        out.push('\n');
        out.push_str(&format!("生成时间: {}\n", now_local_stamp()));
        out.push_str(&format!("共 {} 篇日记\n", entries.len()));
        out.push_str(&wide);
        out.push_str("\n\n");

        for entry in entries {
            out.push('\n');
            out.push_str(&wide);
            out.push('\n');
            out.push_str(&format!("【{}】\n", entry.path));
            out.push_str(&wide);
            out.push_str("\n\n");
            out.push_str(&entry.content);
            out.push_str("\n\n");
        }

        let path = self.raw_text_path(year);
        fs::write(&path, out).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Original text saved to: {}", path.display());
        Ok(path)
    }

    /// Re-parse a year's raw-text cache back into entries. The parser splits
    /// on the opening delimiter (`rule / 【`) and then anchors on the *first*
    /// closing rule line after the path header. Content that itself begins
    /// with a byte-identical rule-plus-【 line can still be mis-split; that
    /// ambiguity is inherent to the flat format and deliberately preserved
    /// for compatibility with existing cache files.
    pub fn load_raw_year(&self, year: i32) -> Result<Option<Vec<DiaryEntry>>> {
        let path = self.raw_text_path(year);
        if !path.exists() {
            return Ok(None);
        }
        println!("Reading {year} diaries from cache file: {}", path.display());

        let content =
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;

        let wide = rule(RAW_RULE_LEN);
        let open_delim = format!("\n{wide}\n【");
        let close_delim = format!("{wide}\n\n");

        let mut entries = Vec::new();
        // The first part is the file header; every later part starts with a
        // path line.
        for part in content.split(&open_delim).skip(1) {
            let Some(path_line) = part.lines().next() else {
                continue;
            };
            let entry_path = path_line.trim_end_matches('】').to_string();

            let Some(close_at) = part.find(&close_delim) else {
                continue;
            };
            let entry_content = part[close_at + close_delim.len()..].trim().to_string();

            let filename = entry_path
                .rsplit('/')
                .next()
                .unwrap_or(&entry_path)
                .to_string();
            entries.push(DiaryEntry {
                filename,
                path: entry_path,
                content: entry_content,
                created_at: String::new(),
                modified_at: String::new(),
            });
        }

        println!("Loaded {} diaries from cache", entries.len());
        Ok(Some(entries))
    }

    /// Years with a raw-text cache on disk, ascending. This is the set
    /// offered to the user for cache-only mode at startup.
    pub fn cached_years(&self) -> Result<Vec<i32>> {
        fs::create_dir_all(&self.paths.output_dir)
            .with_context(|| format!("failed to create {}", self.paths.output_dir.display()))?;

        let mut years = Vec::new();
        for dir_entry in fs::read_dir(&self.paths.output_dir)
            .with_context(|| format!("failed to read {}", self.paths.output_dir.display()))?
        {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(caps) = RAW_CACHE_NAME.captures(name)
                && let Ok(year) = caps[1].parse::<i32>()
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }
}
