use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One diary document with its full plain-text content. Built either from a
/// remote export or re-parsed out of the yearly raw-text cache; re-parsed
/// entries carry empty timestamps. Identity for resume purposes is the path
/// alone — content and timestamps may differ between a fresh export and a
/// cache re-parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub created_at: String,
    pub modified_at: String,
}

/// The (year) or (year, month) unit a summary artifact covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Month(i32, u32),
    Year(i32),
}

#[derive(Debug, Clone)]
pub struct SummaryArtifact {
    pub scope: Scope,
    pub text: String,
    pub generated_at: String,
}

/// Year → ordered entries. BTreeMap keeps years ascending, which is the
/// processing order everywhere in the pipeline.
pub type YearIndex = BTreeMap<i32, Vec<DiaryEntry>>;

/// Year → month → ordered entries. Every present (year, month) key holds at
/// least one entry.
pub type YearMonthIndex = BTreeMap<i32, BTreeMap<u32, Vec<DiaryEntry>>>;
