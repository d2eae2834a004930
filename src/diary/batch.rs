use crate::diary::entry::DiaryEntry;
use crate::diary::prompts::render_entry;
use crate::diary::tokens::estimate_tokens;

/// A bounded-size, order-preserving group of entries assembled for one
/// completion request. `token_estimate` stays at or under the budget except
/// when the batch holds a single entry that is itself over budget.
#[derive(Debug, Clone)]
pub struct Batch {
    pub entries: Vec<DiaryEntry>,
    pub token_estimate: usize,
}

/// Greedy, order-preserving bin-pack. Entries arrive already naturally
/// sorted; a summary has to read chronologically, so packing efficiency is
/// never traded for reordering. An entry whose own estimate exceeds
/// `max_tokens` becomes a one-element batch rather than an error — a single
/// document is never split.
pub fn split_into_batches(entries: Vec<DiaryEntry>, max_tokens: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut current: Vec<DiaryEntry> = Vec::new();
    let mut current_tokens = 0usize;

    for entry in entries {
        let entry_tokens = estimate_tokens(&render_entry(&entry));

        if current_tokens + entry_tokens > max_tokens && !current.is_empty() {
            batches.push(Batch {
                entries: std::mem::take(&mut current),
                token_estimate: current_tokens,
            });
            current_tokens = 0;
        }

        current.push(entry);
        current_tokens += entry_tokens;
    }

    if !current.is_empty() {
        batches.push(Batch {
            entries: current,
            token_estimate: current_tokens,
        });
    }

    batches
}
