use crate::diary::batch::split_into_batches;
use crate::diary::config::{ModelConfig, RateConfig};
use crate::diary::entry::DiaryEntry;
use crate::diary::prompts;
use crate::diary::tokens::estimate_tokens;
use crate::error::CompletionError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 600;

/// One call to the LLM service: prompt in, generated text out. Implemented
/// for the real Anthropic client and by fakes in tests.
pub trait Completion {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Bounded linear backoff for rate-limit errors: with the default 3 attempts
/// and 30s base, a request waits 30s then 60s before its retries and gives
/// up after the third failure.
#[derive(Debug, Clone, Copy)]
pub struct RetrySchedule {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl RetrySchedule {
    pub fn from_rate(rate: &RateConfig) -> Self {
        Self {
            max_attempts: rate.max_attempts,
            backoff_secs: rate.retry_backoff_secs,
        }
    }

    /// Delay before the retry following `failed_attempt` (1-based), or `None`
    /// when the attempt budget is exhausted.
    pub fn delay_before_retry(&self, failed_attempt: u32) -> Option<Duration> {
        if failed_attempt >= self.max_attempts {
            None
        } else {
            Some(Duration::from_secs(
                self.backoff_secs * u64::from(failed_attempt),
            ))
        }
    }
}

/// Drive one logical request through its retry state machine. Only
/// rate-limit-class failures are retried; anything else propagates on the
/// spot.
pub fn complete_with_retry(
    completer: &dyn Completion,
    schedule: RetrySchedule,
    prompt: &str,
) -> Result<String, CompletionError> {
    let mut attempt = 1u32;
    loop {
        match completer.complete(prompt) {
            Ok(text) => return Ok(text),
            Err(err) if err.is_rate_limited() => match schedule.delay_before_retry(attempt) {
                Some(delay) => {
                    println!(
                        "  Encountered rate limit, waiting {} seconds before retry...",
                        delay.as_secs()
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                None => {
                    return Err(CompletionError::Failed(format!(
                        "exceeded maximum retries ({}): {err}",
                        schedule.max_attempts
                    )));
                }
            },
            Err(err) => return Err(err),
        }
    }
}

pub struct AnthropicCompleter {
    http: Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
}

fn extract_anthropic_text(json: &Value) -> Option<String> {
    let mut chunks = Vec::new();
    let content = json.get("content").and_then(Value::as_array)?;
    for part in content {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            chunks.push(text.to_string());
        }
    }
    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

fn is_rate_limit_signature(status: u16, body: &str) -> bool {
    status == 429 || body.contains("rate_limit_error")
}

impl AnthropicCompleter {
    pub fn new(api_key: String, model: &ModelConfig) -> Result<Self, CompletionError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| CompletionError::Failed(err.to_string()))?;
        Ok(Self {
            http,
            api_key,
            model: model.model.clone(),
            max_output_tokens: model.max_output_tokens,
        })
    }
}

impl Completion for AnthropicCompleter {
    fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let payload = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_output_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .http
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .map_err(|err| CompletionError::Failed(format!("anthropic call failed: {err}")))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().unwrap_or_default();
            if is_rate_limit_signature(status, &body) {
                return Err(CompletionError::RateLimited(format!(
                    "anthropic returned {status}"
                )));
            }
            return Err(CompletionError::Failed(format!(
                "anthropic call failed with status {status}: {body}"
            )));
        }

        let json: Value = response
            .json()
            .map_err(|err| CompletionError::Failed(format!("anthropic response unreadable: {err}")))?;
        extract_anthropic_text(&json)
            .ok_or_else(|| CompletionError::Failed("anthropic response missing text content".to_string()))
    }
}

/// Issues the monthly and yearly completion requests, strictly sequentially,
/// with fixed delays sized to the provider's per-minute token ceiling.
pub struct SummaryEngine<'a> {
    completer: &'a dyn Completion,
    rate: RateConfig,
}

impl<'a> SummaryEngine<'a> {
    pub fn new(completer: &'a dyn Completion, rate: RateConfig) -> Self {
        Self { completer, rate }
    }

    fn schedule(&self) -> RetrySchedule {
        RetrySchedule::from_rate(&self.rate)
    }

    /// Cooldown after every successful request to smooth steady-state rate.
    fn cooldown(&self) {
        thread::sleep(Duration::from_secs(self.rate.request_cooldown_secs));
    }

    fn inter_batch_wait(&self) {
        let secs = self.rate.inter_batch_delay_secs();
        println!("    Waiting {secs} seconds to avoid rate limits...");
        thread::sleep(Duration::from_secs(secs));
    }

    pub fn summarize_month(
        &self,
        year: i32,
        month: u32,
        entries: &[DiaryEntry],
    ) -> Result<String, CompletionError> {
        println!("Generating AI summary for {year}-{month:02}...");

        let content = prompts::render_entries(entries);
        let total_tokens = estimate_tokens(&content);
        println!(
            "  Approximately {total_tokens} tokens, {} diary entries",
            entries.len()
        );

        let summary = complete_with_retry(
            self.completer,
            self.schedule(),
            &prompts::monthly_prompt(year, month, &content),
        )?;
        self.cooldown();
        Ok(summary)
    }

    /// Single-request fast path for a year whose whole content fits the
    /// batch budget.
    pub fn summarize_year_direct(
        &self,
        year: i32,
        entries: &[DiaryEntry],
    ) -> Result<String, CompletionError> {
        let content = prompts::render_entries(entries);
        let summary = complete_with_retry(
            self.completer,
            self.schedule(),
            &prompts::yearly_direct_prompt(year, &content),
        )?;
        self.cooldown();
        Ok(summary)
    }

    /// Batch-and-merge path for a year over budget: one request per batch
    /// with the inter-batch wait, then a synthesis request over the labeled
    /// part summaries.
    pub fn summarize_year_via_batches(
        &self,
        year: i32,
        entries: &[DiaryEntry],
    ) -> Result<String, CompletionError> {
        let budget = self.rate.batch_token_limit as usize;
        let batches = split_into_batches(entries.to_vec(), budget);
        println!("  Split into {} batches", batches.len());

        let mut batch_summaries = Vec::with_capacity(batches.len());
        let batch_count = batches.len();
        for (i, batch) in batches.iter().enumerate() {
            println!(
                "  Processing batch {}/{} ({} diary entries, ~{} tokens)...",
                i + 1,
                batch_count,
                batch.entries.len(),
                batch.token_estimate
            );

            let content = prompts::render_entries(&batch.entries);
            let summary = complete_with_retry(
                self.completer,
                self.schedule(),
                &prompts::yearly_batch_prompt(year, &content),
            )?;
            batch_summaries.push(summary);

            if i + 1 < batch_count {
                self.inter_batch_wait();
            }
        }

        println!("  Merging all batch summaries to generate final yearly summary...");
        let final_summary = complete_with_retry(
            self.completer,
            self.schedule(),
            &prompts::yearly_synthesis_prompt(year, &batch_summaries),
        )?;
        self.cooldown();
        Ok(final_summary)
    }

    /// Alternate yearly strategy over raw content: direct when the estimate
    /// fits the budget, batch-and-merge otherwise.
    pub fn summarize_year(
        &self,
        year: i32,
        entries: &[DiaryEntry],
    ) -> Result<String, CompletionError> {
        println!("Generating AI summary for year {year}...");

        let total_tokens = estimate_tokens(&prompts::render_entries(entries));
        println!(
            "  Total approximately {total_tokens} tokens, {} diary entries",
            entries.len()
        );

        if total_tokens < self.rate.batch_token_limit as usize {
            self.summarize_year_direct(year, entries)
        } else {
            println!(
                "  Content is large, will process in batches (each batch <{} tokens)...",
                self.rate.batch_token_limit
            );
            self.summarize_year_via_batches(year, entries)
        }
    }

    /// Primary yearly path: fold the month summaries into one rollup that
    /// also surfaces recurring emotional/behavioral patterns across months.
    pub fn summarize_year_from_monthly(
        &self,
        year: i32,
        monthly_summaries: &BTreeMap<u32, String>,
    ) -> Result<String, CompletionError> {
        println!("Generating yearly summary for {year} (based on monthly summaries)...");

        let prompt = prompts::yearly_from_monthly_prompt(year, monthly_summaries);
        let total_tokens = estimate_tokens(&prompt);
        println!("  Monthly summaries total approximately {total_tokens} tokens");

        let summary = complete_with_retry(self.completer, self.schedule(), &prompt)?;
        self.cooldown();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Completion, RetrySchedule, SummaryEngine, complete_with_retry, extract_anthropic_text,
        is_rate_limit_signature,
    };
    use crate::diary::config::RateConfig;
    use crate::diary::entry::DiaryEntry;
    use crate::error::CompletionError;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    /// Fails with a rate-limit error `failures` times, then succeeds,
    /// recording every prompt it sees.
    struct FlakyCompleter {
        failures: RefCell<u32>,
        prompts: RefCell<Vec<String>>,
        reply: String,
    }

    impl FlakyCompleter {
        fn new(failures: u32, reply: &str) -> Self {
            Self {
                failures: RefCell::new(failures),
                prompts: RefCell::new(Vec::new()),
                reply: reply.to_string(),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.borrow().len()
        }
    }

    impl Completion for FlakyCompleter {
        fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            let mut failures = self.failures.borrow_mut();
            if *failures > 0 {
                *failures -= 1;
                return Err(CompletionError::RateLimited("429".to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    struct FatalCompleter;

    impl Completion for FatalCompleter {
        fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Failed("invalid_request_error".to_string()))
        }
    }

    fn quiet_rate() -> RateConfig {
        RateConfig {
            max_attempts: 3,
            retry_backoff_secs: 0,
            request_cooldown_secs: 0,
            inter_batch_margin_secs: 0,
            batch_token_limit: 100,
            tokens_per_minute: 6000,
        }
    }

    fn entry(path: &str, cjk_chars: usize) -> DiaryEntry {
        DiaryEntry {
            filename: path.to_string(),
            path: path.to_string(),
            content: "字".repeat(cjk_chars),
            created_at: String::new(),
            modified_at: String::new(),
        }
    }

    #[test]
    fn linear_backoff_schedule_is_30_then_60_then_give_up() {
        let schedule = RetrySchedule {
            max_attempts: 3,
            backoff_secs: 30,
        };
        assert_eq!(schedule.delay_before_retry(1).map(|d| d.as_secs()), Some(30));
        assert_eq!(schedule.delay_before_retry(2).map(|d| d.as_secs()), Some(60));
        assert_eq!(schedule.delay_before_retry(3), None);
    }

    #[test]
    fn rate_limited_request_succeeds_on_third_attempt() {
        let completer = FlakyCompleter::new(2, "月度摘要文本");
        let schedule = RetrySchedule {
            max_attempts: 3,
            backoff_secs: 0,
        };

        let got = complete_with_retry(&completer, schedule, "prompt").expect("retries succeed");
        assert_eq!(got, "月度摘要文本");
        assert_eq!(completer.calls(), 3);
    }

    #[test]
    fn exhausted_retries_escalate_to_terminal_failure() {
        let completer = FlakyCompleter::new(5, "unreached");
        let schedule = RetrySchedule {
            max_attempts: 3,
            backoff_secs: 0,
        };

        let err = complete_with_retry(&completer, schedule, "prompt").unwrap_err();
        assert!(matches!(err, CompletionError::Failed(_)));
        assert!(err.to_string().contains("exceeded maximum retries"));
        assert_eq!(completer.calls(), 3);
    }

    #[test]
    fn non_rate_limit_errors_are_not_retried() {
        let schedule = RetrySchedule {
            max_attempts: 3,
            backoff_secs: 0,
        };
        let err = complete_with_retry(&FatalCompleter, schedule, "prompt").unwrap_err();
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn monthly_summary_issues_one_request_with_entry_framing() {
        let completer = FlakyCompleter::new(0, "四月摘要");
        let engine = SummaryEngine::new(&completer, quiet_rate());

        let entries = vec![entry("2023年/2023年4月/2023年4月1日", 5)];
        let got = engine.summarize_month(2023, 4, &entries).expect("summary");

        assert_eq!(got, "四月摘要");
        assert_eq!(completer.calls(), 1);
        let prompt = completer.prompts.borrow()[0].clone();
        assert!(prompt.contains("=== 2023年/2023年4月/2023年4月1日 ==="));
        assert!(prompt.contains("2023年4月"));
    }

    #[test]
    fn small_year_takes_the_direct_path() {
        let completer = FlakyCompleter::new(0, "年度摘要");
        let engine = SummaryEngine::new(&completer, quiet_rate());

        let entries = vec![entry("2023年/2023年1月/2023年1月1日", 30)];
        let got = engine.summarize_year(2023, &entries).expect("summary");

        assert_eq!(got, "年度摘要");
        assert_eq!(completer.calls(), 1);
        assert!(completer.prompts.borrow()[0].contains("年度摘要"));
    }

    #[test]
    fn large_year_batches_then_synthesizes() {
        let completer = FlakyCompleter::new(0, "分段摘要");
        let engine = SummaryEngine::new(&completer, quiet_rate());

        // Three entries of ~60 tokens against a 100-token budget: three
        // batches, then one synthesis request.
        let entries = vec![
            entry("2023年/2023年1月/01", 60),
            entry("2023年/2023年2月/02", 60),
            entry("2023年/2023年3月/03", 60),
        ];
        let got = engine.summarize_year(2023, &entries).expect("summary");

        assert_eq!(got, "分段摘要");
        assert_eq!(completer.calls(), 4);
        let prompts = completer.prompts.borrow();
        assert!(prompts[3].contains("【Part 1 Summary】"));
        assert!(prompts[3].contains("【Part 3 Summary】"));
    }

    #[test]
    fn yearly_rollup_concatenates_months_in_order() {
        let completer = FlakyCompleter::new(0, "周期性总结");
        let engine = SummaryEngine::new(&completer, quiet_rate());

        let mut monthly = BTreeMap::new();
        monthly.insert(2, "二月摘要".to_string());
        monthly.insert(11, "十一月摘要".to_string());

        let got = engine
            .summarize_year_from_monthly(2023, &monthly)
            .expect("summary");

        assert_eq!(got, "周期性总结");
        let prompt = completer.prompts.borrow()[0].clone();
        let feb = prompt.find("二月摘要").expect("feb");
        let nov = prompt.find("十一月摘要").expect("nov");
        assert!(feb < nov);
    }

    #[test]
    fn anthropic_text_extraction_reads_content_blocks() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"}
            ]
        });
        assert_eq!(
            extract_anthropic_text(&payload).as_deref(),
            Some("line one\nline two")
        );
    }

    #[test]
    fn rate_limit_signature_matches_status_or_error_class() {
        assert!(is_rate_limit_signature(429, ""));
        assert!(is_rate_limit_signature(
            529,
            "{\"error\":{\"type\":\"rate_limit_error\"}}"
        ));
        assert!(!is_rate_limit_signature(500, "overloaded_error"));
    }
}
