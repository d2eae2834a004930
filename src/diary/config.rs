use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: String,
    pub max_output_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".to_string(),
            max_output_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    pub batch_token_limit: u64,
    pub tokens_per_minute: u64,
    pub max_attempts: u32,
    pub retry_backoff_secs: u64,
    pub request_cooldown_secs: u64,
    pub inter_batch_margin_secs: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            batch_token_limit: 25_000,
            tokens_per_minute: 30_000,
            max_attempts: 3,
            retry_backoff_secs: 30,
            request_cooldown_secs: 2,
            inter_batch_margin_secs: 15,
        }
    }
}

impl RateConfig {
    /// Wait between batch requests sized to stay under the provider's
    /// per-minute token ceiling, plus a fixed safety margin. At the default
    /// 25k budget / 30k ceiling this comes out to 65 seconds.
    pub fn inter_batch_delay_secs(&self) -> u64 {
        (self.batch_token_limit * 60).div_ceil(self.tokens_per_minute) + self.inter_batch_margin_secs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub model: ModelConfig,
    pub rate: RateConfig,
    pub output_dir: PathBuf,
    pub folder_id: Option<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            rate: RateConfig::default(),
            output_dir: PathBuf::from("output"),
            folder_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialDigestConfig {
    model: Option<ModelConfig>,
    rate: Option<RateConfig>,
    output_dir: Option<PathBuf>,
    folder_id: Option<String>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn validate(cfg: &DigestConfig) -> Result<()> {
    if cfg.model.model.trim().is_empty() {
        return Err(anyhow!("invalid model id: cannot be empty"));
    }
    if cfg.model.max_output_tokens == 0 {
        return Err(anyhow!("invalid max output tokens: must be >= 1"));
    }
    if cfg.rate.batch_token_limit == 0 {
        return Err(anyhow!("invalid batch token limit: must be >= 1"));
    }
    if cfg.rate.tokens_per_minute == 0 {
        return Err(anyhow!("invalid rate ceiling: must be >= 1 token/minute"));
    }
    if cfg.rate.batch_token_limit > cfg.rate.tokens_per_minute {
        return Err(anyhow!(
            "invalid batch token limit: must not exceed the per-minute ceiling"
        ));
    }
    if cfg.rate.max_attempts == 0 {
        return Err(anyhow!("invalid max attempts: must be >= 1"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("DIGEST_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".diary-digest").join("config.toml"))
}

fn merge_file_config(base: &mut DigestConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialDigestConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse digest config {}: {err}", path.display()))?;
    if let Some(model) = parsed.model {
        base.model = model;
    }
    if let Some(rate) = parsed.rate {
        base.rate = rate;
    }
    if let Some(output_dir) = parsed.output_dir {
        base.output_dir = output_dir;
    }
    if let Some(folder_id) = parsed.folder_id {
        base.folder_id = Some(folder_id);
    }
    Ok(())
}

pub fn load_config() -> Result<DigestConfig> {
    let mut cfg = DigestConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.model.model = env_or_string("DIGEST_MODEL", &cfg.model.model);
    cfg.model.max_output_tokens =
        env_or_u32("DIGEST_MAX_OUTPUT_TOKENS", cfg.model.max_output_tokens);
    cfg.rate.batch_token_limit =
        env_or_u64("DIGEST_BATCH_TOKEN_LIMIT", cfg.rate.batch_token_limit);
    cfg.rate.tokens_per_minute =
        env_or_u64("DIGEST_TOKENS_PER_MINUTE", cfg.rate.tokens_per_minute);
    cfg.rate.max_attempts = env_or_u32("DIGEST_MAX_ATTEMPTS", cfg.rate.max_attempts);
    cfg.rate.retry_backoff_secs =
        env_or_u64("DIGEST_RETRY_BACKOFF_SECS", cfg.rate.retry_backoff_secs);
    cfg.rate.request_cooldown_secs =
        env_or_u64("DIGEST_REQUEST_COOLDOWN_SECS", cfg.rate.request_cooldown_secs);
    cfg.rate.inter_batch_margin_secs = env_or_u64(
        "DIGEST_INTER_BATCH_MARGIN_SECS",
        cfg.rate.inter_batch_margin_secs,
    );
    if let Some(dir) = env_non_empty("DIGEST_OUTPUT_DIR") {
        cfg.output_dir = PathBuf::from(dir);
    }
    if let Some(folder_id) = env_non_empty("FOLDER_ID") {
        cfg.folder_id = Some(folder_id);
    }

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::{DigestConfig, RateConfig, validate};

    #[test]
    fn default_inter_batch_delay_is_sixty_five_seconds() {
        let rate = RateConfig::default();
        assert_eq!(rate.inter_batch_delay_secs(), 65);
    }

    #[test]
    fn inter_batch_delay_scales_with_budget() {
        let rate = RateConfig {
            batch_token_limit: 10_000,
            tokens_per_minute: 30_000,
            ..RateConfig::default()
        };
        // ceil(60 * 10k / 30k) = 20, plus the 15s margin.
        assert_eq!(rate.inter_batch_delay_secs(), 35);
    }

    #[test]
    fn validate_rejects_budget_over_ceiling() {
        let mut cfg = DigestConfig::default();
        cfg.rate.batch_token_limit = 40_000;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut cfg = DigestConfig::default();
        cfg.rate.max_attempts = 0;
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn default_config_validates() {
        assert!(validate(&DigestConfig::default()).is_ok());
    }
}
