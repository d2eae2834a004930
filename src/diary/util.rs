use anyhow::Result;
use chrono::Local;
use std::time::{SystemTime, UNIX_EPOCH};

/// Return the current Unix epoch in seconds.
///
/// This is the single, canonical implementation — **do not** duplicate
/// this helper in other modules.
pub fn now_epoch_secs() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Local wall-clock timestamp used in every persisted artifact footer.
pub fn now_local_stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
