//! Latest command implementation.

use crate::artifact::find_latest_after;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use std::time::{Duration, SystemTime};

/// Run the latest command.
pub fn run_latest(since_secs: Option<u64>, settings: &Settings) -> Result<()> {
    let since = match since_secs {
        Some(secs) => SystemTime::now()
            .checked_sub(Duration::from_secs(secs))
            .unwrap_or(SystemTime::UNIX_EPOCH),
        None => SystemTime::UNIX_EPOCH,
    };

    let output_dir = settings.output_dir();
    match find_latest_after(&output_dir, since)? {
        Some(path) => println!("{}", path.display()),
        None => Output::info(&format!("No chart found in {}", output_dir.display())),
    }

    Ok(())
}
