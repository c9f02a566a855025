// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::time::Duration;

use anyhow::Result;
use fiscus::application::{ServiceConfig, WalletService};
use fiscus::domain::{BusinessLedger, CardLedger};
use fiscus::io::SeedData;
use fiscus::storage::Repository;
use tempfile::TempDir;

/// Service with empty ledgers and no settings storage
pub fn empty_service() -> WalletService {
    WalletService::empty()
}

/// Service over the built-in demo data
pub fn seeded_service() -> Result<WalletService> {
    WalletService::from_seed(SeedData::builtin()?, ServiceConfig::default())
}

/// Service with a small simulated latency, to exercise the suspend-then-lock path
pub fn slow_service(latency_ms: u64) -> WalletService {
    WalletService::new(
        CardLedger::new(),
        BusinessLedger::new(),
        ServiceConfig::default().with_latency(Duration::from_millis(latency_ms)),
    )
}

/// Open (or create) a settings database inside `dir`
pub async fn settings_repo(dir: &TempDir) -> Result<Repository> {
    let db_path = dir.path().join("settings.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.display());
    Repository::init(&url).await
}

/// Service with empty ledgers whose settings persist to a temporary database
pub async fn persistent_service(dir: &TempDir) -> Result<WalletService> {
    let repo = settings_repo(dir).await?;
    let service = WalletService::empty().with_repository(repo);
    service.load_settings().await?;
    Ok(service)
}
