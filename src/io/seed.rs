use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{BusinessLedger, BusinessTransaction, CardLedger, VirtualCard};

const BUILTIN_SEED: &str = include_str!("seed.json");

/// Initial contents for a session's ledgers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub virtual_cards: Vec<VirtualCard>,
    #[serde(default)]
    pub business_transactions: Vec<BusinessTransaction>,
}

impl SeedData {
    /// The demo data shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_SEED).context("Built-in seed data is invalid")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse seed data")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid seed file: {}", path.display()))
    }

    /// Build both ledgers, checking the seeded records against ledger rules.
    pub fn into_ledgers(self) -> Result<(CardLedger, BusinessLedger)> {
        let cards = CardLedger::from_cards(self.virtual_cards).context("Invalid seeded cards")?;
        let transactions = BusinessLedger::from_transactions(self.business_transactions)
            .context("Invalid seeded transactions")?;
        Ok((cards, transactions))
    }
}
