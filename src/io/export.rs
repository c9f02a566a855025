use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::WalletService;
use crate::domain::{BusinessTransaction, Settings, VirtualCard};

/// Everything a session holds, for the full JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub virtual_cards: Vec<VirtualCard>,
    pub business_transactions: Vec<BusinessTransaction>,
    pub settings: Settings,
}

/// Writes session contents out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a WalletService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a WalletService) -> Self {
        Self { service }
    }

    /// Export virtual cards to CSV. The CVV is never written.
    pub async fn export_cards_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let cards = self.service.list_cards().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "card_number",
            "expiry_date",
            "purpose",
            "spending_limit",
            "current_spending",
            "is_active",
            "is_frozen",
            "wallet_id",
            "created_at",
            "last_used",
        ])?;

        for card in &cards {
            csv_writer.write_record(&[
                card.id.to_string(),
                card.masked_number(),
                card.expiry_date.clone(),
                card.purpose.to_string(),
                card.spending_limit.to_string(),
                card.current_spending.to_string(),
                card.is_active.to_string(),
                card.is_frozen.to_string(),
                card.wallet_id.to_string(),
                card.created_at.to_rfc3339(),
                card.last_used.map(|t| t.to_rfc3339()).unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(cards.len())
    }

    /// Export business transactions to CSV, most recent first.
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.list_transactions(None).await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "type",
            "amount",
            "customer",
            "payment_method",
            "timestamp",
            "status",
            "refundable",
            "refunded",
            "original_transaction_id",
            "reason",
        ])?;

        for tx in &transactions {
            csv_writer.write_record(&[
                tx.id.to_string(),
                tx.transaction_type.to_string(),
                tx.amount.to_string(),
                tx.customer.clone(),
                tx.payment_method.clone(),
                tx.timestamp.to_rfc3339(),
                tx.status.to_string(),
                tx.refundable.to_string(),
                tx.refunded.to_string(),
                tx.original_transaction_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                tx.reason.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let (virtual_cards, business_transactions) = self.service.snapshot().await;
        SessionSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            virtual_cards,
            business_transactions,
            settings: self.service.settings().await,
        }
    }

    /// Export the whole session as pretty-printed JSON.
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<SessionSnapshot> {
        let snapshot = self.snapshot().await;
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        Ok(snapshot)
    }
}
