use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BusinessMetrics, BusinessTransaction, CardPortfolio, Cents, VirtualCard};

/// A card together with its derived spend figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub card: VirtualCard,
    pub progress: f64,
    pub remaining: Cents,
}

/// Everything the merchant dashboard shows, taken at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub portfolio: CardPortfolio,
    pub metrics: BusinessMetrics,
    pub recent_transactions: Vec<BusinessTransaction>,
}
