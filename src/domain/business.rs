use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cents, LedgerError, percentage};

pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    BusinessPayment,
    BusinessRefund,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::BusinessPayment => "business_payment",
            TransactionType::BusinessRefund => "business_refund",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(TransactionStatus::Completed),
            "pending" => Ok(TransactionStatus::Pending),
            other => Err(LedgerError::InvalidInput(format!(
                "unrecognized transaction status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A merchant-side payment or refund.
///
/// Refunds carry a negative amount and point back at the payment they refund.
/// The reference only ever runs refund -> original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessTransaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Cents,
    pub customer: String,
    pub payment_method: String,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    pub refundable: bool,
    #[serde(default)]
    pub refunded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_transaction_id: Option<TransactionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BusinessTransaction {
    pub fn is_refund(&self) -> bool {
        self.transaction_type == TransactionType::BusinessRefund
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethodSummary {
    pub payment_method: String,
    pub count: usize,
    pub total: Cents,
    /// Share of total revenue
    pub percentage: f64,
}

/// Derived figures for the merchant dashboard. Nothing here is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessMetrics {
    /// Completed payments
    pub total_revenue: Cents,
    /// Absolute value of all refunds
    pub total_refunds: Cents,
    pub net_revenue: Cents,
    pub payment_count: usize,
    pub refund_count: usize,
    pub pending_count: usize,
    pub pending_amount: Cents,
    pub average_payment: Cents,
    /// Refunds as a percentage of revenue
    pub refund_rate: f64,
    pub by_payment_method: Vec<PaymentMethodSummary>,
}

/// In-memory store of merchant transactions, most recent first.
#[derive(Debug, Clone)]
pub struct BusinessLedger {
    transactions: Vec<BusinessTransaction>,
    next_id: TransactionId,
}

impl Default for BusinessLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BusinessLedger {
    pub fn new() -> Self {
        Self {
            transactions: Vec::new(),
            next_id: 1,
        }
    }

    /// Seed a ledger from existing records. Records are ordered newest first.
    pub fn from_transactions(
        mut transactions: Vec<BusinessTransaction>,
    ) -> Result<Self, LedgerError> {
        let mut by_id = HashMap::new();
        for tx in &transactions {
            if by_id.insert(tx.id, tx).is_some() {
                return Err(LedgerError::InvalidInput(format!(
                    "duplicate transaction id {}",
                    tx.id
                )));
            }
            if tx.is_refund() && (tx.refundable || tx.amount >= 0) {
                return Err(LedgerError::InvalidInput(format!(
                    "refund {} must be negative and not refundable",
                    tx.id
                )));
            }
            if !tx.is_refund() && tx.refundable && tx.refunded {
                return Err(LedgerError::InvalidInput(format!(
                    "payment {} cannot be both refunded and refundable",
                    tx.id
                )));
            }
        }

        let mut refunded = HashSet::new();
        for tx in transactions.iter().filter(|t| t.is_refund()) {
            let original = tx
                .original_transaction_id
                .and_then(|id| by_id.get(&id))
                .ok_or_else(|| {
                    LedgerError::InvalidInput(format!(
                        "refund {} does not reference a known transaction",
                        tx.id
                    ))
                })?;
            if original.is_refund() {
                return Err(LedgerError::InvalidInput(format!(
                    "refund {} references refund {}",
                    tx.id, original.id
                )));
            }
            if original.refundable || !original.refunded {
                return Err(LedgerError::InvalidInput(format!(
                    "refund {} references payment {} that is not marked refunded",
                    tx.id, original.id
                )));
            }
            if !refunded.insert(original.id) {
                return Err(LedgerError::InvalidInput(format!(
                    "payment {} has more than one refund",
                    original.id
                )));
            }
        }

        transactions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let next_id = transactions
            .iter()
            .map(|t| t.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(exhausted)?;
        Ok(Self {
            transactions,
            next_id,
        })
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Most recent first, optionally truncated.
    pub fn list(&self, limit: Option<usize>) -> Vec<BusinessTransaction> {
        let take = limit.unwrap_or(self.transactions.len());
        self.transactions.iter().take(take).cloned().collect()
    }

    pub fn get(&self, id: TransactionId) -> Result<BusinessTransaction, LedgerError> {
        self.transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Refunds issued against a payment.
    pub fn refunds_for(&self, id: TransactionId) -> Vec<BusinessTransaction> {
        self.transactions
            .iter()
            .filter(|t| t.original_transaction_id == Some(id))
            .cloned()
            .collect()
    }

    /// Record an incoming payment. Completed and pending payments are both refundable.
    pub fn record_payment(
        &mut self,
        customer: impl Into<String>,
        payment_method: impl Into<String>,
        amount: Cents,
        status: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<BusinessTransaction, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::InvalidInput(
                "payment amount must be positive".to_string(),
            ));
        }

        let payment = BusinessTransaction {
            id: self.take_id()?,
            transaction_type: TransactionType::BusinessPayment,
            amount,
            customer: customer.into(),
            payment_method: payment_method.into(),
            timestamp: now,
            status,
            refundable: true,
            refunded: false,
            original_transaction_id: None,
            reason: None,
        };
        self.transactions.insert(0, payment.clone());
        Ok(payment)
    }

    /// Refund a payment. The original stays in place, marked refunded and no
    /// longer refundable; a linked negative-amount record is prepended.
    /// Returns `(refund, updated original)`.
    pub fn refund(
        &mut self,
        id: TransactionId,
        amount: Cents,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(BusinessTransaction, BusinessTransaction), LedgerError> {
        let index = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        let original = &self.transactions[index];
        if !original.refundable {
            return Err(LedgerError::NotRefundable(id));
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidInput(
                "refund amount must be positive".to_string(),
            ));
        }
        if amount > original.amount.saturating_abs() {
            return Err(LedgerError::RefundExceedsOriginal {
                transaction_id: id,
                original_amount: original.amount,
                requested: amount,
            });
        }

        let following = self.next_id.checked_add(1).ok_or_else(exhausted)?;
        let refund = BusinessTransaction {
            id: self.next_id,
            transaction_type: TransactionType::BusinessRefund,
            amount: -amount,
            customer: original.customer.clone(),
            payment_method: original.payment_method.clone(),
            timestamp: now,
            status: TransactionStatus::Completed,
            refundable: false,
            refunded: false,
            original_transaction_id: Some(id),
            reason: Some(reason.into()),
        };

        // Validation is done; commit every change together.
        self.next_id = following;
        let original = &mut self.transactions[index];
        original.refundable = false;
        original.refunded = true;
        let updated = original.clone();
        self.transactions.insert(0, refund.clone());

        Ok((refund, updated))
    }

    /// Sums saturate at `Cents::MAX` rather than wrapping.
    pub fn metrics(&self) -> BusinessMetrics {
        let mut total_revenue: Cents = 0;
        let mut total_refunds: Cents = 0;
        let mut payment_count = 0;
        let mut refund_count = 0;
        let mut pending_count = 0;
        let mut pending_amount: Cents = 0;
        let mut methods: BTreeMap<&str, (usize, Cents)> = BTreeMap::new();

        for tx in &self.transactions {
            match (tx.transaction_type, tx.status) {
                (TransactionType::BusinessPayment, TransactionStatus::Completed) => {
                    total_revenue = total_revenue.saturating_add(tx.amount);
                    payment_count += 1;
                    let entry = methods.entry(tx.payment_method.as_str()).or_insert((0, 0));
                    entry.0 += 1;
                    entry.1 = entry.1.saturating_add(tx.amount);
                }
                (TransactionType::BusinessPayment, TransactionStatus::Pending) => {
                    pending_count += 1;
                    pending_amount = pending_amount.saturating_add(tx.amount);
                }
                (TransactionType::BusinessRefund, _) => {
                    total_refunds = total_refunds.saturating_add(tx.amount.saturating_abs());
                    refund_count += 1;
                }
            }
        }

        let mut by_payment_method: Vec<PaymentMethodSummary> = methods
            .into_iter()
            .map(|(method, (count, total))| PaymentMethodSummary {
                payment_method: method.to_string(),
                count,
                total,
                percentage: percentage(total, total_revenue),
            })
            .collect();
        by_payment_method.sort_by(|a, b| b.total.cmp(&a.total));

        BusinessMetrics {
            total_revenue,
            total_refunds,
            net_revenue: total_revenue - total_refunds,
            payment_count,
            refund_count,
            pending_count,
            pending_amount,
            average_payment: if payment_count == 0 {
                0
            } else {
                total_revenue / payment_count as Cents
            },
            refund_rate: percentage(total_refunds, total_revenue),
            by_payment_method,
        }
    }

    fn take_id(&mut self) -> Result<TransactionId, LedgerError> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or_else(exhausted)?;
        Ok(id)
    }
}

fn exhausted() -> LedgerError {
    LedgerError::InvalidInput("transaction ids exhausted".to_string())
}
