use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, LedgerError};

pub type CardId = u64;

/// Opaque reference to a wallet owned outside this crate.
pub type WalletId = u64;

/// Virtual cards expire this many months after issuance.
const CARD_VALIDITY_MONTHS: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardPurpose {
    OnlineShopping,
    Subscription,
    OneTime,
}

impl CardPurpose {
    pub const ALL: [CardPurpose; 3] = [
        CardPurpose::OnlineShopping,
        CardPurpose::Subscription,
        CardPurpose::OneTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CardPurpose::OnlineShopping => "online-shopping",
            CardPurpose::Subscription => "subscription",
            CardPurpose::OneTime => "one-time",
        }
    }
}

impl std::str::FromStr for CardPurpose {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online-shopping" => Ok(CardPurpose::OnlineShopping),
            "subscription" => Ok(CardPurpose::Subscription),
            "one-time" => Ok(CardPurpose::OneTime),
            other => Err(LedgerError::InvalidInput(format!(
                "unrecognized card purpose '{}' (expected online-shopping, subscription or one-time)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for CardPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single-purpose card drawing on a wallet, capped by a spending limit.
///
/// `current_spending <= spending_limit` holds for every card the ledger hands out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualCard {
    pub id: CardId,
    /// Display string, four groups of four digits
    pub card_number: String,
    /// `MM/YY`
    pub expiry_date: String,
    pub cvv: String,
    pub purpose: CardPurpose,
    pub spending_limit: Cents,
    pub current_spending: Cents,
    pub is_active: bool,
    pub is_frozen: bool,
    pub wallet_id: WalletId,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl VirtualCard {
    /// Build a fresh card. The id must be assigned by the ledger.
    pub fn issue(
        id: CardId,
        purpose: CardPurpose,
        spending_limit: Cents,
        wallet_id: WalletId,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let expires = issued_at
            .checked_add_months(Months::new(CARD_VALIDITY_MONTHS))
            .unwrap_or(issued_at);

        Self {
            id,
            card_number: generate_card_number(),
            expiry_date: expires.format("%m/%y").to_string(),
            cvv: generate_cvv(),
            purpose,
            spending_limit,
            current_spending: 0,
            is_active: true,
            is_frozen: false,
            wallet_id,
            created_at: issued_at,
            last_used: None,
        }
    }

    /// Card number with all but the last four digits hidden.
    pub fn masked_number(&self) -> String {
        let digits: String = self
            .card_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        let last4 = &digits[digits.len().saturating_sub(4)..];
        format!("**** **** **** {}", last4)
    }
}

/// Percentage of the limit already spent.
pub fn spending_progress(card: &VirtualCard) -> f64 {
    if card.spending_limit <= 0 {
        return 0.0;
    }
    card.current_spending as f64 / card.spending_limit as f64 * 100.0
}

pub fn remaining_balance(card: &VirtualCard) -> Cents {
    card.spending_limit - card.current_spending
}

fn generate_card_number() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut digits = String::with_capacity(19);
    digits.push('4');
    for (i, b) in bytes[1..16].iter().enumerate() {
        if (i + 1) % 4 == 0 {
            digits.push(' ');
        }
        digits.push(char::from(b'0' + b % 10));
    }
    digits
}

fn generate_cvv() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    format!("{}{}{}", bytes[0] % 10, bytes[1] % 10, bytes[2] % 10)
}
