use thiserror::Error;

use super::{CardId, Cents, TransactionId};

/// Coarse classification of ledger failures, independent of which ledger raised them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    LimitExceeded,
    LimitBelowSpend,
    NotRefundable,
    Frozen,
}

/// Errors raised by the card and business ledgers.
/// A ledger never mutates its collection when returning one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Virtual card not found: {0}")]
    CardNotFound(CardId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Spending limit exceeded on card {card_id}: limit {limit}, spent {current}, requested {requested}")]
    LimitExceeded {
        card_id: CardId,
        limit: Cents,
        current: Cents,
        requested: Cents,
    },

    #[error("New limit {requested_limit} on card {card_id} is below current spending {current}")]
    LimitBelowSpend {
        card_id: CardId,
        requested_limit: Cents,
        current: Cents,
    },

    #[error("Virtual card is frozen: {0}")]
    CardFrozen(CardId),

    #[error("Transaction is not refundable: {0}")]
    NotRefundable(TransactionId),

    #[error("Refund of {requested} exceeds original amount {original_amount} of transaction {transaction_id}")]
    RefundExceedsOriginal {
        transaction_id: TransactionId,
        original_amount: Cents,
        requested: Cents,
    },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::CardNotFound(_) | LedgerError::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::InvalidInput(_) | LedgerError::RefundExceedsOriginal { .. } => {
                ErrorKind::InvalidInput
            }
            LedgerError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            LedgerError::LimitBelowSpend { .. } => ErrorKind::LimitBelowSpend,
            LedgerError::CardFrozen(_) => ErrorKind::Frozen,
            LedgerError::NotRefundable(_) => ErrorKind::NotRefundable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_not_found() {
        assert_eq!(LedgerError::CardNotFound(7).kind(), ErrorKind::NotFound);
        assert_eq!(LedgerError::TransactionNotFound(7).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_limit_exceeded_message() {
        let err = LedgerError::LimitExceeded {
            card_id: 1,
            limit: 10000,
            current: 4000,
            requested: 7000,
        };
        assert_eq!(err.kind(), ErrorKind::LimitExceeded);
        assert!(err.to_string().contains("Spending limit exceeded"));
    }
}
