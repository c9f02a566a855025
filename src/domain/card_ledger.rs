use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    CardId, CardPurpose, Cents, LedgerError, VirtualCard, WalletId, percentage, remaining_balance,
};

/// Aggregate view over every card in a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPortfolio {
    pub card_count: usize,
    pub active_count: usize,
    pub frozen_count: usize,
    pub total_limit: Cents,
    pub total_spent: Cents,
    pub total_remaining: Cents,
    /// Spent as a percentage of the combined limit
    pub utilization: f64,
}

/// Authoritative in-memory store of virtual cards.
///
/// Cards are kept most-recent-first. Reads return clones; mutations validate
/// first and only then touch the stored record.
#[derive(Debug, Clone)]
pub struct CardLedger {
    cards: Vec<VirtualCard>,
    next_id: CardId,
}

impl Default for CardLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CardLedger {
    pub fn new() -> Self {
        Self {
            cards: Vec::new(),
            next_id: 1,
        }
    }

    /// Seed a ledger from existing records, keeping their order.
    pub fn from_cards(cards: Vec<VirtualCard>) -> Result<Self, LedgerError> {
        let mut seen = HashSet::new();
        for card in &cards {
            if card.id == 0 {
                return Err(LedgerError::InvalidInput(
                    "card ids must be positive".to_string(),
                ));
            }
            if !seen.insert(card.id) {
                return Err(LedgerError::InvalidInput(format!(
                    "duplicate card id {}",
                    card.id
                )));
            }
            if card.spending_limit <= 0
                || card.current_spending < 0
                || card.current_spending > card.spending_limit
            {
                return Err(LedgerError::InvalidInput(format!(
                    "card {} violates its spending limit",
                    card.id
                )));
            }
        }

        let next_id = cards
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| LedgerError::InvalidInput("card ids exhausted".to_string()))?;
        Ok(Self { cards, next_id })
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn list(&self) -> Vec<VirtualCard> {
        self.cards.clone()
    }

    pub fn list_for_wallet(&self, wallet_id: WalletId) -> Vec<VirtualCard> {
        self.cards
            .iter()
            .filter(|c| c.wallet_id == wallet_id)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: CardId) -> Result<VirtualCard, LedgerError> {
        self.find(id).cloned()
    }

    /// Issue a new card, placing it at the front of the ledger.
    pub fn issue(
        &mut self,
        purpose: CardPurpose,
        spending_limit: Cents,
        wallet_id: WalletId,
        now: DateTime<Utc>,
    ) -> Result<VirtualCard, LedgerError> {
        if spending_limit <= 0 {
            return Err(LedgerError::InvalidInput(
                "spending limit must be positive".to_string(),
            ));
        }

        let following = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| LedgerError::InvalidInput("card ids exhausted".to_string()))?;
        let card = VirtualCard::issue(self.next_id, purpose, spending_limit, wallet_id, now);
        self.next_id = following;
        self.cards.insert(0, card.clone());
        Ok(card)
    }

    /// Charge `amount` against a card. Fails without side effects when the card
    /// is frozen or the charge would push spending past the limit.
    pub fn record_spend(
        &mut self,
        id: CardId,
        amount: Cents,
        now: DateTime<Utc>,
    ) -> Result<VirtualCard, LedgerError> {
        let card = self.find_mut(id)?;
        if amount <= 0 {
            return Err(LedgerError::InvalidInput(
                "spend amount must be positive".to_string(),
            ));
        }
        if card.is_frozen {
            return Err(LedgerError::CardFrozen(id));
        }

        let new_spending = card
            .current_spending
            .checked_add(amount)
            .filter(|total| *total <= card.spending_limit)
            .ok_or(LedgerError::LimitExceeded {
                card_id: id,
                limit: card.spending_limit,
                current: card.current_spending,
                requested: amount,
            })?;

        card.current_spending = new_spending;
        card.last_used = Some(now);
        Ok(card.clone())
    }

    pub fn update_limit(&mut self, id: CardId, new_limit: Cents) -> Result<VirtualCard, LedgerError> {
        let card = self.find_mut(id)?;
        if new_limit <= 0 {
            return Err(LedgerError::InvalidInput(
                "spending limit must be positive".to_string(),
            ));
        }
        if new_limit < card.current_spending {
            return Err(LedgerError::LimitBelowSpend {
                card_id: id,
                requested_limit: new_limit,
                current: card.current_spending,
            });
        }

        card.spending_limit = new_limit;
        Ok(card.clone())
    }

    pub fn toggle_freeze(&mut self, id: CardId) -> Result<VirtualCard, LedgerError> {
        let card = self.find_mut(id)?;
        card.is_frozen = !card.is_frozen;
        Ok(card.clone())
    }

    /// Permanently remove a card. Its id is not handed out again.
    pub fn delete(&mut self, id: CardId) -> Result<VirtualCard, LedgerError> {
        let index = self
            .cards
            .iter()
            .position(|c| c.id == id)
            .ok_or(LedgerError::CardNotFound(id))?;
        Ok(self.cards.remove(index))
    }

    /// Totals saturate at `Cents::MAX` rather than wrapping.
    pub fn summary(&self) -> CardPortfolio {
        let total = |f: fn(&VirtualCard) -> Cents| {
            self.cards.iter().map(f).fold(0, Cents::saturating_add)
        };
        let total_limit = total(|c| c.spending_limit);
        let total_spent = total(|c| c.current_spending);

        CardPortfolio {
            card_count: self.cards.len(),
            active_count: self.cards.iter().filter(|c| c.is_active).count(),
            frozen_count: self.cards.iter().filter(|c| c.is_frozen).count(),
            total_limit,
            total_spent,
            total_remaining: total(remaining_balance),
            utilization: percentage(total_spent, total_limit),
        }
    }

    fn find(&self, id: CardId) -> Result<&VirtualCard, LedgerError> {
        self.cards
            .iter()
            .find(|c| c.id == id)
            .ok_or(LedgerError::CardNotFound(id))
    }

    fn find_mut(&mut self, id: CardId) -> Result<&mut VirtualCard, LedgerError> {
        self.cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(LedgerError::CardNotFound(id))
    }
}
