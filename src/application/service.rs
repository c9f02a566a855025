use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    BusinessLedger, BusinessMetrics, BusinessTransaction, CardId, CardLedger, CardPortfolio,
    CardPurpose, Cents, SETTINGS_STORAGE_KEY, Settings, TransactionId,
    TransactionStatus, VirtualCard, WalletId, remaining_balance, spending_progress,
};
use crate::io::SeedData;
use crate::storage::Repository;

use super::{AppError, CardDetails, DashboardReport};

/// Runtime knobs for a [`WalletService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Artificial delay applied before every operation, mimicking a network round trip
    pub latency: Duration,
    /// Key the settings blob is stored under
    pub settings_key: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            settings_key: SETTINGS_STORAGE_KEY.to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// Result of refunding a transaction
#[derive(Debug)]
pub struct RefundResult {
    pub refund: BusinessTransaction,
    pub original: BusinessTransaction,
}

/// Session-scoped service over the card and business ledgers.
///
/// Each ledger sits behind its own lock; an operation waits out the simulated
/// latency first and then validates and mutates under a single lock acquisition,
/// so no caller ever sees a half-applied change.
pub struct WalletService {
    cards: Mutex<CardLedger>,
    transactions: Mutex<BusinessLedger>,
    settings: Mutex<Settings>,
    repo: Option<Repository>,
    config: ServiceConfig,
}

impl WalletService {
    pub fn new(cards: CardLedger, transactions: BusinessLedger, config: ServiceConfig) -> Self {
        Self {
            cards: Mutex::new(cards),
            transactions: Mutex::new(transactions),
            settings: Mutex::new(Settings::defaults()),
            repo: None,
            config,
        }
    }

    /// Service over validated ledgers built from `seed`.
    pub fn from_seed(seed: SeedData, config: ServiceConfig) -> anyhow::Result<Self> {
        let (cards, transactions) = seed.into_ledgers()?;
        info!(
            cards = cards.len(),
            transactions = transactions.len(),
            "loaded seed data"
        );
        Ok(Self::new(cards, transactions, config))
    }

    /// Service with empty ledgers and default configuration.
    pub fn empty() -> Self {
        Self::new(
            CardLedger::new(),
            BusinessLedger::new(),
            ServiceConfig::default(),
        )
    }

    /// Persist settings through `repo`.
    pub fn with_repository(mut self, repo: Repository) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    async fn simulate_latency(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }

    // ========================
    // Virtual card operations
    // ========================

    pub async fn list_cards(&self) -> Vec<VirtualCard> {
        self.simulate_latency().await;
        let cards = self.cards.lock().await.list();
        debug!(count = cards.len(), "listed virtual cards");
        cards
    }

    pub async fn list_cards_for_wallet(&self, wallet_id: WalletId) -> Vec<VirtualCard> {
        self.simulate_latency().await;
        self.cards.lock().await.list_for_wallet(wallet_id)
    }

    pub async fn get_card(&self, id: CardId) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;
        Ok(self.cards.lock().await.get(id)?)
    }

    pub async fn card_details(&self, id: CardId) -> Result<CardDetails, AppError> {
        let card = self.get_card(id).await?;
        Ok(CardDetails {
            progress: spending_progress(&card),
            remaining: remaining_balance(&card),
            card,
        })
    }

    /// Issue a card. `purpose` is one of `online-shopping`, `subscription`, `one-time`.
    pub async fn issue_card(
        &self,
        purpose: &str,
        spending_limit: Cents,
        wallet_id: WalletId,
    ) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;
        let purpose: CardPurpose = purpose.parse()?;

        let card = self
            .cards
            .lock()
            .await
            .issue(purpose, spending_limit, wallet_id, Utc::now())
            .inspect_err(|err| warn!(%err, "card issuance rejected"))?;

        info!(
            card_id = card.id,
            wallet_id,
            purpose = %card.purpose,
            limit = card.spending_limit,
            "issued virtual card"
        );
        Ok(card)
    }

    pub async fn record_spend(&self, id: CardId, amount: Cents) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;

        let card = self
            .cards
            .lock()
            .await
            .record_spend(id, amount, Utc::now())
            .inspect_err(|err| warn!(card_id = id, amount, %err, "spend rejected"))?;

        info!(
            card_id = id,
            amount,
            spent = card.current_spending,
            limit = card.spending_limit,
            "recorded card spend"
        );
        Ok(card)
    }

    pub async fn update_limit(&self, id: CardId, new_limit: Cents) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;

        let card = self
            .cards
            .lock()
            .await
            .update_limit(id, new_limit)
            .inspect_err(|err| warn!(card_id = id, new_limit, %err, "limit update rejected"))?;

        info!(card_id = id, limit = new_limit, "updated spending limit");
        Ok(card)
    }

    pub async fn toggle_freeze(&self, id: CardId) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;
        let card = self.cards.lock().await.toggle_freeze(id)?;
        info!(card_id = id, frozen = card.is_frozen, "toggled card freeze");
        Ok(card)
    }

    pub async fn delete_card(&self, id: CardId) -> Result<VirtualCard, AppError> {
        self.simulate_latency().await;
        let card = self.cards.lock().await.delete(id)?;
        info!(card_id = id, "deleted virtual card");
        Ok(card)
    }

    pub async fn card_portfolio(&self) -> CardPortfolio {
        self.simulate_latency().await;
        self.cards.lock().await.summary()
    }

    // ========================
    // Business transaction operations
    // ========================

    pub async fn list_transactions(&self, limit: Option<usize>) -> Vec<BusinessTransaction> {
        self.simulate_latency().await;
        let transactions = self.transactions.lock().await.list(limit);
        debug!(count = transactions.len(), "listed business transactions");
        transactions
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<BusinessTransaction, AppError> {
        self.simulate_latency().await;
        Ok(self.transactions.lock().await.get(id)?)
    }

    pub async fn refunds_for(&self, id: TransactionId) -> Vec<BusinessTransaction> {
        self.simulate_latency().await;
        self.transactions.lock().await.refunds_for(id)
    }

    pub async fn record_payment(
        &self,
        customer: &str,
        payment_method: &str,
        amount: Cents,
        status: TransactionStatus,
    ) -> Result<BusinessTransaction, AppError> {
        self.simulate_latency().await;
        if customer.trim().is_empty() {
            return Err(AppError::InvalidInput("customer is required".to_string()));
        }
        if payment_method.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "payment method is required".to_string(),
            ));
        }

        let tx = self
            .transactions
            .lock()
            .await
            .record_payment(customer, payment_method, amount, status, Utc::now())?;

        info!(transaction_id = tx.id, amount, status = %tx.status, "recorded business payment");
        Ok(tx)
    }

    pub async fn refund_transaction(
        &self,
        id: TransactionId,
        amount: Cents,
        reason: &str,
    ) -> Result<RefundResult, AppError> {
        self.simulate_latency().await;

        let (refund, original) = self
            .transactions
            .lock()
            .await
            .refund(id, amount, reason, Utc::now())
            .inspect_err(|err| warn!(transaction_id = id, amount, %err, "refund rejected"))?;

        info!(
            transaction_id = id,
            refund_id = refund.id,
            amount = refund.amount,
            "issued refund"
        );
        Ok(RefundResult { refund, original })
    }

    pub async fn business_metrics(&self) -> BusinessMetrics {
        self.simulate_latency().await;
        self.transactions.lock().await.metrics()
    }

    /// Card portfolio, business metrics and the latest transactions.
    /// Both ledgers are locked together so the figures agree with each other.
    pub async fn dashboard(&self, recent: usize) -> DashboardReport {
        self.simulate_latency().await;
        let cards = self.cards.lock().await;
        let transactions = self.transactions.lock().await;

        DashboardReport {
            generated_at: Utc::now(),
            portfolio: cards.summary(),
            metrics: transactions.metrics(),
            recent_transactions: transactions.list(Some(recent)),
        }
    }

    /// Clones of both ledgers, taken under both locks.
    pub async fn snapshot(&self) -> (Vec<VirtualCard>, Vec<BusinessTransaction>) {
        let cards = self.cards.lock().await;
        let transactions = self.transactions.lock().await;
        (cards.list(), transactions.list(None))
    }

    // ========================
    // Settings
    // ========================

    /// Load the persisted settings blob into the session.
    ///
    /// A missing blob yields the defaults. So does an unreadable one, which is
    /// logged and left in storage until the next save overwrites it.
    pub async fn load_settings(&self) -> Result<Settings, AppError> {
        let loaded = match &self.repo {
            Some(repo) => match repo.get_value(&self.config.settings_key).await? {
                Some(json) => Settings::from_json(&json).unwrap_or_else(|err| {
                    warn!(key = %self.config.settings_key, %err, "stored settings unreadable, using defaults");
                    Settings::defaults()
                }),
                None => Settings::defaults(),
            },
            None => Settings::defaults(),
        };

        debug!(count = loaded.len(), "loaded settings");
        *self.settings.lock().await = loaded.clone();
        Ok(loaded)
    }

    pub async fn settings(&self) -> Settings {
        self.settings.lock().await.clone()
    }

    /// Replace the session settings and overwrite the stored blob.
    pub async fn save_settings(&self, settings: Settings) -> Result<Settings, AppError> {
        let mut current = self.settings.lock().await;
        self.persist_settings(&settings).await?;
        *current = settings.clone();
        Ok(settings)
    }

    /// Flip a single preference; the whole blob is written back.
    pub async fn update_setting(&self, key: &str, value: bool) -> Result<Settings, AppError> {
        if key.trim().is_empty() {
            return Err(AppError::InvalidInput("setting key is required".to_string()));
        }

        let mut current = self.settings.lock().await;
        let mut updated = current.clone();
        updated.set(key, value);
        self.persist_settings(&updated).await?;
        *current = updated.clone();

        info!(key, value, "updated setting");
        Ok(updated)
    }

    /// Drop the stored blob so the next load falls back to the defaults.
    pub async fn reset_settings(&self) -> Result<Settings, AppError> {
        let mut current = self.settings.lock().await;
        if let Some(repo) = &self.repo {
            let removed = repo.delete_value(&self.config.settings_key).await?;
            debug!(key = %self.config.settings_key, removed, "cleared stored settings");
        }
        *current = Settings::defaults();

        info!("reset settings to defaults");
        Ok(current.clone())
    }

    async fn persist_settings(&self, settings: &Settings) -> Result<(), AppError> {
        if let Some(repo) = &self.repo {
            let json = settings
                .to_json()
                .map_err(|err| AppError::Storage(err.into()))?;
            repo.put_value(&self.config.settings_key, &json).await?;
        }
        Ok(())
    }
}

