// src/db/mod.rs
//
// Storage contract used by the workflows and handlers. `PgStore` is the
// production implementation; `MemoryStore` backs tests and local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{
    Account, Balance, ImageGeneration, MusicGeneration, NewAccount, NewImageGeneration,
    NewMusicGeneration, NewTransaction, Page, SettleOutcome, Settlement, Transaction,
};

/// Latest completed image of a preset, used for catalog previews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetPreview {
    pub preset_id: String,
    pub image_path: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    // accounts

    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError>;
    async fn account_by_id(&self, id: i32) -> Result<Option<Account>, StoreError>;
    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
    async fn update_display_name(&self, id: i32, name: Option<&str>) -> Result<Account, StoreError>;
    async fn set_payment_customer(&self, id: i32, customer_id: &str) -> Result<(), StoreError>;

    // ledger

    /// Takes one credit if at least one is available, in a single atomic
    /// step. `None` means the balance was insufficient and nothing changed.
    async fn debit_credit(&self, account_id: i32) -> Result<Option<Balance>, StoreError>;
    /// Reverses one [`Store::debit_credit`].
    async fn refund_credit(&self, account_id: i32) -> Result<Balance, StoreError>;

    // image generations

    async fn create_image_generation(
        &self,
        new: NewImageGeneration,
    ) -> Result<ImageGeneration, StoreError>;
    /// Persists every mutable column of the record.
    async fn save_image_generation(&self, record: &ImageGeneration) -> Result<(), StoreError>;
    async fn image_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<ImageGeneration>, StoreError>;
    /// Newest first, plus the total count for the account.
    async fn list_image_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<(Vec<ImageGeneration>, i64), StoreError>;
    async fn preset_previews(&self) -> Result<Vec<PresetPreview>, StoreError>;

    // music generations

    async fn create_music_generation(
        &self,
        new: NewMusicGeneration,
    ) -> Result<MusicGeneration, StoreError>;
    async fn save_music_generation(&self, record: &MusicGeneration) -> Result<(), StoreError>;
    async fn music_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<MusicGeneration>, StoreError>;
    async fn list_music_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<Vec<MusicGeneration>, StoreError>;

    // transactions

    /// Fails with [`StoreError::Conflict`] when the session id is already recorded.
    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError>;
    async fn transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, StoreError>;
    async fn list_transactions(
        &self,
        account_id: i32,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError>;
    /// Moves a pending transaction out of `pending` and, when paid, credits
    /// the ledger in the same commit. Anything not pending is left alone.
    async fn settle_transaction(
        &self,
        session_id: &str,
        settlement: Settlement,
    ) -> Result<SettleOutcome, StoreError>;
}
