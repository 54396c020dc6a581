// src/db/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{PresetPreview, Store};
use crate::error::StoreError;
use crate::models::{
    Account, Balance, ImageGeneration, ImageState, MusicGeneration, NewAccount,
    NewImageGeneration, NewMusicGeneration, NewTransaction, Page, SettleOutcome, Settlement,
    Transaction, TransactionState,
};

#[derive(Default)]
struct Tables {
    next_id: i32,
    accounts: Vec<Account>,
    images: Vec<ImageGeneration>,
    music: Vec<MusicGeneration>,
    transactions: Vec<Transaction>,
}

impl Tables {
    fn id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn account_mut(&mut self, id: i32) -> Result<&mut Account, StoreError> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("account {id}")))
    }
}

/// In-process [`Store`]. A single lock guards all tables, so each call is
/// atomic the same way a single SQL statement is.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites an account's balance.
    pub async fn set_credits(&self, account_id: i32, credits: i32) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        t.account_mut(account_id)?.credits_available = credits;
        Ok(())
    }

    pub async fn set_active(&self, account_id: i32, active: bool) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        t.account_mut(account_id)?.is_active = active;
        Ok(())
    }

    pub async fn image_generation_count(&self, account_id: i32) -> usize {
        let t = self.tables.lock().await;
        t.images.iter().filter(|g| g.account_id == account_id).count()
    }

    pub async fn music_generation_count(&self, account_id: i32) -> usize {
        let t = self.tables.lock().await;
        t.music.iter().filter(|g| g.account_id == account_id).count()
    }
}

fn newest_first<T>(items: &mut [&T], created: impl Fn(&T) -> (chrono::DateTime<Utc>, i32)) {
    items.sort_by(|a, b| created(*b).cmp(&created(*a)));
}

fn window<T: Clone>(items: &[&T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .map(|g| (*g).clone())
        .collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut t = self.tables.lock().await;
        if t.accounts.iter().any(|a| a.email == new.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", new.email)));
        }
        let account = Account {
            id: t.id(),
            email: new.email,
            password_hash: new.password_hash,
            display_name: new.display_name,
            credits_available: new.credits,
            credits_used: 0,
            is_active: true,
            is_verified: false,
            payment_customer_id: None,
            identity_provider_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        t.accounts.push(account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: i32) -> Result<Option<Account>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn update_display_name(&self, id: i32, name: Option<&str>) -> Result<Account, StoreError> {
        let mut t = self.tables.lock().await;
        let account = t.account_mut(id)?;
        account.display_name = name.map(str::to_string);
        account.updated_at = Some(Utc::now());
        Ok(account.clone())
    }

    async fn set_payment_customer(&self, id: i32, customer_id: &str) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        let account = t.account_mut(id)?;
        account.payment_customer_id = Some(customer_id.to_string());
        account.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn debit_credit(&self, account_id: i32) -> Result<Option<Balance>, StoreError> {
        let mut t = self.tables.lock().await;
        let Some(account) = t.accounts.iter_mut().find(|a| a.id == account_id) else {
            return Ok(None);
        };
        if !account.has_credits(1) {
            return Ok(None);
        }
        account.credits_available -= 1;
        account.credits_used += 1;
        Ok(Some(Balance {
            credits_available: account.credits_available,
            credits_used: account.credits_used,
        }))
    }

    async fn refund_credit(&self, account_id: i32) -> Result<Balance, StoreError> {
        let mut t = self.tables.lock().await;
        let account = t.account_mut(account_id)?;
        account.credits_available += 1;
        account.credits_used = (account.credits_used - 1).max(0);
        Ok(Balance {
            credits_available: account.credits_available,
            credits_used: account.credits_used,
        })
    }

    async fn create_image_generation(
        &self,
        new: NewImageGeneration,
    ) -> Result<ImageGeneration, StoreError> {
        let mut t = self.tables.lock().await;
        let record = ImageGeneration {
            id: t.id(),
            account_id: new.account_id,
            product_name: new.product_name,
            product_description: new.product_description,
            brand: new.brand,
            preset_id: new.preset_id,
            image_path: None,
            generated_prompt: None,
            facebook_copy: None,
            facebook_hashtags: None,
            instagram_copy: None,
            instagram_hashtags: None,
            state: new.state,
            error_message: None,
            processing_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        t.images.push(record.clone());
        Ok(record)
    }

    async fn save_image_generation(&self, record: &ImageGeneration) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        let slot = t
            .images
            .iter_mut()
            .find(|g| g.id == record.id)
            .ok_or_else(|| StoreError::NotFound(format!("generation {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    async fn image_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<ImageGeneration>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.images
            .iter()
            .find(|g| g.id == id && g.account_id == account_id)
            .cloned())
    }

    async fn list_image_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<(Vec<ImageGeneration>, i64), StoreError> {
        let t = self.tables.lock().await;
        let mut owned: Vec<&ImageGeneration> =
            t.images.iter().filter(|g| g.account_id == account_id).collect();
        newest_first(&mut owned, |g| (g.created_at, g.id));
        Ok((window(&owned, page), owned.len() as i64))
    }

    async fn preset_previews(&self) -> Result<Vec<PresetPreview>, StoreError> {
        let t = self.tables.lock().await;
        let mut latest: HashMap<&str, &ImageGeneration> = HashMap::new();
        for g in t.images.iter().filter(|g| g.state == ImageState::Completed) {
            if g.image_path.is_none() {
                continue;
            }
            let newer = latest
                .get(g.preset_id.as_str())
                .is_none_or(|cur| (g.completed_at, g.id) > (cur.completed_at, cur.id));
            if newer {
                latest.insert(g.preset_id.as_str(), g);
            }
        }
        let mut previews: Vec<PresetPreview> = latest
            .into_values()
            .filter_map(|g| {
                Some(PresetPreview {
                    preset_id: g.preset_id.clone(),
                    image_path: g.image_path.clone()?,
                })
            })
            .collect();
        previews.sort_by(|a, b| a.preset_id.cmp(&b.preset_id));
        Ok(previews)
    }

    async fn create_music_generation(
        &self,
        new: NewMusicGeneration,
    ) -> Result<MusicGeneration, StoreError> {
        let mut t = self.tables.lock().await;
        let record = MusicGeneration {
            id: t.id(),
            account_id: new.account_id,
            title: new.title,
            brief: new.brief,
            duration_secs: new.duration_secs,
            instrumental: new.instrumental,
            genre: new.genre,
            mood: new.mood,
            lyrics_language: new.lyrics_language,
            text_prompt: None,
            music_prompt: None,
            music_style: None,
            lyrics_theme: None,
            audio_path: None,
            audio_url: None,
            conversion_id: None,
            state: new.state,
            error_message: None,
            processing_ms: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        t.music.push(record.clone());
        Ok(record)
    }

    async fn save_music_generation(&self, record: &MusicGeneration) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        let slot = t
            .music
            .iter_mut()
            .find(|g| g.id == record.id)
            .ok_or_else(|| StoreError::NotFound(format!("music generation {}", record.id)))?;
        *slot = record.clone();
        Ok(())
    }

    async fn music_generation(
        &self,
        account_id: i32,
        id: i32,
    ) -> Result<Option<MusicGeneration>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.music
            .iter()
            .find(|g| g.id == id && g.account_id == account_id)
            .cloned())
    }

    async fn list_music_generations(
        &self,
        account_id: i32,
        page: Page,
    ) -> Result<Vec<MusicGeneration>, StoreError> {
        let t = self.tables.lock().await;
        let mut owned: Vec<&MusicGeneration> =
            t.music.iter().filter(|g| g.account_id == account_id).collect();
        newest_first(&mut owned, |g| (g.created_at, g.id));
        Ok(window(&owned, page))
    }

    async fn create_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        let mut t = self.tables.lock().await;
        if t.transactions
            .iter()
            .any(|tx| tx.checkout_session_id == new.checkout_session_id)
        {
            return Err(StoreError::Conflict(format!(
                "checkout session {} already recorded",
                new.checkout_session_id
            )));
        }
        let tx = Transaction {
            id: t.id(),
            account_id: new.account_id,
            checkout_session_id: new.checkout_session_id,
            credits: new.credits,
            amount_mxn_cents: new.amount_mxn_cents,
            amount_usd_cents: new.amount_usd_cents,
            state: TransactionState::Pending,
            description: new.description,
            created_at: Utc::now(),
            completed_at: None,
        };
        t.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn transaction_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.transactions
            .iter()
            .find(|tx| tx.checkout_session_id == session_id)
            .cloned())
    }

    async fn list_transactions(
        &self,
        account_id: i32,
        limit: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let t = self.tables.lock().await;
        let mut owned: Vec<&Transaction> = t
            .transactions
            .iter()
            .filter(|tx| tx.account_id == account_id)
            .collect();
        newest_first(&mut owned, |tx| (tx.created_at, tx.id));
        Ok(window(&owned, Page { limit, offset: 0 }))
    }

    async fn settle_transaction(
        &self,
        session_id: &str,
        settlement: Settlement,
    ) -> Result<SettleOutcome, StoreError> {
        let mut t = self.tables.lock().await;
        let Some(idx) = t
            .transactions
            .iter()
            .position(|tx| tx.checkout_session_id == session_id)
        else {
            return Ok(SettleOutcome::UnknownSession);
        };

        let current = t.transactions[idx].state;
        if current != TransactionState::Pending {
            return Ok(SettleOutcome::AlreadySettled(current));
        }

        let next = match settlement {
            Settlement::Paid {
                account_id,
                credits,
            } => {
                let Some(account) = t.accounts.iter_mut().find(|a| a.id == account_id) else {
                    return Ok(SettleOutcome::AccountMissing);
                };
                account.credits_available += credits;
                account.updated_at = Some(Utc::now());
                TransactionState::Completed
            }
            Settlement::Failed => TransactionState::Failed,
        };

        let tx = &mut t.transactions[idx];
        tx.state = next;
        if next == TransactionState::Completed {
            tx.completed_at = Some(Utc::now());
        }
        Ok(SettleOutcome::Applied(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn account(store: &MemoryStore, credits: i32) -> Account {
        store
            .create_account(NewAccount {
                email: format!("user{}@example.com", credits),
                password_hash: "hash".into(),
                display_name: None,
                credits,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn debit_never_goes_negative() {
        let store = MemoryStore::new();
        let a = account(&store, 1).await;

        let b = store.debit_credit(a.id).await.unwrap().unwrap();
        assert_eq!((b.credits_available, b.credits_used), (0, 1));
        assert!(store.debit_credit(a.id).await.unwrap().is_none());

        let b = store.refund_credit(a.id).await.unwrap();
        assert_eq!((b.credits_available, b.credits_used), (1, 0));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        account(&store, 0).await;
        let err = store
            .create_account(NewAccount {
                email: "user0@example.com".into(),
                password_hash: "x".into(),
                display_name: None,
                credits: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn settlement_applies_once() {
        let store = MemoryStore::new();
        let a = account(&store, 0).await;
        store
            .create_transaction(NewTransaction {
                account_id: a.id,
                checkout_session_id: "cs_1".into(),
                credits: 10,
                amount_mxn_cents: 15_000,
                amount_usd_cents: None,
                description: None,
            })
            .await
            .unwrap();

        let paid = Settlement::Paid {
            account_id: a.id,
            credits: 10,
        };
        assert_eq!(
            store.settle_transaction("cs_1", paid).await.unwrap(),
            SettleOutcome::Applied(TransactionState::Completed)
        );
        assert_eq!(
            store.settle_transaction("cs_1", paid).await.unwrap(),
            SettleOutcome::AlreadySettled(TransactionState::Completed)
        );
        assert_eq!(
            store.settle_transaction("cs_2", paid).await.unwrap(),
            SettleOutcome::UnknownSession
        );

        let a = store.account_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(a.credits_available, 10);
        let tx = store.transaction_by_session("cs_1").await.unwrap().unwrap();
        assert!(tx.completed_at.is_some());
    }

    #[tokio::test]
    async fn settlement_for_missing_account_changes_nothing() {
        let store = MemoryStore::new();
        let a = account(&store, 0).await;
        store
            .create_transaction(NewTransaction {
                account_id: a.id,
                checkout_session_id: "cs_9".into(),
                credits: 25,
                amount_mxn_cents: 35_000,
                amount_usd_cents: None,
                description: None,
            })
            .await
            .unwrap();

        let outcome = store
            .settle_transaction(
                "cs_9",
                Settlement::Paid {
                    account_id: 999,
                    credits: 25,
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, SettleOutcome::AccountMissing);
        let tx = store.transaction_by_session("cs_9").await.unwrap().unwrap();
        assert_eq!(tx.state, TransactionState::Pending);
    }
}
