// src/models.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown state value {0:?}")]
pub struct UnknownState(pub String);

/// Implements `as_str`, `Display` and `FromStr` for a state enum whose
/// persisted form is a fixed string per variant.
macro_rules! state_strings {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownState;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownState(other.to_string())),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ImageState {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "procesando")]
    Processing,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

state_strings!(ImageState {
    Pending => "pendiente",
    Processing => "procesando",
    Completed => "completada",
    Error => "error",
});

impl ImageState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use ImageState::*;
        matches!(
            (self, next),
            (Pending, Processing) | (Pending, Error) | (Processing, Completed) | (Processing, Error)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MusicState {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "generando_prompt")]
    GeneratingPrompt,
    #[serde(rename = "generando_musica")]
    GeneratingMusic,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "error")]
    Error,
}

state_strings!(MusicState {
    Pending => "pendiente",
    GeneratingPrompt => "generando_prompt",
    GeneratingMusic => "generando_musica",
    Completed => "completada",
    Error => "error",
});

impl MusicState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use MusicState::*;
        match (self, next) {
            (Pending, GeneratingPrompt)
            | (GeneratingPrompt, GeneratingMusic)
            | (GeneratingMusic, Completed) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransactionState {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "completada")]
    Completed,
    #[serde(rename = "fallida")]
    Failed,
    #[serde(rename = "reembolsada")]
    Refunded,
}

state_strings!(TransactionState {
    Pending => "pendiente",
    Completed => "completada",
    Failed => "fallida",
    Refunded => "reembolsada",
});

impl TransactionState {
    pub fn can_transition_to(self, next: Self) -> bool {
        use TransactionState::*;
        matches!(
            (self, next),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub credits_available: i32,
    pub credits_used: i32,
    pub is_active: bool,
    pub is_verified: bool,
    pub payment_customer_id: Option<String>,
    pub identity_provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn has_credits(&self, n: i32) -> bool {
        self.credits_available >= n
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub credits: i32,
}

/// Ledger counters after a debit, refund or grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub credits_available: i32,
    pub credits_used: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeneration {
    pub id: i32,
    pub account_id: i32,
    pub product_name: String,
    pub product_description: Option<String>,
    pub brand: Option<String>,
    pub preset_id: String,
    pub image_path: Option<String>,
    pub generated_prompt: Option<String>,
    pub facebook_copy: Option<String>,
    pub facebook_hashtags: Option<Vec<String>>,
    pub instagram_copy: Option<String>,
    pub instagram_hashtags: Option<Vec<String>>,
    pub state: ImageState,
    pub error_message: Option<String>,
    pub processing_ms: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImageGeneration {
    /// Moves the record forward, stamping `completed_at` on terminal states.
    pub fn advance(&mut self, next: ImageState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewImageGeneration {
    pub account_id: i32,
    pub product_name: String,
    pub product_description: Option<String>,
    pub brand: Option<String>,
    pub preset_id: String,
    pub state: ImageState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MusicGeneration {
    pub id: i32,
    pub account_id: i32,
    pub title: String,
    pub brief: Option<String>,
    pub duration_secs: i32,
    pub instrumental: bool,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub lyrics_language: String,
    pub text_prompt: Option<String>,
    pub music_prompt: Option<String>,
    pub music_style: Option<String>,
    pub lyrics_theme: Option<String>,
    pub audio_path: Option<String>,
    pub audio_url: Option<String>,
    pub conversion_id: Option<String>,
    pub state: MusicState,
    pub error_message: Option<String>,
    pub processing_ms: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl MusicGeneration {
    pub fn advance(&mut self, next: MusicState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state.as_str(),
                to: next.as_str(),
            });
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewMusicGeneration {
    pub account_id: i32,
    pub title: String,
    pub brief: Option<String>,
    pub duration_secs: i32,
    pub instrumental: bool,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub lyrics_language: String,
    pub state: MusicState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i32,
    pub account_id: i32,
    pub checkout_session_id: String,
    pub credits: i32,
    /// Canonical currency (MXN), in centavos.
    pub amount_mxn_cents: i64,
    pub amount_usd_cents: Option<i64>,
    pub state: TransactionState,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i32,
    pub checkout_session_id: String,
    pub credits: i32,
    pub amount_mxn_cents: i64,
    pub amount_usd_cents: Option<i64>,
    pub description: Option<String>,
}

/// Requested resolution of a pending transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Paid { account_id: i32, credits: i32 },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Applied(TransactionState),
    UnknownSession,
    AlreadySettled(TransactionState),
    AccountMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// 1-based page number with a page size clamped to 1..=100.
    pub fn numbered(page: i64, per_page: i64) -> Self {
        let limit = per_page.clamp(1, 100);
        let page = page.max(1);
        Self {
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}
