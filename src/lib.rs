pub mod api;
pub mod artifacts;
pub mod billing;
pub mod catalog;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod models;
pub mod payments;
pub mod prompts;
pub mod providers;
pub mod workflow;

use std::sync::Arc;

use artifacts::ArtifactStore;
use config::Config;
use db::Store;
use payments::PaymentProcessor;
use providers::{ImageModel, LanguageModel, MusicModel};

/// Shared handler state. Every collaborator sits behind a trait object so
/// tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub language_model: Arc<dyn LanguageModel>,
    pub image_model: Arc<dyn ImageModel>,
    pub music_model: Arc<dyn MusicModel>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub artifacts: Arc<ArtifactStore>,
}
