#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::env;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use sqlx::PgPool;
use tempfile::TempDir;
use tokio::sync::{Mutex, MutexGuard};

use viralpost::AppState;
use viralpost::artifacts::ArtifactStore;
use viralpost::config::Config;
use viralpost::db::{MemoryStore, Store};
use viralpost::error::{PaymentError, ProviderError};
use viralpost::models::{Account, NewAccount};
use viralpost::payments::{CheckoutRequest, CheckoutSession, NewCustomer, PaymentProcessor};
use viralpost::providers::{ImageModel, ImagePayload, JobStatus, LanguageModel, MusicJob, MusicModel};

// ---------------------------------------------------------------------------
// Postgres

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

/// Fresh, migrated database at `TEST_DATABASE_URL`; `None` when the variable
/// is not set so Postgres-backed tests can bail out early.
pub async fn init_test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let Ok(test_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping postgres test");
        return None;
    };
    let (admin_url, db_name) =
        split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url)
        .await
        .expect("connect admin db");

    let _ = sqlx::query("SELECT pg_advisory_lock(424242)")
        .execute(&admin_pool)
        .await;

    let quoted_name = quote_identifier(&db_name);
    let drop_sql = format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)");
    let create_sql = format!("CREATE DATABASE {quoted_name}");

    let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
    if let Err(e) = sqlx::query(&create_sql).execute(&admin_pool).await {
        eprintln!("create test db error: {e}");
        let _ = sqlx::query(&drop_sql).execute(&admin_pool).await;
        sqlx::query(&create_sql)
            .execute(&admin_pool)
            .await
            .expect("create test db retry");
    }

    let _ = sqlx::query("SELECT pg_advisory_unlock(424242)")
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;

    let pool = PgPool::connect(&test_url)
        .await
        .expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");
    Some(TestDb { pool, _guard: guard })
}

// ---------------------------------------------------------------------------
// Provider fakes

fn fake_error(detail: &str) -> ProviderError {
    ProviderError::InvalidResponse {
        provider: "fake",
        detail: detail.to_string(),
    }
}

pub const DRAFT_JSON: &str = r##"Aquí tienes:
{
  "image_prompt": "Hyper-detailed macro shot of an artisan coffee bag bursting with roasted beans",
  "facebook": {"copy": "El café que despierta tu día ☕", "hashtags": ["#cafe", "#artesanal"]},
  "instagram": {"copy": "Tu ritual de la mañana", "hashtags": ["#coffeelover"]}
}"##;

pub const MUSIC_JSON: &str = r#"{
  "music_prompt": "Upbeat latin pop jingle, vocals singing in Mexican Spanish about fresh coffee",
  "music_style": "Commercial Jingle, Latin Pop",
  "mood": "alegre",
  "genre": "latin pop",
  "lyrics_theme": "el aroma del café"
}"#;

pub struct ScriptedText {
    pub vision: Result<String, String>,
    pub json: Result<String, String>,
}

impl ScriptedText {
    pub fn ok() -> Self {
        Self {
            vision: Ok(DRAFT_JSON.to_string()),
            json: Ok(MUSIC_JSON.to_string()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedText {
    async fn describe_product(
        &self,
        _prompt: &str,
        _image: &ImagePayload,
    ) -> Result<String, ProviderError> {
        self.vision.clone().map_err(|e| fake_error(&e))
    }

    async fn compose_json(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
        self.json.clone().map_err(|e| fake_error(&e))
    }
}

pub enum ScriptedImage {
    Png(Vec<u8>),
    NoImage,
    Panic,
}

#[async_trait]
impl ImageModel for ScriptedImage {
    async fn render(
        &self,
        _prompt: &str,
        _product: &ImagePayload,
        _logo: Option<&ImagePayload>,
    ) -> Result<Vec<u8>, ProviderError> {
        match self {
            ScriptedImage::Png(bytes) => Ok(bytes.clone()),
            ScriptedImage::NoImage => Err(ProviderError::MissingOutput {
                provider: "fake",
                what: "image",
            }),
            ScriptedImage::Panic => panic!("image model blew up"),
        }
    }
}

pub struct ScriptedMusic {
    pub submit: Result<String, String>,
    pub statuses: StdMutex<VecDeque<JobStatus>>,
    pub download: Result<Vec<u8>, String>,
    pub status_calls: AtomicU32,
    pub submitted: StdMutex<Vec<MusicJob>>,
}

impl ScriptedMusic {
    /// Reports `Running` `n` times, then a completed track.
    pub fn completes_after(n: usize) -> Self {
        let mut statuses: VecDeque<JobStatus> = (0..n).map(|_| JobStatus::Running).collect();
        statuses.push_back(JobStatus::Completed {
            audio_url: "https://cdn.example.com/track.mp3".to_string(),
        });
        Self::with_statuses(statuses)
    }

    /// Never leaves `Running`.
    pub fn stuck() -> Self {
        Self::with_statuses(VecDeque::new())
    }

    pub fn with_statuses(statuses: VecDeque<JobStatus>) -> Self {
        Self {
            submit: Ok("conv-123".to_string()),
            statuses: StdMutex::new(statuses),
            download: Ok(b"ID3-fake-mp3".to_vec()),
            status_calls: AtomicU32::new(0),
            submitted: StdMutex::new(Vec::new()),
        }
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MusicModel for ScriptedMusic {
    async fn submit(&self, job: &MusicJob) -> Result<String, ProviderError> {
        self.submitted.lock().unwrap().push(job.clone());
        self.submit.clone().map_err(|e| fake_error(&e))
    }

    async fn status(&self, _conversion_id: &str) -> Result<JobStatus, ProviderError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(JobStatus::Running))
    }

    async fn download(&self, _audio_url: &str) -> Result<Vec<u8>, ProviderError> {
        self.download.clone().map_err(|e| fake_error(&e))
    }
}

// ---------------------------------------------------------------------------
// Payment processor fake

#[derive(Default)]
pub struct FakePayments {
    pub known_customers: StdMutex<HashSet<String>>,
    pub created_customers: StdMutex<Vec<NewCustomer>>,
    pub sessions: StdMutex<Vec<CheckoutRequest>>,
}

#[async_trait]
impl PaymentProcessor for FakePayments {
    async fn customer_exists(&self, customer_id: &str) -> Result<bool, PaymentError> {
        Ok(self.known_customers.lock().unwrap().contains(customer_id))
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError> {
        let mut created = self.created_customers.lock().unwrap();
        created.push(customer.clone());
        let id = format!("cus_fake_{}", created.len());
        self.known_customers.lock().unwrap().insert(id.clone());
        Ok(id)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(request.clone());
        let id = format!("cs_test_{}", sessions.len());
        Ok(CheckoutSession {
            url: format!("https://checkout.stripe.test/pay/{id}"),
            id,
        })
    }
}

// ---------------------------------------------------------------------------
// Harness

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub music: Arc<ScriptedMusic>,
    pub payments: Arc<FakePayments>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(
            ScriptedText::ok(),
            ScriptedImage::Png(b"\x89PNG-fake".to_vec()),
            ScriptedMusic::completes_after(2),
        )
    }

    pub fn with(text: ScriptedText, image: ScriptedImage, music: ScriptedMusic) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::for_tests(dir.path());
        let store = Arc::new(MemoryStore::new());
        let music = Arc::new(music);
        let payments = Arc::new(FakePayments::default());

        let state = AppState {
            artifacts: Arc::new(ArtifactStore::local(&config.generated_dir)),
            config: Arc::new(config),
            store: store.clone(),
            language_model: Arc::new(text),
            image_model: Arc::new(image),
            music_model: music.clone(),
            payments: payments.clone(),
        };

        Self {
            state,
            store,
            music,
            payments,
            dir,
        }
    }

    pub async fn account(&self, email: &str, credits: i32) -> Account {
        self.account_with_password(email, "secreto123", credits).await
    }

    pub async fn account_with_password(&self, email: &str, password: &str, credits: i32) -> Account {
        self.store
            .create_account(NewAccount {
                email: email.to_string(),
                password_hash: bcrypt::hash(password, 4).expect("hash"),
                display_name: Some("Tienda Prueba".to_string()),
                credits,
            })
            .await
            .expect("create account")
    }

    pub async fn reload(&self, account: &Account) -> Account {
        self.store
            .account_by_id(account.id)
            .await
            .expect("load account")
            .expect("account exists")
    }
}

pub fn png(data: &[u8]) -> ImagePayload {
    ImagePayload::new("image/png", data.to_vec())
}
