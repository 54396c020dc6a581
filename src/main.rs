// src/main.rs
use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, web};
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client as S3Client;
use dotenvy::dotenv;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use viralpost::artifacts::ArtifactStore;
use viralpost::config::{ArtifactBackend, Config};
use viralpost::db::PgStore;
use viralpost::payments::StripeClient;
use viralpost::providers::{GeminiClient, MusicGptClient, OpenAiClient};
use viralpost::{AppState, api, docs};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("ViralPost API ready!")
}

async fn artifact_store(config: &Config) -> std::io::Result<ArtifactStore> {
    match &config.artifact_backend {
        ArtifactBackend::Local => {
            tokio::fs::create_dir_all(config.generated_dir.join("music")).await?;
            Ok(ArtifactStore::local(&config.generated_dir))
        }
        ArtifactBackend::S3 {
            bucket,
            endpoint,
            public_base_url,
        } => {
            let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(region_provider)
                .load()
                .await;
            let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

            // S3-compatible endpoints (MinIO and similar) need path-style addressing.
            if let Some(endpoint) = endpoint {
                s3_config_builder = s3_config_builder
                    .endpoint_url(endpoint)
                    .force_path_style(true);
            }

            Ok(ArtifactStore::S3 {
                client: S3Client::from_conf(s3_config_builder.build()),
                bucket: bucket.clone(),
                public_base_url: public_base_url.clone(),
            })
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = PgPool::connect(&config.database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let artifacts = artifact_store(&config).await?;
    let bind = (config.host.clone(), config.port);

    let state = web::Data::new(AppState {
        store: Arc::new(PgStore::new(pool)),
        language_model: Arc::new(OpenAiClient::from_config(&config)),
        image_model: Arc::new(GeminiClient::from_config(&config)),
        music_model: Arc::new(MusicGptClient::from_config(&config)),
        payments: Arc::new(StripeClient::from_config(&config)),
        artifacts: Arc::new(artifacts),
        config: Arc::new(config),
    });

    log::info!("listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            .configure(api::configure)
    })
    .bind(bind)?
    .run()
    .await
}
