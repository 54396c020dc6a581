use viralpost::db::Store;
use viralpost::error::WorkflowError;
use viralpost::models::{ImageState, Page};
use viralpost::workflow::{generate_image, ImageRequest};

mod support;

use support::{png, Harness, ScriptedImage, ScriptedMusic, ScriptedText};

fn request(preset_id: &str) -> ImageRequest {
    ImageRequest {
        preset_id: preset_id.to_string(),
        product_name: "  Café de Olla  ".to_string(),
        description: Some("Café artesanal de Veracruz".to_string()),
        brand: Some("   ".to_string()),
        product_image: png(b"product-photo"),
        logo: None,
    }
}

#[actix_web::test]
async fn completed_generation_spends_one_credit() {
    let h = Harness::new();
    let account = h.account("cafe@example.com", 3).await;

    let outcome = generate_image(&h.state, &account, request("macro_explosion"))
        .await
        .expect("generation succeeds");

    assert_eq!(outcome.credits_remaining, 2);
    assert_eq!(outcome.generation.state, ImageState::Completed);
    assert!(outcome.generation.completed_at.is_some());
    assert_eq!(outcome.generation.product_name, "Café de Olla");
    assert_eq!(outcome.generation.brand, None);
    assert!(outcome.image_url.starts_with("/imagenes/"));
    assert!(outcome.image_url.ends_with(".png"));
    assert_eq!(
        outcome.generation.facebook_hashtags.as_deref(),
        Some(&["#cafe".to_string(), "#artesanal".to_string()][..])
    );
    assert!(
        outcome
            .generation
            .generated_prompt
            .as_deref()
            .unwrap_or_default()
            .contains("coffee bag")
    );

    let file_name = outcome.image_url.trim_start_matches("/imagenes/");
    let written = std::fs::read(h.dir.path().join(file_name)).expect("artifact on disk");
    assert_eq!(written, b"\x89PNG-fake");

    let account = h.reload(&account).await;
    assert_eq!(account.credits_available, 2);
    assert_eq!(account.credits_used, 1);

    let stored = h
        .store
        .image_generation(account.id, outcome.generation.id)
        .await
        .unwrap()
        .expect("record stored");
    assert_eq!(stored.state, ImageState::Completed);
    assert_eq!(stored.image_path.as_deref(), Some(outcome.image_url.as_str()));
}

#[actix_web::test]
async fn provider_without_image_refunds_the_credit() {
    let h = Harness::with(
        ScriptedText::ok(),
        ScriptedImage::NoImage,
        ScriptedMusic::completes_after(0),
    );
    let account = h.account("sin-imagen@example.com", 3).await;

    let err = generate_image(&h.state, &account, request("neon_noir"))
        .await
        .expect_err("generation fails");

    let WorkflowError::Failed {
        generation_id,
        credits_remaining,
        message,
    } = err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(credits_remaining, 3);
    assert!(message.starts_with("Error al generar"));

    let account = h.reload(&account).await;
    assert_eq!(account.credits_available, 3);
    assert_eq!(account.credits_used, 0);

    let stored = h
        .store
        .image_generation(account.id, generation_id)
        .await
        .unwrap()
        .expect("record kept");
    assert_eq!(stored.state, ImageState::Error);
    assert!(stored.error_message.is_some());
    assert!(stored.completed_at.is_some());
}

#[actix_web::test]
async fn panicking_provider_is_compensated() {
    let h = Harness::with(
        ScriptedText::ok(),
        ScriptedImage::Panic,
        ScriptedMusic::completes_after(0),
    );
    let account = h.account("panic@example.com", 1).await;

    let err = generate_image(&h.state, &account, request("liquid_metal"))
        .await
        .expect_err("generation fails");
    assert!(matches!(err, WorkflowError::Failed { credits_remaining: 1, .. }));

    let account = h.reload(&account).await;
    assert_eq!(account.credits_available, 1);
}

#[actix_web::test]
async fn text_model_failure_is_compensated() {
    let h = Harness::with(
        ScriptedText {
            vision: Err("upstream down".to_string()),
            json: Err("upstream down".to_string()),
        },
        ScriptedImage::Png(b"png".to_vec()),
        ScriptedMusic::completes_after(0),
    );
    let account = h.account("texto@example.com", 2).await;

    let err = generate_image(&h.state, &account, request("dark_luxury"))
        .await
        .expect_err("generation fails");
    assert!(matches!(err, WorkflowError::Failed { credits_remaining: 2, .. }));
}

#[actix_web::test]
async fn zero_credits_leaves_no_record() {
    let h = Harness::new();
    let account = h.account("pobre@example.com", 0).await;

    let err = generate_image(&h.state, &account, request("macro_explosion"))
        .await
        .expect_err("no credits");
    assert!(matches!(err, WorkflowError::InsufficientCredits));

    let (records, total) = h
        .store
        .list_image_generations(account.id, Page::numbered(1, 20))
        .await
        .unwrap();
    assert!(records.is_empty());
    assert_eq!(total, 0);
}

#[actix_web::test]
async fn unknown_preset_is_rejected_before_spending() {
    let h = Harness::new();
    let account = h.account("preset@example.com", 2).await;

    let err = generate_image(&h.state, &account, request("vaporwave"))
        .await
        .expect_err("unknown preset");
    assert!(matches!(err, WorkflowError::UnknownPreset(ref id) if id == "vaporwave"));
    assert_eq!(h.reload(&account).await.credits_available, 2);
}

#[actix_web::test]
async fn unsupported_logo_type_is_rejected() {
    let h = Harness::new();
    let account = h.account("logo@example.com", 2).await;

    let mut req = request("frozen_time");
    req.logo = Some(viralpost::providers::ImagePayload::new(
        "image/gif",
        b"gif".to_vec(),
    ));

    let err = generate_image(&h.state, &account, req)
        .await
        .expect_err("gif logo");
    assert!(matches!(err, WorkflowError::UnsupportedMediaType(ref t) if t == "image/gif"));

    let (records, _) = h
        .store
        .list_image_generations(account.id, Page::numbered(1, 20))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[actix_web::test]
async fn stale_snapshot_cannot_overspend() {
    let h = Harness::new();
    let account = h.account("carrera@example.com", 1).await;

    let first = generate_image(&h.state, &account, request("zero_gravity")).await;
    assert!(first.is_ok());

    // Same snapshot still claims one credit; the atomic debit must refuse.
    let err = generate_image(&h.state, &account, request("zero_gravity"))
        .await
        .expect_err("second spend refused");
    assert!(matches!(err, WorkflowError::InsufficientCredits));

    let account = h.reload(&account).await;
    assert_eq!(account.credits_available, 0);
    assert_eq!(account.credits_used, 1);

    let (records, total) = h
        .store
        .list_image_generations(account.id, Page::numbered(1, 20))
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(records[0].state, ImageState::Error);
    assert_eq!(records[1].state, ImageState::Completed);
}
