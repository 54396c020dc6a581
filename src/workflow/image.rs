// src/workflow/image.rs

use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::artifacts::{ArtifactKind, StoredArtifact};
use crate::catalog::{self, VisualPreset};
use crate::error::{StageError, WorkflowError};
use crate::models::{Account, ImageGeneration, ImageState, NewImageGeneration};
use crate::prompts::{self, ImageBrief, ImageDraft};
use crate::providers::ImagePayload;
use crate::AppState;

/// Media types accepted for the product photo and the logo.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub preset_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub product_image: ImagePayload,
    pub logo: Option<ImagePayload>,
}

#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub generation: ImageGeneration,
    pub image_url: String,
    /// Base64 of the rendered PNG.
    pub image_base64: String,
    pub credits_remaining: i32,
}

struct Rendered {
    draft: ImageDraft,
    artifact: StoredArtifact,
    image_base64: String,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn check_media_type(payload: &ImagePayload) -> Result<(), WorkflowError> {
    if ALLOWED_IMAGE_TYPES.contains(&payload.mime_type.as_str()) {
        Ok(())
    } else {
        Err(WorkflowError::UnsupportedMediaType(payload.mime_type.clone()))
    }
}

/// Checks run before anything is written, in the order callers observe them.
fn validate(account: &Account, req: &ImageRequest) -> Result<&'static VisualPreset, WorkflowError> {
    if !account.has_credits(1) {
        return Err(WorkflowError::InsufficientCredits);
    }
    let preset = catalog::visual_preset(&req.preset_id)
        .ok_or_else(|| WorkflowError::UnknownPreset(req.preset_id.clone()))?;
    check_media_type(&req.product_image)?;
    if let Some(logo) = &req.logo {
        check_media_type(logo)?;
    }
    if req.product_name.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "El nombre del producto es obligatorio".to_string(),
        ));
    }
    if req.product_image.data.is_empty() {
        return Err(WorkflowError::Validation(
            "La imagen del producto está vacía".to_string(),
        ));
    }
    Ok(preset)
}

async fn render(
    state: &AppState,
    preset: &VisualPreset,
    req: &ImageRequest,
    record_id: i32,
) -> Result<Rendered, StageError> {
    let description = non_blank(&req.description);
    let brand = non_blank(&req.brand);
    let system = prompts::image_system_prompt(
        preset,
        &ImageBrief {
            product_name: req.product_name.trim(),
            description: description.as_deref(),
            brand: brand.as_deref(),
            has_logo: req.logo.is_some(),
        },
    );

    let raw = state
        .language_model
        .describe_product(&system, &req.product_image)
        .await?;
    let draft = prompts::parse_image_draft(&raw);
    if draft.image_prompt.trim().is_empty() {
        return Err(StageError::Generation(
            "the text model produced no image prompt".to_string(),
        ));
    }

    let final_prompt = prompts::final_image_prompt(preset, &draft.image_prompt);
    let bytes = state
        .image_model
        .render(&final_prompt, &req.product_image, req.logo.as_ref())
        .await?;

    let image_base64 = STANDARD.encode(&bytes);
    let artifact = state
        .artifacts
        .save(ArtifactKind::Image, record_id, bytes)
        .await?;

    Ok(Rendered {
        draft,
        artifact,
        image_base64,
    })
}

/// Image generation: reserve a credit, draft the prompt and copy with the
/// text model, render with the image model, store the result.
///
/// Validation and credit errors leave no trace. Once the record exists, any
/// failure (panics included) refunds the credit and moves the record to
/// `error` before [`WorkflowError::Failed`] is returned.
pub async fn generate_image(
    state: &AppState,
    account: &Account,
    req: ImageRequest,
) -> Result<ImageOutcome, WorkflowError> {
    let preset = validate(account, &req)?;
    let started = Instant::now();

    let mut record = state
        .store
        .create_image_generation(NewImageGeneration {
            account_id: account.id,
            product_name: req.product_name.trim().to_string(),
            product_description: non_blank(&req.description),
            brand: non_blank(&req.brand),
            preset_id: preset.id.to_string(),
            state: ImageState::Processing,
        })
        .await?;

    let Some(reserved) = state.store.debit_credit(account.id).await? else {
        // Another request spent the last credit between the check and the debit.
        record.error_message = Some(WorkflowError::InsufficientCredits.to_string());
        record.advance(ImageState::Error).ok();
        if let Err(e) = state.store.save_image_generation(&record).await {
            log::error!("image record update failed generation_id={} err={}", record.id, e);
        }
        return Err(WorkflowError::InsufficientCredits);
    };

    log::info!(
        "image generation started generation_id={} account_id={} preset={}",
        record.id,
        account.id,
        preset.id
    );

    let result = super::run_stage(async {
        let rendered = render(state, preset, &req, record.id).await?;

        let mut done = record.clone();
        done.image_path = Some(rendered.artifact.url.clone());
        done.generated_prompt = Some(rendered.draft.image_prompt);
        done.facebook_copy = Some(rendered.draft.facebook.copy);
        done.facebook_hashtags = Some(rendered.draft.facebook.hashtags);
        done.instagram_copy = Some(rendered.draft.instagram.copy);
        done.instagram_hashtags = Some(rendered.draft.instagram.hashtags);
        done.processing_ms = Some(super::elapsed_ms(started));
        done.advance(ImageState::Completed)?;
        state.store.save_image_generation(&done).await?;

        Ok((done, rendered.artifact.url, rendered.image_base64))
    })
    .await;

    match result {
        Ok((generation, image_url, image_base64)) => {
            log::info!(
                "image generation completed generation_id={} ms={}",
                generation.id,
                generation.processing_ms.unwrap_or_default()
            );
            Ok(ImageOutcome {
                generation,
                image_url,
                image_base64,
                credits_remaining: reserved.credits_available,
            })
        }
        Err(e) => {
            log::error!("image generation failed generation_id={} err={}", record.id, e);
            let credits_remaining = super::refund(state, account.id, reserved).await;

            record.error_message = Some(e.to_string());
            record.processing_ms = Some(super::elapsed_ms(started));
            record.advance(ImageState::Error).ok();
            if let Err(save_err) = state.store.save_image_generation(&record).await {
                log::error!(
                    "image record update failed generation_id={} err={}",
                    record.id,
                    save_err
                );
            }

            Err(WorkflowError::Failed {
                generation_id: record.id,
                credits_remaining,
                message: format!("Error al generar: {e}"),
            })
        }
    }
}
