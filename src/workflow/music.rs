// src/workflow/music.rs

use std::ops::RangeInclusive;
use std::time::Instant;

use crate::artifacts::ArtifactKind;
use crate::config::PollPolicy;
use crate::error::{ProviderError, StageError, WorkflowError};
use crate::models::{Account, MusicGeneration, MusicState, NewMusicGeneration};
use crate::prompts::{self, MusicBrief, MusicDraft};
use crate::providers::{JobStatus, MusicJob, MusicModel};
use crate::AppState;

pub const TITLE_CHARS: RangeInclusive<usize> = 1..=200;
pub const BRIEF_CHARS: RangeInclusive<usize> = 10..=2000;
pub const DURATION_SECS: RangeInclusive<i32> = 15..=120;
pub const DEFAULT_DURATION_SECS: i32 = 30;
pub const DEFAULT_LYRICS_LANGUAGE: &str = "es-MX";

#[derive(Debug, Clone)]
pub struct MusicRequest {
    pub title: String,
    pub brief: String,
    pub duration_secs: i32,
    pub instrumental: bool,
    pub genre: Option<String>,
    pub mood: Option<String>,
    pub lyrics_language: String,
}

#[derive(Debug, Clone)]
pub struct MusicOutcome {
    pub generation: MusicGeneration,
    pub lyrics_theme: String,
    pub credits_remaining: i32,
}

fn validate(req: &MusicRequest) -> Result<(), WorkflowError> {
    let title = req.title.trim().chars().count();
    if !TITLE_CHARS.contains(&title) {
        return Err(WorkflowError::Validation(format!(
            "El título debe tener entre {} y {} caracteres",
            TITLE_CHARS.start(),
            TITLE_CHARS.end()
        )));
    }
    let brief = req.brief.trim().chars().count();
    if !BRIEF_CHARS.contains(&brief) {
        return Err(WorkflowError::Validation(format!(
            "La descripción debe tener entre {} y {} caracteres",
            BRIEF_CHARS.start(),
            BRIEF_CHARS.end()
        )));
    }
    if !DURATION_SECS.contains(&req.duration_secs) {
        return Err(WorkflowError::Validation(format!(
            "La duración debe estar entre {} y {} segundos",
            DURATION_SECS.start(),
            DURATION_SECS.end()
        )));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Polls `conversion_id` until the provider reports a terminal status.
/// Failed status checks are logged and count as an attempt.
pub async fn wait_for_audio(
    model: &dyn MusicModel,
    conversion_id: &str,
    policy: PollPolicy,
) -> Result<String, ProviderError> {
    for attempt in 1..=policy.max_attempts {
        match model.status(conversion_id).await {
            Ok(JobStatus::Completed { audio_url }) => return Ok(audio_url),
            Ok(JobStatus::Failed(reason)) => return Err(ProviderError::JobFailed(reason)),
            Ok(JobStatus::Running) => {
                log::debug!("music job running conversion_id={} attempt={}", conversion_id, attempt)
            }
            Err(e) => log::warn!(
                "music status check failed conversion_id={} attempt={} err={}",
                conversion_id,
                attempt,
                e
            ),
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }
    Err(ProviderError::Timeout {
        attempts: policy.max_attempts,
    })
}

async fn draft_prompt(state: &AppState, brief: &MusicBrief<'_>) -> (String, MusicDraft) {
    let user = prompts::music_user_prompt(brief);
    let draft = match state
        .language_model
        .compose_json(prompts::MUSIC_SYSTEM_PROMPT, &user)
        .await
    {
        Ok(raw) => prompts::parse_music_draft(&raw),
        Err(e) => {
            log::warn!("music prompt request failed, using fallback err={}", e);
            None
        }
    };
    (user, draft.unwrap_or_else(MusicDraft::fallback))
}

/// Runs the provider side of a music generation, recording progress on
/// `record`. Returns the completed copy, already persisted.
async fn produce(
    state: &AppState,
    record: &mut MusicGeneration,
    started: Instant,
) -> Result<(MusicGeneration, String), StageError> {
    let brief = record.brief.clone().unwrap_or_default();
    let (user_prompt, draft) = draft_prompt(
        state,
        &MusicBrief {
            brief: &brief,
            duration_secs: record.duration_secs,
            genre: record.genre.as_deref(),
            mood: record.mood.as_deref(),
            instrumental: record.instrumental,
            lyrics_language: &record.lyrics_language,
        },
    )
    .await;

    record.text_prompt = Some(user_prompt);
    record.music_prompt = Some(draft.music_prompt.clone());
    record.music_style = Some(draft.music_style.clone());
    record.lyrics_theme = non_blank(Some(&draft.lyrics_theme));
    record.advance(MusicState::GeneratingMusic)?;
    state.store.save_music_generation(record).await?;

    let conversion_id = state
        .music_model
        .submit(&MusicJob {
            prompt: draft.music_prompt.clone(),
            music_style: draft.music_style.clone(),
            instrumental: record.instrumental,
            duration_secs: record.duration_secs,
        })
        .await?;
    record.conversion_id = Some(conversion_id.clone());
    log::info!(
        "music job submitted generation_id={} conversion_id={}",
        record.id,
        conversion_id
    );

    let remote_url =
        wait_for_audio(state.music_model.as_ref(), &conversion_id, state.config.music_poll).await?;

    let mut done = record.clone();
    match state.music_model.download(&remote_url).await {
        Ok(bytes) => match state.artifacts.save(ArtifactKind::Music, record.id, bytes).await {
            Ok(stored) => {
                done.audio_path = Some(stored.path);
                done.audio_url = Some(stored.url);
            }
            Err(e) => {
                log::warn!("audio store failed generation_id={} err={}", record.id, e);
                done.audio_url = Some(remote_url.clone());
            }
        },
        Err(e) => {
            log::warn!("audio download failed generation_id={} err={}", record.id, e);
            done.audio_url = Some(remote_url.clone());
        }
    }

    if let Some(mood) = non_blank(Some(&draft.mood)) {
        done.mood = Some(mood);
    }
    if let Some(genre) = non_blank(Some(&draft.genre)) {
        done.genre = Some(genre);
    }
    done.processing_ms = Some(super::elapsed_ms(started));
    done.advance(MusicState::Completed)?;
    state.store.save_music_generation(&done).await?;

    Ok((done, draft.lyrics_theme))
}

/// Music generation: reserve a credit, draft a short prompt, submit to the
/// music provider and wait for the track.
///
/// The text model step never fails the workflow; a fixed prompt is used
/// instead. Submission, polling and persistence failures refund the credit
/// and move the record to `error`.
pub async fn generate_music(
    state: &AppState,
    account: &Account,
    req: MusicRequest,
) -> Result<MusicOutcome, WorkflowError> {
    validate(&req)?;
    if !account.has_credits(1) {
        return Err(WorkflowError::InsufficientCredits);
    }
    let started = Instant::now();

    let lyrics_language = non_blank(Some(&req.lyrics_language))
        .unwrap_or_else(|| DEFAULT_LYRICS_LANGUAGE.to_string());
    let mut record = state
        .store
        .create_music_generation(NewMusicGeneration {
            account_id: account.id,
            title: req.title.trim().to_string(),
            brief: Some(req.brief.trim().to_string()),
            duration_secs: req.duration_secs,
            instrumental: req.instrumental,
            genre: non_blank(req.genre.as_deref()),
            mood: non_blank(req.mood.as_deref()),
            lyrics_language,
            state: MusicState::GeneratingPrompt,
        })
        .await?;

    let Some(reserved) = state.store.debit_credit(account.id).await? else {
        record.error_message = Some(WorkflowError::InsufficientCredits.to_string());
        record.advance(MusicState::Error).ok();
        if let Err(e) = state.store.save_music_generation(&record).await {
            log::error!("music record update failed generation_id={} err={}", record.id, e);
        }
        return Err(WorkflowError::InsufficientCredits);
    };

    log::info!(
        "music generation started generation_id={} account_id={} duration={}",
        record.id,
        account.id,
        record.duration_secs
    );

    let result = super::run_stage(produce(state, &mut record, started)).await;

    match result {
        Ok((generation, lyrics_theme)) => {
            log::info!(
                "music generation completed generation_id={} ms={}",
                generation.id,
                generation.processing_ms.unwrap_or_default()
            );
            Ok(MusicOutcome {
                generation,
                lyrics_theme,
                credits_remaining: reserved.credits_available,
            })
        }
        Err(e) => {
            log::error!("music generation failed generation_id={} err={}", record.id, e);
            let credits_remaining = super::refund(state, account.id, reserved).await;

            record.error_message = Some(e.to_string());
            record.processing_ms = Some(super::elapsed_ms(started));
            record.advance(MusicState::Error).ok();
            if let Err(save_err) = state.store.save_music_generation(&record).await {
                log::error!(
                    "music record update failed generation_id={} err={}",
                    record.id,
                    save_err
                );
            }

            Err(WorkflowError::Failed {
                generation_id: record.id,
                credits_remaining,
                message: format!("Error al generar música: {e}"),
            })
        }
    }
}
