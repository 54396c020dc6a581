use std::collections::VecDeque;

use viralpost::db::Store;
use viralpost::error::WorkflowError;
use viralpost::models::{MusicState, Page};
use viralpost::providers::JobStatus;
use viralpost::workflow::{generate_music, MusicRequest};

mod support;

use support::{Harness, ScriptedImage, ScriptedMusic, ScriptedText};

fn request() -> MusicRequest {
    MusicRequest {
        title: "Jingle Café de Olla".to_string(),
        brief: "Un jingle alegre para nuestra cafetería de barrio".to_string(),
        duration_secs: 30,
        instrumental: false,
        genre: Some("pop".to_string()),
        mood: None,
        lyrics_language: "es-MX".to_string(),
    }
}

fn harness_with(text: ScriptedText, music: ScriptedMusic) -> Harness {
    Harness::with(text, ScriptedImage::Png(b"png".to_vec()), music)
}

#[actix_web::test]
async fn completed_track_is_stored_locally() {
    let h = Harness::new();
    let account = h.account("jingle@example.com", 2).await;

    let outcome = generate_music(&h.state, &account, request())
        .await
        .expect("music generation succeeds");

    assert_eq!(outcome.credits_remaining, 1);
    assert_eq!(outcome.lyrics_theme, "el aroma del café");

    let generation = &outcome.generation;
    assert_eq!(generation.state, MusicState::Completed);
    assert_eq!(generation.conversion_id.as_deref(), Some("conv-123"));
    assert_eq!(generation.genre.as_deref(), Some("latin pop"));
    assert_eq!(generation.mood.as_deref(), Some("alegre"));
    assert_eq!(
        generation.music_style.as_deref(),
        Some("Commercial Jingle, Latin Pop")
    );

    let url = generation.audio_url.as_deref().expect("audio url");
    assert!(url.starts_with("/music/music_"));
    let file_name = url.trim_start_matches("/music/");
    let written = std::fs::read(h.dir.path().join("music").join(file_name)).expect("audio on disk");
    assert_eq!(written, b"ID3-fake-mp3");

    assert_eq!(h.music.status_calls(), 3);
    let submitted = h.music.submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].duration_secs, 30);
    assert!(!submitted[0].instrumental);

    assert_eq!(h.reload(&account).await.credits_available, 1);
}

#[actix_web::test]
async fn text_model_failure_uses_fallback_prompt() {
    let h = harness_with(
        ScriptedText {
            vision: Err("down".to_string()),
            json: Err("down".to_string()),
        },
        ScriptedMusic::completes_after(0),
    );
    let account = h.account("fallback@example.com", 1).await;

    let outcome = generate_music(&h.state, &account, request())
        .await
        .expect("fallback keeps the workflow going");

    assert_eq!(outcome.generation.state, MusicState::Completed);
    assert_eq!(outcome.lyrics_theme, "beneficios del producto");
    let submitted = h.music.submitted.lock().unwrap().clone();
    assert!(submitted[0].prompt.contains("Mexican Spanish"));
}

#[actix_web::test]
async fn unparseable_reply_uses_fallback_prompt() {
    let h = harness_with(
        ScriptedText {
            vision: Err("unused".to_string()),
            json: Ok("lo siento, no puedo".to_string()),
        },
        ScriptedMusic::completes_after(1),
    );
    let account = h.account("basura@example.com", 1).await;

    let outcome = generate_music(&h.state, &account, request())
        .await
        .expect("fallback keeps the workflow going");
    assert_eq!(
        outcome.generation.music_style.as_deref(),
        Some("Commercial Jingle, Latin Pop, Catchy Spanish Vocals")
    );
}

#[actix_web::test]
async fn polling_timeout_refunds_the_credit() {
    let h = harness_with(ScriptedText::ok(), ScriptedMusic::stuck());
    let account = h.account("lento@example.com", 2).await;

    let err = generate_music(&h.state, &account, request())
        .await
        .expect_err("provider never finishes");

    let WorkflowError::Failed {
        generation_id,
        credits_remaining,
        message,
    } = err
    else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(credits_remaining, 2);
    assert!(message.starts_with("Error al generar música"));
    assert_eq!(h.music.status_calls(), h.state.config.music_poll.max_attempts);

    let stored = h
        .store
        .music_generation(account.id, generation_id)
        .await
        .unwrap()
        .expect("record kept");
    assert_eq!(stored.state, MusicState::Error);
    assert_eq!(stored.conversion_id.as_deref(), Some("conv-123"));
    assert_eq!(h.reload(&account).await.credits_available, 2);
}

#[actix_web::test]
async fn provider_reported_failure_stops_polling() {
    let h = harness_with(
        ScriptedText::ok(),
        ScriptedMusic::with_statuses(VecDeque::from([
            JobStatus::Running,
            JobStatus::Failed("content policy".to_string()),
        ])),
    );
    let account = h.account("rechazo@example.com", 1).await;

    let err = generate_music(&h.state, &account, request())
        .await
        .expect_err("job failed");
    assert!(matches!(err, WorkflowError::Failed { credits_remaining: 1, .. }));
    assert_eq!(h.music.status_calls(), 2);
}

#[actix_web::test]
async fn failed_download_keeps_the_remote_url() {
    let mut music = ScriptedMusic::completes_after(0);
    music.download = Err("cdn unreachable".to_string());
    let h = harness_with(ScriptedText::ok(), music);
    let account = h.account("cdn@example.com", 1).await;

    let outcome = generate_music(&h.state, &account, request())
        .await
        .expect("download failure is not fatal");
    assert_eq!(
        outcome.generation.audio_url.as_deref(),
        Some("https://cdn.example.com/track.mp3")
    );
    assert_eq!(outcome.generation.audio_path, None);
    assert_eq!(outcome.credits_remaining, 0);
}

#[actix_web::test]
async fn out_of_range_input_is_rejected_without_a_record() {
    let h = Harness::new();
    let account = h.account("limites@example.com", 3).await;

    let mut short = request();
    short.duration_secs = 10;
    let mut long = request();
    long.duration_secs = 121;
    let mut terse = request();
    terse.brief = "corto".to_string();
    let mut untitled = request();
    untitled.title = "   ".to_string();

    for req in [short, long, terse, untitled] {
        let err = generate_music(&h.state, &account, req)
            .await
            .expect_err("invalid input");
        assert!(matches!(err, WorkflowError::Validation(_)), "{err:?}");
    }

    let mut edge = request();
    edge.duration_secs = 120;
    assert!(generate_music(&h.state, &account, edge).await.is_ok());

    let records = h
        .store
        .list_music_generations(account.id, Page { limit: 20, offset: 0 })
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[actix_web::test]
async fn zero_credits_is_checked_after_validation() {
    let h = Harness::new();
    let account = h.account("sin-saldo@example.com", 0).await;

    let err = generate_music(&h.state, &account, request())
        .await
        .expect_err("no credits");
    assert!(matches!(err, WorkflowError::InsufficientCredits));
    assert_eq!(h.music.status_calls(), 0);
}
