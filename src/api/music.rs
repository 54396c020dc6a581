// src/api/music.rs

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::auth::JwtMiddleware;
use super::current_account;
use crate::catalog;
use crate::error::AppError;
use crate::models::{MusicGeneration, Page};
use crate::workflow::music::{DEFAULT_DURATION_SECS, DEFAULT_LYRICS_LANGUAGE};
use crate::workflow::{self, MusicRequest};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct MusicGenerationRequest {
    pub titulo: String,
    pub descripcion: String,
    pub duracion_segundos: Option<i32>,
    #[serde(default)]
    pub es_instrumental: bool,
    pub genero: Option<String>,
    pub mood: Option<String>,
    pub idioma: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MusicGenerationResponse {
    pub exito: bool,
    pub mensaje: String,
    pub generacion_id: i32,
    pub audio_url: Option<String>,
    pub prompt_usado: Option<String>,
    pub mood: Option<String>,
    pub genre: Option<String>,
    pub lyrics_theme: String,
    pub creditos_restantes: i32,
    pub tiempo_ms: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MusicView {
    pub id: i32,
    pub titulo: String,
    pub descripcion: Option<String>,
    pub duracion_segundos: i32,
    pub es_instrumental: bool,
    pub genero: Option<String>,
    pub mood: Option<String>,
    pub audio_url: Option<String>,
    pub estado: String,
    pub created_at: DateTime<Utc>,
}

impl From<MusicGeneration> for MusicView {
    fn from(g: MusicGeneration) -> Self {
        Self {
            id: g.id,
            titulo: g.title,
            descripcion: g.brief,
            duracion_segundos: g.duration_secs,
            es_instrumental: g.instrumental,
            genero: g.genre,
            mood: g.mood,
            audio_url: g.audio_url,
            estado: g.state.to_string(),
            created_at: g.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/music/estilos",
    tag = "music",
    responses((status = 200, description = "Music styles"))
)]
#[get("/api/music/estilos")]
pub async fn list_styles() -> HttpResponse {
    let styles: Vec<_> = catalog::MUSIC_STYLES
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "nombre": s.name,
                "descripcion": s.description,
                "icono": s.icon,
            })
        })
        .collect();
    HttpResponse::Ok().json(styles)
}

#[utoipa::path(
    post,
    path = "/api/music/generar",
    tag = "music",
    request_body = MusicGenerationRequest,
    responses(
        (status = 200, description = "Track generated", body = MusicGenerationResponse),
        (status = 400, description = "Out-of-range input"),
        (status = 402, description = "Not enough credits"),
        (status = 500, description = "Generation failed, credit refunded")
    ),
    security(("bearer" = []))
)]
#[post("/api/music/generar", wrap = "JwtMiddleware")]
pub async fn generate(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    payload: web::Json<MusicGenerationRequest>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let payload = payload.into_inner();

    let outcome = workflow::generate_music(
        &state,
        &account,
        MusicRequest {
            title: payload.titulo,
            brief: payload.descripcion,
            duration_secs: payload.duracion_segundos.unwrap_or(DEFAULT_DURATION_SECS),
            instrumental: payload.es_instrumental,
            genre: payload.genero,
            mood: payload.mood,
            lyrics_language: payload
                .idioma
                .unwrap_or_else(|| DEFAULT_LYRICS_LANGUAGE.to_string()),
        },
    )
    .await?;

    let g = outcome.generation;
    Ok(HttpResponse::Ok().json(MusicGenerationResponse {
        exito: true,
        mensaje: "¡Canción generada exitosamente!".to_string(),
        generacion_id: g.id,
        audio_url: g.audio_url,
        prompt_usado: g.music_prompt,
        mood: g.mood,
        genre: g.genre,
        lyrics_theme: outcome.lyrics_theme,
        creditos_restantes: outcome.credits_remaining,
        tiempo_ms: g.processing_ms,
    }))
}

#[utoipa::path(
    get,
    path = "/api/music/historial",
    tag = "music",
    params(
        ("limit" = Option<i64>, Query, description = "Page size, default 20"),
        ("offset" = Option<i64>, Query, description = "Rows to skip")
    ),
    responses((status = 200, description = "Music generation history")),
    security(("bearer" = []))
)]
#[get("/api/music/historial", wrap = "JwtMiddleware")]
pub async fn history(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let page = Page {
        limit: query.limit.unwrap_or(20).clamp(1, 100),
        offset: query.offset.unwrap_or(0).max(0),
    };
    let generaciones: Vec<MusicView> = state
        .store
        .list_music_generations(account.id, page)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "total": generaciones.len(),
        "generaciones": generaciones,
    })))
}

#[utoipa::path(
    get,
    path = "/api/music/generacion/{id}",
    tag = "music",
    responses(
        (status = 200, description = "Music generation detail"),
        (status = 404, description = "Not found for this account")
    ),
    security(("bearer" = []))
)]
#[get("/api/music/generacion/{id}", wrap = "JwtMiddleware")]
pub async fn get_generation(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let g = state
        .store
        .music_generation(account.id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Generación no encontrada".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "id": g.id,
        "titulo": g.title,
        "descripcion": g.brief,
        "duracion_segundos": g.duration_secs,
        "es_instrumental": g.instrumental,
        "genero": g.genre,
        "mood": g.mood,
        "idioma": g.lyrics_language,
        "prompt_musicgpt": g.music_prompt,
        "music_style": g.music_style,
        "lyrics_theme": g.lyrics_theme,
        "audio_url": g.audio_url,
        "estado": g.state,
        "error_mensaje": g.error_message,
        "tiempo_procesamiento_ms": g.processing_ms,
        "created_at": g.created_at,
        "completed_at": g.completed_at,
    })))
}
