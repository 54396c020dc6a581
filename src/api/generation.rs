// src/api/generation.rs

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::auth::JwtMiddleware;
use super::current_account;
use crate::catalog::{self, VisualPreset};
use crate::error::AppError;
use crate::models::{ImageGeneration, Page};
use crate::providers::ImagePayload;
use crate::workflow::{self, ImageRequest};
use crate::AppState;

/// Per-part upload limit.
const MAX_PART_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryView {
    pub id: &'static str,
    pub nombre: &'static str,
    pub icono: &'static str,
    pub descripcion: &'static str,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PresetView {
    pub id: &'static str,
    pub nombre: &'static str,
    pub descripcion: &'static str,
    pub icono: &'static str,
    pub preview_color: &'static str,
    pub imagen_ejemplo: &'static str,
    pub categorias: Vec<&'static str>,
}

impl From<&VisualPreset> for PresetView {
    fn from(p: &VisualPreset) -> Self {
        Self {
            id: p.id,
            nombre: p.name,
            descripcion: p.description,
            icono: p.icon,
            preview_color: p.preview_color,
            imagen_ejemplo: p.example_image,
            categorias: p.categories.to_vec(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerationView {
    pub id: i32,
    pub estado: String,
    pub nombre_producto: String,
    pub imagen_url: Option<String>,
    pub copy_facebook: Option<String>,
    pub hashtags_facebook: Option<Vec<String>>,
    pub copy_instagram: Option<String>,
    pub hashtags_instagram: Option<Vec<String>>,
    pub estilo: String,
    pub error_mensaje: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ImageGeneration> for GenerationView {
    fn from(g: ImageGeneration) -> Self {
        Self {
            id: g.id,
            estado: g.state.to_string(),
            nombre_producto: g.product_name,
            imagen_url: g.image_path,
            copy_facebook: g.facebook_copy,
            hashtags_facebook: g.facebook_hashtags,
            copy_instagram: g.instagram_copy,
            hashtags_instagram: g.instagram_hashtags,
            estilo: g.preset_id,
            error_mensaje: g.error_message,
            created_at: g.created_at,
            completed_at: g.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PresetQuery {
    pub categoria: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub pagina: Option<i64>,
    pub por_pagina: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/generacion/categorias",
    tag = "generacion",
    responses((status = 200, description = "Business categories", body = [CategoryView]))
)]
#[get("/api/generacion/categorias")]
pub async fn list_categories() -> HttpResponse {
    let categories: Vec<CategoryView> = catalog::CATEGORIES
        .iter()
        .map(|c| CategoryView {
            id: c.id,
            nombre: c.name,
            icono: c.icon,
            descripcion: c.description,
        })
        .collect();
    HttpResponse::Ok().json(categories)
}

#[utoipa::path(
    get,
    path = "/api/generacion/estilos",
    tag = "generacion",
    params(("categoria" = Option<String>, Query, description = "Business category, `todos` for all")),
    responses((status = 200, description = "Visual presets", body = [PresetView]))
)]
#[get("/api/generacion/estilos")]
pub async fn list_presets(query: web::Query<PresetQuery>) -> HttpResponse {
    let presets: Vec<PresetView> = catalog::presets_in_category(query.categoria.as_deref())
        .into_iter()
        .map(PresetView::from)
        .collect();
    HttpResponse::Ok().json(presets)
}

#[utoipa::path(
    get,
    path = "/api/generacion/estilos/imagenes-dinamicas",
    tag = "generacion",
    responses((status = 200, description = "Latest completed image per preset"))
)]
#[get("/api/generacion/estilos/imagenes-dinamicas")]
pub async fn preset_previews(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let imagenes: HashMap<String, String> = state
        .store
        .preset_previews()
        .await?
        .into_iter()
        .map(|p| (p.preset_id, p.image_path))
        .collect();
    Ok(HttpResponse::Ok().json(json!({ "imagenes": imagenes })))
}

#[utoipa::path(
    get,
    path = "/api/generacion/estilo/{id}",
    tag = "generacion",
    responses(
        (status = 200, description = "Preset detail", body = PresetView),
        (status = 404, description = "Unknown preset")
    )
)]
#[get("/api/generacion/estilo/{id}")]
pub async fn get_preset(path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let preset = catalog::visual_preset(&path)
        .ok_or_else(|| AppError::NotFound("Estilo no encontrado".to_string()))?;
    Ok(HttpResponse::Ok().json(PresetView::from(preset)))
}

/// Text fields and uploaded files of a multipart form.
#[derive(Default)]
struct GenerationForm {
    text: HashMap<String, String>,
    files: HashMap<String, ImagePayload>,
}

impl GenerationForm {
    fn text(&self, name: &str) -> Option<String> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

async fn read_form(mut payload: Multipart) -> Result<GenerationForm, AppError> {
    let mut form = GenerationForm::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Formulario inválido: {e}")))?;

        let name = field.name().to_string();
        let is_file = field.content_disposition().get_filename().is_some();
        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Formulario inválido: {e}")))?;
            if data.len() + chunk.len() > MAX_PART_BYTES {
                return Err(AppError::BadRequest(format!(
                    "El campo {name} excede el tamaño permitido"
                )));
            }
            data.extend_from_slice(&chunk);
        }

        if is_file {
            // Browsers send an empty part for an untouched optional file input.
            if !data.is_empty() {
                form.files.insert(name, ImagePayload::new(mime_type, data));
            }
        } else {
            form.text
                .insert(name, String::from_utf8_lossy(&data).into_owned());
        }
    }
    Ok(form)
}

#[utoipa::path(
    post,
    path = "/api/generacion/crear",
    tag = "generacion",
    request_body(content_type = "multipart/form-data", description = "estilo_id, nombre_producto, descripcion_producto, marca, imagen_producto, logo"),
    responses(
        (status = 200, description = "Image and social copy generated"),
        (status = 400, description = "Invalid preset, media type or form"),
        (status = 402, description = "Not enough credits"),
        (status = 500, description = "Generation failed, credit refunded")
    ),
    security(("bearer" = []))
)]
#[post("/api/generacion/crear", wrap = "JwtMiddleware")]
pub async fn create_generation(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let mut form = read_form(payload).await?;

    let preset_id = form
        .text("estilo_id")
        .ok_or_else(|| AppError::BadRequest("estilo_id es obligatorio".to_string()))?;
    let product_name = form
        .text("nombre_producto")
        .ok_or_else(|| AppError::BadRequest("nombre_producto es obligatorio".to_string()))?;
    let product_image = form
        .files
        .remove("imagen_producto")
        .ok_or_else(|| AppError::BadRequest("imagen_producto es obligatoria".to_string()))?;

    let outcome = workflow::generate_image(
        &state,
        &account,
        ImageRequest {
            preset_id,
            product_name,
            description: form.text("descripcion_producto"),
            brand: form.text("marca"),
            product_image,
            logo: form.files.remove("logo"),
        },
    )
    .await?;

    let g = &outcome.generation;
    Ok(HttpResponse::Ok().json(json!({
        "exito": true,
        "mensaje": "¡Imagen generada exitosamente!",
        "generacion_id": g.id,
        "imagen_url": outcome.image_url,
        "imagen_base64": outcome.image_base64,
        "copy_facebook": g.facebook_copy,
        "hashtags_facebook": g.facebook_hashtags,
        "copy_instagram": g.instagram_copy,
        "hashtags_instagram": g.instagram_hashtags,
        "creditos_restantes": outcome.credits_remaining,
        "tiempo_ms": g.processing_ms,
    })))
}

#[utoipa::path(
    get,
    path = "/api/generacion/historial",
    tag = "generacion",
    params(
        ("pagina" = Option<i64>, Query, description = "1-based page"),
        ("por_pagina" = Option<i64>, Query, description = "Page size, 1..=100")
    ),
    responses((status = 200, description = "Image generation history")),
    security(("bearer" = []))
)]
#[get("/api/generacion/historial", wrap = "JwtMiddleware")]
pub async fn history(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let pagina = query.pagina.unwrap_or(1).max(1);
    let page = Page::numbered(pagina, query.por_pagina.unwrap_or(10));

    let (items, total) = state.store.list_image_generations(account.id, page).await?;
    let generaciones: Vec<GenerationView> = items.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(json!({
        "total": total,
        "pagina": pagina,
        "por_pagina": page.limit,
        "generaciones": generaciones,
    })))
}

#[utoipa::path(
    get,
    path = "/api/generacion/{id}",
    tag = "generacion",
    responses(
        (status = 200, description = "Image generation", body = GenerationView),
        (status = 404, description = "Not found for this account")
    ),
    security(("bearer" = []))
)]
#[get("/api/generacion/{id}", wrap = "JwtMiddleware")]
pub async fn get_generation(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let generation = state
        .store
        .image_generation(account.id, path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Generación no encontrada".to_string()))?;
    Ok(HttpResponse::Ok().json(GenerationView::from(generation)))
}
