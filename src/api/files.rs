// src/api/files.rs
//
// Locally stored artifacts and the health probe.

use std::io::ErrorKind;
use std::path::Path;

use actix_web::{get, web, HttpResponse};
use serde_json::json;

use crate::artifacts::sanitize;
use crate::error::AppError;
use crate::AppState;

#[utoipa::path(get, path = "/health", tag = "service", responses((status = 200, description = "Service is up")))]
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok", "service": "viralpost" }))
}

fn content_type(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

async fn serve(dir: Option<&Path>, requested: &str) -> Result<HttpResponse, AppError> {
    let not_found = || AppError::NotFound("Archivo no encontrado".to_string());

    let file_name = sanitize(requested);
    if file_name.is_empty() || file_name != requested || file_name.starts_with('.') {
        return Err(not_found());
    }
    let dir = dir.ok_or_else(not_found)?;

    match tokio::fs::read(dir.join(&file_name)).await {
        Ok(bytes) => Ok(HttpResponse::Ok()
            .content_type(content_type(&file_name))
            .body(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
        Err(e) => {
            log::error!("artifact read failed file={} err={}", file_name, e);
            Err(AppError::Internal("Error interno del servidor".to_string()))
        }
    }
}

#[get("/imagenes/{file}")]
pub async fn serve_image(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    serve(state.artifacts.image_dir(), &path).await
}

#[get("/music/{file}")]
pub async fn serve_music(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    serve(state.artifacts.music_dir().as_deref(), &path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type("1_ab.png"), "image/png");
        assert_eq!(content_type("music_1_ab.MP3"), "audio/mpeg");
        assert_eq!(content_type("README"), "application/octet-stream");
    }

    #[actix_web::test]
    async fn traversal_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.png"), b"png").unwrap();

        assert!(serve(Some(dir.path()), "ok.png").await.is_ok());
        assert!(serve(Some(dir.path()), "../ok.png").await.is_err());
        assert!(serve(Some(dir.path()), "..").await.is_err());
        assert!(serve(Some(dir.path()), "missing.png").await.is_err());
        assert!(serve(None, "ok.png").await.is_err());
    }
}
