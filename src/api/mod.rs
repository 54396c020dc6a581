// src/api/mod.rs

pub mod auth;
pub mod files;
pub mod generation;
pub mod music;
pub mod payments;
pub mod webhooks;

use actix_web::web;

use crate::error::AppError;
use crate::models::Account;
use crate::AppState;

/// Loads the account behind an authenticated request.
pub(crate) async fn current_account(state: &AppState, account_id: i32) -> Result<Account, AppError> {
    let account = state
        .store
        .account_by_id(account_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Usuario no encontrado".to_string()))?;
    if !account.is_active {
        return Err(AppError::Forbidden("Tu cuenta está desactivada".to_string()));
    }
    Ok(account)
}

/// Registers every route. Authenticated routes carry `JwtMiddleware` themselves.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(files::health)
        .service(files::serve_image)
        .service(files::serve_music)
        // auth
        .service(auth::register)
        .service(auth::login)
        .service(auth::me)
        .service(auth::update_me)
        // images; literal paths before `/{id}`
        .service(generation::list_categories)
        .service(generation::list_presets)
        .service(generation::preset_previews)
        .service(generation::get_preset)
        .service(generation::create_generation)
        .service(generation::history)
        .service(generation::get_generation)
        // music
        .service(music::list_styles)
        .service(music::generate)
        .service(music::history)
        .service(music::get_generation)
        // payments
        .service(payments::list_packages)
        .service(payments::checkout)
        .service(payments::history)
        .service(payments::credits)
        .service(webhooks::stripe_webhook)
        .service(webhooks::stripe_webhook_alias);
}
