// src/api/auth.rs

use std::task::{Context, Poll};

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{get, post, put, web, Error, HttpMessage, HttpResponse};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::current_account;
use crate::error::{AppError, StoreError};
use crate::models::{Account, NewAccount};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    exp: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub nombre: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub nombre: Option<String>,
}

/// Public view of an account.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub nombre: Option<String>,
    pub creditos: i32,
    pub creditos_usados: i32,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserView {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            nombre: a.display_name.clone(),
            creditos: a.credits_available,
            creditos_usados: a.credits_used,
            is_verified: a.is_verified,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub usuario: UserView,
}

const PASSWORD_MIN: usize = 6;
const PASSWORD_MAX: usize = 100;
const NAME_MAX: usize = 100;

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn normalize_name(name: Option<&str>) -> Result<Option<String>, AppError> {
    let name = name.map(str::trim).filter(|n| !n.is_empty());
    if name.is_some_and(|n| n.chars().count() > NAME_MAX) {
        return Err(AppError::BadRequest(format!(
            "El nombre no puede exceder {NAME_MAX} caracteres"
        )));
    }
    Ok(name.map(str::to_string))
}

pub fn issue_token(account_id: i32, secret: &str, hours: i64) -> Result<String, AppError> {
    let expiration = (Utc::now() + Duration::hours(hours)).timestamp() as usize;
    let claims = Claims {
        sub: account_id,
        exp: expiration,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        log::error!("jwt encode error: {}", e);
        AppError::Internal("Error interno del servidor".to_string())
    })
}

fn auth_response(state: &AppState, account: &Account) -> Result<HttpResponse, AppError> {
    let token = issue_token(
        account.id,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        usuario: account.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/registro",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid data or email already registered")
    )
)]
#[post("/api/auth/registro")]
pub async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let email = payload.email.trim().to_lowercase();
    if !looks_like_email(&email) {
        return Err(AppError::BadRequest("Correo electrónico no válido".to_string()));
    }
    let password_len = payload.password.chars().count();
    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&password_len) {
        return Err(AppError::BadRequest(format!(
            "La contraseña debe tener entre {PASSWORD_MIN} y {PASSWORD_MAX} caracteres"
        )));
    }
    let display_name = normalize_name(payload.nombre.as_deref())?;

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        log::error!("bcrypt hash error: {}", e);
        AppError::Internal("Error interno del servidor".to_string())
    })?;

    let account = match state
        .store
        .create_account(NewAccount {
            email,
            password_hash,
            display_name,
            credits: state.config.free_credits_on_signup,
        })
        .await
    {
        Ok(a) => a,
        Err(StoreError::Conflict(_)) => {
            return Err(AppError::BadRequest(
                "Este correo ya está registrado".to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    log::info!("account registered account_id={}", account.id);
    auth_response(&state, &account)
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Wrong email or password"),
        (status = 403, description = "Account disabled")
    )
)]
#[post("/api/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let invalid = || AppError::Unauthorized("Correo o contraseña incorrectos".to_string());
    let email = payload.email.trim().to_lowercase();

    let account = state
        .store
        .account_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let matches = verify(&payload.password, &account.password_hash).map_err(|e| {
        log::error!("bcrypt verify error: {}", e);
        AppError::Internal("Error interno del servidor".to_string())
    })?;
    if !matches {
        return Err(invalid());
    }
    if !account.is_active {
        return Err(AppError::Forbidden("Tu cuenta está desactivada".to_string()));
    }

    auth_response(&state, &account)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses((status = 200, description = "Current account", body = UserView)),
    security(("bearer" = []))
)]
#[get("/api/auth/me", wrap = "JwtMiddleware")]
pub async fn me(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    Ok(HttpResponse::Ok().json(UserView::from(&account)))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated account", body = UserView)),
    security(("bearer" = []))
)]
#[put("/api/auth/me", wrap = "JwtMiddleware")]
pub async fn update_me(
    state: web::Data<AppState>,
    account_id: web::ReqData<i32>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    let account = current_account(&state, *account_id).await?;
    let name = normalize_name(payload.nombre.as_deref())?;
    let account = state
        .store
        .update_display_name(account.id, name.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(UserView::from(&account)))
}

/// Middleware that:
/// - reads `Authorization: Bearer <jwt>`
/// - validates it with the configured secret
/// - puts the `i32` account id into `req.extensions_mut()`
pub struct JwtMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtMiddlewareInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareInner { service }))
    }
}

pub struct JwtMiddlewareInner<S> {
    service: S,
}

fn rejected(message: &str) -> Error {
    AppError::Unauthorized(message.to_string()).into()
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let Some(secret) = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.config.jwt_secret.clone())
        else {
            return Box::pin(async move {
                Err(actix_web::error::ErrorInternalServerError(
                    "application state not configured",
                ))
            });
        };

        let token = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "));

        let Some(token) = token else {
            return Box::pin(async move { Err(rejected("No autenticado")) });
        };

        match decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_ref()),
            &Validation::default(),
        ) {
            Ok(token_data) => {
                req.extensions_mut().insert(token_data.claims.sub);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await })
            }
            Err(_) => Box::pin(async move { Err(rejected("Token inválido o expirado")) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(looks_like_email("ana@example.com"));
        assert!(!looks_like_email("ana@localhost"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ana@@example.com"));
        assert!(!looks_like_email("ana @example.com"));
    }

    #[test]
    fn token_round_trips_subject() {
        let token = issue_token(42, "secret", 1).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, 42);
        assert!(
            decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::default())
                .is_err()
        );
    }

    #[test]
    fn long_names_are_rejected() {
        assert_eq!(normalize_name(Some("  ")).unwrap(), None);
        assert_eq!(normalize_name(Some(" Ana ")).unwrap().as_deref(), Some("Ana"));
        assert!(normalize_name(Some(&"x".repeat(101))).is_err());
    }
}
