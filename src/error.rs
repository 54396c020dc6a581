// src/error.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::{InvalidTransition, UnknownState};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation (email, checkout session id).
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("corrupt row: {0}")]
    Corrupt(#[from] UnknownState),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Database(e)
    }
}

/// Failures talking to the text, image or music generation APIs.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} http error: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} api error status={status} body={body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} invalid response: {detail}")]
    InvalidResponse {
        provider: &'static str,
        detail: String,
    },
    #[error("{provider} returned no {what}")]
    MissingOutput {
        provider: &'static str,
        what: &'static str,
    },
    #[error("music job failed: {0}")]
    JobFailed(String),
    #[error("music job timed out after {attempts} status checks")]
    Timeout { attempts: u32 },
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stripe api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("artifact upload failed: {0}")]
    Upload(String),
}

/// Errors of the image and music generation workflows.
///
/// Everything up to `Validation` is raised before any record or ledger
/// mutation. `Failed` is raised after compensation ran: the credit is back
/// and the record is in its error state.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("No tienes suficientes créditos. Compra más para continuar.")]
    InsufficientCredits,
    #[error("Estilo no válido: {0}")]
    UnknownPreset(String),
    #[error("Tipo de imagen no soportado: {0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    Failed {
        generation_id: i32,
        credits_remaining: i32,
        message: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised inside a generation stage; all of them trigger compensation.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Transition(#[from] InvalidTransition),
    #[error("{0}")]
    Generation(String),
    #[error("unexpected panic: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Paquete no válido: {0}")]
    UnknownPackage(String),
    #[error("Moneda no soportada: {0}")]
    UnsupportedCurrency(String),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("invalid signature: {0}")]
    Signature(#[from] crate::payments::signature::SignatureError),
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// HTTP-facing error. Handlers return `Result<HttpResponse, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
    #[error("{message}")]
    GenerationFailed {
        generation_id: i32,
        credits_remaining: i32,
        message: String,
    },
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) | AppError::GenerationFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::GenerationFailed {
                generation_id,
                credits_remaining,
                message,
            } => json!({
                "exito": false,
                "error": message,
                "mensaje": message,
                "generacion_id": generation_id,
                "creditos_restantes": credits_remaining,
            }),
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(what) => AppError::BadRequest(what),
            other => {
                log::error!("storage error: {}", other);
                AppError::Internal("Error interno del servidor".to_string())
            }
        }
    }
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        match e {
            WorkflowError::InsufficientCredits => AppError::PaymentRequired(e.to_string()),
            WorkflowError::UnknownPreset(_)
            | WorkflowError::UnsupportedMediaType(_)
            | WorkflowError::Validation(_) => AppError::BadRequest(e.to_string()),
            WorkflowError::Failed {
                generation_id,
                credits_remaining,
                message,
            } => AppError::GenerationFailed {
                generation_id,
                credits_remaining,
                message,
            },
            WorkflowError::Store(e) => e.into(),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        match e {
            CheckoutError::UnknownPackage(_) | CheckoutError::UnsupportedCurrency(_) => {
                AppError::BadRequest(e.to_string())
            }
            CheckoutError::Payment(e) => {
                log::error!("stripe checkout error: {}", e);
                AppError::Internal("Error al crear sesión de pago".to_string())
            }
            CheckoutError::Store(e) => e.into(),
        }
    }
}
