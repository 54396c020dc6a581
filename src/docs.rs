use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::files::health,
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::me,
        crate::api::auth::update_me,
        crate::api::generation::list_categories,
        crate::api::generation::list_presets,
        crate::api::generation::preset_previews,
        crate::api::generation::get_preset,
        crate::api::generation::create_generation,
        crate::api::generation::history,
        crate::api::generation::get_generation,
        crate::api::music::list_styles,
        crate::api::music::generate,
        crate::api::music::history,
        crate::api::music::get_generation,
        crate::api::payments::list_packages,
        crate::api::payments::checkout,
        crate::api::payments::history,
        crate::api::payments::credits,
        crate::api::webhooks::stripe_webhook,
        crate::api::webhooks::stripe_webhook_alias
    ),
    components(
        schemas(
            crate::api::auth::RegisterRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::UpdateProfileRequest,
            crate::api::auth::UserView,
            crate::api::auth::AuthResponse,
            crate::api::generation::CategoryView,
            crate::api::generation::PresetView,
            crate::api::generation::GenerationView,
            crate::api::music::MusicGenerationRequest,
            crate::api::music::MusicGenerationResponse,
            crate::api::music::MusicView,
            crate::api::payments::PackageView,
            crate::api::payments::CheckoutBody,
            crate::api::payments::CheckoutResponse,
            crate::api::payments::TransactionView
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "service", description = "Health"),
        (name = "auth", description = "Registration and login"),
        (name = "generacion", description = "Marketing image generation"),
        (name = "music", description = "Jingle generation"),
        (name = "pagos", description = "Credit packages and checkout"),
        (name = "webhooks", description = "Payment processor callbacks")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
