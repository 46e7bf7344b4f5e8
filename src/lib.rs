pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::handlers;
use crate::api::middleware::{
    auth::{admin_middleware, auth_middleware},
    request_id::request_id_middleware,
};
use crate::config::AppConfig;
use crate::services::disclosure::ContentDisclosure;
use crate::services::paste_service::PasteService;
use crate::services::rate_limit::VerifyThrottle;
use crate::services::storage::StorageService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::pastes::create_paste,
        handlers::pastes::get_paste,
        handlers::pastes::verify_paste,
        handlers::pastes::download_paste,
        handlers::pastes::delete_paste,
        handlers::auth::login,
        handlers::auth::register,
        handlers::users::get_user_page,
        handlers::users::unlock_user_page,
        handlers::homepage::homepage,
        handlers::admin::list_users,
        handlers::admin::delete_user,
        handlers::admin::update_user,
        handlers::admin::get_settings,
        handlers::admin::update_settings,
        handlers::admin::create_invite_code,
        handlers::admin::list_invite_codes,
        handlers::admin::update_invite_code,
        handlers::admin::delete_invite_code,
        handlers::health::health_check,
    ),
    components(
        schemas(
            entities::pastes::PasteKind,
            handlers::SuccessResponse,
            handlers::pastes::CreatePasteRequest,
            handlers::pastes::CreatePasteResponse,
            handlers::pastes::PasteSummary,
            handlers::pastes::PasteMetadataResponse,
            handlers::pastes::VerifyRequest,
            handlers::pastes::VerifyTextResponse,
            handlers::pastes::VerifyFileResponse,
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::auth::SessionUser,
            handlers::auth::RegisterRequest,
            handlers::auth::RegisterResponse,
            handlers::auth::RegisteredUser,
            handlers::users::UserPageResponse,
            handlers::users::PublicUser,
            handlers::users::PublicPaste,
            handlers::users::UnlockRequest,
            handlers::users::UnlockResponse,
            handlers::users::UnlockedUser,
            handlers::homepage::HomepageResponse,
            handlers::homepage::HomepageUser,
            handlers::admin::UpdateUserRequest,
            handlers::admin::UpdateUserResponse,
            handlers::admin::UpdateSettingsRequest,
            handlers::admin::InviteCodeCreated,
            handlers::admin::UpdateInviteCodeRequest,
            handlers::admin::UpdateInviteCodeResponse,
            services::admin_service::UserSummary,
            services::admin_service::InviteCodeSummary,
            handlers::health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "pastes", description = "Paste creation, disclosure and deletion"),
        (name = "auth", description = "Admin login and invite-based registration"),
        (name = "users", description = "Public user pages and homepage"),
        (name = "admin", description = "Administration"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub pastes: Arc<PasteService>,
    pub disclosure: ContentDisclosure,
    pub verify_throttle: Arc<VerifyThrottle>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: AppConfig) -> Self {
        Self {
            pastes: Arc::new(PasteService::new(db.clone(), storage.clone())),
            disclosure: ContentDisclosure::from_config(&config),
            verify_throttle: Arc::new(VerifyThrottle::new(
                config.verify_max_attempts,
                config.verify_max_attempts_per_paste,
                Duration::from_secs(config.verify_window_secs),
            )),
            db,
            storage,
            config,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = if config.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::admin::list_users))
        .route(
            "/users/:id",
            put(handlers::admin::update_user).delete(handlers::admin::delete_user),
        )
        .route(
            "/settings",
            get(handlers::admin::get_settings).put(handlers::admin::update_settings),
        )
        .route(
            "/invite-codes",
            get(handlers::admin::list_invite_codes).post(handlers::admin::create_invite_code),
        )
        .route(
            "/invite-codes/:id",
            put(handlers::admin::update_invite_code).delete(handlers::admin::delete_invite_code),
        )
        .route_layer(from_fn(admin_middleware))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware))
}

pub fn create_app(state: AppState) -> Router {
    let authenticated = from_fn_with_state(state.clone(), auth_middleware);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/api/homepage", get(handlers::homepage::homepage))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/users/:username", get(handlers::users::get_user_page))
        .route(
            "/api/users/:username/unlock",
            post(handlers::users::unlock_user_page),
        )
        .route(
            "/api/pastes",
            post(handlers::pastes::create_paste).route_layer(authenticated.clone()),
        )
        .route(
            "/api/pastes/:id",
            get(handlers::pastes::get_paste)
                .merge(delete(handlers::pastes::delete_paste).route_layer(authenticated)),
        )
        .route("/api/pastes/:id/verify", post(handlers::pastes::verify_paste))
        .route(
            "/api/pastes/:id/download",
            get(handlers::pastes::download_paste),
        )
        .nest("/api/admin", admin_routes(&state))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(DefaultBodyLimit::max(state.config.max_request_body))
        .with_state(state)
}
