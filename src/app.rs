use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::auth::{JwtError, TokenService};
use crate::config::AppConfig;
use crate::database::Stores;
use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::services::{AnchorService, PassphraseService};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    pub tokens: TokenService,
    pub passphrase: PassphraseService,
    pub anchors: AnchorService,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Result<Self, JwtError> {
        let tokens = TokenService::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
        )?;
        let passphrase = PassphraseService::new(&stores);
        let anchors = AnchorService::new(stores.anchors.clone());

        Ok(Self {
            config: Arc::new(config),
            stores,
            tokens,
            passphrase,
            anchors,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self::new(AppConfig::development(), Stores::memory())
            .expect("development config carries a JWT secret")
    }
}

pub fn router(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config);

    let app = Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        // Global middleware
        .layer(RequestBodyLimitLayer::new(max_body))
        .layer(cors);

    let app = if state.config.api.enable_request_logging {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };
    app.with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::root))
        .route("/api/health", get(public::health))
        .route("/api/auth/register", post(public::auth::register))
        .route("/api/auth/login", post(public::auth::login))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/me", get(protected::auth::me))
        .route(
            "/api/logs",
            get(protected::logs::list).post(protected::logs::create),
        )
        .route("/api/logs/mood", get(protected::logs::mood))
        .route(
            "/api/logs/:id",
            get(protected::logs::get_one).delete(protected::logs::delete_one),
        )
        .route("/api/passphrase", put(protected::passphrase::change))
        .route("/api/passphrase/status", get(protected::passphrase::status))
        .route(
            "/api/factors",
            get(protected::factors::list).post(protected::factors::add),
        )
        .route("/api/user/avatar", put(protected::user::avatar))
        .route(
            "/api/anchors",
            get(protected::anchors::list).post(protected::anchors::create),
        )
        .route("/api/anchors/:id", delete(protected::anchors::remove))
        .route(
            "/api/anchors/:id/toggle-favorite",
            post(protected::anchors::toggle_favorite),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
