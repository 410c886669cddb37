//! Tessera API server
//!
//! Serves the public API on one port and health/metrics on another.
//!
//! Environment:
//! - `TESSERA_DATABASE_URL`            Postgres connection string
//! - `TESSERA_API_PORT`                public API port (default 8080)
//! - `TESSERA_MONITOR_PORT`            health/metrics port (default 9090)
//! - `TESSERA_JWT_PRIVATE_KEY_PATH`    RS256 private key PEM (generated if missing)
//! - `TESSERA_JWT_PUBLIC_KEY_PATH`     RS256 public key PEM
//! - `TESSERA_JWT_ISSUER`              token issuer claim (default "tessera")
//! - `TESSERA_ACCESS_TOKEN_TTL_SECS`   access token lifetime
//! - `TESSERA_REFRESH_TOKEN_TTL_SECS`  refresh token lifetime
//! - `TESSERA_SECRET_KEY`              HMAC secret for account links
//! - `TESSERA_ONETIME_TOKEN_TTL_SECS`  account link lifetime
//! - `TESSERA_FRONTEND_BASE_URL`       base URL used in emailed links
//! - `TESSERA_CREATE_EVENTS_PER_MINUTE`  per-user event creation limit

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Extension, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tes_notify::PostgresEmailOutbox;
use tes_platform::api::{
    auth_router, event_feedbacks_router, event_tickets_router, events_router, my_tickets_router,
    organizers_router, ApiDoc, AppState, AuthApiState, CreateEventThrottle, EventsState,
    FeedbacksState, OrganizersState, TicketsState,
};
use tes_platform::config::AppConfig;
use tes_platform::repository::{
    init_schema, EventRepository, FeedbackRepository, RefreshTokenRepository, TicketRepository,
    UserRepository,
};
use tes_platform::service::{AccountToken, AuthConfig, AuthService, NotifyService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env();
    info!("starting tessera api server");
    if config.uses_default_secret() {
        warn!("TESSERA_SECRET_KEY not set; account links use the development secret");
    }

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    init_schema(&pool).await?;

    let email_outbox = Arc::new(PostgresEmailOutbox::new(pool.clone()));
    email_outbox.init_schema().await?;

    let auth_config = AuthConfig::load_or_generate_rsa_keys(
        Some(Path::new(&config.jwt_private_key_path)),
        Some(Path::new(&config.jwt_public_key_path)),
    )?
    .with_issuer(&config.jwt_issuer)
    .with_access_ttl_secs(config.access_token_ttl_secs)
    .with_refresh_ttl_secs(config.refresh_token_ttl_secs);
    let auth_service = Arc::new(AuthService::new(&auth_config)?);

    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let event_repo = Arc::new(EventRepository::new(pool.clone()));
    let ticket_repo = Arc::new(TicketRepository::new(pool.clone()));
    let feedback_repo = Arc::new(FeedbackRepository::new(pool.clone()));
    let refresh_repo = Arc::new(RefreshTokenRepository::new(pool.clone()));

    let account_tokens =
        Arc::new(AccountToken::new(&config.secret_key, config.onetime_token_ttl_secs));
    let notify = Arc::new(NotifyService::new(email_outbox.clone(), &config.frontend_base_url));
    let throttle = Arc::new(CreateEventThrottle::new(config.create_events_per_minute));

    let app_state = AppState { auth_service: auth_service.clone(), user_repo: user_repo.clone() };
    let auth_state = AuthApiState {
        user_repo: user_repo.clone(),
        refresh_repo: refresh_repo.clone(),
        auth_service,
        account_tokens,
        notify: notify.clone(),
    };
    let events_state = EventsState { event_repo: event_repo.clone(), throttle };
    let tickets_state = TicketsState {
        event_repo: event_repo.clone(),
        ticket_repo: ticket_repo.clone(),
        notify,
    };
    let feedbacks_state = FeedbacksState {
        event_repo: event_repo.clone(),
        ticket_repo,
        feedback_repo,
    };
    let organizers_state = OrganizersState { user_repo, event_repo };

    let event_routes = events_router(events_state)
        .merge(event_tickets_router(tickets_state.clone()))
        .merge(event_feedbacks_router(feedbacks_state));

    let app = Router::new()
        .nest("/api/auth", auth_router(auth_state))
        .nest("/api/events", event_routes)
        .nest("/api/my-tickets", my_tickets_router(tickets_state))
        .nest("/api/organizers", organizers_router(organizers_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Expired refresh rows only waste space once their tokens stop
    // validating, so a daily prune is plenty.
    let cleanup_repo = refresh_repo;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            interval.tick().await;
            match cleanup_repo.delete_expired(chrono::Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!(count, "pruned expired refresh tokens"),
                Err(err) => error!(error = %err, "refresh token cleanup failed"),
            }
        }
    });

    let api_addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
    info!("api listening on {api_addr}");
    let api_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(api_listener, app).await {
            error!("api server error: {err}");
        }
    });

    let monitor = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics));
    let monitor_addr = SocketAddr::from(([0, 0, 0, 0], config.monitor_port));
    let monitor_listener = tokio::net::TcpListener::bind(monitor_addr).await?;
    info!("monitor listening on {monitor_addr}");
    let monitor_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(monitor_listener, monitor).await {
            error!("monitor server error: {err}");
        }
    });

    shutdown_signal().await;
    info!("shutting down");
    api_task.abort();
    monitor_task.abort();
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "READY"
}

async fn metrics() -> String {
    "# TYPE tessera_up gauge\ntessera_up 1\n".to_string()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
