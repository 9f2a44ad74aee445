use axum::{
    routing::{get, post, delete},
    Router,
    middleware::{from_fn, Next},
    http::HeaderValue,
    response::IntoResponse,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::env;
use axum::http::header;
use axum::http::Request;
use axum::body::Body;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noble_cause_tracker::{auth, db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    // Ensure critical environment variables are set
    env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    // Initialize Tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "noble_cause_tracker=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Noble Cause Tracker application...");

    // Database Setup
    tracing::info!("Initializing database connection pool...");
    let db_pool = db::init_pool().await?;
    db::run_migrations(&db_pool).await?;
    tracing::info!("Database connection pool initialized successfully");

    let state = AppState { db: db_pool };

    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(
                env::var("RATE_LIMIT_PER_SECOND")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1200),
            )
            .burst_size(
                env::var("RATE_LIMIT_BURST")
                    .ok()
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(2400),
            )
            .finish()
            .expect("governor config"),
    );

    // CORS configuration (no permissive mode)
    let cors = {
        let env_mode = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let origins = env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                v.split(',')
                    .filter_map(|s| {
                        let trimmed = s.trim();
                        if trimmed.is_empty() {
                            return None;
                        }
                        match trimmed.parse::<HeaderValue>() {
                            Ok(value) => Some(value),
                            Err(_) => {
                                tracing::warn!("Ignoring invalid ALLOWED_ORIGINS entry: {}", trimmed);
                                None
                            }
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let origins = if origins.is_empty() {
            if env_mode == "production" {
                panic!("ALLOWED_ORIGINS must contain at least one valid origin in production")
            }
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        } else {
            origins
        };

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .allow_credentials(true)
    };

    // Router Setup
    let app = Router::new()
        .route("/health", get(health_check))
        // API Routes
        .route("/api/causes", get(routes::causes::list_causes).post(routes::causes::create_cause))
        .route("/api/causes/{id}", delete(routes::causes::delete_cause).put(routes::causes::update_cause))
        .route("/api/donations", get(routes::donations::list_donations).post(routes::donations::create_donation))
        .route("/api/donations/{id}", delete(routes::donations::delete_donation).put(routes::donations::update_donation))
        .route("/api/donors", get(routes::donors::list_donors).post(routes::donors::create_donor))
        .route("/api/donors/{id}", delete(routes::donors::delete_donor).put(routes::donors::update_donor))
        .route("/api/sponsors", get(routes::sponsors::list_sponsors).post(routes::sponsors::create_sponsor))
        .route("/api/sponsors/{id}", delete(routes::sponsors::delete_sponsor).put(routes::sponsors::update_sponsor))
        .route("/api/events", get(routes::events::list_events).post(routes::events::create_event))
        .route("/api/events/{id}", delete(routes::events::delete_event).put(routes::events::update_event))
        .route("/api/messages", get(routes::messages::list_messages).post(routes::messages::send_message))
        .route("/api/messages/{id}/read", post(routes::messages::mark_read))
        .route("/api/gamification/profile", get(routes::gamification::get_profile))
        .route("/api/gamification/achievements", get(routes::gamification::list_achievements).post(routes::gamification::award_achievement))
        .route("/api/gamification/leaderboard", get(routes::gamification::leaderboard))
        .route("/api/gamification/catalog", get(routes::gamification::catalog))
        .route("/api/users", get(routes::users::list_users))
        .route("/api/users/{user_id}/role", axum::routing::put(routes::users::update_role))
        .route("/api/onboarding", get(routes::onboarding::get_state))
        .route("/api/onboarding/complete", post(routes::onboarding::complete))
        .route("/api/onboarding/skip", post(routes::onboarding::skip))
        .route("/api/onboarding/reset", post(routes::onboarding::reset))
        .route("/api/reports/summary", get(routes::reports::summary))
        .route("/api/dashboard/stats", get(routes::reports::dashboard_stats))
        .route("/api/me", get(auth::me))
        // Auth Routes
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .layer(from_fn(require_auth))
        .layer(cors)
        .layer(GovernorLayer::new(governor_config))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
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

    tracing::info!("signal received, starting graceful shutdown");
}

async fn health_check() -> &'static str {
    "OK"
}

async fn require_auth(req: Request<Body>, next: Next) -> impl IntoResponse {
    // Guard only API endpoints; /auth and /health stay open.
    let path = req.uri().path();
    if req.method() == axum::http::Method::OPTIONS || !path.starts_with("/api/") {
        return next.run(req).await;
    }

    if let Some(token) = auth::extract_token_from_headers(req.headers()) {
        if auth::validate_token_str(&token).is_ok() {
            return next.run(req).await;
        }
    }

    // Not authenticated: API routes get 401.
    (axum::http::StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
