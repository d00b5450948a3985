//! SåPe intake - Slack app for pentest and threat-modeling requests.
//!
//! This binary serves the Slack webhooks on port 3000 by default.
//!
//! # Architecture
//!
//! - Axum web framework
//! - Slack Web API for messages, modals and channels
//! - Slack Lists as the request store
//! - Trello for cards on approved requests (optional)
//!
//! # Startup
//!
//! 1. Load configuration and initialize Sentry and tracing
//! 2. Connect the request store and load the list columns
//! 3. If a list is configured it must be reachable, or the process exits

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use sape_intake::config::IntakeConfig;
use sape_intake::lists::SlackListGateway;
use sape_intake::routes;
use sape_intake::services::RequestActions;
use sape_intake::slack::SlackClient;
use sape_intake::state::AppState;
use sape_intake::store::RequestStore;
use sape_intake::tracker::TrelloClient;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &IntakeConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = IntakeConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sape_intake=info,tower_http=debug".into());

    // JSON for log shipping, text locally
    let is_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let json_layer = is_json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let slack = SlackClient::new(
        config.slack.bot_token.clone(),
        config.slack.signing_secret.clone(),
    )
    .expect("Failed to create Slack client");

    let store = Arc::new(RequestStore::new(
        Arc::new(SlackListGateway::new(slack.clone())),
        Arc::new(slack.clone()),
        config.admin_channel_id.clone(),
        config.request_list_id.clone(),
    ));
    store.connect().await;

    if let Err(e) = store.initialize().await {
        tracing::error!(error = %e, "Failed to initialize request store");
        std::process::exit(1);
    }
    if store.list_id().await.is_some() {
        if let Err(e) = store.health_check().await {
            tracing::error!(error = %e, "Request list health check failed");
            std::process::exit(1);
        }
    }

    let mut actions = RequestActions::new(
        Arc::clone(&store),
        Arc::new(slack.clone()),
        config.admin_user_ids.clone(),
        config.admin_channel_id.clone(),
    );
    if let Some(trello) = config.trello() {
        let tracker = TrelloClient::new(trello.clone()).expect("Failed to create Trello client");
        actions = actions.with_tracker(Arc::new(tracker));
        tracing::info!("Trello card creation enabled");
    }

    let state = AppState::new(slack, Arc::clone(&store), Arc::new(actions));

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        #[allow(clippy::cast_possible_truncation)]
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let addr = config.socket_addr();
    tracing::info!("intake listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    store.close().await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
