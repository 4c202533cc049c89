use std::{fs::OpenOptions, net::SocketAddr, process::ExitCode, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use highridge_forms::{AppState, Config, build_router, graceful_shutdown};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::load();
    setup_logging();

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: Config) -> Result<(), String> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    let connection = Connection::open(&config.db_path)
        .map_err(|error| format!("Could not open database {}: {error}", config.db_path))?;
    let state = AppState::new(
        connection,
        &config.auth_secret,
        &config.sign_in_url,
        &config.local_timezone,
    )
    .map_err(|error| format!("Could not initialize the database: {error}"))?;

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    match &config.cert_path {
        Some(cert_path) => {
            let tls_config =
                RustlsConfig::from_pem_file(cert_path.join("cert.pem"), cert_path.join("key.pem"))
                    .await
                    .map_err(|error| format!("Could not open TLS certificates: {error}"))?;

            tracing::info!("HTTPS server listening on {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
        None => {
            tracing::info!("HTTP server listening on {}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
    }
    .map_err(|error| format!("Server error: {error}"))
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let debug_log = match OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
    {
        Ok(log_file) => Some(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(filter::LevelFilter::DEBUG),
        ),
        Err(error) => {
            eprintln!("Could not create log file debug.log, logging to stdout only: {error}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(stdout_log)
        .with(debug_log)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
