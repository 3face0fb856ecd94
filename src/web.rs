use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::ServerConfig;
use crate::session::Session;

const MAX_BODY_BYTES: usize = 16 * 1024;

/// Full application router: `/api` plus the optional static frontend
pub fn app(config: &ServerConfig, session: Arc<Session>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new().nest("/api", api::router(session));

    if let Some(dir) = &config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds.into()),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: &ServerConfig, session: Arc<Session>) -> Result<()> {
    let app = app(config, session);
    let addr = format!("{}:{}", config.host, config.port);

    #[cfg(feature = "tls")]
    {
        if let (Some(cert), Some(key)) = (&config.tls_cert_path, &config.tls_key_path) {
            return serve_tls(app, &addr, cert, key).await;
        }
    }

    #[cfg(not(feature = "tls"))]
    {
        if config.tls_cert_path.is_some() {
            tracing::warn!("TLS configured but this build has no TLS support; serving plain HTTP");
        }
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: &str, cert: &str, key: &str) -> Result<()> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert}"))?;
    let socket: std::net::SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid bind address {addr}"))?;

    tracing::info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(socket, tls)
        .serve(app.into_make_service())
        .await
        .context("HTTPS server failed")
}
