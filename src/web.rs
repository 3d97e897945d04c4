use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::ServerConfig;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// The full application: API routes, optional frontend, CORS and request tracing
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.config.server.static_dir.clone();
    let mut app = api::router(state);

    if let Some(dir) = static_dir {
        if Path::new(&dir).is_dir() {
            info!("Serving frontend from {}", dir);
            app = app.fallback_service(ServeDir::new(dir));
        } else {
            warn!("Static directory {} does not exist, serving the API only", dir);
        }
    }

    app.layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serve `app` until Ctrl-C, over TLS when a certificate and key are configured
pub async fn run(config: &ServerConfig, app: Router) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;

    match (&config.tls_cert, &config.tls_key) {
        (Some(cert), Some(key)) => serve_tls(addr, cert, key, app).await,
        _ => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!("SafeCity API listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .with_context(|| "HTTP server failed")
        }
    }
}

#[cfg(feature = "tls")]
async fn serve_tls(addr: SocketAddr, cert: &str, key: &str, app: Router) -> Result<()> {
    use axum_server::Handle;
    use axum_server::tls_rustls::RustlsConfig;
    use std::time::Duration;

    // a provider may already be installed by an embedding application
    let _ = rustls::crypto::ring::default_provider().install_default();

    check_certificates(cert)?;
    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} and key {key}"))?;

    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    info!("SafeCity API listening on https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .with_context(|| "HTTPS server failed")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_addr: SocketAddr, _cert: &str, _key: &str, _app: Router) -> Result<()> {
    anyhow::bail!("TLS is configured but this build has no TLS support; enable the `tls` feature")
}

/// Fail early with a readable message when the chain holds no certificate
#[cfg(feature = "tls")]
fn check_certificates(path: &str) -> Result<()> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {path}"))?;
    let mut reader = std::io::BufReader::new(file);
    let count = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse certificates in {path}"))?
        .len();
    anyhow::ensure!(count > 0, "No certificates found in {path}");
    Ok(())
}

#[cfg(all(test, feature = "tls"))]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_certificate_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let err = check_certificates(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("No certificates found"));
    }

    #[test]
    fn test_missing_certificate_file() {
        assert!(check_certificates("/nonexistent/cert.pem").is_err());
    }
}
