//! hyper HTTP/1 server

use super::response::{invalid_data, payload_too_large, Resp};
use super::routes::dispatch;
use crate::backend::Portal;
use crate::config::PortalConfig;
use anyhow::{Context, Result};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct PortalServer {
    config: PortalConfig,
    portal: Option<Portal>,
}

struct ServerState {
    portal: Portal,
    max_body_size: usize,
}

impl PortalServer {
    pub fn new(config: PortalConfig) -> Self {
        Self { config, portal: None }
    }

    /// Serve an existing portal instead of connecting one from the config
    pub fn with_portal(mut self, portal: Portal) -> Self {
        self.portal = Some(portal);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        self.serve_on(listener).await
    }

    /// Bind and serve on a background task; returns the bound address.
    ///
    /// Port 0 picks a free port.
    pub async fn spawn(self) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
        let addr = self.config.server.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        let local = listener.local_addr()?;
        Ok((local, tokio::spawn(self.serve_on(listener))))
    }

    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        self.config.validate()?;
        let portal = match self.portal {
            Some(portal) => portal,
            None => Portal::connect(&self.config),
        };
        if !portal.is_available() {
            log::warn!("Serving with the backend unavailable; see GET /api/admin-check");
        }

        let state = Arc::new(ServerState { portal, max_body_size: self.config.server.max_body_size });
        log::info!("Gestionaph portal listening on http://{}", listener.local_addr()?);

        loop {
            let (stream, remote) = listener.accept().await?;
            let state = Arc::clone(&state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { Ok::<_, Infallible>(handle(req, &state).await) }
                });

                if let Err(e) =
                    http1::Builder::new().serve_connection(TokioIo::new(stream), service).await
                {
                    log::debug!("Connection from {} closed with error: {}", remote, e);
                }
            });
        }
    }
}

async fn handle(req: Request<Incoming>, state: &ServerState) -> Resp {
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let body = match Limited::new(body, state.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            log::warn!("{} {} rejected: {}", parts.method, parts.uri.path(), e);
            return if e.downcast_ref::<http_body_util::LengthLimitError>().is_some() {
                payload_too_large()
            } else {
                invalid_data()
            };
        }
    };

    let response =
        dispatch(&state.portal, &parts.method, parts.uri.path(), parts.uri.query(), body).await;

    log::info!(
        "{} {} -> {} ({} ms)",
        parts.method,
        parts.uri.path(),
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}
