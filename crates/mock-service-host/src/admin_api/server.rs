//! Admin API server.

use crate::admin_api::router::route_request;
use crate::coordinator::Coordinator;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Admin API server for the mock service host
pub struct AdminApiServer {
    listener: TcpListener,
    addr: SocketAddr,
    coordinator: Arc<Coordinator>,
}

impl AdminApiServer {
    /// Bind the admin listener; port 0 picks a free port
    pub async fn bind(
        host: &str,
        port: u16,
        coordinator: Arc<Coordinator>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind admin API on {host}:{port}: {e}"))?;
        let addr = listener.local_addr()?;
        Ok(Self {
            listener,
            addr,
            coordinator,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the admin API server
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!("Admin API listening on http://{}", self.addr);

        loop {
            let (stream, _) = self.listener.accept().await?;
            let io = TokioIo::new(stream);
            let coordinator = Arc::clone(&self.coordinator);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let coordinator = Arc::clone(&coordinator);
                    async move { route_request(req, coordinator).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error: {}", e);
                }
            });
        }
    }
}
