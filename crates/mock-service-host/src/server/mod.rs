//! Mock listeners.
//!
//! One `MockServer` per configured listener. Each accepted connection is served
//! on its own task; https listeners complete the TLS handshake first.

mod handler;
mod tls;

pub use handler::{handle_request, to_http_response, ListenerContext};
pub use tls::create_tls_acceptor;

use crate::config::{ListenConfig, Protocol};
use crate::coordinator::Coordinator;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

/// A bound mock endpoint
pub struct MockServer {
    listener: TcpListener,
    addr: SocketAddr,
    tls_acceptor: Option<TlsAcceptor>,
    ctx: ListenerContext,
}

impl MockServer {
    /// Bind the listener socket. Port 0 picks a free port; see `local_addr`.
    pub async fn bind(
        config: &ListenConfig,
        coordinator: Arc<Coordinator>,
    ) -> Result<Self, anyhow::Error> {
        let tls_acceptor = match config.protocol {
            Protocol::Https => {
                let tls = config.tls.as_ref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "TLS configuration required for https listener on port {}",
                        config.port
                    )
                })?;
                Some(create_tls_acceptor(tls)?)
            }
            Protocol::Http => None,
        };

        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}:{}: {e}", config.host, config.port))?;
        let addr = listener.local_addr()?;

        Ok(Self {
            listener,
            addr,
            tls_acceptor,
            ctx: ListenerContext {
                coordinator,
                protocol: config.protocol,
                profile: config.profile,
            },
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept connections forever; accept failures are logged and retried
    pub async fn run(self) -> Result<(), anyhow::Error> {
        info!(
            "Mock listener on {}://{} (stateful: {}, alwaysError: {})",
            self.ctx.protocol.as_str(),
            self.addr,
            self.ctx.profile.stateful,
            self.ctx.profile.always_error
        );

        loop {
            let (stream, remote_addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    let backoff = accept_backoff(&err);
                    warn!(
                        "Accept failed on {}: {} (retrying in {:?})",
                        self.addr, err, backoff
                    );
                    tokio::time::sleep(backoff).await;
                    continue;
                }
            };
            let ctx = self.ctx.clone();
            let tls_acceptor = self.tls_acceptor.clone();

            tokio::spawn(async move {
                match tls_acceptor {
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(tls_stream) => serve(tls_stream, remote_addr, ctx).await,
                        Err(err) => {
                            error!("TLS handshake failed from {}: {}", remote_addr, err);
                        }
                    },
                    None => serve(stream, remote_addr, ctx).await,
                }
            });
        }
    }
}

async fn serve<S>(stream: S, remote_addr: SocketAddr, ctx: ListenerContext)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, ctx.clone()));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        debug!("Error serving connection from {}: {}", remote_addr, err);
    }
}

/// Delay before the next accept. Errors tied to a single connection retry at
/// once; anything else (fd exhaustion and the like) waits for resources.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => Duration::from_millis(100),
    }
}
