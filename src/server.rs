//! Standalone HTTP/1 server for the notification endpoint.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::api::{self, Reply};
use crate::dispatcher::Dispatcher;
use crate::models::NotificationOutcome;

/// Handles one request: reads the body, dispatches, and stamps a trace id.
pub async fn handle(
    dispatcher: Arc<Dispatcher>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let trace_id = uuid::Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = info_span!("request", %trace_id, %method, %path);

    async move {
        info!("Processing {} request for path: {}", method, path);

        let reply = match req.into_body().collect().await {
            Ok(collected) => {
                let body = collected.to_bytes();
                debug!("Received body with {} bytes", body.len());
                api::route(&dispatcher, &method, &path, &body).await
            }
            Err(e) => {
                warn!("Failed to read request body: {}", e);
                Reply::outcome(
                    StatusCode::BAD_REQUEST,
                    &NotificationOutcome::failure("Invalid request body."),
                )
            }
        };

        info!(status = reply.status.as_u16(), "Request processing completed");
        Ok(api::into_response(reply, &trace_id))
    }
    .instrument(span)
    .await
}

/// Accepts connections until `shutdown` resolves, then waits for open
/// connections to finish their in-flight requests before returning.
pub async fn serve<F>(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut incoming = TcpListenerStream::new(listener);
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping http server...");
                break;
            }
            next = incoming.next() => {
                let stream = match next {
                    Some(Ok(stream)) => stream,
                    Some(Err(e)) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                    None => break,
                };

                let dispatcher = Arc::clone(&dispatcher);
                let service = service_fn(move |req| handle(Arc::clone(&dispatcher), req));
                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                let conn = graceful.watch(conn);
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!("Connection closed with error: {}", e);
                    }
                });
            }
        }
    }

    drop(incoming);
    info!("Waiting for in-flight requests...");
    graceful.shutdown().await;

    info!("Http server stopped!");
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
