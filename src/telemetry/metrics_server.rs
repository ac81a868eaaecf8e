// SPDX-License-Identifier: Apache-2.0

use crate::listener::Listener;

use http::header::{CONTENT_TYPE, HeaderValue};
use http::Method;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use prometheus::{Encoder, Registry, TextEncoder};

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;
use tower::{BoxError, Service};
use tracing::{debug, error};

/// Serves a [`Registry`] for Prometheus scraping on `GET /metrics`.
pub struct MetricsServer {
    registry: Registry,
}

impl MetricsServer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Serve requests until cancelled, then let open connections finish.
    pub async fn serve(
        &self,
        listener: Listener,
        cancellation: CancellationToken,
    ) -> Result<(), BoxError> {
        let svc = TowerToHyperService::new(MetricsService {
            registry: self.registry.clone(),
        });

        let timer = TokioTimer::new();
        let graceful = GracefulShutdown::new();

        let mut builder = Builder::new(TokioExecutor::new());
        builder.http1().timer(timer.clone());
        builder.http2().timer(timer);

        let listener = listener.into_async()?;
        loop {
            let stream = tokio::select! {
                r = listener.accept() => {
                    match r {
                        Ok((stream, _)) => stream,
                        Err(e) => return Err(e.into()),
                    }
                },
                _ = cancellation.cancelled() => break
            };

            let conn = builder.serve_connection(TokioIo::new(stream), svc.clone());
            let fut = graceful.watch(conn.into_owned());

            tokio::spawn(async move {
                if let Err(e) = fut.await {
                    error!(error = ?e, "Error serving metrics connection");
                }
            });
        }

        graceful.shutdown().await;
        debug!("Metrics server stopped");

        Ok(())
    }
}

#[derive(Clone)]
struct MetricsService {
    registry: Registry,
}

impl MetricsService {
    fn scrape(&self) -> Response<Full<Bytes>> {
        let encoder = TextEncoder::new();
        let mut output = Vec::new();

        match encoder.encode(&self.registry.gather(), &mut output) {
            Ok(()) => {
                let mut response = Response::new(Full::new(Bytes::from(output)));
                if let Ok(content_type) = HeaderValue::from_str(encoder.format_type()) {
                    response.headers_mut().insert(CONTENT_TYPE, content_type);
                }
                response
            }
            Err(e) => {
                error!(error = %e, "Failed to encode metrics");
                status_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from(format!("Failed to encode metrics: {e}")),
                )
            }
        }
    }
}

fn status_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

impl<B> Service<Request<B>> for MetricsService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let response = match (req.method(), req.uri().path()) {
            (&Method::GET, "/metrics") => self.scrape(),
            _ => status_response(StatusCode::NOT_FOUND, Bytes::from_static(b"Not Found")),
        };
        ready(Ok(response))
    }
}
