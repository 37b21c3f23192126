//! Correlation-id middleware: echoes `X-Correlation-ID` back on the
//! response, generating one if the request didn't carry it.

use axum::http::{HeaderValue, Request, Response};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Layer that wraps a service with [`CorrelationIdMiddleware`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

#[must_use]
pub fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

#[derive(Debug, Clone)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorrelationIdMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
            req.headers_mut().insert(CORRELATION_ID_HEADER, header_value.clone());

            let mut inner = self.inner.clone();
            Box::pin(async move {
                let mut response = inner.call(req).await?;
                response.headers_mut().insert(CORRELATION_ID_HEADER, header_value);
                Ok(response)
            })
        } else {
            let mut inner = self.inner.clone();
            Box::pin(async move { inner.call(req).await })
        }
    }
}

/// Convenience accessor for reading a response's correlation id in tests.
pub trait CorrelationIdExt {
    fn correlation_id(&self) -> Option<&str>;
}

impl<T> CorrelationIdExt for Response<T> {
    fn correlation_id(&self) -> Option<&str> {
        self.headers().get(CORRELATION_ID_HEADER).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn generates_correlation_id_when_absent() {
        let app = Router::new().route("/", get(|| async { "ok" })).layer(correlation_id_layer());

        let response = app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
        assert!(response.correlation_id().is_some());
    }

    #[tokio::test]
    async fn echoes_client_supplied_correlation_id() {
        let app = Router::new().route("/", get(|| async { "ok" })).layer(correlation_id_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(CORRELATION_ID_HEADER, "11111111-1111-1111-1111-111111111111")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.correlation_id(), Some("11111111-1111-1111-1111-111111111111"));
    }
}
