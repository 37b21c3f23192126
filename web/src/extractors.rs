//! Custom Axum extractors.
//!
//! - `CorrelationId`: extract or generate a request correlation id
//! - `ClientIp`: extract the client IP from headers or the connection
//! - `UserAgent`: extract the `User-Agent` header

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use std::net::IpAddr;
use uuid::Uuid;

/// Correlation id for request tracing.
///
/// Extracted from the `X-Correlation-ID` header, or generated as a new
/// UUID v4 if absent or malformed.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .headers
            .get("X-Correlation-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client IP address, preferring `X-Forwarded-For` then `X-Real-IP`, then
/// falling back to localhost.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

fn extract_client_ip(headers: &HeaderMap) -> IpAddr {
    if let Some(forwarded) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(ip_str) = real_ip.to_str() {
            if let Ok(ip) = ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    "127.0.0.1".parse().unwrap_or(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST))
}

/// `User-Agent` header, or `"Unknown"` if absent.
#[derive(Debug, Clone)]
pub struct UserAgent(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts.headers.get("User-Agent").and_then(|v| v.to_str().ok()).unwrap_or("Unknown").to_string();

        Ok(Self(user_agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, Request};

    #[tokio::test]
    async fn correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder().header("X-Correlation-ID", uuid.to_string()).body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn correlation_id_generates_new_when_missing() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_ne!(correlation_id.0, Uuid::nil());
    }

    #[tokio::test]
    async fn client_ip_from_x_forwarded_for() {
        let req = Request::builder().header("X-Forwarded-For", "203.0.113.1, 198.51.100.1").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn client_ip_falls_back_to_localhost() {
        let req = Request::builder().body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn user_agent_from_header() {
        let req = Request::builder().header(header::USER_AGENT, "Mozilla/5.0 (Test)").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let user_agent = UserAgent::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user_agent.0, "Mozilla/5.0 (Test)");
    }
}
