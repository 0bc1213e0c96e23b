use std::convert::Infallible;
use std::fmt;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::shared::constants::{DEFAULT_CLIENT_IP_HEADER, UNKNOWN_CLIENT_IDENTITY};

/// Name of the header carrying the client address, installed as a request extension
#[derive(Debug, Clone)]
pub struct ClientIpHeader(pub String);

impl Default for ClientIpHeader {
    fn default() -> Self {
        Self(DEFAULT_CLIENT_IP_HEADER.to_string())
    }
}

/// Opaque identity a request is accounted under for quota purposes
///
/// Taken from the first comma-separated entry of the configured header. The
/// value is whatever the caller (or the proxy in front of us) sent, so it is
/// only as trustworthy as that proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn from_headers(headers: &HeaderMap, header_name: &str) -> Self {
        let identity = headers
            .get(header_name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_CLIENT_IDENTITY);

        Self(identity.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_name = parts
            .extensions
            .get::<ClientIpHeader>()
            .cloned()
            .unwrap_or_default();

        Ok(Self::from_headers(&parts.headers, &header_name.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_first_forwarded_entry_is_used() {
        let headers = headers("x-forwarded-for", "203.0.113.7, 10.0.0.1, 10.0.0.2");
        let identity = ClientIdentity::from_headers(&headers, "x-forwarded-for");
        assert_eq!(identity.as_str(), "203.0.113.7");
    }

    #[test]
    fn test_missing_header_is_unknown() {
        let identity = ClientIdentity::from_headers(&HeaderMap::new(), "x-forwarded-for");
        assert_eq!(identity.as_str(), UNKNOWN_CLIENT_IDENTITY);
    }

    #[test]
    fn test_blank_header_is_unknown() {
        let headers = headers("x-forwarded-for", " , 10.0.0.1");
        let identity = ClientIdentity::from_headers(&headers, "x-forwarded-for");
        assert_eq!(identity.as_str(), UNKNOWN_CLIENT_IDENTITY);
    }

    #[test]
    fn test_custom_header_name() {
        let headers = headers("x-real-ip", "198.51.100.4");
        let identity = ClientIdentity::from_headers(&headers, "x-real-ip");
        assert_eq!(identity.as_str(), "198.51.100.4");
    }
}
