//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. The core builds `HttpRequest`
//! values from call descriptors and consumes `HttpResponse` values, but the
//! network round-trip belongs to a `Transport` supplied by the caller. The
//! core never constructs one itself.
//!
//! Auth tokens are not attached here: `HttpRequest::auth` only tells the
//! transport which ones the endpoint expects.

use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Which session credentials the transport must attach to a request.
///
/// The web client authenticates with two tokens: an XSRF-style `xt` token
/// sent as a query parameter and an SSO session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthRequirements {
    pub xsrf_token: bool,
    pub session_cookie: bool,
}

impl AuthRequirements {
    pub const NONE: AuthRequirements = AuthRequirements {
        xsrf_token: false,
        session_cookie: false,
    };

    pub const WEB_CLIENT: AuthRequirements = AuthRequirements {
        xsrf_token: true,
        session_cookie: true,
    };
}

/// An HTTP request described as plain data.
///
/// Built by `WebClient::build`. `url` already carries the descriptor's
/// static query parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub auth: AuthRequirements,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes requests against the remote service on behalf of the core.
///
/// Implementations own connections, cookies and tokens. Transport-level
/// failures are reported as `ApiError::Transport`; non-2xx statuses should be
/// returned as ordinary responses so the client can classify them.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}
