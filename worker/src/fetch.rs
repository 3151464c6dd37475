//! Fetch Model
//!
//! Request/response types, the network collaborator, and fetch event
//! interception.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::events::{EventType, ExtendableEvent};

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Default for RequestMethod {
    fn default() -> Self {
        Self::Get
    }
}

impl RequestMethod {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

/// Fetch request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: RequestMethod,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Request body (if any).
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a new GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: RequestMethod::Get,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Create a new POST request.
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Length".to_string(), body.len().to_string());

        Self {
            url: url.into(),
            method: RequestMethod::Post,
            headers,
            body: Some(body),
        }
    }

    /// Set a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the Content-Type header.
    pub fn content_type(self, content_type: &str) -> Self {
        self.header("Content-Type", content_type)
    }
}

/// Response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response delivered under CORS.
    Cors,
    /// Default.
    Default,
    /// Network error.
    Error,
    /// Cross-origin response whose body and status cannot be inspected.
    Opaque,
    /// Opaque redirect.
    OpaqueRedirect,
}

impl Default for ResponseType {
    fn default() -> Self {
        Self::Default
    }
}

/// Fetch response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Response type.
    pub response_type: ResponseType,
    /// URL the response was fetched from.
    pub url: String,
    /// Status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Response body.
    pub body: Option<Vec<u8>>,
    /// Whether the body was consumed.
    pub body_used: bool,
}

impl Response {
    /// Create a new response.
    pub fn new(status: u16) -> Self {
        Self {
            response_type: ResponseType::Default,
            url: String::new(),
            status,
            status_text: status_text_for(status).to_string(),
            headers: BTreeMap::new(),
            body: None,
            body_used: false,
        }
    }

    /// Create a same-origin response with a body.
    pub fn basic(status: u16, body: Vec<u8>) -> Self {
        let mut response = Self::new(status);
        response.response_type = ResponseType::Basic;
        response.body = Some(body);
        response
    }

    /// Create an opaque cross-origin response.
    pub fn opaque() -> Self {
        let mut response = Self::new(0);
        response.response_type = ResponseType::Opaque;
        response.status_text = String::new();
        response
    }

    /// Create a network-error response.
    pub fn error() -> Self {
        Self {
            response_type: ResponseType::Error,
            url: String::new(),
            status: 0,
            status_text: String::new(),
            headers: BTreeMap::new(),
            body: None,
            body_used: false,
        }
    }

    /// Check if the status is a success (2xx).
    pub fn ok(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Duplicate the response.
    ///
    /// A response body can be consumed only once; a caller that both returns
    /// and stores a response keeps one copy for each.
    pub fn clone_response(&self) -> Self {
        self.clone()
    }
}

/// Get status text for status code.
fn status_text_for(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Fetch error types.
#[derive(Debug, Clone)]
pub enum FetchError {
    /// No route to the host.
    Unreachable,
    /// The platform timed out the request.
    Timeout,
    /// Request failed.
    Failed(String),
}

/// Network collaborator: issue a request, return a response or fail.
pub trait Network: Send + Sync {
    /// Perform a network fetch.
    fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

/// Fetch event.
///
/// One intercepted resource request from a controlled page, resolved exactly
/// once via `respond_with`.
#[derive(Debug)]
pub struct FetchEvent {
    request: Request,
    responded: bool,
    response: Option<Response>,
    wait_until: bool,
}

impl FetchEvent {
    /// Create a new fetch event.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            responded: false,
            response: None,
            wait_until: false,
        }
    }

    /// Get the intercepted request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Check if the event was resolved.
    pub fn responded(&self) -> bool {
        self.responded
    }

    /// Resolve the event with a response. Later calls are ignored.
    pub fn respond_with(&mut self, response: Response) {
        if !self.responded {
            self.responded = true;
            self.response = Some(response);
        }
    }

    /// Take the resolved response.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl ExtendableEvent for FetchEvent {
    fn event_type(&self) -> EventType {
        EventType::Fetch
    }

    fn wait_until(&mut self) {
        self.wait_until = true;
    }

    fn has_wait_until(&self) -> bool {
        self.wait_until
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request() {
        let request = Request::get("/index.html");
        assert_eq!(request.url, "/index.html");
        assert_eq!(request.method, RequestMethod::Get);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_post_request_sets_content_length() {
        let request = Request::post("/api/sync", b"{\"id\":1}".to_vec());
        assert_eq!(request.method, RequestMethod::Post);
        assert_eq!(
            request.headers.get("Content-Length"),
            Some(&"8".to_string())
        );
    }

    #[test]
    fn test_content_type_chain() {
        let request = Request::post("/api/sync", b"{}".to_vec()).content_type("application/json");
        assert_eq!(
            request.headers.get("Content-Type"),
            Some(&"application/json".to_string())
        );
    }

    #[test]
    fn test_response_ok_range() {
        assert!(Response::new(200).ok());
        assert!(Response::new(204).ok());
        assert!(!Response::new(304).ok());
        assert!(!Response::new(404).ok());
        assert!(!Response::new(500).ok());
    }

    #[test]
    fn test_response_basic() {
        let response = Response::basic(200, b"body".to_vec());
        assert_eq!(response.response_type, ResponseType::Basic);
        assert_eq!(response.status_text, "OK");
        assert_eq!(response.body.as_deref(), Some(&b"body"[..]));
    }

    #[test]
    fn test_response_opaque_hides_status() {
        let response = Response::opaque();
        assert_eq!(response.response_type, ResponseType::Opaque);
        assert_eq!(response.status, 0);
        assert!(!response.ok());
    }

    #[test]
    fn test_response_error() {
        let response = Response::error();
        assert_eq!(response.response_type, ResponseType::Error);
        assert_eq!(response.status, 0);
    }

    #[test]
    fn test_clone_response_is_independent() {
        let original = Response::basic(200, b"body".to_vec());
        let mut copy = original.clone_response();
        copy.body = None;
        assert!(original.body.is_some());
    }

    #[test]
    fn test_fetch_event_responds_once() {
        let mut event = FetchEvent::new(Request::get("/"));
        assert!(!event.responded());
        event.respond_with(Response::new(200));
        event.respond_with(Response::new(404));
        assert!(event.responded());
        assert_eq!(event.take_response().unwrap().status, 200);
    }

    #[test]
    fn test_fetch_event_wait_until() {
        let mut event = FetchEvent::new(Request::get("/"));
        assert_eq!(event.event_type(), EventType::Fetch);
        assert!(!event.has_wait_until());
        event.wait_until();
        assert!(event.has_wait_until());
    }
}
