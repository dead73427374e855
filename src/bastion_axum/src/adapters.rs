//! Axum implementations of the request and response traits.
//!
//! `AuthRequest` and `AuthResponse` live in `bastion_core`, so the orphan rule
//! asks for wrappers:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │  bastion_core::AuthRequest (trait)         │
//! └────────────────┬───────────────────────────┘
//!                  │
//!                  ▼
//! ┌────────────────────────────────────────────┐
//! │  AxumRequest { parts, form, cookies, .. }  │
//! │  impl AuthRequest for AxumRequest { }      │
//! └────────────────────────────────────────────┘
//! ```
//!
//! The request is extracted once per handler. Identity providers then read
//! headers, cookies and form fields from the wrapper without touching the body
//! again.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, FromRequest, Query, Request};
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use bastion_core::cookie::Cookie;
use bastion_core::{AuthRequest, AuthResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An inbound request with its query and form fields already parsed.
///
/// Body fields take precedence over query parameters of the same name.
pub struct AxumRequest {
    parts: Parts,
    form: HashMap<String, String>,
    cookies: CookieJar,
    remote_addr: Option<IpAddr>,
}

impl AxumRequest {
    /// Wraps request parts whose body, if any, was parsed into `form`.
    pub fn from_parts(parts: Parts, form: HashMap<String, String>) -> Self {
        let mut fields = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();
        fields.extend(form);

        let cookies = CookieJar::from_headers(&parts.headers);
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Self {
            parts,
            form: fields,
            cookies,
            remote_addr,
        }
    }

    /// Overrides the client address, e.g. with one taken from a trusted proxy header.
    pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    pub fn into_parts(self) -> Parts {
        self.parts
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE))
}

impl<S> FromRequest<S> for AxumRequest
where
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        if !is_form(&parts.headers) {
            return Ok(Self::from_parts(parts, HashMap::new()));
        }

        let mut form_request = Request::new(body);
        *form_request.method_mut() = parts.method.clone();
        *form_request.uri_mut() = parts.uri.clone();
        *form_request.headers_mut() = parts.headers.clone();
        let Form(form) = Form::<HashMap<String, String>>::from_request(form_request, state).await?;

        Ok(Self::from_parts(parts, form))
    }
}

impl AuthRequest for AxumRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|cookie| cookie.value())
    }

    fn form_field(&self, name: &str) -> Option<&str> {
        self.form.get(name).map(String::as_str)
    }

    fn method(&self) -> &str {
        self.parts.method.as_str()
    }

    fn path(&self) -> &str {
        self.parts.uri.path()
    }

    fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }
}

/// Status, headers and cookies written by providers and challenges.
#[derive(Debug, Default)]
pub struct AxumResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    cookies: Vec<Cookie<'static>>,
}

impl AxumResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Applies the collected status, headers and cookies to `body`'s response.
    pub fn into_response_with(self, body: impl IntoResponse) -> Response {
        let mut response = body.into_response();
        if let Some(status) = self.status {
            *response.status_mut() = status;
        }
        response.headers_mut().extend(self.headers);
        for cookie in self.cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => tracing::warn!(cookie = cookie.name(), error = %e, "Dropping unencodable cookie"),
            }
        }
        response
    }
}

impl AuthResponse for AxumResponse {
    fn set_status(&mut self, code: u16) {
        match StatusCode::from_u16(code) {
            Ok(status) => self.status = Some(status),
            Err(_) => tracing::warn!(code, "Ignoring invalid status code"),
        }
    }

    fn set_header(&mut self, name: &str, value: &str) {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "Ignoring invalid header"),
        }
    }

    fn set_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.retain(|known| known.name() != cookie.name());
        self.cookies.push(cookie);
    }
}

impl IntoResponse for AxumResponse {
    fn into_response(self) -> Response {
        self.into_response_with(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;

    fn request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    #[tokio::test]
    async fn extracts_headers_cookies_and_form_fields() {
        let mut req = request(Method::POST, "/login?next=%2Fhome&username=ignored")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("cookie", "session=abc123; auth=xyz789")
            .header("Authorization", "Basic YWRtaW46MTIzNDU=")
            .body(Body::from("username=admin&password=12345&remember_me=on"))
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));

        let axum_req = AxumRequest::from_request(req, &()).await.unwrap();

        assert_eq!(axum_req.method(), "POST");
        assert_eq!(axum_req.path(), "/login");
        assert_eq!(axum_req.header("authorization"), Some("Basic YWRtaW46MTIzNDU="));
        assert_eq!(axum_req.cookie("session"), Some("abc123"));
        assert_eq!(axum_req.cookie("auth"), Some("xyz789"));
        assert_eq!(axum_req.cookie("nonexistent"), None);
        assert_eq!(axum_req.form_field("username"), Some("admin"));
        assert_eq!(axum_req.form_field("password"), Some("12345"));
        assert_eq!(axum_req.form_field("next"), Some("/home"));
        assert_eq!(axum_req.remote_addr(), Some("10.0.0.7".parse().unwrap()));
    }

    #[tokio::test]
    async fn non_form_bodies_only_expose_the_query() {
        let req = request(Method::POST, "/api?username=admin")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"password":"12345"}"#))
            .unwrap();

        let axum_req = AxumRequest::from_request(req, &()).await.unwrap();

        assert_eq!(axum_req.form_field("username"), Some("admin"));
        assert_eq!(axum_req.form_field("password"), None);
        assert_eq!(axum_req.remote_addr(), None);
    }

    #[test]
    fn response_carries_status_headers_and_cookies() {
        let mut response = AxumResponse::new();
        response.set_status(401);
        response.set_header("WWW-Authenticate", "Basic realm=\"Bastion Protected Area\"");
        response.set_cookie(Cookie::new("session", "first"));
        response.set_cookie(Cookie::new("session", "second"));
        response.remove_cookie("remember");

        let resp = response.into_response();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some("Basic realm=\"Bastion Protected Area\"")
        );
        let cookies: Vec<_> = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("session=second"));
        assert!(cookies[1].starts_with("remember="));
        assert!(cookies[1].contains("Max-Age=0"));
    }

    #[test]
    fn invalid_status_and_headers_are_ignored() {
        let mut response = AxumResponse::new();
        response.set_status(42);
        response.set_header("bad header", "value");

        assert!(response.status().is_none());
        assert!(response.headers().is_empty());
        assert_eq!(response.into_response().status(), StatusCode::OK);
    }
}
