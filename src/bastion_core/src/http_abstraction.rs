//! HTTP abstraction traits for the authentication pipeline.
//!
//! Providers and validators read requests and write responses only through
//! these traits. Framework crates implement them on their own types (via
//! newtype wrappers), so nothing in the core depends on a web framework.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  bastion_core: Defines HTTP traits       │
//! └──────────────┬───────────────────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────────────────┐
//! │  bastion_axum: Wrappers                  │
//! │  struct AxumRequest { parts, form, .. }  │
//! │  impl AuthRequest for AxumRequest { }    │
//! └──────────────┬───────────────────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────────────────┐
//! │  Identity providers and validators use   │
//! │  AuthRequest / AuthResponse              │
//! └──────────────────────────────────────────┘
//! ```
//!
//! The request trait is read-only. Response mutation is limited to status,
//! headers and cookies.

use std::net::IpAddr;

use cookie::Cookie;

/// Read-only view of an inbound HTTP request.
///
/// # Implementation Notes
///
/// - Return `&str` references directly from the framework's data structures
/// - Case-insensitive header lookup should be handled by implementor
/// - Implementors must be `Sync`, validators hold the request across awaits
pub trait AuthRequest: Sync {
    /// Get a header value by name.
    ///
    /// Header lookup should be case-insensitive (per HTTP spec).
    /// Returns `None` if the header doesn't exist or isn't valid UTF-8.
    fn header(&self, name: &str) -> Option<&str>;

    /// Get a cookie value by name.
    fn cookie(&self, name: &str) -> Option<&str>;

    /// Get a form or query parameter by name.
    fn form_field(&self, name: &str) -> Option<&str>;

    /// Get the HTTP method (GET, POST, etc.)
    fn method(&self) -> &str;

    /// Get the request path
    fn path(&self) -> &str;

    /// Address of the connecting client, when the framework knows it.
    fn remote_addr(&self) -> Option<IpAddr>;
}

/// Write access to an outbound HTTP response.
pub trait AuthResponse {
    fn set_status(&mut self, code: u16);

    fn set_header(&mut self, name: &str, value: &str);

    fn set_cookie(&mut self, cookie: Cookie<'static>);

    /// Instructs the client to drop the named cookie.
    fn remove_cookie(&mut self, name: &str) {
        let mut removal = Cookie::build((name.to_string(), "")).path("/").build();
        removal.make_removal();
        self.set_cookie(removal);
    }
}

/// Request and response doubles for tests.
#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::collections::HashMap;
    use std::net::IpAddr;

    use cookie::Cookie;

    use super::{AuthRequest, AuthResponse};

    #[derive(Debug, Clone, Default)]
    pub struct MockRequest {
        headers: HashMap<String, String>,
        cookies: HashMap<String, String>,
        form: HashMap<String, String>,
        method: String,
        path: String,
        remote_addr: Option<IpAddr>,
    }

    impl MockRequest {
        pub fn new(method: &str, path: &str) -> Self {
            Self {
                method: method.to_string(),
                path: path.to_string(),
                ..Default::default()
            }
        }

        pub fn with_header(mut self, name: &str, value: &str) -> Self {
            self.headers.insert(name.to_lowercase(), value.to_string());
            self
        }

        pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
            self.cookies.insert(name.to_string(), value.to_string());
            self
        }

        pub fn with_form_field(mut self, name: &str, value: &str) -> Self {
            self.form.insert(name.to_string(), value.to_string());
            self
        }

        pub fn with_remote_addr(mut self, addr: IpAddr) -> Self {
            self.remote_addr = Some(addr);
            self
        }
    }

    impl AuthRequest for MockRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(&name.to_lowercase()).map(String::as_str)
        }

        fn cookie(&self, name: &str) -> Option<&str> {
            self.cookies.get(name).map(String::as_str)
        }

        fn form_field(&self, name: &str) -> Option<&str> {
            self.form.get(name).map(String::as_str)
        }

        fn method(&self) -> &str {
            &self.method
        }

        fn path(&self) -> &str {
            &self.path
        }

        fn remote_addr(&self) -> Option<IpAddr> {
            self.remote_addr
        }
    }

    #[derive(Debug, Default)]
    pub struct MockResponse {
        pub status: Option<u16>,
        pub headers: HashMap<String, String>,
        pub cookies: Vec<Cookie<'static>>,
    }

    impl MockResponse {
        /// Last cookie written under `name`.
        pub fn cookie(&self, name: &str) -> Option<&Cookie<'static>> {
            self.cookies.iter().rev().find(|c| c.name() == name)
        }
    }

    impl AuthResponse for MockResponse {
        fn set_status(&mut self, code: u16) {
            self.status = Some(code);
        }

        fn set_header(&mut self, name: &str, value: &str) {
            self.headers.insert(name.to_lowercase(), value.to_string());
        }

        fn set_cookie(&mut self, cookie: Cookie<'static>) {
            self.cookies.push(cookie);
        }
    }
}
