//! Axum integration for the Bastion security layer.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  bastion_core: HTTP trait definitions    │
//! └──────────────┬───────────────────────────┘
//!                │
//!                ▼
//! ┌──────────────────────────────────────────┐
//! │  bastion_axum: Axum implementations      │
//! │  - AxumRequest extractor                 │
//! │  - AxumResponse                          │
//! │  - AuthRejection                         │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! async fn login(
//!     State(security): State<Arc<Security>>,
//!     request: AxumRequest,
//! ) -> Result<Response, AuthRejection> {
//!     let mut response = AxumResponse::new();
//!     let identity = security.identities.identities(&request).first().cloned();
//!     let user = security
//!         .authentication
//!         .authenticate(identity.as_ref(), &request, None)
//!         .await?;
//!     security.identities.install(identity.as_ref().ok_or(AuthRejection::Forbidden)?, &request, &mut response)?;
//!     Ok(response.into_response())
//! }
//! ```

pub mod adapters;
pub mod rejection;

pub use adapters::{AxumRequest, AxumResponse};
pub use rejection::AuthRejection;
