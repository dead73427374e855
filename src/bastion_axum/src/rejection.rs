use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bastion_core::{AuthenticationError, AuthenticationFailure, SecurityError};

/// Maps authentication outcomes onto HTTP responses.
///
/// Server-side failures are reported without detail.
#[derive(Debug)]
pub enum AuthRejection {
    Authentication(AuthenticationFailure),
    Security(SecurityError),
    Forbidden,
}

impl AuthRejection {
    pub fn status(&self) -> StatusCode {
        let code = match self {
            AuthRejection::Authentication(failure) => failure.status_code(),
            AuthRejection::Security(error) => error.status_code(),
            AuthRejection::Forbidden => 403,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<AuthenticationFailure> for AuthRejection {
    fn from(failure: AuthenticationFailure) -> Self {
        AuthRejection::Authentication(failure)
    }
}

impl From<AuthenticationError> for AuthRejection {
    fn from(error: AuthenticationError) -> Self {
        AuthRejection::Authentication(error.into())
    }
}

impl From<SecurityError> for AuthRejection {
    fn from(error: SecurityError) -> Self {
        AuthRejection::Security(error)
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::warn!(error = ?self, "Authentication failed on the server side");
            "Internal server error".to_string()
        } else {
            match &self {
                AuthRejection::Authentication(failure) => failure.to_string(),
                AuthRejection::Security(error) => error.to_string(),
                AuthRejection::Forbidden => "Access denied".to_string(),
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_core::{AttemptStoreError, NoIdentityReason};

    #[test]
    fn statuses_follow_the_error_classes() {
        let missing: AuthRejection = AuthenticationError::NoIdentity {
            reason: NoIdentityReason::Missing,
        }
        .into();
        let malformed: AuthRejection =
            SecurityError::MalformedCredentials("bad header".to_string()).into();

        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(malformed.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthRejection::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn server_errors_hide_their_cause() {
        let storage: AuthRejection =
            AuthenticationError::Storage(AttemptStoreError::DatabaseError("disk full".to_string()))
                .into();

        let response = storage.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
