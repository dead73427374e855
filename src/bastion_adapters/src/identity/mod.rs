pub mod anonymous_provider;
pub mod basic_provider;
pub mod cookie_codec;
pub mod digest_provider;
pub mod post_fields_provider;
pub mod remember_me_provider;
pub mod session_provider;

pub use anonymous_provider::{ANONYMOUS_COOKIE_NAME, AnonymousIdentityProvider};
pub use basic_provider::BasicIdentityProvider;
pub use cookie_codec::{CookieCipher, CookieSettings};
pub use digest_provider::DigestIdentityProvider;
pub use post_fields_provider::PostFieldsIdentityProvider;
pub use remember_me_provider::{
    DEFAULT_REMEMBER_ME_FIELD, DEFAULT_REMEMBER_ME_LIFETIME, REMEMBER_ME_COOKIE_NAME,
    RememberMeIdentityProvider,
};
pub use session_provider::{SESSION_COOKIE_NAME, SessionIdentityProvider};

use bastion_core::cookie::Cookie;
use bastion_core::{AuthRequest, AuthResponse, LOGGED_OUT_COOKIE_NAME, LOGGED_OUT_MARKER};

// Set by an explicit logout, suppresses passive re-identification
pub(crate) fn is_logged_out(request: &dyn AuthRequest) -> bool {
    request.cookie(LOGGED_OUT_COOKIE_NAME) == Some(LOGGED_OUT_MARKER)
}

pub(crate) fn mark_logged_out(response: &mut dyn AuthResponse) {
    response.set_cookie(
        Cookie::build((LOGGED_OUT_COOKIE_NAME, LOGGED_OUT_MARKER))
            .path("/")
            .build(),
    );
}

pub(crate) fn clear_logged_out(response: &mut dyn AuthResponse) {
    response.remove_cookie(LOGGED_OUT_COOKIE_NAME);
}

pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(value, "true" | "on" | "1" | "yes")
}
