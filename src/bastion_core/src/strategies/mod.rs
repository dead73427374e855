pub mod auth_validator;
pub mod identity_provider;
pub mod voter;
