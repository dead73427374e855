pub mod argon2_encoder;
pub mod digest_encoder;
pub mod plaintext_encoder;

pub use argon2_encoder::Argon2PasswordEncoder;
pub use digest_encoder::DigestResponseEncoder;
pub use plaintext_encoder::{
    IGNORE_PASSWORD_CASE_OPTION, MAX_PASSWORD_LENGTH, PlaintextPasswordEncoder,
};
