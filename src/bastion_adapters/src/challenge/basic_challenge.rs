use bastion_core::AuthResponse;

use super::{Challenge, DEFAULT_REALM};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicChallenge {
    realm: String,
}

impl Default for BasicChallenge {
    fn default() -> Self {
        Self::new(DEFAULT_REALM)
    }
}

impl BasicChallenge {
    pub fn new(realm: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Challenge for BasicChallenge {
    fn challenge(&self, response: &mut dyn AuthResponse) {
        response.set_status(401);
        response.set_header("WWW-Authenticate", &format!("Basic realm=\"{}\"", self.realm));
    }
}
