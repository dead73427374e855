use std::sync::Arc;

use bastion_core::{AuthRequest, HashGenerator, Identity};
use md5::{Digest, Md5};

pub(crate) fn md5_hex(input: impl AsRef<[u8]>) -> String {
    hex::encode(Md5::digest(input.as_ref()))
}

/// Keys attempts by the connecting client's address.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteAddressHashGenerator;

impl HashGenerator for RemoteAddressHashGenerator {
    fn generate(&self, _identity: &Identity, request: &dyn AuthRequest) -> String {
        let addr = request
            .remote_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        md5_hex(addr)
    }
}

/// Keys attempts by the requested path.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestUriHashGenerator;

impl HashGenerator for RequestUriHashGenerator {
    fn generate(&self, _identity: &Identity, request: &dyn AuthRequest) -> String {
        md5_hex(request.path())
    }
}

/// Keys attempts by the claimed identity token.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenHashGenerator;

impl HashGenerator for TokenHashGenerator {
    fn generate(&self, identity: &Identity, _request: &dyn AuthRequest) -> String {
        md5_hex(identity.token())
    }
}

/// Digest of the concatenated hashes of its members.
#[derive(Debug, Default, Clone)]
pub struct HashChainGenerator {
    generators: Vec<Arc<dyn HashGenerator>>,
}

impl HashChainGenerator {
    pub fn new(generators: Vec<Arc<dyn HashGenerator>>) -> Self {
        Self { generators }
    }

    pub fn with_generator(mut self, generator: Arc<dyn HashGenerator>) -> Self {
        self.generators.push(generator);
        self
    }
}

impl HashGenerator for HashChainGenerator {
    fn generate(&self, identity: &Identity, request: &dyn AuthRequest) -> String {
        let joined: String = self
            .generators
            .iter()
            .map(|generator| generator.generate(identity, request))
            .collect();
        md5_hex(joined)
    }
}
