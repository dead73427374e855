pub mod authenticate;
pub mod authorize;
pub mod identify;

pub use authenticate::AuthenticationService;
pub use authorize::{AuthorizationService, DecisionStrategy};
pub use identify::{IdentityService, RequestIdentities};
