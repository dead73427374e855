pub mod voters;

pub use voters::{
    CallbackVoter, RoleChainVoter, RoleMatcher, RoleVoter, SingleRoleVoter, role_chain_covers,
};
