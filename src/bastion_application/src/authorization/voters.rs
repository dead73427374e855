use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bastion_core::{ROLE_ADMINISTRATOR, ROLE_ROOT, User, Vote, Voter};

type RoleMatchFn = dyn Fn(&str, &str) -> bool + Send + Sync;

/// Comparison between an owned role and a required attribute.
#[derive(Clone, Default)]
pub enum RoleMatcher {
    #[default]
    Exact,
    CaseInsensitive,
    Custom(Arc<RoleMatchFn>),
}

impl RoleMatcher {
    pub fn custom(matcher: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(matcher))
    }

    pub fn matches(&self, owned: &str, required: &str) -> bool {
        match self {
            Self::Exact => owned == required,
            Self::CaseInsensitive => owned.eq_ignore_ascii_case(required),
            Self::Custom(matcher) => matcher(owned, required),
        }
    }
}

impl fmt::Debug for RoleMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("Exact"),
            Self::CaseInsensitive => f.write_str("CaseInsensitive"),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Votes on the required attributes as roles.
///
/// Requiring all roles: abstains on an empty attribute list, denies when any
/// attribute matches no owned role. Requiring any role: grants on the first
/// match, abstains when the user owns no roles at all.
#[derive(Debug, Clone)]
pub struct RoleVoter {
    requires_all: bool,
    matcher: RoleMatcher,
}

impl Default for RoleVoter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RoleVoter {
    pub fn new(requires_all: bool) -> Self {
        Self {
            requires_all,
            matcher: RoleMatcher::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: RoleMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn requires_all(&self) -> bool {
        self.requires_all
    }

    fn owns(&self, roles: &[String], required: &str) -> bool {
        roles.iter().any(|owned| self.matcher.matches(owned, required))
    }
}

impl Voter for RoleVoter {
    fn vote(&self, user: &dyn User, _object: Option<&dyn Any>, attributes: &[&str]) -> Vote {
        let roles = user.roles();

        if self.requires_all {
            if attributes.is_empty() {
                return Vote::Abstain;
            }
            if attributes.iter().all(|required| self.owns(roles, required)) {
                Vote::Grant
            } else {
                Vote::Deny
            }
        } else if attributes.is_empty() || roles.is_empty() {
            Vote::Abstain
        } else if attributes.iter().any(|required| self.owns(roles, required)) {
            Vote::Grant
        } else {
            Vote::Deny
        }
    }
}

/// Whether `owned` is a case-insensitive prefix of `required`.
pub fn role_chain_covers(owned: &str, required: &str) -> bool {
    if owned.is_empty() {
        return false;
    }
    required
        .get(..owned.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(owned))
}

/// [`RoleVoter`] over a prefix role namespace: owning `ROOT` covers `ROOT.EDIT`.
#[derive(Debug, Clone)]
pub struct RoleChainVoter {
    inner: RoleVoter,
}

impl Default for RoleChainVoter {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RoleChainVoter {
    pub fn new(requires_all: bool) -> Self {
        Self {
            inner: RoleVoter::new(requires_all).with_matcher(RoleMatcher::custom(role_chain_covers)),
        }
    }
}

impl Voter for RoleChainVoter {
    fn vote(&self, user: &dyn User, object: Option<&dyn Any>, attributes: &[&str]) -> Vote {
        self.inner.vote(user, object, attributes)
    }
}

type VoteFn = dyn Fn(&dyn User, Option<&dyn Any>, &[&str]) -> bool + Send + Sync;

/// Grants when the predicate holds, denies otherwise.
#[derive(Clone)]
pub struct CallbackVoter {
    callback: Arc<VoteFn>,
}

impl CallbackVoter {
    pub fn new(
        callback: impl Fn(&dyn User, Option<&dyn Any>, &[&str]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Voter for CallbackVoter {
    fn vote(&self, user: &dyn User, object: Option<&dyn Any>, attributes: &[&str]) -> Vote {
        if (self.callback)(user, object, attributes) {
            Vote::Grant
        } else {
            Vote::Deny
        }
    }
}

/// Grants exactly the owners of one role, ignoring the attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleRoleVoter {
    role: String,
}

impl SingleRoleVoter {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    pub fn administrator() -> Self {
        Self::new(ROLE_ADMINISTRATOR)
    }

    pub fn root() -> Self {
        Self::new(ROLE_ROOT)
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl Voter for SingleRoleVoter {
    fn vote(&self, user: &dyn User, _object: Option<&dyn Any>, _attributes: &[&str]) -> Vote {
        if user.roles().iter().any(|role| role == &self.role) {
            Vote::Grant
        } else {
            Vote::Deny
        }
    }
}
