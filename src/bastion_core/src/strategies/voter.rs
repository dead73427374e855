use std::any::Any;

use crate::domain::user::User;

/// Tri-state result of a single voter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vote {
    Grant,
    Deny,
    Abstain,
}

impl Vote {
    pub fn weight(self) -> i8 {
        match self {
            Vote::Grant => 1,
            Vote::Deny => -1,
            Vote::Abstain => 0,
        }
    }
}

/// A unit access decision for `(user, object, attributes)`.
pub trait Voter: Send + Sync {
    fn vote(&self, user: &dyn User, object: Option<&dyn Any>, attributes: &[&str]) -> Vote;
}
