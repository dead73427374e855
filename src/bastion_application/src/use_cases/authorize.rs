use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bastion_core::{AuthorizationError, User, Vote, Voter};

/// How the votes of several voters combine into one decision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStrategy {
    /// The first grant wins.
    #[default]
    Affirmative,
    /// Majority of grants over denies.
    Consensus,
    /// Any deny loses.
    Unanimous,
}

impl FromStr for DecisionStrategy {
    type Err = AuthorizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "affirmative" => Ok(Self::Affirmative),
            "consensus" => Ok(Self::Consensus),
            "unanimous" => Ok(Self::Unanimous),
            _ => Err(AuthorizationError::UnsupportedStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for DecisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Affirmative => "affirmative",
            Self::Consensus => "consensus",
            Self::Unanimous => "unanimous",
        };
        f.write_str(name)
    }
}

/// Decides access by polling an ordered list of voters.
#[derive(Clone)]
pub struct AuthorizationService {
    voters: Vec<Arc<dyn Voter>>,
    strategy: DecisionStrategy,
    allow_if_all_abstain: bool,
    allow_if_equal_granted_denied: bool,
}

impl Default for AuthorizationService {
    fn default() -> Self {
        Self::new(DecisionStrategy::default())
    }
}

impl AuthorizationService {
    pub fn new(strategy: DecisionStrategy) -> Self {
        Self {
            voters: Vec::new(),
            strategy,
            allow_if_all_abstain: false,
            allow_if_equal_granted_denied: true,
        }
    }

    pub fn with_voter(mut self, voter: Arc<dyn Voter>) -> Self {
        self.voters.push(voter);
        self
    }

    pub fn add_voter(&mut self, voter: Arc<dyn Voter>) {
        self.voters.push(voter);
    }

    pub fn allow_if_all_abstain(mut self, allow: bool) -> Self {
        self.allow_if_all_abstain = allow;
        self
    }

    pub fn allow_if_equal_granted_denied(mut self, allow: bool) -> Self {
        self.allow_if_equal_granted_denied = allow;
        self
    }

    pub fn strategy(&self) -> DecisionStrategy {
        self.strategy
    }

    pub fn voters(&self) -> &[Arc<dyn Voter>] {
        &self.voters
    }

    #[tracing::instrument(
        name = "AuthorizationService::grant_access",
        skip(self, user, object),
        fields(user = user.username(), strategy = %self.strategy)
    )]
    pub fn grant_access(
        &self,
        user: &dyn User,
        object: Option<&dyn Any>,
        attributes: &[&str],
    ) -> bool {
        let votes = self
            .voters
            .iter()
            .map(|voter| voter.vote(user, object, attributes));

        let granted = match self.strategy {
            DecisionStrategy::Affirmative => self.affirmative(votes),
            DecisionStrategy::Consensus => self.consensus(votes),
            DecisionStrategy::Unanimous => self.unanimous(votes),
        };

        if !granted {
            tracing::debug!("Access denied");
        }
        granted
    }

    fn affirmative(&self, votes: impl Iterator<Item = Vote>) -> bool {
        let mut denied = false;
        for vote in votes {
            match vote {
                Vote::Grant => return true,
                Vote::Deny => denied = true,
                Vote::Abstain => {}
            }
        }
        if denied {
            false
        } else {
            self.allow_if_all_abstain
        }
    }

    fn consensus(&self, votes: impl Iterator<Item = Vote>) -> bool {
        let (grants, denies) = votes.fold((0usize, 0usize), |(grants, denies), vote| match vote {
            Vote::Grant => (grants + 1, denies),
            Vote::Deny => (grants, denies + 1),
            Vote::Abstain => (grants, denies),
        });

        if grants > denies {
            true
        } else if denies > grants {
            false
        } else if grants > 0 {
            self.allow_if_equal_granted_denied
        } else {
            self.allow_if_all_abstain
        }
    }

    fn unanimous(&self, votes: impl Iterator<Item = Vote>) -> bool {
        let mut granted = false;
        for vote in votes {
            match vote {
                Vote::Deny => return false,
                Vote::Grant => granted = true,
                Vote::Abstain => {}
            }
        }
        granted || self.allow_if_all_abstain
    }
}
