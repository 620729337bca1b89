use crate::proposal::ProposalId;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

/// Support value of a vote, using the governor contract encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum VoteChoice {
    Against = 0,
    For = 1,
    Abstain = 2,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid vote choice {0}, expected 0 (against), 1 (for) or 2 (abstain)")]
pub struct InvalidVoteChoice(pub u8);

impl VoteChoice {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for VoteChoice {
    type Error = InvalidVoteChoice;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Against),
            1 => Ok(Self::For),
            2 => Ok(Self::Abstain),
            other => Err(InvalidVoteChoice(other)),
        }
    }
}

impl From<VoteChoice> for u8 {
    fn from(choice: VoteChoice) -> Self {
        choice.code()
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Against => f.write_str("Against"),
            Self::For => f.write_str("In Favor"),
            Self::Abstain => f.write_str("Abstain"),
        }
    }
}

/// A vote ready to be handed to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ballot {
    proposal: ProposalId,
    choice: VoteChoice,
    reason: Option<String>,
}

impl Ballot {
    pub fn new(proposal: ProposalId, choice: VoteChoice, reason: Option<String>) -> Self {
        let reason = reason.filter(|r| !r.trim().is_empty());
        Self {
            proposal,
            choice,
            reason,
        }
    }

    pub fn proposal(&self) -> &ProposalId {
        &self.proposal
    }

    pub fn choice(&self) -> VoteChoice {
        self.choice
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn only_three_choices(code: u8) -> bool {
        match VoteChoice::try_from(code) {
            Ok(choice) => code <= 2 && choice.code() == code,
            Err(InvalidVoteChoice(c)) => code > 2 && c == code,
        }
    }

    #[test]
    fn blank_reason_is_dropped() {
        let id = ProposalId::new("7").unwrap();
        let ballot = Ballot::new(id.clone(), VoteChoice::For, Some("  ".to_owned()));
        assert_eq!(ballot.reason(), None);

        let ballot = Ballot::new(id, VoteChoice::Abstain, Some("too costly".to_owned()));
        assert_eq!(ballot.reason(), Some("too costly"));
        assert_eq!(ballot.choice().code(), 2);
    }
}
