use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Message shown for states in which nothing can be done with the proposal.
pub const UNAVAILABLE_MESSAGE: &str = "Voting is not available for this proposal.";

/// Lifecycle of a proposal as reported by the governance contract.
///
/// The contract reports the state as an integer code. Codes `0..=7` map to
/// the known variants, anything else is kept as `Unknown` so the value can
/// still be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub enum ProposalLifecycleState {
    Pending,
    Active,
    Canceled,
    Defeated,
    Succeeded,
    Queued,
    Expired,
    Executed,
    /// A code above 7. Build it through [`ProposalLifecycleState::from_code`]:
    /// a hand-built `Unknown(3)` serializes as `3` and reads back as
    /// `Defeated`.
    Unknown(u64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid proposal state code {input:?}: {source}")]
pub struct ParseLifecycleError {
    input: String,
    source: ParseIntError,
}

impl ProposalLifecycleState {
    pub fn from_code(code: u64) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Active,
            2 => Self::Canceled,
            3 => Self::Defeated,
            4 => Self::Succeeded,
            5 => Self::Queued,
            6 => Self::Expired,
            7 => Self::Executed,
            other => Self::Unknown(other),
        }
    }

    /// the contract code of the state, `None` for `Unknown`
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Active => Some(1),
            Self::Canceled => Some(2),
            Self::Defeated => Some(3),
            Self::Succeeded => Some(4),
            Self::Queued => Some(5),
            Self::Expired => Some(6),
            Self::Executed => Some(7),
            Self::Unknown(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Active => "Active",
            Self::Canceled => "Canceled",
            Self::Defeated => "Defeated",
            Self::Succeeded => "Succeeded",
            Self::Queued => "Queued",
            Self::Expired => "Expired",
            Self::Executed => "Executed",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// User facing explanation of what the state means for the voter.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::Pending => {
                "Proposal is pending. Voting will start after 1 block confirmation."
            }
            Self::Active => "Voting is now active! You can cast your vote.",
            Self::Succeeded => "Proposal succeeded! It can now be executed.",
            Self::Defeated => "Proposal was defeated.",
            Self::Queued => "Proposal is queued for execution.",
            Self::Executed => "Proposal has been executed.",
            Self::Canceled | Self::Expired | Self::Unknown(_) => UNAVAILABLE_MESSAGE,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Label of a raw contract code.
pub fn label_of(code: u64) -> &'static str {
    ProposalLifecycleState::from_code(code).label()
}

impl From<u64> for ProposalLifecycleState {
    fn from(code: u64) -> Self {
        Self::from_code(code)
    }
}

impl From<ProposalLifecycleState> for u64 {
    fn from(state: ProposalLifecycleState) -> Self {
        match state {
            ProposalLifecycleState::Unknown(code) => code,
            known => known.code().map(u64::from).unwrap_or_default(),
        }
    }
}

/// The ABI layer hands the state over as a decimal string.
impl FromStr for ProposalLifecycleState {
    type Err = ParseLifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self::from_code)
            .map_err(|source| ParseLifecycleError {
                input: s.to_owned(),
                source,
            })
    }
}

impl fmt::Display for ProposalLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(any(test, feature = "property-test-api"))]
mod arbitrary {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for ProposalLifecycleState {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            // bias towards the known codes
            if bool::arbitrary(g) {
                Self::from_code(u64::arbitrary(g) % 8)
            } else {
                Self::from_code(u64::arbitrary(g))
            }
        }
    }
}
