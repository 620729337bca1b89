use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

const SHORT_ID_LEN: usize = 11;

/// Identifier of a proposal on the governance contract.
///
/// Proposal ids are large integers rendered as decimal strings by the
/// contract ABI layer. The only requirement enforced here is that the id is
/// not empty: an empty id means there is nothing to track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProposalId(String);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("proposal id cannot be empty")]
pub struct EmptyProposalId;

impl ProposalId {
    pub fn new<S: Into<String>>(id: S) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// abbreviated form used in headers: the first 11 characters and `...`
    pub fn short(&self) -> String {
        let mut short: String = self.0.chars().take(SHORT_ID_LEN).collect();
        short.push_str("...");
        short
    }
}

impl TryFrom<String> for ProposalId {
    type Error = EmptyProposalId;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(EmptyProposalId)
    }
}

impl From<ProposalId> for String {
    fn from(id: ProposalId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProposalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account address of a voter, as provided by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterAddress(String);

impl VoterAddress {
    pub fn new<S: Into<String>>(address: S) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(any(test, feature = "property-test-api"))]
mod arbitrary {
    use super::*;
    use quickcheck::{Arbitrary, Gen};

    impl Arbitrary for ProposalId {
        fn arbitrary<G: Gen>(g: &mut G) -> Self {
            let n = u64::arbitrary(g);
            Self(n.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_are_rejected() {
        assert_eq!(ProposalId::new(""), None);
        assert_eq!(ProposalId::new("   "), None);
        assert_eq!(ProposalId::new(" 12 ").unwrap().as_str(), "12");
    }

    #[test]
    fn short_id_keeps_eleven_characters() {
        let id = ProposalId::new("0xABC123456789DEF").unwrap();
        assert_eq!(id.short(), "0xABC123456...");

        let id = ProposalId::new("42").unwrap();
        assert_eq!(id.short(), "42...");
    }

    #[test]
    fn deserializing_checks_emptiness() {
        let id: ProposalId = serde_json::from_str("\"1234\"").unwrap();
        assert_eq!(id.as_str(), "1234");
        assert!(serde_json::from_str::<ProposalId>("\"\"").is_err());
    }
}
