use async_trait::async_trait;
use chain_governance::{Ballot, ProposalId, VoterAddress};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The chain endpoint could not be reached or did not answer.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered with an error, e.g. a reverted contract call.
    #[error("oracle call rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("the signer refused to sign the vote")]
    SignerRefused,

    #[error("vote transaction failed: {0}")]
    Transaction(String),
}

/// Interface to the governance contract's view of proposal states.
#[async_trait]
pub trait StatusOracle: Send + Sync {
    /// Raw lifecycle code of the proposal as returned by the contract.
    async fn proposal_state(&self, proposal: &ProposalId) -> Result<u64, OracleError>;

    /// Height of the chain tip, if the oracle knows about blocks at all.
    ///
    /// The default implementation does not provide a height.
    async fn current_block_height(&self) -> Result<Option<u64>, OracleError> {
        Ok(None)
    }
}

/// Interface to the record of who voted on which proposal.
#[async_trait]
pub trait VoteHistoryOracle: Send + Sync {
    async fn has_voted(
        &self,
        proposal: &ProposalId,
        voter: &VoterAddress,
    ) -> Result<bool, OracleError>;
}

/// Handle on the wallet account that signs votes.
pub trait Signer: Send + Sync {
    fn address(&self) -> VoterAddress;
}

/// Interface to cast a vote on the governance contract.
///
/// Resolves once the vote transaction is accepted or has failed.
#[async_trait]
pub trait VoteSubmitter: Send + Sync {
    async fn submit_vote(&self, signer: &dyn Signer, ballot: &Ballot) -> Result<(), SubmitError>;
}
