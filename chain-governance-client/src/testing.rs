//! Scripted collaborators for exercising the client without a chain.

use crate::navigation::{Navigator, Route};
use crate::oracle::{
    OracleError, Signer, StatusOracle, SubmitError, VoteHistoryOracle, VoteSubmitter,
};
use async_trait::async_trait;
use chain_governance::{Ballot, ProposalId, VoterAddress};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Status oracle answering with whatever code was last scripted.
#[derive(Debug)]
pub struct ScriptedStatusOracle {
    states: Mutex<HashMap<ProposalId, Result<u64, OracleError>>>,
    block_height: Mutex<Result<Option<u64>, OracleError>>,
    calls: AtomicUsize,
}

impl ScriptedStatusOracle {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            block_height: Mutex::new(Ok(None)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_state(&self, proposal: &ProposalId, code: u64) {
        self.states.lock().insert(proposal.clone(), Ok(code));
    }

    pub fn fail(&self, proposal: &ProposalId) {
        self.states.lock().insert(
            proposal.clone(),
            Err(OracleError::Unavailable("scripted outage".to_owned())),
        );
    }

    pub fn set_block_height(&self, height: Result<Option<u64>, OracleError>) {
        *self.block_height.lock() = height;
    }

    /// number of `proposal_state` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedStatusOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusOracle for ScriptedStatusOracle {
    async fn proposal_state(&self, proposal: &ProposalId) -> Result<u64, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.states
            .lock()
            .get(proposal)
            .cloned()
            .unwrap_or_else(|| Err(OracleError::Rejected("unknown proposal".to_owned())))
    }

    async fn current_block_height(&self) -> Result<Option<u64>, OracleError> {
        self.block_height.lock().clone()
    }
}

#[derive(Debug, Default)]
pub struct ScriptedVoteHistory {
    answer: Mutex<Option<Result<bool, OracleError>>>,
}

impl ScriptedVoteHistory {
    pub fn answering(answer: Result<bool, OracleError>) -> Self {
        Self {
            answer: Mutex::new(Some(answer)),
        }
    }

    pub fn set(&self, answer: Result<bool, OracleError>) {
        *self.answer.lock() = Some(answer);
    }
}

#[async_trait]
impl VoteHistoryOracle for ScriptedVoteHistory {
    async fn has_voted(
        &self,
        _proposal: &ProposalId,
        _voter: &VoterAddress,
    ) -> Result<bool, OracleError> {
        self.answer.lock().clone().unwrap_or(Ok(false))
    }
}

/// Submitter keeping every ballot it was handed.
#[derive(Debug, Default)]
pub struct RecordingSubmitter {
    failure: Mutex<Option<SubmitError>>,
    ballots: Mutex<Vec<(VoterAddress, Ballot)>>,
    gate: Option<Notify>,
}

impl RecordingSubmitter {
    pub fn failing(error: SubmitError) -> Self {
        Self {
            failure: Mutex::new(Some(error)),
            ..Self::default()
        }
    }

    /// Submitter whose submissions stay in flight until [`Self::release`].
    pub fn held(failure: Option<SubmitError>) -> Self {
        Self {
            failure: Mutex::new(failure),
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    /// Let one held submission resolve.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    pub fn ballots(&self) -> Vec<(VoterAddress, Ballot)> {
        self.ballots.lock().clone()
    }
}

#[async_trait]
impl VoteSubmitter for RecordingSubmitter {
    async fn submit_vote(&self, signer: &dyn Signer, ballot: &Ballot) -> Result<(), SubmitError> {
        self.ballots.lock().push((signer.address(), ballot.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

#[derive(Debug, Clone)]
pub struct TestSigner(pub VoterAddress);

impl TestSigner {
    pub fn new(address: &str) -> Self {
        Self(VoterAddress::new(address))
    }
}

impl Signer for TestSigner {
    fn address(&self) -> VoterAddress {
        self.0.clone()
    }
}
