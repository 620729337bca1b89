use crate::lifecycle::ProposalLifecycleState;
use crate::proposal::ProposalId;
use crate::store::{KeyValueStore, StoreError};
use serde::{Deserialize, Serialize};

const LAST_PROPOSAL_ID: &str = "lastProposalId";
const PROPOSAL_DESCRIPTION: &str = "proposalDescription";
const PROPOSAL_AMOUNT: &str = "proposalAmount";

/// The proposal most recently created or voted on, remembered for the
/// queue & execute page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastProposal {
    pub id: ProposalId,
    pub description: Option<String>,
    pub amount: Option<String>,
}

impl LastProposal {
    pub fn new(id: ProposalId) -> Self {
        Self {
            id,
            description: None,
            amount: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_amount<S: Into<String>>(mut self, amount: S) -> Self {
        self.amount = Some(amount.into());
        self
    }

    /// `None` if no proposal id was ever stored.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, StoreError> {
        let id = match store.get(LAST_PROPOSAL_ID)?.and_then(ProposalId::new) {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(Some(Self {
            id,
            description: store.get(PROPOSAL_DESCRIPTION)?,
            amount: store.get(PROPOSAL_AMOUNT)?,
        }))
    }

    /// Absent description and amount leave the previous values in place.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<(), StoreError> {
        store.set(LAST_PROPOSAL_ID, self.id.as_str())?;
        if let Some(description) = &self.description {
            store.set(PROPOSAL_DESCRIPTION, description)?;
        }
        if let Some(amount) = &self.amount {
            store.set(PROPOSAL_AMOUNT, amount)?;
        }
        Ok(())
    }
}

/// Next action available on the queue & execute page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStep {
    /// voting has not finished yet
    AwaitVoting,
    Queue,
    Execute,
    Done,
    /// the proposal will never be executed
    Closed,
}

impl From<ProposalLifecycleState> for ExecutionStep {
    fn from(state: ProposalLifecycleState) -> Self {
        use ProposalLifecycleState::*;
        match state {
            Pending | Active => Self::AwaitVoting,
            Succeeded => Self::Queue,
            Queued => Self::Execute,
            Executed => Self::Done,
            Canceled | Defeated | Expired | Unknown(_) => Self::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn last_proposal_survives_a_reload() {
        let store = MemoryStore::new();
        assert_eq!(LastProposal::load(&store).unwrap(), None);

        let last = LastProposal::new(ProposalId::new("5531").unwrap())
            .with_description("Fund the audit")
            .with_amount("1500");
        last.save(&store).unwrap();
        assert_eq!(LastProposal::load(&store).unwrap(), Some(last));
    }

    #[test]
    fn empty_stored_id_counts_as_absent() {
        let store = MemoryStore::new();
        store.set(LAST_PROPOSAL_ID, "").unwrap();
        assert_eq!(LastProposal::load(&store).unwrap(), None);
    }

    #[test]
    fn steps_follow_the_lifecycle() {
        assert_eq!(
            ExecutionStep::from(ProposalLifecycleState::Active),
            ExecutionStep::AwaitVoting
        );
        assert_eq!(
            ExecutionStep::from(ProposalLifecycleState::Succeeded),
            ExecutionStep::Queue
        );
        assert_eq!(
            ExecutionStep::from(ProposalLifecycleState::Queued),
            ExecutionStep::Execute
        );
        assert_eq!(
            ExecutionStep::from(ProposalLifecycleState::Executed),
            ExecutionStep::Done
        );
        assert_eq!(
            ExecutionStep::from(ProposalLifecycleState::Defeated),
            ExecutionStep::Closed
        );
    }
}
