//! Client side model of a governance proposal: its lifecycle as reported by
//! the contract, the votes a user can cast, and the voting window countdown
//! that is shared by every view of the same proposal.

pub mod countdown;
pub mod execution;
pub mod lifecycle;
pub mod proposal;
pub mod store;
pub mod time;
pub mod vote;

pub use countdown::{
    CountdownEngine, CountdownPhase, CountdownRecord, CountdownState, CountdownView, Remaining,
    VOTING_WINDOW,
};
pub use execution::{ExecutionStep, LastProposal};
pub use lifecycle::{label_of, ParseLifecycleError, ProposalLifecycleState, UNAVAILABLE_MESSAGE};
pub use proposal::{EmptyProposalId, ProposalId, VoterAddress};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use time::{Clock, SystemClock, Timestamp};
pub use vote::{Ballot, InvalidVoteChoice, VoteChoice};
