//! Runtime side of the governance client: polls the chain for the state of
//! a proposal, drives the voting window countdown and forwards votes.
//!
//! All loops run on tokio and are owned through [`TaskHandle`]s, so tearing
//! a component down always stops its timers.

pub mod navigation;
pub mod oracle;
pub mod panel;
pub mod settings;
pub mod task;
pub mod ticker;
pub mod tracker;

#[cfg(any(test, feature = "property-test-api"))]
pub mod testing;


pub use navigation::{Navigator, Route};
pub use oracle::{OracleError, Signer, StatusOracle, SubmitError, VoteHistoryOracle, VoteSubmitter};
pub use panel::{Collaborators, PanelView, VoteError, VotePanel};
pub use settings::{Settings, SettingsError};
pub use task::TaskHandle;
pub use ticker::CountdownTicker;
pub use tracker::{ProposalStateTracker, TrackerSnapshot};
