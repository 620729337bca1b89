//! Polling of a proposal's lifecycle state.
//!
//! [`ProposalStateTracker`] keeps the last state reported by the
//! [`StatusOracle`] for one proposal. A failed poll leaves the previous state
//! in place and is only logged; the next scheduled poll, or an explicit
//! [`ProposalStateTracker::refresh_now`], is the only recovery.

use crate::oracle::StatusOracle;
use crate::task::TaskHandle;
use chain_governance::{ProposalId, ProposalLifecycleState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, trace, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What is currently known about the tracked proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    pub proposal: Option<ProposalId>,
    /// `None` until the first successful poll
    pub state: Option<ProposalLifecycleState>,
    pub block_height: Option<u64>,
}

pub struct ProposalStateTracker<O: ?Sized> {
    oracle: Arc<O>,
    poll_interval: Duration,
    snapshot: Arc<watch::Sender<TrackerSnapshot>>,
    poller: Option<TaskHandle>,
}

impl<O> ProposalStateTracker<O>
where
    O: StatusOracle + ?Sized + 'static,
{
    pub fn new(oracle: Arc<O>) -> Self {
        Self::with_interval(oracle, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(oracle: Arc<O>, poll_interval: Duration) -> Self {
        let (snapshot, _) = watch::channel(TrackerSnapshot::default());
        Self {
            oracle,
            poll_interval,
            snapshot: Arc::new(snapshot),
            poller: None,
        }
    }

    /// Start polling `proposal`, first poll right away.
    ///
    /// Any loop running for a previous proposal is stopped first. Nothing
    /// happens without a proposal. Must be called from within a tokio
    /// runtime.
    pub fn start(&mut self, proposal: Option<ProposalId>) {
        let proposal = match proposal {
            Some(proposal) => proposal,
            None => {
                debug!("no proposal to track");
                return;
            }
        };

        self.stop();
        self.snapshot.send_if_modified(|current| {
            if current.proposal.as_ref() == Some(&proposal) {
                return false;
            }
            *current = TrackerSnapshot {
                proposal: Some(proposal.clone()),
                state: None,
                block_height: current.block_height,
            };
            true
        });

        debug!(%proposal, interval = ?self.poll_interval, "tracking proposal state");
        let oracle = Arc::clone(&self.oracle);
        let snapshot = Arc::clone(&self.snapshot);
        let poll_interval = self.poll_interval;
        self.poller = Some(TaskHandle::new(tokio::spawn(async move {
            let mut interval = time::interval(poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                poll_once(&*oracle, &proposal, &snapshot).await;
            }
        })));
    }

    /// Stop the polling loop. The last known state is kept.
    pub fn stop(&mut self) {
        if let Some(poller) = self.poller.take() {
            trace!("stopping proposal state poller");
            poller.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .map_or(false, |poller| !poller.is_finished())
    }

    /// Poll outside of the schedule.
    ///
    /// Has the same effect as a scheduled poll: whichever of the two
    /// completes last defines the cached state.
    pub async fn refresh_now(&self) -> Option<ProposalLifecycleState> {
        let proposal = self.snapshot.borrow().proposal.clone()?;
        poll_once(&*self.oracle, &proposal, &self.snapshot).await
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> Option<ProposalLifecycleState> {
        self.snapshot.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshot.subscribe()
    }
}

async fn poll_once<O>(
    oracle: &O,
    proposal: &ProposalId,
    snapshot: &watch::Sender<TrackerSnapshot>,
) -> Option<ProposalLifecycleState>
where
    O: StatusOracle + ?Sized,
{
    let state = match oracle.proposal_state(proposal).await {
        Ok(code) => ProposalLifecycleState::from_code(code),
        Err(error) => {
            warn!(%proposal, %error, "proposal state poll failed, keeping last known state");
            return None;
        }
    };
    if let ProposalLifecycleState::Unknown(code) = state {
        debug!(%proposal, code, "unknown proposal state code");
    }

    let block_height = match oracle.current_block_height().await {
        Ok(height) => height,
        Err(error) => {
            debug!(%error, "block height unavailable");
            None
        }
    };

    let applied = snapshot.send_if_modified(|current| {
        if current.proposal.as_ref() != Some(proposal) {
            return false;
        }
        let mut changed = current.state != Some(state);
        current.state = Some(state);
        if block_height.is_some() && current.block_height != block_height {
            current.block_height = block_height;
            changed = true;
        }
        changed
    });
    if applied {
        trace!(%proposal, %state, ?block_height, "proposal state updated");
    }
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use crate::testing::ScriptedStatusOracle;

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    fn id(s: &str) -> ProposalId {
        ProposalId::new(s).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_every_five_seconds() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("0xABC123");
        oracle.set_state(&proposal, 0);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(proposal.clone()));
        settle().await;
        assert_eq!(oracle.calls(), 1);
        assert_eq!(tracker.state(), Some(ProposalLifecycleState::Pending));

        oracle.set_state(&proposal, 1);
        time::advance(Duration::from_secs(4)).await;
        settle().await;
        assert_eq!(oracle.calls(), 1);

        time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(oracle.calls(), 2);
        assert_eq!(tracker.state(), Some(ProposalLifecycleState::Active));
        assert!(tracker.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn absent_proposal_is_a_no_op() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(ProposalId::new(""));
        settle().await;
        assert!(!tracker.is_polling());
        assert_eq!(oracle.calls(), 0);
        assert_eq!(tracker.refresh_now().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_replaces_the_loop() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let (a, b) = (id("1"), id("2"));
        oracle.set_state(&a, 1);
        oracle.set_state(&b, 4);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(a));
        settle().await;
        tracker.start(Some(b.clone()));
        settle().await;
        assert_eq!(oracle.calls(), 2);
        assert_eq!(tracker.snapshot().proposal, Some(b));
        assert_eq!(tracker.state(), Some(ProposalLifecycleState::Succeeded));

        // a single loop left: one call per period
        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_keeps_last_state() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("9");
        oracle.set_state(&proposal, 1);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(proposal.clone()));
        settle().await;

        oracle.fail(&proposal);
        assert_eq!(tracker.refresh_now().await, None);
        time::advance(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(oracle.calls(), 3);
        assert_eq!(tracker.state(), Some(ProposalLifecycleState::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn block_height_is_best_effort() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("9");
        oracle.set_state(&proposal, 0);
        oracle.set_block_height(Ok(Some(120)));

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(proposal.clone()));
        settle().await;
        assert_eq!(tracker.snapshot().block_height, Some(120));

        oracle.set_state(&proposal, 1);
        oracle.set_block_height(Err(OracleError::Unavailable("no provider".to_owned())));
        assert_eq!(
            tracker.refresh_now().await,
            Some(ProposalLifecycleState::Active)
        );
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.state, Some(ProposalLifecycleState::Active));
        assert_eq!(snapshot.block_height, Some(120));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_polling() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("3");
        oracle.set_state(&proposal, 1);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(proposal));
        settle().await;
        tracker.stop();
        time::advance(Duration::from_secs(30)).await;
        settle().await;
        assert_eq!(oracle.calls(), 1);
        assert!(!tracker.is_polling());
        assert_eq!(tracker.state(), Some(ProposalLifecycleState::Active));
    }

    #[tokio::test(start_paused = true)]
    async fn identical_results_do_not_notify() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("5");
        oracle.set_state(&proposal, 1);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        let mut updates = tracker.subscribe();
        tracker.start(Some(proposal));
        settle().await;
        updates.borrow_and_update();

        let (first, second) = futures::join!(tracker.refresh_now(), tracker.refresh_now());
        assert_eq!(first, second);
        assert!(!updates.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_codes_are_kept() {
        let oracle = Arc::new(ScriptedStatusOracle::new());
        let proposal = id("5");
        oracle.set_state(&proposal, 42);

        let mut tracker = ProposalStateTracker::new(Arc::clone(&oracle));
        tracker.start(Some(proposal));
        settle().await;
        let state = tracker.state().unwrap();
        assert_eq!(state, ProposalLifecycleState::Unknown(42));
        assert_eq!(state.label(), "Unknown");
    }
}
