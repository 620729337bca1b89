//! Voting panel of a single proposal.
//!
//! The panel composes the state tracker and the countdown, remembers whether
//! the connected account already voted, and forwards votes to the
//! [`VoteSubmitter`]. A background task feeds every tracker update into the
//! countdown, so the voting window is anchored at the first poll that sees
//! the proposal active. None of the collaborator failures are fatal: the panel
//! keeps showing the last known state and the user may retry.

use crate::navigation::{Navigator, Route};
use crate::oracle::{Signer, StatusOracle, SubmitError, VoteHistoryOracle, VoteSubmitter};
use crate::settings::Settings;
use crate::task::TaskHandle;
use crate::ticker::CountdownTicker;
use crate::tracker::{ProposalStateTracker, TrackerSnapshot};
use chain_governance::{
    lifecycle::UNAVAILABLE_MESSAGE, Ballot, Clock, CountdownEngine, CountdownView, KeyValueStore,
    LastProposal, ProposalId, ProposalLifecycleState, StoreError, VoteChoice,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

const PENDING_HINT: &str = "Please wait for the voting delay period to end.";

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("no proposal is open")]
    NoProposal,

    #[error("vote submission failed")]
    SubmissionFailed(#[source] SubmitError),
}

/// External services the panel works with.
pub struct Collaborators {
    pub status: Arc<dyn StatusOracle>,
    pub history: Arc<dyn VoteHistoryOracle>,
    pub submitter: Arc<dyn VoteSubmitter>,
    pub navigator: Arc<dyn Navigator>,
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
}

/// Everything needed to render the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub short_id: Option<String>,
    pub state_label: &'static str,
    pub status_message: &'static str,
    pub block_height: Option<u64>,
    pub countdown: CountdownView,
    pub already_voted: bool,
    /// whether the vote buttons are offered
    pub can_vote: bool,
    pub pending_hint: Option<&'static str>,
    pub loading: bool,
}

type PanelTicker = CountdownTicker<Arc<dyn KeyValueStore>, Arc<dyn Clock>>;

pub struct VotePanel {
    tracker: ProposalStateTracker<dyn StatusOracle>,
    countdown: Arc<Mutex<PanelTicker>>,
    follower: Option<TaskHandle>,
    history: Arc<dyn VoteHistoryOracle>,
    submitter: Arc<dyn VoteSubmitter>,
    navigator: Arc<dyn Navigator>,
    store: Arc<dyn KeyValueStore>,
    proposal: Option<ProposalId>,
    already_voted: AtomicBool,
    loading: AtomicBool,
}

/// Raises the loading flag for as long as it is alive, so a dropped vote
/// future clears it as well.
struct Loading<'a>(&'a AtomicBool);

impl<'a> Loading<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VotePanel {
    pub fn new(collaborators: Collaborators, settings: &Settings) -> Self {
        let Collaborators {
            status,
            history,
            submitter,
            navigator,
            store,
            clock,
        } = collaborators;

        let tracker = ProposalStateTracker::with_interval(status, settings.poll_interval());
        let engine = CountdownEngine::with_window(Arc::clone(&store), clock, settings.voting_window());
        let countdown = CountdownTicker::with_interval(engine, settings.tick_interval());
        Self {
            tracker,
            countdown: Arc::new(Mutex::new(countdown)),
            follower: None,
            history,
            submitter,
            navigator,
            store,
            proposal: None,
            already_voted: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        }
    }

    /// Show `proposal`, replacing whatever proposal was shown before.
    ///
    /// Every state the tracker reports from then on is carried into the
    /// countdown by a background task. Must be called from within a tokio
    /// runtime.
    pub fn open(&mut self, proposal: Option<ProposalId>) {
        if self.proposal != proposal {
            self.close();
            self.already_voted.store(false, Ordering::SeqCst);
            self.loading.store(false, Ordering::SeqCst);
        }
        self.proposal = proposal.clone();
        self.tracker.start(proposal);
        self.follow();
    }

    /// Open the proposal remembered as the last one created or voted on.
    pub fn open_last(&mut self) -> Result<Option<ProposalId>, StoreError> {
        let last = LastProposal::load(&*self.store)?.map(|last| last.id);
        self.open(last.clone());
        Ok(last)
    }

    /// Stop every background loop of the panel.
    pub fn close(&mut self) {
        if let Some(follower) = self.follower.take() {
            follower.cancel();
        }
        self.tracker.stop();
        self.countdown.lock().stop();
    }

    pub fn proposal(&self) -> Option<&ProposalId> {
        self.proposal.as_ref()
    }

    pub fn already_voted(&self) -> bool {
        self.already_voted.load(Ordering::SeqCst)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Apply the last known proposal state to the countdown right away,
    /// without waiting for the background task.
    pub fn sync(&self) {
        match &self.proposal {
            Some(proposal) => apply(&self.countdown, proposal, &self.tracker.snapshot()),
            None => self.countdown.lock().stop(),
        }
    }

    pub async fn refresh_now(&self) -> Option<ProposalLifecycleState> {
        let state = self.tracker.refresh_now().await;
        self.sync();
        state
    }

    /// Ask the chain whether `signer` already voted on the open proposal.
    ///
    /// A failed lookup leaves the flag as it was. Once known to have voted,
    /// the flag stays set for this proposal.
    pub async fn check_has_voted(&self, signer: &dyn Signer) {
        let proposal = match &self.proposal {
            Some(proposal) => proposal,
            None => return,
        };
        let voter = signer.address();
        match self.history.has_voted(proposal, &voter).await {
            Ok(voted) => {
                debug!(%proposal, %voter, voted, "vote history checked");
                self.already_voted.fetch_or(voted, Ordering::SeqCst);
            }
            Err(error) => {
                warn!(%proposal, %voter, %error, "vote history unavailable");
            }
        }
    }

    /// Cast a vote on the open proposal.
    ///
    /// The panel reports loading while the submission is in flight, and
    /// stops doing so once it resolves or the returned future is dropped.
    /// On success the panel remembers the vote and hands over to the
    /// execute page. A failure is returned without retry.
    pub async fn cast_vote(
        &self,
        signer: &dyn Signer,
        choice: VoteChoice,
        reason: Option<String>,
    ) -> Result<(), VoteError> {
        let proposal = self.proposal.clone().ok_or(VoteError::NoProposal)?;
        let ballot = Ballot::new(proposal.clone(), choice, reason);

        let result = {
            let _loading = Loading::raise(&self.loading);
            self.submitter.submit_vote(signer, &ballot).await
        };

        match result {
            Ok(()) => {
                info!(%proposal, %choice, "vote submitted");
                self.already_voted.store(true, Ordering::SeqCst);
                if let Err(error) = LastProposal::new(proposal.clone()).save(&*self.store) {
                    warn!(%proposal, %error, "failed to remember the voted proposal");
                }
                self.navigator.navigate(Route::Execute);
                Ok(())
            }
            Err(error) => {
                warn!(%proposal, %choice, %error, "vote submission failed");
                Err(VoteError::SubmissionFailed(error))
            }
        }
    }

    fn follow(&mut self) {
        let proposal = match &self.proposal {
            Some(proposal) => proposal.clone(),
            None => return,
        };
        let mut updates = self.tracker.subscribe();
        let countdown = Arc::clone(&self.countdown);
        self.follower = Some(TaskHandle::new(tokio::spawn(async move {
            loop {
                let snapshot = updates.borrow_and_update().clone();
                apply(&countdown, &proposal, &snapshot);
                if updates.changed().await.is_err() {
                    break;
                }
            }
        })));
    }

    pub fn view(&self) -> PanelView {
        let snapshot = self.tracker.snapshot();
        let state = snapshot.state;
        let active = state.map_or(false, |s| s.is_active());
        let already_voted = self.already_voted();

        PanelView {
            short_id: self.proposal.as_ref().map(ProposalId::short),
            state_label: state.map_or("Unknown", |s| s.label()),
            status_message: state.map_or(UNAVAILABLE_MESSAGE, |s| s.status_message()),
            block_height: snapshot.block_height,
            // the live state gates the countdown, not the ticker's last sync
            countdown: if active {
                self.countdown.lock().view()
            } else {
                CountdownView::Hidden
            },
            already_voted,
            can_vote: active && !already_voted,
            pending_hint: match state {
                Some(ProposalLifecycleState::Pending) => Some(PENDING_HINT),
                _ => None,
            },
            loading: self.is_loading(),
        }
    }

    pub fn countdown_updates(&self) -> watch::Receiver<CountdownView> {
        self.countdown.lock().subscribe()
    }
}

/// Bring the countdown in line with what the tracker knows about `proposal`.
fn apply(countdown: &Mutex<PanelTicker>, proposal: &ProposalId, snapshot: &TrackerSnapshot) {
    let mut countdown = countdown.lock();
    match (&snapshot.proposal, snapshot.state) {
        (Some(tracked), Some(state)) if tracked == proposal => {
            countdown.sync(proposal, state);
        }
        _ => countdown.stop(),
    }
}
