//! Voting window countdown.
//!
//! The first time a proposal is seen `Active`, a [`CountdownRecord`] is
//! written to the store with the current time as anchor. Every later view of
//! the same proposal reads that anchor back, so the remaining time shown is
//! the same whichever page is open and however often the client reloads.
//!
//! The display is driven by [`CountdownEngine`]:
//!
//! * [`CountdownEngine::observe`] is called whenever the proposal or its
//!   lifecycle state changes;
//! * [`CountdownEngine::tick`] is called once per second while the engine is
//!   [`CountdownState::Counting`].

use crate::lifecycle::ProposalLifecycleState;
use crate::proposal::ProposalId;
use crate::store::{KeyValueStore, StoreError};
use crate::time::{Clock, Timestamp};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Length of the voting window shown to the user.
pub const VOTING_WINDOW: Duration = Duration::from_secs(10 * 60);

const FLAG_SET: &str = "true";

/// Remaining time split the way it is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub hours: u64,
    pub minutes: u8,
    pub seconds: u8,
}

impl Remaining {
    pub fn from_secs(secs: u64) -> Self {
        Self {
            hours: secs / 3600,
            minutes: ((secs % 3600) / 60) as u8,
            seconds: (secs % 60) as u8,
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.hours * 3600 + u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }

    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }

    /// Take one second off, borrowing from minutes then hours.
    ///
    /// Returns `true` once the countdown sits at `00:00:00`; ticking a zero
    /// value leaves it at zero.
    pub fn tick(&mut self) -> bool {
        if self.seconds > 0 {
            self.seconds -= 1;
        } else if self.minutes > 0 {
            self.minutes -= 1;
            self.seconds = 59;
        } else if self.hours > 0 {
            self.hours -= 1;
            self.minutes = 59;
            self.seconds = 59;
        }
        self.is_zero()
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Persisted anchor of a proposal's countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownRecord {
    pub started: bool,
    pub start_timestamp: Timestamp,
    pub transition_acknowledged: bool,
}

struct RecordKeys {
    started: String,
    start_time: String,
    transition: String,
}

impl RecordKeys {
    fn new(proposal: &ProposalId) -> Self {
        Self {
            started: format!("countdown_{}", proposal),
            start_time: format!("startTime_{}", proposal),
            transition: format!("transition_{}", proposal),
        }
    }
}

impl CountdownRecord {
    pub fn new(start_timestamp: Timestamp) -> Self {
        Self {
            started: true,
            start_timestamp,
            transition_acknowledged: false,
        }
    }

    /// Read the record of `proposal`.
    ///
    /// A record flagged as started but without a readable start time is
    /// reported as missing so the caller anchors a fresh one.
    pub fn load<S: KeyValueStore + ?Sized>(
        store: &S,
        proposal: &ProposalId,
    ) -> Result<Option<Self>, StoreError> {
        let keys = RecordKeys::new(proposal);
        if store.get(&keys.started)?.is_none() {
            return Ok(None);
        }

        let start_timestamp = match store.get(&keys.start_time)? {
            Some(raw) => match raw.parse::<Timestamp>() {
                Ok(ts) => ts,
                Err(error) => {
                    warn!(%proposal, %raw, %error, "unreadable countdown start time");
                    return Ok(None);
                }
            },
            None => {
                warn!(%proposal, "countdown started without a start time");
                return Ok(None);
            }
        };

        Ok(Some(Self {
            started: true,
            start_timestamp,
            transition_acknowledged: store.get(&keys.transition)?.is_some(),
        }))
    }

    pub fn save<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        proposal: &ProposalId,
    ) -> Result<(), StoreError> {
        let keys = RecordKeys::new(proposal);
        store.set(&keys.start_time, &self.start_timestamp.to_string())?;
        store.set(&keys.started, FLAG_SET)?;
        if self.transition_acknowledged {
            store.set(&keys.transition, FLAG_SET)?;
        }
        Ok(())
    }

    /// Mark that the expiry of the window has been observed. Idempotent.
    pub fn acknowledge_transition<S: KeyValueStore + ?Sized>(
        &mut self,
        store: &S,
        proposal: &ProposalId,
    ) -> Result<(), StoreError> {
        if self.transition_acknowledged {
            return Ok(());
        }
        self.transition_acknowledged = true;
        store.set(&RecordKeys::new(proposal).transition, FLAG_SET)
    }
}

/// Display phase derived from an anchor and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownPhase {
    Counting(Remaining),
    Expired,
}

impl CountdownPhase {
    pub fn at(start: Timestamp, now: Timestamp, window: Duration) -> Self {
        let elapsed = start.elapsed_secs_until(now);
        match window.as_secs().checked_sub(elapsed) {
            Some(remaining) if remaining > 0 => Self::Counting(Remaining::from_secs(remaining)),
            _ => Self::Expired,
        }
    }
}

/// State of the countdown engine for the proposal it currently follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    /// nothing to show: the proposal is not `Active`
    Dormant,
    Counting { remaining: Remaining },
    Expired,
}

/// What the countdown area of a view should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownView {
    Hidden,
    Counting(Remaining),
    EndingSoon,
}

impl CountdownView {
    pub fn headline(&self) -> Option<&'static str> {
        match self {
            Self::Hidden => None,
            Self::Counting(_) => Some("Voting ends in:"),
            Self::EndingSoon => Some("Voting will end soon"),
        }
    }

    pub fn detail(&self) -> Option<&'static str> {
        match self {
            Self::Hidden => None,
            Self::Counting(_) => Some("Voting period: ~10 minutes"),
            Self::EndingSoon => Some(
                "The 10-minute voting period has ended. Waiting for blockchain confirmation...",
            ),
        }
    }
}

impl From<CountdownState> for CountdownView {
    fn from(state: CountdownState) -> Self {
        match state {
            CountdownState::Dormant => Self::Hidden,
            CountdownState::Counting { remaining } => Self::Counting(remaining),
            CountdownState::Expired => Self::EndingSoon,
        }
    }
}

/// Countdown state machine for one proposal at a time.
pub struct CountdownEngine<S, C> {
    store: S,
    clock: C,
    window: Duration,
    proposal: Option<ProposalId>,
    record: Option<CountdownRecord>,
    state: CountdownState,
}

impl<S: KeyValueStore, C: Clock> CountdownEngine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_window(store, clock, VOTING_WINDOW)
    }

    pub fn with_window(store: S, clock: C, window: Duration) -> Self {
        Self {
            store,
            clock,
            window,
            proposal: None,
            record: None,
            state: CountdownState::Dormant,
        }
    }

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn view(&self) -> CountdownView {
        self.state.into()
    }

    pub fn proposal(&self) -> Option<&ProposalId> {
        self.proposal.as_ref()
    }

    pub fn record(&self) -> Option<&CountdownRecord> {
        self.record.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// React to the proposal or its lifecycle state changing.
    pub fn observe(
        &mut self,
        proposal: &ProposalId,
        current: ProposalLifecycleState,
    ) -> CountdownState {
        self.proposal = Some(proposal.clone());

        if !current.is_active() {
            self.record = None;
            self.state = CountdownState::Dormant;
            return self.state;
        }

        let now = self.clock.now();
        let record = match CountdownRecord::load(&self.store, proposal) {
            Ok(Some(record)) => record,
            Ok(None) => {
                let record = CountdownRecord::new(now);
                if let Err(error) = record.save(&self.store, proposal) {
                    warn!(%proposal, %error, "failed to persist countdown start");
                }
                debug!(%proposal, start = %now, "countdown started");
                record
            }
            Err(error) => {
                warn!(%proposal, %error, "countdown record unavailable, counting locally");
                CountdownRecord::new(now)
            }
        };
        self.record = Some(record);

        self.state = match CountdownPhase::at(record.start_timestamp, now, self.window) {
            CountdownPhase::Counting(remaining) => CountdownState::Counting { remaining },
            CountdownPhase::Expired => {
                self.acknowledge();
                CountdownState::Expired
            }
        };
        self.state
    }

    /// Advance the displayed countdown by one second.
    pub fn tick(&mut self) -> CountdownState {
        if let CountdownState::Counting { mut remaining } = self.state {
            if remaining.tick() {
                self.acknowledge();
                self.state = CountdownState::Expired;
            } else {
                self.state = CountdownState::Counting { remaining };
            }
        }
        self.state
    }

    fn acknowledge(&mut self) {
        let (record, proposal) = match (self.record.as_mut(), self.proposal.as_ref()) {
            (Some(record), Some(proposal)) => (record, proposal),
            _ => return,
        };
        if record.transition_acknowledged {
            return;
        }
        debug!(%proposal, "voting window elapsed");
        if let Err(error) = record.acknowledge_transition(&self.store, proposal) {
            warn!(%proposal, %error, "failed to persist countdown transition");
        }
    }
}
