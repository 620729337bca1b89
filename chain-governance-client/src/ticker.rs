use crate::task::TaskHandle;
use chain_governance::{
    Clock, CountdownEngine, CountdownState, CountdownView, KeyValueStore, ProposalId,
    ProposalLifecycleState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Drives a [`CountdownEngine`] with a one second ticker.
///
/// At most one ticker runs at a time: every call to [`CountdownTicker::sync`]
/// that changes the proposal or its state tears the running ticker down
/// before the engine sees the change.
pub struct CountdownTicker<S, C> {
    engine: Arc<Mutex<CountdownEngine<S, C>>>,
    tick_interval: Duration,
    view: Arc<watch::Sender<CountdownView>>,
    ticker: Option<TaskHandle>,
    observed: Option<(ProposalId, ProposalLifecycleState)>,
}

impl<S, C> CountdownTicker<S, C>
where
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    pub fn new(engine: CountdownEngine<S, C>) -> Self {
        Self::with_interval(engine, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_interval(engine: CountdownEngine<S, C>, tick_interval: Duration) -> Self {
        let (view, _) = watch::channel(CountdownView::Hidden);
        Self {
            engine: Arc::new(Mutex::new(engine)),
            tick_interval,
            view: Arc::new(view),
            ticker: None,
            observed: None,
        }
    }

    /// Bring the countdown in line with the live proposal state.
    pub fn sync(&mut self, proposal: &ProposalId, state: ProposalLifecycleState) -> CountdownView {
        let unchanged = self
            .observed
            .as_ref()
            .map_or(false, |(p, s)| p == proposal && *s == state);
        if unchanged {
            return self.view();
        }

        self.stop_ticking();
        let current = self.engine.lock().observe(proposal, state);
        self.view.send_replace(current.into());
        self.observed = Some((proposal.clone(), state));

        if let CountdownState::Counting { remaining } = current {
            trace!(%proposal, %remaining, "countdown ticking");
            self.ticker = Some(self.spawn_ticker());
        }
        current.into()
    }

    /// Stop ticking and hide the countdown, e.g. when the view goes away.
    pub fn stop(&mut self) {
        self.stop_ticking();
        self.observed = None;
        self.view.send_replace(CountdownView::Hidden);
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker
            .as_ref()
            .map_or(false, |ticker| !ticker.is_finished())
    }

    pub fn view(&self) -> CountdownView {
        *self.view.borrow()
    }

    pub fn state(&self) -> CountdownState {
        self.engine.lock().state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CountdownView> {
        self.view.subscribe()
    }

    fn stop_ticking(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn spawn_ticker(&self) -> TaskHandle {
        let engine = Arc::clone(&self.engine);
        let view = Arc::clone(&self.view);
        let period = self.tick_interval;
        TaskHandle::new(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let state = engine.lock().tick();
                view.send_replace(state.into());
                if !matches!(state, CountdownState::Counting { .. }) {
                    break;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_governance::time::ManualClock;
    use chain_governance::{MemoryStore, Remaining, Timestamp};

    const T0: Timestamp = Timestamp::from_millis(1_700_000_000_000);

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn run_for(secs: u64) {
        for _ in 0..secs {
            time::advance(Duration::from_secs(1)).await;
            settle().await;
        }
    }

    fn new_ticker(
        store: Arc<MemoryStore>,
        clock: ManualClock,
    ) -> CountdownTicker<Arc<MemoryStore>, ManualClock> {
        CountdownTicker::new(CountdownEngine::new(store, clock))
    }

    fn shown(view: CountdownView) -> String {
        match view {
            CountdownView::Counting(remaining) => remaining.to_string(),
            other => format!("{:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_each_second() {
        let mut ticker = new_ticker(Arc::new(MemoryStore::new()), ManualClock::new(T0));
        let proposal = ProposalId::new("0xABC123").unwrap();

        let view = ticker.sync(&proposal, ProposalLifecycleState::Active);
        assert_eq!(shown(view), "00:10:00");
        assert!(ticker.is_ticking());

        run_for(1).await;
        assert_eq!(shown(ticker.view()), "00:09:59");

        run_for(59).await;
        assert_eq!(shown(ticker.view()), "00:09:00");
    }

    #[tokio::test(start_paused = true)]
    async fn identical_sync_keeps_the_running_ticker() {
        let mut ticker = new_ticker(Arc::new(MemoryStore::new()), ManualClock::new(T0));
        let proposal = ProposalId::new("1").unwrap();
        ticker.sync(&proposal, ProposalLifecycleState::Active);
        run_for(3).await;

        let view = ticker.sync(&proposal, ProposalLifecycleState::Active);
        assert_eq!(shown(view), "00:09:57");
        run_for(1).await;
        // a single ticker: one second off per second
        assert_eq!(shown(ticker.view()), "00:09:56");
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_active_hides_and_stops() {
        let store = Arc::new(MemoryStore::new());
        let mut ticker = new_ticker(Arc::clone(&store), ManualClock::new(T0));
        let proposal = ProposalId::new("1").unwrap();
        ticker.sync(&proposal, ProposalLifecycleState::Active);

        let view = ticker.sync(&proposal, ProposalLifecycleState::Succeeded);
        assert_eq!(view, CountdownView::Hidden);
        assert!(!ticker.is_ticking());
        run_for(5).await;
        assert_eq!(ticker.view(), CountdownView::Hidden);
        assert_eq!(store.get("countdown_1").unwrap().as_deref(), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn reaching_zero_shows_ending_soon() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(T0);
        let proposal = ProposalId::new("1").unwrap();
        CountdownEngine::new(Arc::clone(&store), clock.clone())
            .observe(&proposal, ProposalLifecycleState::Active);
        clock.advance(Duration::from_secs(597));

        let mut ticker = new_ticker(Arc::clone(&store), clock);
        let view = ticker.sync(&proposal, ProposalLifecycleState::Active);
        assert_eq!(view, CountdownView::Counting(Remaining::from_secs(3)));

        run_for(3).await;
        assert_eq!(ticker.view(), CountdownView::EndingSoon);
        assert!(!ticker.is_ticking());
        assert_eq!(store.get("transition_1").unwrap().as_deref(), Some("true"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_hides_the_countdown() {
        let mut ticker = new_ticker(Arc::new(MemoryStore::new()), ManualClock::new(T0));
        let proposal = ProposalId::new("1").unwrap();
        let mut updates = ticker.subscribe();
        ticker.sync(&proposal, ProposalLifecycleState::Active);
        assert!(updates.has_changed().unwrap());

        ticker.stop();
        assert!(!ticker.is_ticking());
        assert_eq!(*updates.borrow_and_update(), CountdownView::Hidden);
    }
}
