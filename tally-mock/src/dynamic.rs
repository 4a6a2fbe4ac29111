use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use tally_core::{ProviderClient, RawMetricPoint, TallyError, TrackingLinkId};

/// Instruction for how a fetch should behave for a given link.
#[derive(Clone)]
pub enum MockBehavior<T> {
    /// Return the provided value immediately.
    Return(T),
    /// Fail immediately with the provided error.
    Fail(TallyError),
    /// Hang indefinitely (simulate a timeout).
    Hang,
    /// Block until `gate` is notified, then behave as `then`.
    Wait {
        /// Released by the test with `notify_one`.
        gate: Arc<Notify>,
        /// Behavior once released.
        then: Box<MockBehavior<T>>,
    },
}

impl<T> MockBehavior<T> {
    /// Convenience constructor for [`MockBehavior::Wait`].
    pub fn wait(gate: Arc<Notify>, then: Self) -> Self {
        Self::Wait {
            gate,
            then: Box::new(then),
        }
    }

    async fn run(self) -> Result<T, TallyError> {
        let mut current = self;
        loop {
            match current {
                Self::Return(v) => return Ok(v),
                Self::Fail(e) => return Err(e),
                Self::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
                Self::Wait { gate, then } => {
                    gate.notified().await;
                    current = *then;
                }
            }
        }
    }
}

type SeriesBehavior = MockBehavior<Vec<RawMetricPoint>>;

#[derive(Default)]
struct InternalState {
    series_rules: HashMap<TrackingLinkId, SeriesBehavior>,
    one_shots: HashMap<TrackingLinkId, VecDeque<SeriesBehavior>>,
    fetches: HashMap<TrackingLinkId, usize>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockController {
    /// Set the standing behavior for fetches of `link`.
    pub async fn set_series_behavior(
        &self,
        link: impl Into<TrackingLinkId>,
        behavior: MockBehavior<Vec<RawMetricPoint>>,
    ) {
        let mut guard = self.state.lock().await;
        guard.series_rules.insert(link.into(), behavior);
    }

    /// Shorthand for a standing `Return(series)` behavior.
    pub async fn set_series(&self, link: impl Into<TrackingLinkId>, series: Vec<RawMetricPoint>) {
        self.set_series_behavior(link, MockBehavior::Return(series))
            .await;
    }

    /// Queue a behavior used by exactly one upcoming fetch of `link`.
    ///
    /// Queued behaviors are consumed in order before the standing behavior applies.
    pub async fn push_once(
        &self,
        link: impl Into<TrackingLinkId>,
        behavior: MockBehavior<Vec<RawMetricPoint>>,
    ) {
        let mut guard = self.state.lock().await;
        guard
            .one_shots
            .entry(link.into())
            .or_default()
            .push_back(behavior);
    }

    /// Number of fetches issued for `link` so far.
    pub async fn fetch_count(&self, link: impl Into<TrackingLinkId>) -> usize {
        let guard = self.state.lock().await;
        guard.fetches.get(&link.into()).copied().unwrap_or(0)
    }

    /// Number of fetches issued across every link.
    pub async fn total_fetches(&self) -> usize {
        let guard = self.state.lock().await;
        guard.fetches.values().sum()
    }

    /// Clear all configured behaviors and fetch counters.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.series_rules.clear();
        guard.one_shots.clear();
        guard.fetches.clear();
    }
}

/// A provider that defers all behavior to an external controller.
///
/// Links without a configured behavior report an empty series.
pub struct DynamicMockProvider {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl DynamicMockProvider {
    /// Create a new dynamic mock provider and its controller.
    #[must_use]
    pub fn new_with_controller(
        name: &'static str,
    ) -> (Arc<dyn ProviderClient>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = DynamicMockController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn ProviderClient>, controller)
    }
}

#[async_trait]
impl ProviderClient for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_series(
        &self,
        link: &TrackingLinkId,
    ) -> Result<Vec<RawMetricPoint>, TallyError> {
        // Acquire behavior snapshot without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            *guard.fetches.entry(link.clone()).or_default() += 1;
            let queued = guard.one_shots.get_mut(link).and_then(VecDeque::pop_front);
            queued.or_else(|| guard.series_rules.get(link).cloned())
        };

        match behavior {
            Some(b) => b.run().await,
            None => Ok(Vec::new()),
        }
    }
}
