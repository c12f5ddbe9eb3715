//! Resource Fetcher
//!
//! Keeps the most recent collection for one selected kind and refreshes it in
//! the background. `observe` never waits: it returns whatever is current and,
//! when the kind changed, starts exactly one fetch for the new kind. Results
//! are published through a `tokio::sync::watch` channel.
//!
//! Fetches are never cancelled by a kind change. Each fetch carries a
//! generation number; whether a result from a superseded generation may still
//! be written is decided by [`StaleWritePolicy`].

use super::kind::ResourceKind;
use super::record::{Records, Resource};
use crate::api::Source;
use crate::error::FetchError;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Where the current state is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Resolved,
    Failed,
}

/// What to do with a result whose fetch has been superseded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StaleWritePolicy {
    /// Last completion wins, even if it belongs to an older kind
    Accept,
    /// Only the most recently started fetch may write
    #[default]
    Discard,
}

/// Observable state of a fetcher
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState {
    /// Most recent successfully decoded collection, tagged with its kind
    pub records: Records,
    /// Kind selected when this state was last reset
    pub selected: ResourceKind,
    /// Whether a fetch for `selected` has written `records` since it was selected
    pub has_fetched: bool,
    pub phase: Phase,
    /// Generation of the most recently started fetch
    pub generation: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Last failure, kept for diagnostics only
    pub last_error: Option<FetchError>,
}

impl FetchState {
    fn fresh(kind: ResourceKind, generation: u64) -> Self {
        Self {
            records: Records::empty(kind),
            selected: kind,
            has_fetched: false,
            phase: Phase::Idle,
            generation,
            fetched_at: None,
            last_error: None,
        }
    }

    /// Kind of the records currently held
    pub fn kind(&self) -> ResourceKind {
        self.records.kind()
    }

    /// True when the held records do not belong to `kind`
    pub fn is_stale_for(&self, kind: ResourceKind) -> bool {
        self.records.kind() != kind
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, Phase::Resolved | Phase::Failed)
    }
}

/// Background fetcher for one selected resource kind
pub struct ResourceFetcher<S: Source> {
    source: Arc<S>,
    state: Arc<watch::Sender<FetchState>>,
    policy: StaleWritePolicy,
    kind: ResourceKind,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: Source> ResourceFetcher<S> {
    /// Create a fetcher and start the first fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(source: S, kind: ResourceKind) -> Self {
        Self::with_policy(Arc::new(source), kind, StaleWritePolicy::default())
    }

    pub fn with_policy(source: Arc<S>, kind: ResourceKind, policy: StaleWritePolicy) -> Self {
        let (state, _) = watch::channel(FetchState::fresh(kind, 0));
        let mut fetcher = Self {
            source,
            state: Arc::new(state),
            policy,
            kind,
            tasks: Vec::new(),
        };
        let generation = fetcher.begin_fetch(None);
        fetcher.spawn_fetch(generation);
        fetcher
    }

    /// Currently selected kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn policy(&self) -> StaleWritePolicy {
        self.policy
    }

    /// Return the current records for `kind` without waiting.
    ///
    /// Selecting a different kind resets the state to an empty collection of
    /// that kind and starts one fetch for it.
    pub fn observe(&mut self, kind: ResourceKind) -> Records {
        if kind != self.kind {
            self.select(kind);
        }
        self.state.borrow().records.clone()
    }

    /// Typed variant of [`observe`](Self::observe).
    ///
    /// Returns `None` when the held records belong to another kind, which can
    /// only happen under [`StaleWritePolicy::Accept`].
    pub fn observe_as<R: Resource>(&mut self) -> Option<Vec<R::Record>> {
        let records = self.observe(R::KIND);
        R::view(&records).map(<[R::Record]>::to_vec)
    }

    /// Snapshot of the full state
    pub fn state(&self) -> FetchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Number of fetches that have not finished yet, superseded ones included
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }

    /// Start another fetch for the current kind
    pub fn refresh(&mut self) {
        let generation = self.begin_fetch(None);
        self.spawn_fetch(generation);
    }

    /// Wait until the most recently started fetch has resolved or failed
    pub async fn settled(&self) -> FetchState {
        let mut rx = self.subscribe();
        if let Ok(state) = rx.wait_for(FetchState::is_settled).await {
            return state.clone();
        }
        self.state()
    }

    fn select(&mut self, kind: ResourceKind) {
        tracing::info!("Switching resource kind {} -> {}", self.kind, kind);
        self.kind = kind;
        let generation = self.begin_fetch(Some(kind));
        self.spawn_fetch(generation);
    }

    /// Bump the generation and enter `Fetching`, resetting to `reset` first.
    ///
    /// Runs as one write so no completion can land between the reset and
    /// the bump.
    fn begin_fetch(&self, reset: Option<ResourceKind>) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            if let Some(kind) = reset {
                *state = FetchState::fresh(kind, state.generation);
            }
            state.generation += 1;
            state.phase = Phase::Fetching;
            generation = state.generation;
        });
        generation
    }

    fn spawn_fetch(&mut self, generation: u64) {
        let kind = self.kind;
        self.tasks.retain(|task| !task.is_finished());

        let request_id = Uuid::new_v4();
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let policy = self.policy;

        tracing::debug!(%request_id, generation, "Fetching {}", kind);

        let task = tokio::spawn(async move {
            let result = fetch_once(source.as_ref(), kind).await;
            complete(&state, policy, kind, generation, request_id, result);
        });
        self.tasks.push(task);
    }
}

impl<S: Source> Drop for ResourceFetcher<S> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Apply a finished fetch to the state under the channel's write lock
fn complete(
    state: &watch::Sender<FetchState>,
    policy: StaleWritePolicy,
    kind: ResourceKind,
    generation: u64,
    request_id: Uuid,
    result: Result<Records, FetchError>,
) {
    state.send_if_modified(|current| {
        let superseded = current.generation != generation;

        match result {
            Ok(records) => {
                if superseded {
                    match policy {
                        StaleWritePolicy::Discard => {
                            tracing::debug!(
                                %request_id,
                                generation,
                                "Discarding superseded {} result",
                                kind
                            );
                            return false;
                        }
                        StaleWritePolicy::Accept => {
                            tracing::warn!(
                                %request_id,
                                generation,
                                "Stale {} result overwrote state for {}",
                                kind,
                                current.kind()
                            );
                        }
                    }
                } else {
                    current.phase = Phase::Resolved;
                    current.last_error = None;
                }

                tracing::info!(%request_id, "Loaded {} {}", records.len(), kind);
                current.records = records;
                if kind == current.selected {
                    current.has_fetched = true;
                }
                current.fetched_at = Some(Utc::now());
                true
            }
            Err(e) => {
                tracing::warn!(%request_id, generation, "Failed to fetch {}: {}", kind, e);
                if superseded {
                    return false;
                }
                current.phase = Phase::Failed;
                current.last_error = Some(e);
                true
            }
        }
    });
}

/// Fetch and decode one kind
pub async fn fetch_once<S: Source>(source: &S, kind: ResourceKind) -> Result<Records, FetchError> {
    let payload = source.get(kind).await?;
    Records::decode(kind, payload)
}

/// Fetch several kinds concurrently, preserving input order
pub async fn fetch_many<S: Source>(
    source: &S,
    kinds: &[ResourceKind],
) -> Vec<(ResourceKind, Result<Records, FetchError>)> {
    let results = join_all(kinds.iter().map(|&kind| fetch_once(source, kind))).await;
    kinds.iter().copied().zip(results).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Resolves immediately with a fixed payload per kind
    struct StaticSource {
        payloads: HashMap<ResourceKind, Result<Value, FetchError>>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(entries: Vec<(ResourceKind, Result<Value, FetchError>)>) -> Self {
            Self {
                payloads: entries.into_iter().collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Source for StaticSource {
        fn get(&self, kind: ResourceKind) -> impl Future<Output = Result<Value, FetchError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self
                .payloads
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Network("no route".to_string())));
            async move { result }
        }
    }

    /// Returns a different payload on each call
    struct SequenceSource {
        responses: Mutex<Vec<Result<Value, FetchError>>>,
    }

    impl Source for SequenceSource {
        fn get(&self, _kind: ResourceKind) -> impl Future<Output = Result<Value, FetchError>> + Send {
            let next = self.responses.lock().unwrap().remove(0);
            async move { next }
        }
    }

    /// Never resolves, so the spawned fetch stays parked
    struct PendingSource;

    impl Source for PendingSource {
        fn get(&self, _kind: ResourceKind) -> impl Future<Output = Result<Value, FetchError>> + Send {
            std::future::pending()
        }
    }

    fn todo_payload() -> Value {
        json!([{"userId": 1, "id": 1, "title": "a", "completed": false}])
    }

    #[tokio::test]
    async fn observe_returns_empty_before_first_fetch() {
        let source = StaticSource::new(vec![(ResourceKind::Todos, Ok(todo_payload()))]);
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Todos);

        let records = fetcher.observe(ResourceKind::Todos);
        assert_eq!(records, Records::empty(ResourceKind::Todos));
        assert!(!fetcher.state().has_fetched);
        assert_eq!(fetcher.state().phase, Phase::Fetching);
    }

    #[tokio::test]
    async fn resolved_todos_are_observable() {
        let source = StaticSource::new(vec![(ResourceKind::Todos, Ok(todo_payload()))]);
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Todos);

        let state = fetcher.settled().await;
        assert_eq!(state.phase, Phase::Resolved);
        assert!(state.fetched_at.is_some());

        let todos = fetcher.observe_as::<crate::resource::Todos>().unwrap();
        assert_eq!(todos.len(), 1);
        assert!(!todos[0].completed);
        assert_eq!(todos[0].base.title, "a");
    }

    #[tokio::test]
    async fn empty_payload_sets_has_fetched() {
        let source = StaticSource::new(vec![(ResourceKind::Posts, Ok(json!([])))]);
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Posts);

        assert!(!fetcher.state().has_fetched);
        let state = fetcher.settled().await;

        assert!(state.has_fetched);
        assert!(fetcher.observe(ResourceKind::Posts).is_empty());
    }

    #[tokio::test]
    async fn observe_same_kind_does_not_refetch() {
        let source = Arc::new(StaticSource::new(vec![(ResourceKind::Todos, Ok(todo_payload()))]));
        let mut fetcher =
            ResourceFetcher::with_policy(Arc::clone(&source), ResourceKind::Todos, StaleWritePolicy::Discard);
        fetcher.settled().await;

        fetcher.observe(ResourceKind::Todos);
        fetcher.observe(ResourceKind::Todos);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        fetcher.observe(ResourceKind::Posts);
        fetcher.settled().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_keeps_previous_records() {
        let source = SequenceSource {
            responses: Mutex::new(vec![
                Ok(todo_payload()),
                Err(FetchError::Network("connection refused".to_string())),
            ]),
        };
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Todos);
        let before = fetcher.settled().await;

        fetcher.refresh();
        let after = fetcher.settled().await;

        assert_eq!(after.phase, Phase::Failed);
        assert_eq!(after.records, before.records);
        assert_eq!(after.has_fetched, before.has_fetched);
        assert_eq!(after.fetched_at, before.fetched_at);
        assert!(after.last_error.unwrap().is_network());
    }

    #[tokio::test]
    async fn wrong_shape_is_swallowed_as_parse_failure() {
        let posts = json!([{"userId": 1, "id": 1, "title": "a", "body": "b"}]);
        let source = StaticSource::new(vec![(ResourceKind::Todos, Ok(posts))]);
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Todos);

        let state = fetcher.settled().await;
        assert_eq!(state.phase, Phase::Failed);
        assert!(!state.has_fetched);
        assert!(state.last_error.unwrap().is_parse());
        assert!(fetcher.observe(ResourceKind::Todos).is_empty());
    }

    #[tokio::test]
    async fn fetch_many_keeps_order_and_errors() {
        let source = StaticSource::new(vec![
            (ResourceKind::Todos, Ok(todo_payload())),
            (ResourceKind::Posts, Ok(json!({"not": "an array"}))),
        ]);

        let results = fetch_many(&source, &ResourceKind::ALL).await;
        assert_eq!(results[0].0, ResourceKind::Todos);
        assert_eq!(results[0].1.as_ref().unwrap().len(), 1);
        assert_eq!(results[1].0, ResourceKind::Posts);
        assert!(results[1].1.as_ref().unwrap_err().is_parse());
    }

    #[tokio::test]
    async fn completion_right_after_switch_is_discarded() {
        let mut fetcher = ResourceFetcher::new(PendingSource, ResourceKind::Todos);
        let superseded = fetcher.state().generation;

        fetcher.observe(ResourceKind::Posts);
        let switched = fetcher.state();
        assert_eq!(switched.generation, superseded + 1);
        assert_eq!(switched.phase, Phase::Fetching);
        assert_eq!(switched.selected, ResourceKind::Posts);

        let todos = Records::decode(ResourceKind::Todos, todo_payload()).unwrap();
        complete(
            &fetcher.state,
            StaleWritePolicy::Discard,
            ResourceKind::Todos,
            superseded,
            Uuid::new_v4(),
            Ok(todos),
        );

        assert_eq!(fetcher.state(), switched);
        assert!(!fetcher.state().has_fetched);
        assert_eq!(fetcher.observe(ResourceKind::Posts), Records::empty(ResourceKind::Posts));
    }

    #[tokio::test]
    async fn kind_reset_is_published_with_its_generation() {
        let mut fetcher = ResourceFetcher::new(PendingSource, ResourceKind::Todos);
        let mut rx = fetcher.subscribe();
        assert!(!rx.has_changed().unwrap());

        fetcher.observe(ResourceKind::Posts);

        assert!(rx.has_changed().unwrap());
        let published = rx.borrow_and_update().clone();
        assert_eq!(published.generation, 2);
        assert_eq!(published.phase, Phase::Fetching);
        assert_eq!(published.kind(), ResourceKind::Posts);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn discard_never_exposes_records_of_another_kind() {
        let source = StaticSource::new(vec![
            (ResourceKind::Todos, Ok(todo_payload())),
            (ResourceKind::Posts, Ok(json!([{"userId": 1, "id": 1, "title": "p", "body": "b"}]))),
        ]);
        let mut fetcher = ResourceFetcher::new(source, ResourceKind::Todos);

        for round in 0..200 {
            let kind = ResourceKind::ALL[round % 2];
            fetcher.observe(kind);
            tokio::task::yield_now().await;
            let state = fetcher.state();
            assert!(!state.is_stale_for(state.selected), "round {round}: {state:?}");
            assert!(!state.is_stale_for(kind));
        }
    }

    #[test]
    fn stale_write_under_accept_leaves_has_fetched_unset() {
        let (state, _) = watch::channel(FetchState::fresh(ResourceKind::Posts, 2));
        let todos = Records::decode(ResourceKind::Todos, todo_payload()).unwrap();

        complete(&state, StaleWritePolicy::Accept, ResourceKind::Todos, 1, Uuid::new_v4(), Ok(todos));

        let current = state.borrow().clone();
        assert!(current.is_stale_for(ResourceKind::Posts));
        assert!(!current.has_fetched);
        assert!(current.fetched_at.is_some());
    }
}
