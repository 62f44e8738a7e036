use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
};
use tracing::debug;

use crate::{catalog::BoxFuture, error::ApiError};

use super::Revisions;

/// Zero-argument async function whose result a [`FetchController`] tracks.
pub type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Observable state of a [`FetchController`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    /// Last successfully fetched value. Kept while a newer request is loading.
    pub data: Option<T>,
    /// A request is in flight.
    pub loading: bool,
    /// Failure of the most recent request, if it failed.
    pub error: Option<ApiError>,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Wraps one async producer with loading/error/data state.
///
/// Every issued request gets a sequence number and only the most recently
/// issued one may write its result; older in-flight requests are aborted.
/// Dropping the controller aborts whatever is in flight and silences any
/// write that races with the drop. Must be used inside a tokio runtime.
pub struct FetchController<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    producer: Producer<T>,
    auto_fetch: bool,
    observer: Option<Observer<T>>,
    live: AtomicBool,
    inner: Mutex<Inner<T>>,
    revision: watch::Sender<u64>,
}

struct Inner<T> {
    state: FetchState<T>,
    issued: u64,
    in_flight: Option<AbortHandle>,
    dependencies: Option<u64>,
}

impl<T> FetchController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a controller, fetching once immediately when `auto_fetch` is set.
    pub fn new(producer: Producer<T>, auto_fetch: bool) -> Self {
        Self::build(producer, auto_fetch, None)
    }

    /// Like [`FetchController::new`], additionally calling `observer` with every
    /// result that is accepted into state, before the state itself is updated.
    ///
    /// `observer` runs while the state is locked and must not call back into
    /// this controller. The producer carries no such restriction.
    pub fn with_observer(
        producer: Producer<T>,
        auto_fetch: bool,
        observer: impl Fn(&T) + Send + Sync + 'static,
    ) -> Self {
        Self::build(producer, auto_fetch, Some(Arc::new(observer)))
    }

    fn build(producer: Producer<T>, auto_fetch: bool, observer: Option<Observer<T>>) -> Self {
        let (revision, _) = watch::channel(0);
        let controller = Self {
            shared: Arc::new(Shared {
                producer,
                auto_fetch,
                observer,
                live: AtomicBool::new(true),
                inner: Mutex::new(Inner {
                    state: FetchState::default(),
                    issued: 0,
                    in_flight: None,
                    dependencies: None,
                }),
                revision,
            }),
        };
        if auto_fetch {
            controller.refetch();
        }
        controller
    }

    /// Invoke the producer again.
    ///
    /// `loading` is raised and `error` cleared immediately; `data` is kept
    /// until the new result arrives. The returned handle resolves once the
    /// result has been applied (or discarded).
    pub fn refetch(&self) -> JoinHandle<()> {
        Shared::issue(&self.shared)
    }

    /// Clear data and error and drop the loading flag.
    ///
    /// In-flight requests are left running; if one is still the latest issued
    /// it will write its result when it resolves.
    pub fn reset(&self) {
        self.shared.update(|inner| {
            inner.state = FetchState::default();
        });
    }

    /// Record the caller's dependency values, re-fetching when they changed.
    ///
    /// The first call only records the values, since construction already
    /// fetched for them. Returns the handle of the triggered fetch, if any.
    pub fn set_dependencies<D: Hash + ?Sized>(&self, dependencies: &D) -> Option<JoinHandle<()>> {
        let mut hasher = DefaultHasher::new();
        dependencies.hash(&mut hasher);
        let fingerprint = hasher.finish();

        let previous = self.shared.inner.lock().dependencies.replace(fingerprint);
        match previous {
            Some(previous) if previous != fingerprint && self.shared.auto_fetch => {
                Some(self.refetch())
            }
            _ => None,
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FetchState<T> {
        self.shared.inner.lock().state.clone()
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.inner.lock().state.loading
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> Revisions {
        self.shared.revision.subscribe()
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn issue(this: &Arc<Self>) -> JoinHandle<()> {
        let sequence = {
            let mut inner = this.inner.lock();
            inner.issued += 1;
            if this.live.load(Ordering::SeqCst) {
                inner.state.loading = true;
                inner.state.error = None;
            }
            inner.issued
        };

        // Called unlocked: producers may read their own controller.
        let future = (this.producer)();
        let weak: Weak<Self> = Arc::downgrade(this);
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ApiError::unknown().into()));
            if let Some(shared) = weak.upgrade() {
                shared.complete(sequence, outcome);
            }
        });

        {
            let mut inner = this.inner.lock();
            if inner.issued == sequence {
                if let Some(previous) = inner.in_flight.replace(handle.abort_handle()) {
                    previous.abort();
                }
            } else {
                debug!(sequence, latest = inner.issued, "superseded before it started");
                handle.abort();
            }
        }
        this.bump();
        debug!(sequence, "fetch issued");
        handle
    }

    fn complete(&self, sequence: u64, outcome: anyhow::Result<T>) {
        self.update(|inner| {
            if inner.issued != sequence {
                debug!(sequence, latest = inner.issued, "discarding stale fetch result");
                return;
            }
            inner.in_flight = None;
            match outcome {
                Ok(value) => {
                    if let Some(observer) = &self.observer {
                        observer(&value);
                    }
                    inner.state.data = Some(value);
                }
                Err(err) => {
                    let error = ApiError::normalize(err);
                    debug!(sequence, %error, "fetch failed");
                    inner.state.error = Some(error);
                }
            }
            inner.state.loading = false;
        });
    }

    /// Apply `change` unless the owner has been torn down.
    fn update(&self, change: impl FnOnce(&mut Inner<T>)) {
        if !self.live.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut inner = self.inner.lock();
            if !self.live.load(Ordering::SeqCst) {
                return;
            }
            change(&mut inner);
        }
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }
}

impl<T> Drop for FetchController<T> {
    fn drop(&mut self) {
        self.shared.live.store(false, Ordering::SeqCst);
        if let Some(in_flight) = self.shared.inner.lock().in_flight.take() {
            in_flight.abort();
        }
    }
}
