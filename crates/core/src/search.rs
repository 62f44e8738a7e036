//! Query-driven movie lists.
//!
//! [`DebouncedSearch`] turns keystrokes into a committed query feeding an
//! infinitely scrolling [`Paginator`]. [`QuickSearch`] is the single-page
//! variant used by the search screen.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    catalog::{BoxFuture, MovieCatalog},
    fetch::{
        Debouncer, FetchController, FetchState, Page, PageProducer, PageState, Paginator,
        Producer, Revisions,
    },
    models::Movie,
};

/// Quiet period before a [`DebouncedSearch`] commits its query.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet period before a [`QuickSearch`] runs.
pub const DEFAULT_QUICK_SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// First page requested by a [`DebouncedSearch`].
pub const FIRST_PAGE: u32 = 1;

/// Raw and committed query text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    /// Query as typed.
    pub raw: String,
    /// Query the results belong to.
    pub committed: String,
}

/// Debounces a raw query into a committed one and pages results for it.
///
/// An empty committed query lists popular movies. Committing a different
/// query resets the paginator before page one is fetched for it.
pub struct DebouncedSearch {
    shared: Arc<SearchShared>,
    debouncer: Debouncer,
}

struct SearchShared {
    queries: Arc<Mutex<QueryState>>,
    paginator: Paginator<Movie>,
}

impl DebouncedSearch {
    /// Start listing results for `initial_query` right away.
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        initial_query: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let initial_query = initial_query.into();
        let queries = Arc::new(Mutex::new(QueryState {
            raw: initial_query.clone(),
            committed: initial_query,
        }));

        let producer: PageProducer<Movie> = {
            let queries = Arc::clone(&queries);
            Arc::new(move |page: u32| -> BoxFuture<'static, anyhow::Result<Page<Movie>>> {
                let catalog = Arc::clone(&catalog);
                let query = queries.lock().committed.clone();
                Box::pin(async move {
                    let movies = catalog.fetch_movies(&query, page).await?;
                    Ok(Page::from(movies))
                })
            })
        };

        Self {
            shared: Arc::new(SearchShared {
                queries,
                paginator: Paginator::new(producer, FIRST_PAGE),
            }),
            debouncer: Debouncer::new(delay),
        }
    }

    /// Record the typed query and restart the debounce window.
    pub fn set_query(&self, raw: impl Into<String>) {
        let raw = raw.into();
        {
            let mut queries = self.shared.queries.lock();
            if queries.raw == raw {
                return;
            }
            queries.raw = raw;
        }
        let weak: Weak<SearchShared> = Arc::downgrade(&self.shared);
        self.debouncer.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                shared.commit();
            }
        });
    }

    /// Query as typed.
    pub fn query(&self) -> String {
        self.shared.queries.lock().raw.clone()
    }

    /// Query the current results belong to.
    pub fn committed_query(&self) -> String {
        self.shared.queries.lock().committed.clone()
    }

    /// Typed text has not been committed yet.
    pub fn is_searching(&self) -> bool {
        let queries = self.shared.queries.lock();
        queries.raw != queries.committed
    }

    /// Copy of the paged results.
    pub fn snapshot(&self) -> PageState<Movie> {
        self.shared.paginator.snapshot()
    }

    /// Fetch the next page for the committed query.
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        self.shared.paginator.load_more()
    }

    /// Retry a failed page, or reload the committed query from the first page.
    pub fn refresh(&self) -> JoinHandle<()> {
        self.shared.paginator.refresh()
    }

    /// Drop accumulated results and start over from the first page.
    pub fn reset(&self) -> Option<JoinHandle<()>> {
        self.shared.paginator.reset()
    }

    /// Subscribe to result changes.
    pub fn subscribe(&self) -> Revisions {
        self.shared.paginator.subscribe()
    }
}

impl SearchShared {
    fn commit(&self) {
        let query = {
            let mut queries = self.queries.lock();
            if queries.committed == queries.raw {
                return;
            }
            queries.committed = queries.raw.clone();
            queries.committed.clone()
        };
        info!(%query, "search committed");
        self.paginator.restart();
    }
}

/// Single-page search that runs once typing pauses.
///
/// A non-empty query is fetched; an empty one clears the results.
pub struct QuickSearch {
    shared: Arc<QuickShared>,
    debouncer: Debouncer,
}

struct QuickShared {
    query: Arc<Mutex<String>>,
    controller: FetchController<Vec<Movie>>,
}

impl QuickSearch {
    /// Create a quick search and schedule its first evaluation.
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        initial_query: impl Into<String>,
        delay: Duration,
    ) -> Self {
        let query = Arc::new(Mutex::new(initial_query.into()));
        let producer: Producer<Vec<Movie>> = {
            let query = Arc::clone(&query);
            Arc::new(move || -> BoxFuture<'static, anyhow::Result<Vec<Movie>>> {
                let catalog = Arc::clone(&catalog);
                let query = query.lock().clone();
                Box::pin(async move {
                    let page = catalog.fetch_movies(&query, 1).await?;
                    Ok(page.results)
                })
            })
        };

        let search = Self {
            shared: Arc::new(QuickShared {
                query,
                controller: FetchController::new(producer, false),
            }),
            debouncer: Debouncer::new(delay),
        };
        search.schedule();
        search
    }

    /// Replace the query and restart the timer.
    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        {
            let mut current = self.shared.query.lock();
            if *current == query {
                return;
            }
            *current = query;
        }
        self.schedule();
    }

    fn schedule(&self) {
        let weak: Weak<QuickShared> = Arc::downgrade(&self.shared);
        self.debouncer.schedule(move || {
            if let Some(shared) = weak.upgrade() {
                shared.evaluate();
            }
        });
    }

    /// Current query text.
    pub fn query(&self) -> String {
        self.shared.query.lock().clone()
    }

    /// A query change is waiting for its timer.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Copy of the fetch state.
    pub fn snapshot(&self) -> FetchState<Vec<Movie>> {
        self.shared.controller.snapshot()
    }

    /// Run the current query again.
    pub fn refetch(&self) -> JoinHandle<()> {
        self.shared.controller.refetch()
    }

    /// Subscribe to result changes.
    pub fn subscribe(&self) -> Revisions {
        self.shared.controller.subscribe()
    }
}

impl QuickShared {
    fn evaluate(&self) {
        let empty = self.query.lock().is_empty();
        if empty {
            debug!("quick search cleared");
            self.controller.reset();
        } else {
            self.controller.refetch();
        }
    }
}
