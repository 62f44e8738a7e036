use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    catalog::BoxFuture,
    error::ApiError,
    models::{Movie, MoviePage},
};

use super::{FetchController, Producer, Revisions};

/// One page handed to a [`Paginator`].
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Items on this page, in catalog order.
    pub items: Vec<T>,
    /// Total pages for the query, when the source reports it.
    pub total_pages: Option<u32>,
}

impl<T> Page<T> {
    /// A page from a source that does not report totals.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            total_pages: None,
        }
    }
}

impl From<MoviePage> for Page<Movie> {
    fn from(page: MoviePage) -> Self {
        Self {
            items: page.results,
            total_pages: (page.total_pages > 0).then_some(page.total_pages),
        }
    }
}

/// Async function producing the page with the given number.
pub type PageProducer<T> =
    Arc<dyn Fn(u32) -> BoxFuture<'static, anyhow::Result<Page<T>>> + Send + Sync>;

/// Observable state of a [`Paginator`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageState<T> {
    /// Page the paginator is on (or loading).
    pub current_page: u32,
    /// All items received since the last reset.
    pub items: Vec<T>,
    /// Whether [`Paginator::load_more`] may fetch another page.
    pub has_more: bool,
    /// Total pages reported by the most recent page, if any.
    pub total_pages: Option<u32>,
    /// A page request is in flight.
    pub loading: bool,
    /// Failure of the most recent page request.
    pub error: Option<ApiError>,
}

#[derive(Debug)]
struct Pages<T> {
    initial_page: u32,
    current_page: u32,
    items: Vec<T>,
    /// Index in `items` where the current page begins.
    page_start: usize,
    has_more: bool,
    total_pages: Option<u32>,
}

impl<T: Clone> Pages<T> {
    fn new(initial_page: u32) -> Self {
        Self {
            initial_page,
            current_page: initial_page,
            items: Vec::new(),
            page_start: 0,
            has_more: true,
            total_pages: None,
        }
    }

    fn accept(&mut self, page: &Page<T>) {
        if self.current_page == self.initial_page {
            self.items = page.items.clone();
        } else {
            // A repeated fetch of this page replaces what it appended before.
            self.items.truncate(self.page_start);
            self.items.extend(page.items.iter().cloned());
        }
        self.total_pages = page.total_pages;
        // Exact when the source reports totals, otherwise "non-empty means maybe more".
        self.has_more = !page.items.is_empty()
            && page
                .total_pages
                .map_or(true, |total| self.current_page < total);
        debug!(
            page = self.current_page,
            received = page.items.len(),
            total = self.items.len(),
            has_more = self.has_more,
            "page accepted"
        );
    }

    fn advance(&mut self) -> u32 {
        self.current_page += 1;
        self.page_start = self.items.len();
        self.current_page
    }

    fn clear(&mut self) {
        self.current_page = self.initial_page;
        self.items.clear();
        self.page_start = 0;
        self.has_more = true;
        self.total_pages = None;
    }
}

/// Accumulates successive pages from a [`PageProducer`].
///
/// Fetches the initial page on construction. Must be used inside a tokio
/// runtime.
pub struct Paginator<T> {
    pages: Arc<Mutex<Pages<T>>>,
    controller: FetchController<Page<T>>,
    /// Held across page moves so the page number and the dependency
    /// fingerprint change together. Taken before any other lock.
    paging: Mutex<()>,
}

impl<T> Paginator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start paging from `initial_page`.
    pub fn new(producer: PageProducer<T>, initial_page: u32) -> Self {
        let pages = Arc::new(Mutex::new(Pages::new(initial_page)));

        let fetch: Producer<Page<T>> = {
            let pages = Arc::clone(&pages);
            Arc::new(move || -> BoxFuture<'static, anyhow::Result<Page<T>>> {
                let page = pages.lock().current_page;
                producer(page)
            })
        };
        let observer = {
            let pages = Arc::clone(&pages);
            move |page: &Page<T>| pages.lock().accept(page)
        };

        let controller = FetchController::with_observer(fetch, true, observer);
        controller.set_dependencies(&initial_page);
        Self {
            pages,
            controller,
            paging: Mutex::new(()),
        }
    }

    /// Fetch the next page unless one is loading or the end was reached.
    ///
    /// Returns the handle of the issued fetch, or `None` when nothing was issued.
    pub fn load_more(&self) -> Option<JoinHandle<()>> {
        let _paging = self.paging.lock();
        if self.controller.is_loading() {
            return None;
        }
        let next = {
            let mut pages = self.pages.lock();
            if !pages.has_more {
                return None;
            }
            pages.advance()
        };
        info!(page = next, "loading more");
        self.controller.set_dependencies(&next)
    }

    /// Back to the initial page with no items.
    ///
    /// Moving the page number back re-fetches the initial page; the handle of
    /// that fetch is returned. When already on the initial page nothing is
    /// fetched.
    pub fn reset(&self) -> Option<JoinHandle<()>> {
        let _paging = self.paging.lock();
        self.rewind()
    }

    /// Back to the initial page and fetch it, even when already there.
    pub fn restart(&self) -> JoinHandle<()> {
        let _paging = self.paging.lock();
        self.rewind_and_fetch()
    }

    /// Reload the list.
    ///
    /// After a failed request the failing page is retried in place. Otherwise
    /// the list starts over from the initial page.
    pub fn refresh(&self) -> JoinHandle<()> {
        let _paging = self.paging.lock();
        if self.controller.snapshot().error.is_some() {
            return self.controller.refetch();
        }
        self.rewind_and_fetch()
    }

    /// Fetch the current page again, replacing the items it contributed.
    pub fn refetch(&self) -> JoinHandle<()> {
        self.controller.refetch()
    }

    fn rewind_and_fetch(&self) -> JoinHandle<()> {
        self.rewind().unwrap_or_else(|| self.controller.refetch())
    }

    fn rewind(&self) -> Option<JoinHandle<()>> {
        let initial = {
            let mut pages = self.pages.lock();
            pages.clear();
            pages.initial_page
        };
        self.controller.reset();
        self.controller.set_dependencies(&initial)
    }

    /// Page currently shown or loading.
    pub fn current_page(&self) -> u32 {
        self.pages.lock().current_page
    }

    /// Copy of the accumulated state.
    pub fn snapshot(&self) -> PageState<T> {
        let fetch = self.controller.snapshot();
        let pages = self.pages.lock();
        PageState {
            current_page: pages.current_page,
            items: pages.items.clone(),
            has_more: pages.has_more,
            total_pages: pages.total_pages,
            loading: fetch.loading,
            error: fetch.error,
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> Revisions {
        self.controller.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, sync::Barrier, time::Duration};

    use tokio::time::sleep;

    /// Serves fixed pages after a short delay and records every requested page.
    #[derive(Clone, Default)]
    struct FakePages {
        pages: Arc<HashMap<u32, Page<&'static str>>>,
        requested: Arc<Mutex<Vec<u32>>>,
    }

    impl FakePages {
        fn new(pages: Vec<(u32, Page<&'static str>)>) -> Self {
            Self {
                pages: Arc::new(pages.into_iter().collect()),
                requested: Arc::default(),
            }
        }

        fn producer(&self) -> PageProducer<&'static str> {
            let fake = self.clone();
            Arc::new(move |page: u32| -> BoxFuture<'static, anyhow::Result<Page<&'static str>>> {
                fake.requested.lock().push(page);
                let result = fake
                    .pages
                    .get(&page)
                    .cloned()
                    .unwrap_or_else(|| Page::new(Vec::new()));
                Box::pin(async move {
                    sleep(Duration::from_millis(10)).await;
                    Ok(result)
                })
            })
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pages_accumulate_in_order() {
        let fake = FakePages::new(vec![
            (1, Page::new(vec!["a", "b"])),
            (2, Page::new(vec!["c", "d"])),
        ]);
        let paginator = Paginator::new(fake.producer(), 1);
        assert!(paginator.snapshot().loading);

        sleep(Duration::from_millis(20)).await;
        let state = paginator.snapshot();
        assert_eq!(state.items, vec!["a", "b"]);
        assert_eq!(state.current_page, 1);
        assert!(state.has_more);

        paginator.load_more().expect("second page requested").await.unwrap();
        let state = paginator.snapshot();
        assert_eq!(state.items, vec!["a", "b", "c", "d"]);
        assert_eq!(state.current_page, 2);
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_page_ends_pagination() {
        let fake = FakePages::new(vec![(1, Page::new(vec!["a"])), (2, Page::new(vec![]))]);
        let paginator = Paginator::new(fake.producer(), 1);
        sleep(Duration::from_millis(20)).await;

        paginator.load_more().expect("second page requested").await.unwrap();
        let state = paginator.snapshot();
        assert!(!state.has_more);
        assert_eq!(state.items, vec!["a"]);

        assert!(paginator.load_more().is_none());
        sleep(Duration::from_millis(20)).await;
        assert_eq!(fake.requested(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_is_ignored_while_loading() {
        let fake = FakePages::new(vec![(1, Page::new(vec!["a"]))]);
        let paginator = Paginator::new(fake.producer(), 1);
        assert!(paginator.load_more().is_none());
        sleep(Duration::from_millis(20)).await;
        assert_eq!(fake.requested(), vec![1]);
        assert_eq!(paginator.current_page(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reported_totals_make_has_more_exact() {
        let fake = FakePages::new(vec![
            (
                1,
                Page {
                    items: vec!["a"],
                    total_pages: Some(2),
                },
            ),
            (
                2,
                Page {
                    items: vec!["b"],
                    total_pages: Some(2),
                },
            ),
        ]);
        let paginator = Paginator::new(fake.producer(), 1);
        sleep(Duration::from_millis(20)).await;
        assert!(paginator.snapshot().has_more);

        paginator.load_more().expect("second page requested").await.unwrap();
        let state = paginator.snapshot();
        assert_eq!(state.total_pages, Some(2));
        assert!(!state.has_more);
        assert!(paginator.load_more().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn reset_returns_to_initial_page() {
        let fake = FakePages::new(vec![
            (1, Page::new(vec!["a"])),
            (2, Page::new(vec!["b"])),
        ]);
        let paginator = Paginator::new(fake.producer(), 1);
        sleep(Duration::from_millis(20)).await;
        paginator.load_more().expect("second page requested").await.unwrap();

        let refetch = paginator.reset().expect("page change re-fetches");
        let state = paginator.snapshot();
        assert_eq!(state.current_page, 1);
        assert!(state.items.is_empty());
        assert!(state.has_more);
        assert!(state.loading);

        refetch.await.unwrap();
        assert_eq!(paginator.snapshot().items, vec!["a"]);
        assert_eq!(fake.requested(), vec![1, 2, 1]);

        assert!(paginator.reset().is_none());
        assert!(paginator.snapshot().items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn refetching_a_later_page_replaces_its_items() {
        let fake = FakePages::new(vec![
            (1, Page::new(vec!["a", "b"])),
            (2, Page::new(vec!["c", "d"])),
        ]);
        let paginator = Paginator::new(fake.producer(), 1);
        sleep(Duration::from_millis(20)).await;
        paginator.load_more().expect("second page requested").await.unwrap();

        paginator.refetch().await.unwrap();
        let state = paginator.snapshot();
        assert_eq!(state.items, vec!["a", "b", "c", "d"]);
        assert_eq!(state.current_page, 2);
        assert_eq!(fake.requested(), vec![1, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_starts_over_from_the_initial_page() {
        let fake = FakePages::new(vec![
            (1, Page::new(vec!["a", "b"])),
            (2, Page::new(vec!["c", "d"])),
        ]);
        let paginator = Paginator::new(fake.producer(), 1);
        sleep(Duration::from_millis(20)).await;
        paginator.load_more().expect("second page requested").await.unwrap();

        paginator.refresh().await.unwrap();
        let state = paginator.snapshot();
        assert_eq!(state.items, vec!["a", "b"]);
        assert_eq!(state.current_page, 1);

        paginator.refresh().await.unwrap();
        assert_eq!(paginator.snapshot().items, vec!["a", "b"]);
        assert_eq!(fake.requested(), vec![1, 2, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_retries_a_failed_page_in_place() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let producer: PageProducer<u32> = {
            let requested = Arc::clone(&requested);
            Arc::new(move |page: u32| -> BoxFuture<'static, anyhow::Result<Page<u32>>> {
                let attempt = {
                    let mut requested = requested.lock();
                    requested.push(page);
                    requested.iter().filter(|p| **p == page).count()
                };
                Box::pin(async move {
                    if page == 2 && attempt == 1 {
                        Err(ApiError::http(500, Some("Internal Server Error")).into())
                    } else {
                        Ok(Page::new(vec![page * 10, page * 10 + 1]))
                    }
                })
            })
        };
        let paginator = Paginator::new(producer, 1);
        sleep(Duration::from_millis(1)).await;
        paginator.load_more().expect("second page requested").await.unwrap();
        let state = paginator.snapshot();
        assert!(state.error.is_some());
        assert_eq!(state.items, vec![10, 11]);

        paginator.refresh().await.unwrap();
        let state = paginator.snapshot();
        assert_eq!(state.error, None);
        assert_eq!(state.current_page, 2);
        assert_eq!(state.items, vec![10, 11, 20, 21]);
        assert_eq!(*requested.lock(), vec![1, 2, 2]);
    }

    async fn settle<T: Clone + Send + Sync + 'static>(paginator: &Paginator<T>) {
        while paginator.snapshot().loading {
            sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_racing_load_more_never_skips_a_page() {
        let producer: PageProducer<u32> =
            Arc::new(|page: u32| -> BoxFuture<'static, anyhow::Result<Page<u32>>> {
                Box::pin(async move { Ok(Page::new(vec![page])) })
            });

        for _ in 0..100 {
            let paginator = Arc::new(Paginator::new(Arc::clone(&producer), 1));
            settle(&paginator).await;

            let barrier = Arc::new(Barrier::new(2));
            let racers = [true, false].map(|more| {
                let paginator = Arc::clone(&paginator);
                let barrier = Arc::clone(&barrier);
                tokio::task::spawn_blocking(move || {
                    barrier.wait();
                    if more {
                        paginator.load_more();
                    } else {
                        paginator.reset();
                    }
                })
            });
            for racer in racers {
                racer.await.unwrap();
            }
            settle(&paginator).await;

            let page = paginator.current_page();
            paginator.load_more().expect("next page requested").await.unwrap();
            let state = paginator.snapshot();
            assert_eq!(state.current_page, page + 1);
            assert_eq!(state.items.last(), Some(&(page + 1)));
        }
    }

    #[tokio::test]
    async fn movie_pages_carry_totals() {
        let page = Page::from(MoviePage {
            page: 1,
            results: vec![Movie::default()],
            total_pages: 0,
            total_results: 0,
        });
        assert_eq!(page.total_pages, None);
        assert_eq!(page.items.len(), 1);
    }
}
