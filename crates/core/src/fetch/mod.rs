//! Async data loading primitives shared by every screen.
//!
//! [`FetchController`] owns a single producer and its loading/error/data
//! state, [`Paginator`] accumulates successive pages on top of one, and
//! [`Debouncer`] provides the trailing-edge timer used by the search types.

/// Trailing-edge timer.
pub mod debounce;
/// Single-producer fetch state.
pub mod controller;
/// Page accumulation on top of a controller.
pub mod paginator;

pub use controller::{FetchController, FetchState, Producer};
pub use debounce::Debouncer;
pub use paginator::{Page, PageProducer, PageState, Paginator};

/// Receiver that ticks whenever a component's observable state changes.
///
/// The value is a revision counter; only its changes are meaningful.
pub type Revisions = tokio::sync::watch::Receiver<u64>;
