//! Async fetch/mutation state for the event loop.
//!
//! `Query<T>` encapsulates a re-runnable read (snippet lists, AI
//! explanations): loading state, error handling and channel-based
//! completion, polled from the view's tick. `Mutation<T>` is its one-shot
//! write-side sibling (saves, logins, deletes): it guards against
//! concurrent runs and hands back the finished value exactly once.
//!
//! # Example
//!
//! ```ignore
//! let store = store_client.clone();
//! let mut query = Query::new(move || {
//!     let store = store.clone();
//!     async move { store.list(&owner, &filter).await.map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//!
//! // In the view's tick
//! if query.poll() {
//!     // State changed, next render shows it
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, String>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function. The fetcher is
  /// called each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
    }
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error message if the query failed.
  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  ///
  /// This is a no-op if the query is already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Ignore any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

/// One-shot guarded async action.
///
/// Unlike `Query`, the future is supplied per run (a save carries the
/// field values as of the moment it fires) and the finished value is
/// handed back exactly once by `poll()`. While a run is in flight,
/// `start` refuses to begin another: at most one mutation per owner.
pub struct Mutation<T> {
  receiver: Option<mpsc::UnboundedReceiver<T>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self { receiver: None }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn idle() -> Self {
    Self::default()
  }

  /// Whether a run is in flight.
  pub fn is_running(&self) -> bool {
    self.receiver.is_some()
  }

  /// Start the given future unless one is already running.
  /// Returns false (and drops the future unrun) if busy.
  pub fn start<Fut>(&mut self, future: Fut) -> bool
  where
    Fut: Future<Output = T> + Send + 'static,
  {
    if self.receiver.is_some() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });

    true
  }

  /// Take the finished value, if the run has completed. Returns None
  /// while still running or when idle.
  pub fn poll(&mut self) -> Option<T> {
    let receiver = self.receiver.as_mut()?;

    match receiver.try_recv() {
      Ok(value) => {
        self.receiver = None;
        Some(value)
      }
      Err(mpsc::error::TryRecvError::Empty) => None,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        None
      }
    }
  }
}

impl<T> std::fmt::Debug for Mutation<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("running", &self.receiver.is_some())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    // Wait for the result
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32> = Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("Something went wrong"));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());

    // Second fetch should be no-op
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_supersedes_pending() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Refetch should supersede the first fetch
    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second fetch's result should have been received
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_mutation_delivers_once() {
    let mut mutation: Mutation<u32> = Mutation::idle();
    assert!(!mutation.is_running());

    assert!(mutation.start(async { 7 }));
    assert!(mutation.is_running());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(mutation.poll(), Some(7));
    assert!(!mutation.is_running());
    assert_eq!(mutation.poll(), None);
  }

  #[tokio::test]
  async fn test_mutation_guards_concurrent_runs() {
    let mut mutation: Mutation<u32> = Mutation::idle();

    assert!(mutation.start(async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      1
    }));
    // A second start while in flight is refused
    assert!(!mutation.start(async { 2 }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mutation.poll(), Some(1));

    // Once settled, a new run is allowed
    assert!(mutation.start(async { 3 }));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(mutation.poll(), Some(3));
  }
}
