//! The loading lifecycle of a single view.
//!
//! A view is keyed (a post id for the detail view, `()` for the lists). Every
//! time the key is set a new request starts and the view shows its loading
//! state. Requests are tagged with a generation, and only the response for
//! the newest generation may change what is shown, so a slow response for a
//! key the reader has already moved away from is dropped.

use std::{
	future::Future,
	sync::{Mutex, PoisonError},
};

use tokio::sync::watch;

/// Why a view failed to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
	/// The requested item does not exist.
	NotFound,
	/// Anything else, with the message to show.
	Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState<T> {
	Idle,
	Loading,
	Loaded(T),
	Failed(Failure),
}

/// Proof that a request was started, used to commit its result.
#[derive(Debug)]
#[must_use]
pub struct Ticket {
	generation: u64,
}

#[derive(Debug)]
struct Inner<K> {
	generation: u64,
	key: Option<K>,
}

/// Drives one view through `Idle`, `Loading`, and then `Loaded` or `Failed`.
#[derive(Debug)]
pub struct FetchController<K, T> {
	state: watch::Sender<FetchState<T>>,
	inner: Mutex<Inner<K>>,
}

impl<K, T> Default for FetchController<K, T>
where
	K: Clone + PartialEq,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<K, T> FetchController<K, T>
where
	K: Clone + PartialEq,
{
	pub fn new() -> Self {
		Self {
			state: watch::Sender::new(FetchState::Idle),
			inner: Mutex::new(Inner {
				generation: 0,
				key: None,
			}),
		}
	}

	pub fn borrow(&self) -> watch::Ref<'_, FetchState<T>> {
		self.state.borrow()
	}

	pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
		self.state.subscribe()
	}

	/// The key of the request most recently started.
	pub fn key(&self) -> Option<K> {
		self.lock().key.clone()
	}

	/// Starts a request for `key`. Every ticket issued before this one is
	/// invalidated.
	pub fn begin(&self, key: K) -> Ticket {
		let mut inner = self.lock();

		inner.generation += 1;
		inner.key = Some(key);
		self.state.send_replace(FetchState::Loading);

		Ticket {
			generation: inner.generation,
		}
	}

	/// Commits the outcome of a request, returning whether it was applied.
	///
	/// Outcomes for superseded tickets are discarded.
	pub fn commit(&self, ticket: Ticket, result: Result<T, Failure>) -> bool {
		let inner = self.lock();

		if ticket.generation != inner.generation {
			tracing::debug!(
				ticket = ticket.generation,
				current = inner.generation,
				"discarding stale response"
			);

			return false;
		}

		self.state.send_replace(match result {
			Ok(data) => FetchState::Loaded(data),
			Err(failure) => FetchState::Failed(failure),
		});

		true
	}

	/// Runs `fetch` for `key` and commits its outcome.
	pub async fn load<F, Fut>(&self, key: K, fetch: F) -> bool
	where
		F: FnOnce(K) -> Fut,
		Fut: Future<Output = Result<T, Failure>>,
	{
		let ticket = self.begin(key.clone());
		let result = fetch(key).await;

		self.commit(ticket, result)
	}

	/// Like [`Self::load`], but does nothing when `key` is already the
	/// current key.
	pub async fn set_key<F, Fut>(&self, key: K, fetch: F) -> bool
	where
		F: FnOnce(K) -> Fut,
		Fut: Future<Output = Result<T, Failure>>,
	{
		if self.lock().key.as_ref() == Some(&key) {
			return false;
		}

		self.load(key, fetch).await
	}

	/// Loads the current key again. This is the only way out of `Failed`
	/// other than changing the key.
	pub async fn reload<F, Fut>(&self, fetch: F) -> bool
	where
		F: FnOnce(K) -> Fut,
		Fut: Future<Output = Result<T, Failure>>,
	{
		let Some(key) = self.key() else {
			return false;
		};

		self.load(key, fetch).await
	}

	/// Invalidates any request in flight and returns to `Idle`.
	pub fn teardown(&self) {
		let mut inner = self.lock();

		inner.generation += 1;
		inner.key = None;
		self.state.send_replace(FetchState::Idle);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner<K>> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[cfg(test)]
mod test {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	};

	use tokio::sync::oneshot;

	use super::*;

	fn dropped(_: oneshot::error::RecvError) -> Failure {
		Failure::Other("dropped".into())
	}

	#[test]
	fn test_starts_idle() {
		let controller = FetchController::<u32, ()>::new();

		assert_eq!(*controller.borrow(), FetchState::Idle);
		assert_eq!(controller.key(), None);
	}

	#[test]
	fn test_begin_enters_loading() {
		let controller = FetchController::<u32, ()>::new();
		let _ticket = controller.begin(1);

		assert_eq!(*controller.borrow(), FetchState::Loading);
		assert_eq!(controller.key(), Some(1));
	}

	#[test]
	fn test_stale_ticket_is_discarded() {
		let controller = FetchController::new();

		let first = controller.begin(1);
		let second = controller.begin(2);

		assert!(controller.commit(second, Ok("two")));
		assert!(!controller.commit(first, Ok("one")));
		assert_eq!(*controller.borrow(), FetchState::Loaded("two"));
	}

	#[tokio::test]
	async fn test_last_key_wins() {
		let controller = Arc::new(FetchController::new());
		let (first_tx, first_rx) = oneshot::channel();
		let (second_tx, second_rx) = oneshot::channel();

		let first = tokio::spawn({
			let controller = controller.clone();
			async move {
				controller
					.load(1, |_| async move { first_rx.await.map_err(dropped) })
					.await
			}
		});

		while controller.key() != Some(1) {
			tokio::task::yield_now().await;
		}

		let second = tokio::spawn({
			let controller = controller.clone();
			async move {
				controller
					.load(2, |_| async move { second_rx.await.map_err(dropped) })
					.await
			}
		});

		while controller.key() != Some(2) {
			tokio::task::yield_now().await;
		}

		second_tx.send("two").unwrap();
		assert!(second.await.unwrap());

		// the first key completes last
		first_tx.send("one").unwrap();
		assert!(!first.await.unwrap());

		assert_eq!(*controller.borrow(), FetchState::Loaded("two"));
	}

	#[tokio::test]
	async fn test_failure_is_terminal_until_reload() {
		let controller = FetchController::new();
		let calls = AtomicUsize::new(0);

		let fetch = |fail: bool| {
			let calls = &calls;
			move |key: u32| async move {
				calls.fetch_add(1, Ordering::SeqCst);

				if fail {
					Err(Failure::Other("failed to fetch posts".into()))
				} else {
					Ok(key * 10)
				}
			}
		};

		controller.load(1, fetch(true)).await;

		assert_eq!(
			*controller.borrow(),
			FetchState::Failed(Failure::Other("failed to fetch posts".into()))
		);

		// same key again is not a new request
		assert!(!controller.set_key(1, fetch(false)).await);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(matches!(*controller.borrow(), FetchState::Failed(..)));

		assert!(controller.reload(fetch(false)).await);
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(*controller.borrow(), FetchState::Loaded(10));

		assert!(controller.set_key(2, fetch(false)).await);
		assert_eq!(*controller.borrow(), FetchState::Loaded(20));
	}

	#[test]
	fn test_teardown_discards_in_flight() {
		let controller = FetchController::new();
		let ticket = controller.begin(1);

		controller.teardown();

		assert!(!controller.commit(ticket, Ok(())));
		assert_eq!(*controller.borrow(), FetchState::Idle);
		assert_eq!(controller.key(), None);
	}
}
