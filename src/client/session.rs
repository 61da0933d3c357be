//! Client-side session state.
//!
//! A single [`SessionContext`] is created for the whole application. The
//! first call to [`SessionContext::use_session`] starts one background
//! observer of the [`SessionProvider`], and every consumer reads the same
//! [`SessionSnapshot`] through a [`SessionHandle`]. Consumers never ask the
//! provider themselves, so the current session is fetched once no matter how
//! many parts of the page need it.

use std::sync::{
	atomic::{AtomicU64, Ordering},
	Arc, OnceLock,
};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;
use tokio::{
	sync::{
		broadcast::{self, error::RecvError},
		watch,
	},
	task::JoinHandle,
};

use super::endpoint;
use crate::model;

/// Where the reader is sent after logging out.
pub const LANDING_PATH: &str = "/";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
	/// The provider has not answered yet.
	Unknown,
	Authenticated,
	Anonymous,
}

/// What consumers see of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
	pub is_loading: bool,
	pub session: Option<model::Session>,
}

impl SessionSnapshot {
	pub const UNKNOWN: Self = Self {
		is_loading: true,
		session: None,
	};

	pub fn known(session: Option<model::Session>) -> Self {
		Self {
			is_loading: false,
			session,
		}
	}

	pub fn status(&self) -> SessionStatus {
		match (self.is_loading, &self.session) {
			(true, _) => SessionStatus::Unknown,
			(false, Some(..)) => SessionStatus::Authenticated,
			(false, None) => SessionStatus::Anonymous,
		}
	}
}

/// A change announced by the provider.
#[derive(Debug, Clone)]
pub enum SessionEvent {
	SignedIn(model::Session),
	SignedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
	#[error("request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("provider responded with {0}")]
	Status(StatusCode),
	#[error("provider unavailable: {0}")]
	Unavailable(String),
}

/// Issues and validates sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync + 'static {
	/// Returns the current session, if any.
	async fn get_session(&self) -> Result<Option<model::Session>, ProviderError>;

	/// Subscribes to changes made after this call.
	fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

	async fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Moves the reader to another page.
pub trait Navigator: Send + Sync {
	fn navigate(&self, path: &str);
}

/// The application-wide session state.
pub struct SessionContext {
	provider: Arc<dyn SessionProvider>,
	shared: Arc<Shared>,
	observer: OnceLock<JoinHandle<()>>,
}

/// The published snapshot, and an epoch bumped by every change that does
/// not come from fetching the session.
///
/// A fetch only commits if the epoch is unchanged since it started, so a
/// slow answer can never undo a logout or a newer event.
struct Shared {
	state: watch::Sender<SessionSnapshot>,
	epoch: AtomicU64,
}

impl Shared {
	fn epoch(&self) -> u64 {
		self.epoch.load(Ordering::SeqCst)
	}

	fn set(&self, snapshot: SessionSnapshot) {
		self.state.send_modify(|state| {
			self.epoch.fetch_add(1, Ordering::SeqCst);
			*state = snapshot;
		});
	}

	fn commit_fetched(&self, epoch: u64, snapshot: SessionSnapshot) -> bool {
		self.state.send_if_modified(|state| {
			if self.epoch() != epoch {
				tracing::debug!("discarding session fetched before a newer change");
				return false;
			}

			*state = snapshot;
			true
		})
	}
}

/// A consumer's view of the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
	state: watch::Receiver<SessionSnapshot>,
}

impl SessionContext {
	pub fn new(provider: impl SessionProvider) -> Self {
		Self {
			provider: Arc::new(provider),
			shared: Arc::new(Shared {
				state: watch::Sender::new(SessionSnapshot::UNKNOWN),
				epoch: AtomicU64::new(0),
			}),
			observer: OnceLock::new(),
		}
	}

	/// Returns a handle to the session state, starting the observer on the
	/// first call. Must be called from within a Tokio runtime.
	pub fn use_session(&self) -> SessionHandle {
		self.observer.get_or_init(|| {
			tokio::spawn(observe(self.provider.clone(), self.shared.clone()))
		});

		SessionHandle {
			state: self.shared.state.subscribe(),
		}
	}

	/// Signs out and navigates to [`LANDING_PATH`].
	///
	/// The local state becomes anonymous even when the provider fails to
	/// sign out, so the reader is never left looking signed in. A session
	/// fetch still in flight is discarded when it lands.
	pub async fn logout(&self, navigator: &dyn Navigator) {
		if let Err(error) = self.provider.sign_out().await {
			tracing::warn!(%error, "remote sign-out failed, clearing local session anyway");
		}

		self.shared.set(SessionSnapshot::known(None));
		navigator.navigate(LANDING_PATH);
	}
}

impl Drop for SessionContext {
	fn drop(&mut self) {
		if let Some(observer) = self.observer.get() {
			observer.abort();
		}
	}
}

impl SessionHandle {
	pub fn snapshot(&self) -> SessionSnapshot {
		self.state.borrow().clone()
	}

	pub fn status(&self) -> SessionStatus {
		self.state.borrow().status()
	}

	/// Waits for the next change, returning `false` once the context is gone.
	pub async fn changed(&mut self) -> bool {
		self.state.changed().await.is_ok()
	}

	/// Waits until the provider has answered at least once.
	pub async fn wait_until_known(&mut self) -> SessionSnapshot {
		// a closed channel leaves the last value in place
		let _ = self.state.wait_for(|snapshot| !snapshot.is_loading).await;

		self.snapshot()
	}
}

async fn observe(provider: Arc<dyn SessionProvider>, shared: Arc<Shared>) {
	// subscribe first so nothing between the fetch and the loop is missed
	let mut events = provider.subscribe();

	refresh(provider.as_ref(), &shared).await;

	loop {
		match events.recv().await {
			Ok(SessionEvent::SignedIn(session)) => {
				shared.set(SessionSnapshot::known(Some(session)));
			}
			Ok(SessionEvent::SignedOut) => {
				shared.set(SessionSnapshot::known(None));
			}
			Err(RecvError::Lagged(skipped)) => {
				tracing::debug!(skipped, "session events lagged, refetching");
				refresh(provider.as_ref(), &shared).await;
			}
			Err(RecvError::Closed) => break,
		}
	}
}

async fn refresh(provider: &dyn SessionProvider, shared: &Shared) {
	let epoch = shared.epoch();
	let session = match provider.get_session().await {
		Ok(session) => session,
		Err(error) => {
			tracing::warn!(%error, "failed to fetch session, treating as signed out");
			None
		}
	};

	shared.commit_fetched(epoch, SessionSnapshot::known(session));
}

/// A [`SessionProvider`] backed by the `/auth` routes.
///
/// The client must keep cookies (see [`super::http_client`]), since the
/// session lives in a cookie.
#[derive(Debug)]
pub struct HttpSessionProvider {
	client: reqwest::Client,
	base: Url,
	events: broadcast::Sender<SessionEvent>,
}

impl HttpSessionProvider {
	pub fn new(client: reqwest::Client, base: Url) -> Self {
		let (events, _) = broadcast::channel(EVENT_CAPACITY);

		Self {
			client,
			base,
			events,
		}
	}

	pub async fn sign_in(&self, email: &str, password: &str) -> Result<model::Session, ProviderError> {
		let response = self
			.client
			.post(endpoint(&self.base, &["auth", "login"]))
			.json(&json!({ "email": email, "password": password }))
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ProviderError::Status(response.status()));
		}

		let session = response.json::<model::Session>().await?;

		// nobody listening is fine
		let _ = self.events.send(SessionEvent::SignedIn(session.clone()));

		Ok(session)
	}
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
	async fn get_session(&self) -> Result<Option<model::Session>, ProviderError> {
		let response = self
			.client
			.get(endpoint(&self.base, &["auth", "session"]))
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ProviderError::Status(response.status()));
		}

		Ok(response.json::<model::SessionState>().await?.session)
	}

	fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.events.subscribe()
	}

	async fn sign_out(&self) -> Result<(), ProviderError> {
		let response = self
			.client
			.post(endpoint(&self.base, &["auth", "logout"]))
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(ProviderError::Status(response.status()));
		}

		let _ = self.events.send(SessionEvent::SignedOut);

		Ok(())
	}
}

#[cfg(test)]
mod test {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Mutex,
	};

	use chrono::Utc;
	use tokio::sync::oneshot;
	use uuid::Uuid;

	use super::*;

	struct FakeProvider {
		calls: Arc<AtomicUsize>,
		answered: Arc<AtomicUsize>,
		session: Option<model::Session>,
		fail_sign_out: bool,
		/// Holds the next `get_session` until a value is sent.
		gate: Mutex<Option<oneshot::Receiver<()>>>,
		events: broadcast::Sender<SessionEvent>,
	}

	impl FakeProvider {
		fn new(session: Option<model::Session>) -> Self {
			Self {
				calls: Arc::default(),
				answered: Arc::default(),
				session,
				fail_sign_out: false,
				gate: Mutex::default(),
				events: broadcast::channel(EVENT_CAPACITY).0,
			}
		}
	}

	#[async_trait]
	impl SessionProvider for FakeProvider {
		async fn get_session(&self) -> Result<Option<model::Session>, ProviderError> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let gate = self.gate.lock().unwrap().take();

			if let Some(gate) = gate {
				let _ = gate.await;
			}

			self.answered.fetch_add(1, Ordering::SeqCst);
			Ok(self.session.clone())
		}

		fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
			self.events.subscribe()
		}

		async fn sign_out(&self) -> Result<(), ProviderError> {
			if self.fail_sign_out {
				return Err(ProviderError::Unavailable("offline".into()));
			}

			let _ = self.events.send(SessionEvent::SignedOut);
			Ok(())
		}
	}

	#[derive(Default)]
	struct Recorder(Mutex<Vec<String>>);

	impl Navigator for Recorder {
		fn navigate(&self, path: &str) {
			self.0.lock().unwrap().push(path.to_owned());
		}
	}

	fn session() -> model::Session {
		model::Session {
			id: Uuid::new_v4(),
			admin: model::Admin {
				id: Uuid::new_v4(),
				name: "Admin".into(),
			},
			created_at: Utc::now(),
		}
	}

	#[tokio::test]
	async fn test_unknown_until_provider_answers() {
		let context = SessionContext::new(FakeProvider::new(None));
		let mut handle = context.use_session();

		// the observer has not run yet
		assert_eq!(handle.status(), SessionStatus::Unknown);
		assert!(handle.snapshot().is_loading);

		let snapshot = handle.wait_until_known().await;

		assert_eq!(snapshot.status(), SessionStatus::Anonymous);
	}

	#[tokio::test]
	async fn test_follows_provider_events() {
		let provider = FakeProvider::new(None);
		let events = provider.events.clone();
		let context = SessionContext::new(provider);
		let mut handle = context.use_session();

		handle.wait_until_known().await;

		let session = session();
		events.send(SessionEvent::SignedIn(session.clone())).unwrap();

		assert!(handle.changed().await);
		assert_eq!(handle.status(), SessionStatus::Authenticated);
		assert_eq!(handle.snapshot().session, Some(session));

		events.send(SessionEvent::SignedOut).unwrap();

		assert!(handle.changed().await);
		assert_eq!(handle.status(), SessionStatus::Anonymous);
	}

	#[tokio::test]
	async fn test_one_fetch_for_all_consumers() {
		let provider = FakeProvider::new(Some(session()));
		let calls = provider.calls.clone();
		let context = SessionContext::new(provider);

		let mut header = context.use_session();
		let mut sidebar = context.use_session();

		assert_eq!(
			header.wait_until_known().await.status(),
			SessionStatus::Authenticated
		);
		assert_eq!(
			sidebar.wait_until_known().await.status(),
			SessionStatus::Authenticated
		);

		let mut late = context.use_session();

		assert_eq!(late.wait_until_known().await.status(), SessionStatus::Authenticated);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_logout_clears_state_when_sign_out_fails() {
		let mut provider = FakeProvider::new(Some(session()));
		provider.fail_sign_out = true;

		let context = SessionContext::new(provider);
		let mut handle = context.use_session();

		assert_eq!(
			handle.wait_until_known().await.status(),
			SessionStatus::Authenticated
		);

		let navigator = Recorder::default();
		context.logout(&navigator).await;

		assert_eq!(handle.status(), SessionStatus::Anonymous);
		assert_eq!(*navigator.0.lock().unwrap(), [LANDING_PATH]);
	}

	#[tokio::test]
	async fn test_fetch_in_flight_cannot_undo_logout() {
		let (release, gate) = oneshot::channel();
		let mut provider = FakeProvider::new(Some(session()));
		provider.fail_sign_out = true;
		provider.gate = Mutex::new(Some(gate));

		let calls = provider.calls.clone();
		let answered = provider.answered.clone();
		let context = SessionContext::new(provider);
		let handle = context.use_session();

		while calls.load(Ordering::SeqCst) == 0 {
			tokio::task::yield_now().await;
		}

		context.logout(&Recorder::default()).await;

		assert_eq!(handle.status(), SessionStatus::Anonymous);

		// the server still reports the session, since signing out failed
		release.send(()).unwrap();

		while answered.load(Ordering::SeqCst) == 0 {
			tokio::task::yield_now().await;
		}

		assert_eq!(handle.status(), SessionStatus::Anonymous);
	}

	#[tokio::test]
	async fn test_logout_signs_out_remotely() {
		let provider = FakeProvider::new(Some(session()));
		let mut events = provider.subscribe();
		let context = SessionContext::new(provider);

		context.use_session().wait_until_known().await;
		context.logout(&Recorder::default()).await;

		assert!(matches!(events.recv().await, Ok(SessionEvent::SignedOut)));
	}
}
