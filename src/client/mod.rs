//! The reader-facing side of the blog.
//!
//! [`api::Api`] talks to the read API and validates everything it receives,
//! [`fetch::FetchController`] drives the loading state of a single view,
//! [`session::SessionContext`] tracks whether an administrator is signed in,
//! and [`view`] renders all of it.

use std::time::Duration;

use reqwest::Url;

pub mod api;
pub mod fetch;
pub mod session;
pub mod view;

/// How long a request may take before it is abandoned and reported as failed.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client shared by [`api::Api`] and
/// [`session::HttpSessionProvider`].
///
/// Cookies are kept so that the session established by signing in is sent
/// with every later request.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
	reqwest::Client::builder()
		.cookie_store(true)
		.timeout(timeout)
		.build()
}

/// Appends path segments to `base`, escaping each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Url {
	let mut url = base.clone();

	if let Ok(mut path) = url.path_segments_mut() {
		path.pop_if_empty().extend(segments);
	}

	url
}

#[cfg(test)]
mod test {
	use super::{
		api::Api,
		fetch::{Failure, FetchController, FetchState},
		session::{HttpSessionProvider, SessionContext, SessionProvider},
		*,
	};
	use crate::test::*;

	#[test]
	fn test_endpoint_escapes_segments() {
		let base = Url::parse("http://localhost:3000/").unwrap();

		assert_eq!(
			endpoint(&base, &["api", "posts", "a/b"]).as_str(),
			"http://localhost:3000/api/posts/a%2Fb"
		);

		let base = Url::parse("http://localhost:3000/blog").unwrap();

		assert_eq!(
			endpoint(&base, &["api", "categories"]).as_str(),
			"http://localhost:3000/blog/api/categories"
		);
	}

	#[tokio::test]
	async fn test_reads_through_the_api() {
		let store = MemoryStore::new();
		let category = store.add_category("Rust", Utc::now());
		let post = store.add_post(NewPost {
			title: "Hello",
			content: "<b>hi</b><script>alert(1)</script>",
			cover_image_url: None,
			created_at: Utc::now(),
		});
		store.link(post, category.id).unwrap();

		let base = spawn(store).await.parse().unwrap();
		let api = Api::new(http_client(DEFAULT_TIMEOUT).unwrap(), base);

		let categories = api.categories().await.unwrap();

		assert_eq!(categories, [category]);

		let posts = api.posts().await.unwrap();

		assert_eq!(posts.len(), 1);
		assert_eq!(posts[0].content.as_str(), "<b>hi</b>");
		assert_eq!(posts[0].cover_image.url, "");
		assert_eq!(posts[0].cover_image.width, 800);
		assert_eq!(posts[0].cover_image.height, 450);

		let controller = FetchController::new();

		controller
			.load(post.to_string(), |id| async move {
				api.post(&id).await.map_err(Failure::from)
			})
			.await;

		let FetchState::Loaded(loaded) = &*controller.borrow() else {
			panic!("post should have loaded");
		};

		assert_eq!(loaded.title, "Hello");
		assert_eq!(loaded.categories[0].name, "Rust");
	}

	#[tokio::test]
	async fn test_unknown_post_is_not_found() {
		let base = spawn(MemoryStore::new()).await.parse().unwrap();
		let api = Api::new(http_client(DEFAULT_TIMEOUT).unwrap(), base);
		let controller = FetchController::new();

		controller
			.load("nonexistent-id".to_owned(), |id| async move {
				api.post(&id).await.map_err(Failure::from)
			})
			.await;

		assert_eq!(*controller.borrow(), FetchState::Failed(Failure::NotFound));
	}

	#[tokio::test]
	async fn test_store_failure_carries_server_message() {
		let store = MemoryStore::new();
		let switch = store.failure_switch();

		// provisioning the administrator needs a working store
		let base = spawn(store).await.parse().unwrap();
		switch.set(true);

		let api = Api::new(http_client(DEFAULT_TIMEOUT).unwrap(), base);
		let controller = FetchController::new();

		controller
			.load((), |()| async move { api.posts().await.map_err(Failure::from) })
			.await;

		assert_eq!(
			*controller.borrow(),
			FetchState::Failed(Failure::Other("failed to fetch posts".into()))
		);
	}

	#[tokio::test]
	async fn test_hung_request_times_out() {
		// accepts connections but never answers
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let base = format!("http://{}", listener.local_addr().unwrap())
			.parse()
			.unwrap();

		let api = Api::new(
			http_client(std::time::Duration::from_millis(100)).unwrap(),
			base,
		);
		let controller = FetchController::new();

		controller
			.load((), |()| async move {
				api.categories().await.map_err(Failure::from)
			})
			.await;

		assert_eq!(
			*controller.borrow(),
			FetchState::Failed(Failure::Other(api::GENERIC_FAILURE.into()))
		);

		drop(listener);
	}

	#[tokio::test]
	async fn test_session_over_http() {
		let base = spawn(MemoryStore::new()).await.parse().unwrap();
		let provider = HttpSessionProvider::new(http_client(DEFAULT_TIMEOUT).unwrap(), base);

		assert_eq!(provider.get_session().await.unwrap(), None);
		assert!(provider.sign_in(ADMIN_EMAIL, "wrong password").await.is_err());

		let session = provider.sign_in(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

		assert_eq!(session.admin.name, ADMIN_NAME);
		assert_eq!(provider.get_session().await.unwrap(), Some(session));

		let context = SessionContext::new(provider);
		let mut handle = context.use_session();

		assert!(handle.wait_until_known().await.session.is_some());
	}
}
