//! Shared helpers for tests.

pub use chrono::{Duration, Utc};
pub use serde_json::json;
pub use uuid::Uuid;

pub use crate::{
	model,
	store::{MemoryStore, NewPost},
};

use axum_test::TestServer;

use crate::{route::auth::model::AdminInput, State};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const ADMIN_NAME: &str = "Admin";

/// Builds a test server over `store` that keeps cookies between requests.
pub fn app(store: MemoryStore) -> TestServer {
	server(State::new(store))
}

/// Like [`app`], with an administrator provisioned from the `ADMIN_*` constants.
pub async fn app_with_admin(store: MemoryStore) -> TestServer {
	server(admin_state(store).await)
}

/// Serves the router over a real socket, returning its base url.
pub async fn spawn(store: MemoryStore) -> String {
	let app = crate::app(admin_state(store).await, None);
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();

	tokio::spawn(async move { axum::serve(listener, app).await });

	format!("http://{addr}")
}

fn server(state: State) -> TestServer {
	let mut server = TestServer::new(crate::app(state, None)).unwrap();
	server.do_save_cookies();
	server
}

async fn admin_state(store: MemoryStore) -> State {
	let state = State::new(store);

	crate::route::auth::provision_admin(
		&state.database,
		&state.hasher,
		AdminInput {
			email: ADMIN_EMAIL.into(),
			name: ADMIN_NAME.into(),
			password: ADMIN_PASSWORD.into(),
		},
	)
	.await
	.unwrap();

	state
}
