use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use tower_governor::GovernorLayer;

use crate::{error, ratelimit, AppState};

pub mod model;
pub mod route;

pub use route::provision_admin;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid email or password")]
	InvalidEmailOrPassword,
	#[error("password hashing error")]
	Argon(#[from] argon2::Error),
}

pub type RouteError = error::RouteError<Error>;

/// Builds the auth routes, applying `limit` to logging in only.
pub fn routes(limit: Option<ratelimit::Limit>) -> ApiRouter<AppState> {
	use route::*;

	let mut login_route = ApiRouter::new().api_route("/login", post_with(login, login_docs));

	if let Some(config) = limit {
		login_route = login_route.layer(GovernorLayer { config });
	}

	ApiRouter::new()
		.merge(login_route)
		.api_route("/logout", post_with(logout, logout_docs))
		.api_route("/session", get_with(get_session, get_session_docs))
}

impl error::ErrorShape for Error {
	const FAILURE: &'static str = "authentication failed";

	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidEmailOrPassword => StatusCode::UNAUTHORIZED,
			Self::Argon(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn message(&self) -> error::Message<'_> {
		error::Message::new(self.to_string())
	}
}
