use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown post {0}")]
	UnknownPost(String),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", get_with(list_posts, list_posts_docs))
		.api_route("/:id", get_with(get_post, get_post_docs))
}

impl error::ErrorShape for Error {
	const FAILURE: &'static str = "failed to fetch posts";

	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) => StatusCode::NOT_FOUND,
		}
	}

	fn message(&self) -> error::Message<'_> {
		match self {
			Self::UnknownPost(post) => {
				error::Message::new("post not found").detail("post", post.as_str())
			}
		}
	}
}
