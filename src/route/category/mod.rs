use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod route;

/// Categories are only ever listed, so the only way this route fails is
/// through the store.
#[derive(Debug, thiserror::Error)]
pub enum Error {}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/", get_with(list_categories, list_categories_docs))
}

impl error::ErrorShape for Error {
	const FAILURE: &'static str = "failed to fetch categories";

	fn status(&self) -> StatusCode {
		match *self {}
	}

	fn message(&self) -> error::Message<'_> {
		match *self {}
	}
}
