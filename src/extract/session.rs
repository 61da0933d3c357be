use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{error::RouteError, model, openapi::SECURITY_SCHEME_SESSION, route::auth, session, Database};

/// Extracts the current session, resolving to `None` when the request has
/// no session cookie or the cookie does not name a live session.
///
/// Only a store failure rejects the request.
#[derive(Debug)]
pub struct MaybeSession(pub Option<model::Session>);

/// Reads the session id from the request cookies.
fn session_id(parts: &request::Parts) -> Option<Uuid> {
	let cookie = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME)?;

	Uuid::parse_str(cookie.value()).ok()
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let Some(id) = session_id(parts) else {
			return Ok(Self(None));
		};

		let database = Database::from_ref(state);

		Ok(Self(database.find_session(id).await?))
	}
}

impl OperationInput for MaybeSession {
	/// Marks the session cookie as optional on the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
		operation.security.push(Default::default());
	}
}
