mod session;

pub use session::MaybeSession;

use aide::OperationIo;
use axum::{
	body::Body,
	extract::{FromRequest, FromRequestParts, Request},
	http::{request, Response},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::de;

use crate::error::AppError;

/// Extractor that deserializes a JSON body and validates it, and the
/// response type for JSON bodies.
///
/// ```rust,ignore
/// async fn login(Json(input): Json<LoginInput>) -> Json<model::Session> {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(
	input_with = "axum_jsonschema::Json<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response<Body> {
		axum::extract::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: de::DeserializeOwned + validator::Validate + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let result = axum_jsonschema::Json::<T>::from_request(req, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}

/// Extractor that deserializes path parameters and validates them.
///
/// Identifiers are taken as strings and parsed by the handler, so that an
/// id that is not even well-formed is reported the same way as one that
/// does not exist.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Path<T>",
	output_with = "axum_jsonschema::Json<T>",
	json_schema
)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: de::DeserializeOwned + validator::Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Path::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}
