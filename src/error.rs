use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::{extract::Json, store::StoreError};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// The body of every failed response.
///
/// `content` is a single human-readable message. It never contains internal
/// error detail; that only goes to the logs.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A human-readable description of what went wrong.
	#[serde(rename = "error")]
	pub content: Cow<'a, str>,
	/// The input field the error relates to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Structured detail about the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Cow<'a, Map>>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(|| Cow::Owned(Map::new()))
			.to_mut()
			.insert(key.into(), value.into());
		self
	}
}

/// Describes how a route-specific error is presented to the client.
pub trait ErrorShape: std::error::Error {
	/// The message sent when the store fails while serving this route.
	const FAILURE: &'static str;

	fn status(&self) -> StatusCode;

	fn message(&self) -> Message<'_>;
}

/// Errors that can happen in any route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0:?}")]
	Json(axum_jsonschema::JsonSchemaRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("store error: {0}")]
	Store(#[from] StoreError),
	#[error("rate limit error: {0}")]
	RateLimit(#[from] GovernorError),
}

impl From<axum_jsonschema::JsonSchemaRejection> for AppError {
	fn from(rejection: axum_jsonschema::JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

impl AppError {
	/// Converts the error into a response, using `failure` as the message
	/// for store errors.
	fn into_response_with(self, failure: &'static str) -> Response<Body> {
		let (status, message) = match self {
			Self::Validation(ref errors) => {
				let message = errors
					.field_errors()
					.into_iter()
					.next()
					.map_or_else(
						|| Message::new("invalid input"),
						|(field, errors)| {
							let reason = errors
								.first()
								.map_or_else(|| "invalid value".to_owned(), ToString::to_string);

							Message::new(format!("{field}: {reason}")).field(field.to_string())
						},
					);

				(StatusCode::BAD_REQUEST, message)
			}
			Self::Json(..) => (StatusCode::BAD_REQUEST, Message::new("invalid request body")),
			Self::Path(..) => (StatusCode::BAD_REQUEST, Message::new("invalid path")),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => (
				StatusCode::TOO_MANY_REQUESTS,
				Message::new("too many requests").detail("retry_after", wait_time),
			),
			Self::RateLimit(ref error) => {
				tracing::error!(%error, "rate limiter failure");

				(StatusCode::INTERNAL_SERVER_ERROR, Message::new(failure))
			}
			Self::Store(ref error) => {
				tracing::error!(%error, "store failure");

				(StatusCode::INTERNAL_SERVER_ERROR, Message::new(failure))
			}
		};

		(status, Json(message)).into_response()
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		self.into_response_with("internal server error")
	}
}

/// The error type returned by route handlers: either an error specific to
/// the route, or one that can happen anywhere.
#[derive(Debug)]
pub enum RouteError<E> {
	Route(E),
	App(AppError),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> From<StoreError> for RouteError<E> {
	fn from(error: StoreError) -> Self {
		Self::App(error.into())
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => (error.status(), Json(error.message())).into_response(),
			Self::App(error) => error.into_response_with(E::FAILURE),
		}
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = Self;
}
