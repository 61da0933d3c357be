use reqwest::{StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use super::{endpoint, fetch::Failure, view};
use crate::model;

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "failed to fetch data";

/// The ways a read can fail, before they are reduced to a [`Failure`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),
	#[error("server responded with {status}")]
	Server {
		status: StatusCode,
		message: Option<String>,
	},
	#[error("not found")]
	NotFound,
	#[error("unexpected response: {0}")]
	Shape(String),
}

impl FetchError {
	/// The text shown to the reader. Only messages sent by the server are
	/// passed through, since they are written for the reader already.
	pub fn user_message(&self) -> &str {
		match self {
			Self::Server {
				message: Some(message),
				..
			} => message,
			_ => GENERIC_FAILURE,
		}
	}
}

impl From<FetchError> for Failure {
	fn from(error: FetchError) -> Self {
		match error {
			FetchError::NotFound => Self::NotFound,
			error => {
				tracing::debug!(%error, "fetch failed");
				Self::Other(error.user_message().to_owned())
			}
		}
	}
}

#[derive(Deserialize)]
struct ErrorBody {
	error: String,
}

/// A client for the read API.
#[derive(Debug, Clone)]
pub struct Api {
	client: reqwest::Client,
	base: Url,
}

impl Api {
	pub fn new(client: reqwest::Client, base: Url) -> Self {
		Self { client, base }
	}

	/// Lists every category, newest first.
	pub async fn categories(&self) -> Result<Vec<model::Category>, FetchError> {
		let categories: Vec<model::Category> = self.get(&["api", "categories"]).await?;

		validate_all(&categories)?;
		Ok(categories)
	}

	/// Lists every post, newest first, ready to be rendered.
	pub async fn posts(&self) -> Result<Vec<view::Post>, FetchError> {
		let posts: Vec<model::Post> = self.get(&["api", "posts"]).await?;

		validate_all(&posts)?;
		Ok(posts.into_iter().map(view::Post::from).collect())
	}

	/// Fetches a single post. An id the server does not know, including one
	/// that is not a valid id at all, is [`FetchError::NotFound`].
	pub async fn post(&self, id: &str) -> Result<view::Post, FetchError> {
		// `/api/posts/` would resolve to the list
		if id.is_empty() {
			return Err(FetchError::NotFound);
		}

		let post: model::Post = match self.get(&["api", "posts", id]).await {
			Err(FetchError::Server {
				status: StatusCode::NOT_FOUND,
				..
			}) => return Err(FetchError::NotFound),
			result => result?,
		};

		validate_all(std::slice::from_ref(&post))?;
		Ok(post.into())
	}

	async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, FetchError> {
		let response = self
			.client
			.get(endpoint(&self.base, segments))
			.send()
			.await?;

		let status = response.status();
		let body = response.bytes().await?;

		if !status.is_success() {
			let message = serde_json::from_slice::<ErrorBody>(&body)
				.ok()
				.map(|body| body.error)
				.filter(|message| !message.trim().is_empty());

			return Err(FetchError::Server { status, message });
		}

		serde_json::from_slice(&body).map_err(|error| FetchError::Shape(error.to_string()))
	}
}

fn validate_all<T: Validate>(items: &[T]) -> Result<(), FetchError> {
	items
		.iter()
		.try_for_each(Validate::validate)
		.map_err(|error| FetchError::Shape(error.to_string()))
}
