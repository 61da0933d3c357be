//! Wire types shared by the read API and its client.
//!
//! Every type here is both serialized by the server and deserialized (then
//! validated) by [`crate::client::api`], so the two sides cannot drift apart.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A category that posts can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Category {
	/// The unique identifier of the category.
	pub id: Uuid,
	/// The display name of the category.
	#[validate(length(min = 1))]
	pub name: String,
	/// The creation time of the category.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A category as seen through a post, reduced to what a reader needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema, Validate)]
pub struct CategoryRef {
	/// The unique identifier of the category.
	pub id: Uuid,
	/// The display name of the category.
	#[validate(length(min = 1))]
	pub name: String,
}

/// A single post with its categories resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The unique identifier of the post.
	pub id: Uuid,
	/// The title of the post.
	#[validate(length(min = 1))]
	pub title: String,
	/// The body of the post. May contain a restricted subset of HTML, and
	/// must be passed through [`crate::sanitize`] before being rendered.
	pub content: String,
	/// The location of the cover image, if the post has one.
	#[serde(
		rename = "coverImageURL",
		default,
		skip_serializing_if = "Option::is_none"
	)]
	pub cover_image_url: Option<String>,
	/// The creation time of the post.
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// The last time the post was modified.
	pub updated_at: chrono::DateTime<chrono::Utc>,
	/// The categories the post is filed under.
	#[validate(nested)]
	pub categories: Vec<CategoryRef>,
}

/// The public part of an administrator account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Admin {
	/// The unique identifier of the administrator.
	pub id: Uuid,
	/// The name shown in the header while signed in.
	pub name: String,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// The session id. This is also the value of the session cookie.
	pub id: Uuid,
	/// The administrator that owns the session.
	pub admin: Admin,
	/// The creation time of the session.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The current session state, `null` when not signed in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct SessionState {
	pub session: Option<Session>,
}
