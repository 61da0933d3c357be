pub use crate::model::Post;

use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

#[derive(Deserialize, Validate, JsonSchema)]
pub struct PostPath {
	/// The unique identifier of the post.
	pub id: String,
}
