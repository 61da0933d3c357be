use axum::extract::State;
use macros::route;
use uuid::Uuid;

use crate::{
	error,
	extract::{Json, Path},
	openapi::tag,
	Database,
};

use super::{model, Error, RouteError};

/// List posts
/// Returns every post with its categories, newest first.
#[route(tag = tag::POST)]
pub async fn list_posts(
	State(database): State<Database>,
) -> Result<Json<Vec<model::Post>>, RouteError> {
	let posts = database.list_posts().await?;

	Ok(Json(posts))
}

/// Get single post
/// Returns a single post with its categories by its unique id.
#[route(
	tag = tag::POST,
	response(status = 404, shape = "Json<error::Message<'static>>", description = "The post does not exist.")
)]
pub async fn get_post(
	State(database): State<Database>,
	Path(path): Path<model::PostPath>,
) -> Result<Json<model::Post>, RouteError> {
	let Ok(id) = Uuid::parse_str(&path.id) else {
		return Err(Error::UnknownPost(path.id).into());
	};

	let post = database.get_post(id).await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}
