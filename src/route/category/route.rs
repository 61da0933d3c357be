use axum::extract::State;
use macros::route;

use crate::{extract::Json, model, openapi::tag, Database};

use super::RouteError;

/// List categories
/// Returns every category, newest first.
#[route(tag = tag::CATEGORY)]
pub async fn list_categories(
	State(database): State<Database>,
) -> Result<Json<Vec<model::Category>>, RouteError> {
	let categories = database.list_categories().await?;

	Ok(Json(categories))
}
