use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_SESSION: &str = "Session";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const CATEGORY: &str = "Category";
	pub const POST: &str = "Post";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Blog Open API")
		.summary("Read API for posts and categories")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::AUTH.into(),
			description: Some("Administrator sessions".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::CATEGORY.into(),
			description: Some("Categories posts are filed under".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Published posts".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("An administrator session cookie".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::Message<'static>>, _>(|res| {
			res.example(error::Message::new("failed to fetch posts"))
		})
}
