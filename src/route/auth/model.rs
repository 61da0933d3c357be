use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

pub use crate::model::{Session, SessionState};

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}

/// An administrator to create or update on startup.
#[derive(Debug, Clone, Validate)]
pub struct AdminInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 64))]
	pub name: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
}
