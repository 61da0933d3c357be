use aide::axum::IntoApiResponse;
use argon2::Argon2;
use axum::{
	extract::State,
	http::{header, StatusCode},
};
use macros::route;
use uuid::Uuid;
use validator::Validate;

use crate::{
	error::AppError,
	extract::{Json, MaybeSession},
	openapi::tag,
	session, store, AppState, Database,
};

use super::{model, Error, RouteError};

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the administrator's id as a salt.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Creates the administrator, or updates the name and password of the one
/// with the same email.
pub async fn provision_admin(
	database: &Database,
	hasher: &Argon2<'static>,
	input: model::AdminInput,
) -> Result<store::Admin, RouteError> {
	input.validate().map_err(AppError::from)?;

	let id = database
		.find_admin_by_email(&input.email)
		.await?
		.map_or_else(Uuid::new_v4, |admin| admin.id);

	let password = hash_password(hasher, &input.password, &id).map_err(Error::Argon)?;

	let admin = database
		.upsert_admin(store::Admin {
			id,
			email: input.email,
			name: input.name,
			password: password.to_vec(),
			created_at: chrono::Utc::now(),
		})
		.await?;

	tracing::info!(admin = %admin.id, "administrator provisioned");

	Ok(admin)
}

/// Log in
/// Logs in to an administrator account, returning an associated session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Session>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(auth): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let Some(admin) = state.database.find_admin_by_email(&auth.email).await? else {
		// costs the same as checking a real password
		let _ = hash_password(&state.hasher, &auth.password, &Uuid::nil());

		return Err(Error::InvalidEmailOrPassword.into());
	};

	let hashed = hash_password(&state.hasher, &auth.password, &admin.id).map_err(Error::Argon)?;

	if admin.password != hashed {
		return Err(Error::InvalidEmailOrPassword.into());
	}

	let session = state.database.create_session(admin.id).await?;
	let cookie = session::create_cookie(session.id);

	tracing::info!(admin = %admin.id, "administrator logged in");

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(session)))
}

/// Log out
/// Ends the current session, if any, and clears the session cookie. Succeeds even without a session.
#[route(tag = tag::AUTH, response(status = 204, description = "Logged out successfully."))]
pub async fn logout(
	State(database): State<Database>,
	MaybeSession(session): MaybeSession,
) -> Result<impl IntoApiResponse, RouteError> {
	if let Some(session) = session {
		database.delete_session(session.id).await?;
	}

	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	))
}

/// Get session
/// Returns the current session, or `null` when not logged in.
#[route(tag = tag::AUTH)]
pub async fn get_session(MaybeSession(session): MaybeSession) -> Json<model::SessionState> {
	Json(model::SessionState { session })
}
