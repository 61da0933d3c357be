//! The content store boundary.
//!
//! Handlers never talk to a database directly. They go through [`Store`],
//! which is implemented for Postgres in production and in memory for tests.

mod memory;
mod postgres;

pub use memory::{FailureSwitch, MemoryStore, NewPost};
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model;

/// An error raised by the underlying store.
///
/// The Display output may contain internal detail, so it is only ever logged
/// and never sent to the client.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("store unavailable: {0}")]
	Unavailable(String),
	#[error("integrity violation: {0}")]
	Integrity(String),
}

/// An administrator record, including the password hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Admin {
	pub id: Uuid,
	pub email: String,
	pub name: String,
	/// argon2 and salted with `id`
	pub password: Vec<u8>,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Admin> for model::Admin {
	fn from(admin: Admin) -> Self {
		Self {
			id: admin.id,
			name: admin.name,
		}
	}
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
	/// Returns every category, newest first.
	async fn list_categories(&self) -> Result<Vec<model::Category>, StoreError>;

	/// Returns every post with its categories, newest first.
	async fn list_posts(&self) -> Result<Vec<model::Post>, StoreError>;

	/// Returns a single post with its categories.
	async fn get_post(&self, id: Uuid) -> Result<Option<model::Post>, StoreError>;

	async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError>;

	/// Inserts the administrator, or replaces the name and password of the
	/// one with the same email.
	async fn upsert_admin(&self, admin: Admin) -> Result<Admin, StoreError>;

	async fn create_session(&self, admin_id: Uuid) -> Result<model::Session, StoreError>;

	async fn find_session(&self, id: Uuid) -> Result<Option<model::Session>, StoreError>;

	/// Deletes a session, returning whether it existed.
	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError>;
}
