use std::sync::{
	atomic::{AtomicBool, Ordering},
	Arc, PoisonError, RwLock,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Admin, Store, StoreError};
use crate::model;

/// A post as stored, before its categories are resolved.
#[derive(Debug, Clone)]
struct PostRecord {
	id: Uuid,
	title: String,
	content: String,
	cover_image_url: Option<String>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
	categories: Vec<model::Category>,
	posts: Vec<PostRecord>,
	/// `(post_id, category_id)` in insertion order
	post_categories: Vec<(Uuid, Uuid)>,
	admins: Vec<Admin>,
	sessions: Vec<(Uuid, Uuid, DateTime<Utc>)>,
}

/// An in-memory [`Store`], used by tests and local demos.
///
/// It enforces the same referential integrity as the Postgres schema, and
/// can be switched into a failing mode to exercise store error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tables: RwLock<Tables>,
	failing: FailureSwitch,
}

/// Turns failing mode of a [`MemoryStore`] on and off, including after the
/// store has been moved into a server.
#[derive(Debug, Clone, Default)]
pub struct FailureSwitch(Arc<AtomicBool>);

impl FailureSwitch {
	pub fn set(&self, failing: bool) {
		self.0.store(failing, Ordering::SeqCst);
	}

	fn is_on(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

/// The fields needed to insert a post.
#[derive(Debug, Clone)]
pub struct NewPost<'a> {
	pub title: &'a str,
	pub content: &'a str,
	pub cover_image_url: Option<&'a str>,
	pub created_at: DateTime<Utc>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes every subsequent call fail with [`StoreError::Unavailable`].
	pub fn set_failing(&self, failing: bool) {
		self.failing.set(failing);
	}

	/// A handle that controls failing mode, see [`Self::set_failing`].
	pub fn failure_switch(&self) -> FailureSwitch {
		self.failing.clone()
	}

	pub fn add_category(&self, name: &str, created_at: DateTime<Utc>) -> model::Category {
		let category = model::Category {
			id: Uuid::new_v4(),
			name: name.to_owned(),
			created_at,
		};

		self.write().categories.push(category.clone());
		category
	}

	pub fn add_post(&self, post: NewPost<'_>) -> Uuid {
		let id = Uuid::new_v4();

		self.write().posts.push(PostRecord {
			id,
			title: post.title.to_owned(),
			content: post.content.to_owned(),
			cover_image_url: post.cover_image_url.map(ToOwned::to_owned),
			created_at: post.created_at,
			updated_at: post.created_at,
		});

		id
	}

	/// Files a post under a category. Both must already exist.
	pub fn link(&self, post_id: Uuid, category_id: Uuid) -> Result<(), StoreError> {
		let mut tables = self.write();

		if !tables.posts.iter().any(|post| post.id == post_id) {
			return Err(StoreError::Integrity(format!("unknown post {post_id}")));
		}

		if !tables.categories.iter().any(|c| c.id == category_id) {
			return Err(StoreError::Integrity(format!(
				"unknown category {category_id}"
			)));
		}

		if !tables.post_categories.contains(&(post_id, category_id)) {
			tables.post_categories.push((post_id, category_id));
		}

		Ok(())
	}

	fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
		self.tables.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
		self.tables.write().unwrap_or_else(PoisonError::into_inner)
	}

	fn check(&self) -> Result<(), StoreError> {
		if self.failing.is_on() {
			return Err(StoreError::Unavailable("memory store is failing".into()));
		}

		Ok(())
	}
}

impl Tables {
	fn resolve(&self, post: &PostRecord) -> model::Post {
		let categories = self
			.post_categories
			.iter()
			.filter(|(post_id, _)| *post_id == post.id)
			.filter_map(|(_, category_id)| {
				self.categories
					.iter()
					.find(|category| category.id == *category_id)
			})
			.map(|category| model::CategoryRef {
				id: category.id,
				name: category.name.clone(),
			})
			.collect();

		model::Post {
			id: post.id,
			title: post.title.clone(),
			content: post.content.clone(),
			cover_image_url: post.cover_image_url.clone(),
			created_at: post.created_at,
			updated_at: post.updated_at,
			categories,
		}
	}

	fn session(&self, id: Uuid, admin_id: Uuid, created_at: DateTime<Utc>) -> Option<model::Session> {
		let admin = self.admins.iter().find(|admin| admin.id == admin_id)?;

		Some(model::Session {
			id,
			admin: admin.clone().into(),
			created_at,
		})
	}
}

#[async_trait]
impl Store for MemoryStore {
	async fn list_categories(&self) -> Result<Vec<model::Category>, StoreError> {
		self.check()?;

		let mut categories = self.read().categories.clone();
		categories.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		Ok(categories)
	}

	async fn list_posts(&self) -> Result<Vec<model::Post>, StoreError> {
		self.check()?;

		let tables = self.read();
		let mut posts = tables
			.posts
			.iter()
			.map(|post| tables.resolve(post))
			.collect::<Vec<_>>();

		posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		Ok(posts)
	}

	async fn get_post(&self, id: Uuid) -> Result<Option<model::Post>, StoreError> {
		self.check()?;

		let tables = self.read();

		Ok(tables
			.posts
			.iter()
			.find(|post| post.id == id)
			.map(|post| tables.resolve(post)))
	}

	async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
		self.check()?;

		Ok(self
			.read()
			.admins
			.iter()
			.find(|admin| admin.email == email)
			.cloned())
	}

	async fn upsert_admin(&self, admin: Admin) -> Result<Admin, StoreError> {
		self.check()?;

		let mut tables = self.write();

		if let Some(existing) = tables.admins.iter_mut().find(|a| a.email == admin.email) {
			existing.name = admin.name;
			existing.password = admin.password;

			return Ok(existing.clone());
		}

		tables.admins.push(admin.clone());
		Ok(admin)
	}

	async fn create_session(&self, admin_id: Uuid) -> Result<model::Session, StoreError> {
		self.check()?;

		let mut tables = self.write();
		let id = Uuid::new_v4();
		let created_at = Utc::now();

		let session = tables
			.session(id, admin_id, created_at)
			.ok_or_else(|| StoreError::Integrity(format!("unknown admin {admin_id}")))?;

		tables.sessions.push((id, admin_id, created_at));

		Ok(session)
	}

	async fn find_session(&self, id: Uuid) -> Result<Option<model::Session>, StoreError> {
		self.check()?;

		let tables = self.read();

		Ok(tables
			.sessions
			.iter()
			.find(|(session_id, ..)| *session_id == id)
			.and_then(|&(id, admin_id, created_at)| tables.session(id, admin_id, created_at)))
	}

	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
		self.check()?;

		let mut tables = self.write();
		let before = tables.sessions.len();

		tables.sessions.retain(|(session_id, ..)| *session_id != id);

		Ok(tables.sessions.len() != before)
	}
}

#[cfg(test)]
mod test {
	use chrono::{Duration, Utc};

	use super::*;

	#[tokio::test]
	async fn test_link_requires_existing_rows() {
		let store = MemoryStore::new();
		let category = store.add_category("rust", Utc::now());

		assert!(matches!(
			store.link(Uuid::new_v4(), category.id),
			Err(StoreError::Integrity(..))
		));

		let post = store.add_post(NewPost {
			title: "hello",
			content: "",
			cover_image_url: None,
			created_at: Utc::now(),
		});

		assert!(matches!(
			store.link(post, Uuid::new_v4()),
			Err(StoreError::Integrity(..))
		));
		assert!(store.link(post, category.id).is_ok());
	}

	#[tokio::test]
	async fn test_categories_follow_link_order() {
		let store = MemoryStore::new();
		let now = Utc::now();
		let a = store.add_category("a", now - Duration::hours(2));
		let b = store.add_category("b", now - Duration::hours(1));
		let post = store.add_post(NewPost {
			title: "hello",
			content: "",
			cover_image_url: None,
			created_at: now,
		});

		store.link(post, b.id).unwrap();
		store.link(post, a.id).unwrap();
		store.link(post, b.id).unwrap();

		let post = store.get_post(post).await.unwrap().unwrap();
		let names = post
			.categories
			.iter()
			.map(|c| c.name.as_str())
			.collect::<Vec<_>>();

		assert_eq!(names, ["b", "a"]);
	}

	#[tokio::test]
	async fn test_failing_store() {
		let store = MemoryStore::new();
		store.set_failing(true);

		assert!(matches!(
			store.list_posts().await,
			Err(StoreError::Unavailable(..))
		));

		store.set_failing(false);

		assert!(store.list_posts().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_failure_switch_outlives_move() {
		let store = MemoryStore::new();
		let switch = store.failure_switch();
		let database: crate::Database = Arc::new(store);

		assert!(database.list_categories().await.is_ok());

		switch.set(true);

		assert!(matches!(
			database.list_categories().await,
			Err(StoreError::Unavailable(..))
		));
	}
}
