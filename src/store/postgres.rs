use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Admin, Store, StoreError};
use crate::model;

/// A [`Store`] backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
	pool: sqlx::PgPool,
}

impl PgStore {
	pub fn new(pool: sqlx::PgPool) -> Self {
		Self { pool }
	}

	/// Runs the embedded migrations in `migrations/`.
	pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
		sqlx::migrate!().run(&self.pool).await
	}

	/// Loads the categories of the given posts, keyed by post id.
	///
	/// Within a post, categories keep the order in which they were linked.
	async fn categories_of(
		&self,
		post_ids: &[Uuid],
	) -> Result<HashMap<Uuid, Vec<model::CategoryRef>>, StoreError> {
		let rows = sqlx::query_as::<_, PostCategoryRow>(
			r#"
				SELECT pc.post_id, c.id, c.name
				FROM post_category pc
				JOIN category c ON c.id = pc.category_id
				WHERE pc.post_id = ANY($1)
				ORDER BY pc.created_at, c.id
			"#,
		)
		.bind(post_ids)
		.fetch_all(&self.pool)
		.await?;

		let mut categories = HashMap::<Uuid, Vec<model::CategoryRef>>::new();

		for row in rows {
			categories
				.entry(row.post_id)
				.or_default()
				.push(model::CategoryRef {
					id: row.id,
					name: row.name,
				});
		}

		Ok(categories)
	}
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
	id: Uuid,
	name: String,
	created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct PostRow {
	id: Uuid,
	title: String,
	content: String,
	cover_image_url: Option<String>,
	created_at: chrono::DateTime<chrono::Utc>,
	updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct PostCategoryRow {
	post_id: Uuid,
	id: Uuid,
	name: String,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
	id: Uuid,
	admin_id: Uuid,
	admin_name: String,
	created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CategoryRow> for model::Category {
	fn from(row: CategoryRow) -> Self {
		Self {
			id: row.id,
			name: row.name,
			created_at: row.created_at,
		}
	}
}

impl PostRow {
	fn into_post(self, categories: Vec<model::CategoryRef>) -> model::Post {
		model::Post {
			id: self.id,
			title: self.title,
			content: self.content,
			cover_image_url: self.cover_image_url,
			created_at: self.created_at,
			updated_at: self.updated_at,
			categories,
		}
	}
}

impl From<SessionRow> for model::Session {
	fn from(row: SessionRow) -> Self {
		Self {
			id: row.id,
			admin: model::Admin {
				id: row.admin_id,
				name: row.admin_name,
			},
			created_at: row.created_at,
		}
	}
}

#[async_trait]
impl Store for PgStore {
	async fn list_categories(&self) -> Result<Vec<model::Category>, StoreError> {
		let categories = sqlx::query_as::<_, CategoryRow>(
			r#"
				SELECT id, name, created_at FROM category
				ORDER BY created_at DESC
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		Ok(categories.into_iter().map(Into::into).collect())
	}

	async fn list_posts(&self) -> Result<Vec<model::Post>, StoreError> {
		let posts = sqlx::query_as::<_, PostRow>(
			r#"
				SELECT id, title, content, cover_image_url, created_at, updated_at
				FROM post
				ORDER BY created_at DESC
			"#,
		)
		.fetch_all(&self.pool)
		.await?;

		let ids = posts.iter().map(|post| post.id).collect::<Vec<_>>();
		let mut categories = self.categories_of(&ids).await?;

		Ok(posts
			.into_iter()
			.map(|post| {
				let categories = categories.remove(&post.id).unwrap_or_default();
				post.into_post(categories)
			})
			.collect())
	}

	async fn get_post(&self, id: Uuid) -> Result<Option<model::Post>, StoreError> {
		let post = sqlx::query_as::<_, PostRow>(
			r#"
				SELECT id, title, content, cover_image_url, created_at, updated_at
				FROM post
				WHERE id = $1
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		let Some(post) = post else {
			return Ok(None);
		};

		let categories = self
			.categories_of(&[id])
			.await?
			.remove(&id)
			.unwrap_or_default();

		Ok(Some(post.into_post(categories)))
	}

	async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, StoreError> {
		let admin = sqlx::query_as::<_, Admin>(
			r#"
				SELECT id, email, name, password, created_at FROM admin
				WHERE email = $1
			"#,
		)
		.bind(email)
		.fetch_optional(&self.pool)
		.await?;

		Ok(admin)
	}

	async fn upsert_admin(&self, admin: Admin) -> Result<Admin, StoreError> {
		let admin = sqlx::query_as::<_, Admin>(
			r#"
				INSERT INTO admin (id, email, name, password)
				VALUES ($1, $2, $3, $4)
				ON CONFLICT (email) DO UPDATE
				SET name = EXCLUDED.name, password = EXCLUDED.password
				RETURNING id, email, name, password, created_at
			"#,
		)
		.bind(admin.id)
		.bind(&admin.email)
		.bind(&admin.name)
		.bind(&admin.password)
		.fetch_one(&self.pool)
		.await?;

		Ok(admin)
	}

	async fn create_session(&self, admin_id: Uuid) -> Result<model::Session, StoreError> {
		let session = sqlx::query_as::<_, SessionRow>(
			r#"
				WITH inserted AS (
					INSERT INTO session (admin_id) VALUES ($1)
					RETURNING id, admin_id, created_at
				)
				SELECT inserted.id, inserted.admin_id, admin.name AS admin_name, inserted.created_at
				FROM inserted
				JOIN admin ON admin.id = inserted.admin_id
			"#,
		)
		.bind(admin_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(session.into())
	}

	async fn find_session(&self, id: Uuid) -> Result<Option<model::Session>, StoreError> {
		let session = sqlx::query_as::<_, SessionRow>(
			r#"
				SELECT session.id, session.admin_id, admin.name AS admin_name, session.created_at
				FROM session
				JOIN admin ON admin.id = session.admin_id
				WHERE session.id = $1
			"#,
		)
		.bind(id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(session.map(Into::into))
	}

	async fn delete_session(&self, id: Uuid) -> Result<bool, StoreError> {
		let result = sqlx::query("DELETE FROM session WHERE id = $1")
			.bind(id)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}
