//! HTML rendering of every view state.
//!
//! Renderers take the current [`FetchState`] or [`SessionSnapshot`] and
//! return a `Markup` fragment. Post content is only ever rendered from
//! [`SafeHtml`], which can only be produced by [`crate::sanitize`].

use chrono::{DateTime, Utc};
use maud::{html, Markup};
use uuid::Uuid;

use super::{
	fetch::{Failure, FetchState},
	session::{SessionSnapshot, SessionStatus},
};
use crate::{
	model,
	sanitize::{sanitize, SafeHtml},
};

pub const COVER_WIDTH: u32 = 800;
pub const COVER_HEIGHT: u32 = 450;

pub const LOADING: &str = "Loading...";
pub const NO_POSTS: &str = "No posts have been published yet.";
pub const NO_CATEGORIES: &str = "No categories have been created.";
pub const POST_NOT_FOUND: &str = "Post not found.";
pub const LOGIN: &str = "Login";
pub const LOGOUT: &str = "Logout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
	/// Empty when the post has no cover image.
	pub url: String,
	pub width: u32,
	pub height: u32,
}

/// A post ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
	pub id: Uuid,
	pub title: String,
	pub content: SafeHtml,
	pub cover_image: CoverImage,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
	pub categories: Vec<model::CategoryRef>,
}

impl From<model::Post> for Post {
	fn from(post: model::Post) -> Self {
		Self {
			id: post.id,
			content: sanitize(&post.content),
			title: post.title,
			cover_image: CoverImage {
				url: post.cover_image_url.unwrap_or_default(),
				width: COVER_WIDTH,
				height: COVER_HEIGHT,
			},
			created_at: post.created_at,
			updated_at: post.updated_at,
			categories: post.categories,
		}
	}
}

/// Only http(s) and same-origin urls may end up in `src` or `href`.
fn is_safe_url(url: &str) -> bool {
	url.starts_with("https://")
		|| url.starts_with("http://")
		|| (url.starts_with('/') && !url.starts_with("//"))
}

fn format_date(date: &DateTime<Utc>) -> String {
	date.format("%Y-%m-%d").to_string()
}

/// Renders the states shared by every view, deferring to `loaded` once
/// there is data.
fn render_state<T>(state: &FetchState<T>, loaded: impl FnOnce(&T) -> Markup) -> Markup {
	match state {
		FetchState::Idle | FetchState::Loading => html! {
			p class="loading" { (LOADING) }
		},
		FetchState::Failed(Failure::NotFound) => html! {
			p class="not-found" { (POST_NOT_FOUND) }
		},
		FetchState::Failed(Failure::Other(message)) => html! {
			p class="error" { (message) }
		},
		FetchState::Loaded(data) => loaded(data),
	}
}

fn category_badges(categories: &[model::CategoryRef]) -> Markup {
	html! {
		@if !categories.is_empty() {
			ul class="categories" {
				@for category in categories {
					li class="badge" { (category.name) }
				}
			}
		}
	}
}

pub fn post_list(state: &FetchState<Vec<Post>>) -> Markup {
	render_state(state, |posts| {
		html! {
			@if posts.is_empty() {
				p class="empty" { (NO_POSTS) }
			} @else {
				ul class="posts" {
					@for post in posts {
						li class="post" {
							a href={ "/posts/" (post.id.to_string()) } {
								h2 { (post.title) }
							}
							time datetime=(post.created_at.to_rfc3339()) { (format_date(&post.created_at)) }
							(category_badges(&post.categories))
							div class="post-content" { (post.content) }
						}
					}
				}
			}
		}
	})
}

pub fn post_detail(state: &FetchState<Post>) -> Markup {
	render_state(state, |post| {
		let cover = &post.cover_image;

		html! {
			article class="post" {
				@if !cover.url.is_empty() && is_safe_url(&cover.url) {
					img class="cover" src=(cover.url) width=(cover.width) height=(cover.height) alt=(post.title);
				}
				h1 { (post.title) }
				time datetime=(post.created_at.to_rfc3339()) { (format_date(&post.created_at)) }
				(category_badges(&post.categories))
				div class="post-content" { (post.content) }
			}
		}
	})
}

pub fn category_list(state: &FetchState<Vec<model::Category>>) -> Markup {
	render_state(state, |categories| {
		html! {
			@if categories.is_empty() {
				p class="empty" { (NO_CATEGORIES) }
			} @else {
				ul class="categories" {
					@for category in categories {
						li {
							(category.name)
							" "
							time datetime=(category.created_at.to_rfc3339()) { (format_date(&category.created_at)) }
						}
					}
				}
			}
		}
	})
}

/// The page header. Neither link is shown until the session is known.
pub fn header(session: &SessionSnapshot) -> Markup {
	html! {
		header {
			a class="home" href="/" { "Blog" }
			nav {
				@match (session.status(), &session.session) {
					(SessionStatus::Authenticated, Some(session)) => {
						span class="admin" { (session.admin.name) }
						form method="post" action="/auth/logout" {
							button type="submit" { (LOGOUT) }
						}
					}
					(SessionStatus::Anonymous, _) => {
						a href="/login" { (LOGIN) }
					}
					_ => {}
				}
			}
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn post(cover_image_url: Option<&str>, content: &str) -> Post {
		model::Post {
			id: Uuid::new_v4(),
			title: "Hello".into(),
			content: content.into(),
			cover_image_url: cover_image_url.map(Into::into),
			created_at: "2024-03-05T12:00:00Z".parse().unwrap(),
			updated_at: "2024-03-05T12:00:00Z".parse().unwrap(),
			categories: vec![model::CategoryRef {
				id: Uuid::new_v4(),
				name: "Rust".into(),
			}],
		}
		.into()
	}

	fn session() -> model::Session {
		model::Session {
			id: Uuid::new_v4(),
			admin: model::Admin {
				id: Uuid::new_v4(),
				name: "Ada".into(),
			},
			created_at: Utc::now(),
		}
	}

	#[test]
	fn test_cover_image_defaults() {
		let post = post(None, "");

		assert_eq!(
			post.cover_image,
			CoverImage {
				url: String::new(),
				width: 800,
				height: 450,
			}
		);
	}

	#[test]
	fn test_loading_states() {
		for state in [FetchState::Idle, FetchState::Loading] {
			let html = post_list(&state).into_string();

			assert!(html.contains(LOADING));
			assert!(!html.contains(NO_POSTS));
		}
	}

	#[test]
	fn test_empty_lists() {
		let html = post_list(&FetchState::Loaded(Vec::new())).into_string();

		assert!(html.contains(NO_POSTS));
		assert!(!html.contains(LOADING));
		assert!(!html.contains("class=\"error\""));

		let html = category_list(&FetchState::Loaded(Vec::new())).into_string();

		assert!(html.contains(NO_CATEGORIES));
	}

	#[test]
	fn test_failure_message_is_verbatim() {
		let state = FetchState::<Vec<Post>>::Failed(Failure::Other("failed to fetch posts".into()));
		let html = post_list(&state).into_string();

		assert_eq!(html, "<p class=\"error\">failed to fetch posts</p>");
	}

	#[test]
	fn test_not_found_is_not_generic() {
		let html = post_detail(&FetchState::Failed(Failure::NotFound)).into_string();

		assert!(html.contains(POST_NOT_FOUND));
		assert!(!html.contains(crate::client::api::GENERIC_FAILURE));
	}

	#[test]
	fn test_post_detail() {
		let post = post(
			Some("https://example.com/cover.png"),
			"<b>bold</b><script>alert(1)</script><img src=x onerror=alert(1)>",
		);
		let html = post_detail(&FetchState::Loaded(post)).into_string();

		assert!(html.contains(
			"<img class=\"cover\" src=\"https://example.com/cover.png\" width=\"800\" height=\"450\" alt=\"Hello\">"
		));
		assert!(html.contains("<div class=\"post-content\"><b>bold</b></div>"));
		assert!(html.contains("<time datetime=\"2024-03-05T12:00:00+00:00\">2024-03-05</time>"));
		assert!(html.contains("<li class=\"badge\">Rust</li>"));
		assert!(!html.contains("script"));
		assert!(!html.contains("onerror"));
	}

	#[test]
	fn test_no_cover_without_url() {
		let html = post_detail(&FetchState::Loaded(post(None, "text"))).into_string();

		assert!(!html.contains("<img"));

		let html = post_detail(&FetchState::Loaded(post(Some("javascript:alert(1)"), "text")))
			.into_string();

		assert!(!html.contains("<img"));
	}

	#[test]
	fn test_post_list_links_posts() {
		let post = post(None, "text");
		let link = format!("<a href=\"/posts/{}\">", post.id);
		let html = post_list(&FetchState::Loaded(vec![post])).into_string();

		assert!(html.contains(&link));
	}

	#[test]
	fn test_header_gating() {
		let html = header(&SessionSnapshot::UNKNOWN).into_string();

		assert!(!html.contains(LOGIN));
		assert!(!html.contains(LOGOUT));

		let html = header(&SessionSnapshot::known(None)).into_string();

		assert!(html.contains(LOGIN));
		assert!(!html.contains(LOGOUT));

		let html = header(&SessionSnapshot::known(Some(session()))).into_string();

		assert!(html.contains(LOGOUT));
		assert!(html.contains("Ada"));
		assert!(!html.contains(LOGIN));
	}
}
