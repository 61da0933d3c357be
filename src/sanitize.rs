//! Allow-list sanitization of stored post content.
//!
//! Post content is stored as HTML and could have been written by anything
//! with access to the store, so it is never trusted. [`sanitize`] is the only
//! way to obtain a [`SafeHtml`], and [`SafeHtml`] is the only way rich
//! content reaches a rendered page.

use std::collections::HashSet;

use maud::Render;

/// The only tags that survive sanitization. Every attribute is removed.
pub const ALLOWED_TAGS: [&str; 6] = ["b", "strong", "i", "em", "u", "br"];

/// Tags that are removed together with everything inside them.
const STRIPPED_CONTENT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// HTML that has been through [`sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeHtml(String);

impl SafeHtml {
	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}
}

impl Render for SafeHtml {
	fn render_to(&self, buffer: &mut String) {
		buffer.push_str(&self.0);
	}
}

/// Reduces `raw` to the tags in [`ALLOWED_TAGS`].
///
/// Disallowed tags are dropped but their text is kept, except for
/// script-bearing tags whose content is dropped as well. Text is escaped.
/// Malformed input is parsed the way a browser would, so this never fails.
pub fn sanitize(raw: &str) -> SafeHtml {
	let html = ammonia::Builder::empty()
		.add_tags(ALLOWED_TAGS)
		.clean_content_tags(STRIPPED_CONTENT_TAGS.into_iter().collect::<HashSet<_>>())
		.strip_comments(true)
		.clean(raw)
		.to_string();

	SafeHtml(html)
}
