pub mod auth;
pub mod category;
pub mod docs;
pub mod post;

use macros::route;

/// Health check
/// Returns `ok` while the server is accepting requests.
#[route]
pub async fn health() -> &'static str {
	"ok"
}
