#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod openapi;
pub mod ratelimit;
pub mod route;
pub mod sanitize;
pub mod session;
pub mod store;
pub mod trace;

#[cfg(test)]
mod test;

use std::{sync::Arc, time::Duration};

use aide::{
	axum::{routing::get_with, ApiRouter},
	openapi::OpenApi,
};
use argon2::Argon2;
use axum::{
	http::{Method, Response},
	Extension, Router,
};
use tower::ServiceBuilder;
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	cors::{Any, CorsLayer},
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tracing::Span;

pub use error::AppError as Error;
pub use sanitize::sanitize;

/// A handle to the content store shared by every handler.
pub type Database = Arc<dyn store::Store>;
pub type AppState = State;

/// The shared application state.
///
/// This contains every shared dependency that handlers need to access:
/// the content store, and the password hasher used when logging in.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
}

impl State {
	pub fn new(database: impl store::Store) -> Self {
		Self {
			database: Arc::new(database),
			hasher: Argon2::default(),
		}
	}
}

/// Builds the application router.
///
/// Rate limits key on the peer address, so they are only applied when the
/// router is served with connect info.
pub fn app(state: State, limits: Option<&ratelimit::Limits>) -> Router {
	let mut api = OpenApi::default();

	let mut read = ApiRouter::new()
		.nest("/categories", route::category::routes())
		.nest("/posts", route::post::routes())
		.layer(
			CorsLayer::new()
				.allow_methods([Method::GET])
				.allow_origin(Any),
		);

	if let Some(limits) = limits {
		read = read.layer(GovernorLayer {
			config: limits.default.clone(),
		});
	}

	let auth = route::auth::routes(limits.map(|limits| limits.secure.clone()));

	ApiRouter::new()
		.nest("/api", read)
		.nest("/auth", auth)
		.api_route("/health", get_with(route::health, route::health_docs))
		.nest_api_service("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
				.layer(
					TraceLayer::new_for_http().on_response(
						|response: &Response<_>, latency: Duration, _span: &Span| {
							tracing::info!(
								histogram.request_duration_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
								status = response.status().as_u16(),
								"finished processing request"
							);
						},
					),
				)
				.layer(PropagateRequestIdLayer::x_request_id())
				.layer(CompressionLayer::new()),
		)
		.with_state(state)
}
