use std::net::SocketAddr;

use axum::{extract::Request, ServiceExt};
use blog::{config::Config, ratelimit::Limits, route, store::PgStore, trace, State};
use tower::Layer;
use tower_http::normalize_path::NormalizePathLayer;

#[tokio::main]
async fn main() {
	dotenvy::dotenv().ok();

	let config = match Config::from_env() {
		Ok(config) => config,
		Err(error) => {
			eprintln!("invalid configuration: {error}");
			std::process::exit(1);
		}
	};

	let _guard = if config.otel_enabled {
		Some(trace::init_tracing_subscriber().expect("failed to initialize OpenTelemetry"))
	} else {
		trace::init_fmt_subscriber();
		None
	};

	let pool = sqlx::PgPool::connect(&config.database_url)
		.await
		.expect("failed to connect to database");
	let store = PgStore::new(pool);

	store.migrate().await.expect("failed to run migrations");

	let state = State::new(store);

	if let Some(admin) = config.admin.clone() {
		if let Err(error) = route::auth::provision_admin(&state.database, &state.hasher, admin).await {
			tracing::error!(?error, "failed to provision administrator");
		}
	}

	let limits = Limits::from_config(&config).expect("rate limits must be non-zero");
	limits.spawn_cleanup();

	let app = NormalizePathLayer::trim_trailing_slash().layer(blog::app(state, Some(&limits)));

	let listener = tokio::net::TcpListener::bind((config.bind_addr, config.port))
		.await
		.expect("failed to bind to port");

	tracing::info!("listening on {}:{}", config.bind_addr, config.port);

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await
	.expect("server error");
}
