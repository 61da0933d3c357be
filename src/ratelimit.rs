use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::{config::Config, error::AppError};

pub type Limit = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// The per-IP limits applied to the router.
#[derive(Clone)]
pub struct Limits {
	/// Applied to the read API.
	pub default: Limit,
	/// Applied to logging in.
	pub secure: Limit,
}

impl Limits {
	pub fn from_config(config: &Config) -> Option<Self> {
		Some(Self {
			default: limit(config.rate_limit_replenish_secs, config.rate_limit_burst)?,
			secure: limit(1, 5)?,
		})
	}

	/// Periodically drops limiter state for clients that have gone quiet.
	pub fn spawn_cleanup(&self) {
		cleanup_old_limits(&[&self.default, &self.secure]);
	}
}

fn limit(replenish_secs: u64, burst: u32) -> Option<Limit> {
	let config = GovernorConfigBuilder::default()
		.per_second(replenish_secs)
		.burst_size(burst)
		.use_headers()
		.error_handler(error_handler)
		.finish()?;

	Some(Arc::new(config))
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!("rate limiting storage size: {}", limiter.len());

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_zero_rate_is_rejected() {
		assert!(limit(0, 10).is_none());
		assert!(limit(10, 0).is_none());
		assert!(limit(10, 50).is_some());
	}
}
