//! Application configuration loaded from environment variables.

use std::net::IpAddr;

use crate::route::auth::model::AdminInput;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {value:?}")]
	Invalid { name: &'static str, value: String },
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
	/// Postgres connection string.
	pub database_url: String,
	/// Address to bind the server to.
	pub bind_addr: IpAddr,
	pub port: u16,
	/// Whether to export traces and metrics over OTLP.
	pub otel_enabled: bool,
	/// Seconds between replenishing one request of a client's quota.
	pub rate_limit_replenish_secs: u64,
	pub rate_limit_burst: u32,
	/// An administrator to create or update on startup.
	pub admin: Option<AdminInput>,
}

impl Config {
	/// Load configuration from environment variables.
	///
	/// Required:
	/// - `DATABASE_URL`
	///
	/// Optional:
	/// - `BIND_ADDR` (default: "127.0.0.1")
	/// - `PORT` (default: 3000)
	/// - `OTEL_ENABLED` (default: false)
	/// - `RATE_LIMIT_REPLENISH_SECS` (default: 1)
	/// - `RATE_LIMIT_BURST` (default: 50)
	/// - `ADMIN_EMAIL`, `ADMIN_NAME`, `ADMIN_PASSWORD`: all three, or none
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
		let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

		let admin = match (
			lookup("ADMIN_EMAIL"),
			lookup("ADMIN_NAME"),
			lookup("ADMIN_PASSWORD"),
		) {
			(Some(email), Some(name), Some(password)) => Some(AdminInput {
				email,
				name,
				password,
			}),
			(None, None, None) => None,
			(email, ..) => {
				return Err(ConfigError::Invalid {
					name: "ADMIN_EMAIL",
					value: email.unwrap_or_default(),
				})
			}
		};

		Ok(Self {
			database_url,
			bind_addr: parse(&lookup, "BIND_ADDR", IpAddr::from([127, 0, 0, 1]))?,
			port: parse(&lookup, "PORT", 3000)?,
			otel_enabled: parse(&lookup, "OTEL_ENABLED", false)?,
			rate_limit_replenish_secs: parse(&lookup, "RATE_LIMIT_REPLENISH_SECS", 1)?,
			rate_limit_burst: parse(&lookup, "RATE_LIMIT_BURST", 50)?,
			admin,
		})
	}
}

fn parse<T: std::str::FromStr>(
	lookup: impl Fn(&str) -> Option<String>,
	name: &'static str,
	default: T,
) -> Result<T, ConfigError> {
	match lookup(name) {
		Some(value) => value
			.parse()
			.map_err(|_| ConfigError::Invalid { name, value }),
		None => Ok(default),
	}
}
