use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::{
	metrics::{
		reader::{DefaultAggregationSelector, DefaultTemporalitySelector},
		Aggregation, Instrument, MeterProviderBuilder, PeriodicReader, SdkMeterProvider, Stream,
	},
	runtime,
	trace::{BatchConfig, Sampler, Tracer},
	Resource,
};
use opentelemetry_semantic_conventions::{
	resource::{DEPLOYMENT_ENVIRONMENT, SERVICE_NAME, SERVICE_VERSION},
	SCHEMA_URL,
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_opentelemetry::MetricsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The histogram recording how long requests take to serve.
pub const REQUEST_DURATION: &str = "request_duration_ms";

/// Constructs a [`Resource`] which describes the service.
fn resource() -> Resource {
	Resource::from_schema_url(
		[
			KeyValue::new(SERVICE_NAME, env!("CARGO_PKG_NAME")),
			KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
			KeyValue::new(
				DEPLOYMENT_ENVIRONMENT,
				if cfg!(debug_assertions) {
					"development"
				} else {
					"production"
				},
			),
		],
		SCHEMA_URL,
	)
}

/// Constructs an [`SdkMeterProvider`] with a custom view for request durations.
fn init_meter_provider() -> Result<SdkMeterProvider, opentelemetry::metrics::MetricsError> {
	let exporter = opentelemetry_otlp::new_exporter()
		.tonic()
		.build_metrics_exporter(
			Box::new(DefaultAggregationSelector::new()),
			Box::new(DefaultTemporalitySelector::new()),
		)?;

	let reader = PeriodicReader::builder(exporter, runtime::Tokio)
		.with_interval(std::time::Duration::from_secs(5))
		.build();

	// Mirror metrics to stdout while developing
	#[cfg(debug_assertions)]
	let stdout_reader = PeriodicReader::builder(
		opentelemetry_stdout::MetricsExporter::default(),
		runtime::Tokio,
	)
	.build();

	let view_duration = |instrument: &Instrument| -> Option<Stream> {
		if instrument.name == REQUEST_DURATION {
			Some(
				Stream::new()
					.name(REQUEST_DURATION)
					.aggregation(Aggregation::ExplicitBucketHistogram {
						boundaries: vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0],
						record_min_max: true,
					}),
			)
		} else {
			None
		}
	};

	let meter_provider = MeterProviderBuilder::default();
	#[cfg(debug_assertions)]
	let meter_provider = meter_provider.with_reader(stdout_reader);

	let meter_provider = meter_provider
		.with_resource(resource())
		.with_reader(reader)
		.with_view(view_duration)
		.build();

	global::set_meter_provider(meter_provider.clone());

	Ok(meter_provider)
}

/// Constructs a [`Tracer`] that exports every span over OTLP.
fn init_tracer() -> Result<Tracer, opentelemetry::trace::TraceError> {
	opentelemetry_otlp::new_pipeline()
		.tracing()
		.with_trace_config(
			opentelemetry_sdk::trace::Config::default()
				.with_sampler(Sampler::TraceIdRatioBased(1.0))
				.with_resource(resource()),
		)
		.with_batch_config(BatchConfig::default())
		.with_exporter(opentelemetry_otlp::new_exporter().tonic())
		.install_batch(runtime::Tokio)
}

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
	#[error("metrics error: {0}")]
	Metrics(#[from] opentelemetry::metrics::MetricsError),
	#[error("trace error: {0}")]
	Trace(#[from] opentelemetry::trace::TraceError),
}

/// Initializes a plain formatting subscriber, for when nothing is exported.
pub fn init_fmt_subscriber() {
	tracing_subscriber::registry()
		.with(LevelFilter::from_level(Level::INFO))
		.with(tracing_subscriber::fmt::layer().with_ansi(true))
		.init();
}

/// Initializes the tracing subscriber with OpenTelemetry support, returning
/// a guard that cleans up the global tracer and meter provider when dropped.
pub fn init_tracing_subscriber() -> Result<OtelGuard, TraceError> {
	let meter_provider = init_meter_provider()?;
	let tracer = init_tracer()?;

	tracing_subscriber::registry()
		.with(LevelFilter::from_level(Level::INFO))
		.with(tracing_subscriber::fmt::layer().with_ansi(true))
		.with(MetricsLayer::new(meter_provider.clone()))
		.with(tracing_opentelemetry::layer().with_tracer(tracer))
		.init();

	Ok(OtelGuard { meter_provider })
}

pub struct OtelGuard {
	meter_provider: SdkMeterProvider,
}

impl Drop for OtelGuard {
	fn drop(&mut self) {
		if let Err(err) = self.meter_provider.shutdown() {
			eprintln!("{err:?}");
		}

		opentelemetry::global::shutdown_tracer_provider();
	}
}
