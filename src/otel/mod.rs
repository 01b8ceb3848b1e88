//! Telemetry for procurement-api
//!
//! Logs always go to stdout through tracing-subscriber, as JSON lines unless
//! `logging.format` asks for text. With `otel.enabled`, spans and the
//! [`AuthMetrics`] instruments are also exported over OTLP/gRPC. Without it
//! the metrics are recorded into a provider with no reader.

use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter, MeterProvider as _},
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_sdk::{metrics::SdkMeterProvider, trace::TracerProvider, Resource};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::{LoggingConfig, OtelConfig};

/// Telemetry setup errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Export enabled without somewhere to send it
    #[error("otel.endpoint is required when otel.enabled is set")]
    MissingEndpoint,

    /// OTLP exporter could not be built
    #[error("Failed to build OTLP exporter: {0}")]
    Exporter(String),

    /// A global subscriber is already installed
    #[error("Failed to install log subscriber: {0}")]
    Subscriber(String),

    /// Flushing or shutting down a provider failed
    #[error("Failed to shut down telemetry: {0}")]
    Shutdown(String),
}

/// Trace and metric providers for the running service
pub struct Telemetry {
    service_name: String,
    tracer_provider: Option<TracerProvider>,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    /// Build providers from `config`
    ///
    /// Exporters are only created when export is enabled; the tracer provider
    /// is then also installed globally.
    pub fn new(config: &OtelConfig) -> Result<Self, TelemetryError> {
        let resource = Resource::new(vec![KeyValue::new(
            "service.name",
            config.service_name.clone(),
        )]);

        let endpoint = match (config.enabled, config.endpoint.as_deref()) {
            (false, _) => None,
            (true, None) => return Err(TelemetryError::MissingEndpoint),
            (true, Some(endpoint)) => Some(endpoint),
        };

        let mut meters = SdkMeterProvider::builder().with_resource(resource.clone());
        let tracer_provider = match endpoint {
            Some(endpoint) => {
                meters = meters.with_reader(otlp_metric_reader(endpoint)?);
                let provider = otlp_tracer_provider(endpoint, resource)?;
                global::set_tracer_provider(provider.clone());
                Some(provider)
            }
            None => None,
        };

        Ok(Self {
            service_name: config.service_name.clone(),
            tracer_provider,
            meter_provider: meters.build(),
        })
    }

    /// Whether spans and metrics leave the process
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some()
    }

    /// Authentication metrics on this service's meter
    pub fn auth_metrics(&self) -> AuthMetrics {
        AuthMetrics::new(&self.meter_provider.meter(self.service_name.clone()))
    }

    /// Install the global log subscriber
    ///
    /// `RUST_LOG`, when set, overrides `logging.level`.
    pub fn init_logging(&self, logging: &LoggingConfig) -> Result<(), TelemetryError> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::default()
                .add_directive(LevelFilter::from_level(parse_level(&logging.level)).into())
        });

        let text = is_text_format(&logging.format);
        let json_layer = (!text).then(|| tracing_subscriber::fmt::layer().json());
        let text_layer = text.then(tracing_subscriber::fmt::layer);

        let otel_layer = self.tracer_provider.as_ref().map(|provider| {
            tracing_opentelemetry::layer().with_tracer(provider.tracer(self.service_name.clone()))
        });

        tracing_subscriber::registry()
            .with(filter)
            .with(otel_layer)
            .with(json_layer)
            .with(text_layer)
            .try_init()
            .map_err(|e| TelemetryError::Subscriber(e.to_string()))
    }

    /// Flush spans and stop metric collection
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        if let Some(provider) = &self.tracer_provider {
            for result in provider.force_flush() {
                result.map_err(|e| TelemetryError::Shutdown(format!("spans: {:?}", e)))?;
            }
        }

        self.meter_provider
            .shutdown()
            .map_err(|e| TelemetryError::Shutdown(format!("metrics: {:?}", e)))
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn otlp_tracer_provider(
    endpoint: &str,
    resource: Resource,
) -> Result<TracerProvider, TelemetryError> {
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::Config};

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(endpoint)
        .build_span_exporter()
        .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_config(Config::default().with_resource(resource))
        .build())
}

fn otlp_metric_reader(
    endpoint: &str,
) -> Result<opentelemetry_sdk::metrics::PeriodicReader, TelemetryError> {
    use opentelemetry_otlp::{MetricsExporterBuilder, WithExportConfig};
    use opentelemetry_sdk::metrics::{
        reader::{DefaultAggregationSelector, DefaultTemporalitySelector},
        PeriodicReader,
    };
    use opentelemetry_sdk::runtime;

    let exporter = MetricsExporterBuilder::from(
        opentelemetry_otlp::new_exporter()
            .tonic()
            .with_endpoint(endpoint),
    )
    .build_metrics_exporter(
        Box::new(DefaultTemporalitySelector::new()),
        Box::new(DefaultAggregationSelector::new()),
    )
    .map_err(|e| TelemetryError::Exporter(e.to_string()))?;

    Ok(PeriodicReader::builder(exporter, runtime::Tokio).build())
}

fn is_text_format(format: &str) -> bool {
    matches!(format.to_lowercase().as_str(), "pretty" | "text")
}

fn parse_level(log_level: &str) -> Level {
    match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Authentication and authorization metrics
///
/// Rejection reasons are recorded here so operators can tell an expired
/// token from a forged one; clients only ever see a uniform 401.
pub struct AuthMetrics {
    /// Login attempts by outcome
    pub logins_total: Counter<u64>,

    /// Requests rejected by the auth middleware, by reason
    pub auth_rejections_total: Counter<u64>,

    /// Ownership checks that denied a write, by rule
    pub ownership_denials_total: Counter<u64>,

    /// Password hash/verify duration in seconds
    pub credential_duration: Histogram<f64>,
}

impl AuthMetrics {
    /// Create new metrics with the given meter
    pub fn new(meter: &Meter) -> Self {
        let logins_total = meter
            .u64_counter("procurement_logins_total")
            .with_description("Login attempts by outcome")
            .init();

        let auth_rejections_total = meter
            .u64_counter("procurement_auth_rejections_total")
            .with_description("Requests rejected by the auth middleware")
            .init();

        let ownership_denials_total = meter
            .u64_counter("procurement_ownership_denials_total")
            .with_description("Writes denied by ownership checks")
            .init();

        let credential_duration = meter
            .f64_histogram("procurement_credential_duration_seconds")
            .with_description("Password hashing and verification duration in seconds")
            .init();

        Self {
            logins_total,
            auth_rejections_total,
            ownership_denials_total,
            credential_duration,
        }
    }

    /// Metrics backed by the global meter provider
    pub fn from_global() -> Self {
        Self::new(&global::meter("procurement-api"))
    }

    /// Record a login attempt
    pub fn record_login(&self, outcome: &str) {
        self.logins_total
            .add(1, &[KeyValue::new("outcome", outcome.to_string())]);
    }

    /// Record an auth middleware rejection
    pub fn record_auth_rejection(&self, reason: &str) {
        self.auth_rejections_total
            .add(1, &[KeyValue::new("reason", reason.to_string())]);
    }

    /// Record an ownership denial
    pub fn record_ownership_denial(&self, rule: &str) {
        self.ownership_denials_total
            .add(1, &[KeyValue::new("rule", rule.to_string())]);
    }

    /// Record credential operation duration
    pub fn record_credential_duration(&self, operation: &str, duration_secs: f64) {
        self.credential_duration.record(
            duration_secs,
            &[KeyValue::new("operation", operation.to_string())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> OtelConfig {
        OtelConfig {
            enabled: false,
            endpoint: None,
            service_name: "test-service".to_string(),
        }
    }

    // Test 1: disabled export builds no tracer provider
    #[test]
    fn test_telemetry_disabled() {
        let telemetry = Telemetry::new(&disabled_config()).unwrap();

        assert!(!telemetry.is_exporting());
        assert!(telemetry.shutdown().is_ok());
    }

    // Test 2: enabled export needs an endpoint
    #[test]
    fn test_telemetry_requires_endpoint() {
        let config = OtelConfig {
            enabled: true,
            endpoint: None,
            service_name: "test-service".to_string(),
        };

        assert!(matches!(
            Telemetry::new(&config),
            Err(TelemetryError::MissingEndpoint)
        ));
    }

    // Test 3: auth metrics record on the service meter without export
    #[test]
    fn test_auth_metrics_record() {
        let telemetry = Telemetry::new(&disabled_config()).unwrap();
        let metrics = telemetry.auth_metrics();

        metrics.record_login("success");
        metrics.record_login("invalid_credentials");
        metrics.record_auth_rejection("expired");
        metrics.record_auth_rejection("missing_header");
        metrics.record_ownership_denial("foreign_vendor");
        metrics.record_credential_duration("verify", 0.05);
    }

    // Test 4: metrics from the global meter, as tests and tools use them
    #[test]
    fn test_auth_metrics_from_global() {
        let metrics = AuthMetrics::from_global();
        metrics.record_ownership_denial("vendor_exists");
    }

    // Test 5: log level parsing falls back to INFO
    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    // Test 6: JSON unless text is asked for
    #[test]
    fn test_log_format_selection() {
        assert!(!is_text_format("json"));
        assert!(!is_text_format(""));
        assert!(is_text_format("Pretty"));
        assert!(is_text_format("text"));
    }

    // Test 7: error messages name the config key
    #[test]
    fn test_telemetry_error_display() {
        assert_eq!(
            TelemetryError::MissingEndpoint.to_string(),
            "otel.endpoint is required when otel.enabled is set"
        );
        assert_eq!(
            TelemetryError::Exporter("refused".to_string()).to_string(),
            "Failed to build OTLP exporter: refused"
        );
    }
}
