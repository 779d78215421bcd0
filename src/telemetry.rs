use opentelemetry::{trace::TraceError, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace as sdktrace, Resource};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_FILTER: &str = "info,travelbook_server=info,sqlx=warn,sea_orm=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Flattened events without timestamps, for log shippers that add their own.
    Json,
}

/// Logging and tracing knobs: `RUST_LOG`, `RUST_LOG_FORMAT`, `OTEL_EXPORTER_OTLP_ENDPOINT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub filter: String,
    pub format: LogFormat,
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("RUST_LOG_FORMAT").as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        Self {
            filter: lookup("RUST_LOG")
                .filter(|f| !f.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FILTER.to_string()),
            format,
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.trim().is_empty()),
        }
    }
}

fn otlp_tracer(endpoint: &str, service_name: &str) -> Result<sdktrace::Tracer, TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        resource::SERVICE_NAME,
        service_name.to_string(),
    )]);

    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            sdktrace::config()
                .with_resource(resource)
                .with_sampler(sdktrace::Sampler::AlwaysOn),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
}

/// Installs the global subscriber for `service_name`. A collector that cannot be
/// reached only disables span export; logging still starts.
pub fn init_telemetry(service_name: &str) {
    let settings = TelemetrySettings::from_env();

    let tracer = settings
        .otlp_endpoint
        .as_deref()
        .map(|endpoint| otlp_tracer(endpoint, service_name));
    let (tracer, otel_error) = match tracer {
        Some(Ok(tracer)) => (Some(tracer), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::new(&settings.filter))
        .with(tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t)));

    let fmt_layer = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .without_time()
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
    };
    registry.with(fmt_layer).init();

    tracing::debug!(service = service_name, format = ?settings.format, "telemetry ready");
    if let Some(e) = otel_error {
        tracing::warn!("OpenTelemetry export disabled: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> TelemetrySettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TelemetrySettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_to_text_without_export() {
        let s = settings(&[]);
        assert_eq!(s.format, LogFormat::Text);
        assert_eq!(s.filter, DEFAULT_FILTER);
        assert_eq!(s.otlp_endpoint, None);
    }

    #[test]
    fn reads_json_format_and_endpoint() {
        let s = settings(&[
            ("RUST_LOG_FORMAT", "JSON"),
            ("RUST_LOG", "debug"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317"),
        ]);
        assert_eq!(s.format, LogFormat::Json);
        assert_eq!(s.filter, "debug");
        assert_eq!(s.otlp_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn blank_values_fall_back() {
        let s = settings(&[("RUST_LOG", " "), ("OTEL_EXPORTER_OTLP_ENDPOINT", "")]);
        assert_eq!(s.filter, DEFAULT_FILTER);
        assert_eq!(s.otlp_endpoint, None);
    }
}
