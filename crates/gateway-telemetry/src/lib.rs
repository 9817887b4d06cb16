//! Logging and trace export for the gateway
//!
//! Everything goes through `tracing`: a `fmt` layer always, plus an OTLP span
//! exporter when one is configured.

mod metadata;

use std::collections::HashMap;

use anyhow::Context as _;
use gateway_config::{OtlpExporter, OtlpProtocol, TelemetryConfig};
use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig, WithHttpConfig, WithTonicConfig};
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const TRACER_NAME: &str = "bedrock-gateway";

/// Keeps span export alive; flushes pending spans when dropped
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let Some(provider) = self.provider.take() else {
            return;
        };
        if let Err(e) = provider.shutdown() {
            eprintln!("span export did not shut down cleanly: {e}");
        }
    }
}

/// Install the global subscriber
///
/// `log_filter` is an `EnvFilter` directive; an invalid one falls back to
/// `info`. Hold the returned guard for the lifetime of the process.
///
/// # Errors
///
/// Returns an error if the OTLP exporter cannot be built or a subscriber is
/// already installed
pub fn init(config: Option<&TelemetryConfig>, log_filter: &str) -> anyhow::Result<TelemetryGuard> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = match config {
        Some(config) => config
            .span_exporter()
            .map(|exporter| tracer_provider(config, exporter))
            .transpose()?,
        None => None,
    };

    if let Some(provider) = &provider {
        global::set_tracer_provider(provider.clone());
    }
    let otel_layer = provider
        .as_ref()
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(TRACER_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(otel_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(TelemetryGuard { provider })
}

fn tracer_provider(config: &TelemetryConfig, exporter: &OtlpExporter) -> anyhow::Result<SdkTracerProvider> {
    let (rate, parent_based) = config.sampling();

    Ok(SdkTracerProvider::builder()
        .with_resource(metadata::build_resource(config))
        .with_sampler(sampler(rate, parent_based))
        .with_batch_exporter(span_exporter(exporter)?)
        .build())
}

fn sampler(rate: f64, parent_based: bool) -> Sampler {
    let root = match rate {
        rate if rate >= 1.0 => Sampler::AlwaysOn,
        rate if rate <= 0.0 => Sampler::AlwaysOff,
        rate => Sampler::TraceIdRatioBased(rate),
    };

    if parent_based {
        Sampler::ParentBased(Box::new(root))
    } else {
        root
    }
}

fn span_exporter(exporter: &OtlpExporter) -> anyhow::Result<SpanExporter> {
    let endpoint = exporter.endpoint.as_str();

    match exporter.protocol {
        OtlpProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_metadata(grpc_metadata(&exporter.headers)?)
            .build()
            .with_context(|| format!("cannot export spans over gRPC to {endpoint}")),
        OtlpProtocol::HttpProto => SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint)
            .with_headers(exporter.headers.clone())
            .build()
            .with_context(|| format!("cannot export spans over HTTP to {endpoint}")),
    }
}

fn grpc_metadata(headers: &HashMap<String, String>) -> anyhow::Result<tonic::metadata::MetadataMap> {
    let mut map = http::HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        let name = http::HeaderName::try_from(name.as_str())
            .with_context(|| format!("invalid exporter header name '{name}'"))?;
        let value = http::HeaderValue::try_from(value.as_str())
            .with_context(|| format!("invalid value for exporter header '{name}'"))?;
        map.insert(name, value);
    }

    Ok(tonic::metadata::MetadataMap::from_headers(map))
}
