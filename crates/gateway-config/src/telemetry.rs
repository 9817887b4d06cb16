use std::collections::HashMap;

use serde::Deserialize;
use url::Url;

/// Log enrichment and OTLP span export
///
/// Leaving out every exporter keeps the gateway on plain logs.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Extra resource attributes attached to every span
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
    /// Log raw client requests and Bedrock payloads at debug level
    #[serde(default)]
    pub debug: bool,
    /// Collector shared by every signal unless overridden
    #[serde(default)]
    pub exporter: Option<OtlpExporter>,
    #[serde(default)]
    pub tracing: Option<TraceSettings>,
}

impl TelemetryConfig {
    /// Collector spans go to: the tracing override, else the shared one
    pub fn span_exporter(&self) -> Option<&OtlpExporter> {
        self.tracing
            .as_ref()
            .and_then(|tracing| tracing.exporter.as_ref())
            .or(self.exporter.as_ref())
    }

    /// Ratio of root spans kept, and whether parents decide for children
    pub fn sampling(&self) -> (f64, bool) {
        self.tracing
            .as_ref()
            .map_or((1.0, true), |tracing| (tracing.sampling_rate, tracing.parent_based))
    }
}

/// An OTLP collector endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OtlpExporter {
    pub endpoint: Url,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    /// Sent with every export, as gRPC metadata or HTTP headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    #[serde(alias = "http")]
    HttpProto,
}

/// `[telemetry.tracing]`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceSettings {
    /// Fraction of new traces recorded, from 0.0 to 1.0
    #[serde(default = "full_sampling")]
    pub sampling_rate: f64,
    #[serde(default = "parent_based_default")]
    pub parent_based: bool,
    #[serde(default)]
    pub exporter: Option<OtlpExporter>,
}

fn default_service_name() -> String {
    "bedrock-gateway".to_owned()
}

const fn full_sampling() -> f64 {
    1.0
}

const fn parent_based_default() -> bool {
    true
}
