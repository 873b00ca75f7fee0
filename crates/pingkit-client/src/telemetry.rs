//! Tracing bootstrap, span wrapping, and trace-context propagation.
//!
//! Every action runs inside exactly one span named after the action,
//! including the no-op control action. Completed spans are handed to a
//! batched OTLP exporter; delivery is best-effort and an unreachable sink
//! never fails the action. The active span context crosses the RPC
//! boundary as W3C `traceparent` metadata so the remote side correlates.

use std::future::Future;
use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use pingkit_proto::PingServiceClient;
use tonic::metadata::{Ascii, MetadataKey, MetadataMap, MetadataValue};
use tonic::service::Interceptor;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::{Instrument, Span, info_span, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::ClientError;

/// Trace sink of the reference deployment.
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

/// A stub whose outgoing requests carry the active trace context.
pub type TracedStub = PingServiceClient<InterceptedService<Channel, TraceContextInterceptor>>;

/// Configuration for the tracing pipeline.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    /// Service name attached to exported spans.
    pub service_name: String,
    /// OTLP/gRPC endpoint of the trace sink.
    pub endpoint: String,
    /// Whether to export spans at all. When false only the env-filtered
    /// fmt subscriber is installed; spans are still created.
    pub enabled: bool,
}

impl OtelConfig {
    /// Create a configuration for the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            endpoint: DEFAULT_OTLP_ENDPOINT.to_string(),
            enabled: true,
        }
    }

    /// Read the configuration from the environment, falling back to the
    /// default sink.
    ///
    /// Recognized variables: `PINGKIT_OTLP_ENDPOINT`,
    /// `PINGKIT_OTEL_ENABLED` (`0`/`false`/`off` disable export).
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("PINGKIT_OTLP_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(value) = std::env::var("PINGKIT_OTEL_ENABLED") {
            let value = value.trim().to_ascii_lowercase();
            config.enabled = !matches!(value.as_str(), "0" | "false" | "off");
        }
        config
    }

    /// Set the OTLP endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Turn span export off.
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl Default for OtelConfig {
    fn default() -> Self {
        Self::new("pingkit")
    }
}

/// Install the tracing pipeline for the lifetime of the process.
///
/// Layers an OpenTelemetry export layer over an env-filtered fmt
/// subscriber, registers the W3C propagator, and wires a batched OTLP
/// span exporter. With export disabled only the fmt subscriber is
/// installed. Returns the guard that owns the provider; dropping it (or
/// calling [`TracingGuard::shutdown`]) flushes pending spans.
pub fn init_tracing(config: OtelConfig) -> Result<TracingGuard, ClientError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pingkit_cli=info,pingkit_client=info"));
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !config.enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .try_init()
            .map_err(|e| ClientError::Telemetry {
                message: e.to_string(),
            })?;
        return Ok(TracingGuard {
            provider: None,
            handle: TracerHandle::new(config.service_name),
        });
    }

    global::set_text_map_propagator(TraceContextPropagator::new());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.endpoint)
        .build()
        .map_err(|e| ClientError::Telemetry {
            message: e.to_string(),
        })?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            Resource::builder()
                .with_service_name(config.service_name.clone())
                .build(),
        )
        .build();

    let tracer = provider.tracer("pingkit");
    global::set_tracer_provider(provider.clone());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .map_err(|e| ClientError::Telemetry {
            message: e.to_string(),
        })?;

    Ok(TracingGuard {
        provider: Some(provider),
        handle: TracerHandle::new(config.service_name),
    })
}

/// Owns the span pipeline; flushes the batch exporter on shutdown.
pub struct TracingGuard {
    provider: Option<SdkTracerProvider>,
    handle: TracerHandle,
}

impl TracingGuard {
    /// A guard with no export pipeline. Spans are still created and
    /// observable through whatever subscriber the caller installs.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            provider: None,
            handle: TracerHandle::new("pingkit"),
        }
    }

    /// The handle threaded through the dispatcher into each executor call.
    #[must_use]
    pub fn handle(&self) -> TracerHandle {
        self.handle.clone()
    }

    /// Flush pending spans and tear the pipeline down.
    pub fn shutdown(mut self) {
        self.flush();
    }

    fn flush(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                warn!("span exporter shutdown failed: {e}");
            }
        }
    }
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Explicit tracer handle passed into the dispatcher.
///
/// Span creation goes through this handle rather than an ambient
/// singleton; the export pipeline behind it is whatever subscriber is
/// installed for the current context.
#[derive(Debug, Clone)]
pub struct TracerHandle {
    service_name: Arc<str>,
}

impl TracerHandle {
    /// Create a handle labeling spans with the given service name.
    #[must_use]
    pub fn new(service_name: impl Into<Arc<str>>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Run `fut` inside a span named after the action.
    ///
    /// The span opens before the future is first polled and closes when
    /// the future completes or fails; exactly one span per call.
    pub async fn in_span<F: Future>(&self, action: &str, fut: F) -> F::Output {
        let span = info_span!(
            "action",
            otel.name = %action,
            otel.kind = "client",
            service.name = %self.service_name,
        );
        fut.instrument(span).await
    }
}

/// Injects the active span context into outgoing request metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceContextInterceptor;

impl Interceptor for TraceContextInterceptor {
    fn call(&mut self, mut request: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        let context = Span::current().context();
        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&context, &mut MetadataInjector(request.metadata_mut()));
        });
        Ok(request)
    }
}

struct MetadataInjector<'a>(&'a mut MetadataMap);

impl opentelemetry::propagation::Injector for MetadataInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(key) = MetadataKey::<Ascii>::from_bytes(key.as_bytes()) else {
            return;
        };
        let Ok(value) = MetadataValue::try_from(value.as_str()) else {
            return;
        };
        self.0.insert(key, value);
    }
}

/// Bind a context-propagating stub to an open channel.
#[must_use]
pub fn bind_stub(channel: Channel) -> TracedStub {
    PingServiceClient::with_interceptor(channel, TraceContextInterceptor)
}
