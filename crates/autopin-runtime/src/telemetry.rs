//! Process-wide `tracing` setup for the `autopin` binary and embedders.
//!
//! Everything the watchdog says goes through `tracing`: bootstrap progress
//! at `info`, every diagnostics report at `error` (with `scope`, `kind` and
//! `category` fields), event routing at `debug` and `trace`.  [`init_tracing`]
//! decides where it ends up.
//!
//! | Variable | Effect |
//! |---|---|
//! | `RUST_LOG` | Filter directives, `info` when unset. |
//! | `AUTOPIN_LOG_FORMAT` | `json` for one JSON object per line, anything else for compact text. |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Collector base URL; spans such as `watchdog_run` are exported over OTLP/HTTP. |
//!
//! ```rust,no_run
//! let _guard = autopin_runtime::telemetry::init_tracing("autopin");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FORMAT_VAR: &str = "AUTOPIN_LOG_FORMAT";
const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Console output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects [`LogFormat::Json`]; every other value,
    /// or none, keeps the compact text output.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }

    fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_VAR).ok().as_deref())
    }
}

/// Install the global subscriber for `service_name`.
///
/// Only the first call in a process installs anything; later calls report
/// the conflict on stderr and return a guard of their own.  Keep the guard
/// alive until exit, its drop flushes the exporter.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let provider = otlp_provider(service_name);
    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("autopin")));
    let registry = tracing_subscriber::registry().with(filter).with(otel);

    let installed = match LogFormat::from_env() {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    };
    if let Err(e) = installed {
        eprintln!("[autopin] keeping the existing tracing subscriber: {e}");
    }

    TracerProviderGuard(provider)
}

/// Flushes and shuts down the OTLP exporter, if one was configured.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[autopin] span exporter shutdown failed: {e}");
        }
    }
}

fn otlp_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var(OTLP_ENDPOINT_VAR).ok()?;
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[autopin] span exporter unavailable: {e}"))
        .ok()?;

    // Simple (synchronous) export: the CLI sets up tracing before any Tokio
    // runtime exists.
    Some(
        SdkTracerProvider::builder()
            .with_resource(
                Resource::builder()
                    .with_service_name(service_name.to_string())
                    .build(),
            )
            .with_simple_exporter(exporter)
            .build(),
    )
}
