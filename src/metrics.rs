//! Process-wide metrics and tracing spans.
//!
//! Meters are created through OpenTelemetry and read out through a Prometheus
//! registry, which `GET /metrics` renders in the text exposition format.

#[cfg(feature = "metrics")]
pub use self::otel::{StorefrontMetrics, METRICS};

/// Render every registered metric family in Prometheus text format.
///
/// Returns an empty document when the `metrics` feature is disabled.
pub fn render() -> String {
    #[cfg(feature = "metrics")]
    {
        match METRICS.render() {
            Ok(text) => text,
            Err(e) => {
                log::error!("failed to encode metrics: {e}");
                String::new()
            }
        }
    }
    #[cfg(not(feature = "metrics"))]
    {
        String::new()
    }
}

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
    use opentelemetry::KeyValue;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::{Encoder, Registry, TextEncoder};
    use std::time::Duration;

    pub static METRICS: Lazy<StorefrontMetrics> = Lazy::new(StorefrontMetrics::init);

    pub struct StorefrontMetrics {
        registry: Registry,
        // Dropping the provider shuts the readers down.
        _provider: SdkMeterProvider,
        http_requests_total: Counter<u64>,
        http_request_duration: Histogram<f64>,
        query_duration: Histogram<f64>,
        query_errors_total: Counter<u64>,
        connection_wait_duration: Histogram<f64>,
        pool_timeouts_total: Counter<u64>,
        orders_created_total: Counter<u64>,
        notification_failures_total: Counter<u64>,
    }

    impl StorefrontMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            let mut builder = SdkMeterProvider::builder();
            match opentelemetry_prometheus::exporter()
                .with_registry(registry.clone())
                .build()
            {
                Ok(exporter) => builder = builder.with_reader(exporter),
                Err(e) => log::error!("prometheus exporter unavailable, metrics disabled: {e}"),
            }
            let provider = builder.build();
            let meter = provider.meter("storefront");

            let http_requests_total = meter
                .u64_counter("storefront_http_requests_total")
                .with_description("HTTP requests served, by method and status")
                .build();
            let http_request_duration = meter
                .f64_histogram("storefront_http_request_duration_seconds")
                .with_description("Time spent handling HTTP requests")
                .build();
            let query_duration = meter
                .f64_histogram("storefront_query_duration_seconds")
                .with_description("Duration of database statements")
                .build();
            let query_errors_total = meter
                .u64_counter("storefront_query_errors_total")
                .with_description("Database statements that returned an error")
                .build();
            let connection_wait_duration = meter
                .f64_histogram("storefront_connection_wait_seconds")
                .with_description("Time spent opening or checking out a connection")
                .build();
            let pool_timeouts_total = meter
                .u64_counter("storefront_pool_timeouts_total")
                .with_description("Connection checkouts that timed out")
                .build();
            let orders_created_total = meter
                .u64_counter("storefront_orders_created_total")
                .with_description("Orders created from carts")
                .build();
            let notification_failures_total = meter
                .u64_counter("storefront_notification_failures_total")
                .with_description("Order notifications that failed or were dropped")
                .build();

            Self {
                registry,
                _provider: provider,
                http_requests_total,
                http_request_duration,
                query_duration,
                query_errors_total,
                connection_wait_duration,
                pool_timeouts_total,
                orders_created_total,
                notification_failures_total,
            }
        }

        pub fn record_http_request(&self, method: &str, status: u16, elapsed: Duration) {
            let attrs = [
                KeyValue::new("method", method.to_string()),
                KeyValue::new("status", i64::from(status)),
            ];
            self.http_requests_total.add(1, &attrs);
            self.http_request_duration
                .record(elapsed.as_secs_f64(), &attrs[..1]);
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_connection_wait(&self, elapsed: Duration) {
            self.connection_wait_duration
                .record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_pool_timeout(&self) {
            self.pool_timeouts_total.add(1, &[]);
        }

        pub fn record_order_created(&self) {
            self.orders_created_total.add(1, &[]);
        }

        pub fn record_notification_failure(&self) {
            self.notification_failures_total.add(1, &[]);
        }

        pub fn render(&self) -> Result<String, prometheus::Error> {
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
            Ok(String::from_utf8_lossy(&buffer).into_owned())
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    const MAX_STATEMENT_LEN: usize = 120;

    fn statement_preview(query: &str) -> &str {
        match query.char_indices().nth(MAX_STATEMENT_LEN) {
            Some((idx, _)) => &query[..idx],
            None => query,
        }
    }

    pub fn acquire_connection_span() -> Span {
        tracing::debug_span!("storefront.acquire_connection")
    }

    pub fn execute_query_span(query: &str) -> Span {
        tracing::trace_span!("storefront.execute_query", db.statement = statement_preview(query))
    }

    pub fn begin_transaction_span() -> Span {
        tracing::debug_span!("storefront.begin_transaction")
    }

    pub fn commit_transaction_span() -> Span {
        tracing::debug_span!("storefront.commit_transaction")
    }

    pub fn rollback_transaction_span() -> Span {
        tracing::debug_span!("storefront.rollback_transaction")
    }

    pub fn http_request_span(method: &str, path: &str) -> Span {
        tracing::info_span!("storefront.http_request", http.method = method, http.path = path)
    }

}
