use prometheus::{IntCounterVec, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Tracks every service operation by outcome so conflict and not-found rates
// are visible without log scraping. Scraped via GET /metrics on the API
// server.
//
// ============================================================================

/// Central metrics registry for the service.
pub struct Metrics {
    registry: Registry,

    /// Operations by (operation, outcome), e.g. ("confirm", "conflict").
    pub operations_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "enrollment_operations_total",
                "Enrollment service operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        Ok(Self {
            registry,
            operations_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Helper to record one operation outcome
    pub fn record_operation(&self, operation: &str, outcome: &str) {
        self.operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
