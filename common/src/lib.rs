pub mod metrics;
pub mod tracer;

/// Identifies the component in logs and in the component-info metric.
pub const COMPONENT_NAME: &str = "nexus-scan-writer";
