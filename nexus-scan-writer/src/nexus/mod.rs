//! NeXus vocabulary shared by every layer of the scan-file writer: base classes,
//! scan roles, attribute names and the date-time format of timestamp fields.
mod classes;
mod roles;

pub use classes::NexusBaseClass;
pub use roles::ScanRole;

/// Timestamps are written with millisecond precision, as string date parsers
/// downstream cannot round-trip anything finer.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

pub type NexusDateTime = chrono::DateTime<chrono::Utc>;

pub mod units {
    pub const MILLISECONDS: &str = "ms";
}

/// Names of attributes which have a meaning to NeXus readers.
pub mod labels {
    pub const NX_CLASS: &str = "NX_class";
    pub const SIGNAL: &str = "signal";
    pub const AUXILIARY_SIGNALS: &str = "auxiliary_signals";
    pub const AXES: &str = "axes";
    pub const DEFAULT: &str = "default";
    pub const UNITS: &str = "units";
    pub const INDICES_SUFFIX: &str = "_indices";
    /// Placeholder in `@axes` for a dimension without a default axis.
    pub const NO_AXIS: &str = ".";
}

/// Returns the name of the `<field>_indices` attribute for the given field.
pub fn indices_attribute_name(field_name: &str) -> String {
    format!("{field_name}{}", labels::INDICES_SUFFIX)
}
