use super::NexusBaseClass;
use serde::Deserialize;

/// The functional category of a device within a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanRole {
    #[strum(to_string = "detector")]
    Detector,
    #[strum(to_string = "monitor_per_point")]
    MonitorPerPoint,
    #[strum(to_string = "monitor_per_scan")]
    MonitorPerScan,
    #[strum(to_string = "scannable")]
    Scannable,
}

/// Roles of devices provided by a multiple-device bundle are looked up from their
/// base class. Most base classes are deliberately absent: such devices cannot be
/// given a role and are rejected.
const ROLES_BY_BASE_CLASS: &[(NexusBaseClass, ScanRole)] = &[
    (NexusBaseClass::Detector, ScanRole::Detector),
    (NexusBaseClass::Monitor, ScanRole::MonitorPerPoint),
    (NexusBaseClass::Positioner, ScanRole::Scannable),
];

impl ScanRole {
    /// Order in which devices are added to the entry, per-scan monitors first.
    pub const ENTRY_ORDER: [ScanRole; 4] = [
        ScanRole::MonitorPerScan,
        ScanRole::Detector,
        ScanRole::MonitorPerPoint,
        ScanRole::Scannable,
    ];

    pub fn from_base_class(base_class: NexusBaseClass) -> Option<ScanRole> {
        ROLES_BY_BASE_CLASS
            .iter()
            .find(|(class, _)| *class == base_class)
            .map(|(_, role)| *role)
    }
}
