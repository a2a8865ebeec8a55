//! Devices taking part in a scan, and the providers through which they
//! contribute to the scan file.
mod metadata_writer;
mod provider;

pub use metadata_writer::ScanMetadataWriter;
pub use provider::{AuxiliaryDataGroup, NexusObjectProvider};

use crate::{
    nexus::ScanRole,
    tree::{NexusGroupNode, NexusTreeError},
};
use std::{collections::HashMap, rc::Rc};
use thiserror::Error;

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Device {device} is not configured: {reason}")]
    NotConfigured { device: String, reason: String },
    #[error("Tree Error: {0}")]
    Tree(#[from] NexusTreeError),
    #[error("{0}")]
    Other(String),
}

/// What every device is told about the scan before it provides its group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NexusScanInfo {
    scan_shape: Vec<usize>,
    dimension_names_by_index: Vec<Vec<String>>,
    device_names: HashMap<ScanRole, Vec<String>>,
    scan_command: Option<String>,
}

impl NexusScanInfo {
    pub fn new(
        scan_shape: Vec<usize>,
        dimension_names_by_index: Vec<Vec<String>>,
        device_names: HashMap<ScanRole, Vec<String>>,
        scan_command: Option<String>,
    ) -> Self {
        Self {
            scan_shape,
            dimension_names_by_index,
            device_names,
            scan_command,
        }
    }

    pub fn scan_shape(&self) -> &[usize] {
        &self.scan_shape
    }

    /// Number of scan dimensions. Taken from the dimension names if the shape is unknown.
    pub fn rank(&self) -> usize {
        self.scan_shape
            .len()
            .max(self.dimension_names_by_index.len())
    }

    pub fn dimension_names_by_index(&self) -> &[Vec<String>] {
        &self.dimension_names_by_index
    }

    pub fn device_names(&self, role: ScanRole) -> &[String] {
        self.device_names
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn scan_command(&self) -> Option<&str> {
        self.scan_command.as_deref()
    }
}

/// Changes the entry after the device's own group has been added to it.
pub trait CustomEntryModification {
    fn modify_entry(&self, entry: &mut NexusGroupNode) -> DeviceResult<()>;
}

/// A device contributing a single group to the scan file.
pub trait NexusDevice {
    fn name(&self) -> &str;

    /// Implementation should describe the group which this device writes.
    /// # Error Modes
    /// Implementations should return [DeviceError] if the group cannot be described,
    /// for instance because the device is not ready.
    fn nexus_provider(&self, info: &NexusScanInfo) -> DeviceResult<NexusObjectProvider>;

    fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        None
    }
}

/// A device contributing several groups to the scan file, such as a
/// sub-system running its own devices.
pub trait MultipleNexusDevice {
    fn name(&self) -> &str;

    fn nexus_providers(&self, info: &NexusScanInfo) -> DeviceResult<Vec<NexusObjectProvider>>;

    fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        None
    }
}

/// A device in one of the scan model's role lists.
#[derive(Clone)]
pub enum ScanDevice {
    Single(Rc<dyn NexusDevice>),
    Multiple(Rc<dyn MultipleNexusDevice>),
}

impl ScanDevice {
    pub fn name(&self) -> &str {
        match self {
            Self::Single(device) => device.name(),
            Self::Multiple(device) => device.name(),
        }
    }

    /// Every provider of the device, a single device giving exactly one.
    pub fn nexus_providers(&self, info: &NexusScanInfo) -> DeviceResult<Vec<NexusObjectProvider>> {
        match self {
            Self::Single(device) => Ok(vec![device.nexus_provider(info)?]),
            Self::Multiple(device) => device.nexus_providers(info),
        }
    }

    pub fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        match self {
            Self::Single(device) => device.custom_entry_modification(),
            Self::Multiple(device) => device.custom_entry_modification(),
        }
    }
}

impl std::fmt::Debug for ScanDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(_) => write!(f, "Single({})", self.name()),
            Self::Multiple(_) => write!(f, "Multiple({})", self.name()),
        }
    }
}

/// Applied to every device before it is asked for its providers.
pub trait DeviceDecorator {
    fn decorate(&self, device: ScanDevice) -> ScanDevice;
}

/// Leaves devices as they are.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityDecorator;

impl DeviceDecorator for IdentityDecorator {
    fn decorate(&self, device: ScanDevice) -> ScanDevice {
        device
    }
}
