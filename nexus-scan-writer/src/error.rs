use crate::{
    device::DeviceError,
    file::NexusHDF5Error,
    nexus::{NexusBaseClass, ScanRole},
    template::TemplateError,
    tree::NexusTreeError,
};
use std::path::PathBuf;
use thiserror::Error;

pub type NexusScanResult<T> = Result<T, NexusScanError>;

/// The scan file operation which was called out of turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum LifecycleOperation {
    #[strum(to_string = "create_nexus_file")]
    CreateNexusFile,
    #[strum(to_string = "flush")]
    Flush,
    #[strum(to_string = "scan_finished")]
    ScanFinished,
}

#[derive(Debug, Error)]
pub enum NexusScanError {
    #[error("{0}")]
    Tree(#[from] NexusTreeError),
    #[error("{0}")]
    HDF5(#[from] NexusHDF5Error),
    #[error("Cannot get nexus providers of {role} device {device}: {source}")]
    DeviceProvider {
        device: String,
        role: ScanRole,
        source: DeviceError,
    },
    #[error("Cannot get nexus providers of multiple device {device}: {source}")]
    MultipleDeviceProvider { device: String, source: DeviceError },
    #[error("Device {device} has base class {base_class} which has no scan role")]
    UnmappedBaseClass {
        device: String,
        base_class: NexusBaseClass,
    },
    #[error("At least one detector, per-point monitor or scannable is required")]
    NoDevices,
    #[error("No device has a primary data field")]
    NoPrimaryDevice,
    #[error("Device {device} with role {role} cannot be a primary device")]
    InvalidPrimaryRole { device: String, role: ScanRole },
    #[error("Cannot build NXdata group {group}: {source}")]
    DataGroup {
        group: String,
        source: Box<NexusScanError>,
    },
    #[error("Cannot add device {device} to the entry: {source}")]
    AddDevice {
        device: String,
        source: NexusTreeError,
    },
    #[error("Custom entry modification of device {device} failed: {source}")]
    CustomModification { device: String, source: DeviceError },
    #[error("Cannot get nexus provider of metadata writer {device}: {source}")]
    MetadataWriter { device: String, source: DeviceError },
    #[error("Template Error: {0}")]
    Template(#[from] TemplateError),
    #[error("Cannot create NeXus file {0}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        source: NexusHDF5Error,
    },
    #[error("{0} called in an illegal state")]
    IllegalState(LifecycleOperation),
    #[error("Scan file already closed")]
    AlreadyClosed,
    #[error("Timestamps ended before being started")]
    TimestampsNotStarted,
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
