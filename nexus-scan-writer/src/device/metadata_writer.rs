use super::{
    CustomEntryModification, DeviceResult, NexusDevice, NexusObjectProvider, NexusScanInfo,
};
use crate::{
    nexus::{NexusBaseClass, ScanRole},
    tree::{LazyField, NexusDataType, NexusField, NexusGroupNode, NexusValue},
};

mod labels {
    pub(super) const DEFAULT_NAME: &str = "scan_metadata";
    pub(super) const SCAN_COMMAND: &str = "scan_command";
    pub(super) const SCAN_SHAPE: &str = "scan_shape";
    pub(super) const SCAN_RANK: &str = "scan_rank";
    pub(super) const KEYS: &str = "keys";
    pub(super) const UNIQUE_KEYS: &str = "unique_keys";
    pub(super) const PROGRAM_NAME: &str = "program_name";
    pub(super) const VERSION: &str = "version";
}

/// Records how the scan was run in an NXcollection of the entry, and reserves the
/// per-point `unique_keys` dataset which marks each completed point.
#[derive(Clone, Debug)]
pub struct ScanMetadataWriter {
    name: String,
}

impl Default for ScanMetadataWriter {
    fn default() -> Self {
        Self::new(labels::DEFAULT_NAME)
    }
}

impl ScanMetadataWriter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

impl NexusDevice for ScanMetadataWriter {
    fn name(&self) -> &str {
        &self.name
    }

    fn nexus_provider(&self, info: &NexusScanInfo) -> DeviceResult<NexusObjectProvider> {
        let mut collection = NexusGroupNode::new(NexusBaseClass::Collection);
        if let Some(scan_command) = info.scan_command() {
            collection.add_field(labels::SCAN_COMMAND, NexusField::constant(scan_command))?;
        }
        collection.add_field(
            labels::SCAN_SHAPE,
            NexusField::constant(NexusValue::from_indices(info.scan_shape().iter().copied())),
        )?;
        collection.add_field(
            labels::SCAN_RANK,
            NexusField::constant(i64::try_from(info.rank()).unwrap_or(i64::MAX)),
        )?;
        for role in ScanRole::ENTRY_ORDER {
            let names = info.device_names(role);
            if !names.is_empty() {
                collection.add_field(&format!("{role}_names"), NexusField::constant(names.to_vec()))?;
            }
        }
        collection
            .add_group(labels::KEYS, NexusGroupNode::new(NexusBaseClass::Collection))?
            .add_field(
                labels::UNIQUE_KEYS,
                NexusField::lazy(LazyField::per_point(NexusDataType::Int, info.rank(), &[])),
            )?;

        Ok(NexusObjectProvider::new(&self.name, collection).with_category(NexusBaseClass::Entry))
    }

    fn custom_entry_modification(&self) -> Option<&dyn CustomEntryModification> {
        Some(self)
    }
}

impl CustomEntryModification for ScanMetadataWriter {
    /// Names the program which wrote the file, unless the entry already does.
    fn modify_entry(&self, entry: &mut NexusGroupNode) -> DeviceResult<()> {
        if !entry.contains(labels::PROGRAM_NAME) {
            entry.add_field(
                labels::PROGRAM_NAME,
                NexusField::constant(env!("CARGO_PKG_NAME"))
                    .with_attribute(labels::VERSION, env!("CARGO_PKG_VERSION")),
            )?;
        }
        Ok(())
    }
}
